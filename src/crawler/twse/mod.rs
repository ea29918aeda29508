/// 基本市況報導-即時報價
pub mod quote;
