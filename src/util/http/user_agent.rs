use rand::Rng;

const CHROME_VERSIONS: [&str; 8] = [
    "133.0.6943.88",
    "132.0.6834.110",
    "131.0.6778.108",
    "130.0.6723.117",
    "129.0.6668.89",
    "128.0.6613.138",
    "127.0.6533.119",
    "126.0.6478.182",
];

const FIREFOX_VERSIONS: [&str; 6] = ["133.0", "132.0", "131.0", "130.0", "129.0", "128.0"];

const EDGE_VERSIONS: [&str; 4] = [
    "133.0.3048.56",
    "132.0.2957.63",
    "131.0.2903.112",
    "130.0.2849.80",
];

const OS_STRINGS: [&str; 4] = [
    "Windows NT 10.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "X11; Linux x86_64",
    "Windows NT 11.0; Win64; x64",
];

fn pick<'a>(items: &[&'a str]) -> &'a str {
    items[rand::rng().random_range(0..items.len())]
}

fn gen_chrome_ua() -> String {
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
        pick(&OS_STRINGS),
        pick(&CHROME_VERSIONS)
    )
}

fn gen_firefox_ua() -> String {
    let version = pick(&FIREFOX_VERSIONS);
    format!(
        "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
        pick(&OS_STRINGS),
        version,
        version
    )
}

fn gen_edge_ua() -> String {
    let edge = pick(&EDGE_VERSIONS);
    let chrome_major = edge.split('.').next().unwrap_or("133");
    format!(
        "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36 Edg/{}",
        pick(&OS_STRINGS[..2]),
        chrome_major,
        edge
    )
}

/// 隨機產生桌面瀏覽器的 User-Agent
pub fn gen_random_ua() -> String {
    match rand::rng().random_range(0..10) {
        0..=5 => gen_chrome_ua(),  // 60% Chrome
        6..=7 => gen_firefox_ua(), // 20% Firefox
        _ => gen_edge_ua(),        // 20% Edge
    }
}
