use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::SystemTime,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, TimeDelta};
use rayon::prelude::*;

use crate::logging;

/// 依日期與檔案大小輪轉的日誌檔
///
/// 檔名由 `pattern` 經 chrono 格式化而來，日期改變時重新開檔並清理過期的檔案；
/// 同一天內超過 `max_size` 時以世代編號另開新檔，例如 `2026-10-18-watch_info.1.log`。
pub struct Rotate {
    pattern: String,
    /// 目前日期對應的基礎檔名（不含世代）
    base_name: String,
    writer: Option<BufWriter<File>>,
    generation: u32,
    written: u64,
    max_size: u64,
    max_age: TimeDelta,
}

impl Rotate {
    pub fn with_options(pattern: String, max_size: u64, max_age_days: i64) -> Self {
        Rotate {
            pattern,
            base_name: String::new(),
            writer: None,
            generation: 0,
            written: 0,
            max_size,
            max_age: TimeDelta::try_days(max_age_days.max(1)).unwrap_or(TimeDelta::days(7)),
        }
    }

    /// 寫入訊息，必要時先依日期或大小輪轉
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let base_name = now.format(&self.pattern).to_string();

        if base_name != self.base_name || self.writer.is_none() {
            self.base_name = base_name;
            self.generation = 0;
            self.open()?;
            self.cleanup(now);
        }

        if self.written > 0 && self.written + msg.len() as u64 > self.max_size {
            self.generation += 1;
            self.open()?;
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("log file {} is not opened", self.base_name))?;
        writer.write_all(msg)?;
        self.written += msg.len() as u64;

        Ok(())
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.writer.as_mut() {
            let _ = writer.flush();
        }
    }

    /// 目前正在寫入的完整檔名
    pub fn current_file(&self) -> PathBuf {
        generation_file_name(&self.base_name, self.generation)
    }

    fn open(&mut self) -> Result<()> {
        self.flush();

        let path = self.current_file();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.written = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.writer = Some(BufWriter::with_capacity(4096, file));

        Ok(())
    }

    /// 刪除同一目錄下修改時間早於保留期限的檔案
    fn cleanup(&self, now: DateTime<Local>) {
        let current = self.current_file();
        let dir = match current.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let cut_off: SystemTime = (now - self.max_age).into();

        let expired: Vec<PathBuf> = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
                .filter(|path| {
                    fs::metadata(path)
                        .and_then(|m| m.modified())
                        .is_ok_and(|modified| modified < cut_off)
                })
                .collect(),
            Err(why) => {
                logging::error_console(format!(
                    "Failed to read the log directory({}) because {:?}",
                    dir.display(),
                    why
                ));
                return;
            }
        };

        expired
            .par_iter()
            .with_min_len(num_cpus::get())
            .for_each(|path| {
                if let Err(why) = fs::remove_file(path) {
                    logging::error_console(format!(
                        "couldn't remove the file({}). because {:?}",
                        path.display(),
                        why
                    ));
                }
            });
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        self.flush();
    }
}

/// generation = 0: "log/2026-10-18-app.log"
/// generation = 2: "log/2026-10-18-app.2.log"
fn generation_file_name(base_name: &str, generation: u32) -> PathBuf {
    if generation == 0 {
        return PathBuf::from(base_name);
    }

    let path = Path::new(base_name);
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("log");

    parent.join(format!("{}.{}.{}", stem, generation, ext))
}
