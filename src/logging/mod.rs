use std::{fmt::Write as _, thread};

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::Lazy;

use crate::{config::SETTINGS, logging::rotate::Rotate};

pub mod rotate;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("watch"));

/// 一次批次寫入的緩衝大小
const BATCH_SIZE: usize = 2048;

/// 依等級分檔的非同步日誌，實際的寫檔動作在各自的線程內完成
pub struct Logger {
    info_writer: Sender<String>,
    warn_writer: Sender<String>,
    error_writer: Sender<String>,
    debug_writer: Sender<String>,
}

impl Logger {
    pub fn new(log_name: &str) -> Self {
        Logger {
            info_writer: Self::create_writer(&format!("{}_info", log_name)),
            warn_writer: Self::create_writer(&format!("{}_warn", log_name)),
            error_writer: Self::create_writer(&format!("{}_error", log_name)),
            debug_writer: Self::create_writer(&format!("{}_debug", log_name)),
        }
    }

    pub fn info(&self, log: String) {
        self.send(log, &self.info_writer);
    }

    pub fn warn(&self, log: String) {
        self.send(log, &self.warn_writer);
    }

    pub fn error(&self, log: String) {
        self.send(log, &self.error_writer);
    }

    pub fn debug(&self, log: String) {
        self.send(log, &self.debug_writer);
    }

    fn send(&self, msg: String, writer: &Sender<String>) {
        if let Err(why) = writer.send(msg) {
            error_console(why.to_string());
        }
    }

    fn create_writer(log_name: &str) -> Sender<String> {
        let (tx, rx) = unbounded::<String>();
        let pattern = format!("{}/%Y-%m-%d-{}.log", SETTINGS.log.dir, log_name);
        let max_size = SETTINGS.log.max_size_mb.max(1) * 1024 * 1024;
        let max_age_days = SETTINGS.log.max_age_days;

        // 寫入檔案的操作使用另一個線程處理
        thread::spawn(move || {
            let mut rotate = Rotate::with_options(pattern, max_size, max_age_days);
            let mut line = String::with_capacity(BATCH_SIZE);

            for received in &rx {
                let now = Local::now();
                if writeln!(&mut line, "{} {}", now.format("%F %X%.6f"), received).is_err() {
                    continue;
                }

                if rx.is_empty() || line.len() >= BATCH_SIZE {
                    if let Err(why) = rotate.write_msg(now, line.as_bytes()) {
                        error_console(format!(
                            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
                            why, line
                        ));
                    }

                    rotate.flush();
                    line.clear();
                }
            }
        });

        tx
    }
}

pub fn info_file_async(log: String) {
    LOGGER.info(log);
}

pub fn warn_file_async(log: String) {
    LOGGER.warn(log);
}

pub fn error_file_async(log: String) {
    LOGGER.error(log);
}

pub fn debug_file_async(log: String) {
    LOGGER.debug(log);
}

pub fn info_console(log: String) {
    println!(
        "{} Info {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}

pub fn error_console(log: String) {
    eprintln!(
        "{} Error {}",
        Local::now().format("%Y-%m-%d %H:%M:%S.%3f"),
        log
    );
}
