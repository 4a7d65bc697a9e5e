use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::{
    code::EBUSY, error::KernelResult as Result, pr_cont, pr_debug, pr_err, pr_info, pr_warn,
    println,
};

struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }
    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let module_path = record.module_path().unwrap_or_default();
        match record.level() {
            Level::Error => {
                pr_err!("[ERROR] [{}] {}", module_path, record.args());
            }
            Level::Warn => {
                pr_warn!("[ WARN] [{}] {}", module_path, record.args());
            }
            Level::Info => {
                pr_info!("[ INFO] [{}] {}", module_path, record.args());
            }
            Level::Debug => {
                pr_debug!("[DEBUG] [{}] {}", module_path, record.args());
            }
            Level::Trace => {
                pr_cont!("[TRACE] [{}] {}", module_path, record.args());
            }
        };
    }
    fn flush(&self) {}
}

/// Maps the `LOG` build variable to a level filter, `INFO` when unset or unknown.
pub fn level_from_env(value: Option<&str>) -> LevelFilter {
    match value {
        Some("ERROR") => LevelFilter::Error,
        Some("WARN") => LevelFilter::Warn,
        Some("INFO") => LevelFilter::Info,
        Some("DEBUG") => LevelFilter::Debug,
        Some("TRACE") => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Routes the `log` facade to the kernel console.
///
/// Fails with `EBUSY` when another logger is already installed.
pub fn init_logger() -> Result {
    println!("Init logger {:?}", option_env!("LOG"));
    log::set_logger(&SimpleLogger).map_err(|_| EBUSY)?;
    log::set_max_level(level_from_env(option_env!("LOG")));
    Ok(())
}
