use anyhow::{Context, Result};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

pub const LOG_FILE_NAME: &str = "node.log";

pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Sets up `env_logger` once per process. With a logs directory and logging
/// enabled, every line is also appended to `node.log` there.
pub fn init_logging(logs_path: Option<PathBuf>, logs_enabled: Option<bool>, log_level: Option<String>) -> Result<()> {
    let save_logs = logs_enabled.unwrap_or(true);
    let level_str = log_level.unwrap_or_else(|| "info".to_string());

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&level_str));
    builder.filter_level(parse_level(&level_str));

    let log_file = match logs_path {
        Some(logs_dir) if save_logs => {
            std::fs::create_dir_all(&logs_dir)
                .with_context(|| format!("Failed to create logs directory {}", logs_dir.display()))?;
            let log_file_path = logs_dir.join(LOG_FILE_NAME);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_file_path)
                .with_context(|| format!("Failed to open {}", log_file_path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(DualWriter::new(file))));
            Some(log_file_path)
        }
        _ => None,
    };

    builder.try_init().context("Logger already initialised")?;

    match log_file {
        Some(path) => log::info!("Logging to terminal and {} (level: {})", path.display(), level_str),
        None => log::info!("Logging to terminal only (level: {})", level_str),
    }
    Ok(())
}

/// Writes to a file and stdout.
struct DualWriter {
    file: std::fs::File,
}

impl DualWriter {
    fn new(file: std::fs::File) -> Self {
        Self { file }
    }
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        io::stdout().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        io::stdout().flush()
    }
}
