use janus_dns_domain::config::LogConfig;
use janus_dns_domain::{Config, ConfigError};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Resolve the configuration path from the CLI flags: an explicit `-c` wins;
/// with `-d` the process first moves into the runtime directory and picks
/// `config.yaml` or `config.yml` there.
pub fn load_config(config_flag: Option<&str>, dir_flag: Option<&str>) -> Result<Config, ConfigError> {
    if let Some(dir) = dir_flag {
        std::env::set_current_dir(dir).map_err(|e| {
            ConfigError::FileRead(dir.to_string(), format!("cannot switch to directory: {}", e))
        })?;
    }

    let path = match config_flag {
        Some(path) => path.to_string(),
        None => match dir_flag {
            Some(_) => Config::find_in_dir(Path::new(".")).ok_or_else(|| {
                ConfigError::FileRead(
                    "config.yaml".to_string(),
                    "no config.yaml or config.yml in runtime directory".to_string(),
                )
            })?,
            None => "./config.yaml".to_string(),
        },
    };

    let config = Config::from_file(&path)?;
    config.validate()?;
    Ok(config)
}

pub fn init_logging(log: &LogConfig) {
    let level = log.level.parse().unwrap_or(tracing::Level::INFO);
    let json = log.format == "json";

    let file = if log.output == "stdout" {
        None
    } else {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log.output)
        {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!(
                    "cannot open log file '{}': {}; logging to stdout",
                    log.output, e
                );
                None
            }
        }
    };

    match file {
        Some(file) => {
            let builder = tracing_subscriber::fmt()
                .with_target(true)
                .with_level(true)
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        None => {
            let builder = tracing_subscriber::fmt()
                .with_target(true)
                .with_level(true)
                .with_max_level(level)
                .with_ansi(true);
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
    }

    info!(level = %log.level, format = %log.format, output = %log.output, "Logging initialized");
}
