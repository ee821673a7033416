use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use simplelog::{
    format_description, ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger,
    TerminalMode, WriteLogger,
};

/// Set up logging to both the console and the job's log file. Must be called
/// once, before any job work starts.
pub fn init(log_file: &Path) -> Result<()> {
    let mut builder = ConfigBuilder::new();
    builder.set_time_format_custom(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));
    // Falls back to UTC when the local offset can't be determined.
    let _ = builder.set_time_offset_to_local();
    let config = builder.build();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("could not open log file {}", log_file.display()))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, config, file),
    ])
    .context("logger already initialized")?;

    log::info!("Logger initialized.");
    Ok(())
}
