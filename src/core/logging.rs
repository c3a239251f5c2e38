//! Logging initialization and startup configuration checking

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::config;

/// Initialize logger for both console and file output
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup
///
/// Validates and logs:
/// - Admin IDs (the bot is read-only for everyone else without them)
/// - Data directory location
/// - Reference time zone offset for schedule input
pub fn log_startup_configuration() {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("⚙️  Startup Configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if config::admin::ADMIN_IDS.is_empty() {
        log::warn!("⚠️  ADMIN_IDS is not set — nobody can author broadcasts or scenarios");
    } else {
        log::info!("✅ ADMIN_IDS: {} admin(s) configured", config::admin::ADMIN_IDS.len());
    }

    log::info!("📁 DATA_DIR: {}", config::DATA_DIR.as_str());
    log::info!(
        "🕒 Reference zone: UTC{:+} (schedule input format: {})",
        *config::schedule::TZ_OFFSET_HOURS,
        config::schedule::TIME_FORMAT_HINT
    );
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
