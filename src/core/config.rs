use once_cell::sync::Lazy;
use std::env;

/// Configuration constants for the bot

/// Directory holding the JSON collections (users, drafts, broadcasts,
/// scenarios, schedule ledger, sessions).
/// Read from DATA_DIR environment variable, defaults to "data"
pub static DATA_DIR: Lazy<String> = Lazy::new(|| env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));

/// Path to the log file
/// Read from LOG_FILE environment variable
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE").unwrap_or_else(|_| "glashatay.log".to_string()));

/// Welcome text sent on a plain /start (no scenario code)
/// Read from WELCOME_TEXT environment variable
pub static WELCOME_TEXT: Lazy<String> = Lazy::new(|| {
    env::var("WELCOME_TEXT").unwrap_or_else(|_| "Привет! Я бот Академии 🌿 Напиши /ping для проверки.".to_string())
});

/// Admin configuration
pub mod admin {
    use once_cell::sync::Lazy;
    use std::env;

    fn parse_admin_ids(raw: &str) -> Vec<i64> {
        raw.split([',', ' ', '\n', '\t'])
            .filter_map(|part| part.trim().parse::<i64>().ok())
            .collect()
    }

    /// Admin user IDs (comma-separated)
    /// Read from ADMIN_IDS environment variable
    pub static ADMIN_IDS: Lazy<Vec<i64>> = Lazy::new(|| {
        env::var("ADMIN_IDS")
            .ok()
            .map(|raw| parse_admin_ids(&raw))
            .unwrap_or_default()
    });

}

/// Scheduling configuration
pub mod schedule {
    use chrono::{FixedOffset, Offset, Utc};
    use once_cell::sync::Lazy;
    use std::env;

    /// Wall-clock format admins enter schedule times in, e.g. "01.09.26 18:30"
    pub const TIME_FORMAT: &str = "%d.%m.%y %H:%M";

    /// Human-readable hint for the format above (shown in prompts)
    pub const TIME_FORMAT_HINT: &str = "ДД.ММ.ГГ ЧЧ:ММ";

    /// Reference time zone offset in hours, applied to all admin-entered
    /// schedule times before normalizing to UTC.
    /// Read from TZ_OFFSET_HOURS environment variable, defaults to +3 (МСК,
    /// which has no DST so a fixed offset is exact).
    pub static TZ_OFFSET_HOURS: Lazy<i32> = Lazy::new(|| {
        env::var("TZ_OFFSET_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|h| (-23..=23).contains(h))
            .unwrap_or(3)
    });

    /// The reference zone as a chrono offset
    pub fn reference_offset() -> FixedOffset {
        // TZ_OFFSET_HOURS is range-checked above, east_opt cannot fail
        FixedOffset::east_opt(*TZ_OFFSET_HOURS * 3600).unwrap_or(Utc.fix())
    }

}

/// Stats reporter configuration
pub mod stats {
    use once_cell::sync::Lazy;
    use std::env;

    /// Interval between aggregate user reports sent to admins (in hours)
    /// Read from STATS_INTERVAL_HOURS environment variable, defaults to weekly
    pub static REPORT_INTERVAL_HOURS: Lazy<u64> = Lazy::new(|| {
        env::var("STATS_INTERVAL_HOURS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(168)
    });

    /// Window for "recent" user aggregates (days)
    pub const AGGREGATE_WINDOW_DAYS: i64 = 7;
}
