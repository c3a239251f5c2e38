//! User statistics and the periodic admin report
//!
//! A background task sends aggregate user numbers to every admin on a fixed
//! interval; the same aggregates back the /users command.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use teloxide::prelude::*;

use crate::core::config;
use crate::core::types::User;
use crate::storage::Stores;

/// Aggregate user numbers over the configured activity window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserAggregates {
    pub total: usize,
    pub active: usize,
}

/// Counts registered users and those active within `window_days` of `now`.
/// Rows with an unparseable `last_active` count as inactive.
pub fn compute_aggregates(users: &[User], window_days: i64, now: DateTime<Utc>) -> UserAggregates {
    let cutoff = now - Duration::days(window_days);
    let active = users
        .iter()
        .filter(|u| {
            DateTime::parse_from_rfc3339(&u.last_active)
                .map(|at| at.with_timezone(&Utc) >= cutoff)
                .unwrap_or(false)
        })
        .count();

    UserAggregates {
        total: users.len(),
        active,
    }
}

/// Formats the aggregates as a Telegram message
pub fn format_stats_message(aggregates: &UserAggregates, window_days: i64) -> String {
    format!(
        "📊 Статистика пользователей\n\n👥 Всего: {}\n🟢 Активных за {} дн.: {}",
        aggregates.total, window_days, aggregates.active
    )
}

/// Reads the user table and formats the /users report
pub async fn build_report(stores: &Stores) -> String {
    let users = stores.users.all().await;
    let window = config::stats::AGGREGATE_WINDOW_DAYS;
    let aggregates = compute_aggregates(&users, window, Utc::now());
    format_stats_message(&aggregates, window)
}

/// Starts the periodic stats reporter background task.
///
/// Sends the user aggregates to every admin each `interval_hours`; an empty
/// user table skips the report instead of spamming zeroes.
pub fn start_stats_reporter(bot: Bot, stores: Arc<Stores>, interval_hours: u64) {
    tokio::spawn(async move {
        let interval_secs = interval_hours * 3600;
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));

        // Skip the first immediate tick
        interval.tick().await;

        loop {
            interval.tick().await;

            let users = stores.users.all().await;
            if users.is_empty() {
                log::debug!("No registered users, skipping stats report");
                continue;
            }

            let window = config::stats::AGGREGATE_WINDOW_DAYS;
            let message = format_stats_message(&compute_aggregates(&users, window, Utc::now()), window);

            for admin_id in config::admin::ADMIN_IDS.iter() {
                if let Err(e) = bot.send_message(ChatId(*admin_id), &message).await {
                    log::error!("Failed to send stats report to admin {}: {}", admin_id, e);
                }
            }
            log::info!("Sent stats report to {} admin(s)", config::admin::ADMIN_IDS.len());
        }
    });

    log::info!("Stats reporter started (every {} hours)", interval_hours);
}
