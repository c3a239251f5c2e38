//! Admin gating for authoring and reporting commands

use crate::core::config::admin::ADMIN_IDS;

/// Check if user is admin.
///
/// Non-admin invocations of admin commands are silent no-ops: no error
/// message is sent, so the commands stay invisible to regular users.
pub fn is_admin(user_id: i64) -> bool {
    ADMIN_IDS.contains(&user_id)
}
