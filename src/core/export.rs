//! CSV exports sent to admins as documents

use teloxide::prelude::*;
use teloxide::types::InputFile;

use crate::core::error::AppResult;
use crate::core::types::{Draft, User};

/// Escapes one CSV field: quotes doubled, newlines flattened
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\"").replace('\n', " "))
}

/// Contacts export: one row per user with a reachable contact handle
pub fn contacts_to_csv(users: &[User]) -> String {
    let mut content = "id,first_name,contact,last_active\n".to_string();
    for user in users {
        let Some(contact) = user.contact() else { continue };
        content.push_str(&format!(
            "{},{},{},{}\n",
            user.id,
            csv_field(&user.first_name),
            csv_field(contact),
            csv_field(&user.last_active)
        ));
    }
    content
}

/// Saved broadcasts export
pub fn broadcasts_to_csv(records: &[Draft]) -> String {
    let mut content = "id,text,attachment,link,delivered\n".to_string();
    for record in records {
        let attachment = record
            .attachment
            .as_ref()
            .map(|a| a.kind.label())
            .unwrap_or_default();
        content.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_field(&record.id),
            csv_field(&record.text),
            csv_field(attachment),
            csv_field(&record.link),
            record.delivered
        ));
    }
    content
}

/// Published scenarios export, keyed by their deep-link code
pub fn scenarios_to_csv(scenarios: &[(String, Draft)]) -> String {
    let mut content = "code,text,attachment,link\n".to_string();
    for (code, scenario) in scenarios {
        let attachment = scenario
            .attachment
            .as_ref()
            .map(|a| a.kind.label())
            .unwrap_or_default();
        content.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(code),
            csv_field(&scenario.text),
            csv_field(attachment),
            csv_field(&scenario.link)
        ));
    }
    content
}

/// Writes `content` to a temp file, sends it as a document named
/// `file_name`, and removes the temp file either way.
pub async fn send_csv_document(bot: &Bot, chat_id: ChatId, file_name: &str, content: String) -> AppResult<()> {
    let path = std::env::temp_dir().join(format!("glashatay_{}_{}", chat_id.0, file_name));
    fs_err::write(&path, content)?;

    let result = bot
        .send_document(chat_id, InputFile::file(&path).file_name(file_name.to_string()))
        .await;
    let _ = fs_err::remove_file(&path);
    result?;
    Ok(())
}
