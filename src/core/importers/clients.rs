//! Clients: login with username fallback, client, primary contact, settings

use crate::adapters::legacy::LegacyQuery;
use crate::adapters::target::TargetStore;
use crate::core::migration::{MigrationSession, SegmentStats};
use crate::domain::{EntityClass, LegacyId, LegacyRecord, Result, TargetId, TargetRow};
use serde_json::Value;

/// How the client's login name was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsernameType {
    /// Legacy email address
    Email,
    /// Legacy client id, used when the email was already taken
    Username,
}

impl UsernameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UsernameType::Email => "email",
            UsernameType::Username => "username",
        }
    }
}

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::Clients).await?;
    let target = session.target.clone();

    for row in rows {
        let Some(legacy_id) = row.id("id") else {
            stats.record_skipped();
            continue;
        };

        let date_added = session.date_value_or_now(&row, "date_added");
        let (user_id, username_type) =
            create_login(target.as_ref(), &row, &legacy_id, &date_added).await?;

        let client_id = target
            .insert(
                "clients",
                &TargetRow::new()
                    .with("id_value", legacy_id.as_str())
                    .with("user_id", user_id)
                    .with("client_group_id", session.settings.client_group_id)
                    .with("status", client_status(&row)),
            )
            .await?;
        session
            .mapping
            .set(EntityClass::Clients, legacy_id.clone(), client_id)?;

        let contact_id = target
            .insert("contacts", &contact_row(&row, client_id, "primary"))
            .await?;
        insert_numbers(target.as_ref(), contact_id, &row).await?;

        let currency = super::currency_code(&row, "currency", &session.defaults.currency);
        let settings = [
            ("username_type", username_type.as_str().to_string()),
            ("tax_exempt", row.flag("tax_exempt").to_string()),
            ("default_currency", currency),
        ];
        for (key, value) in settings {
            target
                .insert(
                    "client_settings",
                    &TargetRow::new()
                        .with("client_id", client_id)
                        .with("key", key)
                        .with("value", value),
                )
                .await?;
        }

        let last_login = session.date_value(&row, "last_login");
        if !last_login.is_null() {
            target
                .insert(
                    "log_users",
                    &TargetRow::new()
                        .with("user_id", user_id)
                        .with("ip_address", row.text("last_ip"))
                        .with("date_added", last_login.clone())
                        .with("date_updated", last_login)
                        .with("result", "success"),
                )
                .await?;
        }

        stats.record_imported();
    }

    Ok(())
}

/// Create the client login, falling back to the legacy id when the email is taken
async fn create_login(
    target: &dyn TargetStore,
    row: &LegacyRecord,
    legacy_id: &LegacyId,
    date_added: &Value,
) -> Result<(TargetId, UsernameType)> {
    let login = |username: &str| {
        TargetRow::new()
            .with("username", username)
            .with("password", row.text("password"))
            .with("date_added", date_added.clone())
    };

    if let Some(email) = row.opt_text("email") {
        match target.insert("users", &login(&email)).await {
            Ok(user_id) => return Ok((user_id, UsernameType::Email)),
            Err(e) if e.is_conflict() => {
                tracing::info!(
                    client = %legacy_id,
                    "Email already used as a username, falling back to client id"
                );
            }
            Err(e) => return Err(e),
        }
    }

    let user_id = target.insert("users", &login(legacy_id.as_str())).await?;
    Ok((user_id, UsernameType::Username))
}

/// Contact row from a legacy client or contact row
pub(crate) fn contact_row(row: &LegacyRecord, client_id: TargetId, contact_type: &str) -> TargetRow {
    TargetRow::new()
        .with("client_id", client_id)
        .with("contact_type", contact_type)
        .with("first_name", row.text("first_name"))
        .with("last_name", row.text("last_name"))
        .with("company", row.text("company"))
        .with("email", row.text("email"))
        .with("address1", row.text("address1"))
        .with("address2", row.text("address2"))
        .with("city", row.text("city"))
        .with("state", row.text("state"))
        .with("zip", row.text("zip"))
        .with("country", row.text("country"))
}

/// Phone and fax numbers of a legacy row, when present
pub(crate) async fn insert_numbers(
    target: &dyn TargetStore,
    contact_id: TargetId,
    row: &LegacyRecord,
) -> Result<()> {
    for number_type in ["phone", "fax"] {
        if let Some(number) = row.opt_text(number_type) {
            target
                .insert(
                    "contact_numbers",
                    &TargetRow::new()
                        .with("contact_id", contact_id)
                        .with("number", number)
                        .with("type", number_type)
                        .with("location", "work"),
                )
                .await?;
        }
    }
    Ok(())
}

fn client_status(row: &LegacyRecord) -> &'static str {
    match row.text("status").trim().to_ascii_lowercase().as_str() {
        "inactive" | "closed" | "0" => "inactive",
        "fraud" => "fraud",
        _ => "active",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryTargetStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_login_falls_back_to_legacy_id_on_conflict() {
        let store = MemoryTargetStore::new();
        store
            .insert("users", &TargetRow::new().with("username", "a@example.com"))
            .await
            .unwrap();

        let row = LegacyRecord::from(json!({"id": 7, "email": "a@example.com"}));
        let (user_id, username_type) =
            create_login(&store, &row, &LegacyId::from(7), &Value::Null)
                .await
                .unwrap();

        assert_eq!(username_type, UsernameType::Username);
        assert_eq!(user_id, TargetId::new(2));
        assert_eq!(store.rows("users")[1].text("username"), "7");
    }

    #[tokio::test]
    async fn test_login_uses_email_when_free() {
        let store = MemoryTargetStore::new();
        let row = LegacyRecord::from(json!({"id": 7, "email": "a@example.com"}));
        let (_, username_type) = create_login(&store, &row, &LegacyId::from(7), &Value::Null)
            .await
            .unwrap();
        assert_eq!(username_type, UsernameType::Email);
    }

    #[tokio::test]
    async fn test_numbers_only_when_present() {
        let store = MemoryTargetStore::new();
        let row = LegacyRecord::from(json!({"phone": "555-0100", "fax": ""}));
        insert_numbers(&store, TargetId::new(1), &row).await.unwrap();

        let numbers = store.rows("contact_numbers");
        assert_eq!(numbers.len(), 1);
        assert_eq!(numbers[0].text("type"), "phone");
    }

    #[test]
    fn test_client_status() {
        assert_eq!(client_status(&LegacyRecord::from(json!({"status": "Fraud"}))), "fraud");
        assert_eq!(client_status(&LegacyRecord::from(json!({}))), "active");
    }
}
