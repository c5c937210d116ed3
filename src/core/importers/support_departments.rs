//! Support departments and their staff assignments

use crate::adapters::legacy::LegacyQuery;
use crate::core::migration::{MigrationSession, SegmentStats};
use crate::domain::{EntityClass, LegacyRecord, Result, TargetRow};

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::SupportDepartments).await?;
    let target = session.target.clone();

    for row in rows {
        let Some(legacy_id) = row.id("id") else {
            stats.record_skipped();
            continue;
        };

        let department_id = target
            .insert(
                "support_departments",
                &TargetRow::new()
                    .with("company_id", session.company_id())
                    .with("name", row.text("name"))
                    .with("description", row.text("description"))
                    .with("email", row.text("email"))
                    .with("method", department_method(&row))
                    .with("status", department_status(&row)),
            )
            .await?;
        session
            .mapping
            .set(EntityClass::SupportDepartments, legacy_id, department_id)?;
        stats.record_imported();
    }

    let assignments = session
        .legacy
        .fetch(LegacyQuery::SupportDepartmentStaff)
        .await?;
    for row in assignments {
        let Some(department_id) = session.lookup(
            "support_staff_departments",
            EntityClass::SupportDepartments,
            &row,
            "department_id",
        ) else {
            continue;
        };
        let Some(staff_id) =
            session.lookup("support_staff_departments", EntityClass::Staff, &row, "staff_id")
        else {
            continue;
        };

        target
            .insert(
                "support_staff_departments",
                &TargetRow::new()
                    .with("department_id", department_id)
                    .with("staff_id", staff_id),
            )
            .await?;
    }

    Ok(())
}

/// Mail intake method; anything but piping or polling means no intake
fn department_method(row: &LegacyRecord) -> &'static str {
    match row.text("method").trim().to_ascii_lowercase().as_str() {
        "pipe" | "piping" => "pipe",
        "pop3" | "pop" => "pop3",
        "imap" => "imap",
        _ => "none",
    }
}

fn department_status(row: &LegacyRecord) -> &'static str {
    match super::active_status(row, "status") {
        "active" => "visible",
        _ => "hidden",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("Piping", "pipe")]
    #[test_case("pop", "pop3")]
    #[test_case("imap", "imap")]
    #[test_case("", "none")]
    fn test_department_method(legacy: &str, expected: &str) {
        let row = LegacyRecord::from(json!({ "method": legacy }));
        assert_eq!(department_method(&row), expected);
    }

    #[test]
    fn test_department_status() {
        assert_eq!(department_status(&LegacyRecord::from(json!({"status": "1"}))), "visible");
        assert_eq!(department_status(&LegacyRecord::from(json!({"status": "0"}))), "hidden");
    }
}
