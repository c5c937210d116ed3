//! Staff: login, profile and group assignment as one atomic unit

use crate::adapters::legacy::LegacyQuery;
use crate::config::StaffGroups;
use crate::core::migration::{MigrationSession, Segment, SegmentStats};
use crate::core::util::format_datetime;
use crate::domain::{EntityClass, LegacyRecord, Result, TargetRow};

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let rows = session.legacy.fetch(LegacyQuery::Staff).await?;
    let target = session.target.clone();
    let company_id = session.company_id();
    let groups = session.settings.staff_groups.clone();
    let date_added = format_datetime(session.now);

    for row in rows {
        let Some(legacy_id) = row.id("id") else {
            stats.record_skipped();
            continue;
        };

        let username = row
            .opt_text("username")
            .or_else(|| row.opt_text("email"))
            .unwrap_or_else(|| format!("staff{legacy_id}"));
        let group_id = staff_group(&row, &groups);

        let result = session
            .executor()
            .atomically(async {
                let user_id = target
                    .insert(
                        "users",
                        &TargetRow::new()
                            .with("username", username.as_str())
                            .with("password", row.text("password"))
                            .with("date_added", date_added.as_str()),
                    )
                    .await?;

                let staff_id = target
                    .insert(
                        "staff",
                        &TargetRow::new()
                            .with("user_id", user_id)
                            .with("company_id", company_id)
                            .with("first_name", row.text("first_name"))
                            .with("last_name", row.text("last_name"))
                            .with("email", row.text("email"))
                            .with("status", staff_status(&row)),
                    )
                    .await?;

                target
                    .insert(
                        "staff_group",
                        &TargetRow::new()
                            .with("staff_id", staff_id)
                            .with("staff_group_id", group_id),
                    )
                    .await?;

                Ok(staff_id)
            })
            .await;

        match result {
            Ok(staff_id) => {
                session.mapping.set(EntityClass::Staff, legacy_id, staff_id)?;
                stats.record_imported();
            }
            Err(e) => {
                session.record_error(Segment::Staff, &e);
                stats.record_skipped();
            }
        }
    }

    Ok(())
}

/// Target group for a legacy privilege code
fn staff_group(row: &LegacyRecord, groups: &StaffGroups) -> i64 {
    match row.text("privilege").trim().to_ascii_lowercase().as_str() {
        "admin" | "1" => groups.admin,
        "billing" | "2" => groups.billing,
        _ => groups.support,
    }
}

fn staff_status(row: &LegacyRecord) -> &'static str {
    match row.text("status").trim().to_ascii_lowercase().as_str() {
        "1" | "active" => "active",
        _ => "inactive",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("admin", 1 ; "admin name")]
    #[test_case("1", 1 ; "admin code")]
    #[test_case("billing", 2 ; "billing name")]
    #[test_case("2", 2 ; "billing code")]
    #[test_case("support", 3 ; "support")]
    #[test_case("7", 3 ; "unknown code")]
    fn test_staff_group(privilege: &str, expected: i64) {
        let row = LegacyRecord::from(json!({ "privilege": privilege }));
        assert_eq!(staff_group(&row, &StaffGroups::default()), expected);
    }

    #[test]
    fn test_staff_status() {
        assert_eq!(staff_status(&LegacyRecord::from(json!({"status": 1}))), "active");
        assert_eq!(staff_status(&LegacyRecord::from(json!({"status": "0"}))), "inactive");
    }
}
