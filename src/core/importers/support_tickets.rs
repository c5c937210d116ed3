//! Support tickets, replies and attachments
//!
//! The ticket stream carries each ticket's earliest reply; its author and
//! timestamp become the ticket's creation record. A ticket whose department,
//! client or assigned staff member is set but unmapped is skipped. A ticket
//! whose service is unmapped keeps no service link.

use crate::adapters::legacy::LegacyQuery;
use crate::core::migration::{MigrationSession, SegmentStats};
use crate::domain::{EntityClass, LegacyRecord, Result, TargetId, TargetRow};
use serde_json::Value;

/// A legacy reference resolved through the identity map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reference {
    /// Column empty or zero
    Absent,
    Mapped(TargetId),
    /// Column set but never migrated
    Missing,
}

impl Reference {
    fn resolve(
        session: &MigrationSession,
        dependent: &str,
        class: EntityClass,
        row: &LegacyRecord,
        column: &str,
    ) -> Self {
        if row.id(column).is_none() {
            return Reference::Absent;
        }
        match session.lookup(dependent, class, row, column) {
            Some(id) => Reference::Mapped(id),
            None => Reference::Missing,
        }
    }

    fn value(self) -> Value {
        match self {
            Reference::Mapped(id) => Value::from(id),
            Reference::Absent | Reference::Missing => Value::Null,
        }
    }
}

pub async fn import(session: &mut MigrationSession, stats: &mut SegmentStats) -> Result<()> {
    let tickets = session.legacy.fetch(LegacyQuery::Tickets).await?;
    let target = session.target.clone();

    for ticket in tickets {
        let Some(legacy_id) = ticket.id("id") else {
            stats.record_skipped();
            continue;
        };
        let Some(department_id) = session.lookup(
            "support_tickets",
            EntityClass::SupportDepartments,
            &ticket,
            "department_id",
        ) else {
            stats.record_skipped();
            continue;
        };

        let staff = Reference::resolve(session, "support_tickets", EntityClass::Staff, &ticket, "staff_id");
        let client = Reference::resolve(
            session,
            "support_tickets",
            EntityClass::Clients,
            &ticket,
            "client_id",
        );
        if staff == Reference::Missing || client == Reference::Missing {
            stats.record_skipped();
            continue;
        }
        let service = Reference::resolve(
            session,
            "support_tickets",
            EntityClass::Services,
            &ticket,
            "service_id",
        );
        let opened_by = Reference::resolve(
            session,
            "support_tickets",
            EntityClass::Staff,
            &ticket,
            "first_reply_staff_id",
        );

        let status = ticket_status(&ticket);
        let date_closed = match status {
            "closed" => session.date_value_or_now(&ticket, "date_closed"),
            _ => Value::Null,
        };

        let ticket_id = target
            .insert(
                "support_tickets",
                &TargetRow::new()
                    .with("code", ticket_code(&ticket))
                    .with("department_id", department_id)
                    .with("staff_id", staff.value())
                    .with("service_id", service.value())
                    .with("client_id", client.value())
                    .with("email", ticket.text("email"))
                    .with("summary", ticket.text("subject"))
                    .with("priority", ticket_priority(&ticket))
                    .with("status", status)
                    .with("date_added", session.date_value_or_now(&ticket, "first_reply_date"))
                    .with("date_closed", date_closed)
                    .with("opened_by_staff_id", opened_by.value()),
            )
            .await?;
        session
            .mapping
            .set(EntityClass::SupportTickets, legacy_id, ticket_id)?;
        stats.record_imported();
    }

    import_replies(session).await?;
    import_attachments(session).await
}

async fn import_replies(session: &mut MigrationSession) -> Result<()> {
    let replies = session.legacy.fetch(LegacyQuery::TicketReplies).await?;
    let target = session.target.clone();

    for reply in replies {
        let Some(legacy_id) = reply.id("id") else {
            continue;
        };
        let Some(ticket_id) =
            session.lookup("support_replies", EntityClass::SupportTickets, &reply, "ticket_id")
        else {
            continue;
        };
        let staff = Reference::resolve(session, "support_replies", EntityClass::Staff, &reply, "staff_id");

        let reply_id = target
            .insert(
                "support_replies",
                &TargetRow::new()
                    .with("ticket_id", ticket_id)
                    .with("staff_id", staff.value())
                    .with("type", reply_type(&reply))
                    .with("details", reply.text("message"))
                    .with("date_added", session.date_value_or_now(&reply, "date_added")),
            )
            .await?;
        session
            .mapping
            .set(EntityClass::SupportReplies, legacy_id, reply_id)?;
    }

    Ok(())
}

async fn import_attachments(session: &mut MigrationSession) -> Result<()> {
    let attachments = session.legacy.fetch(LegacyQuery::TicketAttachments).await?;
    let target = session.target.clone();

    for attachment in attachments {
        let Some(reply_id) = session.lookup(
            "support_attachments",
            EntityClass::SupportReplies,
            &attachment,
            "reply_id",
        ) else {
            continue;
        };

        target
            .insert(
                "support_attachments",
                &TargetRow::new()
                    .with("reply_id", reply_id)
                    .with("name", attachment.text("name"))
                    .with("file_name", attachment.text("file_name")),
            )
            .await?;
    }

    Ok(())
}

/// Legacy ticket code, the legacy id when the code is missing
fn ticket_code(ticket: &LegacyRecord) -> String {
    ticket
        .opt_text("code")
        .unwrap_or_else(|| ticket.text("id"))
}

fn ticket_priority(ticket: &LegacyRecord) -> &'static str {
    match ticket.text("priority").trim().to_ascii_lowercase().as_str() {
        "low" | "1" => "low",
        "high" | "3" => "high",
        "critical" | "4" => "critical",
        "emergency" | "urgent" | "5" => "emergency",
        _ => "medium",
    }
}

fn ticket_status(ticket: &LegacyRecord) -> &'static str {
    match ticket.text("status").trim().to_ascii_lowercase().as_str() {
        "closed" | "resolved" => "closed",
        "answered" | "awaiting_reply" | "customer-reply" => "awaiting_reply",
        "in_progress" | "in-progress" | "on hold" => "in_progress",
        _ => "open",
    }
}

fn reply_type(reply: &LegacyRecord) -> &'static str {
    match reply.text("type").trim().to_ascii_lowercase().as_str() {
        "note" => "note",
        "log" => "log",
        _ => "reply",
    }
}
