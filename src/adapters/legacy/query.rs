//! Fixed result sets read from the legacy billing schema
//!
//! The legacy schema version is fixed, so every query is a constant. Each
//! result set is ordered by its legacy key so repeated runs see rows in the
//! same order.

use std::fmt;

/// A result set of the legacy schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyQuery {
    Settings,
    Staff,
    Clients,
    Contacts,
    Taxes,
    Currencies,
    /// Invoice headers left-joined with their lines and the client country
    InvoiceLines,
    Transactions,
    TransactionAllocations,
    ModuleConfigs,
    Packages,
    PackagePricing,
    Coupons,
    Services,
    ServiceFields,
    SupportDepartments,
    SupportDepartmentStaff,
    /// Tickets joined with their earliest reply
    Tickets,
    TicketReplies,
    TicketAttachments,
}

impl LegacyQuery {
    pub fn name(&self) -> &'static str {
        match self {
            LegacyQuery::Settings => "settings",
            LegacyQuery::Staff => "staff",
            LegacyQuery::Clients => "clients",
            LegacyQuery::Contacts => "contacts",
            LegacyQuery::Taxes => "taxes",
            LegacyQuery::Currencies => "currencies",
            LegacyQuery::InvoiceLines => "invoice_lines",
            LegacyQuery::Transactions => "transactions",
            LegacyQuery::TransactionAllocations => "transaction_allocations",
            LegacyQuery::ModuleConfigs => "module_configs",
            LegacyQuery::Packages => "packages",
            LegacyQuery::PackagePricing => "package_pricing",
            LegacyQuery::Coupons => "coupons",
            LegacyQuery::Services => "services",
            LegacyQuery::ServiceFields => "service_fields",
            LegacyQuery::SupportDepartments => "support_departments",
            LegacyQuery::SupportDepartmentStaff => "support_department_staff",
            LegacyQuery::Tickets => "tickets",
            LegacyQuery::TicketReplies => "ticket_replies",
            LegacyQuery::TicketAttachments => "ticket_attachments",
        }
    }

    /// Row source, without ordering
    pub fn sql(&self) -> &'static str {
        match self {
            LegacyQuery::Settings => "SELECT key, value FROM settings",
            LegacyQuery::Staff => {
                "SELECT id, username, password, first_name, last_name, email, privilege, status \
                 FROM staff"
            }
            LegacyQuery::Clients => {
                "SELECT id, email, password, first_name, last_name, company, address1, address2, \
                 city, state, zip, country, phone, fax, status, date_added, currency, tax_exempt, \
                 last_login, last_ip FROM clients"
            }
            LegacyQuery::Contacts => {
                "SELECT id, client_id, first_name, last_name, company, email, address1, address2, \
                 city, state, zip, country, phone FROM contacts"
            }
            LegacyQuery::Taxes => "SELECT id, level, name, rate, country, state FROM taxes",
            LegacyQuery::Currencies => {
                "SELECT code, prefix, suffix, format, rate FROM currencies"
            }
            LegacyQuery::InvoiceLines => {
                "SELECT i.id AS invoice_id, i.client_id, i.date_billed, i.date_due, i.date_paid, \
                 i.status, i.currency, i.notes, c.country AS client_country, l.id AS line_id, \
                 l.service_id, l.description, l.qty, l.amount, l.taxed \
                 FROM invoices i \
                 LEFT JOIN invoice_lines l ON l.invoice_id = i.id \
                 LEFT JOIN clients c ON c.id = i.client_id"
            }
            LegacyQuery::Transactions => {
                "SELECT id, client_id, amount, currency, gateway, trans_id, status, date_added, type \
                 FROM transactions"
            }
            LegacyQuery::TransactionAllocations => {
                "SELECT transaction_id, invoice_id, amount, date FROM transaction_allocations"
            }
            LegacyQuery::ModuleConfigs => {
                "SELECT id, module, name, hostname, ip, username, password, max_accounts, ns1, ns2 \
                 FROM module_configs"
            }
            LegacyQuery::Packages => "SELECT * FROM packages",
            LegacyQuery::PackagePricing => {
                "SELECT id, package_id, currency, term, period, price, setup_fee FROM package_pricing"
            }
            LegacyQuery::Coupons => {
                "SELECT id, code, type, value, currency, used, max_uses, start_date, end_date, \
                 recurring, status, packages FROM coupons"
            }
            LegacyQuery::Services => {
                "SELECT id, client_id, package_id, term, period, amount, currency, status, \
                 date_added, date_renews, date_suspended, date_canceled, domain FROM services"
            }
            LegacyQuery::ServiceFields => "SELECT service_id, key, value FROM service_fields",
            LegacyQuery::SupportDepartments => {
                "SELECT id, name, description, email, method, status FROM support_departments"
            }
            LegacyQuery::SupportDepartmentStaff => {
                "SELECT department_id, staff_id FROM support_department_staff"
            }
            LegacyQuery::Tickets => {
                "SELECT t.id, t.code, t.department_id, t.staff_id, t.service_id, t.client_id, \
                 t.email, t.subject, t.priority, t.status, t.date_closed, \
                 r.id AS first_reply_id, r.staff_id AS first_reply_staff_id, \
                 r.client_id AS first_reply_client_id, r.date_added AS first_reply_date \
                 FROM tickets t \
                 LEFT JOIN ticket_replies r ON r.id = \
                 (SELECT MIN(r2.id) FROM ticket_replies r2 WHERE r2.ticket_id = t.id)"
            }
            LegacyQuery::TicketReplies => {
                "SELECT id, ticket_id, staff_id, client_id, type, message, date_added \
                 FROM ticket_replies"
            }
            LegacyQuery::TicketAttachments => {
                "SELECT id, reply_id, name, file_name FROM ticket_attachments"
            }
        }
    }

    /// Ordering applied over the output columns of [`LegacyQuery::sql`]
    pub fn order_by(&self) -> &'static str {
        match self {
            LegacyQuery::Settings => "key",
            LegacyQuery::Currencies => "code",
            LegacyQuery::InvoiceLines => "invoice_id, line_id",
            LegacyQuery::TransactionAllocations => "transaction_id, invoice_id, date",
            LegacyQuery::PackagePricing => "package_id, id",
            LegacyQuery::ServiceFields => "service_id, key",
            LegacyQuery::SupportDepartmentStaff => "department_id, staff_id",
            _ => "id",
        }
    }

    /// Full statement returning one JSON object per row
    pub fn statement(&self) -> String {
        format!(
            "SELECT to_jsonb(q) AS row FROM ({}) q ORDER BY {}",
            self.sql(),
            self.order_by()
                .split(", ")
                .map(|column| format!("q.{column}"))
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl fmt::Display for LegacyQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_wraps_and_orders() {
        let sql = LegacyQuery::InvoiceLines.statement();
        assert!(sql.starts_with("SELECT to_jsonb(q) AS row FROM (SELECT i.id AS invoice_id"));
        assert!(sql.ends_with("ORDER BY q.invoice_id, q.line_id"));
    }

    #[test]
    fn test_tickets_select_first_reply() {
        assert!(LegacyQuery::Tickets.sql().contains("SELECT MIN(r2.id)"));
        assert_eq!(LegacyQuery::Tickets.order_by(), "id");
    }
}
