//! Pipeline segments

use serde::Serialize;
use std::fmt;

/// One named step of the migration pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Staff,
    Clients,
    Contacts,
    Taxes,
    Currencies,
    Invoices,
    Transactions,
    Packages,
    Coupons,
    Services,
    SupportDepartments,
    SupportTickets,
    Misc,
}

impl Segment {
    /// Execution order; later segments resolve references created by earlier ones
    pub const ORDER: [Segment; 13] = [
        Segment::Staff,
        Segment::Clients,
        Segment::Contacts,
        Segment::Taxes,
        Segment::Currencies,
        Segment::Invoices,
        Segment::Transactions,
        Segment::Packages,
        Segment::Coupons,
        Segment::Services,
        Segment::SupportDepartments,
        Segment::SupportTickets,
        Segment::Misc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Segment::Staff => "staff",
            Segment::Clients => "clients",
            Segment::Contacts => "contacts",
            Segment::Taxes => "taxes",
            Segment::Currencies => "currencies",
            Segment::Invoices => "invoices",
            Segment::Transactions => "transactions",
            Segment::Packages => "packages",
            Segment::Coupons => "coupons",
            Segment::Services => "services",
            Segment::SupportDepartments => "support_departments",
            Segment::SupportTickets => "support_tickets",
            Segment::Misc => "misc",
        }
    }

    /// Whether the segment is skipped when a manual package override table is supplied
    pub fn skipped_by_package_overrides(&self) -> bool {
        matches!(self, Segment::Packages)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
