//! Invoice pricing and tax presenter

use serde::Serialize;

/// A tax rule applied to a line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxRate {
    /// 1 or 2; level-2 taxes may cascade over level-1
    pub level: i64,
    /// Percentage
    pub rate: f64,
}

/// A migrated invoice line as seen by the presenter
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedLine {
    pub qty: f64,
    pub unit_amount: f64,
    pub taxes: Vec<TaxRate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct InvoiceTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// Computes invoice totals from line rows
pub trait InvoicePresenter: Send + Sync {
    fn totals(&self, lines: &[PresentedLine]) -> InvoiceTotals;

    /// Whether a tax at `level` is charged on top of lower-level taxes
    fn cascades(&self, level: i64) -> bool;
}

/// Exclusive percentage taxes, level-2 optionally cascading over level-1
#[derive(Debug, Clone, Copy, Default)]
pub struct TaxPresenter {
    pub cascade: bool,
}

impl TaxPresenter {
    pub fn new(cascade: bool) -> Self {
        Self { cascade }
    }
}

impl InvoicePresenter for TaxPresenter {
    fn cascades(&self, level: i64) -> bool {
        self.cascade && level >= 2
    }

    fn totals(&self, lines: &[PresentedLine]) -> InvoiceTotals {
        let mut subtotal = 0.0;
        let mut tax = 0.0;

        for line in lines {
            let base = line.qty * line.unit_amount;
            subtotal += base;

            let level_one: f64 = line
                .taxes
                .iter()
                .filter(|t| t.level <= 1)
                .map(|t| base * t.rate / 100.0)
                .sum();
            let level_two_base = if self.cascade { base + level_one } else { base };
            let level_two: f64 = line
                .taxes
                .iter()
                .filter(|t| t.level >= 2)
                .map(|t| level_two_base * t.rate / 100.0)
                .sum();

            tax += level_one + level_two;
        }

        let subtotal = round_currency(subtotal);
        let tax = round_currency(tax);
        InvoiceTotals {
            subtotal,
            tax,
            total: round_currency(subtotal + tax),
        }
    }
}

fn round_currency(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
