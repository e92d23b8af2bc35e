use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use super::{non_negative, percentage, within_amount_limit, AmountOutOfRange};

/// Quotation status.
///
/// Allowed moves:
/// - Draft -> Pending, Approved, Rejected
/// - Pending -> Draft, Approved, Rejected
/// - Rejected -> Draft, Pending
/// - Approved is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotationStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl QuotationStatus {
    pub const ALL: [QuotationStatus; 4] = [
        QuotationStatus::Draft,
        QuotationStatus::Pending,
        QuotationStatus::Approved,
        QuotationStatus::Rejected,
    ];

    pub fn can_transition_to(self, next: QuotationStatus) -> bool {
        use QuotationStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Draft, Approved)
                | (Draft, Rejected)
                | (Pending, Draft)
                | (Pending, Approved)
                | (Pending, Rejected)
                | (Rejected, Draft)
                | (Rejected, Pending)
        )
    }
}

impl fmt::Display for QuotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotationStatus::Draft => write!(f, "Draft"),
            QuotationStatus::Pending => write!(f, "Pending"),
            QuotationStatus::Approved => write!(f, "Approved"),
            QuotationStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

/// A priced line on a quotation or invoice. `amount = quantity * unit_price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

/// Line item as sent by callers. Any `amount` in the payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItemInput {
    #[validate(length(min = 1, message = "Item description is required"))]
    pub description: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
    #[validate(custom(function = "non_negative"), custom(function = "within_amount_limit"))]
    pub unit_price: Decimal,
}

impl TryFrom<QuotationItemInput> for QuotationItem {
    type Error = AmountOutOfRange;

    fn try_from(input: QuotationItemInput) -> Result<Self, Self::Error> {
        let amount = Decimal::from(input.quantity)
            .checked_mul(input.unit_price)
            .ok_or(AmountOutOfRange)?;
        Ok(QuotationItem {
            description: input.description,
            quantity: input.quantity,
            unit_price: input.unit_price,
            amount,
        })
    }
}

impl QuotationItem {
    /// Prices every input line, failing on the first amount that overflows.
    pub fn price_all(inputs: Vec<QuotationItemInput>) -> Result<Vec<QuotationItem>, AmountOutOfRange> {
        inputs.into_iter().map(QuotationItem::try_from).collect()
    }
}

/// Subtotal, tax and total derived from a set of items and a tax rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

impl Totals {
    pub fn compute(items: &[QuotationItem], tax_rate: Decimal) -> Result<Self, AmountOutOfRange> {
        let subtotal = items
            .iter()
            .try_fold(Decimal::ZERO, |sum, item| sum.checked_add(item.amount))
            .ok_or(AmountOutOfRange)?;
        let tax_amount = subtotal
            .checked_mul(tax_rate)
            .and_then(|taxed| taxed.checked_div(Decimal::ONE_HUNDRED))
            .ok_or(AmountOutOfRange)?;
        let total = subtotal.checked_add(tax_amount).ok_or(AmountOutOfRange)?;
        Ok(Totals {
            subtotal,
            tax_amount,
            total,
        })
    }
}

/// A priced proposal of line items for a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: u32,

    /// `QT-<year>-<id>`, assigned once at creation
    pub quotation_number: String,

    pub client_id: u32,
    pub client_name: String,
    pub items: Vec<QuotationItem>,
    pub subtotal: Decimal,

    /// Percentage, e.g. 18 for 18%
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub status: QuotationStatus,
    pub created_by: String,
    pub created_by_name: String,
    pub created_date: NaiveDate,
    pub valid_until: NaiveDate,
    pub approved_by: Option<String>,
    pub approved_date: Option<NaiveDate>,
    pub notes: String,
}

impl Quotation {
    /// Recomputes subtotal, tax and total from the current items and tax rate.
    ///
    /// Leaves the quotation untouched when any figure overflows.
    pub fn recompute_totals(&mut self) -> Result<(), AmountOutOfRange> {
        let totals = Totals::compute(&self.items, self.tax_rate)?;
        self.subtotal = totals.subtotal;
        self.tax_amount = totals.tax_amount;
        self.total = totals.total;
        Ok(())
    }
}

/// Quotation creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewQuotation {
    pub client_id: u32,
    #[validate(length(min = 1, message = "At least one item is required"), nested)]
    pub items: Vec<QuotationItemInput>,
    #[validate(custom(function = "percentage"))]
    pub tax_rate: Decimal,
    /// Draft (default) or Pending
    pub status: Option<QuotationStatus>,
    pub created_by: Option<String>,
    pub created_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
}

/// Quotation update request.
///
/// Totals are never accepted from callers; they follow `items` and `tax_rate`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuotationPatch {
    pub client_id: Option<u32>,
    #[validate(length(min = 1, message = "At least one item is required"), nested)]
    pub items: Option<Vec<QuotationItemInput>>,
    #[validate(custom(function = "percentage"))]
    pub tax_rate: Option<Decimal>,
    pub status: Option<QuotationStatus>,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Body of the approve action. The approver defaults to the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub approved_by: Option<String>,
}
