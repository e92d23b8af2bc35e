pub mod activity;
pub mod client;
pub mod dashboard;
pub mod invoice;
pub mod lead;
pub mod note;
pub mod quotation;
pub mod ticket;
pub mod user;

pub use activity::{Activity, NewActivity};
pub use client::{Client, ClientPatch, NewClient};
pub use dashboard::{DashboardMetrics, LeadStatusDistribution, MonthlyRevenue, QuotationStatusDistribution};
pub use invoice::{Invoice, InvoiceStatus, NewInvoice, PaymentInput, PaymentMethod};
pub use lead::{Lead, LeadPatch, LeadSource, LeadStatus, NewLead};
pub use note::{NewNote, Note};
pub use quotation::{
    ApprovalRequest, NewQuotation, Quotation, QuotationItem, QuotationItemInput, QuotationPatch, QuotationStatus, Totals,
};
pub use ticket::{NewTicket, Ticket, TicketPatch, TicketPriority, TicketStatus, TicketStatusUpdate};
pub use user::{NewUser, Role, User, UserResponse};

use rust_decimal::Decimal;
use thiserror::Error;
use validator::ValidationError;

/// Largest unit price or payment amount accepted from callers.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Money arithmetic left the range `Decimal` can represent.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("amount out of range")]
pub struct AmountOutOfRange;

/// Formats a document number such as `QT-2025-007`.
pub(crate) fn document_number(prefix: &str, year: i32, id: u32) -> String {
    format!("{}-{}-{:03}", prefix, year, id)
}

pub(crate) fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative").with_message("must not be negative".into()));
    }
    Ok(())
}

pub(crate) fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("positive").with_message("must be greater than zero".into()));
    }
    Ok(())
}

pub(crate) fn within_amount_limit(value: &Decimal) -> Result<(), ValidationError> {
    if *value > MAX_AMOUNT {
        return Err(ValidationError::new("amount_limit").with_message("must not exceed 1000000000000".into()));
    }
    Ok(())
}

pub(crate) fn percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage").with_message("must be between 0 and 100".into()));
    }
    Ok(())
}
