use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use super::quotation::QuotationItem;
use super::{positive, within_amount_limit, AmountOutOfRange};

/// Invoice status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Generated,
    Sent,
    Paid,
    Overdue,
    #[serde(rename = "Partially Paid")]
    PartiallyPaid,
}

impl InvoiceStatus {
    /// Statuses that the overdue sweep may move to `Overdue`.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            InvoiceStatus::Generated | InvoiceStatus::Sent | InvoiceStatus::PartiallyPaid
        )
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Generated => write!(f, "Generated"),
            InvoiceStatus::Sent => write!(f, "Sent"),
            InvoiceStatus::Paid => write!(f, "Paid"),
            InvoiceStatus::Overdue => write!(f, "Overdue"),
            InvoiceStatus::PartiallyPaid => write!(f, "Partially Paid"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Check,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "UPI")]
    Upi,
}

/// Invoice model.
///
/// Items and amounts are copied from the source quotation when the invoice
/// is generated and are never recomputed. Client name and address are a
/// snapshot taken at the same time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: u32,

    /// `INV-<year>-<id>`, assigned once at creation
    pub invoice_number: String,

    pub quotation_id: u32,
    pub client_id: u32,
    pub client_name: String,
    pub client_address: String,
    pub items: Vec<QuotationItem>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub status: InvoiceStatus,
    pub generated_date: NaiveDate,
    pub sent_date: Option<NaiveDate>,
    pub due_date: NaiveDate,

    /// Date of the latest payment
    pub paid_date: Option<NaiveDate>,

    /// Running sum of all recorded payments
    pub paid_amount: Decimal,

    /// Method of the latest payment
    pub payment_method: Option<PaymentMethod>,

    /// Reference of the latest payment
    pub transaction_ref: Option<String>,

    pub notes: String,
}

impl Invoice {
    /// Amount still owed on this invoice.
    pub fn balance(&self) -> Decimal {
        self.total - self.paid_amount
    }

    /// Adds a payment and moves the status forward.
    ///
    /// Returns `true` when this payment is the one that settled the invoice.
    /// The invoice is left untouched if the running total would overflow.
    pub fn apply_payment(&mut self, payment: &PaymentInput, paid_on: NaiveDate) -> Result<bool, AmountOutOfRange> {
        self.paid_amount = self
            .paid_amount
            .checked_add(payment.payment_amount)
            .ok_or(AmountOutOfRange)?;
        self.paid_date = Some(paid_on);
        self.payment_method = Some(payment.payment_method);
        self.transaction_ref = Some(payment.transaction_ref.clone());

        if self.paid_amount >= self.total {
            self.status = InvoiceStatus::Paid;
            Ok(true)
        } else {
            if self.paid_amount > Decimal::ZERO {
                self.status = InvoiceStatus::PartiallyPaid;
            }
            Ok(false)
        }
    }
}

/// Invoice creation request. Everything else is copied from the quotation.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub quotation_id: u32,
    pub generated_date: NaiveDate,
    pub due_date: NaiveDate,
    pub notes: String,
}

/// A payment recorded against an invoice.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInput {
    /// Defaults to today
    pub payment_date: Option<NaiveDate>,
    #[validate(custom(function = "positive"), custom(function = "within_amount_limit"))]
    pub payment_amount: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub transaction_ref: String,
    #[serde(default)]
    pub notes: String,
}
