//! Storage layer.
//!
//! [`Storage`] is the single authority over entity state: it assigns ids,
//! computes derived fields, applies cross-entity effects and appends
//! [`Activity`] records. [`MemStorage`] keeps everything in process memory.

pub mod dashboard;
pub mod memory;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::models::{
    Activity, AmountOutOfRange, Client, ClientPatch, DashboardMetrics, Invoice, Lead, LeadPatch, NewActivity, NewClient, NewInvoice,
    NewLead, NewQuotation, NewTicket, NewUser, Note, PaymentInput, Quotation, QuotationPatch, Ticket, TicketPatch,
    TicketStatus, User,
};

pub use memory::MemStorage;

/// Days between invoice generation and its due date.
pub const PAYMENT_TERMS_DAYS: i64 = 30;

/// Maximum number of entries returned by [`Storage::list_activities`].
pub const ACTIVITY_FEED_LIMIT: usize = 50;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    BusinessRule(String),

    #[error("{0}")]
    Validation(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StorageError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<AmountOutOfRange> for StorageError {
    fn from(error: AmountOutOfRange) -> Self {
        StorageError::Validation(error.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Repository interface for every entity family.
///
/// `list_*` operations return records newest first. `get_*` and mutating
/// operations on a missing id fail with [`StorageError::NotFound`]; `delete_*`
/// report whether a record existed instead.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Current calendar date used for every date stamp.
    fn today(&self) -> NaiveDate;

    // Users
    async fn get_user(&self, id: &str) -> StorageResult<User>;
    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> StorageResult<User>;
    async fn list_users(&self) -> StorageResult<Vec<User>>;

    // Leads
    async fn list_leads(&self) -> StorageResult<Vec<Lead>>;
    async fn get_lead(&self, id: u32) -> StorageResult<Lead>;
    async fn create_lead(&self, lead: NewLead) -> StorageResult<Lead>;
    async fn update_lead(&self, id: u32, patch: LeadPatch) -> StorageResult<Lead>;
    async fn delete_lead(&self, id: u32) -> StorageResult<bool>;
    async fn add_lead_note(&self, id: u32, note: Note) -> StorageResult<Lead>;
    /// Converts a lead into a new client.
    ///
    /// # Arguments
    ///
    /// * `id` - Lead to convert
    ///
    /// # Returns
    ///
    /// Returns the created client, linked back to the lead. The lead itself
    /// moves to Converted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the lead does not exist and
    /// [`StorageError::BusinessRule`] if it was already converted. Nothing is
    /// created in either case.
    async fn convert_lead_to_client(&self, id: u32) -> StorageResult<Client>;

    // Clients
    async fn list_clients(&self) -> StorageResult<Vec<Client>>;
    async fn get_client(&self, id: u32) -> StorageResult<Client>;
    async fn create_client(&self, client: NewClient) -> StorageResult<Client>;
    async fn update_client(&self, id: u32, patch: ClientPatch) -> StorageResult<Client>;
    async fn delete_client(&self, id: u32) -> StorageResult<bool>;

    // Quotations
    async fn list_quotations(&self) -> StorageResult<Vec<Quotation>>;
    async fn get_quotation(&self, id: u32) -> StorageResult<Quotation>;
    /// Creates a quotation with its number and totals derived from the items.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for an unknown client and
    /// [`StorageError::Validation`] when the status is not Draft or Pending or
    /// an amount falls outside the representable range.
    async fn create_quotation(&self, quotation: NewQuotation) -> StorageResult<Quotation>;
    async fn update_quotation(&self, id: u32, patch: QuotationPatch) -> StorageResult<Quotation>;
    async fn submit_quotation(&self, id: u32, submitted_by: &str) -> StorageResult<Quotation>;
    async fn approve_quotation(&self, id: u32, approved_by: &str) -> StorageResult<Quotation>;
    async fn reject_quotation(&self, id: u32, rejected_by: &str) -> StorageResult<Quotation>;

    // Invoices
    async fn list_invoices(&self) -> StorageResult<Vec<Invoice>>;
    async fn get_invoice(&self, id: u32) -> StorageResult<Invoice>;

    /// Creates an invoice from an Approved, not yet invoiced quotation,
    /// copying its items and amounts.
    async fn create_invoice(&self, invoice: NewInvoice) -> StorageResult<Invoice>;
    /// Records a payment against an invoice.
    ///
    /// # Arguments
    ///
    /// * `id` - Invoice being paid
    /// * `payment` - Amount, method and reference; the date defaults to today
    ///
    /// # Returns
    ///
    /// Returns the updated invoice. The payment that settles it credits the
    /// invoice total to the client's revenue exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BusinessRule`] if the invoice is already paid and
    /// [`StorageError::Validation`] if the paid amount would overflow.
    async fn record_payment(&self, id: u32, payment: PaymentInput) -> StorageResult<Invoice>;
    async fn mark_invoice_as_sent(&self, id: u32) -> StorageResult<Invoice>;

    /// Moves every open invoice due before `today` to Overdue and returns them.
    async fn mark_overdue_invoices(&self, today: NaiveDate) -> StorageResult<Vec<Invoice>>;

    // Tickets
    async fn list_tickets(&self) -> StorageResult<Vec<Ticket>>;
    async fn get_ticket(&self, id: u32) -> StorageResult<Ticket>;
    async fn create_ticket(&self, ticket: NewTicket) -> StorageResult<Ticket>;
    async fn update_ticket(&self, id: u32, patch: TicketPatch) -> StorageResult<Ticket>;
    async fn add_ticket_note(&self, id: u32, note: Note) -> StorageResult<Ticket>;
    async fn update_ticket_status(&self, id: u32, status: TicketStatus) -> StorageResult<Ticket>;

    // Activities
    async fn list_activities(&self) -> StorageResult<Vec<Activity>>;
    async fn record_activity(&self, activity: NewActivity) -> StorageResult<Activity>;

    // Dashboard
    async fn dashboard_metrics(&self) -> StorageResult<DashboardMetrics>;

    /// Generates the invoice for a quotation, due [`PAYMENT_TERMS_DAYS`] after today.
    async fn generate_invoice(&self, quotation_id: u32) -> StorageResult<Invoice> {
        let quotation = self.get_quotation(quotation_id).await?;
        let today = self.today();
        self.create_invoice(NewInvoice {
            quotation_id,
            generated_date: today,
            due_date: today + Duration::days(PAYMENT_TERMS_DAYS),
            notes: quotation.notes,
        })
        .await
    }
}
