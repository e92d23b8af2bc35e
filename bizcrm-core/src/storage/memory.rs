use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    document_number, Activity, AmountOutOfRange, Client, ClientPatch, DashboardMetrics, Invoice, InvoiceStatus, Lead, LeadPatch,
    LeadStatus, NewActivity, NewClient, NewInvoice, NewLead, NewQuotation, NewTicket, NewUser, Note, PaymentInput,
    Quotation, QuotationItem, QuotationPatch, QuotationStatus, Ticket, TicketPatch, TicketStatus, Totals, User,
};
use crate::storage::dashboard::compute_metrics;
use crate::storage::{Storage, StorageError, StorageResult, ACTIVITY_FEED_LIMIT};

/// Source of the current time.
pub type Clock = fn() -> DateTime<Utc>;

/// Quotations stay valid for this many days unless a date is given.
const QUOTATION_VALIDITY_DAYS: i64 = 30;

const SYSTEM_USER: &str = "system";

/// Monotonic per-entity id counter. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
struct IdSequence(u32);

impl IdSequence {
    fn next(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, User>,
    leads: BTreeMap<u32, Lead>,
    clients: BTreeMap<u32, Client>,
    quotations: BTreeMap<u32, Quotation>,
    invoices: BTreeMap<u32, Invoice>,
    tickets: BTreeMap<u32, Ticket>,
    activities: Vec<Activity>,

    lead_ids: IdSequence,
    client_ids: IdSequence,
    quotation_ids: IdSequence,
    invoice_ids: IdSequence,
    ticket_ids: IdSequence,
    activity_ids: IdSequence,
}

impl Tables {
    /// Display name of a user, falling back to the username itself.
    fn display_name(&self, username: &str) -> String {
        self.users
            .values()
            .find(|user| user.username == username)
            .map(|user| user.name.clone())
            .unwrap_or_else(|| username.to_string())
    }

    fn client(&self, id: u32) -> StorageResult<&Client> {
        self.clients.get(&id).ok_or_else(|| StorageError::not_found("Client", id))
    }

    fn log(&mut self, timestamp: DateTime<Utc>, activity: NewActivity) -> Activity {
        let activity = Activity {
            id: self.activity_ids.next(),
            timestamp,
            user: activity.user,
            action: activity.action,
            entity: activity.entity,
            entity_id: activity.entity_id,
        };
        self.activities.push(activity.clone());
        activity
    }

    fn insert_client(&mut self, input: NewClient, now: DateTime<Utc>) -> Client {
        let id = self.client_ids.next();
        let client = Client {
            id,
            name: input.name,
            email: input.email,
            phone: input.phone,
            company: input.company,
            address: input.address,
            created_date: input.created_date.unwrap_or_else(|| now.date_naive()),
            total_revenue: Default::default(),
            lead_id: input.lead_id,
        };
        self.clients.insert(id, client.clone());
        self.log(now, NewActivity::new(SYSTEM_USER, "created client", &client.name, Some(id)));
        info!(client_id = id, "Created client {}", client.name);
        client
    }

    fn transition_quotation(&mut self, id: u32, next: QuotationStatus) -> StorageResult<Quotation> {
        let mut quotation = self
            .quotations
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Quotation", id))?;

        if !quotation.status.can_transition_to(next) {
            return Err(StorageError::BusinessRule(format!(
                "Quotation {} cannot move from {} to {}",
                quotation.quotation_number, quotation.status, next
            )));
        }
        quotation.status = next;
        Ok(quotation)
    }
}

/// Clones records ordered by `key`, newest first.
fn newest_first<'a, T, K>(records: impl Iterator<Item = &'a T>, key: K) -> Vec<T>
where
    T: Clone + 'a,
    K: Fn(&T) -> (NaiveDate, u32),
{
    let mut records: Vec<T> = records.cloned().collect();
    records.sort_by(|a, b| key(b).cmp(&key(a)));
    records
}

/// In-memory [`Storage`] implementation.
///
/// All tables sit behind a single lock, so each operation, including its
/// cross-entity effects and its activity entry, is applied atomically.
pub struct MemStorage {
    tables: RwLock<Tables>,
    clock: Clock,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Creates an empty store that reads the time from `clock`.
    ///
    /// # Arguments
    ///
    /// * `clock` - Source of "now" for created dates, document years and the activity log
    ///
    /// # Returns
    ///
    /// Returns a `MemStorage` with no records and every id counter at zero.
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            clock,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemStorage {
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    // Users

    async fn get_user(&self, id: &str) -> StorageResult<User> {
        let tables = self.tables.read().await;
        tables.users.get(id).cloned().ok_or_else(|| StorageError::not_found("User", id))
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|user| user.username == username).cloned())
    }

    async fn create_user(&self, input: NewUser) -> StorageResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|user| user.username == input.username) {
            return Err(StorageError::BusinessRule(format!(
                "Username {} is already taken",
                input.username
            )));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: input.username,
            password_hash: input.password_hash,
            role: input.role,
            name: input.name,
        };
        tables.users.insert(user.id.clone(), user.clone());
        debug!(username = %user.username, role = %user.role, "Created user");
        Ok(user)
    }

    async fn list_users(&self) -> StorageResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    // Leads

    async fn list_leads(&self) -> StorageResult<Vec<Lead>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.leads.values(), |lead| (lead.created_date, lead.id)))
    }

    async fn get_lead(&self, id: u32) -> StorageResult<Lead> {
        let tables = self.tables.read().await;
        tables.leads.get(&id).cloned().ok_or_else(|| StorageError::not_found("Lead", id))
    }

    async fn create_lead(&self, input: NewLead) -> StorageResult<Lead> {
        let status = input.status.unwrap_or(LeadStatus::New);
        if status == LeadStatus::Converted {
            return Err(StorageError::Validation(
                "Leads become Converted only through conversion".to_string(),
            ));
        }

        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let id = tables.lead_ids.next();
        let lead = Lead {
            id,
            assigned_to_name: tables.display_name(&input.assigned_to),
            name: input.name,
            email: input.email,
            phone: input.phone,
            company: input.company,
            source: input.source,
            status,
            assigned_to: input.assigned_to,
            created_date: input.created_date.unwrap_or_else(|| now.date_naive()),
            notes: input.notes,
            converted_to_client_id: None,
        };
        tables.leads.insert(id, lead.clone());
        tables.log(now, NewActivity::new(&lead.assigned_to, "created lead", &lead.name, Some(id)));

        info!(lead_id = id, "Created lead {}", lead.name);
        Ok(lead)
    }

    async fn update_lead(&self, id: u32, patch: LeadPatch) -> StorageResult<Lead> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let mut lead = tables.leads.get(&id).cloned().ok_or_else(|| StorageError::not_found("Lead", id))?;

        if let Some(status) = patch.status {
            if lead.status == LeadStatus::Converted && status != LeadStatus::Converted {
                return Err(StorageError::BusinessRule(
                    "Converted leads cannot change status".to_string(),
                ));
            }
            if lead.status != LeadStatus::Converted && status == LeadStatus::Converted {
                return Err(StorageError::BusinessRule(
                    "Use lead conversion to mark a lead as Converted".to_string(),
                ));
            }
            lead.status = status;
        }

        if let Some(assigned_to) = patch.assigned_to {
            lead.assigned_to_name = tables.display_name(&assigned_to);
            lead.assigned_to = assigned_to;
        }
        if let Some(name) = patch.name {
            lead.name = name;
        }
        if let Some(email) = patch.email {
            lead.email = email;
        }
        if let Some(phone) = patch.phone {
            lead.phone = phone;
        }
        if let Some(company) = patch.company {
            lead.company = company;
        }
        if let Some(source) = patch.source {
            lead.source = source;
        }
        if let Some(created_date) = patch.created_date {
            lead.created_date = created_date;
        }

        tables.leads.insert(id, lead.clone());
        debug!(lead_id = id, "Updated lead");
        Ok(lead)
    }

    async fn delete_lead(&self, id: u32) -> StorageResult<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.leads.remove(&id).is_some();
        if removed {
            info!(lead_id = id, "Deleted lead");
        }
        Ok(removed)
    }

    async fn add_lead_note(&self, id: u32, note: Note) -> StorageResult<Lead> {
        let mut tables = self.tables.write().await;
        let lead = tables.leads.get_mut(&id).ok_or_else(|| StorageError::not_found("Lead", id))?;
        lead.notes.push(note);
        Ok(lead.clone())
    }

    async fn convert_lead_to_client(&self, id: u32) -> StorageResult<Client> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let mut lead = tables.leads.get(&id).cloned().ok_or_else(|| StorageError::not_found("Lead", id))?;
        if lead.status == LeadStatus::Converted {
            return Err(StorageError::BusinessRule(format!(
                "Lead {} has already been converted",
                lead.name
            )));
        }

        let client = tables.insert_client(
            NewClient {
                name: lead.name.clone(),
                email: lead.email.clone(),
                phone: lead.phone.clone(),
                company: lead.company.clone(),
                address: String::new(),
                created_date: Some(now.date_naive()),
                lead_id: Some(id),
            },
            now,
        );

        lead.status = LeadStatus::Converted;
        lead.converted_to_client_id = Some(client.id);
        tables.log(now, NewActivity::new(&lead.assigned_to, "converted lead to client", &lead.name, Some(id)));
        tables.leads.insert(id, lead);

        info!(lead_id = id, client_id = client.id, "Converted lead to client");
        Ok(client)
    }

    // Clients

    async fn list_clients(&self) -> StorageResult<Vec<Client>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.clients.values(), |client| (client.created_date, client.id)))
    }

    async fn get_client(&self, id: u32) -> StorageResult<Client> {
        let tables = self.tables.read().await;
        tables.client(id).cloned()
    }

    async fn create_client(&self, input: NewClient) -> StorageResult<Client> {
        let now = self.now();
        let mut tables = self.tables.write().await;
        Ok(tables.insert_client(input, now))
    }

    async fn update_client(&self, id: u32, patch: ClientPatch) -> StorageResult<Client> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let mut client = tables.client(id)?.clone();
        if let Some(name) = patch.name {
            client.name = name;
        }
        if let Some(email) = patch.email {
            client.email = email;
        }
        if let Some(phone) = patch.phone {
            client.phone = phone;
        }
        if let Some(address) = patch.address {
            client.address = address;
        }
        if let Some(company) = patch.company {
            if company != client.company {
                // Open documents show the current company name; invoices keep their snapshot.
                for quotation in tables.quotations.values_mut().filter(|q| q.client_id == id) {
                    quotation.client_name = company.clone();
                }
                for ticket in tables.tickets.values_mut().filter(|t| t.client_id == id) {
                    ticket.client_name = company.clone();
                }
            }
            client.company = company;
        }

        tables.clients.insert(id, client.clone());
        tables.log(now, NewActivity::new(SYSTEM_USER, "updated client", &client.company, Some(id)));
        Ok(client)
    }

    async fn delete_client(&self, id: u32) -> StorageResult<bool> {
        let now = self.now();
        let mut tables = self.tables.write().await;
        match tables.clients.remove(&id) {
            Some(client) => {
                tables.log(now, NewActivity::new(SYSTEM_USER, "deleted client", &client.company, Some(id)));
                info!(client_id = id, "Deleted client");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // Quotations

    async fn list_quotations(&self) -> StorageResult<Vec<Quotation>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.quotations.values(), |q| (q.created_date, q.id)))
    }

    async fn get_quotation(&self, id: u32) -> StorageResult<Quotation> {
        let tables = self.tables.read().await;
        tables
            .quotations
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Quotation", id))
    }

    async fn create_quotation(&self, input: NewQuotation) -> StorageResult<Quotation> {
        let status = input.status.unwrap_or(QuotationStatus::Draft);
        if !matches!(status, QuotationStatus::Draft | QuotationStatus::Pending) {
            return Err(StorageError::Validation(
                "New quotations must be Draft or Pending".to_string(),
            ));
        }

        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let client_name = tables.client(input.client_id)?.company.clone();
        let created_by = input.created_by.unwrap_or_else(|| SYSTEM_USER.to_string());
        let created_date = input.created_date.unwrap_or_else(|| now.date_naive());

        let items = QuotationItem::price_all(input.items)?;
        let totals = Totals::compute(&items, input.tax_rate)?;

        let id = tables.quotation_ids.next();
        let quotation = Quotation {
            id,
            quotation_number: document_number("QT", now.year(), id),
            client_id: input.client_id,
            client_name,
            items,
            subtotal: totals.subtotal,
            tax_rate: input.tax_rate,
            tax_amount: totals.tax_amount,
            total: totals.total,
            status,
            created_by_name: tables.display_name(&created_by),
            created_by,
            created_date,
            valid_until: input
                .valid_until
                .unwrap_or_else(|| created_date + Duration::days(QUOTATION_VALIDITY_DAYS)),
            approved_by: None,
            approved_date: None,
            notes: input.notes,
        };

        tables.quotations.insert(id, quotation.clone());
        tables.log(
            now,
            NewActivity::new(&quotation.created_by, "created quotation", &quotation.quotation_number, Some(id)),
        );

        info!(quotation_id = id, total = %quotation.total, "Created quotation {}", quotation.quotation_number);
        Ok(quotation)
    }

    async fn update_quotation(&self, id: u32, patch: QuotationPatch) -> StorageResult<Quotation> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let mut quotation = tables
            .quotations
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Quotation", id))?;

        let reprices = patch.items.is_some() || patch.tax_rate.is_some() || patch.client_id.is_some();
        if quotation.status == QuotationStatus::Approved && reprices {
            return Err(StorageError::BusinessRule(format!(
                "Quotation {} is approved and can no longer be repriced",
                quotation.quotation_number
            )));
        }

        if let Some(status) = patch.status.filter(|status| *status != quotation.status) {
            if status == QuotationStatus::Approved {
                return Err(StorageError::BusinessRule(
                    "Use the approve action to approve a quotation".to_string(),
                ));
            }
            quotation = tables.transition_quotation(id, status)?;
        }

        if let Some(client_id) = patch.client_id {
            quotation.client_name = tables.client(client_id)?.company.clone();
            quotation.client_id = client_id;
        }
        if let Some(items) = patch.items {
            quotation.items = QuotationItem::price_all(items)?;
        }
        if let Some(tax_rate) = patch.tax_rate {
            quotation.tax_rate = tax_rate;
        }
        if let Some(valid_until) = patch.valid_until {
            quotation.valid_until = valid_until;
        }
        if let Some(notes) = patch.notes {
            quotation.notes = notes;
        }
        quotation.recompute_totals()?;

        tables.quotations.insert(id, quotation.clone());
        debug!(quotation_id = id, "Updated quotation");
        Ok(quotation)
    }

    async fn submit_quotation(&self, id: u32, submitted_by: &str) -> StorageResult<Quotation> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let quotation = tables.transition_quotation(id, QuotationStatus::Pending)?;
        tables.quotations.insert(id, quotation.clone());
        tables.log(
            now,
            NewActivity::new(submitted_by, "submitted quotation", &quotation.quotation_number, Some(id)),
        );
        Ok(quotation)
    }

    async fn approve_quotation(&self, id: u32, approved_by: &str) -> StorageResult<Quotation> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let mut quotation = tables.transition_quotation(id, QuotationStatus::Approved)?;
        quotation.approved_by = Some(approved_by.to_string());
        quotation.approved_date = Some(now.date_naive());
        tables.quotations.insert(id, quotation.clone());
        tables.log(
            now,
            NewActivity::new(approved_by, "approved quotation", &quotation.quotation_number, Some(id)),
        );

        info!(quotation_id = id, approved_by, "Approved quotation {}", quotation.quotation_number);
        Ok(quotation)
    }

    async fn reject_quotation(&self, id: u32, rejected_by: &str) -> StorageResult<Quotation> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let quotation = tables.transition_quotation(id, QuotationStatus::Rejected)?;
        tables.quotations.insert(id, quotation.clone());
        tables.log(
            now,
            NewActivity::new(rejected_by, "rejected quotation", &quotation.quotation_number, Some(id)),
        );
        Ok(quotation)
    }

    // Invoices

    async fn list_invoices(&self) -> StorageResult<Vec<Invoice>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.invoices.values(), |invoice| {
            (invoice.generated_date, invoice.id)
        }))
    }

    async fn get_invoice(&self, id: u32) -> StorageResult<Invoice> {
        let tables = self.tables.read().await;
        tables
            .invoices
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Invoice", id))
    }

    async fn create_invoice(&self, input: NewInvoice) -> StorageResult<Invoice> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let quotation = tables
            .quotations
            .get(&input.quotation_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Quotation", input.quotation_id))?;

        if quotation.status != QuotationStatus::Approved {
            return Err(StorageError::BusinessRule("Quotation must be approved first".to_string()));
        }
        if let Some(existing) = tables.invoices.values().find(|inv| inv.quotation_id == quotation.id) {
            return Err(StorageError::BusinessRule(format!(
                "Quotation {} has already been invoiced as {}",
                quotation.quotation_number, existing.invoice_number
            )));
        }

        let (client_name, client_address) = match tables.clients.get(&quotation.client_id) {
            Some(client) => (client.company.clone(), client.address.clone()),
            None => {
                warn!(client_id = quotation.client_id, "Invoicing a quotation whose client no longer exists");
                (quotation.client_name.clone(), String::new())
            }
        };

        let id = tables.invoice_ids.next();
        let invoice = Invoice {
            id,
            invoice_number: document_number("INV", now.year(), id),
            quotation_id: quotation.id,
            client_id: quotation.client_id,
            client_name,
            client_address,
            items: quotation.items,
            subtotal: quotation.subtotal,
            tax_amount: quotation.tax_amount,
            total: quotation.total,
            status: InvoiceStatus::Generated,
            generated_date: input.generated_date,
            sent_date: None,
            due_date: input.due_date,
            paid_date: None,
            paid_amount: Default::default(),
            payment_method: None,
            transaction_ref: None,
            notes: input.notes,
        };

        tables.invoices.insert(id, invoice.clone());
        tables.log(
            now,
            NewActivity::new(SYSTEM_USER, "generated invoice", &invoice.invoice_number, Some(id)),
        );

        info!(
            invoice_id = id,
            quotation_id = invoice.quotation_id,
            total = %invoice.total,
            "Generated invoice {}",
            invoice.invoice_number
        );
        Ok(invoice)
    }

    async fn record_payment(&self, id: u32, payment: PaymentInput) -> StorageResult<Invoice> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let mut invoice = tables
            .invoices
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Invoice", id))?;

        if invoice.status == InvoiceStatus::Paid {
            return Err(StorageError::BusinessRule(format!(
                "Invoice {} is already paid",
                invoice.invoice_number
            )));
        }

        let paid_on = payment.payment_date.unwrap_or_else(|| now.date_naive());
        let settled = invoice.apply_payment(&payment, paid_on)?;

        if settled {
            match tables.clients.get_mut(&invoice.client_id) {
                Some(client) => {
                    client.total_revenue = client
                        .total_revenue
                        .checked_add(invoice.total)
                        .ok_or(AmountOutOfRange)?;
                }
                None => warn!(
                    client_id = invoice.client_id,
                    "Invoice {} settled for a client that no longer exists", invoice.invoice_number
                ),
            }
        }

        tables.invoices.insert(id, invoice.clone());
        tables.log(
            now,
            NewActivity::new(SYSTEM_USER, "recorded payment for invoice", &invoice.invoice_number, Some(id)),
        );

        info!(
            invoice_id = id,
            amount = %payment.payment_amount,
            status = %invoice.status,
            "Recorded payment for invoice {}",
            invoice.invoice_number
        );
        Ok(invoice)
    }

    async fn mark_invoice_as_sent(&self, id: u32) -> StorageResult<Invoice> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let mut invoice = tables
            .invoices
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Invoice", id))?;

        if !invoice.paid_amount.is_zero() {
            return Err(StorageError::BusinessRule(format!(
                "Invoice {} already has payments recorded",
                invoice.invoice_number
            )));
        }

        invoice.status = InvoiceStatus::Sent;
        invoice.sent_date = Some(now.date_naive());
        tables.invoices.insert(id, invoice.clone());
        tables.log(
            now,
            NewActivity::new(SYSTEM_USER, "sent invoice", &invoice.invoice_number, Some(id)),
        );
        Ok(invoice)
    }

    async fn mark_overdue_invoices(&self, today: NaiveDate) -> StorageResult<Vec<Invoice>> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let mut overdue = Vec::new();
        for invoice in tables.invoices.values_mut() {
            if invoice.status.is_open() && invoice.due_date < today {
                invoice.status = InvoiceStatus::Overdue;
                overdue.push(invoice.clone());
            }
        }
        for invoice in &overdue {
            tables.log(
                now,
                NewActivity::new(SYSTEM_USER, "marked invoice overdue", &invoice.invoice_number, Some(invoice.id)),
            );
        }
        Ok(overdue)
    }

    // Tickets

    async fn list_tickets(&self) -> StorageResult<Vec<Ticket>> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.tickets.values(), |ticket| (ticket.created_date, ticket.id)))
    }

    async fn get_ticket(&self, id: u32) -> StorageResult<Ticket> {
        let tables = self.tables.read().await;
        tables.tickets.get(&id).cloned().ok_or_else(|| StorageError::not_found("Ticket", id))
    }

    async fn create_ticket(&self, input: NewTicket) -> StorageResult<Ticket> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let client_name = tables.client(input.client_id)?.company.clone();
        let id = tables.ticket_ids.next();
        let mut ticket = Ticket {
            id,
            ticket_number: document_number("TKT", now.year(), id),
            client_id: input.client_id,
            client_name,
            title: input.title,
            description: input.description,
            priority: input.priority,
            status: TicketStatus::Open,
            assigned_to_name: tables.display_name(&input.assigned_to),
            assigned_to: input.assigned_to,
            created_date: input.created_date.unwrap_or_else(|| now.date_naive()),
            created_by: input.created_by.unwrap_or_else(|| SYSTEM_USER.to_string()),
            notes: input.notes,
            resolved_date: None,
            closed_date: None,
        };
        if let Some(status) = input.status {
            ticket.apply_status(status, now.date_naive());
        }

        tables.tickets.insert(id, ticket.clone());
        tables.log(
            now,
            NewActivity::new(&ticket.created_by, "created ticket", &ticket.ticket_number, Some(id)),
        );

        info!(ticket_id = id, priority = ?ticket.priority, "Created ticket {}", ticket.ticket_number);
        Ok(ticket)
    }

    async fn update_ticket(&self, id: u32, patch: TicketPatch) -> StorageResult<Ticket> {
        let today = self.today();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let mut ticket = tables.tickets.get(&id).cloned().ok_or_else(|| StorageError::not_found("Ticket", id))?;

        if let Some(client_id) = patch.client_id {
            ticket.client_name = tables.client(client_id)?.company.clone();
            ticket.client_id = client_id;
        }
        if let Some(assigned_to) = patch.assigned_to {
            ticket.assigned_to_name = tables.display_name(&assigned_to);
            ticket.assigned_to = assigned_to;
        }
        if let Some(title) = patch.title {
            ticket.title = title;
        }
        if let Some(description) = patch.description {
            ticket.description = description;
        }
        if let Some(priority) = patch.priority {
            ticket.priority = priority;
        }
        if let Some(status) = patch.status {
            ticket.apply_status(status, today);
        }

        tables.tickets.insert(id, ticket.clone());
        debug!(ticket_id = id, "Updated ticket");
        Ok(ticket)
    }

    async fn add_ticket_note(&self, id: u32, note: Note) -> StorageResult<Ticket> {
        let mut tables = self.tables.write().await;
        let ticket = tables.tickets.get_mut(&id).ok_or_else(|| StorageError::not_found("Ticket", id))?;
        ticket.notes.push(note);
        Ok(ticket.clone())
    }

    async fn update_ticket_status(&self, id: u32, status: TicketStatus) -> StorageResult<Ticket> {
        let now = self.now();
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let ticket = tables.tickets.get_mut(&id).ok_or_else(|| StorageError::not_found("Ticket", id))?;
        ticket.apply_status(status, now.date_naive());
        let ticket = ticket.clone();

        tables.log(
            now,
            NewActivity::new(&ticket.assigned_to, "updated ticket status", &ticket.ticket_number, Some(id)),
        );
        Ok(ticket)
    }

    // Activities

    async fn list_activities(&self) -> StorageResult<Vec<Activity>> {
        let tables = self.tables.read().await;
        let mut activities = tables.activities.clone();
        activities.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        activities.truncate(ACTIVITY_FEED_LIMIT);
        Ok(activities)
    }

    async fn record_activity(&self, activity: NewActivity) -> StorageResult<Activity> {
        let now = self.now();
        let mut tables = self.tables.write().await;
        Ok(tables.log(now, activity))
    }

    // Dashboard

    async fn dashboard_metrics(&self) -> StorageResult<DashboardMetrics> {
        let today = self.today();
        let tables = self.tables.read().await;
        Ok(compute_metrics(
            tables.leads.values(),
            tables.clients.len(),
            tables.quotations.values(),
            tables.invoices.values(),
            today,
        ))
    }
}
