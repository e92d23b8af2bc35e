//! Demo users and sample data loaded at startup.
//!
//! Sample records are created through the regular [`Storage`] operations so
//! numbering, derived totals, revenue and the activity feed all come out the
//! same as for data entered through the API. Dates are relative to the
//! store's current day.

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::models::{
    LeadSource, LeadStatus, NewClient, NewInvoice, NewLead, NewQuotation, NewTicket, NewUser, Note, PaymentInput,
    PaymentMethod, QuotationItemInput, QuotationStatus, Role, TicketPriority, TicketStatus,
};
use crate::storage::{Storage, StorageError, PAYMENT_TERMS_DAYS};

/// (username, password, role, display name)
const DEMO_USERS: [(&str, &str, Role); 6] = [
    ("admin", "admin123", Role::Admin),
    ("manager", "manager123", Role::Manager),
    ("exec", "exec123", Role::Exec),
    ("accountant", "acc123", Role::Accountant),
    ("engineer", "eng123", Role::Engineer),
    ("client", "client123", Role::Client),
];

/// Creates the demo users, skipping any username that already exists.
pub async fn seed_users(storage: &dyn Storage, bcrypt_cost: u32) -> anyhow::Result<()> {
    for (username, password, role) in DEMO_USERS {
        if storage.get_user_by_username(username).await?.is_some() {
            continue;
        }
        let password_hash =
            hash_password(password, bcrypt_cost).with_context(|| format!("Failed to hash password for {}", username))?;
        storage
            .create_user(NewUser {
                username: username.to_string(),
                password_hash,
                role,
                name: role.display_name().to_string(),
            })
            .await?;
        debug!(username, "Seeded user");
    }
    Ok(())
}

struct SeedLead {
    name: &'static str,
    email: &'static str,
    phone: &'static str,
    company: &'static str,
    source: LeadSource,
    status: LeadStatus,
    assigned_to: &'static str,
    days_ago: i64,
}

const LEADS: [SeedLead; 10] = [
    SeedLead { name: "John Smith", email: "john.smith@techcorp.com", phone: "+1-555-0101", company: "TechCorp Inc", source: LeadSource::Website, status: LeadStatus::New, assigned_to: "exec", days_ago: 13 },
    SeedLead { name: "Sarah Johnson", email: "sarah.j@innovate.com", phone: "+1-555-0102", company: "Innovate Solutions", source: LeadSource::Referral, status: LeadStatus::InProgress, assigned_to: "exec", days_ago: 12 },
    SeedLead { name: "Michael Brown", email: "mbrown@buildco.com", phone: "+1-555-0103", company: "BuildCo Ltd", source: LeadSource::ColdCall, status: LeadStatus::InProgress, assigned_to: "exec", days_ago: 10 },
    SeedLead { name: "Emily Davis", email: "emily.d@startupx.io", phone: "+1-555-0104", company: "StartupX", source: LeadSource::SocialMedia, status: LeadStatus::Converted, assigned_to: "exec", days_ago: 8 },
    SeedLead { name: "Robert Wilson", email: "rwilson@megasoft.com", phone: "+1-555-0105", company: "MegaSoft Corp", source: LeadSource::Website, status: LeadStatus::Converted, assigned_to: "manager", days_ago: 7 },
    SeedLead { name: "Jennifer Martinez", email: "jen.m@cloudsys.com", phone: "+1-555-0106", company: "CloudSys Technologies", source: LeadSource::Referral, status: LeadStatus::New, assigned_to: "exec", days_ago: 6 },
    SeedLead { name: "David Lee", email: "david.lee@dataflow.com", phone: "+1-555-0107", company: "DataFlow Analytics", source: LeadSource::Website, status: LeadStatus::InProgress, assigned_to: "manager", days_ago: 5 },
    SeedLead { name: "Lisa Anderson", email: "landerson@webdev.io", phone: "+1-555-0108", company: "WebDev Studio", source: LeadSource::ColdCall, status: LeadStatus::Lost, assigned_to: "exec", days_ago: 4 },
    SeedLead { name: "James Taylor", email: "jtaylor@enterprise.com", phone: "+1-555-0109", company: "Enterprise Solutions", source: LeadSource::SocialMedia, status: LeadStatus::New, assigned_to: "exec", days_ago: 3 },
    SeedLead { name: "Maria Garcia", email: "maria.g@biztech.com", phone: "+1-555-0110", company: "BizTech Consulting", source: LeadSource::Referral, status: LeadStatus::InProgress, assigned_to: "manager", days_ago: 2 },
];

/// (name, email, phone, company, address, days ago)
const DIRECT_CLIENTS: [(&str, &str, &str, &str, &str, i64); 3] = [
    ("Patricia White", "pwhite@globaltech.com", "+1-555-0111", "GlobalTech Industries", "100 Business Park Dr, Suite 200, San Francisco, CA 94107", 43),
    ("Thomas Clark", "tclark@innovateinc.com", "+1-555-0112", "Innovate Inc", "250 Tech Center, Floor 5, Austin, TX 78701", 38),
    ("Angela Roberts", "aroberts@futuretech.com", "+1-555-0113", "FutureTech Solutions", "500 Innovation Blvd, Seattle, WA 98101", 33),
];

struct SeedQuotation {
    /// Index into the client list, newest client first
    client: usize,
    items: &'static [(&'static str, u32, i64)],
    status: QuotationStatus,
    created_by: &'static str,
    days_ago: i64,
    notes: &'static str,
}

const QUOTATIONS: [SeedQuotation; 8] = [
    SeedQuotation { client: 0, items: &[("Web Development - Custom Portal", 1, 15_000), ("SEO Optimization Package", 6, 800)], status: QuotationStatus::Draft, created_by: "exec", days_ago: 3, notes: "Standard payment terms: Net 30" },
    SeedQuotation { client: 1, items: &[("Mobile App Development", 1, 25_000), ("Backend API Integration", 1, 8_000)], status: QuotationStatus::Pending, created_by: "exec", days_ago: 2, notes: "Includes 3 months support" },
    SeedQuotation { client: 2, items: &[("Cloud Infrastructure Setup", 1, 12_000), ("Security Audit", 1, 5_000)], status: QuotationStatus::Approved, created_by: "manager", days_ago: 8, notes: "Priority project" },
    SeedQuotation { client: 3, items: &[("Digital Marketing Campaign", 3, 2_500), ("Content Creation", 10, 300)], status: QuotationStatus::Approved, created_by: "exec", days_ago: 10, notes: "Quarterly package" },
    SeedQuotation { client: 4, items: &[("CRM Implementation", 1, 18_000), ("Training Sessions", 5, 800)], status: QuotationStatus::Approved, created_by: "manager", days_ago: 6, notes: "Includes onboarding" },
    SeedQuotation { client: 0, items: &[("Website Redesign", 1, 8_000)], status: QuotationStatus::Draft, created_by: "exec", days_ago: 1, notes: "Modern responsive design" },
    SeedQuotation { client: 2, items: &[("E-commerce Platform", 1, 30_000), ("Payment Gateway Integration", 1, 3_000)], status: QuotationStatus::Pending, created_by: "exec", days_ago: 0, notes: "Full featured online store" },
    SeedQuotation { client: 1, items: &[("Data Analytics Dashboard", 1, 14_000)], status: QuotationStatus::Rejected, created_by: "exec", days_ago: 13, notes: "Custom reporting" },
];

const SEED_TAX_RATE: i64 = 18;

struct SeedTicket {
    client: usize,
    title: &'static str,
    description: &'static str,
    priority: TicketPriority,
    status: TicketStatus,
    created_by: &'static str,
    days_ago: i64,
    /// (text, user, days ago, hour, minute)
    notes: &'static [(&'static str, &'static str, i64, u32, u32)],
}

const TICKETS: [SeedTicket; 6] = [
    SeedTicket { client: 0, title: "Server Setup Required", description: "Need server configuration and deployment for new application", priority: TicketPriority::High, status: TicketStatus::Open, created_by: "admin", days_ago: 2, notes: &[("Ticket created", "admin", 2, 9, 0)] },
    SeedTicket { client: 1, title: "Email Integration Issue", description: "SMTP configuration not working properly", priority: TicketPriority::Medium, status: TicketStatus::InProgress, created_by: "admin", days_ago: 3, notes: &[("Started investigating", "engineer", 3, 14, 30), ("Found configuration issue", "engineer", 2, 10, 15)] },
    SeedTicket { client: 2, title: "Database Performance Optimization", description: "Queries are running slow, need optimization", priority: TicketPriority::Critical, status: TicketStatus::InProgress, created_by: "client", days_ago: 4, notes: &[("Analysis in progress", "engineer", 4, 16, 0)] },
    SeedTicket { client: 3, title: "Feature Request: Export to PDF", description: "Add ability to export reports to PDF format", priority: TicketPriority::Low, status: TicketStatus::Resolved, created_by: "admin", days_ago: 8, notes: &[("Feature implemented", "engineer", 5, 11, 0), ("Deployed to production", "engineer", 4, 9, 0)] },
    SeedTicket { client: 4, title: "SSL Certificate Renewal", description: "SSL certificate expiring soon, needs renewal", priority: TicketPriority::High, status: TicketStatus::Resolved, created_by: "admin", days_ago: 10, notes: &[("Certificate renewed", "engineer", 9, 10, 0)] },
    SeedTicket { client: 0, title: "Backup System Check", description: "Regular monthly backup system verification", priority: TicketPriority::Medium, status: TicketStatus::Closed, created_by: "admin", days_ago: 13, notes: &[("Verification completed", "engineer", 12, 14, 0), ("All systems operational", "engineer", 12, 15, 0)] },
];

/// Loads the sample dataset unless the store already has leads.
pub async fn seed_demo_data(storage: &dyn Storage) -> anyhow::Result<()> {
    if !storage.list_leads().await?.is_empty() {
        info!("Sample data already initialized");
        return Ok(());
    }

    info!("Initializing sample data...");
    let today = storage.today();

    seed_leads(storage, today).await?;
    seed_clients(storage, today).await?;

    // Newest first: the converted leads lead the list, then the direct clients
    let client_ids: Vec<u32> = storage.list_clients().await?.iter().map(|c| c.id).collect();
    let client_at = |index: usize| {
        client_ids
            .get(index % client_ids.len().max(1))
            .copied()
            .ok_or_else(|| StorageError::Validation("No clients available for sample data".to_string()))
    };

    seed_quotations(storage, today, &client_at).await?;
    seed_invoices(storage, today).await?;
    seed_tickets(storage, today, &client_at).await?;

    info!("Sample data initialization complete");
    Ok(())
}

async fn seed_leads(storage: &dyn Storage, today: NaiveDate) -> anyhow::Result<()> {
    for seed in &LEADS {
        let created_date = today - Duration::days(seed.days_ago);
        // Leads reach Converted only through conversion
        let initial_status = match seed.status {
            LeadStatus::Converted => LeadStatus::InProgress,
            status => status,
        };

        let lead = storage
            .create_lead(NewLead {
                name: seed.name.to_string(),
                email: seed.email.to_string(),
                phone: seed.phone.to_string(),
                company: seed.company.to_string(),
                source: seed.source,
                status: Some(initial_status),
                assigned_to: seed.assigned_to.to_string(),
                created_date: Some(created_date),
                notes: vec![Note {
                    text: "Initial contact made".to_string(),
                    timestamp: at(created_date, 10, 0),
                    user: seed.assigned_to.to_string(),
                }],
            })
            .await?;

        if seed.status == LeadStatus::Converted {
            storage.convert_lead_to_client(lead.id).await?;
        }
    }
    info!("Created {} leads", LEADS.len());
    Ok(())
}

async fn seed_clients(storage: &dyn Storage, today: NaiveDate) -> anyhow::Result<()> {
    for (name, email, phone, company, address, days_ago) in DIRECT_CLIENTS {
        storage
            .create_client(NewClient {
                name: name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                company: company.to_string(),
                address: address.to_string(),
                created_date: Some(today - Duration::days(days_ago)),
                lead_id: None,
            })
            .await?;
    }
    info!("Created {} direct clients", DIRECT_CLIENTS.len());
    Ok(())
}

async fn seed_quotations(
    storage: &dyn Storage,
    today: NaiveDate,
    client_at: &impl Fn(usize) -> Result<u32, StorageError>,
) -> anyhow::Result<()> {
    for seed in &QUOTATIONS {
        let created_date = today - Duration::days(seed.days_ago);
        let initial_status = match seed.status {
            QuotationStatus::Pending => QuotationStatus::Pending,
            _ => QuotationStatus::Draft,
        };

        let quotation = storage
            .create_quotation(NewQuotation {
                client_id: client_at(seed.client)?,
                items: seed
                    .items
                    .iter()
                    .map(|(description, quantity, unit_price)| QuotationItemInput {
                        description: description.to_string(),
                        quantity: *quantity,
                        unit_price: Decimal::from(*unit_price),
                    })
                    .collect(),
                tax_rate: Decimal::from(SEED_TAX_RATE),
                status: Some(initial_status),
                created_by: Some(seed.created_by.to_string()),
                created_date: Some(created_date),
                valid_until: None,
                notes: seed.notes.to_string(),
            })
            .await?;

        match seed.status {
            QuotationStatus::Approved => {
                storage.approve_quotation(quotation.id, "manager").await?;
            }
            QuotationStatus::Rejected => {
                storage.reject_quotation(quotation.id, "manager").await?;
            }
            QuotationStatus::Draft | QuotationStatus::Pending => {}
        }
    }
    info!("Created {} quotations", QUOTATIONS.len());
    Ok(())
}

/// Invoices every approved quotation: the first stays Generated, the second
/// is sent and the rest are paid in full.
async fn seed_invoices(storage: &dyn Storage, today: NaiveDate) -> anyhow::Result<()> {
    let generated_date = today - Duration::days(1);
    let approved: Vec<_> = storage
        .list_quotations()
        .await?
        .into_iter()
        .filter(|q| q.status == QuotationStatus::Approved)
        .collect();

    for (index, quotation) in approved.iter().enumerate() {
        let invoice = storage
            .create_invoice(NewInvoice {
                quotation_id: quotation.id,
                generated_date,
                due_date: generated_date + Duration::days(PAYMENT_TERMS_DAYS),
                notes: quotation.notes.clone(),
            })
            .await?;

        match index {
            0 => {}
            1 => {
                storage.mark_invoice_as_sent(invoice.id).await?;
            }
            _ => {
                storage
                    .record_payment(
                        invoice.id,
                        PaymentInput {
                            payment_date: Some(today),
                            payment_amount: invoice.total,
                            payment_method: PaymentMethod::BankTransfer,
                            transaction_ref: transaction_ref(),
                            notes: "Payment received in full".to_string(),
                        },
                    )
                    .await?;
            }
        }
    }
    info!("Created {} invoices", approved.len());
    Ok(())
}

async fn seed_tickets(
    storage: &dyn Storage,
    today: NaiveDate,
    client_at: &impl Fn(usize) -> Result<u32, StorageError>,
) -> anyhow::Result<()> {
    for seed in &TICKETS {
        let ticket = storage
            .create_ticket(NewTicket {
                client_id: client_at(seed.client)?,
                title: seed.title.to_string(),
                description: seed.description.to_string(),
                priority: seed.priority,
                status: None,
                assigned_to: "engineer".to_string(),
                created_date: Some(today - Duration::days(seed.days_ago)),
                created_by: Some(seed.created_by.to_string()),
                notes: seed
                    .notes
                    .iter()
                    .map(|(text, user, days_ago, hour, minute)| Note {
                        text: text.to_string(),
                        timestamp: at(today - Duration::days(*days_ago), *hour, *minute),
                        user: user.to_string(),
                    })
                    .collect(),
            })
            .await?;

        if seed.status != TicketStatus::Open {
            storage.update_ticket_status(ticket.id, seed.status).await?;
        }
    }
    info!("Created {} tickets", TICKETS.len());
    Ok(())
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(time))
}

fn transaction_ref() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TXN{}", &id[..9])
}
