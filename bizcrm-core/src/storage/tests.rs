use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use super::*;
use crate::models::{
    ClientPatch, InvoiceStatus, LeadSource, LeadStatus, NewClient, NewLead, NewQuotation, NewTicket, PaymentInput,
    PaymentMethod, QuotationItemInput, QuotationPatch, QuotationStatus, TicketPriority, TicketStatus,
};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

fn today() -> NaiveDate {
    fixed_now().date_naive()
}

fn store() -> MemStorage {
    MemStorage::with_clock(fixed_now)
}

fn new_lead(name: &str, created_date: Option<NaiveDate>) -> NewLead {
    NewLead {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: "+1-555-0100".to_string(),
        company: format!("{} Ltd", name),
        source: LeadSource::Website,
        status: None,
        assigned_to: "exec".to_string(),
        created_date,
        notes: vec![],
    }
}

fn new_client(company: &str) -> NewClient {
    NewClient {
        name: "Jane Doe".to_string(),
        email: "jane@example.com".to_string(),
        phone: String::new(),
        company: company.to_string(),
        address: "1 Main St".to_string(),
        created_date: None,
        lead_id: None,
    }
}

fn new_quotation(client_id: u32, quantity: u32, unit_price: i64, tax_rate: i64) -> NewQuotation {
    NewQuotation {
        client_id,
        items: vec![QuotationItemInput {
            description: "Consulting".to_string(),
            quantity,
            unit_price: Decimal::from(unit_price),
        }],
        tax_rate: Decimal::from(tax_rate),
        status: None,
        created_by: Some("exec".to_string()),
        created_date: None,
        valid_until: None,
        notes: "Net 30".to_string(),
    }
}

fn payment(amount: i64) -> PaymentInput {
    PaymentInput {
        payment_date: None,
        payment_amount: Decimal::from(amount),
        payment_method: PaymentMethod::BankTransfer,
        transaction_ref: "TXN1".to_string(),
        notes: String::new(),
    }
}

fn new_ticket(client_id: u32) -> NewTicket {
    NewTicket {
        client_id,
        title: "Printer offline".to_string(),
        description: String::new(),
        priority: TicketPriority::High,
        status: None,
        assigned_to: "engineer".to_string(),
        created_date: None,
        created_by: Some("client".to_string()),
        notes: vec![],
    }
}

#[tokio::test]
async fn test_quotation_to_paid_invoice_flow() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();

    let quotation = storage.create_quotation(new_quotation(client.id, 2, 100, 18)).await.unwrap();
    assert_eq!(quotation.subtotal, Decimal::from(200));
    assert_eq!(quotation.tax_amount, Decimal::from(36));
    assert_eq!(quotation.total, Decimal::from(236));
    assert_eq!(quotation.status, QuotationStatus::Draft);
    assert_eq!(quotation.quotation_number, "QT-2025-001");

    let err = storage.generate_invoice(quotation.id).await.unwrap_err();
    assert_eq!(err, StorageError::BusinessRule("Quotation must be approved first".to_string()));
    assert!(storage.list_invoices().await.unwrap().is_empty());

    let approved = storage.approve_quotation(quotation.id, "manager").await.unwrap();
    assert_eq!(approved.status, QuotationStatus::Approved);
    assert_eq!(approved.approved_by.as_deref(), Some("manager"));
    assert_eq!(approved.approved_date, Some(today()));

    let invoice = storage.generate_invoice(quotation.id).await.unwrap();
    assert_eq!(invoice.invoice_number, "INV-2025-001");
    assert_eq!(invoice.total, Decimal::from(236));
    assert_eq!(invoice.client_name, "Acme");
    assert_eq!(invoice.client_address, "1 Main St");
    assert_eq!(invoice.status, InvoiceStatus::Generated);
    assert_eq!(invoice.due_date, today() + Duration::days(PAYMENT_TERMS_DAYS));

    let paid = storage.record_payment(invoice.id, payment(236)).await.unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.paid_date, Some(today()));

    let client = storage.get_client(client.id).await.unwrap();
    assert_eq!(client.total_revenue, Decimal::from(236));
}

fn huge_quotation(client_id: u32) -> NewQuotation {
    let mut input = new_quotation(client_id, 1, 0, 100);
    input.items[0].unit_price = Decimal::from_scientific("1e28").unwrap();
    input
}

#[tokio::test]
async fn test_overflowing_quotation_is_rejected_without_side_effects() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();

    let err = storage.create_quotation(huge_quotation(client.id)).await.unwrap_err();
    assert_eq!(err, StorageError::Validation("amount out of range".to_string()));
    assert!(storage.list_quotations().await.unwrap().is_empty());

    let quotation = storage.create_quotation(new_quotation(client.id, 1, 100, 0)).await.unwrap();
    assert_eq!(quotation.quotation_number, "QT-2025-001");

    let patch = QuotationPatch {
        items: Some(huge_quotation(client.id).items),
        tax_rate: Some(Decimal::ONE_HUNDRED),
        ..Default::default()
    };
    let err = storage.update_quotation(quotation.id, patch).await.unwrap_err();
    assert_eq!(err, StorageError::Validation("amount out of range".to_string()));

    let unchanged = storage.get_quotation(quotation.id).await.unwrap();
    assert_eq!(unchanged.total, Decimal::from(100));
    assert_eq!(unchanged.tax_rate, Decimal::ZERO);
}

#[tokio::test]
async fn test_overflowing_payment_is_rejected() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();
    let mut input = new_quotation(client.id, 1, 0, 0);
    input.items[0].unit_price = Decimal::MAX;
    let quotation = storage.create_quotation(input).await.unwrap();
    storage.approve_quotation(quotation.id, "admin").await.unwrap();
    let invoice = storage.generate_invoice(quotation.id).await.unwrap();

    let mut first = payment(0);
    first.payment_amount = Decimal::MAX - Decimal::ONE;
    let partial = storage.record_payment(invoice.id, first).await.unwrap();
    assert_eq!(partial.status, InvoiceStatus::PartiallyPaid);

    let err = storage.record_payment(invoice.id, payment(2)).await.unwrap_err();
    assert_eq!(err, StorageError::Validation("amount out of range".to_string()));

    let stored = storage.get_invoice(invoice.id).await.unwrap();
    assert_eq!(stored.paid_amount, Decimal::MAX - Decimal::ONE);
    assert_eq!(stored.status, InvoiceStatus::PartiallyPaid);
    assert_eq!(storage.get_client(client.id).await.unwrap().total_revenue, Decimal::ZERO);
}

#[tokio::test]
async fn test_partial_payments_credit_revenue_once() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();
    let quotation = storage.create_quotation(new_quotation(client.id, 1, 1000, 0)).await.unwrap();
    storage.approve_quotation(quotation.id, "admin").await.unwrap();
    let invoice = storage.generate_invoice(quotation.id).await.unwrap();

    let partial = storage.record_payment(invoice.id, payment(400)).await.unwrap();
    assert_eq!(partial.status, InvoiceStatus::PartiallyPaid);
    assert_eq!(partial.paid_amount, Decimal::from(400));
    assert_eq!(storage.get_client(client.id).await.unwrap().total_revenue, Decimal::ZERO);

    let settled = storage.record_payment(invoice.id, payment(600)).await.unwrap();
    assert_eq!(settled.status, InvoiceStatus::Paid);
    assert_eq!(settled.paid_amount, Decimal::from(1000));
    assert_eq!(storage.get_client(client.id).await.unwrap().total_revenue, Decimal::from(1000));

    let err = storage.record_payment(invoice.id, payment(1)).await.unwrap_err();
    assert!(matches!(err, StorageError::BusinessRule(_)));
    assert_eq!(storage.get_client(client.id).await.unwrap().total_revenue, Decimal::from(1000));
}

#[tokio::test]
async fn test_quotation_invoiced_only_once() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();
    let quotation = storage.create_quotation(new_quotation(client.id, 1, 50, 10)).await.unwrap();
    storage.approve_quotation(quotation.id, "admin").await.unwrap();
    storage.generate_invoice(quotation.id).await.unwrap();

    let err = storage.generate_invoice(quotation.id).await.unwrap_err();
    assert_eq!(
        err,
        StorageError::BusinessRule("Quotation QT-2025-001 has already been invoiced as INV-2025-001".to_string())
    );
    assert_eq!(storage.list_invoices().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_generate_invoice_for_missing_quotation() {
    let storage = store();
    let err = storage.generate_invoice(99).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { entity: "Quotation", .. }));
}

#[tokio::test]
async fn test_convert_lead_to_client() {
    let storage = store();
    let lead = storage.create_lead(new_lead("Emily", None)).await.unwrap();

    let client = storage.convert_lead_to_client(lead.id).await.unwrap();
    assert_eq!(client.name, "Emily");
    assert_eq!(client.company, "Emily Ltd");
    assert_eq!(client.address, "");
    assert_eq!(client.total_revenue, Decimal::ZERO);
    assert_eq!(client.lead_id, Some(lead.id));

    let lead = storage.get_lead(lead.id).await.unwrap();
    assert_eq!(lead.status, LeadStatus::Converted);
    assert_eq!(lead.converted_to_client_id, Some(client.id));

    let err = storage.convert_lead_to_client(lead.id).await.unwrap_err();
    assert!(matches!(err, StorageError::BusinessRule(_)));
    assert_eq!(storage.list_clients().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_convert_missing_lead_creates_nothing() {
    let storage = store();
    let err = storage.convert_lead_to_client(42).await.unwrap_err();
    assert_eq!(err, StorageError::not_found("Lead", 42));
    assert!(storage.list_clients().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lead_status_cannot_be_set_to_converted_directly() {
    let storage = store();
    let lead = storage.create_lead(new_lead("Sam", None)).await.unwrap();

    let patch = LeadPatch {
        status: Some(LeadStatus::Converted),
        ..Default::default()
    };
    assert!(matches!(
        storage.update_lead(lead.id, patch).await,
        Err(StorageError::BusinessRule(_))
    ));

    let mut input = new_lead("Kim", None);
    input.status = Some(LeadStatus::Converted);
    assert!(matches!(storage.create_lead(input).await, Err(StorageError::Validation(_))));
}

#[tokio::test]
async fn test_lists_are_newest_first() {
    let storage = store();
    let older = storage
        .create_lead(new_lead("Older", Some(today() - Duration::days(5))))
        .await
        .unwrap();
    let newer = storage.create_lead(new_lead("Newer", Some(today()))).await.unwrap();
    let same_day = storage.create_lead(new_lead("SameDay", Some(today()))).await.unwrap();

    let ids: Vec<u32> = storage.list_leads().await.unwrap().iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![same_day.id, newer.id, older.id]);
}

#[tokio::test]
async fn test_ids_are_not_reused_after_delete() {
    let storage = store();
    let first = storage.create_lead(new_lead("First", None)).await.unwrap();
    assert!(storage.delete_lead(first.id).await.unwrap());
    assert!(!storage.delete_lead(first.id).await.unwrap());

    let second = storage.create_lead(new_lead("Second", None)).await.unwrap();
    assert_eq!(second.id, first.id + 1);
}

#[tokio::test]
async fn test_document_numbers_survive_updates() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();
    let quotation = storage.create_quotation(new_quotation(client.id, 1, 10, 0)).await.unwrap();

    let patch = QuotationPatch {
        items: Some(vec![QuotationItemInput {
            description: "Audit".to_string(),
            quantity: 3,
            unit_price: Decimal::from(20),
        }]),
        tax_rate: Some(Decimal::from(10)),
        ..Default::default()
    };
    let updated = storage.update_quotation(quotation.id, patch).await.unwrap();
    assert_eq!(updated.quotation_number, quotation.quotation_number);
    assert_eq!(updated.subtotal, Decimal::from(60));
    assert_eq!(updated.tax_amount, Decimal::from(6));
    assert_eq!(updated.total, Decimal::from(66));
}

#[tokio::test]
async fn test_quotation_transitions() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();
    let quotation = storage.create_quotation(new_quotation(client.id, 1, 10, 0)).await.unwrap();

    let pending = storage.submit_quotation(quotation.id, "exec").await.unwrap();
    assert_eq!(pending.status, QuotationStatus::Pending);

    let rejected = storage.reject_quotation(quotation.id, "manager").await.unwrap();
    assert_eq!(rejected.status, QuotationStatus::Rejected);

    let patch = QuotationPatch {
        status: Some(QuotationStatus::Approved),
        ..Default::default()
    };
    assert!(matches!(
        storage.update_quotation(quotation.id, patch).await,
        Err(StorageError::BusinessRule(_))
    ));

    let err = storage.approve_quotation(quotation.id, "manager").await.unwrap_err();
    assert!(matches!(err, StorageError::BusinessRule(_)));

    storage.submit_quotation(quotation.id, "exec").await.unwrap();
    storage.approve_quotation(quotation.id, "manager").await.unwrap();
    let err = storage.reject_quotation(quotation.id, "manager").await.unwrap_err();
    assert_eq!(
        err,
        StorageError::BusinessRule("Quotation QT-2025-001 cannot move from Approved to Rejected".to_string())
    );

    let reprice = QuotationPatch {
        tax_rate: Some(Decimal::from(5)),
        ..Default::default()
    };
    assert!(matches!(
        storage.update_quotation(quotation.id, reprice).await,
        Err(StorageError::BusinessRule(_))
    ));
}

#[tokio::test]
async fn test_quotation_requires_existing_client() {
    let storage = store();
    let err = storage.create_quotation(new_quotation(7, 1, 10, 0)).await.unwrap_err();
    assert_eq!(err, StorageError::not_found("Client", 7));

    let err = storage.create_ticket(new_ticket(7)).await.unwrap_err();
    assert_eq!(err, StorageError::not_found("Client", 7));
}

#[tokio::test]
async fn test_company_rename_propagates_except_to_invoices() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();
    let quotation = storage.create_quotation(new_quotation(client.id, 1, 10, 0)).await.unwrap();
    storage.approve_quotation(quotation.id, "admin").await.unwrap();
    let invoice = storage.generate_invoice(quotation.id).await.unwrap();
    let ticket = storage.create_ticket(new_ticket(client.id)).await.unwrap();

    let patch = ClientPatch {
        company: Some("Acme Global".to_string()),
        ..Default::default()
    };
    storage.update_client(client.id, patch).await.unwrap();

    assert_eq!(storage.get_quotation(quotation.id).await.unwrap().client_name, "Acme Global");
    assert_eq!(storage.get_ticket(ticket.id).await.unwrap().client_name, "Acme Global");
    assert_eq!(storage.get_invoice(invoice.id).await.unwrap().client_name, "Acme");
}

#[tokio::test]
async fn test_mark_sent_refuses_paid_invoice() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();
    let quotation = storage.create_quotation(new_quotation(client.id, 1, 10, 0)).await.unwrap();
    storage.approve_quotation(quotation.id, "admin").await.unwrap();
    let invoice = storage.generate_invoice(quotation.id).await.unwrap();

    let sent = storage.mark_invoice_as_sent(invoice.id).await.unwrap();
    assert_eq!(sent.status, InvoiceStatus::Sent);
    assert_eq!(sent.sent_date, Some(today()));

    storage.record_payment(invoice.id, payment(10)).await.unwrap();
    assert!(matches!(
        storage.mark_invoice_as_sent(invoice.id).await,
        Err(StorageError::BusinessRule(_))
    ));
}

#[tokio::test]
async fn test_mark_overdue_invoices() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();
    let quotation = storage.create_quotation(new_quotation(client.id, 1, 10, 0)).await.unwrap();
    storage.approve_quotation(quotation.id, "admin").await.unwrap();
    let invoice = storage.generate_invoice(quotation.id).await.unwrap();

    let before_due = storage.mark_overdue_invoices(invoice.due_date).await.unwrap();
    assert!(before_due.is_empty());

    let overdue = storage
        .mark_overdue_invoices(invoice.due_date + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(storage.get_invoice(invoice.id).await.unwrap().status, InvoiceStatus::Overdue);

    // Overdue invoices still accept payment
    let paid = storage.record_payment(invoice.id, payment(10)).await.unwrap();
    assert_eq!(paid.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn test_ticket_dates_are_write_once() {
    let storage = store();
    let client = storage.create_client(new_client("Acme")).await.unwrap();
    let ticket = storage.create_ticket(new_ticket(client.id)).await.unwrap();
    assert_eq!(ticket.ticket_number, "TKT-2025-001");
    assert_eq!(ticket.status, TicketStatus::Open);

    let resolved = storage.update_ticket_status(ticket.id, TicketStatus::Resolved).await.unwrap();
    assert_eq!(resolved.resolved_date, Some(today()));

    let reopened = storage.update_ticket_status(ticket.id, TicketStatus::Open).await.unwrap();
    assert_eq!(reopened.status, TicketStatus::Open);
    assert_eq!(reopened.resolved_date, Some(today()));
    assert_eq!(reopened.closed_date, None);
}

#[tokio::test]
async fn test_dashboard_distribution_sums_to_total() {
    let storage = store();
    for name in ["Ann", "Ben", "Cas"] {
        storage.create_lead(new_lead(name, None)).await.unwrap();
    }
    storage.convert_lead_to_client(1).await.unwrap();
    storage
        .update_lead(
            2,
            LeadPatch {
                status: Some(LeadStatus::Lost),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let metrics = storage.dashboard_metrics().await.unwrap();
    assert_eq!(metrics.total_leads, 3);
    assert_eq!(metrics.total_clients, 1);
    assert_eq!(metrics.lead_status_distribution.total(), metrics.total_leads);
    assert_eq!(metrics.lead_status_distribution.converted, 1);
    assert_eq!(metrics.lead_status_distribution.lost, 1);
    assert_eq!(metrics.lead_status_distribution.new, 1);
    assert_eq!(metrics.monthly_revenue.len(), 6);
}

#[tokio::test]
async fn test_activity_feed_is_capped_and_newest_first() {
    let storage = store();
    for i in 0..60 {
        storage.create_lead(new_lead(&format!("Lead{}", i), None)).await.unwrap();
    }

    let activities = storage.list_activities().await.unwrap();
    assert_eq!(activities.len(), ACTIVITY_FEED_LIMIT);
    assert_eq!(activities[0].entity, "Lead59");
    assert_eq!(activities[0].action, "created lead");
    assert!(activities.windows(2).all(|pair| pair[0].id > pair[1].id));
}

#[tokio::test]
async fn test_record_activity_uses_store_clock() {
    let storage = store();
    let activity = storage
        .record_activity(NewActivity::new("admin", "exported report", "Q1", None))
        .await
        .unwrap();
    assert_eq!(activity.id, 1);
    assert_eq!(activity.timestamp, fixed_now());
}
