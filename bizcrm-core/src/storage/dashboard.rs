use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::models::{
    DashboardMetrics, Invoice, InvoiceStatus, Lead, LeadStatus, LeadStatusDistribution, MonthlyRevenue, Quotation,
    QuotationStatus, QuotationStatusDistribution,
};

const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Number of trailing months in the revenue series, including the current one.
pub const REVENUE_WINDOW_MONTHS: i32 = 6;

/// Builds dashboard metrics from a snapshot of the store. Read-only.
pub fn compute_metrics<'a>(
    leads: impl IntoIterator<Item = &'a Lead>,
    total_clients: usize,
    quotations: impl IntoIterator<Item = &'a Quotation>,
    invoices: impl IntoIterator<Item = &'a Invoice> + Clone,
    today: NaiveDate,
) -> DashboardMetrics {
    let mut lead_status_distribution = LeadStatusDistribution::default();
    for lead in leads {
        match lead.status {
            LeadStatus::New => lead_status_distribution.new += 1,
            LeadStatus::InProgress => lead_status_distribution.in_progress += 1,
            LeadStatus::Converted => lead_status_distribution.converted += 1,
            LeadStatus::Lost => lead_status_distribution.lost += 1,
        }
    }

    let mut quotation_status_distribution = QuotationStatusDistribution::default();
    let mut total_quotations = 0;
    for quotation in quotations {
        total_quotations += 1;
        match quotation.status {
            QuotationStatus::Draft => quotation_status_distribution.draft += 1,
            QuotationStatus::Pending => quotation_status_distribution.pending += 1,
            QuotationStatus::Approved => quotation_status_distribution.approved += 1,
            QuotationStatus::Rejected => quotation_status_distribution.rejected += 1,
        }
    }

    let mut total_revenue = Decimal::ZERO;
    let mut pending_payments = Decimal::ZERO;
    for invoice in invoices.clone() {
        if invoice.status == InvoiceStatus::Paid {
            total_revenue += invoice.total;
        } else {
            pending_payments += invoice.balance();
        }
    }

    DashboardMetrics {
        total_leads: lead_status_distribution.total(),
        total_clients,
        total_quotations,
        total_revenue,
        pending_payments,
        lead_status_distribution,
        quotation_status_distribution,
        monthly_revenue: monthly_revenue(invoices, today),
    }
}

/// Revenue of Paid invoices bucketed by the month of their paid date.
pub fn monthly_revenue<'a>(invoices: impl IntoIterator<Item = &'a Invoice> + Clone, today: NaiveDate) -> Vec<MonthlyRevenue> {
    let current = today.year() * 12 + today.month0() as i32;

    ((current - REVENUE_WINDOW_MONTHS + 1)..=current)
        .map(|index| {
            let year = index.div_euclid(12);
            let month0 = index.rem_euclid(12) as u32;

            let revenue = invoices
                .clone()
                .into_iter()
                .filter(|invoice| invoice.status == InvoiceStatus::Paid)
                .filter(|invoice| {
                    invoice
                        .paid_date
                        .map(|paid| paid.year() == year && paid.month0() == month0)
                        .unwrap_or(false)
                })
                .map(|invoice| invoice.total)
                .sum();

            MonthlyRevenue {
                month: MONTH_LABELS[month0 as usize].to_string(),
                year,
                revenue,
            }
        })
        .collect()
}
