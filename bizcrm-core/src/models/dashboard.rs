use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregated figures for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_leads: usize,
    pub total_clients: usize,
    pub total_quotations: usize,

    /// Sum of totals over Paid invoices
    pub total_revenue: Decimal,

    /// Outstanding balance over every invoice that is not Paid
    pub pending_payments: Decimal,

    pub lead_status_distribution: LeadStatusDistribution,
    pub quotation_status_distribution: QuotationStatusDistribution,

    /// Trailing six months, oldest first
    pub monthly_revenue: Vec<MonthlyRevenue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadStatusDistribution {
    #[serde(rename = "New")]
    pub new: usize,
    #[serde(rename = "In Progress")]
    pub in_progress: usize,
    #[serde(rename = "Converted")]
    pub converted: usize,
    #[serde(rename = "Lost")]
    pub lost: usize,
}

impl LeadStatusDistribution {
    pub fn total(&self) -> usize {
        self.new + self.in_progress + self.converted + self.lost
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotationStatusDistribution {
    #[serde(rename = "Draft")]
    pub draft: usize,
    #[serde(rename = "Pending")]
    pub pending: usize,
    #[serde(rename = "Approved")]
    pub approved: usize,
    #[serde(rename = "Rejected")]
    pub rejected: usize,
}

/// Revenue collected in one calendar month, labelled `Jan`..`Dec`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub year: i32,
    pub revenue: Decimal,
}
