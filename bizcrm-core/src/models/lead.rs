use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::note::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadSource {
    Website,
    Referral,
    #[serde(rename = "Cold Call")]
    ColdCall,
    #[serde(rename = "Social Media")]
    SocialMedia,
}

/// Lead status.
///
/// `Converted` is only reachable through lead conversion and is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Converted,
    Lost,
}

/// A prospective customer prior to becoming a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: u32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub source: LeadSource,
    pub status: LeadStatus,

    /// Username of the owning sales user
    pub assigned_to: String,

    /// Display name resolved from `assigned_to` on every write
    pub assigned_to_name: String,

    pub created_date: NaiveDate,
    pub notes: Vec<Note>,

    /// Set once by conversion, never changed afterwards
    pub converted_to_client_id: Option<u32>,
}

/// Lead creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,
    pub source: LeadSource,
    pub status: Option<LeadStatus>,
    #[validate(length(min = 1, message = "Assignee is required"))]
    pub assigned_to: String,
    pub created_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// Lead update request. Absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeadPatch {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub source: Option<LeadSource>,
    pub status: Option<LeadStatus>,
    #[validate(length(min = 1, message = "Assignee is required"))]
    pub assigned_to: Option<String>,
    pub created_date: Option<NaiveDate>,
}
