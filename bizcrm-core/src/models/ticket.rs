use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::note::Note;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Ticket status. Any status may follow any other; reopening is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

/// Support request raised for a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: u32,
    pub ticket_number: String,
    pub client_id: u32,
    pub client_name: String,
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub assigned_to: String,
    pub assigned_to_name: String,
    pub created_date: NaiveDate,
    pub created_by: String,
    pub notes: Vec<Note>,

    /// Stamped the first time the ticket becomes Resolved
    pub resolved_date: Option<NaiveDate>,

    /// Stamped the first time the ticket becomes Closed
    pub closed_date: Option<NaiveDate>,
}

impl Ticket {
    /// Sets the status, stamping resolved/closed dates only if not yet set.
    pub fn apply_status(&mut self, status: TicketStatus, today: NaiveDate) {
        self.status = status;
        match status {
            TicketStatus::Resolved if self.resolved_date.is_none() => self.resolved_date = Some(today),
            TicketStatus::Closed if self.closed_date.is_none() => self.closed_date = Some(today),
            _ => {}
        }
    }
}

/// Ticket creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTicket {
    pub client_id: u32,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: TicketPriority,
    /// Defaults to Open
    pub status: Option<TicketStatus>,
    #[validate(length(min = 1, message = "Assignee is required"))]
    pub assigned_to: String,
    pub created_date: Option<NaiveDate>,
    pub created_by: Option<String>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// Ticket update request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    pub client_id: Option<u32>,
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
    #[validate(length(min = 1, message = "Assignee is required"))]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TicketStatusUpdate {
    pub status: TicketStatus,
}
