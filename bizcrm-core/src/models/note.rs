use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A timestamped note attached to a lead or a ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Username of the author
    pub user: String,
}

/// Note creation request. `user` defaults to the authenticated user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewNote {
    #[validate(length(min = 1, message = "Note text is required"))]
    pub text: String,
    pub user: Option<String>,
}
