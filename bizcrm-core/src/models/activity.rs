use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit log entry describing a mutation, shown in the dashboard feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: u32,
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub action: String,
    /// Label of the affected record (a name or a document number)
    pub entity: String,
    pub entity_id: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user: String,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<u32>,
}

impl NewActivity {
    pub fn new(user: impl Into<String>, action: impl Into<String>, entity: impl Into<String>, entity_id: Option<u32>) -> Self {
        Self {
            user: user.into(),
            action: action.into(),
            entity: entity.into(),
            entity_id,
        }
    }
}
