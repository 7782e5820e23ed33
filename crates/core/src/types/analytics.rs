//! Analytics events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{EventId, UserId};

/// Maximum number of events kept; older events are dropped on append.
pub const ANALYTICS_EVENT_CAP: usize = 5000;

/// A client-reported analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: EventId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    pub timestamp: DateTime<Utc>,
}

impl AnalyticsEvent {
    /// Append an event, keeping only the most recent [`ANALYTICS_EVENT_CAP`].
    pub fn append_capped(events: &mut Vec<Self>, event: Self) {
        events.push(event);
        if events.len() > ANALYTICS_EVENT_CAP {
            let excess = events.len() - ANALYTICS_EVENT_CAP;
            events.drain(..excess);
        }
    }
}
