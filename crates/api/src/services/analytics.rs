//! Analytics event ingestion, reporting and experiment assignment.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use kranes_core::{AnalyticsEvent, EventId, UserId};

use crate::db::{RepositoryError, Store};

/// Number of events returned in the admin dashboard.
const RECENT_EVENT_LIMIT: usize = 20;

/// An incoming analytics event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
    pub event_type: String,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Event totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_events: usize,
    pub by_type: BTreeMap<String, usize>,
}

impl AnalyticsSummary {
    fn of(events: &[AnalyticsEvent]) -> Self {
        let mut by_type = BTreeMap::new();
        for event in events {
            *by_type.entry(event.event_type.clone()).or_insert(0) += 1;
        }

        Self {
            total_events: events.len(),
            by_type,
        }
    }
}

/// Event totals plus the latest events, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDashboard {
    #[serde(flatten)]
    pub summary: AnalyticsSummary,
    pub recent_events: Vec<AnalyticsEvent>,
}

/// Analytics service.
pub struct AnalyticsService<'a> {
    store: &'a Store,
}

impl<'a> AnalyticsService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Append an event, dropping the oldest beyond the retention cap.
    ///
    /// # Errors
    ///
    /// Returns an error if the event log cannot be read or written.
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn record(
        &self,
        event: TrackEvent,
        user_id: Option<UserId>,
    ) -> Result<AnalyticsEvent, RepositoryError> {
        let event = AnalyticsEvent {
            id: EventId::generate(),
            user_id,
            session_id: event.session_id,
            event_type: event.event_type,
            metadata: event.metadata,
            timestamp: Utc::now(),
        };

        let _guard = self.store.lock().await;
        let records = self.store.records();

        let mut events = records.analytics().await?;
        AnalyticsEvent::append_capped(&mut events, event.clone());
        records.save_analytics(&events).await?;

        Ok(event)
    }

    /// Totals by event type.
    ///
    /// # Errors
    ///
    /// Returns an error if the event log cannot be read.
    pub async fn summary(&self) -> Result<AnalyticsSummary, RepositoryError> {
        let events = self.store.records().analytics().await?;
        Ok(AnalyticsSummary::of(&events))
    }

    /// Totals plus the most recent events.
    ///
    /// # Errors
    ///
    /// Returns an error if the event log cannot be read.
    pub async fn dashboard(&self) -> Result<AnalyticsDashboard, RepositoryError> {
        let events = self.store.records().analytics().await?;
        Ok(AnalyticsDashboard {
            summary: AnalyticsSummary::of(&events),
            recent_events: events.iter().rev().take(RECENT_EVENT_LIMIT).cloned().collect(),
        })
    }
}

/// Variants assigned to one visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignments {
    pub hero_variant: &'static str,
    pub checkout_variant: &'static str,
    pub recommendation_variant: &'static str,
}

impl Assignments {
    /// Deterministic assignments for a visitor seed.
    #[must_use]
    pub fn for_seed(seed: &str) -> Self {
        Self {
            hero_variant: variant(seed, &["control", "premium"]),
            checkout_variant: variant(&format!("{seed}checkout"), &["compact", "guided"]),
            recommendation_variant: variant(
                &format!("{seed}rec"),
                &["top-rated", "frequently-bought"],
            ),
        }
    }
}

/// Pick a variant: `sum(code_unit * (index + 1))` over the seed's UTF-16
/// code units, modulo the number of variants.
///
/// Returns `""` when `values` is empty.
#[must_use]
pub fn variant(seed: &str, values: &[&'static str]) -> &'static str {
    let hash = seed
        .encode_utf16()
        .zip(1u64..)
        .fold(0u64, |acc, (unit, weight)| {
            acc.wrapping_add(u64::from(unit).wrapping_mul(weight))
        });

    u64::try_from(values.len())
        .ok()
        .filter(|len| *len > 0)
        .and_then(|len| usize::try_from(hash % len).ok())
        .and_then(|index| values.get(index).copied())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kranes_core::ANALYTICS_EVENT_CAP;
    use serde_json::json;

    use super::*;

    fn track(event_type: &str) -> TrackEvent {
        TrackEvent {
            event_type: event_type.to_string(),
            metadata: None,
            session_id: None,
        }
    }

    #[test]
    fn test_variant_hash() {
        // "ab" = 97*1 + 98*2 = 293, odd
        assert_eq!(variant("ab", &["control", "premium"]), "premium");
        // "a" = 97, 97 % 3 = 1
        assert_eq!(variant("a", &["x", "y", "z"]), "y");
        assert_eq!(variant("", &["control", "premium"]), "control");
        assert_eq!(variant("seed", &[]), "");
    }

    #[test]
    fn test_assignments_are_stable() {
        let first = Assignments::for_seed("session-123");
        let second = Assignments::for_seed("session-123");
        assert_eq!(first, second);

        let json = serde_json::to_value(&first).unwrap();
        assert!(json.get("heroVariant").is_some());
        assert!(json.get("checkoutVariant").is_some());
        assert!(json.get("recommendationVariant").is_some());
    }

    #[tokio::test]
    async fn test_record_and_summarize() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::json(dir.path());
        let analytics = AnalyticsService::new(&store);

        analytics.record(track("page_view"), None).await.unwrap();
        analytics.record(track("page_view"), None).await.unwrap();
        let event = analytics
            .record(
                TrackEvent {
                    event_type: "add_to_cart".to_string(),
                    metadata: json!({ "productId": 3 }).as_object().cloned(),
                    session_id: Some("s1".to_string()),
                },
                Some(UserId::from("u1")),
            )
            .await
            .unwrap();
        assert_eq!(event.user_id, Some(UserId::from("u1")));

        let summary = analytics.summary().await.unwrap();
        assert_eq!(summary.total_events, 3);
        assert_eq!(summary.by_type.get("page_view"), Some(&2));
        assert_eq!(summary.by_type.get("add_to_cart"), Some(&1));

        let dashboard = analytics.dashboard().await.unwrap();
        assert_eq!(dashboard.recent_events[0].event_type, "add_to_cart");
        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["totalEvents"], 3);
        assert_eq!(json["byType"]["page_view"], 2);
    }

    #[tokio::test]
    async fn test_log_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::json(dir.path());
        let seeded: Vec<AnalyticsEvent> = (0..ANALYTICS_EVENT_CAP)
            .map(|i| AnalyticsEvent {
                id: EventId::from(format!("e{i}")),
                user_id: None,
                session_id: None,
                event_type: "page_view".to_string(),
                metadata: None,
                timestamp: Utc::now(),
            })
            .collect();
        store.records().save_analytics(&seeded).await.unwrap();

        AnalyticsService::new(&store)
            .record(track("checkout"), None)
            .await
            .unwrap();

        let events = store.records().analytics().await.unwrap();
        assert_eq!(events.len(), ANALYTICS_EVENT_CAP);
        assert_eq!(events[0].id.as_str(), "e1");
        assert_eq!(events.last().unwrap().event_type, "checkout");
    }

    #[tokio::test]
    async fn test_dashboard_limits_recent_events() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::json(dir.path());
        let analytics = AnalyticsService::new(&store);
        for _ in 0..25 {
            analytics.record(track("page_view"), None).await.unwrap();
        }

        let dashboard = analytics.dashboard().await.unwrap();
        assert_eq!(dashboard.summary.total_events, 25);
        assert_eq!(dashboard.recent_events.len(), RECENT_EVENT_LIMIT);
    }
}
