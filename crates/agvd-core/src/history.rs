//! Append-only object history.
//!
//! Every transport order carries an [`ObjectHistory`]. Entries are never
//! rewritten; the dispatcher derives some of its status (e.g. whether an order
//! is currently deferred) by scanning backwards for the latest relevant entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event codes of history entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventCode {
    /// The order was created.
    OrderCreated,
    /// The order could not be dispatched; supplement carries the reasons.
    OrderDispatchingDeferred,
    /// A previously deferred order is dispatchable again.
    OrderDispatchingResumed,
    /// The order was assigned to a vehicle; supplement carries the vehicle name.
    OrderAssignedToVehicle,
    /// The order was reserved for a vehicle; supplement carries the vehicle name.
    OrderReservedForVehicle,
    /// The processing vehicle changed; supplement carries the vehicle name.
    OrderProcessingVehicleChanged,
    /// A drive order of the order was finished.
    OrderDriveOrderFinished,
    /// The order reached a final state.
    OrderReachedFinalState,
    /// Custom event code.
    Custom(String),
}

/// Additional data attached to a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Supplement {
    #[default]
    None,
    Text(String),
    Reasons(Vec<String>),
}

impl Supplement {
    /// The reasons carried, empty for other supplements.
    pub fn reasons(&self) -> &[String] {
        match self {
            Supplement::Reasons(reasons) => reasons,
            _ => &[],
        }
    }
}

/// A single timestamped history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub event_code: EventCode,
    #[serde(default)]
    pub supplement: Supplement,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time.
    pub fn new(event_code: EventCode, supplement: Supplement) -> Self {
        Self {
            timestamp: Utc::now(),
            event_code,
            supplement,
        }
    }

    /// Create an entry carrying a set of reasons.
    pub fn with_reasons<I, S>(event_code: EventCode, reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            event_code,
            Supplement::Reasons(reasons.into_iter().map(Into::into).collect()),
        )
    }

    /// Create an entry carrying a text supplement.
    pub fn with_text(event_code: EventCode, text: impl Into<String>) -> Self {
        Self::new(event_code, Supplement::Text(text.into()))
    }
}

/// Ordered, append-only list of history entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObjectHistory {
    entries: Vec<HistoryEntry>,
}

impl ObjectHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Append an entry.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// The most recent entry whose code is one of `codes`.
    pub fn latest_of(&self, codes: &[EventCode]) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| codes.contains(&entry.event_code))
    }

    /// Number of entries with the given code.
    pub fn count_of(&self, code: &EventCode) -> usize {
        self.entries.iter().filter(|e| &e.event_code == code).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_of_scans_backwards() {
        let mut history = ObjectHistory::new();
        history.append(HistoryEntry::with_reasons(
            EventCode::OrderDispatchingDeferred,
            ["first"],
        ));
        history.append(HistoryEntry::new(EventCode::OrderCreated, Supplement::None));
        history.append(HistoryEntry::with_reasons(
            EventCode::OrderDispatchingDeferred,
            ["second"],
        ));

        let latest = history
            .latest_of(&[
                EventCode::OrderDispatchingDeferred,
                EventCode::OrderDispatchingResumed,
            ])
            .unwrap();
        assert_eq!(latest.supplement.reasons(), ["second".to_string()]);
        assert_eq!(history.count_of(&EventCode::OrderDispatchingDeferred), 2);
    }

    #[test]
    fn test_supplement_serialization() {
        let entry = HistoryEntry::with_text(EventCode::OrderAssignedToVehicle, "Vehicle-01");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event_code"], "ORDER_ASSIGNED_TO_VEHICLE");
        assert_eq!(json["supplement"]["value"], "Vehicle-01");
    }
}
