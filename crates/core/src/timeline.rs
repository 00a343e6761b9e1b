//! Order tracking timeline.
//!
//! Each order carries an ordered list of stages. The order's status is the
//! last completed stage, so advancing is a matter of ticking entries off.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::OrderStage;

/// Status shown for a timeline with nothing completed.
pub const PENDING_STATUS: &str = "Pending";

/// Errors when moving an order along its timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimelineError {
    #[error("order is already {0}")]
    Closed(OrderStage),
    #[error("order is already at {current}, cannot move to {requested}")]
    NotForward {
        current: OrderStage,
        requested: OrderStage,
    },
    #[error("stage {0} is not part of this order's timeline")]
    UnknownStage(OrderStage),
    #[error("order can no longer be cancelled once shipped")]
    AlreadyShipped,
}

/// One step of the order timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub stage: OrderStage,
    pub label: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
}

impl TimelineEntry {
    fn pending(stage: OrderStage) -> Self {
        Self {
            stage,
            label: stage.label().to_owned(),
            completed: false,
            at: None,
        }
    }
}

/// An order's timeline, stored as a JSON array on the order row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderTimeline(pub Vec<TimelineEntry>);

const STANDARD_STAGES: [OrderStage; 5] = [
    OrderStage::Placed,
    OrderStage::Confirmed,
    OrderStage::Shipped,
    OrderStage::OutForDelivery,
    OrderStage::Delivered,
];

impl OrderTimeline {
    /// The five-stage timeline of a new order, with `placed` completed.
    #[must_use]
    pub fn standard(placed_at: DateTime<Utc>) -> Self {
        let mut entries: Vec<TimelineEntry> = STANDARD_STAGES
            .iter()
            .map(|&stage| TimelineEntry::pending(stage))
            .collect();
        if let Some(first) = entries.first_mut() {
            first.completed = true;
            first.at = Some(placed_at);
        }
        Self(entries)
    }

    #[must_use]
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.0
    }

    /// The last completed entry.
    #[must_use]
    pub fn current(&self) -> Option<&TimelineEntry> {
        self.0.iter().rev().find(|e| e.completed)
    }

    #[must_use]
    pub fn current_stage(&self) -> Option<OrderStage> {
        self.current().map(|e| e.stage)
    }

    /// Label of the current stage, or `"Pending"`.
    #[must_use]
    pub fn current_status(&self) -> &str {
        self.current().map_or(PENDING_STATUS, |e| e.label.as_str())
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self.current_stage(),
            Some(OrderStage::Delivered | OrderStage::Cancelled)
        )
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.current_stage() == Some(OrderStage::Cancelled)
    }

    /// When the given stage was reached, if it was.
    #[must_use]
    pub fn reached_at(&self, stage: OrderStage) -> Option<DateTime<Utc>> {
        self.0
            .iter()
            .find(|e| e.stage == stage && e.completed)
            .and_then(|e| e.at)
    }

    /// Stages an order can still move forward to.
    #[must_use]
    pub fn next_stages(&self) -> Vec<OrderStage> {
        if self.is_closed() {
            return Vec::new();
        }
        let current = self.current_stage();
        self.0
            .iter()
            .filter(|e| e.stage != OrderStage::Cancelled)
            .filter(|e| current.is_none_or(|c| e.stage > c))
            .map(|e| e.stage)
            .collect()
    }

    /// Complete every entry up to and including `stage`.
    ///
    /// Entries skipped over are completed too; their missing timestamps are
    /// set to `at`.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError`] if the order is closed, the stage is not
    /// ahead of the current one, or the stage is not on this timeline.
    pub fn advance_to(&mut self, stage: OrderStage, at: DateTime<Utc>) -> Result<(), TimelineError> {
        if let Some(current) = self.current_stage() {
            if matches!(current, OrderStage::Delivered | OrderStage::Cancelled) {
                return Err(TimelineError::Closed(current));
            }
            if stage <= current {
                return Err(TimelineError::NotForward {
                    current,
                    requested: stage,
                });
            }
        }

        let Some(target) = self
            .0
            .iter()
            .position(|e| e.stage == stage && stage != OrderStage::Cancelled)
        else {
            return Err(TimelineError::UnknownStage(stage));
        };

        for entry in self.0.iter_mut().take(target + 1) {
            if !entry.completed {
                entry.completed = true;
                entry.at = Some(entry.at.unwrap_or(at));
            }
        }

        Ok(())
    }

    /// Cancel the order.
    ///
    /// Only possible before it ships. Appends a completed `cancelled` entry,
    /// which becomes the current status.
    ///
    /// # Errors
    ///
    /// Returns [`TimelineError::Closed`] if already delivered or cancelled and
    /// [`TimelineError::AlreadyShipped`] once shipped.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), TimelineError> {
        match self.current_stage() {
            Some(stage @ (OrderStage::Delivered | OrderStage::Cancelled)) => {
                Err(TimelineError::Closed(stage))
            }
            Some(stage) if stage >= OrderStage::Shipped => Err(TimelineError::AlreadyShipped),
            _ => {
                self.0.push(TimelineEntry {
                    stage: OrderStage::Cancelled,
                    label: OrderStage::Cancelled.label().to_owned(),
                    completed: true,
                    at: Some(at),
                });
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn placed() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_standard_timeline() {
        let timeline = OrderTimeline::standard(placed());
        assert_eq!(timeline.entries().len(), 5);
        assert_eq!(timeline.current_stage(), Some(OrderStage::Placed));
        assert_eq!(timeline.current_status(), "Order Placed");
        assert_eq!(timeline.reached_at(OrderStage::Placed), Some(placed()));
    }

    #[test]
    fn test_empty_timeline_is_pending() {
        let timeline = OrderTimeline::default();
        assert_eq!(timeline.current_stage(), None);
        assert_eq!(timeline.current_status(), PENDING_STATUS);
    }

    #[test]
    fn test_status_is_last_completed_entry() {
        // Entries out of order still resolve to the last completed one.
        let mut timeline = OrderTimeline::standard(placed());
        timeline.0[3].completed = true;
        assert_eq!(timeline.current_stage(), Some(OrderStage::OutForDelivery));
    }

    #[test]
    fn test_advance_fills_skipped_stages() {
        let mut timeline = OrderTimeline::standard(placed());
        let later = placed() + Duration::hours(5);
        timeline.advance_to(OrderStage::Shipped, later).unwrap();
        assert_eq!(timeline.current_stage(), Some(OrderStage::Shipped));
        assert!(timeline.0[1].completed);
        assert_eq!(timeline.reached_at(OrderStage::Confirmed), Some(later));
        // Placed keeps its original timestamp.
        assert_eq!(timeline.reached_at(OrderStage::Placed), Some(placed()));
    }

    #[test]
    fn test_advance_rejects_backwards() {
        let mut timeline = OrderTimeline::standard(placed());
        timeline.advance_to(OrderStage::Shipped, placed()).unwrap();
        assert_eq!(
            timeline.advance_to(OrderStage::Confirmed, placed()),
            Err(TimelineError::NotForward {
                current: OrderStage::Shipped,
                requested: OrderStage::Confirmed
            })
        );
    }

    #[test]
    fn test_advance_after_delivered_is_closed() {
        let mut timeline = OrderTimeline::standard(placed());
        timeline.advance_to(OrderStage::Delivered, placed()).unwrap();
        assert_eq!(
            timeline.advance_to(OrderStage::Delivered, placed()),
            Err(TimelineError::Closed(OrderStage::Delivered))
        );
        assert!(timeline.next_stages().is_empty());
    }

    #[test]
    fn test_advance_to_cancelled_is_unknown() {
        let mut timeline = OrderTimeline::standard(placed());
        assert_eq!(
            timeline.advance_to(OrderStage::Cancelled, placed()),
            Err(TimelineError::UnknownStage(OrderStage::Cancelled))
        );
    }

    #[test]
    fn test_cancel_before_shipping() {
        let mut timeline = OrderTimeline::standard(placed());
        timeline.advance_to(OrderStage::Confirmed, placed()).unwrap();
        timeline.cancel(placed()).unwrap();
        assert!(timeline.is_cancelled());
        assert_eq!(timeline.current_status(), "Cancelled");
        assert_eq!(
            timeline.advance_to(OrderStage::Shipped, placed()),
            Err(TimelineError::Closed(OrderStage::Cancelled))
        );
    }

    #[test]
    fn test_cancel_after_shipping_fails() {
        let mut timeline = OrderTimeline::standard(placed());
        timeline.advance_to(OrderStage::Shipped, placed()).unwrap();
        assert_eq!(
            timeline.cancel(placed()),
            Err(TimelineError::AlreadyShipped)
        );
    }

    #[test]
    fn test_next_stages() {
        let mut timeline = OrderTimeline::standard(placed());
        timeline.advance_to(OrderStage::Shipped, placed()).unwrap();
        assert_eq!(
            timeline.next_stages(),
            vec![OrderStage::OutForDelivery, OrderStage::Delivered]
        );
    }

    #[test]
    fn test_json_shape() {
        let timeline = OrderTimeline::standard(placed());
        let json = serde_json::to_value(&timeline).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["stage"], "placed");
        assert_eq!(json[0]["completed"], true);
        assert!(json[1].get("at").is_none());
    }
}
