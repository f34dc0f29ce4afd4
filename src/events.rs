//! The change notification bus.
//!
//! A lifecycle-scoped publish/subscribe fan-out used to tell interested
//! observers that a category's spending changed. The bus is created at
//! application start, injected into the mutation services and into each UI
//! session, and torn down at shutdown; there is no ambient singleton.
//!
//! Delivery is best-effort, in-process and at-most-once per connected
//! subscriber. Events are published strictly after a successful commit and
//! carry the committed entity as a hint to re-fetch; subscribers must
//! recompute analyses from storage rather than trusting event payloads as the
//! source of truth. The bus performs no server-side filtering: every
//! subscriber receives every event and filters to the categories it cares
//! about via [ChangeEvent::category_id].

use serde::Serialize;
use tokio::sync::broadcast;

use crate::{
    category::Category,
    database_id::{CategoryId, ExpenseId},
    expense::Expense,
};

/// How many events a slow subscriber may lag behind before it starts missing
/// events.
///
/// A subscriber that observes a lag simply re-queries storage, so a small
/// buffer is enough.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// A notification that an entity changed in storage.
///
/// Payloads reflect the state at commit time; consumers should treat them as
/// a hint to re-fetch rather than as current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// An expense was created.
    ExpenseCreated(Expense),
    /// An expense was updated.
    ExpenseUpdated(Expense),
    /// An expense was deleted.
    ExpenseDeleted {
        /// The ID the deleted expense had.
        expense_id: ExpenseId,
        /// The category the expense was recorded against.
        category_id: CategoryId,
    },
    /// A category was created.
    CategoryCreated(Category),
    /// A category was updated.
    CategoryUpdated(Category),
    /// A category was deleted, along with its expenses.
    CategoryDeleted {
        /// The ID the deleted category had.
        category_id: CategoryId,
    },
}

impl ChangeEvent {
    /// The ID of the category whose spending picture this event affects.
    ///
    /// Subscribers use this to ignore events for categories they are not
    /// displaying.
    pub fn category_id(&self) -> CategoryId {
        match self {
            ChangeEvent::ExpenseCreated(expense) | ChangeEvent::ExpenseUpdated(expense) => {
                expense.category_id
            }
            ChangeEvent::ExpenseDeleted { category_id, .. } => *category_id,
            ChangeEvent::CategoryCreated(category) | ChangeEvent::CategoryUpdated(category) => {
                category.id
            }
            ChangeEvent::CategoryDeleted { category_id } => *category_id,
        }
    }
}

/// The publish/subscribe fan-out for [ChangeEvent]s.
///
/// Cloning is cheap and every clone publishes to the same subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ChangeEvent>,
}

impl EventBus {
    /// Create an event bus that buffers up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);

        Self { sender }
    }

    /// Register a new subscriber.
    ///
    /// The returned receiver is the subscription handle: dropping it cancels
    /// the subscription. Only events published after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Publish `event` to all current subscribers.
    ///
    /// Fire-and-forget: publishing with no connected subscribers is not an
    /// error, and no event is persisted or replayed for later subscribers.
    pub fn publish(&self, event: ChangeEvent) {
        tracing::debug!(category_id = event.category_id(), "publishing change event");

        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod event_bus_tests {
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{expense::Expense, money::Money};

    use super::{ChangeEvent, EventBus};

    fn test_expense(category_id: i64) -> Expense {
        Expense {
            id: 1,
            description: "Weekly shop".to_string(),
            amount: Money::new(dec!(82.50)),
            date: date!(2026 - 08 - 01),
            notes: "Countdown".to_string(),
            category_id,
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut subscriber = bus.subscribe();
        let event = ChangeEvent::ExpenseCreated(test_expense(7));

        bus.publish(event.clone());

        assert_eq!(subscriber.recv().await, Ok(event));
    }

    #[tokio::test]
    async fn every_subscriber_receives_every_event() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        let event = ChangeEvent::CategoryDeleted { category_id: 3 };

        bus.publish(event.clone());

        assert_eq!(first.recv().await, Ok(event.clone()));
        assert_eq!(second.recv().await, Ok(event));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::default();

        bus.publish(ChangeEvent::CategoryDeleted { category_id: 1 });
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let deleted = serde_json::to_value(ChangeEvent::CategoryDeleted { category_id: 3 }).unwrap();
        assert_eq!(deleted["type"], "category_deleted");
        assert_eq!(deleted["category_id"], 3);

        let created = serde_json::to_value(ChangeEvent::ExpenseCreated(test_expense(7))).unwrap();
        assert_eq!(created["type"], "expense_created");
        assert_eq!(created["amount"], "82.50");
        assert_eq!(created["category_id"], 7);
    }

    #[test]
    fn events_expose_the_affected_category() {
        assert_eq!(ChangeEvent::ExpenseCreated(test_expense(7)).category_id(), 7);
        assert_eq!(
            ChangeEvent::ExpenseDeleted {
                expense_id: 1,
                category_id: 9
            }
            .category_id(),
            9
        );
        assert_eq!(ChangeEvent::CategoryDeleted { category_id: 3 }.category_id(), 3);
    }

    #[tokio::test]
    async fn dropped_subscription_stops_receiving() {
        let bus = EventBus::default();
        let subscriber = bus.subscribe();
        drop(subscriber);

        // The send side simply reports zero receivers; nothing to assert
        // beyond not panicking.
        bus.publish(ChangeEvent::CategoryDeleted { category_id: 1 });
    }
}
