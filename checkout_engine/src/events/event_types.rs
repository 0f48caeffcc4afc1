use crate::db_types::{Order, Paise};

/// Emitted exactly once per order, when it moves from `pending` to `paid`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when a captured amount disagrees with the order amount and the order is parked for review.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderFlaggedEvent {
    pub order: Order,
    pub expected: Paise,
    pub captured: Paise,
}

impl OrderFlaggedEvent {
    pub fn new(order: Order, captured: Paise) -> Self {
        let expected = order.amount;
        Self { order, expected, captured }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    OrderFlagged(OrderFlaggedEvent),
}
