use thiserror::Error;

use crate::db_types::{Evidence, LedgerId, NewOrder, Order, OrderStatusType, StatusChange, TransitionOutcome};

/// The Order Ledger is the single source of truth for order status.
///
/// Orders are never deleted through this interface. Every status change goes through [`Self::try_transition`], which
/// backends MUST implement as one conditional update keyed on the current status (compare-and-set), never as a read
/// followed by a write. The status history entry and the write-once payment record are stored atomically with it.
#[allow(async_fn_in_trait)]
pub trait OrderLedger {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Persists a brand-new order with status `Pending` and no gateway order id.
    async fn insert_pending_order(&self, order: NewOrder) -> Result<Order, LedgerError>;

    /// Records the gateway's order id against the ledger entry. This only succeeds if no gateway order id has been
    /// recorded yet, so the link between ledger entries and gateway orders stays 1:1.
    async fn attach_gateway_order_id(&self, id: &LedgerId, gateway_order_id: &str) -> Result<Order, LedgerError>;

    async fn fetch_order(&self, id: &LedgerId) -> Result<Option<Order>, LedgerError>;

    /// Index-backed lookup by the gateway's order id.
    async fn fetch_order_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>, LedgerError>;

    /// Moves the order from `from` to `to` if, and only if, its status is currently `from`.
    ///
    /// * On success, the status is updated, a history entry is appended, and the payment record in `evidence` is
    ///   stored if none has been stored before. Returns [`TransitionOutcome::Applied`] with the updated order.
    /// * If the order exists but is not in `from`, nothing is written and [`TransitionOutcome::AlreadyProcessed`] is
    ///   returned with the order as it is stored.
    /// * If the order does not exist, [`LedgerError::OrderNotFound`] is returned.
    async fn try_transition(
        &self,
        id: &LedgerId,
        from: OrderStatusType,
        to: OrderStatusType,
        evidence: Evidence,
    ) -> Result<TransitionOutcome, LedgerError>;

    /// The status history for the order, oldest first.
    async fn fetch_status_history(&self, id: &LedgerId) -> Result<Vec<StatusChange>, LedgerError>;

    /// Sets the free-text shipping progress label and appends an admin history entry. `status` is left untouched.
    async fn update_shipping_status(
        &self,
        id: &LedgerId,
        label: &str,
        note: Option<String>,
    ) -> Result<Order, LedgerError>;

    /// All orders currently in the given status, oldest first.
    async fn fetch_orders_with_status(&self, status: OrderStatusType) -> Result<Vec<Order>, LedgerError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), LedgerError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(LedgerId),
    #[error("Order {0} is already linked to a gateway order")]
    GatewayOrderAlreadyLinked(LedgerId),
    #[error("Could not (de)serialize order data. {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::SerializationError(e.to_string())
    }
}
