//! `SqliteDatabase` is a concrete implementation of the order ledger.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements [`OrderLedger`].
use std::fmt::Debug;

use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{db_url, history, new_pool, orders};
use crate::{
    db_types::{Evidence, LedgerId, NewOrder, Order, OrderStatusType, StatusChange, TransitionOutcome},
    traits::{LedgerError, OrderLedger},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl OrderLedger for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_pending_order(&self, order: NewOrder) -> Result<Order, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn attach_gateway_order_id(&self, id: &LedgerId, gateway_order_id: &str) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let result = match orders::set_gateway_order_id(id, gateway_order_id, &mut tx).await? {
            Some(order) => {
                debug!("🗃️ Order {id} is linked to gateway order {gateway_order_id}");
                Ok(order)
            },
            None => match orders::fetch_order(id, &mut tx).await? {
                Some(_) => Err(LedgerError::GatewayOrderAlreadyLinked(id.clone())),
                None => Err(LedgerError::OrderNotFound(id.clone())),
            },
        };
        tx.commit().await?;
        result
    }

    async fn fetch_order(&self, id: &LedgerId) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_gateway_order_id(gateway_order_id, &mut conn).await?;
        Ok(order)
    }

    /// In a single atomic transaction,
    /// * conditionally updates the order status (and the write-once payment columns), keyed on the current status,
    /// * appends the history entry if, and only if, the update matched.
    ///
    /// If the update did not match, the order is re-read to tell "already processed" apart from "not found".
    async fn try_transition(
        &self,
        id: &LedgerId,
        from: OrderStatusType,
        to: OrderStatusType,
        evidence: Evidence,
    ) -> Result<TransitionOutcome, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let updated = orders::compare_and_set_status(id, from, to, evidence.payment.as_ref(), &mut tx).await?;
        let outcome = match updated {
            Some(order) => {
                history::append(id, from, to, evidence.source, None, evidence.note.as_deref(), &mut tx).await?;
                debug!("🗃️ Order {id} moved from {from} to {to} ({})", evidence.source);
                TransitionOutcome::Applied(order)
            },
            None => {
                let current = orders::fetch_order(id, &mut tx).await?.ok_or_else(|| LedgerError::OrderNotFound(id.clone()))?;
                debug!("🗃️ Order {id} is {} and not {from}. Nothing to do for {to}", current.status);
                TransitionOutcome::AlreadyProcessed(current)
            },
        };
        tx.commit().await?;
        Ok(outcome)
    }

    async fn fetch_status_history(&self, id: &LedgerId) -> Result<Vec<StatusChange>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let history = history::fetch_history(id, &mut conn).await?;
        Ok(history)
    }

    async fn update_shipping_status(
        &self,
        id: &LedgerId,
        label: &str,
        note: Option<String>,
    ) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order =
            orders::set_shipping_status(id, label, &mut tx).await?.ok_or_else(|| LedgerError::OrderNotFound(id.clone()))?;
        let source = crate::db_types::TransitionSource::Admin;
        history::append(id, order.status, order.status, source, Some(label), note.as_deref(), &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {id} shipping status set to '{label}'");
        Ok(order)
    }

    async fn fetch_orders_with_status(&self, status: OrderStatusType) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_with_status(status, &mut conn).await?;
        Ok(orders)
    }

    async fn close(&mut self) -> Result<(), LedgerError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Connects to the database at `SFC_DATABASE_URL` (or the default location) and brings the schema up to date.
    pub async fn new(max_connections: u32) -> Result<Self, LedgerError> {
        let url = db_url();
        let db = Self::new_with_url(&url, max_connections).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Creates a connection pool for the given URL. The schema is not touched; call [`Self::run_migrations`] for that.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Connected to {url} with up to {max_connections} connections");
        Ok(Self { url: url.to_string(), pool })
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), LedgerError> {
        migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::DatabaseError(format!("Migrations failed. {e}")))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
