use chrono::Utc;
use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::{
    db_types::{CartItem, Customer, LedgerId, NewOrder, Order, OrderStatusType, Paise, PaymentRecord},
    traits::LedgerError,
};

/// Inserts a new order with status `pending` using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    let customer = serde_json::to_string(&order.customer)?;
    let items = serde_json::to_string(&order.items)?;
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                id,
                status,
                amount,
                currency,
                receipt,
                customer,
                items,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING *;
        "#,
    )
    .bind(order.id.as_str())
    .bind(OrderStatusType::Pending)
    .bind(order.amount.value())
    .bind(order.currency)
    .bind(order.receipt)
    .bind(customer)
    .bind(items)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order [{}] inserted as pending for {}", order.id, order.amount);
    Ok(order)
}

pub async fn fetch_order(id: &LedgerId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_gateway_order_id(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE gateway_order_id = $1")
        .bind(gateway_order_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Stores the gateway's order id, but only if the order does not have one yet.
/// Returns `None` if no row was updated, i.e. the order does not exist or is already linked.
pub async fn set_gateway_order_id(
    id: &LedgerId,
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET gateway_order_id = $1, updated_at = $2
            WHERE id = $3 AND gateway_order_id IS NULL
            RETURNING *;
        "#,
    )
    .bind(gateway_order_id)
    .bind(Utc::now())
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(order)
}

/// The compare-and-set at the heart of the ledger. The status only changes if it is currently `from`, and the payment
/// columns are only ever written while they are still empty.
///
/// Returns `None` if no row matched, in which case nothing was written.
pub async fn compare_and_set_status(
    id: &LedgerId,
    from: OrderStatusType,
    to: OrderStatusType,
    payment: Option<&PaymentRecord>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerError> {
    let payload = payment.map(|p| serde_json::to_string(&p.payload)).transpose()?;
    let order = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                payment_id = COALESCE(payment_id, $2),
                payment_amount = COALESCE(payment_amount, $3),
                payment_payload = COALESCE(payment_payload, $4),
                paid_at = COALESCE(paid_at, $5),
                updated_at = $6
            WHERE id = $7 AND status = $8
            RETURNING *;
        "#,
    )
    .bind(to)
    .bind(payment.map(|p| p.gateway_payment_id.clone()))
    .bind(payment.map(|p| p.amount.value()))
    .bind(payload)
    .bind(payment.map(|p| p.recorded_at))
    .bind(Utc::now())
    .bind(id.as_str())
    .bind(from)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ CAS {id}: {from} -> {to} matched: {}", order.is_some());
    Ok(order)
}

pub async fn set_shipping_status(
    id: &LedgerId,
    label: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET shipping_status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(label)
        .bind(Utc::now())
        .bind(id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Orders in the given status, ordered by `created_at` in ascending order
pub async fn fetch_orders_with_status(
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE status = $1 ORDER BY created_at ASC")
        .bind(status)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

fn json_column<T: DeserializeOwned>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw)
        .map_err(|e| sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(e) })
}

impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let payment = match row.try_get::<Option<String>, _>("payment_id")? {
            Some(gateway_payment_id) => {
                let payload = match row.try_get::<Option<String>, _>("payment_payload")? {
                    Some(raw) => serde_json::from_str(&raw).unwrap_or(Value::String(raw)),
                    None => Value::Null,
                };
                Some(PaymentRecord {
                    gateway_payment_id,
                    amount: row.try_get::<Option<Paise>, _>("payment_amount")?.unwrap_or_default(),
                    payload,
                    recorded_at: row.try_get::<Option<_>, _>("paid_at")?.unwrap_or_else(Utc::now),
                })
            },
            None => None,
        };
        let customer: Customer = json_column(row, "customer")?;
        let items: Vec<CartItem> = json_column(row, "items")?;
        Ok(Self {
            id: row.try_get("id")?,
            status: row.try_get("status")?,
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            receipt: row.try_get("receipt")?,
            gateway_order_id: row.try_get("gateway_order_id")?,
            payment,
            customer,
            items,
            shipping_status: row.try_get("shipping_status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
