use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{LedgerId, OrderStatusType, StatusChange, TransitionSource};

/// Appends an entry to the order's status history. History rows are never updated or deleted.
pub async fn append(
    id: &LedgerId,
    from: OrderStatusType,
    to: OrderStatusType,
    source: TransitionSource,
    shipping_label: Option<&str>,
    note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO order_status_history (order_id, from_status, to_status, source, shipping_label, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7);
        "#,
    )
    .bind(id.as_str())
    .bind(from)
    .bind(to)
    .bind(source)
    .bind(shipping_label)
    .bind(note)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}

/// The status history of an order, oldest first.
pub async fn fetch_history(id: &LedgerId, conn: &mut SqliteConnection) -> Result<Vec<StatusChange>, sqlx::Error> {
    let history = sqlx::query_as(
        r#"
            SELECT from_status, to_status, source, shipping_label, note, created_at
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY id ASC;
        "#,
    )
    .bind(id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(history)
}
