//! Orders repository for database operations
//!
//! Issuing and closing an order touch both `orders` and `books`; each runs in
//! a single transaction with a conditional update on `available_copies`.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::OrderStatus,
        order::{NewOrder, Order},
    },
};

use super::{on_unique_violation, MSG_ALREADY_BORROWED, MSG_NO_ACTIVE_BORROW, MSG_NO_COPIES};

#[derive(Clone)]
pub struct OrdersRepository {
    pool: Pool<Postgres>,
}

impl OrdersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Most recent order of a user for a book, restricted to the given statuses
    pub async fn find_latest(
        &self,
        user_id: i32,
        book_id: i32,
        statuses: &[OrderStatus],
    ) -> AppResult<Option<Order>> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE user_id = $1 AND book_id = $2 AND status = ANY($3)
            ORDER BY order_date DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(statuses)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Take a copy of the book and record the loan
    pub async fn issue(&self, order: &NewOrder) -> AppResult<Order> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies - 1
            WHERE id = $1 AND available_copies > 0
            "#,
        )
        .bind(order.book_id)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            return Err(AppError::BusinessRule(MSG_NO_COPIES.to_string()));
        }

        let created = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (user_id, book_id, order_date, due_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(order.user_id)
        .bind(order.book_id)
        .bind(order.order_date)
        .bind(order.due_date)
        .bind(OrderStatus::Issued)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| on_unique_violation(e, MSG_ALREADY_BORROWED))?;

        tx.commit().await?;

        Ok(created)
    }

    /// Close an issued order and put its copy back on the shelf
    pub async fn close(
        &self,
        order_id: i32,
        return_date: DateTime<Utc>,
        status: OrderStatus,
    ) -> AppResult<Order> {
        let mut tx = self.pool.begin().await?;

        let closed = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders SET return_date = $2, status = $3
            WHERE id = $1 AND status = 'issued'
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(return_date)
        .bind(status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::BusinessRule(MSG_NO_ACTIVE_BORROW.to_string()))?;

        let restored = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies + 1
            WHERE id = $1 AND available_copies < total_copies
            "#,
        )
        .bind(closed.book_id)
        .execute(&mut *tx)
        .await?;

        if restored.rows_affected() == 0 {
            tracing::warn!(
                "Order {} closed but book {} already has all copies available",
                order_id,
                closed.book_id
            );
        }

        tx.commit().await?;

        Ok(closed)
    }
}
