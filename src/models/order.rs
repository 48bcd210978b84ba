//! Order (borrow) model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::OrderStatus;

/// Order row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub order_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: OrderStatus,
}

impl Order {
    /// Status a return at `at` closes this order with
    pub fn closing_status(&self, at: DateTime<Utc>) -> OrderStatus {
        if at > self.due_date {
            OrderStatus::Overdue
        } else {
            OrderStatus::Returned
        }
    }
}

/// Order row to insert, always in `issued` state
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub book_id: i32,
    pub order_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

impl NewOrder {
    pub fn issue(user_id: i32, book_id: i32, now: DateTime<Utc>, loan_days: i64) -> Self {
        NewOrder {
            user_id,
            book_id,
            order_date: now,
            due_date: now + Duration::days(loan_days),
        }
    }
}
