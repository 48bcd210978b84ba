//! Book-Author junction model (N:M relationship)

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Author name resolved through the junction table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookAuthorName {
    pub book_id: i32,
    pub author_id: i32,
    pub name: String,
}
