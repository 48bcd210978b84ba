//! Author model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Author row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub name: String,
    pub birth_year: Option<i32>,
    pub country: Option<String>,
    pub biography: Option<String>,
}

/// Author row to insert
#[derive(Debug, Clone, Default)]
pub struct NewAuthor {
    pub name: String,
    pub birth_year: Option<i32>,
    pub country: Option<String>,
    pub biography: Option<String>,
}
