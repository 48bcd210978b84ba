//! Genre model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Genre row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// Genre row to insert
#[derive(Debug, Clone, Default)]
pub struct NewGenre {
    pub name: String,
    pub description: Option<String>,
}
