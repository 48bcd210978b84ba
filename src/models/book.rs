//! Book model and catalog request/response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Book row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub isbn: String,
    pub genre_id: i32,
    pub total_copies: i32,
    pub available_copies: i32,
    pub cover_url: Option<String>,
    pub added_date: DateTime<Utc>,
}

impl Book {
    pub fn has_available_copy(&self) -> bool {
        self.available_copies > 0
    }
}

/// Book row to insert
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub isbn: String,
    pub genre_id: i32,
    pub total_copies: i32,
    pub cover_url: Option<String>,
}

/// Create book request (admin)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    #[validate(length(min = 1, max = 13, message = "ISBN must be 1 to 13 characters"))]
    pub isbn: String,
    pub genre_id: i32,
    #[validate(range(min = 1, message = "total_copies must be greater than 0"))]
    pub total_copies: i32,
    #[validate(length(max = 255, message = "Cover URL is too long"))]
    pub cover_url: Option<String>,
    pub author_ids: Vec<i32>,
}

impl From<CreateBook> for NewBook {
    fn from(req: CreateBook) -> Self {
        NewBook {
            title: req.title,
            description: req.description,
            publication_year: req.publication_year,
            isbn: req.isbn,
            genre_id: req.genre_id,
            total_copies: req.total_copies,
            cover_url: req.cover_url,
        }
    }
}

/// Book joined with its genre name and author names
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookDetails {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub publication_year: Option<i32>,
    pub isbn: String,
    pub genre: String,
    pub total_copies: i32,
    pub available_copies: i32,
    pub cover_url: Option<String>,
    pub added_date: DateTime<Utc>,
    pub authors: Vec<String>,
}

impl BookDetails {
    pub fn new(book: Book, genre: String, authors: Vec<String>) -> Self {
        BookDetails {
            id: book.id,
            title: book.title,
            description: book.description,
            publication_year: book.publication_year,
            isbn: book.isbn,
            genre,
            total_copies: book.total_copies,
            available_copies: book.available_copies,
            cover_url: book.cover_url,
            added_date: book.added_date,
            authors,
        }
    }
}
