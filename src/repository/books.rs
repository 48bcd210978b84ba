//! Books repository: books, their author links, and the genre/author reference tables

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::Author,
        book::{Book, NewBook},
        book_author::BookAuthorName,
        genre::Genre,
    },
};

use super::{on_foreign_key_violation, on_unique_violation, MSG_BOOK_REFERENCED, MSG_DUPLICATE_ISBN};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(book)
    }

    /// List all books
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(books)
    }

    /// Author names for a set of books
    pub async fn find_author_names(&self, book_ids: &[i32]) -> AppResult<Vec<BookAuthorName>> {
        if book_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BookAuthorName>(
            r#"
            SELECT ba.book_id, a.id AS author_id, a.name
            FROM book_authors ba
            JOIN authors a ON a.id = ba.author_id
            WHERE ba.book_id = ANY($1)
            ORDER BY ba.book_id, a.id
            "#,
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Create a book and its author links in one transaction
    pub async fn create(&self, book: &NewBook, author_ids: &[i32]) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, description, publication_year, isbn, genre_id,
                total_copies, available_copies, cover_url, added_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7, NOW())
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.description)
        .bind(book.publication_year)
        .bind(&book.isbn)
        .bind(book.genre_id)
        .bind(book.total_copies)
        .bind(&book.cover_url)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| on_unique_violation(e, MSG_DUPLICATE_ISBN))?;

        for author_id in author_ids {
            sqlx::query(
                "INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(created.id)
            .bind(author_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    /// Delete a book; author links cascade, orders and reviews restrict
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| on_foreign_key_violation(e, MSG_BOOK_REFERENCED))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        Ok(())
    }

    // =========================================================================
    // GENRES & AUTHORS
    // =========================================================================

    pub async fn get_genre(&self, id: i32) -> AppResult<Option<Genre>> {
        let genre = sqlx::query_as::<_, Genre>("SELECT * FROM genres WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(genre)
    }

    pub async fn find_genres(&self, ids: &[i32]) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>("SELECT * FROM genres WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(genres)
    }

    pub async fn find_authors(&self, ids: &[i32]) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>("SELECT * FROM authors WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(authors)
    }
}
