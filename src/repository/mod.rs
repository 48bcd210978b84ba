//! Persistence layer
//!
//! Services talk to storage only through the [`Store`] trait. [`Repository`]
//! implements it on PostgreSQL; [`memory::MemoryStore`] is an in-process
//! implementation with the same constraint behaviour, used by tests.

pub mod books;
pub mod memory;
pub mod orders;
pub mod reviews;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        author::Author,
        book::{Book, NewBook},
        book_author::BookAuthorName,
        enums::OrderStatus,
        genre::Genre,
        order::{NewOrder, Order},
        review::{NewReview, Review},
        user::{NewUser, User},
    },
};

pub const MSG_NO_COPIES: &str = "No available copies of this book";
pub const MSG_ALREADY_BORROWED: &str = "You have already borrowed this book";
pub const MSG_NO_ACTIVE_BORROW: &str = "No active borrow record found for this book";
pub const MSG_ALREADY_REVIEWED: &str = "You have already reviewed this book";
pub const MSG_DUPLICATE_ISBN: &str = "A book with this ISBN already exists";
pub const MSG_DUPLICATE_EMAIL: &str = "A user with this email already exists";
pub const MSG_BOOK_REFERENCED: &str = "Book is referenced by orders or reviews and cannot be deleted";

/// Record-level storage operations used by the services
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Check that the backing store is reachable
    async fn ping(&self) -> AppResult<()>;

    // Users
    async fn get_user(&self, id: i32) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Fails with a business-rule error when the email is taken
    async fn insert_user(&self, user: NewUser) -> AppResult<User>;

    // Catalog reference data
    async fn get_genre(&self, id: i32) -> AppResult<Option<Genre>>;
    async fn find_genres(&self, ids: &[i32]) -> AppResult<Vec<Genre>>;
    async fn find_authors(&self, ids: &[i32]) -> AppResult<Vec<Author>>;

    // Books
    async fn get_book(&self, id: i32) -> AppResult<Option<Book>>;
    /// All books ordered by id
    async fn list_books(&self) -> AppResult<Vec<Book>>;
    /// Author names linked to any of `book_ids`, ordered by book then author id
    async fn find_book_authors(&self, book_ids: &[i32]) -> AppResult<Vec<BookAuthorName>>;
    /// Insert the book with `available_copies = total_copies` and its author links, all or nothing
    async fn insert_book(&self, book: NewBook, author_ids: &[i32]) -> AppResult<Book>;
    /// Delete a book and its author links; rejected while orders or reviews reference it
    async fn delete_book(&self, id: i32) -> AppResult<()>;

    // Orders
    /// Most recent order for the pair whose status is one of `statuses`
    async fn find_order(
        &self,
        user_id: i32,
        book_id: i32,
        statuses: &[OrderStatus],
    ) -> AppResult<Option<Order>>;
    /// Take one copy (only if one is available) and insert an `issued` order, as one unit
    async fn issue_order(&self, order: NewOrder) -> AppResult<Order>;
    /// Close an `issued` order and give its copy back, as one unit
    async fn close_order(
        &self,
        order_id: i32,
        return_date: DateTime<Utc>,
        status: OrderStatus,
    ) -> AppResult<Order>;

    // Reviews
    async fn find_review(&self, user_id: i32, book_id: i32) -> AppResult<Option<Review>>;
    /// Fails with a business-rule error when the pair already has a review
    async fn insert_review(&self, review: NewReview) -> AppResult<Review>;
}

/// PostgreSQL store holding the connection pool and per-table repositories
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub users: users::UsersRepository,
    pub books: books::BooksRepository,
    pub orders: orders::OrdersRepository,
    pub reviews: reviews::ReviewsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: users::UsersRepository::new(pool.clone()),
            books: books::BooksRepository::new(pool.clone()),
            orders: orders::OrdersRepository::new(pool.clone()),
            reviews: reviews::ReviewsRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Map a unique-constraint violation to a business-rule error carrying `message`
pub(crate) fn on_unique_violation(err: sqlx::Error, message: &str) -> AppError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => AppError::BusinessRule(message.to_string()),
        _ => AppError::Database(err),
    }
}

/// Map a foreign-key violation to a business-rule error carrying `message`
pub(crate) fn on_foreign_key_violation(err: sqlx::Error, message: &str) -> AppError {
    match err.as_database_error() {
        Some(db) if db.is_foreign_key_violation() => AppError::BusinessRule(message.to_string()),
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl Store for Repository {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get_user(&self, id: i32) -> AppResult<Option<User>> {
        self.users.get_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.users.get_by_email(email).await
    }

    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        self.users.create(&user).await
    }

    async fn get_genre(&self, id: i32) -> AppResult<Option<Genre>> {
        self.books.get_genre(id).await
    }

    async fn find_genres(&self, ids: &[i32]) -> AppResult<Vec<Genre>> {
        self.books.find_genres(ids).await
    }

    async fn find_authors(&self, ids: &[i32]) -> AppResult<Vec<Author>> {
        self.books.find_authors(ids).await
    }

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        self.books.get_by_id(id).await
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.books.list().await
    }

    async fn find_book_authors(&self, book_ids: &[i32]) -> AppResult<Vec<BookAuthorName>> {
        self.books.find_author_names(book_ids).await
    }

    async fn insert_book(&self, book: NewBook, author_ids: &[i32]) -> AppResult<Book> {
        self.books.create(&book, author_ids).await
    }

    async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.books.delete(id).await
    }

    async fn find_order(
        &self,
        user_id: i32,
        book_id: i32,
        statuses: &[OrderStatus],
    ) -> AppResult<Option<Order>> {
        self.orders.find_latest(user_id, book_id, statuses).await
    }

    async fn issue_order(&self, order: NewOrder) -> AppResult<Order> {
        self.orders.issue(&order).await
    }

    async fn close_order(
        &self,
        order_id: i32,
        return_date: DateTime<Utc>,
        status: OrderStatus,
    ) -> AppResult<Order> {
        self.orders.close(order_id, return_date, status).await
    }

    async fn find_review(&self, user_id: i32, book_id: i32) -> AppResult<Option<Review>> {
        self.reviews.get_by_user_and_book(user_id, book_id).await
    }

    async fn insert_review(&self, review: NewReview) -> AppResult<Review> {
        self.reviews.create(&review).await
    }
}
