//! In-process store
//!
//! Mirrors the PostgreSQL schema rules: unique email and ISBN, one issued
//! order per user and book, one review per user and book, cascading author
//! links and restricted book deletion. Every operation holds the table lock
//! for its whole duration, so multi-row writes are atomic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, NewAuthor},
        book::{Book, NewBook},
        book_author::BookAuthorName,
        enums::{OrderStatus, UserStatus},
        genre::{Genre, NewGenre},
        order::{NewOrder, Order},
        review::{NewReview, Review},
        user::{NewUser, User},
    },
};

use super::{
    Store, MSG_ALREADY_BORROWED, MSG_ALREADY_REVIEWED, MSG_BOOK_REFERENCED, MSG_DUPLICATE_EMAIL,
    MSG_DUPLICATE_ISBN, MSG_NO_ACTIVE_BORROW, MSG_NO_COPIES,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    genres: BTreeMap<i32, Genre>,
    authors: BTreeMap<i32, Author>,
    books: BTreeMap<i32, Book>,
    /// (book_id, author_id)
    book_authors: BTreeSet<(i32, i32)>,
    orders: BTreeMap<i32, Order>,
    reviews: BTreeMap<i32, Review>,
    sequence: i32,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.sequence += 1;
        self.sequence
    }
}

/// Store backed by in-memory tables
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change a user's account status
    pub async fn set_user_status(&self, user_id: i32, status: UserStatus) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.status = status;
        Ok(())
    }

    /// Move an order's due date, e.g. to simulate a loan running late
    pub async fn set_due_date(&self, order_id: i32, due_date: DateTime<Utc>) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
        order.due_date = due_date;
        Ok(())
    }

    /// Seed a genre; genres have no write route
    pub async fn insert_genre(&self, genre: NewGenre) -> AppResult<Genre> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let created = Genre {
            id,
            name: genre.name,
            description: genre.description,
        };
        tables.genres.insert(id, created.clone());
        Ok(created)
    }

    /// Seed an author; authors have no write route
    pub async fn insert_author(&self, author: NewAuthor) -> AppResult<Author> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let created = Author {
            id,
            name: author.name,
            birth_year: author.birth_year,
            country: author.country,
            biography: author.biography,
        };
        tables.authors.insert(id, created.clone());
        Ok(created)
    }

    /// All orders of a user for a book, oldest first
    pub async fn orders_for(&self, user_id: i32, book_id: i32) -> Vec<Order> {
        let tables = self.tables.read().await;
        tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id && o.book_id == book_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn get_user(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(AppError::BusinessRule(MSG_DUPLICATE_EMAIL.to_string()));
        }

        let id = tables.next_id();
        let created = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            status: user.status,
            registration_date: Utc::now(),
            photo_url: None,
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn get_genre(&self, id: i32) -> AppResult<Option<Genre>> {
        Ok(self.tables.read().await.genres.get(&id).cloned())
    }

    async fn find_genres(&self, ids: &[i32]) -> AppResult<Vec<Genre>> {
        let tables = self.tables.read().await;
        Ok(tables
            .genres
            .values()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn find_authors(&self, ids: &[i32]) -> AppResult<Vec<Author>> {
        let tables = self.tables.read().await;
        Ok(tables
            .authors
            .values()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn get_book(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.tables.read().await.books.get(&id).cloned())
    }

    async fn list_books(&self) -> AppResult<Vec<Book>> {
        Ok(self.tables.read().await.books.values().cloned().collect())
    }

    async fn find_book_authors(&self, book_ids: &[i32]) -> AppResult<Vec<BookAuthorName>> {
        let tables = self.tables.read().await;
        Ok(tables
            .book_authors
            .iter()
            .filter(|(book_id, _)| book_ids.contains(book_id))
            .filter_map(|&(book_id, author_id)| {
                tables.authors.get(&author_id).map(|a| BookAuthorName {
                    book_id,
                    author_id,
                    name: a.name.clone(),
                })
            })
            .collect())
    }

    async fn insert_book(&self, book: NewBook, author_ids: &[i32]) -> AppResult<Book> {
        let mut tables = self.tables.write().await;

        if tables.books.values().any(|b| b.isbn == book.isbn) {
            return Err(AppError::BusinessRule(MSG_DUPLICATE_ISBN.to_string()));
        }
        if !tables.genres.contains_key(&book.genre_id) {
            return Err(AppError::BusinessRule("Genre not found".to_string()));
        }
        if author_ids.iter().any(|id| !tables.authors.contains_key(id)) {
            return Err(AppError::BusinessRule("One or more authors not found".to_string()));
        }

        let id = tables.next_id();
        let created = Book {
            id,
            title: book.title,
            description: book.description,
            publication_year: book.publication_year,
            isbn: book.isbn,
            genre_id: book.genre_id,
            total_copies: book.total_copies,
            available_copies: book.total_copies,
            cover_url: book.cover_url,
            added_date: Utc::now(),
        };
        tables.books.insert(id, created.clone());
        for &author_id in author_ids {
            tables.book_authors.insert((id, author_id));
        }
        Ok(created)
    }

    async fn delete_book(&self, id: i32) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.books.contains_key(&id) {
            return Err(AppError::NotFound("Book not found".to_string()));
        }
        let referenced = tables.orders.values().any(|o| o.book_id == id)
            || tables.reviews.values().any(|r| r.book_id == id);
        if referenced {
            return Err(AppError::BusinessRule(MSG_BOOK_REFERENCED.to_string()));
        }

        tables.books.remove(&id);
        tables.book_authors.retain(|&(book_id, _)| book_id != id);
        Ok(())
    }

    async fn find_order(
        &self,
        user_id: i32,
        book_id: i32,
        statuses: &[OrderStatus],
    ) -> AppResult<Option<Order>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .values()
            .filter(|o| o.user_id == user_id && o.book_id == book_id && statuses.contains(&o.status))
            .max_by_key(|o| (o.order_date, o.id))
            .cloned())
    }

    async fn issue_order(&self, order: NewOrder) -> AppResult<Order> {
        let mut tables = self.tables.write().await;

        let already_issued = tables.orders.values().any(|o| {
            o.user_id == order.user_id && o.book_id == order.book_id && o.status == OrderStatus::Issued
        });

        let book = tables
            .books
            .get_mut(&order.book_id)
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        if book.available_copies <= 0 {
            return Err(AppError::BusinessRule(MSG_NO_COPIES.to_string()));
        }
        if already_issued {
            return Err(AppError::BusinessRule(MSG_ALREADY_BORROWED.to_string()));
        }
        book.available_copies -= 1;

        let id = tables.next_id();
        let created = Order {
            id,
            user_id: order.user_id,
            book_id: order.book_id,
            order_date: order.order_date,
            due_date: order.due_date,
            return_date: None,
            status: OrderStatus::Issued,
        };
        tables.orders.insert(id, created.clone());
        Ok(created)
    }

    async fn close_order(
        &self,
        order_id: i32,
        return_date: DateTime<Utc>,
        status: OrderStatus,
    ) -> AppResult<Order> {
        let mut tables = self.tables.write().await;

        let order = tables
            .orders
            .get_mut(&order_id)
            .filter(|o| o.status == OrderStatus::Issued)
            .ok_or_else(|| AppError::BusinessRule(MSG_NO_ACTIVE_BORROW.to_string()))?;
        order.return_date = Some(return_date);
        order.status = status;
        let closed = order.clone();

        if let Some(book) = tables.books.get_mut(&closed.book_id) {
            if book.available_copies < book.total_copies {
                book.available_copies += 1;
            }
        }
        Ok(closed)
    }

    async fn find_review(&self, user_id: i32, book_id: i32) -> AppResult<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .find(|r| r.user_id == user_id && r.book_id == book_id)
            .cloned())
    }

    async fn insert_review(&self, review: NewReview) -> AppResult<Review> {
        let mut tables = self.tables.write().await;
        if tables
            .reviews
            .values()
            .any(|r| r.user_id == review.user_id && r.book_id == review.book_id)
        {
            return Err(AppError::BusinessRule(MSG_ALREADY_REVIEWED.to_string()));
        }

        let id = tables.next_id();
        let created = Review {
            id,
            user_id: review.user_id,
            book_id: review.book_id,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        tables.reviews.insert(id, created.clone());
        Ok(created)
    }
}
