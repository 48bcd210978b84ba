//! Lending service: borrow, return and review workflows
//!
//! The lending state of a (user, book) pair is never cached; every call
//! re-reads the book and the pair's orders from the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::{
    config::LendingConfig,
    error::{AppError, AppResult},
    models::{
        enums::OrderStatus,
        order::{NewOrder, Order},
        review::{CreateReview, NewReview, Review},
    },
    repository::{Store, MSG_ALREADY_BORROWED, MSG_ALREADY_REVIEWED, MSG_NO_ACTIVE_BORROW, MSG_NO_COPIES},
};

#[derive(Clone)]
pub struct LendingService {
    store: Arc<dyn Store>,
    config: LendingConfig,
}

impl LendingService {
    pub fn new(store: Arc<dyn Store>, config: LendingConfig) -> Self {
        Self { store, config }
    }

    /// Borrow a copy of a book
    pub async fn borrow(&self, user_id: i32, book_id: i32, now: DateTime<Utc>) -> AppResult<Order> {
        let book = self
            .store
            .get_book(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;

        if !book.has_available_copy() {
            tracing::debug!("Borrow rejected: book {} has no available copies", book_id);
            return Err(AppError::BusinessRule(MSG_NO_COPIES.to_string()));
        }

        if self
            .store
            .find_order(user_id, book_id, &[OrderStatus::Issued])
            .await?
            .is_some()
        {
            tracing::debug!("Borrow rejected: user {} already holds book {}", user_id, book_id);
            return Err(AppError::BusinessRule(MSG_ALREADY_BORROWED.to_string()));
        }

        // The store re-checks both conditions atomically with the write
        let order = self
            .store
            .issue_order(NewOrder::issue(user_id, book_id, now, self.config.loan_days))
            .await?;

        tracing::info!(
            "Order {} issued: user {} borrowed book {} until {}",
            order.id,
            user_id,
            book_id,
            order.due_date
        );
        Ok(order)
    }

    /// Return the user's issued copy of a book
    pub async fn return_book(&self, user_id: i32, book_id: i32, now: DateTime<Utc>) -> AppResult<Order> {
        let Some(order) = self
            .store
            .find_order(user_id, book_id, &[OrderStatus::Issued])
            .await?
        else {
            tracing::debug!("Return rejected: user {} holds no copy of book {}", user_id, book_id);
            return Err(AppError::BusinessRule(MSG_NO_ACTIVE_BORROW.to_string()));
        };

        let status = order.closing_status(now);
        let closed = self.store.close_order(order.id, now, status).await?;

        tracing::info!(
            "Order {} closed as {}: user {} returned book {}",
            closed.id,
            closed.status,
            user_id,
            book_id
        );
        Ok(closed)
    }

    /// Review a book the user has borrowed and returned
    pub async fn review(&self, user_id: i32, book_id: i32, request: CreateReview) -> AppResult<Review> {
        request.validate()?;

        if self.store.get_book(book_id).await?.is_none() {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        if self
            .store
            .find_order(user_id, book_id, &OrderStatus::CLOSED)
            .await?
            .is_none()
        {
            tracing::debug!("Review rejected: user {} has no completed loan of book {}", user_id, book_id);
            return Err(AppError::BusinessRule(
                "You must borrow and return the book before reviewing".to_string(),
            ));
        }

        if self.store.find_review(user_id, book_id).await?.is_some() {
            tracing::debug!("Review rejected: user {} already reviewed book {}", user_id, book_id);
            return Err(AppError::BusinessRule(MSG_ALREADY_REVIEWED.to_string()));
        }

        let review = self
            .store
            .insert_review(NewReview {
                user_id,
                book_id,
                rating: request.rating,
                comment: request.comment,
            })
            .await?;

        tracing::info!("Review {} added by user {} on book {}", review.id, user_id, book_id);
        Ok(review)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::{
        models::{book::NewBook, genre::NewGenre},
        repository::{memory::MemoryStore, MockStore},
    };

    async fn setup(copies: i32) -> (MemoryStore, LendingService, i32) {
        let store = MemoryStore::new();
        let genre = store
            .insert_genre(NewGenre { name: "Novel".into(), description: None })
            .await
            .unwrap();
        let book = store
            .insert_book(
                NewBook {
                    title: "Middlemarch".into(),
                    description: None,
                    publication_year: Some(1871),
                    isbn: "9780141439549".into(),
                    genre_id: genre.id,
                    total_copies: copies,
                    cover_url: None,
                },
                &[],
            )
            .await
            .unwrap();
        let lending = LendingService::new(Arc::new(store.clone()), LendingConfig::default());
        (store, lending, book.id)
    }

    async fn available(store: &MemoryStore, book_id: i32) -> i32 {
        store.get_book(book_id).await.unwrap().unwrap().available_copies
    }

    fn review(rating: i32) -> CreateReview {
        CreateReview { rating, comment: Some("Slow but rewarding".to_string()) }
    }

    #[tokio::test]
    async fn borrow_issues_order_due_in_fourteen_days() {
        let (store, lending, book_id) = setup(2).await;
        let now = Utc::now();

        let order = lending.borrow(1, book_id, now).await.unwrap();

        assert_eq!(order.status, OrderStatus::Issued);
        assert_eq!(order.due_date, now + Duration::days(14));
        assert!(order.return_date.is_none());
        assert_eq!(available(&store, book_id).await, 1);
    }

    #[tokio::test]
    async fn borrow_of_missing_book_is_not_found() {
        let (_, lending, _) = setup(1).await;
        let err = lending.borrow(1, 9999, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn borrow_without_copies_is_rejected_and_count_stays_at_zero() {
        let (store, lending, book_id) = setup(1).await;
        let now = Utc::now();
        lending.borrow(1, book_id, now).await.unwrap();

        let err = lending.borrow(2, book_id, now).await.unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(msg) if msg == MSG_NO_COPIES));
        assert_eq!(available(&store, book_id).await, 0);
    }

    #[tokio::test]
    async fn second_borrow_of_same_book_is_rejected() {
        let (store, lending, book_id) = setup(3).await;
        let now = Utc::now();
        lending.borrow(1, book_id, now).await.unwrap();

        let err = lending.borrow(1, book_id, now).await.unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(msg) if msg == MSG_ALREADY_BORROWED));
        assert_eq!(available(&store, book_id).await, 2);
        assert_eq!(store.orders_for(1, book_id).await.len(), 1);
    }

    #[tokio::test]
    async fn return_before_due_date_is_returned() {
        let (store, lending, book_id) = setup(1).await;
        let now = Utc::now();
        lending.borrow(1, book_id, now).await.unwrap();

        let order = lending.return_book(1, book_id, now + Duration::days(3)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Returned);
        assert_eq!(order.return_date, Some(now + Duration::days(3)));
        assert_eq!(available(&store, book_id).await, 1);
    }

    #[tokio::test]
    async fn return_after_due_date_is_overdue() {
        let (store, lending, book_id) = setup(1).await;
        let now = Utc::now();
        lending.borrow(1, book_id, now).await.unwrap();

        let order = lending.return_book(1, book_id, now + Duration::days(20)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Overdue);
        assert!(order.return_date.is_some());
        assert_eq!(available(&store, book_id).await, 1);
    }

    #[tokio::test]
    async fn return_without_active_borrow_is_rejected() {
        let (store, lending, book_id) = setup(1).await;

        let err = lending.return_book(1, book_id, Utc::now()).await.unwrap_err();

        assert!(matches!(err, AppError::BusinessRule(msg) if msg == MSG_NO_ACTIVE_BORROW));
        assert_eq!(available(&store, book_id).await, 1);
    }

    #[tokio::test]
    async fn book_can_be_borrowed_again_after_return() {
        let (store, lending, book_id) = setup(1).await;
        let now = Utc::now();
        lending.borrow(1, book_id, now).await.unwrap();
        lending.return_book(1, book_id, now + Duration::days(1)).await.unwrap();

        lending.borrow(1, book_id, now + Duration::days(2)).await.unwrap();

        assert_eq!(store.orders_for(1, book_id).await.len(), 2);
        assert_eq!(available(&store, book_id).await, 0);
    }

    #[tokio::test]
    async fn availability_stays_within_bounds_over_a_sequence() {
        let (store, lending, book_id) = setup(2).await;
        let mut now = Utc::now();

        for round in 0..4 {
            for user in 1..=3 {
                let _ = lending.borrow(user, book_id, now).await;
                let copies = available(&store, book_id).await;
                assert!((0..=2).contains(&copies), "round {} borrow: {}", round, copies);
            }
            now += Duration::days(1);
            for user in 1..=3 {
                let _ = lending.return_book(user, book_id, now).await;
                let copies = available(&store, book_id).await;
                assert!((0..=2).contains(&copies), "round {} return: {}", round, copies);
            }
        }
        assert_eq!(available(&store, book_id).await, 2);
    }

    #[tokio::test]
    async fn concurrent_borrows_of_last_copy_succeed_once() {
        let (store, lending, book_id) = setup(1).await;
        let now = Utc::now();

        let handles: Vec<_> = (1..=8)
            .map(|user| {
                let lending = lending.clone();
                tokio::spawn(async move { lending.borrow(user, book_id, now).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(available(&store, book_id).await, 0);
    }

    #[tokio::test]
    async fn concurrent_borrows_by_one_user_issue_one_order() {
        let (store, lending, book_id) = setup(3).await;
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lending = lending.clone();
                tokio::spawn(async move { lending.borrow(1, book_id, now).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => {
                    assert!(matches!(err, AppError::BusinessRule(msg) if msg == MSG_ALREADY_BORROWED))
                }
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(available(&store, book_id).await, 2);
        assert_eq!(store.orders_for(1, book_id).await.len(), 1);
    }

    #[tokio::test]
    async fn review_requires_a_completed_loan() {
        let (_, lending, book_id) = setup(1).await;
        let now = Utc::now();

        let err = lending.review(1, book_id, review(5)).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        lending.borrow(1, book_id, now).await.unwrap();
        let err = lending.review(1, book_id, review(5)).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        lending.return_book(1, book_id, now + Duration::days(1)).await.unwrap();
        let created = lending.review(1, book_id, review(5)).await.unwrap();
        assert_eq!(created.rating, 5);
    }

    #[tokio::test]
    async fn overdue_loan_also_allows_review() {
        let (_, lending, book_id) = setup(1).await;
        let now = Utc::now();
        lending.borrow(1, book_id, now).await.unwrap();
        lending.return_book(1, book_id, now + Duration::days(30)).await.unwrap();

        assert!(lending.review(1, book_id, review(2)).await.is_ok());
    }

    #[tokio::test]
    async fn second_review_is_rejected() {
        let (_, lending, book_id) = setup(1).await;
        let now = Utc::now();
        lending.borrow(1, book_id, now).await.unwrap();
        lending.return_book(1, book_id, now).await.unwrap();
        lending.review(1, book_id, review(4)).await.unwrap();

        let err = lending.review(1, book_id, review(3)).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(msg) if msg == MSG_ALREADY_REVIEWED));
    }

    #[tokio::test]
    async fn review_of_missing_book_is_not_found() {
        let (_, lending, _) = setup(1).await;
        let err = lending.review(1, 9999, review(4)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn out_of_range_rating_fails_before_any_lookup() {
        // No expectations set: any store call would panic
        let lending = LendingService::new(Arc::new(MockStore::new()), LendingConfig::default());

        for rating in [0, 6, -1] {
            let err = lending.review(1, 1, review(rating)).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn failed_issue_surfaces_store_error() {
        let mut store = MockStore::new();
        store.expect_get_book().returning(|id| {
            Ok(Some(crate::models::Book {
                id,
                title: "Emma".into(),
                description: None,
                publication_year: None,
                isbn: "9780141439587".into(),
                genre_id: 1,
                total_copies: 1,
                available_copies: 1,
                cover_url: None,
                added_date: Utc::now(),
            }))
        });
        store.expect_find_order().returning(|_, _, _| Ok(None));
        store
            .expect_issue_order()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolClosed)));
        let lending = LendingService::new(Arc::new(store), LendingConfig::default());

        let err = lending.borrow(1, 1, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
