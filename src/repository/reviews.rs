//! Reviews repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::review::{NewReview, Review},
};

use super::{on_unique_violation, MSG_ALREADY_REVIEWED};

#[derive(Clone)]
pub struct ReviewsRepository {
    pool: Pool<Postgres>,
}

impl ReviewsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get the review a user left on a book, if any
    pub async fn get_by_user_and_book(&self, user_id: i32, book_id: i32) -> AppResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE user_id = $1 AND book_id = $2",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    /// Create a review
    pub async fn create(&self, review: &NewReview) -> AppResult<Review> {
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (user_id, book_id, rating, comment, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING *
            "#,
        )
        .bind(review.user_id)
        .bind(review.book_id)
        .bind(review.rating)
        .bind(&review.comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| on_unique_violation(e, MSG_ALREADY_REVIEWED))
    }
}
