//! Borrow, return and review endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{enums::OrderStatus, review::CreateReview},
    AppState,
};

use super::{parse_book_id, AuthenticatedUser, JsonBody};

/// Borrow response with the due date
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    pub message: String,
    pub order_id: i32,
    pub due_date: DateTime<Utc>,
}

/// Return response with the closing status
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub message: String,
    pub order_id: i32,
    pub status: OrderStatus,
    pub return_date: Option<DateTime<Utc>>,
}

/// Review response
#[derive(Serialize, ToSchema)]
pub struct ReviewResponse {
    pub message: String,
    pub review_id: i32,
}

/// Borrow a copy of a book
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book borrowed", body = BorrowResponse),
        (status = 400, description = "No copies available, already borrowed or invalid ID", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<BorrowResponse>> {
    let book_id = parse_book_id(&id)?;

    let order = state
        .services
        .lending
        .borrow(identity.user_id, book_id, Utc::now())
        .await?;

    Ok(Json(BorrowResponse {
        message: "Book borrowed successfully".to_string(),
        order_id: order.id,
        due_date: order.due_date,
    }))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/books/{id}/return",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 400, description = "No active borrow or invalid ID", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<ReturnResponse>> {
    let book_id = parse_book_id(&id)?;

    let order = state
        .services
        .lending
        .return_book(identity.user_id, book_id, Utc::now())
        .await?;

    Ok(Json(ReturnResponse {
        message: "Book returned successfully".to_string(),
        order_id: order.id,
        status: order.status,
        return_date: order.return_date,
    }))
}

/// Review a book after returning it
#[utoipa::path(
    post,
    path = "/books/{id}/review",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = CreateReview,
    responses(
        (status = 201, description = "Review added", body = ReviewResponse),
        (status = 400, description = "Invalid rating, not eligible or already reviewed", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn review_book(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<CreateReview>,
) -> AppResult<(StatusCode, Json<ReviewResponse>)> {
    let book_id = parse_book_id(&id)?;

    let review = state
        .services
        .lending
        .review(identity.user_id, book_id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            message: "Review added successfully".to_string(),
            review_id: review.id,
        }),
    ))
}
