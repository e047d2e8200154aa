//! Borrow and return endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::{
    error::AppResult,
    models::borrow::{BorrowBook, BorrowDetails, ReturnBook},
};

use super::AuthenticatedUser;

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = BorrowBook,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowDetails),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Members only"),
        (status = 404, description = "User or book not found"),
        (status = 409, description = "Unavailable, already borrowed, or borrow limit reached")
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BorrowBook>,
) -> AppResult<(StatusCode, Json<BorrowDetails>)> {
    claims.require_member()?;
    request.validate()?;

    let record = state
        .services
        .borrowing
        .borrow_book(claims.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/return",
    tag = "borrows",
    security(("bearer_auth" = [])),
    request_body = ReturnBook,
    responses(
        (status = 200, description = "Book returned", body = BorrowDetails),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Members only"),
        (status = 404, description = "User or book not found"),
        (status = 409, description = "Not currently borrowed")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ReturnBook>,
) -> AppResult<Json<BorrowDetails>> {
    claims.require_member()?;
    request.validate()?;

    let record = state
        .services
        .borrowing
        .return_book(claims.user_id, request.book_id)
        .await?;

    Ok(Json(record))
}

/// List the authenticated member's active borrows
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "borrows",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active borrows", body = Vec<BorrowDetails>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Members only")
    )
)]
pub async fn list_my_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowDetails>>> {
    claims.require_member()?;

    let borrows = state
        .services
        .borrowing
        .list_user_borrows(claims.user_id)
        .await?;
    Ok(Json(borrows))
}
