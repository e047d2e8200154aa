//! Borrowing engine
//!
//! Orchestrates rule enforcement and the atomic stock/ledger mutation for
//! borrow and return operations. Every rule check and write for one
//! operation runs inside a single database transaction; the transaction
//! handle is passed explicitly to each store call, and dropping it without
//! a commit rolls the whole unit back on any early return.
//!
//! Lock discipline: the user row is locked first, then the book row, in both
//! operations. The user lock serializes the duplicate and active-count
//! checks for one user; the book lock serializes stock movements for one
//! book. Two workers racing for the last copy agree on who saw stock >= 1.

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::borrow::{BorrowBook, BorrowDetails},
    repository::Repository,
    services::cache::{self, CacheService},
};

/// A user may hold at most this many active borrows
pub const MAX_ACTIVE_BORROWS: i64 = 5;

#[derive(Clone)]
pub struct BorrowingService {
    repository: Repository,
    cache: CacheService,
}

impl BorrowingService {
    pub fn new(repository: Repository, cache: CacheService) -> Self {
        Self { repository, cache }
    }

    /// Borrow a book for a member
    ///
    /// Checks, in order: user exists, book exists, stock available, no
    /// active borrow of the same book, active-borrow cap not reached. On
    /// success a `borrowed` record is created and the stock decremented,
    /// atomically.
    pub async fn borrow_book(&self, user_id: i32, request: BorrowBook) -> AppResult<BorrowDetails> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let user = self
            .repository
            .users
            .get_for_update(&mut tx, user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let book = self
            .repository
            .books
            .get_for_update(&mut tx, request.book_id)
            .await?
            .ok_or(AppError::BookNotFound)?;

        if book.stock < 1 {
            return Err(AppError::BookUnavailable);
        }

        if self
            .repository
            .borrows
            .find_active(&mut tx, user.id, book.id)
            .await?
            .is_some()
        {
            return Err(AppError::AlreadyBorrowed);
        }

        let active = self.repository.borrows.count_active(&mut tx, user.id).await?;
        if active >= MAX_ACTIVE_BORROWS {
            return Err(AppError::BorrowLimitReached);
        }

        let record_id = self
            .repository
            .borrows
            .create(&mut tx, user.id, book.id, now, request.due_date)
            .await?;

        self.repository
            .books
            .set_stock(&mut tx, book.id, book.stock - 1)
            .await?;

        let details = self.repository.borrows.get_details(&mut tx, record_id).await?;

        tx.commit().await?;

        tracing::info!(
            "User {} borrowed book {} (record {})",
            user.id,
            book.id,
            record_id
        );

        self.invalidate_book_entries(book.id).await;

        Ok(details)
    }

    /// Return a borrowed book
    ///
    /// Checks, in order: user exists, book exists, an active borrow of the
    /// book by this user exists. On success the record is closed and the
    /// stock incremented, atomically. A second return of the same book fails
    /// the active-borrow check and leaves the stock untouched.
    pub async fn return_book(&self, user_id: i32, book_id: i32) -> AppResult<BorrowDetails> {
        let now = Utc::now();
        let mut tx = self.repository.pool.begin().await?;

        let user = self
            .repository
            .users
            .get_for_update(&mut tx, user_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let book = self
            .repository
            .books
            .get_for_update(&mut tx, book_id)
            .await?
            .ok_or(AppError::BookNotFound)?;

        let record = self
            .repository
            .borrows
            .find_active(&mut tx, user.id, book.id)
            .await?
            .ok_or(AppError::NotBorrowed)?;

        self.repository
            .borrows
            .mark_returned(&mut tx, record.id, now)
            .await?;

        self.repository
            .books
            .set_stock(&mut tx, book.id, book.stock + 1)
            .await?;

        let details = self.repository.borrows.get_details(&mut tx, record.id).await?;

        tx.commit().await?;

        tracing::info!(
            "User {} returned book {} (record {})",
            user.id,
            book.id,
            record.id
        );

        self.invalidate_book_entries(book.id).await;

        Ok(details)
    }

    /// List a member's active borrows
    pub async fn list_user_borrows(&self, user_id: i32) -> AppResult<Vec<BorrowDetails>> {
        self.repository.users.get_by_id(user_id).await?;
        self.repository.borrows.list_active_for_user(user_id).await
    }

    /// Drop the cached entries a committed stock mutation made stale:
    /// the book's entity key and every paginated listing it could appear in.
    /// Best-effort; runs outside the transaction.
    async fn invalidate_book_entries(&self, book_id: i32) {
        self.cache.delete(&cache::book_key(book_id)).await;
        self.cache
            .invalidate_prefix(cache::BOOK_LISTING_PREFIX)
            .await;
    }
}
