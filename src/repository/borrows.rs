//! Borrow ledger repository for database operations
//!
//! Borrow records are append-then-close: a record is inserted as `borrowed`
//! and later flipped to `returned` exactly once. Nothing here deletes rows.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookSummary,
        borrow::{BorrowDetails, BorrowRecord, BorrowStatus},
        user::UserSummary,
    },
};

#[derive(Clone)]
pub struct BorrowsRepository {
    pool: Pool<Postgres>,
}

impl BorrowsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Insert a new record in `borrowed` status, inside the caller's
    /// transaction. Returns the new record ID.
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        book_id: i32,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO borrow_records (user_id, book_id, borrow_date, due_date, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(borrow_date)
        .bind(due_date)
        .bind(BorrowStatus::Borrowed)
        .fetch_one(conn)
        .await?;

        Ok(id)
    }

    /// Find the active record for a (user, book) pair, inside the caller's
    /// transaction
    pub async fn find_active(
        &self,
        conn: &mut PgConnection,
        user_id: i32,
        book_id: i32,
    ) -> AppResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            SELECT * FROM borrow_records
            WHERE user_id = $1 AND book_id = $2 AND status = $3
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(BorrowStatus::Borrowed)
        .fetch_optional(conn)
        .await?;

        Ok(record)
    }

    /// Count a user's active borrows, inside the caller's transaction
    pub async fn count_active(&self, conn: &mut PgConnection, user_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(BorrowStatus::Borrowed)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// Close a record, inside the caller's transaction
    pub async fn mark_returned(
        &self,
        conn: &mut PgConnection,
        record_id: i32,
        returned_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE borrow_records
            SET status = $2, return_date = $3, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(record_id)
        .bind(BorrowStatus::Returned)
        .bind(returned_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Load a record with its user and book attached, inside the caller's
    /// transaction; used to build the response before the unit commits
    pub async fn get_details(
        &self,
        conn: &mut PgConnection,
        record_id: i32,
    ) -> AppResult<BorrowDetails> {
        let row = sqlx::query(
            r#"
            SELECT br.id, br.borrow_date, br.due_date, br.return_date, br.status,
                   u.id AS user_id, u.firstname, u.lastname, u.email, u.role,
                   b.id AS book_id, b.title, b.author, b.stock
            FROM borrow_records br
            JOIN users u ON u.id = br.user_id
            JOIN books b ON b.id = br.book_id
            WHERE br.id = $1
            "#,
        )
        .bind(record_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Borrow record {} vanished", record_id)))?;

        Ok(borrow_details_from_row(row))
    }

    /// List a user's active borrows with their books attached, newest first
    pub async fn list_active_for_user(&self, user_id: i32) -> AppResult<Vec<BorrowDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT br.id, br.borrow_date, br.due_date, br.return_date, br.status,
                   u.id AS user_id, u.firstname, u.lastname, u.email, u.role,
                   b.id AS book_id, b.title, b.author, b.stock
            FROM borrow_records br
            JOIN users u ON u.id = br.user_id
            JOIN books b ON b.id = br.book_id
            WHERE br.user_id = $1 AND br.status = $2
            ORDER BY br.borrow_date DESC
            "#,
        )
        .bind(user_id)
        .bind(BorrowStatus::Borrowed)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(borrow_details_from_row).collect())
    }

    /// Count active borrows referencing a book
    pub async fn count_active_for_book(&self, book_id: i32) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE book_id = $1 AND status = $2",
        )
        .bind(book_id)
        .bind(BorrowStatus::Borrowed)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

fn borrow_details_from_row(row: sqlx::postgres::PgRow) -> BorrowDetails {
    BorrowDetails {
        id: row.get("id"),
        borrow_date: row.get("borrow_date"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
        status: row.get("status"),
        user: UserSummary {
            id: row.get("user_id"),
            firstname: row.get("firstname"),
            lastname: row.get("lastname"),
            email: row.get("email"),
            role: row.get("role"),
        },
        book: BookSummary {
            id: row.get("book_id"),
            title: row.get("title"),
            author: row.get("author"),
            stock: row.get("stock"),
        },
    }
}
