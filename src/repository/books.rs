//! Books repository for database operations

use chrono::Utc;
use sqlx::{PgConnection, Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookDetails, CreateBook, UpdateBook},
        user::UserSummary,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::BookNotFound)
    }

    /// Get book by ID with its registering user attached
    pub async fn get_with_owner(&self, id: i32) -> AppResult<Option<BookDetails>> {
        let row = sqlx::query(
            r#"
            SELECT b.id, b.title, b.author, b.description, b.stock,
                   b.created_at, b.updated_at,
                   u.id AS owner_id, u.firstname, u.lastname, u.email, u.role
            FROM books b
            JOIN users u ON u.id = b.created_by
            WHERE b.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(book_details_from_row))
    }

    /// Create a new book
    pub async fn create(&self, book: &CreateBook, created_by: i32) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, description, stock, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(book.stock)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Apply a partial update; absent fields keep their current value
    pub async fn update(&self, id: i32, changes: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                description = COALESCE($4, description),
                stock = COALESCE($5, stock),
                updated_at = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.author)
        .bind(&changes.description)
        .bind(changes.stock)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::BookNotFound)
    }

    /// Delete a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::BookNotFound);
        }
        Ok(())
    }

    /// Count all books
    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// List books with their registering user, newest first
    pub async fn list(&self, offset: i64, limit: i64) -> AppResult<Vec<BookDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.title, b.author, b.description, b.stock,
                   b.created_at, b.updated_at,
                   u.id AS owner_id, u.firstname, u.lastname, u.email, u.role
            FROM books b
            JOIN users u ON u.id = b.created_by
            ORDER BY b.created_at DESC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(book_details_from_row).collect())
    }

    /// Get book by ID with a row lock, inside the caller's transaction.
    ///
    /// The lock serializes stock reads and writes made by concurrent borrow
    /// and return operations for the same book.
    pub async fn get_for_update(&self, conn: &mut PgConnection, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(book)
    }

    /// Set a book's stock count, inside the caller's transaction
    pub async fn set_stock(&self, conn: &mut PgConnection, id: i32, stock: i32) -> AppResult<()> {
        sqlx::query("UPDATE books SET stock = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(stock)
            .bind(Utc::now())
            .execute(conn)
            .await?;

        Ok(())
    }
}

fn book_details_from_row(row: sqlx::postgres::PgRow) -> BookDetails {
    BookDetails {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        description: row.get("description"),
        stock: row.get("stock"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        owner: Some(UserSummary {
            id: row.get("owner_id"),
            firstname: row.get("firstname"),
            lastname: row.get("lastname"),
            email: row.get("email"),
            role: row.get("role"),
        }),
    }
}
