//! Borrow record model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use super::book::BookSummary;
use super::user::UserSummary;

/// Borrow record lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Borrowed,
    Returned,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Borrowed => "borrowed",
            BorrowStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "borrowed" => Ok(BorrowStatus::Borrowed),
            "returned" => Ok(BorrowStatus::Returned),
            _ => Err(format!("Invalid borrow status: {}", s)),
        }
    }
}

// SQLx conversion for BorrowStatus (stored as text)
impl sqlx::Type<Postgres> for BorrowStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for BorrowStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BorrowStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Borrow record from database
///
/// Ties one user to one book. At most one record per (user, book) pair may be
/// in `borrowed` status; records transition to `returned` exactly once and are
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRecord {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrow record with its user and book attached, as returned by the
/// borrowing engine
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowDetails {
    pub id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowStatus,
    pub user: UserSummary,
    pub book: BookSummary,
}

/// Borrow request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BorrowBook {
    #[validate(range(min = 1, message = "book_id is required"))]
    pub book_id: i32,
    pub due_date: DateTime<Utc>,
}

/// Return request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnBook {
    #[validate(range(min = 1, message = "book_id is required"))]
    pub book_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_exact_values_only() {
        assert_eq!(
            "borrowed".parse::<BorrowStatus>().unwrap(),
            BorrowStatus::Borrowed
        );
        assert_eq!(
            "returned".parse::<BorrowStatus>().unwrap(),
            BorrowStatus::Returned
        );
        assert!("Borrowed".parse::<BorrowStatus>().is_err());
        assert!("overdue".parse::<BorrowStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&BorrowStatus::Borrowed).unwrap(),
            "\"borrowed\""
        );
        assert_eq!(
            serde_json::to_string(&BorrowStatus::Returned).unwrap(),
            "\"returned\""
        );
    }
}
