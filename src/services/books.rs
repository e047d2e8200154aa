//! Book catalog service

use crate::{
    config::CacheConfig,
    error::{AppError, AppResult},
    models::book::{BookDetails, CreateBook, UpdateBook},
    pagination::{PageQuery, PageSpec, Paginated},
    repository::Repository,
    services::cache::{self, CacheService},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    cache_config: CacheConfig,
    cache: CacheService,
}

impl CatalogService {
    pub fn new(repository: Repository, cache_config: CacheConfig, cache: CacheService) -> Self {
        Self {
            repository,
            cache_config,
            cache,
        }
    }

    /// Register a new book in the inventory
    pub async fn create_book(&self, request: CreateBook, created_by: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.create(&request, created_by).await?;

        let details = self
            .repository
            .books
            .get_with_owner(book.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Book {} vanished after insert", book.id)))?;

        tracing::info!("Created book {} ({:?})", details.id, details.title);

        self.cache
            .set_json(
                &cache::book_key(details.id),
                &details,
                self.cache_config.entity_ttl_seconds,
            )
            .await;
        self.cache
            .invalidate_prefix(cache::BOOK_LISTING_PREFIX)
            .await;

        Ok(details)
    }

    /// Update a book's bibliographic data or stock
    pub async fn update_book(&self, id: i32, changes: UpdateBook) -> AppResult<BookDetails> {
        let book = self.repository.books.update(id, &changes).await?;

        let details = self
            .repository
            .books
            .get_with_owner(book.id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Book {} vanished after update", book.id)))?;

        self.cache
            .set_json(
                &cache::book_key(details.id),
                &details,
                self.cache_config.entity_ttl_seconds,
            )
            .await;
        self.cache
            .invalidate_prefix(cache::BOOK_LISTING_PREFIX)
            .await;

        Ok(details)
    }

    /// Get a single book, served through the cache
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        let repository = self.repository.clone();
        self.cache
            .read_through(
                &cache::book_key(id),
                self.cache_config.entity_ttl_seconds,
                move || async move {
                    repository
                        .books
                        .get_with_owner(id)
                        .await?
                        .ok_or(AppError::BookNotFound)
                },
            )
            .await
    }

    /// Remove a book that has no active borrows
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.get_by_id(id).await?;

        if self.repository.borrows.count_active_for_book(id).await? > 0 {
            return Err(AppError::BookInUse);
        }

        self.repository.books.delete(id).await?;

        self.cache.delete(&cache::book_key(id)).await;
        self.cache
            .invalidate_prefix(cache::BOOK_LISTING_PREFIX)
            .await;

        Ok(())
    }

    /// List books with pagination, served through the cache
    pub async fn list_books(&self, query: &PageQuery) -> AppResult<Paginated<BookDetails>> {
        let spec = PageSpec::from_query(query);
        let repository = self.repository.clone();

        self.cache
            .read_through(
                &spec.cache_key("books"),
                self.cache_config.listing_ttl_seconds,
                move || async move {
                    let total_rows = repository.books.count().await?;
                    let data = repository.books.list(spec.offset(), spec.limit).await?;
                    Ok(Paginated::new(spec, total_rows, data))
                },
            )
            .await
    }
}
