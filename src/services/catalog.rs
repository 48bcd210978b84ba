//! Catalog management service

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookDetails, CreateBook, NewBook},
    repository::Store,
};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Every book with its genre name and author names
    pub async fn list_books(&self) -> AppResult<Vec<BookDetails>> {
        let books = self.store.list_books().await?;
        if books.is_empty() {
            return Ok(Vec::new());
        }

        let book_ids: Vec<i32> = books.iter().map(|b| b.id).collect();
        let genre_ids: Vec<i32> = books
            .iter()
            .map(|b| b.genre_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let genres: HashMap<i32, String> = self
            .store
            .find_genres(&genre_ids)
            .await?
            .into_iter()
            .map(|g| (g.id, g.name))
            .collect();

        let mut authors: HashMap<i32, Vec<String>> = HashMap::new();
        for link in self.store.find_book_authors(&book_ids).await? {
            authors.entry(link.book_id).or_default().push(link.name);
        }

        Ok(books
            .into_iter()
            .map(|book| {
                let genre = genres.get(&book.genre_id).cloned().unwrap_or_default();
                let names = authors.remove(&book.id).unwrap_or_default();
                BookDetails::new(book, genre, names)
            })
            .collect())
    }

    /// Create a book after checking its genre and authors exist
    pub async fn create_book(&self, request: CreateBook) -> AppResult<Book> {
        request.validate()?;

        if self.store.get_genre(request.genre_id).await?.is_none() {
            tracing::debug!("Catalog create rejected: unknown genre {}", request.genre_id);
            return Err(AppError::Validation("Genre not found".to_string()));
        }

        let author_ids: Vec<i32> = request
            .author_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !author_ids.is_empty() {
            let found = self.store.find_authors(&author_ids).await?;
            if found.len() != author_ids.len() {
                tracing::debug!(
                    "Catalog create rejected: {} of {} author(s) found",
                    found.len(),
                    author_ids.len()
                );
                return Err(AppError::Validation("One or more authors not found".to_string()));
            }
        }

        let book = self
            .store
            .insert_book(NewBook::from(request), &author_ids)
            .await?;

        tracing::info!(
            "Catalog create: book id={} isbn={} with {} author(s)",
            book.id,
            book.isbn,
            author_ids.len()
        );
        Ok(book)
    }

    /// Delete a book; the store refuses while orders or reviews reference it
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        if self.store.get_book(id).await?.is_none() {
            return Err(AppError::NotFound("Book not found".to_string()));
        }

        if let Err(err) = self.store.delete_book(id).await {
            tracing::debug!("Catalog delete rejected: book id={}: {}", id, err);
            return Err(err);
        }
        tracing::info!("Catalog delete: book id={}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{author::NewAuthor, genre::NewGenre},
        repository::{memory::MemoryStore, MockStore},
    };

    fn create_request(genre_id: i32, author_ids: Vec<i32>) -> CreateBook {
        CreateBook {
            title: "The Left Hand of Darkness".to_string(),
            description: Some("Gethen, in winter".to_string()),
            publication_year: Some(1969),
            isbn: "9780441478125".to_string(),
            genre_id,
            total_copies: 3,
            cover_url: None,
            author_ids,
        }
    }

    async fn seeded() -> (MemoryStore, i32, i32) {
        let store = MemoryStore::new();
        let genre = store
            .insert_genre(NewGenre { name: "Science fiction".into(), description: None })
            .await
            .unwrap();
        let author = store
            .insert_author(NewAuthor { name: "Ursula K. Le Guin".into(), ..Default::default() })
            .await
            .unwrap();
        (store, genre.id, author.id)
    }

    #[tokio::test]
    async fn created_book_starts_fully_available_and_lists_with_names() {
        let (store, genre_id, author_id) = seeded().await;
        let catalog = CatalogService::new(Arc::new(store));

        let book = catalog.create_book(create_request(genre_id, vec![author_id])).await.unwrap();
        assert_eq!(book.available_copies, 3);
        assert_eq!(book.total_copies, 3);

        let listed = catalog.list_books().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].genre, "Science fiction");
        assert_eq!(listed[0].authors, vec!["Ursula K. Le Guin".to_string()]);
    }

    #[tokio::test]
    async fn unknown_genre_is_a_validation_error() {
        let (store, _, author_id) = seeded().await;
        let catalog = CatalogService::new(Arc::new(store.clone()));

        let err = catalog.create_book(create_request(999, vec![author_id])).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == "Genre not found"));
        assert!(store.list_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_author_is_a_validation_error() {
        let (store, genre_id, author_id) = seeded().await;
        let catalog = CatalogService::new(Arc::new(store.clone()));

        let err = catalog
            .create_book(create_request(genre_id, vec![author_id, 999]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.list_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_author_ids_link_once() {
        let (store, genre_id, author_id) = seeded().await;
        let catalog = CatalogService::new(Arc::new(store));

        catalog
            .create_book(create_request(genre_id, vec![author_id, author_id]))
            .await
            .unwrap();
        let listed = catalog.list_books().await.unwrap();
        assert_eq!(listed[0].authors.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_rejected() {
        let (store, genre_id, _) = seeded().await;
        let catalog = CatalogService::new(Arc::new(store));

        catalog.create_book(create_request(genre_id, vec![])).await.unwrap();
        let err = catalog.create_book(create_request(genre_id, vec![])).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn deleting_a_missing_book_is_not_found() {
        let catalog = CatalogService::new(Arc::new(MemoryStore::new()));
        let err = catalog.delete_book(42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn invalid_request_never_reaches_the_store() {
        // No expectations set: any store call would panic
        let catalog = CatalogService::new(Arc::new(MockStore::new()));
        let request = CreateBook { total_copies: 0, ..create_request(1, vec![]) };

        let err = catalog.create_book(request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_database_error() {
        let mut store = MockStore::new();
        store
            .expect_list_books()
            .returning(|| Err(AppError::Database(sqlx::Error::PoolTimedOut)));
        let catalog = CatalogService::new(Arc::new(store));

        let err = catalog.list_books().await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
