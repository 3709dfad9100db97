//! Catalog reads.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use super::{Paginated, ServiceError};
use crate::domain::aggregates::Product;
use crate::storage::{Database, Page};

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<dyn Database>,
}

impl CatalogService {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list_products(&self, page: Page) -> Result<Paginated<Product>, ServiceError> {
        let mut tx = self.db.begin().await?;
        let (products, total) = tx.list_active_products(page).await?;
        tx.commit().await?;
        Ok(Paginated::new(products, total, page))
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<Product, ServiceError> {
        let mut tx = self.db.begin().await?;
        let product = tx.find_product(id).await?;
        tx.commit().await?;
        product.filter(|p| p.is_active).ok_or(ServiceError::ProductNotFound)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::storage::memory::MemoryDatabase;

    #[tokio::test]
    async fn inactive_products_are_hidden() {
        let db = MemoryDatabase::new();
        let visible = db.insert_product(Product::new("Visible", Decimal::from(5), 1)).await;
        let mut hidden = Product::new("Hidden", Decimal::from(5), 1);
        hidden.is_active = false;
        let hidden = db.insert_product(hidden).await;

        let catalog = CatalogService::new(Arc::new(db));
        let page = catalog.list_products(Page::first()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, visible.id);

        assert!(catalog.get_product(visible.id).await.is_ok());
        assert!(matches!(catalog.get_product(hidden.id).await, Err(ServiceError::ProductNotFound)));
    }
}
