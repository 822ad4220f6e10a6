//! Product and customer maintenance outside the order flow.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use quill_core::validation::{validate_customer, validate_product};
use quill_core::{new_id, Customer, Product};
use quill_store::{EntityStore, Repository};

use crate::error::LedgerResult;

#[derive(Clone)]
pub struct Catalog {
    products: Repository<Product>,
    customers: Repository<Customer>,
}

impl Catalog {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Catalog {
            products: Repository::new(Arc::clone(&store)),
            customers: Repository::new(store),
        }
    }

    /// Normalizes, validates and stores a product. Returns what was stored.
    pub async fn save_product(&self, mut product: Product) -> LedgerResult<Product> {
        if product.id.trim().is_empty() {
            product.id = new_id(None);
        }
        product.normalize(&Utc::now().timestamp_millis().to_string());
        validate_product(&product)?;

        self.products.upsert(&product).await?;
        info!(product_id = %product.id, code = %product.code, "Product saved");
        Ok(product)
    }

    pub async fn delete_product(&self, product_id: &str) -> LedgerResult<()> {
        self.products.remove(product_id).await?;
        info!(product_id = %product_id, "Product deleted");
        Ok(())
    }

    /// Deletes every non-service product with no stock left.
    pub async fn purge_out_of_stock(&self) -> LedgerResult<usize> {
        let empty: Vec<Product> = self
            .products
            .list()
            .await?
            .into_iter()
            .filter(|p| !p.is_service() && p.stock <= 0)
            .collect();

        for product in &empty {
            self.products.remove(&product.id).await?;
        }
        info!(removed = empty.len(), "Purged out-of-stock products");
        Ok(empty.len())
    }

    pub async fn save_customer(&self, mut customer: Customer) -> LedgerResult<Customer> {
        if customer.id.trim().is_empty() {
            customer.id = new_id(None);
        }
        validate_customer(&customer)?;

        self.customers.upsert(&customer).await?;
        info!(customer_id = %customer.id, code = %customer.code, "Customer saved");
        Ok(customer)
    }

    pub async fn delete_customer(&self, customer_id: &str) -> LedgerResult<()> {
        self.customers.remove(customer_id).await?;
        info!(customer_id = %customer_id, "Customer deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::testing::{customer, memory_store, product};
    use quill_core::{Money, ProductCategory, SERVICE_STOCK};

    #[tokio::test]
    async fn test_save_product_fills_defaults() {
        let catalog = Catalog::new(memory_store().await);

        let mut photo = product("", 500, 0, 0);
        photo.code = String::new();
        photo.wholesale_price = None;
        photo.category = ProductCategory::PhotoService;

        let saved = catalog.save_product(photo).await.unwrap();
        assert_eq!(saved.id.len(), 32);
        assert!(saved.code.starts_with("SP"));
        assert_eq!(saved.stock, SERVICE_STOCK);
        assert_eq!(saved.wholesale_price, Some(Money::from_dong(500)));
    }

    #[tokio::test]
    async fn test_save_product_rejects_blank_name() {
        let catalog = Catalog::new(memory_store().await);
        let mut nameless = product("p1", 500, 0, 0);
        nameless.name = "  ".into();
        assert!(matches!(
            catalog.save_product(nameless).await,
            Err(LedgerError::Core(_))
        ));
    }

    #[tokio::test]
    async fn test_purge_out_of_stock() {
        let store = memory_store().await;
        let catalog = Catalog::new(Arc::clone(&store));
        catalog.save_product(product("p1", 1_000, 500, 0)).await.unwrap();
        catalog.save_product(product("p2", 1_000, 500, -3)).await.unwrap();
        catalog.save_product(product("p3", 1_000, 500, 4)).await.unwrap();
        let mut photo = product("svc", 500, 0, 0);
        photo.category = ProductCategory::PhotoService;
        catalog.save_product(photo).await.unwrap();

        assert_eq!(catalog.purge_out_of_stock().await.unwrap(), 2);

        let products: Repository<Product> = Repository::new(store);
        let mut left: Vec<String> = products.list().await.unwrap().into_iter().map(|p| p.id).collect();
        left.sort();
        assert_eq!(left, vec!["p3".to_string(), "svc".to_string()]);
    }

    #[tokio::test]
    async fn test_customer_save_and_delete() {
        let store = memory_store().await;
        let catalog = Catalog::new(Arc::clone(&store));
        let customers: Repository<Customer> = Repository::new(store);

        let saved = catalog.save_customer(customer("", "0901")).await.unwrap();
        assert!(customers.exists(&saved.id).await.unwrap());

        catalog.delete_customer(&saved.id).await.unwrap();
        assert!(customers.list().await.unwrap().is_empty());

        assert!(catalog.save_customer(customer("c2", " ")).await.is_err());
    }
}
