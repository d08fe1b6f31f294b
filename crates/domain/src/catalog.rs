//! Back-office catalog management.

use common::ProductCode;
use store::{CatalogStore, Product, SnapshotStream};

use crate::error::{DomainError, Result};
use crate::validation::ProductForm;

/// Category choice that disables the category filter.
pub const ALL_CATEGORIES: &str = "Todas";

/// Shopper-facing product filter.
///
/// A blank name matches everything; otherwise the product name must contain
/// it, ignoring case. A missing category or [`ALL_CATEGORIES`] matches every
/// category; any other value must equal the product's category exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub name: String,
    pub category: Option<String>,
}

impl ProductFilter {
    /// Builds a filter from the search box and the category picker.
    pub fn new(name: impl Into<String>, category: Option<&str>) -> Self {
        Self {
            name: name.into(),
            category: category.map(str::to_string),
        }
    }

    /// Returns true if `product` passes both filters.
    pub fn matches(&self, product: &Product) -> bool {
        let name_ok = self.name.trim().is_empty()
            || product
                .name
                .to_lowercase()
                .contains(&self.name.to_lowercase());
        let category_ok = match self.category.as_deref() {
            None | Some(ALL_CATEGORIES) => true,
            Some(category) => product.category == category,
        };
        name_ok && category_ok
    }

    /// Keeps the products that match, in their original order.
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        products.into_iter().filter(|p| self.matches(p)).collect()
    }
}

/// Service for managing catalog products.
#[derive(Debug, Clone)]
pub struct CatalogService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> CatalogService<S> {
    /// Creates a catalog service over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validates a form and inserts the product, replacing any product with
    /// the same code.
    #[tracing::instrument(skip(self, form), fields(code = %form.code))]
    pub async fn add_product(&self, form: ProductForm) -> Result<Product> {
        form.validate()?;
        let product = form.into_product();
        self.store.insert_product(product.clone()).await?;
        tracing::info!(code = %product.code, "product saved");
        Ok(product)
    }

    /// Validates a form and replaces an existing product.
    #[tracing::instrument(skip(self, form), fields(code = %form.code))]
    pub async fn update_product(&self, form: ProductForm) -> Result<Product> {
        form.validate()?;
        let product = form.into_product();
        if self.store.product(&product.code).await?.is_none() {
            return Err(DomainError::ProductNotFound(product.code));
        }
        self.store.update_product(product.clone()).await?;
        Ok(product)
    }

    /// Looks up a product by code, as a barcode scan does.
    pub async fn product(&self, code: &ProductCode) -> Result<Option<Product>> {
        Ok(self.store.product(code).await?)
    }

    /// Lists products ordered by code.
    pub async fn products(&self) -> Result<Vec<Product>> {
        Ok(self.store.products().await?)
    }

    /// Streams the product list, re-emitted on every change.
    pub fn watch_products(&self) -> SnapshotStream<Product> {
        self.store.watch_products()
    }

    /// Lists products whose name contains `query`, ignoring case, within
    /// `category`. See [`ProductFilter`] for the matching rules.
    pub async fn search(&self, query: &str, category: Option<&str>) -> Result<Vec<Product>> {
        let filter = ProductFilter::new(query, category);
        Ok(filter.apply(self.store.products().await?))
    }

    /// Lists distinct categories.
    pub async fn categories(&self) -> Result<Vec<String>> {
        Ok(self.store.categories().await?)
    }

    /// Deletes a product. Returns false if it did not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, code: &ProductCode) -> Result<bool> {
        Ok(self.store.delete_product(code).await?)
    }
}
