use async_trait::async_trait;
use common::ProductCode;

use crate::{Product, Result, SnapshotStream};

/// Persistence for catalog products.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a product, replacing any product with the same code.
    async fn insert_product(&self, product: Product) -> Result<()>;

    /// Fetches a product by code. Returns None for unknown codes.
    async fn product(&self, code: &ProductCode) -> Result<Option<Product>>;

    /// Fetches all products, ordered by code.
    async fn products(&self) -> Result<Vec<Product>>;

    /// Observes the full product list.
    fn watch_products(&self) -> SnapshotStream<Product>;

    /// Replaces every field of an existing product.
    ///
    /// Fails with `NotFound` if no product has that code.
    async fn update_product(&self, product: Product) -> Result<()>;

    /// Overwrites the stock of a product.
    ///
    /// Read-modify-write of the whole record; the sign of `stock` is not
    /// checked. Returns the updated product, or None for unknown codes.
    async fn update_stock(&self, code: &ProductCode, stock: i64) -> Result<Option<Product>>;

    /// Deletes a product. Returns true if it existed.
    async fn delete_product(&self, code: &ProductCode) -> Result<bool>;

    /// Counts all products.
    async fn count_products(&self) -> Result<u64>;

    /// Counts products with stock at or below their critical threshold.
    async fn count_critical_stock(&self) -> Result<u64>;

    /// Counts products with zero stock.
    async fn count_out_of_stock(&self) -> Result<u64>;

    /// Lists distinct categories, sorted.
    async fn categories(&self) -> Result<Vec<String>>;
}
