use async_trait::async_trait;
use common::{OrderNumber, Run, ShipmentStatus};

use crate::{NewOrder, NewOrderLine, Order, OrderLine, OrderWithLines, Result, SnapshotStream};

/// Persistence for orders and their line items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Places an order as one atomic unit.
    ///
    /// Allocates the successor of the most recently inserted order number,
    /// writes the header and every line stamped with that number, and deducts
    /// each line's quantity from the product's committed stock. Concurrent
    /// calls are serialized so no two orders receive the same number. On any
    /// failure nothing is written.
    async fn place_order(&self, order: NewOrder) -> Result<Order>;

    /// Inserts an order header as given.
    ///
    /// Fails with `Conflict` if the number is taken.
    async fn insert_order(&self, order: Order) -> Result<()>;

    /// Inserts line items for an existing order. Returns the stored lines.
    ///
    /// Fails with `NotFound` if the order does not exist.
    async fn insert_lines(
        &self,
        number: &OrderNumber,
        lines: Vec<NewOrderLine>,
    ) -> Result<Vec<OrderLine>>;

    /// Deletes an order and its line items. Returns true if it existed.
    async fn delete_order(&self, number: &OrderNumber) -> Result<bool>;

    /// Replaces the header fields of an existing order.
    async fn update_order(&self, order: Order) -> Result<()>;

    /// Sets the status of an order. Returns the updated header, or None if
    /// the order does not exist.
    async fn update_status(
        &self,
        number: &OrderNumber,
        status: ShipmentStatus,
    ) -> Result<Option<Order>>;

    /// Fetches an order with its lines.
    async fn order(&self, number: &OrderNumber) -> Result<Option<OrderWithLines>>;

    /// Fetches all orders with their lines, in insertion order.
    async fn orders(&self) -> Result<Vec<OrderWithLines>>;

    /// Fetches the orders of one customer, in insertion order.
    async fn orders_for(&self, customer: &Run) -> Result<Vec<OrderWithLines>>;

    /// Observes orders with their lines, optionally for one customer only.
    fn watch_orders(&self, customer: Option<Run>) -> SnapshotStream<OrderWithLines>;

    /// Counts all orders.
    async fn count_orders(&self) -> Result<u64>;

    /// Counts orders in one status.
    async fn count_by_status(&self, status: ShipmentStatus) -> Result<u64>;

    /// Returns the most recently inserted order number, by insertion order.
    async fn last_order_number(&self) -> Result<Option<OrderNumber>>;
}
