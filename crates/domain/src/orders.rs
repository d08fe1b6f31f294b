//! Back-office order management.

use common::{OrderNumber, Run, ShipmentStatus};
use store::{Order, OrderStore, OrderWithLines, SnapshotStream};

use crate::error::{DomainError, Result};

/// Service for reviewing orders and moving them through the shipment
/// lifecycle.
#[derive(Debug, Clone)]
pub struct OrderService<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> OrderService<S> {
    /// Creates an order service over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Fetches one order with its lines.
    pub async fn order(&self, number: &OrderNumber) -> Result<Option<OrderWithLines>> {
        Ok(self.store.order(number).await?)
    }

    /// Lists every order with its lines.
    pub async fn orders(&self) -> Result<Vec<OrderWithLines>> {
        Ok(self.store.orders().await?)
    }

    /// Lists one customer's orders.
    pub async fn orders_for(&self, customer: &Run) -> Result<Vec<OrderWithLines>> {
        Ok(self.store.orders_for(customer).await?)
    }

    /// Streams orders, optionally for one customer only.
    pub fn watch_orders(&self, customer: Option<Run>) -> SnapshotStream<OrderWithLines> {
        self.store.watch_orders(customer)
    }

    /// Moves an order to `status`.
    ///
    /// Setting the current status again returns the order unchanged without
    /// writing.
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        number: &OrderNumber,
        status: ShipmentStatus,
    ) -> Result<Order> {
        let current = self
            .store
            .order(number)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(number.clone()))?
            .order;

        if current.status == status {
            return Ok(current);
        }
        if !current.status.can_transition_to(status) {
            return Err(DomainError::InvalidStatusTransition {
                number: number.clone(),
                from: current.status,
                to: status,
            });
        }

        let updated = self
            .store
            .update_status(number, status)
            .await?
            .ok_or_else(|| DomainError::OrderNotFound(number.clone()))?;
        tracing::info!(
            order = %number,
            from = %current.status,
            to = %status,
            "order status changed"
        );
        Ok(updated)
    }

    /// Deletes an order and its lines. Returns false if it did not exist.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, number: &OrderNumber) -> Result<bool> {
        Ok(self.store.delete_order(number).await?)
    }
}
