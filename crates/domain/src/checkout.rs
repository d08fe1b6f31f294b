//! Checkout workflow: turns cart lines into a persisted order.

use std::time::Instant;

use common::{Money, Run, ShipmentStatus};
use store::{NewOrder, NewOrderLine, Order, OrderStore};

use crate::cart::CartError;
use crate::error::Result;

/// Format of order dates, e.g. `05/01/2025`.
pub const ORDER_DATE_FORMAT: &str = "%d/%m/%Y";

/// Returns today's date in local time, formatted for an order header.
pub fn today() -> String {
    chrono::Local::now().format(ORDER_DATE_FORMAT).to_string()
}

/// Places orders.
#[derive(Debug, Clone)]
pub struct CheckoutService<S: OrderStore> {
    store: S,
}

impl<S: OrderStore> CheckoutService<S> {
    /// Creates a checkout service over an order store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places an order for `customer` with the given lines and final total.
    ///
    /// The order starts `Pending` and is dated today. Numbering, the header,
    /// the lines and the stock deduction are one atomic store operation.
    #[tracing::instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn place_order(
        &self,
        customer: &Run,
        lines: Vec<NewOrderLine>,
        total: Money,
    ) -> Result<Order> {
        if lines.is_empty() {
            return Err(CartError::Empty.into());
        }

        let started = Instant::now();
        let line_count = lines.len();
        let order = self
            .store
            .place_order(NewOrder {
                customer: customer.clone(),
                date: today(),
                status: ShipmentStatus::Pending,
                total,
                lines,
            })
            .await?;

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(
            order = %order.number,
            customer = %order.customer,
            total = %order.total,
            lines = line_count,
            "order placed"
        );

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainError;
    use common::ProductCode;
    use store::{CatalogStore, InMemoryStore, Product};

    fn line(code: &str, quantity: u32) -> NewOrderLine {
        NewOrderLine {
            product_code: ProductCode::new(code),
            product_name: format!("Product {code}"),
            quantity,
            unit_price: Money::new(1000),
        }
    }

    #[test]
    fn test_today_format() {
        let date = today();
        assert_eq!(date.len(), 10);
        assert!(chrono::NaiveDate::parse_from_str(&date, ORDER_DATE_FORMAT).is_ok());
    }

    #[tokio::test]
    async fn test_empty_lines_rejected() {
        let service = CheckoutService::new(InMemoryStore::new());
        let err = service
            .place_order(&Run::new("20694795-3"), vec![], Money::zero())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Cart(CartError::Empty)));
    }

    #[tokio::test]
    async fn test_place_order_pending_and_numbered() {
        let store = InMemoryStore::new();
        store
            .insert_product(Product {
                code: ProductCode::new("AC001"),
                category: "Accesorios".to_string(),
                name: "Product AC001".to_string(),
                description: "Test".to_string(),
                price: Money::new(1000),
                stock: 5,
                critical_stock: 1,
                image: String::new(),
            })
            .await
            .unwrap();
        let service = CheckoutService::new(store.clone());

        let order = service
            .place_order(&Run::new("20694795-3"), vec![line("AC001", 2)], Money::new(2000))
            .await
            .unwrap();

        assert_eq!(order.number.as_str(), "SO1001");
        assert_eq!(order.status, ShipmentStatus::Pending);
        assert_eq!(order.total, Money::new(2000));
        assert_eq!(order.date, today());
        let stock = store.product(&ProductCode::new("AC001")).await.unwrap().unwrap().stock;
        assert_eq!(stock, 3);
    }
}
