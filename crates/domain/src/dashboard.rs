//! Back-office dashboard counters.

use common::{AccountClass, ShipmentStatus};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::error::Result;

/// Orders per shipment status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: u64,
    pub shipped: u64,
    pub delivered: u64,
    pub cancelled: u64,
}

impl StatusCounts {
    /// Returns the count for one status.
    pub fn get(&self, status: ShipmentStatus) -> u64 {
        match status {
            ShipmentStatus::Pending => self.pending,
            ShipmentStatus::Shipped => self.shipped,
            ShipmentStatus::Delivered => self.delivered,
            ShipmentStatus::Cancelled => self.cancelled,
        }
    }
}

/// Snapshot of the counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_products: u64,
    /// Products at or below their critical threshold.
    pub critical_stock: u64,
    pub out_of_stock: u64,
    pub total_accounts: u64,
    pub admins: u64,
    pub customers: u64,
    pub total_orders: u64,
    pub orders_by_status: StatusCounts,
}

impl DashboardStats {
    /// Loads every counter from the store.
    pub async fn load<S: Store>(store: &S) -> Result<Self> {
        let (total_products, critical_stock, out_of_stock) = tokio::try_join!(
            store.count_products(),
            store.count_critical_stock(),
            store.count_out_of_stock(),
        )?;
        let (total_accounts, admins, customers) = tokio::try_join!(
            store.count_accounts(),
            store.count_by_class(AccountClass::Admin),
            store.count_by_class(AccountClass::Customer),
        )?;
        let (total_orders, pending, shipped, delivered, cancelled) = tokio::try_join!(
            store.count_orders(),
            store.count_by_status(ShipmentStatus::Pending),
            store.count_by_status(ShipmentStatus::Shipped),
            store.count_by_status(ShipmentStatus::Delivered),
            store.count_by_status(ShipmentStatus::Cancelled),
        )?;

        Ok(Self {
            total_products,
            critical_stock,
            out_of_stock,
            total_accounts,
            admins,
            customers,
            total_orders,
            orders_by_status: StatusCounts {
                pending,
                shipped,
                delivered,
                cancelled,
            },
        })
    }
}
