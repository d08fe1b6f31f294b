//! Records persisted by the stores.

use common::{AccountClass, Money, OrderNumber, ProductCode, Run, ShipmentStatus};
use serde::{Deserialize, Serialize};

/// A catalog product.
///
/// `stock` is committed warehouse stock. It is signed because the data layer
/// does not enforce a floor; callers are expected to check before writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub code: ProductCode,
    pub category: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i64,
    pub critical_stock: i64,
    pub image: String,
}

impl Product {
    /// Returns true if stock is at or below the critical threshold.
    pub fn is_critical(&self) -> bool {
        self.stock <= self.critical_stock
    }

    /// Returns true if no stock is left.
    pub fn is_out_of_stock(&self) -> bool {
        self.stock == 0
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub run: Run,
    pub name: String,
    pub surnames: String,
    pub email: String,
    /// Argon2 PHC string, never the plaintext password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Empty when the account holder gave no phone.
    pub phone: String,
    /// Birth date as entered, `dd-MM-yyyy`.
    pub birth_date: String,
    pub class: AccountClass,
    pub region: String,
    pub comuna: String,
    pub address: String,
}

impl Account {
    /// Returns true for back-office accounts.
    pub fn is_admin(&self) -> bool {
        self.class == AccountClass::Admin
    }
}

/// An order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub number: OrderNumber,
    /// Creation date, `dd/MM/yyyy`.
    pub date: String,
    pub customer: Run,
    pub status: ShipmentStatus,
    pub total: Money,
}

/// One product row of a persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_number: OrderNumber,
    pub product_code: ProductCode,
    /// Name at the time of purchase.
    pub product_name: String,
    pub quantity: u32,
    /// Price at the time of purchase.
    pub unit_price: Money,
}

impl OrderLine {
    /// Returns quantity times unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A line item to be written; the store assigns id and order number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_code: ProductCode,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// An order to be placed; the store allocates its number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer: Run,
    pub date: String,
    pub status: ShipmentStatus,
    pub total: Money,
    pub lines: Vec<NewOrderLine>,
}

/// An order header joined with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithLines {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

impl OrderWithLines {
    /// Returns the total number of units across all lines.
    pub fn unit_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}
