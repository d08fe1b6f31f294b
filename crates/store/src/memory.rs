use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AccountClass, OrderNumber, ProductCode, Run, ShipmentStatus};
use tokio::sync::RwLock;

use crate::{
    ACCOUNT_EMAIL, Account, AccountStore, CatalogStore, ChangeFeed, NewOrder, NewOrderLine, Order,
    OrderLine, OrderStore, OrderWithLines, Product, Result, SnapshotStream, StoreError, Table,
    next_order_number,
};

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductCode, Product>,
    accounts: BTreeMap<Run, Account>,
    /// Headers in insertion order.
    orders: Vec<Order>,
    lines: Vec<OrderLine>,
    last_line_id: i64,
}

impl Tables {
    /// Fails if `account`'s email is already used by a different identity number.
    fn check_email_free(&self, account: &Account) -> Result<()> {
        let taken = self
            .accounts
            .values()
            .any(|a| a.email == account.email && a.run != account.run);
        if taken {
            return Err(StoreError::conflict(ACCOUNT_EMAIL, &account.email));
        }
        Ok(())
    }

    fn push_line(&mut self, number: &OrderNumber, line: NewOrderLine) -> OrderLine {
        self.last_line_id += 1;
        let stored = OrderLine {
            id: self.last_line_id,
            order_number: number.clone(),
            product_code: line.product_code,
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price: line.unit_price,
        };
        self.lines.push(stored.clone());
        stored
    }

    fn joined(&self, customer: Option<&Run>) -> Vec<OrderWithLines> {
        self.orders
            .iter()
            .filter(|order| customer.is_none_or(|run| &order.customer == run))
            .map(|order| self.with_lines(order))
            .collect()
    }

    fn with_lines(&self, order: &Order) -> OrderWithLines {
        OrderWithLines {
            order: order.clone(),
            lines: self
                .lines
                .iter()
                .filter(|line| line.order_number == order.number)
                .cloned()
                .collect(),
        }
    }

    fn order_mut(&mut self, number: &OrderNumber) -> Option<&mut Order> {
        self.orders.iter_mut().find(|order| &order.number == number)
    }
}

/// In-memory store for tests.
///
/// Provides the same semantics as [`crate::SqliteStore`]: one write lock
/// covers each operation, which makes `place_order` atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    feed: ChangeFeed,
}

impl InMemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the change feed of this store.
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn insert_product(&self, product: Product) -> Result<()> {
        self.tables
            .write()
            .await
            .products
            .insert(product.code.clone(), product);
        self.feed.notify(Table::Products);
        Ok(())
    }

    async fn product(&self, code: &ProductCode) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(code).cloned())
    }

    async fn products(&self) -> Result<Vec<Product>> {
        Ok(self.tables.read().await.products.values().cloned().collect())
    }

    fn watch_products(&self) -> SnapshotStream<Product> {
        let store = self.clone();
        self.feed.snapshots(Table::Products, move || {
            let store = store.clone();
            async move { store.products().await }
        })
    }

    async fn update_product(&self, product: Product) -> Result<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .products
            .get_mut(&product.code)
            .ok_or_else(|| StoreError::not_found("product", &product.code))?;
        *slot = product;
        drop(tables);
        self.feed.notify(Table::Products);
        Ok(())
    }

    async fn update_stock(&self, code: &ProductCode, stock: i64) -> Result<Option<Product>> {
        let mut tables = self.tables.write().await;
        let Some(product) = tables.products.get_mut(code) else {
            return Ok(None);
        };
        product.stock = stock;
        let updated = product.clone();
        drop(tables);
        self.feed.notify(Table::Products);
        Ok(Some(updated))
    }

    async fn delete_product(&self, code: &ProductCode) -> Result<bool> {
        let removed = self.tables.write().await.products.remove(code).is_some();
        if removed {
            self.feed.notify(Table::Products);
        }
        Ok(removed)
    }

    async fn count_products(&self) -> Result<u64> {
        Ok(self.tables.read().await.products.len() as u64)
    }

    async fn count_critical_stock(&self) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().filter(|p| p.is_critical()).count() as u64)
    }

    async fn count_out_of_stock(&self) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().filter(|p| p.is_out_of_stock()).count() as u64)
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let tables = self.tables.read().await;
        let mut categories: Vec<String> = tables
            .products
            .values()
            .map(|p| p.category.clone())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn insert_account(&self, account: Account) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.accounts.contains_key(&account.run) {
            return Err(StoreError::conflict("account", &account.run));
        }
        tables.check_email_free(&account)?;
        tables.accounts.insert(account.run.clone(), account);
        drop(tables);
        self.feed.notify(Table::Accounts);
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.tables.read().await.accounts.values().cloned().collect())
    }

    fn watch_accounts(&self) -> SnapshotStream<Account> {
        let store = self.clone();
        self.feed.snapshots(Table::Accounts, move || {
            let store = store.clone();
            async move { store.accounts().await }
        })
    }

    async fn account(&self, run: &Run) -> Result<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(run).cloned())
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().find(|a| a.email == email).cloned())
    }

    async fn update_account(&self, account: Account) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.check_email_free(&account)?;
        let slot = tables
            .accounts
            .get_mut(&account.run)
            .ok_or_else(|| StoreError::not_found("account", &account.run))?;
        *slot = account;
        drop(tables);
        self.feed.notify(Table::Accounts);
        Ok(())
    }

    async fn delete_account(&self, run: &Run) -> Result<bool> {
        let removed = self.tables.write().await.accounts.remove(run).is_some();
        if removed {
            self.feed.notify(Table::Accounts);
        }
        Ok(removed)
    }

    async fn count_accounts(&self) -> Result<u64> {
        Ok(self.tables.read().await.accounts.len() as u64)
    }

    async fn count_by_class(&self, class: AccountClass) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().filter(|a| a.class == class).count() as u64)
    }

    async fn run_exists(&self, run: &Run) -> Result<bool> {
        Ok(self.tables.read().await.accounts.contains_key(run))
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().any(|a| a.email == email))
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order> {
        let mut tables = self.tables.write().await;

        let number = next_order_number(tables.orders.last().map(|o| &o.number));
        if tables.orders.iter().any(|o| o.number == number) {
            return Err(StoreError::conflict("order", &number));
        }

        let header = Order {
            number: number.clone(),
            date: order.date,
            customer: order.customer,
            status: order.status,
            total: order.total,
        };
        tables.orders.push(header.clone());

        for line in order.lines {
            let quantity = i64::from(line.quantity);
            match tables.products.get_mut(&line.product_code) {
                Some(product) => product.stock -= quantity,
                None => tracing::warn!(
                    order = %number,
                    product = %line.product_code,
                    "ordered product is no longer in the catalog"
                ),
            }
            tables.push_line(&number, line);
        }
        drop(tables);

        self.feed.notify(Table::Orders);
        self.feed.notify(Table::Products);
        Ok(header)
    }

    async fn insert_order(&self, order: Order) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.orders.iter().any(|o| o.number == order.number) {
            return Err(StoreError::conflict("order", &order.number));
        }
        tables.orders.push(order);
        drop(tables);
        self.feed.notify(Table::Orders);
        Ok(())
    }

    async fn insert_lines(
        &self,
        number: &OrderNumber,
        lines: Vec<NewOrderLine>,
    ) -> Result<Vec<OrderLine>> {
        let mut tables = self.tables.write().await;
        if !tables.orders.iter().any(|o| &o.number == number) {
            return Err(StoreError::not_found("order", number));
        }
        let stored: Vec<OrderLine> = lines
            .into_iter()
            .map(|line| tables.push_line(number, line))
            .collect();
        drop(tables);
        self.feed.notify(Table::Orders);
        Ok(stored)
    }

    async fn delete_order(&self, number: &OrderNumber) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.orders.len();
        tables.orders.retain(|o| &o.number != number);
        let removed = tables.orders.len() != before;
        if removed {
            tables.lines.retain(|line| &line.order_number != number);
        }
        drop(tables);
        if removed {
            self.feed.notify(Table::Orders);
        }
        Ok(removed)
    }

    async fn update_order(&self, order: Order) -> Result<()> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .order_mut(&order.number)
            .ok_or_else(|| StoreError::not_found("order", &order.number))?;
        *slot = order;
        drop(tables);
        self.feed.notify(Table::Orders);
        Ok(())
    }

    async fn update_status(
        &self,
        number: &OrderNumber,
        status: ShipmentStatus,
    ) -> Result<Option<Order>> {
        let mut tables = self.tables.write().await;
        let Some(order) = tables.order_mut(number) else {
            return Ok(None);
        };
        order.status = status;
        let updated = order.clone();
        drop(tables);
        self.feed.notify(Table::Orders);
        Ok(Some(updated))
    }

    async fn order(&self, number: &OrderNumber) -> Result<Option<OrderWithLines>> {
        let tables = self.tables.read().await;
        Ok(tables
            .orders
            .iter()
            .find(|o| &o.number == number)
            .map(|order| tables.with_lines(order)))
    }

    async fn orders(&self) -> Result<Vec<OrderWithLines>> {
        Ok(self.tables.read().await.joined(None))
    }

    async fn orders_for(&self, customer: &Run) -> Result<Vec<OrderWithLines>> {
        Ok(self.tables.read().await.joined(Some(customer)))
    }

    fn watch_orders(&self, customer: Option<Run>) -> SnapshotStream<OrderWithLines> {
        let store = self.clone();
        self.feed.snapshots(Table::Orders, move || {
            let store = store.clone();
            let customer = customer.clone();
            async move { Ok(store.tables.read().await.joined(customer.as_ref())) }
        })
    }

    async fn count_orders(&self) -> Result<u64> {
        Ok(self.tables.read().await.orders.len() as u64)
    }

    async fn count_by_status(&self, status: ShipmentStatus) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().filter(|o| o.status == status).count() as u64)
    }

    async fn last_order_number(&self) -> Result<Option<OrderNumber>> {
        let tables = self.tables.read().await;
        Ok(tables.orders.last().map(|o| o.number.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use futures_util::StreamExt;

    fn product(code: &str, stock: i64, critical: i64) -> Product {
        Product {
            code: ProductCode::new(code),
            category: "Accesorios".to_string(),
            name: format!("Product {code}"),
            description: "Test product".to_string(),
            price: Money::new(5990),
            stock,
            critical_stock: critical,
            image: String::new(),
        }
    }

    fn account(run: &str, email: &str, class: AccountClass) -> Account {
        Account {
            run: Run::new(run),
            name: "Marco".to_string(),
            surnames: "Suazo".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            phone: String::new(),
            birth_date: "01-01-2000".to_string(),
            class,
            region: "Metropolitana".to_string(),
            comuna: "Santiago".to_string(),
            address: "Av. Siempre Viva 123".to_string(),
        }
    }

    fn new_order(customer: &str, lines: Vec<(&str, u32)>) -> NewOrder {
        NewOrder {
            customer: Run::new(customer),
            date: "01/01/2025".to_string(),
            status: ShipmentStatus::Pending,
            total: Money::new(1000),
            lines: lines
                .into_iter()
                .map(|(code, quantity)| NewOrderLine {
                    product_code: ProductCode::new(code),
                    product_name: format!("Product {code}"),
                    quantity,
                    unit_price: Money::new(5990),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_product_lookup_miss_is_none() {
        let store = InMemoryStore::new();
        assert!(store.product(&ProductCode::new("XX999")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_product_replaces() {
        let store = InMemoryStore::new();
        store.insert_product(product("AC001", 5, 1)).await.unwrap();
        store.insert_product(product("AC001", 9, 1)).await.unwrap();

        assert_eq!(store.count_products().await.unwrap(), 1);
        let stored = store.product(&ProductCode::new("AC001")).await.unwrap().unwrap();
        assert_eq!(stored.stock, 9);
    }

    #[tokio::test]
    async fn test_update_stock_does_not_check_sign() {
        let store = InMemoryStore::new();
        store.insert_product(product("AC001", 5, 1)).await.unwrap();

        let updated = store
            .update_stock(&ProductCode::new("AC001"), -2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.stock, -2);
        assert!(
            store
                .update_stock(&ProductCode::new("NOPE"), 1)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_stock_counters_and_categories() {
        let store = InMemoryStore::new();
        store.insert_product(product("AC001", 0, 5)).await.unwrap();
        store.insert_product(product("AC002", 5, 5)).await.unwrap();
        let mut other = product("DE001", 50, 5);
        other.category = "Decoración".to_string();
        store.insert_product(other).await.unwrap();

        assert_eq!(store.count_critical_stock().await.unwrap(), 2);
        assert_eq!(store.count_out_of_stock().await.unwrap(), 1);
        assert_eq!(
            store.categories().await.unwrap(),
            vec!["Accesorios".to_string(), "Decoración".to_string()]
        );
    }

    #[tokio::test]
    async fn test_duplicate_account_conflicts() {
        let store = InMemoryStore::new();
        store
            .insert_account(account("11111111-1", "a@gmail.com", AccountClass::Customer))
            .await
            .unwrap();
        let err = store
            .insert_account(account("11.111.111-1", "b@gmail.com", AccountClass::Customer))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_account_email_is_unique() {
        let store = InMemoryStore::new();
        store
            .insert_account(account("11111111-1", "a@gmail.com", AccountClass::Customer))
            .await
            .unwrap();
        let second = account("22222222-2", "b@gmail.com", AccountClass::Customer);
        store.insert_account(second.clone()).await.unwrap();

        let err = store
            .insert_account(account("33333333-3", "a@gmail.com", AccountClass::Customer))
            .await
            .unwrap_err();
        assert!(err.is_conflict_on(ACCOUNT_EMAIL));

        let err = store
            .update_account(Account {
                email: "a@gmail.com".to_string(),
                ..second.clone()
            })
            .await
            .unwrap_err();
        assert!(err.is_conflict_on(ACCOUNT_EMAIL));

        // Keeping your own email is not a clash.
        store
            .update_account(Account {
                address: "Otra 1".to_string(),
                ..second
            })
            .await
            .unwrap();
        assert_eq!(store.count_accounts().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_account_email_lookup_is_case_sensitive() {
        let store = InMemoryStore::new();
        store
            .insert_account(account("11111111-1", "admin@gmail.com", AccountClass::Admin))
            .await
            .unwrap();

        assert!(store.email_exists("admin@gmail.com").await.unwrap());
        assert!(!store.email_exists("Admin@gmail.com").await.unwrap());
        assert!(store.account_by_email("ADMIN@GMAIL.COM").await.unwrap().is_none());
        assert_eq!(store.count_by_class(AccountClass::Admin).await.unwrap(), 1);
        assert_eq!(store.count_by_class(AccountClass::Customer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_place_order_numbers_and_deducts_stock() {
        let store = InMemoryStore::new();
        store.insert_product(product("AC001", 10, 1)).await.unwrap();

        let first = store
            .place_order(new_order("11111111-1", vec![("AC001", 3)]))
            .await
            .unwrap();
        let second = store
            .place_order(new_order("11111111-1", vec![("AC001", 2)]))
            .await
            .unwrap();

        assert_eq!(first.number.as_str(), "SO1001");
        assert_eq!(second.number.as_str(), "SO1002");
        let stock = store.product(&ProductCode::new("AC001")).await.unwrap().unwrap().stock;
        assert_eq!(stock, 5);

        let stored = store.order(&first.number).await.unwrap().unwrap();
        assert_eq!(stored.lines.len(), 1);
        assert_eq!(stored.lines[0].order_number, first.number);
    }

    #[tokio::test]
    async fn test_place_order_follows_last_inserted_number() {
        let store = InMemoryStore::new();
        for number in ["SO1026", "SO1003"] {
            store
                .insert_order(Order {
                    number: OrderNumber::new(number),
                    date: "01/01/2025".to_string(),
                    customer: Run::new("11111111-1"),
                    status: ShipmentStatus::Delivered,
                    total: Money::new(1),
                })
                .await
                .unwrap();
        }

        // Insertion order wins over the numeric maximum.
        let placed = store.place_order(new_order("11111111-1", vec![])).await.unwrap();
        assert_eq!(placed.number.as_str(), "SO1004");
    }

    #[tokio::test]
    async fn test_insert_lines_requires_order() {
        let store = InMemoryStore::new();
        let err = store
            .insert_lines(&OrderNumber::new("SO9999"), new_order("1-9", vec![("AC001", 1)]).lines)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_order_cascades_lines() {
        let store = InMemoryStore::new();
        let placed = store
            .place_order(new_order("11111111-1", vec![("AC001", 1), ("AC002", 2)]))
            .await
            .unwrap();

        assert!(store.delete_order(&placed.number).await.unwrap());
        assert!(!store.delete_order(&placed.number).await.unwrap());
        assert!(store.orders().await.unwrap().is_empty());
        assert!(store.tables.read().await.lines.is_empty());
    }

    #[tokio::test]
    async fn test_orders_for_filters_by_customer() {
        let store = InMemoryStore::new();
        store.place_order(new_order("11111111-1", vec![])).await.unwrap();
        store.place_order(new_order("22222222-2", vec![])).await.unwrap();
        store.place_order(new_order("11111111-1", vec![])).await.unwrap();

        let mine = store.orders_for(&Run::new("11111111-1")).await.unwrap();
        let numbers: Vec<_> = mine.iter().map(|o| o.order.number.as_str()).collect();
        assert_eq!(numbers, vec!["SO1001", "SO1003"]);
    }

    #[tokio::test]
    async fn test_update_status_and_counts() {
        let store = InMemoryStore::new();
        let placed = store.place_order(new_order("11111111-1", vec![])).await.unwrap();

        let updated = store
            .update_status(&placed.number, ShipmentStatus::Shipped)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ShipmentStatus::Shipped);
        assert_eq!(store.count_by_status(ShipmentStatus::Shipped).await.unwrap(), 1);
        assert_eq!(store.count_by_status(ShipmentStatus::Pending).await.unwrap(), 0);
        assert!(
            store
                .update_status(&OrderNumber::new("SO1"), ShipmentStatus::Shipped)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_watch_orders_sees_new_order() {
        let store = InMemoryStore::new();
        let mut stream = store.watch_orders(Some(Run::new("11111111-1")));
        assert!(stream.next().await.unwrap().unwrap().is_empty());

        store.place_order(new_order("11111111-1", vec![])).await.unwrap();
        let snapshot = stream.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
    }
}
