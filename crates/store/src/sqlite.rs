use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AccountClass, Money, OrderNumber, ProductCode, Run, ShipmentStatus};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use tokio::sync::Mutex;

use crate::{
    ACCOUNT_EMAIL, Account, AccountStore, CatalogStore, ChangeFeed, NewOrder, NewOrderLine, Order,
    OrderLine, OrderStore, OrderWithLines, Product, Result, SnapshotStream, StoreError, Table,
    next_order_number,
};

/// SQLite-backed store.
///
/// Clones share the pool, the change feed and the checkout lock.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    feed: ChangeFeed,
    checkout: Arc<Mutex<()>>,
}

impl SqliteStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            feed: ChangeFeed::new(),
            checkout: Arc::new(Mutex::new(())),
        }
    }

    /// Connects to the database at `url`, creating the file if needed.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .foreign_keys(true)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// Opens a private in-memory database with migrations applied.
    ///
    /// The pool holds exactly one connection that never expires, since each
    /// SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self::new(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the change feed of this store.
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Closes the pool, waiting for connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn row_to_product(row: &SqliteRow) -> Result<Product> {
        Ok(Product {
            code: ProductCode::new(row.try_get::<String, _>("code")?),
            category: row.try_get("category")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::new(row.try_get("price")?),
            stock: row.try_get("stock")?,
            critical_stock: row.try_get("critical_stock")?,
            image: row.try_get("image")?,
        })
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let class: String = row.try_get("class")?;
        Ok(Account {
            run: Run::new(row.try_get::<String, _>("run")?),
            name: row.try_get("name")?,
            surnames: row.try_get("surnames")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            phone: row.try_get("phone")?,
            birth_date: row.try_get("birth_date")?,
            class: AccountClass::from_str(&class).map_err(|e| StoreError::invalid("account", e))?,
            region: row.try_get("region")?,
            comuna: row.try_get("comuna")?,
            address: row.try_get("address")?,
        })
    }

    fn row_to_order(row: &SqliteRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        Ok(Order {
            number: OrderNumber::new(row.try_get::<String, _>("number")?),
            date: row.try_get("date")?,
            customer: Run::new(row.try_get::<String, _>("customer")?),
            status: ShipmentStatus::from_str(&status)
                .map_err(|e| StoreError::invalid("order", e))?,
            total: Money::new(row.try_get("total")?),
        })
    }

    fn row_to_line(row: &SqliteRow) -> Result<OrderLine> {
        let quantity: i64 = row.try_get("quantity")?;
        Ok(OrderLine {
            id: row.try_get("id")?,
            order_number: OrderNumber::new(row.try_get::<String, _>("order_number")?),
            product_code: ProductCode::new(row.try_get::<String, _>("product_code")?),
            product_name: row.try_get("product_name")?,
            quantity: u32::try_from(quantity).map_err(|e| StoreError::invalid("order line", e))?,
            unit_price: Money::new(row.try_get("unit_price")?),
        })
    }

    /// Maps a unique-constraint violation to `Conflict`.
    fn conflict_or(error: sqlx::Error, entity: &'static str, key: impl ToString) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = error
            && db_err.is_unique_violation()
        {
            return StoreError::conflict(entity, key);
        }
        StoreError::Database(error)
    }

    /// Like [`Self::conflict_or`], but tells an email clash apart from a
    /// duplicate identity number.
    fn account_conflict_or(error: sqlx::Error, account: &Account) -> StoreError {
        if let sqlx::Error::Database(ref db_err) = error
            && db_err.is_unique_violation()
            && db_err.message().contains("accounts.email")
        {
            return StoreError::conflict(ACCOUNT_EMAIL, &account.email);
        }
        Self::conflict_or(error, "account", &account.run)
    }

    async fn insert_line(
        conn: &mut SqliteConnection,
        number: &OrderNumber,
        line: NewOrderLine,
    ) -> Result<OrderLine> {
        let result = sqlx::query(
            r#"
            INSERT INTO order_lines (order_number, product_code, product_name, quantity, unit_price)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(number.as_str())
        .bind(line.product_code.as_str())
        .bind(&line.product_name)
        .bind(i64::from(line.quantity))
        .bind(line.unit_price.amount())
        .execute(&mut *conn)
        .await?;

        Ok(OrderLine {
            id: result.last_insert_rowid(),
            order_number: number.clone(),
            product_code: line.product_code,
            product_name: line.product_name,
            quantity: line.quantity,
            unit_price: line.unit_price,
        })
    }

    async fn load_orders(&self, customer: Option<&Run>) -> Result<Vec<OrderWithLines>> {
        let (headers, line_rows) = match customer {
            Some(run) => {
                let headers = sqlx::query(
                    r#"
                    SELECT number, date, customer, status, total
                    FROM orders
                    WHERE customer = ?
                    ORDER BY rowid ASC
                    "#,
                )
                .bind(run.as_str())
                .fetch_all(&self.pool)
                .await?;
                let lines = sqlx::query(
                    r#"
                    SELECT l.id, l.order_number, l.product_code, l.product_name, l.quantity, l.unit_price
                    FROM order_lines l
                    JOIN orders o ON o.number = l.order_number
                    WHERE o.customer = ?
                    ORDER BY l.id ASC
                    "#,
                )
                .bind(run.as_str())
                .fetch_all(&self.pool)
                .await?;
                (headers, lines)
            }
            None => {
                let headers = sqlx::query(
                    "SELECT number, date, customer, status, total FROM orders ORDER BY rowid ASC",
                )
                .fetch_all(&self.pool)
                .await?;
                let lines = sqlx::query(
                    r#"
                    SELECT id, order_number, product_code, product_name, quantity, unit_price
                    FROM order_lines
                    ORDER BY id ASC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?;
                (headers, lines)
            }
        };

        let mut grouped: HashMap<OrderNumber, Vec<OrderLine>> = HashMap::new();
        for row in &line_rows {
            let line = Self::row_to_line(row)?;
            grouped.entry(line.order_number.clone()).or_default().push(line);
        }

        headers
            .iter()
            .map(|row| {
                let order = Self::row_to_order(row)?;
                let lines = grouped.remove(&order.number).unwrap_or_default();
                Ok(OrderWithLines { order, lines })
            })
            .collect()
    }

    async fn order_header(&self, number: &OrderNumber) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT number, date, customer, status, total FROM orders WHERE number = ?",
        )
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn insert_product(&self, product: Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (code, category, name, description, price, stock, critical_stock, image)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (code) DO UPDATE SET
                category = excluded.category,
                name = excluded.name,
                description = excluded.description,
                price = excluded.price,
                stock = excluded.stock,
                critical_stock = excluded.critical_stock,
                image = excluded.image
            "#,
        )
        .bind(product.code.as_str())
        .bind(&product.category)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.stock)
        .bind(product.critical_stock)
        .bind(&product.image)
        .execute(&self.pool)
        .await?;

        self.feed.notify(Table::Products);
        Ok(())
    }

    async fn product(&self, code: &ProductCode) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT code, category, name, description, price, stock, critical_stock, image
            FROM products
            WHERE code = ?
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn products(&self) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            r#"
            SELECT code, category, name, description, price, stock, critical_stock, image
            FROM products
            ORDER BY code ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_product).collect()
    }

    fn watch_products(&self) -> SnapshotStream<Product> {
        let store = self.clone();
        self.feed.snapshots(Table::Products, move || {
            let store = store.clone();
            async move { store.products().await }
        })
    }

    async fn update_product(&self, product: Product) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET category = ?, name = ?, description = ?, price = ?, stock = ?, critical_stock = ?, image = ?
            WHERE code = ?
            "#,
        )
        .bind(&product.category)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.stock)
        .bind(product.critical_stock)
        .bind(&product.image)
        .bind(product.code.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("product", &product.code));
        }
        self.feed.notify(Table::Products);
        Ok(())
    }

    async fn update_stock(&self, code: &ProductCode, stock: i64) -> Result<Option<Product>> {
        let Some(mut product) = self.product(code).await? else {
            return Ok(None);
        };

        sqlx::query("UPDATE products SET stock = ? WHERE code = ?")
            .bind(stock)
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;

        product.stock = stock;
        self.feed.notify(Table::Products);
        Ok(Some(product))
    }

    async fn delete_product(&self, code: &ProductCode) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE code = ?")
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.feed.notify(Table::Products);
        }
        Ok(removed)
    }

    async fn count_products(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.unsigned_abs())
    }

    async fn count_critical_stock(&self) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE stock <= critical_stock")
                .fetch_one(&self.pool)
                .await?;
        Ok(count.unsigned_abs())
    }

    async fn count_out_of_stock(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE stock = 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.unsigned_abs())
    }

    async fn categories(&self) -> Result<Vec<String>> {
        let categories =
            sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }
}

#[async_trait]
impl AccountStore for SqliteStore {
    async fn insert_account(&self, account: Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (run, name, surnames, email, password_hash, phone, birth_date, class, region, comuna, address)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.run.as_str())
        .bind(&account.name)
        .bind(&account.surnames)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.phone)
        .bind(&account.birth_date)
        .bind(account.class.as_str())
        .bind(&account.region)
        .bind(&account.comuna)
        .bind(&account.address)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::account_conflict_or(e, &account))?;

        self.feed.notify(Table::Accounts);
        Ok(())
    }

    async fn accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT run, name, surnames, email, password_hash, phone, birth_date, class, region, comuna, address
            FROM accounts
            ORDER BY run ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_account).collect()
    }

    fn watch_accounts(&self) -> SnapshotStream<Account> {
        let store = self.clone();
        self.feed.snapshots(Table::Accounts, move || {
            let store = store.clone();
            async move { store.accounts().await }
        })
    }

    async fn account(&self, run: &Run) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT run, name, surnames, email, password_hash, phone, birth_date, class, region, comuna, address
            FROM accounts
            WHERE run = ?
            "#,
        )
        .bind(run.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT run, name, surnames, email, password_hash, phone, birth_date, class, region, comuna, address
            FROM accounts
            WHERE email = ?
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn update_account(&self, account: Account) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET name = ?, surnames = ?, email = ?, password_hash = ?, phone = ?, birth_date = ?,
                class = ?, region = ?, comuna = ?, address = ?
            WHERE run = ?
            "#,
        )
        .bind(&account.name)
        .bind(&account.surnames)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.phone)
        .bind(&account.birth_date)
        .bind(account.class.as_str())
        .bind(&account.region)
        .bind(&account.comuna)
        .bind(&account.address)
        .bind(account.run.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| Self::account_conflict_or(e, &account))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("account", &account.run));
        }
        self.feed.notify(Table::Accounts);
        Ok(())
    }

    async fn delete_account(&self, run: &Run) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE run = ?")
            .bind(run.as_str())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.feed.notify(Table::Accounts);
        }
        Ok(removed)
    }

    async fn count_accounts(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.unsigned_abs())
    }

    async fn count_by_class(&self, class: AccountClass) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE class = ?")
            .bind(class.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.unsigned_abs())
    }

    async fn run_exists(&self, run: &Run) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM accounts WHERE run = ?")
            .bind(run.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn email_exists(&self, email: &str) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM accounts WHERE email = ? LIMIT 1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl OrderStore for SqliteStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order> {
        // Held until commit so the number read below stays the latest.
        let _checkout = self.checkout.lock().await;
        // Takes the write lock up front so other processes sharing the file
        // cannot allocate the same number between the read and the insert.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let last: Option<String> =
            sqlx::query_scalar("SELECT number FROM orders ORDER BY rowid DESC LIMIT 1")
                .fetch_optional(&mut *tx)
                .await?;
        let number = next_order_number(last.map(OrderNumber::new).as_ref());

        sqlx::query(
            "INSERT INTO orders (number, date, customer, status, total) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(number.as_str())
        .bind(&order.date)
        .bind(order.customer.as_str())
        .bind(order.status.as_str())
        .bind(order.total.amount())
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::conflict_or(e, "order", &number))?;

        for line in order.lines {
            let deducted = sqlx::query("UPDATE products SET stock = stock - ? WHERE code = ?")
                .bind(i64::from(line.quantity))
                .bind(line.product_code.as_str())
                .execute(&mut *tx)
                .await?;
            if deducted.rows_affected() == 0 {
                tracing::warn!(
                    order = %number,
                    product = %line.product_code,
                    "ordered product is no longer in the catalog"
                );
            }
            Self::insert_line(&mut *tx, &number, line).await?;
        }

        tx.commit().await?;
        tracing::debug!(order = %number, "order committed");

        self.feed.notify(Table::Orders);
        self.feed.notify(Table::Products);
        Ok(Order {
            number,
            date: order.date,
            customer: order.customer,
            status: order.status,
            total: order.total,
        })
    }

    async fn insert_order(&self, order: Order) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (number, date, customer, status, total) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(order.number.as_str())
        .bind(&order.date)
        .bind(order.customer.as_str())
        .bind(order.status.as_str())
        .bind(order.total.amount())
        .execute(&self.pool)
        .await
        .map_err(|e| Self::conflict_or(e, "order", &order.number))?;

        self.feed.notify(Table::Orders);
        Ok(())
    }

    async fn insert_lines(
        &self,
        number: &OrderNumber,
        lines: Vec<NewOrderLine>,
    ) -> Result<Vec<OrderLine>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM orders WHERE number = ?")
            .bind(number.as_str())
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StoreError::not_found("order", number));
        }

        let mut stored = Vec::with_capacity(lines.len());
        for line in lines {
            stored.push(Self::insert_line(&mut *tx, number, line).await?);
        }

        tx.commit().await?;
        self.feed.notify(Table::Orders);
        Ok(stored)
    }

    async fn delete_order(&self, number: &OrderNumber) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE number = ?")
            .bind(number.as_str())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected() > 0;
        if removed {
            self.feed.notify(Table::Orders);
        }
        Ok(removed)
    }

    async fn update_order(&self, order: Order) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET date = ?, customer = ?, status = ?, total = ? WHERE number = ?",
        )
        .bind(&order.date)
        .bind(order.customer.as_str())
        .bind(order.status.as_str())
        .bind(order.total.amount())
        .bind(order.number.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("order", &order.number));
        }
        self.feed.notify(Table::Orders);
        Ok(())
    }

    async fn update_status(
        &self,
        number: &OrderNumber,
        status: ShipmentStatus,
    ) -> Result<Option<Order>> {
        let result = sqlx::query("UPDATE orders SET status = ? WHERE number = ?")
            .bind(status.as_str())
            .bind(number.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.feed.notify(Table::Orders);
        self.order_header(number).await
    }

    async fn order(&self, number: &OrderNumber) -> Result<Option<OrderWithLines>> {
        let Some(order) = self.order_header(number).await? else {
            return Ok(None);
        };

        let rows = sqlx::query(
            r#"
            SELECT id, order_number, product_code, product_name, quantity, unit_price
            FROM order_lines
            WHERE order_number = ?
            ORDER BY id ASC
            "#,
        )
        .bind(number.as_str())
        .fetch_all(&self.pool)
        .await?;

        let lines = rows.iter().map(Self::row_to_line).collect::<Result<_>>()?;
        Ok(Some(OrderWithLines { order, lines }))
    }

    async fn orders(&self) -> Result<Vec<OrderWithLines>> {
        self.load_orders(None).await
    }

    async fn orders_for(&self, customer: &Run) -> Result<Vec<OrderWithLines>> {
        self.load_orders(Some(customer)).await
    }

    fn watch_orders(&self, customer: Option<Run>) -> SnapshotStream<OrderWithLines> {
        let store = self.clone();
        self.feed.snapshots(Table::Orders, move || {
            let store = store.clone();
            let customer = customer.clone();
            async move { store.load_orders(customer.as_ref()).await }
        })
    }

    async fn count_orders(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.unsigned_abs())
    }

    async fn count_by_status(&self, status: ShipmentStatus) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = ?")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.unsigned_abs())
    }

    async fn last_order_number(&self) -> Result<Option<OrderNumber>> {
        let last: Option<String> =
            sqlx::query_scalar("SELECT number FROM orders ORDER BY rowid DESC LIMIT 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(last.map(OrderNumber::new))
    }
}
