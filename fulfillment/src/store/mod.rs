//! redb-based storage layer for the fulfillment subsystem
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order rows |
//! | `cancellations` | `order_id` | `OrderCancellation` | One record per cancelled order |
//! | `coupons` | `coupon_id` | `Coupon` | Coupon uses |
//! | `customers` | `phone` | `Customer` | Loyalty ledgers |
//! | `products` | `product_id` | `Product` | Stock levels |
//! | `staff` | `staff_id` | `Staff` | Role lookups |
//! | `settings` | `()` key `"store"` | `StoreSettings` | Singleton configuration |
//! | `upload_tickets` | `filename` | `order_id` | Evidence upload index |
//!
//! Values are JSON-serialized. Mutations that must land together (status
//! change + ledger + stock + cancellation record) share one
//! [`WriteTransaction`]; a failed step drops the transaction and nothing is
//! persisted.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::error::AppError;
use shared::models::{
    Coupon, Customer, LedgerDelta, Order, OrderCancellation, OrderStatus, Product, Staff,
    StockDelta, StoreSettings,
};
use shared::util::now_millis;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");
const CANCELLATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("cancellations");
const COUPONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("coupons");
const CUSTOMERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("customers");
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");
const STAFF_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("staff");
const SETTINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("settings");
const UPLOAD_TICKETS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("upload_tickets");

const SETTINGS_KEY: &str = "store";

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Coupon not found: {0}")]
    CouponNotFound(String),

    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    #[error("Staff not found: {0}")]
    StaffNotFound(i64),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        use shared::error::ErrorCode;
        match err {
            StoreError::OrderNotFound(id) => AppError::order_not_found(id),
            StoreError::ProductNotFound(id) => {
                AppError::new(ErrorCode::ProductNotFound).with_detail("product_id", id)
            }
            StoreError::CouponNotFound(id) => {
                AppError::new(ErrorCode::CouponNotFound).with_detail("coupon_id", id)
            }
            StoreError::CustomerNotFound(phone) => {
                AppError::new(ErrorCode::CustomerNotFound).with_detail("phone", phone)
            }
            StoreError::StaffNotFound(id) => {
                AppError::new(ErrorCode::StaffNotFound).with_detail("staff_id", id)
            }
            other => AppError::database(other.to_string()),
        }
    }
}

/// Fulfillment storage backed by redb
///
/// redb commits are durable as soon as `commit()` returns (copy-on-write
/// with atomic pointer swap), so a crash never leaves a half-applied
/// compensation.
#[derive(Clone)]
pub struct FulfillmentStore {
    db: Arc<Database>,
}

impl FulfillmentStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path)?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let store = Self { db: Arc::new(db) };
        store.init_tables()?;
        Ok(store)
    }

    /// Create all tables so later read transactions never hit a missing table
    fn init_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _ = txn.open_table(ORDERS_TABLE)?;
            let _ = txn.open_table(CANCELLATIONS_TABLE)?;
            let _ = txn.open_table(COUPONS_TABLE)?;
            let _ = txn.open_table(CUSTOMERS_TABLE)?;
            let _ = txn.open_table(PRODUCTS_TABLE)?;
            let _ = txn.open_table(STAFF_TABLE)?;
            let _ = txn.open_table(SETTINGS_TABLE)?;
            let _ = txn.open_table(UPLOAD_TICKETS_TABLE)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StoreResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Commit a write transaction
    pub fn commit(&self, txn: WriteTransaction) -> StoreResult<()> {
        txn.commit()?;
        Ok(())
    }

    // ========== Order Operations ==========

    /// Get an order by ID
    pub fn get_order(&self, order_id: &str) -> StoreResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by ID (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StoreResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store an order (insert or overwrite)
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StoreResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// The driver's currently assigned READY / OUT_FOR_DELIVERY orders
    pub fn orders_for_driver(&self, driver_id: i64) -> StoreResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            if order.driver_id == Some(driver_id)
                && matches!(
                    order.status,
                    OrderStatus::Ready | OrderStatus::OutForDelivery
                )
            {
                orders.push(order);
            }
        }

        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    /// Live order counts per status
    pub fn status_counts(&self) -> StoreResult<BTreeMap<OrderStatus, u64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut counts = BTreeMap::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let order: Order = serde_json::from_slice(value.value())?;
            *counts.entry(order.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    // ========== Stock Operations ==========

    /// Apply signed stock deltas to each referenced product
    pub fn adjust_stock(&self, txn: &WriteTransaction, deltas: &[StockDelta]) -> StoreResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        for delta in deltas {
            let mut product: Product = match table.get(delta.product_id.as_str())? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StoreError::ProductNotFound(delta.product_id.clone())),
            };
            product.stock += delta.delta;
            let value = serde_json::to_vec(&product)?;
            table.insert(delta.product_id.as_str(), value.as_slice())?;
        }
        Ok(())
    }

    /// Get a product by ID
    pub fn get_product(&self, product_id: &str) -> StoreResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store a product (seeding / catalog sync)
    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StoreResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id.as_str(), value.as_slice())?;
        Ok(())
    }

    // ========== Coupon Operations ==========

    /// Get a coupon by ID
    pub fn get_coupon(&self, coupon_id: &str) -> StoreResult<Option<Coupon>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(COUPONS_TABLE)?;
        match table.get(coupon_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store a coupon
    pub fn put_coupon(&self, txn: &WriteTransaction, coupon: &Coupon) -> StoreResult<()> {
        let mut table = txn.open_table(COUPONS_TABLE)?;
        let value = serde_json::to_vec(coupon)?;
        table.insert(coupon.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Adjust a coupon's remaining uses by a signed delta
    pub fn adjust_coupon_uses(
        &self,
        txn: &WriteTransaction,
        coupon_id: &str,
        delta: i32,
    ) -> StoreResult<()> {
        let mut table = txn.open_table(COUPONS_TABLE)?;
        let mut coupon: Coupon = match table.get(coupon_id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Err(StoreError::CouponNotFound(coupon_id.to_string())),
        };
        coupon.remaining_uses += delta;
        let value = serde_json::to_vec(&coupon)?;
        table.insert(coupon_id, value.as_slice())?;
        Ok(())
    }

    // ========== Customer Ledger Operations ==========

    /// Get a customer by phone
    pub fn get_customer(&self, phone: &str) -> StoreResult<Option<Customer>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CUSTOMERS_TABLE)?;
        match table.get(phone)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store a customer
    pub fn put_customer(&self, txn: &WriteTransaction, customer: &Customer) -> StoreResult<()> {
        let mut table = txn.open_table(CUSTOMERS_TABLE)?;
        let value = serde_json::to_vec(customer)?;
        table.insert(customer.phone.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Apply a signed delta to a customer's loyalty ledger
    pub fn apply_ledger_delta(
        &self,
        txn: &WriteTransaction,
        phone: &str,
        delta: &LedgerDelta,
    ) -> StoreResult<()> {
        let mut table = txn.open_table(CUSTOMERS_TABLE)?;
        let mut customer: Customer = match table.get(phone)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Err(StoreError::CustomerNotFound(phone.to_string())),
        };
        customer.points += delta.points;
        customer.total_spent += delta.total_spent;
        customer.total_orders += delta.total_orders;
        customer.updated_at = now_millis();
        let value = serde_json::to_vec(&customer)?;
        table.insert(phone, value.as_slice())?;
        Ok(())
    }

    // ========== Cancellation Records ==========

    /// Persist the cancellation record for an order
    pub fn save_cancellation(
        &self,
        txn: &WriteTransaction,
        record: &OrderCancellation,
    ) -> StoreResult<()> {
        let mut table = txn.open_table(CANCELLATIONS_TABLE)?;
        let value = serde_json::to_vec(record)?;
        table.insert(record.order_id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get the cancellation record for an order
    pub fn get_cancellation(&self, order_id: &str) -> StoreResult<Option<OrderCancellation>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CANCELLATIONS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    // ========== Staff ==========

    /// Get a staff member by ID
    pub fn get_staff(&self, staff_id: i64) -> StoreResult<Option<Staff>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STAFF_TABLE)?;
        match table.get(staff_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Store a staff member
    pub fn put_staff(&self, txn: &WriteTransaction, staff: &Staff) -> StoreResult<()> {
        let mut table = txn.open_table(STAFF_TABLE)?;
        let value = serde_json::to_vec(staff)?;
        table.insert(staff.id, value.as_slice())?;
        Ok(())
    }

    // ========== Settings ==========

    /// Current store settings (defaults if never written)
    pub fn settings(&self) -> StoreResult<StoreSettings> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SETTINGS_TABLE)?;
        match table.get(SETTINGS_KEY)? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(StoreSettings::default()),
        }
    }

    /// Store settings
    pub fn put_settings(&self, txn: &WriteTransaction, settings: &StoreSettings) -> StoreResult<()> {
        let mut table = txn.open_table(SETTINGS_TABLE)?;
        let value = serde_json::to_vec(settings)?;
        table.insert(SETTINGS_KEY, value.as_slice())?;
        Ok(())
    }

    // ========== Upload Ticket Index ==========

    /// Index an issued upload ticket filename to the order it belongs to,
    /// so the file can be associated with the cancellation when it lands
    pub fn index_upload_ticket(
        &self,
        txn: &WriteTransaction,
        filename: &str,
        order_id: &str,
    ) -> StoreResult<()> {
        let mut table = txn.open_table(UPLOAD_TICKETS_TABLE)?;
        table.insert(filename, order_id)?;
        Ok(())
    }

    /// Look up the order an upload ticket was issued for
    pub fn upload_ticket_order(&self, filename: &str) -> StoreResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(UPLOAD_TICKETS_TABLE)?;
        Ok(table.get(filename)?.map(|v| v.value().to_string()))
    }
}
