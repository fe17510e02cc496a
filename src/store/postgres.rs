//! PostgreSQL adapter.
//!
//! Order placement runs inside one `sqlx::Transaction`. The requested
//! product rows are locked with `SELECT ... FOR UPDATE` in id order, so two
//! placements touching the same products queue behind each other instead of
//! deadlocking, and each decrement is a conditional
//! `UPDATE ... WHERE available_quantity >= $n`. A local `lock_timeout`
//! bounds every wait; an expired wait surfaces as [`StoreError::Conflict`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{PgConnection, Postgres, Transaction};
use uuid::Uuid;

use super::{
    CatalogStore, ComplaintFilter, ComplaintStore, OrderFilter, OrderLedger, PlacementStore, PlacementTx,
    ProductFilter, StoreError, StoreResult,
};
use crate::domain::aggregates::{
    Complaint, LineItem, Order, OrderParts, OrderStatus, Product, ProductParts, ShippingAddress, Specification,
};
use crate::domain::value_objects::{AccountId, ComplaintId, Money, OrderId, ProductId, Quantity, UnknownVariant};

const PRODUCT_COLUMNS: &str = "id, supplier_id, name, description, category, price, currency, available_quantity, \
     min_order_quantity, status, images, specifications, tags, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, vendor_id, supplier_id, currency, status, payment_status, \
     shipping_address, notes, tracking_number, order_date, delivery_date, updated_at";

const COMPLAINT_COLUMNS: &str = "id, ticket_number, user_id, order_id, subject, description, category, priority, \
     status, assigned_to, resolution, attachments, created_at, updated_at";

/// SQLSTATEs that mean "retry the whole transaction".
const RETRYABLE_CODES: [&str; 3] = ["55P03", "40001", "40P01"];

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().is_some_and(|c| is_retryable_code(&c)) => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut => StoreError::Conflict(err.to_string()),
            _ => StoreError::Database(err.to_string()),
        }
    }
}

fn is_retryable_code(code: &str) -> bool { RETRYABLE_CODES.contains(&code) }

impl From<UnknownVariant> for StoreError {
    fn from(err: UnknownVariant) -> Self { StoreError::Corrupt(err.to_string()) }
}

fn to_u32(value: i32, column: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} is negative: {value}")))
}

fn to_i32(value: u32, column: &str) -> StoreResult<i32> {
    i32::try_from(value).map_err(|_| StoreError::Database(format!("{column} out of range: {value}")))
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32, lock_timeout: Duration) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(lock_timeout.max(Duration::from_secs(5)))
            .connect(url)
            .await?;
        Ok(Self { pool, lock_timeout })
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("migration failed: {e}")))
    }

    async fn load_orders(&self, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT order_id, product_id, quantity, unit_price FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, position",
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        let currencies: HashMap<Uuid, &str> = rows.iter().map(|r| (r.id, r.currency.as_str())).collect();
        for item in items {
            let currency = currencies.get(&item.order_id).copied().unwrap_or_default();
            let line = LineItem::new(
                ProductId::from_uuid(item.product_id),
                to_u32(item.quantity, "order_items.quantity")?,
                Money::new(item.unit_price, currency),
            )
            .map_err(|e| StoreError::Corrupt(format!("order {}: {e}", item.order_id)))?;
            by_order.entry(item.order_id).or_default().push(line);
        }

        rows.into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    supplier_id: Uuid,
    name: String,
    description: String,
    category: String,
    price: Decimal,
    currency: String,
    available_quantity: i32,
    min_order_quantity: i32,
    status: String,
    images: Vec<String>,
    specifications: Json<Vec<Specification>>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;
    fn try_from(row: ProductRow) -> StoreResult<Self> {
        Ok(Product::restore(ProductParts {
            id: ProductId::from_uuid(row.id),
            supplier_id: AccountId::from_uuid(row.supplier_id),
            name: row.name,
            description: row.description,
            category: row.category,
            price: Money::new(row.price, &row.currency),
            available_quantity: to_u32(row.available_quantity, "products.available_quantity")?,
            min_order_quantity: to_u32(row.min_order_quantity, "products.min_order_quantity")?,
            status: row.status.parse()?,
            images: row.images,
            specifications: row.specifications.0,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    vendor_id: Uuid,
    supplier_id: Uuid,
    currency: String,
    status: String,
    payment_status: String,
    shipping_address: Json<ShippingAddress>,
    notes: Option<String>,
    tracking_number: Option<String>,
    order_date: DateTime<Utc>,
    delivery_date: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self, items: Vec<LineItem>) -> StoreResult<Order> {
        let id = self.id;
        Order::restore(OrderParts {
            id: OrderId::from_uuid(id),
            order_number: self.order_number,
            vendor_id: AccountId::from_uuid(self.vendor_id),
            supplier_id: AccountId::from_uuid(self.supplier_id),
            items,
            currency: self.currency,
            status: self.status.parse()?,
            payment_status: self.payment_status.parse()?,
            shipping_address: self.shipping_address.0,
            notes: self.notes,
            tracking_number: self.tracking_number,
            order_date: self.order_date,
            delivery_date: self.delivery_date,
            updated_at: self.updated_at,
        })
        .map_err(|e| StoreError::Corrupt(format!("order {id}: {e}")))
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    order_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price: Decimal,
}

#[derive(sqlx::FromRow)]
struct ComplaintRow {
    id: Uuid,
    ticket_number: String,
    user_id: Uuid,
    order_id: Option<Uuid>,
    subject: String,
    description: String,
    category: String,
    priority: String,
    status: String,
    assigned_to: Option<Uuid>,
    resolution: Option<String>,
    attachments: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ComplaintRow> for Complaint {
    type Error = StoreError;
    fn try_from(row: ComplaintRow) -> StoreResult<Self> {
        Ok(Complaint {
            id: ComplaintId::from_uuid(row.id),
            ticket_number: row.ticket_number,
            user_id: AccountId::from_uuid(row.user_id),
            order_id: row.order_id.map(OrderId::from_uuid),
            subject: row.subject,
            description: row.description,
            category: row.category.parse()?,
            priority: row.priority.parse()?,
            status: row.status.parse()?,
            assigned_to: row.assigned_to.map(AccountId::from_uuid),
            resolution: row.resolution,
            attachments: row.attachments,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn insert_product(&self, p: &Product) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)"
        ))
        .bind(p.id().as_uuid())
        .bind(p.supplier_id().as_uuid())
        .bind(p.name())
        .bind(p.description())
        .bind(p.category())
        .bind(p.price().amount())
        .bind(p.price().currency())
        .bind(to_i32(p.available_quantity(), "available_quantity")?)
        .bind(to_i32(p.min_order_quantity(), "min_order_quantity")?)
        .bind(p.status().as_str())
        .bind(p.images())
        .bind(Json(p.specifications()))
        .bind(p.tags())
        .bind(p.created_at())
        .bind(p.updated_at())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_product(&self, p: &Product) -> StoreResult<()> {
        sqlx::query(
            "UPDATE products SET name = $2, description = $3, category = $4, price = $5, min_order_quantity = $6, \
             status = $7, images = $8, specifications = $9, tags = $10, updated_at = $11 WHERE id = $1",
        )
        .bind(p.id().as_uuid())
        .bind(p.name())
        .bind(p.description())
        .bind(p.category())
        .bind(p.price().amount())
        .bind(to_i32(p.min_order_quantity(), "min_order_quantity")?)
        .bind(p.status().as_str())
        .bind(p.images())
        .bind(Json(p.specifications()))
        .bind(p.tags())
        .bind(p.updated_at())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn restock(&self, id: ProductId, quantity: u32) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "UPDATE products SET available_quantity = available_quantity + $2, updated_at = $3 \
             WHERE id = $1 AND available_quantity <= $4 - $2 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(to_i32(quantity, "quantity")?)
        .bind(Utc::now())
        .bind(to_i32(Quantity::MAX, "max stock")?)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Product::try_from).transpose()
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<Vec<Product>> {
        let text = filter.text.as_deref().map(|t| {
            format!("%{}%", t.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"))
        });
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE ($1::uuid IS NULL OR supplier_id = $1) \
               AND (NOT $2 OR status = 'active') \
               AND ($3::text IS NULL OR name ILIKE $3 OR description ILIKE $3 \
                    OR EXISTS (SELECT 1 FROM unnest(tags) AS tag WHERE tag ILIKE $3)) \
               AND ($4::text IS NULL OR category = $4) \
               AND ($5::numeric IS NULL OR price >= $5) \
               AND ($6::numeric IS NULL OR price <= $6) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.supplier_id.map(|s| s.as_uuid()))
        .bind(filter.active_only)
        .bind(text)
        .bind(filter.category.as_deref())
        .bind(filter.min_price)
        .bind(filter.max_price)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Product::try_from).collect()
    }
}

#[async_trait]
impl OrderLedger for PgStore {
    async fn get_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(self.load_orders(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_orders(&self, filter: &OrderFilter) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ($1::uuid IS NULL OR vendor_id = $1) \
               AND ($2::uuid IS NULL OR supplier_id = $2) \
               AND ($3::text IS NULL OR status = $3) \
             ORDER BY order_date DESC, id DESC"
        ))
        .bind(filter.vendor_id.map(|v| v.as_uuid()))
        .bind(filter.supplier_id.map(|s| s.as_uuid()))
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        self.load_orders(rows).await
    }

    async fn update_order(&self, order: &Order, expected: OrderStatus) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, payment_status = $3, tracking_number = $4, delivery_date = $5, \
             notes = $6, updated_at = $7 WHERE id = $1 AND status = $8",
        )
        .bind(order.id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.payment_status().as_str())
        .bind(order.tracking_number())
        .bind(order.delivery_date())
        .bind(order.notes())
        .bind(order.updated_at())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ComplaintStore for PgStore {
    async fn insert_complaint(&self, c: &Complaint) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO complaints ({COMPLAINT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(c.id.as_uuid())
        .bind(&c.ticket_number)
        .bind(c.user_id.as_uuid())
        .bind(c.order_id.map(|o| o.as_uuid()))
        .bind(&c.subject)
        .bind(&c.description)
        .bind(c.category.as_str())
        .bind(c.priority.as_str())
        .bind(c.status.as_str())
        .bind(c.assigned_to.map(|a| a.as_uuid()))
        .bind(&c.resolution)
        .bind(&c.attachments)
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_complaint(&self, id: ComplaintId) -> StoreResult<Option<Complaint>> {
        let row = sqlx::query_as::<_, ComplaintRow>(&format!("SELECT {COMPLAINT_COLUMNS} FROM complaints WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Complaint::try_from).transpose()
    }

    async fn update_complaint(&self, c: &Complaint) -> StoreResult<()> {
        sqlx::query(
            "UPDATE complaints SET subject = $2, description = $3, category = $4, priority = $5, status = $6, \
             assigned_to = $7, resolution = $8, attachments = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(c.id.as_uuid())
        .bind(&c.subject)
        .bind(&c.description)
        .bind(c.category.as_str())
        .bind(c.priority.as_str())
        .bind(c.status.as_str())
        .bind(c.assigned_to.map(|a| a.as_uuid()))
        .bind(&c.resolution)
        .bind(&c.attachments)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_complaints(&self, filter: &ComplaintFilter) -> StoreResult<Vec<Complaint>> {
        let rows = sqlx::query_as::<_, ComplaintRow>(&format!(
            "SELECT {COMPLAINT_COLUMNS} FROM complaints \
             WHERE ($1::text IS NULL OR status = $1) AND ($2::text IS NULL OR priority = $2) \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.priority.map(|p| p.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Complaint::try_from).collect()
    }
}

#[async_trait]
impl PlacementStore for PgStore {
    async fn begin_placement(&self) -> StoreResult<Box<dyn PlacementTx>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout.as_millis()))
            .execute(&mut *tx)
            .await?;
        tracing::debug!(lock_timeout_ms = self.lock_timeout.as_millis() as u64, "placement transaction opened");
        Ok(Box::new(PgPlacement { tx }))
    }
}

struct PgPlacement {
    tx: Transaction<'static, Postgres>,
}

async fn insert_order_rows(conn: &mut PgConnection, order: &Order) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO orders (id, order_number, vendor_id, supplier_id, total_amount, currency, status, payment_status, \
         shipping_address, notes, tracking_number, order_date, delivery_date, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
    )
    .bind(order.id().as_uuid())
    .bind(order.order_number())
    .bind(order.vendor_id().as_uuid())
    .bind(order.supplier_id().as_uuid())
    .bind(order.total_amount().amount())
    .bind(order.total_amount().currency())
    .bind(order.status().as_str())
    .bind(order.payment_status().as_str())
    .bind(Json(order.shipping_address()))
    .bind(order.notes())
    .bind(order.tracking_number())
    .bind(order.order_date())
    .bind(order.delivery_date())
    .bind(order.updated_at())
    .execute(&mut *conn)
    .await?;

    for (position, item) in order.items().iter().enumerate() {
        sqlx::query(
            "INSERT INTO order_items (order_id, position, product_id, quantity, unit_price, total) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(order.id().as_uuid())
        .bind(i32::try_from(position).map_err(|_| StoreError::Database("too many order items".into()))?)
        .bind(item.product_id().as_uuid())
        .bind(to_i32(item.quantity(), "quantity")?)
        .bind(item.unit_price().amount())
        .bind(item.total().amount())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl PlacementTx for PgPlacement {
    async fn lock_products(&mut self, ids: &[ProductId]) -> StoreResult<Vec<Product>> {
        let mut ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        ids.sort_unstable();
        ids.dedup();
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        ))
        .bind(&ids[..])
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn decrement_stock(&mut self, id: ProductId, quantity: u32) -> StoreResult<bool> {
        let Ok(quantity) = i32::try_from(quantity) else { return Ok(false) };
        let result = sqlx::query(
            "UPDATE products SET available_quantity = available_quantity - $2, updated_at = $3 \
             WHERE id = $1 AND available_quantity >= $2",
        )
        .bind(id.as_uuid())
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_order(&mut self, order: &Order) -> StoreResult<()> {
        insert_order_rows(&mut *self.tx, order).await
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
