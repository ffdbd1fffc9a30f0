//! PostgreSQL backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, Page, PageRequest, ProductId, UserId};
use domain::order::{Order, OrderDraft, OrderLine, OrderStatus};
use domain::store::{OrderStore, Product, ProductCatalog, StoreError};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

/// PostgreSQL-backed order store and product catalog.
///
/// Order creation runs in one transaction: a conditional
/// `UPDATE ... WHERE stock >= quantity` per line plus the order and line
/// inserts. Any line that cannot be covered rolls the whole transaction
/// back, so concurrent orders on the same product can never drive stock
/// negative (the row lock taken by the UPDATE serializes them).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_product(row: &PgRow) -> Result<Product, StoreError> {
        Ok(Product {
            id: ProductId::new(row.try_get::<i64, _>("id").map_err(db_err)?),
            name: row.try_get("name").map_err(db_err)?,
            price: Money::from_cents(row.try_get::<i64, _>("price_cents").map_err(db_err)?),
            stock: to_u32(row.try_get::<i64, _>("stock").map_err(db_err)?)?,
        })
    }

    fn row_to_order(row: &PgRow, lines: Vec<OrderLine>) -> Result<Order, StoreError> {
        let status_name: String = row.try_get("status").map_err(db_err)?;
        let status = OrderStatus::parse(&status_name)
            .ok_or_else(|| StoreError::Database(format!("unknown status column value: {status_name}")))?;

        Ok(Order {
            id: OrderId::new(row.try_get::<i64, _>("id").map_err(db_err)?),
            owner_id: UserId::new(row.try_get::<i64, _>("owner_id").map_err(db_err)?),
            owner_email: row.try_get("owner_email").map_err(db_err)?,
            shipping_address: row.try_get("shipping_address").map_err(db_err)?,
            payment_method: row.try_get("payment_method").map_err(db_err)?,
            status,
            total: Money::from_cents(row.try_get::<i64, _>("total_cents").map_err(db_err)?),
            created_at: row.try_get("created_at").map_err(db_err)?,
            updated_at: row.try_get("updated_at").map_err(db_err)?,
            lines,
        })
    }

    fn row_to_line(row: &PgRow) -> Result<OrderLine, StoreError> {
        Ok(OrderLine {
            product_id: ProductId::new(row.try_get::<i64, _>("product_id").map_err(db_err)?),
            product_name: row.try_get("product_name").map_err(db_err)?,
            quantity: to_u32(row.try_get::<i64, _>("quantity").map_err(db_err)?)?,
            unit_price: Money::from_cents(
                row.try_get::<i64, _>("unit_price_cents").map_err(db_err)?,
            ),
        })
    }

    /// Fetches the lines for a set of orders, grouped in position order.
    async fn lines_for(&self, order_ids: &[i64]) -> Result<Vec<(i64, OrderLine)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price_cents
            FROM order_lines
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|row| {
                let order_id: i64 = row.try_get("order_id").map_err(db_err)?;
                Ok((order_id, Self::row_to_line(row)?))
            })
            .collect()
    }

    /// Attaches lines to order rows fetched by the given query.
    async fn hydrate_orders(&self, rows: Vec<PgRow>) -> Result<Vec<Order>, StoreError> {
        let ids: Vec<i64> = rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id").map_err(db_err))
            .collect::<Result<_, _>>()?;

        let mut lines_by_order: HashMap<i64, Vec<OrderLine>> = HashMap::new();
        for (order_id, line) in self.lines_for(&ids).await? {
            lines_by_order.entry(order_id).or_default().push(line);
        }

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(db_err)?;
            let own = lines_by_order.remove(&id).unwrap_or_default();
            orders.push(Self::row_to_order(row, own)?);
        }
        Ok(orders)
    }
}

#[async_trait]
impl ProductCatalog for PgStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT id, name, price_cents, stock FROM products WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(Self::row_to_product).transpose()
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $2, updated_at = now() \
             WHERE id = $1 AND stock >= $2",
        )
        .bind(id.as_i64())
        .bind(i64::from(quantity))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(self.classify_missed_decrement(id, &self.pool).await);
        }
        Ok(())
    }

    async fn list_low_stock(&self, threshold: u32) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, price_cents, stock FROM products WHERE stock < $1 ORDER BY id",
        )
        .bind(i64::from(threshold))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(Self::row_to_product).collect()
    }
}

impl PgStore {
    /// Distinguishes a missing product from an insufficient-stock miss
    /// after a conditional UPDATE touched zero rows.
    async fn classify_missed_decrement<'e, E>(&self, id: ProductId, executor: E) -> StoreError
    where
        E: sqlx::PgExecutor<'e>,
    {
        match sqlx::query_scalar::<_, i64>("SELECT id FROM products WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(executor)
            .await
        {
            Ok(Some(_)) => StoreError::InsufficientStock { product_id: id },
            Ok(None) => StoreError::ProductNotFound { product_id: id },
            Err(err) => db_err(err),
        }
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, draft: OrderDraft) -> Result<Order, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Conditional decrement per line; the row lock serializes
        // concurrent orders on the same product. Zero rows affected
        // aborts the whole creation (tx drop rolls back).
        for line in &draft.lines {
            let result = sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = now() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(line.product_id.as_i64())
            .bind(i64::from(line.quantity))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

            if result.rows_affected() == 0 {
                return Err(self
                    .classify_missed_decrement(line.product_id, &mut *tx)
                    .await);
            }
        }

        let order_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders
                (owner_id, owner_email, shipping_address, payment_method,
                 status, total_cents, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING id
            "#,
        )
        .bind(draft.owner_id.as_i64())
        .bind(&draft.owner_email)
        .bind(&draft.shipping_address)
        .bind(&draft.payment_method)
        .bind(OrderStatus::Pending.as_str())
        .bind(draft.total.cents())
        .bind(draft.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        for (position, line) in draft.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_lines
                    (order_id, product_id, product_name, quantity, unit_price_cents, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order_id)
            .bind(line.product_id.as_i64())
            .bind(&line.product_name)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.cents())
            .bind(position as i64)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(order_id, "order and stock decrements committed");
        Ok(draft.into_order(OrderId::new(order_id)))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let lines = self
            .lines_for(&[id.as_i64()])
            .await?
            .into_iter()
            .map(|(_, line)| line)
            .collect();
        Ok(Some(Self::row_to_order(&row, lines)?))
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Order, StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
        )
        .bind(id.as_i64())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            let exists =
                sqlx::query_scalar::<_, i64>("SELECT id FROM orders WHERE id = $1")
                    .bind(id.as_i64())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(db_err)?;
            return Err(match exists {
                Some(_) => StoreError::Conflict { order_id: id },
                None => StoreError::OrderNotFound { order_id: id },
            });
        }

        self.get_order(id)
            .await?
            .ok_or(StoreError::OrderNotFound { order_id: id })
    }

    async fn list_orders_for_owner(&self, owner_id: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query("SELECT * FROM orders WHERE owner_id = $1 ORDER BY id")
            .bind(owner_id.as_i64())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        self.hydrate_orders(rows).await
    }

    async fn list_orders_page(&self, request: PageRequest) -> Result<Page<Order>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        let rows = sqlx::query("SELECT * FROM orders ORDER BY id LIMIT $1 OFFSET $2")
            .bind(request.size as i64)
            .bind(request.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let content = self.hydrate_orders(rows).await?;
        Ok(Page::new(content, request, total as u64))
    }
}

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

fn to_u32(value: i64) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Database(format!("count out of range: {value}")))
}
