//! # Order Repository
//!
//! Customer orders with their line items, shipping record and payments.
//!
//! ## Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(customer_id, order)            one unit                        │
//! │    ├── every product exists?           else NotFound "Product"         │
//! │    ├── INSERT orders                                                    │
//! │    ├── INSERT order_details × n                                         │
//! │    └── INSERT shipping_details         only with a shipping address    │
//! │                                                                         │
//! │  record_payment(order_id, payment)     one unit                        │
//! │    ├── Order::accept_payment           refuses overpayment             │
//! │    ├── INSERT payment_details                                           │
//! │    └── UPDATE orders.deposit_paid_cents                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An order's status lives on its shipping row. Orders placed without a
//! shipping address have no status to change.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::PRODUCT_EXISTS;
use crate::unit::{atomically, ensure_exists};
use store_core::{
    Money, NewOrder, NewPayment, Order, OrderDetail, OrderLine, OrderStatus, Payment, Person,
    Shipping,
};

const ORDER_COLUMNS: &str =
    "order_id, customer_id, order_date, total_amount_cents, discount_cents, deposit_paid_cents, address";

const LINE_COLUMNS: &str =
    "order_line_number, order_id, product_id, quantity, unit_price_cents, created_at";

const SHIPPING_COLUMNS: &str = "shipping_id, order_id, address, city, postal_code, country, \
     shipping_method, tracking_number, shipping_date, estimated_delivery, shipping_status";

const PAYMENT_COLUMNS: &str =
    "payment_id, order_id, payment_date, payment_method, amount_cents, payment_type";

const PERSON_COLUMNS: &str = "id, identity_card, first_name, last_name, type, email, created_at";

#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Orders newest first. `Some(customer_id)` limits the list to that
    /// customer; `None` returns every order with its customer attached.
    pub async fn list(&self, customer_id: Option<i64>) -> DbResult<Vec<OrderDetail>> {
        let mut conn = self.pool.acquire().await?;

        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE ?1 IS NULL OR customer_id = ?1 ORDER BY order_date DESC, order_id DESC"
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?;

        let scope = "SELECT order_id FROM orders WHERE ?1 IS NULL OR customer_id = ?1";

        let sql = format!(
            "SELECT {LINE_COLUMNS} FROM order_details \
             WHERE order_id IN ({scope}) ORDER BY order_line_number"
        );
        let mut lines: HashMap<i64, Vec<OrderLine>> = HashMap::new();
        for line in sqlx::query_as::<_, OrderLine>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?
        {
            lines.entry(line.order_id).or_default().push(line);
        }

        let sql = format!(
            "SELECT {SHIPPING_COLUMNS} FROM shipping_details WHERE order_id IN ({scope})"
        );
        let mut shipping: HashMap<i64, Shipping> = sqlx::query_as::<_, Shipping>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?
            .into_iter()
            .map(|s| (s.order_id, s))
            .collect();

        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_details \
             WHERE order_id IN ({scope}) ORDER BY payment_date"
        );
        let mut payments: HashMap<i64, Vec<Payment>> = HashMap::new();
        for payment in sqlx::query_as::<_, Payment>(&sql)
            .bind(customer_id)
            .fetch_all(&mut *conn)
            .await?
        {
            payments.entry(payment.order_id).or_default().push(payment);
        }

        let customers: HashMap<i64, Person> = if customer_id.is_none() {
            let sql = format!(
                "SELECT {PERSON_COLUMNS} FROM people_or_organization \
                 WHERE id IN (SELECT customer_id FROM orders)"
            );
            sqlx::query_as::<_, Person>(&sql)
                .fetch_all(&mut *conn)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect()
        } else {
            HashMap::new()
        };

        debug!(count = orders.len(), ?customer_id, "Listed orders");
        Ok(orders
            .into_iter()
            .map(|order| {
                let id = order.order_id;
                OrderDetail {
                    customer: customers.get(&order.customer_id).cloned(),
                    lines: lines.remove(&id).unwrap_or_default(),
                    shipping: shipping.remove(&id),
                    payments: payments.remove(&id).unwrap_or_default(),
                    order,
                }
            })
            .collect())
    }

    /// One order with its lines, shipping and payments. The customer is
    /// attached when `with_customer` is set.
    pub async fn get(&self, id: i64, with_customer: bool) -> DbResult<Option<OrderDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(order) = fetch_order(&mut conn, id).await? else {
            return Ok(None);
        };
        let detail = load_detail(&mut conn, order, with_customer).await?;
        Ok(Some(detail))
    }

    /// Places an order for `customer_id`.
    pub async fn create(&self, customer_id: i64, input: &NewOrder) -> DbResult<OrderDetail> {
        debug!(customer_id, items = input.items.len(), "Placing order");
        let input = input.clone();
        atomically(&self.pool, "place order", move |conn| {
            Box::pin(create_steps(conn, customer_id, input))
        })
        .await
    }

    /// Moves the order's shipping record to `status`.
    pub async fn update_status(&self, id: i64, status: OrderStatus) -> DbResult<OrderDetail> {
        debug!(id, ?status, "Updating order status");
        atomically(&self.pool, "update order status", move |conn| {
            Box::pin(status_steps(conn, id, status))
        })
        .await
    }

    pub async fn cancel(&self, id: i64) -> DbResult<OrderDetail> {
        self.update_status(id, OrderStatus::Cancelled).await
    }

    /// Records a payment and adds it to what the order has been paid.
    pub async fn record_payment(&self, id: i64, input: &NewPayment) -> DbResult<Payment> {
        debug!(id, amount_cents = input.amount_cents, "Recording payment");
        let input = input.clone();
        atomically(&self.pool, "record payment", move |conn| {
            Box::pin(payment_steps(conn, id, input))
        })
        .await
    }
}

async fn fetch_order(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1");
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

async fn load_detail(
    conn: &mut SqliteConnection,
    order: Order,
    with_customer: bool,
) -> DbResult<OrderDetail> {
    let id = order.order_id;

    let sql = format!(
        "SELECT {LINE_COLUMNS} FROM order_details WHERE order_id = ?1 ORDER BY order_line_number"
    );
    let lines = sqlx::query_as::<_, OrderLine>(&sql)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

    let sql = format!("SELECT {SHIPPING_COLUMNS} FROM shipping_details WHERE order_id = ?1");
    let shipping = sqlx::query_as::<_, Shipping>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let sql = format!(
        "SELECT {PAYMENT_COLUMNS} FROM payment_details WHERE order_id = ?1 ORDER BY payment_date"
    );
    let payments = sqlx::query_as::<_, Payment>(&sql)
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

    let customer = if with_customer {
        let sql = format!("SELECT {PERSON_COLUMNS} FROM people_or_organization WHERE id = ?1");
        sqlx::query_as::<_, Person>(&sql)
            .bind(order.customer_id)
            .fetch_optional(&mut *conn)
            .await?
    } else {
        None
    };

    Ok(OrderDetail {
        order,
        lines,
        shipping,
        payments,
        customer,
    })
}

async fn create_steps(
    conn: &mut SqliteConnection,
    customer_id: i64,
    input: NewOrder,
) -> DbResult<OrderDetail> {
    for item in &input.items {
        ensure_exists(&mut *conn, PRODUCT_EXISTS, "Product", item.product_id).await?;
    }

    let now = Utc::now();
    let sql = format!(
        "INSERT INTO orders (customer_id, order_date, total_amount_cents, address) \
         VALUES (?1, ?2, ?3, ?4) RETURNING {ORDER_COLUMNS}"
    );
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(customer_id)
        .bind(input.order_date)
        .bind(input.total_amount_cents)
        .bind(&input.shipping_address)
        .fetch_one(&mut *conn)
        .await?;

    for item in &input.items {
        sqlx::query(
            r#"
            INSERT INTO order_details (order_id, product_id, quantity, unit_price_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(order.order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.price_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    if let Some(address) = &input.shipping_address {
        sqlx::query(
            r#"
            INSERT INTO shipping_details (order_id, address, city, postal_code, country, shipping_status)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(order.order_id)
        .bind(address)
        .bind(&input.shipping_city)
        .bind(&input.shipping_postal_code)
        .bind(&input.shipping_country)
        .bind(input.status)
        .execute(&mut *conn)
        .await?;
    }

    load_detail(conn, order, false).await
}

async fn status_steps(
    conn: &mut SqliteConnection,
    id: i64,
    status: OrderStatus,
) -> DbResult<OrderDetail> {
    let order = fetch_order(&mut *conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Order", id))?;

    sqlx::query("UPDATE shipping_details SET shipping_status = ?2 WHERE order_id = ?1")
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;

    load_detail(conn, order, false).await
}

async fn payment_steps(
    conn: &mut SqliteConnection,
    id: i64,
    input: NewPayment,
) -> DbResult<Payment> {
    let order = fetch_order(&mut *conn, id)
        .await?
        .ok_or_else(|| DbError::not_found("Order", id))?;

    let paid = order
        .accept_payment(Money::from_cents(input.amount_cents))
        .map_err(|e| DbError::rejected(e.to_string()))?;

    let sql = format!(
        "INSERT INTO payment_details (order_id, payment_date, payment_method, amount_cents, payment_type) \
         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING {PAYMENT_COLUMNS}"
    );
    let payment = sqlx::query_as::<_, Payment>(&sql)
        .bind(id)
        .bind(input.payment_date)
        .bind(input.payment_method)
        .bind(input.amount_cents)
        .bind(input.payment_type)
        .fetch_one(&mut *conn)
        .await?;

    sqlx::query("UPDATE orders SET deposit_paid_cents = ?2 WHERE order_id = ?1")
        .bind(id)
        .bind(paid.cents())
        .execute(&mut *conn)
        .await?;

    Ok(payment)
}
