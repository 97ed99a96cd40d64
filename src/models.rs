use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::entity::{cart_items, carts, orders, products, users};

pub const CART_OPEN: &str = "open";
pub const CART_CHECKED_OUT: &str = "checked_out";

pub const ORDER_STATUSES: [&str; 5] = ["pending", "paid", "shipped", "completed", "cancelled"];
pub const DEFAULT_ORDER_STATUS: &str = "pending";

pub const DEFAULT_ROLE: &str = "customer";
pub const ADMIN_ROLE: &str = "admin";

/// Public view of a user. Credentials stay in [`UserRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub hashed_password: Vec<u8>,
    pub salt: Vec<u8>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub price: i64,
    pub stock: i32,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Cart {
    pub id: i32,
    pub user_id: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct CartItem {
    pub id: i32,
    pub cart_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub cart_id: Option<i32>,
    pub status: String,
    pub total_amount: i64,
    pub shipping_address: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            email: record.email,
            name: record.name,
            role: record.role,
            created_at: record.created_at,
        }
    }
}

impl From<users::Model> for UserRecord {
    fn from(model: users::Model) -> Self {
        UserRecord {
            id: model.id,
            email: model.email,
            name: model.name,
            hashed_password: model.hashed_password,
            salt: model.salt,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        UserRecord::from(model).into()
    }
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Product {
            id: model.id,
            name: model.name,
            price: model.price,
            stock: model.stock,
            category: model.category,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<carts::Model> for Cart {
    fn from(model: carts::Model) -> Self {
        Cart {
            id: model.id,
            user_id: model.user_id,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<cart_items::Model> for CartItem {
    fn from(model: cart_items::Model) -> Self {
        CartItem {
            id: model.id,
            cart_id: model.cart_id,
            product_id: model.product_id,
            quantity: model.quantity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Order {
            id: model.id,
            user_id: model.user_id,
            cart_id: model.cart_id,
            status: model.status,
            total_amount: model.total_amount,
            shipping_address: model.shipping_address,
            payment_method: model.payment_method,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
