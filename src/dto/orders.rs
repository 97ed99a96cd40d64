use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Order;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    #[serde(alias = "userId")]
    pub user_id: i32,
    #[serde(alias = "cartId")]
    pub cart_id: Option<i32>,
    pub status: Option<String>,
    #[serde(alias = "totalAmount")]
    pub total_amount: i64,
    #[serde(alias = "shippingAddress")]
    pub shipping_address: Option<String>,
    #[serde(alias = "paymentMethod")]
    pub payment_method: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateOrderRequest {
    #[serde(alias = "userId")]
    pub user_id: Option<i32>,
    #[serde(alias = "cartId")]
    pub cart_id: Option<i32>,
    pub status: Option<String>,
    #[serde(alias = "totalAmount")]
    pub total_amount: Option<i64>,
    #[serde(alias = "shippingAddress")]
    pub shipping_address: Option<String>,
    #[serde(alias = "paymentMethod")]
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<Order>)]
    pub items: Vec<Order>,
}
