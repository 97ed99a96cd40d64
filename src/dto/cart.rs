use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Cart, CartItem, Order};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCartRequest {
    #[serde(alias = "userId")]
    pub user_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    #[serde(alias = "productId")]
    pub product_id: i32,
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    #[serde(alias = "shippingAddress")]
    pub shipping_address: Option<String>,
    #[serde(alias = "paymentMethod")]
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartWithItems {
    pub cart: Cart,
    pub items: Vec<CartItem>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CartList {
    #[schema(value_type = Vec<Cart>)]
    pub items: Vec<Cart>,
}

/// Result of a checkout: the new order and the cart lines it was built from.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutSummary {
    pub order: Order,
    pub items: Vec<CartItem>,
}
