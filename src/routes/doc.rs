use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        cart::{AddCartItemRequest, CartList, CartWithItems, CheckoutRequest, CheckoutSummary, CreateCartRequest},
        orders::{CreateOrderRequest, OrderList, UpdateOrderRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
        users::{UpdateUserRequest, UserList},
    },
    models::{Cart, CartItem, Order, Product, User},
    response::{ApiResponse, Meta},
    routes::{auth, cart, health, orders, params, products, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Shopfront API", description = "Products, carts, orders and users"),
    paths(
        health::health_check,
        health::readiness,
        auth::login,
        auth::register,
        products::list_products,
        products::create_product,
        products::get_product,
        products::update_product,
        products::delete_product,
        cart::list_carts,
        cart::get_cart,
        cart::create_cart,
        cart::delete_cart,
        cart::add_item,
        cart::remove_item,
        cart::checkout,
        orders::list_orders,
        orders::create_order,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        users::list_users,
        users::me,
        users::get_user,
        users::update_user,
        users::delete_user
    ),
    components(
        schemas(
            User,
            Product,
            Cart,
            CartItem,
            Order,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            CreateCartRequest,
            AddCartItemRequest,
            CheckoutRequest,
            CartWithItems,
            CartList,
            CheckoutSummary,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderList,
            UpdateUserRequest,
            UserList,
            params::Pagination,
            params::ProductQuery,
            params::CartListQuery,
            params::OrderListQuery,
            params::UserListQuery,
            health::HealthData,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartWithItems>,
            ApiResponse<CheckoutSummary>,
            ApiResponse<OrderList>,
            ApiResponse<User>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Products", description = "Product catalogue"),
        (name = "Carts", description = "Carts, line items and checkout"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Users", description = "User accounts"),
        (name = "Auth", description = "Login and registration"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_resource() {
        let spec = ApiDoc::openapi();
        for path in [
            "/products",
            "/products/{id}",
            "/carts/{id}/items/{item_id}",
            "/carts/{id}/checkout",
            "/orders/{id}",
            "/users/me",
            "/login",
            "/login/register",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
