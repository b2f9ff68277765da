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
    catalog::{FarmSnapshot, OfferSnapshot},
    dto::{
        order_items::{AddOrderItemRequest, UpdateOrderItemRequest},
        orders::{
            CommissionReport, CreateOrderRequest, OrderList, OrderStatusRequest, OrderWithItems,
            SplitGroupList, UpdateOrderRequest,
        },
    },
    models::{NewOrderItem, Order, OrderCommission, OrderDraft, OrderItem, SplitGroup},
    response::{ApiResponse, ErrorBody, Meta},
    routes::{health, order_items, orders, params},
    status::{ActorRole, OrderStatus},
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
    paths(
        health::health_check,
        orders::create_order,
        orders::list_orders,
        orders::list_farmer_orders,
        orders::outstanding_commission,
        orders::get_order,
        orders::update_order,
        orders::delete_order,
        orders::set_receiver_status,
        orders::set_farmer_status,
        orders::add_order_item,
        orders::list_split_groups,
        orders::submit_split,
        orders::delete_split,
        order_items::update_order_item,
        order_items::delete_order_item
    ),
    components(
        schemas(
            Order,
            OrderItem,
            OrderStatus,
            ActorRole,
            NewOrderItem,
            OrderDraft,
            SplitGroup,
            OrderCommission,
            OfferSnapshot,
            FarmSnapshot,
            CreateOrderRequest,
            UpdateOrderRequest,
            OrderStatusRequest,
            AddOrderItemRequest,
            UpdateOrderItemRequest,
            OrderList,
            OrderWithItems,
            SplitGroupList,
            CommissionReport,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ErrorBody,
            health::HealthData,
            ApiResponse<ErrorBody>,
            ApiResponse<health::HealthData>,
            ApiResponse<Order>,
            ApiResponse<OrderItem>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<SplitGroupList>,
            ApiResponse<CommissionReport>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Orders", description = "Orders, splitting and commission"),
        (name = "Order items", description = "Line items of draft orders"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
