pub mod auth;
pub mod catalog;
pub mod cms;
pub mod customers;
pub mod directory;
pub mod exchange;
pub mod media;
pub mod promotions;
pub mod rules;
pub mod sales;
pub mod system;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use self::auth::ServerState;
use crate::openapi::ApiDoc;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn metrics() -> impl IntoResponse {
    common::metrics::encode_metrics()
}

fn catalog_routes() -> Router<ServerState> {
    use catalog::*;
    Router::new()
        .route("/admin/categories", get(list_categories).post(create_category))
        .route("/admin/categories/tree", get(category_tree))
        .route("/admin/categories/:id", get(get_category).put(update_category).delete(delete_category))
        .route("/admin/categories/:id/move", post(move_category))
        .route("/admin/manufacturers", get(list_manufacturers).post(create_manufacturer))
        .route("/admin/manufacturers/:id", get(get_manufacturer).put(update_manufacturer).delete(delete_manufacturer))
        .route("/admin/products", get(list_products).post(create_product))
        .route("/admin/products/:id", get(get_product).put(update_product).delete(delete_product))
        .route("/admin/spec-attributes", get(list_spec_attributes).post(create_spec_attribute))
        .route("/admin/spec-attributes/:id", get(get_spec_attribute).put(update_spec_attribute).delete(delete_spec_attribute))
        .route("/admin/spec-attributes/:id/options", get(list_spec_options).post(create_spec_option))
        .route("/admin/spec-attributes/:id/options/order", put(order_spec_options))
        .route("/admin/spec-options/:id", put(update_spec_option).delete(delete_spec_option))
        .route("/admin/product-attributes", get(list_product_attributes).post(create_product_attribute))
        .route("/admin/product-attributes/:id", get(get_product_attribute).put(update_product_attribute).delete(delete_product_attribute))
        .route("/admin/product-attributes/:id/options", get(list_product_attribute_options).post(create_product_attribute_option))
        .route("/admin/attribute-options/:id", put(update_product_attribute_option).delete(delete_product_attribute_option))
}

fn directory_routes() -> Router<ServerState> {
    use directory::*;
    Router::new()
        .route("/admin/countries", get(list_countries).post(create_country))
        .route("/admin/countries/publish", post(publish_countries))
        .route("/admin/countries/:id", get(get_country).put(update_country).delete(delete_country))
        .route("/admin/currencies", get(list_currencies).post(create_currency))
        .route("/admin/currencies/rates", post(apply_rates))
        .route("/admin/currencies/:id", get(get_currency).put(update_currency).delete(delete_currency))
}

fn customer_routes() -> Router<ServerState> {
    use customers::*;
    Router::new()
        .route("/admin/customers", get(list_customers).post(create_customer))
        .route("/admin/customers/:id", get(get_customer).put(update_customer).delete(delete_customer))
        .route("/admin/customer-roles", get(list_roles).post(create_role))
        .route("/admin/customer-roles/:id", put(update_role).delete(delete_role))
}

fn system_routes() -> Router<ServerState> {
    use system::*;
    Router::new()
        .route("/admin/stores", get(list_stores).post(create_store))
        .route("/admin/stores/:id", get(get_store).put(update_store).delete(delete_store))
        .route("/admin/languages", get(list_languages).post(create_language))
        .route("/admin/languages/:id", put(update_language).delete(delete_language))
        .route("/admin/activity-log", get(list_activity).delete(prune_activity))
}

fn promotion_routes() -> Router<ServerState> {
    use promotions::*;
    Router::new()
        .route("/admin/discounts", get(list_discounts).post(create_discount))
        .route("/admin/discounts/:id", get(get_discount).put(update_discount).delete(delete_discount))
        .route("/admin/discounts/:id/rule-sets", put(set_rule_sets))
}

fn cms_routes() -> Router<ServerState> {
    use cms::*;
    Router::new()
        .route("/admin/menus", get(list_menus).post(create_menu))
        .route("/admin/menus/:id", get(get_menu).put(update_menu).delete(delete_menu))
        .route("/admin/menus/:id/items", get(list_menu_items).post(create_menu_item))
        .route("/admin/menus/:id/tree", get(menu_tree))
        .route("/admin/menu-items/:id", get(get_menu_item).put(update_menu_item).delete(delete_menu_item))
        .route("/admin/menu-items/:id/move", post(move_menu_item))
        .route("/admin/topics", get(list_topics).post(create_topic))
        .route("/admin/topics/:id", get(get_topic).put(update_topic).delete(delete_topic))
        .route("/admin/message-templates", get(list_templates).post(create_template))
        .route("/admin/message-templates/:id", get(get_template).put(update_template).delete(delete_template))
        .route("/admin/message-templates/:id/copy", post(copy_template))
        .route("/admin/message-templates/:id/preview", post(preview_template))
        .route("/admin/themes/:theme/:store_id", get(get_theme_variables).put(save_theme_variables).delete(reset_theme_variables))
}

fn sales_routes() -> Router<ServerState> {
    use sales::*;
    Router::new()
        .route("/admin/orders", get(list_orders).post(create_order))
        .route("/admin/orders/:id", get(get_order))
        .route("/admin/orders/:id/shipments", post(create_shipment))
        .route("/admin/shipments", get(list_shipments))
        .route("/admin/shipments/:id", get(get_shipment).delete(delete_shipment))
        .route("/admin/shipments/:id/tracking", put(update_tracking))
        .route("/admin/shipments/:id/shipped", post(set_shipped))
        .route("/admin/shipments/:id/delivered", post(set_delivered))
        .route("/admin/return-requests", get(list_return_requests).post(create_return_request))
        .route("/admin/return-requests/:id", get(get_return_request).put(update_return_request).delete(delete_return_request))
        .route("/admin/recurring-payments", get(list_recurring_payments).post(create_recurring_payment))
        .route("/admin/recurring-payments/:id", get(get_recurring_payment).put(update_recurring_payment).delete(delete_recurring_payment))
        .route("/admin/recurring-payments/:id/process", post(process_recurring_payment))
        .route("/admin/recurring-payments/:id/cancel", post(cancel_recurring_payment))
}

fn rule_routes() -> Router<ServerState> {
    use rules::*;
    Router::new()
        .route("/admin/rules", get(list_rule_sets).post(create_rule_set))
        .route("/admin/rules/descriptors/:scope", get(descriptors))
        .route("/admin/rules/options/:source", get(remote_options))
        .route("/admin/rules/:id", get(get_rule_set).put(update_rule_set).delete(delete_rule_set))
        .route("/admin/rules/:id/rules", post(add_rule).put(update_rules))
        .route("/admin/rules/:id/groups", post(add_group))
        .route("/admin/rules/:id/operator", put(change_operator))
        .route("/admin/rules/:id/preview", get(preview))
        .route("/admin/rules/:id/test-cart", post(test_cart))
        .route("/admin/rule-items/:id", delete(delete_rule))
        .route("/admin/rule-groups/:id", delete(delete_group))
}

fn exchange_routes(upload_limit: usize) -> Router<ServerState> {
    use exchange::*;
    Router::new()
        .route("/admin/import", get(list_import_profiles).post(create_import_profile))
        .route("/admin/import/:id", get(get_import_profile).put(update_import_profile).delete(delete_import_profile))
        .route("/admin/import/:id/files", post(upload_import_file).layer(DefaultBodyLimit::max(upload_limit)))
        .route("/admin/import/:id/files/:name", delete(delete_import_file))
        .route("/admin/import/:id/execute", post(execute_import))
        .route("/admin/export", get(list_export_profiles).post(create_export_profile))
        .route("/admin/export/:id", get(get_export_profile).put(update_export_profile).delete(delete_export_profile))
        .route("/admin/export/:id/execute", post(execute_export))
        .route("/admin/export/:id/files", get(list_export_files))
        .route("/admin/export/:id/files/:name", delete(delete_export_file))
}

/// Build the full application router: public endpoints, the swagger UI and every admin area
/// behind the bearer-token middleware.
pub fn build_router(state: ServerState, cors: CorsLayer, upload_limit: usize) -> Router {
    let public = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout));

    let admin = Router::new()
        .route("/auth/me", get(auth::me))
        .merge(catalog_routes())
        .merge(directory_routes())
        .merge(customer_routes())
        .merge(system_routes())
        .merge(promotion_routes())
        .merge(cms_routes())
        .merge(sales_routes())
        .merge(rule_routes())
        .merge(exchange_routes(upload_limit))
        .route("/admin/roxy", post(media::roxy).layer(DefaultBodyLimit::max(upload_limit)));

    public
        .merge(admin)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(state.clone(), auth::require_bearer_token_state))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
