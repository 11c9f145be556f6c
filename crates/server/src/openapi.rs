use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequest { pub email: String, pub name: String, pub password: String }

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::catalog::list_categories,
        crate::routes::catalog::create_category,
        crate::routes::catalog::move_category,
        crate::routes::promotions::list_discounts,
        crate::routes::promotions::set_rule_sets,
        crate::routes::sales::list_orders,
        crate::routes::rules::list_rule_sets,
        crate::routes::exchange::upload_import_file,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            LoginRequest,
            crate::routes::catalog::DropRequest,
            crate::routes::promotions::RuleSetAssignment,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "catalog"),
        (name = "promotions"),
        (name = "sales"),
        (name = "rules"),
        (name = "exchange")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_admin_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/admin/categories/{id}/move"));
        assert!(doc.paths.paths.contains_key("/admin/import/{id}/files"));
    }
}
