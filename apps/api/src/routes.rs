use actix_web::{web, HttpResponse, Scope};
use utoipa::OpenApi;

use crate::app::ApiDoc;
use crate::handlers::{
    health_check, health_options, ingest_config, recommendations_config, wines_config,
};

/// Configure all routes for the API
pub fn api_routes() -> Scope {
    web::scope("/api")
        .service(health_check)
        .service(health_options)
        .configure(wines_config)
        .configure(recommendations_config)
        .configure(ingest_config)
}

/// Configure OpenAPI documentation JSON endpoint
pub fn openapi_route() -> actix_web::Resource {
    web::resource("/api-docs/openapi.json")
        .route(web::get().to(|| async {
            HttpResponse::Ok()
                .append_header(("Content-Type", "application/json"))
                .json(ApiDoc::openapi())
        }))
        .route(
            web::route()
                .method(actix_web::http::Method::OPTIONS)
                .to(|| async { HttpResponse::Ok().finish() }),
        )
}
