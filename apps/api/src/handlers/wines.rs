use crate::{
    error::ApiError,
    models::{ErrorResponse, SearchRequest, WineRecord},
    services::{CatalogStore, WineSearch},
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};

const MAX_SEARCH_LIMIT: usize = 50;

pub fn wines_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/wines").route(web::get().to(list_wines)))
        .service(web::resource("/wines/search").route(web::post().to(search_wines)));
}

/// List the whole catalog
#[utoipa::path(
    get,
    path = "/api/wines",
    tag = "Wines",
    responses(
        (status = 200, description = "Every catalog row in id order", body = [WineRecord]),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    )
)]
pub async fn list_wines(store: web::Data<dyn CatalogStore>) -> Result<HttpResponse, ApiError> {
    let wines = store.all_wines().await?;
    Ok(HttpResponse::Ok().json(wines))
}

/// Semantic wine search
#[utoipa::path(
    post,
    path = "/api/wines/search",
    tag = "Wines",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching wines, best match first", body = [WineRecord]),
        (status = 400, description = "Empty query or invalid limit", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    description = "Embeds the query, looks up the nearest catalog rows in the vector index and returns them in rank order. Rows that have been deleted since indexing are skipped."
)]
pub async fn search_wines(
    request: Json<SearchRequest>,
    search: web::Data<WineSearch>,
) -> Result<HttpResponse, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::InvalidInput("Query cannot be empty".to_string()));
    }
    if request.limit == 0 || request.limit > MAX_SEARCH_LIMIT {
        return Err(ApiError::InvalidInput(format!(
            "limit must be between 1 and {}",
            MAX_SEARCH_LIMIT
        )));
    }

    let wines = search.search(&request.query, request.limit).await?;
    Ok(HttpResponse::Ok().json(wines))
}
