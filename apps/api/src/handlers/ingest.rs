use crate::{
    error::ApiError,
    models::{BatchReport, ErrorResponse, IngestionCursor},
    services::IngestionBatcher,
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};
use log::info;

pub fn ingest_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ingest").route(web::post().to(ingest_batch)));
}

/// Embed and index one slice of the catalog
#[utoipa::path(
    post,
    path = "/api/ingest",
    tag = "Ingestion",
    request_body = IngestionCursor,
    responses(
        (status = 200, description = "Slice indexed; `next_cursor` is null once the catalog is done", body = BatchReport),
        (status = 400, description = "Non-positive page size", body = ErrorResponse),
        (status = 500, description = "Embedding or index failure; retry with the same cursor", body = ErrorResponse),
    )
)]
pub async fn ingest_batch(
    cursor: Json<IngestionCursor>,
    batcher: web::Data<IngestionBatcher>,
) -> Result<HttpResponse, ApiError> {
    info!(
        "Ingesting catalog slice at offset {} (page size {})",
        cursor.offset, cursor.page_size
    );
    let report = batcher.run(cursor.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}
