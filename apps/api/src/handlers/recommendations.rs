use crate::{
    error::ApiError,
    models::{ErrorResponse, RecommendationRequest, RecommendationResponse},
    services::RecommendationService,
};
use actix_web::{
    web::{self, Json},
    HttpResponse,
};

pub fn recommendations_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/recommendations").route(web::post().to(get_recommendations)));
}

/// Get wine recommendations from questionnaire answers
#[utoipa::path(
    post,
    path = "/api/recommendations",
    tag = "Recommendations",
    request_body = RecommendationRequest,
    responses(
        (status = 200, description = "Matched wines with sommelier commentary", body = RecommendationResponse),
        (status = 400, description = "Empty questionnaire", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    summary = "Get wine recommendations",
    description = "Builds a search phrase from the answered facets and free text, finds the closest wines (three by default) and adds a short sommelier commentary. The commentary is always present, even when the language model is unavailable."
)]
pub async fn get_recommendations(
    request: Json<RecommendationRequest>,
    recommendation_service: web::Data<RecommendationService>,
) -> Result<HttpResponse, ApiError> {
    let response = recommendation_service.recommend(&request).await?;
    Ok(HttpResponse::Ok().json(response))
}
