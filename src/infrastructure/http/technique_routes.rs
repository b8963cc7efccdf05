//! Technique API routes

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::application::dto::{
    CharacterPageDto, PageQueryDto, TechniqueDto, TechniquePageDto, TechniqueRequestDto,
};
use crate::application::services::TechniqueService;
use crate::domain::errors::CatalogError;
use crate::domain::value_objects::TechniqueId;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::state::AppState;

fn technique_id(raw: &str) -> Result<TechniqueId, ApiError> {
    TechniqueId::parse(raw).ok_or(ApiError::Catalog(CatalogError::NotFound("Technique")))
}

/// List techniques
pub async fn list_techniques(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<TechniquePageDto>, ApiError> {
    let Query(params) = params?;
    let query = params.list_query(false);
    let request = query.page;
    let page = state.technique_service.list_techniques(query).await?;

    Ok(Json(TechniquePageDto::new(page, &request, "/techniques", None)))
}

pub async fn search_techniques(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<TechniquePageDto>, ApiError> {
    let Query(params) = params?;
    let query = params.search_query(false);
    let request = query.page;
    let page = state.technique_service.list_techniques(query).await?;

    Ok(Json(TechniquePageDto::new(
        page,
        &request,
        "/techniques/search",
        params.q.as_deref(),
    )))
}

/// Get a technique by ID
pub async fn get_technique(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TechniqueDto>, ApiError> {
    let technique = state
        .technique_service
        .get_technique(technique_id(&id)?)
        .await?
        .ok_or(CatalogError::NotFound("Technique"))?;

    Ok(Json(TechniqueDto::from(technique)))
}

/// Create a technique
pub async fn create_technique(
    State(state): State<Arc<AppState>>,
    req: Result<Json<TechniqueRequestDto>, JsonRejection>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<TechniqueDto>), ApiError> {
    let Json(req) = req?;
    let technique = state.technique_service.create_technique(req.into()).await?;
    let location = format!("/techniques/{}", technique.technique.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(TechniqueDto::from(technique)),
    ))
}

/// Update a technique
pub async fn update_technique(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    req: Result<Json<TechniqueRequestDto>, JsonRejection>,
) -> Result<Json<TechniqueDto>, ApiError> {
    let id = technique_id(&id)?;
    let Json(req) = req?;
    let technique = state
        .technique_service
        .update_technique(id, req.into())
        .await?;

    Ok(Json(TechniqueDto::from(technique)))
}

/// Delete a technique
pub async fn delete_technique(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .technique_service
        .delete_technique(technique_id(&id)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Characters using a technique
pub async fn list_technique_users(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<CharacterPageDto>, ApiError> {
    let id = technique_id(&id)?;
    let Query(params) = params?;
    let request = params.page_request(true);
    let page = state.technique_service.technique_users(id, request).await?;

    let path = format!("/techniques/{id}/users");
    Ok(Json(CharacterPageDto::new(page, &request, &path, None)))
}
