//! Domain expansion API routes

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
    DomainExpansionDto, DomainExpansionPageDto, DomainExpansionRequestDto, PageQueryDto,
};
use crate::application::services::DomainExpansionService;
use crate::domain::errors::CatalogError;
use crate::domain::value_objects::{CharacterId, DomainExpansionId};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::state::AppState;

const NOT_FOUND: CatalogError = CatalogError::NotFound("DomainExpansion");

fn expansion_id(raw: &str) -> Result<DomainExpansionId, ApiError> {
    DomainExpansionId::parse(raw).ok_or(ApiError::Catalog(NOT_FOUND))
}

/// List domain expansions
pub async fn list_domain_expansions(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<DomainExpansionPageDto>, ApiError> {
    let Query(params) = params?;
    let query = params.list_query(false);
    let request = query.page;
    let page = state
        .domain_expansion_service
        .list_domain_expansions(query)
        .await?;

    Ok(Json(DomainExpansionPageDto::new(
        page,
        &request,
        "/domain-expansions",
        None,
    )))
}

pub async fn search_domain_expansions(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<DomainExpansionPageDto>, ApiError> {
    let Query(params) = params?;
    let query = params.search_query(false);
    let request = query.page;
    let page = state
        .domain_expansion_service
        .list_domain_expansions(query)
        .await?;

    Ok(Json(DomainExpansionPageDto::new(
        page,
        &request,
        "/domain-expansions/search",
        params.q.as_deref(),
    )))
}

/// Get a domain expansion by ID
pub async fn get_domain_expansion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DomainExpansionDto>, ApiError> {
    let expansion = state
        .domain_expansion_service
        .get_domain_expansion(expansion_id(&id)?)
        .await?
        .ok_or(NOT_FOUND)?;

    Ok(Json(DomainExpansionDto::from(expansion)))
}

/// Domain expansion owned by a character
pub async fn get_domain_expansion_by_character(
    State(state): State<Arc<AppState>>,
    Path(character_id): Path<String>,
) -> Result<Json<DomainExpansionDto>, ApiError> {
    let character_id = CharacterId::parse(&character_id)
        .ok_or(ApiError::Catalog(CatalogError::NotFound("Character")))?;
    let expansion = state
        .domain_expansion_service
        .domain_expansion_of_character(character_id)
        .await?
        .ok_or(NOT_FOUND)?;

    Ok(Json(DomainExpansionDto::from(expansion)))
}

/// Create an unowned domain expansion
pub async fn create_domain_expansion(
    State(state): State<Arc<AppState>>,
    req: Result<Json<DomainExpansionRequestDto>, JsonRejection>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<DomainExpansionDto>), ApiError>
{
    let Json(req) = req?;
    let expansion = state
        .domain_expansion_service
        .create_domain_expansion(req.into())
        .await?;
    let location = format!("/domain-expansions/{}", expansion.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(DomainExpansionDto::from(expansion)),
    ))
}

/// Update a domain expansion
pub async fn update_domain_expansion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    req: Result<Json<DomainExpansionRequestDto>, JsonRejection>,
) -> Result<Json<DomainExpansionDto>, ApiError> {
    let id = expansion_id(&id)?;
    let Json(req) = req?;
    let expansion = state
        .domain_expansion_service
        .update_domain_expansion(id, req.into())
        .await?;

    Ok(Json(DomainExpansionDto::from(expansion)))
}

/// Delete a domain expansion
pub async fn delete_domain_expansion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .domain_expansion_service
        .delete_domain_expansion(expansion_id(&id)?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
