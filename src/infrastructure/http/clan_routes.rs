//! Clan API routes

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
    CharacterPageDto, ClanDto, ClanPageDto, ClanRequestDto, PageQueryDto,
};
use crate::application::services::ClanService;
use crate::domain::errors::CatalogError;
use crate::domain::value_objects::ClanId;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::state::AppState;

fn clan_id(raw: &str) -> Result<ClanId, ApiError> {
    ClanId::parse(raw).ok_or(ApiError::Catalog(CatalogError::NotFound("Clan")))
}

/// List clans
pub async fn list_clans(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<ClanPageDto>, ApiError> {
    let Query(params) = params?;
    let query = params.list_query(false);
    let request = query.page;
    let page = state.clan_service.list_clans(query).await?;

    Ok(Json(ClanPageDto::new(page, &request, "/clans", None)))
}

pub async fn search_clans(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<ClanPageDto>, ApiError> {
    let Query(params) = params?;
    let query = params.search_query(false);
    let request = query.page;
    let page = state.clan_service.list_clans(query).await?;

    Ok(Json(ClanPageDto::new(
        page,
        &request,
        "/clans/search",
        params.q.as_deref(),
    )))
}

/// Get a clan by ID
pub async fn get_clan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ClanDto>, ApiError> {
    let clan = state
        .clan_service
        .get_clan(clan_id(&id)?)
        .await?
        .ok_or(CatalogError::NotFound("Clan"))?;

    Ok(Json(ClanDto::from(clan)))
}

/// Create a clan
pub async fn create_clan(
    State(state): State<Arc<AppState>>,
    req: Result<Json<ClanRequestDto>, JsonRejection>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<ClanDto>), ApiError> {
    let Json(req) = req?;
    let clan = state.clan_service.create_clan(req.into()).await?;
    let location = format!("/clans/{}", clan.clan.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ClanDto::from(clan)),
    ))
}

/// Update a clan
pub async fn update_clan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    req: Result<Json<ClanRequestDto>, JsonRejection>,
) -> Result<Json<ClanDto>, ApiError> {
    let id = clan_id(&id)?;
    let Json(req) = req?;
    let clan = state.clan_service.update_clan(id, req.into()).await?;

    Ok(Json(ClanDto::from(clan)))
}

/// Delete a clan; its members move to the sentinel clan
pub async fn delete_clan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.clan_service.delete_clan(clan_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Members of a clan
pub async fn list_clan_members(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<CharacterPageDto>, ApiError> {
    let id = clan_id(&id)?;
    let Query(params) = params?;
    let request = params.page_request(true);
    let page = state.clan_service.clan_members(id, request).await?;

    let path = format!("/clans/{id}/members");
    Ok(Json(CharacterPageDto::new(page, &request, &path, None)))
}
