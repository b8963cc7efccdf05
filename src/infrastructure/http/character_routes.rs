//! Character API routes

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
    encode, CharacterDto, CharacterPageDto, CharacterRequestDto, PageQueryDto, TechniquePageDto,
};
use crate::application::services::CharacterService;
use crate::domain::errors::CatalogError;
use crate::domain::value_objects::CharacterId;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::state::AppState;

fn character_id(raw: &str) -> Result<CharacterId, ApiError> {
    CharacterId::parse(raw).ok_or(ApiError::Catalog(CatalogError::NotFound("Character")))
}

/// List characters
pub async fn list_characters(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<CharacterPageDto>, ApiError> {
    let Query(params) = params?;
    let query = params.list_query(true);
    let request = query.page;
    let page = state.character_service.list_characters(query).await?;

    Ok(Json(CharacterPageDto::new(page, &request, "/characters", None)))
}

/// Case-insensitive name search
pub async fn search_characters(
    State(state): State<Arc<AppState>>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<CharacterPageDto>, ApiError> {
    let Query(params) = params?;
    let query = params.search_query(true);
    let request = query.page;
    let page = state.character_service.list_characters(query).await?;

    Ok(Json(CharacterPageDto::new(
        page,
        &request,
        "/characters/search",
        params.q.as_deref(),
    )))
}

/// Get a character by ID
pub async fn get_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CharacterDto>, ApiError> {
    let character = state
        .character_service
        .get_character(character_id(&id)?)
        .await?
        .ok_or(CatalogError::NotFound("Character"))?;

    Ok(Json(CharacterDto::from(character)))
}

/// Create a character
pub async fn create_character(
    State(state): State<Arc<AppState>>,
    req: Result<Json<CharacterRequestDto>, JsonRejection>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<CharacterDto>), ApiError> {
    let Json(req) = req?;
    let character = state.character_service.create_character(req.into()).await?;
    let location = format!("/characters/{}", character.character.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(CharacterDto::from(character)),
    ))
}

/// Update a character
pub async fn update_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    req: Result<Json<CharacterRequestDto>, JsonRejection>,
) -> Result<Json<CharacterDto>, ApiError> {
    let id = character_id(&id)?;
    let Json(req) = req?;
    let character = state
        .character_service
        .update_character(id, req.into())
        .await?;

    Ok(Json(CharacterDto::from(character)))
}

/// Delete a character
pub async fn delete_character(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .character_service
        .delete_character(character_id(&id)?)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Techniques used by a character
pub async fn get_character_techniques(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<TechniquePageDto>, ApiError> {
    let id = character_id(&id)?;
    let Query(params) = params?;
    let request = params.page_request(false);
    let page = state
        .character_service
        .character_techniques(id, request)
        .await?;

    let path = format!("/characters/{id}/techniques");
    Ok(Json(TechniquePageDto::new(page, &request, &path, None)))
}

/// Members of a clan, looked up by name
pub async fn list_characters_by_clan(
    State(state): State<Arc<AppState>>,
    Path(clan_name): Path<String>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<CharacterPageDto>, ApiError> {
    let Query(params) = params?;
    let request = params.page_request(true);
    let page = state
        .character_service
        .characters_by_clan(&clan_name, request)
        .await?;

    let path = format!("/characters/clan/{}", encode(&clan_name));
    Ok(Json(CharacterPageDto::new(page, &request, &path, None)))
}

/// Characters of one rank
pub async fn list_characters_by_rank(
    State(state): State<Arc<AppState>>,
    Path(rank): Path<String>,
    params: Result<Query<PageQueryDto>, QueryRejection>,
) -> Result<Json<CharacterPageDto>, ApiError> {
    let Query(params) = params?;
    let request = params.page_request(true);
    let page = state
        .character_service
        .characters_by_rank(&rank, request)
        .await?;

    let path = format!("/characters/rank/{}", encode(&rank));
    Ok(Json(CharacterPageDto::new(page, &request, &path, None)))
}
