//! HTTP REST API routes

mod character_routes;
mod clan_routes;
mod domain_expansion_routes;
mod technique_routes;

pub mod error;
pub mod middleware;


use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::infrastructure::state::AppState;

/// Create all API routes
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Character routes
        .route(
            "/characters",
            get(character_routes::list_characters).post(character_routes::create_character),
        )
        .route(
            "/characters/search",
            get(character_routes::search_characters),
        )
        .route(
            "/characters/clan/{clan_name}",
            get(character_routes::list_characters_by_clan),
        )
        .route(
            "/characters/rank/{rank}",
            get(character_routes::list_characters_by_rank),
        )
        .route(
            "/characters/{id}",
            get(character_routes::get_character)
                .put(character_routes::update_character)
                .delete(character_routes::delete_character),
        )
        .route(
            "/characters/{id}/techniques",
            get(character_routes::get_character_techniques),
        )
        // Clan routes
        .route(
            "/clans",
            get(clan_routes::list_clans).post(clan_routes::create_clan),
        )
        .route("/clans/search", get(clan_routes::search_clans))
        .route(
            "/clans/{id}",
            get(clan_routes::get_clan)
                .put(clan_routes::update_clan)
                .delete(clan_routes::delete_clan),
        )
        .route("/clans/{id}/members", get(clan_routes::list_clan_members))
        // Technique routes
        .route(
            "/techniques",
            get(technique_routes::list_techniques).post(technique_routes::create_technique),
        )
        .route(
            "/techniques/search",
            get(technique_routes::search_techniques),
        )
        .route(
            "/techniques/{id}",
            get(technique_routes::get_technique)
                .put(technique_routes::update_technique)
                .delete(technique_routes::delete_technique),
        )
        .route(
            "/techniques/{id}/users",
            get(technique_routes::list_technique_users),
        )
        // Domain expansion routes
        .route(
            "/domain-expansions",
            get(domain_expansion_routes::list_domain_expansions)
                .post(domain_expansion_routes::create_domain_expansion),
        )
        .route(
            "/domain-expansions/search",
            get(domain_expansion_routes::search_domain_expansions),
        )
        .route(
            "/domain-expansions/by-character/{id}",
            get(domain_expansion_routes::get_domain_expansion_by_character),
        )
        .route(
            "/domain-expansions/{id}",
            get(domain_expansion_routes::get_domain_expansion)
                .put(domain_expansion_routes::update_domain_expansion)
                .delete(domain_expansion_routes::delete_domain_expansion),
        )
}

async fn health_check() -> &'static str {
    "OK"
}

/// Full application router with the request pipeline applied
pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route("/health", get(health_check))
        .merge(create_routes())
        .layer(from_fn_with_state(state.clone(), middleware::idempotency))
        .layer(from_fn(middleware::api_version))
        .layer(from_fn_with_state(state.clone(), middleware::rate_limit))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
