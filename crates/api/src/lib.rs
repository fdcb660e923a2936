pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::{MethodRouter, delete, get, post, put},
};
use bizchat_db::models::role::permissions as p;
use middleware::{Gate, authenticate, record_activity, require};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

fn gated(route: MethodRouter<AppState>, gate: Gate) -> MethodRouter<AppState> {
    route.route_layer(from_fn(require(gate)))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

fn admin_routes() -> Router<AppState> {
    use routes::{activity, company, role, settings, user};

    Router::new()
        // Users
        .route(
            "/api/admin/users",
            gated(get(user::list), Gate::Permission(p::VIEW_USERS))
                .merge(gated(post(user::create), Gate::Permission(p::MANAGE_USERS))),
        )
        .route(
            "/api/admin/users/stats",
            gated(get(user::stats), Gate::Permission(p::VIEW_ANALYTICS)),
        )
        .route(
            "/api/admin/users/{user_id}",
            gated(get(user::get), Gate::Permission(p::VIEW_USERS))
                .merge(gated(put(user::update), Gate::Permission(p::MANAGE_USERS)))
                .merge(gated(delete(user::deactivate), Gate::Permission(p::MANAGE_USERS))),
        )
        .route(
            "/api/admin/users/{user_id}/activity",
            gated(get(user::activity), Gate::TenantAdmin),
        )
        // Roles
        .route(
            "/api/admin/roles",
            gated(get(role::list), Gate::Permission(p::VIEW_ROLES))
                .merge(gated(post(role::create), Gate::Permission(p::MANAGE_ROLES))),
        )
        .route(
            "/api/admin/roles/{role_id}",
            gated(put(role::update), Gate::Permission(p::MANAGE_ROLES))
                .merge(gated(delete(role::delete), Gate::Permission(p::MANAGE_ROLES))),
        )
        .route(
            "/api/admin/roles/{role_id}/permissions",
            gated(put(role::update_permissions), Gate::Permission(p::MANAGE_ROLES)),
        )
        // Settings
        .route(
            "/api/admin/settings",
            gated(
                get(settings::get).put(settings::replace),
                Gate::Permission(p::MANAGE_COMPANY_SETTINGS),
            ),
        )
        // Activity
        .route(
            "/api/admin/activity-logs",
            gated(get(activity::list), Gate::Permission(p::VIEW_ACTIVITY_LOGS)),
        )
        .route(
            "/api/admin/analytics",
            gated(get(activity::analytics), Gate::Permission(p::VIEW_ANALYTICS)),
        )
        // Platform
        .route(
            "/api/admin/companies",
            gated(get(company::list).post(company::create), Gate::SuperAdmin),
        )
        .route(
            "/api/admin/companies/{company_id}",
            gated(
                get(company::get)
                    .put(company::update)
                    .delete(company::deactivate),
                Gate::SuperAdmin,
            ),
        )
}

fn chat_routes() -> Router<AppState> {
    use routes::chat;

    Router::new()
        .route(
            "/api/chats",
            gated(get(chat::list), Gate::Permission(p::VIEW_OWN_CHATS))
                .merge(gated(post(chat::create), Gate::Permission(p::CREATE_CHAT))),
        )
        .route(
            "/api/chats/{chat_id}",
            gated(get(chat::get), Gate::Permission(p::VIEW_OWN_CHATS))
                .merge(gated(
                    put(chat::rename).delete(chat::delete),
                    Gate::Permission(p::MANAGE_OWN_CHATS),
                )),
        )
        .route(
            "/api/chats/{chat_id}/cleanup",
            gated(post(chat::cleanup), Gate::Permission(p::MANAGE_OWN_CHATS)),
        )
        .route(
            "/api/chats/{chat_id}/messages",
            gated(get(chat::messages), Gate::Permission(p::VIEW_OWN_CHATS))
                .merge(gated(post(chat::send_message), Gate::Permission(p::SEND_MESSAGES))),
        )
        .route(
            "/api/chats/{chat_id}/messages/{message_id}",
            gated(delete(chat::delete_message), Gate::Permission(p::MANAGE_OWN_CHATS)),
        )
        .route(
            "/api/chats/{chat_id}/documents",
            gated(post(chat::upload_document), Gate::Permission(p::UPLOAD_DOCUMENTS)),
        )
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let public = Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/register", post(routes::auth::register_disabled))
        .route("/api/companies/register", post(routes::company::register))
        .route("/health", get(health_check));

    // Layers added later run first: authenticate, then record, then the gates.
    let protected = Router::new()
        .route("/api/auth/me", get(routes::auth::me))
        .merge(admin_routes())
        .merge(chat_routes())
        .route_layer(from_fn_with_state(state.clone(), record_activity))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
