mod auth;
mod health;
mod notifications;
pub mod spaces;
mod test_seed;
mod users;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        // Auth (register/login are public, logout requires auth)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        // Users
        .route("/users/@me", get(users::get_current_user))
        .route("/users/{user_id}", get(users::get_user))
        // Spaces: pairing
        .route("/spaces", post(spaces::create_space))
        .route("/spaces/my", get(spaces::get_my_space))
        .route("/spaces/redeem", post(spaces::redeem_code))
        .route("/spaces/join", post(spaces::confirm_join))
        .route(
            "/spaces/pet-names",
            get(spaces::get_pet_names).put(spaces::update_pet_names),
        )
        .route(
            "/spaces/{space_id}",
            put(spaces::update_anniversary_date).delete(spaces::delete_space),
        )
        // Spaces: unbind lifecycle
        .route(
            "/spaces/{space_id}/unbind",
            post(spaces::request_unbind)
                .get(spaces::get_unbind_status)
                .delete(spaces::cancel_unbind),
        )
        // Notifications
        .route("/notifications", get(notifications::list_notifications))
        .route(
            "/notifications/{notification_id}/read",
            post(notifications::mark_read),
        )
        // Version
        .route("/version", get(health::version))
        // Test-mode fixture seeding
        .route("/test/seed", post(test_seed::seed))
}
