use axum::{
    routing::{get, post},
    Router,
};

use crate::api::{handlers, ws};
use crate::AppState;

/// Build the `/api/v1` router. Auth is enforced per-handler via the
/// `AuthUser` extractor.
pub fn create_router() -> Router<AppState> {
    let articles = Router::new()
        .route(
            "/articles",
            post(handlers::articles::add_article).get(handlers::articles::list_articles),
        )
        .route("/articles/bulk", post(handlers::articles::bulk_ingest))
        .route("/articles/bulk/ws", get(ws::bulk_ws))
        .route("/articles/ws", get(ws::ingest_ws))
        .route(
            "/articles/{id}",
            get(handlers::articles::get_article).delete(handlers::articles::delete_article),
        );

    let search = Router::new()
        .route("/search", post(handlers::search::search))
        .route("/search/keyword", get(handlers::search::keyword_search))
        .route("/search/ws", get(ws::search_ws));

    let auth = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh_token));

    let public = Router::new()
        .route("/public/articles", get(handlers::public::list_articles))
        .route("/public/articles/{id}", get(handlers::public::get_article))
        .route("/public/search", post(handlers::public::search));

    let misc = Router::new()
        .route("/languages", get(handlers::misc::languages))
        .route("/health", get(handlers::misc::health));

    Router::new()
        .merge(articles)
        .merge(search)
        .merge(auth)
        .merge(public)
        .merge(misc)
}
