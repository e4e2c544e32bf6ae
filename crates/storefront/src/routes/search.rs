//! Search route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::routes::products::{ProductCard, cart_for, cards};
use crate::services::catalog;
use crate::state::AppState;

/// Search page query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchPageQuery {
    #[serde(default)]
    pub q: String,
}

/// Search page template.
#[derive(Template, WebTemplate)]
#[template(path = "search.html")]
pub struct SearchPageTemplate {
    pub user: Option<CurrentUser>,
    pub query: String,
    pub cards: Vec<ProductCard>,
    pub return_to: String,
}

/// Display search results: product names containing the query.
#[instrument(skip(state, auth))]
pub async fn index(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Query(query): Query<SearchPageQuery>,
) -> Result<impl IntoResponse> {
    let query = query.q.trim().to_string();
    let results = if query.is_empty() {
        Vec::new()
    } else {
        let products = state.backend().list_products().await?;
        catalog::search(&products, &query)
    };
    let cart = cart_for(&state, auth.0.as_ref()).await;

    Ok(SearchPageTemplate {
        user: auth.user().cloned(),
        return_to: format!("/search?q={}", urlencoding::encode(&query)),
        query,
        cards: cards(results, &cart),
    })
}
