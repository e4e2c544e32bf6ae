//! Product route handlers.
//!
//! Listing filters and sorts the cached catalog locally; each card reflects
//! the visitor's cart line when they are logged in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::Uri,
    response::IntoResponse,
};
use serde::Deserialize;
use suraj_core::{CartItemId, Price, ProductId};
use tracing::instrument;

use crate::backend::{Cart, Product};
use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::{AuthSession, CurrentUser};
use crate::services::catalog::{self, PriceSort};
use crate::state::AppState;

// =============================================================================
// View Types
// =============================================================================

/// The visitor's cart line for a product.
#[derive(Debug, Clone)]
pub struct CartLineRef {
    pub item_id: CartItemId,
    pub quantity: u32,
}

/// Product card display data for templates.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub product: Product,
    pub price: Price,
    pub cart_line: Option<CartLineRef>,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: Product, cart: &Cart) -> Self {
        let cart_line = cart.line_for(&product.id).map(|item| CartLineRef {
            item_id: item.id.clone(),
            quantity: item.quantity,
        });
        Self {
            price: product.unit_price(),
            product,
            cart_line,
        }
    }
}

/// Build cards for a product list.
#[must_use]
pub fn cards(products: Vec<Product>, cart: &Cart) -> Vec<ProductCard> {
    products
        .into_iter()
        .map(|product| ProductCard::new(product, cart))
        .collect()
}

/// The visitor's cart, or an empty one when logged out or unreachable.
///
/// Catalog pages still render when the cart call fails.
pub async fn cart_for(state: &AppState, auth: Option<&AuthSession>) -> Cart {
    let Some(auth) = auth else {
        return Cart::default();
    };
    match state.backend().get_cart(&auth.token).await {
        Ok(cart) => cart,
        Err(e) => {
            tracing::warn!(user_id = %auth.user.id, error = %e, "Failed to load cart for catalog page");
            Cart::default()
        }
    }
}

/// The current path and query, used as the `return_to` of card forms.
fn current_path(uri: &Uri) -> String {
    uri.path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string)
}

// =============================================================================
// Product Listing
// =============================================================================

/// Query parameters for the product list.
#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
    #[serde(default)]
    pub sort: PriceSort,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub user: Option<CurrentUser>,
    pub cards: Vec<ProductCard>,
    pub categories: Vec<String>,
    pub selected_category: String,
    pub sort: PriceSort,
    pub return_to: String,
}

/// Display the product listing page.
#[instrument(skip(state, auth))]
pub async fn index(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Query(query): Query<ProductsQuery>,
    OriginalUri(uri): OriginalUri,
) -> Result<impl IntoResponse> {
    let products = state.backend().list_products().await?;
    let cart = cart_for(&state, auth.0.as_ref()).await;

    let selected = catalog::filter_and_sort(&products, query.category.as_deref(), query.sort);

    Ok(ProductsIndexTemplate {
        user: auth.user().cloned(),
        cards: cards(selected, &cart),
        categories: catalog::categories(&products),
        selected_category: query.category.unwrap_or_default(),
        sort: query.sort,
        return_to: current_path(&uri),
    })
}

// =============================================================================
// Product Detail
// =============================================================================

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub user: Option<CurrentUser>,
    pub card: ProductCard,
    pub related: Vec<ProductCard>,
    pub return_to: String,
}

/// Display a product detail page.
#[instrument(skip(state, auth), fields(product_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    auth: OptionalAuth,
    Path(id): Path<ProductId>,
) -> Result<impl IntoResponse> {
    let product = state.backend().get_product(&id).await?;
    let products = state.backend().list_products().await?;
    let cart = cart_for(&state, auth.0.as_ref()).await;

    let related = cards(catalog::related(&products, &product), &cart);

    Ok(ProductShowTemplate {
        user: auth.user().cloned(),
        return_to: format!("/products/{}", urlencoding::encode(id.as_str())),
        card: ProductCard::new(product, &cart),
        related,
    })
}
