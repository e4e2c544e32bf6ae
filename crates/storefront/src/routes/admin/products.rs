//! Admin catalog management.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use suraj_core::ProductId;
use tracing::instrument;

use super::mutation_failed;
use crate::backend::{BackendError, Product, ProductInput};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::CurrentUser;
use crate::routes::checkbox;
use crate::services::catalog;
use crate::state::AppState;

// =============================================================================
// Query and Form Types
// =============================================================================

/// Query parameters for the product list.
#[derive(Debug, Default, Deserialize)]
pub struct AdminProductsQuery {
    #[serde(default)]
    pub q: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Create/edit form data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    pub in_stock: Option<String>,
}

impl ProductForm {
    fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
            image: product.image.clone(),
            category: product.category.clone(),
            in_stock: product.in_stock.then(|| "on".to_string()),
        }
    }

    /// A blank form for a new product, in stock by default.
    fn blank() -> Self {
        Self {
            in_stock: Some("on".to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn stocked(&self) -> bool {
        checkbox(self.in_stock.as_deref())
    }

    /// Validate into the backend body.
    ///
    /// # Errors
    ///
    /// Returns the message to show for a missing name or category, or a
    /// price that is not a non-negative amount.
    pub fn to_input(&self) -> std::result::Result<ProductInput, &'static str> {
        let name = self.name.trim();
        let category = self.category.trim();
        if name.is_empty() || category.is_empty() {
            return Err("Name and category are required.");
        }
        let price: Decimal = self
            .price
            .trim()
            .parse()
            .map_err(|_| "Price must be a number.")?;
        if price.is_sign_negative() {
            return Err("Price cannot be negative.");
        }

        Ok(ProductInput {
            name: name.to_string(),
            price,
            description: self.description.trim().to_string(),
            image: self.image.trim().to_string(),
            in_stock: self.stocked(),
            category: category.to_string(),
        })
    }
}

/// Stock toggle form: the availability to set.
#[derive(Debug, Deserialize)]
pub struct StockForm {
    pub in_stock: bool,
}

// =============================================================================
// Templates
// =============================================================================

/// Product list page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct ProductsTemplate {
    pub user: Option<CurrentUser>,
    pub products: Vec<Product>,
    pub query: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/product_form.html")]
pub struct ProductFormTemplate {
    pub user: Option<CurrentUser>,
    /// `None` when creating.
    pub product_id: Option<ProductId>,
    pub form: ProductForm,
    pub categories: Vec<String>,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    #[must_use]
    pub fn action(&self) -> String {
        self.product_id
            .as_ref()
            .map_or_else(|| "/admin/products".to_string(), |id| format!("/admin/products/{id}"))
    }
}

async fn render_form(
    state: &AppState,
    user: CurrentUser,
    product_id: Option<ProductId>,
    form: ProductForm,
    error: Option<String>,
) -> Response {
    // The category list is only a datalist hint.
    let categories = state
        .backend()
        .list_products()
        .await
        .map(|products| catalog::categories(&products))
        .unwrap_or_default();
    let status = if error.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    let template = ProductFormTemplate {
        user: Some(user),
        product_id,
        form,
        categories,
        error,
    };
    (status, template).into_response()
}

// =============================================================================
// Route Handlers
// =============================================================================

/// List products, optionally filtered by name or category.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Query(query): Query<AdminProductsQuery>,
) -> Result<impl IntoResponse> {
    let products = state.backend().list_products().await?;
    let messages = crate::routes::MessageQuery {
        error: query.error,
        success: query.success,
    };

    Ok(ProductsTemplate {
        user: Some(admin.user),
        products: catalog::admin_search(&products, &query.q),
        query: query.q,
        error: messages.error_text(),
        success: messages.success_text(),
    })
}

/// Display the empty create form.
pub async fn new_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Response {
    render_form(&state, admin.user, None, ProductForm::blank(), None).await
}

/// Create a product.
#[instrument(skip(state, admin, form), fields(user_id = %admin.user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            return Ok(render_form(&state, admin.user, None, form, Some(message.to_string())).await);
        }
    };

    match state.backend().create_product(&admin.token, &input).await {
        Ok(()) => {
            tracing::info!(name = %input.name, "Product created");
            Ok(Redirect::to("/admin/products?success=created").into_response())
        }
        Err(e) => rejected(&state, admin.user, None, form, e).await,
    }
}

/// Display the edit form for one product.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    let product = state.backend().get_product(&id).await?;
    let form = ProductForm::from_product(&product);
    Ok(render_form(&state, admin.user, Some(id), form, None).await)
}

/// Save a product.
#[instrument(skip(state, admin, form), fields(user_id = %admin.user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Form(form): Form<ProductForm>,
) -> Result<Response> {
    let input = match form.to_input() {
        Ok(input) => input,
        Err(message) => {
            return Ok(
                render_form(&state, admin.user, Some(id), form, Some(message.to_string())).await,
            );
        }
    };

    match state.backend().update_product(&admin.token, &id, &input).await {
        Ok(()) => {
            tracing::info!(product_id = %id, "Product updated");
            Ok(Redirect::to("/admin/products?success=updated").into_response())
        }
        Err(e) => rejected(&state, admin.user, Some(id), form, e).await,
    }
}

/// Mark a product in or out of stock.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn toggle_stock(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
    Form(form): Form<StockForm>,
) -> Result<Response> {
    match state
        .backend()
        .set_product_stock(&admin.token, &id, form.in_stock)
        .await
    {
        Ok(()) => {
            tracing::info!(product_id = %id, in_stock = form.in_stock, "Stock changed");
            Ok(Redirect::to("/admin/products?success=updated").into_response())
        }
        Err(e) => mutation_failed(e, "/admin/products", "update_failed"),
    }
}

/// Delete a product.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    match state.backend().delete_product(&admin.token, &id).await {
        Ok(()) => {
            tracing::info!(product_id = %id, "Product deleted");
            Ok(Redirect::to("/admin/products?success=deleted").into_response())
        }
        Err(e) => mutation_failed(e, "/admin/products", "delete_failed"),
    }
}

/// Re-show the form with the backend's complaint, or give up on the request.
async fn rejected(
    state: &AppState,
    user: CurrentUser,
    product_id: Option<ProductId>,
    form: ProductForm,
    err: BackendError,
) -> Result<Response> {
    match err {
        BackendError::Api { status, .. } if status < 500 => {
            let message = err.user_message();
            Ok(render_form(state, user, product_id, form, Some(message)).await)
        }
        err => Err(AppError::Backend(err)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn form() -> ProductForm {
        ProductForm {
            name: " LED TV 43 ".to_string(),
            price: "24999.50".to_string(),
            category: "Television".to_string(),
            in_stock: Some("on".to_string()),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_valid_product() {
        let input = form().to_input().unwrap();
        assert_eq!(input.name, "LED TV 43");
        assert_eq!(input.price, Decimal::from_str("24999.50").unwrap());
        assert!(input.in_stock);
    }

    #[test]
    fn test_name_and_category_required() {
        let mut form = form();
        form.category = String::new();
        assert_eq!(form.to_input().unwrap_err(), "Name and category are required.");
    }

    #[test]
    fn test_price_must_be_non_negative_number() {
        let mut form = form();
        form.price = "abc".to_string();
        assert!(form.to_input().is_err());
        form.price = "-1".to_string();
        assert_eq!(form.to_input().unwrap_err(), "Price cannot be negative.");
        form.price = "0".to_string();
        assert!(form.to_input().is_ok());
    }

    #[test]
    fn test_unticked_stock_box() {
        let mut form = form();
        form.in_stock = None;
        assert!(!form.to_input().unwrap().in_stock);
    }

    #[test]
    fn test_form_action() {
        let template = ProductFormTemplate {
            user: None,
            product_id: Some(ProductId::new("p7")),
            form: ProductForm::blank(),
            categories: Vec::new(),
            error: None,
        };
        assert_eq!(template.action(), "/admin/products/p7");
    }
}
