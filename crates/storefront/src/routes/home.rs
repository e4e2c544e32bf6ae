//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::models::CurrentUser;
use crate::routes::products::{ProductCard, cart_for, cards};
use crate::services::catalog;
use crate::state::AppState;

/// A headline figure in the "trusted by" band.
pub struct Stat {
    pub value: &'static str,
    pub label: &'static str,
}

/// A customer testimonial.
pub struct Review {
    pub name: &'static str,
    pub area: &'static str,
    pub text: &'static str,
}

const STATS: [Stat; 5] = [
    Stat { value: "200+", label: "Types of Remotes" },
    Stat { value: "5,000+", label: "Satisfied Customers" },
    Stat { value: "10,000+", label: "TVs Repaired" },
    Stat { value: "120+", label: "TV Stand Models" },
    Stat { value: "80+", label: "Wires & Adaptors" },
];

const REVIEWS: [Review; 6] = [
    Review {
        name: "Rahul Kumar",
        area: "Shalimar",
        text: "Called for a repair and they came on time. The technician fixed the display issue without overcharging.",
    },
    Review {
        name: "Pooja Sharma",
        area: "Rajender Nagar",
        text: "Bought a new remote and some wires from the shop. Prices were reasonable and the counter staff were helpful.",
    },
    Review {
        name: "Deepak Verma",
        area: "Ganeshpuri",
        text: "My TV wasn't turning on. They picked it up, repaired it and returned it the next day.",
    },
    Review {
        name: "Nisha Yadav",
        area: "Janakpuri",
        text: "Got a wall mount installed. The technician was polite and did the job neatly.",
    },
    Review {
        name: "Mohit Jain",
        area: "Pannu Chowk",
        text: "Replaced a broken panel on my LED TV. They used original parts and gave a receipt.",
    },
    Review {
        name: "Sakshi Mehra",
        area: "Shalimar",
        text: "Used their doorstep service for a power issue. It was fixed properly.",
    },
];

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub user: Option<CurrentUser>,
    pub cards: Vec<ProductCard>,
    pub store_name: String,
    pub store_phone: Option<String>,
    pub return_to: String,
    pub stats: &'static [Stat],
    pub reviews: &'static [Review],
}

/// Display the home page: hero, every product that is in stock, then the
/// shop's figures, reviews, location and contact details.
#[instrument(skip(state, auth))]
pub async fn home(State(state): State<AppState>, auth: OptionalAuth) -> Result<impl IntoResponse> {
    let products = state.backend().list_products().await?;
    let cart = cart_for(&state, auth.0.as_ref()).await;

    Ok(HomeTemplate {
        user: auth.user().cloned(),
        cards: cards(catalog::in_stock(&products), &cart),
        store_name: state.payment().store_name.clone(),
        store_phone: state.config().store_phone.clone(),
        return_to: "/".to_string(),
        stats: &STATS,
        reviews: &REVIEWS,
    })
}
