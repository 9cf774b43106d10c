//! Discount Admin Library
//!
//! Admin back end for commerce discount rules: normalization of raw form
//! input, storage ordering and coupon usage management.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod views;

use axum::{response::Json, routing::get, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use auth::PermissionGate;
use handlers::discounts::{discount_routes, DiscountAdminState};
use services::catalog::{CatalogEntry, InMemoryCatalog};
use services::discounts::{DiscountService, DiscountSettings, InMemoryDiscountStore};
use views::JsonViewRenderer;

/// Entries offered by each in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogSeed {
    pub products: Vec<CatalogEntry>,
    pub product_types: Vec<CatalogEntry>,
    pub user_groups: Vec<CatalogEntry>,
}

/// Wires the admin state onto `store` and one in-memory catalog per role.
pub fn in_memory_state(
    store: Arc<InMemoryDiscountStore>,
    catalogs: CatalogSeed,
    settings: DiscountSettings,
) -> DiscountAdminState {
    let service = DiscountService::new(
        store,
        Arc::new(InMemoryCatalog::new(catalogs.products)),
        Arc::new(InMemoryCatalog::new(catalogs.product_types)),
        Arc::new(InMemoryCatalog::new(catalogs.user_groups)),
        settings,
    );

    DiscountAdminState {
        service: Arc::new(service),
        renderer: Arc::new(JsonViewRenderer),
    }
}

/// Full application router: status routes plus the discount admin under
/// `/admin/discounts`.
pub fn app(state: DiscountAdminState, gate: Arc<dyn PermissionGate>) -> Router {
    Router::new()
        .route("/", get(|| async { "discount-admin up" }))
        .route("/health", get(health))
        .nest("/admin/discounts", discount_routes(state, gate))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn catalogs_stay_separate() {
        let state = in_memory_state(
            Arc::new(InMemoryDiscountStore::new()),
            CatalogSeed {
                products: vec![CatalogEntry::new(1, "Backpack")],
                ..Default::default()
            },
            DiscountSettings::default(),
        );

        let view = state.service.edit(None, Some("1")).await.unwrap();
        assert_eq!(view.variable("products").unwrap()[0]["name"], "Backpack");
        assert_eq!(view.variable("types").unwrap(), &json!({}));
        assert_eq!(view.variable("groups").unwrap(), &json!({}));
    }
}
