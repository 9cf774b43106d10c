use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request},
    response::Response,
    Extension, Router,
};
use discount_admin::{
    app,
    auth::{consts::MANAGE_PROMOTIONS, AuthUser, UserPermissionGate},
    handlers::discounts::DiscountAdminState,
    in_memory_state,
    services::catalog::CatalogEntry,
    services::discounts::{DiscountSettings, InMemoryDiscountStore},
    CatalogSeed,
};
use serde_json::Value;
use tower::ServiceExt;

/// Application harness backed by the in-memory store and fixed catalogs.
pub struct TestApp {
    state: DiscountAdminState,
    pub store: Arc<InMemoryDiscountStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryDiscountStore::new());
        let catalogs = CatalogSeed {
            products: vec![
                CatalogEntry::new(1, "Backpack"),
                CatalogEntry::new(2, "Water bottle"),
                CatalogEntry::new(3, "Headlamp"),
            ],
            product_types: vec![
                CatalogEntry::new(10, "Gear"),
                CatalogEntry::new(11, "Apparel"),
            ],
            user_groups: vec![CatalogEntry::new(5, "Wholesale")],
        };

        Self {
            state: in_memory_state(store.clone(), catalogs, DiscountSettings::default()),
            store,
        }
    }

    fn router(&self, user: Option<AuthUser>) -> Router {
        let router = app(self.state.clone(), Arc::new(UserPermissionGate));
        match user {
            Some(user) => router.layer(Extension(user)),
            None => router,
        }
    }

    /// Sends a request as `user`; `None` sends it unauthenticated.
    pub async fn request_as(
        &self,
        user: Option<AuthUser>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("serialize request body"))
            }
            None => Body::empty(),
        };

        self.router(user)
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router error during test request")
    }

    /// Posts a url-encoded form body as a permitted user.
    pub async fn request_form(&self, uri: &str, body: &str) -> Response {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("build request");

        self.router(Some(marketer()))
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request as a user holding the manage-promotions permission.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> Response {
        self.request_as(Some(marketer()), method, uri, body).await
    }
}

pub fn marketer() -> AuthUser {
    AuthUser::new("marketer").with_permission(MANAGE_PROMOTIONS)
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
