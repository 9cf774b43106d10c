use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

pub const DISCOUNT_INDEX: &str = "promotions/discounts/index";
pub const DISCOUNT_EDIT: &str = "promotions/discounts/_edit";

/// A named view plus the variables it is rendered with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub name: &'static str,
    pub variables: Value,
}

impl View {
    pub fn new(name: &'static str, variables: Value) -> Self {
        Self { name, variables }
    }

    pub fn variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }
}

pub trait ViewRenderer: Send + Sync {
    fn render(&self, view: View) -> Response;
}

/// Renders the variable bag as a JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonViewRenderer;

impl ViewRenderer for JsonViewRenderer {
    fn render(&self, view: View) -> Response {
        (
            StatusCode::OK,
            Json(json!({ "view": view.name, "variables": view.variables })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn json_renderer_wraps_variables() {
        let view = View::new(DISCOUNT_INDEX, json!({ "discounts": [] }));
        let response = JsonViewRenderer.render(view);
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload["view"], DISCOUNT_INDEX);
        assert_eq!(payload["variables"]["discounts"], json!([]));
    }
}
