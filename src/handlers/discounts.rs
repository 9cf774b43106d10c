use axum::{
    async_trait,
    extract::{Form, FromRequest, Json, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::{consts as perm, permission_middleware, PermissionGate, RequiredPermission};
use crate::errors::ServiceError;
use crate::services::discounts::{
    DiscountService, RawInput, REORDER_FAILED, SAVED_NOTICE, SAVE_FAILED,
};
use crate::views::ViewRenderer;

/// Shared state of the discount admin routes
#[derive(Clone)]
pub struct DiscountAdminState {
    pub service: Arc<DiscountService>,
    pub renderer: Arc<dyn ViewRenderer>,
}

/// Creates the router for the discount admin endpoints. Every route requires
/// the manage-promotions permission.
pub fn discount_routes(state: DiscountAdminState, gate: Arc<dyn PermissionGate>) -> Router {
    let required = RequiredPermission {
        gate,
        permission: perm::MANAGE_PROMOTIONS,
    };

    Router::new()
        .route("/", get(index).post(save))
        .route("/new", get(edit_new))
        .route("/:id", get(edit_existing))
        .route("/reorder", post(reorder))
        .route("/delete", post(delete))
        .route("/clear-coupon-usage-history", post(clear_coupon_usage_history))
        .route_layer(middleware::from_fn_with_state(required, permission_middleware))
        .with_state(state)
}

/// Discount form body, posted either as JSON or url-encoded.
#[derive(Debug)]
pub struct DiscountForm(pub RawInput);

#[async_trait]
impl<S> FromRequest<S> for DiscountForm
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let url_encoded = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map_or(false, |ct| ct.starts_with("application/x-www-form-urlencoded"));

        if url_encoded {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| ServiceError::BadRequest(e.body_text()))?;
            Ok(Self(RawInput::from_form_pairs(pairs)))
        } else {
            let Json(input) = Json::<RawInput>::from_request(req, state)
                .await
                .map_err(|e| ServiceError::BadRequest(e.body_text()))?;
            Ok(Self(input))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditQuery {
    #[serde(rename = "productIds")]
    pub product_ids: Option<String>,
}

/// `ids` may be a JSON array or a string holding a JSON-encoded array.
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: Option<Value>,
}

async fn index(State(state): State<DiscountAdminState>) -> Result<Response, ServiceError> {
    let view = state.service.index().await?;
    Ok(state.renderer.render(view))
}

async fn edit_new(
    State(state): State<DiscountAdminState>,
    Query(query): Query<EditQuery>,
) -> Result<Response, ServiceError> {
    let view = state
        .service
        .edit(None, query.product_ids.as_deref())
        .await?;
    Ok(state.renderer.render(view))
}

async fn edit_existing(
    State(state): State<DiscountAdminState>,
    Path(id): Path<i64>,
) -> Result<Response, ServiceError> {
    let view = state.service.edit(Some(id), None).await?;
    Ok(state.renderer.render(view))
}

async fn save(
    State(state): State<DiscountAdminState>,
    DiscountForm(input): DiscountForm,
) -> Result<Response, ServiceError> {
    match state.service.save(&input).await {
        Ok(discount) => Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "notice": SAVED_NOTICE,
                "discount": discount,
            })),
        )
            .into_response()),
        Err(ServiceError::ValidationError(errors)) => Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": SAVE_FAILED,
                "errors": errors.to_field_errors(),
            })),
        )
            .into_response()),
        Err(other) => Err(other),
    }
}

async fn reorder(
    State(state): State<DiscountAdminState>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<Value>, ServiceError> {
    let ids = parse_id_list(required_param(request.ids, "ids")?)?;
    if state.service.reorder(&ids).await? {
        Ok(Json(json!({ "success": true })))
    } else {
        Ok(Json(json!({ "error": REORDER_FAILED })))
    }
}

async fn delete(
    State(state): State<DiscountAdminState>,
    Json(request): Json<IdRequest>,
) -> Result<Json<Value>, ServiceError> {
    let id = parse_id(&required_param(request.id, "id")?)?;
    state.service.delete(id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn clear_coupon_usage_history(
    State(state): State<DiscountAdminState>,
    Json(request): Json<IdRequest>,
) -> Result<Json<Value>, ServiceError> {
    let id = parse_id(&required_param(request.id, "id")?)?;
    state.service.clear_coupon_usage_history(id).await?;
    Ok(Json(json!({ "success": true })))
}

fn required_param(value: Option<Value>, name: &str) -> Result<Value, ServiceError> {
    match value {
        Some(Value::Null) | None => Err(ServiceError::BadRequest(format!(
            "Missing required parameter: {name}"
        ))),
        Some(value) => Ok(value),
    }
}

fn parse_id(value: &Value) -> Result<i64, ServiceError> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| ServiceError::BadRequest(format!("Invalid discount id: {value}")))
}

fn parse_id_list(value: Value) -> Result<Vec<i64>, ServiceError> {
    let items = match value {
        Value::Array(items) => items,
        Value::String(encoded) => serde_json::from_str::<Vec<Value>>(&encoded)
            .map_err(|e| ServiceError::BadRequest(format!("Invalid ids: {e}")))?,
        other => {
            return Err(ServiceError::BadRequest(format!(
                "Invalid ids: expected a list, got {other}"
            )))
        }
    };
    items.iter().map(parse_id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn ids_accept_arrays_and_encoded_strings() {
        assert_eq!(parse_id_list(json!([3, "1", 2])).unwrap(), vec![3, 1, 2]);
        assert_eq!(parse_id_list(json!("[4, 5]")).unwrap(), vec![4, 5]);
        assert_matches!(parse_id_list(json!({"a": 1})), Err(ServiceError::BadRequest(_)));
        assert_matches!(parse_id_list(json!(["x"])), Err(ServiceError::BadRequest(_)));
    }

    #[test]
    fn missing_params_are_bad_requests() {
        assert_matches!(required_param(None, "id"), Err(ServiceError::BadRequest(_)));
        assert_matches!(
            required_param(Some(Value::Null), "id"),
            Err(ServiceError::BadRequest(_))
        );
        assert_eq!(parse_id(&json!(" 9 ")).unwrap(), 9);
    }
}
