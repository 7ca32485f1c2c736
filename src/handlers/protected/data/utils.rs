use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::database::entity::Entity;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `:entity` path segment to a known entity (400 otherwise)
pub fn parse_entity(segment: &str) -> Result<Entity, ApiError> {
    Ok(segment.parse::<Entity>()?)
}

/// Request bodies for writes must be JSON objects
pub fn object_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, ApiError> {
    let Json(value) = payload?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("request body must be a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_entity_is_a_bad_request() {
        assert_eq!(parse_entity("widgets").unwrap_err().status_code(), 400);
        assert_eq!(parse_entity("paymentlogs").unwrap(), Entity::PaymentLog);
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        assert!(object_body(Ok(Json(json!([1, 2])))).is_err());
        assert_eq!(object_body(Ok(Json(json!({"name": "A"})))).unwrap()["name"], "A");
    }
}
