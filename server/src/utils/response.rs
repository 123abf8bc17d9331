use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Serializes `data` as the response body. Successful responses carry the
/// resource itself with no envelope.
///
/// If encoding fails the JSON body can no longer be produced, so a plain-text
/// 500 is sent instead.
pub fn json<T>(status: StatusCode, data: &T) -> Response
where
    T: Serialize + ?Sized,
{
    match serde_json::to_vec(data) {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to encode response",
            )
                .into_response()
        }
    }
}

pub fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        error: code.to_string(),
        message: message.into(),
    };

    json(status, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde::ser::Error as _;

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot encode"))
        }
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = error(StatusCode::NOT_FOUND, "not_found", "Event not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"error": "not_found", "message": "Event not found"})
        );
    }

    #[tokio::test]
    async fn test_empty_message_is_omitted() {
        let response = error(StatusCode::BAD_REQUEST, "invalid_id", "");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, serde_json::json!({"error": "invalid_id"}));
    }

    #[tokio::test]
    async fn test_encoding_failure_falls_back_to_plain_text() {
        let response = json(StatusCode::OK, &Unencodable);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"failed to encode response");
    }
}
