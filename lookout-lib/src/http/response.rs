use std::any::Any;
use std::future::Future;

use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Response, StatusCode};
use http_body_util::{combinators::BoxBody, BodyExt, Full};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{LookoutError, Result};
use crate::http::headers::content_types;

pub type RespBody = BoxBody<Bytes, hyper::Error>;

/// JSON body of every error answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status_code: status.as_u16(), message: message.into() }
    }
}

pub fn full_body(bytes: impl Into<Bytes>) -> RespBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Serialized value followed by a newline
fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut body = serde_json::to_vec(value)
        .map_err(|e| LookoutError::Http(format!("Failed to serialize response: {e}")))?;
    body.push(b'\n');
    Ok(body)
}

/// 200 with `value` as JSON
pub fn json_response<T: Serialize + ?Sized>(value: &T) -> Result<Response<RespBody>> {
    respond_with_error(StatusCode::OK, value, content_types::APPLICATION_JSON)
}

/// `status` with `value` serialized as JSON under the given content type
pub fn respond_with_error<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
    content_type: &str,
) -> Result<Response<RespBody>> {
    let body = encode_json(value)?;
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .body(full_body(body))
        .map_err(|e| LookoutError::Http(format!("Failed to build response: {e}")))
}

/// `ErrorResponse { status, message }` as JSON. Never fails.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response<RespBody> {
    let body = encode_json(&ErrorResponse::new(status, message)).unwrap_or_default();
    let mut resp = Response::new(full_body(body));
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_types::APPLICATION_JSON));
    resp
}

/// Error answer matching `err`'s status code
pub fn error_for(err: &LookoutError) -> Response<RespBody> {
    error_response(err.status_code(), err.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Run a handler on its own task so a panic cannot take the connection down.
///
/// A panic is logged and answered with a 500 `ErrorResponse`, returned as
/// `Err` so the caller can count it.
pub async fn catch_panic<F>(handler: F) -> std::result::Result<Response<RespBody>, Response<RespBody>>
where
    F: Future<Output = Response<RespBody>> + Send + 'static,
{
    match tokio::spawn(handler).await {
        Ok(resp) => Ok(resp),
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            error!(panic = panic_message(&*payload), "handler panicked");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"))
        }
        Err(e) => {
            error!(error = %e, "handler task did not complete");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error"))
        }
    }
}
