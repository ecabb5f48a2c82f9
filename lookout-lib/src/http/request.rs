use std::fmt::Display;

use http::Request;
use http_body_util::BodyExt;
use hyper::body::Body;
use serde::de::DeserializeOwned;

use crate::error::{LookoutError, Result};

/// Read the whole body and decode it as JSON.
///
/// A body that cannot be read is a server-side failure (500). An empty
/// body or one that does not decode is the client's fault (400); the
/// message carries the raw body.
pub async fn parse_request_body<T, B>(req: Request<B>) -> Result<T>
where
    T: DeserializeOwned,
    B: Body,
    B::Error: Display,
{
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| LookoutError::Http(format!("failed to read request body: {e}")))?
        .to_bytes();

    if bytes.is_empty() {
        return Err(LookoutError::BadRequest("request body is empty".to_string()));
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        LookoutError::BadRequest(format!(
            "failed to unmarshal request body: {}: {e}",
            String::from_utf8_lossy(&bytes)
        ))
    })
}
