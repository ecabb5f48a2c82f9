//! Small helpers shared by HTTP handlers: JSON bodies in and out, uniform
//! error answers, panic recovery and client address extraction.

pub mod headers;
pub mod request;
pub mod response;

pub use headers::{apply_cors, client_ip, content_types, names};
pub use request::parse_request_body;
pub use response::{
    catch_panic, error_for, error_response, full_body, json_response, respond_with_error,
    ErrorResponse, RespBody,
};
