use std::fmt;

use reqwest::Response;

pub mod client;
pub mod offers;
pub mod options;
pub mod os;
pub mod partitioning;
pub mod private_networks;
pub mod servers;

/// Error classes the service reports in the `type` field.
pub mod code {
    pub const NOT_FOUND: &str = "not_found";
    pub const PERMISSIONS_DENIED: &str = "permissions_denied";
    pub const RESOURCE_LOCKED: &str = "resource_locked";
    pub const INVALID_ARGUMENTS: &str = "invalid_arguments";
}

/// An error response returned by the bare-metal service.
#[derive(Debug, serde::Deserialize)]
pub struct ErrorResponse {
    /// HTTP status, filled in from the response, not the body.
    #[serde(skip_deserializing)]
    pub status: u16,

    /// The service error class, such as `not_found`.
    #[serde(default, rename = "type")]
    pub class: String,

    /// Human-readable description of the error.
    #[serde(default)]
    pub message: String,

    /// The resource the error refers to, when the service names one.
    #[serde(default)]
    pub resource: Option<String>,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resource {
            Some(resource) => write!(
                f,
                "{} ({}, {resource}, http {})",
                self.message, self.class, self.status
            ),
            None => write!(f, "{} ({}, http {})", self.message, self.class, self.status),
        }
    }
}

impl std::error::Error for ErrorResponse {}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An error returned from the bare-metal service.
    #[error(transparent)]
    Response(#[from] ErrorResponse),

    /// An error from the underlying HTTP client.
    #[error(transparent)]
    HttpClient(#[from] reqwest::Error),

    /// An error from one of the middleware used.
    #[error(transparent)]
    HttpMiddleware(anyhow::Error),

    #[error("operation cancelled by caller")]
    Cancelled,
}

impl Error {
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Response(r) => Some(r.status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Response(r) => r.status == 404 || r.class == code::NOT_FOUND,
            _ => false,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        match self {
            Error::Response(r) => r.status == 403 || r.class == code::PERMISSIONS_DENIED,
            _ => false,
        }
    }
}

impl scw_gax::retry::Retryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Response(r) => {
                r.status == 503 || r.status == 429 || r.class == code::RESOURCE_LOCKED
            }
            _ => false,
        }
    }
}

impl From<scw_gax::Cancelled> for Error {
    fn from(_: scw_gax::Cancelled) -> Self {
        Error::Cancelled
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(error: reqwest_middleware::Error) -> Self {
        match error {
            reqwest_middleware::Error::Middleware(err) => Error::HttpMiddleware(err),
            reqwest_middleware::Error::Reqwest(err) => Error::HttpClient(err),
        }
    }
}

pub(crate) async fn map_error(response: Response) -> Error {
    let status = response.status().as_u16();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => format!("{e}"),
    };
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(mut inner) => {
            inner.status = status;
            Error::Response(inner)
        }
        Err(_) => Error::Response(ErrorResponse {
            status,
            class: String::new(),
            message: text,
            resource: None,
        }),
    }
}

#[cfg(test)]
mod test {
    use scw_gax::retry::Retryable;

    use super::*;

    fn response(status: u16, class: &str) -> Error {
        Error::Response(ErrorResponse {
            status,
            class: class.to_string(),
            message: "test".to_string(),
            resource: None,
        })
    }

    #[test]
    fn not_found_by_status_and_class() {
        assert!(response(404, "").is_not_found());
        assert!(response(400, code::NOT_FOUND).is_not_found());
        assert!(!response(403, code::PERMISSIONS_DENIED).is_not_found());
    }

    #[test]
    fn retryable_matrix() {
        assert!(response(503, "").is_retryable());
        assert!(response(429, "too_many_requests").is_retryable());
        assert!(response(409, code::RESOURCE_LOCKED).is_retryable());
        assert!(!response(400, code::INVALID_ARGUMENTS).is_retryable());
    }
}
