use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Response;

pub mod buckets;
pub mod client;
pub mod objects;

/// Error codes the engine distinguishes by name.
pub mod code {
    pub const NO_SUCH_BUCKET: &str = "NoSuchBucket";
    pub const NO_SUCH_CORS_CONFIGURATION: &str = "NoSuchCORSConfiguration";
    pub const NO_SUCH_LIFECYCLE_CONFIGURATION: &str = "NoSuchLifecycleConfiguration";
    pub const NO_SUCH_BUCKET_POLICY: &str = "NoSuchBucketPolicy";
    pub const NO_SUCH_WEBSITE_CONFIGURATION: &str = "NoSuchWebsiteConfiguration";
    pub const OBJECT_LOCK_CONFIGURATION_NOT_FOUND: &str = "ObjectLockConfigurationNotFoundError";
    pub const NO_SUCH_TAG_SET: &str = "NoSuchTagSet";
    pub const NO_SUCH_KEY: &str = "NoSuchKey";
    pub const BUCKET_NOT_EMPTY: &str = "BucketNotEmpty";
    pub const ACCESS_DENIED: &str = "AccessDenied";
    pub const OPERATION_IN_PROGRESS: &str = "OperationInProgress";
}

/// An error response returned by the object storage service.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// HTTP status, filled in from the response, not the body.
    #[serde(skip_deserializing)]
    pub status: u16,

    /// The service error code, such as `NoSuchBucket` or `AccessDenied`.
    #[serde(default)]
    pub code: String,

    /// Human-readable description of the error.
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, http {})", self.message, self.code, self.status)
    }
}

impl std::error::Error for ErrorResponse {}

/// The wire format nests the error body one level down.
#[derive(serde::Deserialize)]
pub(crate) struct ErrorWrapper {
    pub(crate) error: ErrorResponse,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// An error returned from the object storage service.
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
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Response(r) => Some(r.code.as_str()),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Response(r) => Some(r.status),
            _ => None,
        }
    }

    /// 404 or any of the `NoSuch*` family.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Response(r) => {
                r.status == 404
                    || matches!(
                        r.code.as_str(),
                        code::NO_SUCH_BUCKET
                            | code::NO_SUCH_KEY
                            | code::NO_SUCH_CORS_CONFIGURATION
                            | code::NO_SUCH_LIFECYCLE_CONFIGURATION
                            | code::NO_SUCH_BUCKET_POLICY
                            | code::NO_SUCH_WEBSITE_CONFIGURATION
                            | code::OBJECT_LOCK_CONFIGURATION_NOT_FOUND
                            | code::NO_SUCH_TAG_SET
                    )
            }
            _ => false,
        }
    }

    pub fn is_forbidden(&self) -> bool {
        match self {
            Error::Response(r) => r.status == 403 || r.code == code::ACCESS_DENIED,
            _ => false,
        }
    }

    pub fn is_bucket_not_empty(&self) -> bool {
        self.code() == Some(code::BUCKET_NOT_EMPTY)
    }
}

impl scw_gax::retry::Retryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Response(r) => {
                r.status == 503 || (r.status == 409 && r.code == code::OPERATION_IN_PROGRESS)
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
    match serde_json::from_str::<ErrorWrapper>(&text) {
        Ok(wrapper) => {
            let mut inner = wrapper.error;
            inner.status = status;
            Error::Response(inner)
        }
        Err(_) => Error::Response(ErrorResponse {
            status,
            code: String::new(),
            message: text,
        }),
    }
}

pub(crate) trait Escape {
    fn escape(&self) -> String;
}

impl Escape for String {
    fn escape(&self) -> String {
        utf8_percent_encode(self, ENCODE_SET).to_string()
    }
}

impl Escape for str {
    fn escape(&self) -> String {
        utf8_percent_encode(self, ENCODE_SET).to_string()
    }
}

// object keys keep their path separators in URLs
const ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'/');

#[cfg(test)]
mod test {
    use scw_gax::retry::Retryable;

    use super::*;

    fn response(status: u16, code: &str) -> Error {
        Error::Response(ErrorResponse {
            status,
            code: code.to_string(),
            message: "test".to_string(),
        })
    }

    #[test]
    fn not_found_by_status_and_code() {
        assert!(response(404, "").is_not_found());
        assert!(response(400, code::NO_SUCH_TAG_SET).is_not_found());
        assert!(!response(403, code::ACCESS_DENIED).is_not_found());
    }

    #[test]
    fn retryable_matrix() {
        assert!(response(503, "SlowDown").is_retryable());
        assert!(response(409, code::OPERATION_IN_PROGRESS).is_retryable());
        assert!(!response(409, code::BUCKET_NOT_EMPTY).is_retryable());
        assert!(!response(500, "").is_retryable());
    }

    #[test]
    fn key_escaping_keeps_slashes() {
        assert_eq!("path/to a/file.txt".escape(), "path/to%20a/file.txt");
    }
}
