use std::borrow::Cow;

use http::StatusCode;
use serde::Serialize;

/// ErrorMetadata object can be attached to an anyhow error chain via
/// `.context(e /*ErrorMetadata*/)`. It is a generic object to be used
/// across the codebase to tag errors with information that is used to classify.
///
/// The msg is conveyed as a user facing error message if it makes it to the
/// client.
///
/// The short_msg is used as a tag - available for tests and for metrics
/// logging - to have a message that is resilient to changes in copy. The API
/// layer sends it as the `code` extension of a GraphQL error.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
#[error("{msg}")]
pub struct ErrorMetadata {
    /// The error code associated with this ErrorMetadata
    pub code: ErrorCode,
    /// short ScreamingCamelCase. Usable in tests for string matching
    /// w/ a standard test helper.
    /// Eg InvalidCursor
    pub short_msg: Cow<'static, str>,
    /// human readable - developer facing. Should be longer and descriptive.
    /// Eg "The cursor could not be decoded into an identity and a sort key"
    pub msg: Cow<'static, str>,
}

#[cfg_attr(any(test, feature = "testing"), derive(proptest_derive::Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest,
    Forbidden,
    NotFound,
    ClientDisconnect,

    StoreUnavailable,

    OperationalInternalServerError,
}

impl ErrorMetadata {
    /// Bad Request. Maps to 400 in HTTP.
    ///
    /// The short_msg should be a CapitalCamelCased describing the error.
    /// The msg should be a descriptive message targeted toward the developer.
    pub fn bad_request(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::BadRequest,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// Resource not found. Maps to 404 in HTTP.
    pub fn not_found(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::NotFound,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// Forbidden. Maps to 403 in HTTP.
    ///
    /// Listing operations never return this for unreadable scopes; they
    /// answer with an empty page instead so that existence does not leak.
    pub fn forbidden(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::Forbidden,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// Client disconnected, or the request was canceled before it finished.
    pub fn client_disconnect() -> Self {
        Self {
            code: ErrorCode::ClientDisconnect,
            short_msg: CLIENT_DISCONNECTED.into(),
            msg: CLIENT_DISCONNECTED_MSG.into(),
        }
    }

    /// The document store did not answer in time. Maps to 503 in HTTP.
    ///
    /// Errors returned by the store itself are propagated untouched; this is
    /// only for failures we detect around the store call (eg a deadline).
    pub fn store_unavailable(
        short_msg: impl Into<Cow<'static, str>>,
        msg: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            code: ErrorCode::StoreUnavailable,
            short_msg: short_msg.into(),
            msg: msg.into(),
        }
    }

    /// Operational Internal Server Error (maps to 500 in HTTP)
    ///
    /// Produces a very general error message for the user.
    pub fn operational_internal_server_error() -> Self {
        Self {
            code: ErrorCode::OperationalInternalServerError,
            short_msg: INTERNAL_SERVER_ERROR.into(),
            msg: INTERNAL_SERVER_ERROR_MSG.into(),
        }
    }

    pub fn is_bad_request(&self) -> bool {
        self.code == ErrorCode::BadRequest
    }

    pub fn is_forbidden(&self) -> bool {
        self.code == ErrorCode::Forbidden
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    pub fn is_client_disconnect(&self) -> bool {
        self.code == ErrorCode::ClientDisconnect
    }

    pub fn is_store_unavailable(&self) -> bool {
        self.code == ErrorCode::StoreUnavailable
    }

    /// Return true if this error is deterministically caused by the caller.
    /// Such errors are not worth retrying.
    pub fn is_deterministic_user_error(&self) -> bool {
        match self.code {
            ErrorCode::BadRequest | ErrorCode::NotFound | ErrorCode::Forbidden => true,
            ErrorCode::ClientDisconnect
            | ErrorCode::StoreUnavailable
            | ErrorCode::OperationalInternalServerError => false,
        }
    }

    /// The level this error should be logged at when it reaches the edge of
    /// the system. `None` means it is not worth logging at all.
    pub fn log_level(&self) -> Option<tracing::Level> {
        match self.code {
            ErrorCode::ClientDisconnect => None,
            ErrorCode::BadRequest | ErrorCode::NotFound | ErrorCode::Forbidden => {
                Some(tracing::Level::INFO)
            },
            ErrorCode::StoreUnavailable | ErrorCode::OperationalInternalServerError => {
                Some(tracing::Level::WARN)
            },
        }
    }

    fn metric_server_error_tag_value(&self) -> Option<&'static str> {
        match self.code {
            ErrorCode::BadRequest
            | ErrorCode::NotFound
            | ErrorCode::Forbidden
            | ErrorCode::ClientDisconnect => None,
            ErrorCode::StoreUnavailable => Some("store_unavailable"),
            ErrorCode::OperationalInternalServerError => Some("operational"),
        }
    }

    /// Body sent back to API clients in the `extensions` of a GraphQL error.
    pub fn response_body(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.short_msg.to_string(),
            message: self.msg.to_string(),
        }
    }
}

impl ErrorCode {
    pub fn http_status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::OperationalInternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ClientDisconnect => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

pub trait ErrorMetadataAnyhowExt {
    fn is_bad_request(&self) -> bool;
    fn is_forbidden(&self) -> bool;
    fn is_not_found(&self) -> bool;
    fn is_client_disconnect(&self) -> bool;
    fn is_store_unavailable(&self) -> bool;
    fn is_deterministic_user_error(&self) -> bool;
    fn user_facing_message(&self) -> String;
    fn short_msg(&self) -> &str;
    fn msg(&self) -> &str;
    fn metric_status_tag_value(&self) -> &'static str;
    fn http_status(&self) -> StatusCode;
    fn response_body(&self) -> ErrorResponse;
    fn wrap_error_message<F>(self, f: F) -> Self
    where
        F: FnOnce(String) -> String;
}

impl ErrorMetadataAnyhowExt for anyhow::Error {
    /// Returns true if error is tagged as BadRequest
    fn is_bad_request(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_bad_request();
        }
        false
    }

    /// Returns true if error is tagged as Forbidden
    fn is_forbidden(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_forbidden();
        }
        false
    }

    /// Returns true if error is tagged as NotFound
    fn is_not_found(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_not_found();
        }
        false
    }

    /// Returns true if error is tagged as ClientDisconnect
    fn is_client_disconnect(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_client_disconnect();
        }
        false
    }

    /// Returns true if error is tagged as StoreUnavailable
    fn is_store_unavailable(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_store_unavailable();
        }
        false
    }

    fn is_deterministic_user_error(&self) -> bool {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.is_deterministic_user_error();
        }
        false
    }

    fn user_facing_message(&self) -> String {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.to_string();
        }
        INTERNAL_SERVER_ERROR_MSG.to_string()
    }

    /// Return the short_msg associated with this Error
    fn short_msg(&self) -> &str {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return &e.short_msg;
        }
        INTERNAL_SERVER_ERROR
    }

    /// Return the descriptive msg associated with this Error
    fn msg(&self) -> &str {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return &e.msg;
        }
        INTERNAL_SERVER_ERROR_MSG
    }

    /// Return the value to use for the `status` label on a request metric
    fn metric_status_tag_value(&self) -> &'static str {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.metric_server_error_tag_value().unwrap_or(STATUS_DEVELOPER_ERROR);
        }
        STATUS_ERROR
    }

    /// Return the HttpStatus code to use on response
    fn http_status(&self) -> StatusCode {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.code.http_status_code();
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn response_body(&self) -> ErrorResponse {
        if let Some(e) = self.downcast_ref::<ErrorMetadata>() {
            return e.response_body();
        }
        ErrorMetadata::operational_internal_server_error().response_body()
    }

    /// Wrap the underlying error message, maintaining the underlying error
    /// metadata short code if it exists.
    fn wrap_error_message<F>(self, f: F) -> Self
    where
        F: FnOnce(String) -> String,
    {
        if let Some(mut em) = self.downcast_ref::<ErrorMetadata>().cloned() {
            // Underlying ErrorMetadata. Reuse and reattach it.
            em.msg = f(em.msg.to_string()).into();
            return self.context(em);
        }

        // No underlying code. Just use .context()
        let new_msg = f(self.to_string());
        self.context(new_msg)
    }
}

pub const INTERNAL_SERVER_ERROR_MSG: &str = "Your request couldn't be completed. Try again later.";
pub const INTERNAL_SERVER_ERROR: &str = "InternalServerError";
const CLIENT_DISCONNECTED_MSG: &str = "Your request couldn't be completed. Try again later.";
const CLIENT_DISCONNECTED: &str = "ClientDisconnected";
const STATUS_ERROR: &str = "error";
const STATUS_DEVELOPER_ERROR: &str = "developer_error";

#[cfg(any(test, feature = "testing"))]
mod proptest_impls {
    use proptest::prelude::*;

    use super::{
        ErrorCode,
        ErrorMetadata,
    };

    impl Arbitrary for ErrorMetadata {
        type Parameters = ();

        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with((): Self::Parameters) -> Self::Strategy {
            any::<ErrorCode>()
                .prop_map(|ec| match ec {
                    ErrorCode::BadRequest => ErrorMetadata::bad_request("bad", "request"),
                    ErrorCode::NotFound => ErrorMetadata::not_found("not", "found"),
                    ErrorCode::Forbidden => ErrorMetadata::forbidden("for", "bidden"),
                    ErrorCode::StoreUnavailable => {
                        ErrorMetadata::store_unavailable("store", "unavailable")
                    },
                    ErrorCode::OperationalInternalServerError => {
                        ErrorMetadata::operational_internal_server_error()
                    },
                    ErrorCode::ClientDisconnect => ErrorMetadata::client_disconnect(),
                })
                .boxed()
        }
    }
}
