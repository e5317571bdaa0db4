//! Handler errors and how they become responses.

use bytes::Bytes;
use http::{Method, Response, StatusCode};
use micro_bind::BindError;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;

use crate::RequestContext;
use crate::responder::json_response;
use crate::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("bind error: {source}")]
    Bind {
        #[from]
        source: BindError,
    },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("unsupported content type: '{content_type}'")]
    UnsupportedContentType { content_type: String },

    #[error(transparent)]
    Validation {
        #[from]
        source: ValidationErrors,
    },

    #[error("{message}")]
    Http { status: StatusCode, message: String },
}

impl WebError {
    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    pub fn unsupported_content_type<S: ToString>(content_type: S) -> Self {
        Self::UnsupportedContentType { content_type: content_type.to_string() }
    }

    pub fn http<S: ToString>(status: StatusCode, message: S) -> Self {
        Self::Http { status, message: message.to_string() }
    }

    pub fn not_found() -> Self {
        Self::http(StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn method_not_allowed() -> Self {
        Self::http(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    /// Bad input from the client: a value that did not parse, or a body that did not decode.
    pub fn is_bind_error(&self) -> bool {
        match self {
            Self::Bind { source } => source.is_field_error(),
            Self::InvalidBody { .. } => true,
            _ => false,
        }
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            _ if self.is_bind_error() => StatusCode::BAD_REQUEST,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::UnsupportedContentType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Http { status, .. } => *status,
            Self::Bind { .. } | Self::InvalidBody { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Turns the errors of handlers and binding into responses.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, req: &RequestContext<'_, '_>, error: WebError) -> Response<Bytes>;
}

impl<F> ErrorHandler for F
where
    F: Fn(&RequestContext<'_, '_>, WebError) -> Response<Bytes> + Send + Sync,
{
    fn handle(&self, req: &RequestContext<'_, '_>, error: WebError) -> Response<Bytes> {
        (self)(req, error)
    }
}

/// Responds with a JSON `{"message": ...}` payload and the status of [`WebError::status`].
///
/// Bind and validation errors also carry `"error"` details and a `"type"`. Server side errors are
/// logged and answered with a generic message. HEAD requests get an empty body.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, req: &RequestContext<'_, '_>, error: WebError) -> Response<Bytes> {
        let status = error.status();

        let payload = match &error {
            WebError::Bind { source } if error.is_bind_error() => json!({
                "message": error.to_string(),
                "error": field_errors(source),
                "type": "bind"
            }),
            WebError::InvalidBody { reason } => json!({
                "message": error.to_string(),
                "error": [{ "message": reason }],
                "type": "bind"
            }),
            WebError::Validation { source } => json!({
                "message": error.to_string(),
                "error": source,
                "type": "validation"
            }),
            WebError::Bind { .. } => {
                error!(cause = %error, method = %req.method(), path = req.uri().path(), "request binding is broken");
                json!({ "message": "Internal Server Error" })
            }
            _ => json!({ "message": error.to_string() }),
        };

        if req.method() == Method::HEAD {
            let mut response = Response::new(Bytes::new());
            *response.status_mut() = status;
            return response;
        }
        json_response(status, &payload)
    }
}

fn field_errors(error: &BindError) -> Value {
    error
        .field_errors()
        .iter()
        .map(|field| json!({ "field": field.field(), "value": field.value(), "message": field.message() }))
        .collect()
}
