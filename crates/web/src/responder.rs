//! Response handling module that converts handler results into HTTP responses.
//!
//! The [`Responder`] trait defines how handler return values become responses. It is
//! implemented for common types like `Option`, `String`, tuples with a status code, and
//! [`Json`].

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::RequestContext;

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn response_to(self, req: &RequestContext<'_, '_>) -> Response<Bytes>;
}

impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn response_to(self, req: &RequestContext<'_, '_>) -> Response<Bytes> {
        match self {
            Ok(t) => t.response_to(req),
            Err(e) => e.response_to(req),
        }
    }
}

/// `None` returns an empty response.
impl<T: Responder> Responder for Option<T> {
    fn response_to(self, req: &RequestContext<'_, '_>) -> Response<Bytes> {
        match self {
            Some(t) => t.response_to(req),
            None => Response::new(Bytes::new()),
        }
    }
}

impl<B> Responder for Response<B>
where
    B: Into<Bytes>,
{
    fn response_to(self, _req: &RequestContext<'_, '_>) -> Response<Bytes> {
        self.map(Into::into)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self, req: &RequestContext<'_, '_>) -> Response<Bytes> {
        let (status, responder) = self;
        let mut response = responder.response_to(req);
        *response.status_mut() = status;
        response
    }
}

impl<T: Responder> Responder for (T, StatusCode) {
    fn response_to(self, req: &RequestContext<'_, '_>) -> Response<Bytes> {
        let (responder, status) = self;
        (status, responder).response_to(req)
    }
}

impl<T: Responder> Responder for Box<T> {
    fn response_to(self, req: &RequestContext<'_, '_>) -> Response<Bytes> {
        (*self).response_to(req)
    }
}

impl Responder for () {
    fn response_to(self, _req: &RequestContext<'_, '_>) -> Response<Bytes> {
        Response::new(Bytes::new())
    }
}

impl Responder for &'static str {
    fn response_to(self, _req: &RequestContext<'_, '_>) -> Response<Bytes> {
        text_response(Bytes::from_static(self.as_bytes()))
    }
}

impl Responder for String {
    fn response_to(self, _req: &RequestContext<'_, '_>) -> Response<Bytes> {
        text_response(Bytes::from(self))
    }
}

/// Serializes the wrapped value as an `application/json` body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: Serialize> Responder for Json<T> {
    fn response_to(self, _req: &RequestContext<'_, '_>) -> Response<Bytes> {
        match serde_json::to_vec(&self.0) {
            Ok(body) => with_content_type(StatusCode::OK, Bytes::from(body), mime::APPLICATION_JSON.as_ref()),
            Err(error) => {
                error!(%error, "failed to serialize json response");
                let mut response = Response::new(Bytes::new());
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        }
    }
}

fn text_response(body: Bytes) -> Response<Bytes> {
    with_content_type(StatusCode::OK, body, mime::TEXT_PLAIN_UTF_8.as_ref())
}

pub(crate) fn json_response(status: StatusCode, payload: &serde_json::Value) -> Response<Bytes> {
    with_content_type(status, Bytes::from(payload.to_string()), mime::APPLICATION_JSON.as_ref())
}

fn with_content_type(status: StatusCode, body: Bytes, content_type: &'static str) -> Response<Bytes> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;
    use crate::{Binder, PathParams};

    fn respond<R: Responder>(responder: R) -> Response<Bytes> {
        let request = http::Request::get("/").body(Bytes::new()).unwrap();
        let params = PathParams::empty();
        let binder = Binder::new();
        let ctx = RequestContext::new(&request, &params, &binder);
        responder.response_to(&ctx)
    }

    #[test]
    fn text_responders() {
        let response = respond("hello");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(response.body(), "hello");

        assert_eq!(respond(String::from("world")).body(), "world");
        assert!(respond(()).body().is_empty());
        assert!(respond(None::<String>).body().is_empty());
    }

    #[test]
    fn status_tuples() {
        assert_eq!(respond((StatusCode::CREATED, "made")).status(), StatusCode::CREATED);
        assert_eq!(respond(("gone", StatusCode::GONE)).status(), StatusCode::GONE);

        let failed: Result<&'static str, (StatusCode, &'static str)> = Err((StatusCode::CONFLICT, "taken"));
        let response = respond(failed);
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.body(), "taken");
    }

    #[derive(Serialize)]
    struct User {
        id: u32,
        name: &'static str,
    }

    #[test]
    fn json_responder() {
        let response = respond(Json(User { id: 7, name: "zava" }));
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(response.body(), r#"{"id":7,"name":"zava"}"#);
    }
}
