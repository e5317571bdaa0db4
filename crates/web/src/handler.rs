use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use http::Response;

use crate::RequestContext;
use crate::error::WebError;
use crate::responder::Responder;

/// Serves the requests a route hands to it.
pub trait RequestHandler: Send + Sync {
    fn invoke(&self, req: &RequestContext<'_, '_>) -> Result<Response<Bytes>, WebError>;
}

impl<T: RequestHandler + ?Sized> RequestHandler for Box<T> {
    fn invoke(&self, req: &RequestContext<'_, '_>) -> Result<Response<Bytes>, WebError> {
        (**self).invoke(req)
    }
}

/// A function or closure used as a [`RequestHandler`].
pub struct FnHandler<F, R> {
    f: F,
    _phantom: PhantomData<fn() -> R>,
}

/// Wraps `f`, whose successful result is turned into a response through [`Responder`].
///
/// ```
/// use micro_web::{RequestContext, WebError, handler_fn};
///
/// let hello = handler_fn(|req: &RequestContext<'_, '_>| Ok::<_, WebError>(format!("hello {}", req.uri().path())));
/// ```
pub fn handler_fn<F, R>(f: F) -> FnHandler<F, R>
where
    F: Fn(&RequestContext<'_, '_>) -> Result<R, WebError> + Send + Sync,
    R: Responder,
{
    FnHandler { f, _phantom: PhantomData }
}

impl<F, R> RequestHandler for FnHandler<F, R>
where
    F: Fn(&RequestContext<'_, '_>) -> Result<R, WebError> + Send + Sync,
    R: Responder,
{
    fn invoke(&self, req: &RequestContext<'_, '_>) -> Result<Response<Bytes>, WebError> {
        let responder = (self.f)(req)?;
        Ok(responder.response_to(req))
    }
}

impl<F, R> fmt::Debug for FnHandler<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("responder", &std::any::type_name::<R>()).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use http::{Request, StatusCode};

    use super::*;
    use crate::{Binder, PathParams};

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    fn greet(req: &RequestContext<'_, '_>) -> Result<String, WebError> {
        let name = req.path_params().get("name").ok_or_else(WebError::not_found)?;
        Ok(format!("hello {name}"))
    }

    #[test]
    fn functions_are_handlers() {
        let handler = handler_fn(greet);
        assert_is_handler(&handler);

        let request = Request::get("/hello/zava").body(Bytes::new()).unwrap();
        let params: PathParams = [("name", "zava")].into_iter().collect();
        let binder = Binder::new();
        let ctx = RequestContext::new(&request, &params, &binder);

        let response = handler.invoke(&ctx).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), "hello zava");

        let empty = PathParams::empty();
        let ctx = RequestContext::new(&request, &empty, &binder);
        assert_eq!(handler.invoke(&ctx).unwrap_err().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn closures_are_handlers() {
        let handler = handler_fn(|_req: &RequestContext<'_, '_>| Ok((StatusCode::ACCEPTED, "queued")));
        assert_is_handler(&handler);
    }
}
