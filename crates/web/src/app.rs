//! Request dispatch: route, bind, handle and map errors.

use std::fmt;

use bytes::Bytes;
use http::{Request, Response};
use thiserror::Error;
use tracing::debug;

use crate::RequestContext;
use crate::binder::Binder;
use crate::error::{DefaultErrorHandler, ErrorHandler, WebError};
use crate::router::Router;

/// A router, the binder its handlers use and the error handler that answers their failures.
pub struct WebApp {
    router: Router,
    binder: Binder,
    error_handler: Box<dyn ErrorHandler>,
}

#[derive(Error, Debug)]
pub enum WebAppBuildError {
    #[error("a router is required to build the web app")]
    MissingRouter,
}

impl WebApp {
    pub fn builder() -> WebAppBuilder {
        WebAppBuilder::new()
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Serves one request.
    ///
    /// Unknown paths get 404, known paths without a handler for the request get 405. Handler
    /// errors go through the error handler.
    pub fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        let route_result = self.router.at(request.uri().path());
        let ctx = RequestContext::new(&request, route_result.params(), &self.binder);

        if route_result.is_empty() {
            return self.error_handler.handle(&ctx, WebError::not_found());
        }

        let Some(item) = route_result.router_items().iter().find(|item| item.filter().matches(&ctx)) else {
            debug!(method = %ctx.method(), path = ctx.uri().path(), "no handler accepts the request");
            return self.error_handler.handle(&ctx, WebError::method_not_allowed());
        };

        match item.handler().invoke(&ctx) {
            Ok(response) => response,
            Err(error) => {
                debug!(%error, method = %ctx.method(), path = ctx.uri().path(), "handler failed");
                self.error_handler.handle(&ctx, error)
            }
        }
    }
}

impl fmt::Debug for WebApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebApp").field("router", &self.router).field("binder", &self.binder).finish_non_exhaustive()
    }
}

pub struct WebAppBuilder {
    router: Option<Router>,
    binder: Option<Binder>,
    error_handler: Box<dyn ErrorHandler>,
}

impl WebAppBuilder {
    fn new() -> Self {
        Self { router: None, binder: None, error_handler: Box::new(DefaultErrorHandler) }
    }

    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Replaces the binder built by [`Binder::new`].
    #[must_use]
    pub fn binder(mut self, binder: Binder) -> Self {
        self.binder = Some(binder);
        self
    }

    /// Replaces [`DefaultErrorHandler`].
    #[must_use]
    pub fn error_handler<H: ErrorHandler + 'static>(mut self, error_handler: H) -> Self {
        self.error_handler = Box::new(error_handler);
        self
    }

    pub fn build(self) -> Result<WebApp, WebAppBuildError> {
        let router = self.router.ok_or(WebAppBuildError::MissingRouter)?;
        Ok(WebApp { router, binder: self.binder.unwrap_or_default(), error_handler: self.error_handler })
    }
}

impl fmt::Debug for WebAppBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebAppBuilder")
            .field("router", &self.router.is_some())
            .field("binder", &self.binder)
            .finish_non_exhaustive()
    }
}
