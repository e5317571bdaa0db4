pub mod filter;

use std::collections::HashMap;
use std::fmt;

use filter::{AllFilter, Filter};
use thiserror::Error;
use tracing::debug;

use crate::PathParams;
use crate::decorator::{Decorator, DecoratorComposer, DecoratorExt, IdentityDecorator};
use crate::handler::RequestHandler;

type RouterFilter = dyn Filter + 'static;
type InnerRouter<T> = matchit::Router<T>;

/// Main router structure that handles HTTP request routing
pub struct Router {
    inner_router: InnerRouter<Vec<RouterItem>>,
}

/// A router item containing a filter and handler
pub struct RouterItem {
    filter: Box<RouterFilter>,
    handler: Box<dyn RequestHandler>,
}

/// Result of matching a route, containing matched items and path parameters
pub struct RouteResult<'router, 'req> {
    router_items: &'router [RouterItem],
    params: PathParams<'router, 'req>,
}

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("invalid route '{path}': {source}")]
    InvalidRoute { path: String, source: matchit::InsertError },
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Matches a path against the router's routes.
    ///
    /// An unknown path gives an empty result.
    pub fn at<'router, 'req>(&'router self, path: &'req str) -> RouteResult<'router, 'req> {
        match self.inner_router.at(path) {
            Ok(matched) => RouteResult { router_items: matched.value.as_slice(), params: matched.params.into() },
            Err(error) => {
                debug!(path, %error, "no route matched");
                RouteResult::empty()
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

impl RouterItem {
    pub fn filter(&self) -> &RouterFilter {
        self.filter.as_ref()
    }

    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for RouterItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterItem").finish_non_exhaustive()
    }
}

impl<'router, 'req> RouteResult<'router, 'req> {
    fn empty() -> Self {
        Self { router_items: &[], params: PathParams::empty() }
    }

    /// Returns true if no routes were matched
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.router_items.is_empty()
    }

    pub fn params(&self) -> &PathParams<'router, 'req> {
        &self.params
    }

    pub fn router_items(&self) -> &'router [RouterItem] {
        self.router_items
    }
}

impl fmt::Debug for RouteResult<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteResult")
            .field("router_items", &self.router_items.len())
            .field("params", &self.params)
            .finish()
    }
}

/// Collects routes, items of the same path are tried in registration order.
///
/// `D` wraps every handler when the router is built.
pub struct RouterBuilder<D = IdentityDecorator> {
    data: HashMap<String, Vec<RouterItemBuilder>>,
    decorator: D,
}

impl RouterBuilder {
    fn new() -> Self {
        Self { data: HashMap::new(), decorator: IdentityDecorator }
    }
}

impl<D> RouterBuilder<D> {
    #[must_use]
    pub fn route(mut self, route: impl Into<String>, item_builder: RouterItemBuilder) -> Self {
        self.data.entry(route.into()).or_default().push(item_builder);
        self
    }

    /// Wraps every handler with `decorator`, outside the decorators added before it.
    #[must_use]
    pub fn with_global_decorator<D2>(self, decorator: D2) -> RouterBuilder<DecoratorComposer<D, D2>>
    where
        D: Decorator<Box<dyn RequestHandler>>,
        D2: Decorator<D::Out>,
    {
        RouterBuilder { data: self.data, decorator: self.decorator.and_then(decorator) }
    }

    /// Builds the router, failing on the first route pattern the trie rejects.
    pub fn build(self) -> Result<Router, RouterError>
    where
        D: Decorator<Box<dyn RequestHandler>>,
        D::Out: RequestHandler + 'static,
    {
        let mut inner_router = InnerRouter::new();

        for (path, items) in self.data {
            let router_items = items
                .into_iter()
                .map(RouterItemBuilder::build)
                .map(|item| {
                    let handler = self.decorator.decorate(item.handler);
                    RouterItem { handler: Box::new(handler), ..item }
                })
                .collect::<Vec<_>>();
            inner_router
                .insert(path.as_str(), router_items)
                .map_err(|source| RouterError::InvalidRoute { path: path.clone(), source })?;
        }

        Ok(Router { inner_router })
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> fmt::Debug for RouterBuilder<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder").field("routes", &self.data.len()).finish_non_exhaustive()
    }
}

macro_rules! method_router_filter {
    ($method:ident, $method_name:ident) => {
        #[doc = concat!("Routes `", stringify!($method), "` requests to `handler`.")]
        pub fn $method<H: RequestHandler + 'static>(handler: H) -> RouterItemBuilder {
            let mut filters = filter::all_filter();
            filters.and(filter::$method_name());
            RouterItemBuilder { filters, handler: Box::new(handler) }
        }
    };
}

method_router_filter!(get, get_method);
method_router_filter!(post, post_method);
method_router_filter!(put, put_method);
method_router_filter!(delete, delete_method);
method_router_filter!(head, head_method);
method_router_filter!(options, options_method);
method_router_filter!(connect, connect_method);
method_router_filter!(patch, patch_method);
method_router_filter!(trace, trace_method);

pub struct RouterItemBuilder {
    filters: AllFilter,
    handler: Box<dyn RequestHandler>,
}

impl RouterItemBuilder {
    /// Adds a filter the request must also pass.
    #[must_use]
    pub fn with<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.filters.and(filter);
        self
    }

    fn build(self) -> RouterItem {
        RouterItem { filter: Box::new(self.filters), handler: self.handler }
    }
}

impl fmt::Debug for RouterItemBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterItemBuilder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::header::CONTENT_TYPE;
    use http::{HeaderValue, Method, Request, Response};

    use super::filter::header;
    use super::{Router, RouterError, get, post};
    use crate::decorator::Decorator;
    use crate::{Binder, PathParams, RequestContext, RequestHandler, WebError, handler_fn};

    fn hello(_req: &RequestContext<'_, '_>) -> Result<&'static str, WebError> {
        Ok("hello world")
    }

    fn router() -> Router {
        Router::builder()
            .route("/", get(handler_fn(hello)))
            .route(
                "/",
                post(handler_fn(hello))
                    .with(header(CONTENT_TYPE, HeaderValue::from_static("application/x-www-form-urlencoded"))),
            )
            .route("/", post(handler_fn(hello)))
            .route("/users/{id}", get(handler_fn(hello)))
            .build()
            .unwrap()
    }

    fn matches(router: &Router, request: &Request<Bytes>) -> Vec<bool> {
        let route_result = router.at(request.uri().path());
        let binder = Binder::new();
        let ctx = RequestContext::new(request, route_result.params(), &binder);
        route_result.router_items().iter().map(|item| item.filter().matches(&ctx)).collect()
    }

    #[test]
    fn test_route_get() {
        let router = router();
        let request = Request::builder().method(Method::GET).uri("/").body(Bytes::new()).unwrap();
        assert_eq!(matches(&router, &request), vec![true, false, false]);
    }

    #[test]
    fn test_route_post() {
        let router = router();
        let request = Request::builder().method(Method::POST).uri("/").body(Bytes::new()).unwrap();
        assert_eq!(matches(&router, &request), vec![false, false, true]);
    }

    #[test]
    fn test_route_post_with_content_type() {
        let router = router();
        let request = Request::post("/")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Bytes::new())
            .unwrap();
        assert_eq!(matches(&router, &request), vec![false, true, true]);
    }

    #[test]
    fn path_params() {
        let router = router();
        let route_result = router.at("/users/42");
        assert_eq!(route_result.router_items().len(), 1);
        assert_eq!(route_result.params().get("id"), Some("42"));

        assert!(router.at("/missing").is_empty());
    }

    #[test]
    fn conflicting_routes() {
        let error = Router::builder()
            .route("/items/{id}", get(handler_fn(hello)))
            .route("/items/{name}", get(handler_fn(hello)))
            .build()
            .unwrap_err();
        assert!(matches!(error, RouterError::InvalidRoute { .. }));
    }

    struct ServedBy(&'static str);

    struct ServedByHandler<H> {
        name: &'static str,
        handler: H,
    }

    impl<H: RequestHandler> Decorator<H> for ServedBy {
        type Out = ServedByHandler<H>;

        fn decorate(&self, handler: H) -> Self::Out {
            ServedByHandler { name: self.0, handler }
        }
    }

    impl<H: RequestHandler> RequestHandler for ServedByHandler<H> {
        fn invoke(&self, req: &RequestContext<'_, '_>) -> Result<Response<Bytes>, WebError> {
            let mut response = self.handler.invoke(req)?;
            response.headers_mut().append("x-served-by", HeaderValue::from_static(self.name));
            Ok(response)
        }
    }

    #[test]
    fn global_decorators_wrap_every_handler() {
        let router = Router::builder()
            .route("/", get(handler_fn(hello)))
            .route("/users/{id}", get(handler_fn(hello)))
            .with_global_decorator(ServedBy("inner"))
            .with_global_decorator(ServedBy("outer"))
            .build()
            .unwrap();

        let request = Request::get("/users/7").body(Bytes::new()).unwrap();
        let binder = Binder::new();
        for path in ["/", "/users/7"] {
            let route_result = router.at(path);
            let ctx = RequestContext::new(&request, route_result.params(), &binder);
            let response = route_result.router_items()[0].handler().invoke(&ctx).unwrap();

            assert_eq!(response.body(), "hello world");
            let served_by: Vec<_> = response.headers().get_all("x-served-by").iter().collect();
            assert_eq!(served_by, vec!["inner", "outer"]);
        }

        let params = PathParams::empty();
        let ctx = RequestContext::new(&request, &params, &binder);
        let plain = Router::builder().route("/", get(handler_fn(hello))).build().unwrap();
        let response = plain.at("/").router_items()[0].handler().invoke(&ctx).unwrap();
        assert!(response.headers().get("x-served-by").is_none());
    }
}
