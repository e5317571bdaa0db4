//! Request filters that decide which handler of a matched path serves a request.
//!
//! Filters check the method or a header, run a closure, or combine other filters with AND/OR
//! logic.
//!
//! # Examples
//!
//! ```
//! use http::{HeaderName, HeaderValue};
//! use micro_web::router::filter::{all_filter, get_method, header};
//!
//! let mut combined = all_filter();
//! combined
//!     .and(get_method())
//!     .and(header(HeaderName::from_static("x-api-version"), HeaderValue::from_static("2")));
//! ```

use std::fmt;

use http::{HeaderName, HeaderValue, Method};

use crate::RequestContext;

/// Decides whether a request is served by the handler the filter guards.
pub trait Filter: Send + Sync {
    fn matches(&self, req: &RequestContext<'_, '_>) -> bool;
}

struct FnFilter<F>(F);

impl<F> Filter for FnFilter<F>
where
    F: Fn(&RequestContext<'_, '_>) -> bool + Send + Sync,
{
    fn matches(&self, req: &RequestContext<'_, '_>) -> bool {
        (self.0)(req)
    }
}

/// Creates a filter from a closure.
///
/// ```
/// use micro_web::router::filter::fn_filter;
///
/// let api_only = fn_filter(|req| req.uri().path().starts_with("/api"));
/// ```
pub fn fn_filter<F>(f: F) -> impl Filter
where
    F: Fn(&RequestContext<'_, '_>) -> bool + Send + Sync,
{
    FnFilter(f)
}

/// Creates a new OR-composed filter chain.
pub fn any_filter() -> AnyFilter {
    AnyFilter { filters: Vec::new() }
}

/// Matches when any inner filter matches. An empty chain matches everything.
pub struct AnyFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AnyFilter {
    pub fn or<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl fmt::Debug for AnyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyFilter").field("filters", &self.filters.len()).finish()
    }
}

impl Filter for AnyFilter {
    fn matches(&self, req: &RequestContext<'_, '_>) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|filter| filter.matches(req))
    }
}

/// Creates a new AND-composed filter chain.
pub fn all_filter() -> AllFilter {
    AllFilter { filters: Vec::new() }
}

/// Matches when every inner filter matches. An empty chain matches everything.
pub struct AllFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AllFilter {
    pub fn and<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl fmt::Debug for AllFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllFilter").field("filters", &self.filters.len()).finish()
    }
}

impl Filter for AllFilter {
    fn matches(&self, req: &RequestContext<'_, '_>) -> bool {
        self.filters.iter().all(|filter| filter.matches(req))
    }
}

/// A filter that matches one HTTP method.
#[derive(Debug, Clone)]
pub struct MethodFilter(Method);

impl Filter for MethodFilter {
    fn matches(&self, req: &RequestContext<'_, '_>) -> bool {
        self.0 == req.method()
    }
}

macro_rules! method_filter {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Creates a filter that matches HTTP ", stringify!($upper_case_method), " requests.")]
        #[inline]
        pub fn $method() -> MethodFilter {
            MethodFilter(Method::$upper_case_method)
        }
    };
}

method_filter!(get_method, GET);
method_filter!(post_method, POST);
method_filter!(put_method, PUT);
method_filter!(delete_method, DELETE);
method_filter!(head_method, HEAD);
method_filter!(options_method, OPTIONS);
method_filter!(connect_method, CONNECT);
method_filter!(patch_method, PATCH);
method_filter!(trace_method, TRACE);

/// Creates a filter that matches a header with exactly this value.
#[inline]
pub fn header(name: HeaderName, value: HeaderValue) -> HeaderFilter {
    HeaderFilter(name, value)
}

/// A filter that matches one header value.
#[derive(Debug, Clone)]
pub struct HeaderFilter(HeaderName, HeaderValue);

impl Filter for HeaderFilter {
    fn matches(&self, req: &RequestContext<'_, '_>) -> bool {
        req.headers().get(&self.0).is_some_and(|value| value == self.1)
    }
}
