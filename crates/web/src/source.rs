//! Request value sources, each pairing a tag key with the getter that serves it.

use std::borrow::Cow;
use std::fmt;

use micro_bind::{
    COOKIE_TAG, CookieGetter, DEFAULT_TAG, DefaultsGetter, Getter, HEADER_TAG, LookupGetter, PATH_TAG, QUERY_TAG,
    REQUEST_TAG,
};

use crate::RequestContext;

/// Builds the getter of one source for one request.
pub type GetterFactory = for<'c> fn(&'c RequestContext<'c, 'c>) -> Box<dyn Getter + 'c>;

/// A tag key and the request data fields carrying that tag are read from.
#[derive(Clone, Copy)]
pub struct Source {
    tag: &'static str,
    factory: GetterFactory,
}

impl Source {
    pub const fn new(tag: &'static str, factory: GetterFactory) -> Self {
        Self { tag, factory }
    }

    /// `default`: the tag value itself.
    pub fn defaults() -> Self {
        Self::new(DEFAULT_TAG, defaults_getter)
    }

    /// `query`: the parsed query string.
    pub fn query() -> Self {
        Self::new(QUERY_TAG, query_getter)
    }

    /// `path`: parameters captured by the router.
    pub fn path() -> Self {
        Self::new(PATH_TAG, path_getter)
    }

    /// Path parameters under another tag key, e.g. `param`.
    pub fn path_alias(tag: &'static str) -> Self {
        Self::new(tag, path_getter)
    }

    /// `header`: request headers, case-insensitive.
    pub fn header() -> Self {
        Self::new(HEADER_TAG, header_getter)
    }

    /// `cookie`: pairs from every `Cookie` header.
    pub fn cookie() -> Self {
        Self::new(COOKIE_TAG, cookie_getter)
    }

    /// `request`: request metadata, see [`RequestGetter`].
    pub fn request() -> Self {
        Self::new(REQUEST_TAG, request_getter)
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn getter<'c>(&self, ctx: &'c RequestContext<'_, '_>) -> Box<dyn Getter + 'c> {
        (self.factory)(ctx)
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source").field("tag", &self.tag).finish_non_exhaustive()
    }
}

fn defaults_getter<'c>(_ctx: &'c RequestContext<'c, 'c>) -> Box<dyn Getter + 'c> {
    Box::new(DefaultsGetter)
}

fn query_getter<'c>(ctx: &'c RequestContext<'c, 'c>) -> Box<dyn Getter + 'c> {
    Box::new(ctx.query_values())
}

fn path_getter<'c>(ctx: &'c RequestContext<'c, 'c>) -> Box<dyn Getter + 'c> {
    let params = ctx.path_params();
    Box::new(LookupGetter::new(move |key| params.get(key)))
}

fn header_getter<'c>(ctx: &'c RequestContext<'c, 'c>) -> Box<dyn Getter + 'c> {
    Box::new(ctx.headers())
}

fn cookie_getter<'c>(ctx: &'c RequestContext<'c, 'c>) -> Box<dyn Getter + 'c> {
    Box::new(CookieGetter::new(ctx.cookies()))
}

fn request_getter<'c>(ctx: &'c RequestContext<'c, 'c>) -> Box<dyn Getter + 'c> {
    Box::new(RequestGetter { ctx })
}

/// Request metadata under fixed keys.
///
/// | key | value |
/// |---|---|
/// | `remote-addr` | client address, see [`RequestContext::real_ip`] |
/// | `host` | `Host` header or URI authority |
/// | `method` | request method |
/// | `url` | the request target as received |
/// | `url:host`, `url:query`, `url:path`, `url:scheme` | parts of the request URI |
#[derive(Debug, Clone, Copy)]
pub struct RequestGetter<'c> {
    ctx: &'c RequestContext<'c, 'c>,
}

impl<'c> RequestGetter<'c> {
    pub fn new(ctx: &'c RequestContext<'c, 'c>) -> Self {
        Self { ctx }
    }
}

impl Getter for RequestGetter<'_> {
    fn get(&self, key: &str) -> Cow<'_, str> {
        let uri = self.ctx.uri();
        match key {
            "remote-addr" => self.ctx.real_ip().map_or(Cow::Borrowed(""), Cow::Owned),
            "host" => Cow::Borrowed(self.ctx.host().unwrap_or_default()),
            "method" => Cow::Borrowed(self.ctx.method().as_str()),
            "url" => Cow::Owned(uri.to_string()),
            "url:host" => Cow::Borrowed(uri.host().unwrap_or_default()),
            "url:query" => Cow::Borrowed(uri.query().unwrap_or_default()),
            "url:path" => Cow::Borrowed(uri.path()),
            "url:scheme" => Cow::Borrowed(uri.scheme_str().unwrap_or_default()),
            _ => Cow::Borrowed(""),
        }
    }

    fn values(&self, key: &str) -> Vec<Cow<'_, str>> {
        let value = self.get(key);
        if value.is_empty() { Vec::new() } else { vec![value] }
    }
}
