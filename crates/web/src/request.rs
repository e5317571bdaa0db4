//! Per-request access to the HTTP request, its path parameters and the binder.
//!
//! - `RequestContext`: request parts, derived values (query map, cookies, client address) and the
//!   binding entry points
//! - `PathParams`: named segments captured by the router

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE, HOST};
use http::{HeaderMap, Method, Request, Uri, Version};
use matchit::Params;
use micro_bind::Reflect;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::binder::Binder;
use crate::error::WebError;
use crate::validation::Validate;

/// Query values by name, in the order they appear in the query string.
pub type QueryValues = HashMap<String, Vec<String>>;

/// The context of one HTTP request.
///
/// The lifetime parameters ensure that the request context does not outlive the server
/// or the request data it references.
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'server: 'req, 'req> {
    request: &'req Request<Bytes>,
    path_params: &'req PathParams<'server, 'req>,
    binder: &'server Binder,
}

impl<'server, 'req> RequestContext<'server, 'req> {
    pub fn new(request: &'req Request<Bytes>, path_params: &'req PathParams<'server, 'req>, binder: &'server Binder) -> Self {
        Self { request, path_params, binder }
    }

    pub fn request(&self) -> &'req Request<Bytes> {
        self.request
    }

    pub fn method(&self) -> &'req Method {
        self.request.method()
    }

    pub fn uri(&self) -> &'req Uri {
        self.request.uri()
    }

    pub fn version(&self) -> Version {
        self.request.version()
    }

    pub fn headers(&self) -> &'req HeaderMap {
        self.request.headers()
    }

    pub fn body(&self) -> &'req Bytes {
        self.request.body()
    }

    pub fn path_params(&self) -> &'req PathParams<'server, 'req> {
        self.path_params
    }

    pub fn binder(&self) -> &'server Binder {
        self.binder
    }

    /// Whether a request with this method may carry a body worth decoding.
    pub fn need_body(&self) -> bool {
        !matches!(self.method(), &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT)
    }

    /// The declared `Content-Length`, else the size of the buffered body.
    pub fn content_length(&self) -> usize {
        self.headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or_else(|| self.body().len())
    }

    pub fn content_type(&self) -> Option<&'req str> {
        self.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok())
    }

    /// The raw query string without the leading `?`, empty when there is none.
    pub fn query_string(&self) -> &'req str {
        self.uri().query().unwrap_or_default()
    }

    /// Parses the query string, repeated names keep every value in order.
    pub fn query_values(&self) -> QueryValues {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(self.query_string()).unwrap_or_else(|error| {
            debug!(%error, query = self.query_string(), "malformed query string, ignoring it");
            Vec::new()
        });

        let mut values = QueryValues::with_capacity(pairs.len());
        for (name, value) in pairs {
            values.entry(name).or_default().push(value);
        }
        values
    }

    /// `(name, value)` pairs of every `Cookie` header, in order.
    pub fn cookies(&self) -> Vec<(&'req str, &'req str)> {
        self.headers()
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.split_once('='))
            .map(|(name, value)| (name.trim(), value.trim().trim_matches('"')))
            .filter(|(name, _)| !name.is_empty())
            .collect()
    }

    /// The `Host` header, else the authority of the request URI.
    pub fn host(&self) -> Option<&'req str> {
        self.headers().get(HOST).and_then(|value| value.to_str().ok()).or_else(|| self.uri().host())
    }

    /// The peer address, when the server put a [`SocketAddr`] into the request extensions.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.request.extensions().get::<SocketAddr>().copied()
    }

    /// The client address: first `X-Forwarded-For` entry, then `X-Real-IP`, then the peer address.
    pub fn real_ip(&self) -> Option<String> {
        let forwarded = self
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(ip) = forwarded {
            return Some(ip.to_owned());
        }

        let real_ip = self.headers().get("x-real-ip").and_then(|value| value.to_str().ok()).map(str::trim);
        if let Some(ip) = real_ip.filter(|value| !value.is_empty()) {
            return Some(ip.to_owned());
        }

        self.remote_addr().map(|addr| addr.ip().to_string())
    }

    /// Binds defaults, the body, then query, path, header, cookie and request values into `dest`.
    pub fn bind<T>(&self, dest: &mut T) -> Result<(), WebError>
    where
        T: Reflect + Serialize + DeserializeOwned,
    {
        self.binder.bind(self, dest)
    }

    /// Binds only the request body into `dest`.
    pub fn bind_body<T>(&self, dest: &mut T) -> Result<(), WebError>
    where
        T: Serialize + DeserializeOwned,
    {
        self.binder.bind_body(self, dest)
    }

    /// Binds defaults and every transport source into `dest`, leaving the body alone.
    pub fn bind_params<T: Reflect>(&self, dest: &mut T) -> Result<(), WebError> {
        self.binder.bind_params(self, dest)
    }

    pub fn validate<T: Validate>(&self, value: &T) -> Result<(), WebError> {
        value.validate().map_err(WebError::from)
    }
}

/// Path parameters extracted from the URL path of an HTTP request.
///
/// For example, in the path "/users/{id}", "id" is a path parameter.
#[derive(Debug, Clone, Default)]
pub struct PathParams<'server, 'req> {
    params: Vec<(&'server str, &'req str)>,
}

impl<'server, 'req> PathParams<'server, 'req> {
    #[inline]
    pub fn empty() -> Self {
        Self { params: Vec::new() }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Gets the value of a path parameter by its name.
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&'req str> {
        let key = key.as_ref();
        self.params.iter().find(|(name, _)| *name == key).map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'server str, &'req str)> + '_ {
        self.params.iter().copied()
    }
}

impl<'server, 'req> From<Params<'server, 'req>> for PathParams<'server, 'req> {
    fn from(params: Params<'server, 'req>) -> Self {
        params.iter().collect()
    }
}

impl<'server, 'req> FromIterator<(&'server str, &'req str)> for PathParams<'server, 'req> {
    fn from_iter<I: IntoIterator<Item = (&'server str, &'req str)>>(iter: I) -> Self {
        Self { params: iter.into_iter().collect() }
    }
}
