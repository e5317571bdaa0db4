//! Value sources a plan reads from.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::marker::PhantomData;

use http::HeaderMap;

/// A read-only view of one request data source.
///
/// Absence and "present but empty" are indistinguishable: both yield `""` from [`Getter::get`].
pub trait Getter {
    /// First value under `key`, or `""`.
    fn get(&self, key: &str) -> Cow<'_, str>;

    /// Every value under `key` in source order, or an empty vector.
    fn values(&self, key: &str) -> Vec<Cow<'_, str>>;
}

impl<G: Getter + ?Sized> Getter for &G {
    fn get(&self, key: &str) -> Cow<'_, str> {
        (**self).get(key)
    }

    fn values(&self, key: &str) -> Vec<Cow<'_, str>> {
        (**self).values(key)
    }
}

impl<G: Getter + ?Sized> Getter for Box<G> {
    fn get(&self, key: &str) -> Cow<'_, str> {
        (**self).get(key)
    }

    fn values(&self, key: &str) -> Vec<Cow<'_, str>> {
        (**self).values(key)
    }
}

/// Multi-valued map, the shape query strings are parsed into.
impl<S: BuildHasher> Getter for HashMap<String, Vec<String>, S> {
    fn get(&self, key: &str) -> Cow<'_, str> {
        self.get(key).and_then(|values| values.first()).map_or(Cow::Borrowed(""), |value| Cow::Borrowed(value.as_str()))
    }

    fn values(&self, key: &str) -> Vec<Cow<'_, str>> {
        self.get(key).map(|values| values.iter().map(|value| Cow::Borrowed(value.as_str())).collect()).unwrap_or_default()
    }
}

/// Case-insensitive header lookup, values that are not visible ASCII count as absent.
impl Getter for HeaderMap {
    fn get(&self, key: &str) -> Cow<'_, str> {
        self.get(key).and_then(|value| value.to_str().ok()).map_or(Cow::Borrowed(""), Cow::Borrowed)
    }

    fn values(&self, key: &str) -> Vec<Cow<'_, str>> {
        self.get_all(key).iter().filter_map(|value| value.to_str().ok()).map(Cow::Borrowed).collect()
    }
}

/// Single-valued lookup by name, e.g. matched path parameters.
pub struct LookupGetter<'a, F> {
    lookup: F,
    _marker: PhantomData<&'a str>,
}

impl<'a, F> LookupGetter<'a, F>
where
    F: Fn(&str) -> Option<&'a str>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup, _marker: PhantomData }
    }
}

impl<'a, F> Getter for LookupGetter<'a, F>
where
    F: Fn(&str) -> Option<&'a str>,
{
    fn get(&self, key: &str) -> Cow<'_, str> {
        Cow::Borrowed((self.lookup)(key).unwrap_or_default())
    }

    fn values(&self, key: &str) -> Vec<Cow<'_, str>> {
        vec![self.get(key)]
    }
}

impl<F> fmt::Debug for LookupGetter<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupGetter").finish_non_exhaustive()
    }
}

/// Ordered `(name, value)` cookie pairs, duplicates are kept.
#[derive(Debug, Clone, Default)]
pub struct CookieGetter<'a> {
    cookies: Vec<(&'a str, &'a str)>,
}

impl<'a> CookieGetter<'a> {
    pub fn new(cookies: Vec<(&'a str, &'a str)>) -> Self {
        Self { cookies }
    }
}

impl Getter for CookieGetter<'_> {
    fn get(&self, key: &str) -> Cow<'_, str> {
        let value = self.cookies.iter().find(|(name, _)| *name == key).map(|(_, value)| *value);
        Cow::Borrowed(value.unwrap_or_default())
    }

    fn values(&self, key: &str) -> Vec<Cow<'_, str>> {
        self.cookies.iter().filter(|(name, _)| *name == key).map(|(_, value)| Cow::Borrowed(*value)).collect()
    }
}

/// Hands the tag key back as the value, which turns `default = "..."` tags into default values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultsGetter;

impl Getter for DefaultsGetter {
    fn get(&self, key: &str) -> Cow<'_, str> {
        Cow::Owned(key.to_owned())
    }

    fn values(&self, key: &str) -> Vec<Cow<'_, str>> {
        vec![Cow::Owned(key.to_owned())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn map_getter() {
        let mut query = HashMap::new();
        query.insert("tag".to_owned(), vec!["a".to_owned(), "b".to_owned()]);

        assert_eq!(Getter::get(&query, "tag"), "a");
        assert_eq!(Getter::values(&query, "tag"), vec!["a", "b"]);
        assert_eq!(Getter::get(&query, "missing"), "");
        assert!(Getter::values(&query, "missing").is_empty());
    }

    #[test]
    fn header_getter_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.append("X-Count", HeaderValue::from_static("1"));
        headers.append("x-count", HeaderValue::from_static("2"));
        headers.append("x-binary", HeaderValue::from_bytes(b"caf\xc3\xa9").unwrap());

        assert_eq!(Getter::get(&headers, "x-count"), "1");
        assert_eq!(Getter::values(&headers, "X-COUNT"), vec!["1", "2"]);
        assert_eq!(Getter::get(&headers, "x-binary"), "");
        assert!(Getter::values(&headers, "x-binary").is_empty());
    }

    #[test]
    fn lookup_getter() {
        let params = [("id", "42")];
        let getter = LookupGetter::new(|key| params.iter().find(|(name, _)| *name == key).map(|(_, value)| *value));

        assert_eq!(getter.get("id"), "42");
        assert_eq!(getter.values("id"), vec!["42"]);
        assert_eq!(getter.get("other"), "");
        assert_eq!(getter.values("other"), vec![""]);
    }

    #[test]
    fn cookie_getter_keeps_order() {
        let getter = CookieGetter::new(vec![("session", "s1"), ("theme", "dark"), ("session", "s2")]);

        assert_eq!(getter.get("session"), "s1");
        assert_eq!(getter.values("session"), vec!["s1", "s2"]);
        assert_eq!(getter.get("lang"), "");
    }

    #[test]
    fn defaults_getter_echoes_key() {
        assert_eq!(DefaultsGetter.get("dflt value"), "dflt value");
        assert_eq!(DefaultsGetter.values("a,b"), vec!["a,b"]);
    }
}
