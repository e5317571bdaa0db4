//! Request body decoding.
//!
//! A [`ContentDecoder`] turns a body into a JSON document, which is then merged into the
//! destination on top of whatever the `default` source already put there.

use std::fmt;

use http::HeaderMap;
use http::header::CONTENT_TYPE;
use mime::Mime;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::error::Category;

use crate::error::WebError;

/// A body decoding strategy, selected by looking at the request headers.
#[cfg_attr(test, mockall::automock)]
pub trait ContentDecoder: Send + Sync {
    fn can_decode(&self, headers: &HeaderMap) -> bool;

    fn decode(&self, body: &[u8]) -> Result<Value, WebError>;
}

/// Decodes `application/json` and `+json` bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl ContentDecoder for JsonDecoder {
    fn can_decode(&self, headers: &HeaderMap) -> bool {
        content_type(headers).is_some_and(|parsed| {
            parsed.essence_str() == mime::APPLICATION_JSON.essence_str()
                || parsed.suffix().is_some_and(|suffix| suffix.as_str() == mime::JSON.as_str())
        })
    }

    fn decode(&self, body: &[u8]) -> Result<Value, WebError> {
        serde_json::from_slice(body).map_err(|error| WebError::invalid_body(describe(&error)))
    }
}

fn content_type(headers: &HeaderMap) -> Option<Mime> {
    headers.get(CONTENT_TYPE)?.to_str().ok()?.parse().ok()
}

/// A decoder made of two closures.
pub struct FnDecoder<P, D> {
    predicate: P,
    decode: D,
}

/// Creates a [`ContentDecoder`] from a header predicate and a decode function.
pub fn fn_decoder<P, D>(predicate: P, decode: D) -> FnDecoder<P, D>
where
    P: Fn(&HeaderMap) -> bool + Send + Sync,
    D: Fn(&[u8]) -> Result<Value, WebError> + Send + Sync,
{
    FnDecoder { predicate, decode }
}

impl<P, D> ContentDecoder for FnDecoder<P, D>
where
    P: Fn(&HeaderMap) -> bool + Send + Sync,
    D: Fn(&[u8]) -> Result<Value, WebError> + Send + Sync,
{
    fn can_decode(&self, headers: &HeaderMap) -> bool {
        (self.predicate)(headers)
    }

    fn decode(&self, body: &[u8]) -> Result<Value, WebError> {
        (self.decode)(body)
    }
}

impl<P, D> fmt::Debug for FnDecoder<P, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDecoder").finish_non_exhaustive()
    }
}

pub(crate) fn describe(error: &serde_json::Error) -> String {
    match error.classify() {
        Category::Syntax | Category::Eof => {
            format!("Syntax error: line={}, column={}, error={error}", error.line(), error.column())
        }
        Category::Data => format!("Unmarshal type error: {error}"),
        Category::Io => error.to_string(),
    }
}

/// Overlays `document` onto the current value of `dest`.
///
/// Objects merge key by key, any other value replaces what is there. The merge goes through the
/// serialized form of `dest`, so a field serde skips comes back as its `Default`.
pub(crate) fn merge_into<T>(dest: &mut T, document: Value) -> Result<(), WebError>
where
    T: Serialize + DeserializeOwned,
{
    let mut current = serde_json::to_value(&*dest).map_err(|error| WebError::invalid_body(describe(&error)))?;
    merge(&mut current, document);
    *dest = serde_json::from_value(current).map_err(|error| WebError::invalid_body(describe(&error)))?;
    Ok(())
}

fn merge(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn json_predicate() {
        assert!(JsonDecoder.can_decode(&headers("application/json")));
        assert!(JsonDecoder.can_decode(&headers("application/json; charset=utf-8")));
        assert!(JsonDecoder.can_decode(&headers("application/problem+json")));
        assert!(!JsonDecoder.can_decode(&headers("text/plain")));
        assert!(!JsonDecoder.can_decode(&HeaderMap::new()));
    }

    #[test]
    fn syntax_errors_carry_position() {
        let error = JsonDecoder.decode(b"{\n  \"a\": }").unwrap_err();
        let message = error.to_string();
        assert!(message.contains("Syntax error: line=2, column="), "{message}");
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
        address: Address,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Address {
        city: String,
        zip: String,
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let mut profile = Profile {
            name: "default".to_owned(),
            age: 18,
            address: Address { city: "Hangzhou".to_owned(), zip: "310000".to_owned() },
        };

        merge_into(&mut profile, json!({"age": 30, "address": {"zip": "310012"}})).unwrap();

        assert_eq!(profile.name, "default");
        assert_eq!(profile.age, 30);
        assert_eq!(profile.address.city, "Hangzhou");
        assert_eq!(profile.address.zip, "310012");
    }

    #[test]
    fn merge_type_error() {
        let mut profile = Profile::default();
        let error = merge_into(&mut profile, json!({"age": "old"})).unwrap_err();
        assert!(error.to_string().contains("Unmarshal type error"), "{error}");
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn fn_decoder_delegates() {
        let decoder = fn_decoder(
            |headers: &HeaderMap| headers.contains_key("x-raw"),
            |body: &[u8]| Ok(Value::String(String::from_utf8_lossy(body).into_owned())),
        );

        let mut raw = HeaderMap::new();
        raw.insert("x-raw", HeaderValue::from_static("1"));
        assert!(decoder.can_decode(&raw));
        assert!(!decoder.can_decode(&HeaderMap::new()));
        assert_eq!(decoder.decode(b"text").unwrap(), json!("text"));
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Draft {
        title: String,
        #[serde(skip)]
        revision: u32,
    }

    #[test]
    fn skipped_fields_are_reset() {
        let mut draft = Draft { title: "old".to_owned(), revision: 7 };
        merge_into(&mut draft, json!({"title": "new"})).unwrap();

        assert_eq!(draft.title, "new");
        assert_eq!(draft.revision, 0);
    }
}
