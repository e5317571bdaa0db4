//! Value decoders: read one key from a getter and write one field.
//!
//! Every decoder returns `Ok(true)` when it wrote, `Ok(false)` when the source had nothing for
//! its key. Empty strings count as nothing.

use std::any::Any;

use crate::error::{BindError, FieldError};
use crate::getter::Getter;
use crate::plan::{FieldDecoder, erase, run_decoders};
use crate::reflect::{SliceInfo, TextHook, TypeInfo, downcast_mut};

pub(crate) type ValueDecoder = FieldDecoder;

/// Scalars parsed from a single string.
pub(crate) trait ParseValue: Any + Sized {
    const MESSAGE: &'static str;

    fn parse_value(raw: &str) -> Option<Self>;
}

macro_rules! parse_number {
    (unsigned $message:literal => $($ty:ty),+) => {
        $(
            impl ParseValue for $ty {
                const MESSAGE: &'static str = $message;

                // no sign at all, `str::parse` would take a leading `+`
                fn parse_value(raw: &str) -> Option<Self> {
                    if raw.starts_with('+') { None } else { raw.parse().ok() }
                }
            }
        )+
    };
    ($message:literal => $($ty:ty),+) => {
        $(
            impl ParseValue for $ty {
                const MESSAGE: &'static str = $message;

                fn parse_value(raw: &str) -> Option<Self> {
                    raw.parse().ok()
                }
            }
        )+
    };
}

parse_number!("cannot convert to integer" => i8, i16, i32, i64, isize);
parse_number!(unsigned "cannot convert to unsigned integer" => u8, u16, u32, u64, usize);
parse_number!("cannot convert to float" => f32, f64);

impl ParseValue for bool {
    const MESSAGE: &'static str = "cannot convert to boolean";

    fn parse_value(raw: &str) -> Option<Self> {
        match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
            _ => None,
        }
    }
}

impl ParseValue for String {
    const MESSAGE: &'static str = "cannot convert to string";

    fn parse_value(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }
}

fn parse_or_fail<T: ParseValue>(key: &str, raw: &str) -> Result<T, FieldError> {
    T::parse_value(raw).ok_or_else(|| FieldError::new(key, raw, T::MESSAGE))
}

/// All values under `key`, split on `delimiter` when one is set.
///
/// `None` when the source supplies no non-empty value, slices stay untouched then.
fn supplied(getter: &dyn Getter, key: &str, delimiter: Option<&str>) -> Option<Vec<String>> {
    let values = getter.values(key);
    if values.iter().all(|value| value.is_empty()) {
        return None;
    }

    let values = match delimiter {
        Some(delimiter) => values.iter().flat_map(|value| value.split(delimiter)).map(str::to_owned).collect(),
        None => values.into_iter().map(|value| value.into_owned()).collect(),
    };
    Some(values)
}

pub(crate) fn scalar<T: ParseValue>(key: &'static str) -> ValueDecoder {
    erase(move |value, getter, _mode| {
        let raw = getter.get(key);
        if raw.is_empty() {
            return Ok(false);
        }
        let parsed = parse_or_fail::<T>(key, &raw)?;
        *downcast_mut::<T>(value)? = parsed;
        Ok(true)
    })
}

pub(crate) fn text(key: &'static str, info: TypeInfo, hook: TextHook) -> ValueDecoder {
    erase(move |value, getter, _mode| {
        let raw = getter.get(key);
        if raw.is_empty() {
            return Ok(false);
        }
        let decoded = hook.parse(raw.as_bytes()).map_err(|error| FieldError::new(key, &*raw, error.to_string()))?;
        info.assign(value, decoded)?;
        Ok(true)
    })
}

pub(crate) fn strings(key: &'static str, delimiter: Option<&'static str>) -> ValueDecoder {
    erase(move |value, getter, _mode| {
        let Some(values) = supplied(getter, key, delimiter) else {
            return Ok(false);
        };
        *downcast_mut::<Vec<String>>(value)? = values;
        Ok(true)
    })
}

/// `Vec<u8>` takes the raw bytes of the first value.
pub(crate) fn bytes(key: &'static str) -> ValueDecoder {
    erase(move |value, getter, _mode| {
        let raw = getter.get(key);
        if raw.is_empty() {
            return Ok(false);
        }
        *downcast_mut::<Vec<u8>>(value)? = raw.as_bytes().to_vec();
        Ok(true)
    })
}

pub(crate) fn numbers<T: ParseValue>(key: &'static str, delimiter: Option<&'static str>) -> ValueDecoder {
    erase(move |value, getter, _mode| {
        let Some(values) = supplied(getter, key, delimiter) else {
            return Ok(false);
        };
        let parsed = values.iter().map(|raw| parse_or_fail::<T>(key, raw)).collect::<Result<Vec<T>, _>>()?;
        *downcast_mut::<Vec<T>>(value)? = parsed;
        Ok(true)
    })
}

pub(crate) fn text_slice(key: &'static str, delimiter: Option<&'static str>, slice: SliceInfo, hook: TextHook) -> ValueDecoder {
    erase(move |value, getter, _mode| {
        let Some(values) = supplied(getter, key, delimiter) else {
            return Ok(false);
        };
        let items = values
            .iter()
            .map(|raw| hook.parse(raw.as_bytes()).map_err(|error| FieldError::new(key, raw.as_str(), error.to_string())))
            .collect::<Result<Vec<Box<dyn Any>>, _>>()?;
        slice.assign(value, items)?;
        Ok(true)
    })
}

/// Runs the field decoders of a nested struct against the nested value.
pub(crate) fn nested(decoders: Vec<FieldDecoder>) -> ValueDecoder {
    erase(move |value, getter, mode| run_decoders(&decoders, value, getter, mode))
}

pub(crate) fn unsupported(info: &TypeInfo) -> BindError {
    BindError::unsupported_type(info.type_name())
}
