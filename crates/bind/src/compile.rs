//! Turns [`TypeInfo`] metadata into a [`Plan`].

use tracing::debug;

use crate::decode::{self, ValueDecoder, unsupported};
use crate::error::BindError;
use crate::plan::{FieldDecoder, Plan, erase};
use crate::reflect::{FieldInfo, FloatWidth, IntWidth, Kind, PointerInfo, Reflect, SliceInfo, StructInfo, TypeInfo};
use crate::tag::{parse_tag, resolve_delimiter};

/// Compiles the plan of `T` for `tag_key`.
pub fn compile_for<T: Reflect>(tag_key: &str) -> Result<Plan, BindError> {
    compile(&T::type_info(), tag_key)
}

/// Compiles the plan of a struct, or of an `Option` of a struct, for `tag_key`.
///
/// Untagged fields are skipped unless they are structs, whose fields are searched for the same
/// tag. Fields of a kind the binder cannot write fail the whole compilation with
/// [`BindError::UnsupportedType`].
pub fn compile(info: &TypeInfo, tag_key: &str) -> Result<Plan, BindError> {
    let (target, root) = info.indirect();
    let Kind::Struct(structure) = target.kind() else {
        return Err(unsupported(info));
    };

    let decoders = compile_struct(&target, structure, tag_key)?;
    debug!(type_name = info.type_name(), tag = tag_key, decoders = decoders.len(), "compiled binding plan");
    Ok(Plan::new(info, tag_key, root, decoders))
}

fn compile_struct(owner: &TypeInfo, structure: StructInfo, tag_key: &str) -> Result<Vec<FieldDecoder>, BindError> {
    let mut decoders = Vec::new();

    for field in structure.fields() {
        if !field.is_exported() {
            continue;
        }

        let (effective, pointer) = field.type_info().indirect();
        let decoder = if let Some(tag) = field.tag(tag_key) {
            let (key, options) = parse_tag(tag);
            value_decoder(&effective, key, resolve_delimiter(options), tag_key)?
        } else {
            // untagged structs only matter when something below them carries the tag
            let Kind::Struct(nested) = effective.kind() else {
                continue;
            };
            let nested = compile_struct(&effective, nested, tag_key)?;
            if nested.is_empty() {
                continue;
            }
            decode::nested(nested)
        };
        decoders.push(project(owner, field, pointer, decoder));
    }

    Ok(decoders)
}

fn value_decoder(
    info: &TypeInfo,
    key: &'static str,
    delimiter: Option<&'static str>,
    tag_key: &str,
) -> Result<ValueDecoder, BindError> {
    if let Some(hook) = info.text_hook() {
        return Ok(decode::text(key, *info, hook));
    }

    let decoder = match info.kind() {
        Kind::Struct(structure) => decode::nested(compile_struct(info, structure, tag_key)?),
        Kind::String => decode::scalar::<String>(key),
        Kind::Bool => decode::scalar::<bool>(key),
        Kind::Int(IntWidth::W8) => decode::scalar::<i8>(key),
        Kind::Int(IntWidth::W16) => decode::scalar::<i16>(key),
        Kind::Int(IntWidth::W32) => decode::scalar::<i32>(key),
        Kind::Int(IntWidth::W64) => decode::scalar::<i64>(key),
        Kind::Int(IntWidth::Native) => decode::scalar::<isize>(key),
        Kind::Uint(IntWidth::W8) => decode::scalar::<u8>(key),
        Kind::Uint(IntWidth::W16) => decode::scalar::<u16>(key),
        Kind::Uint(IntWidth::W32) => decode::scalar::<u32>(key),
        Kind::Uint(IntWidth::W64) => decode::scalar::<u64>(key),
        Kind::Uint(IntWidth::Native) => decode::scalar::<usize>(key),
        Kind::Float(FloatWidth::W32) => decode::scalar::<f32>(key),
        Kind::Float(FloatWidth::W64) => decode::scalar::<f64>(key),
        Kind::Slice(slice) => slice_decoder(info, slice, key, delimiter)?,
        Kind::Pointer(_) | Kind::Map | Kind::Opaque => return Err(unsupported(info)),
    };
    Ok(decoder)
}

fn slice_decoder(
    info: &TypeInfo,
    slice: SliceInfo,
    key: &'static str,
    delimiter: Option<&'static str>,
) -> Result<ValueDecoder, BindError> {
    let elem = slice.elem();
    if let Some(hook) = elem.text_hook() {
        return Ok(decode::text_slice(key, delimiter, slice, hook));
    }

    let decoder = match elem.kind() {
        Kind::String => decode::strings(key, delimiter),
        Kind::Uint(IntWidth::W8) => decode::bytes(key),
        Kind::Int(IntWidth::W8) => decode::numbers::<i8>(key, delimiter),
        Kind::Int(IntWidth::W16) => decode::numbers::<i16>(key, delimiter),
        Kind::Int(IntWidth::W32) => decode::numbers::<i32>(key, delimiter),
        Kind::Int(IntWidth::W64) => decode::numbers::<i64>(key, delimiter),
        Kind::Int(IntWidth::Native) => decode::numbers::<isize>(key, delimiter),
        Kind::Uint(IntWidth::W16) => decode::numbers::<u16>(key, delimiter),
        Kind::Uint(IntWidth::W32) => decode::numbers::<u32>(key, delimiter),
        Kind::Uint(IntWidth::W64) => decode::numbers::<u64>(key, delimiter),
        Kind::Uint(IntWidth::Native) => decode::numbers::<usize>(key, delimiter),
        _ => return Err(unsupported(info)),
    };
    Ok(decoder)
}

/// Wraps a value decoder so it runs against the field of the owning struct.
///
/// A `None` option field gets a fresh value that is kept only when something was written to it.
fn project(owner: &TypeInfo, field: FieldInfo, pointer: Option<PointerInfo>, decoder: ValueDecoder) -> FieldDecoder {
    let owner = owner.type_name();

    let Some(pointer) = pointer else {
        return erase(move |value, getter, mode| {
            let slot = field.project(value).ok_or(BindError::TypeMismatch { expected: owner })?;
            decoder(slot, getter, mode)
        });
    };

    let elem = pointer.elem();
    erase(move |value, getter, mode| {
        let slot = field.project(value).ok_or(BindError::TypeMismatch { expected: owner })?;
        if let Some(inner) = pointer.get_mut(slot)? {
            return decoder(inner, getter, mode);
        }

        let mut fresh = elem.new_value();
        if !decoder(&mut *fresh, getter, mode)? {
            return Ok(false);
        }
        pointer.set(slot, fresh)?;
        Ok(true)
    })
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use uuid::Uuid;

    use super::*;
    use crate::getter::{DefaultsGetter, Getter};
    use crate::plan::ErrorMode;
    use crate::{Bind, FieldError};

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
        let mut values: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in pairs {
            values.entry((*key).to_owned()).or_default().push((*value).to_owned());
        }
        values
    }

    #[derive(Bind, Debug, Default, PartialEq)]
    struct Scalars {
        #[bind(query = "b")]
        pub flag: bool,
        #[bind(query = "s")]
        pub text: String,
        #[bind(query = "i8")]
        pub tiny: i8,
        #[bind(query = "i16")]
        pub small: i16,
        #[bind(query = "i32")]
        pub medium: i32,
        #[bind(query = "i64")]
        pub large: i64,
        #[bind(query = "isize")]
        pub native: isize,
        #[bind(query = "u8")]
        pub byte: u8,
        #[bind(query = "u16")]
        pub word: u16,
        #[bind(query = "u32")]
        pub double_word: u32,
        #[bind(query = "u64")]
        pub quad_word: u64,
        #[bind(query = "usize")]
        pub unative: usize,
        #[bind(query = "f32")]
        pub single: f32,
        #[bind(query = "f64")]
        pub double: f64,
    }

    #[test]
    fn every_scalar_kind() {
        let source = query(&[
            ("b", "true"),
            ("s", "hello"),
            ("i8", "-8"),
            ("i16", "-16"),
            ("i32", "-32"),
            ("i64", "-64"),
            ("isize", "-1"),
            ("u8", "45"),
            ("u16", "16"),
            ("u32", "32"),
            ("u64", "64"),
            ("usize", "1"),
            ("f32", "1.5"),
            ("f64", "2.25"),
        ]);

        let plan = compile_for::<Scalars>("query").unwrap();
        assert_eq!(plan.len(), 14);

        let mut scalars = Scalars::default();
        assert!(plan.decode(&mut scalars, &source).unwrap());
        assert_eq!(
            scalars,
            Scalars {
                flag: true,
                text: "hello".to_owned(),
                tiny: -8,
                small: -16,
                medium: -32,
                large: -64,
                native: -1,
                byte: 45,
                word: 16,
                double_word: 32,
                quad_word: 64,
                unative: 1,
                single: 1.5,
                double: 2.25,
            }
        );
    }

    #[test]
    fn empty_values_leave_fields_alone() {
        let plan = compile_for::<Scalars>("query").unwrap();
        let mut scalars = Scalars { byte: 3, text: "kept".to_owned(), ..Scalars::default() };

        assert!(!plan.decode(&mut scalars, &query(&[("u8", ""), ("s", "")])).unwrap());
        assert_eq!(scalars.byte, 3);
        assert_eq!(scalars.text, "kept");
    }

    #[test]
    fn out_of_range_integer() {
        let plan = compile_for::<Scalars>("query").unwrap();
        let mut scalars = Scalars::default();

        let error = plan.decode(&mut scalars, &query(&[("i8", "999")])).unwrap_err();
        assert_eq!(error.field_errors(), [FieldError::new("i8", "999", "cannot convert to integer")]);
    }

    #[derive(Bind, Debug, Default)]
    struct NoTags {
        pub name: String,
        pub count: u32,
    }

    #[test]
    fn untagged_type_is_a_no_op() {
        let plan = compile_for::<NoTags>("query").unwrap();
        assert!(plan.is_empty());

        let mut value = NoTags { name: "same".to_owned(), count: 4 };
        assert!(!plan.decode(&mut value, &query(&[("name", "other"), ("count", "9")])).unwrap());
        assert_eq!(value.name, "same");
        assert_eq!(value.count, 4);
    }

    #[derive(Bind, Debug, Default)]
    struct Visibility {
        #[bind(query = "open")]
        pub open: String,
        #[bind(query = "closed")]
        closed: String,
    }

    #[test]
    fn private_fields_are_skipped() {
        let plan = compile_for::<Visibility>("query").unwrap();
        assert_eq!(plan.len(), 1);

        let mut value = Visibility::default();
        plan.decode(&mut value, &query(&[("open", "a"), ("closed", "b")])).unwrap();
        assert_eq!(value.open, "a");
        assert_eq!(value.closed, "");
    }

    #[derive(Bind, Debug, Default)]
    struct Inner {
        #[bind(query = "inner")]
        pub value: u32,
    }

    #[derive(Bind, Debug, Default)]
    struct Outer {
        pub nested: Inner,
        pub lazy: Option<Inner>,
        #[bind(query = "maybe")]
        pub maybe: Option<u8>,
    }

    #[test]
    fn nested_and_optional() {
        let plan = compile_for::<Outer>("query").unwrap();

        let mut untouched = Outer::default();
        assert!(!plan.decode(&mut untouched, &query(&[])).unwrap());
        assert!(untouched.lazy.is_none());
        assert!(untouched.maybe.is_none());

        let mut filled = Outer::default();
        assert!(plan.decode(&mut filled, &query(&[("inner", "7"), ("maybe", "2")])).unwrap());
        assert_eq!(filled.nested.value, 7);
        assert_eq!(filled.lazy.as_ref().map(|inner| inner.value), Some(7));
        assert_eq!(filled.maybe, Some(2));
    }

    #[test]
    fn nested_structs_without_the_tag_are_skipped() {
        assert_eq!(compile_for::<Outer>("query").unwrap().len(), 3);
        assert!(compile_for::<Outer>("header").unwrap().is_empty());

        let plan = compile_for::<Option<Outer>>("header").unwrap();
        assert!(plan.is_empty());

        let mut root: Option<Outer> = None;
        assert!(!plan.decode(&mut root, &query(&[("inner", "1")])).unwrap());
        assert!(root.is_none());
    }

    #[test]
    fn existing_option_is_reused() {
        let plan = compile_for::<Outer>("query").unwrap();
        let mut value = Outer { maybe: Some(9), ..Outer::default() };

        plan.decode(&mut value, &query(&[("maybe", "")])).unwrap();
        assert_eq!(value.maybe, Some(9));

        plan.decode(&mut value, &query(&[("maybe", "1")])).unwrap();
        assert_eq!(value.maybe, Some(1));
    }

    #[test]
    fn failed_nested_option_stays_none() {
        let plan = compile_for::<Outer>("query").unwrap();
        let mut value = Outer::default();

        assert!(plan.decode(&mut value, &query(&[("inner", "x")])).is_err());
        assert!(value.lazy.is_none());
    }

    #[derive(Bind, Debug, Default)]
    struct Lists {
        #[bind(query = "tags,comma-delimited")]
        pub tags: Vec<String>,
        #[bind(query = "raw")]
        pub raw: Vec<String>,
        #[bind(query = "ids,delimiter=pipe")]
        pub ids: Vec<u64>,
        #[bind(query = "blob")]
        pub blob: Vec<u8>,
        #[bind(query = "keys,comma-delimited")]
        pub keys: Vec<Uuid>,
        #[bind(query = "key")]
        pub key: Option<Uuid>,
    }

    #[test]
    fn slices_and_text() {
        let plan = compile_for::<Lists>("query").unwrap();
        let source = query(&[
            ("tags", "a,b"),
            ("tags", "c"),
            ("raw", "a,b"),
            ("ids", "1|2"),
            ("blob", "xyz"),
            ("keys", "67e55044-10b1-426f-9247-bb680e5fe0c8,00000000-0000-0000-0000-000000000001"),
            ("key", "67e55044-10b1-426f-9247-bb680e5fe0c8"),
        ]);

        let mut lists = Lists { raw: vec!["old".to_owned()], ..Lists::default() };
        plan.decode(&mut lists, &source).unwrap();

        assert_eq!(lists.tags, vec!["a", "b", "c"]);
        assert_eq!(lists.raw, vec!["a,b"]);
        assert_eq!(lists.ids, vec![1, 2]);
        assert_eq!(lists.blob, b"xyz");
        assert_eq!(lists.keys.len(), 2);
        assert_eq!(lists.keys[1], Uuid::from_u128(1));
        assert_eq!(lists.key.map(|key| key.to_string()).as_deref(), Some("67e55044-10b1-426f-9247-bb680e5fe0c8"));
    }

    #[test]
    fn bad_text_is_a_field_error() {
        let plan = compile_for::<Lists>("query").unwrap();
        let mut lists = Lists::default();

        let error = plan.decode(&mut lists, &query(&[("key", "nope")])).unwrap_err();
        assert_eq!(error.field_errors()[0].field(), "key");
        assert!(lists.key.is_none());
    }

    #[derive(Bind, Debug, Default)]
    struct WithMap {
        #[bind(query = "labels")]
        pub labels: BTreeMap<String, String>,
    }

    #[derive(Bind, Debug, Default)]
    struct WithFloats {
        #[bind(query = "ratios")]
        pub ratios: Vec<f64>,
    }

    #[derive(Bind, Debug, Default)]
    struct WithDoubleOption {
        #[bind(query = "deep")]
        pub deep: Option<Option<u8>>,
    }

    #[derive(Bind, Debug, Default)]
    struct UntaggedMap {
        pub labels: BTreeMap<String, String>,
    }

    #[test]
    fn unsupported_kinds() {
        for error in [
            compile_for::<WithMap>("query").unwrap_err(),
            compile_for::<WithFloats>("query").unwrap_err(),
            compile_for::<WithDoubleOption>("query").unwrap_err(),
        ] {
            assert!(matches!(error, BindError::UnsupportedType { .. }), "{error}");
        }

        assert!(compile_for::<UntaggedMap>("query").unwrap().is_empty());
        assert!(matches!(compile_for::<u32>("query"), Err(BindError::UnsupportedType { .. })));
        assert!(matches!(compile_for::<Vec<Inner>>("query"), Err(BindError::UnsupportedType { .. })));
    }

    #[derive(Bind, Debug, Default)]
    struct Defaults {
        #[bind(default = "dflt value")]
        pub label: String,
        #[bind(default = "8080")]
        pub port: u16,
        #[bind(default = "a|b", query = "ignored")]
        pub names: Vec<String>,
    }

    #[test]
    fn defaults_come_from_the_tag() {
        let plan = compile_for::<Defaults>("default").unwrap();
        let mut value = Defaults::default();

        plan.decode(&mut value, &DefaultsGetter).unwrap();
        assert_eq!(value.label, "dflt value");
        assert_eq!(value.port, 8080);
        assert_eq!(value.names, vec!["a|b"]);
    }

    #[test]
    fn pointer_root_allocates() {
        let plan = compile_for::<Option<Inner>>("query").unwrap();

        let mut value: Option<Inner> = None;
        assert!(plan.decode(&mut value, &query(&[("inner", "3")])).unwrap());
        assert_eq!(value.map(|inner| inner.value), Some(3));

        let mut empty: Option<Inner> = None;
        plan.decode(&mut empty, &query(&[])).unwrap();
        assert!(empty.is_some());
    }

    #[test]
    fn wrong_destination_type() {
        let plan = compile_for::<Inner>("query").unwrap();
        let mut other = Outer::default();
        assert!(matches!(plan.decode(&mut other, &query(&[])), Err(BindError::TypeMismatch { .. })));
    }

    #[test]
    fn collect_mode_reports_every_failure() {
        let plan = compile_for::<Scalars>("query").unwrap();
        let source = query(&[("i8", "999"), ("u8", "45"), ("b", "maybe")]);

        let mut scalars = Scalars::default();
        let error = plan.decode_with(&mut scalars, &source as &dyn Getter, ErrorMode::Collect).unwrap_err();
        let fields: Vec<&str> = error.field_errors().iter().map(FieldError::field).collect();
        assert_eq!(fields, vec!["b", "i8"]);
        assert_eq!(scalars.byte, 45);

        let mut fail_fast = Scalars::default();
        let error = plan.decode(&mut fail_fast, &source).unwrap_err();
        assert_eq!(error.field_errors().len(), 1);
        assert_eq!(fail_fast.byte, 0);
    }
}
