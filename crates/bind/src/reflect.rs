//! Runtime type metadata consumed by the plan compiler.
//!
//! Bindable types describe themselves through [`Reflect::type_info`]. The library covers
//! primitives, `String`, `Option<T>`, `Vec<T>`, the map types and a few text types; structs get
//! their implementation from `#[derive(Bind)]`.
//!
//! Every accessor in here works on `&mut dyn Any` and checks its downcast, so a wrong hand-written
//! implementation surfaces as [`BindError::TypeMismatch`] instead of undefined behavior.

use std::any::{Any, TypeId, type_name};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;

use crate::error::{BindError, TextDecodeError};
use crate::text::TextDecode;

/// A type the plan compiler can see into.
pub trait Reflect: Any + Default {
    fn type_info() -> TypeInfo;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    /// `isize` / `usize`
    Native,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    W32,
    W64,
}

#[derive(Clone, Copy)]
pub enum Kind {
    Bool,
    String,
    Int(IntWidth),
    Uint(IntWidth),
    Float(FloatWidth),
    Pointer(PointerInfo),
    Slice(SliceInfo),
    Struct(StructInfo),
    Map,
    Opaque,
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Bool => f.write_str("Bool"),
            Kind::String => f.write_str("String"),
            Kind::Int(width) => f.debug_tuple("Int").field(width).finish(),
            Kind::Uint(width) => f.debug_tuple("Uint").field(width).finish(),
            Kind::Float(width) => f.debug_tuple("Float").field(width).finish(),
            Kind::Pointer(pointer) => f.debug_tuple("Pointer").field(&pointer.elem().type_name()).finish(),
            Kind::Slice(slice) => f.debug_tuple("Slice").field(&slice.elem().type_name()).finish(),
            Kind::Struct(_) => f.write_str("Struct"),
            Kind::Map => f.write_str("Map"),
            Kind::Opaque => f.write_str("Opaque"),
        }
    }
}

#[derive(Clone, Copy)]
pub struct TypeInfo {
    type_id: TypeId,
    type_name: &'static str,
    kind: Kind,
    text: Option<TextHook>,
    new: fn() -> Box<dyn Any>,
    assign: fn(&mut dyn Any, Box<dyn Any>) -> Result<(), BindError>,
}

impl TypeInfo {
    pub fn new<T: Reflect>(kind: Kind) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            kind,
            text: None,
            new: new_boxed::<T>,
            assign: assign_boxed::<T>,
        }
    }

    /// Metadata of a struct, the fields are listed on demand.
    pub fn structure<T: Reflect>(fields: fn() -> Vec<FieldInfo>) -> Self {
        Self::new::<T>(Kind::Struct(StructInfo { fields }))
    }

    /// Metadata of a type decoded from its textual form through [`TextDecode`].
    pub fn text<T: Reflect + TextDecode>() -> Self {
        Self { text: Some(TextHook { parse: parse_text::<T> }), ..Self::new::<T>(Kind::Opaque) }
    }

    /// Metadata of a type the binder never writes into.
    pub fn opaque<T: Reflect>() -> Self {
        Self::new::<T>(Kind::Opaque)
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn text_hook(&self) -> Option<TextHook> {
        self.text
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, Kind::Struct(_))
    }

    /// Unwraps one level of `Option`, returning the pointer info when there was one.
    pub fn indirect(self) -> (TypeInfo, Option<PointerInfo>) {
        match self.kind {
            Kind::Pointer(pointer) => (pointer.elem(), Some(pointer)),
            _ => (self, None),
        }
    }

    /// A boxed `Default::default()` of the described type.
    pub fn new_value(&self) -> Box<dyn Any> {
        (self.new)()
    }

    /// Moves `value` into `slot`, both must be of the described type.
    pub fn assign(&self, slot: &mut dyn Any, value: Box<dyn Any>) -> Result<(), BindError> {
        (self.assign)(slot, value)
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("text", &self.text.is_some())
            .finish_non_exhaustive()
    }
}

/// Builds a value of a text-decodable type from raw bytes.
#[derive(Clone, Copy)]
pub struct TextHook {
    parse: fn(&[u8]) -> Result<Box<dyn Any>, TextDecodeError>,
}

impl TextHook {
    pub fn parse(&self, text: &[u8]) -> Result<Box<dyn Any>, TextDecodeError> {
        (self.parse)(text)
    }
}

impl fmt::Debug for TextHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TextHook")
    }
}

/// Accessors of an `Option<T>`.
#[derive(Clone, Copy)]
pub struct PointerInfo {
    elem: fn() -> TypeInfo,
    get_mut: fn(&mut dyn Any) -> Result<Option<&mut dyn Any>, BindError>,
    set: fn(&mut dyn Any, Box<dyn Any>) -> Result<(), BindError>,
}

impl PointerInfo {
    pub fn elem(&self) -> TypeInfo {
        (self.elem)()
    }

    /// The pointee, if the option is `Some`.
    pub fn get_mut<'a>(&self, value: &'a mut dyn Any) -> Result<Option<&'a mut dyn Any>, BindError> {
        (self.get_mut)(value)
    }

    /// Stores `inner` as `Some(inner)`.
    pub fn set(&self, value: &mut dyn Any, inner: Box<dyn Any>) -> Result<(), BindError> {
        (self.set)(value, inner)
    }
}

/// Accessors of a `Vec<T>`.
#[derive(Clone, Copy)]
pub struct SliceInfo {
    elem: fn() -> TypeInfo,
    assign: fn(&mut dyn Any, Vec<Box<dyn Any>>) -> Result<(), BindError>,
}

impl SliceInfo {
    pub fn elem(&self) -> TypeInfo {
        (self.elem)()
    }

    /// Replaces the contents of the vector with `items`.
    pub fn assign(&self, value: &mut dyn Any, items: Vec<Box<dyn Any>>) -> Result<(), BindError> {
        (self.assign)(value, items)
    }
}

#[derive(Clone, Copy)]
pub struct StructInfo {
    fields: fn() -> Vec<FieldInfo>,
}

impl StructInfo {
    /// Fields in declaration order.
    pub fn fields(&self) -> Vec<FieldInfo> {
        (self.fields)()
    }
}

#[derive(Clone, Copy)]
pub struct FieldInfo {
    index: usize,
    name: &'static str,
    exported: bool,
    tags: &'static [(&'static str, &'static str)],
    type_info: fn() -> TypeInfo,
    project: fn(&mut dyn Any) -> Option<&mut dyn Any>,
}

impl FieldInfo {
    /// A `pub` field whose value is reached through `project`.
    pub fn exported<F: Reflect>(
        index: usize,
        name: &'static str,
        tags: &'static [(&'static str, &'static str)],
        project: fn(&mut dyn Any) -> Option<&mut dyn Any>,
    ) -> Self {
        Self { index, name, exported: true, tags, type_info: F::type_info, project }
    }

    /// A field the binder must never touch: private, or marked `#[bind(skip)]`.
    pub fn hidden(index: usize, name: &'static str, tags: &'static [(&'static str, &'static str)]) -> Self {
        Self { index, name, exported: false, tags, type_info: <() as Reflect>::type_info, project: |_| None }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_exported(&self) -> bool {
        self.exported
    }

    pub fn tags(&self) -> &'static [(&'static str, &'static str)] {
        self.tags
    }

    /// Raw tag value under `key`, e.g. `"names,comma-delimited"` for `query`.
    pub fn tag(&self, key: &str) -> Option<&'static str> {
        self.tags.iter().find(|(name, _)| *name == key).map(|(_, value)| *value)
    }

    pub fn type_info(&self) -> TypeInfo {
        (self.type_info)()
    }

    pub fn project<'a>(&self, value: &'a mut dyn Any) -> Option<&'a mut dyn Any> {
        (self.project)(value)
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("exported", &self.exported)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

pub(crate) fn downcast_mut<T: Any>(value: &mut dyn Any) -> Result<&mut T, BindError> {
    value.downcast_mut::<T>().ok_or(BindError::TypeMismatch { expected: type_name::<T>() })
}

fn downcast_box<T: Any>(value: Box<dyn Any>) -> Result<T, BindError> {
    value.downcast::<T>().map(|boxed| *boxed).map_err(|_rejected| BindError::type_mismatch(type_name::<T>()))
}

fn new_boxed<T: Reflect>() -> Box<dyn Any> {
    Box::new(T::default())
}

fn assign_boxed<T: Reflect>(slot: &mut dyn Any, value: Box<dyn Any>) -> Result<(), BindError> {
    let value = downcast_box::<T>(value)?;
    *downcast_mut::<T>(slot)? = value;
    Ok(())
}

fn parse_text<T: Reflect + TextDecode>(text: &[u8]) -> Result<Box<dyn Any>, TextDecodeError> {
    let mut value = T::default();
    value.decode_text(text)?;
    Ok(Box::new(value))
}

fn option_get_mut<T: Reflect>(value: &mut dyn Any) -> Result<Option<&mut dyn Any>, BindError> {
    let option = downcast_mut::<Option<T>>(value)?;
    Ok(option.as_mut().map(|inner| inner as &mut dyn Any))
}

fn option_set<T: Reflect>(value: &mut dyn Any, inner: Box<dyn Any>) -> Result<(), BindError> {
    let inner = downcast_box::<T>(inner)?;
    *downcast_mut::<Option<T>>(value)? = Some(inner);
    Ok(())
}

fn vec_assign<T: Reflect>(value: &mut dyn Any, items: Vec<Box<dyn Any>>) -> Result<(), BindError> {
    let items = items.into_iter().map(downcast_box::<T>).collect::<Result<Vec<T>, _>>()?;
    *downcast_mut::<Vec<T>>(value)? = items;
    Ok(())
}

macro_rules! impl_reflect {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::new::<Self>($kind)
                }
            }
        )*
    };
}

impl_reflect! {
    bool => Kind::Bool,
    String => Kind::String,
    i8 => Kind::Int(IntWidth::W8),
    i16 => Kind::Int(IntWidth::W16),
    i32 => Kind::Int(IntWidth::W32),
    i64 => Kind::Int(IntWidth::W64),
    isize => Kind::Int(IntWidth::Native),
    u8 => Kind::Uint(IntWidth::W8),
    u16 => Kind::Uint(IntWidth::W16),
    u32 => Kind::Uint(IntWidth::W32),
    u64 => Kind::Uint(IntWidth::W64),
    usize => Kind::Uint(IntWidth::Native),
    f32 => Kind::Float(FloatWidth::W32),
    f64 => Kind::Float(FloatWidth::W64),
    () => Kind::Opaque,
}

impl<T: Reflect> Reflect for Option<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Self>(Kind::Pointer(PointerInfo {
            elem: T::type_info,
            get_mut: option_get_mut::<T>,
            set: option_set::<T>,
        }))
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Self>(Kind::Slice(SliceInfo { elem: T::type_info, assign: vec_assign::<T> }))
    }
}

impl<K: 'static, V: 'static, S: BuildHasher + Default + 'static> Reflect for HashMap<K, V, S> {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Self>(Kind::Map)
    }
}

impl<K: 'static, V: 'static> Reflect for BTreeMap<K, V> {
    fn type_info() -> TypeInfo {
        TypeInfo::new::<Self>(Kind::Map)
    }
}
