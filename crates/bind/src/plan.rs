use std::any::{Any, TypeId};
use std::fmt;

use crate::error::BindError;
use crate::getter::Getter;
use crate::reflect::{PointerInfo, Reflect, TypeInfo};

/// How a plan reacts to a value that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Stop at the first failure.
    #[default]
    FailFast,
    /// Keep going and report every per-value failure as [`BindError::Fields`].
    /// Schema errors still stop immediately.
    Collect,
}

/// Decodes one field of an erased struct, returns whether anything was written.
pub(crate) type FieldDecoder = Box<dyn Fn(&mut dyn Any, &dyn Getter, ErrorMode) -> Result<bool, BindError> + Send + Sync>;

/// The compiled, immutable decoding plan of one (type, tag) pair.
pub struct Plan {
    type_id: TypeId,
    type_name: &'static str,
    tag: String,
    root: Option<PointerInfo>,
    decoders: Vec<FieldDecoder>,
}

impl Plan {
    pub(crate) fn new(info: &TypeInfo, tag: &str, root: Option<PointerInfo>, decoders: Vec<FieldDecoder>) -> Self {
        Self { type_id: info.type_id(), type_name: info.type_name(), tag: tag.to_owned(), root, decoders }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Number of field decoders, nested structs count as one.
    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    /// An empty plan never touches its destination.
    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    pub fn decode<T: Reflect>(&self, dest: &mut T, getter: &dyn Getter) -> Result<bool, BindError> {
        self.decode_with(dest, getter, ErrorMode::FailFast)
    }

    pub fn decode_with<T: Reflect>(&self, dest: &mut T, getter: &dyn Getter, mode: ErrorMode) -> Result<bool, BindError> {
        if TypeId::of::<T>() != self.type_id {
            return Err(BindError::type_mismatch(self.type_name));
        }
        self.execute(dest, getter, mode)
    }

    /// Runs the plan against an erased destination of the compiled type.
    ///
    /// A `None` root of an `Option<S>` plan is replaced with a fresh `S` before the fields run.
    pub fn execute(&self, dest: &mut dyn Any, getter: &dyn Getter, mode: ErrorMode) -> Result<bool, BindError> {
        if self.decoders.is_empty() {
            return Ok(false);
        }

        let Some(pointer) = self.root else {
            return run_decoders(&self.decoders, dest, getter, mode);
        };

        if pointer.get_mut(dest)?.is_none() {
            pointer.set(dest, pointer.elem().new_value())?;
        }
        let inner = pointer.get_mut(dest)?.ok_or(BindError::TypeMismatch { expected: self.type_name })?;
        run_decoders(&self.decoders, inner, getter, mode)
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("type_name", &self.type_name)
            .field("tag", &self.tag)
            .field("pointer_root", &self.root.is_some())
            .field("decoders", &self.decoders.len())
            .finish()
    }
}

pub(crate) fn erase<F>(decoder: F) -> FieldDecoder
where
    F: Fn(&mut dyn Any, &dyn Getter, ErrorMode) -> Result<bool, BindError> + Send + Sync + 'static,
{
    Box::new(decoder)
}

pub(crate) fn run_decoders(
    decoders: &[FieldDecoder],
    value: &mut dyn Any,
    getter: &dyn Getter,
    mode: ErrorMode,
) -> Result<bool, BindError> {
    let mut wrote = false;
    let mut failures = Vec::new();

    for decoder in decoders {
        match decoder(value, getter, mode) {
            Ok(written) => wrote |= written,
            Err(error) if mode == ErrorMode::Collect && error.is_field_error() => {
                failures.extend(error.into_field_errors());
            }
            Err(error) => return Err(error),
        }
    }

    if failures.is_empty() { Ok(wrote) } else { Err(BindError::Fields(failures)) }
}
