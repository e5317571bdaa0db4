//! Tag-driven binding of request values into plain structs.
//!
//! A struct describes its fields through `#[derive(Bind)]`. For every tag key (`query`, `header`,
//! ...) the fields are compiled once into a [`Plan`], which then copies values from any [`Getter`]
//! into instances of that struct, parsing them on the way.
//!
//! ```
//! use std::collections::HashMap;
//!
//! use micro_bind::{Bind, PlanCache};
//!
//! #[derive(Bind, Debug, Default)]
//! struct Page {
//!     #[bind(query = "q")]
//!     pub term: String,
//!     #[bind(query = "size", default = "20")]
//!     pub size: u32,
//!     #[bind(query = "tags,comma-delimited")]
//!     pub tags: Vec<String>,
//! }
//!
//! let plans = PlanCache::new();
//!
//! let mut query = HashMap::new();
//! query.insert("q".to_owned(), vec!["rust".to_owned()]);
//! query.insert("tags".to_owned(), vec!["web,http".to_owned()]);
//!
//! let mut page = Page::default();
//! let plan = plans.get_or_compile_for::<Page>("query").unwrap();
//! plan.decode(&mut page, &query).unwrap();
//!
//! assert_eq!(page.term, "rust");
//! assert_eq!(page.tags, vec!["web", "http"]);
//! ```
//!
//! Only `pub` fields are bound. Supported field types are `bool`, `String`, every integer and
//! float type, structs deriving [`Bind`], `Option` of any of those, `Vec<String>`, `Vec<u8>`,
//! `Vec` of the other integer types, and types decoded from text through [`TextDecode`] (and
//! `Vec`s of them).

extern crate self as micro_bind;

mod cache;
mod compile;
mod decode;
mod error;
mod getter;
mod plan;
mod reflect;
mod tag;
mod text;

pub use cache::{Cache, PlanCache};
pub use compile::{compile, compile_for};
pub use error::{BindError, FieldError, TextDecodeError};
pub use getter::{CookieGetter, DefaultsGetter, Getter, LookupGetter};
pub use plan::{ErrorMode, Plan};
pub use reflect::{FieldInfo, FloatWidth, IntWidth, Kind, PointerInfo, Reflect, SliceInfo, StructInfo, TextHook, TypeInfo};
pub use tag::{COOKIE_TAG, DEFAULT_TAG, HEADER_TAG, PATH_TAG, QUERY_TAG, REQUEST_TAG, parse_tag, resolve_delimiter};
pub use text::TextDecode;

/// Derives [`Reflect`] for a struct with named fields.
///
/// Field attributes: `#[bind(<tag> = "<name>[,options]", ...)]` with any tag key, and
/// `#[bind(skip)]` for `pub` fields the binder must ignore. The container attribute
/// `#[bind(crate = "path")]` points the generated code at a re-exported `micro_bind`.
pub use micro_bind_macros::Bind;
