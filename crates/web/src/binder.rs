//! The request binder.
//!
//! A [`Binder`] fills a destination struct from a request in a fixed order: the `pre` sources
//! (the `default` tag), then the body, then the `post` sources (query, path, header, cookie,
//! request). Later writes win, so a query value outranks the same field in a JSON body.
//!
//! Plans are compiled on the first bind of a type and shared afterwards.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use micro_bind::{BindError, Cache, ErrorMode, FieldError, Plan, Reflect, TypeInfo, compile};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::RequestContext;
use crate::content::{ContentDecoder, JsonDecoder, merge_into};
use crate::error::WebError;
use crate::source::Source;

pub struct Binder {
    pre_sources: Vec<Source>,
    post_sources: Vec<Source>,
    content_decoders: Vec<Box<dyn ContentDecoder>>,
    fallback_decoder: Option<Box<dyn ContentDecoder>>,
    error_mode: ErrorMode,
    binders: Cache<TypeId, TypeBinder>,
}

impl Binder {
    /// A binder with the standard sources and the JSON body decoder.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> BinderBuilder {
        BinderBuilder::new()
    }

    pub fn error_mode(&self) -> ErrorMode {
        self.error_mode
    }

    /// Binds defaults, the body, then every transport source into `dest`.
    pub fn bind<T>(&self, ctx: &RequestContext<'_, '_>, dest: &mut T) -> Result<(), WebError>
    where
        T: Reflect + Serialize + DeserializeOwned,
    {
        let binder = self.type_binder::<T>()?;
        let mut failures = Vec::new();

        self.run(ctx, dest, &binder.pre, &mut failures)?;
        self.bind_body(ctx, dest)?;
        self.run(ctx, dest, &binder.post, &mut failures)?;

        finish(failures)
    }

    /// Decodes the request body into `dest` when the request carries one.
    ///
    /// Fields absent from the body keep their current value. Fields serde skips are the exception,
    /// they are reset to their `Default` whenever a body is decoded.
    pub fn bind_body<T>(&self, ctx: &RequestContext<'_, '_>, dest: &mut T) -> Result<(), WebError>
    where
        T: Serialize + DeserializeOwned,
    {
        if ctx.content_length() == 0 || !ctx.need_body() {
            return Ok(());
        }

        let headers = ctx.headers();
        let decoder = match self.content_decoders.iter().position(|decoder| decoder.can_decode(headers)) {
            Some(index) => {
                debug!(decoder = index, content_type = ctx.content_type(), "selected content decoder");
                &self.content_decoders[index]
            }
            None => match &self.fallback_decoder {
                Some(fallback) => {
                    debug!(content_type = ctx.content_type(), "selected fallback content decoder");
                    fallback
                }
                None => {
                    let content_type = ctx.content_type().unwrap_or_default();
                    warn!(content_type, "no content decoder accepts the request body");
                    return Err(WebError::unsupported_content_type(content_type));
                }
            },
        };

        let document = decoder.decode(ctx.body())?;
        merge_into(dest, document)
    }

    /// Binds defaults and every transport source into `dest`, leaving the body alone.
    pub fn bind_params<T: Reflect>(&self, ctx: &RequestContext<'_, '_>, dest: &mut T) -> Result<(), WebError> {
        let binder = self.type_binder::<T>()?;
        let mut failures = Vec::new();

        self.run(ctx, dest, &binder.pre, &mut failures)?;
        self.run(ctx, dest, &binder.post, &mut failures)?;

        finish(failures)
    }

    /// Binds only the sources whose tag is listed, in registration order.
    pub fn bind_sources<T: Reflect>(
        &self,
        ctx: &RequestContext<'_, '_>,
        dest: &mut T,
        tags: &[&str],
    ) -> Result<(), WebError> {
        let binder = self.type_binder::<T>()?;
        let selected: Vec<&SourcePlan> =
            binder.pre.iter().chain(&binder.post).filter(|plan| tags.contains(&plan.source.tag())).collect();

        let mut failures = Vec::new();
        for plan in selected {
            self.run_one(ctx, dest, plan, &mut failures)?;
        }
        finish(failures)
    }

    fn type_binder<T: Reflect>(&self) -> Result<Arc<TypeBinder>, WebError> {
        let binder = self.binders.get_or_try_insert_with(TypeId::of::<T>(), || {
            TypeBinder::compile(&T::type_info(), &self.pre_sources, &self.post_sources)
        })?;
        Ok(binder)
    }

    fn run<T: Reflect>(
        &self,
        ctx: &RequestContext<'_, '_>,
        dest: &mut T,
        plans: &[SourcePlan],
        failures: &mut Vec<FieldError>,
    ) -> Result<(), WebError> {
        for plan in plans {
            self.run_one(ctx, dest, plan, failures)?;
        }
        Ok(())
    }

    fn run_one<T: Reflect>(
        &self,
        ctx: &RequestContext<'_, '_>,
        dest: &mut T,
        plan: &SourcePlan,
        failures: &mut Vec<FieldError>,
    ) -> Result<(), WebError> {
        let getter = plan.source.getter(ctx);
        match plan.plan.decode_with(dest, &*getter, self.error_mode) {
            Ok(_) => Ok(()),
            Err(error) if self.error_mode == ErrorMode::Collect && error.is_field_error() => {
                failures.extend(error.into_field_errors());
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}

fn finish(failures: Vec<FieldError>) -> Result<(), WebError> {
    if failures.is_empty() { Ok(()) } else { Err(BindError::Fields(failures).into()) }
}

impl Default for Binder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Binder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("pre_sources", &self.pre_sources)
            .field("post_sources", &self.post_sources)
            .field("content_decoders", &self.content_decoders.len())
            .field("fallback_decoder", &self.fallback_decoder.is_some())
            .field("error_mode", &self.error_mode)
            .field("binders", &self.binders)
            .finish()
    }
}

/// The compiled plans of one destination type, one per source that binds any of its fields.
#[derive(Debug)]
struct TypeBinder {
    pre: Vec<SourcePlan>,
    post: Vec<SourcePlan>,
}

#[derive(Debug)]
struct SourcePlan {
    source: Source,
    plan: Plan,
}

impl TypeBinder {
    fn compile(info: &TypeInfo, pre: &[Source], post: &[Source]) -> Result<Self, BindError> {
        let (target, _) = info.indirect();
        if !target.is_struct() {
            return Err(BindError::unsupported_type(info.type_name()));
        }

        Ok(Self { pre: compile_sources(info, pre)?, post: compile_sources(info, post)? })
    }
}

fn compile_sources(info: &TypeInfo, sources: &[Source]) -> Result<Vec<SourcePlan>, BindError> {
    let mut plans = Vec::with_capacity(sources.len());
    for source in sources {
        let plan = compile(info, source.tag())?;
        if !plan.is_empty() {
            plans.push(SourcePlan { source: *source, plan });
        }
    }
    Ok(plans)
}

/// Configures a [`Binder`].
///
/// Starts out with the `default` pre source, the query, path, header, cookie and request post
/// sources, and the JSON content decoder.
pub struct BinderBuilder {
    pre_sources: Vec<Source>,
    post_sources: Vec<Source>,
    content_decoders: Vec<Box<dyn ContentDecoder>>,
    fallback_decoder: Option<Box<dyn ContentDecoder>>,
    error_mode: ErrorMode,
}

impl BinderBuilder {
    fn new() -> Self {
        Self {
            pre_sources: vec![Source::defaults()],
            post_sources: vec![Source::query(), Source::path(), Source::header(), Source::cookie(), Source::request()],
            content_decoders: vec![Box::new(JsonDecoder)],
            fallback_decoder: None,
            error_mode: ErrorMode::default(),
        }
    }

    /// Adds a source that runs before the body.
    #[must_use]
    pub fn pre_source(mut self, source: Source) -> Self {
        self.pre_sources.push(source);
        self
    }

    /// Adds a source that runs after the body and the standard sources.
    #[must_use]
    pub fn post_source(mut self, source: Source) -> Self {
        self.post_sources.push(source);
        self
    }

    /// Adds a body decoder, tried after the ones already registered.
    #[must_use]
    pub fn content_decoder<D: ContentDecoder + 'static>(mut self, decoder: D) -> Self {
        self.content_decoders.push(Box::new(decoder));
        self
    }

    /// The decoder used when no registered decoder accepts the request.
    #[must_use]
    pub fn fallback_decoder<D: ContentDecoder + 'static>(mut self, decoder: D) -> Self {
        self.fallback_decoder = Some(Box::new(decoder));
        self
    }

    #[must_use]
    pub fn error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = error_mode;
        self
    }

    pub fn build(self) -> Binder {
        Binder {
            pre_sources: self.pre_sources,
            post_sources: self.post_sources,
            content_decoders: self.content_decoders,
            fallback_decoder: self.fallback_decoder,
            error_mode: self.error_mode,
            binders: Cache::new(),
        }
    }
}

impl fmt::Debug for BinderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinderBuilder")
            .field("pre_sources", &self.pre_sources)
            .field("post_sources", &self.post_sources)
            .field("content_decoders", &self.content_decoders.len())
            .field("fallback_decoder", &self.fallback_decoder.is_some())
            .field("error_mode", &self.error_mode)
            .finish()
    }
}
