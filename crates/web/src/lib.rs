//! A small web layer around tag driven request binding.
//!
//! Handlers receive a [`RequestContext`] and bind request data into their own structs:
//!
//! ```
//! use bytes::Bytes;
//! use http::{Request, StatusCode};
//! use micro_bind::Bind;
//! use micro_web::router::{Router, get};
//! use micro_web::{RequestContext, WebApp, WebError, handler_fn};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Bind, Debug, Default, Serialize, Deserialize)]
//! struct Page {
//!     #[bind(query = "page", default = "1")]
//!     pub page: u32,
//! }
//!
//! fn list(req: &RequestContext<'_, '_>) -> Result<String, WebError> {
//!     let mut page = Page::default();
//!     req.bind(&mut page)?;
//!     Ok(format!("page {}", page.page))
//! }
//!
//! let router = Router::builder().route("/items", get(handler_fn(list))).build().unwrap();
//! let app = WebApp::builder().router(router).build().unwrap();
//!
//! let response = app.handle(Request::get("/items?page=3").body(Bytes::new()).unwrap());
//! assert_eq!(response.status(), StatusCode::OK);
//! assert_eq!(response.body(), "page 3");
//! ```

mod app;
mod binder;
mod content;
mod decorator;
mod error;
mod handler;
mod request;
mod responder;
mod source;
mod validation;

pub mod router;

pub use app::{WebApp, WebAppBuildError, WebAppBuilder};
pub use binder::{Binder, BinderBuilder};
pub use content::{ContentDecoder, FnDecoder, JsonDecoder, fn_decoder};
pub use decorator::{Decorator, DecoratorComposer, DecoratorExt, IdentityDecorator};
pub use error::{DefaultErrorHandler, ErrorHandler, WebError};
pub use handler::{FnHandler, RequestHandler, handler_fn};
pub use request::{PathParams, QueryValues, RequestContext};
pub use responder::{Json, Responder};
pub use source::{GetterFactory, RequestGetter, Source};
pub use validation::{Validate, ValidationError, ValidationErrors};
