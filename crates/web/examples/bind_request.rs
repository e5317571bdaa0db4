//! Serves a few in-memory requests through a [`WebApp`] and logs the responses.
//!
//! The subscriber logs at DEBUG, so plan compilation and decoder selection show up too.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE};
use http::{Request, StatusCode};
use micro_bind::{Bind, TextDecode, TextDecodeError, reflect_text};
use micro_web::router::{Router, get, post};
use micro_web::{Json, RequestContext, Validate, ValidationError, ValidationErrors, WebApp, WebError, handler_fn};
use serde::{Deserialize, Serialize};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Priority {
    #[default]
    Normal,
    Urgent,
}

impl TextDecode for Priority {
    fn decode_text(&mut self, text: &[u8]) -> Result<(), TextDecodeError> {
        *self = match text {
            b"normal" => Priority::Normal,
            b"urgent" => Priority::Urgent,
            _ => return Err(TextDecodeError::new("expected normal or urgent")),
        };
        Ok(())
    }
}

reflect_text!(Priority);

#[derive(Bind, Debug, Default, Serialize, Deserialize)]
struct CreateTicket {
    #[bind(path = "project")]
    pub project: String,
    pub title: String,
    #[bind(query = "priority", default = "normal")]
    pub priority: Priority,
    #[bind(query = "labels,delimiter=comma")]
    pub labels: Vec<String>,
    #[bind(header = "x-request-id")]
    pub request_id: Option<Uuid>,
    #[bind(cookie = "session")]
    pub session: String,
    #[bind(request = "remote-addr")]
    pub client: String,
}

impl Validate for CreateTicket {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.title.trim().is_empty() {
            errors.add(ValidationError::new("title", "title is required", "required"));
        }
        if self.session.is_empty() {
            errors.add(ValidationError::new("session", "a session cookie is required", "required"));
        }
        errors.into_result()
    }
}

fn create_ticket(req: &RequestContext<'_, '_>) -> Result<(StatusCode, Json<CreateTicket>), WebError> {
    let mut ticket = CreateTicket::default();
    req.bind(&mut ticket)?;
    req.validate(&ticket)?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[derive(Bind, Debug, Default)]
struct ListTickets {
    #[bind(path = "project")]
    pub project: String,
    #[bind(query = "page", default = "1")]
    pub page: u32,
    #[bind(query = "size", default = "20")]
    pub size: u16,
}

fn list_tickets(req: &RequestContext<'_, '_>) -> Result<String, WebError> {
    let mut query = ListTickets::default();
    req.bind_params(&mut query)?;
    Ok(format!("project {} page {} size {}", query.project, query.page, query.size))
}

fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let router = Router::builder()
        .route("/projects/{project}/tickets", post(handler_fn(create_ticket)))
        .route("/projects/{project}/tickets", get(handler_fn(list_tickets)))
        .build()
        .expect("routes are valid");
    let app = WebApp::builder().router(router).build().expect("a router is set");

    let requests = [
        Request::post("/projects/micro/tickets?priority=urgent&labels=bug,binder")
            .header(CONTENT_TYPE, "application/json")
            .header("x-request-id", "4f1c2d9e-7a43-4c2e-9a1f-0b6f3c1d2e7a")
            .header("x-forwarded-for", "10.0.0.7")
            .header(COOKIE, "session=s3cr3t")
            .body(Bytes::from_static(br#"{"title": "plans are compiled twice"}"#)),
        Request::post("/projects/micro/tickets?priority=someday")
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from_static(br#"{"title": "bad priority"}"#)),
        Request::post("/projects/micro/tickets").header(COOKIE, "session=s3cr3t").body(Bytes::new()),
        Request::get("/projects/micro/tickets?page=2").body(Bytes::new()),
        Request::get("/projects/micro/tickets?size=70000").body(Bytes::new()),
        Request::delete("/projects/micro/tickets").body(Bytes::new()),
    ];

    for request in requests {
        let request = request.expect("requests are valid");
        let line = format!("{} {}", request.method(), request.uri());
        let response = app.handle(request);
        info!(request = %line, status = %response.status(), body = %String::from_utf8_lossy(response.body()), "served");
    }
}
