//! Integration test harness for Delicious.
//!
//! Drives the full router (sessions, request IDs, static files, every route)
//! in-process with `tower::ServiceExt::oneshot`, against in-memory
//! repositories and an in-memory session store. No database is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p delicious-integration-tests
//! ```
//!
//! Each [`TestApp`] is an isolated site; each [`Client`] is one browser with
//! its own session cookie.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use tempfile::TempDir;
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use delicious_web::config::WebConfig;
use delicious_web::db::Repos;
use delicious_web::middleware::session_layer;
use delicious_web::models::Store;
use delicious_web::state::AppState;

const BOUNDARY: &str = "----delicious-test-boundary";

/// A running site.
pub struct TestApp {
    router: Router,
    state: AppState,
    /// Where uploaded photos land.
    pub uploads: TempDir,
}

impl TestApp {
    /// A fresh site with empty repositories.
    #[must_use]
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let uploads_dir = uploads.path().display().to_string();
        let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../web/static");

        let config = WebConfig::from_lookup(|key| match key {
            "DELICIOUS_DATABASE_URL" => Some("postgres://localhost/unused".to_owned()),
            "DELICIOUS_BASE_URL" => Some("http://localhost:7777".to_owned()),
            "DELICIOUS_UPLOADS_DIR" => Some(uploads_dir.clone()),
            "DELICIOUS_STATIC_DIR" => Some(static_dir.to_owned()),
            _ => None,
        })
        .unwrap();

        let state = AppState::new(config, Repos::in_memory());
        let router = delicious_web::app(state.clone(), session_layer(MemoryStore::default(), false));

        Self {
            router,
            state,
            uploads,
        }
    }

    /// A new browser with no cookies.
    #[must_use]
    pub fn client(&self) -> Client {
        Client {
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Repositories behind the site, for looking things up directly.
    #[must_use]
    pub fn repos(&self) -> &Repos {
        self.state.repos()
    }

    /// Fetch a store by slug straight from the repository.
    pub async fn store(&self, slug: &str) -> Store {
        self.repos()
            .stores
            .find_by_slug(slug)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("no store with slug {slug}"))
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// A response with its body read.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl TestResponse {
    /// The body parsed as JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// One browser: carries the session cookie between requests.
pub struct Client {
    router: Router,
    cookie: Option<String>,
}

impl Client {
    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.send(Request::get(uri), Body::empty()).await
    }

    /// POST with an empty body.
    pub async fn post(&mut self, uri: &str) -> TestResponse {
        self.send(Request::post(uri), Body::empty()).await
    }

    /// POST an url-encoded form.
    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        self.send(builder, Body::from(body)).await
    }

    /// POST a `multipart/form-data` store form, optionally with a photo.
    pub async fn post_multipart(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        photo: Option<(&str, &[u8])>,
    ) -> TestResponse {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((content_type, bytes)) = photo {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"photo\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        self.send(builder, Body::from(body)).await
    }

    /// Register (which also logs in).
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> TestResponse {
        self.post_form(
            "/register",
            &[
                ("name", name),
                ("email", email),
                ("password", password),
                ("password-confirm", password),
            ],
        )
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        self.post_form("/login", &[("email", email), ("password", password)])
            .await
    }

    /// Submit the add-store form with the usual fields.
    pub async fn add_store(&mut self, name: &str, tags: &[&str]) -> TestResponse {
        let mut fields = vec![
            ("name", name),
            ("description", "A lovely place for coffee and wings"),
            ("address", "1 Main St"),
            ("lng", "-79.38"),
            ("lat", "43.65"),
        ];
        fields.extend(tags.iter().map(|t| ("tags", *t)));
        self.post_multipart("/add", &fields, None).await
    }

    async fn send(&mut self, mut builder: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_owned());
        }

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_owned());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        TestResponse {
            status,
            location,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}
