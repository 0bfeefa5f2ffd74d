#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use http_body_util::BodyExt;
use tower::ServiceExt;
use tower_sessions::SessionManagerLayer;
use uuid::Uuid;

use wanderworld_api::geocode::Geocoder;
use wanderworld_api::routes::{App, router, with_method_override};
use wanderworld_api::AppStateInner;
use wanderworld_db::{Database, SqliteSessionStore};
use wanderworld_types::models::GeoPoint;

pub const PASSWORD: &str = "correct horse battery";

/// Geocoder that always answers with the same point and remembers queries.
#[derive(Default)]
pub struct FixedGeocoder {
    pub queries: Mutex<Vec<String>>,
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn forward(&self, query: &str) -> anyhow::Result<Option<GeoPoint>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(Some(GeoPoint { lng: 77.2, lat: 28.6 }))
    }
}

pub struct TestApp {
    pub app: App,
    pub db: Arc<Database>,
    pub geocoder: Arc<FixedGeocoder>,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let geocoder = Arc::new(FixedGeocoder::default());
        let state = Arc::new(AppStateInner {
            db: db.clone(),
            geocoder: geocoder.clone(),
            map_token: Some("test-token".into()),
        });

        let sessions = SessionManagerLayer::new(SqliteSessionStore::new(db.clone())).with_secure(false);
        let public_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../public");
        let app = with_method_override(router(state, &public_dir).layer(sessions));

        Self { app, db, geocoder }
    }

    /// A browser with its own cookie jar.
    pub fn browser(&self) -> Browser {
        Browser {
            app: self.app.clone(),
            cookie: None,
        }
    }

    /// Registers `username` and returns a browser logged in as them.
    pub async fn member(&self, username: &str) -> (Browser, Uuid) {
        let mut browser = self.browser();
        let res = browser
            .post_form(
                "/signup",
                &[
                    ("username", username),
                    ("email", &format!("{username}@example.com")),
                    ("password", PASSWORD),
                ],
            )
            .await;
        assert_eq!(location(&res), "/listings");

        let user = self.db.get_user_by_username(username).unwrap().unwrap();
        (browser, user.id.parse().unwrap())
    }
}

pub struct Browser {
    app: App,
    cookie: Option<String>,
}

impl Browser {
    pub async fn send(&mut self, mut req: Request<Body>) -> Response<Body> {
        req.headers_mut()
            .insert(header::HOST, "localhost".parse().unwrap());
        if let Some(cookie) = &self.cookie {
            req.headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let res = self.app.clone().oneshot(req).await.unwrap();

        if let Some(set) = res.headers().get(header::SET_COOKIE) {
            let pair = set.to_str().unwrap().split(';').next().unwrap().to_string();
            self.cookie = Some(pair);
        }
        res
    }

    pub async fn get(&mut self, uri: &str) -> Response<Body> {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> Response<Body> {
        self.send(form_request(uri, fields, None)).await
    }

    pub async fn post_form_from(
        &mut self,
        uri: &str,
        fields: &[(&str, &str)],
        referer: &str,
    ) -> Response<Body> {
        self.send(form_request(uri, fields, Some(referer))).await
    }

    /// GETs `uri` and returns the rendered HTML.
    pub async fn page(&mut self, uri: &str) -> String {
        let res = self.get(uri).await;
        assert_eq!(res.status(), StatusCode::OK, "GET {uri}");
        body_text(res).await
    }
}

fn form_request(uri: &str, fields: &[(&str, &str)], referer: Option<&str>) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(referer) = referer {
        builder = builder.header(header::REFERER, referer);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Minimal form encoding: enough for the characters the tests use.
fn encode(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => c.to_string(),
            ' ' => "+".to_string(),
            other => {
                let mut buf = [0u8; 4];
                other
                    .encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{b:02X}"))
                    .collect()
            }
        })
        .collect()
}

pub fn location(res: &Response<Body>) -> String {
    assert!(res.status().is_redirection(), "expected redirect, got {}", res.status());
    res.headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

pub async fn body_text(res: Response<Body>) -> String {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn cabin<'a>() -> Vec<(&'a str, &'a str)> {
    vec![
        ("listing[title]", "Cabin"),
        ("listing[description]", "A quiet cabin in the woods"),
        ("listing[price]", "100"),
        ("listing[location]", "X"),
        ("listing[country]", "Y"),
    ]
}
