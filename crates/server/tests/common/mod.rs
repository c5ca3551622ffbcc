//! Shared harness for router tests.
//!
//! Builds the full application router over in-memory stores and drives it
//! with `tower::ServiceExt::oneshot`.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header::CONTENT_TYPE},
};
use serde_json::Value;
use tower::ServiceExt;

use little_threads_server::db::{DocumentStore, MemoryAccountStore, MemoryDocumentStore};
use little_threads_server::middleware::CALLER_HEADER;
use little_threads_server::routes;
use little_threads_server::services::{AccountService, AdminGrant, Registration};
use little_threads_server::state::AppState;
use little_threads_server::storage::{MemoryObjectStore, ObjectStore};

pub const IMAGE_BASE: &str = "http://127.0.0.1:10000/devstoreaccount1/product-images/";

const BOUNDARY: &str = "little-threads-test-boundary";

pub struct TestApp {
    pub router: Router,
    pub accounts: Arc<MemoryAccountStore>,
    pub objects: Arc<MemoryObjectStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let objects = memory_objects();
        Self::with_stores(
            Arc::new(MemoryDocumentStore::new()),
            Arc::clone(&objects),
            objects,
        )
    }

    /// Build over a custom document or object store. `objects` is the
    /// memory store backing `object_store`, kept for inspection.
    pub fn with_stores(
        documents: Arc<dyn DocumentStore>,
        objects: Arc<MemoryObjectStore>,
        object_store: Arc<dyn ObjectStore>,
    ) -> Self {
        let accounts = Arc::new(MemoryAccountStore::new());
        let state = AppState::new(accounts.clone(), documents, object_store);
        Self {
            router: routes::app(state),
            accounts,
            objects,
        }
    }

    /// Create an admin account and return its id.
    pub async fn admin(&self) -> String {
        let service = AccountService::new(self.accounts.clone());
        let grant = service
            .ensure_admin(registration("admin@littlethreads.test", None))
            .await
            .unwrap();
        let AdminGrant::Created(id) = grant else {
            panic!("expected a new admin account, got {grant:?}");
        };
        id.to_string()
    }

    /// Register a standard account and return its id.
    pub async fn shopper(&self, email: &str) -> String {
        let service = AccountService::new(self.accounts.clone());
        service
            .register(registration(email, None))
            .await
            .unwrap()
            .to_string()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    /// Create a product as `caller` and return its JSON response body.
    pub async fn create_product(&self, caller: &str, parts: &[Part<'_>]) -> Value {
        let (status, body) = self
            .send(multipart_request(Method::POST, "/api/add-product", Some(caller), parts))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }

    pub async fn list(&self, query: &str) -> Vec<Value> {
        let uri = if query.is_empty() {
            "/api/products".to_owned()
        } else {
            format!("/api/products?{query}")
        };
        let (status, body) = self.send(get(&uri)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["products"].as_array().unwrap().clone()
    }
}

pub fn memory_objects() -> Arc<MemoryObjectStore> {
    Arc::new(MemoryObjectStore::new(IMAGE_BASE).unwrap())
}

pub fn registration(email: &str, phone: Option<&str>) -> Registration {
    Registration {
        first_name: "Robin".to_owned(),
        last_name: "Tailor".to_owned(),
        email: email.to_owned(),
        phone: phone.map(str::to_owned),
        password: "sew-it-together-42".to_owned(),
    }
}

/// One multipart form field.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// A product form with the given image and list fields as JSON arrays.
pub fn product_form<'a>(
    price: &'a str,
    categories: &'a str,
    age_groups: &'a str,
    file_name: &'a str,
    content: &'a [u8],
) -> Vec<Part<'a>> {
    vec![
        Part::Text("price", price),
        Part::Text("categories", categories),
        Part::Text("ageGroups", age_groups),
        Part::File("itemImage", file_name, content),
    ]
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, content) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn with_caller(
    builder: axum::http::request::Builder,
    caller: Option<&str>,
) -> axum::http::request::Builder {
    match caller {
        Some(id) => builder.header(CALLER_HEADER, id),
        None => builder,
    }
}

pub fn multipart_request(
    method: Method,
    uri: &str,
    caller: Option<&str>,
    parts: &[Part<'_>],
) -> Request<Body> {
    with_caller(Request::builder().method(method).uri(uri), caller)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, caller: Option<&str>, body: &Value) -> Request<Body> {
    with_caller(Request::builder().method(method).uri(uri), caller)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn delete(uri: &str, caller: Option<&str>) -> Request<Body> {
    with_caller(Request::builder().method(Method::DELETE).uri(uri), caller)
        .body(Body::empty())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
