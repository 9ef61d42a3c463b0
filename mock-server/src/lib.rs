//! In-memory stand-in for the platform's public REST API.
//!
//! Serves app items (search, CRUD, statuses), business process instances
//! and disk files/directories with the same paths and `{success, error}`
//! envelopes as the real service. Every API route requires
//! `Authorization: Bearer <token>`; download links do not.

pub mod query;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::debug;
use uuid::Uuid;

use crate::query::ListQuery;

type AppKey = (String, String);
type Reply = (StatusCode, Json<Value>);

/// Statuses every app is configured with: `(id, code, name)`.
const STATUSES: [(i64, &str, &str); 2] = [(1, "st1", "New"), (2, "st2", "Done")];

#[derive(Default)]
struct Store {
    apps: HashMap<AppKey, Vec<Value>>,
    instances: HashMap<String, Value>,
    directories: HashMap<String, Value>,
    files: HashMap<String, StoredFile>,
}

struct StoredFile {
    meta: Value,
    data: Vec<u8>,
}

/// Shared state of the fake platform. Cloning shares the store.
#[derive(Clone)]
pub struct Platform {
    token: Arc<str>,
    store: Arc<RwLock<Store>>,
}

impl Platform {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.into(),
            store: Arc::default(),
        }
    }

    /// Store `items` in app `namespace/code`, assigning `__id` and
    /// `__index` where missing.
    pub fn seed_items(&self, namespace: &str, code: &str, items: impl IntoIterator<Item = Value>) {
        let mut store = self.store.write();
        let list = store.apps.entry((namespace.to_string(), code.to_string())).or_default();
        for mut item in items {
            stamp_new_item(&mut item, list.len());
            list.push(item);
        }
    }

    pub fn add_directory(&self, id: &str, name: &str) {
        let dir = json!({"__id": id, "__name": name, "system": false, "directory": "", "parentsList": []});
        self.store.write().directories.insert(id.to_string(), dir);
    }

    pub fn add_file(&self, id: &str, name: &str, directory: &str, data: &[u8]) {
        let meta = file_meta(id, name, directory, data.len());
        self.store.write().files.insert(
            id.to_string(),
            StoredFile {
                meta,
                data: data.to_vec(),
            },
        );
    }

    fn status_code_of(item: &Value) -> Option<String> {
        let status = item["__status"]["status"].as_i64()?;
        STATUSES
            .iter()
            .find(|(id, _, _)| *id == status)
            .map(|(_, code, _)| code.to_string())
    }
}

pub fn app(platform: Platform) -> Router {
    let api = Router::new()
        .route("/pub/v1/app/{ns}/{code}/list", post(list_items))
        .route("/pub/v1/app/{ns}/{code}/create", post(create_item))
        .route("/pub/v1/app/{ns}/{code}/settings/status", get(status_info))
        .route("/pub/v1/app/{ns}/{code}/{id}/get", get(get_item))
        .route("/pub/v1/app/{ns}/{code}/{id}/update", post(update_item))
        .route("/pub/v1/app/{ns}/{code}/{id}/set-status", post(set_status))
        .route("/pub/v1/bpm/template/{ns}/{code}/run", post(run_process))
        .route("/pub/v1/bpm/instance/{id}/get", get(get_instance))
        .route("/pub/v1/disk/file/{id}/get-link", get(get_link))
        .route("/pub/v1/disk/directory/{id}", get(directory_info))
        .route("/pub/v1/disk/directory/{id}/upload", post(upload_file))
        .route_layer(middleware::from_fn_with_state(platform.clone(), require_token));

    Router::new()
        .merge(api)
        .route("/download/{id}", get(download_file))
        .with_state(platform)
}

pub async fn run(listener: TcpListener, platform: Platform) -> Result<(), std::io::Error> {
    axum::serve(listener, app(platform)).await
}

async fn require_token(State(platform): State<Platform>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", platform.token);
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if presented != Some(expected.as_str()) {
        return failure(StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }
    next.run(request).await
}

fn success(body: Value) -> Reply {
    let mut envelope = Map::new();
    envelope.insert("success".to_string(), Value::Bool(true));
    envelope.insert("error".to_string(), Value::String(String::new()));
    if let Value::Object(fields) = body {
        envelope.extend(fields);
    }
    (StatusCode::OK, Json(Value::Object(envelope)))
}

fn failure(status: StatusCode, error: &str) -> Reply {
    (status, Json(json!({"success": false, "error": error})))
}

fn stamp_new_item(item: &mut Value, index: usize) {
    if let Value::Object(fields) = item {
        fields
            .entry("__id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        fields.entry("__index").or_insert_with(|| json!(index + 1));
        fields
            .entry("__status")
            .or_insert_with(|| json!({"order": 0, "status": STATUSES[0].0}));
    }
}

fn file_meta(id: &str, name: &str, directory: &str, size: usize) -> Value {
    json!({
        "__id": id,
        "__name": name,
        "originalName": name,
        "directory": directory,
        "size": size,
        "version": 1
    })
}

#[derive(Deserialize)]
struct ContextRequest {
    context: Value,
}

#[derive(Deserialize)]
struct SetStatusRequest {
    status: StatusCodeField,
}

#[derive(Deserialize)]
struct StatusCodeField {
    code: String,
}

async fn list_items(
    State(platform): State<Platform>,
    Path((ns, code)): Path<(String, String)>,
    Json(query): Json<ListQuery>,
) -> Reply {
    let store = platform.store.read();
    let items = store.apps.get(&(ns, code)).map(Vec::as_slice).unwrap_or_default();
    let matched = query.matching(items, Platform::status_code_of);
    let total = matched.len();
    let page: Vec<&Value> = matched.into_iter().skip(query.from).take(query.size).collect();
    debug!(from = query.from, size = query.size, total, "list");
    success(json!({"result": {"result": page, "total": total}}))
}

async fn create_item(
    State(platform): State<Platform>,
    Path((ns, code)): Path<(String, String)>,
    Json(input): Json<ContextRequest>,
) -> Reply {
    let Value::Object(_) = input.context else {
        return failure(StatusCode::BAD_REQUEST, "context must be an object");
    };
    let mut item = input.context;
    let mut store = platform.store.write();
    let list = store.apps.entry((ns, code)).or_default();
    stamp_new_item(&mut item, list.len());
    list.push(item.clone());
    success(json!({"item": item}))
}

async fn get_item(State(platform): State<Platform>, Path((ns, code, id)): Path<(String, String, String)>) -> Reply {
    let store = platform.store.read();
    let found = store
        .apps
        .get(&(ns, code))
        .and_then(|items| items.iter().find(|item| item["__id"] == id.as_str()));
    match found {
        Some(item) => success(json!({"item": item})),
        None => failure(StatusCode::NOT_FOUND, "item not found"),
    }
}

async fn update_item(
    State(platform): State<Platform>,
    Path((ns, code, id)): Path<(String, String, String)>,
    Json(input): Json<ContextRequest>,
) -> Reply {
    let mut store = platform.store.write();
    let found = store
        .apps
        .get_mut(&(ns, code))
        .and_then(|items| items.iter_mut().find(|item| item["__id"] == id.as_str()));
    let Some(item) = found else {
        return failure(StatusCode::NOT_FOUND, "item not found");
    };
    if let (Value::Object(target), Value::Object(changes)) = (&mut *item, input.context) {
        for (key, value) in changes {
            if !key.starts_with("__") || key == "__name" {
                target.insert(key, value);
            }
        }
    }
    success(json!({"item": item}))
}

async fn set_status(
    State(platform): State<Platform>,
    Path((ns, code, id)): Path<(String, String, String)>,
    Json(input): Json<SetStatusRequest>,
) -> Reply {
    let Some(&(status_id, _, _)) = STATUSES.iter().find(|(_, c, _)| *c == input.status.code) else {
        return failure(StatusCode::BAD_REQUEST, "status not found");
    };
    let mut store = platform.store.write();
    let found = store
        .apps
        .get_mut(&(ns, code))
        .and_then(|items| items.iter_mut().find(|item| item["__id"] == id.as_str()));
    let Some(item) = found else {
        return failure(StatusCode::NOT_FOUND, "item not found");
    };
    item["__status"] = json!({"order": status_id - 1, "status": status_id});
    success(json!({"item": item}))
}

async fn status_info() -> Reply {
    let items: Vec<Value> = STATUSES
        .iter()
        .map(|(id, code, name)| json!({"id": id, "name": name, "code": code, "groupId": ""}))
        .collect();
    success(json!({"statusItems": items, "groupItems": []}))
}

async fn run_process(
    State(platform): State<Platform>,
    Path((ns, code)): Path<(String, String)>,
    Json(input): Json<ContextRequest>,
) -> Reply {
    let Value::Object(mut context) = input.context else {
        return failure(StatusCode::BAD_REQUEST, "context must be an object");
    };
    let id = Uuid::new_v4().to_string();
    let template_id = Uuid::new_v4().to_string();
    context.insert("__id".to_string(), json!(id));
    context.insert("__name".to_string(), json!(code));
    context.insert("__state".to_string(), json!("exec"));
    context.insert("__templateId".to_string(), json!(template_id));
    context.insert(
        "__template".to_string(),
        json!({"id": template_id, "name": code, "namespace": ns, "code": code, "version": 1}),
    );
    let context = Value::Object(context);
    platform.store.write().instances.insert(id, context.clone());
    success(json!({"context": context}))
}

async fn get_instance(State(platform): State<Platform>, Path(id): Path<String>) -> Reply {
    match platform.store.read().instances.get(&id) {
        Some(context) => success(json!({"context": context})),
        None => failure(StatusCode::NOT_FOUND, "instance not found"),
    }
}

async fn get_link(State(platform): State<Platform>, Path(id): Path<String>, headers: HeaderMap) -> Reply {
    if !platform.store.read().files.contains_key(&id) {
        return failure(StatusCode::NOT_FOUND, "file not found");
    }
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    success(json!({"link": format!("http://{host}/download/{id}")}))
}

async fn download_file(State(platform): State<Platform>, Path(id): Path<String>) -> Response {
    match platform.store.read().files.get(&id) {
        Some(file) => (StatusCode::OK, file.data.clone()).into_response(),
        None => (StatusCode::NOT_FOUND, "file not found").into_response(),
    }
}

async fn directory_info(State(platform): State<Platform>, Path(id): Path<String>) -> Reply {
    match platform.store.read().directories.get(&id) {
        Some(dir) => success(json!({"directory": dir})),
        None => failure(StatusCode::NOT_FOUND, "directory not found"),
    }
}

async fn upload_file(
    State(platform): State<Platform>,
    Path(directory): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> Reply {
    if !params.contains_key("hash") {
        return failure(StatusCode::BAD_REQUEST, "hash is required");
    }
    if !platform.store.read().directories.contains_key(&directory) {
        return failure(StatusCode::NOT_FOUND, "directory not found");
    }

    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return failure(StatusCode::BAD_REQUEST, &e.body_text()),
        };
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("file").to_string();
        match field.bytes().await {
            Ok(data) => upload = Some((name, data)),
            Err(e) => return failure(StatusCode::BAD_REQUEST, &e.body_text()),
        }
    }
    let Some((name, data)) = upload else {
        return failure(StatusCode::BAD_REQUEST, "file field is required");
    };

    let id = Uuid::new_v4().to_string();
    let meta = file_meta(&id, &name, &directory, data.len());
    platform.store.write().files.insert(
        id,
        StoredFile {
            meta: meta.clone(),
            data: data.to_vec(),
        },
    );
    success(json!({"file": meta}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_items_get_ids_and_default_status() {
        let platform = Platform::new("t");
        platform.seed_items("goods", "goods", [json!({"__name": "a"}), json!({"__id": "fixed", "__name": "b"})]);
        let store = platform.store.read();
        let items = &store.apps[&("goods".to_string(), "goods".to_string())];
        assert_eq!(items[0]["__id"].as_str().unwrap().len(), 36);
        assert_eq!(items[1]["__id"], "fixed");
        assert_eq!(items[1]["__index"], 2);
        assert_eq!(Platform::status_code_of(&items[0]).as_deref(), Some("st1"));
    }

    #[test]
    fn success_merges_body_into_envelope() {
        let (status, Json(body)) = success(json!({"link": "x"}));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "error": "", "link": "x"}));
    }
}
