//! In-process fake of the platform for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::search::PAGE_UNIT;
use crate::transport::Transport;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub n: i64,
    #[serde(default)]
    pub name: String,
}

/// Serves `/list` from a numbered item set and everything else from a
/// queue of canned responses. Records every request it receives.
#[derive(Default)]
pub struct FakePlatform {
    items: Vec<Item>,
    reported_total: Mutex<Option<usize>>,
    fail_at: Mutex<Option<usize>>,
    reject_at: Mutex<Option<(usize, String)>>,
    cancel_at: Mutex<Option<(usize, CancellationToken)>>,
    canned: Mutex<VecDeque<HttpResponse>>,
    sent: Mutex<Vec<HttpRequest>>,
}

impl FakePlatform {
    pub fn with_items(count: usize) -> Arc<Self> {
        let items = (0..count)
            .map(|n| Item {
                n: n as i64,
                name: format!("item-{n}"),
            })
            .collect();
        Arc::new(Self {
            items,
            ..Default::default()
        })
    }

    /// Report `total` instead of the real item count.
    pub fn report_total(&self, total: usize) {
        *self.reported_total.lock() = Some(total);
    }

    /// Fail the page request at offset `from` with a transport error.
    pub fn fail_page_at(&self, from: usize) {
        *self.fail_at.lock() = Some(from);
    }

    /// Answer the page request at offset `from` with `success: false`.
    pub fn reject_page_at(&self, from: usize, error: &str) {
        *self.reject_at.lock() = Some((from, error.to_string()));
    }

    /// Cancel `token` while serving the page request at offset `from`.
    /// The page itself is still answered.
    pub fn cancel_on_page(&self, from: usize, token: CancellationToken) {
        *self.cancel_at.lock() = Some((from, token));
    }

    /// Queue a response for the next request, whatever its URL.
    pub fn respond(&self, status: u16, body: &str) {
        self.canned.lock().push_back(HttpResponse {
            status,
            reason: String::new(),
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        });
    }

    pub fn sent(&self) -> Vec<HttpRequest> {
        self.sent.lock().clone()
    }

    /// Bodies of every search request received.
    pub fn requests(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter(|r| r.url.ends_with("/list"))
            .filter_map(|r| serde_json::from_slice(r.body.as_deref()?).ok())
            .collect()
    }

    /// Offsets of the full-size page requests received, in arrival order.
    pub fn page_fetches(&self) -> Vec<usize> {
        self.requests()
            .iter()
            .filter(|body| body["size"] == PAGE_UNIT)
            .filter_map(|body| body["from"].as_u64())
            .map(|from| from as usize)
            .collect()
    }

    fn list(&self, body: &Value) -> Result<HttpResponse, ApiError> {
        let from = body["from"].as_u64().unwrap_or(0) as usize;
        let size = body["size"].as_u64().unwrap_or(0) as usize;

        if *self.fail_at.lock() == Some(from) && size > 0 {
            return Err(ApiError::send("connection reset by peer"));
        }
        if let Some((at, error)) = self.reject_at.lock().clone() {
            if at == from && size > 0 {
                return Ok(ok(json!({"success": false, "error": error})));
            }
        }

        if let Some((at, token)) = self.cancel_at.lock().as_ref() {
            if *at == from && size > 0 {
                token.cancel();
            }
        }

        let page: Vec<&Item> = self.items.iter().skip(from).take(size).collect();
        let total = self.reported_total.lock().unwrap_or(self.items.len());
        Ok(ok(json!({
            "success": true,
            "error": "",
            "result": {"result": page, "total": total}
        })))
    }
}

fn ok(body: Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        reason: "OK".to_string(),
        headers: Vec::new(),
        body: body.to_string().into_bytes(),
    }
}

impl Transport for FakePlatform {
    fn send(&self, ctx: &CancellationToken, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        if ctx.is_cancelled() {
            return Err(ApiError::cancelled());
        }
        self.sent.lock().push(request.clone());

        if let Some(response) = self.canned.lock().pop_front() {
            return Ok(response);
        }
        if request.url.ends_with("/list") {
            let body: Value = request
                .body
                .as_deref()
                .and_then(|b| serde_json::from_slice(b).ok())
                .unwrap_or(Value::Null);
            return self.list(&body);
        }
        Ok(HttpResponse {
            status: 404,
            reason: "Not Found".to_string(),
            headers: Vec::new(),
            body: b"404 page not found".to_vec(),
        })
    }
}
