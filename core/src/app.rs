//! Adapter for the items of one platform app.
//!
//! # Design
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a network method that sends it through the adapter's
//! `Transport` and unwraps the `{success, error, ...}` envelope. The build
//! step validates identifiers, so a malformed id fails before anything is
//! sent.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{check_id, ApiError};
use crate::http::HttpRequest;
use crate::model::StatusInfo;
use crate::search::{ListBody, PageRequest, PageResult, Search};
use crate::stand::Settings;
use crate::transport::{encode, execute, Transport, UreqTransport, DEFAULT_TIMEOUT};

const METHOD_GET: &str = "/get";
const METHOD_UPDATE: &str = "/update";
const METHOD_CREATE: &str = "/create";
const METHOD_LIST: &str = "/list";
const METHOD_SET_STATUS: &str = "/set-status";
const METHOD_GET_STATUS: &str = "/settings/status";

#[derive(Serialize)]
struct ContextRequest<'a, T> {
    context: &'a T,
}

#[derive(Serialize)]
struct SetStatusRequest<'a> {
    status: StatusCode<'a>,
}

#[derive(Serialize)]
struct StatusCode<'a> {
    code: &'a str,
}

#[derive(Deserialize)]
struct ItemBody<T> {
    item: T,
}

/// Client for the items of one app, where `T` is the item record type.
pub struct App<T> {
    url: String,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for App<T> {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            headers: self.headers.clone(),
            transport: Arc::clone(&self.transport),
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for App<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App").field("url", &self.url).finish_non_exhaustive()
    }
}

impl<T> App<T> {
    /// App adapter over HTTP with the default 5 second per-call timeout.
    pub fn new(settings: &Settings) -> Self {
        Self::with_transport(settings, Arc::new(UreqTransport::new(DEFAULT_TIMEOUT)))
    }

    pub fn with_transport(settings: &Settings, transport: Arc<dyn Transport>) -> Self {
        Self {
            url: settings.app_url(),
            headers: settings.stand.headers(),
            transport,
            _record: PhantomData,
        }
    }

    /// Replace the transport with a `UreqTransport` using `timeout` per call.
    ///
    /// Any transport set through `with_transport` is dropped; wrap a custom
    /// transport's own timeout instead of calling this.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport = Arc::new(UreqTransport::new(timeout));
        self
    }

    /// Base URL of the app, `<origin>/pub/v1/app/<namespace>/<code>`.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn search(&self) -> Search<'_, T> {
        Search::new(self)
    }

    fn item_url(&self, id: &str, method: &str) -> Result<String, ApiError> {
        check_id(id)?;
        Ok(format!("{}/{id}{method}", self.url))
    }

    pub fn build_get(&self, id: &str) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::get(self.item_url(id, METHOD_GET)?, self.headers.clone()))
    }

    pub fn build_set_status(&self, id: &str, code: &str) -> Result<HttpRequest, ApiError> {
        let url = self.item_url(id, METHOD_SET_STATUS)?;
        let body = encode(&SetStatusRequest {
            status: StatusCode { code },
        })?;
        Ok(HttpRequest::post(url, self.headers.clone(), body))
    }

    pub fn build_status_info(&self) -> HttpRequest {
        HttpRequest::get(format!("{}{METHOD_GET_STATUS}", self.url), self.headers.clone())
    }

    pub fn build_find(&self, page: &PageRequest) -> Result<HttpRequest, ApiError> {
        let body = encode(page)?;
        Ok(HttpRequest::post(format!("{}{METHOD_LIST}", self.url), self.headers.clone(), body))
    }

    pub fn status_info(&self, ctx: &CancellationToken) -> Result<StatusInfo, ApiError> {
        execute(self.transport.as_ref(), ctx, &self.build_status_info())
    }
}

impl<T: Serialize> App<T> {
    pub fn build_create(&self, item: &T) -> Result<HttpRequest, ApiError> {
        let body = encode(&ContextRequest { context: item })?;
        Ok(HttpRequest::post(format!("{}{METHOD_CREATE}", self.url), self.headers.clone(), body))
    }

    pub fn build_update(&self, id: &str, item: &T) -> Result<HttpRequest, ApiError> {
        let url = self.item_url(id, METHOD_UPDATE)?;
        let body = encode(&ContextRequest { context: item })?;
        Ok(HttpRequest::post(url, self.headers.clone(), body))
    }
}

impl<T: Serialize + DeserializeOwned> App<T> {
    fn item(&self, ctx: &CancellationToken, request: &HttpRequest) -> Result<T, ApiError> {
        let body: ItemBody<T> = execute(self.transport.as_ref(), ctx, request)?;
        Ok(body.item)
    }

    /// Create an item and return it as stored, with service fields filled.
    pub fn create(&self, ctx: &CancellationToken, item: &T) -> Result<T, ApiError> {
        self.item(ctx, &self.build_create(item)?)
    }

    pub fn get_by_id(&self, ctx: &CancellationToken, id: &str) -> Result<T, ApiError> {
        self.item(ctx, &self.build_get(id)?)
    }

    /// Overwrite the fields present in `item` on the item with `id`.
    pub fn update(&self, ctx: &CancellationToken, id: &str, item: &T) -> Result<T, ApiError> {
        self.item(ctx, &self.build_update(id, item)?)
    }

    /// Move the item with `id` to the status with `code`.
    pub fn set_status(&self, ctx: &CancellationToken, id: &str, code: &str) -> Result<T, ApiError> {
        self.item(ctx, &self.build_set_status(id, code)?)
    }

    /// Fetch one page of search results.
    ///
    /// A page never holds more than `page.size` items; extra items sent by
    /// the platform are dropped.
    pub fn find(&self, ctx: &CancellationToken, page: &PageRequest) -> Result<PageResult<T>, ApiError> {
        let request = self.build_find(page)?;
        let body: ListBody<T> = execute(self.transport.as_ref(), ctx, &request)?;
        let list = body.result;

        let mut items = list.result.unwrap_or_default();
        items.truncate(page.size);
        debug!(from = page.from, size = page.size, items = items.len(), total = list.total, "page fetched");
        Ok(PageResult {
            items,
            total: list.total,
        })
    }
}
