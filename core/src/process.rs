//! Adapter for starting and inspecting business processes.
//!
//! `T` is the process context type. Embed [`ProcCommon`] with
//! `#[serde(flatten)]` to read the service fields of an instance, or use
//! [`EmptyProcCtx`] for processes without input.
//!
//! [`ProcCommon`]: crate::model::ProcCommon
//! [`EmptyProcCtx`]: crate::model::EmptyProcCtx

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{check_id, ApiError};
use crate::http::HttpRequest;
use crate::stand::Settings;
use crate::transport::{encode, execute, Transport, UreqTransport};

const PUB_V1_API_INSTANCE: &str = "pub/v1/bpm/instance";
const METHOD_RUN: &str = "/run";
const METHOD_GET: &str = "/get";

/// Per-call timeout of process adapters.
pub const PROC_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Serialize)]
struct RunRequest<'a, T> {
    context: &'a T,
}

#[derive(Deserialize)]
struct ContextBody<T> {
    context: T,
}

/// Client for one business process template.
pub struct Proc<T> {
    run_url: String,
    origin: String,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
    _context: PhantomData<fn() -> T>,
}

impl<T> Clone for Proc<T> {
    fn clone(&self) -> Self {
        Self {
            run_url: self.run_url.clone(),
            origin: self.origin.clone(),
            headers: self.headers.clone(),
            transport: Arc::clone(&self.transport),
            _context: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Proc<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proc").field("run_url", &self.run_url).finish_non_exhaustive()
    }
}

impl<T> Proc<T> {
    pub fn new(settings: &Settings) -> Self {
        Self::with_transport(settings, Arc::new(UreqTransport::new(PROC_TIMEOUT)))
    }

    pub fn with_transport(settings: &Settings, transport: Arc<dyn Transport>) -> Self {
        Self {
            run_url: format!("{}{METHOD_RUN}", settings.bpm_url()),
            origin: settings.stand.url(),
            headers: settings.stand.headers(),
            transport,
            _context: PhantomData,
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

    pub fn build_instance(&self, id: &str) -> Result<HttpRequest, ApiError> {
        check_id(id)?;
        let url = format!("{}/{PUB_V1_API_INSTANCE}/{id}{METHOD_GET}", self.origin);
        Ok(HttpRequest::get(url, self.headers.clone()))
    }
}

impl<T: Serialize> Proc<T> {
    pub fn build_run(&self, context: &T) -> Result<HttpRequest, ApiError> {
        let body = encode(&RunRequest { context })?;
        Ok(HttpRequest::post(self.run_url.clone(), self.headers.clone(), body))
    }
}

impl<T: Serialize + DeserializeOwned> Proc<T> {
    /// Start a process instance with `context` as input and return the
    /// context of the started instance.
    pub fn run(&self, ctx: &CancellationToken, context: &T) -> Result<T, ApiError> {
        let body: ContextBody<T> = execute(self.transport.as_ref(), ctx, &self.build_run(context)?)?;
        Ok(body.context)
    }

    /// Context of the process instance with `id`.
    pub fn instance_by_id(&self, ctx: &CancellationToken, id: &str) -> Result<T, ApiError> {
        let body: ContextBody<T> = execute(self.transport.as_ref(), ctx, &self.build_instance(id)?)?;
        Ok(body.context)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{EmptyProcCtx, ProcCommon, STATE_EXEC};
    use crate::stand::Stand;
    use crate::testing::FakePlatform;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct NumberCtx {
        #[serde(flatten)]
        common: ProcCommon,
        #[serde(default)]
        number: i64,
    }

    fn settings() -> Settings {
        Settings::new(Stand::new("http://fake", Some("8080"), "t"), "goods.goods", "bp1")
    }

    #[test]
    fn build_run_posts_context_to_template() {
        let proc: Proc<NumberCtx> = Proc::new(&settings());
        let req = proc
            .build_run(&NumberCtx {
                number: 2,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(req.url, "http://fake:8080/pub/v1/bpm/template/goods.goods/bp1/run");
        let body: serde_json::Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"context": {"number": 2}}));
    }

    #[test]
    fn build_instance_validates_id() {
        let proc: Proc<EmptyProcCtx> = Proc::new(&settings());
        assert!(matches!(proc.build_instance("x"), Err(ApiError::InvalidIdentifier(_))));
        let req = proc.build_instance("018a2b9f-003d-2b48-7e2a-324e6fc16db8").unwrap();
        assert_eq!(
            req.url,
            "http://fake:8080/pub/v1/bpm/instance/018a2b9f-003d-2b48-7e2a-324e6fc16db8/get"
        );
    }

    #[test]
    fn run_returns_started_context() {
        let platform = FakePlatform::with_items(0);
        platform.respond(
            200,
            r#"{"success":true,"error":"","context":{"__id":"018a2b9f-003d-2b48-7e2a-324e6fc16db8","__state":"exec","number":2}}"#,
        );
        let proc: Proc<NumberCtx> = Proc::with_transport(&settings(), platform.clone());
        let started = proc.run(&CancellationToken::new(), &NumberCtx::default()).unwrap();
        assert_eq!(started.number, 2);
        assert_eq!(started.common.state.as_deref(), Some(STATE_EXEC));
    }

    #[test]
    fn run_error_status_carries_envelope_message() {
        let platform = FakePlatform::with_items(0);
        platform.respond(400, r#"{"success":false,"error":"process is not published"}"#);
        let proc: Proc<EmptyProcCtx> = Proc::with_transport(&settings(), platform.clone());
        let err = proc.run(&CancellationToken::new(), &EmptyProcCtx::default()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::UnexpectedStatus { ref message, .. } if message == "process is not published"
        ));
    }
}
