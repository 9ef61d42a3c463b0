//! Disk files and directories.
//!
//! # Design
//! Downloads are two calls: the platform hands out a short-lived link,
//! which is then fetched without the stand's headers. Uploads are a single
//! multipart request into a directory; the body is assembled here so it
//! travels through the same `Transport` as every other call.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::error::{check_id, ApiError};
use crate::http::HttpRequest;
use crate::model::{DirectoryInfo, File};
use crate::stand::Stand;
use crate::transport::{execute, Transport, UreqTransport, DEFAULT_TIMEOUT};

const PUB_V1_API_DISK_FILE: &str = "/pub/v1/disk/file/";
const PUB_V1_API_DISK_DIRECTORY: &str = "/pub/v1/disk/directory/";
const METHOD_GET_LINK: &str = "/get-link";
const METHOD_UPLOAD: &str = "/upload";

#[derive(Deserialize)]
struct LinkBody {
    link: String,
}

#[derive(Deserialize)]
struct FileBody {
    file: File,
}

#[derive(Deserialize)]
struct DirectoryBody {
    directory: DirectoryInfo,
}

/// Entry point for file downloads and directory access on one stand.
#[derive(Clone)]
pub struct FileAdapter {
    origin: String,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for FileAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAdapter").field("origin", &self.origin).finish_non_exhaustive()
    }
}

impl FileAdapter {
    pub fn new(stand: &Stand) -> Self {
        Self::with_transport(stand, Arc::new(UreqTransport::new(DEFAULT_TIMEOUT)))
    }

    pub fn with_transport(stand: &Stand, transport: Arc<dyn Transport>) -> Self {
        Self {
            origin: stand.url(),
            headers: stand.headers(),
            transport,
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

    pub fn build_download_link(&self, id: &str) -> Result<HttpRequest, ApiError> {
        check_id(id)?;
        let url = format!("{}{PUB_V1_API_DISK_FILE}{id}{METHOD_GET_LINK}", self.origin);
        Ok(HttpRequest::get(url, self.headers.clone()))
    }

    /// Temporary download link for the file with `id`.
    pub fn download_link(&self, ctx: &CancellationToken, id: &str) -> Result<String, ApiError> {
        let body: LinkBody = execute(self.transport.as_ref(), ctx, &self.build_download_link(id)?)?;
        Ok(body.link)
    }

    /// Contents of the file with `id`.
    pub fn download(&self, ctx: &CancellationToken, id: &str) -> Result<Vec<u8>, ApiError> {
        let link = self.download_link(ctx, id)?;
        let response = self.transport.send(ctx, &HttpRequest::get(link, Vec::new()))?;
        if !response.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: response.status_text(),
                message: response.body_text(),
            });
        }
        debug!(id, bytes = response.body.len(), "file downloaded");
        Ok(response.body)
    }

    /// Handle for the directory with `id`. The id is checked on use.
    pub fn directory(&self, id: &str) -> Directory {
        Directory {
            id: id.to_string(),
            origin: self.origin.clone(),
            headers: self.headers.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

/// A disk directory.
#[derive(Clone)]
pub struct Directory {
    id: String,
    origin: String,
    headers: Vec<(String, String)>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Directory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Directory").field("id", &self.id).finish_non_exhaustive()
    }
}

impl Directory {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the transport with a `UreqTransport` using `timeout` per call.
    ///
    /// Any transport set through `with_transport` is dropped; wrap a custom
    /// transport's own timeout instead of calling this.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport = Arc::new(UreqTransport::new(timeout));
        self
    }

    pub fn build_info(&self) -> Result<HttpRequest, ApiError> {
        check_id(&self.id)?;
        let url = format!("{}{PUB_V1_API_DISK_DIRECTORY}{}", self.origin, self.id);
        Ok(HttpRequest::get(url, self.headers.clone()))
    }

    pub fn info(&self, ctx: &CancellationToken) -> Result<DirectoryInfo, ApiError> {
        let body: DirectoryBody = execute(self.transport.as_ref(), ctx, &self.build_info()?)?;
        Ok(body.directory)
    }

    /// Multipart upload of `data` as a file called `name`.
    pub fn build_upload(&self, data: &[u8], name: &str) -> Result<HttpRequest, ApiError> {
        if data.is_empty() {
            return Err(ApiError::EmptyUpload);
        }
        check_id(&self.id)?;

        let boundary = Uuid::new_v4().simple().to_string();
        let hash = Uuid::new_v4();
        let size = data.len();
        let url = format!(
            "{}{PUB_V1_API_DISK_DIRECTORY}{}{METHOD_UPLOAD}?hash={hash}",
            self.origin, self.id
        );

        let mut request = HttpRequest::post(url, self.headers.clone(), multipart_body(&boundary, name, data));
        request.set_header("Content-Type", format!("multipart/form-data; boundary={boundary}"));
        request.set_header("Content-Range", format!("bytes 0-{size}/{size}"));
        Ok(request)
    }

    /// Upload `data` into this directory and return the stored file.
    pub fn upload(&self, ctx: &CancellationToken, data: &[u8], name: &str) -> Result<File, ApiError> {
        let body: FileBody = execute(self.transport.as_ref(), ctx, &self.build_upload(data, name)?)?;
        Ok(body.file)
    }
}

fn multipart_body(boundary: &str, name: &str, data: &[u8]) -> Vec<u8> {
    let name = name.replace('\\', "\\\\").replace('"', "\\\"");
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n").as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
