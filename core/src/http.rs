//! HTTP request and response values.
//!
//! # Design
//! Requests and responses are plain data. Every adapter builds an
//! `HttpRequest` without touching the network and interprets an
//! `HttpResponse` without knowing how it was obtained; the `Transport` in
//! between is the only place I/O happens. Bodies are raw bytes so the same
//! types carry JSON, multipart uploads and file downloads.

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: String, headers: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            headers,
            body: None,
        }
    }

    pub fn post(url: String, headers: Vec<(String, String)>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            headers,
            body: Some(body),
        }
    }

    /// Replace a header, matching the name case-insensitively.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data. The body has already been read
/// in full.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Reason phrase for `status`, e.g. "Not Found". May be empty.
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Status line in the "404 Not Found" form used in error messages.
    pub fn status_text(&self) -> String {
        if self.reason.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.reason)
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut req = HttpRequest::get(
            "http://localhost".to_string(),
            vec![("Content-Type".to_string(), "application/json".to_string())],
        );
        req.set_header("content-type", "multipart/form-data");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("CONTENT-TYPE"), Some("multipart/form-data"));
    }

    #[test]
    fn status_text_includes_reason_when_known() {
        let mut resp = HttpResponse {
            status: 404,
            reason: "Not Found".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
        };
        assert_eq!(resp.status_text(), "404 Not Found");
        resp.reason.clear();
        assert_eq!(resp.status_text(), "404");
        assert!(!resp.is_success());
    }
}
