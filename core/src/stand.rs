//! Connection settings: where the platform lives and how to authenticate.
//!
//! A `Stand` is one platform installation (origin + token). `Settings`
//! points an adapter at one app or process inside it.

use serde::Deserialize;

const PUB_V1_API_APP: &str = "pub/v1/app";
const PUB_V1_API_BPM: &str = "pub/v1/bpm/template";

/// Base origin and credentials of a platform installation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Stand {
    /// Scheme and host, e.g. `https://company.elma365.ru`.
    pub host: String,
    #[serde(default)]
    pub port: Option<String>,
    pub token: String,
}

impl Stand {
    pub fn new(host: &str, port: Option<&str>, token: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            port: port.filter(|p| !p.is_empty()).map(str::to_string),
            token: token.to_string(),
        }
    }

    /// Read `E365_HOST`, `E365_PORT` (optional) and `E365_TOKEN`.
    ///
    /// Returns `None` when host or token is missing.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("E365_HOST").ok()?;
        let token = std::env::var("E365_TOKEN").ok()?;
        let port = std::env::var("E365_PORT").ok();
        Some(Self::new(&host, port.as_deref(), &token))
    }

    /// `host[:port]` with no trailing slash.
    pub fn url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        match self.port.as_deref() {
            Some(port) if !port.is_empty() => format!("{host}:{port}"),
            _ => host.to_string(),
        }
    }

    /// Headers attached to every JSON request.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Authorization".to_string(), format!("Bearer {}", self.token)),
        ]
    }
}

/// Locates an app or a business process inside a stand.
///
/// For processes, `namespace` is the section code (`"goods"`) or
/// `section.app` when the process belongs to an app (`"goods.goods"`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub stand: Stand,
    pub namespace: String,
    pub code: String,
}

impl Settings {
    pub fn new(stand: Stand, namespace: &str, code: &str) -> Self {
        Self {
            stand,
            namespace: namespace.to_string(),
            code: code.to_string(),
        }
    }

    pub fn app_url(&self) -> String {
        format!("{}/{PUB_V1_API_APP}/{}/{}", self.stand.url(), self.namespace, self.code)
    }

    pub fn bpm_url(&self) -> String {
        format!("{}/{PUB_V1_API_BPM}/{}/{}", self.stand.url(), self.namespace, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_url_includes_port() {
        let settings = Settings::new(Stand::new("https://elma.ru", Some("8080"), ""), "ns1", "app1");
        assert_eq!(settings.app_url(), "https://elma.ru:8080/pub/v1/app/ns1/app1");
    }

    #[test]
    fn empty_port_is_omitted() {
        let stand = Stand::new("https://elma.ru/", Some(""), "t");
        assert_eq!(stand.url(), "https://elma.ru");
        let settings = Settings::new(stand, "goods", "bp1");
        assert_eq!(settings.bpm_url(), "https://elma.ru/pub/v1/bpm/template/goods/bp1");
    }

    #[test]
    fn headers_carry_bearer_token() {
        let headers = Stand::new("http://h", None, "abc").headers();
        assert!(headers.contains(&("Authorization".to_string(), "Bearer abc".to_string())));
        assert!(headers.contains(&("Content-Type".to_string(), "application/json".to_string())));
    }

    #[test]
    fn stand_deserializes_without_port() {
        let stand: Stand = serde_json::from_str(r#"{"host":"http://h","token":"t"}"#).unwrap();
        assert_eq!(stand.port, None);
        assert_eq!(stand.url(), "http://h");
    }
}
