//! YOURLS client implementation
//!
//! Talks to `{endpoint}/yourls-api.php` with signed, form-encoded POST
//! requests and implements the Shortener trait from mlink-core.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use url::Url;
use uuid::Uuid;

use mlink_core::{Error, LINK_TITLE, LinkRecord, Result, Shortener, ShortenerConfig};

/// Script every YOURLS API call goes through
const API_SCRIPT: &str = "yourls-api.php";

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// API actions used by mlink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Shorten,
    Expand,
    Stats,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::Shorten => "shorturl",
            Action::Expand => "expand",
            Action::Stats => "stats",
        }
    }

    /// Error reported when the server refuses this action
    fn failure(self, message: String) -> Error {
        match self {
            Action::Shorten => Error::Shorten(message),
            Action::Expand => Error::Expand(message),
            Action::Stats => Error::General(format!("Failed to list links: {message}")),
        }
    }
}

/// Error body YOURLS sends with non-200 responses
///
/// Also carries `status`, `code`, `errorCode` and `statusCode`, which add
/// nothing to the message.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShortenResponse {
    #[serde(default)]
    shorturl: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExpandResponse {
    #[serde(default)]
    longurl: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    #[serde(default, deserialize_with = "deserialize_links")]
    links: Vec<LinkData>,
}

#[derive(Debug, Deserialize)]
struct LinkData {
    shorturl: String,
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default, deserialize_with = "deserialize_clicks")]
    clicks: u64,
}

impl From<LinkData> for LinkRecord {
    fn from(data: LinkData) -> Self {
        Self {
            short_url: data.shorturl,
            long_url: data.url,
            title: data.title.unwrap_or_default(),
            timestamp: data.timestamp,
            clicks: data.clicks,
        }
    }
}

/// `links` arrives as `{"link_1": {...}, ...}`, or `[]` when there are none
fn deserialize_links<'de, D>(deserializer: D) -> std::result::Result<Vec<LinkData>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Links {
        Keyed(serde_json::Map<String, serde_json::Value>),
        List(Vec<LinkData>),
    }

    match Links::deserialize(deserializer)? {
        Links::List(links) => Ok(links),
        Links::Keyed(map) => {
            let mut keyed = map
                .into_iter()
                .map(|(key, value)| {
                    serde_json::from_value::<LinkData>(value)
                        .map(|link| (link_index(&key), link))
                        .map_err(serde::de::Error::custom)
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            keyed.sort_by_key(|(index, _)| *index);
            Ok(keyed.into_iter().map(|(_, link)| link).collect())
        }
    }
}

/// Numeric suffix of a `link_N` key
fn link_index(key: &str) -> u64 {
    key.rsplit('_')
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or(u64::MAX)
}

/// YOURLS reports click counts as strings
fn deserialize_clicks<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Clicks {
        Number(u64),
        Text(String),
    }

    match Option::<Clicks>::deserialize(deserializer)? {
        Some(Clicks::Number(n)) => Ok(n),
        Some(Clicks::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
        None => Ok(0),
    }
}

/// Human-readable message for a non-200 response
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            message: Some(message),
            ..
        }) if !message.is_empty() => message,
        _ if body.trim().is_empty() => format!("HTTP {status}"),
        _ => body.trim().to_string(),
    }
}

/// YOURLS API client
pub struct YourlsClient {
    http_client: Client,
    endpoint: String,
    signature: String,
}

impl YourlsClient {
    /// Create a new client from the shortener configuration
    pub fn new(config: &ShortenerConfig) -> Result<Self> {
        Self::with_timeout(config, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(config: &ShortenerConfig, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            signature: config.signature.clone(),
        })
    }

    /// Build the API URL
    fn api_url(&self) -> String {
        format!("{}/{API_SCRIPT}", self.endpoint)
    }

    /// Call an API action and decode its JSON response
    async fn request<T: DeserializeOwned>(
        &self,
        action: Action,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let mut form = vec![
            ("signature", self.signature.as_str()),
            ("action", action.as_str()),
            ("format", "json"),
        ];
        form.extend_from_slice(params);

        tracing::debug!(action = action.as_str(), url = %self.api_url(), "calling shortener");

        let response = self
            .http_client
            .post(self.api_url())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Network(format!("Shortener request timed out: {e}"))
                } else {
                    Error::Network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response: {e}")))?;

        if status != StatusCode::OK {
            tracing::debug!(%status, body = %text, "shortener refused request");
            return Err(action.failure(error_message(status, &text)));
        }

        serde_json::from_str(&text).map_err(Error::Json)
    }
}

#[async_trait]
impl Shortener for YourlsClient {
    async fn shorten(&self, long_url: &str) -> Result<String> {
        Url::parse(long_url)?;

        let keyword = Uuid::new_v4().simple().to_string();
        let response: ShortenResponse = self
            .request(
                Action::Shorten,
                &[("url", long_url), ("title", LINK_TITLE), ("keyword", keyword.as_str())],
            )
            .await?;

        response.shorturl.ok_or_else(|| {
            Error::Shorten(
                response
                    .message
                    .unwrap_or_else(|| "response carried no short url".to_string()),
            )
        })
    }

    async fn expand(&self, short_url: &str) -> Result<String> {
        Url::parse(short_url)?;

        let response: ExpandResponse = self
            .request(Action::Expand, &[("shorturl", short_url)])
            .await?;

        response.longurl.ok_or_else(|| {
            Error::Expand(
                response
                    .message
                    .unwrap_or_else(|| "response carried no long url".to_string()),
            )
        })
    }

    async fn recent_links(&self, limit: usize) -> Result<Vec<LinkRecord>> {
        let limit = limit.to_string();
        let response: StatsResponse = self
            .request(Action::Stats, &[("filter", "last"), ("limit", limit.as_str())])
            .await?;

        Ok(response.links.into_iter().map(LinkRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    fn shortener_config(endpoint: &str) -> ShortenerConfig {
        ShortenerConfig {
            endpoint: endpoint.to_string(),
            signature: "s3cr3t".to_string(),
        }
    }

    /// In-memory YOURLS: keyword to (url, title)
    #[derive(Default)]
    struct FakeYourls {
        base: String,
        links: Mutex<Vec<(String, String, String)>>,
    }

    impl Respond for FakeYourls {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let params: HashMap<String, String> = url::form_urlencoded::parse(&request.body)
                .into_owned()
                .collect();

            if params.get("signature").map(String::as_str) != Some("s3cr3t") {
                return ResponseTemplate::new(403).set_body_json(json!({
                    "message": "Please log in",
                    "errorCode": "403",
                }));
            }

            let mut links = self.links.lock().unwrap();
            match params.get("action").map(String::as_str) {
                Some("shorturl") => {
                    let keyword = params["keyword"].clone();
                    let short = format!("{}/{keyword}", self.base);
                    links.push((keyword, params["url"].clone(), params["title"].clone()));
                    ResponseTemplate::new(200).set_body_json(json!({
                        "status": "success",
                        "shorturl": short,
                    }))
                }
                Some("expand") => {
                    let keyword = params["shorturl"].rsplit('/').next().unwrap_or_default();
                    match links.iter().find(|(k, _, _)| k == keyword) {
                        Some((_, url, _)) => ResponseTemplate::new(200).set_body_json(json!({
                            "keyword": keyword,
                            "longurl": url,
                        })),
                        None => ResponseTemplate::new(404).set_body_json(json!({
                            "status": "fail",
                            "code": "error:notfound",
                            "message": "Error: short URL not found",
                            "errorCode": "404",
                            "statusCode": 404,
                        })),
                    }
                }
                _ => ResponseTemplate::new(400).set_body_string("unknown action"),
            }
        }
    }

    async fn fake_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/yourls-api.php"))
            .respond_with(FakeYourls {
                base: server.uri(),
                ..Default::default()
            })
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_api_url_construction() {
        let client = YourlsClient::new(&shortener_config("http://localhost:8080/")).unwrap();
        assert_eq!(client.api_url(), "http://localhost:8080/yourls-api.php");
    }

    #[test]
    fn test_error_message() {
        let body = r#"{"status":"fail","code":"error:url","message":"URL already exists","errorCode":"400","statusCode":400}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "URL already exists"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            "<html>bad gateway</html>"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "HTTP 502 Bad Gateway");
    }

    #[tokio::test]
    async fn test_shorten_sends_signed_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/yourls-api.php"))
            .and(header("accept", "application/json"))
            .and(body_string_contains("signature=s3cr3t"))
            .and(body_string_contains("action=shorturl"))
            .and(body_string_contains("format=json"))
            .and(body_string_contains("title=Uploaded+using+mlink"))
            .and(body_string_contains("keyword="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "shorturl": "http://sho.rt/abc",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = YourlsClient::new(&shortener_config(&server.uri())).unwrap();
        let short = client
            .shorten("https://store.example/minio-link/a.pdf")
            .await
            .unwrap();

        assert_eq!(short, "http://sho.rt/abc");
    }

    #[tokio::test]
    async fn test_shorten_then_expand_round_trip() {
        let server = fake_server().await;
        let client = YourlsClient::new(&shortener_config(&server.uri())).unwrap();

        let long = "https://store.example/b-private/k.zip?X-Amz-Expires=60&X-Amz-Signature=ff";
        let short = client.shorten(long).await.unwrap();
        assert!(short.starts_with(&server.uri()));

        assert_eq!(client.expand(&short).await.unwrap(), long);
    }

    #[tokio::test]
    async fn test_each_shorten_uses_fresh_keyword() {
        let server = fake_server().await;
        let client = YourlsClient::new(&shortener_config(&server.uri())).unwrap();

        let a = client.shorten("https://store.example/b/a.pdf").await.unwrap();
        let b = client.shorten("https://store.example/b/a.pdf").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_expand_unknown_link_carries_server_message() {
        let server = fake_server().await;
        let client = YourlsClient::new(&shortener_config(&server.uri())).unwrap();

        let err = client
            .expand(&format!("{}/doesnotexist", server.uri()))
            .await
            .unwrap_err();

        match err {
            Error::Expand(message) => assert_eq!(message, "Error: short URL not found"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_signature_is_shorten_error() {
        let server = fake_server().await;
        let client = YourlsClient::new(&ShortenerConfig {
            endpoint: server.uri(),
            signature: "wrong".to_string(),
        })
        .unwrap();

        let err = client
            .shorten("https://store.example/b/a.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Shorten(ref m) if m == "Please log in"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = YourlsClient::new(&shortener_config(&server.uri())).unwrap();

        assert!(matches!(
            client.shorten("not a url").await,
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(
            client.expand("").await,
            Err(Error::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_recent_links_keyed_map() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/yourls-api.php"))
            .and(body_string_contains("action=stats"))
            .and(body_string_contains("filter=last"))
            .and(body_string_contains("limit=20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "links": {
                    "link_2": {
                        "shorturl": "http://sho.rt/b",
                        "url": "https://other.example/post",
                        "title": "A blog post",
                        "timestamp": "2024-01-02 10:00:00",
                        "ip": "127.0.0.1",
                        "clicks": "7",
                    },
                    "link_10": {
                        "shorturl": "http://sho.rt/c",
                        "url": "https://store.example/b/c.pdf",
                        "title": LINK_TITLE,
                        "clicks": 3,
                    },
                    "link_1": {
                        "shorturl": "http://sho.rt/a",
                        "url": "https://store.example/b/a.pdf",
                        "title": LINK_TITLE,
                        "timestamp": "2024-01-02 11:00:00",
                        "ip": "127.0.0.1",
                        "clicks": "0",
                    },
                },
                "stats": {"total_links": "3", "total_clicks": "10"},
            })))
            .mount(&server)
            .await;

        let client = YourlsClient::new(&shortener_config(&server.uri())).unwrap();
        let links = client.recent_links(20).await.unwrap();

        let shorts: Vec<&str> = links.iter().map(|l| l.short_url.as_str()).collect();
        assert_eq!(shorts, ["http://sho.rt/a", "http://sho.rt/b", "http://sho.rt/c"]);
        assert_eq!(links[1].clicks, 7);
        assert_eq!(links[1].title, "A blog post");
        assert_eq!(links[2].clicks, 3);
        assert_eq!(links[2].timestamp, None);
    }

    #[tokio::test]
    async fn test_recent_links_empty_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"links": []})))
            .mount(&server)
            .await;

        let client = YourlsClient::new(&shortener_config(&server.uri())).unwrap();
        assert!(client.recent_links(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"shorturl": "http://sho.rt/late"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = YourlsClient::with_timeout(
            &shortener_config(&server.uri()),
            Duration::from_millis(100),
        )
        .unwrap();

        let err = client
            .shorten("https://store.example/b/a.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }
}
