// API client module: a small blocking HTTP client that talks to the Pocket
// v3 API. The protocols in `retrieve` and `mutate` only see the `Transport`
// trait, so tests can swap in an in-memory server.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Map, Value};

pub const DEFAULT_BASE_URL: &str = "https://getpocket.com/v3";

/// Request bodies are JSON objects.
pub type Payload = Map<String, Value>;

/// The two API endpoints the client uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `/get`: paged retrieval.
    Retrieve,
    /// `/send`: batch actions.
    Modify,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Retrieve => "get",
            Endpoint::Modify => "send",
        }
    }
}

/// Posts a JSON payload to an endpoint and returns the decoded JSON body.
pub trait Transport {
    fn post(&self, endpoint: Endpoint, payload: &Payload) -> Result<Value>;
}

/// Downloads a page, used when archiving records.
pub trait PageFetcher {
    fn fetch_page(&self, url: &str) -> Result<Vec<u8>>;
}

/// State of one API exchange: where it goes, what is sent, what came back.
/// Lives for a single operation and is passed along by reference.
#[derive(Debug)]
pub struct RequestContext {
    pub endpoint: Endpoint,
    pub payload: Payload,
    pub response: Option<Value>,
}

impl RequestContext {
    pub fn new(endpoint: Endpoint, payload: Payload) -> Self {
        RequestContext {
            endpoint,
            payload,
            response: None,
        }
    }

    /// Send the current payload and keep the response for inspection.
    pub fn send(&mut self, transport: &dyn Transport) -> Result<&Value> {
        let body = serde_json::Value::Object(self.payload.clone());
        tracing::debug!(endpoint = self.endpoint.path(), payload = %body, "api request");
        let response = transport.post(self.endpoint, &self.payload)?;
        Ok(&*self.response.insert(response))
    }
}

/// Access credentials merged into every request body.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub access_token: String,
}

/// Blocking API client holding the reqwest client, the base URL of the API
/// and the credentials.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let client = Client::builder().default_headers(json_headers()).build()?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Create an ApiClient configured from `POCKYT_CONSUMER_KEY`,
    /// `POCKYT_ACCESS_TOKEN` and optionally `POCKYT_API_URL`.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("POCKYT_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let credentials = Credentials {
            consumer_key: required_env("POCKYT_CONSUMER_KEY")?,
            access_token: required_env("POCKYT_ACCESS_TOKEN")?,
        };
        ApiClient::new(&base_url, credentials)
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }
}

fn required_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::Config(format!("{} environment variable is not set", name)))
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("X-Accept", HeaderValue::from_static("application/json"));
    headers
}

impl Transport for ApiClient {
    fn post(&self, endpoint: Endpoint, payload: &Payload) -> Result<Value> {
        let mut body = payload.clone();
        body.insert("consumer_key".into(), self.credentials.consumer_key.clone().into());
        body.insert("access_token".into(), self.credentials.access_token.clone().into());

        let res = self.client.post(self.url(endpoint)).json(&body).send()?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            // The service reports failures in the X-Error header.
            let reason = res
                .headers()
                .get("X-Error")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            let body = match reason {
                Some(reason) => reason,
                None => res.text().unwrap_or_default(),
            };
            return Err(Error::Api { status, body });
        }
        Ok(res.json()?)
    }
}

impl PageFetcher for ApiClient {
    fn fetch_page(&self, url: &str) -> Result<Vec<u8>> {
        let res = self.client.get(url).send()?.error_for_status()?;
        Ok(res.bytes()?.to_vec())
    }
}
