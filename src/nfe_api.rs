use std::time::Duration;

use clap::ValueEnum;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::chave::InvoiceKey;
use crate::utils::{is_truthy, value_to_display};

/// Captcha resolution on the server side can take minutes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);
pub static DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 3002;

static INTERCEPTAR_URL_PATH: &str = "/api/nfe/interceptar-url";
static SALDO_PATH: &str = "/api/nfe/saldo";

/// How the key is sent to the interception endpoint.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum RequestMode {
    /// `GET /api/nfe/interceptar-url/{chave}`
    Get,
    /// `POST /api/nfe/interceptar-url` with a JSON body
    #[default]
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        RequestConfig::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl RequestConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct InterceptRequest<'a> {
    pub chave: &'a str,
    #[serde(rename = "token2captcha", skip_serializing_if = "Option::is_none")]
    pub token2captcha: Option<&'a str>,
}

// ===========================================

/// Body of a non-2xx response.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Json(Value),
    Text(String),
}

impl ErrorBody {
    pub(crate) fn from_text(text: String) -> Self {
        match serde_json::from_str::<Value>(&text) {
            Ok(json) => ErrorBody::Json(json),
            Err(_) => ErrorBody::Text(text),
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error {status}")]
    Http { status: StatusCode, body: ErrorBody },
    #[error("could not connect to {url}")]
    Connection { url: String },
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("request failed: {0}")]
    Request(String),
}

// ===========================================

/// Typed view over an interception response. Every field is optional;
/// string and bool fields with an unexpected JSON type are treated as absent.
#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub success: Option<bool>,
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub chave: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub error: Option<String>,
    #[serde(default, rename = "dadosNFe")]
    pub dados_nfe: Option<Value>,
}

impl InterceptResponse {
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// The `url` field as shown to the user, when it is truthy.
    pub fn display_url(&self) -> Option<String> {
        self.url
            .as_ref()
            .filter(|u| is_truthy(u))
            .map(value_to_display)
    }

    /// The intercepted url, if the server returned a non-empty string.
    pub fn download_url(&self) -> Option<&str> {
        self.url
            .as_ref()
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
    }
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DadosNfe {
    pub encontrados: Option<Value>,
    pub emitente: Option<Value>,
    pub destinatario: Option<Value>,
    pub valor: Option<Value>,
    pub data_emissao: Option<Value>,
    pub natureza_operacao: Option<Value>,
    pub status: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub detalhes: Option<Map<String, Value>>,
}

impl DadosNfe {
    /// Returns None unless `value` is a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn encontrados(&self) -> bool {
        self.encontrados.as_ref().map_or(false, is_truthy)
    }
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
pub struct SaldoResponse {
    pub saldo: Option<Value>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

// ===========================================

pub struct NfeApiClient {
    client: Client,
    config: RequestConfig,
}

impl NfeApiClient {
    pub fn new(config: RequestConfig) -> reqwest::Result<Self> {
        let client = create_http_client(config.timeout)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    pub fn interceptar_url_endpoint(&self, key: &InvoiceKey, mode: RequestMode) -> String {
        let base = self.config.base_url();
        match mode {
            RequestMode::Get => format!("{}{}/{}", base, INTERCEPTAR_URL_PATH, key),
            RequestMode::Post => format!("{}{}", base, INTERCEPTAR_URL_PATH),
        }
    }

    pub fn saldo_endpoint(&self) -> String {
        format!("{}{}", self.config.base_url(), SALDO_PATH)
    }

    /// Asks the server to intercept the download url of the invoice.
    pub fn fetch(
        &self,
        key: &InvoiceKey,
        token2captcha: Option<&str>,
        mode: RequestMode,
    ) -> Result<Value, FetchError> {
        let url = self.interceptar_url_endpoint(key, mode);
        let request = match mode {
            RequestMode::Get => {
                if token2captcha.is_some() {
                    log::warn!("token2captcha is only sent in post mode, ignoring it");
                }
                log::debug!("GET {}", url);
                self.client.get(&url)
            }
            RequestMode::Post => {
                let body = InterceptRequest {
                    chave: key.as_str(),
                    token2captcha,
                };
                log::debug!(
                    "POST {} chave {} with token {}",
                    url,
                    body.chave,
                    body.token2captcha.is_some()
                );
                self.client.post(&url).json(&body)
            }
        };
        self.send_json(request, &url)
    }

    /// Queries the 2captcha balance of the server account.
    pub fn saldo(&self) -> Result<Value, FetchError> {
        let url = self.saldo_endpoint();
        log::debug!("GET {}", url);
        self.send_json(self.client.get(&url), &url)
    }

    fn send_json(&self, request: RequestBuilder, url: &str) -> Result<Value, FetchError> {
        let response = request.send().map_err(|e| self.classify(e, url))?;
        let status = response.status();
        log::debug!("Url {} got status {}", url, status);

        if !status.is_success() {
            let body = match response.text() {
                Ok(text) => {
                    log::warn!("Url {} got code {} with body {}", url, status, text);
                    ErrorBody::from_text(text)
                }
                Err(e) => {
                    log::warn!("Url {} got code {}, body unreadable: {:?}", url, status, e);
                    ErrorBody::Text(String::new())
                }
            };
            return Err(FetchError::Http { status, body });
        }
        let text = response.text().map_err(|e| self.classify(e, url))?;
        serde_json::from_str(&text)
            .map_err(|e| FetchError::Request(format!("invalid JSON in response from {url}: {e}")))
    }

    fn classify(&self, err: reqwest::Error, url: &str) -> FetchError {
        log::debug!("Url {} got error {:?}", url, err);
        if err.is_timeout() {
            FetchError::Timeout(self.config.timeout)
        } else if err.is_connect() {
            FetchError::Connection {
                url: url.to_string(),
            }
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

fn create_http_client(timeout: Duration) -> reqwest::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.append("accept", HeaderValue::from_static("application/json"));

    reqwest::blocking::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
}
