use async_trait::async_trait;
use reqwest::{
    Client, Response, StatusCode,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::client::{DatabaseProbe, PerformanceSink};
use crate::error::{DatabaseError, DatabaseErrorKind};
use crate::models::PerformanceRecord;
use shared_config::AppConfig;

pub const PERFORMANCE_METRICS_TABLE: &str = "performance_metrics";

/// Error body returned by PostgREST.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        let client = match Client::builder().timeout(config.connection_timeout).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("Failed to build HTTP client with configured timeout, using defaults: {}", e);
                Client::new()
            }
        };

        Self {
            client,
            base_url: config.database_url.trim_end_matches('/').to_string(),
            api_key: config.database_api_key.clone(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::NotConfigured, format!("Invalid API key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::NotConfigured, format!("Invalid API key: {}", e)))?;

        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response, DatabaseError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut req = self.client.request(method, &url)
            .headers(self.get_headers()?);

        if let Some(body_data) = body {
            req = req.header("Prefer", "return=minimal").json(body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("API error ({}): {}", status, error_text);
            return Err(classify_failure(status, &error_text));
        }

        Ok(response)
    }

    pub async fn execute(&self, method: Method, path: &str, body: Option<&Value>) -> Result<(), DatabaseError> {
        self.send(method, path, body).await.map(|_| ())
    }
}

fn classify_failure(status: StatusCode, body: &str) -> DatabaseError {
    let parsed = serde_json::from_str::<PostgrestError>(body).ok();
    let message = parsed.as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("API error ({}): {}", status, body));

    let kind = match parsed.and_then(|e| e.code) {
        Some(code) => DatabaseErrorKind::from_sqlstate(&code),
        None => match status {
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => DatabaseErrorKind::Timeout,
            StatusCode::CONFLICT => DatabaseErrorKind::UniqueViolation,
            s if s.is_server_error() => DatabaseErrorKind::Unavailable,
            _ => DatabaseErrorKind::Query,
        },
    };

    DatabaseError::new(kind, message)
}

#[async_trait]
impl DatabaseProbe for SupabaseClient {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.execute(Method::HEAD, "/rest/v1/", None).await
    }
}

#[async_trait]
impl PerformanceSink for SupabaseClient {
    async fn append(&self, record: &PerformanceRecord) -> Result<(), DatabaseError> {
        let body = serde_json::to_value(record)
            .map_err(|e| DatabaseError::new(DatabaseErrorKind::Query, e.to_string()))?;

        self.execute(
            Method::POST,
            &format!("/rest/v1/{}", PERFORMANCE_METRICS_TABLE),
            Some(&body),
        ).await
    }
}
