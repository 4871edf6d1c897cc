use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row accepted by the append-only performance store. One page-load signal
/// column is populated per row; server-side samples leave all five empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub session_id: String,
    pub page: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lcp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fid: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cls: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttfb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PerformanceRecord {
    pub fn new(session_id: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            page: page.into(),
            lcp: None,
            fid: None,
            cls: None,
            fcp: None,
            ttfb: None,
            connection_type: None,
            created_at: Utc::now(),
        }
    }
}
