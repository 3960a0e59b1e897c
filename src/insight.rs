//! Narrative summaries from an external text service.
//!
//! The call is best-effort. Whatever goes wrong is logged and replaced by
//! [`FALLBACK_NARRATIVE`]; it never reaches analytics callers and never
//! touches stored data.

use crate::analytics::{trend_tail, BatchAnalytics};
use crate::config::Config;
use crate::risk::{at_risk_students, AtRiskStudent};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

pub const FALLBACK_NARRATIVE: &str = "Could not generate AI insights at this time.";

/// Sessions of trend sent along with the summary.
pub const TREND_TAIL_LEN: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendEntry {
    pub name: String,
    pub present: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRequest {
    pub batch_name: String,
    pub total_classes: usize,
    pub attendance_rate: f64,
    pub recent_trend: Vec<TrendEntry>,
    pub at_risk_students: Vec<AtRiskStudent>,
}

impl InsightRequest {
    pub fn from_analytics(batch_name: &str, analytics: &BatchAnalytics) -> Self {
        Self {
            batch_name: batch_name.to_string(),
            total_classes: analytics.total_classes_held,
            attendance_rate: analytics.overall_rate,
            recent_trend: trend_tail(&analytics.trend, TREND_TAIL_LEN)
                .iter()
                .map(|p| TrendEntry {
                    name: p.label.clone(),
                    present: p.present,
                    absent: p.absent,
                })
                .collect(),
            at_risk_students: at_risk_students(analytics)
                .into_iter()
                .map(AtRiskStudent::from)
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct InsightResponse {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("insight endpoint is not configured")]
    NotConfigured,

    #[error("insight request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("insight endpoint returned status {0}")]
    Status(u16),

    #[error("insight response had no text")]
    EmptyText,
}

pub trait InsightGateway: Send + Sync {
    fn narrate(&self, request: &InsightRequest) -> Result<String, InsightError>;
}

/// Gateway used when no endpoint is configured.
pub struct DisabledGateway;

impl InsightGateway for DisabledGateway {
    fn narrate(&self, _request: &InsightRequest) -> Result<String, InsightError> {
        Err(InsightError::NotConfigured)
    }
}

/// POSTs the request as JSON and expects `{"text": "..."}` back.
pub struct HttpGateway {
    client: reqwest::blocking::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpGateway {
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InsightError> {
        let url = url.into();
        let mut builder = reqwest::blocking::Client::builder().timeout(timeout);
        // A service on this machine is never reached through a proxy.
        if is_loopback_url(&url) {
            builder = builder.no_proxy();
        }
        Ok(Self {
            client: builder.build()?,
            url,
            api_key,
        })
    }
}

fn is_loopback_url(url: &str) -> bool {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    host.eq_ignore_ascii_case("localhost")
        || host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}

impl InsightGateway for HttpGateway {
    fn narrate(&self, request: &InsightRequest) -> Result<String, InsightError> {
        let mut call = self.client.post(&self.url).json(request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(InsightError::Status(status.as_u16()));
        }
        let body: InsightResponse = response.json()?;
        body.text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(InsightError::EmptyText)
    }
}

pub fn gateway_from_config(config: &Config) -> Box<dyn InsightGateway> {
    let Some(url) = &config.insight_url else {
        return Box::new(DisabledGateway);
    };
    match HttpGateway::new(
        url.clone(),
        config.insight_api_key.clone(),
        config.insight_timeout,
    ) {
        Ok(gateway) => Box::new(gateway),
        Err(e) => {
            tracing::warn!(error = %e, "could not build insight client, insights disabled");
            Box::new(DisabledGateway)
        }
    }
}

/// The gateway's narrative, or the fallback text on any failure.
pub fn narrative_or_fallback(gateway: &dyn InsightGateway, request: &InsightRequest) -> String {
    match gateway.narrate(request) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            tracing::warn!(batch = %request.batch_name, "insight gateway returned empty text");
            FALLBACK_NARRATIVE.to_string()
        }
        Err(e) => {
            tracing::warn!(batch = %request.batch_name, error = %e, "insight gateway failed");
            FALLBACK_NARRATIVE.to_string()
        }
    }
}
