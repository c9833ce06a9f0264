//! HTTP access to the procurement portal's CSV export endpoint.
//!
//! Automatic redirect following is disabled: the portal answers some export
//! queries with a single redirect to the generated file, and the pipeline
//! follows exactly that one hop itself. Failed fetches are not retried
//! within a run; the gap-filling sweep picks the key up again next run.

use std::time::Duration;

use anyhow::Context;
use basegov_core::RawKey;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use thiserror::Error;
use tracing::{info_span, Instrument};
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "https://www.base.gov.pt/Base4/pt/resultados/";

#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/109.0"
                .to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// What a fetch produced, regardless of whether the caller accepts it.
#[derive(Debug, Clone)]
pub struct PortalResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl PortalResponse {
    /// Acceptance rule for raw partitions: HTTP success with a CSV payload.
    pub fn is_csv_success(&self) -> bool {
        self.status == 200 && self.content_type.contains("text/csv")
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("redirect status {status} without a Location header")]
    MissingRedirect { status: u16 },
}

#[derive(Debug)]
pub struct PortalFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl PortalFetcher {
    pub fn new(config: FetcherConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .redirect(Policy::none())
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    /// Fetch one key's CSV export, following at most one redirect hop.
    pub async fn fetch(&self, run_id: Uuid, key: &RawKey) -> Result<PortalResponse, FetchError> {
        let span = info_span!(
            "portal_fetch",
            %run_id,
            district = key.district,
            municipality = key.municipality,
            contract_type = key.contract_type,
            start = %key.start,
        );
        async {
            let response = self
                .client
                .get(&self.base_url)
                .query(&query_params(key))
                .send()
                .await?;

            let status = response.status();
            let response = if status.is_redirection() {
                let target = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
                    .ok_or(FetchError::MissingRedirect {
                        status: status.as_u16(),
                    })?;
                // One hop only; a redirect off this response is not followed.
                let target_url = match response.url().join(&target) {
                    Ok(url) => url.to_string(),
                    Err(_) => target,
                };
                self.client.get(target_url).send().await?
            } else {
                response
            };

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            let body = response.bytes().await?.to_vec();

            Ok(PortalResponse {
                status,
                content_type,
                body,
            })
        }
        .instrument(span)
        .await
    }
}

/// Query parameters for one key: the key's fields plus the portal's fixed
/// export selectors (CSV contract export, country 187, contract-date range).
fn query_params(key: &RawKey) -> Vec<(&'static str, String)> {
    vec![
        ("type", "csv_contratos".to_string()),
        ("tipo", key.contract_type.to_string()),
        ("tipocontrato", String::new()),
        ("sel_price", "price_c1".to_string()),
        ("sel_date", "date_c1".to_string()),
        ("pais", "187".to_string()),
        ("distrito", key.district.to_string()),
        ("concelho", key.municipality.to_string()),
        ("desdedatacontrato", key.start.to_string()),
        ("atedatacontrato", key.end.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn query_params_map_key_fields_one_to_one() {
        let key = RawKey {
            start: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2015, 2, 1).unwrap(),
            district: 2,
            municipality: 3,
            contract_type: 1,
        };
        let params = query_params(&key);
        let get = |k: &str| {
            params
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| v.as_str())
                .unwrap()
        };
        assert_eq!(get("type"), "csv_contratos");
        assert_eq!(get("pais"), "187");
        assert_eq!(get("distrito"), "2");
        assert_eq!(get("concelho"), "3");
        assert_eq!(get("tipo"), "1");
        assert_eq!(get("desdedatacontrato"), "2015-01-01");
        assert_eq!(get("atedatacontrato"), "2015-02-01");
    }

    #[test]
    fn acceptance_requires_success_and_csv() {
        let ok = PortalResponse {
            status: 200,
            content_type: "text/csv; charset=utf-8".to_string(),
            body: vec![],
        };
        assert!(ok.is_csv_success());

        let html = PortalResponse {
            status: 200,
            content_type: "text/html".to_string(),
            body: vec![],
        };
        assert!(!html.is_csv_success());

        let error = PortalResponse {
            status: 500,
            content_type: "text/csv".to_string(),
            body: vec![],
        };
        assert!(!error.is_csv_success());
    }
}
