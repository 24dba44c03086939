//! Sea of Thieves web API client
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! Authenticates with the user's RAT cookie. The API answers an expired
//! cookie with 401/403 or a redirect to the login page.

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use reqwest::header::{COOKIE, REFERER};
use reqwest::redirect::Policy;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const SOT_BASE_URL: &str = "https://www.seaofthieves.com";

const BALANCE_PATH: &str = "/api/profilev2/balance";

#[derive(Debug, Error)]
pub enum SotError {
    #[error("the RAT cookie was rejected")]
    AuthRejected,

    #[error("unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub gold: i64,
    pub doubloons: i64,
    pub ancient_coins: i64,
}

/// Probe used by the periodic re-authentication check
#[async_trait]
pub trait AuthProbe: Send + Sync {
    async fn check_auth(&self, rat_cookie: &str) -> Result<(), SotError>;
}

#[derive(Clone)]
pub struct SotClient {
    http: reqwest::Client,
    base_url: String,
}

impl SotClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(SOT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sotbot/", env!("CARGO_PKG_VERSION")))
            .redirect(Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_balance(&self, rat_cookie: &str) -> Result<Balance, SotError> {
        let url = format!("{}{}", self.base_url, BALANCE_PATH);
        debug!("Fetching SoT balance from {url}");

        let response = self
            .http
            .get(&url)
            .header(COOKIE, format!("rat={rat_cookie}"))
            .header(REFERER, format!("{}/profile", self.base_url))
            .send()
            .await?;

        classify_status(response.status().as_u16())?;
        Ok(response.json::<Balance>().await?)
    }
}

#[async_trait]
impl AuthProbe for SotClient {
    async fn check_auth(&self, rat_cookie: &str) -> Result<(), SotError> {
        self.fetch_balance(rat_cookie).await.map(|_| ())
    }
}

fn classify_status(status: u16) -> Result<(), SotError> {
    match status {
        200..=299 => Ok(()),
        401 | 403 | 300..=399 => Err(SotError::AuthRejected),
        other => Err(SotError::UnexpectedStatus(other)),
    }
}

/// Format with `.` as thousands separator, e.g. `1234567` -> `1.234.567`
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
