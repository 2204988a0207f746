//! Client for the MOTC PTX daily-timetable feed.
//!
//! The platform signs requests with HMAC-SHA1 over an `x-date` header; see
//! https://gist.github.com/ptxmotc/383118204ecf7192bdf96bc0197bb981#api. Several
//! (app-id, key) candidates may be configured and are cycled through when the
//! platform rejects one.

use std::env;
use std::error::Error;
use std::fmt;
use std::fs;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chrono::{NaiveDate, Utc};
use hmac::{Hmac, Mac};
use log::{debug, warn};
use serde::Deserialize;
use sha1::Sha1;

use crate::database::models::Mode;

const TRA_DAILY_TIMETABLE_URL: &str =
    "https://ptx.transportdata.tw/MOTC/v2/Rail/TRA/DailyTimetable/TrainDate/";
const THSR_DAILY_TIMETABLE_URL: &str =
    "https://ptx.transportdata.tw/MOTC/v2/Rail/THSR/DailyTimetable/TrainDate/";

const EMPTY_RETRY_LIMIT: usize = 3;
const EMPTY_RETRY_DELAY: Duration = Duration::from_millis(500);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// One train's daily schedule as delivered by the feed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTimetable {
    #[serde(rename = "TrainNo")]
    pub train_no: String,
    #[serde(rename = "TrainTypeCode", default)]
    pub train_type_code: Option<String>,
    #[serde(rename = "StopTimes", default)]
    pub stop_times: Vec<RawStopTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawStopTime {
    #[serde(rename = "StationID")]
    pub station_id: String,
    /// Absent for a train's first stop; the departure time stands in.
    #[serde(rename = "ArrivalTime", default)]
    pub arrival_time: Option<String>,
    #[serde(rename = "DepartureTime")]
    pub departure_time: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    /// Network-level failure talking to the platform; worth retrying on the
    /// next cycle.
    Transient(String),
    /// The platform answered with a structured error payload (bad key, date
    /// out of range, quota); retrying the same request will not help.
    Rejected(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Transient(msg) => write!(f, "transport error: {}", msg),
            FeedError::Rejected(msg) => write!(f, "rejected by source: {}", msg),
        }
    }
}

impl Error for FeedError {}

/// The upstream feed seam; implemented by [`PtxClient`] in production and by
/// stubs in tests.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_daily_timetables(
        &self,
        mode: Mode,
        date: NaiveDate,
    ) -> Result<Vec<RawTimetable>, FeedError>;
}

pub struct PtxClient {
    http: reqwest::Client,
    keys: Vec<(String, String)>,
}

impl PtxClient {
    /// Reads credentials from `PTX_KEYS` (a file of alternating id/key lines)
    /// and/or `PTX_APP_ID`/`PTX_APP_KEY`.
    pub fn from_env() -> Result<PtxClient, Box<dyn Error>> {
        let mut keys = Vec::new();
        if let Ok(path) = env::var("PTX_KEYS") {
            let content = fs::read_to_string(&path)?;
            let mut lines = content.lines().map(str::trim).filter(|line| !line.is_empty());
            while let (Some(id), Some(key)) = (lines.next(), lines.next()) {
                keys.push((id.to_string(), key.to_string()));
            }
        }
        if let (Ok(id), Ok(key)) = (env::var("PTX_APP_ID"), env::var("PTX_APP_KEY")) {
            keys.push((id, key));
        }
        if keys.is_empty() {
            return Err("no PTX credentials; set PTX_KEYS or PTX_APP_ID/PTX_APP_KEY".into());
        }

        Ok(PtxClient {
            http: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            keys,
        })
    }

    fn auth_headers(app_id: &str, app_key: &str) -> (String, String) {
        let xdate = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let mut mac = Hmac::<Sha1>::new_from_slice(app_key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(format!("x-date: {}", xdate).as_bytes());
        let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
        let authorization = format!(
            "hmac username=\"{}\", algorithm=\"hmac-sha1\", headers=\"x-date\", signature=\"{}\"",
            app_id, signature
        );
        (xdate, authorization)
    }

    /// One signed request, cycling through the configured credentials until
    /// one is accepted. A `{"message": ...}` body means the platform turned
    /// the request down for that credential.
    async fn request(&self, url: &str) -> Result<serde_json::Value, FeedError> {
        let mut rejection = None;
        for (app_id, app_key) in &self.keys {
            let (xdate, authorization) = Self::auth_headers(app_id, app_key);
            let response = self
                .http
                .get(url)
                .query(&[("$format", "JSON")])
                .header("Authorization", authorization)
                .header("x-date", xdate)
                .send()
                .await
                .map_err(|err| FeedError::Transient(err.to_string()))?;
            let value: serde_json::Value = response
                .json()
                .await
                .map_err(|err| FeedError::Transient(err.to_string()))?;

            if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
                debug!("PTX rejected credential {}: {}", app_id, message);
                rejection = Some(message.to_string());
                continue;
            }
            return Ok(value);
        }

        Err(FeedError::Rejected(
            rejection.unwrap_or_else(|| "no usable credentials".to_string()),
        ))
    }
}

#[async_trait]
impl ScheduleSource for PtxClient {
    async fn fetch_daily_timetables(
        &self,
        mode: Mode,
        date: NaiveDate,
    ) -> Result<Vec<RawTimetable>, FeedError> {
        let base = match mode {
            Mode::Tra => TRA_DAILY_TIMETABLE_URL,
            Mode::Thsr => THSR_DAILY_TIMETABLE_URL,
        };
        let url = format!("{}{}", base, date.format("%Y-%m-%d"));

        for attempt in 1..=EMPTY_RETRY_LIMIT {
            let value = self.request(&url).await?;
            let timetables: Vec<RawTimetable> = serde_json::from_value(value)
                .map_err(|err| FeedError::Transient(format!("unexpected payload: {}", err)))?;

            if !timetables.is_empty() || attempt == EMPTY_RETRY_LIMIT {
                return Ok(timetables);
            }
            warn!("empty {} payload for {}, retrying", mode, date);
            tokio::time::sleep(EMPTY_RETRY_DELAY).await;
        }

        Ok(Vec::new())
    }
}
