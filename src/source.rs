use std::fmt;

use futures::future::BoxFuture;
use log::{debug, warn};
use reqwest::Client;

use crate::{
    outline::{OutlineError, ReferenceOutline},
    station::{StationParseError, StationRecord},
    time_window::TimeWindow,
};

#[derive(Clone, Debug, PartialEq)]
pub enum SourceError {
    Request(String),
    Status { status: u16, body: String },
    Payload(StationParseError),
    Outline(OutlineError),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Request(reason) => write!(f, "request failed: {reason}"),
            SourceError::Status { status, body } => {
                write!(f, "request returned status {status}: {body}")
            }
            SourceError::Payload(e) => write!(f, "{e}"),
            SourceError::Outline(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        SourceError::Request(e.to_string())
    }
}

impl From<StationParseError> for SourceError {
    fn from(e: StationParseError) -> Self {
        SourceError::Payload(e)
    }
}

impl From<OutlineError> for SourceError {
    fn from(e: OutlineError) -> Self {
        SourceError::Outline(e)
    }
}

pub type PopularityFetch = BoxFuture<'static, Result<Vec<StationRecord>, SourceError>>;

/// Provider of station popularity for a time window. Each call is a fresh fetch.
pub trait PopularitySource {
    fn fetch(&self, window: TimeWindow) -> PopularityFetch;
}

/// Popularity endpoint reached over HTTP, `GET <endpoint>?start_hour=<s>&end_hour=<e>`
#[derive(Debug, Clone)]
pub struct HttpPopularitySource {
    client: Client,
    endpoint: String,
}

impl HttpPopularitySource {
    pub fn new(endpoint: &str) -> Self {
        HttpPopularitySource::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: &str) -> Self {
        HttpPopularitySource {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    pub fn popularity_url(&self, window: &TimeWindow) -> String {
        let separator = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.endpoint, separator, window.query())
    }
}

impl PopularitySource for HttpPopularitySource {
    fn fetch(&self, window: TimeWindow) -> PopularityFetch {
        let client = self.client.clone();
        let url = self.popularity_url(&window);

        Box::pin(async move {
            debug!("fetching popularity from {url}");
            let body = get_text(&client, &url).await?;
            let records = StationRecord::from_json(&body)?;
            debug!("received {} station records for {window}", records.len());
            Ok(records)
        })
    }
}

/// Fetches the reference outline GeoJSON once at startup
pub async fn fetch_outline(client: &Client, url: &str) -> Result<ReferenceOutline, SourceError> {
    let body = get_text(client, url).await?;
    Ok(ReferenceOutline::from_geojson(&body)?)
}

async fn get_text(client: &Client, url: &str) -> Result<String, SourceError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        warn!("{url} returned {status}");
        return Err(SourceError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(body)
}
