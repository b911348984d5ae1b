//! HTTP client for the simulation service's REST surface.

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::board::{BoardKind, BoardSnapshot};
use crate::stats::{DistanceStats, ObservedStats};

/// Metadata field carrying the declared round count of a simulation.
pub const ROUNDS_FIELD: &str = "roundsNum";

/// Errors produced while talking to the simulation service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid base URL {url}: {reason}")]
    BaseUrl { url: String, reason: String },
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("malformed {endpoint} payload: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Sort order accepted by the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn as_wire(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }
}

/// Optional server-side ordering of the simulation listing.
#[derive(Debug, Clone)]
pub struct ListSort {
    pub property: String,
    pub direction: SortDirection,
}

/// Client over the service's REST endpoints.
#[derive(Debug, Clone)]
pub struct SimulationClient {
    http: Client,
    base: Url,
}

impl SimulationClient {
    /// Build a client over an `http` or `https` base URL. Other schemes are
    /// rejected here so that endpoint paths are always joinable later.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|source| ClientError::BaseUrl {
            url: base_url.to_owned(),
            reason: source.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::BaseUrl {
                url: base_url.to_owned(),
                reason: format!("unsupported scheme \"{}\"", base.scheme()),
            });
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &'static str) -> Url {
        // `new` only accepts http(s) bases, which relative paths join onto.
        self.base
            .join(path)
            .expect("endpoint paths join onto an http base")
    }

    /// Fetch the mapping of simulation id to metadata, optionally ordered by
    /// the server.
    pub async fn list_simulations(
        &self,
        sort: Option<&ListSort>,
    ) -> Result<Map<String, Value>, ClientError> {
        const ENDPOINT: &str = "/list-simulations";
        let mut request = self.http.get(self.endpoint(ENDPOINT));
        if let Some(sort) = sort {
            request = request.query(&[
                ("sortProperty", sort.property.as_str()),
                ("sortDirection", sort.direction.as_wire()),
            ]);
        }
        let response = request
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint: ENDPOINT, source })?;
        parse_json(ENDPOINT, response).await
    }

    /// Fetch one board snapshot variant for a round.
    pub async fn board_state(
        &self,
        simulation_id: &str,
        round: u32,
        kind: BoardKind,
    ) -> Result<BoardSnapshot, ClientError> {
        const ENDPOINT: &str = "/read-board-state";
        debug!(simulation = simulation_id, round, ?kind, "fetching board state");
        let response = self
            .http
            .get(self.endpoint(ENDPOINT))
            .query(&[
                ("simulationId", simulation_id),
                ("round", &round.to_string()),
                ("isReal", if kind.is_real() { "true" } else { "false" }),
            ])
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint: ENDPOINT, source })?;
        parse_json(ENDPOINT, response).await
    }

    /// Fetch the global distance statistics.
    pub async fn distance_stats(
        &self,
        simulation_id: &str,
    ) -> Result<DistanceStats, ClientError> {
        const ENDPOINT: &str = "/read-distance-stats";
        let response = self
            .http
            .get(self.endpoint(ENDPOINT))
            .query(&[("simulationId", simulation_id)])
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint: ENDPOINT, source })?;
        parse_json(ENDPOINT, response).await
    }

    /// Fetch the per-beacon observed statistics. The payload may contain
    /// bare `NaN` tokens, so it is read as text and sanitized before parsing.
    pub async fn observed_stats(
        &self,
        simulation_id: &str,
    ) -> Result<ObservedStats, ClientError> {
        const ENDPOINT: &str = "/read-observed-stats";
        let response = self
            .http
            .get(self.endpoint(ENDPOINT))
            .query(&[("simulationId", simulation_id)])
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint: ENDPOINT, source })?;
        let text = read_success_body(ENDPOINT, response).await?;
        ObservedStats::parse(&text)
            .map_err(|source| ClientError::Decode { endpoint: ENDPOINT, source })
    }

    /// Delete a stored simulation; returns the server's confirmation text.
    pub async fn delete_simulation(&self, simulation_id: &str) -> Result<String, ClientError> {
        const ENDPOINT: &str = "/delete-simulation";
        let response = self
            .http
            .post(self.endpoint(ENDPOINT))
            .form(&[("simulationId", simulation_id)])
            .send()
            .await
            .map_err(|source| ClientError::Transport { endpoint: ENDPOINT, source })?;
        let message = read_success_body(ENDPOINT, response).await?;
        Ok(message.trim_end().to_owned())
    }

    /// Declared round count from the simulation's listing metadata, when the
    /// simulation exists and carries the field.
    pub async fn declared_rounds(
        &self,
        simulation_id: &str,
    ) -> Result<Option<u32>, ClientError> {
        let simulations = self.list_simulations(None).await?;
        Ok(simulations
            .get(simulation_id)
            .and_then(|meta| meta.get(ROUNDS_FIELD))
            .and_then(rounds_value))
    }
}

fn rounds_value(value: &Value) -> Option<u32> {
    value
        .as_u64()
        .map(|v| v as u32)
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

async fn read_success_body(
    endpoint: &'static str,
    response: reqwest::Response,
) -> Result<String, ClientError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|source| ClientError::Transport { endpoint, source })?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(ClientError::Status { endpoint, status, body })
    }
}

async fn parse_json<T>(endpoint: &'static str, response: reqwest::Response) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    let text = read_success_body(endpoint, response).await?;
    serde_json::from_str(&text).map_err(|source| ClientError::Decode { endpoint, source })
}
