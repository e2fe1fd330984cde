//! algod REST client.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use pqledger_core::{ClientResult, Confirmation, LedgerClient, Network};
use pqledger_spec::SuggestedParams;
use serde::Deserialize;
use tracing::{debug, warn};

/// Header carrying the node API token.
pub const TOKEN_HEADER: &str = "X-Algo-API-Token";

/// Where to reach algod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgodConfig {
    /// Base URL without trailing slash.
    pub url: String,
    /// API token; empty for public endpoints.
    pub token: String,
}

impl AlgodConfig {
    /// Public endpoint for `network`, if it has one.
    pub fn preset(network: Network) -> Option<&'static str> {
        match network {
            Network::MainNet => Some("https://mainnet-api.4160.nodely.dev"),
            Network::TestNet => Some("https://testnet-api.4160.nodely.dev"),
            Network::BetaNet => Some("https://betanet-api.4160.nodely.dev"),
            Network::DevNet => None,
        }
    }

    /// An explicit `url` wins over the preset; DevNet has no preset and
    /// requires one.
    pub fn resolve(
        network: Network,
        url: Option<String>,
        token: Option<String>,
    ) -> anyhow::Result<Self> {
        let url = match url.filter(|u| !u.trim().is_empty()) {
            Some(url) => url,
            None => Self::preset(network)
                .map(str::to_string)
                .ok_or_else(|| anyhow!("ALGOD_URL must be set for {network}"))?,
        };
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            token: token.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ParamsResponse {
    fee: u64,
    min_fee: u64,
    last_round: u64,
    genesis_id: String,
    genesis_hash: String,
}

#[derive(Debug, Deserialize)]
struct CompileResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    tx_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PendingResponse {
    #[serde(default)]
    confirmed_round: Option<u64>,
    #[serde(default)]
    pool_error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct StatusResponse {
    last_round: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: String,
}

impl ParamsResponse {
    fn into_params(self) -> anyhow::Result<SuggestedParams> {
        let hash = STANDARD
            .decode(&self.genesis_hash)
            .context("genesis-hash is not base64")?;
        let genesis_hash: [u8; 32] = hash
            .try_into()
            .map_err(|h: Vec<u8>| anyhow!("genesis-hash has {} bytes, expected 32", h.len()))?;
        Ok(SuggestedParams::from_last_round(
            self.last_round,
            self.fee,
            self.min_fee,
            self.genesis_id,
            genesis_hash,
        ))
    }
}

/// Client for an algod node.
#[derive(Debug, Clone)]
pub struct AlgodClient {
    http: reqwest::Client,
    config: AlgodConfig,
}

impl AlgodClient {
    /// Client for `config`.
    pub fn new(config: AlgodConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Endpoint configuration.
    pub fn config(&self) -> &AlgodConfig {
        &self.config
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.config.url);
        let builder = self.http.request(method, url);
        if self.config.token.is_empty() {
            builder
        } else {
            builder.header(TOKEN_HEADER, &self.config.token)
        }
    }

    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> anyhow::Result<T> {
        let response = builder.send().await.context("algod unreachable")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            bail!("algod returned {status}: {message}");
        }
        response.json().await.context("malformed algod response")
    }

    /// Node status: last committed round.
    pub async fn last_round(&self) -> anyhow::Result<u64> {
        let request = self.request(reqwest::Method::GET, "/v2/status");
        let status: StatusResponse = self.call(request).await?;
        Ok(status.last_round)
    }

    /// Block until the node has passed `round`; returns the new last round.
    pub async fn wait_for_block_after(&self, round: u64) -> anyhow::Result<u64> {
        let path = format!("/v2/status/wait-for-block-after/{round}");
        let status: StatusResponse = self.call(self.request(reqwest::Method::GET, &path)).await?;
        Ok(status.last_round)
    }

    async fn pending(&self, tx_id: &str) -> anyhow::Result<PendingResponse> {
        let path = format!("/v2/transactions/pending/{tx_id}");
        self.call(self.request(reqwest::Method::GET, &path)).await
    }
}

#[async_trait]
impl LedgerClient for AlgodClient {
    async fn suggested_params(&self) -> ClientResult<SuggestedParams> {
        let response: ParamsResponse = self
            .call(self.request(reqwest::Method::GET, "/v2/transactions/params"))
            .await?;
        response.into_params()
    }

    async fn compile_program(&self, source: &str) -> ClientResult<Vec<u8>> {
        let builder = self
            .request(reqwest::Method::POST, "/v2/teal/compile")
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(source.to_string());
        let response: CompileResponse = self.call(builder).await?;
        STANDARD
            .decode(response.result)
            .context("compiled program is not base64")
    }

    async fn submit_raw_group(&self, group: Bytes) -> ClientResult<String> {
        let builder = self
            .request(reqwest::Method::POST, "/v2/transactions")
            .header(reqwest::header::CONTENT_TYPE, "application/x-binary")
            .body(group);
        let response: SubmitResponse = self.call(builder).await?;
        Ok(response.tx_id)
    }

    async fn wait_for_confirmation(
        &self,
        tx_id: &str,
        max_rounds: u64,
    ) -> ClientResult<Confirmation> {
        let start = self.last_round().await?.saturating_add(1);
        let end = start.saturating_add(max_rounds);
        let mut current = start;
        while current < end {
            match self.pending(tx_id).await {
                Ok(info) => {
                    if let Some(round) = info.confirmed_round.filter(|r| *r > 0) {
                        return Ok(Confirmation::Confirmed { round });
                    }
                    if !info.pool_error.is_empty() {
                        return Ok(Confirmation::Rejected {
                            reason: info.pool_error,
                        });
                    }
                }
                Err(err) => warn!(%tx_id, "pending lookup failed: {err:#}"),
            }
            debug!(%tx_id, round = current, "waiting for block");
            self.wait_for_block_after(current).await?;
            current += 1;
        }
        Ok(Confirmation::Pending)
    }
}
