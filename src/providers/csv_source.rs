use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::config::SourceConfig;
use crate::core::error::TrendError;
use crate::core::fetch::SeriesFetcher;
use crate::store::SeriesStore;

const REQUIRED_COLUMNS: [&str; 2] = ["Date", "Adj Close"];

/// Checks that a downloaded body looks like a price table before it is stored.
fn validate_table(symbol: &str, body: &[u8]) -> Result<(), TrendError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(body);
    let headers = rdr.headers().map_err(|e| TrendError::Retrieval {
        symbol: symbol.to_string(),
        reason: format!("response is not a CSV table: {e}"),
    })?;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !headers.iter().any(|h| h == *c))
        .collect();
    if !missing.is_empty() {
        return Err(TrendError::Retrieval {
            symbol: symbol.to_string(),
            reason: format!("response is missing columns: {}", missing.join(", ")),
        });
    }
    Ok(())
}

/// Downloads historical price tables over HTTP from a URL templated on the
/// ticker symbol.
pub struct HttpCsvFetcher {
    source: SourceConfig,
    store: SeriesStore,
    client: reqwest::Client,
}

impl HttpCsvFetcher {
    pub fn new(source: SourceConfig, store: SeriesStore) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fundtrend/1.0")
            .timeout(Duration::from_secs(source.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpCsvFetcher {
            source,
            store,
            client,
        })
    }
}

#[async_trait]
impl SeriesFetcher for HttpCsvFetcher {
    #[instrument(
        name = "CsvFetch",
        skip(self),
        fields(symbol = %symbol, category = %category)
    )]
    async fn fetch(&self, symbol: &str, category: &str) -> Result<PathBuf, TrendError> {
        let url = self.source.url_for(symbol);
        debug!("Requesting price table from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TrendError::Retrieval {
                symbol: symbol.to_string(),
                reason: format!("request error: {e} URL: {url}"),
            })?;

        debug!(status = %response.status(), "Received response");

        if !response.status().is_success() {
            return Err(TrendError::Retrieval {
                symbol: symbol.to_string(),
                reason: format!("HTTP error: {}", response.status()),
            });
        }

        let body = response.bytes().await.map_err(|e| TrendError::Retrieval {
            symbol: symbol.to_string(),
            reason: format!("failed to read response body: {e}"),
        })?;

        validate_table(symbol, &body)?;
        self.store.write(category, symbol, &body)
    }
}
