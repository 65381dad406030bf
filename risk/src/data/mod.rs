//! Price and return inputs
//!
//! - `PriceHistoryProvider`: ordered `(timestamp, price)` history per ticker
//! - `InMemoryPriceProvider` and `CsvPriceProvider` implementations
//! - `align_price_histories`: inner join of several tickers on timestamp
//! - `TabularData`: named numeric columns from CSV or JSON documents

mod csv_provider;
mod tabular;

pub use csv_provider::CsvPriceProvider;
pub use tabular::TabularData;

use crate::error::{ProviderError, Result};
use crate::portfolio::{build_asset_returns, AssetReturns};
use chrono::{DateTime, Datelike, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A single observed price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Sampling interval of a price history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    fn bucket(&self, timestamp: &DateTime<Utc>) -> (i32, u32) {
        match self {
            Interval::Daily => (timestamp.year(), timestamp.ordinal()),
            Interval::Weekly => {
                let week = timestamp.iso_week();
                (week.year(), week.week())
            }
            Interval::Monthly => (timestamp.year(), timestamp.month()),
        }
    }

    /// Keep the last observation of each period. Input must be time-ordered.
    pub fn resample(&self, points: &[PricePoint]) -> Vec<PricePoint> {
        let mut out: Vec<PricePoint> = Vec::with_capacity(points.len());
        let mut last_bucket = None;
        for point in points {
            let bucket = self.bucket(&point.timestamp);
            if last_bucket == Some(bucket) {
                if let Some(last) = out.last_mut() {
                    *last = *point;
                }
            } else {
                out.push(*point);
                last_bucket = Some(bucket);
            }
        }
        out
    }
}

/// What history to fetch for a ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceHistoryRequest {
    /// Keep only the most recent `lookback` periods (None = everything)
    pub lookback: Option<usize>,

    pub interval: Interval,
}

impl PriceHistoryRequest {
    /// Apply interval sampling then the lookback window to a sorted history
    pub fn apply(&self, points: &[PricePoint]) -> Vec<PricePoint> {
        let mut sampled = self.interval.resample(points);
        if let Some(lookback) = self.lookback {
            let skip = sampled.len().saturating_sub(lookback);
            sampled.drain(..skip);
        }
        sampled
    }
}

/// Source of historical prices
pub trait PriceHistoryProvider {
    /// Time-ordered history for `ticker`; an empty result is an error
    fn price_history(
        &self,
        ticker: &str,
        request: &PriceHistoryRequest,
    ) -> std::result::Result<Vec<PricePoint>, ProviderError>;
}

/// Provider backed by prices held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceProvider {
    histories: HashMap<String, Vec<PricePoint>>,
}

impl InMemoryPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticker: impl Into<String>, mut points: Vec<PricePoint>) {
        points.sort_by_key(|p| p.timestamp);
        self.histories.insert(ticker.into(), points);
    }

    pub fn with_history(mut self, ticker: impl Into<String>, points: Vec<PricePoint>) -> Self {
        self.insert(ticker, points);
        self
    }
}

impl PriceHistoryProvider for InMemoryPriceProvider {
    fn price_history(
        &self,
        ticker: &str,
        request: &PriceHistoryRequest,
    ) -> std::result::Result<Vec<PricePoint>, ProviderError> {
        let points = self
            .histories
            .get(ticker)
            .ok_or_else(|| ProviderError::UnknownTicker(ticker.to_string()))?;
        let points = request.apply(points);
        if points.is_empty() {
            return Err(ProviderError::Empty(ticker.to_string()));
        }
        Ok(points)
    }
}

/// Prices of several tickers on a shared set of timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    pub timestamps: Vec<DateTime<Utc>>,
    pub prices: IndexMap<String, Vec<f64>>,
}

impl PriceTable {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Simple returns of every column, aligned by period
    pub fn to_asset_returns(&self) -> Result<AssetReturns> {
        build_asset_returns(
            self.prices
                .iter()
                .map(|(ticker, column)| (ticker.clone(), column.clone()))
                .collect(),
        )
    }
}

/// Inner-join histories on timestamp, keeping only periods every ticker has.
///
/// Duplicate timestamps within one history keep the last price.
pub fn align_price_histories(histories: Vec<(String, Vec<PricePoint>)>) -> Result<PriceTable> {
    let mut by_ticker: IndexMap<String, BTreeMap<DateTime<Utc>, f64>> = IndexMap::new();
    for (ticker, points) in histories {
        if points.is_empty() {
            return Err(ProviderError::Empty(ticker).into());
        }
        let series = points.into_iter().map(|p| (p.timestamp, p.price)).collect();
        by_ticker.insert(ticker, series);
    }

    let timestamps: Vec<DateTime<Utc>> = match by_ticker.values().next() {
        Some(first) => first
            .keys()
            .filter(|ts| by_ticker.values().all(|series| series.contains_key(*ts)))
            .copied()
            .collect(),
        None => Vec::new(),
    };

    let prices = by_ticker
        .iter()
        .map(|(ticker, series)| {
            let column = timestamps.iter().map(|ts| series[ts]).collect();
            (ticker.clone(), column)
        })
        .collect();

    tracing::debug!(periods = timestamps.len(), "aligned price histories");

    Ok(PriceTable { timestamps, prices })
}

/// Fetch every ticker from `provider` and align them
pub fn fetch_aligned<P: PriceHistoryProvider + ?Sized>(
    provider: &P,
    tickers: &[String],
    request: &PriceHistoryRequest,
) -> Result<PriceTable> {
    let histories = tickers
        .iter()
        .map(|ticker| {
            provider
                .price_history(ticker, request)
                .map(|points| (ticker.clone(), points))
        })
        .collect::<std::result::Result<Vec<_>, ProviderError>>()?;
    align_price_histories(histories)
}
