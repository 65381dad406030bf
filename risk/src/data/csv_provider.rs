//! CSV-backed price history
//!
//! Wide layout: the first column holds dates, every other column is one
//! ticker's prices. Empty cells are missing observations for that ticker.
//!
//! ```text
//! date,AAPL,MSFT
//! 2024-01-02,185.64,370.87
//! 2024-01-03,184.25,
//! ```

use super::{PriceHistoryProvider, PriceHistoryRequest, PricePoint};
use crate::error::ProviderError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Price histories loaded from a wide CSV file
#[derive(Debug, Clone, Default)]
pub struct CsvPriceProvider {
    tickers: Vec<String>,
    histories: HashMap<String, Vec<PricePoint>>,
}

impl CsvPriceProvider {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading price CSV");
        let reader = csv::Reader::from_path(path)?;
        Self::load(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ProviderError> {
        Self::load(csv::Reader::from_reader(reader))
    }

    fn load<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, ProviderError> {
        let headers = reader.headers()?.clone();
        if headers.len() < 2 {
            return Err(ProviderError::Parse {
                context: "price CSV header".to_string(),
                message: "expected a date column followed by at least one ticker".to_string(),
            });
        }

        let tickers: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();
        let mut histories: HashMap<String, Vec<PricePoint>> =
            tickers.iter().map(|t| (t.clone(), Vec::new())).collect();

        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let raw_date = record.get(0).unwrap_or_default();
            let timestamp = parse_timestamp(raw_date).ok_or_else(|| ProviderError::Parse {
                context: format!("date on row {}", line + 1),
                message: format!("unrecognized date '{}'", raw_date),
            })?;

            for (ticker, cell) in tickers.iter().zip(record.iter().skip(1)) {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                let price: f64 = cell.parse().map_err(|_| ProviderError::Parse {
                    context: format!("{} price on row {}", ticker, line + 1),
                    message: format!("'{}' is not a number", cell),
                })?;
                if let Some(history) = histories.get_mut(ticker) {
                    history.push(PricePoint::new(timestamp, price));
                }
            }
        }

        for history in histories.values_mut() {
            history.sort_by_key(|p| p.timestamp);
        }

        Ok(Self { tickers, histories })
    }

    /// Tickers in file column order
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }
}

impl PriceHistoryProvider for CsvPriceProvider {
    fn price_history(
        &self,
        ticker: &str,
        request: &PriceHistoryRequest,
    ) -> Result<Vec<PricePoint>, ProviderError> {
        let history = self
            .histories
            .get(ticker)
            .ok_or_else(|| ProviderError::UnknownTicker(ticker.to_string()))?;
        let points = request.apply(history);
        if points.is_empty() {
            return Err(ProviderError::Empty(ticker.to_string()));
        }
        Ok(points)
    }
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` or a bare `YYYY-MM-DD` (midnight UTC)
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PRICES: &str = "\
date,AAPL,MSFT
2024-01-04,181.91,367.94
2024-01-02,185.64,370.87
2024-01-03,184.25,
2024-01-05,181.18,367.75
";

    #[test]
    fn test_load_wide_csv() {
        let provider = CsvPriceProvider::from_reader(PRICES.as_bytes()).unwrap();
        assert_eq!(provider.tickers(), &["AAPL".to_string(), "MSFT".to_string()]);

        let aapl = provider
            .price_history("AAPL", &PriceHistoryRequest::default())
            .unwrap();
        assert_eq!(aapl.len(), 4);
        // Rows are re-ordered by date
        assert_eq!(aapl[0].price, 185.64);

        let msft = provider
            .price_history("MSFT", &PriceHistoryRequest::default())
            .unwrap();
        assert_eq!(msft.len(), 3);
    }

    #[test]
    fn test_unknown_ticker() {
        let provider = CsvPriceProvider::from_reader(PRICES.as_bytes()).unwrap();
        let err = provider
            .price_history("GOOG", &PriceHistoryRequest::default())
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownTicker(_)));
    }

    #[test]
    fn test_bad_cell_is_parse_error() {
        let csv = "date,AAPL\n2024-01-02,abc\n";
        let err = CsvPriceProvider::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ProviderError::Parse { .. }));

        let csv = "date,AAPL\nyesterday,1.0\n";
        assert!(CsvPriceProvider::from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PRICES.as_bytes()).unwrap();
        let provider = CsvPriceProvider::from_path(file.path()).unwrap();
        assert_eq!(provider.tickers().len(), 2);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2024-01-02").is_some());
        assert!(parse_timestamp("2024-01-02 16:00:00").is_some());
        assert!(parse_timestamp("2024-01-02T16:00:00-05:00").is_some());
        assert!(parse_timestamp("02/01/2024").is_none());
    }
}
