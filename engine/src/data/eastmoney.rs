//! Eastmoney quote API adapter for exchange-listed funds and Hong Kong indices.
//!
//! Daily forward-adjusted k-lines come from the history endpoint, the intraday
//! price from the snapshot endpoint. Response parsing is kept in free functions
//! so it can be tested without the network.

use crate::data::csv_parser::daily_format;
use crate::data::provider::PriceProvider;
use crate::error::{EngineError, EngineResult};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use shared::models::{PricePoint, PriceSeries};
use std::time::Duration;

const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const QUOTE_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";

/// Hang Seng family indices and their Eastmoney market ids.
const HK_INDICES: [(&str, u32); 3] = [("HSI", 100), ("HSCEI", 100), ("HSTECH", 124)];

pub fn is_hk_index(symbol: &str) -> bool {
    HK_INDICES.iter().any(|(code, _)| *code == symbol)
}

#[derive(Debug, Deserialize)]
struct KlineResponse {
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    klines: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    data: Option<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    /// Last price, scaled by 10^f59.
    #[serde(default)]
    f43: Value,
    /// Price precision.
    f59: Option<u32>,
}

pub struct EastmoneyProvider {
    client: Client,
}

impl EastmoneyProvider {
    pub fn new(timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// `1.` for Shanghai listings (codes starting 5, 6 or 9), `0.` for Shenzhen,
    /// the index market id for Hang Seng indices. `None` for anything else.
    pub fn secid(symbol: &str) -> Option<String> {
        if let Some((code, market)) = HK_INDICES.iter().find(|(code, _)| *code == symbol) {
            return Some(format!("{}.{}", market, code));
        }
        if symbol.len() != 6 || !symbol.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let market = match symbol.as_bytes()[0] {
            b'5' | b'6' | b'9' => 1,
            _ => 0,
        };
        Some(format!("{}.{}", market, symbol))
    }

    fn require_secid(symbol: &str) -> EngineResult<String> {
        Self::secid(symbol)
            .ok_or_else(|| EngineError::ProcessingError(format!("eastmoney has no market id for '{}'", symbol)))
    }
}

/// Each k-line is `date,open,close,high,low,...`.
pub fn parse_klines(symbol: &str, body: &str) -> anyhow::Result<PriceSeries> {
    let response: KlineResponse = serde_json::from_str(body).context("malformed k-line response")?;
    let data = response
        .data
        .ok_or_else(|| anyhow!("no k-line data returned for '{}'", symbol))?;

    let mut points = Vec::with_capacity(data.klines.len());
    for (idx, line) in data.klines.iter().enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 3 {
            return Err(anyhow!("k-line {} for '{}' has {} fields: '{}'", idx, symbol, fields.len(), line));
        }
        let date = daily_format::parse_date(fields[0]).with_context(|| format!("k-line {} date", idx))?;
        let close = daily_format::parse_close(fields[2]).with_context(|| format!("k-line {} close", idx))?;
        points.push(PricePoint::new(date, close));
    }
    Ok(PriceSeries::new(symbol, points))
}

/// `None` when the instrument has not traded yet (the API sends `"-"`).
pub fn parse_quote(body: &str) -> anyhow::Result<Option<f64>> {
    let response: QuoteResponse = serde_json::from_str(body).context("malformed quote response")?;
    let Some(data) = response.data else {
        return Ok(None);
    };
    let raw = match data.f43.as_f64() {
        Some(v) => v,
        None => return Ok(None),
    };
    let scale = 10f64.powi(data.f59.unwrap_or(2) as i32);
    let price = raw / scale;
    Ok((price.is_finite() && price > 0.0).then_some(price))
}

#[async_trait]
impl PriceProvider for EastmoneyProvider {
    fn name(&self) -> &str {
        "eastmoney"
    }

    fn supports(&self, symbol: &str) -> bool {
        Self::secid(symbol).is_some()
    }

    async fn fetch_daily(&self, symbol: &str, start: NaiveDate) -> EngineResult<PriceSeries> {
        let beg = start.format("%Y%m%d").to_string();
        let secid = Self::require_secid(symbol)?;
        let body = self
            .client
            .get(KLINE_URL)
            .query(&[
                ("secid", secid.as_str()),
                ("fields1", "f1,f2,f3,f4,f5,f6"),
                ("fields2", "f51,f52,f53,f54,f55,f56,f57"),
                ("klt", "101"),
                ("fqt", "1"),
                ("beg", beg.as_str()),
                ("end", "20500101"),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let series = parse_klines(symbol, &body).map_err(|e| EngineError::ProcessingError(format!("{:#}", e)))?;
        tracing::debug!(symbol = %symbol, rows = series.len(), "Eastmoney k-lines parsed");
        Ok(series.since(start))
    }

    async fn latest_quote(&self, symbol: &str) -> EngineResult<Option<f64>> {
        let secid = Self::require_secid(symbol)?;
        let body = self
            .client
            .get(QUOTE_URL)
            .query(&[("secid", secid.as_str()), ("fields", "f43,f57,f59")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_quote(&body).map_err(|e| EngineError::ProcessingError(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secid_market_prefix() {
        assert_eq!(EastmoneyProvider::secid("510880").as_deref(), Some("1.510880"));
        assert_eq!(EastmoneyProvider::secid("600519").as_deref(), Some("1.600519"));
        assert_eq!(EastmoneyProvider::secid("159915").as_deref(), Some("0.159915"));
    }

    #[test]
    fn test_secid_hang_seng_indices() {
        assert_eq!(EastmoneyProvider::secid("HSTECH").as_deref(), Some("124.HSTECH"));
        assert_eq!(EastmoneyProvider::secid("HSI").as_deref(), Some("100.HSI"));
        assert!(is_hk_index("HSCEI"));
        assert!(!is_hk_index("CAD"));
    }

    #[test]
    fn test_secid_rejects_unknown_symbols() {
        assert_eq!(EastmoneyProvider::secid("CAD"), None);
        assert_eq!(EastmoneyProvider::secid("OIL"), None);
        assert_eq!(EastmoneyProvider::secid("51088"), None);
        let provider = EastmoneyProvider::new(Duration::from_secs(1)).unwrap();
        assert!(provider.supports("HSTECH"));
        assert!(provider.supports("515980"));
        assert!(!provider.supports("CAD"));
    }

    #[test]
    fn test_parse_klines() {
        let body = r#"{"rc":0,"data":{"code":"510880","klines":[
            "2024-06-04,3.101,3.120,3.130,3.090,1000,3100.0,1.2",
            "2024-06-03,3.080,3.100,3.110,3.070,900,2790.0,1.1"
        ]}}"#;
        let series = parse_klines("510880", body).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![3.100, 3.120]);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 6, 3));
    }

    #[test]
    fn test_parse_klines_null_data() {
        let err = parse_klines("000000", r#"{"rc":0,"data":null}"#).unwrap_err();
        assert!(err.to_string().contains("no k-line data"));
    }

    #[test]
    fn test_parse_klines_bad_line() {
        let body = r#"{"data":{"klines":["2024-06-03,3.08"]}}"#;
        assert!(parse_klines("510880", body).is_err());
        let body = r#"{"data":{"klines":["2024-06-03,3.08,x"]}}"#;
        assert!(parse_klines("510880", body).is_err());
    }

    #[test]
    fn test_parse_quote() {
        assert_eq!(parse_quote(r#"{"data":{"f43":3125,"f57":"510880","f59":3}}"#).unwrap(), Some(3.125));
        assert_eq!(parse_quote(r#"{"data":{"f43":"-","f57":"510880","f59":3}}"#).unwrap(), None);
        assert_eq!(parse_quote(r#"{"data":null}"#).unwrap(), None);
        assert!(parse_quote("not json").is_err());
    }
}
