//! Sina Finance adapter for foreign futures (LME copper `CAD`, Brent `OIL`, ...).
//!
//! The daily k-line endpoint answers with a JSONP wrapper around an array of
//! bars whose numbers arrive as strings. Parsing stays a free function so it
//! can be tested without the network.

use crate::data::csv_parser::daily_format;
use crate::data::eastmoney::is_hk_index;
use crate::data::provider::PriceProvider;
use crate::error::{EngineError, EngineResult};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::REFERER;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use shared::models::{PricePoint, PriceSeries};
use std::time::Duration;

const KLINE_URL: &str = "https://stock2.finance.sina.com.cn/futures/api/jsonp.php";
const KLINE_METHOD: &str = "GlobalFuturesService.getGlobalFuturesDailyKLine";

#[derive(Debug, Deserialize)]
struct DailyBar {
    date: String,
    close: Value,
}

pub struct SinaFuturesProvider {
    client: Client,
}

impl SinaFuturesProvider {
    pub fn new(timeout: Duration) -> EngineResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

/// Foreign futures codes are short upper-case tickers; Hang Seng indices are excluded.
pub fn is_futures_code(symbol: &str) -> bool {
    (1..=6).contains(&symbol.len()) && symbol.bytes().all(|b| b.is_ascii_uppercase()) && !is_hk_index(symbol)
}

/// Strips the `var _S=(...)` wrapper and reads each bar's date and close.
pub fn parse_daily_kline(symbol: &str, body: &str) -> anyhow::Result<PriceSeries> {
    let (open, close) = match (body.find('['), body.rfind(']')) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => return Err(anyhow!("no k-line array in response for '{}'", symbol)),
    };
    let bars: Vec<DailyBar> =
        serde_json::from_str(&body[open..=close]).context("malformed futures k-line response")?;

    let mut points = Vec::with_capacity(bars.len());
    for (idx, bar) in bars.iter().enumerate() {
        let date = daily_format::parse_date(&bar.date).with_context(|| format!("bar {} date", idx))?;
        let close = match &bar.close {
            Value::String(raw) => daily_format::parse_close(raw),
            Value::Number(n) => n.as_f64().ok_or_else(|| anyhow!("close out of range")),
            other => Err(anyhow!("unexpected close {}", other)),
        }
        .with_context(|| format!("bar {} close", idx))?;
        points.push(PricePoint::new(date, close));
    }
    Ok(PriceSeries::new(symbol, points))
}

#[async_trait]
impl PriceProvider for SinaFuturesProvider {
    fn name(&self) -> &str {
        "sina"
    }

    fn supports(&self, symbol: &str) -> bool {
        is_futures_code(symbol)
    }

    async fn fetch_daily(&self, symbol: &str, start: NaiveDate) -> EngineResult<PriceSeries> {
        let url = format!("{}/var%20_S{}=/{}", KLINE_URL, start.format("%Y_%m_%d"), KLINE_METHOD);
        let body = self
            .client
            .get(&url)
            .header(REFERER, "https://finance.sina.com.cn")
            .query(&[("symbol", symbol), ("source", "web")])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let series =
            parse_daily_kline(symbol, &body).map_err(|e| EngineError::ProcessingError(format!("{:#}", e)))?;
        tracing::debug!(symbol = %symbol, rows = series.len(), "Sina futures k-lines parsed");
        Ok(series.since(start))
    }
}
