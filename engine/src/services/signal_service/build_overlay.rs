// Handler for the `overlay` command: a lagged cross-asset ratio laid over a primary index
use super::helpers::deliver;
use crate::config::OverlaySettings;
use crate::data::aligner::{align, AlignMode};
use crate::data::provider::ProviderChain;
use crate::error::{EngineError, EngineResult};
use crate::notify::Notifier;
use chrono::NaiveDate;
use shared::models::{PricePoint, PriceSeries};
use shared::utils::format_decimal;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayRow {
    pub date: NaiveDate,
    /// Blank for dates after the run date.
    pub primary: Option<f64>,
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayReport {
    pub output_path: PathBuf,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub latest_ratio: Option<f64>,
}

/// numerator / denominator on the union of both legs' dates, gaps carried forward.
pub fn ratio_series(numerator: &PriceSeries, denominator: &PriceSeries) -> EngineResult<PriceSeries> {
    let frame = align(&[numerator, denominator], AlignMode::OuterFill)?;
    let (num, den) = match (frame.column(&numerator.symbol), frame.column(&denominator.symbol)) {
        (Some(n), Some(d)) => (n, d),
        _ => return Err(EngineError::Alignment("ratio legs missing from frame".to_string())),
    };
    let points: Vec<PricePoint> = frame
        .dates()
        .iter()
        .zip(num.iter().zip(den))
        .filter(|(_, (_, d))| **d != 0.0)
        .map(|(date, (n, d))| PricePoint::new(*date, n / d))
        .collect();
    let name = format!("{}/{}", numerator.symbol, denominator.symbol);
    if points.is_empty() {
        return Err(EngineError::ComputationPrecondition(format!("{} has no defined values", name)));
    }
    Ok(PriceSeries::new(name, points))
}

/// Shifts the ratio forward by `lag_days`, interpolates both onto a daily
/// calendar and keeps the view window.
pub fn overlay_rows(
    primary: &PriceSeries,
    ratio: &PriceSeries,
    settings: &OverlaySettings,
    today: NaiveDate,
) -> EngineResult<Vec<OverlayRow>> {
    let lagged = ratio.shifted(settings.lag_days);
    let frame = align(&[primary, &lagged], AlignMode::Interpolate)?;
    let (primary_values, ratio_values) = match (frame.column(&primary.symbol), frame.column(&lagged.symbol)) {
        (Some(p), Some(r)) => (p, r),
        _ => return Err(EngineError::Alignment("overlay columns missing from frame".to_string())),
    };

    let rows: Vec<OverlayRow> = frame
        .dates()
        .iter()
        .zip(primary_values.iter().zip(ratio_values))
        .filter(|(date, _)| **date >= settings.view_start)
        .map(|(date, (p, r))| OverlayRow {
            date: *date,
            primary: (*date <= today).then_some(*p),
            ratio: *r,
        })
        .collect();
    if rows.is_empty() {
        return Err(EngineError::Alignment(format!("no overlay rows on or after {}", settings.view_start)));
    }
    Ok(rows)
}

pub fn write_overlay_csv(path: &Path, primary_symbol: &str, rows: &[OverlayRow]) -> EngineResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["date", primary_symbol, "ratio"])?;
    for row in rows {
        let primary = row.primary.map(|p| format_decimal(p, 4)).unwrap_or_default();
        writer.write_record([row.date.to_string(), primary, format_decimal(row.ratio, 6)])?;
    }
    writer.flush()?;
    Ok(())
}

pub async fn handle_build_overlay(
    settings: &OverlaySettings,
    chain: &ProviderChain,
    notifier: &dyn Notifier,
    today: NaiveDate,
) -> EngineResult<OverlayReport> {
    let (primary, numerator, denominator) = tokio::try_join!(
        chain.fetch_daily(&settings.primary_symbol, settings.fetch_start),
        chain.fetch_daily(&settings.numerator_symbol, settings.fetch_start),
        chain.fetch_daily(&settings.denominator_symbol, settings.fetch_start)
    )?;

    let ratio = ratio_series(&numerator, &denominator)?;
    let rows = overlay_rows(&primary, &ratio, settings, today)?;
    write_overlay_csv(&settings.output_path, &settings.primary_symbol, &rows)?;

    let report = OverlayReport {
        output_path: settings.output_path.clone(),
        rows: rows.len(),
        first_date: rows.first().map(|r| r.date),
        last_date: rows.last().map(|r| r.date),
        latest_ratio: rows.iter().rev().find(|r| r.date <= today).map(|r| r.ratio),
    };
    tracing::info!(
        path = %report.output_path.display(),
        rows = report.rows,
        lag_days = settings.lag_days,
        "Overlay written"
    );

    let title = format!("[{}] {} overlay updated", settings.primary_symbol, ratio.symbol);
    let body = format!(
        "Rows: {} ({} to {})\nLag: {} days\nRatio today: {}\nOutput: {}",
        report.rows,
        report.first_date.map(|d| d.to_string()).unwrap_or_default(),
        report.last_date.map(|d| d.to_string()).unwrap_or_default(),
        settings.lag_days,
        report.latest_ratio.map(|r| format_decimal(r, 4)).unwrap_or_else(|| "n/a".to_string()),
        report.output_path.display()
    );
    deliver(notifier, &title, &body).await;
    Ok(report)
}
