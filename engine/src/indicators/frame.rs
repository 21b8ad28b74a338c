// Assembles indicator rows from aligned close prices
use super::{IndicatorCalculator, Macd, Returns, RollingCorrelation, RollingVolatility};
use crate::config::MacdPeriods;
use crate::data::aligner::AlignedFrame;
use crate::error::{EngineError, EngineResult};
use chrono::NaiveDate;
use shared::models::{IndicatorRow, PriceSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskWindows {
    pub vol_window: usize,
    pub corr_window: usize,
}

pub struct IndicatorEngine {
    macd: Macd,
}

impl IndicatorEngine {
    pub fn new(periods: MacdPeriods) -> Self {
        Self { macd: Macd::new(periods) }
    }

    pub fn macd_frame(&self, series: &PriceSeries) -> Vec<IndicatorRow> {
        self.rows(&series.dates(), &series.closes())
    }

    /// MACD on `signal`, plus returns of both columns, volatility of the signal
    /// returns and the rolling correlation between the two return columns.
    pub fn risk_frame(
        &self,
        frame: &AlignedFrame,
        signal: &str,
        target: &str,
        windows: RiskWindows,
    ) -> EngineResult<Vec<IndicatorRow>> {
        let signal_closes = frame
            .column(signal)
            .ok_or_else(|| EngineError::ComputationPrecondition(format!("column '{}' missing from frame", signal)))?;
        let target_closes = frame
            .column(target)
            .ok_or_else(|| EngineError::ComputationPrecondition(format!("column '{}' missing from frame", target)))?;

        let volatility = RollingVolatility::new(windows.vol_window);
        let correlation = RollingCorrelation::new(windows.corr_window);
        tracing::debug!(
            volatility = %volatility.parameters(),
            correlation = %correlation.parameters(),
            "Computing risk columns"
        );

        let signal_ret = Returns.calculate(signal_closes);
        let target_ret = Returns.calculate(target_closes);
        let vol = volatility.over_returns(&signal_ret);
        let corr = correlation.calculate(&signal_ret, &target_ret);

        let mut rows = self.rows(frame.dates(), signal_closes);
        for (i, row) in rows.iter_mut().enumerate() {
            row.ret = signal_ret[i];
            row.target_ret = target_ret[i];
            row.volatility = vol[i];
            row.correlation = corr[i];
        }
        Ok(rows)
    }

    fn rows(&self, dates: &[NaiveDate], closes: &[f64]) -> Vec<IndicatorRow> {
        tracing::debug!(indicator = self.macd.name(), parameters = %self.macd.parameters(), rows = closes.len(), "Computing MACD");
        let m = self.macd.compute(closes);
        dates
            .iter()
            .zip(closes)
            .enumerate()
            .map(|(i, (date, close))| IndicatorRow {
                date: *date,
                close: *close,
                ema_fast: m.ema_fast[i],
                ema_slow: m.ema_slow[i],
                dif: m.dif[i],
                dea: m.dea[i],
                macd: m.macd[i],
                ret: None,
                target_ret: None,
                volatility: None,
                correlation: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aligner::{align, AlignMode};
    use crate::indicators::test_support::assert_close;
    use chrono::Duration;
    use shared::models::PricePoint;

    fn series(symbol: &str, closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::new(
            symbol,
            closes
                .iter()
                .enumerate()
                .map(|(i, c)| PricePoint::new(start + Duration::days(i as i64), *c))
                .collect(),
        )
    }

    #[test]
    fn test_macd_frame_rows_match_input() {
        let s = series("510880", &[10.0, 11.0, 9.0, 12.0, 13.0]);
        let rows = IndicatorEngine::new(MacdPeriods { fast: 2, slow: 4, signal: 3 }).macd_frame(&s);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[4].close, 13.0);
        assert_close(rows[4].ema_fast, 1004.0 / 81.0, 1e-12);
        assert!(rows.iter().all(|r| r.volatility.is_none() && r.correlation.is_none()));
    }

    #[test]
    fn test_risk_frame_fills_return_columns() {
        let a: Vec<f64> = (0..12).map(|i| 100.0 + (i % 4) as f64).collect();
        let b: Vec<f64> = (0..12).map(|i| 50.0 + (i % 3) as f64).collect();
        let (sa, sb) = (series("A", &a), series("B", &b));
        let frame = align(&[&sa, &sb], AlignMode::Inner).unwrap();
        let windows = RiskWindows { vol_window: 4, corr_window: 5 };
        let rows = IndicatorEngine::new(MacdPeriods { fast: 2, slow: 4, signal: 3 })
            .risk_frame(&frame, "A", "B", windows)
            .unwrap();

        assert_eq!(rows.len(), 12);
        assert!(rows[0].ret.is_none());
        assert_close(rows[1].ret.unwrap(), 0.01, 1e-12);
        assert_close(rows[1].target_ret.unwrap(), 0.02, 1e-12);
        assert!(rows[3].volatility.is_none());
        assert!(rows[4].volatility.is_some());
        assert!(rows[4].correlation.is_none());
        assert!(rows[5].correlation.is_some());
    }

    #[test]
    fn test_risk_frame_missing_column() {
        let sa = series("A", &[1.0, 2.0]);
        let frame = align(&[&sa], AlignMode::Single).unwrap();
        let windows = RiskWindows { vol_window: 2, corr_window: 2 };
        let result = IndicatorEngine::new(MacdPeriods { fast: 2, slow: 4, signal: 3 }).risk_frame(&frame, "A", "B", windows);
        assert!(matches!(result, Err(EngineError::ComputationPrecondition(_))));
    }
}
