use crate::data::provider::PriceProvider;
use crate::error::{EngineError, EngineResult};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use shared::models::{PricePoint, PriceSeries};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

// Date and number parsing for exported daily price files
pub mod daily_format {
    use anyhow::{anyhow, Result};
    use chrono::NaiveDate;

    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

    /// Parses `2024-12-30`, `2024/12/30` or `20241230`.
    pub fn parse_date(s: &str) -> Result<NaiveDate> {
        let trimmed = s.trim();
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
            .ok_or_else(|| anyhow!("Failed to parse date '{}'", s))
    }

    /// Parses a plain decimal, tolerating thousands separators (`1,234.5`).
    pub fn parse_close(s: &str) -> Result<f64> {
        let normalized = s.trim().replace(',', "");
        let value: f64 = normalized
            .parse()
            .map_err(|e| anyhow!("Failed to parse decimal '{}': {}", s, e))?;
        if !value.is_finite() {
            return Err(anyhow!("Non-finite close '{}'", s));
        }
        Ok(value)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::Datelike;

        #[test]
        fn test_parse_date_formats() {
            for raw in ["2024-12-30", "2024/12/30", "20241230", " 2024-12-30 "] {
                let d = parse_date(raw).unwrap();
                assert_eq!((d.year(), d.month(), d.day()), (2024, 12, 30));
            }
        }

        #[test]
        fn test_parse_date_invalid() {
            assert!(parse_date("30/12/2024").is_err());
            assert!(parse_date("2024-13-01").is_err());
        }

        #[test]
        fn test_parse_close() {
            assert_eq!(parse_close("3.125").unwrap(), 3.125);
            assert_eq!(parse_close("1,234.5").unwrap(), 1234.5);
            assert!(parse_close("abc").is_err());
            assert!(parse_close("NaN").is_err());
        }
    }
}

const DATE_HEADERS: [&str; 2] = ["date", "日期"];
const CLOSE_HEADERS: [&str; 2] = ["close", "收盘"];

pub struct CsvPriceParser;

impl CsvPriceParser {
    // CSV Header: date,close (extra columns are ignored, header names are case-insensitive)
    // Example Row: 2024-12-30,3.125
    pub fn load_series_from_csv(file_path: &Path, symbol: &str) -> Result<PriceSeries> {
        let file = File::open(file_path)
            .map_err(|e| anyhow!("Failed to open CSV file '{}': {}", file_path.display(), e))?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let headers = rdr.headers()?.clone();
        let date_idx = Self::find_column(&headers, &DATE_HEADERS)
            .ok_or_else(|| anyhow!("Missing 'date' column in '{}'", file_path.display()))?;
        let close_idx = Self::find_column(&headers, &CLOSE_HEADERS)
            .ok_or_else(|| anyhow!("Missing 'close' column in '{}'", file_path.display()))?;

        let mut points = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let line = idx + 2;
            let record = result.map_err(|e| anyhow!("Error reading CSV record at line {}: {}", line, e))?;

            let date_str = Self::get_field(&record, date_idx)
                .ok_or_else(|| anyhow!("Missing 'date' field in CSV record at line {}", line))?;
            let close_str = Self::get_field(&record, close_idx)
                .ok_or_else(|| anyhow!("Missing 'close' field in CSV record at line {}", line))?;

            let date = daily_format::parse_date(date_str)
                .map_err(|e| anyhow!("Error parsing 'date' at line {}: {}", line, e))?;
            let close = daily_format::parse_close(close_str)
                .map_err(|e| anyhow!("Error parsing 'close' at line {}: {}", line, e))?;

            points.push(PricePoint::new(date, close));
        }
        Ok(PriceSeries::new(symbol, points))
    }

    fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
    }

    // Empty cells count as missing.
    fn get_field(record: &StringRecord, pos: usize) -> Option<&str> {
        record.get(pos).filter(|v| !v.trim().is_empty())
    }
}

/// Serves `<dir>/<symbol>.csv` files as a price source.
pub struct CsvFileProvider {
    name: String,
    dir: PathBuf,
}

impl CsvFileProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            name: format!("csv:{}", dir.display()),
            dir,
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }
}

#[async_trait]
impl PriceProvider for CsvFileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_daily(&self, symbol: &str, start: NaiveDate) -> EngineResult<PriceSeries> {
        let path = self.path_for(symbol);
        if !path.exists() {
            return Err(EngineError::IoError {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no price file at '{}'", path.display()),
                ),
            });
        }
        let series = CsvPriceParser::load_series_from_csv(&path, symbol)
            .map_err(|e| EngineError::CsvDataFormatError(e.to_string()))?;
        Ok(series.since(start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    #[test]
    fn test_load_series_valid_data() {
        let csv_content = "\
Date,Open,Close,Volume
2024-12-31,3.10,3.125,1000
2024-12-30,3.00,3.05,1200";
        let tmp_file = create_test_csv(csv_content);
        let series = CsvPriceParser::load_series_from_csv(tmp_file.path(), "510880").unwrap();

        assert_eq!(series.symbol, "510880");
        assert_eq!(series.dates(), vec![day(12, 30), day(12, 31)]);
        assert_eq!(series.closes(), vec![3.05, 3.125]);
    }

    #[test]
    fn test_load_series_chinese_headers() {
        let csv_content = "日期,开盘,收盘\n2024-06-03,1.0,1.5";
        let tmp_file = create_test_csv(csv_content);
        let series = CsvPriceParser::load_series_from_csv(tmp_file.path(), "515980").unwrap();
        assert_eq!(series.closes(), vec![1.5]);
    }

    #[test]
    fn test_load_series_empty_file() {
        let tmp_file = create_test_csv("date,close");
        let series = CsvPriceParser::load_series_from_csv(tmp_file.path(), "X").unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn test_load_series_missing_column() {
        let tmp_file = create_test_csv("date,open\n2024-06-03,1.0");
        let result = CsvPriceParser::load_series_from_csv(tmp_file.path(), "X");
        assert!(result.unwrap_err().to_string().contains("Missing 'close' column"));
    }

    #[test]
    fn test_load_series_invalid_close() {
        let tmp_file = create_test_csv("date,close\n2024-06-03,oops");
        let result = CsvPriceParser::load_series_from_csv(tmp_file.path(), "X");
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Error parsing 'close' at line 2"));
        assert!(message.contains("Failed to parse decimal 'oops'"));
    }

    #[test]
    fn test_load_series_missing_value() {
        let tmp_file = create_test_csv("date,close\n2024-06-03,");
        let result = CsvPriceParser::load_series_from_csv(tmp_file.path(), "X");
        assert!(result.unwrap_err().to_string().contains("Missing 'close' field"));
    }

    #[tokio::test]
    async fn test_file_provider_filters_by_start() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("HSTECH.csv"), "date,close\n2024-06-01,4000\n2024-06-03,4100\n").unwrap();
        let provider = CsvFileProvider::new(dir.path());
        let series = provider.fetch_daily("HSTECH", day(6, 2)).await.unwrap();
        assert_eq!(series.dates(), vec![day(6, 3)]);
        assert!(provider.name().starts_with("csv:"));
    }

    #[tokio::test]
    async fn test_file_provider_missing_file() {
        let dir = TempDir::new().unwrap();
        let provider = CsvFileProvider::new(dir.path());
        let result = provider.fetch_daily("NOPE", day(1, 1)).await;
        assert!(matches!(result, Err(EngineError::IoError { .. })));
    }
}
