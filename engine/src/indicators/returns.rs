// Simple percent returns
use super::IndicatorCalculator;
use serde_json::Value;

pub struct Returns;

impl IndicatorCalculator for Returns {
    fn name(&self) -> &str {
        "RETURN"
    }

    fn parameters(&self) -> Value {
        serde_json::json!({})
    }

    /// `ret[t] = close[t] / close[t-1] - 1`; undefined at t = 0 and after a zero close.
    fn calculate(&self, data: &[f64]) -> Vec<Option<f64>> {
        let mut results = Vec::with_capacity(data.len());
        if data.is_empty() {
            return results;
        }
        results.push(None);
        for pair in data.windows(2) {
            let (prev, curr) = (pair[0], pair[1]);
            if prev == 0.0 {
                results.push(None);
            } else {
                results.push(Some(curr / prev - 1.0));
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::assert_close;

    #[test]
    fn test_returns() {
        let results = Returns.calculate(&[100.0, 110.0, 99.0, 0.0, 5.0]);
        assert_eq!(results.len(), 5);
        assert_eq!(results[0], None);
        assert_close(results[1].unwrap(), 0.10, 1e-12);
        assert_close(results[2].unwrap(), -0.10, 1e-12);
        assert_close(results[3].unwrap(), -1.0, 1e-12);
        assert_eq!(results[4], None);
    }

    #[test]
    fn test_returns_short_input() {
        assert!(Returns.calculate(&[]).is_empty());
        assert_eq!(Returns.calculate(&[1.0]), vec![None]);
    }
}
