// Rolling Pearson correlation of two return columns
use serde_json::Value;

pub struct RollingCorrelation {
    window: usize,
}

impl RollingCorrelation {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn name(&self) -> String {
        format!("CORR({})", self.window)
    }

    pub fn parameters(&self) -> Value {
        serde_json::json!({ "window": self.window })
    }

    /// Defined at `t` once the trailing `window` pairs ending at `t` are all present
    /// and neither side is constant over the window.
    pub fn calculate(&self, left: &[Option<f64>], right: &[Option<f64>]) -> Vec<Option<f64>> {
        let len = left.len().min(right.len());
        let mut results = vec![None; len];
        if self.window < 2 {
            return results;
        }
        for end in (self.window - 1)..len {
            let start = end + 1 - self.window;
            let pairs: Vec<(f64, f64)> = left[start..=end]
                .iter()
                .zip(&right[start..=end])
                .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                .collect();
            if pairs.len() == self.window {
                results[end] = pearson(&pairs);
            }
        }
        results
    }
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    // Clamp rounding noise just outside [-1, 1].
    Some((cov / denom).clamp(-1.0, 1.0))
}
