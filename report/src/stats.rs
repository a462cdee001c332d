use serde::Serialize;
use statrs::statistics::{Data, Distribution, Max, Median, Min};

/// A named numeric column of the joined dataset.
#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Series {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveStats {
    pub metric: String,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

pub fn describe(series: &Series) -> DescriptiveStats {
    if series.values.is_empty() {
        return DescriptiveStats {
            metric: series.name.clone(),
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        };
    }
    let data = Data::new(series.values.clone());
    DescriptiveStats {
        metric: series.name.clone(),
        mean: data.mean().unwrap_or(f64::NAN),
        median: data.median(),
        std: if series.values.len() > 1 {
            data.std_dev().unwrap_or(f64::NAN)
        } else {
            f64::NAN
        },
        min: data.min(),
        max: data.max(),
    }
}

/// 1-based ranks; tied values share the average of their positions.
pub fn rank(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1 ..= end
        let shared = (start + 1 + end) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = shared;
        }
        start = end;
    }
    ranks
}

/// Pearson coefficient; NaN when either side has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x[..n].iter().zip(&y[..n]) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Pairwise Spearman coefficients, `values[i][j]` for `names[i]` vs `names[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn spearman(series: &[Series]) -> Self {
        let ranks: Vec<Vec<f64>> = series.iter().map(|s| rank(&s.values)).collect();
        let values = ranks
            .iter()
            .map(|a| ranks.iter().map(|b| pearson(a, b)).collect())
            .collect();
        CorrelationMatrix {
            names: series.iter().map(|s| s.name.clone()).collect(),
            values,
        }
    }

    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == row)?;
        let j = self.names.iter().position(|n| n == col)?;
        Some(self.values[i][j])
    }
}
