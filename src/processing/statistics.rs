use crate::state::dataset::Dataset;

/// Summary of one numeric attribute over the active rows.
#[derive(Debug, Clone)]
pub struct AttributeStats {
    pub count: usize,
    pub missing: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

impl AttributeStats {
    /// Compute statistics from raw values, filtering out NaN. `missing` counts
    /// the entries that were not usable.
    pub fn compute(values: &[Option<f64>]) -> Option<Self> {
        let mut vals: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
        if vals.is_empty() {
            return None;
        }

        let count = vals.len();
        let missing = values.len() - count;
        let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = vals.iter().sum::<f64>() / count as f64;

        vals.sort_by(f64::total_cmp);
        let median = if count % 2 == 0 {
            (vals[count / 2 - 1] + vals[count / 2]) / 2.0
        } else {
            vals[count / 2]
        };

        let variance = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
        let std_dev = variance.sqrt();

        Some(AttributeStats {
            count,
            missing,
            min,
            max,
            mean,
            median,
            std_dev,
        })
    }

    /// Statistics of attribute `attribute` over the dataset's active rows.
    pub fn for_attribute(dataset: &Dataset, attribute: usize) -> Option<Self> {
        let values: Vec<Option<f64>> = dataset
            .active_rows()
            .map(|row| row.values.get(attribute).and_then(|v| v.as_f64()))
            .collect();
        Self::compute(&values)
    }

    /// Format as a multi-line report string.
    pub fn report(&self, label: &str) -> String {
        format!(
            "{}:\n  Count: {}\n  Missing: {}\n  Min: {:.3}\n  Max: {:.3}\n  Mean: {:.3}\n  Median: {:.3}\n  Std Dev: {:.3}",
            label, self.count, self.missing, self.min, self.max, self.mean, self.median, self.std_dev
        )
    }
}
