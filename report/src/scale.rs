/// How values are laid out along a chart axis.
///
/// Charts are drawn in the transformed space; tick labels are mapped back
/// with [`AxisScale::inverse`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisScale {
    Linear,
    /// Base-10 logarithm. Non-positive values cannot be placed.
    Log,
    /// Linear inside `[-linthresh, linthresh]`, logarithmic outside.
    SymLog { linthresh: f64 },
}

impl AxisScale {
    pub fn forward(self, value: f64) -> f64 {
        match self {
            AxisScale::Linear => value,
            AxisScale::Log => value.log10(),
            AxisScale::SymLog { linthresh } => {
                if value.abs() <= linthresh {
                    value
                } else {
                    value.signum() * linthresh * (1.0 + (value.abs() / linthresh).log10())
                }
            }
        }
    }

    pub fn inverse(self, value: f64) -> f64 {
        match self {
            AxisScale::Linear => value,
            AxisScale::Log => 10f64.powf(value),
            AxisScale::SymLog { linthresh } => {
                if value.abs() <= linthresh {
                    value
                } else {
                    value.signum() * linthresh * 10f64.powf(value.abs() / linthresh - 1.0)
                }
            }
        }
    }

    pub fn accepts(self, value: f64) -> bool {
        value.is_finite() && (self != AxisScale::Log || value > 0.0)
    }

    /// Suffix appended to axis descriptions.
    pub fn describe(self) -> &'static str {
        match self {
            AxisScale::Linear => "",
            AxisScale::Log => " (log scale)",
            AxisScale::SymLog { .. } => " (symlog scale)",
        }
    }

    /// Padded `[min, max]` of the transformed values, never empty.
    pub fn range<I>(self, values: I) -> std::ops::Range<f64>
    where
        I: IntoIterator<Item = f64>,
    {
        let (lo, hi) = values
            .into_iter()
            .filter(|v| self.accepts(*v))
            .map(|v| self.forward(v))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        if !lo.is_finite() || !hi.is_finite() {
            return 0.0..1.0;
        }
        let pad = if hi > lo { (hi - lo) * 0.05 } else { 0.5 };
        (lo - pad)..(hi + pad)
    }
}

/// Compact tick text: `12`, `1.5`, `3.2k`, `1.1M`.
pub fn format_tick(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e4 {
        format!("{:.0}k", value / 1e3)
    } else if abs >= 1e3 {
        format!("{:.1}k", value / 1e3)
    } else if abs >= 10.0 || value == value.trunc() {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
