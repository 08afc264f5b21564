//! Human-readable rendering of prices, percentages and volumes.
//!
//! Absent or non-finite inputs render as `-` so a view can show "no data"
//! without special-casing.

/// Format a price with precision scaled to its magnitude.
///
/// Sub-cent prices keep 8 decimals, sub-unit 6, sub-ten 4, everything else 2.
pub fn format_price(value: Option<f64>) -> String {
    let Some(price) = value.filter(|v| v.is_finite()) else {
        return "-".into();
    };
    if price < 0.01 {
        format!("{price:.8}")
    } else if price < 1.0 {
        format!("{price:.6}")
    } else if price < 10.0 {
        format!("{price:.4}")
    } else {
        format!("{price:.2}")
    }
}

/// Format a percentage with 2 decimals, optionally with a leading `+`.
pub fn format_percent(value: Option<f64>, show_sign: bool) -> String {
    let Some(percent) = value.filter(|v| v.is_finite()) else {
        return "-".into();
    };
    if show_sign && percent > 0.0 {
        format!("+{percent:.2}%")
    } else {
        format!("{percent:.2}%")
    }
}

/// Format a volume with a `K` / `M` / `B` suffix.
pub fn format_volume(value: Option<f64>) -> String {
    let Some(volume) = value.filter(|v| v.is_finite()) else {
        return "-".into();
    };
    if volume >= 1_000_000_000.0 {
        format!("{:.2}B", volume / 1_000_000_000.0)
    } else if volume >= 1_000_000.0 {
        format!("{:.2}M", volume / 1_000_000.0)
    } else if volume >= 1_000.0 {
        format!("{:.2}K", volume / 1_000.0)
    } else {
        format!("{volume:.0}")
    }
}
