/// Returns the largest finite value, assuming a floor of zero. Empty input yields zero.
pub fn max_with_zero_floor<I>(data: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    data.into_iter()
        .filter(|v| v.is_finite())
        .fold(0.0, |max, v| if v > max { v } else { max })
}

/// Maps a value from the domain onto the range linearly. A collapsed domain maps everything
/// to the start of the range.
pub fn linear_scale(value: f64, domain: (f64, f64), range: (f64, f64)) -> f64 {
    let span = domain.1 - domain.0;
    if span == 0.0 || !span.is_finite() {
        return range.0;
    }

    range.0 + ((value - domain.0) / span) * (range.1 - range.0)
}

/// Finds the equal width bin a value belongs to for `bin_count` bins spanning `[0, max]`.
/// The upper boundary `max` lands in the last bin. Values outside the span have no bin.
pub fn equal_width_bin(value: f64, max: f64, bin_count: usize) -> Option<usize> {
    if bin_count == 0 || value.is_nan() || value < 0.0 || value > max {
        return None;
    }

    if max == 0.0 {
        return Some(0);
    }

    let width = max / bin_count as f64;
    let index = (value / width).floor() as usize;
    Some(index.min(bin_count - 1))
}

/// Returns the `[lower, upper]` edges of bin `index` for `bin_count` bins spanning `[0, max]`
pub fn equal_width_bin_edges(index: usize, max: f64, bin_count: usize) -> (f64, f64) {
    let count = bin_count.max(1) as f64;
    (
        index as f64 * max / count,
        (index + 1) as f64 * max / count,
    )
}
