/// Exponential moving average with smoothing factor `2 / (period + 1)`,
/// seeded with the first value. Defined from index 0 — exponential smoothing
/// has no warm-up region, unlike the windowed indicators.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() || period == 0 {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut current = values[0];
    out.push(current);
    for &value in &values[1..] {
        current += k * (value - current);
        out.push(current);
    }
    out
}
