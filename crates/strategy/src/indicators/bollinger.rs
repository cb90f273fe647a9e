use super::sma;

/// Bollinger bands aligned to the input; undefined during the SMA warm-up.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Middle band = SMA(period), outer bands at ±`width` population standard
/// deviations over the same trailing window.
pub fn bollinger(closes: &[f64], period: usize, width: f64) -> BandSeries {
    let middle = sma(closes, period);
    let mut upper = vec![None; closes.len()];
    let mut lower = vec![None; closes.len()];

    for i in 0..closes.len() {
        if let Some(mid) = middle[i] {
            let window = &closes[i + 1 - period..=i];
            let variance =
                window.iter().map(|v| (v - mid) * (v - mid)).sum::<f64>() / period as f64;
            let dev = width * variance.sqrt();
            upper[i] = Some(mid + dev);
            lower[i] = Some(mid - dev);
        }
    }

    BandSeries {
        upper,
        middle,
        lower,
    }
}
