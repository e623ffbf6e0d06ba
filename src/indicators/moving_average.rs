/// Calculate Simple Moving Average (SMA) over the last `period` prices
///
/// Uses a running mean so a constant series returns that constant exactly.
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let window = &prices[prices.len() - period..];
    let mut mean = window[0];
    for (i, price) in window.iter().enumerate().skip(1) {
        mean += (price - mean) / (i + 1) as f64;
    }

    Some(mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        let prices = vec![100.0, 102.0, 104.0, 106.0, 108.0];
        let sma = calculate_sma(&prices, 5);
        assert_eq!(sma, Some(104.0));
    }

    #[test]
    fn test_sma_uses_trailing_window() {
        let prices = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let sma = calculate_sma(&prices, 3).unwrap();
        assert!((sma - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_sma_insufficient_data() {
        let prices = vec![100.0, 102.0];
        let sma = calculate_sma(&prices, 5);
        assert!(sma.is_none());
    }

    #[test]
    fn test_sma_zero_period() {
        assert!(calculate_sma(&[1.0, 2.0], 0).is_none());
    }

    #[test]
    fn test_sma_constant_series_is_exact() {
        for value in [1.2, 0.1, 1.17345, 98765.4321] {
            let prices = vec![value; 100];
            assert_eq!(calculate_sma(&prices, 10), Some(value));
            assert_eq!(calculate_sma(&prices, 50), Some(value));
        }
    }
}
