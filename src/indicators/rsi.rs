/// Calculate Relative Strength Index (RSI)
///
/// RSI measures the magnitude of recent price changes to evaluate
/// overbought or oversold conditions. Gains and losses are simple means
/// over the last `period` close-to-close changes, so `period + 1` prices
/// are required.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// Returns `None` for insufficient data and for a flat series (no gains
/// and no losses), where the ratio is undefined.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let recent = &prices[prices.len() - (period + 1)..];
    let mut total_gain = 0.0;
    let mut total_loss = 0.0;

    for pair in recent.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            total_gain += change;
        } else {
            total_loss += change.abs();
        }
    }

    let avg_gain = total_gain / period as f64;
    let avg_loss = total_loss / period as f64;

    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return None;
        }
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    let rsi = 100.0 - (100.0 / (1.0 + rs));

    Some(rsi.clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_calculation() {
        let prices = vec![
            44.0, 44.25, 44.5, 43.75, 44.0, 44.5, 45.0, 45.5, 45.25, 45.5, 46.0, 46.5, 46.25,
            46.0, 46.5,
        ];

        let rsi = calculate_rsi(&prices, 14);
        assert!(rsi.is_some());

        let rsi_value = rsi.unwrap();
        assert!(rsi_value > 0.0 && rsi_value < 100.0);
    }

    #[test]
    fn test_rsi_known_ratio() {
        // Two gains of 1.0 and one loss of 1.0: gain avg 2/3, loss avg 1/3, RS = 2
        let prices = vec![10.0, 11.0, 12.0, 11.0];
        let rsi = calculate_rsi(&prices, 3).unwrap();
        assert!((rsi - (100.0 - 100.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_insufficient_data() {
        let prices = vec![100.0, 102.0, 101.0];
        let rsi = calculate_rsi(&prices, 14);
        assert!(rsi.is_none());

        // period prices is still one short of period changes
        let prices: Vec<f64> = (0..14).map(|i| 100.0 + i as f64).collect();
        assert!(calculate_rsi(&prices, 14).is_none());
    }

    #[test]
    fn test_rsi_all_gains() {
        let prices = vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0];
        let rsi = calculate_rsi(&prices, 5);
        assert_eq!(rsi, Some(100.0));
    }

    #[test]
    fn test_rsi_all_losses() {
        let prices = vec![105.0, 104.0, 103.0, 102.0, 101.0, 100.0];
        let rsi = calculate_rsi(&prices, 5);
        assert_eq!(rsi, Some(0.0));
    }

    #[test]
    fn test_rsi_flat_series_is_undefined() {
        let prices = vec![1.2; 20];
        assert!(calculate_rsi(&prices, 14).is_none());
    }

    #[test]
    fn test_rsi_only_uses_trailing_changes() {
        // Old crash is outside the window, recent window is all gains
        let mut prices = vec![200.0, 100.0];
        prices.extend((0..6).map(|i| 100.0 + i as f64));
        assert_eq!(calculate_rsi(&prices, 5), Some(100.0));
    }

    #[test]
    fn test_rsi_bounded() {
        let mut seed = 7_u64;
        let prices: Vec<f64> = (0..200)
            .map(|_| {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                1.0 + (seed >> 40) as f64 / 1e7
            })
            .collect();

        for end in 15..prices.len() {
            if let Some(rsi) = calculate_rsi(&prices[..end], 14) {
                assert!((0.0..=100.0).contains(&rsi));
            }
        }
    }
}
