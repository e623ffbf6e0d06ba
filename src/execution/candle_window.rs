use crate::models::Candle;

/// Bounded, chronological window of candles for one instrument
///
/// Built fresh from each broker read; keeps the most recent `max_candles`.
#[derive(Debug, Clone)]
pub struct CandleWindow {
    candles: Vec<Candle>,
    max_candles: usize,
}

impl CandleWindow {
    /// Build a window from a broker read, sorting it and keeping the newest candles
    ///
    /// # Arguments
    /// * `candles` - Candles in any order, possibly with duplicate timestamps
    /// * `max_candles` - Maximum number of candles to keep
    pub fn from_candles(mut candles: Vec<Candle>, max_candles: usize) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);

        let excess = candles.len().saturating_sub(max_candles);
        candles.drain(..excess);

        Self {
            candles,
            max_candles,
        }
    }

    /// Oldest first
    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn latest(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn max_candles(&self) -> usize {
        self.max_candles
    }
}
