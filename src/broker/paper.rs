use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use super::{Broker, BrokerError};
use crate::models::{Candle, Direction, TradeId, TradeOutcome, TradeRecord, TradeRequest};

const MINUTE_SECS: i64 = 60;
const WARMUP_MINUTES: i64 = 7 * 24 * 60; // History available before the first request
const DEFAULT_PAYOUT_RATE: f64 = 0.80;

/// Per-minute random walk for one instrument
struct MinuteSeries {
    rng: StdRng,
    first_minute: i64,
    closes: Vec<f64>,
}

impl MinuteSeries {
    fn new(seed: u64, first_minute: i64, start_price: f64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            first_minute,
            closes: vec![start_price],
        }
    }

    /// Close of the given minute, generating the walk forward as needed
    fn close_at(&mut self, minute: i64) -> Option<f64> {
        if minute < self.first_minute {
            return None;
        }
        let index = (minute - self.first_minute) as usize;
        while self.closes.len() <= index {
            let last = self.closes[self.closes.len() - 1];
            let noise = self.rng.gen_range(-0.0008..0.0008); // ±0.08% per minute
            self.closes.push(last * (1.0 + noise));
        }
        Some(self.closes[index])
    }
}

struct OpenTrade {
    record: TradeRecord,
    entry_price: f64,
    expiry_minute: i64,
}

struct PaperState {
    balance: f64,
    clock_minute: Option<i64>,
    markets: HashMap<String, MinuteSeries>,
    open: Vec<OpenTrade>,
    history: Vec<TradeRecord>,
}

/// In-process practice account
///
/// Prices are a seeded random walk per instrument, so identical requests see
/// identical candles. The simulated clock advances with the `as_of` of candle
/// requests; trades settle once the clock passes their expiry.
pub struct PaperBroker {
    seed: u64,
    payout_rate: f64,
    state: Mutex<PaperState>,
}

impl PaperBroker {
    pub fn new(starting_balance: f64, seed: u64) -> Self {
        Self {
            seed,
            payout_rate: DEFAULT_PAYOUT_RATE,
            state: Mutex::new(PaperState {
                balance: starting_balance,
                clock_minute: None,
                markets: HashMap::new(),
                open: Vec::new(),
                history: Vec::new(),
            }),
        }
    }

    /// Fraction of the stake paid on a winning trade
    pub fn with_payout_rate(mut self, payout_rate: f64) -> Self {
        self.payout_rate = payout_rate;
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, PaperState>, BrokerError> {
        self.state
            .lock()
            .map_err(|e| BrokerError::Connection(e.to_string()))
    }

    fn instrument_seed(&self, instrument: &str) -> u64 {
        instrument
            .bytes()
            .fold(self.seed ^ 0xcbf2_9ce4_8422_2325, |acc, b| {
                (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
            })
    }

    fn settle(&self, state: &mut PaperState) {
        let Some(now) = state.clock_minute else {
            return;
        };

        let (due, pending): (Vec<_>, Vec<_>) = state
            .open
            .drain(..)
            .partition(|trade| trade.expiry_minute <= now);
        state.open = pending;

        for mut trade in due {
            let exit_price = state
                .markets
                .get_mut(&trade.record.instrument)
                .and_then(|series| series.close_at(trade.expiry_minute))
                .unwrap_or(trade.entry_price);

            let amount = trade.record.amount;
            let won = match trade.record.direction {
                Direction::Buy => exit_price > trade.entry_price,
                Direction::Sell => exit_price < trade.entry_price,
            };

            if exit_price == trade.entry_price {
                trade.record.outcome = TradeOutcome::Draw;
                trade.record.profit = 0.0;
                state.balance += amount;
            } else if won {
                trade.record.outcome = TradeOutcome::Win;
                trade.record.profit = amount * self.payout_rate;
                state.balance += amount + trade.record.profit;
            } else {
                trade.record.outcome = TradeOutcome::Loss;
                trade.record.profit = -amount;
            }

            tracing::info!(
                id = %trade.record.id,
                instrument = %trade.record.instrument,
                outcome = ?trade.record.outcome,
                profit = trade.record.profit,
                "Paper trade settled"
            );
            state.history.push(trade.record);
        }
    }
}

fn starting_price(instrument: &str) -> f64 {
    match instrument {
        "BTCUSD" => 60_000.0,
        "GBPUSD" => 1.27,
        "EURUSD" => 1.08,
        _ => 100.0,
    }
}

fn minute_time(minute: i64) -> Result<DateTime<Utc>, BrokerError> {
    Utc.timestamp_opt(minute * MINUTE_SECS, 0)
        .single()
        .ok_or_else(|| BrokerError::DataUnavailable(format!("timestamp out of range: {minute}")))
}

#[async_trait]
impl Broker for PaperBroker {
    async fn get_candles(
        &self,
        instrument: &str,
        timeframe_secs: u64,
        count: usize,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<Candle>, BrokerError> {
        let per_candle = i64::try_from(timeframe_secs)
            .ok()
            .filter(|secs| *secs > 0 && secs % MINUTE_SECS == 0)
            .map(|secs| secs / MINUTE_SECS)
            .ok_or_else(|| {
                BrokerError::DataUnavailable(format!("unsupported timeframe: {timeframe_secs}s"))
            })?;
        let end_minute = as_of.timestamp().div_euclid(MINUTE_SECS);
        let seed = self.instrument_seed(instrument);

        let mut state = self.lock()?;
        state.clock_minute = Some(state.clock_minute.map_or(end_minute, |m| m.max(end_minute)));

        let series = state
            .markets
            .entry(instrument.to_string())
            .or_insert_with(|| {
                MinuteSeries::new(seed, end_minute - WARMUP_MINUTES, starting_price(instrument))
            });

        // Only buckets whose minutes are all at or before `as_of`, and whose open
        // (the close of the minute before) lies inside the generated history
        let last_bucket = (end_minute + 1).div_euclid(per_candle) - 1;
        let earliest_bucket = series.first_minute.div_euclid(per_candle) + 1;
        let requested = i64::try_from(count).unwrap_or(i64::MAX);
        let first_bucket = last_bucket
            .saturating_sub(requested.saturating_sub(1))
            .max(earliest_bucket);
        let buckets = usize::try_from(last_bucket - first_bucket + 1).unwrap_or(0);
        let mut candles = Vec::with_capacity(buckets);

        for bucket in first_bucket..=last_bucket {
            let start = bucket * per_candle;
            let Some(open) = series.close_at(start - 1) else {
                continue;
            };
            let mut high = open;
            let mut low = open;
            let mut close = open;
            for minute in start..start + per_candle {
                if let Some(price) = series.close_at(minute) {
                    high = high.max(price);
                    low = low.min(price);
                    close = price;
                }
            }

            candles.push(Candle {
                timestamp: minute_time(start)?,
                open,
                high,
                low,
                close,
            });
        }

        if candles.is_empty() {
            return Err(BrokerError::DataUnavailable(format!(
                "no candles for {instrument} before {as_of}"
            )));
        }

        self.settle(&mut state);
        Ok(candles)
    }

    async fn get_balance(&self) -> Result<f64, BrokerError> {
        let mut state = self.lock()?;
        self.settle(&mut state);
        Ok(state.balance)
    }

    async fn place_trade(&self, request: &TradeRequest) -> Result<TradeId, BrokerError> {
        let mut state = self.lock()?;
        self.settle(&mut state);

        if !(request.amount > 0.0) {
            return Err(BrokerError::RejectedOrder(format!(
                "invalid amount {}",
                request.amount
            )));
        }
        if request.amount > state.balance {
            return Err(BrokerError::RejectedOrder(format!(
                "insufficient balance: {:.2} < {:.2}",
                state.balance, request.amount
            )));
        }
        if request.expiry_minutes == 0 {
            return Err(BrokerError::RejectedOrder("expiry must be at least 1 minute".into()));
        }

        let now = state.clock_minute.ok_or_else(|| {
            BrokerError::RejectedOrder(format!("no quote for {}", request.instrument))
        })?;
        let entry_price = state
            .markets
            .get_mut(&request.instrument)
            .and_then(|series| series.close_at(now))
            .ok_or_else(|| {
                BrokerError::RejectedOrder(format!("no quote for {}", request.instrument))
            })?;

        let record = TradeRecord {
            id: Uuid::new_v4(),
            instrument: request.instrument.clone(),
            direction: request.direction,
            amount: request.amount,
            expiry_minutes: request.expiry_minutes,
            opened_at: minute_time(now)?,
            outcome: TradeOutcome::Open,
            profit: 0.0,
        };
        let id = record.id.to_string();

        state.balance -= request.amount;
        state.open.push(OpenTrade {
            record,
            entry_price,
            expiry_minute: now + request.expiry_minutes as i64,
        });

        tracing::info!(
            id = %id,
            instrument = %request.instrument,
            direction = %request.direction,
            amount = request.amount,
            entry_price,
            "Paper trade opened"
        );

        Ok(id)
    }

    async fn recent_trades(&self, count: usize) -> Result<Vec<TradeRecord>, BrokerError> {
        let mut state = self.lock()?;
        self.settle(&mut state);

        let open = state.open.iter().rev().map(|t| t.record.clone());
        let closed = state.history.iter().rev().cloned();
        let mut trades: Vec<TradeRecord> = open.chain(closed).collect();
        trades.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        trades.truncate(count);
        Ok(trades)
    }
}
