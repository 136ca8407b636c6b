//! Position state machine and trade accounting.
//!
//! One live position at most. Money is tracked in `Decimal`; the signal layer
//! upstream works in `f64`, so prices are converted once per step at the edge.

use crate::config::RiskConfig;
use crate::error::{PairsError, Result};
use crate::strategy::exit_policy::{
    DollarStopPolicy, ExitPolicy, PositionMark, StopPolicy, StopPrecedence,
};
use crate::strategy::Signal;
use crate::types::{ExitReason, PositionSide, PriceObservation};
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const BPS_DIVISOR: Decimal = dec!(10_000);

/// How the allocation is split between the two legs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SizingMode {
    /// Half of the allocation in each leg, in dollar terms.
    #[default]
    EqualDollar,
    /// `shares_a = |β| × shares_b`, scaled so both legs together use the allocation.
    HedgeRatio,
}

/// The live position. Leg quantities are unsigned; the side gives the direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: PositionSide,
    pub entry_price_a: Decimal,
    pub entry_price_b: Decimal,
    pub size_a: Decimal,
    pub size_b: Decimal,
    /// Hedge ratio at entry
    pub hedge_ratio: f64,
    pub unrealized_pnl: Decimal,
    pub entry_timestamp: i64,
    pub entry_fees: Decimal,
}

impl Position {
    /// Gross P&L at the given prices. Long spread is long B and short A.
    /// `None` when the result leaves the `Decimal` range.
    fn pnl_at(&self, price_a: Decimal, price_b: Decimal) -> Option<Decimal> {
        let leg_a = (price_a - self.entry_price_a).checked_mul(self.size_a)?;
        let leg_b = (price_b - self.entry_price_b).checked_mul(self.size_b)?;
        match self.side {
            PositionSide::LongSpread => leg_b.checked_sub(leg_a),
            PositionSide::ShortSpread => leg_a.checked_sub(leg_b),
            PositionSide::Flat => Some(Decimal::ZERO),
        }
    }

    fn notional_at(&self, price_a: Decimal, price_b: Decimal) -> Option<Decimal> {
        notional(self.size_a, price_a, self.size_b, price_b)
    }
}

/// A closed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: PositionSide,
    pub entry_timestamp: i64,
    pub exit_timestamp: i64,
    pub entry_price_a: Decimal,
    pub entry_price_b: Decimal,
    pub exit_price_a: Decimal,
    pub exit_price_b: Decimal,
    pub size_a: Decimal,
    pub size_b: Decimal,
    pub hedge_ratio: f64,
    /// P&L before fees
    pub gross_pnl: Decimal,
    /// Entry plus exit fees
    pub fees: Decimal,
    /// `gross_pnl - fees`
    pub realized_pnl: Decimal,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.realized_pnl > Decimal::ZERO
    }
}

/// What one step did to the account.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Set when this step closed a position
    pub trade: Option<Trade>,
    /// Account equity after the step, marked to market
    pub equity: Decimal,
    /// Fractional change of equity over the step
    pub step_return: f64,
}

/// Owns the position and the trade log for one run.
#[derive(Debug)]
pub struct PositionManager {
    config: RiskConfig,
    stop: Box<dyn ExitPolicy>,
    precedence: StopPrecedence,
    position: Option<Position>,
    trades: Vec<Trade>,
    realized_pnl: Decimal,
    last_equity: Decimal,
}

impl PositionManager {
    pub fn new(config: RiskConfig) -> Result<Self> {
        config.validate()?;
        let StopPolicy { precedence, basis } = config.stop_policy;
        Ok(Self {
            stop: Box::new(DollarStopPolicy::new(config.dollar_stop, basis)),
            precedence,
            position: None,
            trades: Vec::new(),
            realized_pnl: Decimal::ZERO,
            last_equity: config.initial_capital,
            config,
        })
    }

    /// Replace the dollar stop with another exit policy.
    pub fn with_exit_policy(mut self, policy: Box<dyn ExitPolicy>) -> Self {
        self.stop = policy;
        self
    }

    pub fn side(&self) -> PositionSide {
        self.position
            .as_ref()
            .map_or(PositionSide::Flat, |p| p.side)
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn into_trades(self) -> Vec<Trade> {
        self.trades
    }

    /// Net P&L booked by closed trades.
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Apply one signal at one observation.
    ///
    /// An open position is marked to market first and checked against the
    /// dollar stop, which may close it even on Hold. Entering while open or
    /// exiting while flat is an `InvariantViolation`.
    pub fn step(
        &mut self,
        signal: Signal,
        obs: &PriceObservation,
        hedge_ratio: f64,
    ) -> Result<StepOutcome> {
        let price_a = to_price(obs.timestamp, obs.price_a)?;
        let price_b = to_price(obs.timestamp, obs.price_b)?;

        let stop_exit = self.mark(obs.timestamp, price_a, price_b)?;

        let trade = match (self.side(), signal) {
            (PositionSide::Flat, Signal::EnterLongSpread) => {
                self.open(PositionSide::LongSpread, obs.timestamp, price_a, price_b, hedge_ratio)?;
                None
            }
            (PositionSide::Flat, Signal::EnterShortSpread) => {
                self.open(PositionSide::ShortSpread, obs.timestamp, price_a, price_b, hedge_ratio)?;
                None
            }
            (PositionSide::Flat, Signal::Hold) => None,
            (PositionSide::Flat, Signal::Exit | Signal::StopLossExit) => {
                return Err(PairsError::InvariantViolation(format!(
                    "{:?} at {} while flat",
                    signal, obs.timestamp
                )));
            }
            (
                side @ (PositionSide::LongSpread | PositionSide::ShortSpread),
                Signal::EnterLongSpread | Signal::EnterShortSpread,
            ) => {
                return Err(PairsError::InvariantViolation(format!(
                    "{:?} at {} while already {}",
                    signal, obs.timestamp, side
                )));
            }
            (PositionSide::LongSpread | PositionSide::ShortSpread, Signal::Hold) => match stop_exit {
                Some(reason) => Some(self.close(obs.timestamp, price_a, price_b, reason)?),
                None => None,
            },
            (PositionSide::LongSpread | PositionSide::ShortSpread, Signal::Exit) => {
                let reason = self.resolve(ExitReason::Signal, stop_exit);
                Some(self.close(obs.timestamp, price_a, price_b, reason)?)
            }
            (PositionSide::LongSpread | PositionSide::ShortSpread, Signal::StopLossExit) => {
                let reason = self.resolve(ExitReason::ZScoreStop, stop_exit);
                Some(self.close(obs.timestamp, price_a, price_b, reason)?)
            }
        };

        let equity = self.equity();
        let step_return = self.step_return(obs.timestamp, equity)?;
        self.last_equity = equity;

        Ok(StepOutcome {
            trade,
            equity,
            step_return,
        })
    }

    /// Account equity: capital plus booked P&L plus the open position's net value.
    pub fn equity(&self) -> Decimal {
        let open = self
            .position
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.unrealized_pnl - p.entry_fees);
        self.config.initial_capital + self.realized_pnl + open
    }

    /// Marks the open position and returns the dollar-stop verdict.
    fn mark(
        &mut self,
        timestamp: i64,
        price_a: Decimal,
        price_b: Decimal,
    ) -> Result<Option<ExitReason>> {
        let fee_rate = self.fee_rate();
        let Some(position) = self.position.as_mut() else {
            return Ok(None);
        };
        position.unrealized_pnl = position
            .pnl_at(price_a, price_b)
            .ok_or_else(|| overflow(timestamp, "unrealized P&L"))?;
        let exit_fees = position
            .notional_at(price_a, price_b)
            .and_then(|n| n.checked_mul(fee_rate))
            .ok_or_else(|| overflow(timestamp, "exit fees"))?;
        let mark = PositionMark {
            unrealized_pnl: position.unrealized_pnl,
            entry_fees: position.entry_fees,
            exit_fees,
        };
        Ok(self.stop.should_exit(&mark))
    }

    fn resolve(&self, signal_reason: ExitReason, stop_exit: Option<ExitReason>) -> ExitReason {
        match (self.precedence, stop_exit) {
            (StopPrecedence::DollarFirst, Some(reason)) => reason,
            _ => signal_reason,
        }
    }

    fn fee_rate(&self) -> Decimal {
        self.config.taker_fee_bps / BPS_DIVISOR
    }

    fn open(
        &mut self,
        side: PositionSide,
        timestamp: i64,
        price_a: Decimal,
        price_b: Decimal,
        hedge_ratio: f64,
    ) -> Result<()> {
        let (size_a, size_b) = self.size_legs(timestamp, price_a, price_b, hedge_ratio)?;
        let entry_fees = notional(size_a, price_a, size_b, price_b)
            .and_then(|n| n.checked_mul(self.fee_rate()))
            .ok_or_else(|| overflow(timestamp, "entry fees"))?;

        info!(
            %side,
            timestamp,
            hedge_ratio,
            size_a = %size_a.round_dp(4),
            size_b = %size_b.round_dp(4),
            "Opening position"
        );

        self.position = Some(Position {
            side,
            entry_price_a: price_a,
            entry_price_b: price_b,
            size_a,
            size_b,
            hedge_ratio,
            unrealized_pnl: Decimal::ZERO,
            entry_timestamp: timestamp,
            entry_fees,
        });
        Ok(())
    }

    fn size_legs(
        &self,
        timestamp: i64,
        price_a: Decimal,
        price_b: Decimal,
        hedge_ratio: f64,
    ) -> Result<(Decimal, Decimal)> {
        let allocation = self.config.allocation;
        match self.config.sizing {
            SizingMode::EqualDollar => {
                let half = allocation / dec!(2);
                half.checked_div(price_a)
                    .zip(half.checked_div(price_b))
                    .ok_or_else(|| overflow(timestamp, "leg size"))
            }
            SizingMode::HedgeRatio => {
                let beta = Decimal::from_f64(hedge_ratio.abs()).ok_or_else(|| {
                    PairsError::invalid_observation(
                        timestamp,
                        format!("hedge ratio {} cannot size a position", hedge_ratio),
                    )
                })?;
                let size_b = beta
                    .checked_mul(price_a)
                    .and_then(|leg_a| leg_a.checked_add(price_b))
                    .and_then(|per_unit| allocation.checked_div(per_unit))
                    .ok_or_else(|| overflow(timestamp, "leg size"))?;
                let size_a = beta
                    .checked_mul(size_b)
                    .ok_or_else(|| overflow(timestamp, "leg size"))?;
                Ok((size_a, size_b))
            }
        }
    }

    fn close(
        &mut self,
        timestamp: i64,
        price_a: Decimal,
        price_b: Decimal,
        reason: ExitReason,
    ) -> Result<Trade> {
        let position = self.position.take().ok_or_else(|| {
            PairsError::InvariantViolation(format!("close at {} with no open position", timestamp))
        })?;

        let gross_pnl = position
            .pnl_at(price_a, price_b)
            .ok_or_else(|| overflow(timestamp, "realized P&L"))?;
        let exit_fees = position
            .notional_at(price_a, price_b)
            .and_then(|n| n.checked_mul(self.fee_rate()))
            .ok_or_else(|| overflow(timestamp, "exit fees"))?;
        let fees = position.entry_fees + exit_fees;
        let realized_pnl = gross_pnl
            .checked_sub(fees)
            .and_then(|net| self.realized_pnl.checked_add(net).map(|total| (net, total)));
        let (realized_pnl, total_realized) =
            realized_pnl.ok_or_else(|| overflow(timestamp, "realized P&L"))?;
        self.realized_pnl = total_realized;

        info!(
            side = %position.side,
            timestamp,
            reason = %reason,
            pnl = %realized_pnl.round_dp(2),
            "Closing position"
        );

        let trade = Trade {
            side: position.side,
            entry_timestamp: position.entry_timestamp,
            exit_timestamp: timestamp,
            entry_price_a: position.entry_price_a,
            entry_price_b: position.entry_price_b,
            exit_price_a: price_a,
            exit_price_b: price_b,
            size_a: position.size_a,
            size_b: position.size_b,
            hedge_ratio: position.hedge_ratio,
            gross_pnl,
            fees,
            realized_pnl,
            exit_reason: reason,
        };
        self.trades.push(trade.clone());
        Ok(trade)
    }

    fn step_return(&self, timestamp: i64, equity: Decimal) -> Result<f64> {
        if self.last_equity <= Decimal::ZERO {
            return Err(PairsError::EquityExhausted {
                timestamp,
                equity: self.last_equity,
            });
        }
        let step_return = (equity - self.last_equity)
            .checked_div(self.last_equity)
            .and_then(|change| change.to_f64())
            .ok_or_else(|| overflow(timestamp, "step return"))?;
        debug!(equity = %equity.round_dp(2), step_return, "Step marked");
        Ok(step_return)
    }
}

fn to_price(timestamp: i64, price: f64) -> Result<Decimal> {
    if !price.is_finite() || price <= 0.0 {
        return Err(PairsError::invalid_observation(
            timestamp,
            format!("price must be positive and finite, got {}", price),
        ));
    }
    Decimal::from_f64(price).ok_or_else(|| {
        PairsError::invalid_observation(timestamp, format!("price {} is out of range", price))
    })
}

/// Traded notional of both legs.
fn notional(size_a: Decimal, price_a: Decimal, size_b: Decimal, price_b: Decimal) -> Option<Decimal> {
    size_a
        .checked_mul(price_a)?
        .checked_add(size_b.checked_mul(price_b)?)
}

fn overflow(timestamp: i64, quantity: &str) -> PairsError {
    PairsError::invalid_observation(timestamp, format!("{} overflows the decimal range", quantity))
}
