//! Aviator-style bet settlement
//!
//! A bet draws a multiplier and an independent win/loss outcome, then
//! applies `payout - stake` to the balance in one store step.

use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use wallet_shared::{round_money, Amount, UserId, DEFAULT_GAME};

use crate::config::BettingConfig;
use crate::domain::{BetStatus, NewBet};
use crate::errors::{AppError, Result};
use crate::repository::{BetApplication, LedgerRepository};

const MAX_GAME_LEN: usize = 64;

/// One drawn outcome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    /// Rounded to the money scale
    pub multiplier: Decimal,
    pub won: bool,
}

pub trait OutcomeSource: Send + Sync {
    fn draw(&self) -> Draw;
}

/// Uniform multiplier in the configured range, Bernoulli win flag
pub struct RandomOutcomes {
    multiplier_min: f64,
    multiplier_max: f64,
    win_probability: f64,
}

impl RandomOutcomes {
    pub fn new(config: &BettingConfig) -> Self {
        Self {
            multiplier_min: config.multiplier_min,
            multiplier_max: config.multiplier_max,
            win_probability: config.win_probability.clamp(0.0, 1.0),
        }
    }
}

impl OutcomeSource for RandomOutcomes {
    fn draw(&self) -> Draw {
        let mut rng = rand::thread_rng();
        let raw = if self.multiplier_max > self.multiplier_min {
            rng.gen_range(self.multiplier_min..=self.multiplier_max)
        } else {
            self.multiplier_min
        };
        let multiplier = Decimal::from_f64(raw)
            .map(round_money)
            .unwrap_or(Decimal::ONE);
        let won = rng.gen_bool(self.win_probability);
        Draw { multiplier, won }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetReceipt {
    pub bet_id: u64,
    pub status: BetStatus,
    pub multiplier: Decimal,
    #[serde(rename = "won_amount")]
    pub payout: Decimal,
    pub balance: Decimal,
}

#[derive(Clone)]
pub struct BetEngine {
    ledger: Arc<dyn LedgerRepository>,
    outcomes: Arc<dyn OutcomeSource>,
}

impl BetEngine {
    pub fn new(ledger: Arc<dyn LedgerRepository>, outcomes: Arc<dyn OutcomeSource>) -> Self {
        Self { ledger, outcomes }
    }

    #[tracing::instrument(skip(self, game), fields(user_id = %user_id, stake = %stake))]
    pub async fn place_bet(
        &self,
        user_id: UserId,
        game: Option<&str>,
        stake: Amount,
    ) -> Result<BetReceipt> {
        let game = game_label(game)?;

        // Fast rejection; the store re-checks atomically
        let available = self.ledger.balance(user_id).await?;
        if stake.as_decimal() > available {
            tracing::debug!(available = %available, "Stake exceeds balance");
            return Err(AppError::InsufficientFunds {
                required: stake.as_decimal(),
                available,
            });
        }

        let draw = self.outcomes.draw();
        let (status, payout) = if draw.won {
            let payout = stake
                .scaled(draw.multiplier)
                .ok_or_else(|| AppError::invalid_request("Stake too large"))?;
            (BetStatus::Won, payout.as_decimal())
        } else {
            (BetStatus::Lost, Decimal::ZERO)
        };

        let application = self
            .ledger
            .apply_bet(NewBet {
                user_id,
                game,
                stake,
                multiplier: draw.multiplier,
                status,
                payout,
            })
            .await?;

        match application {
            BetApplication::Applied { bet, balance } => {
                metrics::counter!("bets_placed_total", "outcome" => status.as_str()).increment(1);
                tracing::info!(
                    bet_id = bet.id,
                    game = %bet.game,
                    status = status.as_str(),
                    multiplier = %draw.multiplier,
                    payout = %payout,
                    balance = %balance,
                    "Bet settled"
                );
                Ok(BetReceipt {
                    bet_id: bet.id,
                    status,
                    multiplier: draw.multiplier,
                    payout,
                    balance,
                })
            }
            BetApplication::InsufficientFunds { available } => {
                tracing::warn!(available = %available, "Balance dropped below stake before settlement");
                Err(AppError::InsufficientFunds {
                    required: stake.as_decimal(),
                    available,
                })
            }
        }
    }
}

fn game_label(game: Option<&str>) -> Result<String> {
    let game = game.map(str::trim).filter(|g| !g.is_empty()).unwrap_or(DEFAULT_GAME);
    if game.chars().count() > MAX_GAME_LEN {
        return Err(AppError::invalid_request(format!(
            "Game label longer than {} characters",
            MAX_GAME_LEN
        )));
    }
    Ok(game.to_string())
}
