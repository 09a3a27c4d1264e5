use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;

/// One redemption log entry, embedded in the card's JSONB history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub redeemed_at: OffsetDateTime,
    pub visits_at_redemption: i32,
}

/// Loyalty card record. Owned by exactly one merchant; the owner never changes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub name: String,
    pub logo: String,
    pub color: String,
    pub total_visits: i32,
    pub current_visits: i32,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_redeemed_at: Option<OffsetDateTime>,
    pub redemption_history: Json<Vec<RedemptionEntry>>,
    pub qr_payload: Option<String>,
    pub pass_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Card state relative to its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardState {
    InProgress,
    RewardReady,
}

/// Illegal state transition on a card.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Card is already complete")]
    AlreadyComplete,
    #[error("Not enough visits to redeem reward")]
    NotEnoughVisits,
}

impl From<TransitionError> for ApiError {
    fn from(e: TransitionError) -> Self {
        ApiError::Domain(e.to_string())
    }
}

/// Pass identifiers are random, not derived from creation time.
pub fn new_pass_id() -> String {
    format!("pass.com.loyalynk.{}", Uuid::new_v4())
}

impl Card {
    pub fn state(&self) -> CardState {
        if self.current_visits < self.total_visits {
            CardState::InProgress
        } else {
            CardState::RewardReady
        }
    }

    /// Payload encoded into the card's QR code: card identity plus pass id.
    pub fn qr_payload_json(&self) -> String {
        serde_json::json!({
            "cardId": self.id,
            "passId": self.pass_id,
        })
        .to_string()
    }

    /// Record one customer visit. Only valid while the card is in progress.
    pub fn stamp(&mut self) -> Result<(), TransitionError> {
        if self.state() == CardState::RewardReady {
            return Err(TransitionError::AlreadyComplete);
        }
        self.current_visits += 1;
        Ok(())
    }

    /// Redeem the reward: append one history entry, reset the counter.
    /// The sole RewardReady -> InProgress transition.
    pub fn redeem(&mut self, now: OffsetDateTime) -> Result<(), TransitionError> {
        if self.state() == CardState::InProgress {
            return Err(TransitionError::NotEnoughVisits);
        }
        self.redemption_history.0.push(RedemptionEntry {
            redeemed_at: now,
            visits_at_redemption: self.current_visits,
        });
        self.current_visits = 0;
        self.last_redeemed_at = Some(now);
        Ok(())
    }
}
