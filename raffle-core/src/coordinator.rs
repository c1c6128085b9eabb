use crate::clock::{Clock, SystemClock};
use crate::config::RoundConfig;
use crate::error::{RaffleError, Result};
use crate::payout::PrizeTransfer;
use crate::provider::{RandomnessProvider, RandomnessRequest};
use crate::types::{
    AccountId, Amount, Entrant, PendingRequest, RaffleEvent, RaffleState, RandomValue, RequestId,
    RoundResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Index of the winning entrant for a random word and the entrant count
/// captured when randomness was requested.
pub fn winner_index(random_value: &RandomValue, entrant_count: u64) -> Option<u64> {
    if entrant_count == 0 {
        return None;
    }
    Some(random_value.modulo(entrant_count))
}

/// Why a draw can or cannot be requested right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawReadiness {
    pub state: RaffleState,
    pub interval_elapsed: bool,
    pub entrant_count: u64,
    pub prize_pool: Amount,
}

impl DrawReadiness {
    pub fn is_ready(&self) -> bool {
        self.reason().is_none()
    }

    /// First unmet condition, if any.
    pub fn reason(&self) -> Option<String> {
        if self.state != RaffleState::Open {
            return Some(format!("raffle is {}", self.state));
        }
        if !self.interval_elapsed {
            return Some("draw interval has not elapsed".to_string());
        }
        if self.entrant_count == 0 {
            return Some("no entrants".to_string());
        }
        if self.prize_pool.is_zero() {
            return Some("prize pool is empty".to_string());
        }
        None
    }
}

/// Persistable state of a coordinator; collaborators are rebound on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaffleSnapshot {
    pub id: Uuid,
    pub config: RoundConfig,
    pub state: RaffleState,
    pub entrants: Vec<Entrant>,
    pub prize_pool: Amount,
    pub last_round_start: DateTime<Utc>,
    pub pending: Option<PendingRequest>,
    pub recent_winner: Option<AccountId>,
    pub round: u64,
}

pub struct RaffleCoordinator {
    id: Uuid,
    config: RoundConfig,
    state: RaffleState,
    entrants: Vec<Entrant>,
    prize_pool: Amount,
    last_round_start: DateTime<Utc>,
    pending: Option<PendingRequest>,
    recent_winner: Option<AccountId>,
    round: u64,
    provider: Arc<dyn RandomnessProvider>,
    payout: Arc<dyn PrizeTransfer>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<RaffleEvent>,
}

impl RaffleCoordinator {
    pub fn new(
        config: RoundConfig,
        provider: Arc<dyn RandomnessProvider>,
        payout: Arc<dyn PrizeTransfer>,
    ) -> Result<Self> {
        Self::with_clock(config, provider, payout, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: RoundConfig,
        provider: Arc<dyn RandomnessProvider>,
        payout: Arc<dyn PrizeTransfer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        check_provider_binding(&config, provider.as_ref())?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let last_round_start = clock.now();
        let id = Uuid::new_v4();

        tracing::info!(
            "Raffle {} created: entrance fee {}, interval {:?}, provider {}",
            id,
            config.entrance_fee,
            config.interval,
            config.provider
        );

        Ok(Self {
            id,
            config,
            state: RaffleState::Open,
            entrants: Vec::new(),
            prize_pool: Amount::ZERO,
            last_round_start,
            pending: None,
            recent_winner: None,
            round: 0,
            provider,
            payout,
            clock,
            events,
        })
    }

    pub fn from_snapshot(
        snapshot: RaffleSnapshot,
        provider: Arc<dyn RandomnessProvider>,
        payout: Arc<dyn PrizeTransfer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        snapshot.config.validate()?;
        check_provider_binding(&snapshot.config, provider.as_ref())?;

        if snapshot.pending.is_some() != (snapshot.state == RaffleState::Drawing) {
            return Err(RaffleError::invalid_state(format!(
                "snapshot of raffle {} is {} but pending request is {:?}",
                snapshot.id, snapshot.state, snapshot.pending
            )));
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            id: snapshot.id,
            config: snapshot.config,
            state: snapshot.state,
            entrants: snapshot.entrants,
            prize_pool: snapshot.prize_pool,
            last_round_start: snapshot.last_round_start,
            pending: snapshot.pending,
            recent_winner: snapshot.recent_winner,
            round: snapshot.round,
            provider,
            payout,
            clock,
            events,
        })
    }

    pub fn snapshot(&self) -> RaffleSnapshot {
        RaffleSnapshot {
            id: self.id,
            config: self.config.clone(),
            state: self.state,
            entrants: self.entrants.clone(),
            prize_pool: self.prize_pool,
            last_round_start: self.last_round_start,
            pending: self.pending.clone(),
            recent_winner: self.recent_winner.clone(),
            round: self.round,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RaffleEvent> {
        self.events.subscribe()
    }

    /// Enter the current round.
    pub fn enter(&mut self, caller: AccountId, amount: Amount) -> Result<()> {
        if self.state != RaffleState::Open {
            return Err(RaffleError::RaffleNotOpen);
        }

        if amount < self.config.entrance_fee {
            return Err(RaffleError::InsufficientFee {
                required: self.config.entrance_fee,
                provided: amount,
            });
        }

        let prize_pool = self.prize_pool.checked_add(amount)?;

        self.entrants.push(Entrant {
            account: caller.clone(),
            amount,
        });
        self.prize_pool = prize_pool;

        tracing::info!(
            "Raffle {} entered by {} with {} ({} entrants)",
            self.id,
            caller,
            amount,
            self.entrants.len()
        );
        self.emit(RaffleEvent::Entered {
            account: caller,
            amount,
        });

        Ok(())
    }

    pub fn draw_readiness(&self) -> DrawReadiness {
        let elapsed = self.clock.now() - self.last_round_start;
        let interval_elapsed = chrono::Duration::from_std(self.config.interval)
            .map(|interval| elapsed >= interval)
            .unwrap_or(false);

        DrawReadiness {
            state: self.state,
            interval_elapsed,
            entrant_count: self.entrants.len() as u64,
            prize_pool: self.prize_pool,
        }
    }

    /// Side-effect free upkeep predicate.
    pub fn check_draw_ready(&self) -> bool {
        let readiness = self.draw_readiness();
        tracing::debug!("Raffle {} readiness: {:?}", self.id, readiness);
        readiness.is_ready()
    }

    /// Ask the provider for randomness and move the round into `Drawing`.
    ///
    /// Readiness is re-checked here rather than trusted from an earlier
    /// [`check_draw_ready`](Self::check_draw_ready). If the provider rejects
    /// the request the raffle stays `Open` with its entrants intact.
    pub async fn request_draw(&mut self) -> Result<RequestId> {
        match self.state {
            RaffleState::Drawing => return Err(RaffleError::DrawAlreadyInProgress),
            RaffleState::Closed => return Err(RaffleError::RaffleNotOpen),
            RaffleState::Open => {}
        }

        if let Some(reason) = self.draw_readiness().reason() {
            return Err(RaffleError::draw_not_ready(reason));
        }

        let request = RandomnessRequest::from(&self.config);

        // The exclusive borrow spans the await; state only changes once an id is issued.
        let request_id = match self.provider.request(&request).await {
            Ok(request_id) => request_id,
            Err(e) => {
                tracing::warn!(
                    "Raffle {} randomness request failed, staying open: {}",
                    self.id,
                    e
                );
                return Err(e);
            }
        };

        self.pending = Some(PendingRequest {
            request_id,
            requested_at: self.clock.now(),
            entrant_count: self.entrants.len() as u64,
            prize_pool: self.prize_pool,
        });
        self.state = RaffleState::Drawing;

        tracing::info!(
            "Raffle {} requested winner with request {} ({} entrants, pool {})",
            self.id,
            request_id,
            self.entrants.len(),
            self.prize_pool
        );
        self.emit(RaffleEvent::WinnerRequested { request_id });

        Ok(request_id)
    }

    /// Settle the round with the provider's random word.
    pub async fn on_randomness_received(
        &mut self,
        caller: &AccountId,
        request_id: RequestId,
        random_value: RandomValue,
    ) -> Result<RoundResult> {
        if caller != &self.config.provider {
            return Err(RaffleError::Unauthorized(caller.clone()));
        }

        let pending = match &self.pending {
            Some(pending)
                if self.state == RaffleState::Drawing && pending.request_id == request_id =>
            {
                pending.clone()
            }
            _ => return Err(RaffleError::UnknownRequest(request_id)),
        };

        let index = winner_index(&random_value, pending.entrant_count).ok_or_else(|| {
            RaffleError::internal(format!("request {} was issued with no entrants", request_id))
        })?;
        let winner = self
            .entrants
            .get(index as usize)
            .map(|entrant| entrant.account.clone())
            .ok_or_else(|| {
                RaffleError::internal(format!(
                    "winner index {} out of range for {} entrants",
                    index,
                    self.entrants.len()
                ))
            })?;

        if let Err(e) = self.payout.transfer(&winner, pending.prize_pool).await {
            tracing::warn!(
                "Raffle {} payout of {} to {} failed: {}",
                self.id,
                pending.prize_pool,
                winner,
                e
            );
            return Err(match e {
                RaffleError::TransferFailed(msg) => RaffleError::TransferFailed(msg),
                other => RaffleError::transfer_failed(other.to_string()),
            });
        }

        let settled_at = self.clock.now();
        self.round += 1;

        let result = RoundResult {
            round: self.round,
            request_id,
            winner: winner.clone(),
            winner_index: index,
            prize: pending.prize_pool,
            random_value,
            entrant_count: pending.entrant_count,
            settled_at,
        };

        self.entrants.clear();
        self.prize_pool = Amount::ZERO;
        self.pending = None;
        self.recent_winner = Some(winner.clone());
        self.last_round_start = settled_at;
        self.state = RaffleState::Open;

        tracing::info!(
            "Raffle {} round {} won by {} (index {}), prize {}",
            self.id,
            result.round,
            winner,
            index,
            result.prize
        );
        self.emit(RaffleEvent::WinnerPicked {
            round: result.round,
            winner,
            prize: result.prize,
        });

        Ok(result)
    }

    /// Tear the raffle down. Only an open raffle with an empty pool can close.
    pub fn close(&mut self) -> Result<()> {
        match self.state {
            RaffleState::Drawing => return Err(RaffleError::DrawAlreadyInProgress),
            RaffleState::Closed => return Err(RaffleError::RaffleNotOpen),
            RaffleState::Open => {}
        }

        if !self.prize_pool.is_zero() {
            return Err(RaffleError::invalid_state(format!(
                "raffle {} still holds {} from {} entrants",
                self.id,
                self.prize_pool,
                self.entrants.len()
            )));
        }

        self.state = RaffleState::Closed;
        tracing::info!("Raffle {} closed after {} rounds", self.id, self.round);
        self.emit(RaffleEvent::Closed);
        Ok(())
    }

    fn emit(&self, event: RaffleEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn entrance_fee(&self) -> Amount {
        self.config.entrance_fee
    }

    pub fn interval(&self) -> std::time::Duration {
        self.config.interval
    }

    pub fn request_confirmations(&self) -> u16 {
        self.config.request_confirmations
    }

    pub fn num_words(&self) -> u32 {
        self.config.num_words
    }

    pub fn state(&self) -> RaffleState {
        self.state
    }

    pub fn entrant(&self, index: usize) -> Option<&Entrant> {
        self.entrants.get(index)
    }

    pub fn entrants(&self) -> &[Entrant] {
        &self.entrants
    }

    pub fn entrant_count(&self) -> usize {
        self.entrants.len()
    }

    pub fn prize_pool(&self) -> Amount {
        self.prize_pool
    }

    pub fn recent_winner(&self) -> Option<&AccountId> {
        self.recent_winner.as_ref()
    }

    pub fn last_round_start(&self) -> DateTime<Utc> {
        self.last_round_start
    }

    pub fn pending_request(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    pub fn round(&self) -> u64 {
        self.round
    }
}

impl std::fmt::Debug for RaffleCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaffleCoordinator")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("entrants", &self.entrants.len())
            .field("prize_pool", &self.prize_pool)
            .field("pending", &self.pending)
            .field("round", &self.round)
            .finish()
    }
}

fn check_provider_binding(config: &RoundConfig, provider: &dyn RandomnessProvider) -> Result<()> {
    if provider.address() != &config.provider {
        return Err(RaffleError::config(format!(
            "provider {} does not match configured provider {}",
            provider.address(),
            config.provider
        )));
    }
    Ok(())
}
