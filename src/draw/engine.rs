//! DrawEngine — builds the giver → receiver cycle.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::StoreError;
use crate::store::EventStore;

use super::Assignments;

/// Shuffle `participants` and link each one to the next, wrapping around.
///
/// The result is a single cycle through every participant, so nobody draws
/// themselves. Returns `None` (and logs) when there are fewer than two.
pub fn perform_draw<R: Rng + ?Sized>(participants: &[String], rng: &mut R) -> Option<Assignments> {
    let n = participants.len();
    if n < 2 {
        tracing::warn!(participants = n, "Not enough participants for a draw");
        return None;
    }

    let mut order = participants.to_vec();
    order.shuffle(rng);

    let assignments = (0..n)
        .map(|i| (order[i].clone(), order[(i + 1) % n].clone()))
        .collect();
    Some(assignments)
}

/// Whether following giver → receiver from any giver visits every participant
/// exactly once before returning to the start.
pub fn is_single_cycle(assignments: &Assignments) -> bool {
    let Some(start) = assignments.keys().next() else {
        return false;
    };
    let mut seen = BTreeSet::new();
    let mut current = start;
    loop {
        if !seen.insert(current) {
            return current == start && seen.len() == assignments.len();
        }
        match assignments.get(current) {
            Some(next) => current = next,
            None => return false,
        }
    }
}

/// Result of an attempted draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Assignments were replaced.
    Drawn { participants: usize, epoch: u64 },
    /// Fewer than two participants; stored assignments untouched.
    Insufficient { participants: usize },
    /// The scheduled draw for this date already ran.
    AlreadyCompleted { date: NaiveDate },
}

/// Runs draws against the event store.
pub struct DrawEngine {
    store: Arc<EventStore>,
    rng: Mutex<StdRng>,
}

impl DrawEngine {
    pub fn new(store: Arc<EventStore>) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }

    /// Use a fixed seed, for reproducible draws.
    pub fn with_seed(store: Arc<EventStore>, seed: u64) -> Self {
        Self::with_rng(store, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: Arc<EventStore>, rng: StdRng) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    /// Manual draw: replace the assignment set with a fresh cycle.
    pub async fn draw(&self) -> Result<DrawOutcome, StoreError> {
        self.run(None).await
    }

    /// Scheduled draw for `date`. Runs at most once per date; the guard is
    /// written in the same save as the assignments.
    pub async fn draw_scheduled(&self, date: NaiveDate) -> Result<DrawOutcome, StoreError> {
        self.run(Some(date)).await
    }

    async fn run(&self, scheduled: Option<NaiveDate>) -> Result<DrawOutcome, StoreError> {
        let outcome = self
            .store
            .try_mutate(|s| {
                if let Some(date) = scheduled
                    && s.ledger.scheduled_for == Some(date)
                {
                    return Err(DrawOutcome::AlreadyCompleted { date });
                }

                let participants: Vec<String> = s.profiles.keys().cloned().collect();
                let drawn = {
                    let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                    perform_draw(&participants, &mut *rng)
                };
                let Some(assignments) = drawn else {
                    return Err(DrawOutcome::Insufficient {
                        participants: participants.len(),
                    });
                };

                s.assignments = assignments;
                s.ledger.epoch += 1;
                s.ledger.drawn_at = Some(Utc::now());
                s.ledger.notified_at = None;
                if scheduled.is_some() {
                    s.ledger.scheduled_for = scheduled;
                }
                Ok(DrawOutcome::Drawn {
                    participants: participants.len(),
                    epoch: s.ledger.epoch,
                })
            })
            .await?;

        let outcome = outcome.unwrap_or_else(|declined| declined);
        if let DrawOutcome::Drawn {
            participants,
            epoch,
        } = outcome
        {
            tracing::info!(participants, epoch, "Draw completed");
        }
        Ok(outcome)
    }
}
