// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::debug;

use crate::Record;

pub const DEFAULT_SPIN_TICK: Duration = Duration::from_millis(50);
pub const DEFAULT_SPIN_DURATION: Duration = Duration::from_millis(1_000);

const MIN_SPIN_TICK: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinState {
    Idle,
    Spinning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpinEvent {
    /// Churn shown while spinning; not the answer.
    Tick(Record),
    Finished(Record),
}

#[derive(Debug, Clone)]
struct ActiveSpin {
    candidates: Vec<Record>,
    next_tick: Instant,
    finish_at: Instant,
}

/// Random draw with a spinning reveal.
///
/// The candidate set is copied when the spin starts and every pick in that
/// run, including the final one, is drawn uniformly from the copy. The tick
/// and finish deadlines belong to the engine; [`SelectionEngine::cancel`]
/// drops them.
#[derive(Debug, Clone)]
pub struct SelectionEngine {
    tick_interval: Duration,
    spin_duration: Duration,
    active: Option<ActiveSpin>,
    display: Option<Record>,
    result: Option<Record>,
}

impl Default for SelectionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SPIN_TICK, DEFAULT_SPIN_DURATION)
    }
}

impl SelectionEngine {
    pub fn new(tick_interval: Duration, spin_duration: Duration) -> Self {
        Self {
            tick_interval: tick_interval.max(MIN_SPIN_TICK),
            spin_duration,
            active: None,
            display: None,
            result: None,
        }
    }

    pub fn state(&self) -> SpinState {
        if self.active.is_some() {
            SpinState::Spinning
        } else {
            SpinState::Idle
        }
    }

    pub fn is_spinning(&self) -> bool {
        self.active.is_some()
    }

    /// What the reveal currently shows: churn while spinning, the final pick
    /// afterwards.
    pub fn display(&self) -> Option<&Record> {
        self.display.as_ref()
    }

    pub fn result(&self) -> Option<&Record> {
        self.result.as_ref()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.active
            .as_ref()
            .map(|spin| spin.next_tick.min(spin.finish_at))
    }

    /// Starts a spin. No-op when already spinning or when there is nothing to
    /// pick from.
    pub fn start(&mut self, candidates: &[Record], now: Instant) -> bool {
        if self.active.is_some() || candidates.is_empty() {
            return false;
        }
        debug!(candidates = candidates.len(), "spin started");
        self.result = None;
        self.active = Some(ActiveSpin {
            candidates: candidates.to_vec(),
            next_tick: now + self.tick_interval,
            finish_at: now + self.spin_duration,
        });
        true
    }

    /// Advances the spin to `now`. Emits at most one tick per call; ticks that
    /// were missed while the caller was busy are skipped.
    pub fn poll<R: Rng + ?Sized>(&mut self, now: Instant, rng: &mut R) -> Vec<SpinEvent> {
        let Some(spin) = &mut self.active else {
            return Vec::new();
        };

        if now >= spin.finish_at {
            let pick = draw(&spin.candidates, rng);
            self.active = None;
            debug!(name = %pick.name, "spin finished");
            self.display = Some(pick.clone());
            self.result = Some(pick.clone());
            return vec![SpinEvent::Finished(pick)];
        }

        if now < spin.next_tick {
            return Vec::new();
        }
        while spin.next_tick <= now {
            spin.next_tick += self.tick_interval;
        }
        let pick = draw(&spin.candidates, rng);
        self.display = Some(pick.clone());
        vec![SpinEvent::Tick(pick)]
    }

    /// Abandons a running spin without publishing a result.
    pub fn cancel(&mut self) -> bool {
        self.active.take().is_some()
    }
}

fn draw<R: Rng + ?Sized>(candidates: &[Record], rng: &mut R) -> Record {
    candidates[rng.gen_range(0..candidates.len())].clone()
}
