//! Frame scheduling
//!
//! Converts host timestamps into clamped simulation steps. While paused no
//! steps are produced; on resume the next timestamp is taken as a fresh
//! baseline so the paused interval never reaches the simulation.

use std::sync::Arc;

use super::state::{GameEvent, GamePhase, GameState};
use super::tick::{TickInput, tick};
use crate::consts::{MAX_DELTA_TIME, NOMINAL_DT, STALL_THRESHOLD};
use crate::tuning::Tuning;

/// Wall-clock to `dt` converter
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
    paused: bool,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Step length in seconds for a frame at `now_ms`, or `None` while paused.
    ///
    /// The first frame after construction or resume runs a nominal step.
    /// Stalls longer than [`STALL_THRESHOLD`] also collapse to a nominal step,
    /// and every step is capped at [`MAX_DELTA_TIME`].
    pub fn advance(&mut self, now_ms: f64) -> Option<f32> {
        if self.paused {
            return None;
        }
        let dt = match self.last_ms.replace(now_ms) {
            None => NOMINAL_DT,
            Some(last) => {
                let delta = ((now_ms - last) / 1000.0).max(0.0) as f32;
                if delta > STALL_THRESHOLD {
                    log::debug!("Frame stall of {:.0} ms, using nominal step", delta * 1000.0);
                    NOMINAL_DT
                } else {
                    delta
                }
            }
        };
        Some(dt.min(MAX_DELTA_TIME))
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume scheduling. The next `advance` re-baselines.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.last_ms = None;
        }
    }
}

/// A game plus the clock that drives it
#[derive(Debug, Clone)]
pub struct Session {
    pub state: GameState,
    pub clock: FrameClock,
}

impl Session {
    pub fn new(tuning: Arc<Tuning>, seed: u64) -> Self {
        Self {
            state: GameState::with_tuning(tuning, seed),
            clock: FrameClock::new(),
        }
    }

    /// Run one host frame. Returns the events it produced, or `None` if the
    /// session is paused and nothing ran.
    pub fn frame(&mut self, now_ms: f64, input: &TickInput) -> Option<Vec<GameEvent>> {
        let dt = self.clock.advance(now_ms)?;
        tick(&mut self.state, input, dt);
        Some(self.state.drain_events())
    }

    /// Freeze the scheduler and the game phase together
    pub fn pause(&mut self) {
        if self.clock.is_paused() {
            return;
        }
        self.clock.pause();
        tick(
            &mut self.state,
            &TickInput {
                pause: true,
                ..Default::default()
            },
            0.0,
        );
    }

    pub fn resume(&mut self) {
        if !self.clock.is_paused() {
            return;
        }
        self.clock.resume();
        if self.state.phase == GamePhase::Paused {
            self.state.phase = self.state.paused_from;
            log::info!("Game resumed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_frame_is_nominal() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(5000.0), Some(NOMINAL_DT));
        let dt = clock.advance(5020.0).unwrap();
        assert!((dt - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_stall_collapses_to_nominal() {
        let mut clock = FrameClock::new();
        clock.advance(0.0);
        assert_eq!(clock.advance(2000.0), Some(NOMINAL_DT));
    }

    #[test]
    fn test_long_frame_clamped() {
        let mut clock = FrameClock::new();
        clock.advance(0.0);
        assert_eq!(clock.advance(300.0), Some(MAX_DELTA_TIME));
    }

    #[test]
    fn test_resume_rebaselines() {
        let mut clock = FrameClock::new();
        clock.advance(0.0);
        clock.pause();
        assert_eq!(clock.advance(100.0), None);
        clock.resume();
        // Paused for ten seconds, yet the step is nominal
        assert_eq!(clock.advance(10_000.0), Some(NOMINAL_DT));
        let dt = clock.advance(10_016.0).unwrap();
        assert!((dt - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_session_pause_freezes_game() {
        let mut session = Session::new(Arc::new(Tuning::default()), 8);
        let start = TickInput {
            start: true,
            ..Default::default()
        };
        session.frame(0.0, &start);
        session.frame(16.0, &TickInput::default());
        assert_eq!(session.state.phase, GamePhase::Playing);

        session.pause();
        assert_eq!(session.state.phase, GamePhase::Paused);
        let time = session.state.time_ms;
        assert!(session.frame(5_000.0, &TickInput::default()).is_none());

        session.resume();
        assert_eq!(session.state.phase, GamePhase::Playing);
        session.frame(60_000.0, &TickInput::default());
        let advanced = session.state.time_ms - time;
        assert!((advanced - f64::from(NOMINAL_DT) * 1000.0).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn prop_steps_stay_clamped(deltas in prop::collection::vec(0.0f64..5_000.0, 1..50)) {
            let mut clock = FrameClock::new();
            let mut now = 0.0;
            for d in deltas {
                now += d;
                let dt = clock.advance(now).unwrap();
                prop_assert!(dt >= 0.0 && dt <= MAX_DELTA_TIME);
            }
        }
    }
}
