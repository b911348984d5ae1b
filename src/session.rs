//! Round-by-round playback state for one simulation.
//!
//! The session is a plain owned object mutated only through its methods;
//! the driving loop decides when to fetch and render, the session only
//! tracks where playback stands.

use std::time::Duration;

/// Playback state: current round index plus the paused and finished flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSession {
    rounds_total: u32,
    current_round: u32,
    paused: bool,
    finished: bool,
}

impl RoundSession {
    pub fn new(rounds_total: u32) -> Self {
        Self {
            rounds_total,
            current_round: 0,
            paused: false,
            finished: false,
        }
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn rounds_total(&self) -> u32 {
        self.rounds_total
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Move to the next round; the session finishes once the round index
    /// reaches the declared round count.
    pub fn advance(&mut self) {
        self.current_round += 1;
        if self.current_round >= self.rounds_total {
            self.finished = true;
        }
    }

    /// Pause playback. Returns false when already paused, in which case the
    /// caller must not cancel or reschedule anything.
    pub fn pause(&mut self) -> bool {
        if self.paused {
            return false;
        }
        self.paused = true;
        true
    }

    /// Resume playback. Returns false when not paused, in which case the
    /// caller must not schedule a second round.
    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        self.paused = false;
        true
    }

    /// Restart from round 0. The paused flag is left as-is; a paused session
    /// stays paused across a reset.
    pub fn reset(&mut self) {
        self.finished = false;
        self.current_round = 0;
    }

    /// Whether the loop should schedule another round after rendering.
    pub fn should_schedule(&self) -> bool {
        !self.paused && !self.finished
    }
}

/// Delay between rounds for a speed in rounds per second.
///
/// A speed of zero (or below) yields no delay at all: nothing gets
/// scheduled, which behaves like a pause. That mirrors the upstream
/// `1/speed` contract rather than clamping.
pub fn round_delay(speed: f64) -> Option<Duration> {
    if speed > 0.0 {
        Some(Duration::from_secs_f64(1.0 / speed))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_terminates_after_declared_round_count() {
        let rounds = 5;
        let mut session = RoundSession::new(rounds);
        let mut advances = 0;
        while !session.is_finished() {
            assert!(session.should_schedule());
            session.advance();
            advances += 1;
            assert!(advances <= rounds, "session failed to finish");
        }
        assert_eq!(advances, rounds);
        assert!(!session.should_schedule());
    }

    #[test]
    fn zero_round_simulation_finishes_on_first_advance() {
        let mut session = RoundSession::new(0);
        assert!(!session.is_finished());
        session.advance();
        assert!(session.is_finished());
    }

    #[test]
    fn pause_is_idempotent() {
        let mut session = RoundSession::new(3);
        assert!(session.pause());
        assert!(!session.pause(), "second pause must be a no-op");
        assert!(session.is_paused());
        assert!(!session.should_schedule());
    }

    #[test]
    fn resume_is_idempotent() {
        let mut session = RoundSession::new(3);
        assert!(!session.resume(), "resume while running must be a no-op");
        session.pause();
        assert!(session.resume());
        assert!(!session.resume());
        assert!(session.should_schedule());
    }

    #[test]
    fn reset_restarts_from_round_zero() {
        let mut session = RoundSession::new(2);
        session.advance();
        session.advance();
        assert!(session.is_finished());
        session.reset();
        assert_eq!(session.current_round(), 0);
        assert!(!session.is_finished());
        assert!(session.should_schedule());
    }

    #[test]
    fn reset_preserves_pause() {
        let mut session = RoundSession::new(2);
        session.pause();
        session.advance();
        session.reset();
        assert!(session.is_paused());
    }

    #[test]
    fn delay_is_inverse_of_speed() {
        assert_eq!(round_delay(2.0), Some(Duration::from_millis(500)));
        assert_eq!(round_delay(0.25), Some(Duration::from_secs(4)));
        assert_eq!(round_delay(0.0), None);
        assert_eq!(round_delay(-1.0), None);
    }
}
