pub const DEFAULT_DURATION_SECS: u32 = 60;

/// Coarse lifecycle of a typing session, derived from [`SessionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    Running,
    Expired,
}

/// Countdown and lock flags for one typing session.
///
/// The value is never mutated in place: every transition returns a new
/// state, so the controller owning it is the only place state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub has_started: bool,
    pub seconds_remaining: u32,
    pub locked: bool,
    pub duration_secs: u32,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_SECS)
    }
}

impl SessionState {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            has_started: false,
            seconds_remaining: duration_secs,
            locked: true,
            duration_secs,
        }
    }

    pub fn phase(&self) -> Phase {
        if !self.has_started {
            Phase::Idle
        } else if self.seconds_remaining == 0 {
            Phase::Expired
        } else {
            Phase::Running
        }
    }

    /// First non-empty input starts the countdown; later input never touches it.
    #[must_use]
    pub fn on_input(self, text: &str) -> Self {
        if self.phase() != Phase::Idle || text.is_empty() {
            return self;
        }

        Self {
            has_started: true,
            seconds_remaining: self.duration_secs,
            locked: true,
            ..self
        }
    }

    /// One wall-clock second. Only a running session moves.
    #[must_use]
    pub fn on_tick(self) -> Self {
        if self.phase() != Phase::Running {
            return self;
        }

        let seconds_remaining = self.seconds_remaining.saturating_sub(1);
        Self {
            seconds_remaining,
            locked: seconds_remaining > 0,
            ..self
        }
    }

    #[must_use]
    pub fn reset(self) -> Self {
        Self::new(self.duration_secs)
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.duration_secs - self.seconds_remaining
    }

    pub fn accepts_input(&self) -> bool {
        self.phase() != Phase::Expired
    }

    pub fn is_ticking(&self) -> bool {
        self.phase() == Phase::Running
    }
}
