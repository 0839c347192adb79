//! Time-driven volume fades.
//!
//! The scheduler tracks active linear gain ramps and advances them on
//! the host's periodic `update(dt)` tick. It owns no slot state itself:
//! each advance yields the gain updates and completions for the caller
//! to apply through the voice pool, keeping the scheduler free of borrow
//! entanglement with the rest of the engine.

/// One active fade on a bus
#[derive(Debug, Clone, Copy)]
struct Fade {
    bus: usize,

    /// Effective gain at the moment the fade started
    start_gain: f32,

    /// Total fade duration in seconds
    total: f32,

    /// Seconds left until silence
    remaining: f32,
}

/// Result of advancing one fade by one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeStep {
    pub bus: usize,

    /// Gain to apply to the bus this tick
    pub gain: f32,

    /// True when the fade reached silence; the caller stops the bus and
    /// the fade entry is gone
    pub finished: bool,
}

/// Scheduler for linear fade-outs, at most one per bus.
///
/// Starting a fade on a bus that already has one replaces it; there is
/// no queueing.
pub struct FadeScheduler {
    fades: Vec<Fade>,
}

impl FadeScheduler {
    /// Create a scheduler with no active fades
    pub fn new() -> Self {
        Self { fades: Vec::new() }
    }

    /// Begin a linear fade from `current_gain` down to silence over
    /// `duration` seconds on `bus`, replacing any fade already running
    /// there. A non-positive or non-finite duration completes on the
    /// next tick.
    pub fn start_fade_out(&mut self, bus: usize, duration: f32, current_gain: f32) {
        self.fades.retain(|f| f.bus != bus);

        let total = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        };
        tracing::debug!("Fading out bus {} over {:.2}s", bus, total);
        self.fades.push(Fade {
            bus,
            start_gain: current_gain,
            total,
            remaining: total,
        });
    }

    /// Advance all active fades by `dt` seconds of wall-clock time.
    ///
    /// Returns the gain to apply per faded bus, flagging fades that just
    /// reached silence. A non-positive or non-finite `dt` is treated as
    /// zero: the call is a harmless no-op rather than a state corruptor.
    pub fn advance(&mut self, dt: f32) -> Vec<FadeStep> {
        if !dt.is_finite() || dt <= 0.0 {
            return Vec::new();
        }

        let mut steps = Vec::with_capacity(self.fades.len());
        for fade in &mut self.fades {
            fade.remaining -= dt;
            if fade.remaining <= 0.0 || fade.total <= 0.0 {
                steps.push(FadeStep {
                    bus: fade.bus,
                    gain: 0.0,
                    finished: true,
                });
            } else {
                steps.push(FadeStep {
                    bus: fade.bus,
                    gain: fade.start_gain * (fade.remaining / fade.total).max(0.0),
                    finished: false,
                });
            }
        }
        self.fades.retain(|f| f.remaining > 0.0 && f.total > 0.0);
        steps
    }

    /// Cancel the fade on `bus`, if any (used when the bus stops for
    /// another reason mid-fade)
    pub fn cancel(&mut self, bus: usize) {
        self.fades.retain(|f| f.bus != bus);
    }

    /// Whether `bus` has an active fade
    pub fn is_fading(&self, bus: usize) -> bool {
        self.fades.iter().any(|f| f.bus == bus)
    }

    /// Number of active fades
    pub fn active_count(&self) -> usize {
        self.fades.len()
    }
}

impl Default for FadeScheduler {
    fn default() -> Self {
        Self::new()
    }
}
