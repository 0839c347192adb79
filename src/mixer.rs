//! Hardware mixer capability.
//!
//! The engine drives one channel ("bus") of an external multichannel
//! mixer per voice slot. It only ever toggles buses and sets gains; the
//! mixer performs the final summation and output on its own schedule.

/// Control surface of the external hardware mixer.
///
/// Implementations must be cheap and non-blocking: these calls happen on
/// the control path every time a bus connects, disconnects, or changes
/// gain.
pub trait MixerControl {
    /// Connect or disconnect a bus from the mixer output
    fn set_bus_enabled(&mut self, bus: usize, enabled: bool);

    /// Set the output gain of a bus (already clamped to `[0, 1]`)
    fn set_bus_gain(&mut self, bus: usize, gain: f32);
}

/// Mixer that discards every call; for tests and headless hosts
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMixer;

impl MixerControl for NullMixer {
    fn set_bus_enabled(&mut self, _bus: usize, _enabled: bool) {}

    fn set_bus_gain(&mut self, _bus: usize, _gain: f32) {}
}
