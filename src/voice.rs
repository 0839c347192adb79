//! Voice pool: the fixed array of playback slots bound to mixer buses.
//!
//! The pool is an arena of `N + 1` preallocated slot records indexed by
//! bus number: `N` effect buses followed by one dedicated BGM bus.
//! Nothing is heap-allocated at play time and the capacity never changes
//! after construction. A busy effect bus is never preempted; callers get
//! [`EngineError::PoolExhausted`] and decide what to do.

use std::fmt;
use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::error::EngineError;
use crate::mixer::MixerControl;

/// Category of a sound: short effect or the single long-form BGM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCategory {
    /// Short, preloaded sound effect
    Effect,

    /// Background music; owns the one dedicated BGM bus
    Bgm,
}

impl fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundCategory::Effect => write!(f, "effect"),
            SoundCategory::Bgm => write!(f, "BGM"),
        }
    }
}

/// Playback state of one sound instance.
///
/// ```text
/// (unbound) --bind+connect--> Playing --finish (no loop)--> Finished --reap--> (unbound)
/// Playing --pause--> Paused --resume--> Playing
/// Playing --loop wrap--> Playing (playhead back to 0)
/// Playing/Paused --stop--> (unbound, playhead reset)
/// ```
///
/// `Finished` is set by the render pass when a non-looping instance runs
/// off the end of its buffer; the control path reaps it on the next tick
/// (the render path never frees anything).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Finished,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, PlaybackState::Finished)
    }
}

/// One playing or paused occurrence of a sound.
///
/// Instances share the decoded buffer of their asset; concurrent
/// instances of the same sound carry independent playheads and volumes.
#[derive(Debug, Clone)]
pub struct SoundInstance {
    pub(crate) asset_id: String,
    pub(crate) category: SoundCategory,
    pub(crate) state: PlaybackState,
    pub(crate) looping: bool,

    /// Instance volume in `[0, 1]`, modulated by the master category
    /// volume to produce the effective bus gain
    pub(crate) volume: f32,

    /// Next sample index to render
    pub(crate) playhead: usize,

    pub(crate) buffer: Arc<AudioBuffer>,
}

impl SoundInstance {
    /// Create an instance at the start of `buffer`, initially paused
    /// (it becomes Playing when its bus connects)
    pub fn new(
        asset_id: impl Into<String>,
        category: SoundCategory,
        buffer: Arc<AudioBuffer>,
        volume: f32,
        looping: bool,
    ) -> Self {
        Self {
            asset_id: asset_id.into(),
            category,
            state: PlaybackState::Paused,
            looping,
            volume: clamp_volume(volume),
            playhead: 0,
            buffer,
        }
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn category(&self) -> SoundCategory {
        self.category
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn playhead(&self) -> usize {
        self.playhead
    }

    pub fn buffer(&self) -> &Arc<AudioBuffer> {
        &self.buffer
    }
}

/// Clamp a volume to `[0, 1]`; non-finite values become silence.
///
/// Out-of-range volumes degrade gracefully instead of failing: this is a
/// real-time audio path, not a validator.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// One mixer bus and the instance bound to it, if any
struct VoiceSlot {
    /// Whether this bus currently contributes to the mixer output.
    /// Invariant: `connected == true` iff the bound instance is Playing.
    connected: bool,

    /// Effective output gain last pushed to the mixer
    gain: f32,

    instance: Option<SoundInstance>,
}

impl VoiceSlot {
    fn empty() -> Self {
        Self {
            connected: false,
            gain: 0.0,
            instance: None,
        }
    }
}

/// Fixed-size pool of voice slots: `N` effect buses plus one BGM bus.
///
/// Every mutation visible to the render path goes through this type, and
/// the ordering contract lives here: a bus is always disconnected
/// *before* its buffer is released or rebound, and connected only after
/// the new instance is fully bound. The render pass therefore never
/// observes a connected bus with a stale buffer.
pub struct VoicePool {
    slots: Vec<VoiceSlot>,
    effect_buses: usize,
}

impl VoicePool {
    /// Create a pool with `effect_buses` effect slots and one BGM slot
    pub fn new(effect_buses: usize) -> Self {
        let mut slots = Vec::with_capacity(effect_buses + 1);
        for _ in 0..=effect_buses {
            slots.push(VoiceSlot::empty());
        }
        Self {
            slots,
            effect_buses,
        }
    }

    /// Number of effect buses (the pool also holds one BGM bus)
    pub fn effect_buses(&self) -> usize {
        self.effect_buses
    }

    /// Total bus count including the BGM bus
    pub fn bus_count(&self) -> usize {
        self.slots.len()
    }

    /// Index of the dedicated BGM bus (always the last slot)
    pub fn bgm_bus(&self) -> usize {
        self.effect_buses
    }

    /// Find a free effect bus.
    ///
    /// Fails with [`EngineError::PoolExhausted`] when every effect bus is
    /// occupied; busy buses are never stolen.
    pub fn acquire_effect(&self) -> Result<usize, EngineError> {
        self.slots[..self.effect_buses]
            .iter()
            .position(|slot| slot.instance.is_none())
            .ok_or(EngineError::PoolExhausted(self.effect_buses))
    }

    /// Attach `instance` to `bus`.
    ///
    /// The bus must be disconnected (it always is for a freshly acquired
    /// effect bus; BGM callers stop the bus first). The instance starts
    /// Paused; connect it with [`VoicePool::set_playing`].
    pub fn bind(&mut self, bus: usize, instance: SoundInstance) {
        let Some(slot) = self.slots.get_mut(bus) else {
            return;
        };
        debug_assert!(!slot.connected, "bind on a connected bus");
        slot.instance = Some(instance);
    }

    /// Detach and return the instance on `bus`, disconnecting the bus
    /// first so the render pass drops it before the buffer goes away.
    pub fn release(&mut self, bus: usize, mixer: &mut dyn MixerControl) -> Option<SoundInstance> {
        let slot = self.slots.get_mut(bus)?;
        if slot.connected {
            slot.connected = false;
            mixer.set_bus_enabled(bus, false);
        }
        slot.instance.take()
    }

    /// Connect or disconnect `bus`.
    ///
    /// The sole pause/resume mechanism: no data is discarded and the
    /// playhead is untouched, so resuming continues exactly where
    /// playback left off. No-op on an empty bus, on a Finished instance,
    /// and when the bus is already in the requested state.
    pub fn set_playing(&mut self, bus: usize, playing: bool, mixer: &mut dyn MixerControl) {
        let Some(slot) = self.slots.get_mut(bus) else {
            return;
        };
        let Some(instance) = slot.instance.as_mut() else {
            return;
        };
        if instance.state.is_finished() || slot.connected == playing {
            return;
        }

        if playing {
            instance.state = PlaybackState::Playing;
            slot.connected = true;
            mixer.set_bus_enabled(bus, true);
        } else {
            // Disconnect before anything else can touch the slot
            slot.connected = false;
            mixer.set_bus_enabled(bus, false);
            instance.state = PlaybackState::Paused;
        }
    }

    /// Set the effective output gain of `bus` and push it to the mixer
    pub fn set_gain(&mut self, bus: usize, gain: f32, mixer: &mut dyn MixerControl) {
        let Some(slot) = self.slots.get_mut(bus) else {
            return;
        };
        let gain = clamp_volume(gain);
        slot.gain = gain;
        mixer.set_bus_gain(bus, gain);
    }

    /// Effective output gain last set on `bus`
    pub fn gain(&self, bus: usize) -> f32 {
        self.slots.get(bus).map(|s| s.gain).unwrap_or(0.0)
    }

    /// Whether `bus` currently contributes to the mixer output
    pub fn is_connected(&self, bus: usize) -> bool {
        self.slots.get(bus).map(|s| s.connected).unwrap_or(false)
    }

    /// Instance bound to `bus`, if any
    pub fn instance(&self, bus: usize) -> Option<&SoundInstance> {
        self.slots.get(bus)?.instance.as_ref()
    }

    pub(crate) fn instance_mut(&mut self, bus: usize) -> Option<&mut SoundInstance> {
        self.slots.get_mut(bus)?.instance.as_mut()
    }

    /// Mark the instance on `bus` finished and drop it from the render
    /// working set. Called by the render pass at end-of-buffer; the
    /// control path reaps the instance on its next tick.
    pub(crate) fn mark_finished(&mut self, bus: usize) {
        let Some(slot) = self.slots.get_mut(bus) else {
            return;
        };
        slot.connected = false;
        if let Some(instance) = slot.instance.as_mut() {
            instance.state = PlaybackState::Finished;
        }
    }

    /// Buses whose instance is currently connected (Playing)
    pub fn connected_buses(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.connected)
            .map(|(bus, _)| bus)
            .collect()
    }

    /// Buses holding an instance flagged Finished by the render pass
    pub fn finished_buses(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.instance
                    .as_ref()
                    .is_some_and(|i| i.state.is_finished())
            })
            .map(|(bus, _)| bus)
            .collect()
    }

    /// Buses currently holding an instance of `category`
    pub fn buses_for_category(&self, category: SoundCategory) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| {
                slot.instance
                    .as_ref()
                    .is_some_and(|i| i.category == category)
            })
            .map(|(bus, _)| bus)
            .collect()
    }
}
