//! Playback engine facade.
//!
//! Composes the sound cache, voice pool, and fade scheduler behind the
//! control-path API the game calls: preload, play, pause, volume, purge.
//! The engine is an explicitly constructed object with a controlled
//! lifetime; whatever drives the periodic tick and the render callback
//! holds it. There is no process-wide shared instance.
//!
//! Every operation here is synchronous and non-blocking with respect to
//! the render path, and none of them is fatal: the engine stays usable
//! after any reported failure.

use crate::asset::AssetSource;
use crate::cache::SoundCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{EngineEvent, EventBus};
use crate::fade::FadeScheduler;
use crate::mixer::MixerControl;
use crate::render;
use crate::voice::{clamp_volume, SoundCategory, SoundInstance, VoicePool};

/// Low-latency playback engine: one BGM stream plus pooled sound
/// effects over a fixed set of mixer buses.
pub struct Engine {
    config: EngineConfig,
    cache: SoundCache,
    pool: VoicePool,
    fades: FadeScheduler,
    source: Box<dyn AssetSource>,
    mixer: Box<dyn MixerControl>,
    events: EventBus,

    /// Master gain modulating every effect bus
    effect_volume: f32,

    /// Master gain of the BGM bus
    bgm_volume: f32,

    globally_paused: bool,

    /// Buses that were connected at the moment of the last
    /// `pause_engine`; `resume_engine` reconnects exactly this set
    buses_to_resume: Vec<usize>,

    /// Asset currently loaded into the BGM bus, surviving stop so a
    /// later `play_bgm` restarts it from the beginning
    bgm_asset: Option<String>,
}

impl Engine {
    /// Construct an engine from its external collaborators
    pub fn new(
        config: EngineConfig,
        source: Box<dyn AssetSource>,
        mixer: Box<dyn MixerControl>,
    ) -> Self {
        Self::with_event_bus(config, source, mixer, EventBus::new())
    }

    /// Construct an engine publishing onto an existing event bus.
    ///
    /// Subscribers registered on `events` beforehand receive the
    /// one-shot [`EngineEvent::Initialized`] fired when construction
    /// completes.
    pub fn with_event_bus(
        config: EngineConfig,
        source: Box<dyn AssetSource>,
        mixer: Box<dyn MixerControl>,
        events: EventBus,
    ) -> Self {
        let config = config.sanitized();
        let engine = Self {
            effect_volume: config.effect_volume,
            bgm_volume: config.bgm_volume,
            pool: VoicePool::new(config.effect_buses),
            cache: SoundCache::new(),
            fades: FadeScheduler::new(),
            source,
            mixer,
            events,
            globally_paused: false,
            buses_to_resume: Vec::new(),
            bgm_asset: None,
            config,
        };
        tracing::info!(
            "Engine ready: {} effect buses + 1 BGM bus",
            engine.pool.effect_buses()
        );
        engine.events.publish(EngineEvent::Initialized);
        engine
    }

    /// Event bus for engine notifications; clone the handle to keep it
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ........................................................ preload

    /// Load an effect into the cache without starting playback
    pub fn preload_effect(&mut self, asset_id: &str) -> EngineResult<()> {
        self.cache
            .load(asset_id, SoundCategory::Effect, &*self.source)?;
        Ok(())
    }

    /// Load a sound into the BGM bus without starting playback
    pub fn preload_bgm(&mut self, asset_id: &str) -> EngineResult<()> {
        self.cache
            .load(asset_id, SoundCategory::Bgm, &*self.source)?;
        self.bgm_asset = Some(asset_id.to_string());
        Ok(())
    }

    // ........................................................ effects

    /// Play an effect at the configured default volume.
    ///
    /// Loads the asset on demand if it is not cached, at the cost of
    /// decode latency on this call; preload effects up front for
    /// low-latency triggering. Returns the bus the effect plays on.
    pub fn play_effect(&mut self, asset_id: &str) -> EngineResult<usize> {
        self.play_effect_with_volume(asset_id, self.config.default_effect_volume)
    }

    /// Play an effect at an explicit volume, modulated by the master
    /// effect volume.
    ///
    /// Fails with [`EngineError::PoolExhausted`] when every effect bus
    /// is busy; the request is dropped, existing buses are untouched,
    /// and retry policy is the caller's concern.
    pub fn play_effect_with_volume(&mut self, asset_id: &str, volume: f32) -> EngineResult<usize> {
        if !self.cache.contains(asset_id) {
            tracing::debug!("On-demand load of '{}' on the control path", asset_id);
        }
        let buffer = self
            .cache
            .load(asset_id, SoundCategory::Effect, &*self.source)?;
        let bus = self.pool.acquire_effect()?;

        let instance = SoundInstance::new(asset_id, SoundCategory::Effect, buffer, volume, false);
        let gain = instance.volume() * self.effect_volume;

        self.cache.retain(asset_id);
        self.cache.touch(asset_id);
        // Bind fully, then connect: the bus only joins the render
        // working set once the new buffer is in place
        self.pool.bind(bus, instance);
        self.pool.set_gain(bus, gain, &mut *self.mixer);
        self.pool.set_playing(bus, true, &mut *self.mixer);

        tracing::debug!("Playing effect '{}' on bus {}", asset_id, bus);
        Ok(bus)
    }

    // ............................................................ BGM

    /// Start or restart playback on the BGM bus.
    ///
    /// Requires a previously loaded BGM sound ([`Engine::preload_bgm`]),
    /// else fails with [`EngineError::NothingLoaded`]. After a stop,
    /// playback restarts from the beginning; after a pause it continues
    /// where it left off.
    pub fn play_bgm(&mut self) -> EngineResult<()> {
        let asset_id = self.bgm_asset.clone().ok_or(EngineError::NothingLoaded)?;
        let bgm = self.pool.bgm_bus();

        // Retire the bound instance when it cannot carry this play: a
        // finished (non-looping) instance cannot reconnect, and an
        // instance of a previously loaded track must yield to the one
        // `preload_bgm` selected
        if self
            .pool
            .instance(bgm)
            .is_some_and(|i| i.state().is_finished() || i.asset_id() != asset_id)
        {
            self.release_bus(bgm);
        }

        self.fades.cancel(bgm);

        if self.pool.instance(bgm).is_none() {
            // Reload covers the case where a purge evicted the idle BGM
            let buffer = self
                .cache
                .load(&asset_id, SoundCategory::Bgm, &*self.source)?;
            let instance = SoundInstance::new(
                &asset_id,
                SoundCategory::Bgm,
                buffer,
                1.0,
                self.config.bgm_loops,
            );
            self.cache.retain(&asset_id);
            self.pool.bind(bgm, instance);
        }
        self.cache.touch(&asset_id);
        self.pool.set_gain(bgm, self.bgm_volume, &mut *self.mixer);
        self.pool.set_playing(bgm, true, &mut *self.mixer);

        tracing::info!("Playing BGM '{}'", asset_id);
        Ok(())
    }

    /// Pause the BGM bus; no-op if nothing is loaded there
    pub fn pause_bgm(&mut self) {
        let bgm = self.pool.bgm_bus();
        self.pool.set_playing(bgm, false, &mut *self.mixer);
    }

    /// Resume the BGM bus from the playhead where `pause_bgm` left it;
    /// no-op if nothing is loaded or nothing is paused
    pub fn resume_bgm(&mut self) {
        let bgm = self.pool.bgm_bus();
        if self
            .pool
            .instance(bgm)
            .is_some_and(|i| i.state().is_paused())
        {
            self.pool.set_playing(bgm, true, &mut *self.mixer);
            if let Some(asset) = self.bgm_asset.clone() {
                self.cache.touch(&asset);
            }
        }
    }

    /// Stop and rewind the BGM bus.
    ///
    /// The sound stays loaded: a subsequent [`Engine::play_bgm`] starts
    /// from the beginning of the asset.
    pub fn stop_bgm(&mut self) {
        let bgm = self.pool.bgm_bus();
        if let Some(asset) = self.pool.instance(bgm).map(|i| i.asset_id().to_string()) {
            self.release_bus(bgm);
            tracing::info!("Stopped BGM '{}'", asset);
        }
    }

    /// Whether the BGM bus is currently playing
    pub fn is_playing_bgm(&self) -> bool {
        self.pool.is_connected(self.pool.bgm_bus())
    }

    /// Whether any bus is currently playing
    pub fn is_playing(&self) -> bool {
        !self.pool.connected_buses().is_empty()
    }

    // ......................................................... volume

    /// Set the master effect volume and immediately re-apply it to every
    /// bound effect bus, playing or paused
    pub fn set_effect_volume(&mut self, volume: f32) {
        self.effect_volume = clamp_volume(volume);
        for bus in self.pool.buses_for_category(SoundCategory::Effect) {
            let gain = self
                .pool
                .instance(bus)
                .map(|i| i.volume() * self.effect_volume)
                .unwrap_or(0.0);
            self.pool.set_gain(bus, gain, &mut *self.mixer);
        }
    }

    /// Set the master BGM volume and immediately re-apply it to the BGM
    /// bus. Cancels any fade in flight: an explicit volume wins.
    pub fn set_bgm_volume(&mut self, volume: f32) {
        self.bgm_volume = clamp_volume(volume);
        let bgm = self.pool.bgm_bus();
        self.fades.cancel(bgm);
        if self.pool.instance(bgm).is_some() {
            self.pool.set_gain(bgm, self.bgm_volume, &mut *self.mixer);
        }
    }

    /// Current master effect volume
    pub fn effect_volume(&self) -> f32 {
        self.effect_volume
    }

    /// Current master BGM volume
    pub fn bgm_volume(&self) -> f32 {
        self.bgm_volume
    }

    // .................................................. global pause

    /// Silence the whole engine, remembering which buses were playing.
    ///
    /// Idempotent: calling while already paused changes nothing. Buses
    /// paused individually beforehand are not recorded and stay paused
    /// after [`Engine::resume_engine`]. All playheads are preserved.
    pub fn pause_engine(&mut self) {
        if self.globally_paused {
            return;
        }
        self.globally_paused = true;
        let playing = self.pool.connected_buses();
        for &bus in &playing {
            self.pool.set_playing(bus, false, &mut *self.mixer);
        }
        self.buses_to_resume = playing;
        tracing::info!(
            "Engine paused ({} bus(es) to resume)",
            self.buses_to_resume.len()
        );
    }

    /// Resume exactly the buses that were playing when `pause_engine`
    /// was called; no-op if the engine is not globally paused
    pub fn resume_engine(&mut self) {
        if !self.globally_paused {
            return;
        }
        self.globally_paused = false;
        let buses = std::mem::take(&mut self.buses_to_resume);
        for &bus in &buses {
            self.pool.set_playing(bus, true, &mut *self.mixer);
            if let Some(asset) = self.pool.instance(bus).map(|i| i.asset_id().to_string()) {
                self.cache.touch(&asset);
            }
        }
        tracing::info!("Engine resumed ({} bus(es))", buses.len());
    }

    /// Whether the engine is globally paused
    pub fn is_globally_paused(&self) -> bool {
        self.globally_paused
    }

    /// Pause one bus, preserving its playhead; no-op on an empty bus
    pub fn pause_sound(&mut self, bus: usize) {
        self.pool.set_playing(bus, false, &mut *self.mixer);
    }

    /// Resume one paused bus from where it left off; no-op otherwise
    pub fn resume_sound(&mut self, bus: usize) {
        if self
            .pool
            .instance(bus)
            .is_some_and(|i| i.state().is_paused())
        {
            self.pool.set_playing(bus, true, &mut *self.mixer);
            if let Some(asset) = self.pool.instance(bus).map(|i| i.asset_id().to_string()) {
                self.cache.touch(&asset);
            }
        }
    }

    /// Stop one bus outright: disconnect, release the instance, free the
    /// bus for reuse. The playhead is discarded with the instance.
    pub fn stop_sound(&mut self, bus: usize) {
        if self.release_bus(bus).is_some() {
            tracing::debug!("Stopped bus {}", bus);
        }
    }

    /// Pause every playing bus, independent of the global-pause
    /// bookkeeping; resume sounds individually or via
    /// [`Engine::resume_all_paused_sounds`]
    pub fn pause_all_playing_sounds(&mut self) {
        for bus in self.pool.connected_buses() {
            self.pool.set_playing(bus, false, &mut *self.mixer);
        }
    }

    /// Resume every paused bus, independent of the global-pause
    /// bookkeeping
    pub fn resume_all_paused_sounds(&mut self) {
        for bus in 0..self.pool.bus_count() {
            if self
                .pool
                .instance(bus)
                .is_some_and(|i| i.state().is_paused())
            {
                self.pool.set_playing(bus, true, &mut *self.mixer);
                if let Some(asset) = self.pool.instance(bus).map(|i| i.asset_id().to_string()) {
                    self.cache.touch(&asset);
                }
            }
        }
    }

    // ........................................................ cleanup

    /// Reclaim the memory of every cached sound with no playing or
    /// paused instance. Returns the number of sounds evicted.
    pub fn purge_unused_sounds(&mut self) -> usize {
        let evicted = self.cache.reclaim_unused();
        if evicted > 0 {
            self.events.publish(EngineEvent::SoundsPurged { evicted });
        }
        evicted
    }

    // .......................................................... fades

    /// Fade the BGM bus linearly from its current gain to silence over
    /// `duration` seconds, then stop it. No-op if nothing is loaded on
    /// the BGM bus. Restarting a fade replaces the one in flight.
    pub fn fade_out_bgm_with_duration(&mut self, duration: f32) {
        let bgm = self.pool.bgm_bus();
        if self.pool.instance(bgm).is_none() {
            return;
        }
        self.fades.start_fade_out(bgm, duration, self.pool.gain(bgm));
    }

    /// Advance time-driven state by `dt` seconds of wall-clock time.
    ///
    /// The one method the host must call every frame: it reaps instances
    /// the render pass flagged as finished and advances active fades.
    /// Safe to call with `dt = 0`; bogus `dt` values advance nothing.
    pub fn update(&mut self, dt: f32) {
        // Reap first so a bus that finished and faded in the same frame
        // is released exactly once
        for bus in self.pool.finished_buses() {
            let category = self.release_bus(bus);
            match category {
                Some(SoundCategory::Bgm) => self.events.publish(EngineEvent::BgmFinished),
                Some(SoundCategory::Effect) => {
                    self.events.publish(EngineEvent::EffectFinished { bus })
                }
                None => {}
            }
        }

        let bgm = self.pool.bgm_bus();
        for step in self.fades.advance(dt) {
            if step.finished {
                self.pool.set_gain(step.bus, 0.0, &mut *self.mixer);
                if self.release_bus(step.bus).is_some() && step.bus == bgm {
                    tracing::info!("BGM fade-out complete");
                    self.events.publish(EngineEvent::BgmFadedOut);
                }
            } else {
                self.pool.set_gain(step.bus, step.gain, &mut *self.mixer);
            }
        }
    }

    // ......................................................... render

    /// Fill one render quantum for `bus`; called by the hardware mixer
    /// glue on the audio clock. See [`crate::render::render_bus`].
    pub fn render_bus(&mut self, bus: usize, left: &mut [f32], right: &mut [f32]) {
        render::render_bus(&mut self.pool, bus, left, right);
    }

    /// Read-only view of the voice pool
    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Read-only view of the sound cache
    pub fn cache(&self) -> &SoundCache {
        &self.cache
    }

    /// Index of the dedicated BGM bus
    pub fn bgm_bus(&self) -> usize {
        self.pool.bgm_bus()
    }

    /// Release whatever is bound to `bus` and drop its cache reference.
    /// Returns the category of the released instance, if any.
    fn release_bus(&mut self, bus: usize) -> Option<SoundCategory> {
        self.fades.cancel(bus);
        self.buses_to_resume.retain(|&b| b != bus);
        let instance = self.pool.release(bus, &mut *self.mixer)?;
        self.cache.release(instance.asset_id());
        Some(instance.category())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::PcmData;
    use crate::error::LoadError;
    use crate::mixer::NullMixer;

    /// In-memory source: any id loads as a short mono clip; ids prefixed
    /// "missing" fail; "long" ids are 1000 frames
    struct FakeSource;

    impl AssetSource for FakeSource {
        fn load_pcm(&self, asset_id: &str) -> Result<PcmData, LoadError> {
            if asset_id.starts_with("missing") {
                return Err(LoadError::AssetNotFound(asset_id.to_string()));
            }
            let frames = if asset_id.starts_with("long") { 1000 } else { 32 };
            Ok(PcmData {
                left: vec![0.5; frames],
                right: None,
            })
        }
    }

    fn test_engine(effect_buses: usize) -> Engine {
        let config = EngineConfig {
            effect_buses,
            ..EngineConfig::default()
        };
        Engine::new(config, Box::new(FakeSource), Box::new(NullMixer))
    }

    #[test]
    fn test_initialized_event_reaches_early_subscribers() {
        let bus = EventBus::new();
        let (rx, _) = bus.subscribe();
        let _engine = Engine::with_event_bus(
            EngineConfig::default(),
            Box::new(FakeSource),
            Box::new(NullMixer),
            bus,
        );
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::Initialized);
        // One-shot: nothing else queued
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_preload_does_not_start_playback() {
        let mut engine = test_engine(2);
        engine.preload_effect("jump").unwrap();
        engine.preload_bgm("long-theme").unwrap();

        assert!(engine.cache().contains("jump"));
        assert!(!engine.is_playing());
        assert!(!engine.is_playing_bgm());
    }

    #[test]
    fn test_play_effect_connects_bus() {
        let mut engine = test_engine(2);
        let bus = engine.play_effect("jump").unwrap();

        assert!(engine.pool().is_connected(bus));
        assert_eq!(engine.cache().active_instances("jump"), Some(1));
    }

    #[test]
    fn test_pool_exhaustion_leaves_existing_buses_alone() {
        let mut engine = test_engine(2);
        let a = engine.play_effect("a").unwrap();
        let b = engine.play_effect("b").unwrap();

        let err = engine.play_effect("c").unwrap_err();
        assert!(matches!(err, EngineError::PoolExhausted(2)));
        assert!(engine.pool().is_connected(a));
        assert!(engine.pool().is_connected(b));

        // The engine stays usable after the failure
        engine.stop_bgm();
        assert!(engine.play_effect("a").is_err()); // still full
    }

    #[test]
    fn test_play_bgm_requires_preload() {
        let mut engine = test_engine(2);
        assert!(matches!(
            engine.play_bgm().unwrap_err(),
            EngineError::NothingLoaded
        ));

        engine.preload_bgm("long-theme").unwrap();
        engine.play_bgm().unwrap();
        assert!(engine.is_playing_bgm());
    }

    #[test]
    fn test_bgm_pause_resume_preserves_playhead() {
        let mut engine = test_engine(1);
        engine.preload_bgm("long-theme").unwrap();
        engine.play_bgm().unwrap();

        let bgm = engine.bgm_bus();
        let mut l = [0.0f32; 100];
        let mut r = [0.0f32; 100];
        engine.render_bus(bgm, &mut l, &mut r);
        assert_eq!(engine.pool().instance(bgm).unwrap().playhead(), 100);

        engine.pause_bgm();
        assert!(!engine.is_playing_bgm());
        engine.resume_bgm();
        assert!(engine.is_playing_bgm());
        assert_eq!(engine.pool().instance(bgm).unwrap().playhead(), 100);
    }

    #[test]
    fn test_stop_bgm_rewinds() {
        let mut engine = test_engine(1);
        engine.preload_bgm("long-theme").unwrap();
        engine.play_bgm().unwrap();

        let bgm = engine.bgm_bus();
        let mut l = [0.0f32; 64];
        let mut r = [0.0f32; 64];
        engine.render_bus(bgm, &mut l, &mut r);

        engine.stop_bgm();
        assert!(!engine.is_playing_bgm());
        assert_eq!(engine.cache().active_instances("long-theme"), Some(0));

        // Restart begins at sample 0
        engine.play_bgm().unwrap();
        assert_eq!(engine.pool().instance(bgm).unwrap().playhead(), 0);
    }

    #[test]
    fn test_play_bgm_switches_to_newly_preloaded_track() {
        let mut engine = test_engine(1);
        engine.preload_bgm("long-a").unwrap();
        engine.play_bgm().unwrap();

        let bgm = engine.bgm_bus();
        let mut l = [0.0f32; 64];
        let mut r = [0.0f32; 64];
        engine.render_bus(bgm, &mut l, &mut r);

        // Loading a different track mid-playback: the next play_bgm
        // must switch to it, from the beginning
        engine.preload_bgm("long-b").unwrap();
        engine.play_bgm().unwrap();

        let instance = engine.pool().instance(bgm).unwrap();
        assert_eq!(instance.asset_id(), "long-b");
        assert_eq!(instance.playhead(), 0);
        assert!(engine.is_playing_bgm());

        // The replaced track dropped its reference and is reclaimable
        assert_eq!(engine.cache().active_instances("long-a"), Some(0));
        assert_eq!(engine.cache().active_instances("long-b"), Some(1));
    }

    #[test]
    fn test_play_bgm_same_track_resumes_after_pause() {
        let mut engine = test_engine(1);
        engine.preload_bgm("long-a").unwrap();
        engine.play_bgm().unwrap();

        let bgm = engine.bgm_bus();
        let mut l = [0.0f32; 64];
        let mut r = [0.0f32; 64];
        engine.render_bus(bgm, &mut l, &mut r);

        // Re-preloading the same track must not reset the playhead
        engine.pause_bgm();
        engine.preload_bgm("long-a").unwrap();
        engine.play_bgm().unwrap();
        assert_eq!(engine.pool().instance(bgm).unwrap().playhead(), 64);
    }

    #[test]
    fn test_bgm_ops_on_empty_bus_are_noops() {
        let mut engine = test_engine(1);
        engine.pause_bgm();
        engine.resume_bgm();
        engine.stop_bgm();
        engine.fade_out_bgm_with_duration(1.0);
        assert!(!engine.is_playing_bgm());
    }

    #[test]
    fn test_set_effect_volume_applies_to_playing_buses() {
        let mut engine = test_engine(2);
        let bus = engine.play_effect_with_volume("jump", 0.8).unwrap();
        assert!((engine.pool().gain(bus) - 0.8).abs() < 1e-6);

        engine.set_effect_volume(0.5);
        assert!((engine.pool().gain(bus) - 0.4).abs() < 1e-6);

        // Master volume is clamped before multiplication
        engine.set_effect_volume(2.0);
        assert!((engine.pool().gain(bus) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_set_bgm_volume_applies_immediately() {
        let mut engine = test_engine(1);
        engine.preload_bgm("theme").unwrap();
        engine.play_bgm().unwrap();

        engine.set_bgm_volume(0.25);
        assert_eq!(engine.pool().gain(engine.bgm_bus()), 0.25);
    }

    #[test]
    fn test_global_pause_restores_exact_set() {
        let mut engine = test_engine(3);
        let a = engine.play_effect("a").unwrap();
        let b = engine.play_effect("b").unwrap();
        let c = engine.play_effect("c").unwrap();

        // b is individually paused before the global pause
        engine.pause_sound(b);
        engine.pause_engine();
        assert!(!engine.pool().is_connected(a));
        assert!(!engine.pool().is_connected(c));

        engine.resume_engine();
        assert!(engine.pool().is_connected(a));
        assert!(engine.pool().is_connected(c));
        // Individually paused bus stays paused
        assert!(!engine.pool().is_connected(b));
        assert!(engine.pool().instance(b).unwrap().state().is_paused());
    }

    #[test]
    fn test_pause_engine_is_idempotent() {
        let mut engine = test_engine(2);
        let a = engine.play_effect("a").unwrap();

        engine.pause_engine();
        engine.pause_engine(); // second call records nothing new
        engine.resume_engine();
        assert!(engine.pool().is_connected(a));

        // Resume without pause is a no-op
        engine.resume_engine();
        assert!(engine.pool().is_connected(a));
    }

    #[test]
    fn test_pause_resume_all_sounds() {
        let mut engine = test_engine(2);
        let a = engine.play_effect("a").unwrap();
        let b = engine.play_effect("b").unwrap();

        engine.pause_all_playing_sounds();
        assert!(!engine.pool().is_connected(a));
        assert!(!engine.pool().is_connected(b));

        engine.resume_all_paused_sounds();
        assert!(engine.pool().is_connected(a));
        assert!(engine.pool().is_connected(b));
    }

    #[test]
    fn test_purge_skips_active_sounds() {
        let mut engine = test_engine(2);
        engine.preload_effect("idle").unwrap();
        engine.play_effect("busy").unwrap();

        let evicted = engine.purge_unused_sounds();
        assert_eq!(evicted, 1);
        assert!(!engine.cache().contains("idle"));
        assert!(engine.cache().contains("busy"));
    }

    #[test]
    fn test_update_reaps_finished_effects() {
        let mut engine = test_engine(2);
        let (rx, _) = engine.events().subscribe();
        let bus = engine.play_effect("blip").unwrap(); // 32 frames

        let mut l = [0.0f32; 64];
        let mut r = [0.0f32; 64];
        engine.render_bus(bus, &mut l, &mut r);
        // Finished but not yet reaped: buffer still referenced
        assert_eq!(engine.cache().active_instances("blip"), Some(1));

        engine.update(0.016);
        assert_eq!(engine.cache().active_instances("blip"), Some(0));
        assert!(engine.pool().instance(bus).is_none());
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::EffectFinished { bus });

        // The bus is free again
        assert_eq!(engine.play_effect("blip").unwrap(), bus);
    }

    #[test]
    fn test_fade_out_bgm_reaches_silence_and_stops() {
        let mut engine = test_engine(1);
        let (rx, _) = engine.events().subscribe();
        engine.preload_bgm("long-theme").unwrap();
        engine.play_bgm().unwrap();

        let bgm = engine.bgm_bus();
        let pre_fade = engine.pool().gain(bgm);
        engine.fade_out_bgm_with_duration(2.0);

        engine.update(1.0);
        assert!((engine.pool().gain(bgm) - pre_fade * 0.5).abs() < 1e-6);
        assert!(engine.is_playing_bgm());

        engine.update(1.0);
        assert_eq!(engine.pool().gain(bgm), 0.0);
        assert!(!engine.is_playing_bgm());
        assert!(engine.pool().instance(bgm).is_none());
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::BgmFadedOut);
    }

    #[test]
    fn test_play_bgm_after_fade_restores_volume() {
        let mut engine = test_engine(1);
        engine.preload_bgm("theme").unwrap();
        engine.play_bgm().unwrap();
        engine.fade_out_bgm_with_duration(1.0);
        engine.update(0.5);

        engine.play_bgm().unwrap();
        assert!(engine.is_playing_bgm());
        assert_eq!(engine.pool().gain(engine.bgm_bus()), engine.bgm_volume());
        // The fade was cancelled
        engine.update(1.0);
        assert!(engine.is_playing_bgm());
    }

    #[test]
    fn test_load_failure_propagates_and_engine_survives() {
        let mut engine = test_engine(2);
        assert!(engine.preload_effect("missing-sound").is_err());
        assert!(engine.play_effect("missing-sound").is_err());

        // Still fully operational
        engine.play_effect("jump").unwrap();
        assert!(engine.is_playing());
    }

    #[test]
    fn test_update_with_zero_dt_is_safe() {
        let mut engine = test_engine(1);
        engine.preload_bgm("theme").unwrap();
        engine.play_bgm().unwrap();
        engine.fade_out_bgm_with_duration(1.0);

        engine.update(0.0);
        engine.update(f32::NAN);
        assert!(engine.is_playing_bgm());
    }
}
