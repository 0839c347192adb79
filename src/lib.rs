//! playbus: low-latency playback engine for games.
//!
//! Renders one long background-music (BGM) stream concurrently with
//! several short sound effects over a hardware mixer exposing a small
//! fixed number of input channels ("buses").
//!
//! ## Architecture
//!
//! ```text
//! Engine
//!   ├── SoundCache      asset id → shared AudioBuffer, refcounts, MRU
//!   ├── VoicePool       N effect buses + 1 BGM bus, fixed at startup
//!   │     └── SoundInstance (playhead, volume, loop, shared buffer)
//!   ├── FadeScheduler   linear gain ramps driven by update(dt)
//!   └── EventBus        init / finished / purged notifications
//!
//! AssetSource   (external) supplies decoded PCM by opaque asset id
//! MixerControl  (external) bus enable/gain; pulls render quanta
//! ```
//!
//! ## Two execution contexts
//!
//! The **control path** is everything the game calls, plus the periodic
//! [`Engine::update`] tick; the host serializes these. The **render
//! path** is the per-quantum [`Engine::render_bus`] pull on the audio
//! clock: it only reads instance state and advances playheads, never
//! blocking, allocating, or freeing. The ordering contract that keeps
//! them honest lives in [`voice::VoicePool`]: a bus is disconnected
//! before its buffer is released or rebound, and connected only after a
//! new instance is fully bound.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use playbus::{Engine, EngineConfig, NullMixer, WavAssetSource};
//!
//! let source = WavAssetSource::new("assets/sounds");
//! let mut engine = Engine::new(
//!     EngineConfig::default(),
//!     Box::new(source),
//!     Box::new(NullMixer),
//! );
//!
//! engine.preload_effect("explosion")?;
//! engine.preload_bgm("theme")?;
//!
//! engine.play_bgm()?;
//! engine.play_effect("explosion")?;
//!
//! // Every frame:
//! engine.update(dt);
//! ```

pub mod asset;
pub mod buffer;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod fade;
pub mod mixer;
pub mod render;
pub mod voice;

// Re-export commonly used types
pub use asset::{AssetSource, PcmData, WavAssetSource};
pub use buffer::AudioBuffer;
pub use cache::SoundCache;
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult, LoadError};
pub use events::{EngineEvent, EventBus};
pub use fade::FadeScheduler;
pub use mixer::{MixerControl, NullMixer};
pub use voice::{PlaybackState, SoundCategory, SoundInstance, VoicePool};
