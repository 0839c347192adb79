//! In-memory cache of decoded sound buffers.
//!
//! Owns one [`AudioBuffer`] per asset id, tracks how many playing or
//! paused instances reference each buffer, and keeps a most-recently-used
//! ordering over the entries. Reclamation frees every idle buffer and is
//! the only way an entry ever leaves the cache; nothing is evicted
//! implicitly mid-playback.

use std::collections::HashMap;
use std::sync::Arc;

use crate::asset::AssetSource;
use crate::buffer::AudioBuffer;
use crate::error::LoadError;
use crate::voice::SoundCategory;

/// One cached sound with its usage bookkeeping
struct CacheEntry {
    buffer: Arc<AudioBuffer>,

    /// Number of instances currently in Playing or Paused state that
    /// reference this buffer. Entries with a non-zero count are never
    /// evicted.
    active_instances: usize,
}

/// Cache of decoded audio buffers with reference counts and MRU ordering.
///
/// There is no hard capacity: effect assets are small relative to
/// available memory, and the host decides when to run a reclamation pass
/// via [`SoundCache::reclaim_unused`]. The MRU order exists to make
/// reclamation deterministic and to support a future bounded-capacity
/// policy; it does not affect playback.
pub struct SoundCache {
    entries: HashMap<String, CacheEntry>,

    /// Asset ids ordered most-recently-played first
    ranking: Vec<String>,
}

impl SoundCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            ranking: Vec::new(),
        }
    }

    /// Return the buffer for `asset_id`, loading it from `source` on a
    /// cache miss.
    ///
    /// A hit returns the shared buffer without touching reference counts
    /// or the MRU order; counting is driven by instance binding and
    /// ordering by [`SoundCache::touch`]. A miss decodes the asset,
    /// inserts a fresh entry, and places it at the front of the MRU
    /// order.
    pub fn load(
        &mut self,
        asset_id: &str,
        category: SoundCategory,
        source: &dyn AssetSource,
    ) -> Result<Arc<AudioBuffer>, LoadError> {
        if let Some(entry) = self.entries.get(asset_id) {
            return Ok(Arc::clone(&entry.buffer));
        }

        let buffer = Arc::new(source.load_pcm(asset_id)?.into_buffer());
        tracing::info!(
            "Loaded {} '{}': {} frames, {} ({} bytes)",
            category,
            asset_id,
            buffer.frame_count(),
            if buffer.is_stereo() { "stereo" } else { "mono" },
            buffer.byte_size()
        );

        self.entries.insert(
            asset_id.to_string(),
            CacheEntry {
                buffer: Arc::clone(&buffer),
                active_instances: 0,
            },
        );
        self.ranking.insert(0, asset_id.to_string());

        Ok(buffer)
    }

    /// Move `asset_id` to the front of the MRU order.
    ///
    /// Called every time an instance of that asset begins or resumes
    /// playback. Unknown ids are ignored.
    pub fn touch(&mut self, asset_id: &str) {
        if let Some(pos) = self.ranking.iter().position(|id| id == asset_id) {
            let id = self.ranking.remove(pos);
            self.ranking.insert(0, id);
        }
    }

    /// Record that an instance of `asset_id` entered Playing or Paused
    /// state
    pub fn retain(&mut self, asset_id: &str) {
        if let Some(entry) = self.entries.get_mut(asset_id) {
            entry.active_instances += 1;
        }
    }

    /// Record that an instance of `asset_id` stopped or finished
    pub fn release(&mut self, asset_id: &str) {
        if let Some(entry) = self.entries.get_mut(asset_id) {
            entry.active_instances = entry.active_instances.saturating_sub(1);
        }
    }

    /// Evict every entry with no active instances and free its buffer
    /// memory.
    ///
    /// This is a full "reclaim all idle" pass, not a capacity eviction:
    /// MRU position does not spare an idle entry, and entries with
    /// active instances are always skipped. Returns the number of
    /// entries evicted. Idempotent on an already-clean cache.
    pub fn reclaim_unused(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|asset_id, entry| {
            let keep = entry.active_instances > 0;
            if !keep {
                tracing::debug!(
                    "Reclaiming '{}' ({} bytes)",
                    asset_id,
                    entry.buffer.byte_size()
                );
            }
            keep
        });
        let entries = &self.entries;
        self.ranking.retain(|id| entries.contains_key(id));

        let evicted = before - self.entries.len();
        if evicted > 0 {
            tracing::info!("Reclaimed {} idle sound(s)", evicted);
        }
        evicted
    }

    /// Whether `asset_id` is currently cached
    pub fn contains(&self, asset_id: &str) -> bool {
        self.entries.contains_key(asset_id)
    }

    /// Number of cached sounds
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no sounds
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Active-instance count for `asset_id`; `None` if not cached
    pub fn active_instances(&self, asset_id: &str) -> Option<usize> {
        self.entries.get(asset_id).map(|e| e.active_instances)
    }

    /// Asset ids ordered most-recently-played first
    pub fn ranking(&self) -> &[String] {
        &self.ranking
    }
}

impl Default for SoundCache {
    fn default() -> Self {
        Self::new()
    }
}
