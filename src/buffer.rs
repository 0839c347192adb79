//! Decoded PCM audio data shared by all instances of one sound asset.
//!
//! A buffer is immutable once created. The cache owns one buffer per
//! asset; every playing or paused instance of that asset holds a shared
//! reference to the same buffer.

/// Immutable decoded PCM data for one sound asset (mono or stereo).
///
/// Samples are normalized `f32` in `[-1.0, 1.0]`. For stereo buffers the
/// two channels are stored de-interleaved and have equal length.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    frame_count: usize,
    left: Vec<f32>,
    right: Option<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a mono buffer from a single channel of samples
    pub fn mono(samples: Vec<f32>) -> Self {
        Self {
            frame_count: samples.len(),
            left: samples,
            right: None,
        }
    }

    /// Create a stereo buffer from two channels of samples.
    ///
    /// If the channels differ in length, both are truncated to the
    /// shorter one so every frame has a sample on each channel.
    pub fn stereo(mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let frame_count = left.len().min(right.len());
        left.truncate(frame_count);
        right.truncate(frame_count);
        Self {
            frame_count,
            left,
            right: Some(right),
        }
    }

    /// Whether this buffer carries two channels
    pub fn is_stereo(&self) -> bool {
        self.right.is_some()
    }

    /// Total number of audio frames
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Left channel samples (the only channel for mono buffers)
    pub fn left(&self) -> &[f32] {
        &self.left
    }

    /// Right channel samples; `None` for mono buffers
    pub fn right(&self) -> Option<&[f32]> {
        self.right.as_deref()
    }

    /// Sample pair at `frame`: mono buffers yield the same value on both
    /// channels. Out-of-range frames yield silence.
    pub fn frame(&self, frame: usize) -> (f32, f32) {
        if frame >= self.frame_count {
            return (0.0, 0.0);
        }
        let l = self.left[frame];
        let r = match &self.right {
            Some(right) => right[frame],
            None => l,
        };
        (l, r)
    }

    /// Approximate memory held by the sample data, in bytes
    pub fn byte_size(&self) -> usize {
        let channels = if self.is_stereo() { 2 } else { 1 };
        self.frame_count * channels * std::mem::size_of::<f32>()
    }
}
