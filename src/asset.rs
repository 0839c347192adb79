//! Asset source abstraction and the WAV file implementation.
//!
//! The engine never touches the filesystem or a decoder directly: it
//! asks an [`AssetSource`] for decoded PCM by opaque asset id. Path and
//! extension resolution is entirely the source's responsibility.

use std::path::PathBuf;

use crate::buffer::AudioBuffer;
use crate::error::LoadError;

/// Decoded PCM data handed over by an asset source.
///
/// `right` is `None` for mono assets. Channel lengths are expected to be
/// equal for stereo; the buffer constructor truncates to the shorter
/// channel if a source misbehaves.
#[derive(Debug, Clone)]
pub struct PcmData {
    pub left: Vec<f32>,
    pub right: Option<Vec<f32>>,
}

impl PcmData {
    /// Convert into the immutable buffer form the cache stores
    pub fn into_buffer(self) -> AudioBuffer {
        match self.right {
            Some(right) => AudioBuffer::stereo(self.left, right),
            None => AudioBuffer::mono(self.left),
        }
    }
}

/// External supplier of decoded PCM audio.
///
/// Asset ids are opaque strings with no assumed path or extension.
pub trait AssetSource {
    /// Load the PCM data for `asset_id`.
    ///
    /// Fails with [`LoadError::AssetNotFound`] if the source cannot
    /// supply the asset and [`LoadError::UnsupportedFormat`] if the
    /// channel layout cannot be mapped to mono/stereo PCM.
    fn load_pcm(&self, asset_id: &str) -> Result<PcmData, LoadError>;
}

/// Asset source reading WAV files from a root directory.
///
/// Resolves `asset_id` to `<root>/<asset_id>.wav`. Integer and float
/// sample formats are supported; anything other than 1 or 2 channels is
/// rejected as unsupported.
pub struct WavAssetSource {
    root: PathBuf,
}

impl WavAssetSource {
    /// Create a source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, asset_id: &str) -> PathBuf {
        self.root.join(format!("{asset_id}.wav"))
    }
}

impl AssetSource for WavAssetSource {
    fn load_pcm(&self, asset_id: &str) -> Result<PcmData, LoadError> {
        let path = self.resolve(asset_id);
        if !path.exists() {
            return Err(LoadError::AssetNotFound(asset_id.to_string()));
        }

        let mut reader = hound::WavReader::open(&path).map_err(|e| LoadError::ReadFailed {
            asset: asset_id.to_string(),
            source: Box::new(e),
        })?;
        let spec = reader.spec();

        if spec.channels == 0 || spec.channels > 2 {
            return Err(LoadError::UnsupportedFormat {
                asset: asset_id.to_string(),
                reason: format!("{} channels (expected mono or stereo)", spec.channels),
            });
        }

        // Normalize everything to f32 in [-1, 1]
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| LoadError::ReadFailed {
                    asset: asset_id.to_string(),
                    source: Box::new(e),
                })?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| LoadError::ReadFailed {
                        asset: asset_id.to_string(),
                        source: Box::new(e),
                    })?
            }
        };

        tracing::debug!(
            "Loaded WAV asset '{}': {} Hz, {} ch, {} samples",
            asset_id,
            spec.sample_rate,
            spec.channels,
            interleaved.len()
        );

        if spec.channels == 1 {
            Ok(PcmData {
                left: interleaved,
                right: None,
            })
        } else {
            let mut left = Vec::with_capacity(interleaved.len() / 2);
            let mut right = Vec::with_capacity(interleaved.len() / 2);
            for pair in interleaved.chunks_exact(2) {
                left.push(pair[0]);
                right.push(pair[1]);
            }
            Ok(PcmData {
                left,
                right: Some(right),
            })
        }
    }
}
