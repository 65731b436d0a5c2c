use std::{
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use thiserror::Error;

static NEXT_SAMPLE_ID: AtomicU64 = AtomicU64::new(1);

/// File extensions accepted when a sample file is dropped onto the display.
const SUPPORTED_EXTENSIONS: [&str; 4] = ["wav", "mp3", "aif", "aiff"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SampleBufferError {
    #[error("Sample buffer has no channels")]
    NoChannels,

    #[error("Channel {channel} has {len} frames, expected {expected}")]
    MismatchedChannelLength {
        channel: usize,
        len: usize,
        expected: usize,
    },

    #[error("Interleaved data of length {len} can't be split into {channels} channels")]
    UnevenInterleavedData { len: usize, channels: usize },
}

/// Identity of a loaded sample. Two buffers never share an id within a process,
/// even if one was dropped before the other was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleId(u64);

impl SampleId {
    fn next() -> Self {
        SampleId(NEXT_SAMPLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A decoded, immutable multi-channel sample.
///
/// Channels are stored planar. All channels have the same number of frames.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    id: SampleId,
    channels: Arc<[Arc<[f32]>]>,
    frames: usize,
    sample_rate: u32,
    name: Option<String>,
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl SampleBuffer {
    /// Creates a buffer from planar channel data.
    pub fn from_channels(
        channels: Vec<Vec<f32>>,
        sample_rate: u32,
    ) -> Result<Self, SampleBufferError> {
        let frames = channels.first().ok_or(SampleBufferError::NoChannels)?.len();

        for (channel, samples) in channels.iter().enumerate() {
            if samples.len() != frames {
                return Err(SampleBufferError::MismatchedChannelLength {
                    channel,
                    len: samples.len(),
                    expected: frames,
                });
            }
        }

        let channels = channels
            .into_iter()
            .map(|samples| samples.into_iter().map(sanitize).collect::<Arc<[f32]>>())
            .collect();

        Ok(SampleBuffer {
            id: SampleId::next(),
            channels,
            frames,
            sample_rate,
            name: None,
        })
    }

    /// Creates a buffer from interleaved data with the given channel count.
    pub fn from_interleaved(
        data: &[f32],
        channel_count: u16,
        sample_rate: u32,
    ) -> Result<Self, SampleBufferError> {
        let channel_count = channel_count as usize;
        if channel_count == 0 {
            return Err(SampleBufferError::NoChannels);
        }
        if data.len() % channel_count != 0 {
            return Err(SampleBufferError::UnevenInterleavedData {
                len: data.len(),
                channels: channel_count,
            });
        }

        let frames = data.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in data.chunks_exact(channel_count) {
            for (channel, sample) in channels.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        Self::from_channels(channels, sample_rate)
    }

    /// Attaches a display name, usually the file stem of the source asset.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> SampleId {
        self.id
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel(&self, channel: usize) -> Option<&[f32]> {
        self.channels.get(channel).map(|c| &c[..])
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Reads one sample. Channels past the last one map onto the last channel,
    /// so a mono buffer feeds every output channel. Out of range frames read as silence.
    #[inline(always)]
    pub fn get(&self, channel: usize, frame: usize) -> f32 {
        let channel = channel.min(self.channels.len().saturating_sub(1));
        match self.channels.get(channel).and_then(|c| c.get(frame)) {
            Some(v) => *v,
            None => 0.0,
        }
    }
}

/// Whether a dropped file looks like something the sample loader can decode.
pub fn is_supported_sample_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}
