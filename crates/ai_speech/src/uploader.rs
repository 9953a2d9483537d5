//! Chunked, paced upload of PCM to a streaming recognizer
//!
//! Streaming recognizers expect audio at roughly real-time pace in small,
//! fixed-size frames. The uploader slices a captured PCM buffer into frames
//! and hands them to a [`FrameSink`] with a fixed delay between sends.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default frame size: 320 samples of 16-bit mono
pub const DEFAULT_FRAME_SIZE: usize = 640;

/// Default delay between frames
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(10);

/// Treatment of a trailing remainder shorter than one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TailPolicy {
    /// Never send the remainder. Recordings lose up to one frame of audio.
    #[default]
    Drop,
    /// Zero-pad the remainder to a full frame
    Pad,
    /// Send the remainder as a short final frame
    Send,
}

/// Frame size, pacing and tail handling for an upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadConfig {
    pub frame_size: usize,
    pub frame_interval: Duration,
    pub tail_policy: TailPolicy,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            frame_size: DEFAULT_FRAME_SIZE,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            tail_policy: TailPolicy::Drop,
        }
    }
}

impl UploadConfig {
    /// Number of frames `len` bytes of PCM are sent as
    #[must_use]
    pub const fn frame_count(&self, len: usize) -> usize {
        if self.frame_size == 0 {
            return 0;
        }
        let full = len / self.frame_size;
        match self.tail_policy {
            TailPolicy::Pad | TailPolicy::Send if len % self.frame_size != 0 => full + 1,
            _ => full,
        }
    }

    /// Total delay spent between frames when uploading `len` bytes
    #[must_use]
    pub fn pacing(&self, len: usize) -> Duration {
        let gaps = self.frame_count(len).saturating_sub(1);
        self.frame_interval
            .saturating_mul(u32::try_from(gaps).unwrap_or(u32::MAX))
    }
}

/// What an upload actually transmitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadReport {
    pub frames_sent: usize,
    pub bytes_sent: usize,
    /// Input bytes that never left the process
    pub bytes_dropped: usize,
}

/// Destination for uploaded frames
#[async_trait]
pub trait FrameSink: Send {
    type Error: Send;

    async fn send_frame(&mut self, frame: Bytes) -> Result<(), Self::Error>;
}

/// Split `pcm` into frames according to `config`
///
/// Returns the frames in order together with the number of input bytes that
/// are not covered by any frame. A zero frame size yields no frames.
#[must_use]
pub fn split_frames(pcm: &Bytes, config: &UploadConfig) -> (Vec<Bytes>, usize) {
    let size = config.frame_size;
    if size == 0 {
        return (Vec::new(), pcm.len());
    }

    let full = pcm.len() / size;
    let tail = pcm.len() % size;

    let mut frames: Vec<Bytes> = (0..full)
        .map(|i| pcm.slice(i * size..(i + 1) * size))
        .collect();

    let tail_start = full * size;
    let dropped = match config.tail_policy {
        _ if tail == 0 => 0,
        TailPolicy::Drop => tail,
        TailPolicy::Send => {
            frames.push(pcm.slice(tail_start..));
            0
        },
        TailPolicy::Pad => {
            let mut padded = BytesMut::with_capacity(size);
            padded.put_slice(&pcm[tail_start..]);
            padded.put_bytes(0, size - tail);
            frames.push(padded.freeze());
            0
        },
    };

    (frames, dropped)
}

/// Send `pcm` to `sink` frame by frame, sleeping `frame_interval` between
/// consecutive frames
///
/// # Errors
///
/// The first error returned by the sink stops the upload and is returned
/// unchanged.
pub async fn stream_frames<S>(
    pcm: &Bytes,
    config: &UploadConfig,
    sink: &mut S,
) -> Result<UploadReport, S::Error>
where
    S: FrameSink + ?Sized,
{
    let (frames, bytes_dropped) = split_frames(pcm, config);
    let mut report = UploadReport {
        bytes_dropped,
        ..UploadReport::default()
    };

    for (index, frame) in frames.into_iter().enumerate() {
        if index > 0 && !config.frame_interval.is_zero() {
            tokio::time::sleep(config.frame_interval).await;
        }
        let len = frame.len();
        sink.send_frame(frame).await?;
        report.frames_sent += 1;
        report.bytes_sent += len;
    }

    if report.bytes_dropped > 0 {
        debug!(
            dropped = report.bytes_dropped,
            frame_size = config.frame_size,
            "Trailing partial frame not sent"
        );
    }

    Ok(report)
}
