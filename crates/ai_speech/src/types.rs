//! Types for speech processing
//!
//! Contains data structures for PCM layout, audio payloads and transcripts.

use serde::{Deserialize, Serialize};

/// Layout of headerless PCM samples
///
/// Raw PCM carries no metadata, so sample rate, channel count and sample
/// width travel alongside the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmSpec {
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Bytes per sample (2 = signed 16-bit little endian)
    pub bytes_per_sample: u16,
}

impl PcmSpec {
    #[must_use]
    pub const fn new(sample_rate: u32, channels: u16, bytes_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bytes_per_sample,
        }
    }

    /// Bytes consumed per second of audio
    #[must_use]
    pub const fn byte_rate(&self) -> u32 {
        self.sample_rate
            .saturating_mul(self.channels as u32)
            .saturating_mul(self.bytes_per_sample as u32)
    }

    /// Bytes per interleaved sample frame
    #[must_use]
    pub const fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bytes_per_sample)
    }

    #[must_use]
    pub const fn bits_per_sample(&self) -> u16 {
        self.bytes_per_sample.saturating_mul(8)
    }

    /// Duration in milliseconds of `len` bytes in this layout
    #[must_use]
    pub const fn duration_ms(&self, len: usize) -> u64 {
        let byte_rate = self.byte_rate() as u64;
        if byte_rate == 0 {
            return 0;
        }
        (len as u64).saturating_mul(1000) / byte_rate
    }
}

impl Default for PcmSpec {
    fn default() -> Self {
        Self::new(16_000, 1, 2)
    }
}

/// Supported audio payload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// Headerless PCM samples
    Pcm,
    /// RIFF/WAVE container around PCM samples
    Wav,
}

impl AudioFormat {
    /// Get the MIME type for this audio format
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Pcm => "application/octet-stream",
            Self::Wav => "audio/wav",
        }
    }

    /// Get the file extension for this audio format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Pcm => "pcm",
            Self::Wav => "wav",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Container for audio bytes with their layout
#[derive(Debug, Clone)]
pub struct AudioData {
    data: Vec<u8>,
    format: AudioFormat,
    spec: PcmSpec,
}

impl AudioData {
    /// Create new audio data
    #[must_use]
    pub const fn new(data: Vec<u8>, format: AudioFormat, spec: PcmSpec) -> Self {
        Self { data, format, spec }
    }

    /// Wrap headerless PCM bytes
    #[must_use]
    pub const fn pcm(data: Vec<u8>, spec: PcmSpec) -> Self {
        Self::new(data, AudioFormat::Pcm, spec)
    }

    /// Get the raw audio bytes
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the raw audio bytes
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[must_use]
    pub const fn format(&self) -> AudioFormat {
        self.format
    }

    #[must_use]
    pub const fn spec(&self) -> PcmSpec {
        self.spec
    }

    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the MIME type for this audio
    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Recognized text, accumulated one sentence at a time
///
/// Segments are joined without a separator; the recognizer already emits
/// punctuation and spacing where the language needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    segments: Vec<String>,
}

impl Transcript {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Append a finished sentence
    pub fn push_segment(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Full concatenation of all segments in arrival order
    #[must_use]
    pub fn text(&self) -> String {
        self.segments.concat()
    }

    /// True when no segment carries any text
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(String::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod pcm_spec {
        use super::*;

        #[test]
        fn default_is_16khz_mono_s16() {
            let spec = PcmSpec::default();
            assert_eq!(spec.sample_rate, 16000);
            assert_eq!(spec.channels, 1);
            assert_eq!(spec.bytes_per_sample, 2);
        }

        #[test]
        fn derived_fields() {
            let spec = PcmSpec::new(44100, 2, 2);
            assert_eq!(spec.byte_rate(), 176_400);
            assert_eq!(spec.block_align(), 4);
            assert_eq!(spec.bits_per_sample(), 16);
        }

        #[test]
        fn duration_of_one_second() {
            let spec = PcmSpec::default();
            assert_eq!(spec.duration_ms(32_000), 1000);
            assert_eq!(spec.duration_ms(640), 20);
        }

        #[test]
        fn duration_with_zero_rate_is_zero() {
            let spec = PcmSpec::new(0, 1, 2);
            assert_eq!(spec.duration_ms(1000), 0);
        }
    }

    mod audio_format {
        use super::*;

        #[test]
        fn mime_types_are_correct() {
            assert_eq!(AudioFormat::Wav.mime_type(), "audio/wav");
            assert_eq!(AudioFormat::Pcm.mime_type(), "application/octet-stream");
        }

        #[test]
        fn display_uses_extension() {
            assert_eq!(AudioFormat::Wav.to_string(), "wav");
            assert_eq!(AudioFormat::Pcm.to_string(), "pcm");
        }

        #[test]
        fn serializes_lowercase() {
            assert_eq!(serde_json::to_string(&AudioFormat::Wav).unwrap(), "\"wav\"");
        }
    }

    mod audio_data {
        use super::*;

        #[test]
        fn pcm_constructor_sets_format() {
            let audio = AudioData::pcm(vec![1, 2, 3, 4], PcmSpec::default());
            assert_eq!(audio.format(), AudioFormat::Pcm);
            assert_eq!(audio.size_bytes(), 4);
            assert!(!audio.is_empty());
        }

        #[test]
        fn into_data_returns_bytes() {
            let audio = AudioData::new(vec![9, 8], AudioFormat::Wav, PcmSpec::default());
            assert_eq!(audio.mime_type(), "audio/wav");
            assert_eq!(audio.into_data(), vec![9, 8]);
        }
    }

    mod transcript {
        use super::*;

        #[test]
        fn concatenates_without_separator() {
            let mut transcript = Transcript::new();
            transcript.push_segment("你好，");
            transcript.push_segment("世界。");
            assert_eq!(transcript.text(), "你好，世界。");
            assert_eq!(transcript.segments().len(), 2);
        }

        #[test]
        fn empty_when_no_segments() {
            assert!(Transcript::new().is_empty());
        }

        #[test]
        fn empty_when_segments_are_blank() {
            let mut transcript = Transcript::new();
            transcript.push_segment("");
            assert!(transcript.is_empty());
            transcript.push_segment("ok");
            assert!(!transcript.is_empty());
        }
    }
}
