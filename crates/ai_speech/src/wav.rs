//! WAV framing for headerless PCM
//!
//! The speech gateway returns raw little-endian PCM. Browsers and most audio
//! tooling need a self-describing container, so synthesized audio is wrapped
//! in the canonical 44-byte RIFF/WAVE header before it leaves the service.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::SpeechError;
use crate::types::{AudioData, AudioFormat, PcmSpec};

/// Size of the canonical PCM WAV header
pub const WAV_HEADER_LEN: usize = 44;

/// `fmt ` chunk size for plain PCM
const FMT_CHUNK_LEN: u32 = 16;

/// Format tag for uncompressed linear PCM
const FORMAT_PCM: u16 = 1;

/// Decoded fields of a canonical WAV header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_len: u32,
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_len: u32,
}

impl WavHeader {
    /// Header describing `data_len` bytes of PCM in `spec`
    #[must_use]
    pub fn for_pcm(spec: PcmSpec, data_len: usize) -> Self {
        let data_len = u32::try_from(data_len).unwrap_or(u32::MAX);
        Self {
            riff_len: data_len.saturating_add(WAV_HEADER_LEN as u32 - 8),
            format_tag: FORMAT_PCM,
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            byte_rate: spec.byte_rate(),
            block_align: spec.block_align(),
            bits_per_sample: spec.bits_per_sample(),
            data_len,
        }
    }

    /// PCM layout described by this header
    #[must_use]
    pub const fn spec(&self) -> PcmSpec {
        PcmSpec::new(self.sample_rate, self.channels, self.bits_per_sample / 8)
    }

    fn write_to(&self, buf: &mut impl BufMut) {
        buf.put_slice(b"RIFF");
        buf.put_u32_le(self.riff_len);
        buf.put_slice(b"WAVE");

        buf.put_slice(b"fmt ");
        buf.put_u32_le(FMT_CHUNK_LEN);
        buf.put_u16_le(self.format_tag);
        buf.put_u16_le(self.channels);
        buf.put_u32_le(self.sample_rate);
        buf.put_u32_le(self.byte_rate);
        buf.put_u16_le(self.block_align);
        buf.put_u16_le(self.bits_per_sample);

        buf.put_slice(b"data");
        buf.put_u32_le(self.data_len);
    }

    /// Parse a canonical 44-byte header and return it with the payload
    ///
    /// # Errors
    ///
    /// Returns `SpeechError::InvalidResponse` if the buffer is too short, the
    /// chunk tags are wrong, or the declared data length overruns the buffer.
    pub fn parse(container: &[u8]) -> Result<(Self, &[u8]), SpeechError> {
        if container.len() < WAV_HEADER_LEN {
            return Err(SpeechError::InvalidResponse(format!(
                "WAV container is {} bytes, header needs {WAV_HEADER_LEN}",
                container.len()
            )));
        }

        let mut buf = &container[..WAV_HEADER_LEN];

        expect_tag(&mut buf, b"RIFF")?;
        let riff_len = buf.get_u32_le();
        expect_tag(&mut buf, b"WAVE")?;
        expect_tag(&mut buf, b"fmt ")?;
        let fmt_len = buf.get_u32_le();
        if fmt_len != FMT_CHUNK_LEN {
            return Err(SpeechError::InvalidResponse(format!(
                "unsupported fmt chunk length {fmt_len}"
            )));
        }
        let format_tag = buf.get_u16_le();
        let channels = buf.get_u16_le();
        let sample_rate = buf.get_u32_le();
        let byte_rate = buf.get_u32_le();
        let block_align = buf.get_u16_le();
        let bits_per_sample = buf.get_u16_le();
        expect_tag(&mut buf, b"data")?;
        let data_len = buf.get_u32_le();

        let payload = &container[WAV_HEADER_LEN..];
        let declared = data_len as usize;
        if declared > payload.len() {
            return Err(SpeechError::InvalidResponse(format!(
                "WAV header declares {declared} data bytes but only {} follow",
                payload.len()
            )));
        }

        let header = Self {
            riff_len,
            format_tag,
            channels,
            sample_rate,
            byte_rate,
            block_align,
            bits_per_sample,
            data_len,
        };

        Ok((header, &payload[..declared]))
    }
}

fn expect_tag(buf: &mut &[u8], tag: &[u8; 4]) -> Result<(), SpeechError> {
    let found = &buf[..4];
    if found != tag {
        return Err(SpeechError::InvalidResponse(format!(
            "expected chunk tag {:?}, found {:?}",
            String::from_utf8_lossy(tag),
            String::from_utf8_lossy(found)
        )));
    }
    buf.advance(4);
    Ok(())
}

/// Wrap headerless PCM in a WAV container
///
/// Total over every input: sample values are copied verbatim and the header
/// always declares exactly `pcm.len()` data bytes, even when the length is not
/// a multiple of the block alignment.
#[must_use]
pub fn frame_pcm(pcm: &[u8], spec: PcmSpec) -> Vec<u8> {
    let header = WavHeader::for_pcm(spec, pcm.len());
    let mut buf = BytesMut::with_capacity(WAV_HEADER_LEN + pcm.len());
    header.write_to(&mut buf);
    buf.put_slice(pcm);
    buf.to_vec()
}

/// Convert PCM audio into WAV audio; WAV input is returned unchanged
#[must_use]
pub fn into_wav(audio: AudioData) -> AudioData {
    match audio.format() {
        AudioFormat::Wav => audio,
        AudioFormat::Pcm => {
            let spec = audio.spec();
            let container = frame_pcm(audio.data(), spec);
            AudioData::new(container, AudioFormat::Wav, spec)
        },
    }
}
