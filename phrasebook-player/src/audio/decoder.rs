//! Audio decoding using symphonia
//!
//! Decodes a whole pronunciation clip into interleaved stereo f32.
//! Mono files are duplicated to stereo; multi-channel files are downmixed.

use crate::error::{Error, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// A fully decoded clip
#[derive(Debug, Clone)]
pub struct ClipPcm {
    /// Interleaved stereo f32 samples [L, R, L, R, ...]
    pub samples: Vec<f32>,

    /// Native sample rate of the decoded audio
    pub sample_rate: u32,
}

impl ClipPcm {
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration_ms(&self) -> u64 {
        (self.frames() as u64 * 1000) / self.sample_rate as u64
    }
}

/// Decode an entire audio file into stereo f32 PCM.
pub fn decode_clip(path: &Path) -> Result<ClipPcm> {
    let file = File::open(path)
        .map_err(|e| Error::Decode(format!("cannot open {}: {}", path.display(), e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Hint the probe with the file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode(format!("unrecognized format {}: {}", path.display(), e)))?;
    let mut format = probed.format;

    let track = format.default_track().ok_or_else(|| {
        Error::Decode(format!("no audio track in {}", path.display()))
    })?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params.sample_rate.unwrap_or(44_100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("unsupported codec {}: {}", path.display(), e)))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // EOF
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(Error::Decode(format!("{}: {}", path.display(), e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Corrupt packet: skip and keep going
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => {
                return Err(Error::Decode(format!("{}: {}", path.display(), e)));
            }
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();

        // Clips are a few seconds at most; a buffer per packet is fine.
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        match channels {
            1 => {
                for &sample in buf.samples() {
                    samples.push(sample);
                    samples.push(sample);
                }
            }
            2 => samples.extend_from_slice(buf.samples()),
            n => {
                // Simple downmix: average even channels left, odd right
                for frame in buf.samples().chunks_exact(n) {
                    let mut left = 0.0f32;
                    let mut right = 0.0f32;
                    for (idx, &sample) in frame.iter().enumerate() {
                        if idx % 2 == 0 {
                            left += sample;
                        } else {
                            right += sample;
                        }
                    }
                    let half = n as f32 / 2.0;
                    samples.push(left / half);
                    samples.push(right / half);
                }
            }
        }
    }

    if samples.is_empty() {
        return Err(Error::Decode(format!(
            "no audio frames in {}",
            path.display()
        )));
    }

    Ok(ClipPcm {
        samples,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_test_wav(path: &Path, channels: u16, sample_rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let value = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.4 * i16::MAX as f32)
                as i16;
            for _ in 0..channels {
                writer.write_sample(value).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_nonexistent_file() {
        let result = decode_clip(Path::new("/nonexistent/clip.mp3"));
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_mono_wav_duplicates_to_stereo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        write_test_wav(&path, 1, 22_050, 2_205);

        let pcm = decode_clip(&path).unwrap();
        assert_eq!(pcm.sample_rate, 22_050);
        assert_eq!(pcm.frames(), 2_205);
        assert_eq!(pcm.duration_ms(), 100);

        // Left and right are identical for a mono source
        assert_eq!(pcm.samples[0], pcm.samples[1]);
        assert_eq!(pcm.samples[100], pcm.samples[101]);
    }

    #[test]
    fn test_decode_stereo_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_test_wav(&path, 2, 44_100, 4_410);

        let pcm = decode_clip(&path).unwrap();
        assert_eq!(pcm.sample_rate, 44_100);
        assert_eq!(pcm.frames(), 4_410);
        assert_eq!(pcm.duration_ms(), 100);
    }

    #[test]
    fn test_decode_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"this is not audio").unwrap();

        let result = decode_clip(&path);
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
