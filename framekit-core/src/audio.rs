//! WAV export of audio clips.
//!
//! Audio arrives in one of the shapes of [`AudioInput`]. Every shape decodes
//! into an [`AudioClip`] whose samples are floats clamped to `[-1, 1]`, and
//! the clip is quantized only when it is written.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_PREFIX: &str = "framekit";
const WAV_EXTENSION: &str = "wav";
const PCM_24_MAX: f64 = 8_388_607.0;

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum WavEncoding {
    #[default]
    #[serde(rename = "PCM_16")]
    #[strum(to_string = "PCM_16")]
    Pcm16,
    #[serde(rename = "PCM_24")]
    #[strum(to_string = "PCM_24")]
    Pcm24,
    #[serde(rename = "PCM_32")]
    #[strum(to_string = "PCM_32")]
    Pcm32,
    #[serde(rename = "FLOAT_32")]
    #[strum(to_string = "FLOAT_32")]
    Float32,
}

impl WavEncoding {
    #[inline]
    pub fn bits_per_sample(self) -> u16 {
        match self {
            WavEncoding::Pcm16 => 16,
            WavEncoding::Pcm24 => 24,
            WavEncoding::Pcm32 | WavEncoding::Float32 => 32,
        }
    }

    #[inline]
    pub fn sample_format(self) -> SampleFormat {
        match self {
            WavEncoding::Float32 => SampleFormat::Float,
            _ => SampleFormat::Int,
        }
    }

    fn spec(self, channels: u16, sample_rate: u32) -> WavSpec {
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: self.bits_per_sample(),
            sample_format: self.sample_format(),
        }
    }
}

/// Channel-major samples tagged with their storage type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "dtype", content = "data", rename_all = "lowercase")]
pub enum Waveform {
    Float(Vec<Vec<f64>>),
    Int16(Vec<Vec<i16>>),
    Int32(Vec<Vec<i32>>),
    Uint8(Vec<Vec<u8>>),
}

impl Waveform {
    /// Convert to floats. Signed integers are divided by the magnitude of
    /// their minimum; unsigned ones are mapped from `[0, max]` onto `[-1, 1]`.
    #[inline]
    pub fn normalized(self) -> Vec<Vec<f64>> {
        fn scale<T: Copy>(channels: Vec<Vec<T>>, map: impl Fn(T) -> f64) -> Vec<Vec<f64>> {
            channels
                .into_iter()
                .map(|channel| channel.into_iter().map(&map).collect())
                .collect()
        }

        match self {
            Waveform::Float(channels) => channels,
            Waveform::Int16(channels) => scale(channels, |v| f64::from(v) / 32_768.0),
            Waveform::Int32(channels) => scale(channels, |v| f64::from(v) / 2_147_483_648.0),
            Waveform::Uint8(channels) => {
                scale(channels, |v| f64::from(v) / f64::from(u8::MAX) * 2.0 - 1.0)
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFields {
    pub waveform:    Waveform,
    pub sample_rate: u32,
}

/// The accepted shapes of serialized audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AudioInput {
    /// `[waveform, sample_rate]`
    Pair(Waveform, u32),
    /// `{"audio": {"waveform": ..., "sample_rate": ...}}`
    Wrapped { audio: AudioFields },
    /// `{"waveform": ..., "sample_rate": ...}`
    Plain(AudioFields),
}

impl AudioInput {
    #[inline]
    pub fn from_json(json: &str) -> Result<Self, AudioError> {
        Ok(serde_json::from_str(json)?)
    }

    #[inline]
    pub fn decode(self) -> Result<AudioClip, AudioError> {
        match self {
            AudioInput::Pair(waveform, sample_rate) => decode_pair(waveform, sample_rate),
            AudioInput::Wrapped {
                audio,
            } => decode_wrapped(audio),
            AudioInput::Plain(fields) => decode_plain(fields),
        }
    }
}

fn decode_pair(waveform: Waveform, sample_rate: u32) -> Result<AudioClip, AudioError> {
    AudioClip::new(waveform.normalized(), sample_rate)
}

fn decode_plain(fields: AudioFields) -> Result<AudioClip, AudioError> {
    decode_pair(fields.waveform, fields.sample_rate)
}

fn decode_wrapped(audio: AudioFields) -> Result<AudioClip, AudioError> {
    debug!("Unwrapping nested audio input");
    decode_plain(audio)
}

/// Float channels of equal length, every sample in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    channels:    Vec<Vec<f64>>,
    sample_rate: u32,
}

impl AudioClip {
    /// Validate the layout and clamp every sample. NaN becomes silence.
    #[inline]
    pub fn new(mut channels: Vec<Vec<f64>>, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(sample_rate));
        }
        let Some(expected) = channels.first().map(Vec::len) else {
            return Err(AudioError::NoChannels);
        };
        if u16::try_from(channels.len()).is_err() {
            return Err(AudioError::TooManyChannels(channels.len()));
        }
        if let Some((channel, samples)) =
            channels.iter().enumerate().find(|(_, samples)| samples.len() != expected)
        {
            return Err(AudioError::RaggedChannels {
                channel,
                len: samples.len(),
                expected,
            });
        }

        for sample in channels.iter_mut().flatten() {
            *sample = if sample.is_nan() {
                0.0
            } else {
                sample.clamp(-1.0, 1.0)
            };
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    #[inline]
    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples per channel.
    #[inline]
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    fn interleaved(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.frames()).flat_map(move |frame| self.channels.iter().map(move |c| c[frame]))
    }
}

/// Write `clip` to `path` as a WAV file.
#[inline]
pub fn write_wav(clip: &AudioClip, path: &Path, encoding: WavEncoding) -> Result<(), AudioError> {
    let channels = u16::try_from(clip.channels.len())
        .map_err(|_| AudioError::TooManyChannels(clip.channels.len()))?;
    let wav_error = |source| AudioError::Wav {
        path: path.to_path_buf(),
        source,
    };
    let mut writer =
        WavWriter::create(path, encoding.spec(channels, clip.sample_rate)).map_err(wav_error)?;

    for sample in clip.interleaved() {
        let written = match encoding {
            WavEncoding::Pcm16 => writer.write_sample(quantize(sample, f64::from(i16::MAX)) as i16),
            WavEncoding::Pcm24 => writer.write_sample(quantize(sample, PCM_24_MAX) as i32),
            WavEncoding::Pcm32 => writer.write_sample(quantize(sample, f64::from(i32::MAX)) as i32),
            WavEncoding::Float32 => writer.write_sample(sample as f32),
        };
        written.map_err(wav_error)?;
    }
    writer.finalize().map_err(wav_error)
}

fn quantize(sample: f64, max: f64) -> f64 {
    (sample * max).round()
}

/// Read a WAV file, normalizing integer samples by their bit depth.
#[inline]
pub fn read_wav(path: &Path) -> Result<AudioClip, AudioError> {
    let wav_error = |source| AudioError::Wav {
        path: path.to_path_buf(),
        source,
    };
    let reader = WavReader::open(path).map_err(wav_error)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels);
    if channels == 0 {
        return Err(AudioError::NoChannels);
    }

    let samples: Vec<f64> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|sample| sample.map(f64::from))
            .collect::<Result<_, _>>()
            .map_err(wav_error)?,
        SampleFormat::Int => {
            let full_scale = 2f64.powi(i32::from(spec.bits_per_sample) - 1);
            reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|value| f64::from(value) / full_scale))
                .collect::<Result<_, _>>()
                .map_err(wav_error)?
        },
    };

    let mut split = vec![Vec::with_capacity(samples.len() / channels); channels];
    for (index, sample) in samples.into_iter().enumerate() {
        split[index % channels].push(sample);
    }
    AudioClip::new(split, spec.sample_rate)
}

/// `{prefix}_{counter:05}.wav` inside `directory`, one past the highest
/// counter already there.
#[inline]
pub fn next_output_path(directory: &Path, prefix: &str) -> Result<PathBuf, AudioError> {
    let io_error = |source| AudioError::Io {
        path: directory.to_path_buf(),
        source,
    };
    let mut last = 0;
    if directory.is_dir() {
        for entry in fs::read_dir(directory).map_err(io_error)? {
            let path = entry.map_err(io_error)?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(WAV_EXTENSION) {
                continue;
            }
            let counter = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.strip_prefix(prefix))
                .and_then(|rest| rest.strip_prefix('_'))
                .and_then(|digits| digits.parse::<u32>().ok());
            if let Some(counter) = counter {
                last = last.max(counter);
            }
        }
    }
    Ok(directory.join(format!("{prefix}_{:05}.{WAV_EXTENSION}", last + 1)))
}

/// Write `clip` under the next free name in `directory`.
#[inline]
pub fn save_audio(
    clip: &AudioClip,
    directory: &Path,
    prefix: &str,
    encoding: WavEncoding,
) -> Result<PathBuf, AudioError> {
    fs::create_dir_all(directory).map_err(|source| AudioError::Io {
        path: directory.to_path_buf(),
        source,
    })?;
    let path = next_output_path(directory, prefix)?;
    debug!(
        "Writing {} channels, {} samples at {} Hz as {}",
        clip.channels.len(),
        clip.frames(),
        clip.sample_rate,
        encoding
    );
    write_wav(clip, &path, encoding)?;
    info!("Saved audio to {}", path.display());
    Ok(path)
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio has no channels")]
    NoChannels,
    #[error("Channel {channel} has {len} samples, expected {expected}")]
    RaggedChannels {
        channel:  usize,
        len:      usize,
        expected: usize,
    },
    #[error("{0} channels do not fit in a WAV header")]
    TooManyChannels(usize),
    #[error("Invalid sample rate {0}")]
    InvalidSampleRate(u32),
    #[error("Could not parse audio input: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("WAV error for {}: {source}", .path.display())]
    Wav {
        path:   PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("Could not access {}: {source}", .path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn stereo_ramp() -> AudioClip {
        AudioClip::new(vec![vec![-1.0, -0.5, 0.0, 0.5, 1.0], vec![0.25; 5]], 8_000).unwrap()
    }

    #[test]
    fn every_input_shape_decodes_to_the_same_clip() {
        let waveform = r#"{"dtype": "float", "data": [[0.5, -0.5], [0.0, 1.0]]}"#;
        let pair = format!("[{waveform}, 44100]");
        let plain = format!(r#"{{"waveform": {waveform}, "sample_rate": 44100}}"#);
        let wrapped = format!(r#"{{"audio": {plain}}}"#);

        let inputs = [pair, plain, wrapped].map(|json| AudioInput::from_json(&json).unwrap());
        assert!(matches!(inputs[0], AudioInput::Pair(..)));
        assert!(matches!(inputs[1], AudioInput::Plain(_)));
        assert!(matches!(inputs[2], AudioInput::Wrapped { .. }));

        let clips: Vec<AudioClip> = inputs.into_iter().map(|i| i.decode().unwrap()).collect();
        assert_eq!(clips[0].sample_rate(), 44_100);
        assert_eq!(clips[0].channels(), &[vec![0.5, -0.5], vec![0.0, 1.0]]);
        assert_eq!(clips[0], clips[1]);
        assert_eq!(clips[1], clips[2]);
    }

    #[test]
    fn integer_samples_are_normalized() {
        let int16 = Waveform::Int16(vec![vec![i16::MIN, 0, 16_384]]).normalized();
        assert_eq!(int16, vec![vec![-1.0, 0.0, 0.5]]);

        let uint8 = Waveform::Uint8(vec![vec![0, 255]]).normalized();
        assert_eq!(uint8, vec![vec![-1.0, 1.0]]);

        let int32 = Waveform::Int32(vec![vec![i32::MIN]]).normalized();
        assert_eq!(int32, vec![vec![-1.0]]);
    }

    #[test]
    fn samples_are_clamped() {
        let clip = AudioClip::new(vec![vec![1.5, -2.0, 0.25, f64::NAN]], 16_000).unwrap();
        assert_eq!(clip.channels()[0], vec![1.0, -1.0, 0.25, 0.0]);
        assert_eq!(clip.frames(), 4);
        assert!((clip.duration_secs() - 0.00025).abs() < 1e-12);
    }

    #[test]
    fn bad_layouts_are_rejected() {
        assert!(matches!(AudioClip::new(Vec::new(), 8_000), Err(AudioError::NoChannels)));
        assert!(matches!(
            AudioClip::new(vec![vec![0.0]], 0),
            Err(AudioError::InvalidSampleRate(0))
        ));
        assert!(matches!(
            AudioClip::new(vec![vec![0.0, 0.0], vec![0.0]], 8_000),
            Err(AudioError::RaggedChannels {
                channel:  1,
                len:      1,
                expected: 2,
            })
        ));
        assert!(matches!(
            AudioInput::from_json(r#"{"waveform": [1, 2]}"#),
            Err(AudioError::Parse(_))
        ));
    }

    #[test]
    fn encoding_names_parse_case_insensitively() {
        assert_eq!(WavEncoding::from_str("pcm_24").unwrap(), WavEncoding::Pcm24);
        assert_eq!(WavEncoding::Float32.to_string(), "FLOAT_32");
        assert_eq!(serde_json::to_string(&WavEncoding::Pcm16).unwrap(), "\"PCM_16\"");
        assert!(WavEncoding::from_str("FLOAT_64").is_err());
    }

    #[test]
    fn pcm_16_keeps_samples_within_one_step() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.wav");
        let clip = stereo_ramp();
        write_wav(&clip, &path, WavEncoding::Pcm16).unwrap();

        let spec = WavReader::open(&path).unwrap().spec();
        assert_eq!((spec.channels, spec.bits_per_sample), (2, 16));
        assert_eq!(spec.sample_format, SampleFormat::Int);

        let read = read_wav(&path).unwrap();
        assert_eq!(read.sample_rate(), 8_000);
        assert_eq!(read.frames(), 5);
        for (written, read) in clip.interleaved().zip(read.interleaved()) {
            assert!((written - read).abs() <= 1.0 / 32_767.0, "{written} vs {read}");
        }
    }

    #[test]
    fn pcm_24_and_float_headers() {
        let dir = tempfile::tempdir().unwrap();
        let clip = stereo_ramp();

        let pcm24 = dir.path().join("pcm24.wav");
        write_wav(&clip, &pcm24, WavEncoding::Pcm24).unwrap();
        let spec = WavReader::open(&pcm24).unwrap().spec();
        assert_eq!(spec.bits_per_sample, 24);
        let max = WavReader::open(&pcm24)
            .unwrap()
            .into_samples::<i32>()
            .map(Result::unwrap)
            .max();
        assert_eq!(max, Some(8_388_607));

        let float = dir.path().join("float.wav");
        write_wav(&clip, &float, WavEncoding::Float32).unwrap();
        let spec = WavReader::open(&float).unwrap().spec();
        assert_eq!((spec.bits_per_sample, spec.sample_format), (32, SampleFormat::Float));
        assert_eq!(read_wav(&float).unwrap(), clip);
    }

    #[test]
    fn output_names_count_up_from_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            next_output_path(&dir.path().join("missing"), "take").unwrap(),
            dir.path().join("missing/take_00001.wav")
        );

        for name in ["take_00001.wav", "take_00003.wav", "other_00009.wav", "take_00007.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        assert_eq!(
            next_output_path(dir.path(), "take").unwrap(),
            dir.path().join("take_00004.wav")
        );

        let saved = save_audio(&stereo_ramp(), dir.path(), "take", WavEncoding::Pcm32).unwrap();
        assert_eq!(saved, dir.path().join("take_00004.wav"));
        assert_eq!(WavReader::open(&saved).unwrap().spec().bits_per_sample, 32);
    }
}
