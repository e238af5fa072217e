use std::{fs, path::Path};

use anyhow::{Context, Result};
use framekit_core::{
    audio::{read_wav, save_audio},
    AudioClip,
    AudioInput,
    WavEncoding,
};
use tracing::debug;

/// Decode `input` and write it under the next free `{prefix}_NNNNN.wav` name
/// in `output`.
///
/// `.wav` inputs are re-encoded; anything else is read as serialized audio.
pub fn save_audio_handler(
    input: &Path,
    output: &Path,
    prefix: &str,
    encoding: WavEncoding,
) -> Result<()> {
    let clip = load_clip(input)?;
    debug!(
        "Loaded {} channels, {:.2}s at {} Hz",
        clip.channels().len(),
        clip.duration_secs(),
        clip.sample_rate()
    );
    let path = save_audio(&clip, output, prefix, encoding)?;
    println!("{}", path.display());

    Ok(())
}

fn load_clip(input: &Path) -> Result<AudioClip> {
    let is_wav = input
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        return Ok(read_wav(input)?);
    }
    let json = fs::read_to_string(input)
        .with_context(|| format!("failed to read audio input {}", input.display()))?;
    Ok(AudioInput::from_json(&json)?.decode()?)
}
