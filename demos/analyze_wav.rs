//! Example: Analyze a WAV file and print the chord timeline
//!
//! Usage:
//!   cargo run --release --example analyze_wav -- [--json] [--pro] <file.wav>

use stratum_chords::{analyze_chords, AnalysisConfig, AudioInput, HarmonyMode};
use std::env;

/// Decode a WAV file into planar f32 channels
fn load_wav(path: &str) -> Result<AudioInput, Box<dyn std::error::Error>> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(AudioInput::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
    )?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut json = false;
    let mut config = AnalysisConfig::default();
    let mut path = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            "--pro" => config.harmony_mode = HarmonyMode::Pro,
            _ => path = Some(arg),
        }
    }
    let path = path.ok_or("usage: analyze_wav [--json] [--pro] <file.wav>")?;

    let input = load_wav(&path)?;
    let result = analyze_chords(&input, config)?;

    if json {
        println!("{}", result.to_json_pretty()?);
        return Ok(());
    }

    println!("Analysis Results for {}:", path);
    println!(
        "  Key: {} (confidence: {:.2})",
        result.key.key().name(),
        result.key.confidence
    );
    println!("  BPM: {:.1}", result.bpm);
    println!("  Duration: {:.2} s", result.duration);
    println!("  Processing time: {:.2} ms", result.metadata.processing_time_ms);
    for flag in &result.metadata.flags {
        println!("  Flag: {:?}", flag);
    }
    println!("  Chords:");
    for chord in &result.chords {
        println!("    {:>8.2}s  {}", chord.time, chord.label);
    }

    Ok(())
}
