//! Analyse a WAV file frame by frame and print pitch, peaks and formants.
//!
//! Usage: cargo run --example analyze_wav -- <file.wav> [channel] [hop]
//!
//! Set `RUST_LOG=pitchscope=debug` to see numerical issues as they happen.

use std::env;
use std::process::ExitCode;

use pitchscope::{nearest_note, Error, Settings, Sound};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        eprintln!("usage: {} <file.wav> [channel] [hop]", args[0]);
        return ExitCode::FAILURE;
    };
    let channel: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0);
    let hop: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1024);

    let sound = match Sound::from_file(path) {
        Ok(s) => s,
        Err(Error::NotMono(ch)) => {
            println!("{} channels, using channel {}", ch, channel);
            match Sound::from_file_channel(path, channel) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("{}", sound);

    let results = match sound.analyze(Settings::default(), hop) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("analysis failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "{:>8} {:>9} {:>6} {:>9} {:>5}  {:<24} {}",
        "time", "f0", "conf", "tracked", "note", "peaks", "formants"
    );
    for result in &results {
        let time = result.ordinal as f64 * hop as f64 / sound.sample_rate();
        let tracked = result
            .tracked_pitch
            .map(|f| format!("{:.1}", f))
            .unwrap_or_else(|| "-".into());
        let note = result
            .tracked_pitch
            .and_then(nearest_note)
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".into());
        let peaks: Vec<String> = result
            .peaks
            .iter()
            .map(|p| format!("{:.0}", p.frequency_hz))
            .collect();
        let formants: Vec<String> = result
            .formants
            .iter()
            .map(|f| format!("{:.0}/{:.0}", f.frequency_hz, f.bandwidth_hz))
            .collect();

        println!(
            "{:>8.3} {:>9.1} {:>6.2} {:>9} {:>5}  {:<24} {}",
            time,
            result.fundamental.frequency_hz,
            result.fundamental.confidence,
            tracked,
            note,
            peaks.join(" "),
            formants.join(" ")
        );
    }

    let issues: usize = results.iter().map(|r| r.issues.len()).sum();
    println!("{} frames, {} numerical issues", results.len(), issues);
    ExitCode::SUCCESS
}
