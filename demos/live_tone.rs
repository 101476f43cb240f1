//! Simulated capture loop: a gliding harmonic tone is fed to the analyzer one
//! block per tick, and the display window follows the tracked pitch.
//!
//! Usage: cargo run --example live_tone

use std::f64::consts::PI;

use pitchscope::{nearest_note, Analyzer, FftSize, FrequencyRange, FrequencyScale, Result, Settings};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: f64 = 48000.0;
const TICKS: usize = 120;

/// Harmonic tone whose pitch glides from `from` to `to` Hz over `TICKS`.
struct Glide {
    from: f64,
    to: f64,
    phase: f64,
}

impl Glide {
    fn block(&mut self, tick: usize, n: usize) -> Vec<f32> {
        let progress = tick as f64 / TICKS as f64;
        let f0 = self.from * (self.to / self.from).powf(progress);
        let step = 2.0 * PI * f0 / SAMPLE_RATE;

        (0..n)
            .map(|_| {
                let s: f64 = (1..=5)
                    .map(|h| 0.7f64.powi(h - 1) * (h as f64 * self.phase).sin())
                    .sum();
                self.phase = (self.phase + step) % (2.0 * PI);
                (0.05 * s) as f32
            })
            .collect()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings {
        fft_size: FftSize::Fft4096,
        emphasis_db_per_octave: 3.0,
        ..Settings::default()
    };
    let mut analyzer = Analyzer::new(settings)?;
    let mut view = FrequencyRange::new(80.0, 170.0);
    let mut tone = Glide {
        from: 150.0,
        to: 450.0,
        phase: 0.0,
    };

    for tick in 0..TICKS {
        let block = tone.block(tick, analyzer.fft_size());
        let result = analyzer.process(&block, SAMPLE_RATE)?;
        let tracked = result.tracked_pitch;

        if let Some(next) = analyzer.follow(view) {
            view = next;
        }

        if tick % 10 == 0 {
            // Where the pitch line sits on a log axis, 0 at the bottom
            let position = tracked.map(|f| FrequencyScale::Log.position(f, view));
            info!(
                tick,
                tracked = ?tracked,
                position = ?position,
                note = %tracked.and_then(nearest_note).map(|n| n.to_string()).unwrap_or_default(),
                lower = view.lower_hz,
                upper = view.upper_hz,
                "tick"
            );
        }
    }

    Ok(())
}
