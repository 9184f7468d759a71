use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const FREQ_HZ: f32 = 880.0;
const LENGTH_SECS: f32 = 0.6;

/// Short completion chime: a single tone with an exponential decay envelope.
pub struct Chime {
    num_sample: usize,
}

impl Chime {
    pub fn new() -> Self {
        Self { num_sample: 0 }
    }
}

impl Default for Chime {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Chime {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        if t >= LENGTH_SECS {
            return None;
        }
        self.num_sample += 1;

        let envelope = (-6.0 * t).exp();
        let sample = (2.0 * PI * FREQ_HZ * t).sin();

        Some(sample * envelope * 0.25) // Lower amplitude to prevent clipping
    }
}

impl Source for Chime {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(LENGTH_SECS))
    }
}
