/// Sound engine: procedural 8-bit style sound effects via rodio.
///
/// All sounds are generated as mono `f32` samples at init time and played
/// through rodio's `SamplesBuffer`. Playback is fire-and-forget
/// (non-blocking) via a detached Sink.
///
/// Compile with `--no-default-features` or without "sound" feature
/// to disable audio entirely (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tracing::debug;

    use super::{gen_bump, gen_jump, gen_land, SAMPLE_RATE};

    /// Pre-generated mono samples for each sound effect.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sfx_jump: Vec<f32>,
        sfx_land: Vec<f32>,
        sfx_bump: Vec<f32>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    debug!("no audio output: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                sfx_jump: gen_jump(),
                sfx_land: gen_land(),
                sfx_bump: gen_bump(),
            })
        }

        fn play(&self, samples: &[f32]) {
            if let Ok(sink) = Sink::try_new(&self.handle) {
                sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples.to_vec()));
                sink.detach(); // fire-and-forget
            }
        }

        pub fn play_jump(&self) { self.play(&self.sfx_jump); }
        pub fn play_land(&self) { self.play(&self.sfx_land); }
        pub fn play_bump(&self) { self.play(&self.sfx_bump); }
    }
}

// ════════════════════════════════════════════════════════════
//  Waveform generators: mono samples in [-1, 1] at SAMPLE_RATE
// ════════════════════════════════════════════════════════════

#[cfg_attr(not(feature = "sound"), allow(dead_code))]
const SAMPLE_RATE: u32 = 22050;

/// Rising sweep with a square-ish edge.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn gen_jump() -> Vec<f32> {
    let duration = 0.11;
    let n = (SAMPLE_RATE as f32 * duration) as usize;
    let mut phase = 0.0_f32;
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            let freq = 320.0 + t * 520.0; // 320Hz → 840Hz
            phase += freq / SAMPLE_RATE as f32;
            let wave = (phase * 2.0 * std::f32::consts::PI).sin() * 0.7
                + (phase * 3.0 * 2.0 * std::f32::consts::PI).sin() * 0.3;
            let env = (1.0 - t).powf(0.7);
            wave * env * 0.22
        })
        .collect()
}

/// Landing: low thud, short noise over a falling tone.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn gen_land() -> Vec<f32> {
    let duration = 0.07;
    let n = (SAMPLE_RATE as f32 * duration) as usize;
    let mut rng: u32 = 4242;
    (0..n)
        .map(|i| {
            let t = i as f32 / n as f32;
            let freq = 180.0 - t * 100.0;
            let ti = i as f32 / SAMPLE_RATE as f32;
            let tone = (ti * freq * 2.0 * std::f32::consts::PI).sin();
            // Simple LCG noise
            rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
            let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
            let env = (1.0 - t).powf(1.5);
            (tone * 0.7 + noise * 0.3) * env * 0.3
        })
        .collect()
}

/// Wall bump: two quick low clicks.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn gen_bump() -> Vec<f32> {
    let note_dur = 0.03;
    let mut samples = Vec::new();
    for &freq in &[140.0_f32, 110.0] {
        let n = (SAMPLE_RATE as f32 * note_dur) as usize;
        for i in 0..n {
            let t = i as f32 / SAMPLE_RATE as f32;
            let env = 1.0 - (i as f32 / n as f32);
            let square = if (t * freq).fract() < 0.5 { 1.0 } else { -1.0 };
            samples.push(square * env * 0.15);
        }
    }
    samples
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play_jump(&self) {}
    pub fn play_land(&self) {}
    pub fn play_bump(&self) {}
}
