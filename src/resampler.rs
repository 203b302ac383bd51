//! Fixed 1:2 polyphase resampler adapter (§4.1), used only when the host
//! rate is below 64 kHz.
//!
//! Built as a small windowed-sinc polyphase FIR rather than wired through a
//! general block-oriented resampling crate: the "pre-primed, zero reported
//! group delay" contract only has to hold for one fixed ratio, and is
//! simplest to get right and verify directly at that ratio. The windowed-
//! sinc-with-Blackman-window design and polyphase decomposition follow the
//! same construction a rational P/Q resampler would use for P=2, Q=1.

use libm::{cosf, sinf};

const TAPS: usize = 81;
const PHASE_TAPS: usize = TAPS.div_ceil(2);

/// Converts one input sample at the host rate into two samples at 2x the
/// host rate, via a fixed windowed-sinc lowpass decomposed into even/odd
/// polyphase branches.
pub struct Upsampler2x {
    phase0: [f32; PHASE_TAPS],
    phase1: [f32; PHASE_TAPS],
    history: [f32; PHASE_TAPS],
}

impl Upsampler2x {
    /// Builds the filter and primes its delay line with `filtlen - 1`
    /// zero-input steps, so the first real sample pushed through already
    /// sees a full history and the resampler's own group delay is fully
    /// absorbed before the engine starts reading from it.
    pub fn new() -> Self {
        let prototype = design_lowpass_blackman(TAPS, 0.45);

        let mut phase0 = [0.0f32; PHASE_TAPS];
        let mut phase1 = [0.0f32; PHASE_TAPS];
        for (tap_idx, &coeff) in prototype.iter().enumerate() {
            let i = tap_idx / 2;
            if tap_idx % 2 == 0 {
                phase0[i] = coeff;
            } else {
                phase1[i] = coeff;
            }
        }

        let mut resampler = Self { phase0, phase1, history: [0.0; PHASE_TAPS] };
        resampler.prime();
        resampler
    }

    fn prime(&mut self) {
        for _ in 0..(PHASE_TAPS - 1) {
            self.push(0.0);
        }
    }

    #[inline]
    fn push(&mut self, x: f32) {
        for i in (1..PHASE_TAPS).rev() {
            self.history[i] = self.history[i - 1];
        }
        self.history[0] = x;
    }

    /// Push one host-rate sample, return the two internal-rate samples it
    /// produces (scaled by 2 to restore unity DC gain after zero-stuffing).
    pub fn process(&mut self, x: f32) -> [f32; 2] {
        self.push(x);

        let mut y0 = 0.0f32;
        let mut y1 = 0.0f32;
        for i in 0..PHASE_TAPS {
            y0 += self.phase0[i] * self.history[i];
            y1 += self.phase1[i] * self.history[i];
        }
        [y0 * 2.0, y1 * 2.0]
    }
}

impl Default for Upsampler2x {
    fn default() -> Self {
        Self::new()
    }
}

/// Windowed-sinc lowpass FIR, Blackman window, normalized to unity DC gain.
/// `cutoff` is normalized to the *upsampled* Nyquist (1.0 == new Nyquist).
fn design_lowpass_blackman(num_taps: usize, cutoff: f32) -> [f32; TAPS] {
    let m = (num_taps - 1) as f32;
    let mut coeffs = [0.0f32; TAPS];

    for n in 0..num_taps {
        let x = n as f32 - m / 2.0;
        let sinc = if libm::fabsf(x) < 1e-7 {
            cutoff
        } else {
            sinf(core::f32::consts::PI * cutoff * x) / (core::f32::consts::PI * x)
        };

        let phase = 2.0 * core::f32::consts::PI * n as f32 / m;
        let window = 0.42 - 0.5 * cosf(phase) + 0.08 * cosf(2.0 * phase);

        coeffs[n] = sinc * window;
    }

    let sum: f32 = coeffs.iter().sum();
    if libm::fabsf(sum) > 1e-10 {
        for c in coeffs.iter_mut() {
            *c /= sum;
        }
    }
    coeffs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dc_input_converges_to_dc_output() {
        let mut up = Upsampler2x::new();
        let mut last = [0.0, 0.0];
        for _ in 0..200 {
            last = up.process(1.0);
        }
        assert!((last[0] - 1.0).abs() < 0.05, "phase0 settled at {}", last[0]);
        assert!((last[1] - 1.0).abs() < 0.05, "phase1 settled at {}", last[1]);
    }

    #[test]
    fn priming_leaves_silence_silent() {
        let mut up = Upsampler2x::new();
        let out = up.process(0.0);
        assert_eq!(out, [0.0, 0.0]);
    }
}
