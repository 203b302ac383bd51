//! Precomputed per-engine tables (§3): the crossfade window, the analysis
//! window, and the analysis window's own autocorrelation.
//!
//! These depend on the runtime-selected `fftlen`/`frsize` (chosen from the
//! host sample rate, not fixed per build), so unlike the teacher's
//! `hann_window.rs` — which bakes a Hann window into a `const fn` because
//! its FFT size is a single compile-time constant — these are built with
//! ordinary `libm` calls at construction time, once per engine instance.

use libm::cosf;
use microfft::Complex32;

use crate::config::{MAX_FFTLEN, MAX_FRSIZE};
use crate::fft::FftEngine;

const TWO_PI: f32 = 2.0 * core::f32::consts::PI;

/// The three tables from §3, sized to the largest configuration
/// (`MAX_FFTLEN`/`MAX_FRSIZE`); only the first `fftlen`/`frsize` entries
/// of each are meaningful for a given engine instance.
pub struct Tables {
    /// Half raised-cosine crossfade ramp, `xffunc[0..frsize)`.
    pub xffunc: [f32; MAX_FRSIZE],
    /// Analysis window, `Twind[0..fftlen)`.
    pub twind: [f32; MAX_FFTLEN],
    /// Autocorrelation of the analysis window, normalized so `wcorr[0] == 1`.
    pub wcorr: [f32; MAX_FFTLEN],
}

impl Tables {
    /// Build all three tables for one `(fftlen, frsize)` pair, using `fft`
    /// (already sized to `fftlen`) to compute `Wcorr` as the windowed
    /// analysis window's own autocorrelation.
    pub fn new(fftlen: usize, frsize: usize, fft: &mut FftEngine) -> Self {
        let mut xffunc = [0.0f32; MAX_FRSIZE];
        for i in 0..frsize {
            xffunc[i] = 0.5 * (1.0 - cosf(core::f32::consts::PI * i as f32 / frsize as f32));
        }

        let mut twind = [0.0f32; MAX_FFTLEN];
        let scale = 2.0 / fftlen as f32;
        for i in 0..fftlen {
            twind[i] = scale * (1.0 - cosf(TWO_PI * i as f32 / fftlen as f32));
        }

        let wcorr = compute_wcorr(&twind, fftlen, fft);

        Self { xffunc, twind, wcorr }
    }
}

/// `Wcorr` is the autocorrelation of `Twind` with itself: forward-transform
/// the window, take its power spectrum (no rolloff, no Nyquist handling
/// beyond what [`FftEngine::inverse`] already does), inverse-transform,
/// and normalize so the zero-lag term is 1.
fn compute_wcorr(twind: &[f32; MAX_FFTLEN], fftlen: usize, fft: &mut FftEngine) -> [f32; MAX_FFTLEN] {
    let spectrum = fft.forward(&twind[..fftlen]);
    for bin in spectrum.iter_mut() {
        let power = bin.re * bin.re + bin.im * bin.im;
        *bin = Complex32::new(power, 0.0);
    }
    // copy out of the borrow before calling inverse, which reuses the same scratch
    let mut power_spectrum = [Complex32::new(0.0, 0.0); MAX_FFTLEN];
    power_spectrum[..fftlen / 2].copy_from_slice(spectrum);

    let autocorr = fft.inverse(&power_spectrum[..fftlen / 2]);

    let mut wcorr = [0.0f32; MAX_FFTLEN];
    let m = autocorr[0] + 1e-10;
    for i in 0..fftlen {
        wcorr[i] = autocorr[i] / m;
    }
    wcorr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xffunc_spans_zero_to_one() {
        let mut fft = FftEngine::new(2048);
        let tables = Tables::new(2048, 128, &mut fft);
        assert!((tables.xffunc[0]).abs() < 1e-6);
        assert!((tables.xffunc[127] - 1.0).abs() < 0.05);
    }

    #[test]
    fn twind_is_zero_at_both_ends() {
        let mut fft = FftEngine::new(2048);
        let tables = Tables::new(2048, 128, &mut fft);
        assert!(tables.twind[0].abs() < 1e-4);
    }

    #[test]
    fn wcorr_zero_lag_is_one() {
        let mut fft = FftEngine::new(2048);
        let tables = Tables::new(2048, 128, &mut fft);
        assert!((tables.wcorr[0] - 1.0).abs() < 1e-3);
    }
}
