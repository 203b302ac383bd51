//! Pitch estimator (§4.3): windowed FFT, attenuated power spectrum,
//! inverse FFT, normalized autocorrelation, sub-sample peak refinement.
//!
//! Run once every four fragments (one full analysis window) from
//! [`crate::reader::Reader`]'s fragment-boundary logic. Never allocates;
//! all scratch is owned by this struct and sized to the largest supported
//! configuration.

use libm::{fabsf, roundf};
use microfft::Complex32;

use crate::config::{RetuneConfig, MAX_FFTLEN};
use crate::fft::FftEngine;
use crate::ring_buffer::AnalysisRing;
use crate::tables::Tables;

const MAX_HALF_FFTLEN: usize = MAX_FFTLEN / 2;

/// Scratch owned by the pitch estimator: a windowed time-domain copy and
/// a standing copy of the post-rolloff power spectrum (needed for the
/// peak scan's spectral-support check, §4.3 step 8).
pub struct PitchEstimator {
    windowed: [f32; MAX_FFTLEN],
    power_spectrum: [Complex32; MAX_HALF_FFTLEN],
}

impl PitchEstimator {
    pub fn new() -> Self {
        Self { windowed: [0.0; MAX_FFTLEN], power_spectrum: [Complex32::new(0.0, 0.0); MAX_HALF_FFTLEN] }
    }

    /// Run the full estimator and return the period in internal samples,
    /// or `0.0` for "unvoiced" (silence, noise, or no convincing peak).
    pub fn estimate(
        &mut self,
        ring: &AnalysisRing,
        tables: &Tables,
        fft: &mut FftEngine,
        cfg: &RetuneConfig,
    ) -> f32 {
        let fftlen = cfg.fftlen;
        let half = fftlen / 2;
        let stride = cfg.stride();

        // Step 1: windowed copy, window ends at the most recent sample.
        for i in 0..fftlen {
            self.windowed[i] = ring.offset_from_write(i * stride) * tables.twind[i];
        }

        // Step 2: forward real FFT.
        {
            let spectrum = fft.forward(&self.windowed[..fftlen]);
            self.power_spectrum[..half].copy_from_slice(spectrum);
        }

        // Step 3: power spectrum with high-frequency rolloff; the Nyquist
        // term (folded into bin 0's imaginary part by microfft's packing,
        // see crate::fft) is implicitly zeroed because every bin here is
        // rewritten with a zero imaginary part, bin 0 included.
        for (i, bin) in self.power_spectrum[..half].iter_mut().enumerate() {
            let power = bin.re * bin.re + bin.im * bin.im;
            let rolloff = i as f32 * cfg.fsamp / (fftlen as f32 * 8_000.0);
            *bin = Complex32::new(power / (1.0 + rolloff * rolloff), 0.0);
        }

        // Step 4: inverse FFT gives the autocorrelation.
        let tdata = fft.inverse(&self.power_spectrum[..half]);

        // Step 5: normalize. The spec names [0, fftlen/2) as the range
        // strictly required for step 4's own consumers, but the peak scan
        // below (step 8) can touch indices up to `ifmax`, which for some
        // rate bands exceeds fftlen/2; Wcorr is defined over the full
        // fftlen, so normalizing the whole buffer keeps every index the
        // peak scan can reach consistent rather than leaving a silently
        // un-normalized tail.
        let m_raw = tdata[0] + 1e-10;
        for i in 0..fftlen {
            tdata[i] /= m_raw * tables.wcorr[i];
        }
        let m = m_raw / 3.0;

        // Step 6: silence gate.
        if m < 1e-5 {
            return 0.0;
        }

        // Step 7: zero-crossing check.
        let ifmax_half = (cfg.ifmax / 2.0) as usize;
        let ifmin_half = (cfg.ifmin / 2.0) as usize;
        let mut i = 0usize;
        while i < ifmax_half && tdata[i] > 0.0 {
            i += 1;
        }
        if i <= ifmin_half {
            return 0.0;
        }
        let first_crossing = i;

        // Step 8: peak scan with sub-sample refinement.
        let ifmax = cfg.ifmax as usize;
        let radius = ((cfg.ifmin / 4.0) as usize).max(1);

        let mut best_period = 0.0f32;
        // Seeds at the minimum-acceptable autocorrelation and is *raised* to
        // each accepted peak's refined value, so a later local max must beat
        // the current best to be adopted, not just clear a fixed floor.
        let mut best_value = 0.3f32;
        let mut best_power: Option<f32> = None;

        let scan_end = ifmax.min(fftlen - radius - 1);
        for i in (first_crossing + 1).max(radius + 1)..scan_end {
            if !(tdata[i - 1] < tdata[i] && tdata[i] > tdata[i + 1] && tdata[i] > best_value) {
                continue;
            }

            let mut sy = 0.0f32;
            let mut sx2 = 0.0f32;
            let mut sxy = 0.0f32;
            let n = 2 * radius;
            for k in 0..n {
                let kk = k as i32 - radius as i32;
                let x = kk as f32 + 0.5;
                let y = tdata[(i as i32 + kk) as usize] - tdata[(i as i32 + kk + 1) as usize];
                sy += y;
                sx2 += x * x;
                sxy += x * y;
            }
            if fabsf(sxy) < 1e-12 {
                continue;
            }
            let di = -0.5 * (sy * sx2) / (radius as f32 * sxy);
            if fabsf(di) > cfg.ifmin / 4.0 {
                continue;
            }

            let i1 = i as f32 + di;
            let y1 = tdata[roundf(i1) as usize];

            let bin = roundf(fftlen as f32 / i1) as usize;
            if bin >= half {
                continue;
            }
            let a1 = self.power_spectrum[bin].re / m;

            if a1 < 1e-4 {
                continue;
            }
            if let Some(am) = best_power {
                if a1 / am < 1e-2 {
                    continue;
                }
            }

            best_period = i1;
            best_value = y1;
            best_power = Some(a1);
        }

        // Step 9: final gate.
        if best_value < 0.6 {
            0.0
        } else {
            best_period
        }
    }
}

impl Default for PitchEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::Tables;

    fn make(fsamp: f32) -> (RetuneConfig, FftEngine, Tables, AnalysisRing, PitchEstimator) {
        let cfg = RetuneConfig::new(fsamp).unwrap();
        let mut fft = FftEngine::new(cfg.fftlen);
        let tables = Tables::new(cfg.fftlen, cfg.frsize, &mut fft);
        let ring = AnalysisRing::new(cfg.ipsize);
        let pitch = PitchEstimator::new();
        (cfg, fft, tables, ring, pitch)
    }

    #[test]
    fn silence_is_unvoiced() {
        let (cfg, mut fft, tables, ring, mut pitch) = make(48_000.0);
        let period = pitch.estimate(&ring, &tables, &mut fft, &cfg);
        assert_eq!(period, 0.0);
    }

    #[test]
    fn a4_sine_estimates_plausible_period() {
        let (cfg, mut fft, tables, mut ring, mut pitch) = make(48_000.0);
        let freq = 440.0f32;
        let mut phase = 0.0f32;
        let step = core::f32::consts::TAU * freq / cfg.firate;
        let mut block = [0.0f32; 8192];
        for s in block.iter_mut() {
            *s = libm::sinf(phase);
            phase += step;
        }
        ring.write(&block[..cfg.ipsize]);

        let period = pitch.estimate(&ring, &tables, &mut fft, &cfg);
        assert!(period > 0.0, "expected a voiced estimate for a clean A4 sine");
        let estimated_freq = cfg.firate / period;
        assert!((estimated_freq - freq).abs() < 5.0, "estimated {estimated_freq} Hz, expected near {freq} Hz");
    }
}
