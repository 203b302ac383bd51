//! Fixed-size real FFT backend, dispatched at construction over the three
//! `fftlen` values the rate table in [`crate::config`] can select.
//!
//! `microfft` only exposes real transforms over const-generic array sizes,
//! so there is no single function that takes a runtime length. Rather than
//! generating one function per size with a macro (the teacher's
//! `fft_config.rs` does this for a fixed menu of sizes), this wraps the
//! three concrete calls behind a small runtime `match` on the configured
//! size, so the rest of the crate can treat `fftlen` as a runtime value.

use microfft::Complex32;

use crate::config::MAX_FFTLEN;

/// Forward/inverse real FFT plan for one of the three supported lengths.
///
/// All scratch is a fixed-size array sized to `MAX_FFTLEN`; only the first
/// `fftlen` (or `fftlen/2`, for the half-spectrum) entries are live. No
/// allocation occurs after construction.
pub struct FftEngine {
    fftlen: usize,
    time_scratch: [f32; MAX_FFTLEN],
    full_spectrum: [Complex32; MAX_FFTLEN],
}

impl FftEngine {
    /// `fftlen` must be one of 2048, 4096, or 8192 (the values
    /// [`crate::config::RetuneConfig`] ever selects).
    pub fn new(fftlen: usize) -> Self {
        debug_assert!(matches!(fftlen, 2048 | 4096 | 8192));
        Self {
            fftlen,
            time_scratch: [0.0; MAX_FFTLEN],
            full_spectrum: [Complex32::new(0.0, 0.0); MAX_FFTLEN],
        }
    }

    pub fn fftlen(&self) -> usize {
        self.fftlen
    }

    /// Half-spectrum length (`fftlen / 2`), the number of live complex
    /// bins a forward transform produces.
    pub fn half_len(&self) -> usize {
        self.fftlen / 2
    }

    /// Real-to-complex forward transform (§4.3 step 2).
    ///
    /// `windowed` must hold at least `fftlen` samples. Returns the live
    /// half-spectrum, `fftlen/2` bins, with the Nyquist magnitude folded
    /// into the imaginary part of bin 0 (microfft's packing convention).
    pub fn forward(&mut self, windowed: &[f32]) -> &mut [Complex32] {
        let n = self.fftlen;
        self.time_scratch[..n].copy_from_slice(&windowed[..n]);

        let half = match n {
            2048 => {
                let buf: &mut [f32; 2048] = (&mut self.time_scratch[..2048]).try_into().unwrap();
                microfft::real::rfft_2048(buf).as_slice()
            }
            4096 => {
                let buf: &mut [f32; 4096] = (&mut self.time_scratch[..4096]).try_into().unwrap();
                microfft::real::rfft_4096(buf).as_slice()
            }
            8192 => {
                let buf: &mut [f32; 8192] = (&mut self.time_scratch[..8192]).try_into().unwrap();
                microfft::real::rfft_8192(buf).as_slice()
            }
            _ => unreachable!("fftlen must be 2048, 4096, or 8192"),
        };

        self.full_spectrum[..half.len()].copy_from_slice(half);
        &mut self.full_spectrum[..n / 2]
    }

    /// Complex-to-real inverse transform (§4.3 step 4).
    ///
    /// `half_spectrum` holds the live `fftlen/2` bins (as produced and
    /// then rewritten by the power-spectrum step); this mirrors it into a
    /// Hermitian-symmetric full-length spectrum and runs the inverse FFT.
    /// Bin 0's imaginary part (the folded Nyquist term) is taken to be
    /// zero here, matching the spec's explicit "Nyquist bin is zeroed".
    pub fn inverse(&mut self, half_spectrum: &[Complex32]) -> &mut [f32] {
        let n = self.fftlen;
        let half = n / 2;

        self.full_spectrum[0] = Complex32::new(half_spectrum[0].re, 0.0);
        for i in 1..half {
            self.full_spectrum[i] = half_spectrum[i];
            self.full_spectrum[n - i] = Complex32::new(half_spectrum[i].re, -half_spectrum[i].im);
        }
        self.full_spectrum[half] = Complex32::new(0.0, 0.0);

        let time = match n {
            2048 => {
                let buf: &mut [Complex32; 2048] = (&mut self.full_spectrum[..2048]).try_into().unwrap();
                microfft::inverse::ifft_2048(buf).as_slice()
            }
            4096 => {
                let buf: &mut [Complex32; 4096] = (&mut self.full_spectrum[..4096]).try_into().unwrap();
                microfft::inverse::ifft_4096(buf).as_slice()
            }
            8192 => {
                let buf: &mut [Complex32; 8192] = (&mut self.full_spectrum[..8192]).try_into().unwrap();
                microfft::inverse::ifft_8192(buf).as_slice()
            }
            _ => unreachable!("fftlen must be 2048, 4096, or 8192"),
        };

        self.time_scratch[..time.len()].copy_from_slice(time);
        &mut self.time_scratch[..n]
    }
}
