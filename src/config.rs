//! Derived engine configuration: turns a bare host sample rate into the
//! full table of internal constants the rest of the crate builds on.

use crate::error::RetuneError;

/// Largest ring buffer capacity any supported host rate can select.
pub const MAX_IPSIZE: usize = 8192;
/// Largest analysis FFT length any supported host rate can select.
pub const MAX_FFTLEN: usize = 8192;
/// Largest fragment length any supported host rate can select.
pub const MAX_FRSIZE: usize = 512;

/// Derived, immutable engine configuration computed once at construction
/// from the host sample rate.
///
/// All buffer sizes in the engine are fixed at `MAX_*` so no allocation is
/// ever required regardless of which of the three rate bands is selected;
/// `ipsize`/`fftlen`/`frsize` below say how much of those fixed buffers is
/// actually in use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetuneConfig {
    /// Host sample rate, Hz, as given by the caller.
    pub fsamp: f32,
    /// True when the internal rate is 2x the host rate.
    pub upsamp: bool,
    /// Internal processing rate, Hz (`fsamp` or `2*fsamp`).
    pub firate: f32,
    /// Ring buffer capacity, internal samples.
    pub ipsize: usize,
    /// Analysis FFT length, internal samples.
    pub fftlen: usize,
    /// Fragment length, internal samples (`fftlen == 16 * frsize`).
    pub frsize: usize,
    /// Shortest accepted period, internal samples (~1200 Hz).
    pub ifmin: f32,
    /// Longest accepted period, internal samples (~75 Hz).
    pub ifmax: f32,
}

impl RetuneConfig {
    /// Build the derived configuration for a host sample rate.
    ///
    /// Rejects non-finite, zero, or negative rates; any other positive
    /// rate is accepted and bucketed into the nearest of the three rate
    /// bands from the rate table, even outside the nominally supported
    /// 44.1 kHz..192 kHz span (degraded rather than refused).
    pub fn new(fsamp: f32) -> Result<Self, RetuneError> {
        if !fsamp.is_finite() || fsamp <= 0.0 {
            return Err(RetuneError::InvalidSampleRate);
        }

        let (upsamp, ipsize, fftlen, frsize) = if fsamp < 64_000.0 {
            (true, 4096, 2048, 128)
        } else if fsamp <= 128_000.0 {
            (false, 4096, 4096, 256)
        } else {
            (false, 8192, 8192, 512)
        };

        let firate = if upsamp { 2.0 * fsamp } else { fsamp };

        debug_assert_eq!(fftlen, 16 * frsize);
        debug_assert!(fftlen <= ipsize);
        debug_assert!(ipsize <= MAX_IPSIZE && fftlen <= MAX_FFTLEN && frsize <= MAX_FRSIZE);

        Ok(Self {
            fsamp,
            upsamp,
            firate,
            ipsize,
            fftlen,
            frsize,
            ifmin: firate / 1200.0,
            ifmax: firate / 75.0,
        })
    }

    /// Sample stride between consecutive windowed-copy taps (§4.3 step 1).
    #[inline]
    pub fn stride(&self) -> usize {
        if self.upsamp { 2 } else { 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_rates() {
        assert_eq!(RetuneConfig::new(0.0), Err(RetuneError::InvalidSampleRate));
        assert_eq!(RetuneConfig::new(-48000.0), Err(RetuneError::InvalidSampleRate));
        assert_eq!(RetuneConfig::new(f32::NAN), Err(RetuneError::InvalidSampleRate));
        assert_eq!(RetuneConfig::new(f32::INFINITY), Err(RetuneError::InvalidSampleRate));
    }

    #[test]
    fn low_rate_band_upsamples() {
        let cfg = RetuneConfig::new(44_100.0).unwrap();
        assert!(cfg.upsamp);
        assert_eq!(cfg.ipsize, 4096);
        assert_eq!(cfg.fftlen, 2048);
        assert_eq!(cfg.frsize, 128);
        assert_eq!(cfg.firate, 88_200.0);
    }

    #[test]
    fn mid_rate_band() {
        let cfg = RetuneConfig::new(96_000.0).unwrap();
        assert!(!cfg.upsamp);
        assert_eq!(cfg.ipsize, 4096);
        assert_eq!(cfg.fftlen, 4096);
        assert_eq!(cfg.frsize, 256);
        assert_eq!(cfg.firate, 96_000.0);
    }

    #[test]
    fn high_rate_band() {
        let cfg = RetuneConfig::new(192_000.0).unwrap();
        assert!(!cfg.upsamp);
        assert_eq!(cfg.ipsize, 8192);
        assert_eq!(cfg.fftlen, 8192);
        assert_eq!(cfg.frsize, 512);
    }

    #[test]
    fn boundary_at_64khz_does_not_upsample() {
        let cfg = RetuneConfig::new(64_000.0).unwrap();
        assert!(!cfg.upsamp);
        assert_eq!(cfg.fftlen, 4096);
    }

    #[test]
    fn fftlen_is_always_sixteen_fragments() {
        for rate in [22_050.0, 44_100.0, 48_000.0, 88_200.0, 96_000.0, 128_000.0, 176_400.0, 192_000.0]
        {
            let cfg = RetuneConfig::new(rate).unwrap();
            assert_eq!(cfg.fftlen, 16 * cfg.frsize);
            assert!(cfg.fftlen <= cfg.ipsize);
        }
    }
}
