//! Variable-rate cubic-interpolating reader and period-jump crossfader
//! (§4.5). Owns the fragment/analysis-cycle state machine: every fragment
//! it advances one (or two, while crossfading) fractional read index by
//! the current ratio; every fourth fragment it runs the pitch estimator
//! (§4.3) and note tracker (§4.4) and decides whether to schedule a
//! period-aligned crossfade jump.

use libm::{ceilf, floorf};

use crate::config::RetuneConfig;
use crate::control::ParameterSink;
use crate::fft::FftEngine;
use crate::note::NoteTracker;
use crate::pitch::PitchEstimator;
use crate::ring_buffer::AnalysisRing;
use crate::tables::Tables;

pub struct Reader {
    r1: f32,
    r2: f32,
    frindex: usize,
    frcount: u8,
    cycle: f32,
    count: u8,
    xfade: bool,
    ratio: f32,
    notetracker: NoteTracker,
    pitch: PitchEstimator,
}

impl Reader {
    pub fn new(cfg: &RetuneConfig) -> Self {
        Self {
            r1: cfg.ipsize as f32 / 2.0,
            r2: 0.0,
            frindex: 0,
            frcount: 0,
            cycle: cfg.frsize as f32,
            count: 0,
            xfade: false,
            ratio: 1.0,
            notetracker: NoteTracker::new(),
            pitch: PitchEstimator::new(),
        }
    }

    /// Produce the next output sample, running the fragment-boundary state
    /// machine first if the current fragment has just ended.
    pub fn next_sample(
        &mut self,
        ring: &AnalysisRing,
        tables: &Tables,
        fft: &mut FftEngine,
        cfg: &RetuneConfig,
        sink: &ParameterSink,
    ) -> f32 {
        if self.frindex == cfg.frsize {
            self.on_fragment_boundary(ring, tables, fft, cfg, sink);
        }

        let dr = self.ratio * cfg.stride() as f32;
        let out = if self.xfade {
            let u1 = cubic_read(ring, self.r1);
            let u2 = cubic_read(ring, self.r2);
            let v = tables.xffunc[self.frindex];
            self.r1 = modwrap(self.r1 + dr, cfg.ipsize as f32);
            self.r2 = modwrap(self.r2 + dr, cfg.ipsize as f32);
            (1.0 - v) * u1 + v * u2
        } else {
            let u = cubic_read(ring, self.r1);
            self.r1 = modwrap(self.r1 + dr, cfg.ipsize as f32);
            u
        };

        self.frindex += 1;
        out
    }

    /// Smoothed pitch error, semitones (`get_error`).
    pub fn error_semitones(&self) -> f32 {
        12.0 * self.notetracker.error
    }

    /// Sticky note-lock bitmask, returned and cleared (`get_noteset`).
    pub fn take_noteset(&mut self) -> u16 {
        self.notetracker.take_noteset()
    }

    fn on_fragment_boundary(
        &mut self,
        ring: &AnalysisRing,
        tables: &Tables,
        fft: &mut FftEngine,
        cfg: &RetuneConfig,
        sink: &ParameterSink,
    ) {
        self.frindex = 0;
        self.frcount += 1;

        if self.frcount == 4 {
            self.frcount = 0;

            self.notetracker.set_corrfilt(sink.corrfilt(), cfg.frsize, cfg.fsamp);
            self.notetracker.set_notebias(sink.notebias());
            self.notetracker.set_corrgain(sink.corrgain());
            self.notetracker.set_corroffs(sink.corroffs());
            self.notetracker.set_refpitch(sink.refpitch());

            let v = self.pitch.estimate(ring, tables, fft, cfg);
            let notemask = sink.effective_notemask();

            if v != 0.0 {
                if self.count > 0 {
                    #[cfg(feature = "debug-logging")]
                    log::trace!("unvoiced -> voiced, period={v} samples");
                }
                self.count = 0;
                self.cycle = v;
                // A voiced frame always sets cycle (so crossfade jumps stay
                // period-aligned); whether it also moves the note lock
                // depends on whether any note is enabled to lock onto.
                if notemask != 0 {
                    self.notetracker.update_voiced(v, notemask, cfg.firate);
                } else {
                    self.notetracker.unvoiced_reset();
                    self.notetracker.clear_hysteresis();
                }
            } else {
                if self.count == 0 {
                    #[cfg(feature = "debug-logging")]
                    log::trace!("voiced -> unvoiced");
                }
                self.count += 1;
                if self.count > 5 {
                    self.count = 5;
                    self.cycle = cfg.frsize as f32;
                    self.notetracker.unvoiced_reset();
                    #[cfg(feature = "debug-logging")]
                    log::debug!("unvoiced hold exceeded, resetting ratio to corroffs-only");
                }
                if self.count == 2 {
                    self.notetracker.clear_hysteresis();
                    #[cfg(feature = "debug-logging")]
                    log::trace!("clearing note hysteresis after short unvoiced gap");
                }
            }

            self.ratio = self.notetracker.ratio();
        }

        if self.xfade {
            self.r1 = self.r2;
        }

        let ipsize = cfg.ipsize as f32;
        let frsize = cfg.frsize as f32;

        let mut dr_jump = self.cycle * ceilf(frsize / self.cycle);
        if cfg.upsamp {
            dr_jump *= 2.0;
        }

        let latency = if sink.low_latency() { ipsize / 4.0 } else { ipsize / 2.0 };
        let rt = modwrap(ring.ipindex() as f32 - latency, ipsize);
        let d1 = wrap_signed(self.r1 - rt, ipsize);

        let ns = 2.2 * frsize + 3.0;

        if d1 > dr_jump / 2.0 || d1 + ns >= latency {
            self.r2 = modwrap(self.r1 - dr_jump, ipsize);
            self.xfade = true;
            #[cfg(feature = "debug-logging")]
            log::trace!("scheduling backward crossfade jump, dr_jump={dr_jump}");
        } else if d1 < -dr_jump / 2.0 {
            self.r2 = modwrap(self.r1 + dr_jump, ipsize);
            self.xfade = true;
            #[cfg(feature = "debug-logging")]
            log::trace!("scheduling forward crossfade jump, dr_jump={dr_jump}");
        } else {
            self.xfade = false;
        }
    }
}

#[inline]
fn modwrap(x: f32, m: f32) -> f32 {
    let r = x % m;
    if r < 0.0 {
        r + m
    } else {
        r
    }
}

/// Wrap into `(-m/2, m/2]`.
#[inline]
fn wrap_signed(x: f32, m: f32) -> f32 {
    x - m * floorf(x / m + 0.5)
}

#[inline]
fn cubic_read(ring: &AnalysisRing, r: f32) -> f32 {
    let base = floorf(r) as usize % ring.ipsize();
    let a = r - floorf(r);
    let taps = ring.taps(base);
    cubic(taps[0], taps[1], taps[2], taps[3], a)
}

/// Hermite-style 4-tap cubic interpolation (§4.5).
#[inline]
fn cubic(v0: f32, v1: f32, v2: f32, v3: f32, a: f32) -> f32 {
    let b = 1.0 - a;
    let c = a * b;
    (1.0 + 1.5 * c) * (v1 * b + v2 * a) - 0.5 * c * (v0 * b + v1 + v2 + v3 * a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cubic_reconstructs_a_linear_ramp_exactly() {
        let (v0, v1, v2, v3) = (1.0, 2.0, 3.0, 4.0);
        for i in 0..=10 {
            let a = i as f32 / 10.0;
            let got = cubic(v0, v1, v2, v3, a);
            let want = 2.0 + a; // linear interpolation between v1 and v2
            assert!((got - want).abs() < 1e-4, "a={a} got={got} want={want}");
        }
    }

    #[test]
    fn wrap_signed_stays_in_range() {
        let m = 100.0;
        assert_eq!(wrap_signed(60.0, m), -40.0);
        assert_eq!(wrap_signed(-60.0, m), 40.0);
        assert!((wrap_signed(10.0, m) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn boundary_fires_every_frsize_samples() {
        let cfg = RetuneConfig::new(48_000.0).unwrap();
        let mut fft = FftEngine::new(cfg.fftlen);
        let tables = Tables::new(cfg.fftlen, cfg.frsize, &mut fft);
        let mut ring = AnalysisRing::new(cfg.ipsize);
        ring.write(&[0.0; 8192][..cfg.ipsize]);
        let sink = ParameterSink::new();
        let mut reader = Reader::new(&cfg);

        for _ in 0..cfg.frsize {
            reader.next_sample(&ring, &tables, &mut fft, &cfg, &sink);
        }
        assert_eq!(reader.frcount, 1);
    }

    #[test]
    fn silence_settles_to_unity_ratio() {
        let cfg = RetuneConfig::new(48_000.0).unwrap();
        let mut fft = FftEngine::new(cfg.fftlen);
        let tables = Tables::new(cfg.fftlen, cfg.frsize, &mut fft);
        let mut ring = AnalysisRing::new(cfg.ipsize);
        ring.write(&[0.0; 8192][..cfg.ipsize]);
        let sink = ParameterSink::new();
        let mut reader = Reader::new(&cfg);

        for _ in 0..(cfg.frsize * 4 * 8) {
            reader.next_sample(&ring, &tables, &mut fft, &cfg, &sink);
            ring.write(&[0.0]);
        }
        assert!((reader.ratio - 1.0).abs() < 1e-6);
    }
}
