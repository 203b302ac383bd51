//! Note selector and pitch-error tracker (§4.4).
//!
//! Maps an estimated period to the nearest enabled semitone relative to a
//! reference pitch, with hysteresis toward the previously locked note and
//! a first-order IIR smoother on the signed pitch error. The voiced/
//! unvoiced state machine itself (count, cycle, hysteresis-clearing on a
//! short unvoiced gap) lives in [`crate::reader`], which calls
//! [`NoteTracker::update_voiced`] only when a period was found and the
//! effective note mask is non-empty.

use libm::{fabsf, floorf, log2f};

/// Smoothed pitch error and note-lock state, plus the four user-facing
/// correction parameters that feed the resampling ratio.
pub struct NoteTracker {
    /// Smoothed pitch error, octaves (1 semitone == 1/12).
    pub error: f32,
    /// Currently locked semitone, `-1` when nothing has locked yet.
    pub lastnote: i32,
    /// Sticky bitmask of notes recently locked on; cleared by the reader
    /// on read (`get_noteset`).
    pub notebits: u16,

    corrfilt: f32,
    notebias: f32,
    corrgain: f32,
    corroffs: f32,
    refpitch: f32,
}

impl NoteTracker {
    pub fn new() -> Self {
        Self {
            error: 0.0,
            lastnote: -1,
            notebits: 0,
            corrfilt: 0.1,
            notebias: 0.5 / 13.0,
            corrgain: 1.0,
            corroffs: 0.0,
            refpitch: 440.0,
        }
    }

    /// `v` is a user-facing time constant in seconds; stored as the
    /// per-analysis IIR coefficient derived from it.
    pub fn set_corrfilt(&mut self, v: f32, frsize: usize, fsamp: f32) {
        self.corrfilt = (4 * frsize) as f32 / (v * fsamp);
    }

    /// `v` is user-facing `[0, 1]`; stored scaled to less than one semitone.
    pub fn set_notebias(&mut self, v: f32) {
        self.notebias = v / 13.0;
    }

    pub fn set_corrgain(&mut self, v: f32) {
        self.corrgain = v;
    }

    pub fn set_corroffs(&mut self, v: f32) {
        self.corroffs = v;
    }

    pub fn set_refpitch(&mut self, v: f32) {
        self.refpitch = v;
    }

    /// Nearest-semitone search with hysteresis, and the IIR error update.
    /// Caller guarantees `v != 0.0` and `notemask != 0`.
    pub fn update_voiced(&mut self, v: f32, notemask: u16, firate: f32) {
        let f = log2f(firate / (v * self.refpitch));

        let mut best_note = -1i32;
        let mut best_a = f32::MAX;
        let mut best_d = 0.0f32;

        for i in 0..12 {
            if notemask & (1 << i) == 0 {
                continue;
            }
            let mut d = f - (i as f32 - 9.0) / 12.0;
            d -= floorf(d + 0.5);
            let mut a = fabsf(d);
            if i == self.lastnote {
                a -= self.notebias;
            }
            if a < best_a {
                best_a = a;
                best_note = i;
                best_d = d;
            }
        }

        if best_note == self.lastnote {
            self.error += self.corrfilt * (best_d - self.error);
        } else {
            self.error = best_d;
            self.lastnote = best_note;
            self.notebits |= 1 << best_note;
        }
    }

    /// Clear hysteresis after a short unvoiced gap (§4.5 state machine,
    /// `count == 2`).
    pub fn clear_hysteresis(&mut self) {
        self.lastnote = -1;
    }

    /// Reset error to zero on a sustained unvoiced gap; `corroffs` still
    /// governs the ratio (§9 "unvoiced output" design note).
    pub fn unvoiced_reset(&mut self) {
        self.error = 0.0;
    }

    /// `ratio = 2^(corroffs/12 - error*corrgain)`, recomputed after every
    /// pitch update whether voiced or not.
    pub fn ratio(&self) -> f32 {
        libm::exp2f(self.corroffs / 12.0 - self.error * self.corrgain)
    }

    /// Returns and clears the sticky note-lock bitmask (`get_noteset`).
    pub fn take_noteset(&mut self) -> u16 {
        let bits = self.notebits;
        self.notebits = 0;
        bits
    }
}

impl Default for NoteTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_onto_nearest_enabled_semitone() {
        let mut nt = NoteTracker::new();
        // A4, 440 Hz, at firate = 48000: period = 48000/440.
        let firate = 48_000.0f32;
        let period = firate / 440.0;
        for _ in 0..8 {
            nt.update_voiced(period, 0xFFF, firate);
        }
        assert_eq!(nt.lastnote, 9);
        assert!(nt.error.abs() < 1e-3);
    }

    #[test]
    fn hysteresis_keeps_previous_note_near_boundary() {
        let mut nt = NoteTracker::new();
        nt.set_notebias(1.0);
        let firate = 48_000.0f32;
        nt.update_voiced(firate / 440.0, 0xFFF, firate);
        assert_eq!(nt.lastnote, 9);

        // Nudge slightly sharp of the A#/A boundary; with a large bias
        // the tracker should stay on A rather than jump to A#.
        let nudged = firate / 452.0;
        nt.update_voiced(nudged, 0xFFF, firate);
        assert_eq!(nt.lastnote, 9);
    }

    #[test]
    fn ratio_reflects_offset_and_error() {
        let mut nt = NoteTracker::new();
        nt.set_corroffs(12.0);
        assert!((nt.ratio() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn take_noteset_clears_bits() {
        let mut nt = NoteTracker::new();
        let firate = 48_000.0f32;
        nt.update_voiced(firate / 440.0, 0xFFF, firate);
        assert_ne!(nt.take_noteset(), 0);
        assert_eq!(nt.notebits, 0);
    }
}
