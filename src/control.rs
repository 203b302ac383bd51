//! Control surface (§4.6): the narrow parameter-sink capability shared by
//! GUI/keyboard input and MIDI input, read by the audio thread once per
//! fragment boundary.
//!
//! Every cross-thread scalar is a word-sized `AtomicU32` with relaxed
//! ordering on both sides — momentary inconsistency across parameters is
//! acceptable and inaudible, matching §5's concurrency model. `f32`
//! parameters ride the atomic as their bit pattern (`to_bits`/`from_bits`),
//! the same idiom the teacher's lock-free ring buffer uses for its read/
//! write indices, applied here to scalars instead.

use core::sync::atomic::{AtomicU32, Ordering};

const NO_CHANNEL_FILTER: u32 = u32::MAX;

/// Thread-safe home for every parameter the control thread (GUI, MIDI
/// input handling) can change. The engine never holds a reference back to
/// whatever owns a `ParameterSink`; it only reads from one each fragment
/// boundary.
pub struct ParameterSink {
    refpitch: AtomicU32,
    notebias: AtomicU32,
    corrfilt_seconds: AtomicU32,
    corrgain: AtomicU32,
    corroffs: AtomicU32,
    keyboard_mask: AtomicU32,
    midimask: AtomicU32,
    midichan: AtomicU32,
    low_latency: AtomicU32,
}

impl ParameterSink {
    pub fn new() -> Self {
        Self {
            refpitch: AtomicU32::new(440.0f32.to_bits()),
            notebias: AtomicU32::new(0.5f32.to_bits()),
            corrfilt_seconds: AtomicU32::new(0.1f32.to_bits()),
            corrgain: AtomicU32::new(1.0f32.to_bits()),
            corroffs: AtomicU32::new(0.0f32.to_bits()),
            keyboard_mask: AtomicU32::new(0x0FFF),
            midimask: AtomicU32::new(0),
            midichan: AtomicU32::new(NO_CHANNEL_FILTER),
            low_latency: AtomicU32::new(0),
        }
    }

    fn load_f32(cell: &AtomicU32) -> f32 {
        f32::from_bits(cell.load(Ordering::Relaxed))
    }

    fn store_f32(cell: &AtomicU32, v: f32) {
        cell.store(v.to_bits(), Ordering::Relaxed);
    }

    pub fn set_refpitch(&self, v: f32) {
        Self::store_f32(&self.refpitch, v);
    }
    pub fn refpitch(&self) -> f32 {
        Self::load_f32(&self.refpitch)
    }

    /// `v` is the user-facing `[0, 1]` bias knob; the time-constant/note-
    /// bias unit conversions (§4.4) happen where this is consumed, not here.
    pub fn set_notebias(&self, v: f32) {
        Self::store_f32(&self.notebias, v);
    }
    pub fn notebias(&self) -> f32 {
        Self::load_f32(&self.notebias)
    }

    /// `v` is the user-facing time constant in seconds.
    pub fn set_corrfilt(&self, v: f32) {
        Self::store_f32(&self.corrfilt_seconds, v);
    }
    pub fn corrfilt(&self) -> f32 {
        Self::load_f32(&self.corrfilt_seconds)
    }

    pub fn set_corrgain(&self, v: f32) {
        Self::store_f32(&self.corrgain, v);
    }
    pub fn corrgain(&self) -> f32 {
        Self::load_f32(&self.corrgain)
    }

    pub fn set_corroffs(&self, v: f32) {
        Self::store_f32(&self.corroffs, v);
    }
    pub fn corroffs(&self) -> f32 {
        Self::load_f32(&self.corroffs)
    }

    /// The keyboard/UI-driven 12-bit note mask (bit `i` == semitone `i`
    /// enabled).
    pub fn set_keyboard_mask(&self, mask: u16) {
        self.keyboard_mask.store(mask as u32, Ordering::Relaxed);
    }
    pub fn keyboard_mask(&self) -> u16 {
        self.keyboard_mask.load(Ordering::Relaxed) as u16
    }

    pub fn set_low_latency(&self, enabled: bool) {
        self.low_latency.store(enabled as u32, Ordering::Relaxed);
    }
    pub fn low_latency(&self) -> bool {
        self.low_latency.load(Ordering::Relaxed) != 0
    }

    pub fn set_midi_channel_filter(&self, channel: Option<u8>) {
        let v = channel.map(u32::from).unwrap_or(NO_CHANNEL_FILTER);
        self.midichan.store(v, Ordering::Relaxed);
    }
    pub fn midi_channel_filter(&self) -> Option<u8> {
        match self.midichan.load(Ordering::Relaxed) {
            NO_CHANNEL_FILTER => None,
            v => Some(v as u8),
        }
    }

    /// Note-on (velocity 0 behaves as note-off, per the MIDI convention).
    pub fn note_on(&self, channel: u8, note: u8, velocity: u8) {
        if !self.channel_accepted(channel) {
            return;
        }
        let bit = 1u32 << (note % 12);
        if velocity > 0 {
            self.midimask.fetch_or(bit, Ordering::Relaxed);
        } else {
            self.midimask.fetch_and(!bit, Ordering::Relaxed);
        }
    }

    pub fn note_off(&self, channel: u8, note: u8) {
        if !self.channel_accepted(channel) {
            return;
        }
        let bit = 1u32 << (note % 12);
        self.midimask.fetch_and(!bit, Ordering::Relaxed);
    }

    pub fn clear_midimask(&self) {
        self.midimask.store(0, Ordering::Relaxed);
    }

    fn channel_accepted(&self, channel: u8) -> bool {
        match self.midi_channel_filter() {
            None => true,
            Some(filter) => filter == channel,
        }
    }

    /// `effective_notemask = keyboard_mask & (midimask == 0 ? 0xFFF : midimask)`
    /// (§4.6, the resolved keyboard/MIDI composition rule).
    pub fn effective_notemask(&self) -> u16 {
        let midimask = self.midimask.load(Ordering::Relaxed) as u16;
        let gate = if midimask == 0 { 0x0FFF } else { midimask };
        self.keyboard_mask() & gate
    }
}

impl Default for ParameterSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_on_off_round_trips() {
        let sink = ParameterSink::new();
        sink.set_keyboard_mask(0x0FFF);
        assert_eq!(sink.effective_notemask(), 0x0FFF);

        sink.note_on(0, 69, 100); // A4 -> semitone 9
        assert_eq!(sink.effective_notemask(), 1 << 9);

        sink.note_off(0, 69);
        assert_eq!(sink.effective_notemask(), 0x0FFF);
    }

    #[test]
    fn channel_filter_ignores_other_channels() {
        let sink = ParameterSink::new();
        sink.set_midi_channel_filter(Some(2));
        sink.note_on(1, 69, 100);
        assert_eq!(sink.effective_notemask(), 0x0FFF);

        sink.note_on(2, 69, 100);
        assert_eq!(sink.effective_notemask(), 1 << 9);
    }

    #[test]
    fn velocity_zero_note_on_clears_bit() {
        let sink = ParameterSink::new();
        sink.note_on(0, 69, 100);
        sink.note_on(0, 69, 0);
        assert_eq!(sink.effective_notemask(), 0x0FFF);
    }

    #[test]
    fn keyboard_mask_gates_midi_narrowing() {
        let sink = ParameterSink::new();
        sink.set_keyboard_mask(1 << 9); // only A enabled on the keyboard panel
        sink.note_on(0, 70, 100); // A#, not enabled on the keyboard
        assert_eq!(sink.effective_notemask(), 0, "keyboard mask must gate MIDI, not just OR with it");
    }

    #[test]
    fn clear_midimask_restores_keyboard_only_gating() {
        let sink = ParameterSink::new();
        sink.note_on(0, 69, 100);
        sink.clear_midimask();
        assert_eq!(sink.effective_notemask(), 0x0FFF);
    }
}
