//! Engine façade (§4.7): the one type the audio thread touches.

use crate::config::RetuneConfig;
use crate::control::ParameterSink;
use crate::error::RetuneError;
use crate::fft::FftEngine;
use crate::reader::Reader;
use crate::resampler::Upsampler2x;
use crate::ring_buffer::AnalysisRing;
use crate::tables::Tables;

/// Owns every stateful piece of the engine and exposes exactly the
/// surface the audio thread and the control thread need: `process` for
/// the former, setters/getters for the latter.
pub struct Engine {
    cfg: RetuneConfig,
    fft: FftEngine,
    tables: Tables,
    ring: AnalysisRing,
    upsampler: Option<Upsampler2x>,
    reader: Reader,
    params: ParameterSink,
}

impl Engine {
    /// Build the engine for a host sample rate. All buffers are allocated
    /// here; `process` never allocates.
    pub fn new(fsamp: f32) -> Result<Self, RetuneError> {
        let cfg = RetuneConfig::new(fsamp)?;
        let mut fft = FftEngine::new(cfg.fftlen);
        let tables = Tables::new(cfg.fftlen, cfg.frsize, &mut fft);
        let ring = AnalysisRing::new(cfg.ipsize);
        let upsampler = cfg.upsamp.then(Upsampler2x::new);
        let reader = Reader::new(&cfg);

        #[cfg(feature = "debug-logging")]
        log::debug!(
            "engine constructed: fsamp={} upsamp={} firate={} ipsize={} fftlen={} frsize={}",
            cfg.fsamp,
            cfg.upsamp,
            cfg.firate,
            cfg.ipsize,
            cfg.fftlen,
            cfg.frsize
        );

        Ok(Self { cfg, fft, tables, ring, upsampler, reader, params: ParameterSink::new() })
    }

    /// The only method the audio thread calls. Consumes `nframes` host-rate
    /// samples from `input`, writes `nframes` host-rate samples to `output`.
    pub fn process(&mut self, nframes: usize, input: &[f32], output: &mut [f32]) -> Result<(), RetuneError> {
        if input.len() != output.len() || input.len() < nframes || nframes == 0 {
            return Err(RetuneError::BufferSizeMismatch);
        }

        for i in 0..nframes {
            let x = input[i];

            match &mut self.upsampler {
                Some(up) => {
                    let [a, b] = up.process(x);
                    self.ring.write(&[a, b]);
                }
                None => self.ring.write(&[x]),
            }

            output[i] = self.reader.next_sample(&self.ring, &self.tables, &mut self.fft, &self.cfg, &self.params);
        }

        Ok(())
    }

    /// Smoothed pitch error, semitones, for UI metering.
    pub fn get_error(&self) -> f32 {
        self.reader.error_semitones()
    }

    /// Sticky note-lock bitmask, returned and cleared.
    pub fn get_noteset(&mut self) -> u16 {
        self.reader.take_noteset()
    }

    pub fn set_refpitch(&self, v: f32) {
        self.params.set_refpitch(v);
    }
    pub fn set_notebias(&self, v: f32) {
        self.params.set_notebias(v);
    }
    pub fn set_corrfilt(&self, v: f32) {
        self.params.set_corrfilt(v);
    }
    pub fn set_corrgain(&self, v: f32) {
        self.params.set_corrgain(v);
    }
    pub fn set_corroffs(&self, v: f32) {
        self.params.set_corroffs(v);
    }
    pub fn set_keyboard_mask(&self, mask: u16) {
        self.params.set_keyboard_mask(mask);
    }
    pub fn set_low_latency(&self, enabled: bool) {
        self.params.set_low_latency(enabled);
    }

    pub fn note_on(&self, channel: u8, note: u8, velocity: u8) {
        self.params.note_on(channel, note, velocity);
    }
    pub fn note_off(&self, channel: u8, note: u8) {
        self.params.note_off(channel, note);
    }
    pub fn clear_midimask(&self) {
        self.params.clear_midimask();
    }
    pub fn set_midi_channel_filter(&self, channel: Option<u8>) {
        self.params.set_midi_channel_filter(channel);
    }

    pub fn config(&self) -> &RetuneConfig {
        &self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_sample_rate() {
        assert!(Engine::new(0.0).is_err());
        assert!(Engine::new(-1.0).is_err());
    }

    #[test]
    fn process_rejects_mismatched_buffers() {
        let mut engine = Engine::new(48_000.0).unwrap();
        let input = [0.0f32; 16];
        let mut output = [0.0f32; 8];
        assert_eq!(engine.process(16, &input, &mut output), Err(RetuneError::BufferSizeMismatch));
    }

    #[test]
    fn process_writes_every_frame() {
        let mut engine = Engine::new(48_000.0).unwrap();
        let input = [0.0f32; 256];
        let mut output = [f32::NAN; 256];
        engine.process(256, &input, &mut output).unwrap();
        assert!(output.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn note_mask_defaults_to_all_enabled() {
        let mut engine = Engine::new(48_000.0).unwrap();
        assert_eq!(engine.get_noteset(), 0);
        engine.set_keyboard_mask(0x0FFF);
        // default note mask is all semitones; pushing pure silence through
        // should never crash and should leave the engine at unity ratio.
        let input = [0.0f32; 2048];
        let mut output = [0.0f32; 2048];
        engine.process(2048, &input, &mut output).unwrap();
    }

    #[test]
    fn low_rate_host_upsamples_internally() {
        let engine = Engine::new(44_100.0).unwrap();
        assert!(engine.config().upsamp);
    }

    #[test]
    fn high_rate_host_does_not_upsample() {
        let engine = Engine::new(96_000.0).unwrap();
        assert!(!engine.config().upsamp);
    }
}
