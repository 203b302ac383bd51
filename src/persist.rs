//! Persisted-state codec (§6): the plain tab-separated key/value format
//! used by the (non-realtime) session-management thread only. Never
//! touched from the audio thread.

use crate::error::RetuneError;

/// Parsed persisted state, one field per recognized key. Absent keys keep
/// the built-in defaults named in §6.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedState {
    pub tune: f32,
    pub bias: f32,
    pub filt: f32,
    pub corr: f32,
    pub offs: f32,
    pub notes: u16,
    pub window_x: Option<i32>,
    pub window_y: Option<i32>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self { tune: 440.0, bias: 0.5, filt: 0.1, corr: 1.0, offs: 0.0, notes: 0x0FFF, window_x: None, window_y: None }
    }
}

impl PersistedState {
    /// Parse one line-oriented key/value document. Unknown keys are
    /// ignored; a malformed value for a recognized key is a hard error
    /// (the caller surfaces this; it never reaches the audio thread).
    pub fn parse(text: &str) -> Result<Self, RetuneError> {
        let mut state = Self::default();

        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('\t') else {
                continue;
            };

            match key {
                "/autotune/tune" => state.tune = parse_f32(value)?,
                "/autotune/bias" => state.bias = parse_f32(value)?,
                "/autotune/filt" => state.filt = parse_f32(value)?,
                "/autotune/corr" => state.corr = parse_f32(value)?,
                "/autotune/offs" => state.offs = parse_f32(value)?,
                "/autotune/notes" => state.notes = parse_hex_u16(value)?,
                "/window/x" => state.window_x = Some(parse_i32(value)?),
                "/window/y" => state.window_y = Some(parse_i32(value)?),
                _ => {}
            }
        }

        Ok(state)
    }

    /// Serialize back to the line-oriented format. `/window/x` and
    /// `/window/y` are only emitted if they were present when parsed (or
    /// set by the caller), so a host that never used the GUI does not
    /// gain spurious window-geometry lines.
    pub fn serialize(&self, out: &mut impl core::fmt::Write) -> core::fmt::Result {
        writeln!(out, "/autotune/tune\t{}", self.tune)?;
        writeln!(out, "/autotune/bias\t{}", self.bias)?;
        writeln!(out, "/autotune/filt\t{}", self.filt)?;
        writeln!(out, "/autotune/corr\t{}", self.corr)?;
        writeln!(out, "/autotune/offs\t{}", self.offs)?;
        writeln!(out, "/autotune/notes\t{:X}", self.notes)?;
        if let Some(x) = self.window_x {
            writeln!(out, "/window/x\t{x}")?;
        }
        if let Some(y) = self.window_y {
            writeln!(out, "/window/y\t{y}")?;
        }
        Ok(())
    }
}

fn parse_f32(value: &str) -> Result<f32, RetuneError> {
    value.trim().parse().map_err(|_| RetuneError::PersistParse)
}

fn parse_i32(value: &str) -> Result<i32, RetuneError> {
    value.trim().parse().map_err(|_| RetuneError::PersistParse)
}

fn parse_hex_u16(value: &str) -> Result<u16, RetuneError> {
    u16::from_str_radix(value.trim(), 16).map_err(|_| RetuneError::PersistParse)
}
