//! Configuration through environment variables.
//!
//! Values are read once, on first use, and cached for the lifetime of the process. Invalid values
//! are logged and replaced by the default.

use std::{
    env::{self, VarError},
    sync::OnceLock,
};

use crate::heatmap::DecodeMode;

/// Number of frames a [`FrameTimer`](crate::timer::FrameTimer) keeps by default.
pub const DEFAULT_FRAME_WINDOW: usize = 30;

const FRAME_WINDOW_VAR: &str = "HEATPOSE_FRAME_WINDOW";
const DECODE_MODE_VAR: &str = "HEATPOSE_DECODE_MODE";

static FRAME_WINDOW: OnceLock<usize> = OnceLock::new();
static DECODE_MODE: OnceLock<DecodeMode> = OnceLock::new();

/// Returns the default [`FrameTimer`](crate::timer::FrameTimer) capacity, configured with
/// `HEATPOSE_FRAME_WINDOW`.
pub fn frame_window() -> usize {
    *FRAME_WINDOW.get_or_init(|| {
        let window = parse_frame_window(env::var(FRAME_WINDOW_VAR));
        log::debug!("using a frame window of {window} frames");
        window
    })
}

/// Returns the default [`DecodeMode`], configured with `HEATPOSE_DECODE_MODE` (`strict` or
/// `tolerant`).
pub fn decode_mode() -> DecodeMode {
    *DECODE_MODE.get_or_init(|| {
        let mode = parse_decode_mode(env::var(DECODE_MODE_VAR));
        log::debug!("using decode mode {:?}", mode);
        mode
    })
}

fn parse_frame_window(var: Result<String, VarError>) -> usize {
    match var.as_deref() {
        Err(VarError::NotPresent) => DEFAULT_FRAME_WINDOW,
        Ok(v) => match v.trim().parse::<usize>() {
            Ok(window) if window > 0 => window,
            _ => {
                log::warn!(
                    "invalid value set for `{FRAME_WINDOW_VAR}` variable: '{v}'; \
                     using {DEFAULT_FRAME_WINDOW}"
                );
                DEFAULT_FRAME_WINDOW
            }
        },
        Err(VarError::NotUnicode(s)) => {
            log::warn!(
                "invalid value set for `{FRAME_WINDOW_VAR}` variable: {}; \
                 using {DEFAULT_FRAME_WINDOW}",
                s.to_string_lossy()
            );
            DEFAULT_FRAME_WINDOW
        }
    }
}

fn parse_decode_mode(var: Result<String, VarError>) -> DecodeMode {
    match var.as_deref() {
        Ok("strict") => DecodeMode::Strict,
        Ok("tolerant") | Err(VarError::NotPresent) => DecodeMode::Tolerant,
        Ok(invalid) => {
            log::warn!(
                "invalid value set for `{DECODE_MODE_VAR}` variable: '{invalid}'; using tolerant"
            );
            DecodeMode::Tolerant
        }
        Err(VarError::NotUnicode(s)) => {
            log::warn!(
                "invalid value set for `{DECODE_MODE_VAR}` variable: {}; using tolerant",
                s.to_string_lossy()
            );
            DecodeMode::Tolerant
        }
    }
}
