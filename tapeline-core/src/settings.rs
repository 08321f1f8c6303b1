/*
    Copyright (C) 2026  TAPELINE authors

    This file is part of TAPELINE, a Rust library for playing back legacy cassette images.

    For the full copyright notice, see the lib.rs file.
*/
//! Global playback configuration.
#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use log::trace;

/// The baud rate configured by default.
pub const DEFAULT_BAUD_RATE: u32 = 3600;

/// The playback configuration shared by the tick driver and the encoders.
///
/// Some tape formats run at a fixed speed regardless of the configured baud rate.
/// Their encoders temporarily override [Settings::baud_rate] with a [BaudRateOverride]
/// and put the original value back when the playback ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct Settings {
    /// The baud rate used by formats without a fixed speed of their own.
    pub baud_rate: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings { baud_rate: DEFAULT_BAUD_RATE }
    }
}

impl Settings {
    /// Returns settings with the given baud rate.
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        Settings { baud_rate }
    }
}

/// Remembers the original [Settings::baud_rate] while a fixed one is in effect.
///
/// The override is guarded: applying it while it's already active never clobbers the saved
/// value, and the saved value is restored at most once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct BaudRateOverride {
    saved: Option<u32>
}

impl BaudRateOverride {
    /// Saves the current baud rate of `settings` and replaces it with `baud_rate`.
    ///
    /// Returns `false` without changing anything if the override is already active.
    pub fn apply(&mut self, settings: &mut Settings, baud_rate: u32) -> bool {
        if self.saved.is_some() {
            return false
        }
        trace!("baud rate override: {} -> {}", settings.baud_rate, baud_rate);
        self.saved = Some(settings.baud_rate);
        settings.baud_rate = baud_rate;
        true
    }
    /// Puts back the saved baud rate into `settings`.
    ///
    /// Returns `false` without changing anything if there was no active override.
    pub fn restore(&mut self, settings: &mut Settings) -> bool {
        match self.saved.take() {
            Some(baud_rate) => {
                trace!("baud rate restored: {}", baud_rate);
                settings.baud_rate = baud_rate;
                true
            }
            None => false
        }
    }
    /// Returns `true` if the override is in effect.
    pub fn is_active(&self) -> bool {
        self.saved.is_some()
    }
    /// Returns the saved original baud rate while the override is in effect.
    pub fn saved(&self) -> Option<u32> {
        self.saved
    }
}
