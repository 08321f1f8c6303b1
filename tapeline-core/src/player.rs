/*
    Copyright (C) 2026  TAPELINE authors

    This file is part of TAPELINE, a Rust library for playing back legacy cassette images.

    For the full copyright notice, see the lib.rs file.
*/
//! The tape signal encoder interface and a reference tick driver.
//!
//! An encoder produces a tape signal one *half-period* at a time: the interval, in microseconds,
//! between two consecutive polarity toggles of the output. Two half-periods form one full wave
//! (or pulse). The encoder is invoked once per timer tick by a single control thread, so each
//! call does a bounded amount of work and leaves the encoder fully resumable.
use core::num::NonZeroU32;

use log::debug;

use crate::settings::Settings;

/// Implemented by the tape signal encoders.
pub trait PulseEncoder {
    /// Prepares the encoder for playback. Should be called once before the first [PulseEncoder::process].
    ///
    /// Encoders which run at a fixed speed override [Settings::baud_rate] here.
    fn init(&mut self, settings: &mut Settings);
    /// Advances the encoder by exactly one half-period and returns its duration in microseconds.
    ///
    /// Returns `None` once the terminal stage has been reached. From then on every call
    /// returns `None` and changes nothing.
    fn process(&mut self, settings: &mut Settings) -> Option<NonZeroU32>;
    /// Returns `true` if the terminal stage has been reached.
    fn is_done(&self) -> bool;
    /// Abandons the playback: restores any overridden settings and moves the encoder to its
    /// terminal stage.
    ///
    /// It's safe to call this at any time, any number of times.
    fn teardown(&mut self, settings: &mut Settings);
}

impl<E: PulseEncoder + ?Sized> PulseEncoder for Box<E> {
    fn init(&mut self, settings: &mut Settings) {
        (**self).init(settings)
    }
    fn process(&mut self, settings: &mut Settings) -> Option<NonZeroU32> {
        (**self).process(settings)
    }
    fn is_done(&self) -> bool {
        (**self).is_done()
    }
    fn teardown(&mut self, settings: &mut Settings) {
        (**self).teardown(settings)
    }
}

/// The state of a [TapePlayer].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerStatus {
    /// The player was never started or has been stopped.
    Idle,
    /// The encoder is producing the signal.
    Playing,
    /// The encoder reached its terminal stage, control should be handed back to the caller.
    EndOfFile
}

/// Drives a single [PulseEncoder] the way a timer interrupt would.
///
/// Each [TapePlayer::tick] invokes the encoder once, records the half-period it produced and toggles
/// the output level. The player borrows the global [Settings] for the duration of the playback,
/// and if dropped or [stopped][TapePlayer::stop] while still playing it calls
/// [PulseEncoder::teardown], so overridden settings are always restored.
///
/// The player can also be used as an [Iterator] of half-period durations.
#[derive(Debug)]
pub struct TapePlayer<'a, E: PulseEncoder> {
    encoder: E,
    settings: &'a mut Settings,
    status: PlayerStatus,
    period: u32,
    level: bool,
}

impl<'a, E: PulseEncoder> TapePlayer<'a, E> {
    /// Creates an idle player.
    pub fn new(encoder: E, settings: &'a mut Settings) -> Self {
        TapePlayer { encoder, settings, status: PlayerStatus::Idle, period: 0, level: false }
    }
    /// Creates a player and [starts][TapePlayer::start] the playback.
    pub fn start_with(encoder: E, settings: &'a mut Settings) -> Self {
        let mut player = Self::new(encoder, settings);
        player.start();
        player
    }
    /// Initializes the encoder and starts the playback.
    ///
    /// Does nothing if the player is already playing.
    pub fn start(&mut self) {
        if self.status == PlayerStatus::Playing {
            return
        }
        self.encoder.init(self.settings);
        self.period = 0;
        self.status = PlayerStatus::Playing;
    }
    /// Stops the playback, tearing down the encoder if it hasn't finished.
    pub fn stop(&mut self) {
        if self.status == PlayerStatus::Playing {
            self.encoder.teardown(self.settings);
        }
        self.period = 0;
        self.status = PlayerStatus::Idle;
    }
    /// Invokes the encoder once and returns the produced half-period in microseconds.
    ///
    /// Returns 0 if the player isn't playing. When the encoder reports its terminal stage
    /// the status becomes [PlayerStatus::EndOfFile] and 0 is returned.
    pub fn tick(&mut self) -> u32 {
        if self.status != PlayerStatus::Playing {
            self.period = 0;
            return 0
        }
        match self.encoder.process(self.settings) {
            Some(period) => {
                self.period = period.get();
                self.level = !self.level;
            }
            None => {
                debug!("end of tape");
                self.period = 0;
                self.status = PlayerStatus::EndOfFile;
            }
        }
        self.period
    }
    /// Returns the current status.
    pub fn status(&self) -> PlayerStatus {
        self.status
    }
    /// Returns `true` if the player is playing.
    pub fn is_playing(&self) -> bool {
        self.status == PlayerStatus::Playing
    }
    /// Returns `true` if the encoder has reached its terminal stage.
    pub fn is_end_of_file(&self) -> bool {
        self.status == PlayerStatus::EndOfFile
    }
    /// Returns the half-period produced by the last tick.
    pub fn period(&self) -> u32 {
        self.period
    }
    /// Returns the current output level.
    pub fn level(&self) -> bool {
        self.level
    }
    /// Returns a reference to the current settings.
    pub fn settings(&self) -> &Settings {
        self.settings
    }
    /// Returns a shared reference to the encoder.
    pub fn get_ref(&self) -> &E {
        &self.encoder
    }
    /// Returns a mutable reference to the encoder.
    pub fn get_mut(&mut self) -> &mut E {
        &mut self.encoder
    }
}

impl<'a, E: PulseEncoder> Iterator for TapePlayer<'a, E> {
    type Item = NonZeroU32;

    fn next(&mut self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.tick())
    }
}

impl<'a, E: PulseEncoder> Drop for TapePlayer<'a, E> {
    fn drop(&mut self) {
        if self.status == PlayerStatus::Playing {
            debug!("playback abandoned");
            self.encoder.teardown(self.settings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BaudRateOverride;

    /// Emits `count` half-periods of 100µs at a fixed 600 baud.
    #[derive(Debug, Default)]
    struct Countdown {
        count: u32,
        left: u32,
        baud: BaudRateOverride
    }

    impl PulseEncoder for Countdown {
        fn init(&mut self, settings: &mut Settings) {
            self.left = self.count;
            self.baud.apply(settings, 600);
        }
        fn process(&mut self, settings: &mut Settings) -> Option<NonZeroU32> {
            if self.left == 0 {
                self.baud.restore(settings);
                return None
            }
            self.left -= 1;
            NonZeroU32::new(100)
        }
        fn is_done(&self) -> bool {
            self.left == 0
        }
        fn teardown(&mut self, settings: &mut Settings) {
            self.baud.restore(settings);
            self.left = 0;
        }
    }

    #[test]
    fn tape_player_works() {
        let mut settings = Settings::with_baud_rate(1200);
        let mut player = TapePlayer::new(Countdown { count: 3, ..Default::default() }, &mut settings);
        assert_eq!(PlayerStatus::Idle, player.status());
        assert_eq!(0, player.tick());
        assert_eq!(false, player.level());
        player.start();
        assert!(player.is_playing());
        assert_eq!(600, player.settings().baud_rate);
        assert_eq!(100, player.tick());
        assert_eq!(true, player.level());
        assert_eq!(100, player.tick());
        assert_eq!(false, player.level());
        assert_eq!(100, player.period());
        assert_eq!(100, player.tick());
        assert_eq!(0, player.tick());
        assert!(player.is_end_of_file());
        assert_eq!(true, player.level());
        assert_eq!(0, player.period());
        assert_eq!(1200, player.settings().baud_rate);
        assert_eq!(0, player.tick());
        assert!(player.is_end_of_file());
        drop(player);
        assert_eq!(1200, settings.baud_rate);
    }

    #[test]
    fn tape_player_restores_settings_when_abandoned() {
        let mut settings = Settings::with_baud_rate(1200);
        {
            let mut player = TapePlayer::start_with(Countdown { count: 10, ..Default::default() }, &mut settings);
            assert_eq!(100, player.tick());
            assert_eq!(600, player.settings().baud_rate);
        }
        assert_eq!(1200, settings.baud_rate);

        let mut player = TapePlayer::start_with(Countdown { count: 10, ..Default::default() }, &mut settings);
        assert_eq!(2, player.by_ref().take(2).count());
        player.stop();
        assert_eq!(PlayerStatus::Idle, player.status());
        assert_eq!(1200, player.settings().baud_rate);
        assert!(player.get_ref().is_done());
        assert_eq!(None, player.next());
    }

    #[test]
    fn tape_player_iterates() {
        let mut settings = Settings::default();
        let player = TapePlayer::start_with(Countdown { count: 5, ..Default::default() }, &mut settings);
        assert_eq!(vec![100; 5], player.map(|p| p.get()).collect::<Vec<_>>());
    }
}
