/*
    Copyright (C) 2026  TAPELINE authors

    This file is part of TAPELINE, a Rust library for playing back legacy cassette images.

    For the full copyright notice, see the lib.rs file of tapeline-core.
*/
/*! **CAQ** Mattel Aquarius cassette image signal encoding.

A *CAQ* file is a raw dump of the bytes the Aquarius saves to tape, so the encoder just streams it.

Each byte is sent as a serial frame: 1 start bit (space), 8 data bits with the most significant
bit first, and 2 stop bits (mark). Each bit is encoded as 2 full cycles of a square wave:

| bit           | full wave | half-period                          |
|---------------|-----------|--------------------------------------|
| 1 (mark)      | ~0.544ms  | [MARK_HALF_PERIOD][consts::MARK_HALF_PERIOD]   |
| 0 (space)     | ~1.088ms  | [SPACE_HALF_PERIOD][consts::SPACE_HALF_PERIOD] |

The timing doesn't depend on the configured baud rate, the Aquarius always runs its tape at
about 600 baud. For the duration of the playback the global [Settings::baud_rate] is forced to
[BAUD_RATE][consts::BAUD_RATE] and restored when the end of the image is reached, or when the
encoder is [torn down][PulseEncoder::teardown].
*/
use core::num::NonZeroU32;
use std::io::{Error, Read};

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

#[allow(unused_imports)]
use log::{warn, debug, trace};

use tapeline_core::player::PulseEncoder;
use tapeline_core::settings::{BaudRateOverride, Settings};
use tapeline_core::source::ReadByteEx;

use consts::*;

pub mod consts {
    use core::num::NonZeroU32;
    use crate::nonzero;
    /// The half-period of a bit value 1 (mark) wave in microseconds.
    pub const MARK_HALF_PERIOD: NonZeroU32 = nonzero(272);
    /// The half-period of a bit value 0 (space) wave in microseconds.
    pub const SPACE_HALF_PERIOD: NonZeroU32 = nonzero(544);
    /// The number of half-periods per each bit.
    pub const HALF_PERIODS_PER_BIT: u8 = 4;
    /// The baud rate forced during the playback.
    pub const BAUD_RATE: u32 = 600;
}

/// The position of [CaqEncoder] within a byte frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub enum CaqStage {
    /// The next bit is the start bit.
    StartBit,
    /// The next bit is one of the data bits.
    DataBits,
    /// The next bit is the 1st stop bit.
    StopBit1,
    /// The next bit is the 2nd stop bit.
    StopBit2,
    /// Emitting is done.
    Done
}

/// The complete resumable state of [CaqEncoder].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct CaqState {
    /// The current stage.
    pub stage: CaqStage,
    /// The byte being sent, valid only if `buffered` is `true`.
    pub byte: u8,
    /// Is there a byte being sent?
    pub buffered: bool,
    /// The index of the next data bit to be sent, from 7 down to 0.
    pub bit: u8,
    /// How many half-periods of the current bit are still to be emitted.
    pub halves_left: u8,
    /// The half-period of the current bit.
    pub half_period: NonZeroU32,
}

impl Default for CaqState {
    fn default() -> Self {
        CaqState {
            stage: CaqStage::Done,
            byte: 0,
            buffered: false,
            bit: 7,
            halves_left: 0,
            half_period: SPACE_HALF_PERIOD
        }
    }
}

impl CaqState {
    /// Returns the state of an encoder about to start a playback.
    pub fn start() -> Self {
        CaqState { stage: CaqStage::StartBit, ..Default::default() }
    }
    /// Returns `true` if there are no more half-periods to emit.
    pub fn is_done(&self) -> bool {
        self.stage == CaqStage::Done
    }
}

/// Encodes bytes read from an underlying reader as the Aquarius cassette signal.
///
/// Call [PulseEncoder::init] first, then [PulseEncoder::process] once per tick. Each call emits
/// one half-period until the reader reaches the end of the stream. A read error is treated
/// as the end of the stream; it can be inspected with [CaqEncoder::err].
#[derive(Debug)]
pub struct CaqEncoder<R> {
    rd: R,
    state: CaqState,
    baud: BaudRateOverride,
    err: Option<Error>,
}

impl<R> CaqEncoder<R> {
    /// Creates a new `CaqEncoder` from a given [Reader][Read].
    ///
    /// The encoder is done until it's [initialized][PulseEncoder::init].
    pub fn new(rd: R) -> Self {
        CaqEncoder { rd, state: CaqState::default(), baud: BaudRateOverride::default(), err: None }
    }
    /// Returns the current state.
    pub fn state(&self) -> &CaqState {
        &self.state
    }
    /// Allows to manually assign a `state`, e.g. to resume a suspended playback.
    ///
    /// The underlying reader should be positioned just after the last byte that `state` has fetched.
    pub fn with_state(mut self, state: CaqState) -> Self {
        self.state = state;
        self
    }
    /// Returns the state of the baud rate override.
    pub fn baud_override(&self) -> &BaudRateOverride {
        &self.baud
    }
    /// Returns an error from the underlying reader if there was one.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }
    /// Takes the error from the underlying reader out of the encoder.
    pub fn take_err(&mut self) -> Option<Error> {
        self.err.take()
    }
    /// Returns a mutable reference to the inner reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.rd
    }
    /// Returns a shared reference to the inner reader.
    pub fn get_ref(&self) -> &R {
        &self.rd
    }
    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.rd
    }

    #[inline]
    fn begin_bit(&mut self, bit_one: bool) -> NonZeroU32 {
        let half_period = if bit_one { MARK_HALF_PERIOD } else { SPACE_HALF_PERIOD };
        self.state.half_period = half_period;
        self.state.halves_left = HALF_PERIODS_PER_BIT - 1;
        half_period
    }
}

impl<R: Read> CaqEncoder<R> {
    fn fetch_byte(&mut self) -> Option<u8> {
        match self.rd.read_byte() {
            Ok(byte) => byte,
            Err(error) => {
                warn!("CAQ: read error: {}", error);
                self.err = Some(error);
                None
            }
        }
    }
}

impl<R: Read> PulseEncoder for CaqEncoder<R> {
    fn init(&mut self, settings: &mut Settings) {
        self.state = CaqState::start();
        self.err = None;
        self.baud.apply(settings, BAUD_RATE);
    }

    fn process(&mut self, settings: &mut Settings) -> Option<NonZeroU32> {
        if self.state.halves_left != 0 {
            self.state.halves_left -= 1;
            return Some(self.state.half_period)
        }

        if !self.state.buffered && !self.state.is_done() {
            match self.fetch_byte() {
                Some(byte) => {
                    self.state.byte = byte;
                    self.state.buffered = true;
                    self.state.bit = 7;
                    self.state.stage = CaqStage::StartBit;
                }
                None => {
                    trace!("CAQ: end of stream");
                    self.state.stage = CaqStage::Done;
                }
            }
        }

        let bit_one = match self.state.stage {
            CaqStage::StartBit => {
                self.state.stage = CaqStage::DataBits;
                false
            }
            CaqStage::DataBits => {
                let bit_one = self.state.byte & (1 << self.state.bit) != 0;
                if self.state.bit == 0 {
                    self.state.stage = CaqStage::StopBit1;
                }
                else {
                    self.state.bit -= 1;
                }
                bit_one
            }
            CaqStage::StopBit1 => {
                self.state.stage = CaqStage::StopBit2;
                true
            }
            CaqStage::StopBit2 => {
                self.state.buffered = false;
                self.state.stage = CaqStage::StartBit;
                true
            }
            CaqStage::Done => {
                if self.baud.restore(settings) {
                    debug!("CAQ: playback finished");
                }
                return None
            }
        };
        Some(self.begin_bit(bit_one))
    }

    fn is_done(&self) -> bool {
        self.state.is_done()
    }

    fn teardown(&mut self, settings: &mut Settings) {
        self.baud.restore(settings);
        self.state = CaqState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    fn bits_to_periods(bits: &[u8]) -> Vec<NonZeroU32> {
        bits.iter().flat_map(|&bit| {
            let period = if bit == 1 { MARK_HALF_PERIOD } else { SPACE_HALF_PERIOD };
            std::iter::repeat(period).take(HALF_PERIODS_PER_BIT as usize)
        }).collect()
    }

    fn drain<R: Read>(enc: &mut CaqEncoder<R>, settings: &mut Settings) -> Vec<NonZeroU32> {
        let mut res = Vec::new();
        while let Some(period) = enc.process(settings) {
            assert_eq!(BAUD_RATE, settings.baud_rate);
            res.push(period);
        }
        res
    }

    #[test]
    fn caq_encoder_frames_a_byte() {
        let mut settings = Settings::with_baud_rate(1200);
        let mut enc = CaqEncoder::new(Cursor::new([0xA5u8]));
        enc.init(&mut settings);
        assert_eq!(BAUD_RATE, settings.baud_rate);
        let periods = drain(&mut enc, &mut settings);
        assert_eq!(44, periods.len());
        assert_eq!(bits_to_periods(&[0, 1,0,1,0,0,1,0,1, 1,1]), periods);
        assert!(enc.is_done());
        assert_eq!(1200, settings.baud_rate);
        assert!(enc.err().is_none());
    }

    #[test]
    fn caq_encoder_streams_bytes() {
        let mut settings = Settings::default();
        let mut enc = CaqEncoder::new(Cursor::new([0x00u8, 0xFF, 0x81]));
        enc.init(&mut settings);
        let periods = drain(&mut enc, &mut settings);
        assert_eq!(3 * 11 * 4, periods.len());
        assert_eq!(bits_to_periods(&[
            0, 0,0,0,0,0,0,0,0, 1,1,
            0, 1,1,1,1,1,1,1,1, 1,1,
            0, 1,0,0,0,0,0,0,1, 1,1,
        ]), periods);
        assert_eq!(3, enc.get_ref().position());
    }

    #[test]
    fn caq_encoder_done_is_idempotent() {
        let mut settings = Settings::with_baud_rate(2400);
        let mut enc = CaqEncoder::new(Cursor::new([0x55u8]));
        enc.init(&mut settings);
        drain(&mut enc, &mut settings);
        let state = *enc.state();
        assert_eq!(CaqStage::Done, state.stage);
        for _ in 0..10 {
            settings.baud_rate = 4800;
            assert_eq!(None, enc.process(&mut settings));
            assert_eq!(4800, settings.baud_rate);
            assert_eq!(&state, enc.state());
        }
    }

    #[test]
    fn caq_encoder_empty_source() {
        let mut settings = Settings::with_baud_rate(1200);
        let mut enc = CaqEncoder::new(Cursor::new([0u8; 0]));
        enc.init(&mut settings);
        assert!(!enc.is_done());
        assert_eq!(600, settings.baud_rate);
        assert_eq!(None, enc.process(&mut settings));
        assert!(enc.is_done());
        assert_eq!(1200, settings.baud_rate);
        assert!(!enc.baud_override().is_active());
    }

    #[test]
    fn caq_encoder_repeated_init_keeps_saved_baud_rate() {
        let mut settings = Settings::with_baud_rate(1200);
        let mut enc = CaqEncoder::new(Cursor::new([1u8, 2]));
        enc.init(&mut settings);
        enc.init(&mut settings);
        assert_eq!(Some(1200), enc.baud_override().saved());
        drain(&mut enc, &mut settings);
        assert_eq!(1200, settings.baud_rate);
        // a replay re-applies the override
        enc.get_mut().set_position(0);
        enc.init(&mut settings);
        assert_eq!(600, settings.baud_rate);
        assert_eq!(88, drain(&mut enc, &mut settings).len());
        assert_eq!(1200, settings.baud_rate);
    }

    #[test]
    fn caq_encoder_teardown_restores_baud_rate() {
        let mut settings = Settings::with_baud_rate(1200);
        let mut enc = CaqEncoder::new(Cursor::new([0xA5u8, 0x5A]));
        enc.init(&mut settings);
        for _ in 0..13 {
            assert!(enc.process(&mut settings).is_some());
        }
        assert_eq!(600, settings.baud_rate);
        enc.teardown(&mut settings);
        assert_eq!(1200, settings.baud_rate);
        assert!(enc.is_done());
        assert_eq!(None, enc.process(&mut settings));
        enc.teardown(&mut settings);
        assert_eq!(1200, settings.baud_rate);
    }

    struct Failing(usize);

    impl Read for Failing {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.0 == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "broken tape"))
            }
            self.0 -= 1;
            buf[0] = 0xFF;
            Ok(1)
        }
    }

    #[test]
    fn caq_encoder_read_error_ends_playback() {
        let mut settings = Settings::with_baud_rate(1200);
        let mut enc = CaqEncoder::new(Failing(1));
        enc.init(&mut settings);
        assert_eq!(44, drain(&mut enc, &mut settings).len());
        assert!(enc.is_done());
        assert_eq!(1200, settings.baud_rate);
        assert_eq!(io::ErrorKind::Other, enc.err().unwrap().kind());
        assert!(enc.take_err().is_some());
        assert!(enc.err().is_none());
    }

    #[cfg(feature = "snapshot")]
    #[test]
    fn caq_encoder_resumes_from_state() {
        let data = [0x12u8, 0x34, 0x56];
        let mut settings = Settings::default();
        let mut enc = CaqEncoder::new(Cursor::new(data));
        enc.init(&mut settings);
        let mut head = Vec::new();
        for _ in 0..50 {
            head.extend(enc.process(&mut settings));
        }
        let json = serde_json::to_string(enc.state()).unwrap();
        let position = enc.get_ref().position();
        assert_eq!(2, position);
        let tail = drain(&mut enc, &mut settings);

        let state: CaqState = serde_json::from_str(&json).unwrap();
        let mut rd = Cursor::new(data);
        rd.set_position(position);
        let mut resumed = CaqEncoder::new(rd).with_state(state);
        let mut other = Settings::with_baud_rate(BAUD_RATE);
        assert_eq!(tail, drain(&mut resumed, &mut other));
        assert_eq!(3 * 44, head.len() + tail.len());
    }
}
