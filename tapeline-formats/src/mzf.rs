/*
    Copyright (C) 2026  TAPELINE authors

    This file is part of TAPELINE, a Rust library for playing back legacy cassette images.

    For the full copyright notice, see the lib.rs file of tapeline-core.
*/
/*! **MZF** Sharp MZ cassette image signal encoding.

# MZF format

An *MZF* file consists of a 128 byte [header][MzfHeader] followed by the file body. The length of
the body is stored in the header at offset 18 (LSB first).

# The tape signal

The Sharp MZ tape signal is made of *pulses*, each one a high (*UP*) interval followed by
a low (*DOWN*) interval. A long pulse encodes a bit value 1 and a short one a bit value 0.

| pulse | UP                                       | DOWN                                         |
|-------|------------------------------------------|----------------------------------------------|
| long  | [LONG_UP_PERIOD][consts::LONG_UP_PERIOD]   | [LONG_DOWN_PERIOD][consts::LONG_DOWN_PERIOD]   |
| short | [SHORT_UP_PERIOD][consts::SHORT_UP_PERIOD] | [SHORT_DOWN_PERIOD][consts::SHORT_DOWN_PERIOD] |

Each byte is sent as a long leader pulse followed by 8 data pulses, the most significant bit first.
Each block of bytes is followed by a 16-bit checksum, the number of bits set in all the bytes of
the block modulo 65536, sent big-endian.

The whole signal is sent in [stages][MzfStage]:

```text
LGAP(22000 short) LTM(40 long, 40 short, 1 long) HDR CHK HDR CHK
SGAP(11000 short) STM(20 long, 20 short, 1 long) FILE CHK [FILE CHK]
```

The header is sent twice. The conventional second copy of the body is sent only with
[BodyCopies::Dual]; by default the playback ends after the first copy.
*/
use core::borrow::Borrow;
use core::num::NonZeroU32;
use std::io::{self, Error, Read, Seek};

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

#[allow(unused_imports)]
use log::{warn, debug, trace};

use tapeline_core::player::PulseEncoder;
use tapeline_core::settings::Settings;
use tapeline_core::source::{ReadByteEx, SeekToEx};

mod header;
mod stage;
pub use header::*;
pub use stage::*;

use consts::*;

pub mod consts {
    use core::num::NonZeroU32;
    use crate::nonzero;
    /// The *UP* interval of a long pulse in microseconds.
    pub const LONG_UP_PERIOD: NonZeroU32 = nonzero(464);
    /// The *DOWN* interval of a long pulse in microseconds.
    pub const LONG_DOWN_PERIOD: NonZeroU32 = nonzero(494);
    /// The *UP* interval of a short pulse in microseconds.
    pub const SHORT_UP_PERIOD: NonZeroU32 = nonzero(240);
    /// The *DOWN* interval of a short pulse in microseconds.
    pub const SHORT_DOWN_PERIOD: NonZeroU32 = nonzero(264);

    /// The number of short pulses of the long gap.
    pub const LGAP_PULSES: u16 = 22000;
    /// The number of short pulses of the short gap.
    pub const SGAP_PULSES: u16 = 11000;
    /// The number of long pulses of the long tapemark.
    pub const LTM_LONGS: u16 = 40;
    /// The number of short pulses of the long tapemark.
    pub const LTM_SHORTS: u16 = 40;
    /// The number of long pulses of the short tapemark.
    pub const STM_LONGS: u16 = 20;
    /// The number of short pulses of the short tapemark.
    pub const STM_SHORTS: u16 = 20;

    /// The offset of the file body in an *MZF* image.
    pub const BODY_OFFSET: u64 = super::HEADER_SIZE as u64;
}

/// Calculates the *MZF* block checksum from the given iterator of `u8`.
pub fn checksum<I: IntoIterator<Item=B>, B: Borrow<u8>>(iter: I) -> u16 {
    iter.into_iter().fold(0, |acc, x| checksum_add(acc, *x.borrow()))
}

#[inline(always)]
fn checksum_add(acc: u16, byte: u8) -> u16 {
    acc.wrapping_add(byte.count_ones() as u16)
}

/// Which half of a pulse is next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub enum PulseHalf {
    Up,
    Down
}

impl Default for PulseHalf {
    fn default() -> Self {
        PulseHalf::Up
    }
}

impl PulseHalf {
    /// Emits the next half of a long or a short pulse.
    ///
    /// Returns the interval and `true` if the pulse has been completed.
    #[inline]
    pub fn emit(&mut self, long: bool) -> (NonZeroU32, bool) {
        match self {
            PulseHalf::Up => {
                *self = PulseHalf::Down;
                (if long { LONG_UP_PERIOD } else { SHORT_UP_PERIOD }, false)
            }
            PulseHalf::Down => {
                *self = PulseHalf::Up;
                (if long { LONG_DOWN_PERIOD } else { SHORT_DOWN_PERIOD }, true)
            }
        }
    }
}

/// The position within the byte being sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct ByteWriter {
    /// The byte being sent, valid only if `buffered` is `true`.
    pub byte: u8,
    /// Is there a byte being sent?
    pub buffered: bool,
    /// Has the leader pulse of the byte been sent?
    pub leader_done: bool,
    /// Selects the bit of the next data pulse.
    pub mask: u8
}

impl Default for ByteWriter {
    fn default() -> Self {
        ByteWriter { byte: 0, buffered: false, leader_done: false, mask: 0x80 }
    }
}

impl ByteWriter {
    fn load(&mut self, byte: u8) {
        *self = ByteWriter { byte, buffered: true, ..Default::default() };
    }

    #[inline]
    fn pulse_is_long(&self) -> bool {
        !self.leader_done || self.byte & self.mask != 0
    }

    fn pulse_done(&mut self) {
        if !self.leader_done {
            self.leader_done = true;
        }
        else {
            self.mask >>= 1;
            if self.mask == 0 {
                self.buffered = false;
            }
        }
    }
}

/// The complete resumable state of [MzfEncoder].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub struct MzfState {
    /// The current stage.
    pub stage: MzfStage,
    /// The next half of the current pulse.
    pub half: PulseHalf,
    /// The number of pulses left in a pulse stage.
    pub countdown: u16,
    /// The byte being sent in a block stage.
    pub writer: ByteWriter,
    /// The number of bytes taken from the header or a checksum.
    pub cursor: u8,
    /// The number of body bytes left to be read.
    pub body_left: u16,
    /// The checksum of the body bytes read so far.
    pub body_checksum: u16,
}

impl Default for MzfState {
    fn default() -> Self {
        MzfState {
            stage: MzfStage::Done,
            half: PulseHalf::Up,
            countdown: 0,
            writer: ByteWriter::default(),
            cursor: 0,
            body_left: 0,
            body_checksum: 0
        }
    }
}

impl MzfState {
    /// Returns `true` if there are no more pulses to emit.
    pub fn is_done(&self) -> bool {
        self.stage.is_done()
    }
}

/// Encodes an *MZF* image read from an underlying reader as the Sharp MZ tape signal.
///
/// After [MzfEncoder::reset] (or [PulseEncoder::init]) the header is read and cached, and then each
/// call to [Iterator::next] (or [PulseEncoder::process]) emits one half of a pulse.
///
/// If the header can't be read in whole, the encoder is done right away. If the image is
/// shorter than the length declared in the header, the body ends early and its checksum covers
/// only the bytes that were actually read. A read or seek error ends the playback and can be
/// inspected with [MzfEncoder::err].
#[derive(Debug)]
pub struct MzfEncoder<R> {
    rd: R,
    state: MzfState,
    copies: BodyCopies,
    header: [u8; HEADER_SIZE],
    info: Option<MzfHeader>,
    header_checksum: u16,
    err: Option<Error>,
}

impl<R> MzfEncoder<R> {
    /// Creates a new `MzfEncoder` from a given reader.
    ///
    /// The encoder is done until it's [reset][MzfEncoder::reset].
    pub fn new(rd: R) -> Self {
        MzfEncoder {
            rd,
            state: MzfState::default(),
            copies: BodyCopies::default(),
            header: [0; HEADER_SIZE],
            info: None,
            header_checksum: 0,
            err: None
        }
    }
    /// Sets the number of copies of the file body to be sent.
    pub fn with_body_copies(mut self, copies: BodyCopies) -> Self {
        self.copies = copies;
        self
    }
    /// Allows to manually assign a `state`, e.g. to resume a suspended playback.
    ///
    /// The header should already be cached and the underlying reader positioned just after the
    /// last body byte that `state` has read.
    pub fn with_state(mut self, state: MzfState) -> Self {
        self.state = state;
        self
    }
    /// Returns the number of copies of the file body being sent.
    pub fn body_copies(&self) -> BodyCopies {
        self.copies
    }
    /// Returns a reference to the current state.
    pub fn state(&self) -> &MzfState {
        &self.state
    }
    /// Returns the current stage.
    pub fn stage(&self) -> MzfStage {
        self.state.stage
    }
    /// Returns the parsed header if it has been read.
    pub fn header(&self) -> Option<&MzfHeader> {
        self.info.as_ref()
    }
    /// Returns the cached raw header.
    pub fn header_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.header
    }
    /// Returns the checksum of the header.
    pub fn header_checksum(&self) -> u16 {
        self.header_checksum
    }
    /// Returns the checksum of the body bytes read so far.
    pub fn body_checksum(&self) -> u16 {
        self.state.body_checksum
    }
    /// Returns the length of the body declared in the header.
    pub fn file_length(&self) -> u16 {
        self.info.map(|info| info.length).unwrap_or(0)
    }
    /// Returns an error from the underlying reader if there was one.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }
    /// Takes the error from the underlying reader out of the encoder.
    pub fn take_err(&mut self) -> Option<Error> {
        self.err.take()
    }
    /// Returns `true` if there are no more pulses to emit.
    pub fn is_done(&self) -> bool {
        self.state.is_done()
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

    fn checksum_byte(&mut self, checksum: u16) -> Option<u8> {
        let byte = match self.state.cursor {
            0 => (checksum >> 8) as u8,
            1 => checksum as u8,
            _ => return None
        };
        self.state.cursor += 1;
        Some(byte)
    }
}

impl<R: Read + Seek> MzfEncoder<R> {
    /// Reads and caches the header and sets the state at the beginning of the long gap.
    ///
    /// If the header can't be read in whole, the state becomes [MzfStage::Done].
    pub fn reset(&mut self) {
        self.err = None;
        self.info = None;
        self.header = [0; HEADER_SIZE];
        self.header_checksum = 0;
        self.state = MzfState::default();
        match self.load_header() {
            Ok(true) => self.enter(MzfStage::LongGap),
            Ok(false) => {
                warn!("MZF: the header is incomplete");
            }
            Err(error) => {
                warn!("MZF: can't read the header: {}", error);
                self.err = Some(error);
            }
        }
    }

    fn load_header(&mut self) -> io::Result<bool> {
        self.rd.seek_to(0)?;
        if self.rd.read_exact_or_to_end(&mut self.header)? != HEADER_SIZE {
            self.header = [0; HEADER_SIZE];
            return Ok(false)
        }
        let info = parse_mzf_header(&self.header)
                   .map_err(|e| Error::new(io::ErrorKind::InvalidData, e))?;
        debug!("MZF: {}", info);
        self.header_checksum = checksum(&self.header[..]);
        self.info = Some(info);
        self.rd.seek_to(BODY_OFFSET)?;
        Ok(true)
    }

    fn next_stage(&mut self) {
        let stage = self.state.stage.next(self.copies);
        self.enter(stage);
    }

    fn enter(&mut self, stage: MzfStage) {
        trace!("MZF: {:?} -> {:?}", self.state.stage, stage);
        self.state.stage = stage;
        self.state.half = PulseHalf::Up;
        self.state.writer = ByteWriter::default();
        self.state.cursor = 0;
        match stage.kind() {
            StageKind::Pulses { count, .. } => {
                self.state.countdown = count;
            }
            StageKind::Block(source) => {
                if source == BlockSource::Body {
                    if let Err(error) = self.rd.seek_to(BODY_OFFSET) {
                        warn!("MZF: can't seek to the body: {}", error);
                        self.err = Some(error);
                        self.state.stage = MzfStage::Done;
                        return
                    }
                    self.state.body_left = self.file_length();
                    self.state.body_checksum = 0;
                }
                if self.block_exhausted(source) {
                    self.next_stage();
                }
            }
            StageKind::Done => {
                debug!("MZF: playback finished");
            }
        }
    }

    /// Returns `true` if all bytes of the block are known to have been taken.
    ///
    /// A body shorter than declared is detected only when reading past its end.
    fn block_exhausted(&self, source: BlockSource) -> bool {
        match source {
            BlockSource::Header => self.state.cursor as usize >= HEADER_SIZE,
            BlockSource::HeaderChecksum|
            BlockSource::BodyChecksum => self.state.cursor >= 2,
            BlockSource::Body => self.state.body_left == 0
        }
    }

    fn next_block_byte(&mut self, source: BlockSource) -> io::Result<Option<u8>> {
        Ok(match source {
            BlockSource::Header => {
                let byte = self.header.get(self.state.cursor as usize).copied();
                if byte.is_some() {
                    self.state.cursor += 1;
                }
                byte
            }
            BlockSource::HeaderChecksum => self.checksum_byte(self.header_checksum),
            BlockSource::BodyChecksum => self.checksum_byte(self.state.body_checksum),
            BlockSource::Body => {
                if self.state.body_left == 0 {
                    return Ok(None)
                }
                match self.rd.read_byte()? {
                    Some(byte) => {
                        self.state.body_left -= 1;
                        self.state.body_checksum = checksum_add(self.state.body_checksum, byte);
                        Some(byte)
                    }
                    None => {
                        debug!("MZF: the body is {} bytes short", self.state.body_left);
                        None
                    }
                }
            }
        })
    }
}

impl<R: Read + Seek> Iterator for MzfEncoder<R> {
    type Item = NonZeroU32;

    fn next(&mut self) -> Option<NonZeroU32> {
        loop {
            match self.state.stage.kind() {
                StageKind::Pulses { long, .. } => {
                    let (period, complete) = self.state.half.emit(long);
                    if complete {
                        self.state.countdown = self.state.countdown.saturating_sub(1);
                        if self.state.countdown == 0 {
                            self.next_stage();
                        }
                    }
                    return Some(period)
                }
                StageKind::Block(source) => {
                    if !self.state.writer.buffered {
                        match self.next_block_byte(source) {
                            Ok(Some(byte)) => self.state.writer.load(byte),
                            Ok(None) => {
                                self.next_stage();
                                continue
                            }
                            Err(error) => {
                                warn!("MZF: read error: {}", error);
                                self.err = Some(error);
                                self.enter(MzfStage::Done);
                                return None
                            }
                        }
                    }
                    let (period, complete) = self.state.half.emit(self.state.writer.pulse_is_long());
                    if complete {
                        self.state.writer.pulse_done();
                        if !self.state.writer.buffered && self.block_exhausted(source) {
                            self.next_stage();
                        }
                    }
                    return Some(period)
                }
                StageKind::Done => return None
            }
        }
    }
}

impl<R: Read + Seek> PulseEncoder for MzfEncoder<R> {
    fn init(&mut self, _settings: &mut Settings) {
        self.reset();
    }

    fn process(&mut self, _settings: &mut Settings) -> Option<NonZeroU32> {
        self.next()
    }

    fn is_done(&self) -> bool {
        self.state.is_done()
    }

    fn teardown(&mut self, _settings: &mut Settings) {
        if !self.state.is_done() {
            self.enter(MzfStage::Done);
        }
    }
}
