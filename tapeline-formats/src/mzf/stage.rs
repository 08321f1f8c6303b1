/*
    Copyright (C) 2026  TAPELINE authors

    This file is part of TAPELINE, a Rust library for playing back legacy cassette images.

    For the full copyright notice, see the lib.rs file of tapeline-core.
*/
//! The stage transition table of the *MZF* tape signal.
#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use super::consts::*;

/// How many copies of the file body are sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub enum BodyCopies {
    /// Only one copy of the body is sent. Most loaders are happy with the first copy and the
    /// playback ends as soon as the body has been sent.
    Single,
    /// The body and its checksum are repeated as the format prescribes.
    Dual
}

impl Default for BodyCopies {
    fn default() -> Self {
        BodyCopies::Single
    }
}

/// The stages of the *MZF* tape signal in the order of transmission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
pub enum MzfStage {
    /// The long gap of short pulses.
    LongGap,
    /// The long pulses of the long tapemark.
    LongTapemarkLong,
    /// The short pulses of the long tapemark.
    LongTapemarkShort,
    /// The final long pulse of the long tapemark.
    LongTapemarkEnd,
    /// The 1st copy of the header.
    Header1,
    /// The checksum of the 1st copy of the header.
    HeaderChecksum1,
    /// The 2nd copy of the header.
    Header2,
    /// The checksum of the 2nd copy of the header.
    HeaderChecksum2,
    /// The short gap of short pulses.
    ShortGap,
    /// The long pulses of the short tapemark.
    ShortTapemarkLong,
    /// The short pulses of the short tapemark.
    ShortTapemarkShort,
    /// The final long pulse of the short tapemark.
    ShortTapemarkEnd,
    /// The 1st copy of the file body.
    Body1,
    /// The checksum of the 1st copy of the file body.
    BodyChecksum1,
    /// The 2nd copy of the file body, only with [BodyCopies::Dual].
    Body2,
    /// The checksum of the 2nd copy of the file body, only with [BodyCopies::Dual].
    BodyChecksum2,
    /// Emitting is done.
    Done
}

/// Where the bytes of a block stage come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockSource {
    /// The cached header.
    Header,
    /// The header checksum, big-endian.
    HeaderChecksum,
    /// The file body streamed from the image.
    Body,
    /// The body checksum, big-endian.
    BodyChecksum
}

/// What a stage emits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    /// A run of `count` pulses of the same length.
    Pulses {
        /// Are the pulses long?
        long: bool,
        /// The number of pulses.
        count: u16
    },
    /// Bytes of a block, each one a long leader pulse followed by 8 data pulses.
    Block(BlockSource),
    /// Nothing.
    Done
}

impl MzfStage {
    /// Returns what this stage emits.
    pub const fn kind(self) -> StageKind {
        use MzfStage::*;
        match self {
            LongGap            => StageKind::Pulses { long: false, count: LGAP_PULSES },
            LongTapemarkLong   => StageKind::Pulses { long: true,  count: LTM_LONGS },
            LongTapemarkShort  => StageKind::Pulses { long: false, count: LTM_SHORTS },
            LongTapemarkEnd    => StageKind::Pulses { long: true,  count: 1 },
            Header1|Header2    => StageKind::Block(BlockSource::Header),
            HeaderChecksum1|
            HeaderChecksum2    => StageKind::Block(BlockSource::HeaderChecksum),
            ShortGap           => StageKind::Pulses { long: false, count: SGAP_PULSES },
            ShortTapemarkLong  => StageKind::Pulses { long: true,  count: STM_LONGS },
            ShortTapemarkShort => StageKind::Pulses { long: false, count: STM_SHORTS },
            ShortTapemarkEnd   => StageKind::Pulses { long: true,  count: 1 },
            Body1|Body2        => StageKind::Block(BlockSource::Body),
            BodyChecksum1|
            BodyChecksum2      => StageKind::Block(BlockSource::BodyChecksum),
            Done               => StageKind::Done
        }
    }
    /// Returns the stage following this one.
    pub const fn next(self, copies: BodyCopies) -> MzfStage {
        use MzfStage::*;
        match self {
            LongGap            => LongTapemarkLong,
            LongTapemarkLong   => LongTapemarkShort,
            LongTapemarkShort  => LongTapemarkEnd,
            LongTapemarkEnd    => Header1,
            Header1            => HeaderChecksum1,
            HeaderChecksum1    => Header2,
            Header2            => HeaderChecksum2,
            HeaderChecksum2    => ShortGap,
            ShortGap           => ShortTapemarkLong,
            ShortTapemarkLong  => ShortTapemarkShort,
            ShortTapemarkShort => ShortTapemarkEnd,
            ShortTapemarkEnd   => Body1,
            Body1              => BodyChecksum1,
            BodyChecksum1      => match copies {
                BodyCopies::Single => Done,
                BodyCopies::Dual => Body2
            },
            Body2              => BodyChecksum2,
            BodyChecksum2|Done => Done
        }
    }
    /// Returns `true` if no more pulses are emitted.
    pub fn is_done(self) -> bool {
        self == MzfStage::Done
    }
    /// Returns `true` if emitting one of the gaps.
    pub fn is_gap(self) -> bool {
        matches!(self, MzfStage::LongGap|MzfStage::ShortGap)
    }
    /// Returns `true` if emitting one of the tapemarks.
    pub fn is_tapemark(self) -> bool {
        use MzfStage::*;
        matches!(self, LongTapemarkLong|LongTapemarkShort|LongTapemarkEnd|
                       ShortTapemarkLong|ShortTapemarkShort|ShortTapemarkEnd)
    }
    /// Returns `true` if emitting a copy of the header or its checksum.
    pub fn is_header(self) -> bool {
        use MzfStage::*;
        matches!(self, Header1|HeaderChecksum1|Header2|HeaderChecksum2)
    }
    /// Returns `true` if emitting a copy of the file body or its checksum.
    pub fn is_body(self) -> bool {
        use MzfStage::*;
        matches!(self, Body1|BodyChecksum1|Body2|BodyChecksum2)
    }
}
