/*
    Copyright (C) 2026  TAPELINE authors

    This file is part of TAPELINE, a Rust library for playing back legacy cassette images.

    For the full copyright notice, see the lib.rs file of tapeline-core.
*/
//! Selecting an encoder for a tape image.
//!
//! ```no_run
//! use tapeline_core::{player::TapePlayer, settings::Settings};
//! use tapeline_formats::select::*;
//!
//! let path = std::path::Path::new("game.mzf");
//! let format = TapeFormat::from_path(path).expect("unknown image");
//! let encoder = format.encoder(std::fs::File::open(path)?);
//!
//! let mut settings = Settings::default();
//! let mut player = TapePlayer::start_with(encoder, &mut settings);
//! while player.is_playing() {
//!     let _half_period = player.tick();
//!     // wait for `_half_period` microseconds, then toggle the output
//! }
//! # Ok::<(), std::io::Error>(())
//! ```
use core::fmt;
use core::num::NonZeroU32;
use std::ffi::OsStr;
use std::io::{Error, Read, Seek};
use std::path::Path;

use tapeline_core::player::PulseEncoder;
use tapeline_core::settings::Settings;

use crate::caq::CaqEncoder;
use crate::mzf::MzfEncoder;

/// The supported tape image formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TapeFormat {
    /// Mattel Aquarius *CAQ* image.
    Caq,
    /// Sharp MZ *MZF* image.
    Mzf
}

/// One of the supported encoders.
#[derive(Debug)]
pub enum AnyEncoder<R> {
    Caq(CaqEncoder<R>),
    Mzf(MzfEncoder<R>)
}

impl TapeFormat {
    /// Recognizes a format from a file name extension, case insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "caq" => Some(TapeFormat::Caq),
            "mzf"|"mzt"|"m12" => Some(TapeFormat::Mzf),
            _ => None
        }
    }
    /// Recognizes a format from a file path's extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref().extension().and_then(OsStr::to_str).and_then(Self::from_extension)
    }
    /// Creates an encoder of this format from the given reader.
    pub fn encoder<R>(self, rd: R) -> AnyEncoder<R> {
        match self {
            TapeFormat::Caq => AnyEncoder::Caq(CaqEncoder::new(rd)),
            TapeFormat::Mzf => AnyEncoder::Mzf(MzfEncoder::new(rd))
        }
    }
}

impl fmt::Display for TapeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TapeFormat::Caq => f.write_str("CAQ"),
            TapeFormat::Mzf => f.write_str("MZF")
        }
    }
}

impl<R> AnyEncoder<R> {
    /// Returns the format of the encoder.
    pub fn format(&self) -> TapeFormat {
        match self {
            AnyEncoder::Caq(..) => TapeFormat::Caq,
            AnyEncoder::Mzf(..) => TapeFormat::Mzf
        }
    }
    /// Returns an error from the underlying reader if there was one.
    pub fn err(&self) -> Option<&Error> {
        match self {
            AnyEncoder::Caq(enc) => enc.err(),
            AnyEncoder::Mzf(enc) => enc.err()
        }
    }
    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        match self {
            AnyEncoder::Caq(enc) => enc.into_inner(),
            AnyEncoder::Mzf(enc) => enc.into_inner()
        }
    }
}

impl<R> From<CaqEncoder<R>> for AnyEncoder<R> {
    fn from(enc: CaqEncoder<R>) -> Self {
        AnyEncoder::Caq(enc)
    }
}

impl<R> From<MzfEncoder<R>> for AnyEncoder<R> {
    fn from(enc: MzfEncoder<R>) -> Self {
        AnyEncoder::Mzf(enc)
    }
}

impl<R: Read + Seek> PulseEncoder for AnyEncoder<R> {
    fn init(&mut self, settings: &mut Settings) {
        match self {
            AnyEncoder::Caq(enc) => enc.init(settings),
            AnyEncoder::Mzf(enc) => enc.init(settings)
        }
    }

    fn process(&mut self, settings: &mut Settings) -> Option<NonZeroU32> {
        match self {
            AnyEncoder::Caq(enc) => enc.process(settings),
            AnyEncoder::Mzf(enc) => enc.process(settings)
        }
    }

    fn is_done(&self) -> bool {
        match self {
            AnyEncoder::Caq(enc) => PulseEncoder::is_done(enc),
            AnyEncoder::Mzf(enc) => PulseEncoder::is_done(enc)
        }
    }

    fn teardown(&mut self, settings: &mut Settings) {
        match self {
            AnyEncoder::Caq(enc) => enc.teardown(settings),
            AnyEncoder::Mzf(enc) => enc.teardown(settings)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tape_format_works() {
        assert_eq!(Some(TapeFormat::Caq), TapeFormat::from_extension("CAQ"));
        assert_eq!(Some(TapeFormat::Mzf), TapeFormat::from_extension("mzt"));
        assert_eq!(Some(TapeFormat::Mzf), TapeFormat::from_path("games/Pacman.M12"));
        assert_eq!(None, TapeFormat::from_path("games/manic.tap"));
        assert_eq!(None, TapeFormat::from_path("games/noext"));
        assert_eq!("MZF", TapeFormat::Mzf.to_string());
    }

    #[test]
    fn any_encoder_works() {
        let mut settings = Settings::with_baud_rate(1200);
        let mut enc = TapeFormat::Caq.encoder(Cursor::new(vec![0x00u8]));
        assert_eq!(TapeFormat::Caq, enc.format());
        enc.init(&mut settings);
        assert_eq!(600, settings.baud_rate);
        let mut count = 0;
        while enc.process(&mut settings).is_some() {
            count += 1;
        }
        assert_eq!(44, count);
        assert!(enc.is_done());
        assert_eq!(1200, settings.baud_rate);
        assert!(enc.err().is_none());
        assert_eq!(1, enc.into_inner().position());

        let mut enc = TapeFormat::Mzf.encoder(Cursor::new(vec![0u8; 10]));
        assert_eq!(TapeFormat::Mzf, enc.format());
        enc.init(&mut settings);
        assert!(enc.is_done());
        assert_eq!(None, enc.process(&mut settings));
        assert_eq!(1200, settings.baud_rate);
    }
}
