/*
    Copyright (C) 2026  TAPELINE authors

    This file is part of TAPELINE, a Rust library for playing back legacy cassette images.

    For the full copyright notice, see the lib.rs file of tapeline-core.
*/
use core::convert::TryFrom;
use std::borrow::Cow;
use std::fmt::{self, Write};

use memchr::memchr;
use nom::bytes::complete::take;
use nom::combinator::{map, map_res};
use nom::error::{context, VerboseError, VerboseErrorKind};
use nom::number::complete::{le_u16, le_u8};
use nom::sequence::tuple;
use nom::{Err, IResult, Offset};

/// The size of the *MZF* tape header in bytes.
pub const HEADER_SIZE: usize = 128;
/// The size of the file name field.
pub const NAME_SIZE: usize = 17;
/// The size of the comment field.
pub const COMMENT_SIZE: usize = 104;
/// The byte that terminates a file name shorter than [NAME_SIZE].
pub const NAME_TERMINATOR: u8 = 0x0D;
/// The offset of the little-endian file length field.
pub const LENGTH_OFFSET: usize = 18;

/// The type of the file described by [MzfHeader].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MzfAttribute {
    /// Machine code program.
    Obj,
    /// BASIC text.
    Btx,
    /// BASIC data.
    Bsd,
    /// BASIC read-after-run data.
    Brd,
    /// Read and branch.
    Rb,
    /// Anything else.
    Other(u8)
}

/// Represents the 128 byte *MZF* tape header.
///
/// | offset | size | description                            |
/// |--------|------|----------------------------------------|
/// |    0   |    1 | attribute (file type)                  |
/// |    1   |   17 | file name (terminated with `0x0D`)     |
/// |   18   |    2 | length of the file body (LSB first)    |
/// |   20   |    2 | load address (LSB first)               |
/// |   22   |    2 | execution address (LSB first)          |
/// |   24   |  104 | comment                                |
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MzfHeader {
    /// The type of the file.
    pub attribute: MzfAttribute,
    /// The raw file name.
    pub name: [u8; NAME_SIZE],
    /// The length of the file body following the header.
    pub length: u16,
    /// The memory address the body is loaded at.
    pub load_address: u16,
    /// The memory address the program is started from.
    pub exec_address: u16,
    /// The raw comment.
    pub comment: [u8; COMMENT_SIZE],
}

/// The type of the error returned by [parse_mzf_header].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MzfHeaderError {
    /// The parser backtrace and error messages.
    pub description: String,
}

impl From<u8> for MzfAttribute {
    fn from(attr: u8) -> Self {
        match attr {
            1 => MzfAttribute::Obj,
            2 => MzfAttribute::Btx,
            3 => MzfAttribute::Bsd,
            4 => MzfAttribute::Brd,
            5 => MzfAttribute::Rb,
            n => MzfAttribute::Other(n)
        }
    }
}

impl From<MzfAttribute> for u8 {
    fn from(attr: MzfAttribute) -> Self {
        match attr {
            MzfAttribute::Obj => 1,
            MzfAttribute::Btx => 2,
            MzfAttribute::Bsd => 3,
            MzfAttribute::Brd => 4,
            MzfAttribute::Rb => 5,
            MzfAttribute::Other(n) => n
        }
    }
}

impl fmt::Display for MzfAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MzfAttribute::Obj => f.write_str("OBJ"),
            MzfAttribute::Btx => f.write_str("BTX"),
            MzfAttribute::Bsd => f.write_str("BSD"),
            MzfAttribute::Brd => f.write_str("BRD"),
            MzfAttribute::Rb => f.write_str("RB"),
            MzfAttribute::Other(n) => write!(f, "${:02X}", n)
        }
    }
}

impl MzfHeader {
    /// Returns the file name bytes up to the terminator.
    pub fn name_bytes(&self) -> &[u8] {
        let len = memchr(NAME_TERMINATOR, &self.name).unwrap_or(NAME_SIZE);
        &self.name[..len]
    }
    /// Returns the file name as a string with non-printable characters replaced.
    pub fn name_str(&self) -> Cow<'_, str> {
        let name = self.name_bytes();
        if name.iter().all(|c| (0x20..0x7F).contains(c)) {
            String::from_utf8_lossy(name)
        }
        else {
            Cow::Owned(name.iter().map(|&c| {
                if (0x20..0x7F).contains(&c) { char::from(c) } else { '?' }
            }).collect())
        }
    }
}

impl fmt::Debug for MzfHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MzfHeader")
            .field("attribute", &self.attribute)
            .field("name", &self.name_str())
            .field("length", &self.length)
            .field("load_address", &self.load_address)
            .field("exec_address", &self.exec_address)
            .finish()
    }
}

impl fmt::Display for MzfHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: \"{}\" {} bytes LOAD ${:04X} EXEC ${:04X}",
            self.attribute, self.name_str(), self.length, self.load_address, self.exec_address)
    }
}

impl std::error::Error for MzfHeaderError {}
impl fmt::Display for MzfHeaderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

fn mzf_header(input: &[u8]) -> IResult<&[u8], MzfHeader, VerboseError<&[u8]>> {
    let (rest, (attribute, name, length, load_address, exec_address, comment)) = tuple((
        context("attribute", map(le_u8, MzfAttribute::from)),
        context("file name", map_res(take(NAME_SIZE), <[u8; NAME_SIZE]>::try_from)),
        context("file length", le_u16),
        context("load address", le_u16),
        context("execution address", le_u16),
        context("comment", map_res(take(COMMENT_SIZE), <[u8; COMMENT_SIZE]>::try_from)),
    ))(input)?;
    Ok((rest, MzfHeader { attribute, name, length, load_address, exec_address, comment }))
}

fn describe(input: &[u8], error: &VerboseError<&[u8]>) -> String {
    let mut res = String::new();
    for (i, (subs, kind)) in error.errors.iter().enumerate() {
        let offset = input.offset(subs);
        let _ = match kind {
            VerboseErrorKind::Context(s) => writeln!(&mut res,
                "{}: at byte {} of {}, {}", i, offset, input.len(), s),
            VerboseErrorKind::Nom(e) => writeln!(&mut res,
                "{}: at byte {} of {}, in {:?}", i, offset, input.len(), e),
            VerboseErrorKind::Char(c) => writeln!(&mut res,
                "{}: at byte {} of {}, expected {:?}", i, offset, input.len(), c),
        };
    }
    res
}

/// Parses the first [HEADER_SIZE] bytes of `data` as an *MZF* tape header.
pub fn parse_mzf_header(data: &[u8]) -> Result<MzfHeader, MzfHeaderError> {
    match mzf_header(data) {
        Ok((_, header)) => Ok(header),
        Err(Err::Error(e))|Err(Err::Failure(e)) => Err(MzfHeaderError { description: describe(data, &e) }),
        Err(Err::Incomplete(..)) => Err(MzfHeaderError { description: "incomplete header".into() })
    }
}
