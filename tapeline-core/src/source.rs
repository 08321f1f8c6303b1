/*
    Copyright (C) 2026  TAPELINE authors

    This file is part of TAPELINE, a Rust library for playing back legacy cassette images.

    For the full copyright notice, see the lib.rs file.
*/
//! Byte source helpers.
//!
//! Tape images are consumed through the standard [Read] and [Seek] interfaces. Anything that
//! implements [Read] (e.g. a [File][std::fs::File] or a [Cursor][std::io::Cursor]) can feed
//! an encoder that only streams bytes, while the encoders that revisit parts of the image
//! additionally require [Seek].
use std::io::{self, Read, Seek, SeekFrom};

/// A trait that extends [Read] with methods that ease pulling tape image data one unit at a time.
pub trait ReadByteEx: Read {
    /// Reads the next byte from the stream.
    ///
    /// Returns `Ok(None)` when the end of the stream has been reached. Reads interrupted
    /// with [io::ErrorKind::Interrupted] are retried.
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        loop {
            match self.read(core::slice::from_mut(&mut byte)) {
                Ok(0) => return Ok(None),
                Ok(..) => return Ok(Some(byte)),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
    }
    /// Reads bytes to fill `buf` or until EOF. If successful, returns the total number of bytes read.
    ///
    /// Unlike [Read::read_exact] reaching the end of the stream before `buf` is filled is not an error.
    /// In this instance the returned number is less than the length of `buf`.
    fn read_exact_or_to_end(&mut self, mut buf: &mut [u8]) -> io::Result<usize> {
        let orig_len = buf.len();
        while !buf.is_empty() {
            match self.read(buf) {
                Ok(0) => break,
                Ok(n) => buf = &mut buf[n..],
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        Ok(orig_len - buf.len())
    }
}

impl<R: Read + ?Sized> ReadByteEx for R {}

/// A trait that extends [Seek] with absolute positioning of the read cursor.
pub trait SeekToEx: Seek {
    /// Repositions the read cursor at the absolute `offset` from the start of the stream.
    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        let pos = self.seek(SeekFrom::Start(offset))?;
        if pos == offset {
            Ok(())
        }
        else {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "failed to reposition the read cursor"))
        }
    }
}

impl<S: Seek + ?Sized> SeekToEx for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Stuttering<R> {
        inner: R,
        interrupt: bool
    }

    impl<R: Read> Read for Stuttering<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.interrupt = !self.interrupt;
            if self.interrupt {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "again"))
            }
            let len = buf.len().min(1);
            self.inner.read(&mut buf[..len])
        }
    }

    #[test]
    fn read_byte_works() {
        let mut rd = Cursor::new([1u8, 2]);
        assert_eq!(Some(1), rd.read_byte().unwrap());
        assert_eq!(Some(2), rd.read_byte().unwrap());
        assert_eq!(None, rd.read_byte().unwrap());
        assert_eq!(None, rd.read_byte().unwrap());

        let mut rd = Stuttering { inner: Cursor::new([7u8]), interrupt: false };
        assert_eq!(Some(7), rd.read_byte().unwrap());
        assert_eq!(None, rd.read_byte().unwrap());
    }

    #[test]
    fn read_exact_or_to_end_works() {
        let mut rd = Stuttering { inner: Cursor::new([1u8, 2, 3]), interrupt: false };
        let mut buf = [0u8; 4];
        assert_eq!(3, rd.read_exact_or_to_end(&mut buf).unwrap());
        assert_eq!([1, 2, 3, 0], buf);
        assert_eq!(0, rd.read_exact_or_to_end(&mut buf).unwrap());
    }

    #[test]
    fn seek_to_works() {
        let mut rd = Cursor::new([1u8, 2, 3]);
        rd.seek_to(2).unwrap();
        assert_eq!(Some(3), rd.read_byte().unwrap());
        rd.seek_to(0).unwrap();
        assert_eq!(Some(1), rd.read_byte().unwrap());
    }
}
