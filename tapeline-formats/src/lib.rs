/*
    Copyright (C) 2026  TAPELINE authors

    This file is part of TAPELINE, a Rust library for playing back legacy cassette images.

    For the full copyright notice, see the lib.rs file of tapeline-core.
*/
//! Cassette image formats and their tape signal encoders.
//!
//! * [caq] - Mattel Aquarius **CAQ** images, a simple mark/space bit-cell encoding.
//! * [mzf] - Sharp MZ **MZF** images, a headered block encoding of asymmetric pulses.
//!
//! Both encoders implement [PulseEncoder][tapeline_core::player::PulseEncoder]. The [select]
//! module picks the right one for an image.
pub mod caq;
pub mod mzf;
pub mod select;

pub(crate) const fn nonzero(value: u32) -> core::num::NonZeroU32 {
    match core::num::NonZeroU32::new(value) {
        Some(nz) => nz,
        None => panic!("a zero interval")
    }
}
