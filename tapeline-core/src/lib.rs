/*
    Copyright (C) 2026  TAPELINE authors

    This file is part of TAPELINE, a Rust library for playing back legacy cassette images.

    TAPELINE is free software: you can redistribute it and/or modify it under
    the terms of the GNU Lesser General Public License (LGPL) as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    TAPELINE is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
//! The core components of the TAPELINE library.
//!
//! This crate defines the seams between the tape signal encoders and the world around them:
//!
//! * [source] - helpers for pulling single bytes out of the underlying image reader,
//! * [settings] - the global playback configuration an encoder may temporarily override,
//! * [player] - the [PulseEncoder][player::PulseEncoder] trait and a reference tick driver.
pub mod player;
pub mod settings;
pub mod source;
