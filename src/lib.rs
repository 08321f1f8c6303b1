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
//! TAPELINE is a library for playing back legacy cassette tape images.
//!
//! A tape image is turned into a stream of signal half-periods, in microseconds, by one of the
//! encoders found in the [formats] module. The encoders are driven by the host's timing loop,
//! either directly through the [PulseEncoder][player::PulseEncoder] trait or via the
//! [TapePlayer][player::TapePlayer] helper.
//!
//! Supported images:
//!
//! * Mattel Aquarius *CAQ*, see [formats::caq],
//! * Sharp MZ *MZF* (also known as *MZT* or *M12*), see [formats::mzf].
pub use tapeline_core::{player, settings, source};

#[cfg(feature = "formats")]
pub use tapeline_formats as formats;
