//! # Logging macros
//!
//! Forward to `defmt` when the `defmt` feature is enabled, and otherwise
//! evaluate nothing (the arguments are borrowed so they still count as used).
//! Host builds therefore link without a defmt global logger.

// -----------------------------------------------------------------------------
// Licence Statement
// -----------------------------------------------------------------------------
// Copyright (c) Jonathan 'theJPster' Pallant and the Neotron Developers, 2021
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.
// -----------------------------------------------------------------------------

#![allow(unused_macros)]

macro_rules! trace {
	($s:literal $(, $x:expr)* $(,)?) => {
		{
			#[cfg(feature = "defmt")]
			::defmt::trace!($s $(, $x)*);
			#[cfg(not(feature = "defmt"))]
			let _ = ($( & $x ),*);
		}
	};
}

macro_rules! debug {
	($s:literal $(, $x:expr)* $(,)?) => {
		{
			#[cfg(feature = "defmt")]
			::defmt::debug!($s $(, $x)*);
			#[cfg(not(feature = "defmt"))]
			let _ = ($( & $x ),*);
		}
	};
}

macro_rules! info {
	($s:literal $(, $x:expr)* $(,)?) => {
		{
			#[cfg(feature = "defmt")]
			::defmt::info!($s $(, $x)*);
			#[cfg(not(feature = "defmt"))]
			let _ = ($( & $x ),*);
		}
	};
}

macro_rules! warn {
	($s:literal $(, $x:expr)* $(,)?) => {
		{
			#[cfg(feature = "defmt")]
			::defmt::warn!($s $(, $x)*);
			#[cfg(not(feature = "defmt"))]
			let _ = ($( & $x ),*);
		}
	};
}

macro_rules! error {
	($s:literal $(, $x:expr)* $(,)?) => {
		{
			#[cfg(feature = "defmt")]
			::defmt::error!($s $(, $x)*);
			#[cfg(not(feature = "defmt"))]
			let _ = ($( & $x ),*);
		}
	};
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
