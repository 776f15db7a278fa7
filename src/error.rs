//! # Error types
//!
//! Configuration errors are fatal and only ever produced at start-up. Decode
//! and load errors are local to the image pipeline: the engine keeps
//! displaying whatever the framebuffer holds.

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

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use core::fmt;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Something is wrong with the mode descriptor or the engine configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
	/// The active resolution has a zero width or height.
	ZeroResolution,
	/// One of the eight timing phases has zero length.
	ZeroDuration,
	/// The timer tick rate is zero.
	ZeroTickRate,
	/// The decimation stride is zero, or does not divide the scan axis.
	InvalidStride {
		/// The requested stride
		stride: u16,
		/// Length of the axis it must divide
		axis_len: u16,
	},
	/// Half a timer tick is longer than the permitted drift per frame.
	TickTooCoarse {
		/// One timer tick, in nanoseconds
		tick_ns: u32,
		/// The permitted drift, in nanoseconds
		tolerance_ns: u32,
	},
	/// The framebuffer storage cannot hold the requested resolution.
	StorageTooSmall {
		/// Pixels required
		needed: usize,
		/// Pixels supplied
		available: usize,
	},
	/// The framebuffer scale shift leaves no pixels on one axis, or does not
	/// divide the resolution evenly.
	InvalidScale,
	/// Two framebuffers that must match have different sizes.
	SizeMismatch,
	/// A GPIO number is out of range or used twice.
	InvalidPin(u8),
	/// With one alarm per pixel, a pixel must last at least one timer tick.
	PixelTooShort,
	/// One frame spans more than half the range of the timer counter.
	FrameTooLong,
}

/// The image decoder could not make sense of its input.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
	/// The file does not start with a recognised signature.
	BadSignature,
	/// The header is internally inconsistent.
	InvalidHeader,
	/// Valid, but uses a compression or bit depth we do not handle.
	Unsupported,
	/// One row does not fit in the decoder's row buffer.
	RowTooLong {
		/// Bytes needed for one row
		needed: usize,
	},
	/// The stream ended before all the rows were read.
	Truncated,
	/// The byte source reported an error.
	Io,
}

/// The filesystem collaborator failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
	/// No such file, or the path is not one we can open.
	NotFound,
	/// The stream ended before the read was satisfied.
	EndOfFile,
	/// The underlying device reported an error.
	Io,
}

/// Why `load_image` failed.
///
/// In every case the framebuffer keeps whatever was written before the
/// failure; there is no rollback.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
	/// The byte source could not be opened. Nothing was written.
	Open,
	/// The decoder rejected the header or failed part-way through.
	Decode(DecodeError),
	/// The row callback stopped the decode (malformed scanline).
	Aborted,
	/// Writing to the preview surface failed, which stopped the decode.
	Preview,
	/// The last image loaded into the back buffer has not been shown yet.
	Busy,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::ZeroResolution => write!(f, "mode has a zero width or height"),
			ConfigError::ZeroDuration => write!(f, "mode has a zero-length timing phase"),
			ConfigError::ZeroTickRate => write!(f, "timer tick rate is zero"),
			ConfigError::InvalidStride { stride, axis_len } => {
				write!(f, "stride {} does not divide axis of {} pixels", stride, axis_len)
			}
			ConfigError::TickTooCoarse {
				tick_ns,
				tolerance_ns,
			} => write!(
				f,
				"timer tick of {} ns exceeds drift tolerance of {} ns",
				tick_ns, tolerance_ns
			),
			ConfigError::StorageTooSmall { needed, available } => write!(
				f,
				"framebuffer needs {} pixels but only {} supplied",
				needed, available
			),
			ConfigError::InvalidScale => {
				write!(f, "framebuffer scale does not divide the resolution")
			}
			ConfigError::SizeMismatch => write!(f, "framebuffer sizes differ"),
			ConfigError::InvalidPin(pin) => write!(f, "GPIO {} is invalid or reused", pin),
			ConfigError::PixelTooShort => write!(f, "pixel period is shorter than a timer tick"),
			ConfigError::FrameTooLong => write!(f, "frame does not fit the timer counter"),
		}
	}
}

impl fmt::Display for StorageError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StorageError::NotFound => write!(f, "file not found"),
			StorageError::EndOfFile => write!(f, "unexpected end of file"),
			StorageError::Io => write!(f, "storage device error"),
		}
	}
}

impl From<StorageError> for DecodeError {
	fn from(error: StorageError) -> DecodeError {
		match error {
			StorageError::EndOfFile => DecodeError::Truncated,
			StorageError::NotFound | StorageError::Io => DecodeError::Io,
		}
	}
}

impl fmt::Display for DecodeError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DecodeError::BadSignature => write!(f, "unrecognised image signature"),
			DecodeError::InvalidHeader => write!(f, "invalid image header"),
			DecodeError::Unsupported => write!(f, "unsupported image format"),
			DecodeError::RowTooLong { needed } => {
				write!(f, "image row of {} bytes exceeds row buffer", needed)
			}
			DecodeError::Truncated => write!(f, "image data truncated"),
			DecodeError::Io => write!(f, "I/O error reading image"),
		}
	}
}

impl fmt::Display for LoadError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LoadError::Open => write!(f, "could not open image source"),
			LoadError::Decode(e) => write!(f, "decode failed: {}", e),
			LoadError::Aborted => write!(f, "decode aborted by row handler"),
			LoadError::Preview => write!(f, "preview display error"),
			LoadError::Busy => write!(f, "back buffer still waiting to be shown"),
		}
	}
}

impl From<DecodeError> for LoadError {
	fn from(e: DecodeError) -> LoadError {
		LoadError::Decode(e)
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
