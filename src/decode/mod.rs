//! # Image decoding
//!
//! A decoder reads an image from a [`ByteSource`] and hands it over one row
//! at a time, as a [`Scanline`]. It never holds more than one row.

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
// Sub-modules
// -----------------------------------------------------------------------------

mod bmp;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use embedded_graphics::pixelcolor::{Rgb565, Rgb888};

use crate::{error::DecodeError, storage::ByteSource};

pub use bmp::BmpDecoder;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// What a decoder learns from the image header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageInfo {
	/// Width in pixels
	pub width: u16,
	/// Height in pixels
	pub height: u16,
	/// Bits per pixel, as stored in the file
	pub bits_per_pixel: u8,
}

/// How the bytes of a scanline are laid out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
	/// Blue, green, red
	Bgr888,
	/// Blue, green, red, then an ignored byte
	Bgra8888,
	/// Red, green, blue
	Rgb888,
	/// 5-6-5 packed, big-endian
	Rgb565,
}

/// One decoded row.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Scanline<'a> {
	/// Row index, 0 at the top
	pub row: u16,
	/// Layout of `data`
	pub format: PixelFormat,
	/// The pixels, left to right
	pub data: &'a [u8],
}

/// What the row callback wants to happen next.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RowControl {
	/// Carry on with the next row
	Continue,
	/// Stop decoding
	Abort,
}

/// How a decode that did not fail ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeStatus {
	/// Every row was delivered
	Complete,
	/// The row callback asked us to stop
	Aborted,
}

/// Turns a byte stream into scanlines.
pub trait ImageDecoder {
	/// Read and check the header. The source is left positioned wherever
	/// the decoder likes.
	fn read_header<B>(&mut self, source: &mut B) -> Result<ImageInfo, DecodeError>
	where
		B: ByteSource;

	/// Deliver every row to `on_row`, in any order. Must follow a
	/// successful [`read_header`](Self::read_header) on the same source.
	fn decode_rows<B, F>(&mut self, source: &mut B, on_row: F) -> Result<DecodeStatus, DecodeError>
	where
		B: ByteSource,
		F: FnMut(&Scanline<'_>) -> RowControl;
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl PixelFormat {
	/// Bytes taken by one pixel.
	pub const fn bytes_per_pixel(self) -> usize {
		match self {
			PixelFormat::Bgr888 | PixelFormat::Rgb888 => 3,
			PixelFormat::Bgra8888 => 4,
			PixelFormat::Rgb565 => 2,
		}
	}

	/// Convert one pixel. `bytes` must be [`bytes_per_pixel`](Self::bytes_per_pixel) long.
	#[inline]
	pub fn to_rgb888(self, bytes: &[u8]) -> Rgb888 {
		match self {
			PixelFormat::Bgr888 | PixelFormat::Bgra8888 => {
				Rgb888::new(bytes[2], bytes[1], bytes[0])
			}
			PixelFormat::Rgb888 => Rgb888::new(bytes[0], bytes[1], bytes[2]),
			PixelFormat::Rgb565 => {
				let word = u16::from_be_bytes([bytes[0], bytes[1]]);
				Rgb888::from(Rgb565::new(
					(word >> 11) as u8,
					((word >> 5) & 0x3F) as u8,
					(word & 0x1F) as u8,
				))
			}
		}
	}
}

impl Scanline<'_> {
	/// Number of whole pixels in the row.
	pub fn pixel_count(&self) -> usize {
		self.data.len() / self.format.bytes_per_pixel()
	}

	/// The pixels, converted.
	pub fn pixels(&self) -> impl Iterator<Item = Rgb888> + '_ {
		let format = self.format;
		self.data
			.chunks_exact(format.bytes_per_pixel())
			.map(move |bytes| format.to_rgb888(bytes))
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
