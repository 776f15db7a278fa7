//! # Framebuffer
//!
//! The framebuffer is the only thing shared between the timing interrupt and
//! the image pipeline. Every pixel lives in its own `AtomicU32` (packed
//! `0x00RRGGBB`) and is read and written with relaxed loads and stores, so:
//!
//! * the interrupt never waits for anything, and never sees half a pixel;
//! * while an image is being decoded, a frame on screen can show a mix of the
//!   old and new image (a torn frame). That is accepted. The framebuffer is
//!   only eventually consistent while a load is in progress.
//!
//! When there is memory to spare, [`DoubleBuffer`] avoids the tearing by
//! decoding into a back buffer and swapping at a frame boundary.
//!
//! Storage is supplied by the caller and never reallocated. A framebuffer can
//! also store pixels at a reduced resolution (`2^shift` nominal pixels per
//! stored pixel on each axis) while reporting the nominal size to everyone
//! else.

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

use core::convert::Infallible;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use embedded_graphics::{
	pixelcolor::{Rgb888, RgbColor},
	prelude::{DrawTarget, OriginDimensions, Size},
	Pixel,
};

use crate::error::ConfigError;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Somewhere the timing engine can fetch pixels from.
pub trait PixelSource {
	/// Nominal width in pixels.
	fn width(&self) -> u16;

	/// Nominal height in pixels.
	fn height(&self) -> u16;

	/// Fetch one pixel, without a bounds check.
	///
	/// # Safety
	///
	/// `x` must be less than `width()` and `y` less than `height()`.
	unsafe fn pixel_unchecked(&self, x: u16, y: u16) -> Rgb888;

	/// Called by the engine between frames, before the first pixel of the
	/// next frame is fetched.
	fn frame_boundary(&self) {}
}

/// A fixed-size store of RGB pixels.
pub struct Framebuffer<'a> {
	pixels: &'a [AtomicU32],
	width: u16,
	height: u16,
	shift: u8,
	stored_width: usize,
}

/// Two framebuffers; one on screen, one being written.
pub struct DoubleBuffer<'a> {
	buffers: [Framebuffer<'a>; 2],
	front: AtomicUsize,
	swap_pending: AtomicBool,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Make zeroed (black) pixel storage, suitable for a `static`.
pub const fn blank_storage<const N: usize>() -> [AtomicU32; N] {
	#[allow(clippy::declare_interior_mutable_const)]
	const BLACK: AtomicU32 = AtomicU32::new(0);
	[BLACK; N]
}

#[inline(always)]
fn pack(colour: Rgb888) -> u32 {
	(u32::from(colour.r()) << 16) | (u32::from(colour.g()) << 8) | u32::from(colour.b())
}

#[inline(always)]
fn unpack(word: u32) -> Rgb888 {
	Rgb888::new((word >> 16) as u8, (word >> 8) as u8, word as u8)
}

impl<'a> Framebuffer<'a> {
	/// Number of storage words needed for a `width` x `height` framebuffer
	/// stored at `1 / 2^shift` resolution.
	pub const fn storage_len(width: u16, height: u16, shift: u8) -> usize {
		(width as usize >> shift) * (height as usize >> shift)
	}

	/// Create a full-resolution framebuffer over `storage`.
	pub fn new(storage: &'a [AtomicU32], width: u16, height: u16) -> Result<Self, ConfigError> {
		Self::with_scale(storage, width, height, 0)
	}

	/// Create a framebuffer that stores one pixel per `2^shift` x `2^shift`
	/// block of nominal pixels.
	pub fn with_scale(
		storage: &'a [AtomicU32],
		width: u16,
		height: u16,
		shift: u8,
	) -> Result<Self, ConfigError> {
		if width == 0 || height == 0 {
			return Err(ConfigError::ZeroResolution);
		}
		if shift >= 16 || (width >> shift) == 0 || (height >> shift) == 0 {
			return Err(ConfigError::InvalidScale);
		}
		// Partial blocks would map in-range pixels past the stored row
		let block = 1u16 << shift;
		if width % block != 0 || height % block != 0 {
			return Err(ConfigError::InvalidScale);
		}
		let needed = Self::storage_len(width, height, shift);
		if storage.len() < needed {
			return Err(ConfigError::StorageTooSmall {
				needed,
				available: storage.len(),
			});
		}
		Ok(Framebuffer {
			pixels: &storage[..needed],
			width,
			height,
			shift,
			stored_width: width as usize >> shift,
		})
	}

	/// Nominal width in pixels.
	pub fn width(&self) -> u16 {
		self.width
	}

	/// Nominal height in pixels.
	pub fn height(&self) -> u16 {
		self.height
	}

	/// log2 of the storage scale factor.
	pub fn scale_shift(&self) -> u8 {
		self.shift
	}

	#[inline(always)]
	fn index(&self, x: u16, y: u16) -> usize {
		(y as usize >> self.shift) * self.stored_width + (x as usize >> self.shift)
	}

	/// Read one pixel.
	///
	/// Panics if the coordinates are off-screen; that is a programming error.
	pub fn get(&self, x: u16, y: u16) -> Rgb888 {
		assert!(
			x < self.width && y < self.height,
			"pixel ({}, {}) outside {}x{} framebuffer",
			x,
			y,
			self.width,
			self.height
		);
		// Note (safety): bounds checked above
		unsafe { self.get_unchecked(x, y) }
	}

	/// Read one pixel with no bounds check. This is the interrupt path.
	///
	/// # Safety
	///
	/// `x < width()` and `y < height()`.
	#[inline(always)]
	pub unsafe fn get_unchecked(&self, x: u16, y: u16) -> Rgb888 {
		debug_assert!(x < self.width && y < self.height);
		let word = self.pixels.get_unchecked(self.index(x, y)).load(Ordering::Relaxed);
		unpack(word)
	}

	/// Write one pixel.
	///
	/// Panics if the coordinates are off-screen; that is a programming error.
	pub fn set(&self, x: u16, y: u16, colour: Rgb888) {
		assert!(
			x < self.width && y < self.height,
			"pixel ({}, {}) outside {}x{} framebuffer",
			x,
			y,
			self.width,
			self.height
		);
		let index = self.index(x, y);
		self.pixels[index].store(pack(colour), Ordering::Relaxed);
	}

	/// Set every pixel to one colour.
	pub fn fill(&self, colour: Rgb888) {
		let word = pack(colour);
		for pixel in self.pixels {
			pixel.store(word, Ordering::Relaxed);
		}
	}
}

impl PixelSource for Framebuffer<'_> {
	fn width(&self) -> u16 {
		self.width
	}

	fn height(&self) -> u16 {
		self.height
	}

	#[inline(always)]
	unsafe fn pixel_unchecked(&self, x: u16, y: u16) -> Rgb888 {
		self.get_unchecked(x, y)
	}
}

impl OriginDimensions for Framebuffer<'_> {
	fn size(&self) -> Size {
		Size::new(u32::from(self.width), u32::from(self.height))
	}
}

impl DrawTarget for Framebuffer<'_> {
	type Color = Rgb888;

	type Error = Infallible;

	fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
	where
		I: IntoIterator<Item = Pixel<Self::Color>>,
	{
		for Pixel(point, colour) in pixels {
			// embedded-graphics expects off-screen pixels to be clipped
			if point.x >= 0
				&& point.y >= 0
				&& point.x < i32::from(self.width)
				&& point.y < i32::from(self.height)
			{
				self.set(point.x as u16, point.y as u16, colour);
			}
		}
		Ok(())
	}

	fn clear(&mut self, colour: Self::Color) -> Result<(), Self::Error> {
		self.fill(colour);
		Ok(())
	}
}

impl<'a> DoubleBuffer<'a> {
	/// Pair up two framebuffers of the same nominal size. `first` starts on
	/// screen.
	pub fn new(first: Framebuffer<'a>, second: Framebuffer<'a>) -> Result<Self, ConfigError> {
		if first.width != second.width || first.height != second.height {
			return Err(ConfigError::SizeMismatch);
		}
		Ok(DoubleBuffer {
			buffers: [first, second],
			front: AtomicUsize::new(0),
			swap_pending: AtomicBool::new(false),
		})
	}

	/// The buffer currently being displayed.
	pub fn front(&self) -> &Framebuffer<'a> {
		&self.buffers[self.front.load(Ordering::Acquire) & 1]
	}

	/// The buffer to draw into.
	///
	/// After [`present`](Self::present), keep away from this until
	/// [`is_swap_pending`](Self::is_swap_pending) goes false: until then it
	/// is still the buffer about to be shown.
	pub fn back(&self) -> &Framebuffer<'a> {
		&self.buffers[(self.front.load(Ordering::Acquire) & 1) ^ 1]
	}

	/// Ask for the back buffer to be shown from the next frame boundary.
	pub fn present(&self) {
		self.swap_pending.store(true, Ordering::Release);
	}

	/// Is a swap still waiting for a frame boundary?
	pub fn is_swap_pending(&self) -> bool {
		self.swap_pending.load(Ordering::Acquire)
	}
}

impl PixelSource for DoubleBuffer<'_> {
	fn width(&self) -> u16 {
		self.buffers[0].width
	}

	fn height(&self) -> u16 {
		self.buffers[0].height
	}

	#[inline(always)]
	unsafe fn pixel_unchecked(&self, x: u16, y: u16) -> Rgb888 {
		self.buffers
			.get_unchecked(self.front.load(Ordering::Relaxed) & 1)
			.get_unchecked(x, y)
	}

	fn frame_boundary(&self) {
		// Load-then-store: the RP2040 has no atomic read-modify-write, and
		// only the interrupt ever clears the flag.
		if self.swap_pending.load(Ordering::Acquire) {
			let front = self.front.load(Ordering::Relaxed);
			self.front.store(front ^ 1, Ordering::Release);
			self.swap_pending.store(false, Ordering::Release);
		}
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
