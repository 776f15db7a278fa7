//! # Scan cursor
//!
//! Tracks which framebuffer pixel goes out next. One axis is "fast" (stepped
//! once per pixel tick within a line) and the other is "slow" (stepped once
//! per line). Which is which depends on the [`ScanOrder`].
//!
//! With a stride `s`, the fast axis moves `s` pixels per tick and each
//! sampled row on the slow axis is repeated for `s` lines, so the frame keeps
//! its full line count. The cursor wraps instead of overflowing, so it is
//! always inside the framebuffer.

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

use super::ScanOrder;
use crate::error::ConfigError;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// What happened when the cursor was advanced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
	/// Still on the same line.
	Pixel,
	/// Wrapped onto the start of the next line.
	LineEnd,
	/// Wrapped back to the first pixel of the frame.
	FrameEnd,
}

/// The current scan position.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanCursor {
	order: ScanOrder,
	stride: u16,
	fast: u16,
	line: u16,
	fast_len: u16,
	slow_len: u16,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl ScanCursor {
	/// Make a cursor for a `width` x `height` image, starting at (0, 0).
	///
	/// The stride must be non-zero and divide both axes.
	pub fn new(
		width: u16,
		height: u16,
		order: ScanOrder,
		stride: u16,
	) -> Result<ScanCursor, ConfigError> {
		if width == 0 || height == 0 {
			return Err(ConfigError::ZeroResolution);
		}
		let (fast_len, slow_len) = match order {
			ScanOrder::RowMajor => (width, height),
			ScanOrder::ColumnMajor => (height, width),
		};
		for axis_len in [fast_len, slow_len] {
			if stride == 0 || axis_len % stride != 0 {
				return Err(ConfigError::InvalidStride { stride, axis_len });
			}
		}
		Ok(ScanCursor {
			order,
			stride,
			fast: 0,
			line: 0,
			fast_len,
			slow_len,
		})
	}

	/// Pixel ticks in one line.
	pub const fn pixels_per_line(&self) -> u16 {
		self.fast_len / self.stride
	}

	/// Lines in one active frame.
	pub const fn lines(&self) -> u16 {
		self.slow_len
	}

	/// Pixel ticks in one active frame.
	pub const fn ticks_per_frame(&self) -> u32 {
		self.pixels_per_line() as u32 * self.slow_len as u32
	}

	/// Current line within the active frame.
	pub const fn line(&self) -> u16 {
		self.line
	}

	/// The framebuffer coordinate of the current pixel, as `(x, y)`.
	#[inline(always)]
	pub fn position(&self) -> (u16, u16) {
		let slow = self.line - (self.line % self.stride);
		match self.order {
			ScanOrder::RowMajor => (self.fast, slow),
			ScanOrder::ColumnMajor => (slow, self.fast),
		}
	}

	/// Move on by one pixel tick.
	#[inline(always)]
	pub fn advance(&mut self) -> Step {
		self.fast += self.stride;
		if self.fast < self.fast_len {
			return Step::Pixel;
		}
		self.fast = 0;
		self.line += 1;
		if self.line < self.slow_len {
			Step::LineEnd
		} else {
			self.line = 0;
			Step::FrameEnd
		}
	}

	/// Back to (0, 0).
	pub fn reset(&mut self) {
		self.fast = 0;
		self.line = 0;
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
