//! # Tick schedule
//!
//! Converts the mode's nanosecond phase lengths into timer ticks.
//!
//! Every threshold is an absolute offset from the start of the frame,
//! computed in 32.32 fixed-point ticks and rounded exactly once. Nothing is
//! accumulated from one phase to the next, so rounding error never exceeds
//! half a tick anywhere in the frame.

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

use super::{EngineConfig, Phase, Strategy, VerticalDrive};
use crate::{error::ConfigError, mode::ModeDescriptor};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Pre-computed phase thresholds for one mode and configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
	/// One pixel tick, in fixed-point timer ticks
	pixel_fx: u64,
	/// One line, in fixed-point timer ticks
	line_fx: u64,
	/// End of each horizontal phase, from the start of the line
	h_end_fx: [u64; 4],
	/// End of each vertical phase, from the start of the frame
	v_end_fx: [u64; 4],
	/// Pixel ticks per line
	pixels_per_line: u16,
	/// Active lines per frame
	lines: u16,
	/// Vertical front-porch, sync and back-porch lengths in whole lines
	blank_lines: [u16; 3],
	/// One frame, rounded to whole ticks
	frame_ticks: u32,
	/// One tick, in nanoseconds (zero if less than one)
	tick_ns: u32,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

const FRACTION_BITS: u32 = 32;

const ONE: u64 = 1 << FRACTION_BITS;

const HALF: u64 = ONE / 2;

const NANOS_PER_SECOND: u128 = 1_000_000_000;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Nanoseconds to fixed-point ticks.
fn to_fx(nanos: u32, tick_hz: u32) -> Result<u64, ConfigError> {
	let fx = ((u128::from(nanos) * u128::from(tick_hz)) << FRACTION_BITS) / NANOS_PER_SECOND;
	u64::try_from(fx).map_err(|_| ConfigError::FrameTooLong)
}

/// Fixed-point ticks to whole ticks, rounding half up.
#[inline(always)]
const fn round(fx: u64) -> u32 {
	((fx + HALF) >> FRACTION_BITS) as u32
}

/// Round a vertical phase to a whole number of lines, never zero.
fn whole_lines(nanos: u32, line_nanos: u32) -> u16 {
	let lines = (u64::from(nanos) + u64::from(line_nanos / 2)) / u64::from(line_nanos);
	lines.clamp(1, u64::from(u16::MAX)) as u16
}

impl Phase {
	/// Index into per-phase tables.
	#[inline(always)]
	pub(crate) const fn index(self) -> usize {
		match self {
			Phase::ActivePixel => 0,
			Phase::FrontPorch => 1,
			Phase::Sync => 2,
			Phase::BackPorch => 3,
		}
	}
}

impl Schedule {
	/// Work out the thresholds, checking they are achievable.
	///
	/// `pixels_per_line` and `lines` come from the scan cursor, so they
	/// already reflect the scan order and stride.
	pub fn new(
		mode: &ModeDescriptor,
		config: &EngineConfig,
		pixels_per_line: u16,
		lines: u16,
	) -> Result<Schedule, ConfigError> {
		mode.validate()?;
		if pixels_per_line == 0 || lines == 0 {
			return Err(ConfigError::ZeroResolution);
		}
		let tick_hz = config.tick_hz;
		if tick_hz == 0 {
			return Err(ConfigError::ZeroTickRate);
		}
		let tick_ns = 1_000_000_000 / tick_hz;
		if tick_ns > config.tolerance_ns.saturating_mul(2) {
			return Err(ConfigError::TickTooCoarse {
				tick_ns,
				tolerance_ns: config.tolerance_ns,
			});
		}

		let h = &mode.horizontal;
		let line_fx = to_fx(h.total().ticks(), tick_hz)?;
		let mut h_end_fx = [0u64; 4];
		for phase in Phase::ALL {
			h_end_fx[phase.index()] = to_fx(h.end_of(phase).ticks(), tick_hz)?;
		}
		let pixel_fx = h_end_fx[Phase::ActivePixel.index()] / u64::from(pixels_per_line);
		if config.strategy == Strategy::PhaseChained && pixel_fx < ONE {
			return Err(ConfigError::PixelTooShort);
		}

		let v = &mode.vertical;
		let line_nanos = h.total().ticks();
		let blank_lines = [
			whole_lines(v.front_porch.ticks(), line_nanos),
			whole_lines(v.sync.ticks(), line_nanos),
			whole_lines(v.back_porch.ticks(), line_nanos),
		];
		let active_end_fx = line_fx
			.checked_mul(u64::from(lines))
			.ok_or(ConfigError::FrameTooLong)?;
		let mut v_end_fx = [active_end_fx; 4];
		let mut blank_fx = 0u64;
		let mut blank_count = 0u64;
		for (idx, phase) in [Phase::FrontPorch, Phase::Sync, Phase::BackPorch]
			.into_iter()
			.enumerate()
		{
			match config.vertical {
				VerticalDrive::DedicatedTimer => {
					blank_fx += to_fx(v.of(phase).ticks(), tick_hz)?;
				}
				VerticalDrive::ChainedToLine => {
					blank_count += u64::from(blank_lines[idx]);
					blank_fx = line_fx
						.checked_mul(blank_count)
						.ok_or(ConfigError::FrameTooLong)?;
				}
			}
			v_end_fx[phase.index()] = active_end_fx
				.checked_add(blank_fx)
				.ok_or(ConfigError::FrameTooLong)?;
		}

		let frame_fx = v_end_fx[Phase::BackPorch.index()];
		if frame_fx + HALF > (i32::MAX as u64) << FRACTION_BITS {
			return Err(ConfigError::FrameTooLong);
		}

		let schedule = Schedule {
			pixel_fx,
			line_fx,
			h_end_fx,
			v_end_fx,
			pixels_per_line,
			lines,
			blank_lines,
			frame_ticks: round(frame_fx),
			tick_ns,
		};
		debug!(
			"schedule: {} px/line, {} lines, {} ticks/line, {} ticks/frame",
			pixels_per_line,
			lines,
			schedule.line_ticks(),
			schedule.frame_ticks
		);
		Ok(schedule)
	}

	/// Pixel ticks per line.
	pub const fn pixels_per_line(&self) -> u16 {
		self.pixels_per_line
	}

	/// Active lines per frame.
	pub const fn lines(&self) -> u16 {
		self.lines
	}

	/// Vertical front-porch, sync and back-porch, in whole lines.
	pub const fn blank_lines(&self) -> [u16; 3] {
		self.blank_lines
	}

	/// Lines per frame when the vertical axis is driven from line completion.
	pub const fn chained_frame_lines(&self) -> u16 {
		self.lines + self.blank_lines[0] + self.blank_lines[1] + self.blank_lines[2]
	}

	/// One frame, in whole ticks.
	pub const fn frame_ticks(&self) -> u32 {
		self.frame_ticks
	}

	/// One line, rounded to whole ticks.
	pub const fn line_ticks(&self) -> u32 {
		round(self.line_fx)
	}

	/// One timer tick, in nanoseconds.
	pub const fn tick_ns(&self) -> u32 {
		self.tick_ns
	}

	/// When `line` starts.
	#[inline(always)]
	pub fn line_start(&self, frame_start: u32, line: u16) -> u32 {
		frame_start.wrapping_add(round(self.line_fx * u64::from(line)))
	}

	/// When pixel tick `pixel` of `line` starts. Asking for the pixel after
	/// the last one gives the end of the active phase.
	#[inline(always)]
	pub fn pixel_start(&self, frame_start: u32, line: u16, pixel: u16) -> u32 {
		if pixel >= self.pixels_per_line {
			return self.h_end(frame_start, line, Phase::ActivePixel);
		}
		let offset = self.line_fx * u64::from(line) + self.pixel_fx * u64::from(pixel);
		frame_start.wrapping_add(round(offset))
	}

	/// When `phase` of `line` ends.
	#[inline(always)]
	pub fn h_end(&self, frame_start: u32, line: u16, phase: Phase) -> u32 {
		let offset = self.line_fx * u64::from(line) + self.h_end_fx[phase.index()];
		frame_start.wrapping_add(round(offset))
	}

	/// When vertical `phase` ends. The end of the back porch is the start of
	/// the next frame.
	#[inline(always)]
	pub fn v_end(&self, frame_start: u32, phase: Phase) -> u32 {
		frame_start.wrapping_add(round(self.v_end_fx[phase.index()]))
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
