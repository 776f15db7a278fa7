//! # Video mode descriptors
//!
//! A [`ModeDescriptor`] holds the active resolution and the four phase
//! lengths of each axis. Only one mode is built in, and its numbers are
//! physical constants: they were measured against a real monitor, so they are
//! reproduced here exactly (to the nanosecond) rather than replaced with the
//! textbook 640x480 timings.

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

use fugit::NanosDurationU32;

use crate::error::ConfigError;
use crate::timing::Phase;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Describes the polarity of a sync pulse.
///
/// Some pulses are positive (active-high), some are negative (active-low).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncPolarity {
	/// An active-high pulse
	Positive,
	/// An active-low pulse
	Negative,
}

/// The four phase lengths of one axis.
///
/// For the horizontal axis these make up one scan-line. For the vertical
/// axis they make up one frame, where `active` is the time taken by all the
/// visible lines.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PhaseDurations {
	/// Visible portion
	pub active: NanosDurationU32,
	/// Blanking before the sync pulse
	pub front_porch: NanosDurationU32,
	/// The sync pulse itself
	pub sync: NanosDurationU32,
	/// Blanking after the sync pulse
	pub back_porch: NanosDurationU32,
}

/// Everything that defines one display mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ModeDescriptor {
	/// Visible pixels per line
	pub width: u16,
	/// Visible lines per frame
	pub height: u16,
	/// Scan-line timing
	pub horizontal: PhaseDurations,
	/// Frame timing
	pub vertical: PhaseDurations,
	/// Polarity of the H-Sync pulse
	pub hsync: SyncPolarity,
	/// Polarity of the V-Sync pulse
	pub vsync: SyncPolarity,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl SyncPolarity {
	/// The pin level while the pulse is asserted.
	pub const fn enabled(&self) -> bool {
		match self {
			SyncPolarity::Positive => true,
			SyncPolarity::Negative => false,
		}
	}

	/// The pin level while the pulse is not asserted.
	pub const fn disabled(&self) -> bool {
		match self {
			SyncPolarity::Positive => false,
			SyncPolarity::Negative => true,
		}
	}
}

impl PhaseDurations {
	/// Build from nanosecond counts, in (active, front-porch, sync, back-porch) order.
	pub const fn from_nanos(timings: (u32, u32, u32, u32)) -> PhaseDurations {
		PhaseDurations {
			active: NanosDurationU32::from_ticks(timings.0),
			front_porch: NanosDurationU32::from_ticks(timings.1),
			sync: NanosDurationU32::from_ticks(timings.2),
			back_porch: NanosDurationU32::from_ticks(timings.3),
		}
	}

	/// The length of the given phase.
	pub const fn of(&self, phase: Phase) -> NanosDurationU32 {
		match phase {
			Phase::ActivePixel => self.active,
			Phase::FrontPorch => self.front_porch,
			Phase::Sync => self.sync,
			Phase::BackPorch => self.back_porch,
		}
	}

	/// The sum of all four phases.
	pub const fn total(&self) -> NanosDurationU32 {
		NanosDurationU32::from_ticks(
			self.active.ticks()
				+ self.front_porch.ticks()
				+ self.sync.ticks()
				+ self.back_porch.ticks(),
		)
	}

	/// Offset of the end of `phase` from the start of the active phase.
	pub const fn end_of(&self, phase: Phase) -> NanosDurationU32 {
		let mut sum = self.active.ticks();
		if matches!(phase, Phase::ActivePixel) {
			return NanosDurationU32::from_ticks(sum);
		}
		sum += self.front_porch.ticks();
		if matches!(phase, Phase::FrontPorch) {
			return NanosDurationU32::from_ticks(sum);
		}
		sum += self.sync.ticks();
		if matches!(phase, Phase::Sync) {
			return NanosDurationU32::from_ticks(sum);
		}
		NanosDurationU32::from_ticks(sum + self.back_porch.ticks())
	}

	fn checked_total(&self) -> Option<u32> {
		self.active
			.ticks()
			.checked_add(self.front_porch.ticks())?
			.checked_add(self.sync.ticks())?
			.checked_add(self.back_porch.ticks())
	}

	fn all_positive(&self) -> bool {
		self.active.ticks() > 0
			&& self.front_porch.ticks() > 0
			&& self.sync.ticks() > 0
			&& self.back_porch.ticks() > 0
	}
}

impl ModeDescriptor {
	/// 640 x 480, as measured on the reference monitor.
	///
	/// The horizontal phases were specified in microseconds and the vertical
	/// phases in milliseconds; both are stored here rounded to the nearest
	/// nanosecond:
	///
	/// | Phase       | Horizontal           | Vertical              |
	/// |:------------|:---------------------|:----------------------|
	/// | Active      | 25.422045680238 us   | 15.253227408143 ms    |
	/// | Front porch | 0.63555114200596 us  | 0.31777557100298 ms   |
	/// | Sync        | 0.63555114200596 us  | 0.31777557100298 ms   |
	/// | Back porch  | 1.9066534260179 us   | 1.0486593843098 ms    |
	pub const VGA_640X480: ModeDescriptor = ModeDescriptor {
		width: 640,
		height: 480,
		horizontal: PhaseDurations::from_nanos((25_422, 636, 636, 1_907)),
		vertical: PhaseDurations::from_nanos((15_253_227, 317_776, 317_776, 1_048_659)),
		hsync: SyncPolarity::Negative,
		vsync: SyncPolarity::Negative,
	};

	/// How long one scan-line takes.
	pub const fn line_period(&self) -> NanosDurationU32 {
		self.horizontal.total()
	}

	/// How long one frame takes.
	pub const fn frame_period(&self) -> NanosDurationU32 {
		self.vertical.total()
	}

	/// Number of visible pixels.
	pub const fn pixel_count(&self) -> usize {
		self.width as usize * self.height as usize
	}

	/// Check the descriptor invariants: non-zero resolution, strictly
	/// positive phase lengths on both axes, and line and frame periods that
	/// fit in 32 bits of nanoseconds.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.width == 0 || self.height == 0 {
			return Err(ConfigError::ZeroResolution);
		}
		if !self.horizontal.all_positive() || !self.vertical.all_positive() {
			return Err(ConfigError::ZeroDuration);
		}
		if self.horizontal.checked_total().is_none() || self.vertical.checked_total().is_none() {
			return Err(ConfigError::FrameTooLong);
		}
		Ok(())
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
