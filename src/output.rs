//! # Pixel output
//!
//! Each colour channel is eight GPIO lines wide, but the lines are shared by
//! all three channels: we put one channel's value on the lines, then pulse
//! that channel's latch-enable so its external latch (feeding the DAC) holds
//! the value. Three channels, three latch pulses per pixel.
//!
//! The bit-to-pin mapping is an arbitrary table, not a contiguous bus, so we
//! pre-compute two nibble look-up tables to turn a byte into a GPIO mask in
//! two loads and an OR.
//!
//! All pin access goes through [`SignalPins`], which is two register writes
//! on real hardware (set-mask and clear-mask) and a recorder in the tests.

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

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use crate::error::ConfigError;
use crate::mode::SyncPolarity;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// A bank of up to 32 output lines which can be driven by mask.
pub trait SignalPins {
	/// Drive every line with its bit set in `mask` high. Others are untouched.
	fn set_high(&mut self, mask: u32);

	/// Drive every line with its bit set in `mask` low. Others are untouched.
	fn set_low(&mut self, mask: u32);
}

/// The latch-enable line of one colour channel.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Latch(pub u8);

/// Which GPIO does what.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PinMap {
	/// GPIO for each bit of a channel value, least significant bit first.
	pub colour: [u8; 8],
	/// Latch-enable for the red channel
	pub latch_red: u8,
	/// Latch-enable for the green channel
	pub latch_green: u8,
	/// Latch-enable for the blue channel
	pub latch_blue: u8,
	/// H-Sync output
	pub hsync: u8,
	/// V-Sync output
	pub vsync: u8,
	/// DAC blanking input (active low)
	pub blank: u8,
}

/// Drives the colour, sync and blanking lines.
pub struct ColourBus<P> {
	pins: P,
	map: PinMap,
	colour_mask: u32,
	latch_mask: u32,
	low_nibble: [u32; 16],
	high_nibble: [u32; 16],
	hsync: SyncPolarity,
	vsync: SyncPolarity,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Polarity of the DAC blanking input.
const BLANK_POLARITY: SyncPolarity = SyncPolarity::Negative;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl PinMap {
	/// The Pico wiring. The colour lines are split across GPIO 16-18 and
	/// 8-12, which leaves the SPI, I2C and UART pins free.
	pub const PICO: PinMap = PinMap {
		colour: [16, 17, 18, 8, 9, 10, 11, 12],
		latch_red: 15,
		latch_green: 14,
		latch_blue: 13,
		hsync: 1,
		vsync: 2,
		blank: 19,
	};

	/// Mask of all eight colour lines.
	pub const fn colour_mask(&self) -> u32 {
		let mut mask = 0;
		let mut i = 0;
		while i < self.colour.len() {
			mask |= 1 << self.colour[i];
			i += 1;
		}
		mask
	}

	/// Mask of every line we drive.
	pub const fn output_mask(&self) -> u32 {
		self.colour_mask()
			| 1 << self.latch_red
			| 1 << self.latch_green
			| 1 << self.latch_blue
			| 1 << self.hsync
			| 1 << self.vsync
			| 1 << self.blank
	}

	/// GPIO mask for a channel value.
	pub fn mask_for(&self, value: u8) -> u32 {
		self.colour
			.iter()
			.enumerate()
			.filter(|(bit, _)| value & (1 << bit) != 0)
			.fold(0, |mask, (_, pin)| mask | 1 << pin)
	}

	/// Every pin must be below 32 and used only once.
	pub fn validate(&self) -> Result<(), ConfigError> {
		let pins = [
			self.colour[0],
			self.colour[1],
			self.colour[2],
			self.colour[3],
			self.colour[4],
			self.colour[5],
			self.colour[6],
			self.colour[7],
			self.latch_red,
			self.latch_green,
			self.latch_blue,
			self.hsync,
			self.vsync,
			self.blank,
		];
		let mut seen = 0u32;
		for pin in pins {
			if pin >= 32 || seen & (1 << pin) != 0 {
				return Err(ConfigError::InvalidPin(pin));
			}
			seen |= 1 << pin;
		}
		Ok(())
	}
}

impl<P> ColourBus<P>
where
	P: SignalPins,
{
	/// Take ownership of the pins and build the look-up tables.
	pub fn new(
		pins: P,
		map: PinMap,
		hsync: SyncPolarity,
		vsync: SyncPolarity,
	) -> Result<ColourBus<P>, ConfigError> {
		map.validate()?;
		let mut low_nibble = [0u32; 16];
		let mut high_nibble = [0u32; 16];
		for nibble in 0..16u8 {
			low_nibble[usize::from(nibble)] = map.mask_for(nibble);
			high_nibble[usize::from(nibble)] = map.mask_for(nibble << 4);
		}
		Ok(ColourBus {
			pins,
			map,
			colour_mask: map.colour_mask(),
			latch_mask: 1 << map.latch_red | 1 << map.latch_green | 1 << map.latch_blue,
			low_nibble,
			high_nibble,
			hsync,
			vsync,
		})
	}

	/// Put one channel value on the colour lines and strobe `latch`.
	///
	/// Four register writes: clear colours, set colours, latch high, latch low.
	#[inline(always)]
	pub fn emit_channel(&mut self, latch: Latch, value: u8) {
		// Note (unsafe): both indices are four bits wide
		let mask = unsafe {
			*self.low_nibble.get_unchecked(usize::from(value & 0x0F))
				| *self.high_nibble.get_unchecked(usize::from(value >> 4))
		};
		let latch = 1 << latch.0;
		self.pins.set_low(self.colour_mask);
		self.pins.set_high(mask);
		self.pins.set_high(latch);
		self.pins.set_low(latch);
	}

	/// Latch all three channels of a pixel.
	#[inline(always)]
	pub fn emit_pixel(&mut self, colour: Rgb888) {
		self.emit_channel(Latch(self.map.latch_red), colour.r());
		self.emit_channel(Latch(self.map.latch_green), colour.g());
		self.emit_channel(Latch(self.map.latch_blue), colour.b());
	}

	/// Latch black into all three channels at once.
	#[inline(always)]
	pub fn emit_black(&mut self) {
		self.pins.set_low(self.colour_mask);
		self.pins.set_high(self.latch_mask);
		self.pins.set_low(self.latch_mask);
	}

	/// Drive the H-Sync line.
	#[inline(always)]
	pub fn hsync(&mut self, asserted: bool) {
		let level = if asserted {
			self.hsync.enabled()
		} else {
			self.hsync.disabled()
		};
		self.drive(self.map.hsync, level);
	}

	/// Drive the V-Sync line.
	#[inline(always)]
	pub fn vsync(&mut self, asserted: bool) {
		let level = if asserted {
			self.vsync.enabled()
		} else {
			self.vsync.disabled()
		};
		self.drive(self.map.vsync, level);
	}

	/// Drive the DAC blanking line.
	#[inline(always)]
	pub fn blank(&mut self, asserted: bool) {
		let level = if asserted {
			BLANK_POLARITY.enabled()
		} else {
			BLANK_POLARITY.disabled()
		};
		self.drive(self.map.blank, level);
	}

	/// Everything idle: syncs released, output blanked, colours black.
	pub fn idle(&mut self) {
		self.hsync(false);
		self.vsync(false);
		self.blank(true);
		self.emit_black();
	}

	#[inline(always)]
	fn drive(&mut self, pin: u8, high: bool) {
		if high {
			self.pins.set_high(1 << pin);
		} else {
			self.pins.set_low(1 << pin);
		}
	}

	/// The wiring in use.
	pub fn map(&self) -> &PinMap {
		&self.map
	}

	/// Borrow the underlying pins.
	pub fn pins(&self) -> &P {
		&self.pins
	}

	/// Mutably borrow the underlying pins.
	pub fn pins_mut(&mut self) -> &mut P {
		&mut self.pins
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
