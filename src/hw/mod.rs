//! # RP2040 back-ends
//!
//! The engine's two hardware seams, bound to RP2040 registers:
//!
//! * [`SioPins`] drives GPIO through the SIO `GPIO_OUT_SET` and
//!   `GPIO_OUT_CLR` registers, one write per mask.
//! * [`TimerAlarms`] uses the free-running 1 MHz TIMER: ALARM0 for the
//!   horizontal machine and ALARM1 for the vertical one.
//!
//! Neither owns its peripheral; the HAL keeps the SIO (for pin set-up) and
//! the TIMER (for delays), and these only touch registers the HAL leaves
//! alone.

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

use rp2040_hal::pac;

use crate::{
	output::SignalPins,
	timing::{Alarm, AlarmTimer},
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The GPIO output bank, via the SIO set and clear registers.
pub struct SioPins {
	_private: (),
}

/// TIMER alarms 0 and 1.
pub struct TimerAlarms {
	_private: (),
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// The 1 MHz TIMER tick rate.
pub const TIMER_HZ: u32 = 1_000_000;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

#[inline(always)]
fn sio() -> &'static pac::sio::RegisterBlock {
	// Note (unsafe): GPIO_OUT_SET / GPIO_OUT_CLR are write-only and atomic
	unsafe { &*pac::SIO::ptr() }
}

#[inline(always)]
fn timer() -> &'static pac::timer::RegisterBlock {
	// Note (unsafe): we only use ALARM0/1 and their interrupt bits; the HAL
	// Timer only reads the counter
	unsafe { &*pac::TIMER::ptr() }
}

impl SioPins {
	/// Drive pins through the SIO.
	///
	/// # Safety
	///
	/// Only one of these may exist, and every pin it is asked to drive must
	/// already be configured as an SIO output.
	pub unsafe fn new() -> SioPins {
		SioPins { _private: () }
	}
}

impl SignalPins for SioPins {
	#[inline(always)]
	fn set_high(&mut self, mask: u32) {
		sio().gpio_out_set().write(|w| unsafe { w.bits(mask) });
	}

	#[inline(always)]
	fn set_low(&mut self, mask: u32) {
		sio().gpio_out_clr().write(|w| unsafe { w.bits(mask) });
	}
}

impl TimerAlarms {
	/// Take over alarms 0 and 1 and enable their interrupts. The NVIC lines
	/// (`TIMER_IRQ_0` and `TIMER_IRQ_1`) are left for the caller to unmask.
	///
	/// # Safety
	///
	/// Only one of these may exist, the TIMER must be out of reset, and
	/// nothing else may use alarms 0 or 1.
	pub unsafe fn new() -> TimerAlarms {
		let bits = Self::bit(Alarm::Horizontal) | Self::bit(Alarm::Vertical);
		timer().armed().write(|w| w.bits(bits));
		timer().intr().write(|w| w.bits(bits));
		timer().inte().modify(|r, w| w.bits(r.bits() | bits));
		TimerAlarms { _private: () }
	}

	#[inline(always)]
	const fn bit(alarm: Alarm) -> u32 {
		match alarm {
			Alarm::Horizontal => 1 << 0,
			Alarm::Vertical => 1 << 1,
		}
	}
}

impl AlarmTimer for TimerAlarms {
	#[inline(always)]
	fn now(&self) -> u32 {
		timer().timerawl().read().bits()
	}

	#[inline(always)]
	fn arm(&mut self, alarm: Alarm, at: u32) {
		let bit = Self::bit(alarm);
		match alarm {
			Alarm::Horizontal => {
				timer().alarm0().write(|w| unsafe { w.bits(at) });
			}
			Alarm::Vertical => {
				timer().alarm1().write(|w| unsafe { w.bits(at) });
			}
		}
		// If the target went by while we were writing it, the compare won't
		// match for another 71 minutes.
		let late = (at.wrapping_sub(self.now()) as i32) <= 0;
		if late && timer().armed().read().bits() & bit != 0 {
			self.force(alarm);
		}
	}

	#[inline(always)]
	fn force(&mut self, alarm: Alarm) {
		let bit = Self::bit(alarm);
		timer().armed().write(|w| unsafe { w.bits(bit) });
		timer().intf().modify(|r, w| unsafe { w.bits(r.bits() | bit) });
	}

	#[inline(always)]
	fn disarm(&mut self, alarm: Alarm) {
		timer()
			.armed()
			.write(|w| unsafe { w.bits(Self::bit(alarm)) });
	}

	#[inline(always)]
	fn acknowledge(&mut self, alarm: Alarm) {
		let bit = Self::bit(alarm);
		timer().intf().modify(|r, w| unsafe { w.bits(r.bits() & !bit) });
		timer().intr().write(|w| unsafe { w.bits(bit) });
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
