//! # Engine slot
//!
//! Interrupt handlers are free functions, so they need somewhere global to
//! find the engine. There is one engine per device, installed once at
//! start-up, and this is where it lives.

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

use core::cell::UnsafeCell;
use core::mem::MaybeUninit;
use core::sync::atomic::{AtomicBool, Ordering};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// A process-wide, install-once home for a value used by interrupt handlers.
///
/// Interrupt handlers borrow the value without taking a lock. Anyone else
/// must go through [`EngineSlot::with`], which holds a critical section so
/// no handler can run at the same time.
pub struct EngineSlot<T> {
	installed: AtomicBool,
	value: UnsafeCell<MaybeUninit<T>>,
}

// Note (unsafe): access is either from the interrupt handlers (which the
// caller of `with_interrupt` promises do not nest) or inside a critical
// section.
unsafe impl<T: Send> Sync for EngineSlot<T> {}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl<T> EngineSlot<T> {
	/// An empty slot, suitable for a `static`.
	pub const fn new() -> EngineSlot<T> {
		EngineSlot {
			installed: AtomicBool::new(false),
			value: UnsafeCell::new(MaybeUninit::uninit()),
		}
	}

	/// Put `value` in the slot. Gives it back if the slot is already full.
	pub fn install(&self, value: T) -> Result<(), T> {
		critical_section::with(|_cs| {
			if self.installed.load(Ordering::Acquire) {
				return Err(value);
			}
			// Note (unsafe): nothing can observe the slot until `installed`
			// is set, and we are in a critical section.
			unsafe {
				(*self.value.get()).write(value);
			}
			self.installed.store(true, Ordering::Release);
			Ok(())
		})
	}

	/// Has a value been installed?
	pub fn is_installed(&self) -> bool {
		self.installed.load(Ordering::Acquire)
	}

	/// Run `f` on the value from outside the interrupt handlers (to stop,
	/// restart or inspect the engine). Returns `None` if the slot is empty.
	pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
		critical_section::with(|_cs| {
			// Note (unsafe): interrupts are masked, so this is the only
			// reference.
			unsafe { self.get_mut() }.map(f)
		})
	}

	/// Run `f` on the value from an interrupt handler, without a lock.
	/// Returns `None` if the slot is empty.
	///
	/// # Safety
	///
	/// Every handler that calls this on the same slot must run at the same
	/// interrupt priority, so that none can pre-empt another.
	#[inline(always)]
	pub unsafe fn with_interrupt<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
		self.get_mut().map(f)
	}

	unsafe fn get_mut(&self) -> Option<&mut T> {
		if self.installed.load(Ordering::Acquire) {
			Some((*self.value.get()).assume_init_mut())
		} else {
			None
		}
	}
}

impl<T> Default for EngineSlot<T> {
	fn default() -> EngineSlot<T> {
		EngineSlot::new()
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
