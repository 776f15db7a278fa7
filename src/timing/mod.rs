//! # Timing state machine
//!
//! Generates the VGA signal. Both axes run the same four-phase cycle:
//!
//! ```text
//! ActivePixel -> FrontPorch -> Sync -> BackPorch -> ActivePixel ...
//! ```
//!
//! The horizontal machine runs once per line, fetching pixels from a
//! [`PixelSource`] and putting them out through a [`ColourBus`]. When the
//! last active line has finished, control passes to the vertical machine,
//! which either has its own alarm ([`VerticalDrive::DedicatedTimer`]) or
//! counts whole lines while the horizontal machine keeps producing sync
//! pulses ([`VerticalDrive::ChainedToLine`]).
//!
//! There are two ways of driving the horizontal machine:
//!
//! * [`Strategy::PhaseChained`] - an alarm at the end of every pixel and
//!   every phase. Every transition is an interrupt.
//! * [`Strategy::FreeRunning`] - one alarm per line. The handler reads the
//!   free-running counter and spins until each threshold passes, then arms
//!   the start of the next line.
//!
//! The state is an explicit enum per axis, so the whole thing can be driven
//! from a test by firing alarms at it. Everything here runs in interrupt
//! context: no allocation, no locks, no blocking.

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

mod cursor;
mod schedule;
mod slot;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use core::sync::atomic::{AtomicU32, Ordering};

use crate::{
	error::ConfigError,
	framebuffer::PixelSource,
	mode::ModeDescriptor,
	output::{ColourBus, PinMap, SignalPins},
};

pub use cursor::{ScanCursor, Step};
pub use schedule::Schedule;
pub use slot::EngineSlot;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// One of the four phases of an axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
	/// Pixels are being sent
	ActivePixel,
	/// Blanking, before the sync pulse
	FrontPorch,
	/// Sync pulse asserted
	Sync,
	/// Blanking, after the sync pulse
	BackPorch,
}

/// The two hardware alarms the engine uses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alarm {
	/// Paces pixels and horizontal phases
	Horizontal,
	/// Paces vertical phases, with [`VerticalDrive::DedicatedTimer`]
	Vertical,
}

/// A free-running counter with absolute-compare alarms.
pub trait AlarmTimer {
	/// The counter value, in ticks. Wraps at `u32::MAX`.
	fn now(&self) -> u32;

	/// Fire `alarm` when the counter reaches `at`, replacing any earlier target.
	fn arm(&mut self, alarm: Alarm, at: u32);

	/// Fire `alarm` as soon as possible.
	fn force(&mut self, alarm: Alarm);

	/// Stop `alarm` firing.
	fn disarm(&mut self, alarm: Alarm);

	/// Clear a pending interrupt for `alarm`.
	fn acknowledge(&mut self, _alarm: Alarm) {}
}

/// How the horizontal machine is paced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Strategy {
	/// An alarm per pixel and per phase
	PhaseChained,
	/// An alarm per line, spinning on the counter in between
	FreeRunning,
}

/// What paces the vertical machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VerticalDrive {
	/// The vertical alarm, at the exact vertical phase lengths. The
	/// horizontal alarm is idle during vertical blanking.
	DedicatedTimer,
	/// Whole lines counted by the horizontal machine, which keeps producing
	/// H-Sync during vertical blanking.
	ChainedToLine,
}

/// Which framebuffer axis a line runs along.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanOrder {
	/// A line is a row: x steps per pixel, y per line
	RowMajor,
	/// A line is a column: y steps per pixel, x per line
	ColumnMajor,
}

/// Runtime choices for the engine, checked once by [`ScanEngine::new`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
	/// Horizontal pacing
	pub strategy: Strategy,
	/// Vertical pacing
	pub vertical: VerticalDrive,
	/// Line direction
	pub order: ScanOrder,
	/// Decimation; 1 sends every pixel
	pub stride: u16,
	/// Timer counter rate
	pub tick_hz: u32,
	/// Largest rounding error allowed on any threshold
	pub tolerance_ns: u32,
}

/// Counters the engine updates and anyone can read.
pub struct FrameStats {
	frames: AtomicU32,
	late_alarms: AtomicU32,
}

/// The signal generator.
///
/// Install it in an [`EngineSlot`] and call [`ScanEngine::on_alarm`] from the
/// timer interrupt handlers.
pub struct ScanEngine<'a, S, P, T> {
	source: &'a S,
	bus: ColourBus<P>,
	timer: T,
	stats: &'a FrameStats,
	config: EngineConfig,
	schedule: Schedule,
	cursor: ScanCursor,
	h_phase: Phase,
	v_phase: Phase,
	/// Line within the frame, counting vertical blanking lines
	line: u16,
	/// Pixel tick within the line
	pixel: u16,
	/// Counter value at the start of the current frame
	frame_start: u32,
	/// V-Sync level to drive when the next free-running line starts
	pending_vsync: Option<bool>,
	running: bool,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// Has the counter reached `at`? Compared as a signed difference so the
/// counter can wrap.
#[inline(always)]
fn ticks_until(now: u32, at: u32) -> i32 {
	at.wrapping_sub(now) as i32
}

impl Phase {
	/// All four, in order.
	pub const ALL: [Phase; 4] = [
		Phase::ActivePixel,
		Phase::FrontPorch,
		Phase::Sync,
		Phase::BackPorch,
	];

	/// The phase that follows this one.
	pub const fn next(self) -> Phase {
		match self {
			Phase::ActivePixel => Phase::FrontPorch,
			Phase::FrontPorch => Phase::Sync,
			Phase::Sync => Phase::BackPorch,
			Phase::BackPorch => Phase::ActivePixel,
		}
	}
}

impl EngineConfig {
	/// What the firmware runs: the RP2040's 1 MHz timer, spinning between
	/// line alarms, every fourth pixel of every fourth row.
	pub const DEFAULT: EngineConfig = EngineConfig {
		strategy: Strategy::FreeRunning,
		vertical: VerticalDrive::DedicatedTimer,
		order: ScanOrder::RowMajor,
		stride: 4,
		tick_hz: 1_000_000,
		tolerance_ns: 500,
	};

	/// An 80 MHz timer with an alarm per pixel, columns scanned top to
	/// bottom, and a separate vertical timer.
	pub const REFERENCE: EngineConfig = EngineConfig {
		strategy: Strategy::PhaseChained,
		vertical: VerticalDrive::DedicatedTimer,
		order: ScanOrder::ColumnMajor,
		stride: 1,
		tick_hz: 80_000_000,
		tolerance_ns: 500,
	};

	/// Check this configuration can generate `mode`.
	pub fn validate(&self, mode: &ModeDescriptor) -> Result<(), ConfigError> {
		mode.validate()?;
		let cursor = ScanCursor::new(mode.width, mode.height, self.order, self.stride)?;
		Schedule::new(mode, self, cursor.pixels_per_line(), cursor.lines())?;
		Ok(())
	}
}

impl Default for EngineConfig {
	fn default() -> EngineConfig {
		EngineConfig::DEFAULT
	}
}

impl FrameStats {
	/// All zero.
	pub const fn new() -> FrameStats {
		FrameStats {
			frames: AtomicU32::new(0),
			late_alarms: AtomicU32::new(0),
		}
	}

	/// Frames completed since start-up.
	pub fn frames(&self) -> u32 {
		self.frames.load(Ordering::Relaxed)
	}

	/// Alarms armed for a time that had already passed.
	pub fn late_alarms(&self) -> u32 {
		self.late_alarms.load(Ordering::Relaxed)
	}

	// Only the interrupt writes these, so load-then-store is enough (and
	// the Cortex-M0+ has nothing better).

	fn frame_done(&self) {
		let frames = self.frames.load(Ordering::Relaxed);
		self.frames.store(frames.wrapping_add(1), Ordering::Relaxed);
	}

	fn alarm_late(&self) {
		let late = self.late_alarms.load(Ordering::Relaxed);
		self.late_alarms.store(late.wrapping_add(1), Ordering::Relaxed);
	}
}

impl Default for FrameStats {
	fn default() -> FrameStats {
		FrameStats::new()
	}
}

impl<'a, S, P, T> ScanEngine<'a, S, P, T>
where
	S: PixelSource,
	P: SignalPins,
	T: AlarmTimer,
{
	/// Check everything and build an engine. Nothing is driven until
	/// [`start`](Self::start).
	pub fn new(
		mode: &ModeDescriptor,
		config: EngineConfig,
		source: &'a S,
		pins: P,
		map: PinMap,
		timer: T,
		stats: &'a FrameStats,
	) -> Result<ScanEngine<'a, S, P, T>, ConfigError> {
		mode.validate()?;
		if source.width() != mode.width || source.height() != mode.height {
			return Err(ConfigError::SizeMismatch);
		}
		let cursor = ScanCursor::new(mode.width, mode.height, config.order, config.stride)?;
		let schedule = Schedule::new(mode, &config, cursor.pixels_per_line(), cursor.lines())?;
		let bus = ColourBus::new(pins, map, mode.hsync, mode.vsync)?;
		info!(
			"Engine: {}x{}, stride {}, {} Hz timer",
			mode.width,
			mode.height,
			config.stride,
			config.tick_hz
		);
		Ok(ScanEngine {
			source,
			bus,
			timer,
			stats,
			config,
			schedule,
			cursor,
			h_phase: Phase::ActivePixel,
			v_phase: Phase::ActivePixel,
			line: 0,
			pixel: 0,
			frame_start: 0,
			pending_vsync: None,
			running: false,
		})
	}

	/// Idle the outputs and arm the first frame, one line from now.
	pub fn start(&mut self) {
		self.bus.idle();
		self.cursor.reset();
		self.line = 0;
		self.pixel = 0;
		self.h_phase = Phase::ActivePixel;
		self.v_phase = Phase::ActivePixel;
		self.pending_vsync = None;
		self.frame_start = self.timer.now().wrapping_add(self.schedule.line_ticks());
		self.running = true;
		self.arm(Alarm::Horizontal, self.frame_start);
	}

	/// Disarm both alarms and idle the outputs.
	pub fn stop(&mut self) {
		self.running = false;
		self.pending_vsync = None;
		self.timer.disarm(Alarm::Horizontal);
		self.timer.disarm(Alarm::Vertical);
		self.bus.idle();
	}

	/// Call this from the interrupt handler for `alarm`.
	#[inline]
	pub fn on_alarm(&mut self, alarm: Alarm) {
		self.timer.acknowledge(alarm);
		if !self.running {
			return;
		}
		match (alarm, self.config.strategy) {
			(Alarm::Horizontal, Strategy::PhaseChained) => self.phase_chained_horizontal(),
			(Alarm::Horizontal, Strategy::FreeRunning) => self.free_running_line(),
			(Alarm::Vertical, _) => self.dedicated_vertical(),
		}
	}

	/// One horizontal alarm, with an alarm per phase.
	fn phase_chained_horizontal(&mut self) {
		let (frame_start, line) = (self.frame_start, self.line);
		match self.h_phase {
			Phase::ActivePixel if self.pixel < self.schedule.pixels_per_line() => {
				self.pixel_tick();
			}
			Phase::ActivePixel => {
				self.begin_blanking();
				self.h_phase = Phase::FrontPorch;
				let at = self.schedule.h_end(frame_start, line, Phase::FrontPorch);
				self.arm(Alarm::Horizontal, at);
			}
			Phase::FrontPorch => {
				self.bus.hsync(true);
				self.h_phase = Phase::Sync;
				let at = self.schedule.h_end(frame_start, line, Phase::Sync);
				self.arm(Alarm::Horizontal, at);
			}
			Phase::Sync => {
				self.bus.hsync(false);
				self.h_phase = Phase::BackPorch;
				let at = self.schedule.h_end(frame_start, line, Phase::BackPorch);
				self.arm(Alarm::Horizontal, at);
			}
			Phase::BackPorch => {
				if self.next_line() {
					self.start_chained_line();
				}
			}
		}
	}

	/// Begin a line that has just started, with an alarm per phase.
	fn start_chained_line(&mut self) {
		if self.v_phase == Phase::ActivePixel {
			self.pixel_tick();
		} else {
			// Vertical blanking: nothing to send, wait for the end of the
			// active period.
			self.pixel = self.schedule.pixels_per_line();
			let at = self
				.schedule
				.h_end(self.frame_start, self.line, Phase::ActivePixel);
			self.arm(Alarm::Horizontal, at);
		}
	}

	/// Send one pixel and arm the start of the next (or the end of the
	/// active period, after the last).
	#[inline(always)]
	fn pixel_tick(&mut self) {
		if self.pixel == 0 {
			self.bus.blank(false);
		}
		self.emit_next_pixel();
		self.pixel += 1;
		let at = self
			.schedule
			.pixel_start(self.frame_start, self.line, self.pixel);
		self.arm(Alarm::Horizontal, at);
	}

	/// A whole line, from its start to the end of its sync pulse, spinning
	/// on the counter between thresholds.
	fn free_running_line(&mut self) {
		let (frame_start, line) = (self.frame_start, self.line);
		if let Some(level) = self.pending_vsync.take() {
			self.bus.vsync(level);
		}
		if self.v_phase == Phase::ActivePixel {
			self.bus.blank(false);
			for pixel in 0..self.schedule.pixels_per_line() {
				self.spin_until(self.schedule.pixel_start(frame_start, line, pixel));
				self.emit_next_pixel();
			}
		}
		self.spin_until(self.schedule.h_end(frame_start, line, Phase::ActivePixel));
		self.begin_blanking();
		self.spin_until(self.schedule.h_end(frame_start, line, Phase::FrontPorch));
		self.bus.hsync(true);
		self.spin_until(self.schedule.h_end(frame_start, line, Phase::Sync));
		self.bus.hsync(false);
		self.h_phase = Phase::BackPorch;
		if self.next_line() {
			let at = self.schedule.line_start(self.frame_start, self.line);
			self.arm(Alarm::Horizontal, at);
		}
	}

	/// One vertical alarm.
	fn dedicated_vertical(&mut self) {
		let frame_start = self.frame_start;
		match self.v_phase {
			Phase::FrontPorch => {
				self.bus.vsync(true);
				self.v_phase = Phase::Sync;
				let at = self.schedule.v_end(frame_start, Phase::Sync);
				self.arm(Alarm::Vertical, at);
			}
			Phase::Sync => {
				self.bus.vsync(false);
				self.v_phase = Phase::BackPorch;
				let at = self.schedule.v_end(frame_start, Phase::BackPorch);
				self.arm(Alarm::Vertical, at);
			}
			Phase::BackPorch => {
				self.timer.disarm(Alarm::Vertical);
				self.new_frame();
				match self.config.strategy {
					Strategy::PhaseChained => self.pixel_tick(),
					Strategy::FreeRunning => self.free_running_line(),
				}
			}
			Phase::ActivePixel => {
				// Stray; the horizontal machine owns the active period
			}
		}
	}

	/// The back porch of `self.line` is over. Move to the next line, doing
	/// the vertical bookkeeping.
	///
	/// Returns `false` if the horizontal machine should stop because the
	/// vertical alarm has taken over.
	fn next_line(&mut self) -> bool {
		self.line += 1;
		self.pixel = 0;
		self.h_phase = Phase::ActivePixel;
		let lines = self.schedule.lines();
		match self.config.vertical {
			VerticalDrive::DedicatedTimer => {
				if self.line >= lines {
					self.timer.disarm(Alarm::Horizontal);
					self.v_phase = Phase::FrontPorch;
					let at = self.schedule.v_end(self.frame_start, Phase::FrontPorch);
					self.arm(Alarm::Vertical, at);
					return false;
				}
			}
			VerticalDrive::ChainedToLine => {
				let [front_porch, sync, back_porch] = self.schedule.blank_lines();
				let line = self.line;
				if line == lines {
					self.v_phase = Phase::FrontPorch;
				} else if line == lines + front_porch {
					self.line_start_vsync(true);
					self.v_phase = Phase::Sync;
				} else if line == lines + front_porch + sync {
					self.line_start_vsync(false);
					self.v_phase = Phase::BackPorch;
				} else if line >= lines + front_porch + sync + back_porch {
					self.new_frame();
				}
			}
		}
		true
	}

	/// Drive V-Sync at the start of the line `next_line` just moved to. The
	/// phase-chained machine is already there; the free-running one finished
	/// at the end of the sync pulse and applies it when its next alarm fires.
	fn line_start_vsync(&mut self, asserted: bool) {
		match self.config.strategy {
			Strategy::PhaseChained => self.bus.vsync(asserted),
			Strategy::FreeRunning => self.pending_vsync = Some(asserted),
		}
	}

	/// Everything back to the top-left pixel.
	fn new_frame(&mut self) {
		self.frame_start = self.frame_start.wrapping_add(self.schedule.frame_ticks());
		self.line = 0;
		self.pixel = 0;
		self.cursor.reset();
		self.h_phase = Phase::ActivePixel;
		self.v_phase = Phase::ActivePixel;
		self.stats.frame_done();
		self.source.frame_boundary();
	}

	#[inline(always)]
	fn emit_next_pixel(&mut self) {
		let (x, y) = self.cursor.position();
		// Note (unsafe): the cursor never leaves the mode's resolution, and
		// `new` checked the source has that resolution.
		let colour = unsafe { self.source.pixel_unchecked(x, y) };
		self.bus.emit_pixel(colour);
		self.cursor.advance();
	}

	#[inline(always)]
	fn begin_blanking(&mut self) {
		self.bus.emit_black();
		self.bus.blank(true);
	}

	/// Arm `alarm` for `at`, or fire it now if `at` is not in the future.
	#[inline(always)]
	fn arm(&mut self, alarm: Alarm, at: u32) {
		let remaining = ticks_until(self.timer.now(), at);
		if remaining > 0 {
			self.timer.arm(alarm, at);
		} else {
			if remaining < 0 {
				self.stats.alarm_late();
			}
			self.timer.force(alarm);
		}
	}

	/// Spin until the counter reaches `at`. Gives up at once if `at` is more
	/// than a line away, so this can never spin for longer than a line.
	#[inline(always)]
	fn spin_until(&self, at: u32) {
		let limit = self.schedule.line_ticks();
		loop {
			let remaining = ticks_until(self.timer.now(), at);
			if remaining <= 0 || remaining as u32 > limit {
				break;
			}
			core::hint::spin_loop();
		}
	}

	/// Is the engine armed?
	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Current (horizontal, vertical) phases.
	pub fn phases(&self) -> (Phase, Phase) {
		(self.h_phase, self.v_phase)
	}

	/// Current line, counting vertical blanking lines.
	pub fn line(&self) -> u16 {
		self.line
	}

	/// The scan cursor.
	pub fn cursor(&self) -> &ScanCursor {
		&self.cursor
	}

	/// The thresholds in use.
	pub fn schedule(&self) -> &Schedule {
		&self.schedule
	}

	/// The configuration in use.
	pub fn config(&self) -> &EngineConfig {
		&self.config
	}

	/// Counter value at the start of the current frame.
	pub fn frame_start(&self) -> u32 {
		self.frame_start
	}

	/// The shared counters.
	pub fn stats(&self) -> &FrameStats {
		self.stats
	}

	/// The output lines.
	pub fn bus(&self) -> &ColourBus<P> {
		&self.bus
	}

	/// The timer.
	pub fn timer(&self) -> &T {
		&self.timer
	}

	/// The timer, mutably.
	pub fn timer_mut(&mut self) -> &mut T {
		&mut self.timer
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
