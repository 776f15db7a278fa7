//! Simulated hardware for the integration tests.

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

#![allow(dead_code)]

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use std::sync::{
	atomic::{AtomicU32, Ordering},
	Arc,
};

use pico_vga_gpu::{
	mode::{ModeDescriptor, PhaseDurations, SyncPolarity},
	output::{PinMap, SignalPins},
	timing::{Alarm, AlarmTimer, ScanEngine},
	PixelSource, Rgb888,
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// The simulated counter, shared so the pins can timestamp their edges.
pub type Clock = Arc<AtomicU32>;

/// A counter that moves on one tick every time the engine reads it, with
/// two compare alarms.
#[derive(Debug, Default)]
pub struct SimTimer {
	now: Clock,
	armed: [Option<u32>; 2],
	forced: [bool; 2],
}

/// A level change on a sync pin.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Edge {
	/// Counter value when the pin changed
	pub at: u32,
	/// Level after the change
	pub high: bool,
}

/// Keeps the level of every pin and decodes what the engine puts on them.
#[derive(Debug)]
pub struct RecordingPins {
	map: PinMap,
	level: u32,
	/// `(latch pin, value)` for every single-channel latch strobe
	pub channels: Vec<(u8, u8)>,
	/// Falling edges on H-Sync
	pub hsync_pulses: u32,
	/// Falling edges on V-Sync
	pub vsync_pulses: u32,
	clock: Option<Clock>,
	/// Every H-Sync change, once a clock is attached
	pub hsync_edges: Vec<Edge>,
	/// Every V-Sync change, once a clock is attached
	pub vsync_edges: Vec<Edge>,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl SimTimer {
	pub fn starting_at(now: u32) -> SimTimer {
		SimTimer {
			now: Arc::new(AtomicU32::new(now)),
			..SimTimer::default()
		}
	}

	/// A handle on the counter. Reading it through the handle does not
	/// move it on.
	pub fn clock(&self) -> Clock {
		Arc::clone(&self.now)
	}

	pub fn is_armed(&self, alarm: Alarm) -> bool {
		self.armed[alarm as usize].is_some() || self.forced[alarm as usize]
	}

	/// Jump forward to the next alarm and return it. Forced alarms go first.
	pub fn next_alarm(&mut self) -> Option<Alarm> {
		for alarm in [Alarm::Horizontal, Alarm::Vertical] {
			if self.forced[alarm as usize] {
				self.forced[alarm as usize] = false;
				return Some(alarm);
			}
		}
		let now = self.now.load(Ordering::Relaxed);
		let (alarm, at) = [Alarm::Horizontal, Alarm::Vertical]
			.into_iter()
			.filter_map(|alarm| self.armed[alarm as usize].map(|at| (alarm, at)))
			.min_by_key(|(_, at)| at.wrapping_sub(now))?;
		self.armed[alarm as usize] = None;
		if (at.wrapping_sub(now) as i32) > 0 {
			self.now.store(at, Ordering::Relaxed);
		}
		Some(alarm)
	}
}

impl AlarmTimer for SimTimer {
	fn now(&self) -> u32 {
		self.now.fetch_add(1, Ordering::Relaxed)
	}

	fn arm(&mut self, alarm: Alarm, at: u32) {
		self.armed[alarm as usize] = Some(at);
	}

	fn force(&mut self, alarm: Alarm) {
		self.armed[alarm as usize] = None;
		self.forced[alarm as usize] = true;
	}

	fn disarm(&mut self, alarm: Alarm) {
		self.armed[alarm as usize] = None;
		self.forced[alarm as usize] = false;
	}
}

impl RecordingPins {
	pub fn new(map: PinMap) -> RecordingPins {
		RecordingPins {
			map,
			level: 0,
			channels: Vec::new(),
			hsync_pulses: 0,
			vsync_pulses: 0,
			clock: None,
			hsync_edges: Vec::new(),
			vsync_edges: Vec::new(),
		}
	}

	/// Also record when each sync edge happens, according to `clock`.
	pub fn with_clock(map: PinMap, clock: Clock) -> RecordingPins {
		RecordingPins {
			clock: Some(clock),
			..RecordingPins::new(map)
		}
	}

	fn record_sync(&mut self, changed: u32, high: bool) {
		let Some(clock) = &self.clock else {
			return;
		};
		let at = clock.load(Ordering::Relaxed);
		if changed & (1 << self.map.hsync) != 0 {
			self.hsync_edges.push(Edge { at, high });
		}
		if changed & (1 << self.map.vsync) != 0 {
			self.vsync_edges.push(Edge { at, high });
		}
	}

	fn colour_value(&self) -> u8 {
		self.map
			.colour
			.iter()
			.enumerate()
			.filter(|(_, pin)| self.level & (1 << **pin) != 0)
			.fold(0, |value, (bit, _)| value | 1 << bit)
	}

	/// The latched channels, grouped into pixels. Panics if they don't come
	/// in red, green, blue order.
	pub fn pixels(&self) -> Vec<Rgb888> {
		self.channels
			.chunks_exact(3)
			.map(|chunk| {
				let latches = [chunk[0].0, chunk[1].0, chunk[2].0];
				assert_eq!(
					latches,
					[self.map.latch_red, self.map.latch_green, self.map.latch_blue]
				);
				Rgb888::new(chunk[0].1, chunk[1].1, chunk[2].1)
			})
			.collect()
	}
}

impl SignalPins for RecordingPins {
	fn set_high(&mut self, mask: u32) {
		let rising = mask & !self.level;
		self.level |= mask;
		self.record_sync(rising, true);
		let latches = [self.map.latch_red, self.map.latch_green, self.map.latch_blue]
			.into_iter()
			.filter(|pin| rising & (1 << *pin) != 0)
			.collect::<Vec<_>>();
		// All three at once is the black latch between lines
		if let [latch] = latches[..] {
			let value = self.colour_value();
			self.channels.push((latch, value));
		}
	}

	fn set_low(&mut self, mask: u32) {
		let falling = mask & self.level;
		self.level &= !mask;
		self.record_sync(falling, false);
		if falling & (1 << self.map.hsync) != 0 {
			self.hsync_pulses += 1;
		}
		if falling & (1 << self.map.vsync) != 0 {
			self.vsync_pulses += 1;
		}
	}
}

/// When each pin went low.
pub fn falls(edges: &[Edge]) -> Vec<u32> {
	edges.iter().filter(|edge| !edge.high).map(|edge| edge.at).collect()
}

/// How long each low pulse lasted, in ticks.
pub fn low_widths(edges: &[Edge]) -> Vec<u32> {
	edges
		.windows(2)
		.filter(|pair| !pair[0].high && pair[1].high)
		.map(|pair| pair[1].at.wrapping_sub(pair[0].at))
		.collect()
}

/// A small mode: one microsecond per pixel, a 4 us horizontal blank, and a
/// vertical blank of one, two and one lines.
pub fn small_mode(width: u16, height: u16) -> ModeDescriptor {
	let line = u32::from(width) * 1_000 + 4_000;
	ModeDescriptor {
		width,
		height,
		horizontal: PhaseDurations::from_nanos((u32::from(width) * 1_000, 1_000, 2_000, 1_000)),
		vertical: PhaseDurations::from_nanos((u32::from(height) * line, line, 2 * line, line)),
		hsync: SyncPolarity::Negative,
		vsync: SyncPolarity::Negative,
	}
}

/// Feed alarms to the engine until `frames` frames have finished.
pub fn run_frames<S>(engine: &mut ScanEngine<'_, S, RecordingPins, SimTimer>, frames: u32)
where
	S: PixelSource,
{
	let target = engine.stats().frames() + frames;
	let mut budget = 1_000_000;
	while engine.stats().frames() < target {
		let Some(alarm) = engine.timer_mut().next_alarm() else {
			panic!("engine stopped arming alarms");
		};
		engine.on_alarm(alarm);
		budget -= 1;
		assert!(budget > 0, "frame never finished");
	}
}

/// A 24-bit `BI_RGB` bitmap, stored bottom-up.
pub fn bitmap(rows: &[&[(u8, u8, u8)]]) -> Vec<u8> {
	let width = rows[0].len();
	let stride = (width * 3 + 3) & !3;
	let mut out = Vec::new();
	out.extend_from_slice(b"BM");
	out.extend_from_slice(&((54 + stride * rows.len()) as u32).to_le_bytes());
	out.extend_from_slice(&[0; 4]);
	out.extend_from_slice(&54u32.to_le_bytes());
	out.extend_from_slice(&40u32.to_le_bytes());
	out.extend_from_slice(&(width as i32).to_le_bytes());
	out.extend_from_slice(&(rows.len() as i32).to_le_bytes());
	out.extend_from_slice(&1u16.to_le_bytes());
	out.extend_from_slice(&24u16.to_le_bytes());
	out.extend_from_slice(&0u32.to_le_bytes());
	out.extend_from_slice(&[0; 20]);
	for row in rows.iter().rev() {
		let start = out.len();
		for &(r, g, b) in row.iter() {
			out.extend_from_slice(&[b, g, r]);
		}
		out.resize(start + stride, 0);
	}
	out
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
