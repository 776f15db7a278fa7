//! Whole frames through the scan engine, on simulated pins and timers.

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

mod common;

use common::{falls, low_widths, run_frames, small_mode, RecordingPins, SimTimer};
use pico_vga_gpu::{
	framebuffer::blank_storage,
	timing::{Alarm, Phase, ScanCursor, ScanOrder, Strategy, VerticalDrive},
	DoubleBuffer, EngineConfig, FrameStats, Framebuffer, PinMap, Rgb888, ScanEngine,
};

const BLACK: Rgb888 = Rgb888::new(0, 0, 0);
const RED: Rgb888 = Rgb888::new(0xFF, 0, 0);

/// What the pins saw by the end of a frame.
struct Snapshot {
	pixels: usize,
	hsync: u32,
	vsync: u32,
}

fn config(
	strategy: Strategy,
	vertical: VerticalDrive,
	order: ScanOrder,
	stride: u16,
) -> EngineConfig {
	EngineConfig {
		strategy,
		vertical,
		order,
		stride,
		tick_hz: 10_000_000,
		tolerance_ns: 500,
	}
}

fn snapshot(pins: &RecordingPins) -> Snapshot {
	Snapshot {
		pixels: pins.channels.len() / 3,
		hsync: pins.hsync_pulses,
		vsync: pins.vsync_pulses,
	}
}

/// Scan two frames of a patterned `width` x `height` image. Checks that
/// both frames carry every pixel in cursor order, with one V-Sync pulse
/// each and no late alarms, and returns the H-Sync pulses per frame.
fn scan_two_frames(width: u16, height: u16, config: EngineConfig) -> u32 {
	let mode = small_mode(width, height);
	let storage = blank_storage::<64>();
	let fb = Framebuffer::new(&storage, width, height).unwrap();
	for y in 0..height {
		for x in 0..width {
			fb.set(x, y, Rgb888::new(x as u8 * 16, y as u8 * 16, 0x80));
		}
	}
	let stats = FrameStats::new();
	let mut engine = ScanEngine::new(
		&mode,
		config,
		&fb,
		RecordingPins::new(PinMap::PICO),
		PinMap::PICO,
		SimTimer::starting_at(1_000),
		&stats,
	)
	.unwrap();

	engine.start();
	run_frames(&mut engine, 1);
	let first = snapshot(engine.bus().pins());
	run_frames(&mut engine, 1);
	let second = snapshot(engine.bus().pins());

	let mut cursor = ScanCursor::new(width, height, config.order, config.stride).unwrap();
	let expected: Vec<Rgb888> = (0..cursor.ticks_per_frame())
		.map(|_| {
			let (x, y) = cursor.position();
			cursor.advance();
			fb.get(x, y)
		})
		.collect();
	let pixels = engine.bus().pins().pixels();
	assert_eq!(&pixels[..expected.len()], &expected[..]);
	assert_eq!(&pixels[expected.len()..2 * expected.len()], &expected[..]);
	assert_eq!(second.pixels - first.pixels, expected.len());
	assert_eq!(second.vsync - first.vsync, 1);
	assert_eq!(stats.frames(), 2);
	assert_eq!(stats.late_alarms(), 0);
	second.hsync - first.hsync
}

fn assert_near(actual: u32, expected: u32, what: &str) {
	assert!(
		actual.abs_diff(expected) <= 1,
		"{} was {} ticks, expected {}",
		what,
		actual,
		expected
	);
}

/// Scan three frames of an 8 x 4 image with timestamped sync pins, and
/// check every sync edge is where the schedule puts it, give or take a
/// tick. Returns the V-Sync falling edges.
fn check_sync_timing(strategy: Strategy, vertical: VerticalDrive) -> Vec<u32> {
	let mode = small_mode(8, 4);
	let storage = blank_storage::<32>();
	let fb = Framebuffer::new(&storage, 8, 4).unwrap();
	let stats = FrameStats::new();
	let timer = SimTimer::starting_at(1_000);
	let pins = RecordingPins::with_clock(PinMap::PICO, timer.clock());
	let mut engine = ScanEngine::new(
		&mode,
		config(strategy, vertical, ScanOrder::RowMajor, 1),
		&fb,
		pins,
		PinMap::PICO,
		timer,
		&stats,
	)
	.unwrap();
	engine.start();
	run_frames(&mut engine, 3);
	assert_eq!(stats.late_alarms(), 0);

	let schedule = engine.schedule();
	let line = schedule.line_ticks();
	let frame = schedule.frame_ticks();
	let hsync_width = schedule.h_end(0, 0, Phase::Sync) - schedule.h_end(0, 0, Phase::FrontPorch);
	let vsync_width = schedule.v_end(0, Phase::Sync) - schedule.v_end(0, Phase::FrontPorch);
	// 100 ns ticks: 12 us lines, 8 lines a frame, 2 us and 2 line pulses
	assert_eq!((line, frame, hsync_width, vsync_width), (120, 960, 20, 240));
	let first_frame = engine.frame_start().wrapping_sub(3 * frame);

	let pins = engine.bus().pins();
	let widths = low_widths(&pins.hsync_edges);
	assert!(!widths.is_empty());
	for width in widths {
		assert_near(width, hsync_width, "H-Sync pulse");
	}
	let widths = low_widths(&pins.vsync_edges);
	assert_eq!(widths.len(), 3);
	for width in widths {
		assert_near(width, vsync_width, "V-Sync pulse");
	}

	let hsync_falls = falls(&pins.hsync_edges);
	let per_frame = match vertical {
		VerticalDrive::DedicatedTimer => 4,
		VerticalDrive::ChainedToLine => 8,
	};
	assert_eq!(hsync_falls.len(), 3 * per_frame);
	assert_near(
		hsync_falls[0],
		schedule.h_end(first_frame, 0, Phase::FrontPorch),
		"first H-Sync",
	);
	for frame_falls in hsync_falls.chunks_exact(per_frame) {
		for pair in frame_falls.windows(2) {
			assert_near(pair[1].wrapping_sub(pair[0]), line, "line period");
		}
	}
	for pair in hsync_falls.iter().zip(&hsync_falls[per_frame..]) {
		assert_near(pair.1.wrapping_sub(*pair.0), frame, "frame period");
	}

	let vsync_falls = falls(&pins.vsync_edges);
	assert_eq!(vsync_falls.len(), 3);
	for (index, &at) in vsync_falls.iter().enumerate() {
		let frame_start = first_frame.wrapping_add(index as u32 * frame);
		assert_near(at, schedule.v_end(frame_start, Phase::FrontPorch), "V-Sync start");
	}
	vsync_falls
}

#[test]
fn free_running_vertical_alarm_timing() {
	check_sync_timing(Strategy::FreeRunning, VerticalDrive::DedicatedTimer);
}

#[test]
fn free_running_line_counted_timing() {
	check_sync_timing(Strategy::FreeRunning, VerticalDrive::ChainedToLine);
}

#[test]
fn phase_chained_vertical_alarm_timing() {
	check_sync_timing(Strategy::PhaseChained, VerticalDrive::DedicatedTimer);
}

#[test]
fn phase_chained_line_counted_timing() {
	check_sync_timing(Strategy::PhaseChained, VerticalDrive::ChainedToLine);
}

#[test]
fn line_counted_vsync_starts_with_a_line() {
	let free = check_sync_timing(Strategy::FreeRunning, VerticalDrive::ChainedToLine);
	let chained = check_sync_timing(Strategy::PhaseChained, VerticalDrive::ChainedToLine);
	assert_eq!(free.len(), chained.len());
	for (free, chained) in free.into_iter().zip(chained) {
		assert_near(free, chained, "free-running V-Sync start");
	}
}

#[test]
fn free_running_with_vertical_alarm() {
	let hsync = scan_two_frames(
		8,
		4,
		config(
			Strategy::FreeRunning,
			VerticalDrive::DedicatedTimer,
			ScanOrder::RowMajor,
			1,
		),
	);
	// The horizontal machine idles through vertical blanking
	assert_eq!(hsync, 4);
}

#[test]
fn free_running_with_line_counted_vertical() {
	let hsync = scan_two_frames(
		8,
		4,
		config(
			Strategy::FreeRunning,
			VerticalDrive::ChainedToLine,
			ScanOrder::RowMajor,
			1,
		),
	);
	// Four active lines, then one, two and one blank lines
	assert_eq!(hsync, 8);
}

#[test]
fn phase_chained_with_vertical_alarm() {
	let hsync = scan_two_frames(
		8,
		4,
		config(
			Strategy::PhaseChained,
			VerticalDrive::DedicatedTimer,
			ScanOrder::RowMajor,
			1,
		),
	);
	assert_eq!(hsync, 4);
}

#[test]
fn phase_chained_column_major() {
	let hsync = scan_two_frames(
		4,
		4,
		config(
			Strategy::PhaseChained,
			VerticalDrive::ChainedToLine,
			ScanOrder::ColumnMajor,
			1,
		),
	);
	assert_eq!(hsync, 8);
}

#[test]
fn strided_scan_samples_every_other_pixel() {
	scan_two_frames(
		8,
		4,
		config(
			Strategy::FreeRunning,
			VerticalDrive::DedicatedTimer,
			ScanOrder::RowMajor,
			2,
		),
	);
}

#[test]
fn double_buffer_swaps_between_frames() {
	let mode = small_mode(4, 2);
	let first = blank_storage::<8>();
	let second = blank_storage::<8>();
	let buffers = DoubleBuffer::new(
		Framebuffer::new(&first, 4, 2).unwrap(),
		Framebuffer::new(&second, 4, 2).unwrap(),
	)
	.unwrap();
	buffers.back().fill(RED);
	buffers.present();

	let stats = FrameStats::new();
	let mut engine = ScanEngine::new(
		&mode,
		config(
			Strategy::PhaseChained,
			VerticalDrive::ChainedToLine,
			ScanOrder::RowMajor,
			1,
		),
		&buffers,
		RecordingPins::new(PinMap::PICO),
		PinMap::PICO,
		SimTimer::default(),
		&stats,
	)
	.unwrap();
	engine.start();
	run_frames(&mut engine, 1);

	assert!(!buffers.is_swap_pending());
	let pixels = engine.bus().pins().pixels();
	// The whole first frame comes from the old front buffer, and the first
	// pixel of the next from the new one.
	assert_eq!(pixels.len(), 9);
	assert!(pixels[..8].iter().all(|&p| p == BLACK));
	assert_eq!(pixels[8], RED);
}

#[test]
fn stop_leaves_nothing_armed() {
	let mode = small_mode(4, 2);
	let storage = blank_storage::<8>();
	let fb = Framebuffer::new(&storage, 4, 2).unwrap();
	let stats = FrameStats::new();
	let mut engine = ScanEngine::new(
		&mode,
		config(
			Strategy::FreeRunning,
			VerticalDrive::DedicatedTimer,
			ScanOrder::RowMajor,
			1,
		),
		&fb,
		RecordingPins::new(PinMap::PICO),
		PinMap::PICO,
		SimTimer::default(),
		&stats,
	)
	.unwrap();
	engine.start();
	run_frames(&mut engine, 1);
	engine.stop();
	assert!(!engine.is_running());
	assert!(!engine.timer().is_armed(Alarm::Horizontal));
	assert!(!engine.timer().is_armed(Alarm::Vertical));
	assert_eq!(engine.timer_mut().next_alarm(), None);
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
