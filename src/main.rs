//! # Pico VGA GPU firmware
//!
//! This is the firmware for a Raspberry Pi Pico driving a VGA monitor
//! through three colour latches and a resistor DAC. It:
//!
//! * initialises the clocks and pins,
//! * starts the scan engine on TIMER alarms 0 and 1,
//! * asks the monitor for its native resolution over DDC/CI, and
//! * loads `IMAGE.BMP` from the SD card into the framebuffer.
//!
//! After that the main loop sleeps and everything happens in the two timer
//! interrupts.

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

#![no_std]
#![no_main]

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use core::sync::atomic::AtomicU32;

use cortex_m_rt::entry;
use defmt::*;
use defmt_rtt as _;
use embedded_hal::digital::v2::OutputPin;
use fugit::RateExtU32;
use panic_probe as _;
use pico_vga_gpu::{
	api::{Command, Gpu, Response, Target, GPU_VERSION},
	ddc::Ddc,
	decode::BmpDecoder,
	framebuffer::{blank_storage, Framebuffer},
	hw::{SioPins, TimerAlarms, TIMER_HZ},
	mode::ModeDescriptor,
	output::PinMap,
	storage::sdcard::{FixedTime, SdFileSystem},
	timing::{Alarm, EngineConfig, EngineSlot, FrameStats, ScanEngine},
};
use rp_pico::{
	self,
	hal::{
		self,
		gpio,
		pac::{self, interrupt},
	},
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

type Engine = ScanEngine<'static, Framebuffer<'static>, SioPins, TimerAlarms>;

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// This is the standard RP2040 bootloader. It must be stored in the first 256
/// bytes of the external SPI Flash chip. It will map the external SPI flash
/// chip to address `0x1000_0000` and jump to an Interrupt Vector Table at
/// address `0x1000_0100` (i.e. immediately after the bootloader).
///
/// See `memory.x` for a definition of the `.boot2` section.
#[link_section = ".boot2"]
#[used]
pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_W25Q080;

/// The mode we generate.
const MODE: ModeDescriptor = ModeDescriptor::VGA_640X480;

/// One stored pixel per 8x8 block; a full 640x480 frame won't fit in SRAM.
const SCALE_SHIFT: u8 = 3;

/// Widest BMP row we will decode, in bytes (640 pixels of 32-bit colour).
const ROW_BYTES: usize = 640 * 4;

/// The image shown at boot.
const SPLASH_PATH: &str = "/IMAGE.BMP";

static FRAMEBUFFER_STORAGE: [AtomicU32; Framebuffer::storage_len(
	MODE.width,
	MODE.height,
	SCALE_SHIFT,
)] = blank_storage();

static STATS: FrameStats = FrameStats::new();

/// Shared between `main` (to start it) and the alarm interrupts (to run it).
static ENGINE: EngineSlot<Engine> = EngineSlot::new();

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

/// This is the entry-point to the firmware. It is called by cortex-m-rt once
/// the `.bss` and `.data` sections have been initialised.
#[entry]
fn main() -> ! {
	cortex_m::interrupt::disable();

	info!("{} starting...", GPU_VERSION);

	// Grab the singleton containing all the RP2040 peripherals
	let Some(mut pac) = pac::Peripherals::take() else {
		defmt::panic!("Peripherals already taken");
	};

	// Needed by the clock setup
	let mut watchdog = hal::watchdog::Watchdog::new(pac.WATCHDOG);

	// Run at 126 MHz SYS_PLL, 48 MHz, USB_PLL

	let Ok(xosc) = hal::xosc::setup_xosc_blocking(pac.XOSC, rp_pico::XOSC_CRYSTAL_FREQ.Hz())
	else {
		defmt::panic!("XOSC failed to start");
	};

	// Configure watchdog tick generation to tick over every microsecond. The
	// TIMER counts these ticks.
	watchdog.enable_tick_generation((rp_pico::XOSC_CRYSTAL_FREQ / TIMER_HZ) as u8);

	let mut clocks = hal::clocks::ClocksManager::new(pac.CLOCKS);

	let Ok(pll_sys) = hal::pll::setup_pll_blocking(
		pac.PLL_SYS,
		xosc.operating_frequency(),
		hal::pll::PLLConfig {
			vco_freq: 1512.MHz(),
			refdiv: 1,
			post_div1: 6,
			post_div2: 2,
		},
		&mut clocks,
		&mut pac.RESETS,
	) else {
		defmt::panic!("SYS PLL failed to lock");
	};

	let Ok(pll_usb) = hal::pll::setup_pll_blocking(
		pac.PLL_USB,
		xosc.operating_frequency(),
		hal::pll::common_configs::PLL_USB_48MHZ,
		&mut clocks,
		&mut pac.RESETS,
	) else {
		defmt::panic!("USB PLL failed to lock");
	};

	if clocks.init_default(&xosc, &pll_sys, &pll_usb).is_err() {
		defmt::panic!("Clock tree set-up failed");
	}

	info!("Clocks OK");

	// sio is the *Single-cycle Input/Output* peripheral. It has all our GPIO
	// pins, as well as some mailboxes and other useful things for inter-core
	// communications.
	let sio = hal::sio::Sio::new(pac.SIO);

	// Configure and grab all the RP2040 pins the Pico exposes.
	let pins = rp_pico::Pins::new(
		pac.IO_BANK0,
		pac.PADS_BANK0,
		sio.gpio_bank0,
		&mut pac.RESETS,
	);

	// Disable power save mode to force SMPS into low-efficiency, low-noise mode.
	let mut b_power_save = pins.b_power_save.into_push_pull_output();
	let _ = b_power_save.set_high();

	// The video pins (see `PinMap::PICO`) are driven through the SIO. They
	// only need to be outputs; the engine writes them by mask.
	let _h_sync = pins.gpio1.into_push_pull_output();
	let _v_sync = pins.gpio2.into_push_pull_output();
	let _colour3 = pins.gpio8.into_push_pull_output();
	let _colour4 = pins.gpio9.into_push_pull_output();
	let _colour5 = pins.gpio10.into_push_pull_output();
	let _colour6 = pins.gpio11.into_push_pull_output();
	let _colour7 = pins.gpio12.into_push_pull_output();
	let _latch_blue = pins.gpio13.into_push_pull_output();
	let _latch_green = pins.gpio14.into_push_pull_output();
	let _latch_red = pins.gpio15.into_push_pull_output();
	let _colour0 = pins.gpio16.into_push_pull_output();
	let _colour1 = pins.gpio17.into_push_pull_output();
	let _colour2 = pins.gpio18.into_push_pull_output();
	let _blank = pins.gpio19.into_push_pull_output();

	// DDC lives on I2C0
	let sda: gpio::Pin<_, gpio::FunctionI2C, gpio::PullUp> = pins.gpio20.reconfigure();
	let scl: gpio::Pin<_, gpio::FunctionI2C, gpio::PullUp> = pins.gpio21.reconfigure();

	// The SD card lives on SPI1
	let sd_cs = pins.gpio22.into_push_pull_output();
	let sd_sclk: gpio::Pin<_, gpio::FunctionSpi, gpio::PullNone> = pins.gpio26.reconfigure();
	let sd_mosi: gpio::Pin<_, gpio::FunctionSpi, gpio::PullNone> = pins.gpio27.reconfigure();
	let sd_miso: gpio::Pin<_, gpio::FunctionSpi, gpio::PullUp> = pins.gpio28.reconfigure();

	info!("Pins OK");

	let framebuffer = match Framebuffer::with_scale(
		&FRAMEBUFFER_STORAGE,
		MODE.width,
		MODE.height,
		SCALE_SHIFT,
	) {
		Ok(fb) => fb,
		Err(e) => defmt::panic!("Framebuffer: {}", e),
	};
	let Some(framebuffer) = cortex_m::singleton!(: Framebuffer<'static> = framebuffer) else {
		defmt::panic!("Framebuffer already made");
	};
	let framebuffer: &'static Framebuffer<'static> = framebuffer;

	// The HAL timer is only used for delays. The alarms belong to the engine.
	let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);

	// Note (unsafe): the video pins are SIO outputs and nothing else uses
	// alarms 0 or 1
	let (video_pins, alarms) = unsafe { (SioPins::new(), TimerAlarms::new()) };

	let config = EngineConfig::DEFAULT;
	let engine = match ScanEngine::new(
		&MODE,
		config,
		framebuffer,
		video_pins,
		PinMap::PICO,
		alarms,
		&STATS,
	) {
		Ok(engine) => engine,
		Err(e) => defmt::panic!("Bad engine config {:?}: {}", config, e),
	};
	if ENGINE.install(engine).is_err() {
		defmt::panic!("Engine already installed");
	}
	let _ = ENGINE.with(|engine| engine.start());

	// Note (unsafe): the handlers only touch ENGINE, which is installed
	unsafe {
		pac::NVIC::unmask(pac::Interrupt::TIMER_IRQ_0);
		pac::NVIC::unmask(pac::Interrupt::TIMER_IRQ_1);
		cortex_m::interrupt::enable();
	}

	info!("VGA started");

	let i2c = hal::I2C::i2c0(
		pac.I2C0,
		sda,
		scl,
		100.kHz(),
		&mut pac.RESETS,
		&clocks.system_clock,
	);
	let monitor = Ddc::new(i2c, timer);

	let spi = hal::spi::Spi::<_, _, _, 8>::new(pac.SPI1, (sd_mosi, sd_miso, sd_sclk)).init(
		&mut pac.RESETS,
		clocks.peripheral_clock.freq(),
		400.kHz(),
		embedded_hal::spi::MODE_0,
	);
	let card = embedded_sdmmc::SdCard::new(spi, sd_cs, timer);

	match SdFileSystem::new(card, FixedTime) {
		Ok(files) => {
			let mut gpu = Gpu::new(
				Target::Single(framebuffer),
				files,
				BmpDecoder::<ROW_BYTES>::new(),
			)
			.with_monitor(monitor);

			match gpu.execute(Command::QueryMonitorCapabilities) {
				Ok(Response::MonitorCapabilities(Some(native))) => {
					info!("Monitor is {}x{}", native.width, native.height);
				}
				_ => {
					info!("Monitor didn't say what it is");
				}
			}

			match gpu.execute(Command::LoadImage(SPLASH_PATH)) {
				Ok(response) => info!("{}: {:?}", SPLASH_PATH, response),
				Err(e) => warn!("{}: {}", SPLASH_PATH, e),
			}
		}
		Err(e) => {
			warn!("No SD card: {}", e);
		}
	}

	info!(
		"{} frames, {} late alarms",
		STATS.frames(),
		STATS.late_alarms()
	);

	loop {
		cortex_m::asm::wfi();
	}
}

/// Called when TIMER alarm 0 fires: the horizontal phase machine.
#[link_section = ".data"]
#[interrupt]
fn TIMER_IRQ_0() {
	// Note (unsafe): the two alarm interrupts share a priority, and main only
	// touches the engine inside a critical section
	unsafe {
		ENGINE.with_interrupt(|engine| engine.on_alarm(Alarm::Horizontal));
	}
}

/// Called when TIMER alarm 1 fires: the vertical phase machine.
#[link_section = ".data"]
#[interrupt]
fn TIMER_IRQ_1() {
	// Note (unsafe): as above
	unsafe {
		ENGINE.with_interrupt(|engine| engine.on_alarm(Alarm::Vertical));
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
