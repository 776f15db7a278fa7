//! # Pico VGA GPU
//!
//! A software VGA signal generator. Pixels are bit-banged onto GPIO lines,
//! one colour channel at a time, through external latches and a DAC, with
//! every line and frame paced by timer alarms.
//!
//! The crate is split in two halves:
//!
//! * the hardware-independent engine in this library: the [`mode`] constants,
//!   the shared [`framebuffer`], the [`output`] primitive, the [`timing`]
//!   state machine and the [`bridge`] that fills the framebuffer from an image
//!   decoder; and
//! * the RP2040 back-ends in [`hw`] and the firmware binary, enabled with the
//!   `rp2040` feature.
//!
//! The interrupt context (timing state machine) and the main context (image
//! decoding) share nothing but the framebuffer, which is read and written
//! without locks. See [`framebuffer`] for what that means for the picture.

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

#![cfg_attr(not(test), no_std)]

// -----------------------------------------------------------------------------
// Sub-modules
// -----------------------------------------------------------------------------

#[macro_use]
mod fmt;

pub mod api;
pub mod bridge;
pub mod ddc;
pub mod decode;
pub mod error;
pub mod framebuffer;
#[cfg(feature = "rp2040")]
pub mod hw;
pub mod mode;
pub mod output;
pub mod storage;
pub mod timing;

// -----------------------------------------------------------------------------
// Re-exports
// -----------------------------------------------------------------------------

pub use embedded_graphics::pixelcolor::Rgb888;

pub use crate::api::{Command, Gpu, Response, Target};
pub use crate::bridge::{load_image, FramebufferBridge, NoPreview, PreviewConfig};
pub use crate::ddc::{CapabilityQuery, Ddc, MonitorResolution};
pub use crate::decode::{BmpDecoder, ImageDecoder, ImageInfo};
pub use crate::error::{ConfigError, DecodeError, LoadError, StorageError};
pub use crate::framebuffer::{DoubleBuffer, Framebuffer, PixelSource};
pub use crate::mode::{ModeDescriptor, SyncPolarity};
pub use crate::output::{ColourBus, Latch, PinMap, SignalPins};
pub use crate::storage::{ByteSource, FileSystem, SliceSource, StaticFiles};
pub use crate::timing::{
	Alarm, AlarmTimer, EngineConfig, EngineSlot, FrameStats, Phase, ScanCursor, ScanEngine,
	ScanOrder, Schedule, Strategy, VerticalDrive,
};

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
