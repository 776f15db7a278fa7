//! # Command API
//!
//! The operations the outside world (a web page, a serial console, the boot
//! sequence) can ask of the GPU. Each one is a [`Command`], answered with a
//! [`Response`].

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

use embedded_graphics::{pixelcolor::Rgb888, prelude::DrawTarget};

use crate::{
	bridge::{load_image, FramebufferBridge, NoPreview, PreviewConfig},
	ddc::{CapabilityQuery, MonitorResolution},
	decode::{ImageDecoder, ImageInfo},
	error::LoadError,
	framebuffer::{DoubleBuffer, Framebuffer},
	storage::FileSystem,
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Something the GPU can be asked to do.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command<'p> {
	/// Decode the image at this path and display it
	LoadImage(&'p str),
	/// Ask the monitor for its native resolution
	QueryMonitorCapabilities,
}

/// The answer to a successful [`Command`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
	/// The image was loaded
	ImageLoaded(ImageInfo),
	/// What the monitor said, if it said anything
	MonitorCapabilities(Option<MonitorResolution>),
}

/// Where loaded images go.
pub enum Target<'f, 'a> {
	/// Straight into the displayed framebuffer
	Single(&'f Framebuffer<'a>),
	/// Into the back buffer, shown from the next frame boundary
	Double(&'f DoubleBuffer<'a>),
}

/// For when there is no monitor control channel.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoMonitor;

/// Everything needed to carry out commands.
pub struct Gpu<'f, 'a, F, Dec, M = NoMonitor, D = NoPreview> {
	target: Target<'f, 'a>,
	files: F,
	decoder: Dec,
	monitor: M,
	preview: Option<D>,
	preview_config: PreviewConfig,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// Our version string
pub static GPU_VERSION: &str = concat!("Pico VGA GPU, version ", env!("CARGO_PKG_VERSION"));

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl CapabilityQuery for NoMonitor {
	fn native_resolution(&mut self) -> Option<MonitorResolution> {
		None
	}
}

impl<'f, 'a, F, Dec> Gpu<'f, 'a, F, Dec>
where
	F: FileSystem,
	Dec: ImageDecoder,
{
	/// A GPU which loads files from `files` with `decoder` into `target`.
	pub fn new(target: Target<'f, 'a>, files: F, decoder: Dec) -> Gpu<'f, 'a, F, Dec> {
		Gpu {
			target,
			files,
			decoder,
			monitor: NoMonitor,
			preview: None,
			preview_config: PreviewConfig::DEFAULT,
		}
	}
}

impl<'f, 'a, F, Dec, M, D> Gpu<'f, 'a, F, Dec, M, D>
where
	F: FileSystem,
	Dec: ImageDecoder,
	M: CapabilityQuery,
	D: DrawTarget,
	D::Color: From<Rgb888>,
{
	/// Answer monitor queries with `monitor`.
	pub fn with_monitor<M2>(self, monitor: M2) -> Gpu<'f, 'a, F, Dec, M2, D>
	where
		M2: CapabilityQuery,
	{
		Gpu {
			target: self.target,
			files: self.files,
			decoder: self.decoder,
			monitor,
			preview: self.preview,
			preview_config: self.preview_config,
		}
	}

	/// Mirror loaded images onto `preview`.
	pub fn with_preview<D2>(self, preview: D2, config: PreviewConfig) -> Gpu<'f, 'a, F, Dec, M, D2>
	where
		D2: DrawTarget,
		D2::Color: From<Rgb888>,
	{
		Gpu {
			target: self.target,
			files: self.files,
			decoder: self.decoder,
			monitor: self.monitor,
			preview: Some(preview),
			preview_config: config,
		}
	}

	/// Carry out `command`.
	pub fn execute(&mut self, command: Command<'_>) -> Result<Response, LoadError> {
		match command {
			Command::LoadImage(path) => self.load(path).map(Response::ImageLoaded),
			Command::QueryMonitorCapabilities => Ok(Response::MonitorCapabilities(
				self.monitor.native_resolution(),
			)),
		}
	}

	fn load(&mut self, path: &str) -> Result<ImageInfo, LoadError> {
		let framebuffer = match self.target {
			Target::Single(framebuffer) => framebuffer,
			Target::Double(buffers) => {
				if buffers.is_swap_pending() {
					return Err(LoadError::Busy);
				}
				buffers.back()
			}
		};
		let result = match self.preview.as_mut() {
			Some(preview) => {
				let mut bridge =
					FramebufferBridge::with_preview(framebuffer, preview, self.preview_config);
				load_image(&mut self.files, path, &mut self.decoder, &mut bridge)
			}
			None => {
				let mut bridge = FramebufferBridge::new(framebuffer);
				load_image(&mut self.files, path, &mut self.decoder, &mut bridge)
			}
		};
		if let (Ok(_), Target::Double(buffers)) = (&result, &self.target) {
			buffers.present();
		}
		result
	}

	/// The preview display, if there is one.
	pub fn preview(&self) -> Option<&D> {
		self.preview.as_ref()
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::decode::BmpDecoder;
	use crate::framebuffer::{blank_storage, PixelSource};
	use crate::storage::StaticFiles;
	use embedded_graphics::pixelcolor::RgbColor;

	/// A 1x1 24-bit bitmap of one colour.
	const fn one_pixel(r: u8, g: u8, b: u8) -> [u8; 58] {
		let mut bmp = [0u8; 58];
		bmp[0] = b'B';
		bmp[1] = b'M';
		bmp[2] = 58;
		bmp[10] = 54;
		bmp[14] = 40;
		bmp[18] = 1;
		bmp[22] = 1;
		bmp[26] = 1;
		bmp[28] = 24;
		bmp[54] = b;
		bmp[55] = g;
		bmp[56] = r;
		bmp
	}

	static RED_BMP: [u8; 58] = one_pixel(255, 0, 0);

	static FILES: [(&str, &[u8]); 2] = [
		("RED.BMP", &RED_BMP),
		("JUNK.BMP", b"this is not a bitmap at all"),
	];

	#[test]
	fn load_into_single_buffer() {
		let storage = blank_storage::<1>();
		let fb = Framebuffer::new(&storage, 1, 1).unwrap();
		let mut gpu = Gpu::new(
			Target::Single(&fb),
			StaticFiles::new(&FILES),
			BmpDecoder::<16>::new(),
		);
		assert_eq!(
			gpu.execute(Command::LoadImage("/red.bmp")),
			Ok(Response::ImageLoaded(ImageInfo {
				width: 1,
				height: 1,
				bits_per_pixel: 24
			}))
		);
		assert_eq!(fb.get(0, 0), Rgb888::RED);
		assert_eq!(
			gpu.execute(Command::LoadImage("/missing.bmp")),
			Err(LoadError::Open)
		);
	}

	#[test]
	fn no_monitor_answers_none() {
		let storage = blank_storage::<1>();
		let fb = Framebuffer::new(&storage, 1, 1).unwrap();
		let mut gpu = Gpu::new(
			Target::Single(&fb),
			StaticFiles::new(&FILES),
			BmpDecoder::<16>::new(),
		);
		assert_eq!(
			gpu.execute(Command::QueryMonitorCapabilities),
			Ok(Response::MonitorCapabilities(None))
		);
	}

	#[test]
	fn double_buffer_presents_only_on_success() {
		let first = blank_storage::<1>();
		let second = blank_storage::<1>();
		let buffers = DoubleBuffer::new(
			Framebuffer::new(&first, 1, 1).unwrap(),
			Framebuffer::new(&second, 1, 1).unwrap(),
		)
		.unwrap();
		let mut gpu = Gpu::new(
			Target::Double(&buffers),
			StaticFiles::new(&FILES),
			BmpDecoder::<16>::new(),
		);
		assert_eq!(
			gpu.execute(Command::LoadImage("junk.bmp")),
			Err(LoadError::Decode(crate::error::DecodeError::BadSignature))
		);
		assert!(!buffers.is_swap_pending());

		assert!(gpu.execute(Command::LoadImage("red.bmp")).is_ok());
		assert!(buffers.is_swap_pending());
		assert_eq!(buffers.front().get(0, 0), Rgb888::BLACK);
		// A second load must wait for the swap
		assert_eq!(gpu.execute(Command::LoadImage("red.bmp")), Err(LoadError::Busy));

		buffers.frame_boundary();
		assert_eq!(buffers.front().get(0, 0), Rgb888::RED);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
