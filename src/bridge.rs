//! # Decode-to-framebuffer bridge
//!
//! Sits between an [`ImageDecoder`] and the [`Framebuffer`]: each decoded
//! row is converted and written straight into the framebuffer the engine is
//! displaying, with no locking. Optionally, every Nth row is also subsampled
//! onto a small preview display.

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

use core::convert::Infallible;

use embedded_graphics::{
	pixelcolor::Rgb888,
	prelude::{DrawTarget, OriginDimensions, Point, Size},
	primitives::Rectangle,
	Pixel,
};

use crate::{
	decode::{DecodeStatus, ImageDecoder, ImageInfo, PixelFormat, RowControl, Scanline},
	error::LoadError,
	framebuffer::Framebuffer,
	storage::{ByteSource, FileSystem},
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Which rows and columns go to the preview display.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PreviewConfig {
	/// Send every Nth row (zero counts as one)
	pub row_interval: u16,
	/// Within a row, send every Nth pixel (zero counts as one)
	pub column_step: u16,
}

/// A preview display that isn't there.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoPreview;

/// Writes scanlines into a framebuffer.
pub struct FramebufferBridge<'f, 'a, D = NoPreview> {
	framebuffer: &'f Framebuffer<'a>,
	preview: Option<&'f mut D>,
	config: PreviewConfig,
	image_width: u16,
	format: Option<PixelFormat>,
	rows_written: u16,
	failure: Option<LoadError>,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl PreviewConfig {
	/// Every fourth row, every fourth pixel.
	pub const DEFAULT: PreviewConfig = PreviewConfig {
		row_interval: 4,
		column_step: 4,
	};
}

impl Default for PreviewConfig {
	fn default() -> PreviewConfig {
		PreviewConfig::DEFAULT
	}
}

impl OriginDimensions for NoPreview {
	fn size(&self) -> Size {
		Size::zero()
	}
}

impl DrawTarget for NoPreview {
	type Color = Rgb888;
	type Error = Infallible;

	fn draw_iter<I>(&mut self, _pixels: I) -> Result<(), Self::Error>
	where
		I: IntoIterator<Item = Pixel<Self::Color>>,
	{
		Ok(())
	}
}

impl<'f, 'a> FramebufferBridge<'f, 'a, NoPreview> {
	/// Write into `framebuffer`, with no preview.
	pub fn new(framebuffer: &'f Framebuffer<'a>) -> FramebufferBridge<'f, 'a, NoPreview> {
		FramebufferBridge {
			framebuffer,
			preview: None,
			config: PreviewConfig::DEFAULT,
			image_width: 0,
			format: None,
			rows_written: 0,
			failure: None,
		}
	}
}

impl<'f, 'a, D> FramebufferBridge<'f, 'a, D>
where
	D: DrawTarget,
	D::Color: From<Rgb888>,
{
	/// Write into `framebuffer`, and mirror a subsample onto `preview`.
	pub fn with_preview(
		framebuffer: &'f Framebuffer<'a>,
		preview: &'f mut D,
		config: PreviewConfig,
	) -> FramebufferBridge<'f, 'a, D> {
		FramebufferBridge {
			framebuffer,
			preview: Some(preview),
			config,
			image_width: 0,
			format: None,
			rows_written: 0,
			failure: None,
		}
	}

	/// Get ready for a new image.
	pub fn begin(&mut self, info: &ImageInfo) {
		self.image_width = info.width;
		self.format = None;
		self.rows_written = 0;
		self.failure = None;
	}

	/// Write one row. This is the decoder's row callback.
	///
	/// Rows below the bottom of the framebuffer are skipped and pixels past
	/// its right-hand edge are dropped. A row in a different format from the
	/// first, or with fewer pixels than the image is wide, stops the decode.
	pub fn write_scanline(&mut self, line: &Scanline<'_>) -> RowControl {
		match self.format {
			None => self.format = Some(line.format),
			Some(format) if format != line.format => return self.fail(LoadError::Aborted),
			Some(_) => {}
		}
		if line.data.len() % line.format.bytes_per_pixel() != 0
			|| line.pixel_count() < usize::from(self.image_width)
		{
			return self.fail(LoadError::Aborted);
		}
		if line.row >= self.framebuffer.height() {
			return RowControl::Continue;
		}

		let columns = usize::from(self.image_width.min(self.framebuffer.width()));
		for (x, colour) in line.pixels().take(columns).enumerate() {
			self.framebuffer.set(x as u16, line.row, colour);
		}
		self.rows_written += 1;

		let row_interval = self.config.row_interval.max(1);
		let column_step = usize::from(self.config.column_step.max(1));
		if let Some(preview) = self.preview.as_deref_mut() {
			if line.row % row_interval == 0 {
				let size = preview.bounding_box().size;
				let preview_row = u32::from(line.row / row_interval);
				let count = ((columns + column_step - 1) / column_step).min(size.width as usize);
				if preview_row < size.height && count > 0 {
					let area = Rectangle::new(
						Point::new(0, preview_row as i32),
						Size::new(count as u32, 1),
					);
					let colours = line
						.pixels()
						.take(columns)
						.step_by(column_step)
						.take(count)
						.map(D::Color::from);
					if preview.fill_contiguous(&area, colours).is_err() {
						return self.fail(LoadError::Preview);
					}
				}
			}
		}
		RowControl::Continue
	}

	fn fail(&mut self, error: LoadError) -> RowControl {
		self.failure = Some(error);
		RowControl::Abort
	}

	/// Rows written into the framebuffer since [`begin`](Self::begin).
	pub fn rows_written(&self) -> u16 {
		self.rows_written
	}

	/// Why the last row was refused, if it was.
	pub fn failure(&self) -> Option<LoadError> {
		self.failure
	}
}

/// Decode an already-open source through `bridge`.
///
/// On failure the framebuffer keeps whatever rows were written.
pub fn load_from_source<B, Dec, D>(
	source: &mut B,
	decoder: &mut Dec,
	bridge: &mut FramebufferBridge<'_, '_, D>,
) -> Result<ImageInfo, LoadError>
where
	B: ByteSource,
	Dec: ImageDecoder,
	D: DrawTarget,
	D::Color: From<Rgb888>,
{
	let info = decoder.read_header(source)?;
	bridge.begin(&info);
	match decoder.decode_rows(source, |line| bridge.write_scanline(line))? {
		DecodeStatus::Complete => Ok(info),
		DecodeStatus::Aborted => Err(bridge.failure().unwrap_or(LoadError::Aborted)),
	}
}

/// Open `path`, decode it and write it into the bridge's framebuffer.
///
/// If the file can't be opened, the framebuffer is not touched. Otherwise
/// see [`load_from_source`].
pub fn load_image<F, Dec, D>(
	files: &mut F,
	path: &str,
	decoder: &mut Dec,
	bridge: &mut FramebufferBridge<'_, '_, D>,
) -> Result<ImageInfo, LoadError>
where
	F: FileSystem,
	Dec: ImageDecoder,
	D: DrawTarget,
	D::Color: From<Rgb888>,
{
	let mut source = files.open(path).map_err(|e| {
		warn!("Can't open {}: {}", path, e);
		LoadError::Open
	})?;
	let result = load_from_source(&mut source, decoder, bridge);
	if source.close().is_err() {
		warn!("Failed to close {}", path);
	}
	match &result {
		Ok(info) => info!("Loaded {} ({}x{})", path, info.width, info.height),
		Err(e) => warn!("Loading {} failed: {}", path, e),
	}
	result
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::framebuffer::blank_storage;
	use embedded_graphics::{
		mock_display::MockDisplay,
		pixelcolor::{Rgb565, RgbColor},
	};

	fn info(width: u16, height: u16) -> ImageInfo {
		ImageInfo {
			width,
			height,
			bits_per_pixel: 24,
		}
	}

	fn line(row: u16, format: PixelFormat, data: &[u8]) -> Scanline<'_> {
		Scanline { row, format, data }
	}

	#[test]
	fn clips_to_framebuffer() {
		let storage = blank_storage::<4>();
		let fb = Framebuffer::new(&storage, 2, 2).unwrap();
		let mut bridge = FramebufferBridge::new(&fb);
		bridge.begin(&info(3, 3));
		let data = [10, 20, 30, 40, 50, 60, 70, 80, 90];
		for row in 0..3 {
			assert_eq!(
				bridge.write_scanline(&line(row, PixelFormat::Rgb888, &data)),
				RowControl::Continue
			);
		}
		assert_eq!(bridge.rows_written(), 2);
		assert_eq!(fb.get(0, 0), Rgb888::new(10, 20, 30));
		assert_eq!(fb.get(1, 1), Rgb888::new(40, 50, 60));
	}

	#[test]
	fn format_change_aborts() {
		let storage = blank_storage::<4>();
		let fb = Framebuffer::new(&storage, 2, 2).unwrap();
		let mut bridge = FramebufferBridge::new(&fb);
		bridge.begin(&info(1, 2));
		bridge.write_scanline(&line(0, PixelFormat::Rgb888, &[1, 2, 3]));
		assert_eq!(
			bridge.write_scanline(&line(1, PixelFormat::Bgr888, &[1, 2, 3])),
			RowControl::Abort
		);
		assert_eq!(bridge.failure(), Some(LoadError::Aborted));
		assert_eq!(fb.get(0, 1), Rgb888::BLACK);
	}

	#[test]
	fn short_row_aborts() {
		let storage = blank_storage::<4>();
		let fb = Framebuffer::new(&storage, 2, 2).unwrap();
		let mut bridge = FramebufferBridge::new(&fb);
		bridge.begin(&info(2, 2));
		assert_eq!(
			bridge.write_scanline(&line(0, PixelFormat::Rgb888, &[1, 2, 3])),
			RowControl::Abort
		);
		assert_eq!(
			bridge.write_scanline(&line(0, PixelFormat::Rgb565, &[1, 2, 3, 4, 5])),
			RowControl::Abort
		);
		assert_eq!(fb.get(0, 0), Rgb888::BLACK);
	}

	#[test]
	fn preview_gets_every_other_row_and_column() {
		let storage = blank_storage::<16>();
		let fb = Framebuffer::new(&storage, 4, 4).unwrap();
		let mut display = MockDisplay::<Rgb565>::new();
		let config = PreviewConfig {
			row_interval: 2,
			column_step: 2,
		};
		let mut bridge = FramebufferBridge::with_preview(&fb, &mut display, config);
		bridge.begin(&info(4, 4));
		let red = [255, 0, 0];
		let blue = [0, 0, 255];
		for row in 0..4 {
			let mut data = Vec::new();
			for column in 0..4 {
				data.extend_from_slice(if column % 2 == 0 { &red } else { &blue });
			}
			assert_eq!(
				bridge.write_scanline(&line(row, PixelFormat::Rgb888, &data)),
				RowControl::Continue
			);
		}
		assert_eq!(display.get_pixel(Point::new(0, 0)), Some(Rgb565::RED));
		assert_eq!(display.get_pixel(Point::new(1, 1)), Some(Rgb565::RED));
		assert_eq!(display.get_pixel(Point::new(2, 0)), None);
		assert_eq!(display.get_pixel(Point::new(0, 2)), None);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
