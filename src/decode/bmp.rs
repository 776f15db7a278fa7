//! # BMP decoder
//!
//! Uncompressed 24-bit and 32-bit Windows bitmaps, stored either way up.
//! Rows are read one at a time, seeking to each, so the whole file never has
//! to fit in RAM and rows always come out top first.

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

use super::{DecodeStatus, ImageDecoder, ImageInfo, PixelFormat, RowControl, Scanline};
use crate::{error::DecodeError, storage::ByteSource};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// Decodes BMP files with rows of up to `ROW_BYTES` bytes.
pub struct BmpDecoder<const ROW_BYTES: usize> {
	header: Option<Header>,
	row: heapless::Vec<u8, ROW_BYTES>,
}

#[derive(Debug, Copy, Clone)]
struct Header {
	data_offset: u32,
	height: u16,
	top_down: bool,
	format: PixelFormat,
	row_bytes: usize,
	stride: u32,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

const FILE_HEADER_LEN: usize = 14;

const INFO_HEADER_LEN: usize = 40;

const BI_RGB: u32 = 0;

const BI_BITFIELDS: u32 = 3;

/// Red, green and blue masks of a 32-bit bitmap we can read directly.
const STANDARD_MASKS: [u32; 3] = [0x00FF_0000, 0x0000_FF00, 0x0000_00FF];

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

fn le_u16(bytes: &[u8]) -> u16 {
	u16::from_le_bytes([bytes[0], bytes[1]])
}

fn le_u32(bytes: &[u8]) -> u32 {
	u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

impl<const ROW_BYTES: usize> BmpDecoder<ROW_BYTES> {
	/// A decoder with an empty row buffer.
	pub const fn new() -> BmpDecoder<ROW_BYTES> {
		BmpDecoder {
			header: None,
			row: heapless::Vec::new(),
		}
	}
}

impl<const ROW_BYTES: usize> Default for BmpDecoder<ROW_BYTES> {
	fn default() -> BmpDecoder<ROW_BYTES> {
		BmpDecoder::new()
	}
}

impl<const ROW_BYTES: usize> ImageDecoder for BmpDecoder<ROW_BYTES> {
	fn read_header<B>(&mut self, source: &mut B) -> Result<ImageInfo, DecodeError>
	where
		B: ByteSource,
	{
		self.header = None;
		source.seek(0)?;

		let mut file_header = [0u8; FILE_HEADER_LEN];
		source.read_exact(&mut file_header)?;
		if &file_header[0..2] != b"BM" {
			return Err(DecodeError::BadSignature);
		}
		let data_offset = le_u32(&file_header[10..]);

		let mut info = [0u8; INFO_HEADER_LEN];
		source.read_exact(&mut info)?;
		let info_len = le_u32(&info[0..]);
		if (info_len as usize) < INFO_HEADER_LEN {
			// OS/2 bitmaps
			return Err(DecodeError::Unsupported);
		}
		let width = le_u32(&info[4..]) as i32;
		let height = le_u32(&info[8..]) as i32;
		let planes = le_u16(&info[12..]);
		let bits_per_pixel = le_u16(&info[14..]);
		let compression = le_u32(&info[16..]);
		if planes != 1 || width <= 0 || height == 0 {
			return Err(DecodeError::InvalidHeader);
		}
		let top_down = height < 0;
		let (Ok(width), Ok(height)) = (u16::try_from(width), u16::try_from(height.unsigned_abs()))
		else {
			return Err(DecodeError::Unsupported);
		};

		let format = match (bits_per_pixel, compression) {
			(24, BI_RGB) => PixelFormat::Bgr888,
			(32, BI_RGB) => PixelFormat::Bgra8888,
			(32, BI_BITFIELDS) => {
				// The masks follow the 40-byte header, whether or not they
				// are counted in it.
				let mut masks = [0u8; 12];
				source.read_exact(&mut masks)?;
				let masks = [le_u32(&masks[0..]), le_u32(&masks[4..]), le_u32(&masks[8..])];
				if masks != STANDARD_MASKS {
					return Err(DecodeError::Unsupported);
				}
				PixelFormat::Bgra8888
			}
			_ => return Err(DecodeError::Unsupported),
		};

		let row_bytes = usize::from(width) * format.bytes_per_pixel();
		if row_bytes > ROW_BYTES {
			return Err(DecodeError::RowTooLong { needed: row_bytes });
		}
		if (data_offset as usize) < FILE_HEADER_LEN + INFO_HEADER_LEN {
			return Err(DecodeError::InvalidHeader);
		}
		let stride = ((row_bytes + 3) & !3) as u32;

		self.header = Some(Header {
			data_offset,
			height,
			top_down,
			format,
			row_bytes,
			stride,
		});
		debug!("BMP {}x{}, {} bpp", width, height, bits_per_pixel);
		Ok(ImageInfo {
			width,
			height,
			bits_per_pixel: bits_per_pixel as u8,
		})
	}

	fn decode_rows<B, F>(
		&mut self,
		source: &mut B,
		mut on_row: F,
	) -> Result<DecodeStatus, DecodeError>
	where
		B: ByteSource,
		F: FnMut(&Scanline<'_>) -> RowControl,
	{
		let header = self.header.ok_or(DecodeError::InvalidHeader)?;
		self.row.clear();
		self.row
			.resize(header.row_bytes, 0)
			.map_err(|_| DecodeError::RowTooLong {
				needed: header.row_bytes,
			})?;
		for row in 0..header.height {
			let stored = if header.top_down {
				row
			} else {
				header.height - 1 - row
			};
			let offset = u32::from(stored)
				.checked_mul(header.stride)
				.and_then(|offset| offset.checked_add(header.data_offset))
				.ok_or(DecodeError::InvalidHeader)?;
			source.seek(offset)?;
			source.read_exact(&mut self.row)?;
			let line = Scanline {
				row,
				format: header.format,
				data: &self.row,
			};
			if on_row(&line) == RowControl::Abort {
				debug!("BMP decode stopped at row {} of {}", row, header.height);
				return Ok(DecodeStatus::Aborted);
			}
		}
		trace!("BMP decode of {} rows complete", header.height);
		Ok(DecodeStatus::Complete)
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use crate::storage::SliceSource;
	use embedded_graphics::pixelcolor::Rgb888;

	/// Build a bitmap from top-to-bottom rows of (r, g, b).
	fn bitmap(rows: &[&[(u8, u8, u8)]], bpp: u16, top_down: bool, bitfields: bool) -> Vec<u8> {
		let width = rows[0].len();
		let bytes_pp = usize::from(bpp / 8);
		let stride = (width * bytes_pp + 3) & !3;
		let header_len = 54 + if bitfields { 12 } else { 0 };
		let mut out = Vec::new();
		out.extend_from_slice(b"BM");
		out.extend_from_slice(&((header_len + stride * rows.len()) as u32).to_le_bytes());
		out.extend_from_slice(&[0; 4]);
		out.extend_from_slice(&(header_len as u32).to_le_bytes());
		out.extend_from_slice(&40u32.to_le_bytes());
		out.extend_from_slice(&(width as i32).to_le_bytes());
		let height = rows.len() as i32;
		out.extend_from_slice(&(if top_down { -height } else { height }).to_le_bytes());
		out.extend_from_slice(&1u16.to_le_bytes());
		out.extend_from_slice(&bpp.to_le_bytes());
		out.extend_from_slice(&(if bitfields { BI_BITFIELDS } else { BI_RGB }).to_le_bytes());
		out.extend_from_slice(&[0; 20]);
		if bitfields {
			for mask in STANDARD_MASKS {
				out.extend_from_slice(&mask.to_le_bytes());
			}
		}
		let mut stored: Vec<&[(u8, u8, u8)]> = rows.to_vec();
		if !top_down {
			stored.reverse();
		}
		for row in stored {
			let start = out.len();
			for &(r, g, b) in row {
				out.extend_from_slice(&[b, g, r]);
				if bpp == 32 {
					out.push(0xFF);
				}
			}
			out.resize(start + stride, 0);
		}
		out
	}

	fn decode_all(data: &[u8]) -> Result<Vec<(u16, Vec<Rgb888>)>, DecodeError> {
		let mut decoder = BmpDecoder::<64>::new();
		let mut source = SliceSource::new(data);
		decoder.read_header(&mut source)?;
		let mut rows = Vec::new();
		let status = decoder.decode_rows(&mut source, |line| {
			rows.push((line.row, line.pixels().collect()));
			RowControl::Continue
		})?;
		assert_eq!(status, DecodeStatus::Complete);
		Ok(rows)
	}

	const RED: (u8, u8, u8) = (255, 0, 0);
	const GREEN: (u8, u8, u8) = (0, 255, 0);
	const BLUE: (u8, u8, u8) = (0, 0, 255);
	const WHITE: (u8, u8, u8) = (255, 255, 255);

	fn rgb((r, g, b): (u8, u8, u8)) -> Rgb888 {
		Rgb888::new(r, g, b)
	}

	#[test]
	fn bottom_up_24_bit_rows_come_out_top_first() {
		let data = bitmap(&[&[RED, GREEN], &[BLUE, WHITE]], 24, false, false);
		let rows = decode_all(&data).unwrap();
		assert_eq!(
			rows,
			vec![
				(0, vec![rgb(RED), rgb(GREEN)]),
				(1, vec![rgb(BLUE), rgb(WHITE)]),
			]
		);
	}

	#[test]
	fn top_down_and_bitfields() {
		let data = bitmap(&[&[RED], &[GREEN], &[BLUE]], 32, true, true);
		let mut decoder = BmpDecoder::<64>::new();
		let info = decoder.read_header(&mut SliceSource::new(&data)).unwrap();
		assert_eq!(
			info,
			ImageInfo {
				width: 1,
				height: 3,
				bits_per_pixel: 32
			}
		);
		let rows = decode_all(&data).unwrap();
		assert_eq!(rows[0], (0, vec![rgb(RED)]));
		assert_eq!(rows[2], (2, vec![rgb(BLUE)]));
	}

	#[test]
	fn odd_masks_unsupported() {
		let mut data = bitmap(&[&[RED]], 32, false, true);
		data[54..58].copy_from_slice(&0xFF00_0000u32.to_le_bytes());
		assert_eq!(decode_all(&data), Err(DecodeError::Unsupported));
	}

	#[test]
	fn rejects_bad_headers() {
		let mut data = bitmap(&[&[RED]], 24, false, false);
		data[0] = b'X';
		assert_eq!(decode_all(&data), Err(DecodeError::BadSignature));

		let mut data = bitmap(&[&[RED]], 24, false, false);
		data[28] = 8;
		assert_eq!(decode_all(&data), Err(DecodeError::Unsupported));

		let mut data = bitmap(&[&[RED]], 24, false, false);
		data[26] = 2;
		assert_eq!(decode_all(&data), Err(DecodeError::InvalidHeader));

		assert_eq!(decode_all(b"BM"), Err(DecodeError::Truncated));
	}

	#[test]
	fn row_buffer_limit() {
		let row = [RED; 30];
		let data = bitmap(&[&row], 24, false, false);
		assert_eq!(decode_all(&data), Err(DecodeError::RowTooLong { needed: 90 }));
	}

	#[test]
	fn truncated_pixel_data() {
		let mut data = bitmap(&[&[RED, GREEN], &[BLUE, WHITE]], 24, false, false);
		data.truncate(data.len() - 4);
		let mut decoder = BmpDecoder::<64>::new();
		let mut source = SliceSource::new(&data);
		decoder.read_header(&mut source).unwrap();
		// Stored bottom-up, so the top row is the one cut short
		let result = decoder.decode_rows(&mut source, |_| RowControl::Continue);
		assert_eq!(result, Err(DecodeError::Truncated));
	}

	#[test]
	fn callback_can_abort() {
		let data = bitmap(&[&[RED], &[GREEN], &[BLUE]], 24, false, false);
		let mut decoder = BmpDecoder::<64>::new();
		let mut source = SliceSource::new(&data);
		decoder.read_header(&mut source).unwrap();
		let mut seen = 0;
		let status = decoder.decode_rows(&mut source, |_| {
			seen += 1;
			RowControl::Abort
		});
		assert_eq!(status, Ok(DecodeStatus::Aborted));
		assert_eq!(seen, 1);
	}

	#[test]
	fn rows_need_a_header_first() {
		let mut decoder = BmpDecoder::<64>::new();
		let mut source = SliceSource::new(&[]);
		assert_eq!(
			decoder.decode_rows(&mut source, |_| RowControl::Continue),
			Err(DecodeError::InvalidHeader)
		);
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
