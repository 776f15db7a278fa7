//! # Storage
//!
//! The image pipeline reads files through two small traits: a
//! [`FileSystem`] that opens a path, and the [`ByteSource`] it hands back,
//! which can read, seek and close. Nothing else about the filesystem is
//! visible to the rest of the crate.
//!
//! [`SliceSource`] and [`StaticFiles`] serve bytes from memory. With the
//! `rp2040` feature, [`sdcard`] adapts a FAT volume on an SD card.

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

#[cfg(feature = "rp2040")]
pub mod sdcard;

// -----------------------------------------------------------------------------
// Imports
// -----------------------------------------------------------------------------

use crate::error::StorageError;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// An open file.
pub trait ByteSource {
	/// Read up to `buffer.len()` bytes. Returns zero at the end of the file.
	fn read(&mut self, buffer: &mut [u8]) -> Result<usize, StorageError>;

	/// Move to `offset` bytes from the start of the file.
	fn seek(&mut self, offset: u32) -> Result<(), StorageError>;

	/// Finish with the file.
	fn close(self) -> Result<(), StorageError>;

	/// Fill `buffer` completely, or fail with [`StorageError::EndOfFile`].
	fn read_exact(&mut self, mut buffer: &mut [u8]) -> Result<(), StorageError> {
		while !buffer.is_empty() {
			match self.read(buffer)? {
				0 => return Err(StorageError::EndOfFile),
				n => buffer = &mut buffer[n..],
			}
		}
		Ok(())
	}
}

/// Something which can open files by path.
pub trait FileSystem {
	/// What an open file looks like.
	type Source<'a>: ByteSource
	where
		Self: 'a;

	/// Open `path` for reading.
	fn open(&mut self, path: &str) -> Result<Self::Source<'_>, StorageError>;
}

/// A file held in memory.
#[derive(Debug, Clone)]
pub struct SliceSource<'a> {
	data: &'a [u8],
	position: usize,
}

/// A fixed set of in-memory files.
#[derive(Debug, Clone)]
pub struct StaticFiles<'a> {
	files: &'a [(&'a str, &'a [u8])],
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl<'a> SliceSource<'a> {
	/// Serve `data`, starting at the beginning.
	pub fn new(data: &'a [u8]) -> SliceSource<'a> {
		SliceSource { data, position: 0 }
	}

	/// Current offset.
	pub fn position(&self) -> usize {
		self.position
	}
}

impl ByteSource for SliceSource<'_> {
	fn read(&mut self, buffer: &mut [u8]) -> Result<usize, StorageError> {
		let remaining = self.data.get(self.position..).unwrap_or_default();
		let count = remaining.len().min(buffer.len());
		buffer[..count].copy_from_slice(&remaining[..count]);
		self.position += count;
		Ok(count)
	}

	fn seek(&mut self, offset: u32) -> Result<(), StorageError> {
		let offset = offset as usize;
		if offset > self.data.len() {
			return Err(StorageError::EndOfFile);
		}
		self.position = offset;
		Ok(())
	}

	fn close(self) -> Result<(), StorageError> {
		Ok(())
	}
}

impl<'a> StaticFiles<'a> {
	/// Serve `files`, given as (path, contents) pairs. A leading `/` on the
	/// requested path is ignored.
	pub const fn new(files: &'a [(&'a str, &'a [u8])]) -> StaticFiles<'a> {
		StaticFiles { files }
	}
}

impl<'a> FileSystem for StaticFiles<'a> {
	type Source<'s> = SliceSource<'a> where Self: 's;

	fn open(&mut self, path: &str) -> Result<SliceSource<'a>, StorageError> {
		let wanted = path.trim_start_matches('/');
		self.files
			.iter()
			.find(|(name, _)| name.trim_start_matches('/').eq_ignore_ascii_case(wanted))
			.map(|(_, data)| SliceSource::new(data))
			.ok_or(StorageError::NotFound)
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------


// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
