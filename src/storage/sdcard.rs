//! # SD card storage
//!
//! Adapts the first FAT volume on a block device (in practice, an SD card on
//! SPI) to [`FileSystem`]. Only files in the root directory can be opened.

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

use embedded_sdmmc::{
	BlockDevice, Directory, File, Mode, TimeSource, Timestamp, VolumeIdx, VolumeManager,
};

use super::{ByteSource, FileSystem};
use crate::error::StorageError;

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// We have no calendar clock, so every timestamp is the same.
pub struct FixedTime;

/// The root directory of the first volume on a block device.
pub struct SdFileSystem<D, T>
where
	D: BlockDevice,
	T: TimeSource,
{
	manager: VolumeManager<D, T>,
	root: Directory,
}

/// An open file on the SD card.
pub struct SdFile<'a, D, T>
where
	D: BlockDevice,
	T: TimeSource,
{
	manager: &'a mut VolumeManager<D, T>,
	file: File,
}

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

impl TimeSource for FixedTime {
	fn get_timestamp(&self) -> Timestamp {
		Timestamp {
			year_since_1970: 54,
			zero_indexed_month: 0,
			zero_indexed_day: 0,
			hours: 0,
			minutes: 0,
			seconds: 0,
		}
	}
}

impl<D, T> SdFileSystem<D, T>
where
	D: BlockDevice,
	D::Error: defmt::Format,
	T: TimeSource,
{
	/// Mount volume 0 and open its root directory.
	pub fn new(device: D, time: T) -> Result<SdFileSystem<D, T>, StorageError> {
		let mut manager = VolumeManager::new(device, time);
		let volume = manager.open_volume(VolumeIdx(0)).map_err(|e| {
			warn!("No FAT volume: {:?}", e);
			StorageError::Io
		})?;
		let root = manager.open_root_dir(volume).map_err(|e| {
			warn!("No root directory: {:?}", e);
			StorageError::Io
		})?;
		info!("SD card mounted");
		Ok(SdFileSystem { manager, root })
	}
}

impl<D, T> FileSystem for SdFileSystem<D, T>
where
	D: BlockDevice,
	D::Error: defmt::Format,
	T: TimeSource,
{
	type Source<'a> = SdFile<'a, D, T> where Self: 'a;

	fn open(&mut self, path: &str) -> Result<SdFile<'_, D, T>, StorageError> {
		let name = path.trim_start_matches('/');
		if name.is_empty() || name.contains('/') {
			return Err(StorageError::NotFound);
		}
		let file = self
			.manager
			.open_file_in_dir(self.root, name, Mode::ReadOnly)
			.map_err(|e| {
				warn!("Can't open {}: {:?}", name, e);
				StorageError::NotFound
			})?;
		Ok(SdFile {
			manager: &mut self.manager,
			file,
		})
	}
}

impl<D, T> ByteSource for SdFile<'_, D, T>
where
	D: BlockDevice,
	D::Error: defmt::Format,
	T: TimeSource,
{
	fn read(&mut self, buffer: &mut [u8]) -> Result<usize, StorageError> {
		self.manager.read(self.file, buffer).map_err(|e| {
			warn!("SD read failed: {:?}", e);
			StorageError::Io
		})
	}

	fn seek(&mut self, offset: u32) -> Result<(), StorageError> {
		self.manager
			.file_seek_from_start(self.file, offset)
			.map_err(|_| StorageError::EndOfFile)
	}

	fn close(self) -> Result<(), StorageError> {
		self.manager.close_file(self.file).map_err(|_| StorageError::Io)
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
