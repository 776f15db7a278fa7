//! # DDC/CI monitor queries
//!
//! Asks the monitor, over the I2C lines in the VGA connector, for its
//! native resolution using the VESA *Get VCP Feature* command.
//!
//! A request is written to address 0x37:
//!
//! ```text
//! 0x51 0x82 0x01 <vcp> <chk>
//! ```
//!
//! and after 40 ms the reply is read back:
//!
//! ```text
//! 0x6E 0x88 0x02 <result> <vcp> <type> <max hi> <max lo> <cur hi> <cur lo> <chk>
//! ```
//!
//! Checksums are the XOR of every byte including the (8-bit) address the
//! message was sent from: 0x6E for ours, the virtual host address 0x50 for
//! the monitor's.

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

use core::fmt;

use embedded_hal::blocking::{
	delay::DelayMs,
	i2c::{Read, Write},
};

// -----------------------------------------------------------------------------
// Types
// -----------------------------------------------------------------------------

/// One VCP feature value.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VcpValue {
	/// VCP code
	pub code: u8,
	/// 0 for set parameter, 1 for momentary
	pub kind: u8,
	/// Largest value the monitor accepts
	pub maximum: u16,
	/// Current value
	pub current: u16,
}

/// The resolution a monitor says it wants.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorResolution {
	/// Pixels across
	pub width: u16,
	/// Lines down
	pub height: u16,
}

/// Things that can go wrong talking to a monitor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DdcError<E> {
	/// The I2C transfer failed (often: no monitor)
	Bus(E),
	/// The reply checksum was wrong
	Checksum,
	/// The reply was not a VCP reply for the code we asked about
	UnexpectedReply,
	/// The monitor does not support this VCP code
	Unsupported(u8),
}

/// Something that can report a monitor's native resolution.
pub trait CapabilityQuery {
	/// Ask. `None` if nobody answers sensibly.
	fn native_resolution(&mut self) -> Option<MonitorResolution>;
}

/// A DDC/CI channel.
pub struct Ddc<I2C, D> {
	i2c: I2C,
	delay: D,
}

// -----------------------------------------------------------------------------
// Static and Const Data
// -----------------------------------------------------------------------------

/// 7-bit I2C address of the monitor's DDC/CI interface.
pub const DDC_ADDRESS: u8 = 0x37;

/// VCP code the monitor reports its width under.
pub const VCP_WIDTH: u8 = 0x22;

/// VCP code the monitor reports its height under.
pub const VCP_HEIGHT: u8 = 0x32;

/// How long the monitor needs between request and reply.
pub const REPLY_DELAY_MS: u32 = 40;

const HOST_SEND_ADDRESS: u8 = DDC_ADDRESS << 1;

const HOST_RECEIVE_ADDRESS: u8 = 0x50;

const GET_VCP_REQUEST: u8 = 0x01;

const GET_VCP_REPLY: u8 = 0x02;

const LENGTH_FLAG: u8 = 0x80;

const REPLY_LEN: usize = 11;

// -----------------------------------------------------------------------------
// Functions
// -----------------------------------------------------------------------------

fn checksum(seed: u8, bytes: &[u8]) -> u8 {
	bytes.iter().fold(seed, |acc, b| acc ^ b)
}

impl<E> fmt::Display for DdcError<E>
where
	E: fmt::Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DdcError::Bus(e) => write!(f, "I2C error: {:?}", e),
			DdcError::Checksum => write!(f, "bad DDC/CI checksum"),
			DdcError::UnexpectedReply => write!(f, "unexpected DDC/CI reply"),
			DdcError::Unsupported(code) => write!(f, "VCP code {:#04x} unsupported", code),
		}
	}
}

impl<I2C, D, E> Ddc<I2C, D>
where
	I2C: Write<Error = E> + Read<Error = E>,
	D: DelayMs<u32>,
{
	/// Talk to a monitor over `i2c`.
	pub fn new(i2c: I2C, delay: D) -> Ddc<I2C, D> {
		Ddc { i2c, delay }
	}

	/// Read one VCP feature.
	pub fn get_vcp(&mut self, code: u8) -> Result<VcpValue, DdcError<E>> {
		let mut request = [HOST_RECEIVE_ADDRESS | 0x01, LENGTH_FLAG | 2, GET_VCP_REQUEST, code, 0];
		request[4] = checksum(HOST_SEND_ADDRESS, &request[..4]);
		self.i2c
			.write(DDC_ADDRESS, &request)
			.map_err(DdcError::Bus)?;
		self.delay.delay_ms(REPLY_DELAY_MS);

		let mut reply = [0u8; REPLY_LEN];
		self.i2c.read(DDC_ADDRESS, &mut reply).map_err(DdcError::Bus)?;
		if checksum(HOST_RECEIVE_ADDRESS, &reply[..REPLY_LEN - 1]) != reply[REPLY_LEN - 1] {
			return Err(DdcError::Checksum);
		}
		if reply[0] != HOST_SEND_ADDRESS
			|| reply[1] != LENGTH_FLAG | 8
			|| reply[2] != GET_VCP_REPLY
			|| reply[4] != code
		{
			return Err(DdcError::UnexpectedReply);
		}
		if reply[3] != 0 {
			return Err(DdcError::Unsupported(code));
		}
		Ok(VcpValue {
			code,
			kind: reply[5],
			maximum: u16::from_be_bytes([reply[6], reply[7]]),
			current: u16::from_be_bytes([reply[8], reply[9]]),
		})
	}

	/// Ask for width and height.
	pub fn monitor_resolution(&mut self) -> Result<MonitorResolution, DdcError<E>> {
		let width = self.get_vcp(VCP_WIDTH)?.current;
		let height = self.get_vcp(VCP_HEIGHT)?.current;
		Ok(MonitorResolution { width, height })
	}

	/// Give back the bus and the delay.
	pub fn release(self) -> (I2C, D) {
		(self.i2c, self.delay)
	}
}

impl<I2C, D, E> CapabilityQuery for Ddc<I2C, D>
where
	I2C: Write<Error = E> + Read<Error = E>,
	D: DelayMs<u32>,
{
	fn native_resolution(&mut self) -> Option<MonitorResolution> {
		match self.monitor_resolution() {
			Ok(resolution) => {
				info!(
					"Monitor reports {}x{}",
					resolution.width,
					resolution.height
				);
				Some(resolution)
			}
			Err(_) => {
				warn!("No DDC/CI answer from monitor");
				None
			}
		}
	}
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use super::*;
	use embedded_hal_mock::eh0::i2c::{Mock as I2cMock, Transaction};
	use embedded_hal_mock::eh0::MockError;

	#[derive(Default)]
	struct CountingDelay {
		total_ms: u32,
	}

	impl DelayMs<u32> for CountingDelay {
		fn delay_ms(&mut self, ms: u32) {
			self.total_ms += ms;
		}
	}

	fn request(code: u8) -> Vec<u8> {
		let body = [0x51, 0x82, 0x01, code];
		let mut out = body.to_vec();
		out.push(checksum(0x6E, &body));
		out
	}

	fn reply(code: u8, result: u8, maximum: u16, current: u16) -> Vec<u8> {
		let mut out = vec![0x6E, 0x88, 0x02, result, code, 0x00];
		out.extend_from_slice(&maximum.to_be_bytes());
		out.extend_from_slice(&current.to_be_bytes());
		let chk = checksum(0x50, &out);
		out.push(chk);
		out
	}

	#[test]
	fn request_checksum() {
		// 0x6E ^ 0x51 ^ 0x82 ^ 0x01 ^ 0x10
		assert_eq!(request(0x10)[4], 0xAC);
	}

	#[test]
	fn reads_resolution() {
		let expectations = [
			Transaction::write(DDC_ADDRESS, request(VCP_WIDTH)),
			Transaction::read(DDC_ADDRESS, reply(VCP_WIDTH, 0, 4096, 640)),
			Transaction::write(DDC_ADDRESS, request(VCP_HEIGHT)),
			Transaction::read(DDC_ADDRESS, reply(VCP_HEIGHT, 0, 4096, 480)),
		];
		let mut i2c = I2cMock::new(&expectations);
		let mut ddc = Ddc::new(i2c.clone(), CountingDelay::default());
		assert_eq!(
			ddc.monitor_resolution(),
			Ok(MonitorResolution {
				width: 640,
				height: 480
			})
		);
		let (_, delay) = ddc.release();
		assert_eq!(delay.total_ms, 80);
		i2c.done();
	}

	#[test]
	fn bad_checksum() {
		let mut bad = reply(VCP_WIDTH, 0, 1, 1);
		bad[10] ^= 0xFF;
		let expectations = [
			Transaction::write(DDC_ADDRESS, request(VCP_WIDTH)),
			Transaction::read(DDC_ADDRESS, bad),
		];
		let mut i2c = I2cMock::new(&expectations);
		let mut ddc = Ddc::new(i2c.clone(), CountingDelay::default());
		assert_eq!(ddc.get_vcp(VCP_WIDTH), Err(DdcError::Checksum));
		i2c.done();
	}

	#[test]
	fn unsupported_code() {
		let expectations = [
			Transaction::write(DDC_ADDRESS, request(VCP_HEIGHT)),
			Transaction::read(DDC_ADDRESS, reply(VCP_HEIGHT, 1, 0, 0)),
		];
		let mut i2c = I2cMock::new(&expectations);
		let mut ddc = Ddc::new(i2c.clone(), CountingDelay::default());
		assert_eq!(ddc.get_vcp(VCP_HEIGHT), Err(DdcError::Unsupported(VCP_HEIGHT)));
		i2c.done();
	}

	#[test]
	fn absent_monitor_is_none() {
		let expectations = [Transaction::write(DDC_ADDRESS, request(VCP_WIDTH))
			.with_error(MockError::Io(std::io::ErrorKind::NotConnected))];
		let mut i2c = I2cMock::new(&expectations);
		let mut ddc = Ddc::new(i2c.clone(), CountingDelay::default());
		assert_eq!(ddc.native_resolution(), None);
		i2c.done();
	}
}

// -----------------------------------------------------------------------------
// End of file
// -----------------------------------------------------------------------------
