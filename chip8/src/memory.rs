use std::fmt::Display;
use std::ops::Range;

use crate::error::{Fault, LoadError};
use crate::{FONT_ADDR, FONT_DATA, MAX_ROM_SIZE, MEM_SIZE, ROM_ADDR};

pub struct Memory {
    pub(crate) data: [u8; MEM_SIZE],
}

impl Memory {
    /// Create a zeroed memory with the built-in font placed in the reserved region
    pub fn new() -> Self {
        let mut data = [0; MEM_SIZE];
        data[FONT_ADDR..FONT_ADDR + FONT_DATA.len()].copy_from_slice(&FONT_DATA);
        Self { data }
    }

    /// Copy a program image to the load offset, refusing images that don't fit
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), LoadError> {
        if image.len() > MAX_ROM_SIZE {
            return Err(LoadError::ImageTooLarge {
                len: image.len(),
                capacity: MAX_ROM_SIZE,
            });
        }

        self.data[ROM_ADDR..ROM_ADDR + image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Return `len` bytes starting at `addr`, or fault if any of them is out of range
    pub fn read(&self, addr: usize, len: usize) -> Result<&[u8], Fault> {
        Ok(&self.data[Self::range(addr, len)?])
    }

    pub fn read_byte(&self, addr: usize) -> Result<u8, Fault> {
        self.data
            .get(addr)
            .copied()
            .ok_or(Fault::AddressOutOfRange { addr })
    }

    /// Read a big-endian word
    pub fn read_word(&self, addr: usize) -> Result<u16, Fault> {
        let hi = self.read_byte(addr)? as u16;
        let next = addr
            .checked_add(1)
            .ok_or(Fault::AddressOutOfRange { addr })?;
        let lo = self.read_byte(next)? as u16;
        Ok(hi << 8 | lo)
    }

    /// Write `data` into memory starting at `addr`
    ///
    /// The whole range is checked before anything is written, so a failed write
    /// leaves memory untouched.
    pub fn write(&mut self, addr: usize, data: &[u8]) -> Result<(), Fault> {
        let range = Self::range(addr, data.len())?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    /// Bounds of `len` bytes starting at `addr`. An empty range touches no memory,
    /// so it is accepted wherever it starts.
    fn range(addr: usize, len: usize) -> Result<Range<usize>, Fault> {
        if len == 0 {
            return Ok(0..0);
        }
        match addr.checked_add(len) {
            Some(end) if end <= MEM_SIZE => Ok(addr..end),
            // report the first byte that falls outside
            _ => Err(Fault::AddressOutOfRange {
                addr: addr.max(MEM_SIZE),
            }),
        }
    }
}

impl Display for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const BYTES_PER_LINE: usize = 16;
        for (line, chunk) in self.data.chunks(BYTES_PER_LINE).enumerate() {
            // skip all-zero lines to keep the dump readable
            if chunk.iter().all(|&b| b == 0) {
                continue;
            }
            write!(f, "{:04X}: ", line * BYTES_PER_LINE)?;
            for byte in chunk {
                write!(f, "{:02X} ", byte)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
