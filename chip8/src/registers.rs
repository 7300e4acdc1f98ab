use std::ops::{Index, IndexMut};

use crate::REGISTER_COUNT;

/// A register selector taken from a 4-bit instruction field, so it always
/// names one of V0..VF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register(u8);

impl Register {
    /// VF doubles as the carry/borrow/collision flag
    pub const FLAG: Register = Register(0xF);

    pub fn from_nibble(n: u8) -> Self {
        Self(n & 0xF)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

pub struct Registers([u8; REGISTER_COUNT]);

impl Index<Register> for Registers {
    type Output = u8;

    fn index(&self, register: Register) -> &Self::Output {
        &self.0[register.index()]
    }
}

impl IndexMut<Register> for Registers {
    fn index_mut(&mut self, register: Register) -> &mut Self::Output {
        &mut self.0[register.index()]
    }
}

impl Registers {
    pub fn new() -> Self {
        Self([0; REGISTER_COUNT])
    }

    pub fn set_flag(&mut self, value: bool) {
        self[Register::FLAG] = value as u8;
    }

    /// V0 through `last` inclusive
    pub fn through(&self, last: Register) -> &[u8] {
        &self.0[..=last.index()]
    }

    pub fn through_mut(&mut self, last: Register) -> &mut [u8] {
        &mut self.0[..=last.index()]
    }

    pub fn as_array(&self) -> &[u8; REGISTER_COUNT] {
        &self.0
    }
}
