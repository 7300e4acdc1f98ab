use crate::error::Fault;
use crate::STACK_SIZE;

/// Fixed-capacity stack of subroutine return addresses
pub struct CallStack {
    slots: [u16; STACK_SIZE],
    /// Number of occupied slots, which is also the index of the next free one
    sp: usize,
}

impl CallStack {
    pub fn new() -> Self {
        Self {
            slots: [0; STACK_SIZE],
            sp: 0,
        }
    }

    pub fn push(&mut self, addr: u16) -> Result<(), Fault> {
        let slot = self.slots.get_mut(self.sp).ok_or(Fault::StackOverflow)?;
        *slot = addr;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, Fault> {
        self.sp = self.sp.checked_sub(1).ok_or(Fault::StackUnderflow)?;
        Ok(self.slots[self.sp])
    }

    pub fn depth(&self) -> usize {
        self.sp
    }
}
