mod display;
mod error;
mod keypad;
mod memory;
mod registers;
mod stack;

use std::fmt::Display as FmtDisplay;
use std::path::Path;

use anyhow::Context;
use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::keypad::Keypad;
use crate::memory::Memory;
use crate::registers::{Register, Registers};
use crate::stack::CallStack;

pub use crate::display::{Display, FrameBuffer};
pub use crate::error::{Fault, LoadError};
pub use crate::keypad::{Key, KEY_COUNT};

pub const FONT_CHAR_LENGTH: usize = 5;

pub const FONT_DATA: [u8; FONT_CHAR_LENGTH * 0x10] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

pub const FONT_ADDR: usize = 0x050;

pub const MEM_SIZE: usize = 0x1000;
pub const ROM_ADDR: usize = 0x200;
/// Largest program image that fits between the load offset and the end of memory
pub const MAX_ROM_SIZE: usize = MEM_SIZE - ROM_ADDR;
pub const STACK_SIZE: usize = 0x10;
pub const REGISTER_COUNT: usize = 0x10;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

/// A fetched instruction word split into its fields
struct Opcode {
    raw: u16,
    c: u8,
    x: Register,
    y: Register,
    n: u8,
    nn: u8,
    nnn: u16,
}

impl Opcode {
    fn decode(raw: u16) -> Self {
        Opcode {
            raw,
            c: ((raw & 0xF000) >> 12) as u8,
            x: Register::from_nibble(((raw & 0x0F00) >> 8) as u8),
            y: Register::from_nibble(((raw & 0x00F0) >> 4) as u8),
            n: (raw & 0x000F) as u8,
            nn: (raw & 0x00FF) as u8,
            nnn: raw & 0x0FFF,
        }
    }
}

impl FmtDisplay for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}", self.raw)
    }
}

pub struct Chip8 {
    /// 4KB of RAM holding the font, the loaded program and any data it writes
    memory: Memory,
    /// A frame buffer containing binary pixel states
    display: Display,
    /// A hexadecimal keypad containing 16 key states labelled 0 through F
    keypad: Keypad,
    /// Return addresses for subroutine calls
    stack: CallStack,
    /// 16 8-bit general-purpose variable registers numbered 0 through F hexadecimal
    v: Registers,
    /// The program counter points to the current instruction in memory
    pc: u16,
    /// The index register is used to point at locations in memory
    i: u16,
    /// The delay timer is decremented by the host at 60 Hz until it reaches 0
    dt: u8,
    /// The sound timer is decremented by the host at 60 Hz, and a tone plays while it's not 0
    st: u8,
    /// Set while a wait-for-key instruction is holding the program counter in place
    waiting_for_key: bool,
    rng: StdRng,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Create an interpreter whose random instruction produces a reproducible sequence
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Chip8 {
            memory: Memory::new(),
            display: Display::new(),
            keypad: Keypad::new(),
            stack: CallStack::new(),
            v: Registers::new(),
            pc: ROM_ADDR as u16,
            i: 0,
            dt: 0,
            st: 0,
            waiting_for_key: false,
            rng,
        }
    }

    /// Copy a program image into memory at the load offset
    ///
    /// Nothing is written when the image is too large. Registers and the program
    /// counter are left as they are.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), LoadError> {
        self.memory.load_image(rom)?;
        debug!("loaded {} byte image at {:#05x}", rom.len(), ROM_ADDR);
        Ok(())
    }

    pub fn load_rom_from_file(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let buf =
            std::fs::read(path).with_context(|| format!("read rom file {}", path.display()))?;
        self.load(&buf).context("load rom into memory")?;
        Ok(())
    }

    /* Host-facing state */

    pub fn is_fb_dirty(&self) -> bool {
        self.display.dirty
    }

    pub fn fb(&mut self) -> FrameBuffer {
        self.display.fb()
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn keydown(&mut self, key: Key) {
        self.keypad.keydown(key)
    }

    pub fn keyup(&mut self, key: Key) {
        self.keypad.keyup(key)
    }

    pub fn set_key(&mut self, index: u8, pressed: bool) {
        let key = Key::from_index(index);
        if pressed {
            self.keypad.keydown(key);
        } else {
            self.keypad.keyup(key);
        }
    }

    pub fn is_waiting_for_key(&self) -> bool {
        self.waiting_for_key
    }

    pub fn is_sound_playing(&self) -> bool {
        self.st > 0
    }

    pub fn delay_timer(&self) -> u8 {
        self.dt
    }

    pub fn sound_timer(&self) -> u8 {
        self.st
    }

    /// Count both timers down by one; the host calls this at 60 Hz
    pub fn tick_timers(&mut self) {
        self.dt = self.dt.saturating_sub(1);
        self.st = self.st.saturating_sub(1);
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        self.v.as_array()
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn read_memory(&self, addr: usize, len: usize) -> Result<&[u8], Fault> {
        self.memory.read(addr, len)
    }

    /* Fetch, decode, execute */

    /// Run a single fetch-decode-execute cycle
    pub fn step(&mut self) -> Result<(), Fault> {
        let opcode = Opcode::decode(self.fetch()?);
        trace!("{:#05x}: {}", self.pc - 2, opcode);
        self.execute(opcode)
    }

    fn fetch(&mut self) -> Result<u16, Fault> {
        let word = self.memory.read_word(self.pc as usize)?;
        self.pc += 2;
        Ok(word)
    }

    fn execute(&mut self, opcode: Opcode) -> Result<(), Fault> {
        self.waiting_for_key = false;
        match opcode.c {
            0x0 => self.exec_system(opcode),
            0x1 => self.op_jump(opcode.nnn),
            0x2 => self.op_sub_call(opcode.nnn),
            0x3 => self.op_skip_eq(opcode.x, opcode.nn),
            0x4 => self.op_skip_ne(opcode.x, opcode.nn),
            0x5 => self.op_skip_reg_eq(opcode.x, opcode.y),
            0x6 => self.op_set(opcode.x, opcode.nn),
            0x7 => self.op_add(opcode.x, opcode.nn),
            0x8 => self.exec_alu(opcode),
            0x9 => self.op_skip_reg_ne(opcode.x, opcode.y),
            0xA => self.op_set_index(opcode.nnn),
            0xB => self.op_jump_with_offset(opcode.nnn),
            0xC => self.op_random(opcode.x, opcode.nn),
            0xD => self.op_display(opcode.x, opcode.y, opcode.n),
            0xE => self.exec_key(opcode),
            0xF => self.exec_misc(opcode),
            _ => self.ignore(opcode),
        }
    }

    /// Unknown selectors inside a known family are skipped, as legacy programs expect
    fn ignore(&self, opcode: Opcode) -> Result<(), Fault> {
        debug!(
            "ignoring unknown opcode {} at {:#05x}",
            opcode,
            self.pc - 2
        );
        Ok(())
    }

    fn exec_system(&mut self, opcode: Opcode) -> Result<(), Fault> {
        match opcode.raw {
            0x00E0 => self.op_cls(),
            0x00EE => self.op_sub_return(),
            _ => self.ignore(opcode),
        }
    }

    fn exec_alu(&mut self, opcode: Opcode) -> Result<(), Fault> {
        let (x, y) = (opcode.x, opcode.y);
        match opcode.n {
            0x0 => self.op_reg_set(x, y),
            0x1 => self.op_reg_or(x, y),
            0x2 => self.op_reg_and(x, y),
            0x3 => self.op_reg_xor(x, y),
            0x4 => self.op_reg_add(x, y),
            0x5 => self.op_reg_sub_right(x, y),
            0x6 => self.op_reg_shift_right(x),
            0x7 => self.op_reg_sub_left(x, y),
            0xE => self.op_reg_shift_left(x),
            _ => self.ignore(opcode),
        }
    }

    fn exec_key(&mut self, opcode: Opcode) -> Result<(), Fault> {
        match opcode.nn {
            0x9E => self.op_skip_if_key_down(opcode.x),
            0xA1 => self.op_skip_if_key_up(opcode.x),
            _ => self.ignore(opcode),
        }
    }

    fn exec_misc(&mut self, opcode: Opcode) -> Result<(), Fault> {
        let x = opcode.x;
        match opcode.nn {
            0x07 => self.op_dt_get(x),
            0x0A => self.op_get_key(x),
            0x15 => self.op_dt_set(x),
            0x18 => self.op_st_set(x),
            0x1E => self.op_add_to_index(x),
            0x29 => self.op_font_character(x),
            0x33 => self.op_convert_to_decimal(x),
            0x55 => self.op_memory_store(x),
            0x65 => self.op_memory_load(x),
            _ => self.ignore(opcode),
        }
    }

    /* Operations */

    /// 0x00E0
    fn op_cls(&mut self) -> Result<(), Fault> {
        self.display.clear();
        Ok(())
    }

    /// 0x00EE
    fn op_sub_return(&mut self) -> Result<(), Fault> {
        self.pc = self.stack.pop()?;
        Ok(())
    }

    /// 0x1NNN
    fn op_jump(&mut self, nnn: u16) -> Result<(), Fault> {
        self.pc = nnn;
        Ok(())
    }

    /// 0x2NNN
    fn op_sub_call(&mut self, nnn: u16) -> Result<(), Fault> {
        self.stack.push(self.pc)?;
        self.pc = nnn;
        Ok(())
    }

    fn skip_if(&mut self, condition: bool) -> Result<(), Fault> {
        if condition {
            self.pc += 2;
        }
        Ok(())
    }

    /// 0x3XNN
    fn op_skip_eq(&mut self, x: Register, nn: u8) -> Result<(), Fault> {
        self.skip_if(self.v[x] == nn)
    }

    /// 0x4XNN
    fn op_skip_ne(&mut self, x: Register, nn: u8) -> Result<(), Fault> {
        self.skip_if(self.v[x] != nn)
    }

    /// 0x5XY0
    fn op_skip_reg_eq(&mut self, x: Register, y: Register) -> Result<(), Fault> {
        self.skip_if(self.v[x] == self.v[y])
    }

    /// 0x6XNN
    fn op_set(&mut self, x: Register, nn: u8) -> Result<(), Fault> {
        self.v[x] = nn;
        Ok(())
    }

    /// 0x7XNN
    fn op_add(&mut self, x: Register, nn: u8) -> Result<(), Fault> {
        self.v[x] = self.v[x].wrapping_add(nn);
        Ok(())
    }

    /// 0x8XY0
    fn op_reg_set(&mut self, x: Register, y: Register) -> Result<(), Fault> {
        self.v[x] = self.v[y];
        Ok(())
    }

    /// 0x8XY1
    fn op_reg_or(&mut self, x: Register, y: Register) -> Result<(), Fault> {
        self.v[x] |= self.v[y];
        Ok(())
    }

    /// 0x8XY2
    fn op_reg_and(&mut self, x: Register, y: Register) -> Result<(), Fault> {
        self.v[x] &= self.v[y];
        Ok(())
    }

    /// 0x8XY3
    fn op_reg_xor(&mut self, x: Register, y: Register) -> Result<(), Fault> {
        self.v[x] ^= self.v[y];
        Ok(())
    }

    // The ALU ops below write VX before VF, so with X = F the flag is what remains.

    /// 0x8XY4
    fn op_reg_add(&mut self, x: Register, y: Register) -> Result<(), Fault> {
        let (sum, carry) = self.v[x].overflowing_add(self.v[y]);
        self.v[x] = sum;
        self.v.set_flag(carry);
        Ok(())
    }

    /// 0x8XY5
    fn op_reg_sub_right(&mut self, x: Register, y: Register) -> Result<(), Fault> {
        let (diff, borrow) = self.v[x].overflowing_sub(self.v[y]);
        self.v[x] = diff;
        self.v.set_flag(!borrow);
        Ok(())
    }

    /// 0x8XY6
    fn op_reg_shift_right(&mut self, x: Register) -> Result<(), Fault> {
        let flag = self.v[x] & 0x1;
        self.v[x] >>= 1;
        self.v.set_flag(flag == 1);
        Ok(())
    }

    /// 0x8XY7
    fn op_reg_sub_left(&mut self, x: Register, y: Register) -> Result<(), Fault> {
        let (diff, borrow) = self.v[y].overflowing_sub(self.v[x]);
        self.v[x] = diff;
        self.v.set_flag(!borrow);
        Ok(())
    }

    /// 0x8XYE
    fn op_reg_shift_left(&mut self, x: Register) -> Result<(), Fault> {
        let flag = self.v[x] >> 7 & 0x1;
        self.v[x] <<= 1;
        self.v.set_flag(flag == 1);
        Ok(())
    }

    /// 0x9XY0
    fn op_skip_reg_ne(&mut self, x: Register, y: Register) -> Result<(), Fault> {
        self.skip_if(self.v[x] != self.v[y])
    }

    /// 0xANNN
    fn op_set_index(&mut self, nnn: u16) -> Result<(), Fault> {
        self.i = nnn;
        Ok(())
    }

    /// 0xBNNN
    fn op_jump_with_offset(&mut self, nnn: u16) -> Result<(), Fault> {
        self.pc = nnn + self.v[Register::from_nibble(0)] as u16;
        Ok(())
    }

    /// 0xCXNN
    fn op_random(&mut self, x: Register, nn: u8) -> Result<(), Fault> {
        self.v[x] = nn & self.rng.random::<u8>();
        Ok(())
    }

    /// 0xDXYN
    ///
    /// Sprite rows are read before anything is drawn, so a fault leaves the screen
    /// and VF as they were. Rows and columns past the edge are clipped.
    fn op_display(&mut self, x: Register, y: Register, n: u8) -> Result<(), Fault> {
        let vx = self.v[x] as usize % SCREEN_WIDTH;
        let vy = self.v[y] as usize % SCREEN_HEIGHT;
        let rows = (n as usize).min(SCREEN_HEIGHT - vy);

        let mut sprite = [0u8; 0xF];
        sprite[..rows].copy_from_slice(self.memory.read(self.i as usize, rows)?);

        self.v.set_flag(false);
        for (row, byte) in sprite[..rows].iter().enumerate() {
            for col in 0..8 {
                let px = vx + col;
                if px >= SCREEN_WIDTH {
                    break;
                }

                if (byte >> (7 - col)) & 0x1 == 1 && self.display.toggle(px, vy + row) {
                    self.v.set_flag(true);
                }
            }
        }
        Ok(())
    }

    /// 0xEX9E
    fn op_skip_if_key_down(&mut self, x: Register) -> Result<(), Fault> {
        self.skip_if(self.keypad.is_key_down(self.v[x]))
    }

    /// 0xEXA1
    fn op_skip_if_key_up(&mut self, x: Register) -> Result<(), Fault> {
        self.skip_if(self.keypad.is_key_up(self.v[x]))
    }

    /// 0xFX07
    fn op_dt_get(&mut self, x: Register) -> Result<(), Fault> {
        self.v[x] = self.dt;
        Ok(())
    }

    /// 0xFX0A
    ///
    /// Completes only once a key has been pressed and released again; until then the
    /// program counter is rewound so the instruction runs again next cycle.
    fn op_get_key(&mut self, x: Register) -> Result<(), Fault> {
        if let Some(key) = self.keypad.awaiting_release {
            if self.keypad.is_key_up(key) {
                self.v[x] = key;
                self.keypad.process_release();
                return Ok(());
            }
        } else if let Some(key) = self.keypad.first_down() {
            self.keypad.await_release(key);
        }
        self.pc -= 2;
        self.waiting_for_key = true;
        Ok(())
    }

    /// 0xFX15
    fn op_dt_set(&mut self, x: Register) -> Result<(), Fault> {
        self.dt = self.v[x];
        Ok(())
    }

    /// 0xFX18
    fn op_st_set(&mut self, x: Register) -> Result<(), Fault> {
        self.st = self.v[x];
        Ok(())
    }

    /// 0xFX1E
    fn op_add_to_index(&mut self, x: Register) -> Result<(), Fault> {
        self.i = self.i.wrapping_add(self.v[x] as u16);
        Ok(())
    }

    /// 0xFX29
    fn op_font_character(&mut self, x: Register) -> Result<(), Fault> {
        let glyph = (self.v[x] & 0xF) as usize;
        self.i = (FONT_ADDR + FONT_CHAR_LENGTH * glyph) as u16;
        Ok(())
    }

    /// 0xFX33
    fn op_convert_to_decimal(&mut self, x: Register) -> Result<(), Fault> {
        let n = self.v[x];
        self.memory
            .write(self.i as usize, &[n / 100, n / 10 % 10, n % 10])
    }

    /// 0xFX55
    fn op_memory_store(&mut self, x: Register) -> Result<(), Fault> {
        self.memory.write(self.i as usize, self.v.through(x))
    }

    /// 0xFX65
    fn op_memory_load(&mut self, x: Register) -> Result<(), Fault> {
        let bytes = self.memory.read(self.i as usize, x.index() + 1)?;
        self.v.through_mut(x).copy_from_slice(bytes);
        Ok(())
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

impl FmtDisplay for Chip8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Registers ===")?;
        for (n, value) in self.v.as_array().iter().enumerate() {
            write!(f, "V{:X}={:02X} ", n, value)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "PC={:04X} I={:04X} SP={} DT={:02X} ST={:02X}",
            self.pc,
            self.i,
            self.stack.depth(),
            self.dt,
            self.st
        )?;
        write!(f, "=== Memory ===\n{}", self.memory)
    }
}
