use std::fmt::Display as FmtDisplay;

use crate::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// One byte per pixel, each either 0 (off) or 1 (on), indexed `[y][x]`
pub type FrameBuffer = [[u8; SCREEN_WIDTH]; SCREEN_HEIGHT];

pub struct Display {
    pub(crate) fb: FrameBuffer,
    pub(crate) dirty: bool,
}

impl Display {
    pub fn new() -> Self {
        Self {
            fb: [[0; SCREEN_WIDTH]; SCREEN_HEIGHT],
            dirty: false,
        }
    }

    /// Take a copy of the frame buffer and mark the display as presented
    pub fn fb(&mut self) -> FrameBuffer {
        self.dirty = false;
        self.fb
    }

    /// Toggle the pixel at the coordinates and return true if it was lit before the toggle
    /// (i.e. the toggle erased it). Coordinates outside the screen are clipped and never toggle.
    pub fn toggle(&mut self, x: usize, y: usize) -> bool {
        if x >= SCREEN_WIDTH || y >= SCREEN_HEIGHT {
            return false;
        }
        self.dirty = true;
        let prev = self.fb[y][x];
        self.fb[y][x] ^= 1;
        prev == 1
    }

    pub fn clear(&mut self) {
        self.dirty = true;
        for row in self.fb.iter_mut() {
            row.fill(0);
        }
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        x < SCREEN_WIDTH && y < SCREEN_HEIGHT && self.fb[y][x] == 1
    }

    pub fn lit_count(&self) -> usize {
        self.fb.iter().flatten().filter(|&&p| p == 1).count()
    }
}

impl FmtDisplay for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.fb.iter() {
            for &pixel in row.iter() {
                write!(f, "{}", if pixel == 1 { '#' } else { '.' })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
