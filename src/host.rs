use std::time;

use anyhow::Context;
use chip8_core::{Chip8, Key};
use log::{debug, info, warn};

pub const FRAME_INTERVAL: time::Duration = time::Duration::new(0, 1_000_000_000u32 / 60);

pub struct HostConfig {
    /// Instructions executed per 60 Hz frame
    pub ops_per_frame: usize,
    pub frames: u64,
    pub held_keys: Vec<Key>,
    /// Sleep between frames so the program runs at real-time speed
    pub throttle: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            ops_per_frame: 11,
            frames: 600,
            held_keys: Vec::new(),
            throttle: true,
        }
    }
}

/// Tracks whether the tone should be sounding. Real audio output lives outside
/// this binary, so transitions are only logged.
#[derive(Default)]
pub struct ToneGate {
    on: bool,
    frames_on: u64,
}

impl ToneGate {
    pub fn update(&mut self, sound_playing: bool) {
        if sound_playing != self.on {
            info!("tone {}", if sound_playing { "on" } else { "off" });
            self.on = sound_playing;
        }
        if self.on {
            self.frames_on += 1;
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn frames_on(&self) -> u64 {
        self.frames_on
    }
}

#[derive(Debug)]
pub struct Summary {
    pub frames: u64,
    pub tone_frames: u64,
    pub waiting_for_key: bool,
}

/// Drives an interpreter the way a presentation frontend would: a batch of
/// instructions per frame, then one timer tick, then audio gating.
pub struct HostLoop {
    chip8: Chip8,
    config: HostConfig,
    tone: ToneGate,
}

impl HostLoop {
    pub fn new(chip8: Chip8, config: HostConfig) -> Self {
        Self {
            chip8,
            config,
            tone: ToneGate::default(),
        }
    }

    pub fn chip8(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn run(&mut self) -> anyhow::Result<Summary> {
        for key in self.config.held_keys.iter() {
            self.chip8.keydown(*key);
        }

        let mut reported_wait = false;
        let mut frames = 0;
        while frames < self.config.frames {
            let started = time::Instant::now();
            self.frame().with_context(|| format!("frame {}", frames))?;
            frames += 1;

            if self.chip8.is_waiting_for_key() && !reported_wait {
                warn!("program is waiting for a key press");
                reported_wait = true;
            }

            if self.config.throttle {
                if let Some(rest) = FRAME_INTERVAL.checked_sub(started.elapsed()) {
                    std::thread::sleep(rest);
                }
            }
        }

        debug!("ran {} frames", frames);
        Ok(Summary {
            frames,
            tone_frames: self.tone.frames_on(),
            waiting_for_key: self.chip8.is_waiting_for_key(),
        })
    }

    /// One 60 Hz tick
    pub fn frame(&mut self) -> anyhow::Result<()> {
        for _ in 0..self.config.ops_per_frame {
            let pc = self.chip8.pc();
            self.chip8
                .step()
                .with_context(|| format!("cycle at {:#05x}", pc))?;
        }

        self.chip8.tick_timers();
        self.tone.update(self.chip8.is_sound_playing());
        Ok(())
    }
}
