use std::path::PathBuf;

use anyhow::Context;
use chip8_core::{Chip8, Key};
use clap::Parser;
use log::{error, info, warn};

use crate::host::{HostConfig, HostLoop};

mod host;

#[derive(Parser, Debug)]
#[command(version, about = "Run a CHIP-8 program headlessly", long_about = None)]
struct Args {
    #[arg(value_name = "ROM", help = "Program image to load", value_hint = clap::ValueHint::FilePath)]
    rom: PathBuf,
    #[arg(long, default_value_t = 600, help = "Number of 60 Hz frames to run")]
    frames: u64,
    #[arg(long, default_value_t = 11, help = "Instructions executed per frame")]
    ops_per_frame: usize,
    #[arg(
        long,
        value_delimiter = ',',
        value_name = "KEYS",
        help = "Keyboard labels held down for the whole run (1234/qwer/asdf/zxcv)"
    )]
    hold: Vec<String>,
    #[arg(long, help = "Seed for the random instruction")]
    seed: Option<u64>,
    #[arg(long, help = "Run as fast as possible instead of at 60 frames per second")]
    turbo: bool,
    #[arg(long, help = "Print registers and memory after the run")]
    dump: bool,
}

impl Args {
    fn host_config(&self) -> HostConfig {
        let held_keys = self
            .hold
            .iter()
            .filter_map(|label| {
                let key = Key::from_label(label);
                if key.index().is_none() {
                    warn!("ignoring unmapped key '{}'", label);
                    return None;
                }
                Some(key)
            })
            .collect();

        HostConfig {
            ops_per_frame: self.ops_per_frame,
            frames: self.frames,
            held_keys,
            throttle: !self.turbo,
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut chip8 = match args.seed {
        Some(seed) => Chip8::with_seed(seed),
        None => Chip8::new(),
    };
    chip8
        .load_rom_from_file(&args.rom)
        .context("load rom from file")?;

    let mut host = HostLoop::new(chip8, args.host_config());
    let result = host.run();

    print!("{}", host.chip8().display());
    if args.dump {
        println!("{}", host.chip8());
    }

    let summary = result?;
    info!(
        "finished {} frames, tone sounded for {} of them",
        summary.frames, summary.tone_frames
    );
    Ok(())
}

fn main() -> std::process::ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            std::process::ExitCode::FAILURE
        }
    }
}
