//! Headless frame loop on a manual clock.
//!
//! Nothing is read from or written to the database; the config file is used
//! for tuning so changes to `[particles]` can be inspected without a renderer.

use clap::Args;
use dialtimer_core::{Clock, Config, Frame, ManualClock, Session, SystemClock};
use serde::Serialize;

use super::{print_events, CliResult};

#[derive(Args)]
pub struct SimulateArgs {
    /// Countdown to start before the first frame. 0 leaves the timer idle
    #[arg(long, default_value = "0")]
    secs: u64,
    /// Number of frames to run
    #[arg(long, default_value = "60")]
    frames: u64,
    /// Clock advance per frame
    #[arg(long, default_value = "16")]
    interval_ms: u64,
    /// Print every Nth frame
    #[arg(long, default_value = "10")]
    every: u64,
    /// Override the particle count
    #[arg(long)]
    particles: Option<usize>,
    /// Fixed RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
    /// Print whole frames (every particle) instead of a summary
    #[arg(long)]
    full: bool,
}

/// One line per printed frame.
#[derive(Serialize)]
struct FrameSummary {
    frame: u64,
    at_ms: u64,
    run_state: String,
    remaining_ms: u64,
    swirl_angle: f64,
    contacts: usize,
    mean_radius: f64,
    mean_alpha: f64,
}

impl FrameSummary {
    fn new(index: u64, frame: &Frame) -> Self {
        let (cx, cy) = (frame.dial.center_x, frame.dial.center_y);
        let count = frame.field.particles.len().max(1) as f64;
        let (radius_sum, alpha_sum) = frame.field.particles.iter().fold((0.0, 0.0), |(r, a), p| {
            let radius = ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt();
            (r + radius, a + f64::from(p.color.a))
        });
        Self {
            frame: index,
            at_ms: frame.at_ms,
            run_state: frame.timer.run_state.to_string(),
            remaining_ms: frame.timer.remaining_ms,
            swirl_angle: frame.field.swirl_angle,
            contacts: frame.field.contacts,
            mean_radius: radius_sum / count,
            mean_alpha: alpha_sum / count,
        }
    }
}

pub fn run(args: SimulateArgs) -> CliResult {
    let mut config = Config::load_or_default();
    if let Some(count) = args.particles {
        config.particles.count = count;
    }
    if args.seed.is_some() {
        config.particles.seed = args.seed;
    }

    let clock = ManualClock::new(SystemClock.now_ms());
    let mut session = Session::new(&config, &clock);
    if args.secs > 0 && !session.start(args.secs, "Simulation") {
        return Err(format!("cannot start a {}s countdown", args.secs).into());
    }

    let every = args.every.max(1);
    for index in 1..=args.frames {
        clock.advance(args.interval_ms);
        let frame = session.frame();
        print_events(&session.drain_events())?;
        if index % every == 0 || index == args.frames {
            if args.full {
                println!("{}", serde_json::to_string(&frame)?);
            } else {
                println!("{}", serde_json::to_string(&FrameSummary::new(index, &frame))?);
            }
        }
    }
    Ok(())
}
