use clap::Subcommand;
use dialtimer_core::{PointerEvent, PointerKind};

use super::{print_events, CliResult, Workspace};

#[derive(Subcommand)]
pub enum DialAction {
    /// Replay a drag around the dial, starting at 3 o'clock
    Spin {
        /// Degrees to turn. Positive is clockwise on screen and adds time
        #[arg(long, allow_hyphen_values = true, value_parser = clap::value_parser!(i32).range(-179..=179))]
        degrees: i32,
        /// How long the gesture takes
        #[arg(long, default_value = "500")]
        duration_ms: u64,
        /// Number of pointer move events
        #[arg(long, default_value = "20")]
        steps: u32,
        /// Start the countdown once the dial is released
        #[arg(long)]
        start: bool,
    },
}

pub fn run(action: DialAction) -> CliResult {
    let mut ws = Workspace::open()?;

    match action {
        DialAction::Spin {
            degrees,
            duration_ms,
            steps,
            start,
        } => {
            if !ws.session.dial_enabled() {
                let state = ws.session.engine().run_state();
                return Err(format!("dial is locked while timer is {state}").into());
            }

            for pointer in gesture(&ws, degrees, duration_ms, steps.max(1)) {
                ws.session.push_pointer(pointer);
            }
            ws.session.frame();
            if start && !ws.session.start_armed() {
                return Err("nothing dialed in, not starting".into());
            }

            let events = ws.persist()?;
            print_events(&events)?;
            let snapshot = ws.session.engine().snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
    }
    Ok(())
}

/// Pointer events for a circular drag along the middle of the ring.
fn gesture(ws: &Workspace, degrees: i32, duration_ms: u64, steps: u32) -> Vec<PointerEvent> {
    let dial = ws.session.dial();
    let radius = (dial.inner_radius + dial.outer_radius) / 2.0;
    let center = dial.center;
    // Screen y grows downwards, so a growing angle turns clockwise.
    let at = |theta: f64| (center.x + radius * theta.cos(), center.y + radius * theta.sin());
    let total = f64::from(degrees).to_radians();
    let interval = duration_ms / u64::from(steps);

    let mut events = vec![PointerEvent::new(PointerKind::Down, center.x + radius, center.y, 0)];
    for step in 1..=steps {
        let (x, y) = at(total * f64::from(step) / f64::from(steps));
        events.push(PointerEvent::new(
            PointerKind::Move,
            x,
            y,
            interval * u64::from(step),
        ));
    }
    let (x, y) = at(total);
    events.push(PointerEvent::new(
        PointerKind::Up,
        x,
        y,
        interval * u64::from(steps),
    ));
    events
}
