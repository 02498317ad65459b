//! Replay a recorded contact script through the gesture machine.
//!
//! The script is JSON:
//!
//! ```json
//! {
//!   "config": { "device_idiom": "Pad" },
//!   "events": [
//!     { "at_ms": 0, "id": 1, "phase": "began", "x": 300, "key": { "key": 4, "action": "Backspace" } },
//!     { "at_ms": 900, "id": 1, "phase": "ended", "x": 300 }
//!   ],
//!   "until_ms": 1000
//! }
//! ```
//!
//! Every dispatched action is printed as one JSON line with the logical time it
//! happened at. Timer firings are stamped with their deadline.

use anyhow::{Context, Result};
use clap::Parser;
use jyutboard_core::{
    ActionDispatcher, Config, ContactEvent, GestureMachine, GestureMode, KeyHit, KeyboardAction,
    Point,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "replay-gestures", about = "Replay a JSON contact script")]
struct Args {
    /// Script to replay
    script: PathBuf,

    /// TOML config, overrides the script's own config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also print gesture mode changes
    #[arg(long)]
    modes: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Phase {
    Began,
    Moved,
    Ended,
    Cancelled,
}

#[derive(Debug, Deserialize)]
struct ScriptEvent {
    at_ms: u64,
    id: u64,
    phase: Phase,
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    key: Option<KeyHit>,
    /// (value, maximum)
    #[serde(default)]
    force: Option<(f32, f32)>,
}

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    config: Option<Config>,
    events: Vec<ScriptEvent>,
    /// Keep firing timers up to this time after the last event.
    #[serde(default)]
    until_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Record {
    Action { at_ms: u64, action: KeyboardAction },
    Mode { at_ms: u64, mode: String },
}

/// Collects dispatched actions stamped with the current logical time.
struct Recorder {
    now_ms: u64,
    modes: bool,
    records: Vec<Record>,
}

impl ActionDispatcher for Recorder {
    fn dispatch(&mut self, action: KeyboardAction) {
        self.records.push(Record::Action {
            at_ms: self.now_ms,
            action,
        });
    }

    fn mode_changed(&mut self, mode: GestureMode) {
        if self.modes {
            self.records.push(Record::Mode {
                at_ms: self.now_ms,
                mode: format!("{:?}", mode),
            });
        }
    }
}

fn to_event(event: ScriptEvent, at: Instant) -> Result<ContactEvent> {
    let position = Point::new(event.x, event.y);
    let contact = match event.phase {
        Phase::Began => {
            let key = event
                .key
                .with_context(|| format!("began event for contact {} has no key", event.id))?;
            ContactEvent::began(event.id, position, at, key)
        }
        Phase::Moved => ContactEvent::moved(event.id, position, at, event.key),
        Phase::Ended => ContactEvent::ended(event.id, position, at, event.key),
        Phase::Cancelled => ContactEvent::cancelled(event.id, position, at),
    };
    Ok(match event.force {
        Some((value, maximum)) => contact.with_force(value, maximum),
        None => contact,
    })
}

/// Fire due timers one deadline at a time so each firing gets its own stamp.
fn run_timers_until(machine: &mut GestureMachine<Recorder>, t0: Instant, until: Instant) {
    while let Some(deadline) = machine.next_deadline().filter(|d| *d <= until) {
        machine.dispatcher_mut().now_ms = deadline.saturating_duration_since(t0).as_millis() as u64;
        if machine.poll(deadline) == 0 {
            break;
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "jyutboard_core=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let content = std::fs::read_to_string(&args.script)
        .with_context(|| format!("read script {}", args.script.display()))?;
    let mut script: Script = serde_json::from_str(&content)
        .with_context(|| format!("parse script {}", args.script.display()))?;

    let config = match &args.config {
        Some(path) => Config::load_toml(path)?,
        None => script.config.take().unwrap_or_default(),
    };
    script.events.sort_by_key(|e| e.at_ms);
    let last_ms = script.events.last().map_or(0, |e| e.at_ms);
    let until_ms = script.until_ms.unwrap_or(last_ms).max(last_ms);

    let recorder = Recorder {
        now_ms: 0,
        modes: args.modes,
        records: Vec::new(),
    };
    let mut machine = GestureMachine::new(config, recorder);
    let t0 = Instant::now();

    for event in script.events {
        let at = t0 + Duration::from_millis(event.at_ms);
        run_timers_until(&mut machine, t0, at);
        machine.dispatcher_mut().now_ms = event.at_ms;
        machine.handle_event(to_event(event, at)?);
    }
    run_timers_until(&mut machine, t0, t0 + Duration::from_millis(until_ms));

    for record in &machine.dispatcher().records {
        println!("{}", serde_json::to_string(record)?);
    }
    Ok(())
}
