use std::io::{self, Write};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::bail;
use chrono::Utc;
use clap::Args;

use pintimer_core::{
    AlertGenerator, AlertPattern, LaunchParams, SystemClock, TickOutcome, TimerMachine, TimerMode,
    WidgetEvent,
};

use crate::bell;

#[derive(Args)]
pub struct WaitArgs {
    /// Timer mode: countdown or countup
    #[arg(long = "type", value_name = "MODE")]
    mode: Option<String>,
    /// Countdown length in seconds
    #[arg(long)]
    seconds: Option<String>,
    /// Print events as JSON lines instead of the in-place display
    #[arg(long)]
    json: bool,
    /// Disable the expiry chime
    #[arg(long)]
    mute: bool,
}

/// Run one countdown to zero in the foreground, no surface involved.
/// Ticks come from the real clock; the machine is driven on this thread
/// through a channel, the same shape the interactive loop uses.
pub fn run(args: WaitArgs) -> anyhow::Result<()> {
    let config = LaunchParams {
        mode: args.mode.clone(),
        seconds: args.seconds.clone(),
    }
    .resolve();
    if config.mode == TimerMode::Countup {
        bail!("a count-up timer never finishes; use `run` instead");
    }

    let mut machine = TimerMachine::new(config);
    let mut alert = if args.mute {
        AlertGenerator::disabled()
    } else {
        AlertGenerator::new(bell::factory())
    };

    let clock = SystemClock::new();
    let (tx, rx) = mpsc::channel();
    let started = machine.start(
        &clock,
        Box::new(move || {
            let _ = tx.send(());
        }),
    );
    if !started {
        bail!("nothing to wait for: the countdown is already at zero");
    }
    alert.arm();

    if args.json {
        print_event(&WidgetEvent::Started {
            mode: config.mode,
            value: machine.value(),
            at: Utc::now(),
        })?;
    } else {
        show(&machine)?;
    }

    loop {
        rx.recv()?;
        match machine.on_tick() {
            TickOutcome::Continued => {
                if !args.json {
                    show(&machine)?;
                }
            }
            TickOutcome::Expired => {
                let alerted = alert.signal_expiry();
                if args.json {
                    print_event(&WidgetEvent::Expired {
                        alerted,
                        at: Utc::now(),
                    })?;
                } else {
                    show(&machine)?;
                    println!();
                }
                if alerted {
                    // The bell plays from a detached thread; give the
                    // pattern time to finish before the process exits.
                    thread::sleep(Duration::from_millis(u64::from(
                        AlertPattern::time_up().total_ms(),
                    )));
                }
                return Ok(());
            }
            TickOutcome::Ignored => {}
        }
    }
}

fn show(machine: &TimerMachine) -> io::Result<()> {
    let mut out = io::stdout();
    write!(out, "\r{}", machine.display())?;
    out.flush()
}

fn print_event(event: &WidgetEvent) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
