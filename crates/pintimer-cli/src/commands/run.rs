use clap::Args;

use pintimer_core::{CreationRequest, LaunchParams, TimerConfig};

use crate::tui::{self, RunOptions};

#[derive(Args)]
pub struct RunArgs {
    /// Timer mode: countdown or countup
    #[arg(long = "type", value_name = "MODE")]
    mode: Option<String>,
    /// Countdown length in seconds
    #[arg(long)]
    seconds: Option<String>,
    /// Number of widgets to open
    #[arg(long, default_value_t = 1)]
    count: usize,
    /// Strict JSON creation request, e.g. '{"mode":"countdown","seconds":300}'
    #[arg(long, value_name = "JSON", conflicts_with_all = ["mode", "seconds"])]
    request: Option<String>,
    /// Report no pinned capability; pin attempts silently stay on the page
    #[arg(long)]
    no_pin: bool,
    /// Do not pin the widget automatically on its first start
    #[arg(long)]
    manual_pin: bool,
    /// Disable the expiry chime
    #[arg(long)]
    mute: bool,
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = match &args.request {
        // The request path is strict: a zero countdown is an error
        // here, where the launch-parameter path falls back to the
        // default instead.
        Some(raw) => serde_json::from_str::<CreationRequest>(raw)?.validate()?,
        None => LaunchParams {
            mode: args.mode.clone(),
            seconds: args.seconds.clone(),
        }
        .resolve(),
    };
    let configs: Vec<TimerConfig> = vec![config; args.count.max(1)];
    tui::run(
        configs,
        RunOptions {
            auto_pin: !args.manual_pin,
            pin_capability: !args.no_pin,
            mute: args.mute,
        },
    )
}
