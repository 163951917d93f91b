//! Terminal bell rendering of the expiry chime.

use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use pintimer_core::{AlertPattern, AlertSink, AlertSinkFactory, BoxedAlertSink, PlaybackError};

/// Plays an alert pattern as BEL characters on the pattern's pulse
/// schedule. The terminal decides what a bell sounds or flashes like;
/// only the timing survives, frequency and gain have no meaning here.
///
/// Pulses are written from a detached thread so playback never stalls
/// the event loop.
pub struct TerminalBell;

impl AlertSink for TerminalBell {
    fn play(&mut self, pattern: &AlertPattern) -> Result<(), PlaybackError> {
        let offsets: Vec<u32> = pattern.pulses.iter().map(|p| p.offset_ms).collect();
        thread::Builder::new()
            .name("pintimer-bell".into())
            .spawn(move || {
                let mut elapsed = 0;
                for offset in offsets {
                    if offset > elapsed {
                        thread::sleep(Duration::from_millis(u64::from(offset - elapsed)));
                        elapsed = offset;
                    }
                    let mut out = io::stdout();
                    let _ = out.write_all(b"\x07");
                    let _ = out.flush();
                }
            })?;
        Ok(())
    }
}

/// Sink factory for widget options. Every widget arms its own bell.
pub fn factory() -> AlertSinkFactory {
    Box::new(|| Some(Box::new(TerminalBell) as BoxedAlertSink))
}
