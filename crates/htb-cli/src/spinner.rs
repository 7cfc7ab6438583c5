//! Terminal spinner for the provisioning wait.
//!
//! The animation runs on its own tokio task and only ever writes to
//! stderr; `stop` cancels it and clears the line without waiting, so the
//! polling loop is never blocked by the indicator.

use std::io::IsTerminal;
use std::sync::Mutex;
use std::time::Duration;

use htb_core::Progress;
use tokio_util::sync::CancellationToken;

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Spinner shown while waiting. Falls back to a single line when stderr
/// is not a terminal.
pub struct Spinner {
    running: Mutex<Option<CancellationToken>>,
    animate: bool,
}

impl Spinner {
    pub fn new() -> Self {
        Self::with_animation(std::io::stderr().is_terminal())
    }

    pub fn with_animation(animate: bool) -> Self {
        Self {
            running: Mutex::new(None),
            animate,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl Default for Spinner {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for Spinner {
    fn start(&self, message: &str) {
        let token = CancellationToken::new();
        if let Ok(mut slot) = self.running.lock() {
            if let Some(previous) = slot.replace(token.clone()) {
                previous.cancel();
            }
        }

        if !self.animate {
            eprintln!("{message}");
            return;
        }

        let message = message.to_string();
        tokio::spawn(async move {
            let mut frames = FRAMES.iter().cycle();
            let mut interval = tokio::time::interval(FRAME_INTERVAL);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        eprint!("\r\x1b[2K");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Some(frame) = frames.next() {
                            eprint!("\r{frame} {message}");
                        }
                    }
                }
            }
        });
    }

    fn stop(&self) {
        let running = self.running.lock().ok().and_then(|mut slot| slot.take());
        if let Some(token) = running {
            token.cancel();
            // Clear now: the process may exit before the task runs again.
            if self.animate {
                eprint!("\r\x1b[2K");
            }
        }
    }
}
