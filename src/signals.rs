use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;

use nix::unistd::isatty;
use signal_hook::{consts::SIGCHLD, iterator::Signals};
use tracing::{debug, trace};

/// Notifications from signal context, applied later by the read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellEvent {
    ChildExited,
}

/// Forwards every SIGCHLD to `tx` from a dedicated thread.
pub fn watch_children(tx: Sender<ShellEvent>) -> io::Result<()> {
    let mut signals = Signals::new([SIGCHLD])?;
    thread::Builder::new()
        .name("sigchld".into())
        .spawn(move || {
            for _ in signals.forever() {
                trace!("SIGCHLD");
                if tx.send(ShellEvent::ChildExited).is_err() {
                    break; // shell is gone
                }
            }
        })?;
    Ok(())
}

/// What the shell itself prints for a Ctrl-C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    Ignore,
    /// Move past the `^C` echoed by the terminal.
    Newline,
    /// Newline, then the prompt again.
    Redraw,
}

/// A running foreground child receives SIGINT from the terminal on its own;
/// the shell only ends the line then, and redraws the prompt when idle.
pub fn interrupt_action(executing: bool, tty: bool) -> InterruptAction {
    match (tty, executing) {
        (false, _) => InterruptAction::Ignore,
        (true, true) => InterruptAction::Newline,
        (true, false) => InterruptAction::Redraw,
    }
}

/// Ctrl-C handling for the shell process itself.
pub fn install_interrupt_handler(
    executing: Arc<AtomicBool>,
    prompt: Arc<Mutex<String>>,
) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        let tty = isatty(libc::STDIN_FILENO).unwrap_or(false);
        let action = interrupt_action(executing.load(Ordering::SeqCst), tty);
        debug!(?action, "interrupt");
        if action == InterruptAction::Ignore {
            return;
        }
        let mut stdout = io::stdout();
        let _ = writeln!(stdout);
        if action == InterruptAction::Redraw {
            if let Ok(prompt) = prompt.lock() {
                let _ = write!(stdout, "{prompt}");
            }
        }
        let _ = stdout.flush();
    })
}
