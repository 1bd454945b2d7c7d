use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);
static EXIT_ON_INTERRUPT: AtomicBool = AtomicBool::new(false);
static RESTORE_HOOK: OnceLock<Box<dyn Fn() + Send + Sync>> = OnceLock::new();

#[derive(Debug)]
pub struct InterruptedError;

impl std::fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interrupted")
    }
}

impl std::error::Error for InterruptedError {}

/// Initializes the Ctrl+C handler.
///
/// The handler sets an interrupt flag only; it does not print anything.
/// The streaming session notices the flag between two messages and runs its
/// normal shutdown, so the dashboard is never left half drawn.
///
/// # Errors
/// Returns an error if registering the Ctrl+C handler fails.
pub fn init() -> Result<()> {
    ctrlc::set_handler(trigger_ctrl_c).context("Error setting Ctrl+C handler")
}

/// Triggers an interrupt via Ctrl+C, force-exiting on a second Ctrl+C or
/// when [`set_exit_on_interrupt`] is on.
pub fn trigger_ctrl_c() {
    let pending = INTERRUPTED.swap(true, Ordering::SeqCst);
    if pending || EXIT_ON_INTERRUPT.load(Ordering::SeqCst) {
        // A pending interrupt means the source is stuck in a blocking pull.
        // Restore the terminal first since process::exit() bypasses Drop handlers.
        if let Some(hook) = RESTORE_HOOK.get() {
            hook();
        }
        std::process::exit(130);
    }
}

/// Checks if an interrupt has been requested.
pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Makes the next Ctrl+C exit at once, e.g. while idling at a prompt where
/// nothing polls the flag.
pub fn set_exit_on_interrupt(exit: bool) {
    EXIT_ON_INTERRUPT.store(exit, Ordering::SeqCst);
}

/// Resets the interrupt flag.
pub fn reset() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

/// Registers a restore hook called on the second Ctrl+C before exit.
///
/// Used by the live dashboard to move the cursor below its last block.
pub fn set_restore_hook<F>(hook: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let _ = RESTORE_HOOK.set(Box::new(hook));
}
