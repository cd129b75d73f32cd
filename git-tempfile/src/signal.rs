use once_cell::race::OnceBool;
use signal_hook::iterator::Signals;

/// Controls what the installed signal handler does after cleaning up tempfiles.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SignalHandlerMode {
    /// Remove tempfiles, then let the process terminate normally.
    DeleteTempfilesOnTermination,
    /// Remove tempfiles, then restore the platform default signal behavior and re-raise,
    /// so a shell reports the expected signal-based exit status.
    DeleteTempfilesOnTerminationAndRestoreDefaultBehaviour,
}

static INSTALLED: OnceBool = OnceBool::new();

/// Install the handler exactly once; subsequent calls (even with a different `mode`) are no-ops.
///
/// Safe to call repeatedly; only the first call installs anything.
pub fn install(mode: SignalHandlerMode) {
    let _ = INSTALLED.get_or_init(|| {
        let restore_default = matches!(mode, SignalHandlerMode::DeleteTempfilesOnTerminationAndRestoreDefaultBehaviour);
        if let Ok(mut signals) = Signals::new([signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT]) {
            std::thread::spawn(move || {
                for sig in signals.forever() {
                    crate::cleanup_all();
                    if restore_default {
                        signal_hook::low_level::emulate_default_handler(sig).ok();
                    }
                    std::process::exit(128 + sig);
                }
            });
        }
        true
    });
}
