use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a sync replays branches.
///
/// Hidden when stderr is not a terminal so piped output stays clean.
pub struct Spinner {
    pb: ProgressBar,
}

/// Cloneable handle for printing lines above a running spinner
#[derive(Debug, Clone)]
pub struct SpinnerPrinter {
    pb: ProgressBar,
}

impl Spinner {
    const TICK_RATE: Duration = Duration::from_millis(80);
    const TEMPLATE: &'static str = "{spinner:.green} {msg}";

    pub fn new(message: impl Into<String>) -> Self {
        let pb = ProgressBar::new_spinner();
        if !console::Term::stderr().is_term() {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::with_template(Self::TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.into());
        pb.enable_steady_tick(Self::TICK_RATE);
        Spinner { pb }
    }

    pub fn printer(&self) -> SpinnerPrinter {
        SpinnerPrinter {
            pb: self.pb.clone(),
        }
    }

    /// Stop the spinner and clear it from the terminal
    pub fn stop(&self) {
        self.pb.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}

impl SpinnerPrinter {
    /// Print a line beneath the spinner, or straight to stdout when it is hidden
    pub fn println<T: AsRef<str>>(&self, message: T) {
        if self.pb.is_hidden() {
            println!("{}", message.as_ref());
        } else {
            self.pb.println(message.as_ref());
        }
    }

    /// Hide the spinner while `f` runs, e.g. for an interactive prompt
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.pb.suspend(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_printer_outlives_stop() {
        let spinner = Spinner::new("Syncing");
        let printer = spinner.printer();
        printer.println("   ├─ a → main");
        spinner.stop();
        printer.println("after stop");
    }
}
