use cryostar::workflows::{Progress, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;

/// What the terminal is currently showing.
enum Display {
    Idle,
    /// An unbounded phase, drawn as a spinner.
    Spinner(ProgressBar),
    /// A counted task, drawn as a bar.
    Bar(ProgressBar),
}

impl Display {
    fn clear(&mut self) {
        match std::mem::replace(self, Display::Idle) {
            Display::Idle => {}
            Display::Spinner(pb) | Display::Bar(pb) => pb.finish_and_clear(),
        }
    }
}

/// Renders workflow progress events on stderr.
///
/// Each phase or task gets its own bar, created when the event arrives
/// and cleared when it ends, so a finished run leaves the terminal clean
/// and never touches stdout. Drawing is suppressed automatically when
/// stderr is not a terminal.
pub struct CliProgressHandler {
    display: Arc<Mutex<Display>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self {
            display: Arc::new(Mutex::new(Display::Idle)),
        }
    }

    pub fn callback(&self) -> ProgressCallback<'static> {
        let display = Arc::clone(&self.display);

        Box::new(move |progress: Progress| {
            let Ok(mut display) = display.lock() else {
                warn!("Progress display mutex was poisoned; updates stop here.");
                return;
            };

            match progress {
                Progress::PhaseStart { name } => {
                    display.clear();
                    let spinner = ProgressBar::new_spinner()
                        .with_style(spinner_style())
                        .with_message(name);
                    spinner.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                    spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                    *display = Display::Spinner(spinner);
                }
                Progress::PhaseFinish => display.clear(),
                Progress::TaskStart { total_steps } => {
                    display.clear();
                    let bar = ProgressBar::new(total_steps).with_style(bar_style());
                    bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
                    *display = Display::Bar(bar);
                }
                Progress::TaskIncrement => {
                    if let Display::Bar(bar) = &*display {
                        bar.inc(1);
                    }
                }
                Progress::TaskFinish => display.clear(),
                Progress::Message(msg) => match &*display {
                    Display::Idle => eprintln!("{msg}"),
                    Display::Spinner(pb) | Display::Bar(pb) => pb.println(msg),
                },
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .expect("Failed to create spinner style template")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("[{bar:40.cyan/blue}] {pos}/{len} operators ({elapsed})")
        .expect("Failed to create bar style template")
        .progress_chars("=> ")
}
