//! Progress reporting for bulk writes using indicatif.

use indicatif::{ProgressBar as Bar, ProgressStyle};

use super::render::status;
use super::terminal::Terminal;
use super::theme::Status;

/// Steps between progress lines when the bar cannot animate.
const PLAIN_STEP: u64 = 1000;

/// Counts completed steps toward a known total.
///
/// Draws an indicatif bar on an animated terminal. Otherwise it prints a
/// count every [`PLAIN_STEP`] steps, or stays silent when quiet.
pub struct ProgressBar<'a> {
    term: &'a Terminal,
    bar: Option<Bar>,
    label: String,
    done: u64,
    quiet: bool,
}

impl<'a> ProgressBar<'a> {
    pub fn new(term: &'a Terminal, total: u64, label: &str, quiet: bool) -> Self {
        let bar = (term.animated() && !quiet).then(|| {
            let template = if term.unicode {
                "{msg} {bar:30.cyan/blue} {pos}/{len} ({per_sec})"
            } else {
                "{msg} [{bar:30}] {pos}/{len} ({per_sec})"
            };
            let bar = Bar::new(total).with_message(label.to_string());
            if let Ok(style) = ProgressStyle::with_template(template) {
                bar.set_style(style.progress_chars("=> "));
            }
            bar
        });

        Self {
            term,
            bar,
            label: label.to_string(),
            done: 0,
            quiet,
        }
    }

    pub fn inc(&mut self) {
        self.done += 1;
        if let Some(bar) = &self.bar {
            bar.inc(1);
        } else if !self.quiet && self.done % PLAIN_STEP == 0 {
            println!("{}: {}", self.label, self.done);
        }
    }

    /// Clear the bar and print `message` as a completed status line.
    pub fn finish(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
        if !self.quiet {
            println!("{}", status(self.term, Status::Done, message));
        }
    }
}
