//! Terminal detection and output routing.

use std::io::IsTerminal;

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// A single JSON document, nothing else
    Json,
    /// Undecorated lines for pipes and scripts
    Plain,
    /// Tables, colors and progress bars
    Pretty,
}

impl OutputMode {
    /// `--json` always wins; pretty output needs a TTY that is not `TERM=dumb`.
    pub fn pick(json: bool, tty: bool, dumb: bool) -> Self {
        match (json, tty && !dumb) {
            (true, _) => OutputMode::Json,
            (false, true) => OutputMode::Pretty,
            (false, false) => OutputMode::Plain,
        }
    }
}

/// What the attached terminal can show.
#[derive(Debug, Clone)]
pub struct Terminal {
    pub tty: bool,
    pub color: bool,
    pub unicode: bool,
    pub mode: OutputMode,
}

impl Terminal {
    /// Inspect stdout, `TERM` and `NO_COLOR`.
    pub fn detect(json: bool) -> Self {
        let tty = std::io::stdout().is_terminal();
        let dumb = matches!(std::env::var("TERM").as_deref(), Ok("dumb"));
        let color = tty && !dumb && std::env::var_os("NO_COLOR").is_none();
        Self {
            tty,
            color,
            unicode: !dumb,
            mode: OutputMode::pick(json, tty, dumb),
        }
    }

    pub fn json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    pub fn pretty(&self) -> bool {
        self.mode == OutputMode::Pretty
    }

    pub fn animated(&self) -> bool {
        self.tty && self.pretty()
    }
}
