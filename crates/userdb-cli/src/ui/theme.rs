//! Status markers and the ANSI palette.

/// Outcome shown in front of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Failed,
    Note,
}

impl Status {
    pub fn marker(self, unicode: bool) -> &'static str {
        match self {
            Status::Done if unicode => "[\u{2713}]",
            Status::Failed if unicode => "[\u{2717}]",
            Status::Note if unicode => "[\u{2139}]",
            Status::Done => "[OK]",
            Status::Failed => "[ERR]",
            Status::Note => "[INFO]",
        }
    }

    pub fn ansi(self) -> &'static str {
        match self {
            Status::Done => palette::GREEN,
            Status::Failed => palette::RED,
            Status::Note => palette::CYAN,
        }
    }
}

pub mod palette {
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const RED: &str = "\x1b[31m";
    pub const CYAN: &str = "\x1b[36m";
    pub const RESET: &str = "\x1b[0m";
}

/// Wrap `text` in an ANSI sequence, or return it untouched.
pub fn paint(text: &str, ansi: &str, enabled: bool) -> String {
    if !enabled {
        return text.to_string();
    }
    format!("{}{}{}", ansi, text, palette::RESET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        assert_eq!(Status::Done.marker(false), "[OK]");
        assert_eq!(Status::Failed.marker(false), "[ERR]");
        assert_eq!(Status::Done.marker(true), "[\u{2713}]");
    }

    #[test]
    fn test_paint() {
        assert_eq!(paint("x", palette::RED, false), "x");
        assert_eq!(paint("x", palette::RED, true), "\x1b[31mx\x1b[0m");
    }
}
