//! Terminal output for the userdb CLI.
//!
//! [`Terminal`] decides between JSON, plain and pretty output; `render`
//! builds lines and tables for it; `progress` drives the populate bar.

pub mod progress;
pub mod render;
pub mod terminal;
pub mod theme;

pub use progress::ProgressBar;
pub use render::{emit, emit_error, field, status, table};
pub use terminal::Terminal;
pub use theme::Status;
