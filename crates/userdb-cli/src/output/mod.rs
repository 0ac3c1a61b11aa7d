//! Output formatting for accounts (JSON, table, plain text).

mod json;
mod text;

pub use json::{user_json, users_json};
pub use text::{print_user, print_user_list};
