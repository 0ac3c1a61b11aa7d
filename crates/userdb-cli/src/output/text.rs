//! Human-readable output for accounts.

use chrono::{DateTime, Utc};
use userdb_core::User;

use crate::ui::{emit, field, table, Terminal};

const LIST_HEADERS: [&str; 4] = ["Email", "Created", "Modified", "Data"];

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Print a single account.
///
/// Quiet mode prints only the account data.
pub fn print_user(term: &Terminal, user: &User, quiet: bool) {
    if quiet {
        emit(term, &user.data.to_string());
        return;
    }
    emit(term, &field(term, "Email", &user.email));
    emit(term, &field(term, "Created", &format_date(&user.created_date)));
    emit(term, &field(term, "Modified", &format_date(&user.modified_date)));
    emit(term, &field(term, "Data", &user.data.to_string()));
}

/// Print accounts as a table (pretty) or tab-separated rows (plain).
///
/// Quiet mode prints only the emails.
pub fn print_user_list(term: &Terminal, users: &[User], quiet: bool) {
    if quiet {
        for user in users {
            emit(term, &user.email);
        }
        return;
    }
    if users.is_empty() {
        emit(term, "No accounts found.");
        return;
    }
    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|user| {
            vec![
                user.email.clone(),
                format_date(&user.created_date),
                format_date(&user.modified_date),
                user.data.to_string(),
            ]
        })
        .collect();
    emit(term, &table(term, &LIST_HEADERS, &rows));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date() {
        let date = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        assert_eq!(format_date(&date), "2023-11-14 22:13:20 UTC");
    }
}
