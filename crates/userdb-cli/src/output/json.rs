//! JSON output formatting for accounts.

use userdb_core::User;

/// Convert an account to JSON for output. The password is never included.
pub fn user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "email": user.email,
        "data": user.data,
        "createdTimestamp": user.created_timestamp,
        "modifiedTimestamp": user.modified_timestamp,
        "createdDate": user.created_date.to_rfc3339(),
        "modifiedDate": user.modified_date.to_rfc3339(),
    })
}

/// Convert several accounts to a JSON array for output.
pub fn users_json(users: &[User]) -> Vec<serde_json::Value> {
    users.iter().map(user_json).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use userdb_core::{StoredUser, Timestamp};

    #[test]
    fn test_user_json_omits_password() {
        let now = Timestamp::now();
        let user = User::from_stored(
            "a@example.com".to_string(),
            StoredUser {
                password: "$argon2id$secret".to_string(),
                data: serde_json::json!({ "plan": "pro" }),
                created_timestamp: now,
                modified_timestamp: now,
            },
        );
        let value = user_json(&user);
        assert_eq!(value["email"], "a@example.com");
        assert_eq!(value["data"]["plan"], "pro");
        assert_eq!(value["createdTimestamp"]["hrtime"], now.hrtime);
        assert!(!value.to_string().contains("secret"));
    }
}
