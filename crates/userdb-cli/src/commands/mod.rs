pub mod bench;
pub mod list;
pub mod misc;
pub mod users;

use userdb_core::{AccountStore, UserDbError};

use crate::errors::CliError;

/// Close `store` (draining queued writes and flushing), then hand back the
/// operation's result. The operation's error takes precedence.
pub(crate) async fn close_after<T>(
    store: AccountStore,
    result: Result<T, UserDbError>,
) -> anyhow::Result<T> {
    let closed = store.close().await;
    let value = result?;
    closed?;
    Ok(value)
}

/// Parse a `--data` argument. Absent means an empty object.
pub(crate) fn parse_data(raw: Option<&str>) -> anyhow::Result<serde_json::Value> {
    match raw {
        None => Ok(serde_json::json!({})),
        Some(text) => serde_json::from_str(text)
            .map_err(|e| CliError::invalid_input(format!("Invalid --data JSON: {}", e)).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data() {
        assert_eq!(parse_data(None).unwrap(), serde_json::json!({}));
        assert_eq!(
            parse_data(Some(r#"{"a":1}"#)).unwrap(),
            serde_json::json!({ "a": 1 })
        );
        assert_eq!(parse_data(Some("42")).unwrap(), serde_json::json!(42));
    }

    #[test]
    fn test_parse_data_rejects_bad_json() {
        let err = parse_data(Some("{not json")).unwrap_err();
        assert!(err.downcast_ref::<CliError>().is_some());
        assert!(err.to_string().contains("Invalid --data JSON"));
    }
}
