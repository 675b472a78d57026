use serde::{Deserialize, Serialize};

/// Severity of a line forwarded with [`EmbeddedApp::log`](crate::EmbeddedApp::log).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{connected, next};
    use serde_json::json;

    #[tokio::test]
    async fn test_log_payload() {
        let (app, mut host) = connected();

        assert!(app
            .log(LogLevel::Warn, "slow response", Some(json!({ "ms": 1200 })))
            .unwrap());

        let posted = next(&mut host).await;
        assert_eq!(posted.data["event"], "embedded::log");
        assert_eq!(
            posted.data["payload"],
            json!({ "level": "warn", "message": "slow response", "context": { "ms": 1200 } })
        );
    }
}
