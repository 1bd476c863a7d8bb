//! Startup checks. Both failures here are fatal: the relay never starts.

use crate::{config::Config, errors::Error, ports::DownstreamClient, Result};

/// Refuse to start unless every required value is present and well-formed.
///
/// Touches nothing but `cfg`, so it runs before any client is constructed.
pub fn check_env(cfg: &Config) -> Result<()> {
    let missing: Vec<&str> = cfg
        .required()
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| *k)
        .collect();
    if !missing.is_empty() {
        return Err(Error::Config(format!(
            "env data is empty: {}",
            missing.join(", ")
        )));
    }

    cfg.team_chat()?;
    cfg.operator_chat()?;
    cfg.vk_user_id()?;
    cfg.vk_group_id()?;
    Ok(())
}

/// Check the downstream once. Any failure is promoted to a config error.
pub async fn verify_downstream(downstream: &dyn DownstreamClient) -> Result<()> {
    match downstream.verify_reachable().await {
        Ok(who) => {
            tracing::info!("downstream reachable as {who}");
            Ok(())
        }
        Err(e) => Err(Error::Config(format!("downstream is unreachable: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::domain::ChatId;
    use crate::messaging::delivery::{tests::FakeMessenger, ChatDelivery};
    use std::sync::Arc;

    #[test]
    fn full_config_passes() {
        check_env(&test_config()).unwrap();
    }

    #[test]
    fn any_blank_required_value_is_fatal() {
        let mut cfg = test_config();
        cfg.vk_user = "  ".to_string();
        cfg.telegram_bot_token = String::new();

        let err = check_env(&cfg).unwrap_err();
        assert!(err.is_fatal());
        let msg = err.to_string();
        assert!(msg.contains("TELEGRAM_BOT_TOKEN"), "{msg}");
        assert!(msg.contains("VK_USER"), "{msg}");
        assert!(!msg.contains("TEAM_NAME"), "{msg}");
    }

    #[test]
    fn non_numeric_ids_are_fatal() {
        let mut cfg = test_config();
        cfg.telegram_team_chat = "@my_team".to_string();
        assert!(check_env(&cfg).unwrap_err().is_fatal());
    }

    #[tokio::test]
    async fn unreachable_downstream_is_fatal() {
        let messenger = Arc::new(FakeMessenger::default());
        let delivery = ChatDelivery::new(messenger.clone(), ChatId(1), ChatId(2));
        verify_downstream(&delivery).await.unwrap();

        *messenger.fail_with.lock().unwrap() = Some("401 Unauthorized".to_string());
        let err = verify_downstream(&delivery).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("401 Unauthorized"));
    }
}
