use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{domain::ChatId, errors::Error, Result};

/// How many passes the driver makes over the listeners.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunMode {
    /// One pass, then exit. Repetition is left to an outside scheduler.
    #[default]
    Once,
    Forever,
}

impl FromStr for RunMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "once" => Ok(RunMode::Once),
            "forever" | "loop" => Ok(RunMode::Forever),
            other => Err(Error::Config(format!(
                "RELAY_RUN_MODE must be `once` or `forever`, got `{other}`"
            ))),
        }
    }
}

/// Typed configuration, built once at startup and shared read-only.
///
/// Required values are kept as raw strings here; `guard::check_env` decides
/// whether they are usable before any client is constructed.
#[derive(Clone, Debug)]
pub struct Config {
    // Required
    pub team_name: String,
    pub telegram_bot_token: String,
    pub telegram_team_chat: String,
    pub telegram_user: String,
    pub vk_token_admin: String,
    pub vk_user: String,
    pub vk_group_target: String,

    // State
    pub app_json_folder: PathBuf,

    // Polling
    pub vk_update_interval: Duration,
    pub telegram_update_interval: Duration,
    pub run_mode: RunMode,
    pub telegram_listener_enabled: bool,

    // Limits
    pub telegram_message_limit: usize,
    pub vk_api_version: String,
    pub vk_request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let run_mode = env_str("RELAY_RUN_MODE")
            .map(|s| s.parse::<RunMode>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            team_name: env_str("TEAM_NAME").unwrap_or_default(),
            telegram_bot_token: env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default(),
            telegram_team_chat: env_str("TELEGRAM_TEAM_CHAT").unwrap_or_default(),
            telegram_user: env_str("TELEGRAM_USER").unwrap_or_default(),
            vk_token_admin: env_str("VK_TOKEN_ADMIN").unwrap_or_default(),
            vk_user: env_str("VK_USER").unwrap_or_default(),
            vk_group_target: env_str("VK_GROUP_TARGET").unwrap_or_default(),
            app_json_folder: env_path("APP_JSON_FOLDER").unwrap_or_else(|| PathBuf::from("data")),
            vk_update_interval: Duration::from_secs(env_u64("API_VK_UPDATE_SEC").unwrap_or(60)),
            telegram_update_interval: Duration::from_secs(
                env_u64("API_TELEGRAM_UPDATE_SEC").unwrap_or(10),
            ),
            run_mode,
            telegram_listener_enabled: env_bool("TELEGRAM_LISTENER_ENABLED").unwrap_or(false),
            telegram_message_limit: env_usize("TELEGRAM_MESSAGE_LIMIT").unwrap_or(4096),
            vk_api_version: env_str("VK_API_VERSION")
                .and_then(non_empty)
                .unwrap_or_else(|| "5.199".to_string()),
            vk_request_timeout: Duration::from_millis(
                env_u64("VK_REQUEST_TIMEOUT_MS").unwrap_or(10_000),
            ),
        })
    }

    /// Every value that must be present before the relay may start, with the
    /// variable it came from.
    pub fn required(&self) -> [(&'static str, &str); 7] {
        [
            ("TEAM_NAME", &self.team_name),
            ("TELEGRAM_BOT_TOKEN", &self.telegram_bot_token),
            ("TELEGRAM_TEAM_CHAT", &self.telegram_team_chat),
            ("TELEGRAM_USER", &self.telegram_user),
            ("VK_TOKEN_ADMIN", &self.vk_token_admin),
            ("VK_USER", &self.vk_user),
            ("VK_GROUP_TARGET", &self.vk_group_target),
        ]
    }

    pub fn team_chat(&self) -> Result<ChatId> {
        parse_i64("TELEGRAM_TEAM_CHAT", &self.telegram_team_chat).map(ChatId)
    }

    pub fn operator_chat(&self) -> Result<ChatId> {
        parse_i64("TELEGRAM_USER", &self.telegram_user).map(ChatId)
    }

    pub fn vk_user_id(&self) -> Result<i64> {
        parse_i64("VK_USER", &self.vk_user)
    }

    /// Community id, always positive (the wall owner id is its negation).
    pub fn vk_group_id(&self) -> Result<i64> {
        let id = parse_i64("VK_GROUP_TARGET", &self.vk_group_target)?.abs();
        if id == 0 {
            return Err(Error::Config("VK_GROUP_TARGET must not be 0".to_string()));
        }
        Ok(id)
    }
}

fn parse_i64(key: &str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::Config(format!("{key} must be a number, got `{raw}`")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        team_name: "Night Owls".to_string(),
        telegram_bot_token: "123:abc".to_string(),
        telegram_team_chat: "-1001".to_string(),
        telegram_user: "77".to_string(),
        vk_token_admin: "vk-token".to_string(),
        vk_user: "55".to_string(),
        vk_group_target: "12345".to_string(),
        app_json_folder: "/tmp".into(),
        vk_update_interval: Duration::from_millis(0),
        telegram_update_interval: Duration::from_millis(0),
        run_mode: RunMode::Once,
        telegram_listener_enabled: false,
        telegram_message_limit: 4096,
        vk_api_version: "5.199".to_string(),
        vk_request_timeout: Duration::from_secs(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_parsing() {
        assert_eq!("once".parse::<RunMode>().unwrap(), RunMode::Once);
        assert_eq!("".parse::<RunMode>().unwrap(), RunMode::Once);
        assert_eq!(" Forever ".parse::<RunMode>().unwrap(), RunMode::Forever);
        assert!("sometimes".parse::<RunMode>().unwrap_err().is_fatal());
    }

    #[test]
    fn dotenv_lines_are_parsed_and_unquoted() {
        let parsed = parse_dotenv(
            "# comment\n\nTEAM_NAME=\"Night Owls\"\nVK_USER = 55\nbroken line\n=novalue\nTOKEN='a=b'\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("TEAM_NAME".to_string(), "Night Owls".to_string()),
                ("VK_USER".to_string(), "55".to_string()),
                ("TOKEN".to_string(), "a=b".to_string()),
            ]
        );
    }

    #[test]
    fn numeric_ids_are_typed() {
        let mut cfg = test_config();
        assert_eq!(cfg.team_chat().unwrap(), ChatId(-1001));
        assert_eq!(cfg.operator_chat().unwrap(), ChatId(77));
        assert_eq!(cfg.vk_user_id().unwrap(), 55);

        cfg.vk_group_target = "-12345".to_string();
        assert_eq!(cfg.vk_group_id().unwrap(), 12345);

        cfg.vk_group_target = "club12345".to_string();
        assert!(cfg.vk_group_id().unwrap_err().is_fatal());

        cfg.vk_group_target = "0".to_string();
        assert!(cfg.vk_group_id().is_err());
    }
}
