//! Server configuration file.
//!
//! A TOML file carries the listen address, the real-time policy values and
//! the seed data of the in-memory collaborators:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [realtime]
//! typing_timeout_ms = 3000
//! max_message_length = 1000
//!
//! [[users]]
//! token = "token-alice"
//! user_id = "alice"
//! name = "Alice"
//!
//! [[rooms]]
//! id = "general"
//! participants = ["alice", "bob"]
//! ```
//!
//! Every section is optional. Command line flags override file values.

use std::{collections::HashSet, path::Path, sync::Arc, time::Duration};

use serde::Deserialize;
use tamariba_shared::time::Clock;
use thiserror::Error;

use crate::{
    domain::{Identity, Room, RoomId, UserId, ValueObjectError},
    infrastructure::repository::{InMemoryAuthenticator, InMemoryRoomStore},
    usecase::RealtimeSettings,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field}: {source}")]
    InvalidIdentifier {
        field: &'static str,
        source: ValueObjectError,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub realtime: RealtimeConfig,
    pub users: Vec<UserConfig>,
    pub rooms: Vec<RoomConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RealtimeConfig {
    pub typing_timeout_ms: u64,
    pub max_message_length: usize,
    pub default_history_limit: usize,
    pub max_history_limit: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        let settings = RealtimeSettings::default();
        Self {
            typing_timeout_ms: settings.typing_timeout.as_millis() as u64,
            max_message_length: settings.max_message_length,
            default_history_limit: settings.default_history_limit,
            max_history_limit: settings.max_history_limit,
        }
    }
}

/// Credential accepted by the in-memory authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    pub token: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomConfig {
    pub id: String,
    #[serde(default)]
    pub participants: Vec<String>,
}

impl AppConfig {
    /// Load and validate a config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(&contents)?;
        tracing::info!(
            "Loaded config from {} ({} users, {} rooms)",
            path.display(),
            config.users.len(),
            config.rooms.len()
        );
        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let realtime = &self.realtime;
        if realtime.typing_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "typing_timeout_ms must be positive".to_string(),
            ));
        }
        if realtime.max_message_length == 0 {
            return Err(ConfigError::Invalid(
                "max_message_length must be positive".to_string(),
            ));
        }
        if realtime.default_history_limit == 0
            || realtime.default_history_limit > realtime.max_history_limit
        {
            return Err(ConfigError::Invalid(format!(
                "default_history_limit must be within 1..={}",
                realtime.max_history_limit
            )));
        }

        let mut tokens = HashSet::new();
        for user in &self.users {
            if !tokens.insert(user.token.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "token of user '{}' is already assigned",
                    user.user_id
                )));
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> RealtimeSettings {
        RealtimeSettings {
            typing_timeout: Duration::from_millis(self.realtime.typing_timeout_ms),
            max_message_length: self.realtime.max_message_length,
            default_history_limit: self.realtime.default_history_limit,
            max_history_limit: self.realtime.max_history_limit,
        }
    }

    /// Authenticator accepting exactly the configured tokens.
    pub fn build_authenticator(&self) -> Result<InMemoryAuthenticator, ConfigError> {
        let tokens = self
            .users
            .iter()
            .map(|user| {
                let user_id = parse_id(UserId::new(user.user_id.clone()), "user_id")?;
                let identity = Identity::new(user_id, user.name.clone(), user.avatar.clone());
                Ok((user.token.clone(), identity))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(InMemoryAuthenticator::with_tokens(tokens))
    }

    /// Room store holding the configured rooms and their participants.
    pub async fn build_room_store(
        &self,
        clock: Arc<dyn Clock>,
    ) -> Result<InMemoryRoomStore, ConfigError> {
        let store = InMemoryRoomStore::new(clock);
        for room in &self.rooms {
            let room_id = parse_id(RoomId::new(room.id.clone()), "room id")?;
            let participants = room
                .participants
                .iter()
                .map(|id| parse_id(UserId::new(id.clone()), "participant"))
                .collect::<Result<Vec<_>, _>>()?;
            store.add_room(Room::new(room_id, participants)).await;
        }
        Ok(store)
    }
}

fn parse_id<T>(
    result: Result<T, ValueObjectError>,
    field: &'static str,
) -> Result<T, ConfigError> {
    result.map_err(|source| ConfigError::InvalidIdentifier { field, source })
}
