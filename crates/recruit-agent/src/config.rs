//! Settings read from the environment.

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};

use recruit_agent_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

use crate::storage::OrchestratorConfig;
use crate::traffit::{DEFAULT_BASE_URL, DEFAULT_CLIENT_ID, TraffitConfig};

const DEFAULT_MAX_TURNS: usize = 25;

/// Error type for [`Config`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set or is empty.
    Missing(&'static str),
    /// A variable is set to something that cannot be used.
    Invalid {
        /// The variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => {
                write!(f, "{name} environment variable is not set")
            }
            Self::Invalid { name, value } => {
                write!(f, "{name} has an invalid value: `{value}`")
            }
        }
    }
}

impl StdError for ConfigError {}

/// Everything needed to assemble a session.
#[derive(Clone, Debug)]
pub struct Config {
    /// Model provider settings.
    pub openai: OpenAIConfig,
    /// Recruiting API settings.
    pub traffit: TraffitConfig,
    /// Storage bucket settings.
    pub orchestrator: OrchestratorConfig,
    /// Upper bound on model calls per run, `None` for no bound.
    pub max_turns: Option<usize>,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value of
    /// a variable if it is set. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let mut openai = OpenAIConfigBuilder::with_api_key(require("OPENAI_API_KEY")?);
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            openai = openai.with_base_url(base_url);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            openai = openai.with_model(model);
        }

        let traffit = TraffitConfig {
            base_url: get("TRAFFIT_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            client_id: get("TRAFFIT_CLIENT_ID")
                .unwrap_or_else(|| DEFAULT_CLIENT_ID.to_owned()),
            client_secret: require("TRAFFIT_CLIENT_SECRET")?,
        };

        let orchestrator = OrchestratorConfig {
            base_url: require("UIPATH_URL")?,
            access_token: require("UIPATH_ACCESS_TOKEN")?,
        };

        let max_turns = match get("RECRUIT_AGENT_MAX_TURNS") {
            None => Some(DEFAULT_MAX_TURNS),
            Some(value) => match value.parse::<usize>() {
                Ok(0) => None,
                Ok(max_turns) => Some(max_turns),
                Err(_) => {
                    return Err(ConfigError::Invalid {
                        name: "RECRUIT_AGENT_MAX_TURNS",
                        value,
                    });
                }
            },
        };

        Ok(Self {
            openai: openai.build(),
            traffit,
            orchestrator,
            max_turns,
        })
    }
}
