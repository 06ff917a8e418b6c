//! Error classifier configuration

use crate::error::ConfigResult;
use crate::validation::{validate_at_most, validate_positive, Validatable};
use serde::{Deserialize, Serialize};

/// Hard ceiling on stored error message length
pub const MESSAGE_CHAR_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Characters kept from the representative diagnostic line
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_message_chars: default_max_message_chars(),
        }
    }
}

impl Validatable for ClassifierConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.max_message_chars, "max_message_chars", self.domain_name())?;
        validate_at_most(
            self.max_message_chars,
            MESSAGE_CHAR_LIMIT,
            "max_message_chars",
            self.domain_name(),
        )
    }

    fn domain_name(&self) -> &'static str {
        "classifier"
    }
}

fn default_max_message_chars() -> usize {
    MESSAGE_CHAR_LIMIT
}
