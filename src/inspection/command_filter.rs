use std::collections::HashSet;

use super::inspector::{ContentInspector, Verdict};
use crate::configuration::types::{FilterMode, IpsConfig};
use crate::framing::Message;

/// Guards a four-letter-word administrative interface.
///
/// A message must be exactly one whitespace delimited token; anything else is
/// treated as a probe and blocked. The token is then checked against the
/// configured command set, either as a whitelist or as a blacklist.
pub struct CommandAccessFilter {
    mode: FilterMode,
    commands: HashSet<String>,
}

impl CommandAccessFilter {
    pub fn new(config: &IpsConfig) -> Self {
        Self {
            mode: config.mode,
            commands: config.commands.iter().cloned().collect(),
        }
    }
}

impl ContentInspector for CommandAccessFilter {
    fn name(&self) -> &'static str {
        "ips"
    }

    fn inspect(&self, message: &Message) -> Verdict {
        let text = message.text();
        let tokens: Vec<&str> = text.split_whitespace().collect();

        let [command] = tokens.as_slice() else {
            return Verdict::Block(format!(
                "expected a single command, got {} tokens",
                tokens.len()
            ));
        };

        let listed = self.commands.contains(*command);
        match (self.mode, listed) {
            (FilterMode::Whitelist, true) | (FilterMode::Blacklist, false) => Verdict::Allow,
            (FilterMode::Whitelist, false) => {
                Verdict::Block(format!("command {} is not whitelisted", command))
            }
            (FilterMode::Blacklist, true) => {
                Verdict::Block(format!("command {} is blacklisted", command))
            }
        }
    }
}
