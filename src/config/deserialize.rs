// ABOUTME: Custom serde deserializers for config fields.
// ABOUTME: Handles the optional fixed tag and the container command.

use serde::Deserialize;

/// An absent or blank tag means "follow the registry".
pub fn deserialize_fixed_tag<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

pub fn deserialize_command<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match CommandEntry::deserialize(deserializer)? {
        CommandEntry::Line(line) => shell_words::split(&line).map_err(serde::de::Error::custom),
        CommandEntry::Args(args) => Ok(args),
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandEntry {
    Line(String),
    Args(Vec<String>),
}
