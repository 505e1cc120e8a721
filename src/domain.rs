use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Nested,
    Flat,
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layout::Nested => write!(f, "nested"),
            Layout::Flat => write!(f, "flat"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelField {
    Mark,
    Name,
}

impl fmt::Display for LabelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelField::Mark => write!(f, "mark"),
            LabelField::Name => write!(f, "name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = ArchiveError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = !normalized.is_empty()
            && !normalized
                .chars()
                .any(|ch| ch.is_whitespace() || is_separator(ch));
        if !is_valid {
            return Err(ArchiveError::InvalidItemId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    #[serde(default)]
    pub mark: String,
    #[serde(default)]
    pub name: String,
}

impl CacheRecord {
    pub fn new(mark: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mark: mark.into(),
            name: name.into(),
        }
    }

    pub fn field(&self, field: LabelField) -> &str {
        match field {
            LabelField::Mark => &self.mark,
            LabelField::Name => &self.name,
        }
    }

    pub fn folder_label(&self) -> &str {
        if self.mark.is_empty() {
            &self.name
        } else {
            &self.mark
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderKey {
    pub prefix: String,
    pub id: ItemId,
    pub qualifier: String,
}

impl FolderKey {
    pub fn new(prefix: impl Into<String>, id: ItemId, qualifier: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            id,
            qualifier: qualifier.into(),
        }
    }

    /// `prefix + id + "_" + label + "_" + qualifier`
    pub fn folder_name(&self, label: &str) -> String {
        format!("{}{}_{}_{}", self.prefix, self.id, label, self.qualifier)
    }
}

pub fn validate_label(label: &str) -> Result<(), ArchiveError> {
    if label.chars().any(is_separator) {
        return Err(ArchiveError::InvalidLabel(label.to_string()));
    }
    Ok(())
}

pub fn replace_first(haystack: &str, from: &str, to: &str) -> Option<String> {
    let start = haystack.find(from)?;
    let mut replaced = String::with_capacity(haystack.len() + to.len());
    replaced.push_str(&haystack[..start]);
    replaced.push_str(to);
    replaced.push_str(&haystack[start + from.len()..]);
    Some(replaced)
}

fn is_separator(ch: char) -> bool {
    ch == '/' || ch == '\\'
}
