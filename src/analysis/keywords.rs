//! Keyword profile: trigger phrases per role.

use super::builtin_tables;
use crate::Result;
use std::collections::{BTreeMap, BTreeSet};

/// Mapping role -> lowercase trigger phrases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordProfile {
    triggers: BTreeMap<String, Vec<String>>,
}

impl KeywordProfile {
    /// The built-in profile.
    pub fn builtin() -> Result<Self> {
        Ok(Self::from_table(builtin_tables()?.keywords))
    }

    /// Build from a role -> phrases table. Phrases are lowercased.
    pub fn from_table(table: BTreeMap<String, Vec<String>>) -> Self {
        let triggers = table
            .into_iter()
            .map(|(role, phrases)| {
                let phrases = phrases.into_iter().map(|p| p.to_lowercase()).collect();
                (role, phrases)
            })
            .collect();
        Self { triggers }
    }

    /// Replace the triggers of every role named in `overrides`.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, Vec<String>>) -> Self {
        for (role, phrases) in Self::from_table(overrides.clone()).triggers {
            self.triggers.insert(role, phrases);
        }
        self
    }

    pub fn triggers(&self, role: &str) -> Option<&[String]> {
        self.triggers.get(role).map(Vec::as_slice)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.triggers.keys().map(String::as_str)
    }

    /// Sum of non-overlapping occurrence counts of each trigger in
    /// `lowered`, which must already be lowercase. Every trigger counts
    /// independently, so text matching both `auth` and `authentication`
    /// scores for both.
    pub fn score(&self, role: &str, lowered: &str) -> usize {
        self.triggers(role)
            .unwrap_or_default()
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| lowered.matches(t.as_str()).count())
            .sum()
    }

    /// Non-zero scores for the roles in both the profile and `universe`.
    pub fn scores(&self, text: &str, universe: &BTreeSet<String>) -> BTreeMap<String, usize> {
        let lowered = text.to_lowercase();
        self.roles()
            .filter(|role| universe.contains(*role))
            .filter_map(|role| {
                let score = self.score(role, &lowered);
                (score > 0).then(|| (role.to_string(), score))
            })
            .collect()
    }
}
