//! Scope resolution: which domain and volume names a run may touch.
//!
//! Two strategies exist. [`ScopeRule::GlobalExclusion`] matches everything
//! except protected volumes (base box images, ISOs). [`ScopeRule::PrefixMatch`]
//! matches only names that start with `<project>_`, the naming convention the
//! libvirt Vagrant provider uses for a project's domains and disks.

#![allow(missing_docs)]

use std::fmt;

use regex::Regex;

use crate::core::config::ScopeConfig;
use crate::core::errors::{Result, VrcError};

/// A single protection rule for volume names.
#[derive(Debug, Clone)]
pub enum ProtectRule {
    /// Whole-name glob (`*` and `?` wildcards), compiled once.
    Glob { pattern: String, regex: Regex },
    /// Case-insensitive suffix such as `.iso`.
    Suffix(String),
}

impl ProtectRule {
    /// Compile a glob into an anchored regex.
    pub fn glob(pattern: &str) -> Result<Self> {
        let mut source = String::with_capacity(pattern.len() + 8);
        source.push('^');
        for ch in pattern.chars() {
            match ch {
                '*' => source.push_str(".*"),
                '?' => source.push('.'),
                other => source.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        source.push('$');
        let regex = Regex::new(&source).map_err(|e| VrcError::InvalidConfig {
            details: format!("protect glob {pattern:?}: {e}"),
        })?;
        Ok(Self::Glob {
            pattern: pattern.to_string(),
            regex,
        })
    }

    #[must_use]
    pub fn suffix(suffix: &str) -> Self {
        Self::Suffix(suffix.to_ascii_lowercase())
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Glob { regex, .. } => regex.is_match(name),
            Self::Suffix(suffix) => name.to_ascii_lowercase().ends_with(suffix.as_str()),
        }
    }
}

impl fmt::Display for ProtectRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Glob { pattern, .. } => write!(f, "glob {pattern}"),
            Self::Suffix(suffix) => write!(f, "suffix {suffix}"),
        }
    }
}

/// The set of rules that keep volumes out of global-mode plans.
#[derive(Debug, Clone, Default)]
pub struct ProtectionRules {
    rules: Vec<ProtectRule>,
}

impl ProtectionRules {
    #[must_use]
    pub fn new(rules: Vec<ProtectRule>) -> Self {
        Self { rules }
    }

    pub fn from_config(config: &ScopeConfig) -> Result<Self> {
        let mut rules = Vec::with_capacity(config.protect_globs.len() + config.protect_suffixes.len());
        for glob in &config.protect_globs {
            rules.push(ProtectRule::glob(glob.trim())?);
        }
        rules.extend(
            config
                .protect_suffixes
                .iter()
                .map(|suffix| ProtectRule::suffix(suffix.trim())),
        );
        Ok(Self { rules })
    }

    /// First rule protecting `name`, if any.
    #[must_use]
    pub fn protecting_rule(&self, name: &str) -> Option<&ProtectRule> {
        self.rules.iter().find(|rule| rule.matches(name))
    }

    #[must_use]
    pub fn is_protected(&self, name: &str) -> bool {
        self.protecting_rule(name).is_some()
    }

    #[must_use]
    pub fn rules(&self) -> &[ProtectRule] {
        &self.rules
    }
}

/// Project prefix derived from the project directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPrefix {
    prefix: String,
    with_separator: String,
}

impl ProjectPrefix {
    /// Sanitize a directory name the way the libvirt provider does when it
    /// names domains: keep ASCII alphanumerics, `-`, `_` and `.`.
    /// Returns `None` when nothing survives.
    #[must_use]
    pub fn from_dir_name(dir_name: &str) -> Option<Self> {
        let prefix: String = dir_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            .collect();
        if prefix.is_empty() {
            return None;
        }
        let with_separator = format!("{prefix}_");
        Some(Self {
            prefix,
            with_separator,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// `prefix + "_"`, the string every in-scope name must start with.
    #[must_use]
    pub fn match_prefix(&self) -> &str {
        &self.with_separator
    }

    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.with_separator)
    }
}

/// Scope strategy for one run. Immutable once built.
#[derive(Debug, Clone)]
pub enum ScopeRule {
    /// Every domain; every volume not protected.
    GlobalExclusion { protect: ProtectionRules },
    /// Only names starting with `<prefix>_`.
    PrefixMatch { prefix: ProjectPrefix },
}

impl ScopeRule {
    pub fn global(config: &ScopeConfig) -> Result<Self> {
        Ok(Self::GlobalExclusion {
            protect: ProtectionRules::from_config(config)?,
        })
    }

    #[must_use]
    pub fn prefix(prefix: ProjectPrefix) -> Self {
        Self::PrefixMatch { prefix }
    }

    #[must_use]
    pub fn matches_domain(&self, name: &str) -> bool {
        match self {
            Self::GlobalExclusion { .. } => true,
            Self::PrefixMatch { prefix } => prefix.matches(name),
        }
    }

    #[must_use]
    pub fn matches_volume(&self, name: &str) -> bool {
        match self {
            Self::GlobalExclusion { protect } => !protect.is_protected(name),
            Self::PrefixMatch { prefix } => prefix.matches(name),
        }
    }

    /// Short description for the transcript.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::GlobalExclusion { protect } => {
                let rules: Vec<String> = protect.rules().iter().map(ToString::to_string).collect();
                format!("all resources except protected ({})", rules.join(", "))
            }
            Self::PrefixMatch { prefix } => {
                format!("resources prefixed '{}'", prefix.match_prefix())
            }
        }
    }
}
