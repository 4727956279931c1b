//! Secret metadata
//!
//! Typed view over the tags attached to a rotated secret. The tag bag is read
//! once per rotation, validated here, and written back (carried forward) onto
//! the new secret version.

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::core::{LoginName, MetadataError, ProviderAddress, ValidationError};

/// Ordered tag mapping; insertion order decides binding pairing
pub type Tags = IndexMap<String, String>;

/// Tag names understood by the rotation workflow
pub mod tags {
    /// Data-service login name
    pub const CREDENTIAL_ID: &str = "CredentialId";
    /// Provider resource path
    pub const PROVIDER_ADDRESS: &str = "ProviderAddress";
    /// Number of days the rotated secret stays valid
    pub const VALIDITY_PERIOD_DAYS: &str = "ValidityPeriodDays";
    /// Prefix of dependent-target tags
    pub const WEBAPP_PREFIX: &str = "webapp[";
    /// Prefix of configuration-entry tags
    pub const CONNSTRING_PREFIX: &str = "connstring[";
}

/// Validity period used when the tag is absent
pub const DEFAULT_VALIDITY_PERIOD_DAYS: &str = "60";

/// What to do when target and configuration-entry tag counts differ
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingPolicy {
    /// Pair the overlapping prefix, ignore the rest
    #[default]
    Truncate,
    /// Treat mismatched counts as invalid metadata
    Reject,
}

/// A dependent target and the configuration entry that embeds the credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerBinding {
    /// Target identifier, e.g. an application host name
    pub target: String,
    /// Configuration entry on the target holding the connection string
    pub config_entry: String,
}

impl ConsumerBinding {
    /// Create a binding
    pub fn new(target: impl Into<String>, config_entry: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            config_entry: config_entry.into(),
        }
    }
}

/// Tag-derived facts about a secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretMetadata {
    /// Data-service login name (unvalidated, see [`SecretMetadata::login`])
    pub credential_id: String,
    /// Provider resource path (unparsed, see [`SecretMetadata::provider`])
    pub provider_address: String,
    /// Validity period in days as stored (see [`SecretMetadata::validity_days`])
    pub validity_period_days: String,
    /// Dependent consumers, in tag insertion order
    pub bindings: Vec<ConsumerBinding>,
    binding_tags: Tags,
}

impl SecretMetadata {
    /// Extract metadata from a secret's tags
    ///
    /// Missing tags become empty strings (the validity period defaults to
    /// `"60"`); they are rejected later when the typed accessors are used.
    pub fn from_tags(source: &Tags, policy: BindingPolicy) -> Result<Self, MetadataError> {
        let lookup = |name: &str| source.get(name).cloned().unwrap_or_default();

        let mut targets = Vec::new();
        let mut entries = Vec::new();
        let mut binding_tags = Tags::new();

        for (key, value) in source {
            if key.starts_with(tags::WEBAPP_PREFIX) {
                targets.push(value.clone());
            } else if key.starts_with(tags::CONNSTRING_PREFIX) {
                entries.push(value.clone());
            } else {
                continue;
            }
            binding_tags.insert(key.clone(), value.clone());
        }

        if targets.len() != entries.len() {
            match policy {
                BindingPolicy::Reject => {
                    return Err(MetadataError::BindingCountMismatch {
                        targets: targets.len(),
                        entries: entries.len(),
                    });
                }
                BindingPolicy::Truncate => {
                    tracing::warn!(
                        targets = targets.len(),
                        entries = entries.len(),
                        "Binding tag counts differ; unpaired tags are ignored"
                    );
                }
            }
        }

        let bindings = targets
            .into_iter()
            .zip(entries)
            .map(|(target, entry)| ConsumerBinding::new(target, entry))
            .collect();

        Ok(Self {
            credential_id: lookup(tags::CREDENTIAL_ID),
            provider_address: lookup(tags::PROVIDER_ADDRESS),
            validity_period_days: source
                .get(tags::VALIDITY_PERIOD_DAYS)
                .cloned()
                .unwrap_or_else(|| DEFAULT_VALIDITY_PERIOD_DAYS.to_string()),
            bindings,
            binding_tags,
        })
    }

    /// Validated login name
    pub fn login(&self) -> Result<LoginName, ValidationError> {
        LoginName::new(self.credential_id.clone())
    }

    /// Parsed provider address
    pub fn provider(&self) -> Result<ProviderAddress, MetadataError> {
        ProviderAddress::parse(&self.provider_address)
    }

    /// Validity period as a positive number of days
    pub fn validity_days(&self) -> Result<u32, MetadataError> {
        match self.validity_period_days.trim().parse::<u32>() {
            Ok(days) if days > 0 => Ok(days),
            _ => Err(MetadataError::InvalidValidityPeriod {
                value: self.validity_period_days.clone(),
            }),
        }
    }

    /// Expiry of a version created at `now`
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, MetadataError> {
        let days = self.validity_days()?;
        TimeDelta::try_days(i64::from(days))
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or(MetadataError::ExpiryOverflow { days })
    }

    /// Tags to carry forward onto the next secret version
    ///
    /// The three core tags come first, followed by the binding tags in their
    /// original order.
    pub fn to_tags(&self) -> Tags {
        let mut out = Tags::with_capacity(3 + self.binding_tags.len());
        out.insert(tags::CREDENTIAL_ID.to_string(), self.credential_id.clone());
        out.insert(
            tags::PROVIDER_ADDRESS.to_string(),
            self.provider_address.clone(),
        );
        out.insert(
            tags::VALIDITY_PERIOD_DAYS.to_string(),
            self.validity_period_days.clone(),
        );
        out.extend(self.binding_tags.clone());
        out
    }
}
