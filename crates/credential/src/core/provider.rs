//! Provider address parsing
//!
//! The `ProviderAddress` tag holds a resource path such as
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Sql/servers/{server}/databases/{db}`.
//! [`ProviderAddress`] parses it once into named parts instead of indexing
//! into the raw string wherever the server name is needed.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::MetadataError;

/// Zero-based `/`-delimited segment holding the server name
const SERVER_SEGMENT: usize = 8;

static HOST_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]*[A-Za-z0-9])?$").unwrap());

/// Parsed provider resource path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAddress {
    raw: String,
    subscription: String,
    resource_group: String,
    provider_namespace: String,
    resource_type: String,
    server_name: String,
    child: Option<(String, String)>,
}

impl ProviderAddress {
    /// Parse a provider resource path
    ///
    /// # Examples
    ///
    /// ```
    /// use keyturn_credential::ProviderAddress;
    ///
    /// let address = ProviderAddress::parse(
    ///     "/subscriptions/x/resourceGroups/y/providers/Microsoft.Sql/servers/mydb/databases/z",
    /// )?;
    /// assert_eq!(address.server_name(), "mydb");
    /// assert_eq!(address.host("database.windows.net"), "mydb.database.windows.net");
    /// assert_eq!(address.database_name(), Some("z"));
    /// # Ok::<(), keyturn_credential::MetadataError>(())
    /// ```
    pub fn parse(raw: &str) -> Result<Self, MetadataError> {
        let segments: Vec<&str> = raw.split('/').collect();

        if segments.len() <= SERVER_SEGMENT {
            return Err(MetadataError::MalformedProviderAddress {
                address: raw.to_string(),
                reason: format!(
                    "expected at least {} `/`-delimited segments, found {}",
                    SERVER_SEGMENT + 1,
                    segments.len()
                ),
            });
        }

        let server_name = segments[SERVER_SEGMENT];
        if !HOST_LABEL.is_match(server_name) {
            return Err(MetadataError::MalformedProviderAddress {
                address: raw.to_string(),
                reason: format!("server segment `{server_name}` is not a valid host label"),
            });
        }

        let segment = |index: usize| segments.get(index).copied().unwrap_or_default().to_string();
        let child = match (segments.get(9), segments.get(10)) {
            (Some(kind), Some(name)) if !kind.is_empty() && !name.is_empty() => {
                Some(((*kind).to_string(), (*name).to_string()))
            }
            _ => None,
        };

        Ok(Self {
            raw: raw.to_string(),
            subscription: segment(2),
            resource_group: segment(4),
            provider_namespace: segment(6),
            resource_type: segment(7),
            server_name: server_name.to_string(),
            child,
        })
    }

    /// Raw path as stored in the tag
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Subscription segment
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// Resource group segment
    pub fn resource_group(&self) -> &str {
        &self.resource_group
    }

    /// Provider namespace, e.g. `Microsoft.Sql`
    pub fn provider_namespace(&self) -> &str {
        &self.provider_namespace
    }

    /// Resource type, e.g. `servers`
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Server name used to derive the service host
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Database name when the path continues with `/databases/{name}`
    pub fn database_name(&self) -> Option<&str> {
        self.child
            .as_ref()
            .filter(|(kind, _)| kind.eq_ignore_ascii_case("databases"))
            .map(|(_, name)| name.as_str())
    }

    /// Service host: `{server_name}.{domain}`
    pub fn host(&self, domain: &str) -> String {
        format!("{}.{}", self.server_name, domain.trim_start_matches('.'))
    }
}

impl FromStr for ProviderAddress {
    type Err = MetadataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ProviderAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
