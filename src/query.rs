//! Query filters and the request parameters built from them.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// The record category being queried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Organization,
    Person,
}

impl EntityKind {
    /// Path suffix of the endpoint, as in `/odm-organizations`
    pub fn endpoint(&self) -> &'static str {
        match self {
            EntityKind::Organization => "organizations",
            EntityKind::Person => "people",
        }
    }

    /// Fields that make up the row label, in concatenation order
    pub fn identity_fields(&self) -> &'static [&'static str] {
        match self {
            EntityKind::Organization => &["name"],
            EntityKind::Person => &["first_name", "last_name"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "organization" | "organizations" | "org" | "orgs" => Ok(EntityKind::Organization),
            "person" | "people" | "ppl" => Ok(EntityKind::Person),
            other => Err(format!("Unknown entity kind: {}", other)),
        }
    }
}

/// Filter set for one search. Immutable once built; [`Query::at_page`]
/// derives the per-page variants used by the fetch workers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub query: Option<String>,
    pub name: Option<String>,
    /// Organizations only
    pub domain_name: Option<String>,
    /// People only
    pub socials: Option<String>,
    pub locations: Vec<String>,
    /// `organization_types` for organizations, `type` for people
    pub types: Vec<String>,
    /// Unix timestamp; `None` means [`default_timestamp`] at request time
    pub updated_since: Option<i64>,
    pub page: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_domain_name(mut self, domain: impl Into<String>) -> Self {
        self.domain_name = Some(domain.into());
        self
    }

    pub fn with_socials(mut self, socials: impl Into<String>) -> Self {
        self.socials = Some(socials.into());
        self
    }

    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn updated_since(mut self, timestamp: i64) -> Self {
        self.updated_since = Some(timestamp);
        self
    }

    pub fn starting_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Same filters, different page
    pub fn at_page(&self, page: u32) -> Self {
        Self {
            page: Some(page),
            ..self.clone()
        }
    }

    /// Pin an unset `updated_since` to [`default_timestamp`] so every page of
    /// one fetch sends the same cutoff, even across a UTC midnight.
    pub fn with_resolved_since(&self) -> Self {
        Self {
            updated_since: Some(self.updated_since.unwrap_or_else(default_timestamp)),
            ..self.clone()
        }
    }

    /// Page requested by this query (1-based, defaults to 1)
    pub fn page_number(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Build the URL query parameters for `kind`.
    ///
    /// Unset filters are omitted. Filters that don't apply to `kind`
    /// (domain for people, socials for organizations) are dropped.
    pub fn to_params(&self, kind: EntityKind) -> Vec<(&'static str, String)> {
        let since = self.updated_since.unwrap_or_else(default_timestamp);
        let mut params = vec![("updated_since", since.to_string())];

        if let Some(q) = &self.query {
            params.push(("query", q.clone()));
        }
        if let Some(name) = &self.name {
            params.push(("name", name.clone()));
        }

        match kind {
            EntityKind::Organization => {
                if let Some(domain) = &self.domain_name {
                    params.push(("domain_name", domain.clone()));
                }
                if self.socials.is_some() {
                    debug!("Ignoring socials filter for organization query");
                }
            }
            EntityKind::Person => {
                if let Some(socials) = &self.socials {
                    params.push(("socials", socials.clone()));
                }
                if self.domain_name.is_some() {
                    debug!("Ignoring domain_name filter for people query");
                }
            }
        }

        if !self.locations.is_empty() {
            params.push(("locations", self.locations.join(",")));
        }
        if !self.types.is_empty() {
            let key = match kind {
                EntityKind::Organization => "organization_types",
                EntityKind::Person => "type",
            };
            params.push((key, self.types.join(",")));
        }

        params.push(("page", self.page_number().to_string()));
        params
    }
}

/// Unix timestamp of the most recent UTC midnight minus one day
pub fn default_timestamp() -> i64 {
    default_timestamp_at(Utc::now())
}

pub fn default_timestamp_at(now: DateTime<Utc>) -> i64 {
    let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    (midnight - Duration::days(1)).timestamp()
}
