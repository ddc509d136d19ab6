//! group configuration documents
//!
//! A configuration document is a YAML mapping from group name to group
//! parameters. [GroupPool] keeps the groups in author order and hands each
//! one out exactly once during resolution (see [crate::resolver]).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Parameters of one group, as authored.
///
/// All parsing is lenient: unrecognized keys land in `unknown` and are
/// rejected by the resolver with the group name attached, so a typo is
/// reported in terms of the offending group rather than a YAML position.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupSpec {
    /// Record-store collection to query; inherited from ancestors when unset.
    pub itemtype: Option<String>,
    #[serde(default)]
    pub criteria: Vec<Clause>,
    #[serde(default)]
    pub metacriteria: Vec<Clause>,
    /// Fields to request from the store (`forcedisplay` once merged).
    #[serde(default)]
    pub fields: Vec<FieldRef>,
    /// Template deriving host identifiers from a record.
    pub hostname: Option<String>,
    /// Static variables for the group node itself; never inherited.
    #[serde(default)]
    pub vars: IndexMap<String, Value>,
    /// Per-host variable templates, evaluated against each record.
    #[serde(default)]
    pub hostvars: IndexMap<String, String>,
    #[serde(default)]
    pub children: Vec<String>,
    /// Force a query for a group that also has children.
    #[serde(default)]
    pub retrieve: bool,
    /// Anything the author wrote that is not a recognized parameter.
    #[serde(flatten)]
    pub unknown: IndexMap<String, Value>,
}

/// One filter clause of a search, using the store's wire names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    /// `AND`/`OR`; the first clause of a search usually has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub field: FieldRef,
    pub searchtype: String,
    pub value: Value,
}

/// A field reference: a numeric index, or a symbolic name the store client
/// resolves to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldRef {
    Id(u64),
    Name(String),
}

impl std::fmt::Display for FieldRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRef::Id(id) => write!(f, "{id}"),
            FieldRef::Name(name) => f.write_str(name),
        }
    }
}

/// All groups of a configuration document, in author order.
///
/// The pool is consumed by removal only: the resolver pops root groups from
/// the front and takes children by name, so a group that is gone has been
/// resolved. Membership and traversal are the same bookkeeping.
#[derive(Debug, Default)]
pub struct GroupPool {
    groups: IndexMap<String, GroupSpec>,
}

impl GroupPool {
    pub fn load_file(path: &Path) -> Result<Self, LoadError> {
        tracing::info!(path=%path.display(), "loading configuration");
        let contents = std::fs::read_to_string(path)?;
        contents.parse()
    }

    /// Remove and return the first remaining group.
    pub fn pop_front(&mut self) -> Option<(String, GroupSpec)> {
        self.groups.shift_remove_index(0)
    }

    /// Remove and return the group named `name`.
    pub fn take(&mut self, name: &str) -> Option<GroupSpec> {
        self.groups.shift_remove(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: GroupSpec) {
        self.groups.insert(name.into(), spec);
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl std::str::FromStr for GroupPool {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let groups = serde_yaml::from_str(s)?;
        Ok(Self { groups })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("unable to parse configuration document")]
    YamlParseFailed(#[from] serde_yaml::Error),
}
