//! configuration inheritance
//!
//! A group inherits query parameters from its ancestors. [merge] combines a
//! group's own parameters with the already-resolved parameters of its parent
//! into a [ResolvedGroupSpec], which in turn becomes the parent context for
//! the group's own children. Merging never fails; absent parameters stay
//! `None` or empty.

use crate::config::{Clause, FieldRef, GroupSpec};
use indexmap::IndexMap;
use serde_json::Value;

/// A group's parameters after inheritance has been applied.
///
/// The root context is [ResolvedGroupSpec::default].
#[derive(Debug, Clone, Default)]
pub struct ResolvedGroupSpec {
    pub itemtype: Option<String>,
    pub hostname: Option<String>,
    pub criteria: Vec<Clause>,
    pub metacriteria: Vec<Clause>,
    /// Accumulated from the `fields` parameter; named after the search API
    /// parameter it feeds.
    pub forcedisplay: Vec<FieldRef>,
    pub vars: IndexMap<String, Value>,
    pub hostvars: IndexMap<String, String>,
    pub retrieve: bool,
}

/// Merge a group's own parameters with its parent's resolved parameters.
///
/// - `itemtype` and `hostname`: the group's own value, falling back to the
///   parent's.
/// - `criteria`, `metacriteria` and `fields`/`forcedisplay` accumulate: own
///   entries first, ancestor entries appended after. The parent already
///   carries the whole ancestor chain, so root-most entries end up last.
/// - `hostvars` merge by key; on collision the ancestor value wins.
/// - `vars` and `retrieve` are the group's own, never inherited.
pub fn merge(group: &GroupSpec, parent: &ResolvedGroupSpec) -> ResolvedGroupSpec {
    let mut criteria = group.criteria.clone();
    criteria.extend(parent.criteria.iter().cloned());

    let mut metacriteria = group.metacriteria.clone();
    metacriteria.extend(parent.metacriteria.iter().cloned());

    let mut forcedisplay = group.fields.clone();
    forcedisplay.extend(parent.forcedisplay.iter().cloned());

    let mut hostvars = group.hostvars.clone();
    for (key, value) in &parent.hostvars {
        hostvars.insert(key.clone(), value.clone());
    }

    ResolvedGroupSpec {
        itemtype: group.itemtype.clone().or_else(|| parent.itemtype.clone()),
        hostname: group.hostname.clone().or_else(|| parent.hostname.clone()),
        criteria,
        metacriteria,
        forcedisplay,
        vars: group.vars.clone(),
        hostvars,
        retrieve: group.retrieve,
    }
}
