//! recursive group resolution
//!
//! Groups are resolved depth first. The resolver owns the [GroupPool] and
//! removes each group exactly once as it is visited; a child referenced by
//! two parents, declared nowhere, or part of a cycle shows up as a missing
//! pool entry and aborts the run. Any error aborts the whole run: a partial
//! inventory is never valid output.
//!
//! Per group the steps are: reject unrecognized parameters, register the
//! group and its children in the sink, merge with the parent context
//! ([crate::merge]), emit static group variables, query the store when the
//! group is a leaf or sets `retrieve`, template hosts and host variables
//! from the returned records ([crate::template]), then recurse into the
//! children with the merged context as their parent.

use crate::config::{GroupPool, GroupSpec};
use crate::inventory::InventorySink;
use crate::merge::{merge, ResolvedGroupSpec};
use crate::store::{RecordSource, SearchQuery, StoreError};
use crate::template::{scalar_to_string, substitute, Rendered};

/// Namespace under which record-derived host variables are attached,
/// keeping them apart from variables of other origins.
pub const HOSTVARS_NAMESPACE: &str = "quarry";

/// Search window requested from the store.
const SEARCH_RANGE: &str = "0-9999";

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("group '{group}' has invalid parameters: '{params}'")]
    InvalidParameters { group: String, params: String },
    #[error("group '{group}' has no itemtype defined when calling the search API")]
    MissingItemtype { group: String },
    #[error("group '{group}' has no hostname defined when calling the search API")]
    MissingHostname { group: String },
    #[error("group '{child}' referenced from '{group}' is not defined or was already resolved")]
    DanglingChild { group: String, child: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives one full traversal of a [GroupPool].
pub struct Resolver<'a> {
    pool: GroupPool,
    source: &'a mut dyn RecordSource,
    sink: &'a mut dyn InventorySink,
}

impl<'a> Resolver<'a> {
    pub fn new(
        pool: GroupPool,
        source: &'a mut dyn RecordSource,
        sink: &'a mut dyn InventorySink,
    ) -> Self {
        Self { pool, source, sink }
    }

    /// Resolve every group in the pool.
    ///
    /// Only root groups are popped here; children are taken out of the pool
    /// by their parent during recursion.
    pub fn run(mut self) -> Result<(), ResolveError> {
        while let Some((name, spec)) = self.pool.pop_front() {
            self.resolve_group(&name, spec, &ResolvedGroupSpec::default())?;
        }
        Ok(())
    }

    fn resolve_group(
        &mut self,
        group: &str,
        spec: GroupSpec,
        parent: &ResolvedGroupSpec,
    ) -> Result<(), ResolveError> {
        tracing::debug!(group, "resolving group");

        if !spec.unknown.is_empty() {
            return Err(ResolveError::InvalidParameters {
                group: group.to_string(),
                params: spec.unknown.keys().cloned().collect::<Vec<_>>().join(", "),
            });
        }

        let children = spec.children.clone();
        if !children.is_empty() {
            self.sink.add_group(group);
            for child in &children {
                self.sink.add_group(child);
                self.sink.add_child(group, child);
            }
        }

        let resolved = merge(&spec, parent);

        for (key, value) in &resolved.vars {
            self.sink.set_group_var(group, key, value.clone());
        }

        // Leaves always query; intermediary groups only on request.
        if children.is_empty() || resolved.retrieve {
            self.query_group(group, &resolved)?;
        }

        for child in &children {
            let child_spec =
                self.pool
                    .take(child)
                    .ok_or_else(|| ResolveError::DanglingChild {
                        group: group.to_string(),
                        child: child.clone(),
                    })?;
            self.resolve_group(child, child_spec, &resolved)?;
        }

        Ok(())
    }

    /// Query the store with the merged parameters and turn each returned
    /// record into one or more hosts carrying templated variables.
    fn query_group(&mut self, group: &str, resolved: &ResolvedGroupSpec) -> Result<(), ResolveError> {
        let itemtype = resolved
            .itemtype
            .as_deref()
            .ok_or_else(|| ResolveError::MissingItemtype { group: group.to_string() })?;
        let hostname = resolved
            .hostname
            .as_deref()
            .ok_or_else(|| ResolveError::MissingHostname { group: group.to_string() })?;

        let records = self.source.search(&SearchQuery {
            itemtype,
            criteria: &resolved.criteria,
            metacriteria: &resolved.metacriteria,
            forcedisplay: &resolved.forcedisplay,
            range: SEARCH_RANGE,
        })?;
        tracing::debug!(group, records = records.len(), "search returned");

        // A queried group appears in the inventory even with no matches.
        self.sink.add_group(group);

        for record in &records {
            let record_vars: Vec<(&String, Rendered)> = resolved
                .hostvars
                .iter()
                .map(|(key, template)| (key, substitute(template, record, "")))
                .collect();

            // A list-valued hostname means the record stands for several
            // hosts (virtual machines on a hypervisor, for example); each
            // one gets the same variables.
            let hosts = match substitute(hostname, record, "") {
                Rendered::Many(items) => items.iter().map(scalar_to_string).collect(),
                Rendered::Text(host) => vec![host],
            };

            for host in &hosts {
                self.sink.add_host(host, group);
                for (key, value) in &record_vars {
                    self.sink
                        .set_host_var(host, HOSTVARS_NAMESPACE, key, value.clone().into_value());
                }
            }
        }

        Ok(())
    }
}
