//! inventory assembly and serialization
//!
//! The resolver reports groups, hosts and variables through [InventorySink].
//! [Inventory] collects them and owns the final document layout:
//! `_meta.hostvars`, a synthesized `all` group spanning everything, then one
//! node per group with its `hosts`/`children`/`vars`.

use indexmap::{IndexMap, IndexSet};
use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;

/// Variable mapping of one host: namespace -> key -> value.
pub type HostVars = IndexMap<String, IndexMap<String, Value>>;

/// Receiver for everything the resolver produces.
pub trait InventorySink {
    fn add_group(&mut self, name: &str);
    fn add_child(&mut self, parent: &str, child: &str);
    fn set_group_var(&mut self, group: &str, key: &str, value: Value);
    fn add_host(&mut self, host: &str, group: &str);
    /// Later writes for the same key overwrite; variables accumulate across
    /// groups sharing a host.
    fn set_host_var(&mut self, host: &str, namespace: &str, key: &str, value: Value);
}

#[derive(Debug, Default)]
pub struct Inventory {
    groups: IndexMap<String, GroupNode>,
    hostvars: IndexMap<String, HostVars>,
}

#[derive(Debug, Default)]
struct GroupNode {
    hosts: IndexSet<String>,
    children: Vec<String>,
    vars: IndexMap<String, Value>,
}

impl Inventory {
    fn node(&mut self, name: &str) -> &mut GroupNode {
        if !self.groups.contains_key(name) {
            self.groups.insert(name.to_string(), GroupNode::default());
        }
        self.groups.get_mut(name).expect("group node was just inserted")
    }

    /// Variables of one host, as accumulated over all its groups.
    pub fn host_vars(&self, host: &str) -> Option<&HostVars> {
        self.hostvars.get(host)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

impl InventorySink for Inventory {
    fn add_group(&mut self, name: &str) {
        self.node(name);
    }

    fn add_child(&mut self, parent: &str, child: &str) {
        let node = self.node(parent);
        if !node.children.iter().any(|existing| existing == child) {
            node.children.push(child.to_string());
        }
    }

    fn set_group_var(&mut self, group: &str, key: &str, value: Value) {
        self.node(group).vars.insert(key.to_string(), value);
    }

    fn add_host(&mut self, host: &str, group: &str) {
        tracing::trace!(host, group, "adding host");
        self.node(group).hosts.insert(host.to_string());
        self.hostvars.entry(host.to_string()).or_default();
    }

    fn set_host_var(&mut self, host: &str, namespace: &str, key: &str, value: Value) {
        self.hostvars
            .entry(host.to_string())
            .or_default()
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}

#[derive(serde::Serialize)]
struct Meta<'a> {
    hostvars: &'a IndexMap<String, HostVars>,
}

#[derive(serde::Serialize)]
struct AllNode<'a> {
    children: Vec<&'a String>,
    hosts: Vec<&'a String>,
}

struct NodeSer<'a>(&'a GroupNode);

impl serde::Serialize for NodeSer<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.0.hosts.is_empty() {
            let mut hosts: Vec<&String> = self.0.hosts.iter().collect();
            hosts.sort();
            map.serialize_entry("hosts", &hosts)?;
        }
        if !self.0.children.is_empty() {
            map.serialize_entry("children", &self.0.children)?;
        }
        if !self.0.vars.is_empty() {
            map.serialize_entry("vars", &self.0.vars)?;
        }
        map.end()
    }
}

impl serde::Serialize for Inventory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        map.serialize_entry("_meta", &Meta { hostvars: &self.hostvars })?;

        let mut all_hosts: Vec<&String> = self.groups.values().flat_map(|node| &node.hosts).collect();
        all_hosts.sort();
        all_hosts.dedup();
        map.serialize_entry(
            "all",
            &AllNode {
                children: self.groups.keys().collect(),
                hosts: all_hosts,
            },
        )?;

        for (name, node) in &self.groups {
            map.serialize_entry(name, &NodeSer(node))?;
        }

        map.end()
    }
}
