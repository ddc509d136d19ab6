//! # quarry - record-store-backed dynamic inventory
//!
//! For CLI usage see the `quarry` binary (`quarry list` / `quarry host`).
//!
//! ## Introduction for developers
//!
//! Read this to understand how `quarry` works internally.
//!
//! ### Terms
//!
//! - a `group` is a named node of the inventory tree, configured with query
//!   parameters and optionally a list of `children`
//! - a `record` is one entity returned by the record store for a search,
//!   keyed by `field reference` (a numeric index, or a symbolic name the
//!   store can resolve to one)
//! - a `template` is a string with `$<fieldref>` placeholders, resolved
//!   against a single record
//! - a `leaf group` has no children and is always queried; an intermediary
//!   group only queries when it sets `retrieve`
//!
//! This is a valid configuration document:
//! ```yaml
//! servers:
//!   itemtype: Computer
//!   criteria:
//!     - { field: 45, searchtype: contains, value: "^CentOS$" }
//!   hostname: "$1"
//!   hostvars:
//!     os: "$2"
//!   children: [web, db]
//! web:
//!   criteria:
//!     - { link: AND, field: name, searchtype: contains, value: web }
//! db:
//!   criteria:
//!     - { link: AND, field: name, searchtype: contains, value: db }
//! ```
//!
//! ### Loading
//!
//! A document is a YAML mapping from group name to parameters, parsed into a
//! [config::GroupPool] that preserves author order. Unrecognized parameters
//! are kept aside at this point and only rejected during resolution, so the
//! error can name the offending group.
//!
//! ### Resolution
//!
//! see [resolver::Resolver::run]
//!
//! The pool is consumed front to back; each group taken out is resolved
//! depth first, and children are taken out of the pool by their parent. A
//! group that cannot be taken (referenced twice, never declared, or part of
//! a cycle) aborts the run. Removal doubles as the visited-set: every group
//! is resolved exactly once.
//!
//! ### Inheritance
//!
//! see [merge::merge]
//!
//! Each group's parameters are merged with the resolved parameters of its
//! parent before querying, and the merged result is what the children
//! inherit. Criteria and field lists accumulate (own entries first),
//! `itemtype`/`hostname` fall back to the nearest ancestor, `hostvars` merge
//! by key with the ancestor winning a collision.
//!
//! ### Querying and templating
//!
//! Leaf groups (and `retrieve: true` groups) run a search through
//! [store::RecordSource]. Every returned record is templated
//! ([template::substitute]) into one host identifier - or several, when the
//! `hostname` field holds a list - plus a set of per-host variables.
//!
//! ### Output
//!
//! Hosts, groups and variables are pushed into an [inventory::InventorySink].
//! The concrete [inventory::Inventory] assembles the final document:
//! `_meta.hostvars`, a synthesized `all` group, and one node per group,
//! serialized via [serde] as JSON or YAML.
//!
pub mod config;
pub mod inventory;
pub mod merge;
pub mod resolver;
pub mod store;
pub mod template;
