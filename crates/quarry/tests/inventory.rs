//! End-to-end resolution tests
//!
//! Runs full configuration documents against a canned record source and
//! compares the serialized inventory document.

use pretty_assertions::assert_eq;
use quarry::config::{Clause, GroupPool};
use quarry::inventory::Inventory;
use quarry::resolver::Resolver;
use quarry::store::{RecordSource, SearchQuery, StoreError};
use quarry::template::Record;
use serde_json::json;

/// Serves canned records per itemtype and captures every search it sees.
#[derive(Default)]
struct CannedStore {
    data: Vec<(String, Vec<Record>)>,
    seen: Vec<(String, Vec<Clause>)>,
}

impl CannedStore {
    fn insert(&mut self, itemtype: &str, records: serde_json::Value) {
        let records = records
            .as_array()
            .expect("fixture must be an array")
            .iter()
            .map(|record| record.as_object().expect("fixture records must be objects").clone())
            .collect();
        self.data.push((itemtype.to_string(), records));
    }
}

impl RecordSource for CannedStore {
    fn search(&mut self, query: &SearchQuery<'_>) -> Result<Vec<Record>, StoreError> {
        self.seen
            .push((query.itemtype.to_string(), query.criteria.to_vec()));

        Ok(self
            .data
            .iter()
            .find(|(itemtype, _)| itemtype == query.itemtype)
            .map(|(_, records)| records.clone())
            .unwrap_or_default())
    }
}

fn resolve(yaml: &str, store: &mut CannedStore) -> Inventory {
    let pool: GroupPool = yaml.parse().expect("configuration must parse");
    let mut inventory = Inventory::default();
    Resolver::new(pool, store, &mut inventory)
        .run()
        .expect("resolution must succeed");
    inventory
}

#[test]
fn flat_group_full_document() {
    let mut store = CannedStore::default();
    store.insert(
        "Computer",
        json!([
            { "1": "web01", "2": "Linux" },
            { "1": "web02", "2": "Linux" },
        ]),
    );

    let inventory = resolve(
        r#"
servers:
  itemtype: Computer
  hostname: "$1"
  hostvars:
    os: "$2"
  criteria: []
"#,
        &mut store,
    );

    assert_eq!(
        serde_json::to_value(&inventory).unwrap(),
        json!({
            "_meta": {
                "hostvars": {
                    "web01": { "quarry": { "os": "Linux" } },
                    "web02": { "quarry": { "os": "Linux" } },
                }
            },
            "all": {
                "children": ["servers"],
                "hosts": ["web01", "web02"],
            },
            "servers": {
                "hosts": ["web01", "web02"],
            },
        })
    );
}

#[test]
fn tree_inherits_parameters_and_accumulates_criteria() {
    let mut store = CannedStore::default();
    store.insert("Computer", json!([{ "1": "web01", "2": "Linux" }]));

    let inventory = resolve(
        r#"
datacenter:
  itemtype: Computer
  hostname: "$1"
  criteria:
    - { field: 3, searchtype: contains, value: dc1 }
  hostvars:
    os: "$2"
  vars:
    tier: prod
  children: [web]
web:
  criteria:
    - { link: AND, field: 1, searchtype: contains, value: web }
"#,
        &mut store,
    );

    // Only the leaf queried, with its own clause first and the inherited
    // clause appended after.
    assert_eq!(store.seen.len(), 1);
    let (itemtype, criteria) = &store.seen[0];
    assert_eq!(itemtype, "Computer");
    let values: Vec<&serde_json::Value> = criteria.iter().map(|clause| &clause.value).collect();
    assert_eq!(values, vec![&json!("web"), &json!("dc1")]);

    assert_eq!(
        serde_json::to_value(&inventory).unwrap(),
        json!({
            "_meta": {
                "hostvars": {
                    "web01": { "quarry": { "os": "Linux" } },
                }
            },
            "all": {
                "children": ["datacenter", "web"],
                "hosts": ["web01"],
            },
            "datacenter": {
                "children": ["web"],
                "vars": { "tier": "prod" },
            },
            "web": {
                "hosts": ["web01"],
            },
        })
    );
}

#[test]
fn sibling_branches_share_hosts_and_accumulate_variables() {
    let mut store = CannedStore::default();
    store.insert("Computer", json!([{ "1": "db01", "2": "Linux" }]));
    store.insert("Appliance", json!([{ "1": "db01", "3": "rack-7" }]));

    let inventory = resolve(
        r#"
computers:
  itemtype: Computer
  hostname: "$1"
  hostvars:
    os: "$2"
appliances:
  itemtype: Appliance
  hostname: "$1"
  hostvars:
    location: "$3"
"#,
        &mut store,
    );

    // db01 belongs to both groups; its variables accumulate.
    let doc = serde_json::to_value(&inventory).unwrap();
    assert_eq!(doc["computers"]["hosts"], json!(["db01"]));
    assert_eq!(doc["appliances"]["hosts"], json!(["db01"]));
    assert_eq!(doc["all"]["hosts"], json!(["db01"]));
    assert_eq!(
        doc["_meta"]["hostvars"]["db01"]["quarry"],
        json!({ "os": "Linux", "location": "rack-7" })
    );
}

#[test]
fn multiple_roots_resolve_in_author_order() {
    let mut store = CannedStore::default();
    store.insert("Computer", json!([{ "1": "a" }]));
    store.insert("Phone", json!([{ "1": "b" }]));

    let inventory = resolve(
        r#"
phones: { itemtype: Phone, hostname: "$1" }
computers: { itemtype: Computer, hostname: "$1" }
"#,
        &mut store,
    );

    let itemtypes: Vec<&str> = store.seen.iter().map(|(itemtype, _)| itemtype.as_str()).collect();
    assert_eq!(itemtypes, vec!["Phone", "Computer"]);
    assert_eq!(
        inventory.group_names().collect::<Vec<_>>(),
        vec!["phones", "computers"]
    );
}
