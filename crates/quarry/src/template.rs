//! field substitution templating
//!
//! `hostname` and `hostvars` values are templates: strings in which a dollar
//! sign followed by digits refers to a field of a record returned by the
//! store, for example `"$1.example.org"`. [substitute] resolves one template
//! against one record.

use serde_json::Value;
use std::sync::LazyLock;

/// One entity returned by the record store, keyed by field reference.
pub type Record = serde_json::Map<String, Value>;

/// A dollar sign followed by zero or more digits. The zero-digit case (a
/// lone `$`) is a valid reference to the empty-string field key.
static FIELD_REF: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\$(\d*)").expect("field reference pattern must compile"));

/// Result of a substitution
///
/// A referenced field usually holds a scalar and the template renders to a
/// single string. When it holds a list, the record stands for several hosts
/// at once and the list is returned as-is instead (see [substitute]).
#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Text(String),
    Many(Vec<Value>),
}

impl Rendered {
    pub fn into_value(self) -> Value {
        match self {
            Rendered::Text(text) => Value::String(text),
            Rendered::Many(items) => Value::Array(items),
        }
    }
}

/// Replace every field reference in `template` with the matching record
/// value.
///
/// References are resolved one occurrence at a time, left to right. An
/// absent or falsy field value (null, `false`, `0`, empty string, empty
/// collection) substitutes `default`. A non-empty list value short-circuits:
/// the list is returned verbatim and remaining references, as well as
/// substitutions already made, are discarded.
pub fn substitute(template: &str, record: &Record, default: &str) -> Rendered {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for captures in FIELD_REF.captures_iter(template) {
        let occurrence = captures.get(0).expect("capture 0 is the whole match");
        let key = &captures[1];

        out.push_str(&template[last..occurrence.start()]);
        last = occurrence.end();

        match record.get(key) {
            Some(Value::Array(items)) if !items.is_empty() => {
                tracing::trace!(key, "list value short-circuits substitution");
                return Rendered::Many(items.clone());
            }
            Some(value) if !is_falsy(value) => out.push_str(&scalar_to_string(value)),
            _ => out.push_str(default),
        }
    }

    out.push_str(&template[last..]);
    Rendered::Text(out)
}

/// Render a scalar the way it should appear inside a substituted string:
/// strings verbatim, everything else in its JSON form.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(bool) => !bool,
        Value::Number(number) => number.as_f64() == Some(0.0),
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().expect("record fixture must be an object").clone()
    }

    #[test]
    fn literal_passthrough() {
        let result = substitute("static", &Record::new(), "");
        assert_eq!(result, Rendered::Text("static".into()));
    }

    #[test]
    fn scalar_substitution() {
        let data = record(json!({"1": "web01", "2": 42, "3": true}));
        let result = substitute("$1-$2-$3", &data, "");
        assert_eq!(result, Rendered::Text("web01-42-true".into()));
    }

    #[test]
    fn absent_field_substitutes_default() {
        let data = record(json!({"1": null}));
        assert_eq!(substitute("host-$1", &data, ""), Rendered::Text("host-".into()));
        assert_eq!(substitute("host-$2", &data, ""), Rendered::Text("host-".into()));
        assert_eq!(substitute("host-$1", &data, "x"), Rendered::Text("host-x".into()));
    }

    #[test]
    fn falsy_values_substitute_default() {
        let data = record(json!({"1": "", "2": 0, "3": false, "4": [], "5": {}}));
        let result = substitute("$1$2$3$4$5", &data, "-");
        assert_eq!(result, Rendered::Text("-----".into()));
    }

    #[test]
    fn list_value_short_circuits() {
        let data = record(json!({"1": ["a", "b"]}));
        let result = substitute("$1", &data, "");
        assert_eq!(result, Rendered::Many(vec![json!("a"), json!("b")]));
    }

    #[test]
    fn short_circuit_discards_partial_substitution() {
        let data = record(json!({"1": ["a", "b"], "2": "x"}));
        let result = substitute("pre-$1-$2", &data, "");
        assert_eq!(result, Rendered::Many(vec![json!("a"), json!("b")]));
    }

    #[test]
    fn lone_dollar_references_the_empty_key() {
        // No field is named "", so the occurrence resolves to the default.
        let result = substitute("a$b", &Record::new(), "");
        assert_eq!(result, Rendered::Text("ab".into()));

        let data = record(json!({"": "odd"}));
        assert_eq!(substitute("a$b", &data, ""), Rendered::Text("aoddb".into()));
    }

    #[test]
    fn occurrences_are_replaced_independently() {
        // "$1" must not eat into a later "$12".
        let data = record(json!({"1": "a", "12": "b"}));
        let result = substitute("$1 $12", &data, "");
        assert_eq!(result, Rendered::Text("a b".into()));
    }

    #[test]
    fn repeated_reference() {
        let data = record(json!({"1": "x"}));
        let result = substitute("$1$1", &data, "");
        assert_eq!(result, Rendered::Text("xx".into()));
    }
}
