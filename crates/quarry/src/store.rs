//! record store access
//!
//! [RecordSource] is the query seam the resolver depends on. [ApiSession]
//! is the REST implementation: it opens a session against a GLPI-style
//! search API, resolves symbolic field names to numeric ids (cached per
//! itemtype) and runs searches with the flattened
//! `criteria[i][...]`/`forcedisplay[i]` parameter encoding the API expects.

use crate::config::{Clause, FieldRef};
use crate::template::{scalar_to_string, Record};
use serde_json::Value;
use std::collections::HashMap;

/// Anything the resolver can query for records.
///
/// Takes `&mut self` because the REST implementation caches field maps
/// between calls.
pub trait RecordSource {
    fn search(&mut self, query: &SearchQuery<'_>) -> Result<Vec<Record>, StoreError>;
}

/// Parameters of one search call.
#[derive(Debug)]
pub struct SearchQuery<'a> {
    pub itemtype: &'a str,
    pub criteria: &'a [Clause],
    pub metacriteria: &'a [Clause],
    pub forcedisplay: &'a [FieldRef],
    pub range: &'a str,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("communication error: {0}")]
    Communication(#[from] reqwest::Error),
    /// The store rejected the request and reported its own key and message.
    #[error("({key}) {message}")]
    Domain { key: String, message: String },
    #[error("unknown error: {status}/{body}")]
    Unexpected { status: u16, body: String },
    #[error("unknown field '{field}' for itemtype '{itemtype}'")]
    UnknownField { itemtype: String, field: String },
}

/// Credentials for opening a session.
#[derive(Debug, Clone)]
pub enum Auth {
    UserToken(String),
    Basic { username: String, password: String },
}

/// An authenticated session against the store's REST API.
#[derive(Debug)]
pub struct ApiSession {
    client: reqwest::blocking::Client,
    url: String,
    app_token: String,
    session_token: String,
    /// Cached `uid -> id` maps, one per itemtype.
    fields: HashMap<String, HashMap<String, u64>>,
}

impl ApiSession {
    /// Open a session via `initSession` and keep the returned session token
    /// for all further calls.
    pub fn connect(url: &str, app_token: &str, auth: &Auth) -> Result<Self, StoreError> {
        tracing::debug!(url, "opening session");
        let client = reqwest::blocking::Client::new();

        let mut request = client
            .get(endpoint(url, &["initSession"]))
            .header("Content-Type", "application/json")
            .header("App-Token", app_token);
        request = match auth {
            Auth::UserToken(token) => {
                request.header("Authorization", format!("user_token {token}"))
            }
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        };

        let response = request.send()?;
        let session_token = match response.status().as_u16() {
            200 => {
                let body: Value = response.json()?;
                match body.get("session_token").and_then(Value::as_str) {
                    Some(token) => token.to_string(),
                    None => {
                        return Err(StoreError::Unexpected {
                            status: 200,
                            body: body.to_string(),
                        })
                    }
                }
            }
            400 | 401 => return Err(domain_error(response)),
            _ => return Err(unexpected_error(response)),
        };

        tracing::info!(url, "session opened");
        Ok(Self {
            client,
            url: url.to_string(),
            app_token: app_token.to_string(),
            session_token,
            fields: HashMap::new(),
        })
    }

    /// Close the session. A failed `killSession` only costs a stale token on
    /// the server, so it is logged and not propagated.
    pub fn close(self) {
        let result = self
            .client
            .get(endpoint(&self.url, &["killSession"]))
            .header("App-Token", &self.app_token)
            .header("Session-Token", &self.session_token)
            .send();

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("session closed");
            }
            Ok(response) => {
                tracing::warn!(status = response.status().as_u16(), "killSession rejected")
            }
            Err(err) => tracing::warn!(%err, "killSession failed"),
        }
    }

    /// Resolve a field reference to the numeric id the search API expects.
    fn field_id(&mut self, itemtype: &str, field: &FieldRef) -> Result<u64, StoreError> {
        let name = match field {
            FieldRef::Id(id) => return Ok(*id),
            FieldRef::Name(name) => name,
        };

        if !self.fields.contains_key(itemtype) {
            let options: Value = self.get(&["listSearchOptions", itemtype])?;
            let map = field_map_from_options(itemtype, &options);
            tracing::debug!(itemtype, fields = map.len(), "field map cached");
            self.fields.insert(itemtype.to_string(), map);
        }

        self.fields[itemtype]
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::UnknownField {
                itemtype: itemtype.to_string(),
                field: name.clone(),
            })
    }

    fn get(&self, parts: &[&str]) -> Result<Value, StoreError> {
        let response = self
            .client
            .get(endpoint(&self.url, parts))
            .header("App-Token", &self.app_token)
            .header("Session-Token", &self.session_token)
            .send()?;

        match response.status().as_u16() {
            200 | 206 => Ok(response.json()?),
            400 | 401 => Err(domain_error(response)),
            _ => Err(unexpected_error(response)),
        }
    }
}

impl RecordSource for ApiSession {
    fn search(&mut self, query: &SearchQuery<'_>) -> Result<Vec<Record>, StoreError> {
        tracing::debug!(itemtype = query.itemtype, "search");
        let params = flatten_search_params(query, |field| self.field_id(query.itemtype, field))?;

        let response = self
            .client
            .get(endpoint(&self.url, &["search", query.itemtype]))
            .header("App-Token", &self.app_token)
            .header("Session-Token", &self.session_token)
            .query(&params)
            .send()?;

        match response.status().as_u16() {
            // 206 is a partial range, which is how a full result within the
            // requested window comes back.
            200 | 206 => {
                let body: Value = response.json()?;
                let records = body
                    .get("data")
                    .and_then(Value::as_array)
                    .map(|rows| rows.iter().filter_map(Value::as_object).cloned().collect())
                    .unwrap_or_default();
                Ok(records)
            }
            400 | 401 => Err(domain_error(response)),
            _ => Err(unexpected_error(response)),
        }
    }
}

/// Encode a search as the flat query parameter list the API expects:
/// `criteria[0][link]=AND&criteria[0][field]=45&...&forcedisplay[0]=1`.
fn flatten_search_params(
    query: &SearchQuery<'_>,
    mut resolve: impl FnMut(&FieldRef) -> Result<u64, StoreError>,
) -> Result<Vec<(String, String)>, StoreError> {
    let mut params = Vec::new();

    for (name, clauses) in [("criteria", query.criteria), ("metacriteria", query.metacriteria)] {
        for (idx, clause) in clauses.iter().enumerate() {
            if let Some(link) = &clause.link {
                params.push((format!("{name}[{idx}][link]"), link.clone()));
            }
            let field = resolve(&clause.field)?;
            params.push((format!("{name}[{idx}][field]"), field.to_string()));
            params.push((format!("{name}[{idx}][searchtype]"), clause.searchtype.clone()));
            params.push((format!("{name}[{idx}][value]"), scalar_to_string(&clause.value)));
        }
    }

    for (idx, field) in query.forcedisplay.iter().enumerate() {
        let field = resolve(field)?;
        params.push((format!("forcedisplay[{idx}]"), field.to_string()));
    }

    params.push(("range".to_string(), query.range.to_string()));
    Ok(params)
}

/// Build the `uid -> id` map from a `listSearchOptions` response. Entries
/// without a `uid` (such as option group headers) are skipped; uids are
/// stripped of their `<Itemtype>.` prefix.
fn field_map_from_options(itemtype: &str, options: &Value) -> HashMap<String, u64> {
    let Some(entries) = options.as_object() else {
        return HashMap::new();
    };

    let prefix = format!("{itemtype}.");
    entries
        .iter()
        .filter_map(|(id, option)| {
            let id = id.parse().ok()?;
            let uid = option.get("uid")?.as_str()?;
            let uid = uid.strip_prefix(&prefix).unwrap_or(uid);
            Some((uid.to_string(), id))
        })
        .collect()
}

/// Store errors arrive as a two element body: the error key, then the
/// human-readable message.
fn decode_error_body(status: u16, body: String) -> StoreError {
    match serde_json::from_str::<(String, String)>(&body) {
        Ok((key, message)) => StoreError::Domain { key, message },
        Err(_) => StoreError::Unexpected { status, body },
    }
}

fn domain_error(response: reqwest::blocking::Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    decode_error_body(status, body)
}

fn unexpected_error(response: reqwest::blocking::Response) -> StoreError {
    StoreError::Unexpected {
        status: response.status().as_u16(),
        body: response.text().unwrap_or_default(),
    }
}

fn endpoint(url: &str, parts: &[&str]) -> String {
    let mut endpoint = url.trim_end_matches('/').to_string();
    for part in parts {
        endpoint.push('/');
        endpoint.push_str(part);
    }
    endpoint
}
