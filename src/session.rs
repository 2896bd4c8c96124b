//! Session record and cookie shapes compatible with express-session
//!
//! Records are persisted exactly as connect-style middleware serializes them:
//! camelCase cookie keys, arbitrary session fields at the top level of the
//! document, and the storage-owned `id` and `ttl` members stamped on write.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cookie sub-object carried inside a session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    /// Max age in milliseconds as set when the session was created
    pub original_max_age: Option<i64>,

    /// Absolute expiration time; None means a browser-session cookie
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,

    /// Secure flag
    #[serde(default)]
    pub secure: bool,

    /// HttpOnly flag
    #[serde(default = "default_true")]
    pub http_only: bool,

    /// Cookie path
    #[serde(default = "default_root")]
    pub path: String,

    /// Cookie domain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// SameSite attribute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_root() -> String {
    "/".to_string()
}

impl Default for SessionCookie {
    fn default() -> Self {
        Self {
            original_max_age: None,
            expires: None,
            secure: false,
            http_only: true,
            path: "/".to_string(),
            domain: None,
            same_site: None,
        }
    }
}

impl SessionCookie {
    /// Create a cookie expiring `max_age_secs` from now
    pub fn new(max_age_secs: i64) -> Self {
        Self {
            original_max_age: Some(max_age_secs * 1000),
            expires: Some(Utc::now() + chrono::Duration::seconds(max_age_secs)),
            ..Default::default()
        }
    }

    /// Milliseconds until expiry, negative once past
    pub fn remaining_ms(&self) -> Option<i64> {
        self.expires.map(|exp| (exp - Utc::now()).num_milliseconds())
    }

    /// Re-derive `expires` from the original max age
    pub fn refresh(&mut self) {
        if let Some(ms) = self.original_max_age {
            self.expires = Some(Utc::now() + chrono::Duration::milliseconds(ms));
        }
    }

    /// Whether the expiration time is in the past
    pub fn is_expired(&self) -> bool {
        match self.expires {
            Some(exp) => exp <= Utc::now(),
            None => false,
        }
    }
}

/// A session record as persisted in the container
///
/// On the wire this is `{ id, cookie?, ...session fields, ttl? }`. The `id`
/// and `ttl` members belong to the store: `set` stamps both, `touch` patches
/// `ttl`, and records read back always carry them. Everything else round-trips
/// untouched through the flattened field map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Session identifier, which doubles as the partition key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Cookie state mirrored from the middleware
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie: Option<SessionCookie>,

    /// Remaining lifetime in seconds, resolved at the last write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,

    /// Arbitrary session fields, stored at the top level of the document
    #[serde(flatten)]
    pub data: HashMap<String, Value>,
}

impl SessionRecord {
    /// Create a record whose cookie expires `max_age_secs` from now
    pub fn new(max_age_secs: i64) -> Self {
        Self {
            cookie: Some(SessionCookie::new(max_age_secs)),
            ..Default::default()
        }
    }

    /// Get a session field, deserialized into `T`
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a session field
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) {
        if let Ok(v) = serde_json::to_value(value) {
            self.data.insert(key.to_string(), v);
        }
    }

    /// Remove a session field
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Whether a session field exists
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Whether the record carries no session fields
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The cookie's expiration time, if one is set
    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.cookie.as_ref().and_then(|c| c.expires)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cookie_serializes_camel_case() {
        let cookie = SessionCookie::new(60);
        let value = serde_json::to_value(&cookie).unwrap();
        let map = value.as_object().unwrap();
        assert!(map.contains_key("originalMaxAge"));
        assert!(map.contains_key("httpOnly"));
        assert!(map.contains_key("expires"));
        assert_eq!(map["path"], json!("/"));
        assert_eq!(map["originalMaxAge"], json!(60_000));
    }

    #[test]
    fn absent_cookie_members_stay_off_the_wire() {
        let cookie = SessionCookie::default();
        let value = serde_json::to_value(&cookie).unwrap();
        let map = value.as_object().unwrap();
        assert!(!map.contains_key("expires"));
        assert!(!map.contains_key("domain"));
        assert!(!map.contains_key("sameSite"));
    }

    #[test]
    fn record_flattens_session_fields() {
        let document = json!({
            "id": "abc",
            "cookie": { "originalMaxAge": 1000, "httpOnly": true, "path": "/" },
            "user": "alice",
            "views": 7,
            "ttl": 30
        });
        let record: SessionRecord = serde_json::from_value(document).unwrap();
        assert_eq!(record.id.as_deref(), Some("abc"));
        assert_eq!(record.ttl, Some(30));
        assert_eq!(record.get::<String>("user"), Some("alice".to_string()));
        assert_eq!(record.get::<i64>("views"), Some(7));
    }

    #[test]
    fn unset_storage_members_are_not_serialized() {
        let mut record = SessionRecord::default();
        record.set("user", "bob");
        let value = serde_json::to_value(&record).unwrap();
        let map = value.as_object().unwrap();
        assert!(!map.contains_key("id"));
        assert!(!map.contains_key("ttl"));
        assert!(!map.contains_key("cookie"));
        assert_eq!(map["user"], json!("bob"));
    }

    #[test]
    fn refresh_pushes_expiry_forward() {
        let mut cookie = SessionCookie::new(300);
        cookie.expires = Some(Utc::now() - chrono::Duration::seconds(10));
        assert!(cookie.is_expired());
        cookie.refresh();
        assert!(!cookie.is_expired());
        assert!(cookie.remaining_ms().unwrap() > 290_000);
    }
}
