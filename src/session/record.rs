use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A session record as handed over by the session framework.
///
/// Kept as the raw JSON object the framework produced. The store only reads
/// `cookie.maxAge`; every other field, including nulls and the exact number
/// representation, reaches the map unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionRecord(Map<String, Value>);

impl SessionRecord {
    /// A record holding only the given cookie
    pub fn new(cookie: Cookie) -> Self {
        let mut fields = Map::new();
        fields.insert("cookie".to_string(), Value::Object(cookie.0));
        Self(fields)
    }

    /// Set a top-level field
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The cookie object, if the record carries one
    pub fn cookie(&self) -> Option<&Map<String, Value>> {
        self.0.get("cookie").and_then(Value::as_object)
    }

    /// The cookie's `maxAge` in milliseconds, if it is a finite number.
    pub fn max_age_hint(&self) -> Option<f64> {
        self.cookie()?
            .get("maxAge")?
            .as_f64()
            .filter(|m| m.is_finite())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into the JSON value handed to the map.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        Ok(Value::Object(self.0.clone()))
    }

    /// Read a record back from a value returned by the map.
    ///
    /// Any JSON object is accepted; other values are not session records.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

impl From<Map<String, Value>> for SessionRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// Builder for the cookie object of a new record, in the framework's
/// camelCase layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cookie(Map<String, Value>);

impl Cookie {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cookie that expires `max_age` from now.
    pub fn with_max_age(max_age: Duration) -> Self {
        let millis = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        let mut cookie = Self::new()
            .set("originalMaxAge", millis)
            .set("maxAge", millis);
        if let Some(expires) = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
        {
            cookie = cookie.set(
                "expires",
                expires.to_rfc3339_opts(SecondsFormat::Millis, true),
            );
        }
        cookie
    }

    /// Set `maxAge` in milliseconds
    pub fn max_age(self, millis: f64) -> Self {
        self.set("maxAge", millis)
    }

    pub fn path(self, path: impl Into<String>) -> Self {
        self.set("path", path.into())
    }

    pub fn http_only(self, http_only: bool) -> Self {
        self.set("httpOnly", http_only)
    }

    pub fn secure(self, secure: bool) -> Self {
        self.set("secure", secure)
    }

    /// Set any other cookie attribute
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_max_age_from_framework_layout() {
        let record = SessionRecord::from_value(json!({
            "cookie": {
                "path": "/",
                "httpOnly": true,
                "secure": true,
                "maxAge": 1000
            },
            "name": "sid"
        }))
        .unwrap();

        assert_eq!(record.max_age_hint(), Some(1000.0));
        assert_eq!(record.get("name"), Some(&json!("sid")));
    }

    #[test]
    fn fields_survive_unchanged() {
        let value = json!({
            "cookie": {
                "originalMaxAge": 60000,
                "expires": "2030-01-01T00:00:00.000Z",
                "secure": false,
                "httpOnly": true,
                "domain": null,
                "path": "/",
                "sameSite": true,
                "maxAge": 60000
            },
            "user": { "id": 7, "roles": ["admin"] }
        });

        let record = SessionRecord::from_value(value.clone()).unwrap();
        let back = record.to_value().unwrap();

        assert_eq!(back, value);
        assert_eq!(
            serde_json::to_string(&back).unwrap(),
            serde_json::to_string(&value).unwrap()
        );
        assert!(back["cookie"]["maxAge"].is_u64());
    }

    #[test]
    fn non_object_is_rejected() {
        assert!(SessionRecord::from_value(json!("not a record")).is_err());
        assert!(SessionRecord::from_value(json!([1, 2])).is_err());
    }

    #[test]
    fn missing_cookie_means_no_hint() {
        let record = SessionRecord::from_value(json!({ "name": "sid" })).unwrap();
        assert_eq!(record.max_age_hint(), None);
    }

    #[test]
    fn null_or_non_numeric_max_age_means_no_hint() {
        let record = SessionRecord::from_value(json!({ "cookie": { "maxAge": null } })).unwrap();
        assert_eq!(record.max_age_hint(), None);

        let record = SessionRecord::from_value(json!({ "cookie": { "maxAge": "1000" } })).unwrap();
        assert_eq!(record.max_age_hint(), None);
    }

    #[test]
    fn non_finite_max_age_is_ignored() {
        // serde_json stores non-finite floats as null
        let record = SessionRecord::new(Cookie::new().max_age(f64::NAN));
        assert_eq!(record.max_age_hint(), None);
    }

    #[test]
    fn cookie_with_max_age_sets_expiry() {
        let record = SessionRecord::new(Cookie::with_max_age(Duration::from_secs(60)));
        assert_eq!(record.max_age_hint(), Some(60_000.0));

        let cookie = record.cookie().expect("cookie should be set");
        assert_eq!(cookie.get("maxAge"), Some(&json!(60000)));
        let expires = cookie["expires"].as_str().expect("expires should be set");
        assert!(expires.ends_with('Z'));
    }
}
