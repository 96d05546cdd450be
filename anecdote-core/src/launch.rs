//! Launch parameters and share links.
//!
//! A shared link carries a topic in its query string. The controller reads
//! it once at startup and clears it so a reload does not submit it again.

/// Query parameter carrying a shared topic.
pub const SHARED_TOPIC: &str = "shared_topic";

/// Parameters supplied when the app was launched.
pub trait LaunchParams: Send {
    fn get(&self, key: &str) -> Option<String>;

    /// Remove `key` from the visible launch state.
    fn clear(&mut self, key: &str);
}

/// Launch parameters held as decoded query pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string such as `?shared_topic=Pythagoras&x=1`.
    ///
    /// `+` decodes to a space; pairs that fail to decode are skipped.
    pub fn parse(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                Some((decode(key)?, decode(value)?))
            })
            .collect();
        Self { pairs }
    }

    /// Add or replace `key`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.pairs.retain(|(k, _)| *k != key);
        self.pairs.push((key, value.into()));
    }

    /// Encode back into a query string without the leading `?`.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

fn decode(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|s| s.into_owned())
}

impl LaunchParams for QueryParams {
    fn get(&self, key: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn clear(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }
}

/// A link that opens the app on `topic`.
///
/// An existing `shared_topic` in `base_url` is replaced; other query
/// parameters are kept.
pub fn share_link(base_url: &str, topic: &str) -> String {
    let (path, query) = base_url.split_once('?').unwrap_or((base_url, ""));
    let params = QueryParams::parse(query).with(SHARED_TOPIC, topic);
    format!("{path}?{}", params.to_query_string())
}
