// Legacy response decoding
//
// The panel answers in one of three shapes: URL-encoded key/value pairs
// (the default), JSON (when `json=yes` was sent), or an HTML page (login
// redirects and fatal errors). URL-encoded bodies use `name[]` keys for
// lists and embed nested per-item configs as URL-encoded blobs inside
// values, so decoding has to stay available for re-parsing values too.

use std::collections::BTreeMap;

use url::form_urlencoded;

/// A single decoded value: either a scalar or a `name[]` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseValue {
    One(String),
    Many(Vec<String>),
}

impl ResponseValue {
    /// The scalar value, or the first list element.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::One(s) => Some(s),
            Self::Many(v) => v.first().map(String::as_str),
        }
    }

    /// The list form; a scalar is a one-element list.
    pub fn as_list(&self) -> Vec<&str> {
        match self {
            Self::One(s) => vec![s.as_str()],
            Self::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// A decoded URL-encoded panel response.
///
/// Keys are sorted; list order within a `name[]` key is preserved as
/// received. The `error` envelope key is kept so callers that need the
/// raw flag (e.g. `USER_EXISTS`) can still read it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMap {
    entries: BTreeMap<String, ResponseValue>,
}

impl ResponseMap {
    /// Decode a URL-encoded body.
    ///
    /// `name[]` keys accumulate into lists; plain duplicate keys keep the
    /// last value, matching PHP `parse_str` which the panel was designed
    /// against. Values have numeric HTML entities decoded, as the panel
    /// entity-encodes special characters inside values.
    pub fn parse(body: &str) -> Self {
        let mut entries: BTreeMap<String, ResponseValue> = BTreeMap::new();
        for (key, value) in form_urlencoded::parse(body.as_bytes()) {
            let value = decode_entities(&value);
            if let Some(name) = key.strip_suffix("[]") {
                match entries
                    .entry(name.to_owned())
                    .or_insert_with(|| ResponseValue::Many(Vec::new()))
                {
                    ResponseValue::Many(list) => list.push(value),
                    ResponseValue::One(prev) => {
                        let prev = std::mem::take(prev);
                        entries.insert(name.to_owned(), ResponseValue::Many(vec![prev, value]));
                    }
                }
            } else {
                entries.insert(key.into_owned(), ResponseValue::One(value));
            }
        }
        Self { entries }
    }

    /// Scalar lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(ResponseValue::as_str)
    }

    /// List lookup (`name[]` keys).
    pub fn get_list(&self, key: &str) -> Option<Vec<&str>> {
        self.entries.get(key).map(ResponseValue::as_list)
    }

    /// The conventional `list[]` payload used by bulk-listing commands.
    pub fn list(&self) -> Vec<String> {
        self.get_list("list")
            .map(|items| items.into_iter().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResponseValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten to scalar pairs, dropping list entries beyond their first
    /// element. Useful for name→blob responses where every value is scalar.
    pub fn to_pairs(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_owned())))
            .collect()
    }
}

impl IntoIterator for ResponseMap {
    type Item = (String, ResponseValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ResponseValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Decode a URL-encoded per-item config blob (the values of commands like
/// `ADDITIONAL_DOMAINS` and `IP_MANAGER`) into plain scalar pairs.
pub fn parse_pairs(blob: &str) -> BTreeMap<String, String> {
    form_urlencoded::parse(blob.as_bytes())
        .map(|(k, v)| (k.into_owned(), decode_entities(&v)))
        .collect()
}

/// Decode numeric HTML entities (`&#39;` and `&#x27;` forms).
///
/// The panel entity-encodes quotes and other special characters inside
/// response values; named entities do not occur in practice.
pub(crate) fn decode_entities(input: &str) -> String {
    if !input.contains("&#") {
        return input.to_owned();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("&#") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let (digits, hex) = match tail.strip_prefix(['x', 'X']) {
            Some(t) => (t, true),
            None => (tail, false),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or(digits.len());
        let radix = if hex { 16 } else { 10 };
        let decoded = if end > 0 && digits[end..].starts_with(';') {
            u32::from_str_radix(&digits[..end], radix)
                .ok()
                .and_then(char::from_u32)
        } else {
            None
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &digits[end + 1..];
            }
            None => {
                out.push_str("&#");
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Strip HTML tags and collapse whitespace, for embedding error-page text
/// into an error message.
pub(crate) fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn parses_scalar_pairs() {
        let map = ResponseMap::parse("error=0&usertype=reseller&email=x%40y.nl");
        assert_eq!(map.get("error"), Some("0"));
        assert_eq!(map.get("usertype"), Some("reseller"));
        assert_eq!(map.get("email"), Some("x@y.nl"));
    }

    #[test]
    fn folds_bracket_keys_into_lists_in_order() {
        let map = ResponseMap::parse("list[]=alpha&list[]=beta&list[]=gamma");
        assert_eq!(map.list(), vec!["alpha", "beta", "gamma"]);
        assert!(map.get_list("missing").is_none());
    }

    #[test]
    fn keeps_last_value_for_plain_duplicates() {
        let map = ResponseMap::parse("a=1&a=2");
        assert_eq!(map.get("a"), Some("2"));
    }

    #[test]
    fn decodes_numeric_entities_in_values() {
        let map = ResponseMap::parse("ns=it&#39;s&hex=a&#x26;b");
        assert_eq!(map.get("ns"), Some("it's"));
        assert_eq!(map.get("hex"), Some("a&b"));
        // Malformed entities pass through untouched.
        assert_eq!(decode_entities("broken &#zz; end"), "broken &#zz; end");
    }

    #[test]
    fn parses_nested_blob_values() {
        let blob = "domain=example.org&username=bob&ssl=ON";
        let pairs = parse_pairs(blob);
        assert_eq!(pairs.get("domain").map(String::as_str), Some("example.org"));
        assert_eq!(pairs.get("ssl").map(String::as_str), Some("ON"));
    }

    #[test]
    fn strips_html_tags() {
        let text = strip_tags("<html><body><h1>Login</h1>\n<p>required</p></body></html>");
        assert_eq!(text, "Login required");
    }
}
