// Email objects
//
// Forwarders arrive as `prefix=recipient,recipient` pairs; mailboxes as
// `prefix=<url-encoded blob>` from `POP action=full_list`.

use std::collections::BTreeMap;

use directadmin_api::parse_pairs;

use crate::convert;

/// An email forwarder: everything for `prefix@domain` goes to the
/// recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forwarder {
    prefix: String,
    recipients: Vec<String>,
}

impl Forwarder {
    pub(crate) fn new(prefix: String, recipients: Vec<String>) -> Self {
        Self { prefix, recipients }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// The full source address within the given domain.
    pub fn address(&self, domain: &str) -> String {
        format!("{}@{domain}", self.prefix)
    }
}

/// A POP/IMAP mailbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    prefix: String,
    settings: BTreeMap<String, String>,
}

impl Mailbox {
    pub(crate) fn from_blob(prefix: String, blob: &str) -> Self {
        Self {
            prefix,
            settings: parse_pairs(blob),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Mailbox quota in megabytes, or `None` for unlimited.
    pub fn quota(&self) -> Option<f64> {
        convert::parse_limit(self.settings.get("quota").map(String::as_str))
    }

    /// Current mailbox usage in megabytes.
    pub fn usage(&self) -> f64 {
        convert::parse_usage(self.settings.get("usage").map(String::as_str))
    }

    /// Daily send limit, or `None` for unlimited.
    pub fn send_limit(&self) -> Option<u32> {
        convert::parse_count_limit(self.settings.get("limit").map(String::as_str))
    }

    /// Raw setting lookup for fields without a typed accessor.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn mailbox_blob_exposes_typed_fields() {
        let mailbox = Mailbox::from_blob("info".to_owned(), "quota=50&usage=12.5&limit=0");
        assert_eq!(mailbox.quota(), Some(50.0));
        assert_eq!(mailbox.usage(), 12.5);
        assert_eq!(mailbox.send_limit(), None);
    }

    #[test]
    fn forwarder_builds_full_address() {
        let fwd = Forwarder::new("all".to_owned(), vec!["a@b.nl".to_owned()]);
        assert_eq!(fwd.address("example.com"), "all@example.com");
    }
}
