// Hosting packages
//
// `PACKAGES_USER full=yes` and `PACKAGES_RESELLER full=yes` return
// `name=<url-encoded blob>` pairs. The blob is a grab bag of limits and
// ON/OFF flags; the raw settings stay accessible next to typed accessors
// for the common ones.

use std::collections::BTreeMap;

use directadmin_api::parse_pairs;

use crate::convert;

/// A predefined user or reseller package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    name: String,
    settings: BTreeMap<String, String>,
}

impl Package {
    pub(crate) fn from_blob(name: String, blob: &str) -> Self {
        Self {
            name,
            settings: parse_pairs(blob),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn limit(&self, key: &str) -> Option<f64> {
        convert::parse_limit(self.settings.get(key).map(String::as_str))
    }

    fn count_limit(&self, key: &str) -> Option<u32> {
        convert::parse_count_limit(self.settings.get(key).map(String::as_str))
    }

    fn flag(&self, key: &str) -> bool {
        self.settings.get(key).map(String::as_str).is_some_and(convert::to_bool)
    }

    /// Bandwidth ceiling in megabytes, or `None` for unlimited.
    pub fn bandwidth_limit(&self) -> Option<f64> {
        self.limit("bandwidth")
    }

    /// Disk quota in megabytes, or `None` for unlimited.
    pub fn disk_limit(&self) -> Option<f64> {
        self.limit("quota")
    }

    pub fn domain_limit(&self) -> Option<u32> {
        self.count_limit("vdomains")
    }

    pub fn database_limit(&self) -> Option<u32> {
        self.count_limit("mysql")
    }

    pub fn subdomain_limit(&self) -> Option<u32> {
        self.count_limit("nsubdomains")
    }

    pub fn mailbox_limit(&self) -> Option<u32> {
        self.count_limit("nemails")
    }

    pub fn has_php(&self) -> bool {
        self.flag("php")
    }

    pub fn has_cgi(&self) -> bool {
        self.flag("cgi")
    }

    pub fn has_ssl(&self) -> bool {
        self.flag("ssl")
    }

    pub fn has_ssh(&self) -> bool {
        self.flag("ssh")
    }

    pub fn has_cron(&self) -> bool {
        self.flag("cron")
    }

    pub fn has_catchall(&self) -> bool {
        self.flag("catchall")
    }

    pub fn has_login_keys(&self) -> bool {
        self.flag("login_keys")
    }

    pub fn skin(&self) -> Option<&str> {
        self.setting("skin")
    }

    pub fn language(&self) -> Option<&str> {
        self.setting("language")
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
    fn blob_parses_limits_and_flags() {
        let pkg = Package::from_blob(
            "bronze".to_owned(),
            "bandwidth=10240&quota=unlimited&vdomains=5&mysql=2&php=ON&ssh=OFF&skin=evolution",
        );
        assert_eq!(pkg.bandwidth_limit(), Some(10240.0));
        assert_eq!(pkg.disk_limit(), None);
        assert_eq!(pkg.domain_limit(), Some(5));
        assert_eq!(pkg.database_limit(), Some(2));
        assert!(pkg.has_php());
        assert!(!pkg.has_ssh());
        assert_eq!(pkg.skin(), Some("evolution"));
    }
}
