// Domain objects
//
// A `Domain` is parsed from the per-item config blob inside an
// `ADDITIONAL_DOMAINS` listing. The reported owner must match the
// connection's acting user; a mismatch is a consistency error, not
// something to paper over.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use directadmin_api::{Connection, Params};
use tracing::debug;

use crate::cache::{CacheSlot, ObjectCache};
use crate::convert;
use crate::error::Error;
use crate::model::mail::{Forwarder, Mailbox};

/// Options for creating a domain; unset fields fall back to the owning
/// account's defaults, `None` limits mean "share with account".
#[derive(Debug, Clone, Copy, Default)]
pub struct NewDomain {
    pub bandwidth_limit: Option<f64>,
    pub disk_limit: Option<f64>,
    pub ssl: Option<bool>,
    pub php: Option<bool>,
    pub cgi: Option<bool>,
}

/// Catch-all email disposition for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Catchall {
    /// Accept and discard (`:blackhole:`).
    Blackhole,
    /// Reject at SMTP time (`:fail:`).
    Fail,
    /// Deliver to the given address.
    Address(String),
    Off,
}

/// Redirect kind as the panel spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectType {
    Permanent,
    Temporary,
    Replaced,
}

impl RedirectType {
    fn code(self) -> &'static str {
        match self {
            Self::Permanent => "301",
            Self::Temporary => "302",
            Self::Replaced => "303",
        }
    }
}

/// A domain owned by a panel account.
#[derive(Debug, Clone)]
pub struct Domain {
    name: String,
    owner: String,
    conn: Arc<Connection>,
    owner_cache: Weak<ObjectCache>,
    cache: Arc<ObjectCache>,
    bandwidth_used: f64,
    bandwidth_limit: Option<f64>,
    disk_usage: f64,
    disk_limit: Option<f64>,
    ssl: bool,
    php: bool,
    cgi: bool,
    suspended: bool,
    local_mail: bool,
    aliases: Vec<String>,
    pointers: Vec<String>,
}

impl Domain {
    /// Parse a domain from its `ADDITIONAL_DOMAINS` config blob.
    ///
    /// Fails with a consistency error when the blob's `username` does
    /// not match the connection's acting user.
    pub(crate) fn from_config(
        config: &BTreeMap<String, String>,
        conn: Arc<Connection>,
        owner_cache: Weak<ObjectCache>,
    ) -> Result<Self, Error> {
        let name = config
            .get("domain")
            .cloned()
            .ok_or_else(|| Error::missing("ADDITIONAL_DOMAINS", "domain"))?;
        let owner = config
            .get("username")
            .cloned()
            .ok_or_else(|| Error::missing("ADDITIONAL_DOMAINS", "username"))?;
        if owner != conn.username() {
            return Err(Error::consistency(format!(
                "domain '{name}' is owned by '{owner}', connection acts as '{}'",
                conn.username()
            )));
        }

        let bandwidth_used = config
            .get("bandwidth")
            .and_then(|v| v.split('/').next())
            .map(str::trim)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0);

        Ok(Self {
            name,
            owner,
            conn,
            owner_cache,
            cache: Arc::new(ObjectCache::new()),
            bandwidth_used,
            bandwidth_limit: convert::parse_limit(config.get("bandwidth_limit").map(String::as_str)),
            disk_usage: convert::parse_usage(config.get("quota").map(String::as_str)),
            disk_limit: convert::parse_limit(config.get("quota_limit").map(String::as_str)),
            ssl: config.get("ssl").map(String::as_str).is_some_and(convert::to_bool),
            php: config.get("php").map(String::as_str).is_some_and(convert::to_bool),
            cgi: config.get("cgi").map(String::as_str).is_some_and(convert::to_bool),
            suspended: config
                .get("suspended")
                .map(String::as_str)
                .is_some_and(convert::to_bool),
            local_mail: config
                .get("local_mail")
                .map(String::as_str)
                .is_some_and(convert::to_bool),
            aliases: config
                .get("alias_pointers")
                .map(|v| convert::split_list(v))
                .unwrap_or_default(),
            pointers: config
                .get("pointers")
                .map(|v| convert::split_list(v))
                .unwrap_or_default(),
        })
    }

    pub fn domain_name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn bandwidth_used(&self) -> f64 {
        self.bandwidth_used
    }

    /// Bandwidth ceiling in megabytes, or `None` for unlimited.
    pub fn bandwidth_limit(&self) -> Option<f64> {
        self.bandwidth_limit
    }

    pub fn disk_usage(&self) -> f64 {
        self.disk_usage
    }

    pub fn disk_limit(&self) -> Option<f64> {
        self.disk_limit
    }

    pub fn has_ssl(&self) -> bool {
        self.ssl
    }

    pub fn has_php(&self) -> bool {
        self.php
    }

    pub fn has_cgi(&self) -> bool {
        self.cgi
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn uses_local_mail(&self) -> bool {
        self.local_mail
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn pointers(&self) -> &[String] {
        &self.pointers
    }

    pub fn set_ssl(&mut self, enabled: bool) {
        self.ssl = enabled;
    }

    pub fn set_php(&mut self, enabled: bool) {
        self.php = enabled;
    }

    pub fn set_cgi(&mut self, enabled: bool) {
        self.cgi = enabled;
    }

    pub fn set_bandwidth_limit(&mut self, limit: Option<f64>) {
        self.bandwidth_limit = limit;
    }

    pub fn set_disk_limit(&mut self, limit: Option<f64>) {
        self.disk_limit = limit;
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Sorted union of the domain name, its aliases and its pointers.
    pub async fn domain_names(&self) -> Result<Arc<Vec<String>>, Error> {
        self.cache
            .get_or_fetch(CacheSlot::DomainNames, || async {
                let mut names: Vec<String> = self
                    .aliases
                    .iter()
                    .chain(self.pointers.iter())
                    .cloned()
                    .chain(std::iter::once(self.name.clone()))
                    .collect();
                names.sort();
                names.dedup();
                Ok::<_, Error>(names)
            })
            .await
    }

    /// Add a pointer, or an alias when `alias` is set.
    pub async fn create_pointer(&mut self, domain: &str, alias: bool) -> Result<(), Error> {
        let mut params = Params::new()
            .add("domain", &self.name)
            .add("from", domain)
            .add("action", "add");
        if alias {
            params.push("alias", "yes");
        }
        self.conn.invoke_post("DOMAIN_POINTER", &params).await?;
        let list = if alias { &mut self.aliases } else { &mut self.pointers };
        if !list.iter().any(|d| d == domain) {
            list.push(domain.to_owned());
        }
        self.cache.clear();
        Ok(())
    }

    /// Delete this domain and invalidate the owner's cache.
    pub async fn delete(&self) -> Result<(), Error> {
        let params = Params::new()
            .add("delete", "yes")
            .add("confirmed", "yes")
            .add("select0", &self.name);
        self.conn.invoke_post("DOMAIN", &params).await?;
        debug!(domain = %self.name, "deleted domain");
        self.cache.clear();
        if let Some(owner_cache) = self.owner_cache.upgrade() {
            owner_cache.clear();
        }
        Ok(())
    }

    /// Push the locally modified limits and flags to the panel.
    pub async fn modify(&self) -> Result<(), Error> {
        let mut params = Params::new();
        match self.bandwidth_limit {
            Some(limit) => params.push("bandwidth", limit.to_string()),
            None => params.push("ubandwidth", "yes"),
        }
        match self.disk_limit {
            Some(limit) => params.push("quota", limit.to_string()),
            None => params.push("uquota", "yes"),
        }
        params.push("ssl", convert::on_off(self.ssl));
        params.push("php", convert::on_off(self.php));
        params.push("cgi", convert::on_off(self.cgi));
        self.invoke_post("DOMAIN", "modify", params, true).await?;
        Ok(())
    }

    // ── Email ────────────────────────────────────────────────────────

    /// The current catch-all setting, or `None` when unset.
    pub async fn catchall(&self) -> Result<Option<String>, Error> {
        let params = Params::new().add("domain", &self.name);
        let map = self.conn.invoke_get("EMAIL_CATCH_ALL", &params).await?;
        Ok(map.get("value").map(str::to_owned))
    }

    pub async fn set_catchall(&self, value: Catchall) -> Result<(), Error> {
        let mut params = Params::new()
            .add("domain", &self.name)
            .add("update", "Update");
        match value {
            Catchall::Blackhole => params.push("catch", ":blackhole:"),
            Catchall::Fail => params.push("catch", ":fail:"),
            Catchall::Off => params.push("catch", ""),
            Catchall::Address(address) => {
                params.push("catch", "address");
                params.push("value", address);
            }
        }
        self.conn.invoke_post("EMAIL_CATCH_ALL", &params).await?;
        Ok(())
    }

    /// Email forwarders, keyed by address prefix.
    pub async fn forwarders(&self) -> Result<Arc<BTreeMap<String, Forwarder>>, Error> {
        self.cache
            .get_or_fetch(CacheSlot::Forwarders, || async {
                let params = Params::new().add("domain", &self.name);
                let map = self.conn.invoke_get("EMAIL_FORWARDERS", &params).await?;
                let forwarders = map
                    .to_pairs()
                    .into_iter()
                    .filter(|(prefix, _)| prefix != "error")
                    .map(|(prefix, recipients)| {
                        let forwarder = Forwarder::new(
                            prefix.clone(),
                            recipients.split(',').map(str::trim).map(str::to_owned).collect(),
                        );
                        (prefix, forwarder)
                    })
                    .collect();
                Ok::<_, Error>(forwarders)
            })
            .await
    }

    /// Create a forwarder and invalidate the cached collection.
    pub async fn create_forwarder(
        &self,
        prefix: &str,
        recipients: &[&str],
    ) -> Result<Forwarder, Error> {
        let params = Params::new()
            .add("domain", &self.name)
            .add("action", "create")
            .add("user", prefix)
            .add("email", recipients.join(","));
        self.conn.invoke_post("EMAIL_FORWARDERS", &params).await?;
        self.cache.clear();
        Ok(Forwarder::new(
            prefix.to_owned(),
            recipients.iter().map(|&r| r.to_owned()).collect(),
        ))
    }

    /// Mailboxes of this domain, keyed by address prefix.
    pub async fn mailboxes(&self) -> Result<Arc<BTreeMap<String, Mailbox>>, Error> {
        self.cache
            .get_or_fetch(CacheSlot::Mailboxes, || async {
                let params = Params::new()
                    .add("domain", &self.name)
                    .add("action", "full_list");
                let map = self.conn.invoke_get("POP", &params).await?;
                let boxes = map
                    .to_pairs()
                    .into_iter()
                    .filter(|(prefix, _)| prefix != "error")
                    .map(|(prefix, blob)| {
                        let mailbox = Mailbox::from_blob(prefix.clone(), &blob);
                        (prefix, mailbox)
                    })
                    .collect();
                Ok::<_, Error>(boxes)
            })
            .await
    }

    /// Create a mailbox and invalidate the cached collection.
    ///
    /// Quota and send limit of zero mean unlimited; `send_limit` of
    /// `None` keeps the system default.
    pub async fn create_mailbox(
        &self,
        prefix: &str,
        password: &str,
        quota: u64,
        send_limit: Option<u64>,
    ) -> Result<(), Error> {
        let mut params = Params::new()
            .add("domain", &self.name)
            .add("action", "create")
            .add("user", prefix)
            .add("passwd", password)
            .add("passwd2", password)
            .add("quota", quota.to_string());
        if let Some(limit) = send_limit {
            params.push("limit", limit.to_string());
        }
        self.conn.invoke_post("POP", &params).await?;
        debug!(domain = %self.name, mailbox = prefix, "created mailbox");
        self.cache.clear();
        Ok(())
    }

    // ── Subdomains ───────────────────────────────────────────────────

    /// Subdomain prefixes of this domain.
    pub async fn subdomains(&self) -> Result<Arc<Vec<Subdomain>>, Error> {
        self.cache
            .get_or_fetch(CacheSlot::Subdomains, || async {
                let params = Params::new().add("domain", &self.name);
                let map = self.conn.invoke_get("SUBDOMAINS", &params).await?;
                let subs = map
                    .list()
                    .into_iter()
                    .map(|prefix| Subdomain {
                        prefix,
                        domain: self.name.clone(),
                        conn: Arc::clone(&self.conn),
                        domain_cache: Arc::downgrade(&self.cache),
                    })
                    .collect();
                Ok::<_, Error>(subs)
            })
            .await
    }

    /// Create a subdomain and invalidate the cached collection.
    pub async fn create_subdomain(&self, prefix: &str) -> Result<Subdomain, Error> {
        let params = Params::new()
            .add("action", "create")
            .add("domain", &self.name)
            .add("subdomain", prefix);
        self.conn.invoke_post("SUBDOMAINS", &params).await?;
        self.cache.clear();
        Ok(Subdomain {
            prefix: prefix.to_owned(),
            domain: self.name.clone(),
            conn: Arc::clone(&self.conn),
            domain_cache: Arc::downgrade(&self.cache),
        })
    }

    // ── Redirects ────────────────────────────────────────────────────

    /// Configured redirects, in the panel's JSON shape.
    pub async fn redirects(&self, page_size: u32) -> Result<serde_json::Value, Error> {
        let params = Params::new()
            .add("domain", &self.name)
            .add("ipp", page_size.to_string());
        Ok(self.conn.invoke_get_json("REDIRECT", &params).await?)
    }

    /// Add a redirect from a local path to a target URL.
    pub async fn add_redirect(
        &self,
        from: &str,
        to: &str,
        kind: RedirectType,
    ) -> Result<(), Error> {
        let params = Params::new()
            .add("domain", &self.name)
            .add("action", "add")
            .add("from", from)
            .add("to", to)
            .add("type", kind.code());
        self.conn.invoke_post_json("REDIRECT", &params).await?;
        Ok(())
    }

    pub async fn delete_redirect(&self, from: &str) -> Result<(), Error> {
        let params = Params::new()
            .add("domain", &self.name)
            .add("action", "delete")
            .add("select0", from);
        self.conn.invoke_post_json("REDIRECT", &params).await?;
        Ok(())
    }

    // ── SSL ──────────────────────────────────────────────────────────

    /// Paste a private key and certificate pair.
    pub async fn upload_certificate(&self, key_pem: &str, cert_pem: &str) -> Result<(), Error> {
        let params = Params::new()
            .add("domain", &self.name)
            .add("type", "paste")
            .add("action", "save")
            .add("certificate", format!("{key_pem}\n{cert_pem}"));
        self.conn.invoke_post("SSL", &params).await?;
        debug!(domain = %self.name, "uploaded certificate");
        Ok(())
    }

    /// Install or deactivate the CA certificate bundle.
    pub async fn upload_ca_certificate(&self, bundle_pem: Option<&str>) -> Result<(), Error> {
        let mut params = Params::new()
            .add("domain", &self.name)
            .add("type", "cacert")
            .add("action", "save");
        match bundle_pem {
            Some(bundle) => {
                params.push("active", "yes");
                params.push("cacert", bundle);
            }
            None => {
                params.push("active", "no");
                params.push("cacert", "");
            }
        }
        self.conn.invoke_post("SSL", &params).await?;
        Ok(())
    }

    pub async fn disable_letsencrypt(&self) -> Result<(), Error> {
        let params = Params::new()
            .add("domain", &self.name)
            .add("action", "save")
            .add("disable_letsencrypt_autorenew", "Disable");
        self.conn.invoke_post("SSL", &params).await?;
        Ok(())
    }

    /// Invoke an arbitrary domain-scoped command.
    ///
    /// Raw escape hatch for commands without a dedicated method; the
    /// caller chooses whether the cache is cleared afterwards.
    pub async fn invoke_post(
        &self,
        command: &str,
        action: &str,
        extra: Params,
        clear_cache: bool,
    ) -> Result<directadmin_api::ResponseMap, Error> {
        let mut params = Params::new()
            .add("action", action)
            .add("domain", &self.name);
        for (key, value) in extra.as_slice() {
            params.push(key, value);
        }
        let response = self.conn.invoke_post(command, &params).await?;
        if clear_cache {
            self.cache.clear();
        }
        Ok(response)
    }
}

/// A subdomain of a domain.
#[derive(Debug, Clone)]
pub struct Subdomain {
    prefix: String,
    domain: String,
    conn: Arc<Connection>,
    domain_cache: Weak<ObjectCache>,
}

impl Subdomain {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The full subdomain name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.prefix, self.domain)
    }

    /// Delete this subdomain, optionally removing its directory.
    pub async fn delete(&self, remove_contents: bool) -> Result<(), Error> {
        let params = Params::new()
            .add("action", "delete")
            .add("domain", &self.domain)
            .add("select0", &self.prefix)
            .add("contents", convert::yes_no(remove_contents));
        self.conn.invoke_post("SUBDOMAINS", &params).await?;
        if let Some(cache) = self.domain_cache.upgrade() {
            cache.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn sample_config() -> BTreeMap<String, String> {
        [
            ("domain", "example.com"),
            ("username", "bob"),
            ("bandwidth", "12.5 / 100"),
            ("bandwidth_limit", "100"),
            ("quota", "33.25"),
            ("quota_limit", "unlimited"),
            ("ssl", "ON"),
            ("php", "ON"),
            ("cgi", "OFF"),
            ("suspended", "no"),
            ("local_mail", "yes"),
            ("alias_pointers", "alias.nl|alias2.nl"),
            ("pointers", "pointer.nl"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
    }

    fn connection_for(user: &str) -> Arc<Connection> {
        let conn = Connection::new(
            "https://localhost:2222",
            user,
            "secret".to_owned().into(),
            directadmin_api::TransportConfig::default(),
        )
        .unwrap();
        Arc::new(conn)
    }

    #[test]
    fn config_blob_parses_into_typed_fields() {
        let domain =
            Domain::from_config(&sample_config(), connection_for("bob"), Weak::new()).unwrap();
        assert_eq!(domain.domain_name(), "example.com");
        assert_eq!(domain.bandwidth_used(), 12.5);
        assert_eq!(domain.bandwidth_limit(), Some(100.0));
        assert_eq!(domain.disk_limit(), None);
        assert!(domain.has_ssl());
        assert!(!domain.has_cgi());
        assert!(domain.uses_local_mail());
        assert_eq!(domain.aliases(), ["alias.nl", "alias2.nl"]);
        assert_eq!(domain.pointers(), ["pointer.nl"]);
    }

    #[test]
    fn owner_mismatch_is_a_consistency_error() {
        let err =
            Domain::from_config(&sample_config(), connection_for("alice"), Weak::new()).unwrap_err();
        assert!(matches!(err, Error::Consistency { .. }));
    }

    #[tokio::test]
    async fn domain_names_are_the_sorted_union() {
        let domain =
            Domain::from_config(&sample_config(), connection_for("bob"), Weak::new()).unwrap();
        let names = domain.domain_names().await.unwrap();
        assert_eq!(
            names.as_slice(),
            ["alias.nl", "alias2.nl", "example.com", "pointer.nl"]
        );
    }
}
