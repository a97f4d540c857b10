// Account objects
//
// `User` is the workhorse: config/usage access through the object cache,
// lazy domain and database collections, mutation methods that invalidate
// the cache. `Reseller` and `Admin` wrap a `User` and add enumeration of
// subordinate accounts; `Account` is the closed set of the three,
// selected by the panel's `usertype` discriminator.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use directadmin_api::{Connection, Params, parse_pairs};
use strum::{Display, EnumString};
use tracing::debug;

use crate::cache::{CacheSlot, ObjectCache};
use crate::context::{AdminContext, ResellerContext, UserContext};
use crate::convert;
use crate::error::Error;
use crate::model::database::Database;
use crate::model::domain::{Domain, NewDomain};
use crate::model::login_key::LoginKey;

/// Privilege tier of a panel account, ordered by capability.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum AccountType {
    User,
    Reseller,
    Admin,
}

impl AccountType {
    /// Parse the panel's `usertype` field.
    pub fn from_panel(value: &str) -> Result<Self, Error> {
        value
            .parse()
            .map_err(|_| Error::UnknownAccountType(value.to_owned()))
    }
}

/// A panel account.
///
/// Holds the account name, the connection of the context that produced
/// it, and a per-instance cache of config, usage and child collections.
/// Two `User` values for the same remote account do not share a cache.
#[derive(Debug, Clone)]
pub struct User {
    name: String,
    conn: Arc<Connection>,
    context_tier: AccountType,
    cache: Arc<ObjectCache>,
}

impl User {
    /// Construct a user whose config will be fetched on first access.
    ///
    /// `context_tier` is the privilege tier of the context this object
    /// was obtained through; it gates [`impersonate`](Self::impersonate).
    pub fn new(name: impl Into<String>, conn: Arc<Connection>, context_tier: AccountType) -> Self {
        Self {
            name: name.into(),
            conn,
            context_tier,
            cache: Arc::new(ObjectCache::new()),
        }
    }

    /// Construct a user from an already fetched config blob.
    pub fn with_config(
        name: impl Into<String>,
        conn: Arc<Connection>,
        context_tier: AccountType,
        config: BTreeMap<String, String>,
    ) -> Self {
        let user = Self::new(name, conn, context_tier);
        user.cache.insert(CacheSlot::Config, config);
        user
    }

    pub fn username(&self) -> &str {
        &self.name
    }

    pub(crate) fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    pub(crate) fn cache(&self) -> &Arc<ObjectCache> {
        &self.cache
    }

    pub(crate) fn cache_weak(&self) -> Weak<ObjectCache> {
        Arc::downgrade(&self.cache)
    }

    /// Drop all cached state for this object.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    // ── Config and usage access ──────────────────────────────────────

    /// The full account config blob, fetched once and cached.
    pub async fn config(&self) -> Result<Arc<BTreeMap<String, String>>, Error> {
        self.cache
            .get_or_fetch(CacheSlot::Config, || self.load_config())
            .await
    }

    /// The full usage blob, fetched once and cached.
    pub async fn usage(&self) -> Result<Arc<BTreeMap<String, String>>, Error> {
        self.cache
            .get_or_fetch(CacheSlot::Usage, || self.load_usage())
            .await
    }

    async fn config_value(&self, key: &str) -> Result<Option<String>, Error> {
        self.cache
            .get_value(CacheSlot::Config, key, || self.load_config())
            .await
    }

    async fn usage_value(&self, key: &str) -> Result<Option<String>, Error> {
        self.cache
            .get_value(CacheSlot::Usage, key, || self.load_usage())
            .await
    }

    async fn load_config(&self) -> Result<BTreeMap<String, String>, Error> {
        let params = Params::new().add("user", &self.name);
        let map = self.conn.invoke_get("SHOW_USER_CONFIG", &params).await?;
        Ok(map.to_pairs())
    }

    async fn load_usage(&self) -> Result<BTreeMap<String, String>, Error> {
        let params = Params::new().add("user", &self.name);
        let map = self.conn.invoke_get("SHOW_USER_USAGE", &params).await?;
        Ok(map.to_pairs())
    }

    pub async fn account_type(&self) -> Result<AccountType, Error> {
        let value = self
            .config_value("usertype")
            .await?
            .ok_or_else(|| Error::missing("SHOW_USER_CONFIG", "usertype"))?;
        AccountType::from_panel(&value)
    }

    pub async fn email(&self) -> Result<String, Error> {
        self.config_value("email")
            .await?
            .ok_or_else(|| Error::missing("SHOW_USER_CONFIG", "email"))
    }

    /// Bandwidth ceiling in megabytes, or `None` for unlimited.
    pub async fn bandwidth_limit(&self) -> Result<Option<f64>, Error> {
        let value = self.config_value("bandwidth").await?;
        Ok(convert::parse_limit(value.as_deref()))
    }

    /// Current period's bandwidth usage in megabytes.
    pub async fn bandwidth_usage(&self) -> Result<f64, Error> {
        let value = self.usage_value("bandwidth").await?;
        Ok(convert::parse_usage(value.as_deref()))
    }

    /// Disk quota in megabytes, or `None` for unlimited.
    pub async fn disk_limit(&self) -> Result<Option<f64>, Error> {
        let value = self.config_value("quota").await?;
        Ok(convert::parse_limit(value.as_deref()))
    }

    pub async fn disk_usage(&self) -> Result<f64, Error> {
        let value = self.usage_value("quota").await?;
        Ok(convert::parse_usage(value.as_deref()))
    }

    /// Maximum number of databases, or `None` for unlimited.
    pub async fn database_limit(&self) -> Result<Option<u32>, Error> {
        let value = self.config_value("mysql").await?;
        Ok(convert::parse_count_limit(value.as_deref()))
    }

    pub async fn database_usage(&self) -> Result<u32, Error> {
        let value = self.usage_value("mysql").await?;
        Ok(value.and_then(|v| v.trim().parse().ok()).unwrap_or(0))
    }

    /// Maximum number of domains, or `None` for unlimited.
    pub async fn domain_limit(&self) -> Result<Option<u32>, Error> {
        let value = self.config_value("vdomains").await?;
        Ok(convert::parse_count_limit(value.as_deref()))
    }

    pub async fn domain_usage(&self) -> Result<u32, Error> {
        let value = self.usage_value("vdomains").await?;
        Ok(value.and_then(|v| v.trim().parse().ok()).unwrap_or(0))
    }

    pub async fn is_suspended(&self) -> Result<bool, Error> {
        let value = self.config_value("suspended").await?;
        Ok(value.as_deref().is_some_and(convert::to_bool))
    }

    pub async fn has_cgi(&self) -> Result<bool, Error> {
        let value = self.config_value("cgi").await?;
        Ok(value.as_deref().is_some_and(convert::to_bool))
    }

    pub async fn has_php(&self) -> Result<bool, Error> {
        let value = self.config_value("php").await?;
        Ok(value.as_deref().is_some_and(convert::to_bool))
    }

    pub async fn has_ssl(&self) -> Result<bool, Error> {
        let value = self.config_value("ssl").await?;
        Ok(value.as_deref().is_some_and(convert::to_bool))
    }

    // ── Domains ──────────────────────────────────────────────────────

    /// All domains of this account, keyed by domain name.
    ///
    /// Fetched once per cache lifetime via one bulk listing; managed
    /// accounts are listed through an impersonated connection.
    pub async fn domains(&self) -> Result<Arc<BTreeMap<String, Domain>>, Error> {
        let conn = self.self_connection()?;
        self.cache
            .get_or_fetch(CacheSlot::Domains, || async {
                let map = conn.invoke_get("ADDITIONAL_DOMAINS", &Params::new()).await?;
                let mut domains = BTreeMap::new();
                for (name, blob) in map.to_pairs() {
                    if name == "error" {
                        continue;
                    }
                    let config = parse_pairs(&blob);
                    let domain =
                        Domain::from_config(&config, Arc::clone(&conn), self.cache_weak())?;
                    domains.insert(name, domain);
                }
                Ok::<_, Error>(domains)
            })
            .await
    }

    /// A single domain by name, or `None` if the account does not own it.
    pub async fn domain(&self, name: &str) -> Result<Option<Domain>, Error> {
        Ok(self.domains().await?.get(name).cloned())
    }

    /// The account's default domain, if one is configured.
    pub async fn default_domain(&self) -> Result<Option<Domain>, Error> {
        match self.config_value("domain").await? {
            Some(name) if !name.is_empty() => self.domain(&name).await,
            _ => Ok(None),
        }
    }

    /// Create a domain under this account and invalidate the cache.
    pub async fn create_domain(&self, name: &str, options: NewDomain) -> Result<Domain, Error> {
        let conn = self.self_connection()?;
        let mut params = Params::new().add("action", "create").add("domain", name);
        match options.bandwidth_limit {
            Some(limit) => params.push("bandwidth", limit.to_string()),
            None => params.push("ubandwidth", ""),
        }
        match options.disk_limit {
            Some(limit) => params.push("quota", limit.to_string()),
            None => params.push("uquota", ""),
        }
        let ssl = match options.ssl {
            Some(flag) => flag,
            None => self.has_ssl().await?,
        };
        let php = match options.php {
            Some(flag) => flag,
            None => self.has_php().await?,
        };
        let cgi = match options.cgi {
            Some(flag) => flag,
            None => self.has_cgi().await?,
        };
        params.push("ssl", convert::on_off(ssl));
        params.push("php", convert::on_off(php));
        params.push("cgi", convert::on_off(cgi));

        conn.invoke_post("DOMAIN", &params).await?;
        debug!(user = %self.name, domain = name, "created domain");

        let listing = conn.invoke_get("ADDITIONAL_DOMAINS", &Params::new()).await?;
        let blob = listing
            .get(name)
            .ok_or_else(|| Error::missing("ADDITIONAL_DOMAINS", name))?;
        let domain = Domain::from_config(&parse_pairs(blob), conn, self.cache_weak())?;
        self.clear_cache();
        Ok(domain)
    }

    // ── Databases ────────────────────────────────────────────────────

    /// All databases of this account, keyed by short name (without the
    /// `<owner>_` prefix).
    pub async fn databases(&self) -> Result<Arc<BTreeMap<String, Database>>, Error> {
        let conn = self.self_connection()?;
        self.cache
            .get_or_fetch(CacheSlot::Databases, || async {
                let map = conn.invoke_get("DATABASES", &Params::new()).await?;
                let mut databases = BTreeMap::new();
                for full_name in map.list() {
                    let short = self.strip_owner_prefix(&full_name)?;
                    let database = Database::new(
                        short.to_owned(),
                        self.name.clone(),
                        Arc::clone(&conn),
                        self.cache_weak(),
                    );
                    databases.insert(short.to_owned(), database);
                }
                Ok::<_, Error>(databases)
            })
            .await
    }

    pub async fn database(&self, short_name: &str) -> Result<Option<Database>, Error> {
        Ok(self.databases().await?.get(short_name).cloned())
    }

    /// Raw database quotas keyed by short name.
    pub async fn database_quotas(&self) -> Result<Arc<BTreeMap<String, String>>, Error> {
        let conn = self.self_connection()?;
        self.cache
            .get_or_fetch(CacheSlot::DatabaseQuotas, || async {
                let params = Params::new().add("action", "quota");
                let map = conn.invoke_get("DATABASES", &params).await?;
                let mut quotas = BTreeMap::new();
                for (full_name, quota) in map.to_pairs() {
                    if full_name == "error" {
                        continue;
                    }
                    let short = self.strip_owner_prefix(&full_name)?;
                    quotas.insert(short.to_owned(), quota);
                }
                Ok::<_, Error>(quotas)
            })
            .await
    }

    /// Create a database and invalidate the cache.
    ///
    /// When `password` is given a new database user is created alongside;
    /// without it, `username` must refer to an existing database user.
    pub async fn create_database(
        &self,
        name: &str,
        username: &str,
        password: Option<&str>,
    ) -> Result<Database, Error> {
        let conn = self.self_connection()?;
        let mut params = Params::new().add("action", "create").add("name", name);
        match password {
            Some(password) => {
                params.push("user", username);
                params.push("passwd", password);
                params.push("passwd2", password);
            }
            None => params.push("userlist", username),
        }
        conn.invoke_post("DATABASES", &params).await?;
        debug!(user = %self.name, database = name, "created database");
        self.clear_cache();
        Ok(Database::new(
            name.to_owned(),
            self.name.clone(),
            conn,
            self.cache_weak(),
        ))
    }

    fn strip_owner_prefix<'a>(&self, full_name: &'a str) -> Result<&'a str, Error> {
        match full_name.split_once('_') {
            Some((owner, short)) if owner == self.name => Ok(short),
            _ => Err(Error::consistency(format!(
                "database '{full_name}' does not belong to user '{}'",
                self.name
            ))),
        }
    }

    // ── Mutation ─────────────────────────────────────────────────────

    /// Apply config changes via `MODIFY_USER action=customize`.
    ///
    /// The panel requires the complete config on this command, so the
    /// current config is re-fetched and merged with `changes` before
    /// posting. The cache is cleared afterwards.
    pub async fn modify_config(&self, changes: Params) -> Result<(), Error> {
        let current = self.load_config().await?;
        let mut params = Params::new();
        for (key, value) in &current {
            if changes.as_slice().iter().any(|(k, _)| k == key) {
                continue;
            }
            params.push(key, value);
        }
        for (key, value) in changes.as_slice() {
            params.push(key, value);
        }
        params.push("action", "customize");
        params.push("user", &self.name);
        self.conn.invoke_post("MODIFY_USER", &params).await?;
        debug!(user = %self.name, "modified account config");
        self.clear_cache();
        Ok(())
    }

    /// Set the bandwidth ceiling in megabytes; `None` means unlimited.
    pub async fn set_bandwidth_limit(&self, limit: Option<f64>) -> Result<(), Error> {
        self.modify_config(limit_param("bandwidth", limit.map(|v| v.to_string())))
            .await
    }

    /// Set the disk quota in megabytes; `None` means unlimited.
    pub async fn set_disk_limit(&self, limit: Option<f64>) -> Result<(), Error> {
        self.modify_config(limit_param("quota", limit.map(|v| v.to_string())))
            .await
    }

    /// Set the domain count ceiling; `None` means unlimited.
    pub async fn set_domain_limit(&self, limit: Option<u32>) -> Result<(), Error> {
        self.modify_config(limit_param("vdomains", limit.map(|v| v.to_string())))
            .await
    }

    pub async fn set_allow_catchall(&self, allowed: bool) -> Result<(), Error> {
        self.modify_config(Params::new().add("catchall", convert::on_off(allowed)))
            .await
    }

    /// Create an ephemeral login key for this account.
    pub async fn create_login_key(&self) -> Result<LoginKey, Error> {
        LoginKey::create(self).await
    }

    // ── Impersonation ────────────────────────────────────────────────

    /// A context acting as this account.
    ///
    /// Requires the object to have come through a reseller or admin
    /// context; impersonating from a plain user context is a privilege
    /// mismatch.
    pub fn impersonate(&self) -> Result<UserContext, Error> {
        self.require_context_tier(AccountType::Reseller)?;
        let conn = self.conn.login_as(&self.name).map_err(Error::Api)?;
        Ok(UserContext::new(conn))
    }

    fn require_context_tier(&self, expected: AccountType) -> Result<(), Error> {
        if self.context_tier < expected {
            return Err(Error::PrivilegeMismatch {
                expected,
                actual: self.context_tier,
            });
        }
        Ok(())
    }

    /// Whether the connection already acts as this account.
    pub fn is_self_managed(&self) -> bool {
        self.conn.username() == self.name
    }

    /// A connection acting as this account: the context's own connection
    /// when self-managed, an impersonated one otherwise.
    pub(crate) fn self_connection(&self) -> Result<Arc<Connection>, Error> {
        if self.is_self_managed() {
            Ok(Arc::clone(&self.conn))
        } else {
            Ok(Arc::new(self.conn.login_as(&self.name).map_err(Error::Api)?))
        }
    }
}

/// A reseller account: a user that owns subordinate users.
#[derive(Debug, Clone)]
pub struct Reseller {
    user: User,
}

impl Reseller {
    pub fn new(name: impl Into<String>, conn: Arc<Connection>, context_tier: AccountType) -> Self {
        Self {
            user: User::new(name, conn, context_tier),
        }
    }

    pub fn with_config(
        name: impl Into<String>,
        conn: Arc<Connection>,
        context_tier: AccountType,
        config: BTreeMap<String, String>,
    ) -> Self {
        Self {
            user: User::with_config(name, conn, context_tier, config),
        }
    }

    /// All users owned by this reseller, keyed by username.
    pub async fn users(&self) -> Result<BTreeMap<String, User>, Error> {
        let params = Params::new().add("reseller", self.user.username());
        let map = self.user.connection().invoke_get("SHOW_USERS", &params).await?;
        Ok(map
            .list()
            .into_iter()
            .map(|name| {
                let user = User::new(
                    name.clone(),
                    Arc::clone(self.user.connection()),
                    self.user.context_tier,
                );
                (name, user)
            })
            .collect())
    }

    pub async fn user(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self.users().await?.remove(username))
    }

    /// A reseller context acting as this account.
    ///
    /// Shadows [`User::impersonate`]: a reseller account gets its full
    /// reseller operation set back, which requires the object to have
    /// come through an admin context.
    pub fn impersonate(&self) -> Result<ResellerContext, Error> {
        self.user.require_context_tier(AccountType::Admin)?;
        let conn = self.user.conn.login_as(&self.user.name).map_err(Error::Api)?;
        Ok(ResellerContext::new(conn))
    }
}

impl Deref for Reseller {
    type Target = User;

    fn deref(&self) -> &User {
        &self.user
    }
}

/// An admin account.
#[derive(Debug, Clone)]
pub struct Admin {
    reseller: Reseller,
}

impl Admin {
    pub fn new(name: impl Into<String>, conn: Arc<Connection>, context_tier: AccountType) -> Self {
        Self {
            reseller: Reseller::new(name, conn, context_tier),
        }
    }

    pub fn with_config(
        name: impl Into<String>,
        conn: Arc<Connection>,
        context_tier: AccountType,
        config: BTreeMap<String, String>,
    ) -> Self {
        Self {
            reseller: Reseller::with_config(name, conn, context_tier, config),
        }
    }

    /// An admin context acting as this account. Requires the object to
    /// have come through an admin context.
    pub fn impersonate(&self) -> Result<AdminContext, Error> {
        let user = &self.reseller.user;
        user.require_context_tier(AccountType::Admin)?;
        let conn = user.conn.login_as(&user.name).map_err(Error::Api)?;
        Ok(AdminContext::new(conn))
    }
}

impl Deref for Admin {
    type Target = Reseller;

    fn deref(&self) -> &Reseller {
        &self.reseller
    }
}

/// One account of any tier, selected by the panel's `usertype` field.
#[derive(Debug, Clone)]
pub enum Account {
    User(User),
    Reseller(Reseller),
    Admin(Admin),
}

impl Account {
    /// Build the right variant from a fetched config blob.
    ///
    /// `context_tier` is the tier of the context the config came
    /// through; for a context's own account it equals the account type.
    pub fn from_config(
        config: BTreeMap<String, String>,
        conn: Arc<Connection>,
        context_tier: AccountType,
    ) -> Result<Self, Error> {
        let name = config
            .get("username")
            .cloned()
            .ok_or_else(|| Error::missing("SHOW_USER_CONFIG", "username"))?;
        let usertype = config
            .get("usertype")
            .cloned()
            .ok_or_else(|| Error::missing("SHOW_USER_CONFIG", "usertype"))?;
        match AccountType::from_panel(&usertype)? {
            AccountType::User => Ok(Self::User(User::with_config(
                name,
                conn,
                context_tier,
                config,
            ))),
            AccountType::Reseller => Ok(Self::Reseller(Reseller::with_config(
                name,
                conn,
                context_tier,
                config,
            ))),
            AccountType::Admin => Ok(Self::Admin(Admin::with_config(
                name,
                conn,
                context_tier,
                config,
            ))),
        }
    }

    /// The tier of this account.
    pub fn account_type(&self) -> AccountType {
        match self {
            Self::User(_) => AccountType::User,
            Self::Reseller(_) => AccountType::Reseller,
            Self::Admin(_) => AccountType::Admin,
        }
    }

    /// The underlying user object, whichever the tier.
    pub fn user(&self) -> &User {
        match self {
            Self::User(user) => user,
            Self::Reseller(reseller) => reseller,
            Self::Admin(admin) => admin,
        }
    }

    pub fn username(&self) -> &str {
        self.user().username()
    }
}

fn limit_param(key: &str, value: Option<String>) -> Params {
    match value {
        Some(value) => Params::new().add(key, value),
        None => Params::new().add(format!("u{key}"), "ON"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn tiers_order_by_capability() {
        assert!(AccountType::User < AccountType::Reseller);
        assert!(AccountType::Reseller < AccountType::Admin);
    }

    #[test]
    fn usertype_field_round_trips() {
        assert_eq!(AccountType::from_panel("reseller").unwrap(), AccountType::Reseller);
        assert_eq!(AccountType::Admin.to_string(), "admin");
        assert!(matches!(
            AccountType::from_panel("superuser"),
            Err(Error::UnknownAccountType(_))
        ));
    }
}
