use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use directadmin_api::{Connection, ConnectionConfig, Params};
use strum::Display;
use tracing::debug;

use crate::convert::yes_no;
use crate::error::Error;
use crate::model::{AccountType, Package, User};

use super::UserContext;

/// Reason attached to an account suspension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SuspensionReason {
    #[default]
    None,
    Abuse,
    Billing,
    Inactive,
    Other,
    Spam,
    UserBandwidth,
    UserQuota,
}

/// Which stored passwords a `USER_PASSWD` call replaces.
#[derive(Debug, Clone, Copy)]
pub struct PasswordTargets {
    pub system: bool,
    pub ftp: bool,
    pub database: bool,
}

impl Default for PasswordTargets {
    fn default() -> Self {
        Self {
            system: true,
            ftp: true,
            database: true,
        }
    }
}

/// Session context for a reseller account: everything a user context
/// can do, plus management of the reseller's subordinate users.
#[derive(Debug, Clone)]
pub struct ResellerContext {
    ctx: UserContext,
}

impl ResellerContext {
    pub fn new(conn: Connection) -> Self {
        Self {
            ctx: UserContext::new(conn),
        }
    }

    /// Wrap a connection, verifying the acting account is a reseller.
    pub async fn validated(conn: Connection) -> Result<Self, Error> {
        let ctx = Self::new(conn);
        ctx.ensure_tier(AccountType::Reseller).await?;
        Ok(ctx)
    }

    pub fn connect(config: &ConnectionConfig) -> Result<Self, Error> {
        Ok(Self::new(config.open().map_err(Error::Api)?))
    }

    /// Create a user account under this reseller.
    ///
    /// `package` selects a predefined user package; pass `None` for the
    /// panel default.
    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        email: &str,
        domain: &str,
        ip: &str,
        package: Option<&str>,
    ) -> Result<User, Error> {
        let mut options = Params::new().add("ip", ip).add("domain", domain);
        if let Some(package) = package {
            options.push("package", package);
        }
        self.create_account(username, password, email, options, "ACCOUNT_USER")
            .await?;
        Ok(User::new(
            username,
            Arc::clone(self.connection()),
            AccountType::Reseller,
        ))
    }

    /// Shared plumbing for the three account creation commands.
    pub(crate) async fn create_account(
        &self,
        username: &str,
        password: &str,
        email: &str,
        options: Params,
        command: &str,
    ) -> Result<(), Error> {
        let mut params = options;
        params.push("action", "create");
        params.push("add", "Submit");
        params.push("email", email);
        params.push("passwd", password);
        params.push("passwd2", password);
        params.push("username", username);
        self.connection().invoke_post(command, &params).await?;
        debug!(username, command, "created account");
        Ok(())
    }

    /// Delete a single account.
    pub async fn delete_account(&self, username: &str) -> Result<(), Error> {
        self.delete_accounts(&[username]).await
    }

    /// Delete multiple accounts in one bulk command.
    pub async fn delete_accounts(&self, usernames: &[&str]) -> Result<(), Error> {
        let params = Params::new()
            .add("confirmed", "Confirm")
            .add("delete", "yes")
            .add_selects(usernames.iter().copied());
        self.connection().invoke_post("SELECT_USERS", &params).await?;
        debug!(count = usernames.len(), "deleted accounts");
        Ok(())
    }

    pub async fn suspend_account(
        &self,
        username: &str,
        reason: SuspensionReason,
    ) -> Result<(), Error> {
        self.suspend_accounts(&[username], reason).await
    }

    /// Suspend multiple accounts; `select0..N` follows input order.
    pub async fn suspend_accounts(
        &self,
        usernames: &[&str],
        reason: SuspensionReason,
    ) -> Result<(), Error> {
        let params = Params::new()
            .add("reason", reason.to_string())
            .add("dosuspend", "yes")
            .add_selects(usernames.iter().copied());
        self.connection().invoke_post("SELECT_USERS", &params).await?;
        debug!(count = usernames.len(), %reason, "suspended accounts");
        Ok(())
    }

    pub async fn unsuspend_account(&self, username: &str) -> Result<(), Error> {
        self.unsuspend_accounts(&[username]).await
    }

    pub async fn unsuspend_accounts(&self, usernames: &[&str]) -> Result<(), Error> {
        let params = Params::new()
            .add("reason", SuspensionReason::None.to_string())
            .add("dounsuspend", "yes")
            .add_selects(usernames.iter().copied());
        self.connection().invoke_post("SELECT_USERS", &params).await?;
        debug!(count = usernames.len(), "unsuspended accounts");
        Ok(())
    }

    /// IPs available to this reseller, as plain addresses.
    pub async fn reseller_ips(&self) -> Result<Vec<String>, Error> {
        let map = self
            .connection()
            .invoke_get("SHOW_RESELLER_IPS", &Params::new())
            .await?;
        Ok(map.list())
    }

    /// All users owned by this reseller, keyed by username.
    pub async fn users(&self) -> Result<BTreeMap<String, User>, Error> {
        let map = self.connection().invoke_get("SHOW_USERS", &Params::new()).await?;
        Ok(map
            .list()
            .into_iter()
            .map(|name| {
                let user = User::new(
                    name.clone(),
                    Arc::clone(self.connection()),
                    AccountType::Reseller,
                );
                (name, user)
            })
            .collect())
    }

    /// A single owned user, or `None` if this reseller does not own it.
    pub async fn user(&self, username: &str) -> Result<Option<User>, Error> {
        Ok(self.users().await?.remove(username))
    }

    /// Reset an account's password across the selected stores.
    pub async fn set_user_password(
        &self,
        username: &str,
        password: &str,
        targets: PasswordTargets,
    ) -> Result<(), Error> {
        let params = Params::new()
            .add("username", username)
            .add("passwd", password)
            .add("passwd2", password)
            .add("system", yes_no(targets.system))
            .add("ftp", yes_no(targets.ftp))
            .add("database", yes_no(targets.database));
        self.connection().invoke_post("USER_PASSWD", &params).await?;
        Ok(())
    }

    /// The owning username of a domain, or `None` when the panel does
    /// not know the domain. This narrows the command failure; transport
    /// errors still propagate.
    pub async fn domain_owner(&self, domain: &str) -> Result<Option<String>, Error> {
        let params = Params::new().add("domain", domain);
        match self.connection().invoke_get("DOMAIN_OWNERS", &params).await {
            Ok(map) => Ok(map.get(domain).map(str::to_owned)),
            Err(e) if e.is_command_failure() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Owners of every domain under this reseller, `domain -> username`.
    pub async fn domain_owners(&self) -> Result<BTreeMap<String, String>, Error> {
        let map = self
            .connection()
            .invoke_get("DOMAIN_OWNERS", &Params::new())
            .await?;
        Ok(map.to_pairs())
    }

    /// Reseller statistics and active package settings.
    pub async fn statistics(&self) -> Result<BTreeMap<String, String>, Error> {
        let map = self
            .connection()
            .invoke_get("RESELLER_STATS", &Params::new())
            .await?;
        Ok(map.to_pairs())
    }

    /// Reseller resource usage (disk, bandwidth and friends).
    pub async fn reseller_usage(&self) -> Result<BTreeMap<String, String>, Error> {
        let params = Params::new().add("type", "usage");
        let map = self.connection().invoke_get("RESELLER_STATS", &params).await?;
        Ok(map.to_pairs())
    }

    /// A user context acting as the named account.
    ///
    /// Always derives a fresh connection; the receiver is unaffected and
    /// the returned context can impersonate further.
    pub async fn impersonate_user(
        &self,
        username: &str,
        validate: bool,
    ) -> Result<UserContext, Error> {
        let conn = self.connection().login_as(username).map_err(Error::Api)?;
        if validate {
            UserContext::validated(conn).await
        } else {
            Ok(UserContext::new(conn))
        }
    }

    /// User packages defined by this reseller, keyed by package name.
    pub async fn user_packages(&self) -> Result<BTreeMap<String, Package>, Error> {
        let params = Params::new().add("full", "yes");
        let map = self.connection().invoke_get("PACKAGES_USER", &params).await?;
        Ok(map
            .to_pairs()
            .into_iter()
            .filter(|(name, _)| name != "error")
            .map(|(name, blob)| {
                let package = Package::from_blob(name.clone(), &blob);
                (name, package)
            })
            .collect())
    }

    pub async fn user_package(&self, name: &str) -> Result<Option<Package>, Error> {
        Ok(self.user_packages().await?.remove(name))
    }

    /// Move an account onto a different user package.
    pub async fn set_user_package(&self, username: &str, package: &str) -> Result<(), Error> {
        let params = Params::new()
            .add("action", "package")
            .add("user", username)
            .add("package", package);
        self.connection().invoke_get("MODIFY_USER", &params).await?;
        debug!(username, package, "changed user package");
        Ok(())
    }

    /// Mark a reseller IP as shared or dedicated.
    pub async fn set_ip_config(&self, ip: &str, shared: bool) -> Result<(), Error> {
        let params = Params::new()
            .add("action", "select")
            .add("select0", ip)
            .add("share", yes_no(shared));
        self.connection().invoke_post("IP_CONFIG", &params).await?;
        Ok(())
    }
}

impl Deref for ResellerContext {
    type Target = UserContext;

    fn deref(&self) -> &UserContext {
        &self.ctx
    }
}
