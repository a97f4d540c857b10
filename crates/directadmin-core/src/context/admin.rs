use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use directadmin_api::{Connection, ConnectionConfig, Params, parse_pairs};
use tracing::debug;

use crate::error::Error;
use crate::model::{Account, AccountType, Admin, Ip, Package, Reseller, User};

use super::ResellerContext;

/// Session context for an admin account: everything a reseller context
/// can do, plus server-wide account enumeration and the IP pool.
#[derive(Debug, Clone)]
pub struct AdminContext {
    ctx: ResellerContext,
}

impl AdminContext {
    pub fn new(conn: Connection) -> Self {
        Self {
            ctx: ResellerContext::new(conn),
        }
    }

    /// Wrap a connection, verifying the acting account is an admin.
    pub async fn validated(conn: Connection) -> Result<Self, Error> {
        let ctx = Self::new(conn);
        ctx.ensure_tier(AccountType::Admin).await?;
        Ok(ctx)
    }

    pub fn connect(config: &ConnectionConfig) -> Result<Self, Error> {
        Ok(Self::new(config.open().map_err(Error::Api)?))
    }

    /// Create a new admin account.
    pub async fn create_admin(
        &self,
        username: &str,
        password: &str,
        email: &str,
    ) -> Result<Admin, Error> {
        self.create_account(username, password, email, Params::new(), "ACCOUNT_ADMIN")
            .await?;
        Ok(Admin::new(
            username,
            Arc::clone(self.connection()),
            AccountType::Admin,
        ))
    }

    /// Create a new reseller account.
    ///
    /// `ip` is the panel's assignment mode: `shared`, `sharedreseller`
    /// or `assign`.
    pub async fn create_reseller(
        &self,
        username: &str,
        password: &str,
        email: &str,
        domain: &str,
        ip: &str,
        package: Option<&str>,
    ) -> Result<Reseller, Error> {
        let mut options = Params::new()
            .add("ip", ip)
            .add("domain", domain)
            .add("serverip", "ON")
            .add("dns", "OFF");
        if let Some(package) = package {
            options.push("package", package);
        }
        self.create_account(username, password, email, options, "ACCOUNT_RESELLER")
            .await?;
        Ok(Reseller::new(
            username,
            Arc::clone(self.connection()),
            AccountType::Admin,
        ))
    }

    /// Whether an account with the given name exists on the server.
    ///
    /// A command failure narrows to `false`; transport errors propagate.
    pub async fn user_exists(&self, username: &str) -> Result<bool, Error> {
        let params = Params::new().add("user", username);
        match self.connection().invoke_get("USER_EXISTS", &params).await {
            Ok(map) => Ok(map.get("exists").is_some_and(|v| v != "0")),
            Err(e) if e.is_command_failure() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// All admin accounts on the server, keyed by username.
    pub async fn admins(&self) -> Result<BTreeMap<String, Admin>, Error> {
        let map = self.connection().invoke_get("SHOW_ADMINS", &Params::new()).await?;
        Ok(map
            .list()
            .into_iter()
            .map(|name| {
                let admin = Admin::new(
                    name.clone(),
                    Arc::clone(self.connection()),
                    AccountType::Admin,
                );
                (name, admin)
            })
            .collect())
    }

    /// All plain user accounts on the server, regardless of reseller.
    pub async fn all_users(&self) -> Result<BTreeMap<String, User>, Error> {
        let map = self
            .connection()
            .invoke_get("SHOW_ALL_USERS", &Params::new())
            .await?;
        Ok(map
            .list()
            .into_iter()
            .map(|name| {
                let user = User::new(
                    name.clone(),
                    Arc::clone(self.connection()),
                    AccountType::Admin,
                );
                (name, user)
            })
            .collect())
    }

    /// Every account on the server of any tier, keyed by username.
    pub async fn all_accounts(&self) -> Result<BTreeMap<String, Account>, Error> {
        let mut accounts = BTreeMap::new();
        for (name, user) in self.all_users().await? {
            accounts.insert(name, Account::User(user));
        }
        for (name, reseller) in self.resellers().await? {
            accounts.insert(name, Account::Reseller(reseller));
        }
        for (name, admin) in self.admins().await? {
            accounts.insert(name, Account::Admin(admin));
        }
        Ok(accounts)
    }

    /// All reseller accounts on the server, keyed by username.
    pub async fn resellers(&self) -> Result<BTreeMap<String, Reseller>, Error> {
        let map = self
            .connection()
            .invoke_get("SHOW_RESELLERS", &Params::new())
            .await?;
        Ok(map
            .list()
            .into_iter()
            .map(|name| {
                let reseller = Reseller::new(
                    name.clone(),
                    Arc::clone(self.connection()),
                    AccountType::Admin,
                );
                (name, reseller)
            })
            .collect())
    }

    /// A single reseller, or `None` if no reseller has that name.
    pub async fn reseller(&self, username: &str) -> Result<Option<Reseller>, Error> {
        Ok(self.resellers().await?.remove(username))
    }

    /// Reseller packages defined on the server, keyed by name.
    pub async fn reseller_packages(&self) -> Result<BTreeMap<String, Package>, Error> {
        let params = Params::new().add("full", "yes");
        let map = self
            .connection()
            .invoke_get("PACKAGES_RESELLER", &params)
            .await?;
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

    pub async fn reseller_package(&self, name: &str) -> Result<Option<Package>, Error> {
        Ok(self.reseller_packages().await?.remove(name))
    }

    // ── Server IP pool ───────────────────────────────────────────────

    /// The server's IP pool, keyed by address.
    ///
    /// Each entry carries the per-IP config blob (gateway, netmask,
    /// assignment status, owning reseller).
    pub async fn ips(&self) -> Result<BTreeMap<String, Ip>, Error> {
        let map = self.connection().invoke_get("IP_MANAGER", &Params::new()).await?;
        Ok(map
            .to_pairs()
            .into_iter()
            .filter(|(address, _)| address != "error")
            .map(|(address, blob)| {
                let ip = Ip::from_blob(address.clone(), &parse_pairs(&blob));
                (address, ip)
            })
            .collect())
    }

    /// Add an address to the server's IP pool.
    pub async fn add_ip(&self, ip: &str, netmask: &str) -> Result<(), Error> {
        let params = Params::new()
            .add("action", "add")
            .add("ip", ip)
            .add("netmask", netmask);
        self.connection().invoke_post("IP_MANAGER", &params).await?;
        debug!(ip, netmask, "added server ip");
        Ok(())
    }

    /// Remove an address from the server's IP pool.
    pub async fn delete_ip(&self, ip: &str) -> Result<(), Error> {
        let params = Params::new()
            .add("action", "select")
            .add("delete", "yes")
            .add("select0", ip);
        self.connection().invoke_post("IP_MANAGER", &params).await?;
        debug!(ip, "deleted server ip");
        Ok(())
    }

    /// Link `ip` as an additional address of `target`.
    pub async fn link_ip(&self, ip: &str, target: &str) -> Result<(), Error> {
        let params = Params::new()
            .add("action", "link")
            .add("ip", target)
            .add("select0", ip);
        self.connection().invoke_post("IP_MANAGER", &params).await?;
        Ok(())
    }

    pub async fn unlink_ip(&self, ip: &str, target: &str) -> Result<(), Error> {
        let params = Params::new()
            .add("action", "unlink")
            .add("ip", target)
            .add("select0", ip);
        self.connection().invoke_post("IP_MANAGER", &params).await?;
        Ok(())
    }

    /// Assign an address to a reseller.
    pub async fn assign_ip(&self, ip: &str, reseller: &str) -> Result<(), Error> {
        let params = Params::new()
            .add("action", "assign")
            .add("select0", ip)
            .add("reseller", reseller);
        self.connection().invoke_post("IP_MANAGER", &params).await?;
        debug!(ip, reseller, "assigned server ip");
        Ok(())
    }

    // ── Impersonation ────────────────────────────────────────────────

    /// An admin context acting as another admin.
    pub async fn impersonate_admin(
        &self,
        username: &str,
        validate: bool,
    ) -> Result<AdminContext, Error> {
        let conn = self.connection().login_as(username).map_err(Error::Api)?;
        if validate {
            Self::validated(conn).await
        } else {
            Ok(Self::new(conn))
        }
    }

    /// A reseller context acting as the named reseller.
    pub async fn impersonate_reseller(
        &self,
        username: &str,
        validate: bool,
    ) -> Result<ResellerContext, Error> {
        let conn = self.connection().login_as(username).map_err(Error::Api)?;
        if validate {
            ResellerContext::validated(conn).await
        } else {
            Ok(ResellerContext::new(conn))
        }
    }
}

impl Deref for AdminContext {
    type Target = ResellerContext;

    fn deref(&self) -> &ResellerContext {
        &self.ctx
    }
}
