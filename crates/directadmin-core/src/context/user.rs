use std::collections::BTreeMap;
use std::sync::Arc;

use directadmin_api::{Connection, ConnectionConfig, Params};

use crate::error::Error;
use crate::model::{Account, AccountType, Domain};

/// Session context scoped to the acting account's own resources.
///
/// Contexts are stateless: every call fetches through the wrapped
/// [`Connection`]; caching lives on the model objects, not here.
#[derive(Debug, Clone)]
pub struct UserContext {
    conn: Arc<Connection>,
}

impl UserContext {
    /// Wrap a connection without checking the account's tier.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(conn),
        }
    }

    /// Wrap a connection, verifying the acting account is a plain user.
    ///
    /// The check is exact: a reseller or admin account fails with
    /// [`Error::PrivilegeMismatch`] even though it could perform every
    /// user operation.
    pub async fn validated(conn: Connection) -> Result<Self, Error> {
        let ctx = Self::new(conn);
        ctx.ensure_tier(AccountType::User).await?;
        Ok(ctx)
    }

    /// Open a connection from a config profile.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, Error> {
        Ok(Self::new(config.open().map_err(Error::Api)?))
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// The acting account's username.
    pub fn username(&self) -> &str {
        self.conn.username()
    }

    /// Fetch the acting account's tier.
    pub async fn account_type(&self) -> Result<AccountType, Error> {
        let map = self.conn.invoke_get("SHOW_USER_CONFIG", &Params::new()).await?;
        let usertype = map
            .get("usertype")
            .ok_or_else(|| Error::missing("SHOW_USER_CONFIG", "usertype"))?;
        AccountType::from_panel(usertype)
    }

    pub(crate) async fn ensure_tier(&self, expected: AccountType) -> Result<(), Error> {
        let actual = self.account_type().await?;
        if actual == expected {
            Ok(())
        } else {
            Err(Error::PrivilegeMismatch { expected, actual })
        }
    }

    /// The account behind this context, with its config preloaded.
    pub async fn context_user(&self) -> Result<Account, Error> {
        let map = self.conn.invoke_get("SHOW_USER_CONFIG", &Params::new()).await?;
        let config = map.to_pairs();
        let tier = config
            .get("usertype")
            .map(|v| AccountType::from_panel(v))
            .transpose()?
            .ok_or_else(|| Error::missing("SHOW_USER_CONFIG", "usertype"))?;
        Account::from_config(config, Arc::clone(&self.conn), tier)
    }

    /// The acting account's raw usage blob.
    pub async fn usage(&self) -> Result<BTreeMap<String, String>, Error> {
        let params = Params::new().add("user", self.username());
        let map = self.conn.invoke_get("SHOW_USER_USAGE", &params).await?;
        Ok(map.to_pairs())
    }

    /// All domains of the acting account, keyed by name.
    pub async fn domains(&self) -> Result<BTreeMap<String, Domain>, Error> {
        let user = self.context_user().await?;
        let domains = user.user().domains().await?;
        Ok(domains.as_ref().clone())
    }

    /// A single domain of the acting account, or `None`.
    pub async fn domain(&self, name: &str) -> Result<Option<Domain>, Error> {
        let user = self.context_user().await?;
        user.user().domain(name).await
    }
}
