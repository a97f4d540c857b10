// Database objects
//
// A database's wire name is always `<owner>_<short>`; the model stores
// the short name and derives the full one. Listings arrive as bare name
// lists on the `DATABASES` command with an `action` discriminator.

use std::sync::{Arc, Weak};

use directadmin_api::{Connection, Params};
use tracing::debug;

use crate::cache::{CacheSlot, ObjectCache};
use crate::error::Error;

/// A database owned by a panel account.
#[derive(Debug, Clone)]
pub struct Database {
    short_name: String,
    owner: String,
    conn: Arc<Connection>,
    owner_cache: Weak<ObjectCache>,
    cache: Arc<ObjectCache>,
}

impl Database {
    pub(crate) fn new(
        short_name: String,
        owner: String,
        conn: Arc<Connection>,
        owner_cache: Weak<ObjectCache>,
    ) -> Self {
        Self {
            short_name,
            owner,
            conn,
            owner_cache,
            cache: Arc::new(ObjectCache::new()),
        }
    }

    /// The name without the owner prefix.
    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    /// The fully qualified `<owner>_<short>` name.
    pub fn full_name(&self) -> String {
        format!("{}_{}", self.owner, self.short_name)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Hosts allowed to connect to this database.
    pub async fn access_hosts(&self) -> Result<Arc<Vec<AccessHost>>, Error> {
        self.cache
            .get_or_fetch(CacheSlot::AccessHosts, || async {
                let params = Params::new()
                    .add("action", "accesshosts")
                    .add("db", self.full_name());
                let map = self.conn.invoke_get("DATABASES", &params).await?;
                let hosts = map
                    .list()
                    .into_iter()
                    .map(|host| AccessHost {
                        host,
                        database: self.full_name(),
                        conn: Arc::clone(&self.conn),
                        database_cache: Arc::downgrade(&self.cache),
                    })
                    .collect();
                Ok::<_, Error>(hosts)
            })
            .await
    }

    /// Panel-side users with access to this database.
    pub async fn users(&self) -> Result<Arc<Vec<DatabaseUser>>, Error> {
        self.cache
            .get_or_fetch(CacheSlot::DatabaseUsers, || async {
                let params = Params::new()
                    .add("action", "users")
                    .add("db", self.full_name());
                let map = self.conn.invoke_get("DATABASES", &params).await?;
                let users = map
                    .list()
                    .into_iter()
                    .map(|name| DatabaseUser { name })
                    .collect();
                Ok::<_, Error>(users)
            })
            .await
    }

    /// The raw quota figure reported for this database.
    pub async fn quota(&self) -> Result<String, Error> {
        let full_name = self.full_name();
        let value = self
            .cache
            .get_value(CacheSlot::DatabaseQuotas, &full_name, || async {
                let params = Params::new().add("action", "quota");
                let map = self.conn.invoke_get("DATABASES", &params).await?;
                Ok::<_, Error>(map.to_pairs())
            })
            .await?;
        value.ok_or_else(|| Error::missing("DATABASES", &full_name))
    }

    /// Allow a host to connect, invalidating the cached host list.
    pub async fn create_access_host(&self, host: &str) -> Result<AccessHost, Error> {
        let params = Params::new()
            .add("action", "accesshosts")
            .add("create", "yes")
            .add("db", self.full_name())
            .add("host", host);
        self.conn.invoke_post("DATABASES", &params).await?;
        debug!(database = %self.full_name(), host, "created access host");
        self.cache.clear();
        Ok(AccessHost {
            host: host.to_owned(),
            database: self.full_name(),
            conn: Arc::clone(&self.conn),
            database_cache: Arc::downgrade(&self.cache),
        })
    }

    /// Drop this database and invalidate the owner's cache.
    pub async fn delete(&self) -> Result<(), Error> {
        let params = Params::new()
            .add("action", "delete")
            .add("select0", self.full_name());
        self.conn.invoke_post("DATABASES", &params).await?;
        debug!(database = %self.full_name(), "deleted database");
        self.cache.clear();
        if let Some(owner_cache) = self.owner_cache.upgrade() {
            owner_cache.clear();
        }
        Ok(())
    }
}

/// A host allowed to connect to a database.
#[derive(Debug, Clone)]
pub struct AccessHost {
    host: String,
    database: String,
    conn: Arc<Connection>,
    database_cache: Weak<ObjectCache>,
}

impl AccessHost {
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Revoke this host, invalidating the database's cached host list.
    pub async fn delete(&self) -> Result<(), Error> {
        let params = Params::new()
            .add("action", "accesshosts")
            .add("delete", "yes")
            .add("db", &self.database)
            .add("select0", &self.host);
        self.conn.invoke_post("DATABASES", &params).await?;
        if let Some(cache) = self.database_cache.upgrade() {
            cache.clear();
        }
        Ok(())
    }
}

/// A panel-side database user name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseUser {
    name: String,
}

impl DatabaseUser {
    pub fn name(&self) -> &str {
        &self.name
    }
}
