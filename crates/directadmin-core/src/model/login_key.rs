// Login keys
//
// Capture-once credentials: the secret is generated client side, sent to
// the panel once, and never retrievable again. Keys expire two hours
// after creation and allow the command set a hosting automation flow
// needs (login, plugins, database management).

use chrono::{DateTime, Datelike, Duration, Local, Timelike};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use uuid::Uuid;

use directadmin_api::Params;

use crate::error::Error;
use crate::model::{AccountType, User};

const KEY_VALIDITY_MINUTES: i64 = 120;

/// An ephemeral panel login key.
#[derive(Debug, Clone)]
pub struct LoginKey {
    name: String,
    secret: SecretString,
    owner: String,
    expires_at: DateTime<Local>,
}

impl LoginKey {
    /// Create a login key for the given account.
    ///
    /// The key is valid for two hours and allows the user-level command
    /// set, plus the reseller set when the account is a reseller.
    pub(crate) async fn create(user: &User) -> Result<Self, Error> {
        let conn = user.self_connection()?;
        let expires_at = Local::now() + Duration::minutes(KEY_VALIDITY_MINUTES);
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let name = format!("Key{}", expires_at.timestamp());

        let mut params = Params::new()
            .add("action", "create")
            .add("keyname", &name)
            .add("key", &secret)
            .add("key2", &secret)
            .add("hour", expires_at.hour().to_string())
            .add("minute", format!("{:02}", expires_at.minute()))
            .add("month", expires_at.month().to_string())
            .add("day", expires_at.day().to_string())
            .add("year", expires_at.year().to_string())
            .add("max_uses", "0")
            .add("ips", "")
            .add("passwd", conn.password().expose_secret())
            .add("clear_key", "yes")
            .add("allow_htm", "yes")
            .add("select_allow0", "ALL_USER")
            .add("select_allow1", "CMD_LOGIN")
            .add("select_allow2", "CMD_LOGOUT")
            .add("select_allow3", "CMD_PLUGINS")
            .add("select_allow4", "CMD_API_DATABASES");
        if user.account_type().await? == AccountType::Reseller {
            params.push("select_allow5", "ALL_RESELLER");
        }

        conn.invoke_post("LOGIN_KEYS", &params).await?;
        debug!(user = user.username(), key = %name, "created login key");

        Ok(Self {
            name,
            secret: secret.into(),
            owner: user.username().to_owned(),
            expires_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The generated key value. Not retrievable after this object drops.
    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn expires_at(&self) -> DateTime<Local> {
        self.expires_at
    }
}
