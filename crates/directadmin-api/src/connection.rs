// Panel HTTP connection
//
// Wraps `reqwest::Client` with DirectAdmin-specific command addressing
// (`/CMD_API_{command}`), pipe-login impersonation, and decoding of the
// three legacy body formats. One `Connection` represents one acting
// identity; impersonation derives a new `Connection`, never mutates.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::response::{ResponseMap, strip_tags};
use crate::transport::TransportConfig;

/// Ordered command parameters.
///
/// Order is significant on the wire: bulk commands take `select0`,
/// `select1`, … keys whose indices must match caller order.
#[derive(Debug, Clone, Default)]
pub struct Params(Vec<(String, String)>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, builder style.
    #[must_use]
    pub fn add(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((key.into(), value.into()));
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Append `select0..selectN` keys in iteration order.
    #[must_use]
    pub fn add_selects<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for (idx, item) in items.into_iter().enumerate() {
            self.0.push((format!("select{idx}"), item.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.0
    }
}

/// An authenticated connection to one panel server.
///
/// Carries the identity triple: the authenticated (master) account, the
/// acting account, and the master password. The two differ only when the
/// connection was derived through [`Connection::login_as`], in which case
/// the wire login is the panel's pipe format `master|acting`.
#[derive(Debug, Clone)]
pub struct Connection {
    base_url: Url,
    authenticated_user: String,
    acting_user: String,
    password: SecretString,
    transport: TransportConfig,
    http: reqwest::Client,
}

impl Connection {
    /// Open a connection.
    ///
    /// `login` may already be in pipe format; the master account is the
    /// first segment and the acting account the last.
    pub fn new(
        url: &str,
        login: &str,
        password: SecretString,
        transport: TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(url)?;
        let mut segments = login.split('|');
        let authenticated_user = segments.next().unwrap_or(login).to_owned();
        let acting_user = segments.next_back().unwrap_or(&authenticated_user).to_owned();
        let http = transport.build_client()?;
        Ok(Self {
            base_url,
            authenticated_user,
            acting_user,
            password,
            transport,
            http,
        })
    }

    /// The acting account's username.
    pub fn username(&self) -> &str {
        &self.acting_user
    }

    /// The master account that authenticates every request.
    pub fn authenticated_username(&self) -> &str {
        &self.authenticated_user
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Derive a connection acting as a managed account.
    ///
    /// The panel authenticates the pipe login `master|target` with the
    /// master password. The receiver is untouched; the derived connection
    /// inherits transport settings and may itself be chained further.
    pub fn login_as(&self, username: &str) -> Result<Self, Error> {
        Self::new(
            self.base_url.as_str(),
            &format!("{}|{username}", self.authenticated_user),
            self.password.clone(),
            self.transport.clone(),
        )
    }

    /// The login string sent on the wire.
    fn wire_login(&self) -> String {
        if self.acting_user == self.authenticated_user {
            self.authenticated_user.clone()
        } else {
            format!("{}|{}", self.authenticated_user, self.acting_user)
        }
    }

    // ── Command invocation ───────────────────────────────────────────

    /// Invoke a command with GET semantics, returning the decoded
    /// URL-encoded payload.
    pub async fn invoke_get(&self, command: &str, params: &Params) -> Result<ResponseMap, Error> {
        let body = self.send(Method::GET, command, params, None).await?;
        self.unwrap_envelope(command, &body)
    }

    /// Invoke a command with POST semantics (form-encoded body).
    pub async fn invoke_post(&self, command: &str, params: &Params) -> Result<ResponseMap, Error> {
        let body = self.send(Method::POST, command, &Params::new(), Some(params)).await?;
        self.unwrap_envelope(command, &body)
    }

    /// Invoke a command requesting a JSON response (`json=yes`).
    pub async fn invoke_get_json(
        &self,
        command: &str,
        params: &Params,
    ) -> Result<serde_json::Value, Error> {
        let params = params.clone().add("json", "yes");
        let body = self.send(Method::GET, command, &params, None).await?;
        self.unwrap_json_envelope(command, &body)
    }

    /// Invoke a command with a form-encoded body, requesting JSON back.
    pub async fn invoke_post_json(
        &self,
        command: &str,
        params: &Params,
    ) -> Result<serde_json::Value, Error> {
        let params = params.clone().add("json", "yes");
        let body = self.send(Method::POST, command, &Params::new(), Some(&params)).await?;
        self.unwrap_json_envelope(command, &body)
    }

    // ── Request plumbing ─────────────────────────────────────────────

    async fn send(
        &self,
        method: Method,
        command: &str,
        query: &Params,
        form: Option<&Params>,
    ) -> Result<String, Error> {
        let path = format!("/CMD_API_{command}");
        let url = self.base_url.join(&path)?;
        debug!(%method, command, acting = %self.acting_user, "invoking panel command");

        let mut request = self
            .http
            .request(method.clone(), url)
            .basic_auth(self.wire_login(), Some(self.password.expose_secret()));
        if !query.is_empty() {
            request = request.query(query.as_slice());
        }
        if let Some(form) = form {
            request = request.form(form.as_slice());
        }

        let response = request.send().await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let body = response.text().await?;

        if content_type.starts_with("text/html") {
            return Err(Error::Html {
                method: method.to_string(),
                path,
                text: strip_tags(&body),
            });
        }
        Ok(body)
    }

    /// Decode a URL-encoded body and reject error envelopes.
    ///
    /// An `error` key that is present, non-empty and not `"0"` marks a
    /// command failure regardless of the rest of the payload.
    fn unwrap_envelope(&self, command: &str, body: &str) -> Result<ResponseMap, Error> {
        let map = ResponseMap::parse(body);
        match map.get("error") {
            Some(code) if !code.is_empty() && code != "0" => Err(Error::CommandFailed {
                command: command.to_owned(),
                code: code.to_owned(),
                details: failure_details(map.get("details"), map.get("text")),
            }),
            _ => Ok(map),
        }
    }

    fn unwrap_json_envelope(
        &self,
        command: &str,
        body: &str,
    ) -> Result<serde_json::Value, Error> {
        let value: serde_json::Value =
            serde_json::from_str(body).map_err(|e| Error::Decode {
                message: e.to_string(),
                body: body.to_owned(),
            })?;
        let code = match value.get("error") {
            Some(serde_json::Value::String(s)) if !s.is_empty() && s != "0" => Some(s.clone()),
            Some(serde_json::Value::Number(n)) if n.as_i64() != Some(0) => Some(n.to_string()),
            _ => None,
        };
        if let Some(code) = code {
            let details = failure_details(
                value.get("details").and_then(serde_json::Value::as_str),
                value.get("text").and_then(serde_json::Value::as_str),
            );
            return Err(Error::CommandFailed {
                command: command.to_owned(),
                code,
                details,
            });
        }
        Ok(value)
    }
}

fn failure_details(details: Option<&str>, text: Option<&str>) -> String {
    match (details, text) {
        (Some(d), Some(t)) if !d.is_empty() && !t.is_empty() => format!("{d} ({t})"),
        (Some(d), _) if !d.is_empty() => d.to_owned(),
        (_, Some(t)) if !t.is_empty() => t.to_owned(),
        _ => "no details reported".to_owned(),
    }
}
