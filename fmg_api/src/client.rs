//! FortiManager JSON-RPC API client.
//!
//! One `FmgClient` wraps one appliance endpoint: it owns the HTTP client,
//! the session cell, and the request-id counter. All API access goes
//! through [`FmgClient::request`], which builds the envelope, posts it,
//! checks the status code, and hands back the payload. The typed methods
//! below it are one-to-one wrappers over the FNDN 7.6.5 endpoints the tool
//! layer exposes; they only build parameter maps.
//!
//! The client is shared as `Arc<FmgClient>` and passed explicitly to
//! whatever needs it; there is no process-global connection handle.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use url::Url;

use crate::error::{FmgError, Result};
use crate::retry::{RetryConfig, execute_with_retry};
use crate::rpc::{self, Method};
use crate::task::TaskSource;
use crate::validation::sanitize_for_logging;

/// Authentication material for the appliance.
pub enum Auth {
    /// API token sent as a bearer header on every request.
    Token(String),
    /// Username/password exchanged for a session id at login.
    Credentials { username: String, password: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Token(_) => f.write_str("Auth::Token(***)"),
            Auth::Credentials { username, .. } => f
                .debug_struct("Auth::Credentials")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Builder for [`FmgClient`].
#[derive(Debug)]
pub struct FmgClientBuilder {
    host: String,
    auth: Option<Auth>,
    verify_tls: bool,
    request_timeout: Duration,
    login_retries: u32,
}

impl FmgClientBuilder {
    pub fn new(host: &str) -> Self {
        // Accept bare hostnames as well as pasted URLs.
        let host = host
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        Self {
            host,
            auth: None,
            verify_tls: true,
            request_timeout: Duration::from_secs(30),
            login_retries: 3,
        }
    }

    pub fn token(mut self, token: &str) -> Self {
        self.auth = Some(Auth::Token(token.to_string()));
        self
    }

    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.auth = Some(Auth::Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Disable TLS certificate verification (lab appliances with
    /// self-signed certificates).
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.verify_tls = !accept;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn login_retries(mut self, retries: u32) -> Self {
        self.login_retries = retries;
        self
    }

    pub fn build(self) -> Result<FmgClient> {
        if self.host.is_empty() {
            return Err(FmgError::Validation("host cannot be empty".to_string()));
        }
        let auth = self.auth.ok_or_else(|| {
            FmgError::Auth(
                "no authentication provided; set an API token or username/password".to_string(),
            )
        })?;

        let endpoint = Url::parse(&format!("https://{}/jsonrpc", self.host))
            .map_err(|e| FmgError::Validation(format!("invalid host {:?}: {e}", self.host)))?;

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!self.verify_tls)
            .timeout(self.request_timeout)
            .build()?;

        Ok(FmgClient {
            endpoint,
            auth,
            http,
            session: RwLock::new(None),
            connected: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            login_retries: self.login_retries,
        })
    }
}

/// Client for the FortiManager JSON-RPC API.
pub struct FmgClient {
    endpoint: Url,
    auth: Auth,
    http: reqwest::Client,
    session: RwLock<Option<String>>,
    connected: AtomicBool,
    next_id: AtomicU64,
    login_retries: u32,
}

impl std::fmt::Debug for FmgClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FmgClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("auth", &self.auth)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Coerce an endpoint payload into a list: the appliance returns an array
/// for collections but a bare object when exactly one entry matches.
fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Common `fields` / `filter` / `loadsub` query parameters.
fn list_params(
    fields: Option<Vec<String>>,
    filter: Option<Value>,
    loadsub: Option<i64>,
) -> Map<String, Value> {
    let mut params = Map::new();
    if let Some(loadsub) = loadsub {
        params.insert("loadsub".to_string(), json!(loadsub));
    }
    if let Some(fields) = fields {
        params.insert("fields".to_string(), json!(fields));
    }
    if let Some(filter) = filter {
        params.insert("filter".to_string(), filter);
    }
    params
}

impl FmgClient {
    pub fn builder(host: &str) -> FmgClientBuilder {
        FmgClientBuilder::new(host)
    }

    pub fn host(&self) -> &str {
        self.endpoint.host_str().unwrap_or_default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Authenticate against the appliance.
    ///
    /// Credentials are exchanged for a session id via `exec
    /// /sys/login/user`; token auth only probes `/sys/status` since the
    /// bearer header authenticates every request by itself. Login attempts
    /// are retried with backoff, everything after login is not.
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            tracing::warn!("client already connected to {}", self.host());
            return Ok(());
        }

        let retry = RetryConfig::default().with_max_retries(self.login_retries);
        match &self.auth {
            Auth::Credentials { username, password } => {
                let username = username.clone();
                let password = password.clone();
                let session =
                    execute_with_retry(&retry, || self.login(&username, &password)).await?;
                *self.session.write().await = Some(session);
            }
            Auth::Token(_) => {
                execute_with_retry(&retry, || async {
                    self.raw_request(Method::Get, "/sys/status", Map::new())
                        .await?
                        .into_data()
                })
                .await?;
            }
        }

        self.connected.store(true, Ordering::SeqCst);
        tracing::info!("connected to FortiManager at {}", self.host());
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<String> {
        let mut extra = Map::new();
        extra.insert(
            "data".to_string(),
            json!({"user": username, "passwd": password}),
        );

        let result = self
            .raw_request(Method::Exec, "/sys/login/user", extra)
            .await?;
        if result.code != 0 {
            return Err(FmgError::Auth(format!(
                "FortiManager login failed: {}",
                if result.message.is_empty() {
                    "login rejected"
                } else {
                    &result.message
                }
            )));
        }
        result
            .session
            .ok_or_else(|| FmgError::Auth("login response carried no session id".to_string()))
    }

    /// Log out and drop the session. Logout failures are logged, not
    /// surfaced; the session is cleared either way.
    pub async fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }

        let had_session = self.session.read().await.is_some();
        if had_session
            && let Err(err) = self
                .request(Method::Exec, "/sys/logout", Map::new())
                .await
        {
            tracing::warn!("logout failed: {err}");
        }

        *self.session.write().await = None;
        self.connected.store(false, Ordering::SeqCst);
        tracing::info!("disconnected from FortiManager at {}", self.host());
    }

    async fn raw_request(
        &self,
        method: Method,
        url: &str,
        extra: Map<String, Value>,
    ) -> Result<rpc::RpcResult> {
        let session = self.session.read().await.clone();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = rpc::build_request(id, method, url, extra, session.as_deref());

        tracing::debug!(
            method = method.as_str(),
            url,
            body = %sanitize_for_logging(&body),
            "JSON-RPC request"
        );

        let mut request = self.http.post(self.endpoint.clone()).json(&body);
        if let Auth::Token(token) = &self.auth {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FmgError::Connection(format!(
                "HTTP {status} from {}",
                self.endpoint
            )));
        }

        rpc::parse_response(response.json().await?)
    }

    /// Execute one JSON-RPC call and return its payload.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        extra: Map<String, Value>,
    ) -> Result<Value> {
        if !self.is_connected() {
            return Err(FmgError::Connection(
                "not connected; call connect() first".to_string(),
            ));
        }
        self.raw_request(method, url, extra).await?.into_data()
    }

    pub async fn get(&self, url: &str, extra: Map<String, Value>) -> Result<Value> {
        self.request(Method::Get, url, extra).await
    }

    pub async fn add(&self, url: &str, extra: Map<String, Value>) -> Result<Value> {
        self.request(Method::Add, url, extra).await
    }

    pub async fn set(&self, url: &str, extra: Map<String, Value>) -> Result<Value> {
        self.request(Method::Set, url, extra).await
    }

    pub async fn update(&self, url: &str, extra: Map<String, Value>) -> Result<Value> {
        self.request(Method::Update, url, extra).await
    }

    pub async fn delete(&self, url: &str, extra: Map<String, Value>) -> Result<Value> {
        self.request(Method::Delete, url, extra).await
    }

    pub async fn exec(&self, url: &str, extra: Map<String, Value>) -> Result<Value> {
        self.request(Method::Exec, url, extra).await
    }

    // ------------------------------------------------------------------
    // System
    // ------------------------------------------------------------------

    /// FNDN: GET /sys/status
    pub async fn get_system_status(&self) -> Result<Value> {
        self.get("/sys/status", Map::new()).await
    }

    /// FNDN: GET /sys/ha/status
    pub async fn get_ha_status(&self) -> Result<Value> {
        self.get("/sys/ha/status", Map::new()).await
    }

    // ------------------------------------------------------------------
    // DVMDB - device manager database
    // ------------------------------------------------------------------

    /// FNDN: GET /dvmdb/adom
    pub async fn list_adoms(
        &self,
        fields: Option<Vec<String>>,
        filter: Option<Value>,
    ) -> Result<Vec<Value>> {
        let params = list_params(fields, filter, Some(0));
        Ok(as_list(self.get("/dvmdb/adom", params).await?))
    }

    /// FNDN: GET /dvmdb/adom/{adom}
    pub async fn get_adom(&self, name: &str, loadsub: i64) -> Result<Value> {
        let params = list_params(None, None, Some(loadsub));
        self.get(&format!("/dvmdb/adom/{name}"), params).await
    }

    /// FNDN: GET /dvmdb/adom/{adom}/device
    pub async fn list_devices(
        &self,
        adom: &str,
        fields: Option<Vec<String>>,
        filter: Option<Value>,
    ) -> Result<Vec<Value>> {
        let params = list_params(fields, filter, Some(0));
        Ok(as_list(
            self.get(&format!("/dvmdb/adom/{adom}/device"), params).await?,
        ))
    }

    /// FNDN: GET /dvmdb/adom/{adom}/device/{device}
    pub async fn get_device(&self, adom: &str, device: &str, loadsub: i64) -> Result<Value> {
        let params = list_params(None, None, Some(loadsub));
        self.get(&format!("/dvmdb/adom/{adom}/device/{device}"), params)
            .await
    }

    /// FNDN: GET /dvmdb/adom/{adom}/device/{device}/vdom
    pub async fn list_device_vdoms(&self, adom: &str, device: &str) -> Result<Vec<Value>> {
        Ok(as_list(
            self.get(&format!("/dvmdb/adom/{adom}/device/{device}/vdom"), Map::new())
                .await?,
        ))
    }

    /// FNDN: GET /dvmdb/adom/{adom}/group
    pub async fn list_device_groups(&self, adom: &str) -> Result<Vec<Value>> {
        Ok(as_list(
            self.get(&format!("/dvmdb/adom/{adom}/group"), Map::new()).await?,
        ))
    }

    /// Connection/config sync status projection over the device list.
    pub async fn get_device_status(
        &self,
        adom: &str,
        device: Option<&str>,
    ) -> Result<Vec<Value>> {
        let fields = [
            "name",
            "ip",
            "sn",
            "conn_status",
            "conf_status",
            "db_status",
            "dev_status",
            "os_ver",
            "platform_str",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let filter = device.map(|name| json!(["name", "==", name]));
        self.list_devices(adom, Some(fields), filter).await
    }

    // ------------------------------------------------------------------
    // DVM commands
    // ------------------------------------------------------------------

    /// FNDN: EXEC /dvm/cmd/add/device
    pub async fn add_device(
        &self,
        adom: &str,
        device: Value,
        flags: Option<Vec<String>>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("device".to_string(), device);
        if let Some(flags) = flags {
            extra.insert("flags".to_string(), json!(flags));
        }
        self.exec("/dvm/cmd/add/device", extra).await
    }

    /// FNDN: EXEC /dvm/cmd/del/device
    pub async fn delete_device(
        &self,
        adom: &str,
        device: &str,
        flags: Option<Vec<String>>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("device".to_string(), json!(device));
        if let Some(flags) = flags {
            extra.insert("flags".to_string(), json!(flags));
        }
        self.exec("/dvm/cmd/del/device", extra).await
    }

    /// FNDN: EXEC /dvm/cmd/add/dev-list
    pub async fn add_device_list(
        &self,
        adom: &str,
        devices: Vec<Value>,
        flags: Option<Vec<String>>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("add-dev-list".to_string(), json!(devices));
        if let Some(flags) = flags {
            extra.insert("flags".to_string(), json!(flags));
        }
        self.exec("/dvm/cmd/add/dev-list", extra).await
    }

    /// FNDN: EXEC /dvm/cmd/del/dev-list
    pub async fn delete_device_list(
        &self,
        adom: &str,
        devices: Vec<Value>,
        flags: Option<Vec<String>>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("del-dev-member-list".to_string(), json!(devices));
        if let Some(flags) = flags {
            extra.insert("flags".to_string(), json!(flags));
        }
        self.exec("/dvm/cmd/del/dev-list", extra).await
    }

    /// FNDN: EXEC /dvm/cmd/reload/dev-list
    pub async fn reload_device_list(&self, adom: &str) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        self.exec("/dvm/cmd/reload/dev-list", extra).await
    }

    /// FNDN: UPDATE /dvmdb/adom/{adom}/device/{device}
    pub async fn update_device(&self, adom: &str, device: &str, data: Map<String, Value>) -> Result<Value> {
        self.update(&format!("/dvmdb/adom/{adom}/device/{device}"), data)
            .await
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// FNDN: GET /task/task
    pub async fn list_tasks(&self, filter: Option<Value>) -> Result<Vec<Value>> {
        let params = list_params(None, filter, None);
        Ok(as_list(self.get("/task/task", params).await?))
    }

    /// FNDN: GET /task/task/{task_id}
    pub async fn get_task(&self, task_id: i64) -> Result<Value> {
        self.get(&format!("/task/task/{task_id}"), Map::new()).await
    }

    /// FNDN: GET /task/task/{task_id}/line
    pub async fn get_task_lines(&self, task_id: i64) -> Result<Vec<Value>> {
        Ok(as_list(
            self.get(&format!("/task/task/{task_id}/line"), Map::new()).await?,
        ))
    }

    // ------------------------------------------------------------------
    // Security console - installation
    // ------------------------------------------------------------------

    /// FNDN: EXEC /securityconsole/install/package
    ///
    /// Returns `{"task": <id>}` for monitoring.
    pub async fn install_package(
        &self,
        adom: &str,
        pkg: &str,
        scope: Vec<Value>,
        flags: Option<Vec<String>>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("pkg".to_string(), json!(pkg));
        extra.insert("scope".to_string(), json!(scope));
        if let Some(flags) = flags {
            extra.insert("flags".to_string(), json!(flags));
        }
        self.exec("/securityconsole/install/package", extra).await
    }

    /// FNDN: EXEC /securityconsole/install/device
    pub async fn install_device(
        &self,
        adom: &str,
        scope: Vec<Value>,
        flags: Option<Vec<String>>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("scope".to_string(), json!(scope));
        if let Some(flags) = flags {
            extra.insert("flags".to_string(), json!(flags));
        }
        self.exec("/securityconsole/install/device", extra).await
    }

    /// FNDN: EXEC /securityconsole/install/preview
    pub async fn install_preview(
        &self,
        adom: &str,
        scope: Vec<Value>,
        flags: Option<Vec<String>>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("scope".to_string(), json!(scope));
        if let Some(flags) = flags {
            extra.insert("flags".to_string(), json!(flags));
        }
        self.exec("/securityconsole/install/preview", extra).await
    }

    /// FNDN: EXEC /securityconsole/preview/result
    pub async fn get_preview_result(&self, adom: &str, scope: Vec<Value>) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("scope".to_string(), json!(scope));
        self.exec("/securityconsole/preview/result", extra).await
    }

    // ------------------------------------------------------------------
    // Policy packages
    // ------------------------------------------------------------------

    /// FNDN: GET /pm/pkg/adom/{adom}
    pub async fn list_packages(&self, adom: &str, fields: Option<Vec<String>>) -> Result<Vec<Value>> {
        let params = list_params(fields, None, None);
        Ok(as_list(self.get(&format!("/pm/pkg/adom/{adom}"), params).await?))
    }

    /// FNDN: GET /pm/pkg/adom/{adom}/{pkg}
    pub async fn get_package(&self, adom: &str, pkg: &str, loadsub: i64) -> Result<Value> {
        let params = list_params(None, None, Some(loadsub));
        self.get(&format!("/pm/pkg/adom/{adom}/{pkg}"), params).await
    }

    /// FNDN: ADD /pm/pkg/adom/{adom}
    pub async fn create_package(
        &self,
        adom: &str,
        name: &str,
        package_settings: Option<Value>,
    ) -> Result<Value> {
        let mut data = Map::new();
        data.insert("name".to_string(), json!(name));
        data.insert("type".to_string(), json!("pkg"));
        if let Some(settings) = package_settings {
            data.insert("package settings".to_string(), settings);
        }
        let mut extra = Map::new();
        extra.insert("data".to_string(), Value::Object(data));
        self.add(&format!("/pm/pkg/adom/{adom}"), extra).await
    }

    /// FNDN: DELETE /pm/pkg/adom/{adom}/{pkg}
    pub async fn delete_package(&self, adom: &str, pkg: &str) -> Result<Value> {
        self.delete(&format!("/pm/pkg/adom/{adom}/{pkg}"), Map::new()).await
    }

    /// FNDN: EXEC /securityconsole/package/clone
    pub async fn clone_package(&self, adom: &str, pkg: &str, new_name: &str) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("pkg".to_string(), json!(pkg));
        extra.insert("new_name".to_string(), json!(new_name));
        self.exec("/securityconsole/package/clone", extra).await
    }

    /// FNDN: UPDATE /pm/pkg/adom/{adom}/{pkg} with scope member
    pub async fn assign_package(&self, adom: &str, pkg: &str, scope: Vec<Value>) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("scope member".to_string(), json!(scope));
        self.update(&format!("/pm/pkg/adom/{adom}/{pkg}"), extra).await
    }

    // ------------------------------------------------------------------
    // Firewall policies
    // ------------------------------------------------------------------

    fn policy_url(adom: &str, pkg: &str) -> String {
        format!("/pm/config/adom/{adom}/pkg/{pkg}/firewall/policy")
    }

    /// FNDN: GET /pm/config/adom/{adom}/pkg/{pkg}/firewall/policy
    pub async fn list_firewall_policies(
        &self,
        adom: &str,
        pkg: &str,
        fields: Option<Vec<String>>,
        filter: Option<Value>,
        range: Option<(i64, i64)>,
    ) -> Result<Vec<Value>> {
        let mut params = list_params(fields, filter, Some(0));
        if let Some((start, count)) = range {
            params.insert("range".to_string(), json!([start, count]));
        }
        Ok(as_list(self.get(&Self::policy_url(adom, pkg), params).await?))
    }

    /// FNDN: GET /pm/config/adom/{adom}/pkg/{pkg}/firewall/policy/{policyid}
    pub async fn get_firewall_policy(
        &self,
        adom: &str,
        pkg: &str,
        policyid: i64,
    ) -> Result<Value> {
        self.get(
            &format!("{}/{policyid}", Self::policy_url(adom, pkg)),
            list_params(None, None, Some(0)),
        )
        .await
    }

    /// Policy count via `option=count`.
    pub async fn get_firewall_policy_count(&self, adom: &str, pkg: &str) -> Result<i64> {
        let mut params = Map::new();
        params.insert("option".to_string(), json!(["count"]));
        let result = self.get(&Self::policy_url(adom, pkg), params).await?;
        Ok(result.as_i64().unwrap_or(0))
    }

    /// FNDN: ADD /pm/config/adom/{adom}/pkg/{pkg}/firewall/policy
    pub async fn create_firewall_policy(
        &self,
        adom: &str,
        pkg: &str,
        policy: Value,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("data".to_string(), policy);
        self.add(&Self::policy_url(adom, pkg), extra).await
    }

    /// FNDN: UPDATE /pm/config/adom/{adom}/pkg/{pkg}/firewall/policy/{policyid}
    pub async fn update_firewall_policy(
        &self,
        adom: &str,
        pkg: &str,
        policyid: i64,
        data: Map<String, Value>,
    ) -> Result<Value> {
        self.update(&format!("{}/{policyid}", Self::policy_url(adom, pkg)), data)
            .await
    }

    /// FNDN: DELETE /pm/config/adom/{adom}/pkg/{pkg}/firewall/policy/{policyid}
    pub async fn delete_firewall_policy(
        &self,
        adom: &str,
        pkg: &str,
        policyid: i64,
    ) -> Result<Value> {
        self.delete(&format!("{}/{policyid}", Self::policy_url(adom, pkg)), Map::new())
            .await
    }

    /// Bulk delete via a `policyid in (...)` filter.
    pub async fn delete_firewall_policies(
        &self,
        adom: &str,
        pkg: &str,
        policyids: Vec<i64>,
    ) -> Result<Value> {
        let mut filter = vec![json!("policyid"), json!("in")];
        filter.extend(policyids.into_iter().map(Value::from));
        let mut extra = Map::new();
        extra.insert("confirm".to_string(), json!(1));
        extra.insert("filter".to_string(), Value::Array(filter));
        self.delete(&Self::policy_url(adom, pkg), extra).await
    }

    /// FNDN: EXEC /securityconsole/move
    pub async fn move_firewall_policy(
        &self,
        adom: &str,
        pkg: &str,
        policyid: i64,
        target: i64,
        option: &str,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("pkg".to_string(), json!(pkg));
        extra.insert("policyid".to_string(), json!(policyid));
        extra.insert("target".to_string(), json!(target));
        extra.insert("option".to_string(), json!(option));
        self.exec("/securityconsole/move", extra).await
    }

    // ------------------------------------------------------------------
    // Firewall objects
    // ------------------------------------------------------------------

    fn object_url(adom: &str, kind: &str) -> String {
        format!("/pm/config/adom/{adom}/obj/{kind}")
    }

    /// Generic listing for one object table (`firewall/address`,
    /// `firewall/addrgrp`, `firewall/service/custom`, ...).
    pub async fn list_objects(
        &self,
        adom: &str,
        kind: &str,
        fields: Option<Vec<String>>,
        filter: Option<Value>,
    ) -> Result<Vec<Value>> {
        let params = list_params(fields, filter, None);
        Ok(as_list(self.get(&Self::object_url(adom, kind), params).await?))
    }

    pub async fn get_object(&self, adom: &str, kind: &str, name: &str) -> Result<Value> {
        self.get(&format!("{}/{name}", Self::object_url(adom, kind)), Map::new())
            .await
    }

    pub async fn create_object(&self, adom: &str, kind: &str, data: Value) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("data".to_string(), data);
        self.add(&Self::object_url(adom, kind), extra).await
    }

    pub async fn update_object(
        &self,
        adom: &str,
        kind: &str,
        name: &str,
        data: Map<String, Value>,
    ) -> Result<Value> {
        self.update(&format!("{}/{name}", Self::object_url(adom, kind)), data)
            .await
    }

    pub async fn delete_object(&self, adom: &str, kind: &str, name: &str) -> Result<Value> {
        self.delete(&format!("{}/{name}", Self::object_url(adom, kind)), Map::new())
            .await
    }

    // ------------------------------------------------------------------
    // Workspace mode (ADOM locking)
    // ------------------------------------------------------------------

    /// FNDN: EXEC /dvmdb/adom/{adom}/workspace/lock
    pub async fn lock_adom(&self, adom: &str) -> Result<Value> {
        self.exec(&format!("/dvmdb/adom/{adom}/workspace/lock"), Map::new()).await
    }

    /// FNDN: EXEC /dvmdb/adom/{adom}/workspace/unlock
    pub async fn unlock_adom(&self, adom: &str) -> Result<Value> {
        self.exec(&format!("/dvmdb/adom/{adom}/workspace/unlock"), Map::new())
            .await
    }

    /// FNDN: EXEC /dvmdb/adom/{adom}/workspace/commit
    pub async fn commit_adom(&self, adom: &str) -> Result<Value> {
        self.exec(&format!("/dvmdb/adom/{adom}/workspace/commit"), Map::new())
            .await
    }

    // ------------------------------------------------------------------
    // CLI scripts
    // ------------------------------------------------------------------

    /// FNDN: GET /dvmdb/adom/{adom}/script
    pub async fn list_scripts(
        &self,
        adom: &str,
        fields: Option<Vec<String>>,
        filter: Option<Value>,
    ) -> Result<Vec<Value>> {
        let params = list_params(fields, filter, None);
        Ok(as_list(self.get(&format!("/dvmdb/adom/{adom}/script"), params).await?))
    }

    /// FNDN: GET /dvmdb/adom/{adom}/script/{name}
    pub async fn get_script(&self, adom: &str, name: &str) -> Result<Value> {
        self.get(&format!("/dvmdb/adom/{adom}/script/{name}"), Map::new())
            .await
    }

    /// FNDN: ADD /dvmdb/adom/{adom}/script
    pub async fn create_script(&self, adom: &str, script: Value) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("data".to_string(), script);
        self.add(&format!("/dvmdb/adom/{adom}/script"), extra).await
    }

    /// FNDN: UPDATE /dvmdb/adom/{adom}/script/{name}
    pub async fn update_script(
        &self,
        adom: &str,
        name: &str,
        data: Map<String, Value>,
    ) -> Result<Value> {
        self.update(&format!("/dvmdb/adom/{adom}/script/{name}"), data).await
    }

    /// FNDN: DELETE /dvmdb/adom/{adom}/script/{name}
    pub async fn delete_script(&self, adom: &str, name: &str) -> Result<Value> {
        self.delete(&format!("/dvmdb/adom/{adom}/script/{name}"), Map::new())
            .await
    }

    /// FNDN: EXEC /dvmdb/adom/{adom}/script/execute
    ///
    /// Returns `{"task": <id>}` for monitoring.
    pub async fn execute_script(
        &self,
        adom: &str,
        script: &str,
        scope: Option<Vec<Value>>,
        package: Option<Value>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("script".to_string(), json!(script));
        if let Some(scope) = scope {
            extra.insert("scope".to_string(), json!(scope));
        }
        if let Some(package) = package {
            extra.insert("package".to_string(), package);
        }
        self.exec(&format!("/dvmdb/adom/{adom}/script/execute"), extra).await
    }

    /// FNDN: GET /dvmdb/adom/{adom}/script/log/latest[/device/{device}]
    pub async fn get_script_log_latest(&self, adom: &str, device: Option<&str>) -> Result<Value> {
        let url = match device {
            Some(device) => format!("/dvmdb/adom/{adom}/script/log/latest/device/{device}"),
            None => format!("/dvmdb/adom/{adom}/script/log/latest"),
        };
        self.get(&url, Map::new()).await
    }

    /// FNDN: GET /dvmdb/adom/{adom}/script/log/summary[/device/{device}]
    pub async fn get_script_log_summary(
        &self,
        adom: &str,
        device: Option<&str>,
    ) -> Result<Vec<Value>> {
        let url = match device {
            Some(device) => format!("/dvmdb/adom/{adom}/script/log/summary/device/{device}"),
            None => format!("/dvmdb/adom/{adom}/script/log/summary"),
        };
        Ok(as_list(self.get(&url, Map::new()).await?))
    }

    /// FNDN: GET /dvmdb/adom/{adom}/script/log/output/.../logid/{log_id}
    pub async fn get_script_log_output(
        &self,
        adom: &str,
        log_id: i64,
        device: Option<&str>,
    ) -> Result<Value> {
        let url = match device {
            Some(device) => {
                format!("/dvmdb/adom/{adom}/script/log/output/device/{device}/logid/{log_id}")
            }
            None => format!("/dvmdb/adom/{adom}/script/log/output/logid/{log_id}"),
        };
        self.get(&url, Map::new()).await
    }

    // ------------------------------------------------------------------
    // Provisioning templates
    // ------------------------------------------------------------------

    /// FNDN: GET /pm/template/adom/{adom}
    pub async fn list_templates(&self, adom: &str, fields: Option<Vec<String>>) -> Result<Vec<Value>> {
        let params = list_params(fields, None, None);
        Ok(as_list(self.get(&format!("/pm/template/adom/{adom}"), params).await?))
    }

    /// FNDN: GET /pm/template/adom/{adom}/{name}
    pub async fn get_template(&self, adom: &str, name: &str) -> Result<Value> {
        self.get(&format!("/pm/template/adom/{adom}/{name}"), Map::new()).await
    }

    /// FNDN: GET /pm/devprof/adom/{adom}
    pub async fn list_system_templates(
        &self,
        adom: &str,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<Value>> {
        let params = list_params(fields, None, None);
        Ok(as_list(self.get(&format!("/pm/devprof/adom/{adom}"), params).await?))
    }

    /// FNDN: GET /pm/devprof/adom/{adom}/{name}
    pub async fn get_system_template(&self, adom: &str, name: &str) -> Result<Value> {
        self.get(&format!("/pm/devprof/adom/{adom}/{name}"), Map::new()).await
    }

    /// FNDN: ADD /pm/devprof/adom/{adom}/{template}/scope member
    pub async fn assign_system_template(
        &self,
        adom: &str,
        template: &str,
        scope: Vec<Value>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("data".to_string(), json!(scope));
        self.add(&format!("/pm/devprof/adom/{adom}/{template}/scope member"), extra)
            .await
    }

    /// FNDN: DELETE /pm/devprof/adom/{adom}/{template}/scope member
    pub async fn unassign_system_template(
        &self,
        adom: &str,
        template: &str,
        scope: Vec<Value>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("data".to_string(), json!(scope));
        self.delete(&format!("/pm/devprof/adom/{adom}/{template}/scope member"), extra)
            .await
    }

    /// FNDN: GET /pm/config/adom/{adom}/obj/cli/template-group
    pub async fn list_cli_template_groups(
        &self,
        adom: &str,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<Value>> {
        self.list_objects(adom, "cli/template-group", fields, None).await
    }

    /// FNDN: GET /pm/config/adom/{adom}/obj/cli/template-group/{name}
    pub async fn get_cli_template_group(&self, adom: &str, name: &str) -> Result<Value> {
        self.get_object(adom, "cli/template-group", name).await
    }

    /// FNDN: ADD /pm/config/adom/{adom}/obj/cli/template-group
    pub async fn create_cli_template_group(&self, adom: &str, group: Value) -> Result<Value> {
        self.create_object(adom, "cli/template-group", group).await
    }

    /// FNDN: DELETE /pm/config/adom/{adom}/obj/cli/template-group/{name}
    pub async fn delete_cli_template_group(&self, adom: &str, name: &str) -> Result<Value> {
        self.delete_object(adom, "cli/template-group", name).await
    }

    /// FNDN: GET /pm/tmplgrp/adom/{adom}
    pub async fn list_template_groups(
        &self,
        adom: &str,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<Value>> {
        let params = list_params(fields, None, None);
        Ok(as_list(self.get(&format!("/pm/tmplgrp/adom/{adom}"), params).await?))
    }

    /// FNDN: GET /pm/tmplgrp/adom/{adom}/{name}
    pub async fn get_template_group(&self, adom: &str, name: &str) -> Result<Value> {
        self.get(&format!("/pm/tmplgrp/adom/{adom}/{name}"), Map::new()).await
    }

    /// FNDN: ADD /pm/tmplgrp/adom/{adom}
    pub async fn create_template_group(&self, adom: &str, group: Value) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("data".to_string(), group);
        self.add(&format!("/pm/tmplgrp/adom/{adom}"), extra).await
    }

    /// FNDN: ADD /pm/tmplgrp/adom/{adom}/{group}/scope member
    pub async fn assign_template_group(
        &self,
        adom: &str,
        group: &str,
        scope: Vec<Value>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("data".to_string(), json!(scope));
        self.add(&format!("/pm/tmplgrp/adom/{adom}/{group}/scope member"), extra)
            .await
    }

    /// FNDN: EXEC /securityconsole/template/validate
    ///
    /// Returns `{"task": <id>}` for monitoring.
    pub async fn validate_template(
        &self,
        adom: &str,
        pkg: &str,
        scope: Vec<Value>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("adom".to_string(), json!(adom));
        extra.insert("flag".to_string(), json!("json"));
        extra.insert("pkg".to_string(), json!(pkg));
        extra.insert("scope".to_string(), json!(scope));
        self.exec("/securityconsole/template/validate", extra).await
    }

    // ------------------------------------------------------------------
    // SD-WAN templates (wanprof)
    // ------------------------------------------------------------------

    /// FNDN: GET /pm/wanprof/adom/{adom}
    pub async fn list_sdwan_templates(
        &self,
        adom: &str,
        fields: Option<Vec<String>>,
    ) -> Result<Vec<Value>> {
        let params = list_params(fields, None, None);
        Ok(as_list(self.get(&format!("/pm/wanprof/adom/{adom}"), params).await?))
    }

    /// FNDN: GET /pm/wanprof/adom/{adom}/{name}
    pub async fn get_sdwan_template(&self, adom: &str, name: &str) -> Result<Value> {
        self.get(&format!("/pm/wanprof/adom/{adom}/{name}"), Map::new()).await
    }

    /// FNDN: ADD /pm/wanprof/adom/{adom}
    pub async fn create_sdwan_template(&self, adom: &str, template: Value) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("data".to_string(), template);
        self.add(&format!("/pm/wanprof/adom/{adom}"), extra).await
    }

    /// FNDN: DELETE /pm/wanprof/adom/{adom}/{name}
    pub async fn delete_sdwan_template(&self, adom: &str, name: &str) -> Result<Value> {
        self.delete(&format!("/pm/wanprof/adom/{adom}/{name}"), Map::new()).await
    }

    /// FNDN: ADD /pm/wanprof/adom/{adom}/{template}/scope member
    pub async fn assign_sdwan_template(
        &self,
        adom: &str,
        template: &str,
        scope: Vec<Value>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("data".to_string(), json!(scope));
        self.add(&format!("/pm/wanprof/adom/{adom}/{template}/scope member"), extra)
            .await
    }

    /// FNDN: DELETE /pm/wanprof/adom/{adom}/{template}/scope member
    pub async fn unassign_sdwan_template(
        &self,
        adom: &str,
        template: &str,
        scope: Vec<Value>,
    ) -> Result<Value> {
        let mut extra = Map::new();
        extra.insert("data".to_string(), json!(scope));
        self.delete(&format!("/pm/wanprof/adom/{adom}/{template}/scope member"), extra)
            .await
    }
}

#[async_trait]
impl TaskSource for FmgClient {
    async fn fetch_task(&self, task_id: i64) -> Result<Value> {
        self.get_task(task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_normalizes_host() {
        let builder = FmgClientBuilder::new("https://fmg.example.com/");
        assert_eq!(builder.host, "fmg.example.com");

        let builder = FmgClientBuilder::new("http://10.0.0.1");
        assert_eq!(builder.host, "10.0.0.1");
    }

    #[test]
    fn builder_requires_auth() {
        let err = FmgClientBuilder::new("fmg.example.com")
            .build()
            .expect_err("no auth configured");
        assert!(matches!(err, FmgError::Auth(_)));
    }

    #[test]
    fn builder_rejects_empty_host() {
        let err = FmgClientBuilder::new("")
            .token("t")
            .build()
            .expect_err("empty host");
        assert!(matches!(err, FmgError::Validation(_)));
    }

    #[test]
    fn built_client_starts_disconnected() {
        let client = FmgClient::builder("fmg.example.com")
            .credentials("admin", "secret")
            .build()
            .expect("builds");
        assert!(!client.is_connected());
        assert_eq!(client.host(), "fmg.example.com");
    }

    #[tokio::test]
    async fn request_requires_connection() {
        let client = FmgClient::builder("fmg.example.com")
            .token("token")
            .build()
            .expect("builds");
        let err = client
            .get("/sys/status", Map::new())
            .await
            .expect_err("not connected");
        assert!(matches!(err, FmgError::Connection(_)));
    }

    #[test]
    fn as_list_wraps_single_objects() {
        assert_eq!(as_list(Value::Null), Vec::<Value>::new());
        assert_eq!(as_list(json!([1, 2])).len(), 2);
        assert_eq!(as_list(json!({"name": "root"})).len(), 1);
    }

    #[test]
    fn list_params_skips_absent_fields() {
        let params = list_params(None, None, None);
        assert!(params.is_empty());

        let params = list_params(
            Some(vec!["name".to_string()]),
            Some(json!(["state", "==", "running"])),
            Some(1),
        );
        assert_eq!(params["fields"], json!(["name"]));
        assert_eq!(params["filter"], json!(["state", "==", "running"]));
        assert_eq!(params["loadsub"], json!(1));
    }

    #[test]
    fn auth_debug_masks_secrets() {
        let debug = format!(
            "{:?}",
            Auth::Credentials {
                username: "admin".to_string(),
                password: "hunter2".to_string(),
            }
        );
        assert!(!debug.contains("hunter2"));

        let debug = format!("{:?}", Auth::Token("sekrit-token".to_string()));
        assert!(!debug.contains("sekrit"));
    }
}
