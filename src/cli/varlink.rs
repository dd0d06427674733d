// SPDX-License-Identifier: Apache-2.0

use std::path::Path;
use std::sync::{Arc, Mutex};

use netstate::{NetstateError, NetworkState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use crate::{config::Config, error::CliError, store::ProviderStore};

pub(crate) const DEFAULT_VARLINK_SOCKET: &str = "/run/netstate/netstate.so";

const INTERFACE_NAME: &str = "io.netstate";
const SERVICE_INTERFACE_NAME: &str = "org.varlink.service";
const MAX_MESSAGE_SIZE: usize = 1024 * 1024 * 10; // 10 MiB

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VarlinkRequest {
    method: String,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
    #[serde(default)]
    oneway: bool,
    #[serde(default)]
    more: bool,
    #[serde(default)]
    upgrade: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct VarlinkReply {
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    parameters: Value,
}

impl VarlinkReply {
    fn new(parameters: Value) -> Self {
        Self {
            error: None,
            parameters,
        }
    }
}

#[derive(Debug)]
enum VarlinkError {
    MethodNotFound(String),
    InvalidParameter(String),
    Netstate(NetstateError),
    Store(CliError),
}

impl From<NetstateError> for VarlinkError {
    fn from(e: NetstateError) -> Self {
        Self::Netstate(e)
    }
}

impl From<CliError> for VarlinkError {
    fn from(e: CliError) -> Self {
        Self::Store(e)
    }
}

impl From<VarlinkError> for VarlinkReply {
    fn from(e: VarlinkError) -> Self {
        let (error, parameters) = match e {
            VarlinkError::MethodNotFound(method) => (
                format!("{SERVICE_INTERFACE_NAME}.MethodNotFound"),
                serde_json::json!({ "method": method }),
            ),
            VarlinkError::InvalidParameter(parameter) => (
                format!("{SERVICE_INTERFACE_NAME}.InvalidParameter"),
                serde_json::json!({ "parameter": parameter }),
            ),
            VarlinkError::Netstate(e) => (
                format!("{INTERFACE_NAME}.{}", e.kind()),
                serde_json::json!({
                    "error_message": e.msg(),
                    "log": e.chain(),
                }),
            ),
            VarlinkError::Store(e) => (
                format!("{INTERFACE_NAME}.PluginFailure"),
                serde_json::json!({
                    "error_message": e.error_msg.clone(),
                    "log": [e.error_msg],
                }),
            ),
        };
        Self {
            error: Some(error),
            parameters,
        }
    }
}

/// Serve varlink clients of the persisted network state. Every call runs
/// on its own blocking thread while the store lock serializes changes.
#[derive(Debug)]
pub(crate) struct VarlinkService {
    store: Mutex<ProviderStore>,
    default_timeout: u32,
    verify_retry: (u32, u64),
}

impl VarlinkService {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            store: Mutex::new(ProviderStore::new(&config.provider.state_file)),
            default_timeout: config.apply.timeout,
            verify_retry: (
                config.apply.verify_retry_count,
                config.apply.verify_retry_interval_ms,
            ),
        }
    }

    // Return None for oneway call.
    fn handle_message(
        &self,
        data: &[u8],
    ) -> Result<Option<VarlinkReply>, CliError> {
        let request: VarlinkRequest = serde_json::from_slice(data)?;
        log::debug!("Got varlink call {}", request.method);
        if request.more || request.upgrade {
            log::warn!(
                "Ignoring unsupported more/upgrade flags of {}",
                request.method
            );
        }
        let params = request.parameters.unwrap_or_default();
        let reply = match self.call(&request.method, &params) {
            Ok(v) => VarlinkReply::new(v),
            Err(e) => {
                log::error!("Varlink call {} failed: {e:?}", request.method);
                VarlinkReply::from(e)
            }
        };
        Ok(if request.oneway { None } else { Some(reply) })
    }

    fn call(
        &self,
        method: &str,
        params: &Map<String, Value>,
    ) -> Result<Value, VarlinkError> {
        match method {
            "org.varlink.service.GetInfo" => {
                check_params(params, &[])?;
                Ok(serde_json::json!({
                    "vendor": "netstate",
                    "product": "netstatectl",
                    "version": env!("CARGO_PKG_VERSION"),
                    "url": "https://www.nmstate.io",
                    "interfaces": [SERVICE_INTERFACE_NAME, INTERFACE_NAME],
                }))
            }
            "io.netstate.Show" => self.show(params),
            "io.netstate.ShowRunningConfig" => self.show_running_config(params),
            "io.netstate.Apply" => self.apply(params),
            "io.netstate.Commit" => self.checkpoint_action(params, true),
            "io.netstate.Rollback" => self.checkpoint_action(params, false),
            _ => Err(VarlinkError::MethodNotFound(method.to_string())),
        }
    }

    fn lock_store(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, ProviderStore>, VarlinkError> {
        self.store.lock().map_err(|e| {
            VarlinkError::Store(CliError::from(format!(
                "Failed to acquire lock on state store: {e}"
            )))
        })
    }

    fn show(&self, params: &Map<String, Value>) -> Result<Value, VarlinkError> {
        check_params(params, &["include_status_data", "include_secrets"])?;
        let mut net_state = NetworkState::new();
        net_state
            .set_include_status_data(get_bool(
                params,
                "include_status_data",
                false,
            )?)
            .set_include_secrets(get_bool(params, "include_secrets", false)?);
        let mut provider = self.lock_store()?.load()?;
        net_state.retrieve(&mut provider)?;
        state_reply(&net_state)
    }

    fn show_running_config(
        &self,
        params: &Map<String, Value>,
    ) -> Result<Value, VarlinkError> {
        check_params(params, &["include_secrets"])?;
        let mut net_state = NetworkState::new();
        net_state
            .set_include_secrets(get_bool(params, "include_secrets", false)?);
        let mut provider = self.lock_store()?.load()?;
        net_state.retrieve_running_config(&mut provider)?;
        state_reply(&net_state)
    }

    fn apply(
        &self,
        params: &Map<String, Value>,
    ) -> Result<Value, VarlinkError> {
        check_params(
            params,
            &[
                "desired_state",
                "verify_change",
                "commit",
                "rollback_timeout",
                "save_to_disk",
                "kernel_only",
            ],
        )?;
        let mut desired: NetworkState = match params.get("desired_state") {
            Some(v) => serde_json::from_value(v.clone())
                .map_err(NetstateError::from)?,
            None => {
                return Err(VarlinkError::InvalidParameter(
                    "desired_state".to_string(),
                ));
            }
        };
        let timeout = match params.get("rollback_timeout") {
            Some(v) => v
                .as_u64()
                .and_then(|t| u32::try_from(t).ok())
                .ok_or_else(|| {
                    VarlinkError::InvalidParameter(
                        "rollback_timeout".to_string(),
                    )
                })?,
            None => self.default_timeout,
        };
        desired
            .set_verify_change(get_bool(params, "verify_change", true)?)
            .set_commit(get_bool(params, "commit", true)?)
            .set_memory_only(!get_bool(params, "save_to_disk", true)?)
            .set_kernel_only(get_bool(params, "kernel_only", false)?)
            .set_timeout(timeout)
            .set_verify_retry(self.verify_retry.0, self.verify_retry.1);

        let mut store = self.lock_store()?;
        let mut provider = store.load()?;
        let result = desired.apply(&mut provider);
        store.save(&provider)?;
        Ok(match result? {
            Some(checkpoint) => serde_json::json!({ "checkpoint": checkpoint }),
            None => serde_json::json!({}),
        })
    }

    fn checkpoint_action(
        &self,
        params: &Map<String, Value>,
        is_commit: bool,
    ) -> Result<Value, VarlinkError> {
        check_params(params, &["checkpoint"])?;
        let checkpoint = match params.get("checkpoint") {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(Value::Null) | None => None,
            Some(_) => {
                return Err(VarlinkError::InvalidParameter(
                    "checkpoint".to_string(),
                ))
            }
        };
        let mut store = self.lock_store()?;
        let mut provider = store.load()?;
        if is_commit {
            NetworkState::checkpoint_commit(&mut provider, checkpoint)?;
        } else {
            NetworkState::checkpoint_rollback(&mut provider, checkpoint)?;
        }
        store.save(&provider)?;
        Ok(serde_json::json!({}))
    }
}

fn state_reply(net_state: &NetworkState) -> Result<Value, VarlinkError> {
    let mut ret = Map::new();
    ret.insert(
        "state".to_string(),
        serde_json::to_value(net_state).map_err(NetstateError::from)?,
    );
    Ok(Value::Object(ret))
}

fn check_params(
    params: &Map<String, Value>,
    allowed: &[&str],
) -> Result<(), VarlinkError> {
    match params.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(k) => Err(VarlinkError::InvalidParameter(k.to_string())),
        None => Ok(()),
    }
}

fn get_bool(
    params: &Map<String, Value>,
    key: &str,
    default: bool,
) -> Result<bool, VarlinkError> {
    match params.get(key) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Null) | None => Ok(default),
        Some(_) => Err(VarlinkError::InvalidParameter(key.to_string())),
    }
}

pub(crate) fn ncl_varlink(
    matches: &clap::ArgMatches,
    config: &Config,
) -> Result<String, CliError> {
    let socket_path = matches
        .value_of("SOCKET")
        .unwrap_or(DEFAULT_VARLINK_SOCKET);
    let service = Arc::new(VarlinkService::new(config));
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(async move {
        let listener = bind_socket(socket_path).await?;
        log::info!("Varlink service listening on {socket_path}");
        serve(listener, service).await;
        Ok::<String, CliError>("".to_string())
    })
}

async fn bind_socket(socket_path: &str) -> Result<UnixListener, CliError> {
    let path = Path::new(socket_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    // Stale socket left by previous run
    if path.exists() {
        if UnixStream::connect(path).await.is_ok() {
            return Err(CliError::new(
                crate::error::EX_USAGE,
                format!("Varlink socket {socket_path} is already in use"),
            ));
        }
        std::fs::remove_file(path)?;
    }
    UnixListener::bind(path).map_err(|e| {
        CliError::from(format!(
            "Failed to bind UnixListener {socket_path}: {e}"
        ))
    })
}

async fn serve(listener: UnixListener, service: Arc<VarlinkService>) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let service = service.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        handle_client(service, stream, MAX_MESSAGE_SIZE).await
                    {
                        log::warn!("Varlink client connection closed: {e}");
                    }
                });
            }
            Err(e) => {
                log::warn!("Failed to accept varlink connection: {e}");
            }
        }
    }
}

// Each message is a JSON object terminated by NUL byte.
async fn handle_client(
    service: Arc<VarlinkService>,
    stream: UnixStream,
    max_size: usize,
) -> Result<(), CliError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    loop {
        let mut buf = Vec::new();
        let size = (&mut reader)
            .take(max_size as u64 + 1)
            .read_until(0, &mut buf)
            .await?;
        if size == 0 {
            log::debug!("Varlink client disconnected");
            return Ok(());
        }
        if buf.pop() != Some(0) {
            return Err(CliError::from(if size > max_size {
                format!("Varlink message exceeds {max_size} bytes")
            } else {
                "Incomplete varlink message without NUL terminator"
                    .to_string()
            }));
        }
        let svc = service.clone();
        let reply =
            tokio::task::spawn_blocking(move || svc.handle_message(&buf))
                .await
                .map_err(|e| {
                    CliError::from(format!("Varlink call aborted: {e}"))
                })??;
        if let Some(reply) = reply {
            let mut data = serde_json::to_vec(&reply)?;
            data.push(0);
            writer.write_all(&data).await?;
        }
    }
}
