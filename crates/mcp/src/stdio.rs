//! Stdio transport: drive a child process and exchange newline-delimited JSON-RPC over
//! its stdin/stdout. Used for attach channels to running provider instances.

use std::{
    collections::HashMap,
    process::Stdio,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use {
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        process::{Child, Command},
        sync::{Mutex, oneshot},
    },
    tracing::{debug, info, trace, warn},
};

use crate::{
    error::{Context, McpTransportError, Result},
    traits::McpTransport,
    types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse},
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<JsonRpcResponse>>>>;

/// Stdio-based transport for an MCP server reached through a child process.
pub struct StdioTransport {
    child: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    pending: PendingMap,
    next_id: AtomicU64,
    request_timeout: Duration,
    closed: AtomicBool,
    /// Handle to the reader task so we can abort on close.
    reader_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl StdioTransport {
    /// Spawn the process and start the reader loop.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        request_timeout: Duration,
    ) -> Result<Arc<Self>> {
        info!(
            command = %command,
            args = ?args,
            "spawning MCP stdio process"
        );

        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn MCP stdio process: {command}"))?;

        let stdin = child.stdin.take().context("failed to capture stdin")?;
        let stdout = child.stdout.take().context("failed to capture stdout")?;
        let stderr = child.stderr.take();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let transport = Arc::new(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            pending: Arc::clone(&pending),
            next_id: AtomicU64::new(1),
            request_timeout,
            closed: AtomicBool::new(false),
            reader_handle: Mutex::new(None),
        });

        if let Some(stderr) = stderr {
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr);
                let mut line = String::new();
                loop {
                    line.clear();
                    match reader.read_line(&mut line).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => {
                            let trimmed = line.trim();
                            if !trimmed.is_empty() {
                                warn!(stderr = %trimmed, "MCP stdio process stderr");
                            }
                        },
                    }
                }
            });
        }

        let handle = tokio::spawn(read_responses(stdout, pending));
        *transport.reader_handle.lock().await = Some(handle);
        Ok(transport)
    }

    fn ensure_open(&self, method: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(McpTransportError::Closed {
                method: method.to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn write_line(&self, payload: &str) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(payload.as_bytes()).await?;
        stdin.write_all(b"\n").await?;
        stdin.flush().await?;
        Ok(())
    }
}

/// Route each response line to the request waiting on its id.
async fn read_responses(stdout: tokio::process::ChildStdout, pending: PendingMap) {
    let mut reader = BufReader::new(stdout);
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("MCP stdio stdout closed");
                break;
            },
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!(raw = %trimmed, "MCP server -> client");

                match serde_json::from_str::<JsonRpcResponse>(trimmed) {
                    Ok(resp) => {
                        let key = resp.id.to_string();
                        let mut map = pending.lock().await;
                        if let Some(tx) = map.remove(&key) {
                            let _ = tx.send(resp);
                        } else {
                            warn!(id = %key, "received response for unknown request id");
                        }
                    },
                    Err(e) => {
                        debug!(error = %e, line = %trimmed, "MCP server sent non-response line");
                    },
                }
            },
            Err(e) => {
                warn!(error = %e, "error reading from MCP stdio stdout");
                break;
            },
        }
    }
    // Dropping the senders wakes every waiter with a closed-channel error.
    pending.lock().await.clear();
}

#[async_trait::async_trait]
impl McpTransport for StdioTransport {
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse> {
        self.ensure_open(method)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let req = JsonRpcRequest::new(id, method, params);
        let id_key = req.id.to_string();

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id_key.clone(), tx);

        let payload = serde_json::to_string(&req)?;
        debug!(method = %method, id = %id, "client -> MCP server");

        if let Err(e) = self.write_line(&payload).await {
            self.pending.lock().await.remove(&id_key);
            return Err(e);
        }

        let resp = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(_)) => {
                return Err(McpTransportError::Closed {
                    method: method.to_string(),
                }
                .into());
            },
            Err(_) => {
                self.pending.lock().await.remove(&id_key);
                return Err(crate::Error::message(format!(
                    "MCP request '{method}' timed out after {}s (no response from server)",
                    self.request_timeout.as_secs()
                )));
            },
        };

        if let Some(ref err) = resp.error {
            return Err(McpTransportError::Rpc {
                method: method.to_string(),
                code: err.code,
                message: err.message.clone(),
            }
            .into());
        }

        Ok(resp)
    }

    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<()> {
        self.ensure_open(method)?;
        let payload = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        trace!(method = %method, "client -> MCP server (notification)");
        self.write_line(&payload).await
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }
        let mut child = self.child.lock().await;
        let _ = child.kill().await;
    }
}
