//! Language client that drives a `tach server` subprocess over stdio.

use std::fmt;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lsp_types::{
    ClientCapabilities, ClientInfo, InitializeParams, InitializeResult, InitializedParams,
    SetTraceParams, TraceValue, Uri, WorkspaceFolder,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::ClientError;
use super::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use super::lifecycle::{kill_child, terminate_child};
use super::reader::ReaderLoop;
use super::state::{SessionState, StateObserver, StateTracker, Subscription};
use super::transport::{MessageReader, MessageWriter};
use super::{CLIENT_TARGET, LanguageClient};
use crate::launcher::LaunchPlan;

/// Maximum number of stray responses tolerated while waiting for one request.
const MAX_RESPONSE_ITERATIONS: usize = 100;

type StdioWriter = Arc<Mutex<MessageWriter<BufWriter<ChildStdin>>>>;

struct Connection {
    child: Child,
    writer: StdioWriter,
    responses: Receiver<JsonRpcResponse>,
    stopping: Arc<AtomicBool>,
}

impl Connection {
    fn send(&self, payload: &[u8]) -> Result<(), ClientError> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        writer.send(payload)?;
        Ok(())
    }

    fn await_response(
        &self,
        method: &str,
        request_id: i64,
        timeout: Duration,
    ) -> Result<JsonRpcResponse, ClientError> {
        let deadline = Instant::now() + timeout;
        for _ in 0..MAX_RESPONSE_ITERATIONS {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.responses.recv_timeout(remaining) {
                Ok(response) if response.id == Some(request_id) => return Ok(response),
                Ok(response) => {
                    warn!(
                        target: CLIENT_TARGET,
                        expected = request_id,
                        received = ?response.id,
                        "skipping response with non-matching ID"
                    );
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ClientError::Timeout {
                        method: method.to_owned(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => return Err(ClientError::ProcessExited),
            }
        }

        warn!(
            target: CLIENT_TARGET,
            request_id,
            max_iterations = MAX_RESPONSE_ITERATIONS,
            "giving up on response after reaching maximum iterations"
        );
        Err(ClientError::MaxResponseIterations { request_id })
    }
}

/// [`LanguageClient`] backed by a child process speaking JSON-RPC on stdio.
///
/// The child receives exactly the environment in the launch spec. A reader
/// thread drains its stdout for the lifetime of the session and a second
/// thread forwards stderr to the output channel.
pub struct ProcessLanguageClient {
    plan: LaunchPlan,
    request_timeout: Duration,
    tracker: StateTracker,
    connection: Option<Connection>,
}

impl ProcessLanguageClient {
    /// Creates a stopped client for `plan`.
    #[must_use]
    pub fn new(plan: LaunchPlan, request_timeout: Duration) -> Self {
        Self {
            plan,
            request_timeout,
            tracker: StateTracker::new(),
            connection: None,
        }
    }

    /// Launch plan this client was built from.
    #[must_use]
    pub const fn plan(&self) -> &LaunchPlan {
        &self.plan
    }

    fn server(&self) -> &str {
        &self.plan.identity.name
    }

    fn launch(&self) -> Result<Connection, ClientError> {
        let spec = &self.plan.spec;
        debug!(
            target: CLIENT_TARGET,
            server = self.server(),
            command = %spec.command,
            args = ?spec.args,
            cwd = %spec.cwd,
            selector = ?self.plan.options.document_selector,
            "spawning language server process"
        );

        let mut child = Command::new(&spec.command)
            .args(&spec.args)
            .env_clear()
            .envs(&spec.env)
            .current_dir(spec.cwd.as_std_path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    ClientError::BinaryNotFound {
                        command: spec.command.clone(),
                        source: Arc::new(source),
                    }
                } else {
                    ClientError::SpawnFailed {
                        message: format!("failed to start {}", spec.command),
                        source: Arc::new(source),
                    }
                }
            })?;

        let Some((stdin, stdout, stderr)) = take_pipes(&mut child) else {
            kill_child(&mut child, self.server());
            return Err(ClientError::SpawnFailed {
                message: String::from("failed to capture stdio"),
                source: Arc::new(io::Error::other("missing pipe")),
            });
        };

        match self.spawn_threads(stdin, stdout, stderr) {
            Ok((writer, responses, stopping)) => {
                debug!(
                    target: CLIENT_TARGET,
                    server = self.server(),
                    pid = child.id(),
                    "language server process spawned"
                );
                Ok(Connection {
                    child,
                    writer,
                    responses,
                    stopping,
                })
            }
            Err(source) => {
                kill_child(&mut child, self.server());
                Err(ClientError::SpawnFailed {
                    message: String::from("failed to start reader threads"),
                    source: Arc::new(source),
                })
            }
        }
    }

    fn spawn_threads(
        &self,
        stdin: ChildStdin,
        stdout: ChildStdout,
        stderr: ChildStderr,
    ) -> io::Result<(StdioWriter, Receiver<JsonRpcResponse>, Arc<AtomicBool>)> {
        let writer = Arc::new(Mutex::new(MessageWriter::new(BufWriter::new(stdin))));
        let (responses_tx, responses_rx) = mpsc::channel();
        let stopping = Arc::new(AtomicBool::new(false));
        let channel = self.plan.options.output_channel.name.clone();

        let reader = ReaderLoop {
            server: self.server().to_owned(),
            channel: channel.clone(),
            reader: MessageReader::new(BufReader::new(stdout)),
            writer: Arc::clone(&writer),
            responses: responses_tx,
            tracker: self.tracker.clone(),
            stopping: Arc::clone(&stopping),
        };
        thread::Builder::new()
            .name(String::from("tach-lsp-reader"))
            .spawn(move || reader.run())?;
        thread::Builder::new()
            .name(String::from("tach-lsp-stderr"))
            .spawn(move || drain_stderr(stderr, &channel))?;

        Ok((writer, responses_rx, stopping))
    }

    fn request<R>(&self, method: &str, params: Option<Value>) -> Result<R, ClientError>
    where
        R: DeserializeOwned,
    {
        let connection = self.connection.as_ref().ok_or(ClientError::ProcessExited)?;
        let request = JsonRpcRequest::new(method, params);
        let request_id = request.id;
        debug!(target: CLIENT_TARGET, method, id = request_id, "sending request");
        connection.send(&serde_json::to_vec(&request)?)?;

        let response = connection.await_response(method, request_id, self.request_timeout)?;
        if let Some(error) = response.error {
            return Err(ClientError::from_jsonrpc(error));
        }
        Ok(serde_json::from_value(
            response.result.unwrap_or(Value::Null),
        )?)
    }

    fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ClientError> {
        let connection = self.connection.as_ref().ok_or(ClientError::ProcessExited)?;
        let notification = JsonRpcNotification::new(method, params);
        debug!(target: CLIENT_TARGET, method, "sending notification");
        connection.send(&serde_json::to_vec(&notification)?)
    }

    fn handshake(&self) -> Result<(), ClientError> {
        let params = serde_json::to_value(self.initialize_params()?)?;
        let result: InitializeResult = self.request("initialize", Some(params))?;
        debug!(
            target: CLIENT_TARGET,
            server = self.server(),
            server_info = ?result.server_info.map(|info| info.name),
            "language server initialised"
        );
        self.notify(
            "initialized",
            Some(serde_json::to_value(InitializedParams {})?),
        )
    }

    fn initialize_params(&self) -> Result<InitializeParams, ClientError> {
        let options = &self.plan.options.initialization_options;
        let workspace_folders: Vec<WorkspaceFolder> = options
            .settings
            .iter()
            .filter_map(|settings| workspace_folder(&settings.workspace))
            .collect();

        Ok(InitializeParams {
            process_id: Some(std::process::id()),
            initialization_options: Some(serde_json::to_value(options)?),
            capabilities: ClientCapabilities::default(),
            trace: Some(TraceValue::Off),
            workspace_folders: (!workspace_folders.is_empty()).then_some(workspace_folders),
            client_info: Some(ClientInfo {
                name: self.plan.identity.name.clone(),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
            ..InitializeParams::default()
        })
    }

    fn abort(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.stopping.store(true, Ordering::SeqCst);
            kill_child(&mut connection.child, &self.plan.identity.name);
        }
    }
}

impl LanguageClient for ProcessLanguageClient {
    fn start(&mut self) -> Result<(), ClientError> {
        if self.connection.is_some() {
            return Ok(());
        }

        self.tracker.transition(SessionState::Starting);
        match self.launch() {
            Ok(connection) => self.connection = Some(connection),
            Err(error) => {
                self.tracker.transition(SessionState::Stopped);
                return Err(error);
            }
        }

        if let Err(error) = self.handshake() {
            self.abort();
            self.tracker.transition(SessionState::Stopped);
            return Err(error);
        }

        if self
            .tracker
            .transition_from(SessionState::Starting, SessionState::Running)
        {
            Ok(())
        } else {
            self.abort();
            Err(ClientError::ProcessExited)
        }
    }

    fn stop(&mut self) -> Result<(), ClientError> {
        let Some(connection) = self.connection.as_ref() else {
            self.tracker.transition(SessionState::Stopped);
            return Ok(());
        };
        connection.stopping.store(true, Ordering::SeqCst);

        if let Err(error) = self.request::<Value>("shutdown", None) {
            debug!(
                target: CLIENT_TARGET,
                server = self.server(),
                operation = "shutdown",
                %error,
                "shutdown request failed"
            );
        }
        if let Err(error) = self.notify("exit", None) {
            debug!(
                target: CLIENT_TARGET,
                server = self.server(),
                operation = "exit",
                %error,
                "exit notification failed"
            );
        }

        if let Some(mut closing) = self.connection.take() {
            terminate_child(&mut closing.child, &self.plan.identity.name);
        }
        self.tracker.transition(SessionState::Stopped);
        Ok(())
    }

    fn set_trace(&mut self, level: TraceValue) -> Result<(), ClientError> {
        let params = serde_json::to_value(SetTraceParams { value: level })?;
        self.notify("$/setTrace", Some(params))
    }

    fn state(&self) -> SessionState {
        self.tracker.state()
    }

    fn on_state_change(&self, observer: StateObserver) -> Subscription {
        self.tracker.subscribe(observer)
    }
}

impl Drop for ProcessLanguageClient {
    fn drop(&mut self) {
        self.abort();
    }
}

impl fmt::Debug for ProcessLanguageClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessLanguageClient")
            .field("server", &self.plan.identity.name)
            .field("state", &self.tracker.state())
            .field(
                "pid",
                &self.connection.as_ref().map(|connection| connection.child.id()),
            )
            .finish()
    }
}

fn take_pipes(child: &mut Child) -> Option<(ChildStdin, ChildStdout, ChildStderr)> {
    Some((child.stdin.take()?, child.stdout.take()?, child.stderr.take()?))
}

fn drain_stderr(stderr: ChildStderr, channel: &str) {
    for line in BufReader::new(stderr).lines() {
        match line {
            Ok(text) => debug!(target: CLIENT_TARGET, channel, "{text}"),
            Err(error) => {
                debug!(target: CLIENT_TARGET, channel, %error, "stopped reading server stderr");
                break;
            }
        }
    }
}

fn workspace_folder(path: &camino::Utf8Path) -> Option<WorkspaceFolder> {
    match Uri::from_str(&format!("file://{path}")) {
        Ok(uri) => Some(WorkspaceFolder {
            uri,
            name: path.file_name().unwrap_or(path.as_str()).to_owned(),
        }),
        Err(error) => {
            debug!(target: CLIENT_TARGET, %path, %error, "workspace folder is not a valid URI");
            None
        }
    }
}
