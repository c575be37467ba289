use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::broadcast;

use folio_core::{DocumentName, FlatFileStore, Settings, SystemGit};
use folio_deploy::GitHubClient;

use crate::error::{io_err, SessionError};
use crate::outcome::Outcome;
use crate::paths::{folio_root, socket_path};
use crate::protocol::{SessionRequest, SessionResponse};
use crate::session::{Session, SessionDeps};

/// Start the session server for `site` and block the current thread until it exits.
pub fn start_blocking(site: &Path) -> Result<(), SessionError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(site.to_path_buf()))
}

/// Wire the production collaborators for `site` and serve until stopped.
pub async fn run(site: PathBuf) -> Result<(), SessionError> {
    let settings = Settings::load(&site)?;
    let client = GitHubClient::from_settings(&settings)?;
    if !client.is_authenticated() {
        tracing::warn!("no CI token configured; status requests are unauthenticated");
    }

    let deps = SessionDeps {
        store: Arc::new(FlatFileStore::new(settings.content_root(&site))),
        git: Arc::new(SystemGit::new(&site)),
        runs: Arc::new(client),
    };
    let session = Arc::new(Session::start(settings, deps).await?);
    serve(session, site).await
}

/// Fan-out stop signal shared by the listener, the ctrl-c watcher and `stop` requests.
#[derive(Clone)]
struct Shutdown(broadcast::Sender<()>);

impl Shutdown {
    fn new() -> Self {
        Self(broadcast::channel(4).0)
    }

    fn trigger(&self) {
        // No receivers left means everyone already stopped.
        let _ = self.0.send(());
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.0.subscribe()
    }
}

/// Serve `session` on the socket of `site` until a `stop` request or ctrl-c.
pub async fn serve(session: Arc<Session>, site: PathBuf) -> Result<(), SessionError> {
    ensure_session_dir(&site)?;
    let shutdown = Shutdown::new();

    let listener = tokio::spawn({
        let shutdown = shutdown.clone();
        let stopped = shutdown.subscribe();
        let session = session.clone();
        async move {
            let result = listen(&site, session, &shutdown, stopped).await;
            shutdown.trigger();
            result
        }
    });
    let ctrl_c = tokio::spawn(watch_ctrl_c(shutdown.clone(), shutdown.subscribe()));

    let (listener, ctrl_c) = tokio::join!(listener, ctrl_c);
    session.stop().await;

    joined("listener", listener)?;
    joined("ctrl-c", ctrl_c)
}

async fn watch_ctrl_c(
    shutdown: Shutdown,
    mut stopped: broadcast::Receiver<()>,
) -> Result<(), SessionError> {
    tokio::select! {
        _ = stopped.recv() => Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| io_err("ctrl-c handler", e))?;
            tracing::info!("ctrl-c received, stopping session");
            shutdown.trigger();
            Ok(())
        }
    }
}

async fn listen(
    site: &Path,
    session: Arc<Session>,
    shutdown: &Shutdown,
    mut stopped: broadcast::Receiver<()>,
) -> Result<(), SessionError> {
    let socket = socket_path(site);
    claim_socket(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    restrict_to_owner(&socket)?;
    tracing::info!(socket = %socket.display(), "session listening");

    let result = loop {
        let stream = tokio::select! {
            _ = stopped.recv() => break Ok(()),
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(err) => break Err(io_err(&socket, err)),
            },
        };
        let session = session.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_client(stream, &session, &shutdown).await {
                tracing::warn!(error = %err, "session client dropped");
            }
        });
    };

    if let Err(err) = fs::remove_file(&socket) {
        if err.kind() != ErrorKind::NotFound {
            tracing::warn!(socket = %socket.display(), error = %err, "could not remove session socket");
        }
    }
    result
}

async fn serve_client(
    stream: UnixStream,
    session: &Session,
    shutdown: &Shutdown,
) -> Result<(), SessionError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("session socket read", e))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (response, stop) = match serde_json::from_str::<SessionRequest>(line) {
            Ok(request) => {
                let stop = request.cmd == "stop";
                (dispatch(session, request, shutdown).await, stop)
            }
            Err(err) => (SessionResponse::error(format!("invalid request JSON: {err}")), false),
        };
        reply(&mut writer, &response).await?;
        if stop {
            break;
        }
    }
    Ok(())
}

async fn dispatch(
    session: &Session,
    request: SessionRequest,
    shutdown: &Shutdown,
) -> SessionResponse {
    tracing::debug!(cmd = %request.cmd, "session request");
    let result = match request.cmd.as_str() {
        "edit" => edit(session, request).await,
        "save" => session.save().await.map(outcome_payload),
        "publish" => session
            .publish(request.message.as_deref())
            .await
            .map(outcome_payload),
        "status" => session
            .status()
            .await
            .and_then(|status| Ok(serde_json::to_value(status)?)),
        "cancel" => Ok(match session.cancel().await {
            Some(outcome) => {
                let mut payload = outcome_payload(outcome);
                payload["cancelled"] = Value::Bool(true);
                payload
            }
            None => json!({ "cancelled": false }),
        }),
        "stop" => {
            shutdown.trigger();
            Ok(json!({ "stopping": true }))
        }
        other => return SessionResponse::error(format!("unknown command '{other}'")),
    };

    match result {
        Ok(data) => SessionResponse::ok(data),
        Err(err) => SessionResponse::error(err.to_string()),
    }
}

async fn edit(session: &Session, request: SessionRequest) -> Result<Value, SessionError> {
    let document = request
        .document
        .ok_or_else(|| SessionError::Protocol("edit requires 'document'".to_string()))?;
    let value = request
        .value
        .ok_or_else(|| SessionError::Protocol("edit requires 'value'".to_string()))?;
    let report = session.edit(DocumentName::from(document), value).await?;
    Ok(serde_json::to_value(report)?)
}

fn outcome_payload(outcome: Outcome) -> Value {
    let message = outcome.to_string();
    json!({ "outcome": outcome, "message": message })
}

/// Refuse a socket another session still answers on; clear one left by a crash.
fn claim_socket(socket: &Path) -> Result<(), SessionError> {
    if !socket.exists() {
        return Ok(());
    }
    if StdUnixStream::connect(socket).is_ok() {
        return Err(SessionError::Protocol(format!(
            "session socket already in use: {}",
            socket.display()
        )));
    }

    tracing::warn!(socket = %socket.display(), "removing stale session socket");
    match fs::remove_file(socket) {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(io_err(socket, err)),
        _ => Ok(()),
    }
}

fn ensure_session_dir(site: &Path) -> Result<(), SessionError> {
    let dir = folio_root(site);
    fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))
}

async fn reply(writer: &mut OwnedWriteHalf, response: &SessionResponse) -> Result<(), SessionError> {
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .await
        .map_err(|e| io_err("session socket write", e))
}

fn joined(
    task: &str,
    result: Result<Result<(), SessionError>, tokio::task::JoinError>,
) -> Result<(), SessionError> {
    result.map_err(|err| SessionError::Protocol(format!("{task} task failed: {err}")))?
}

/// Install the `tracing` subscriber; `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn restrict_to_owner(socket: &Path) -> Result<(), SessionError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(socket, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(socket, e))
}
