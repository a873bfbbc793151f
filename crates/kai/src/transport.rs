//! Background worker that owns the hub socket.
//!
//! Architecture: one OS thread running a single-threaded tokio runtime.
//! - The worker owns the socket; nothing else writes to it
//! - Callers send requests through an unbounded mpsc channel
//! - Inbound frames go to the shared [`Session`] under its lock, and the
//!   requests it returns are written before the next frame is read
//!
//! The connect loop waits a fixed delay between attempts. By default it never
//! gives up and never times out the authentication handshake; both limits
//! come from [`HubConfig`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use anyhow::Result;
use kaiconf::{HubConfig, RetryPolicy};
use kaiproto::Outbound;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace, warn};

use crate::dispatch::EventQueue;
use crate::session::{ConnectionState, Credentials, Session};
use crate::ws::{self, WsMessage, WsReader, WsWriter};
use crate::SdkError;

/// Command sent to the worker
enum WorkerCommand {
    /// Write a request to the socket
    Send(Outbound),
    /// Close the socket and exit
    Shutdown,
}

/// How a served connection ended.
enum Served {
    Lost,
    /// The hub never confirmed authentication; counts as a failed attempt.
    HandshakeTimedOut,
    Shutdown,
}

pub(crate) fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

struct WorkerContext {
    endpoint: String,
    retry: RetryPolicy,
    handshake_timeout: Option<std::time::Duration>,
    credentials: Credentials,
    session: Arc<Mutex<Session>>,
    queue: Arc<EventQueue>,
}

impl WorkerContext {
    fn set_state(&self, state: ConnectionState) {
        lock_session(&self.session).set_state(state);
    }
}

/// Handle to the running worker thread.
pub(crate) struct Worker {
    cmd_tx: mpsc::UnboundedSender<WorkerCommand>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(
        config: &HubConfig,
        credentials: Credentials,
        session: Arc<Mutex<Session>>,
        queue: Arc<EventQueue>,
    ) -> Result<Self, SdkError> {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let ctx = WorkerContext {
            endpoint: config.endpoint.clone(),
            retry: config.retry_policy(),
            handshake_timeout: config.handshake_timeout(),
            credentials,
            session,
            queue,
        };

        let thread = std::thread::Builder::new()
            .name("kai-worker".to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build();
                match runtime {
                    Ok(runtime) => runtime.block_on(run_worker(ctx, cmd_rx)),
                    Err(e) => {
                        warn!("kai worker could not start its runtime: {}", e);
                        ctx.set_state(ConnectionState::Disconnected);
                    }
                }
            })
            .map_err(SdkError::WorkerSpawn)?;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    /// Queue a request for the socket. Dropped with a log line if the worker
    /// has already exited.
    pub fn send(&self, msg: Outbound) {
        let kind = msg.type_name();
        if self.cmd_tx.send(WorkerCommand::Send(msg)).is_err() {
            debug!("worker gone, dropping {}", kind);
        }
    }

    /// Close the socket and block until the worker thread has exited.
    pub fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(WorkerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("kai worker panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_worker(ctx: WorkerContext, mut cmd_rx: mpsc::UnboundedReceiver<WorkerCommand>) {
    info!("kai worker started for {}", ctx.endpoint);
    let mut failures: u32 = 0;

    loop {
        ctx.set_state(ConnectionState::Connecting);

        let failed = match ws::connect(&ctx.endpoint).await {
            Ok((mut writer, mut reader)) => {
                info!("connected to {}", ctx.endpoint);
                match serve(&ctx, &mut writer, &mut reader, &mut cmd_rx).await {
                    Served::Shutdown => break,
                    Served::Lost => {
                        info!("connection to {} lost", ctx.endpoint);
                        failures = 0;
                        false
                    }
                    Served::HandshakeTimedOut => true,
                }
            }
            Err(e) => {
                debug!("connect to {} failed: {:#}", ctx.endpoint, e);
                true
            }
        };

        if failed {
            failures = failures.saturating_add(1);
            if !ctx.retry.should_retry(failures) {
                warn!(
                    "giving up on {} after {} failed attempt(s)",
                    ctx.endpoint, failures
                );
                break;
            }
        }

        ctx.set_state(ConnectionState::Connecting);
        if !wait_for_retry(ctx.retry, &mut cmd_rx).await {
            break;
        }
    }

    ctx.set_state(ConnectionState::Disconnected);
    info!("kai worker exiting");
}

/// Sleep out the retry delay. Returns `false` if asked to shut down.
async fn wait_for_retry(
    retry: RetryPolicy,
    cmd_rx: &mut mpsc::UnboundedReceiver<WorkerCommand>,
) -> bool {
    let deadline = Instant::now() + retry.delay;
    loop {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => match cmd {
                Some(WorkerCommand::Send(msg)) => {
                    debug!("not connected, dropping {}", msg.type_name());
                }
                Some(WorkerCommand::Shutdown) | None => return false,
            },

            _ = sleep_until(deadline) => return true,
        }
    }
}

async fn send(writer: &mut WsWriter, msg: &Outbound) -> Result<()> {
    trace!("-> {:?}", msg);
    writer.send_text(msg.to_text()).await
}

async fn serve(
    ctx: &WorkerContext,
    writer: &mut WsWriter,
    reader: &mut WsReader,
    cmd_rx: &mut mpsc::UnboundedReceiver<WorkerCommand>,
) -> Served {
    let auth = lock_session(&ctx.session).on_connected(&ctx.credentials);
    if let Err(e) = send(writer, &auth).await {
        warn!("{:#}", e);
        return Served::Lost;
    }

    let handshake_deadline = ctx.handshake_timeout.map(|t| Instant::now() + t);

    loop {
        let awaiting_auth =
            handshake_deadline.is_some() && !lock_session(&ctx.session).is_authenticated();

        tokio::select! {
            // Local commands first so shutdown isn't starved by a chatty hub
            biased;

            cmd = cmd_rx.recv() => match cmd {
                Some(WorkerCommand::Send(msg)) => {
                    if let Err(e) = send(writer, &msg).await {
                        warn!("{:#}", e);
                        return Served::Lost;
                    }
                }
                Some(WorkerCommand::Shutdown) | None => {
                    if let Err(e) = writer.close().await {
                        debug!("{:#}", e);
                    }
                    return Served::Shutdown;
                }
            },

            msg = reader.recv() => match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    trace!("<- {}", text);
                    let replies = lock_session(&ctx.session).handle_frame(&text, &ctx.queue);
                    for reply in &replies {
                        if let Err(e) = send(writer, reply).await {
                            warn!("{:#}", e);
                            return Served::Lost;
                        }
                    }
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    if let Err(e) = writer.send_pong(data).await {
                        warn!("{:#}", e);
                        return Served::Lost;
                    }
                }
                Some(Ok(WsMessage::Pong)) => trace!("<- pong"),
                Some(Ok(WsMessage::Binary(data))) => {
                    debug!("ignoring {} byte binary frame", data.len());
                }
                Some(Ok(WsMessage::Close { code, reason })) => {
                    info!("hub closed the connection ({} {})", code, reason);
                    return Served::Lost;
                }
                Some(Err(e)) => {
                    warn!("{:#}", e);
                    return Served::Lost;
                }
                None => return Served::Lost,
            },

            _ = sleep_until(handshake_deadline.unwrap_or_else(Instant::now)), if awaiting_auth => {
                warn!("hub did not authenticate within {:?}", ctx.handshake_timeout);
                return Served::HandshakeTimedOut;
            }
        }
    }
}
