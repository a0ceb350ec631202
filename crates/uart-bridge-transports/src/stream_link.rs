// Copyright 2025 uart-bridge contributors
// SPDX-License-Identifier: Apache-2.0

//! Stream socket stand-in for the wireless link
//!
//! A TCP listener plays the role of the radio: one peer may be connected at a
//! time, each connection gets a fresh [`SessionHandle`], and everything the
//! peer does is reported through a [`SessionAdapter`].
//!
//! # Threads
//! - `link-accept`: accepts peers, rejecting extras while a session is open
//! - `link-reader`: one per session, forwards inbound bytes
//! - `link-writer`: performs the coordinator's writes and reports completion
//!
//! # Congestion
//! A write that cannot finish within `write_timeout` completes with the bytes
//! that did go out and `congested = true`. After `congestion_backoff` the
//! writer signals that the link is clear again.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, trace, warn};
use uart_bridge_config::WirelessConfig;
use uart_bridge_core::QueueError;
use uart_bridge_hal::{LinkError, PeerAddress, SessionHandle, WirelessLink};

use crate::error::{TransportError, TransportResult};
use crate::session_adapter::SessionAdapter;

/// How often idle threads check for shutdown
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Stream link settings
#[derive(Debug, Clone)]
pub struct StreamLinkConfig {
    pub listen_address: String,
    pub device_name: String,
    pub write_timeout: Duration,
    pub congestion_backoff: Duration,
    /// Largest single write; `None` lets the coordinator send its whole buffer
    pub max_write_size: Option<usize>,
}

impl From<&WirelessConfig> for StreamLinkConfig {
    fn from(config: &WirelessConfig) -> Self {
        Self {
            listen_address: config.listen_address.clone(),
            device_name: config.device_name.clone(),
            write_timeout: config.write_timeout(),
            congestion_backoff: config.congestion_backoff(),
            max_write_size: None,
        }
    }
}

struct ActivePeer {
    handle: SessionHandle,
    stream: TcpStream,
}

struct Shared {
    active: Mutex<Option<ActivePeer>>,
    /// Session whose write is still being performed
    in_flight: Mutex<Option<SessionHandle>>,
    /// Orders completion reports against session close; never taken by the coordinator
    reporting: Mutex<()>,
    next_handle: AtomicU32,
    shutdown: AtomicBool,
}

impl Shared {
    fn allocate_handle(&self) -> SessionHandle {
        loop {
            let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
            if let Some(handle) = SessionHandle::new(raw) {
                return handle;
            }
        }
    }

    fn new() -> Self {
        Self {
            active: Mutex::new(None),
            in_flight: Mutex::new(None),
            reporting: Mutex::new(()),
            next_handle: AtomicU32::new(1),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Writable clone of the peer's stream; `Ok(None)` once `handle` is no longer the session
    fn stream_for(&self, handle: SessionHandle) -> io::Result<Option<TcpStream>> {
        match self.active.lock().as_ref() {
            Some(peer) if peer.handle == handle => peer.stream.try_clone().map(Some),
            _ => Ok(None),
        }
    }

    /// Shut the session's socket down so its reader closes the session
    fn disconnect(&self, handle: SessionHandle) {
        if let Some(peer) = self.active.lock().as_ref().filter(|peer| peer.handle == handle) {
            let _ = peer.stream.shutdown(Shutdown::Both);
        }
    }

    fn is_active(&self, handle: SessionHandle) -> bool {
        self.active
            .lock()
            .as_ref()
            .is_some_and(|peer| peer.handle == handle)
    }

    fn finish_write(&self, handle: SessionHandle) {
        let mut in_flight = self.in_flight.lock();
        if *in_flight == Some(handle) {
            *in_flight = None;
        }
    }
}

struct WriteJob {
    handle: SessionHandle,
    bytes: Vec<u8>,
}

/// Write half handed to the coordinator
pub struct StreamLink {
    shared: Arc<Shared>,
    jobs: Sender<WriteJob>,
    max_write_size: Option<usize>,
}

/// Owns the link's threads; stopping it ends every session
pub struct StreamLinkService {
    shared: Arc<Shared>,
    local_addr: SocketAddr,
    threads: Vec<JoinHandle<()>>,
}

impl StreamLink {
    /// Bind the listener and start the accept and writer threads
    pub fn bind(
        config: StreamLinkConfig,
        adapter: SessionAdapter,
    ) -> TransportResult<(StreamLink, StreamLinkService)> {
        let listener =
            TcpListener::bind(&config.listen_address).map_err(|source| TransportError::BindFailed {
                address: config.listen_address.clone(),
                source,
            })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        let shared = Arc::new(Shared::new());
        let (jobs_tx, jobs_rx) = channel::unbounded();

        let accept = {
            let shared = Arc::clone(&shared);
            let adapter = adapter.clone();
            thread::Builder::new()
                .name("link-accept".to_string())
                .spawn(move || accept_loop(listener, shared, adapter))?
        };
        let writer = {
            let shared = Arc::clone(&shared);
            let config = config.clone();
            thread::Builder::new()
                .name("link-writer".to_string())
                .spawn(move || writer_loop(jobs_rx, shared, adapter, config))?
        };

        info!(
            "wireless link '{}' listening on {}",
            config.device_name, local_addr
        );

        Ok((
            StreamLink {
                shared: Arc::clone(&shared),
                jobs: jobs_tx,
                max_write_size: config.max_write_size,
            },
            StreamLinkService {
                shared,
                local_addr,
                threads: vec![accept, writer],
            },
        ))
    }
}

impl WirelessLink for StreamLink {
    fn write(&mut self, handle: SessionHandle, data: &[u8]) -> Result<(), LinkError> {
        if self.shared.shutdown.load(Ordering::Relaxed) {
            return Err(LinkError::Closed);
        }
        match self.shared.active.lock().as_ref() {
            None => return Err(LinkError::NoSession),
            Some(peer) if peer.handle != handle => {
                return Err(LinkError::StaleHandle {
                    expected: peer.handle,
                    got: handle,
                })
            }
            Some(_) => {}
        }

        {
            let mut in_flight = self.shared.in_flight.lock();
            if *in_flight == Some(handle) {
                return Err(LinkError::WriteInFlight);
            }
            *in_flight = Some(handle);
        }

        let job = WriteJob {
            handle,
            bytes: data.to_vec(),
        };
        self.jobs.send(job).map_err(|_| {
            self.shared.finish_write(handle);
            LinkError::Closed
        })
    }

    fn max_write_size(&self) -> Option<usize> {
        self.max_write_size
    }
}

impl StreamLinkService {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle of the connected peer, if any
    pub fn active_session(&self) -> Option<SessionHandle> {
        self.shared.active.lock().as_ref().map(|peer| peer.handle)
    }

    /// Disconnect the peer and stop all link threads
    pub fn stop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Relaxed);
        if let Some(peer) = self.shared.active.lock().as_ref() {
            let _ = peer.stream.shutdown(Shutdown::Both);
        }
        for handle in self.threads.drain(..) {
            if let Err(e) = handle.join() {
                error!("wireless link thread panicked: {:?}", e);
            }
        }
    }
}

impl Drop for StreamLinkService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(listener: TcpListener, shared: Arc<Shared>, adapter: SessionAdapter) {
    let mut readers: Vec<JoinHandle<()>> = Vec::new();

    while !shared.shutdown.load(Ordering::Relaxed) {
        let (stream, addr) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            Err(e) => {
                warn!("accept failed: {}", e);
                thread::sleep(POLL_INTERVAL);
                continue;
            }
        };
        readers.retain(|reader| !reader.is_finished());

        match open_session(&stream, addr, &shared) {
            Ok(Some(handle)) => {
                if adapter
                    .on_session_opened(handle, PeerAddress::Socket(addr))
                    .is_err()
                {
                    debug!("bridge gone, closing link");
                    close_session(&shared, &adapter, handle);
                    break;
                }
                let shared = Arc::clone(&shared);
                let adapter = adapter.clone();
                let spawned = thread::Builder::new()
                    .name(format!("link-reader-{}", handle))
                    .spawn(move || reader_loop(stream, handle, shared, adapter));
                match spawned {
                    Ok(reader) => readers.push(reader),
                    Err(e) => error!("failed to spawn reader for session {}: {}", handle, e),
                }
            }
            Ok(None) => {
                warn!("rejecting peer {}: a session is already open", addr);
                let _ = stream.shutdown(Shutdown::Both);
            }
            Err(e) => {
                warn!("failed to set up peer {}: {}", addr, e);
            }
        }
    }

    for reader in readers {
        let _ = reader.join();
    }
    debug!("link accept loop stopped");
}

/// Register `stream` as the active peer unless one is already connected
fn open_session(
    stream: &TcpStream,
    addr: SocketAddr,
    shared: &Shared,
) -> io::Result<Option<SessionHandle>> {
    let mut active = shared.active.lock();
    if active.is_some() {
        return Ok(None);
    }
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    stream.set_read_timeout(Some(POLL_INTERVAL))?;
    let handle = shared.allocate_handle();
    *active = Some(ActivePeer {
        handle,
        stream: stream.try_clone()?,
    });
    trace!("peer {} assigned session {}", addr, handle);
    Ok(Some(handle))
}

fn close_session(shared: &Shared, adapter: &SessionAdapter, handle: SessionHandle) {
    let _gate = shared.reporting.lock();
    {
        let mut active = shared.active.lock();
        if active.as_ref().is_some_and(|peer| peer.handle == handle) {
            if let Some(peer) = active.take() {
                let _ = peer.stream.shutdown(Shutdown::Both);
            }
        }
    }
    shared.finish_write(handle);
    let _ = adapter.on_session_closed(handle);
}

fn reader_loop(
    mut stream: TcpStream,
    handle: SessionHandle,
    shared: Arc<Shared>,
    adapter: SessionAdapter,
) {
    let mut buffer = vec![0u8; adapter.max_inbound_size()];

    while !shared.shutdown.load(Ordering::Relaxed) {
        match stream.read(&mut buffer) {
            Ok(0) => {
                debug!("peer closed session {}", handle);
                break;
            }
            Ok(n) => {
                trace!("received {} bytes on session {}", n, handle);
                if adapter.on_data(&buffer[..n]).is_err() {
                    break;
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("read on session {} failed: {}", handle, e);
                break;
            }
        }
    }

    close_session(&shared, &adapter, handle);
}

/// Outcome of pushing one job to the socket
#[derive(Debug)]
enum WriteOutcome {
    Complete,
    /// Timed out after `written` bytes
    Congested { written: usize },
    Failed(io::Error),
}

fn write_all_or_timeout<W: Write>(writer: &mut W, data: &[u8]) -> WriteOutcome {
    let mut written = 0;
    while written < data.len() {
        match writer.write(&data[written..]) {
            Ok(0) => return WriteOutcome::Failed(ErrorKind::WriteZero.into()),
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return WriteOutcome::Congested { written };
            }
            Err(e) => return WriteOutcome::Failed(e),
        }
    }
    WriteOutcome::Complete
}

fn writer_loop(
    jobs: Receiver<WriteJob>,
    shared: Arc<Shared>,
    adapter: SessionAdapter,
    config: StreamLinkConfig,
) {
    while !shared.shutdown.load(Ordering::Relaxed) {
        let job = match jobs.recv_timeout(POLL_INTERVAL) {
            Ok(job) => job,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let Some(outcome) = perform_write(shared.stream_for(job.handle), &config, &job) else {
            debug!(
                "dropping {} byte write for closed session {}",
                job.bytes.len(),
                job.handle
            );
            shared.finish_write(job.handle);
            continue;
        };
        shared.finish_write(job.handle);

        if report_outcome(&shared, &adapter, &config, &job, outcome).is_err() {
            break;
        }
    }
    debug!("link writer stopped");
}

/// Write `job` to the session's stream; `None` when the session is gone
///
/// A stream that cannot be cloned for a live session counts as a failed write.
fn perform_write(
    stream: io::Result<Option<TcpStream>>,
    config: &StreamLinkConfig,
    job: &WriteJob,
) -> Option<WriteOutcome> {
    match stream {
        Ok(Some(mut stream)) => {
            if let Err(e) = stream.set_write_timeout(Some(config.write_timeout)) {
                warn!("failed to set write timeout: {}", e);
            }
            Some(write_all_or_timeout(&mut stream, &job.bytes))
        }
        Ok(None) => None,
        Err(e) => Some(WriteOutcome::Failed(e)),
    }
}

/// Report a finished write unless its session closed in the meantime
fn report_outcome(
    shared: &Shared,
    adapter: &SessionAdapter,
    config: &StreamLinkConfig,
    job: &WriteJob,
    outcome: WriteOutcome,
) -> Result<(), QueueError> {
    let gate = shared.reporting.lock();
    if !shared.is_active(job.handle) {
        debug!("session {} closed before its write was reported", job.handle);
        return Ok(());
    }

    match outcome {
        WriteOutcome::Complete => adapter.on_write_complete(job.bytes.len(), false),
        WriteOutcome::Congested { written } => {
            warn!(
                "peer stalled after {} of {} bytes [handle={}]",
                written,
                job.bytes.len(),
                job.handle
            );
            adapter.on_write_complete(written, true)?;
            drop(gate);
            thread::sleep(config.congestion_backoff);
            adapter.on_congestion_changed(false)
        }
        WriteOutcome::Failed(e) => {
            warn!("write on session {} failed: {}", job.handle, e);
            shared.disconnect(job.handle);
            adapter.on_write_failed(false)
        }
    }
}
