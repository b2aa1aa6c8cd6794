//! Shared test doubles.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tether_client::{BackendError, ClientHandle, Connector, DirectOptions, TopologyOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// How recorded handles answer `ping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingBehavior {
    Succeed,
    Fail,
    /// Never completes.
    Hang,
    Delay(Duration),
}

#[derive(Default)]
struct Shared {
    journal: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    builds: AtomicUsize,
    reject_build: AtomicBool,
    close_fails: AtomicBool,
    ping: Mutex<Option<PingBehavior>>,
    last_direct: Mutex<Option<DirectOptions>>,
    last_topology: Mutex<Option<TopologyOptions>>,
}

/// Connector double that records every build, ping and close.
#[derive(Clone, Default)]
pub struct RecordingConnector {
    shared: Arc<Shared>,
}

impl RecordingConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn journal(&self) -> Vec<String> {
        self.shared.journal.lock().unwrap().clone()
    }

    pub fn builds(&self) -> usize {
        self.shared.builds.load(Ordering::SeqCst)
    }

    pub fn set_ping(&self, behavior: PingBehavior) {
        *self.shared.ping.lock().unwrap() = Some(behavior);
    }

    pub fn set_close_fails(&self, fails: bool) {
        self.shared.close_fails.store(fails, Ordering::SeqCst);
    }

    pub fn set_reject_build(&self, reject: bool) {
        self.shared.reject_build.store(reject, Ordering::SeqCst);
    }

    pub fn last_direct(&self) -> Option<DirectOptions> {
        self.shared.last_direct.lock().unwrap().clone()
    }

    pub fn last_topology(&self) -> Option<TopologyOptions> {
        self.shared.last_topology.lock().unwrap().clone()
    }

    /// Index of the first journal entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.journal().iter().position(|e| e == entry)
    }

    fn build(&self, mode: &'static str) -> Result<RecordedHandle, BackendError> {
        if self.shared.reject_build.load(Ordering::SeqCst) {
            return Err(BackendError::Other("rejected by test".to_string()));
        }
        self.shared.builds.fetch_add(1, Ordering::SeqCst);
        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let name = format!("{}#{}", mode, id);
        self.record(format!("build:{}", name));
        Ok(RecordedHandle {
            name,
            shared: self.shared.clone(),
        })
    }

    fn record(&self, entry: String) {
        self.shared.journal.lock().unwrap().push(entry);
    }
}

impl Connector for RecordingConnector {
    type Direct = RecordedHandle;
    type Topology = RecordedHandle;

    fn build_direct(&self, options: &DirectOptions) -> Result<RecordedHandle, BackendError> {
        *self.shared.last_direct.lock().unwrap() = Some(options.clone());
        self.build("direct")
    }

    fn build_topology(&self, options: &TopologyOptions) -> Result<RecordedHandle, BackendError> {
        *self.shared.last_topology.lock().unwrap() = Some(options.clone());
        self.build("topology")
    }
}

pub struct RecordedHandle {
    name: String,
    shared: Arc<Shared>,
}

impl RecordedHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn record(&self, action: &str) {
        self.shared
            .journal
            .lock()
            .unwrap()
            .push(format!("{}:{}", action, self.name));
    }
}

#[async_trait]
impl ClientHandle for RecordedHandle {
    async fn ping(&self) -> Result<(), BackendError> {
        self.record("ping");
        let behavior = self.shared.ping.lock().unwrap().unwrap_or(PingBehavior::Succeed);
        match behavior {
            PingBehavior::Succeed => Ok(()),
            PingBehavior::Fail => Err(BackendError::Other("connection refused".to_string())),
            PingBehavior::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
            PingBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    async fn close(&self) -> Result<(), BackendError> {
        self.record("close");
        if self.shared.close_fails.load(Ordering::SeqCst) {
            Err(BackendError::Other("close failed".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Minimal RESP responder: answers PING with `+PONG` and everything else
/// with `+OK`, recording each command.
pub struct FakeServer {
    pub addr: String,
    commands: Arc<Mutex<Vec<Vec<String>>>>,
    connections: Arc<AtomicUsize>,
}

impl FakeServer {
    pub async fn start() -> Self {
        Self::spawn(false).await
    }

    /// Like `start`, but the first connection is closed right after it
    /// receives its first PONG.
    pub async fn start_dropping_first() -> Self {
        Self::spawn(true).await
    }

    async fn spawn(drop_first: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let commands: Arc<Mutex<Vec<Vec<String>>>> = Arc::default();
        let connections = Arc::new(AtomicUsize::new(0));

        let seen = commands.clone();
        let accepted = connections.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let first = accepted.fetch_add(1, Ordering::SeqCst) == 0;
                tokio::spawn(serve(stream, seen.clone(), drop_first && first));
            }
        });

        Self {
            addr,
            commands,
            connections,
        }
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }

    /// Connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// True when some recorded command starts with `name`, ignoring case.
    pub fn saw(&self, name: &str) -> bool {
        self.count(name) > 0
    }

    /// Recorded commands starting with `name`, ignoring case.
    pub fn count(&self, name: &str) -> usize {
        self.commands()
            .iter()
            .filter(|cmd| cmd.first().is_some_and(|c| c.eq_ignore_ascii_case(name)))
            .count()
    }
}

async fn serve(mut stream: TcpStream, seen: Arc<Mutex<Vec<Vec<String>>>>, hang_up_after_ping: bool) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        while let Some((command, used)) = parse_command(&buf) {
            buf.drain(..used);
            let is_ping = command.first().is_some_and(|c| c.eq_ignore_ascii_case("PING"));
            let reply: &[u8] = if is_ping { b"+PONG\r\n" } else { b"+OK\r\n" };
            seen.lock().unwrap().push(command);
            if stream.write_all(reply).await.is_err() {
                return;
            }
            if is_ping && hang_up_after_ping {
                let _ = stream.shutdown().await;
                return;
            }
        }
    }
}

fn parse_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
    let (header, mut pos) = read_line(buf, 0)?;
    let count: usize = header.strip_prefix('*')?.parse().ok()?;

    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        let (len_line, next) = read_line(buf, pos)?;
        let len: usize = len_line.strip_prefix('$')?.parse().ok()?;
        let end = next + len;
        if buf.len() < end + 2 {
            return None;
        }
        parts.push(String::from_utf8_lossy(&buf[next..end]).into_owned());
        pos = end + 2;
    }
    Some((parts, pos))
}

fn read_line(buf: &[u8], start: usize) -> Option<(String, usize)> {
    let rest = buf.get(start..)?;
    let end = rest.windows(2).position(|w| w == b"\r\n")?;
    let line = String::from_utf8_lossy(&rest[..end]).into_owned();
    Some((line, start + end + 2))
}
