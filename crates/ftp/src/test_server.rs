//! Scripted in-process FTP server for tests.
//!
//! Listens on an ephemeral loopback port and understands just enough of
//! the protocol for a `suppaftp` client storing files: USER, PASS, TYPE,
//! PASV, EPSV, STOR, NOOP and QUIT. Stored files are kept in memory.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::endpoint::FtpEndpoint;

/// Behaviour knobs for [`FtpTestServer`].
#[derive(Debug, Clone)]
pub struct TestServerOptions {
    pub username: String,
    pub password: String,
    /// Reject every login with 530.
    pub reject_login: bool,
    /// Answer the first N `STOR` commands with 451 after reading the data.
    pub reject_stores: usize,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            username: "tester".into(),
            password: "secret".into(),
            reject_login: false,
            reject_stores: 0,
        }
    }
}

#[derive(Debug, Default)]
struct ServerState {
    stored: Vec<(String, Vec<u8>)>,
    store_attempts: usize,
    connections: usize,
    noops: usize,
    sessions: Vec<JoinHandle<()>>,
}

/// A running test server. Stops when dropped.
pub struct FtpTestServer {
    addr: SocketAddr,
    options: TestServerOptions,
    state: Arc<Mutex<ServerState>>,
    accept_task: JoinHandle<()>,
}

impl FtpTestServer {
    /// Binds `127.0.0.1:0` and starts accepting control connections.
    pub async fn start(options: TestServerOptions) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(ServerState::default()));

        let accept_options = options.clone();
        let accept_state = Arc::clone(&state);
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if let Ok(mut s) = accept_state.lock() {
                    s.connections += 1;
                }
                let options = accept_options.clone();
                let state = Arc::clone(&accept_state);
                let session = tokio::spawn(async move {
                    let _ = serve(stream, options, state).await;
                });
                if let Ok(mut s) = accept_state.lock() {
                    s.sessions.push(session);
                }
            }
        });

        Ok(Self {
            addr,
            options,
            state,
            accept_task,
        })
    }

    /// Endpoint with the credentials this server accepts.
    pub fn endpoint(&self) -> FtpEndpoint {
        FtpEndpoint {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            username: self.options.username.clone(),
            password: self.options.password.clone(),
        }
    }

    /// Files stored so far, in arrival order.
    pub fn stored_files(&self) -> Vec<(String, Vec<u8>)> {
        self.state
            .lock()
            .map(|s| s.stored.clone())
            .unwrap_or_default()
    }

    /// Number of `STOR` commands received, accepted or not.
    pub fn store_attempts(&self) -> usize {
        self.state.lock().map(|s| s.store_attempts).unwrap_or(0)
    }

    /// Number of control connections accepted.
    pub fn connections(&self) -> usize {
        self.state.lock().map(|s| s.connections).unwrap_or(0)
    }

    /// Number of `NOOP` commands received.
    pub fn noops(&self) -> usize {
        self.state.lock().map(|s| s.noops).unwrap_or(0)
    }

    /// Closes every open control connection without a reply, the way an
    /// idle timeout on a real server does. New connections are still accepted.
    pub fn drop_connections(&self) {
        if let Ok(mut s) = self.state.lock() {
            for session in s.sessions.drain(..) {
                session.abort();
            }
        }
    }
}

impl Drop for FtpTestServer {
    fn drop(&mut self) {
        self.accept_task.abort();
        self.drop_connections();
    }
}

async fn serve(
    stream: TcpStream,
    options: TestServerOptions,
    state: Arc<Mutex<ServerState>>,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut passive: Option<TcpListener> = None;
    let mut user: Option<String> = None;
    let mut logged_in = false;

    writer.write_all(b"220 ftpwatch test server\r\n").await?;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let trimmed = line.trim_end();
        let (verb, arg) = match trimmed.split_once(' ') {
            Some((v, a)) => (v.to_ascii_uppercase(), a.to_string()),
            None => (trimmed.to_ascii_uppercase(), String::new()),
        };

        let reply: String = match verb.as_str() {
            "USER" => {
                user = Some(arg);
                "331 password required".into()
            }
            "PASS" => {
                let ok = !options.reject_login
                    && user.as_deref() == Some(options.username.as_str())
                    && arg == options.password;
                logged_in = ok;
                if ok {
                    "230 logged in".into()
                } else {
                    "530 login incorrect".into()
                }
            }
            "TYPE" if logged_in => "200 type set".into(),
            "PASV" | "EPSV" if logged_in => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                passive = Some(listener);
                if verb == "PASV" {
                    format!(
                        "227 Entering Passive Mode (127,0,0,1,{},{})",
                        port >> 8,
                        port & 0xff
                    )
                } else {
                    format!("229 Entering Extended Passive Mode (|||{port}|)")
                }
            }
            "STOR" if logged_in => {
                let reject = {
                    let mut s = state.lock().map_err(|_| std::io::Error::other("poisoned"))?;
                    s.store_attempts += 1;
                    s.store_attempts <= options.reject_stores
                };
                match passive.take() {
                    None => "425 use PASV first".into(),
                    Some(listener) => {
                        let accepted =
                            tokio::time::timeout(Duration::from_secs(5), listener.accept()).await;
                        let Ok(Ok((mut data, _))) = accepted else {
                            writer.write_all(b"425 no data connection\r\n").await?;
                            continue;
                        };
                        writer.write_all(b"150 opening data connection\r\n").await?;
                        let mut contents = Vec::new();
                        data.read_to_end(&mut contents).await?;
                        if reject {
                            "451 requested action aborted".into()
                        } else {
                            if let Ok(mut s) = state.lock() {
                                s.stored.push((arg, contents));
                            }
                            "226 transfer complete".into()
                        }
                    }
                }
            }
            "NOOP" => {
                if let Ok(mut s) = state.lock() {
                    s.noops += 1;
                }
                "200 ok".into()
            }
            "QUIT" => {
                writer.write_all(b"221 bye\r\n").await?;
                return Ok(());
            }
            "TYPE" | "PASV" | "EPSV" | "STOR" => "530 not logged in".into(),
            _ => "502 command not implemented".into(),
        };

        writer.write_all(format!("{reply}\r\n").as_bytes()).await?;
    }
}
