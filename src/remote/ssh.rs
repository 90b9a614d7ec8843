// SSH command execution with transient per-call sessions

use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use async_trait::async_trait;
use ssh2::Session;
use tracing::debug;

use super::{RemoteExecutor, RemoteResult};
use crate::config::Credentials;

/// Executes commands over SSH, opening a fresh session for every call.
///
/// There is no pooling and no retry: each invocation is a single attempt
/// against one host, bounded by the connection timeout. The session is
/// closed on every exit path when the `Session` drops.
pub struct SshExecutor {
    credentials: Credentials,
    port: u16,
    connect_timeout: Duration,
}

impl SshExecutor {
    pub fn new(credentials: Credentials, connect_timeout: Duration) -> Self {
        SshExecutor {
            credentials,
            port: 22,
            connect_timeout,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    fn exec_blocking(&self, host: &str, command: &str) -> RemoteResult {
        let address = format!("{}:{}", host.trim(), self.port);

        let mut addrs = match address.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => return RemoteResult::connection_failed(format!("cannot resolve {}: {}", host, e)),
        };
        let addr = match addrs.next() {
            Some(addr) => addr,
            None => return RemoteResult::connection_failed(format!("no address found for {}", host)),
        };

        let tcp = match TcpStream::connect_timeout(&addr, self.connect_timeout) {
            Ok(tcp) => tcp,
            Err(e) => return RemoteResult::connection_failed(format!("connection failed: {}", e)),
        };

        let mut session = match Session::new() {
            Ok(session) => session,
            Err(e) => return RemoteResult::connection_failed(format!("failed to create session: {}", e)),
        };

        session.set_tcp_stream(tcp);
        session.set_timeout(self.connect_timeout.as_millis() as u32);

        if let Err(e) = session.handshake() {
            return RemoteResult::connection_failed(format!("SSH handshake failed: {}", e));
        }

        if let Err(e) =
            session.userauth_password(&self.credentials.username, &self.credentials.password)
        {
            return RemoteResult::connection_failed(format!("authentication failed: {}", e));
        }

        // Command execution itself has no timeout; only session setup is bounded
        session.set_timeout(0);

        let mut channel = match session.channel_session() {
            Ok(channel) => channel,
            Err(e) => return RemoteResult::connection_failed(format!("failed to open channel: {}", e)),
        };

        if let Err(e) = channel.exec(command) {
            return RemoteResult::connection_failed(format!("failed to execute command: {}", e));
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        channel.read_to_string(&mut stdout).ok();
        channel.stderr().read_to_string(&mut stderr).ok();

        channel.wait_close().ok();
        let exit_code = channel.exit_status().unwrap_or(-1);

        debug!(host, exit_code, "remote command finished");
        RemoteResult::completed(exit_code, stdout, stderr)
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(&self, host: &str, command: &str) -> RemoteResult {
        debug!(host, command, "opening SSH session");

        // ssh2 is blocking; run each call on a blocking worker thread
        let credentials = self.credentials.clone();
        let port = self.port;
        let connect_timeout = self.connect_timeout;
        let host = host.to_string();
        let command = command.to_string();

        let handle = tokio::task::spawn_blocking(move || {
            let executor = SshExecutor {
                credentials,
                port,
                connect_timeout,
            };
            executor.exec_blocking(&host, &command)
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => RemoteResult::connection_failed(format!("executor task failed: {}", e)),
        }
    }
}
