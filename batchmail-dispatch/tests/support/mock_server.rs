//! Mock submission relay for dispatch scenarios
//!
//! The server speaks just enough SMTP for an authenticated submission:
#![allow(dead_code)] // Test utility module - not all methods used in every test
//! - AUTH PLAIN and AUTH LOGIN against a single accepted credential pair
//! - A per-connection message limit answered with `421` before closing
//! - Recipients refused with `550`
//! - Authentication that expires after a number of messages, so MAIL gets `530`
//! - Counters for connections and delivered messages
//!
//! # Example
//!
//! ```rust,no_run
//! use support::mock_server::MockSmtpServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MockSmtpServer::builder()
//!     .with_credentials("lecturer", "secret")
//!     .with_messages_per_connection(10)
//!     .build()
//!     .await?;
//!
//! // Relay is now listening on server.addr()
//!
//! server.shutdown();
//! # Ok(())
//! # }
//! ```

use std::{
    fmt::Write,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpListener, TcpStream,
        tcp::{ReadHalf, WriteHalf},
    },
    sync::RwLock,
    time::timeout,
};

/// A message the relay accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub sender: String,
    pub recipients: Vec<String>,
    pub content: String,
}

#[derive(Clone)]
struct MockServerConfig {
    capabilities: Vec<String>,
    user: String,
    password: String,
    messages_per_connection: Option<usize>,
    rejected_recipients: Vec<String>,
    session_expiry: Option<usize>,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            capabilities: vec![
                "mock.example.com".to_string(),
                "AUTH PLAIN LOGIN".to_string(),
                "SIZE 10000".to_string(),
            ],
            user: "lecturer".to_string(),
            password: "secret".to_string(),
            messages_per_connection: None,
            rejected_recipients: Vec::new(),
            session_expiry: None,
        }
    }
}

impl MockServerConfig {
    fn ehlo_bytes(&self) -> Vec<u8> {
        let mut response = String::new();
        let last = self.capabilities.len() - 1;

        for (i, cap) in self.capabilities.iter().enumerate() {
            let separator = if i < last { '-' } else { ' ' };
            let _ = write!(&mut response, "250{separator}{cap}\r\n");
        }

        response.into_bytes()
    }

    fn accepts(&self, user: &str, password: &str) -> bool {
        user == self.user && password == self.password
    }
}

#[derive(Default)]
struct Counters {
    connections: AtomicUsize,
    auth_failures: AtomicUsize,
}

/// Mock SMTP relay for testing
pub struct MockSmtpServer {
    addr: SocketAddr,
    received: Arc<RwLock<Vec<ReceivedMessage>>>,
    counters: Arc<Counters>,
    shutdown: Arc<AtomicBool>,
}

impl MockSmtpServer {
    /// Create a new builder for configuring the mock server
    #[must_use]
    pub fn builder() -> MockSmtpServerBuilder {
        MockSmtpServerBuilder::new()
    }

    /// Get the address the server is listening on
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Messages accepted so far, in order
    pub async fn received(&self) -> Vec<ReceivedMessage> {
        self.received.read().await.clone()
    }

    /// Number of TCP connections accepted
    #[must_use]
    pub fn connections(&self) -> usize {
        self.counters.connections.load(Ordering::Relaxed)
    }

    /// Number of refused AUTH attempts
    #[must_use]
    pub fn auth_failures(&self) -> usize {
        self.counters.auth_failures.load(Ordering::Relaxed)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    async fn reply(writer: &mut WriteHalf<'_>, line: &str) -> std::io::Result<()> {
        writer.write_all(format!("{line}\r\n").as_bytes()).await?;
        writer.flush().await
    }

    async fn read_line(reader: &mut BufReader<ReadHalf<'_>>) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        match timeout(Duration::from_secs(10), reader.read_line(&mut line)).await {
            Ok(Ok(0)) | Err(_) => Ok(None),
            Ok(Ok(_)) => Ok(Some(line.trim_end().to_string())),
            Ok(Err(e)) => Err(e),
        }
    }

    fn decode(value: &str) -> String {
        STANDARD
            .decode(value.trim())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }

    /// Runs the AUTH exchange and returns whether the credentials matched
    async fn authenticate(
        argument: &str,
        config: &MockServerConfig,
        reader: &mut BufReader<ReadHalf<'_>>,
        writer: &mut WriteHalf<'_>,
    ) -> std::io::Result<bool> {
        let mut parts = argument.splitn(2, ' ');
        let mechanism = parts.next().unwrap_or_default().to_uppercase();
        let initial = parts.next();

        match mechanism.as_str() {
            "PLAIN" => {
                let response = match initial {
                    Some(initial) => initial.to_string(),
                    None => {
                        Self::reply(writer, "334 ").await?;
                        Self::read_line(reader).await?.unwrap_or_default()
                    }
                };

                let decoded = Self::decode(&response);
                let fields: Vec<&str> = decoded.split('\0').collect();
                Ok(fields.len() == 3 && config.accepts(fields[1], fields[2]))
            }
            "LOGIN" => {
                Self::reply(writer, "334 VXNlcm5hbWU6").await?;
                let user = Self::decode(&Self::read_line(reader).await?.unwrap_or_default());
                Self::reply(writer, "334 UGFzc3dvcmQ6").await?;
                let password = Self::decode(&Self::read_line(reader).await?.unwrap_or_default());
                Ok(config.accepts(&user, &password))
            }
            _ => Ok(false),
        }
    }

    fn address(argument: &str) -> String {
        argument
            .split_once(':')
            .map_or(argument, |(_, address)| address)
            .trim()
            .trim_start_matches('<')
            .trim_end_matches('>')
            .to_string()
    }

    /// Handle a single client connection
    #[allow(clippy::too_many_lines)]
    async fn handle_client(
        mut stream: TcpStream,
        config: Arc<MockServerConfig>,
        received: Arc<RwLock<Vec<ReceivedMessage>>>,
        counters: Arc<Counters>,
    ) -> std::io::Result<()> {
        let (reader, mut writer) = stream.split();
        let mut reader = BufReader::new(reader);

        let mut authenticated = false;
        let mut delivered_here = 0usize;
        let mut sender: Option<String> = None;
        let mut recipients: Vec<String> = Vec::new();

        Self::reply(&mut writer, "220 mock.example.com ESMTP ready").await?;

        while let Some(line) = Self::read_line(&mut reader).await? {
            tracing::debug!("Mock server received: {}", line);

            let (command, argument) = line.split_once(' ').unwrap_or((line.as_str(), ""));

            match command.to_uppercase().as_str() {
                "EHLO" => writer.write_all(&config.ehlo_bytes()).await?,
                "AUTH" if authenticated => {
                    Self::reply(&mut writer, "503 5.5.1 Already authenticated").await?;
                }
                "AUTH" => {
                    if Self::authenticate(argument, &config, &mut reader, &mut writer).await? {
                        authenticated = true;
                        Self::reply(&mut writer, "235 2.7.0 Authentication successful").await?;
                    } else {
                        counters.auth_failures.fetch_add(1, Ordering::Relaxed);
                        Self::reply(&mut writer, "535 5.7.8 Authentication credentials invalid")
                            .await?;
                    }
                }
                "MAIL" if !authenticated => {
                    Self::reply(&mut writer, "530 5.7.0 Authentication required").await?;
                }
                "MAIL" => {
                    if config
                        .messages_per_connection
                        .is_some_and(|limit| delivered_here >= limit)
                    {
                        Self::reply(&mut writer, "421 4.7.0 Too many messages, closing").await?;
                        return Ok(());
                    }
                    sender = Some(Self::address(argument));
                    recipients.clear();
                    Self::reply(&mut writer, "250 2.1.0 OK").await?;
                }
                "RCPT" => {
                    let recipient = Self::address(argument);
                    if config
                        .rejected_recipients
                        .iter()
                        .any(|r| r.eq_ignore_ascii_case(&recipient))
                    {
                        Self::reply(&mut writer, "550 5.1.1 No such user").await?;
                    } else {
                        recipients.push(recipient);
                        Self::reply(&mut writer, "250 2.1.5 OK").await?;
                    }
                }
                "DATA" if sender.is_none() || recipients.is_empty() => {
                    Self::reply(&mut writer, "503 5.5.1 No valid recipients").await?;
                }
                "DATA" => {
                    Self::reply(&mut writer, "354 End data with <CR><LF>.<CR><LF>").await?;

                    let mut content = String::new();
                    while let Some(data_line) = Self::read_line(&mut reader).await? {
                        if data_line == "." {
                            break;
                        }
                        content.push_str(data_line.strip_prefix('.').unwrap_or(&data_line));
                        content.push('\n');
                    }

                    received.write().await.push(ReceivedMessage {
                        sender: sender.take().unwrap_or_default(),
                        recipients: std::mem::take(&mut recipients),
                        content,
                    });
                    delivered_here += 1;
                    if config
                        .session_expiry
                        .is_some_and(|limit| delivered_here >= limit)
                    {
                        authenticated = false;
                    }
                    Self::reply(&mut writer, "250 2.0.0 OK: queued").await?;
                }
                "RSET" => {
                    sender = None;
                    recipients.clear();
                    Self::reply(&mut writer, "250 2.0.0 OK").await?;
                }
                "QUIT" => {
                    Self::reply(&mut writer, "221 2.0.0 Bye").await?;
                    return Ok(());
                }
                _ => Self::reply(&mut writer, "500 5.5.2 Unknown command").await?,
            }

            writer.flush().await?;
        }

        Ok(())
    }
}

/// Builder for configuring a `MockSmtpServer`
pub struct MockSmtpServerBuilder {
    config: MockServerConfig,
}

impl MockSmtpServerBuilder {
    fn new() -> Self {
        Self {
            config: MockServerConfig::default(),
        }
    }

    /// The only credentials the relay accepts
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.user = user.into();
        self.config.password = password.into();
        self
    }

    /// Replace the EHLO keywords (first entry is the greeting line)
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: Vec<String>) -> Self {
        self.config.capabilities = capabilities;
        self
    }

    /// Answer `421` and hang up once a connection has delivered `count` messages
    #[must_use]
    pub const fn with_messages_per_connection(mut self, count: usize) -> Self {
        self.config.messages_per_connection = Some(count);
        self
    }

    /// Refuse `address` at RCPT TO with `550`
    #[must_use]
    pub fn with_rejected_recipient(mut self, address: impl Into<String>) -> Self {
        self.config.rejected_recipients.push(address.into());
        self
    }

    /// Forget the client's authentication once a connection has delivered
    /// `count` messages, so the next MAIL is answered with `530`
    #[must_use]
    pub const fn with_session_expiry_after(mut self, count: usize) -> Self {
        self.config.session_expiry = Some(count);
        self
    }

    /// Build and start the mock SMTP server
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to a port
    pub async fn build(self) -> Result<MockSmtpServer, std::io::Error> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let config = Arc::new(self.config);
        let received = Arc::new(RwLock::new(Vec::new()));
        let counters = Arc::new(Counters::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let received_clone = Arc::clone(&received);
        let counters_clone = Arc::clone(&counters);
        let shutdown_clone = Arc::clone(&shutdown);

        tokio::spawn(async move {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }

                // Accept connection with timeout to allow checking shutdown flag
                let accept_result = timeout(Duration::from_millis(100), listener.accept()).await;

                if let Ok(Ok((stream, _peer))) = accept_result {
                    counters_clone.connections.fetch_add(1, Ordering::Relaxed);

                    let config = Arc::clone(&config);
                    let received = Arc::clone(&received_clone);
                    let counters = Arc::clone(&counters_clone);

                    tokio::spawn(async move {
                        if let Err(e) =
                            MockSmtpServer::handle_client(stream, config, received, counters).await
                        {
                            tracing::debug!("Mock server client error: {}", e);
                        }
                    });
                }
            }
        });

        Ok(MockSmtpServer {
            addr,
            received,
            counters,
            shutdown,
        })
    }
}
