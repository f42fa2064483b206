use log::debug;
use mailin_embedded::{response, Handler, Response, Server, SslConfig};
use std::{
    net::{IpAddr, SocketAddr, TcpListener},
    sync::Arc,
};
use tokio::sync::{
    watch::{self, error::RecvError, Receiver, Sender},
    Mutex,
};

/// A message as seen on the wire: the SMTP envelope plus the raw DATA section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMail {
    pub envelope_from: String,
    pub envelope_to: Vec<String>,
    pub content: String,
}

// Cloned by the server for every session, so the envelope is per connection.
#[derive(Clone)]
struct RecordingHandler {
    envelope_from: String,
    envelope_to: Vec<String>,
    content: Vec<u8>,
    outbox: Arc<Sender<Option<ReceivedMail>>>,
}

impl Handler for RecordingHandler {
    fn data_start(&mut self, _domain: &str, from: &str, _is8bit: bool, to: &[String]) -> Response {
        debug!("Accepting mail from {from} to {to:?}");
        self.envelope_from = from.into();
        self.envelope_to = to.to_vec();
        self.content.clear();
        response::OK
    }

    fn data(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.content.extend(buf);
        Ok(())
    }

    fn data_end(&mut self) -> Response {
        let mail = ReceivedMail {
            envelope_from: std::mem::take(&mut self.envelope_from),
            envelope_to: std::mem::take(&mut self.envelope_to),
            content: String::from_utf8_lossy(&std::mem::take(&mut self.content)).into_owned(),
        };
        self.outbox.send_replace(Some(mail));
        response::OK
    }
}

/// In-process SMTP server on an ephemeral local port which records the envelope and content of
/// each delivered message.
pub struct MailSink {
    addr: SocketAddr,
    inbox: Mutex<Receiver<Option<ReceivedMail>>>,
}

impl MailSink {
    pub fn start() -> Self {
        let (outbox, inbox) = watch::channel(None);
        let handler = RecordingHandler {
            envelope_from: String::new(),
            envelope_to: Vec::new(),
            content: Vec::new(),
            outbox: Arc::new(outbox),
        };
        let addr = serve(handler);
        Self {
            addr,
            inbox: Mutex::new(inbox),
        }
    }

    /// Plain SMTP URL, so no credentials are requested.
    pub fn url(&self) -> String {
        format!("smtp://{}:{}", self.addr.ip(), self.addr.port())
    }

    /// Waits for a message delivered after the previous call.
    pub async fn next_mail(&self) -> Result<ReceivedMail, RecvError> {
        let mut inbox = self.inbox.lock().await;
        loop {
            inbox.changed().await?;
            if let Some(mail) = inbox.borrow_and_update().clone() {
                return Ok(mail);
            }
        }
    }
}

#[derive(Clone)]
struct RejectingHandler;

impl Handler for RejectingHandler {
    fn mail(&mut self, _ip: IpAddr, _domain: &str, from: &str) -> Response {
        debug!("Rejecting mail from {from}");
        response::INTERNAL_ERROR
    }
}

/// Starts an SMTP server which answers every `MAIL FROM` with an error and returns its URL.
pub fn start_rejecting_smtp_server() -> String {
    let addr = serve(RejectingHandler);
    format!("smtp://{}:{}", addr.ip(), addr.port())
}

fn serve<H: Handler + Clone + Send + 'static>(handler: H) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let mut server = Server::new(handler);
    server
        .with_name("mail.civiclabs.test")
        .with_ssl(SslConfig::None)
        .unwrap()
        .with_tcp_listener(listener);
    std::thread::spawn(move || {
        let _ = server.serve();
    });
    addr
}
