use crate::domain::{ChannelError, ChannelSignal, PushChannel};
use crate::infra::Config;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

const LOBBY_JOIN_EVENT: &str = "room:lobby:join";
const LOBBY_GREETING: &str = "Hello";

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// One decoded Engine.IO / Socket.IO text frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Frame {
    Open,
    Ping,
    Pong,
    Connected,
    ConnectError(String),
    Event { name: String, data: Option<String> },
    Disconnect,
    Ignored,
}

pub fn decode_frame(text: &str) -> Frame {
    let mut chars = text.chars();
    match chars.next() {
        Some('0') => Frame::Open,
        Some('1') => Frame::Disconnect,
        Some('2') => Frame::Ping,
        Some('3') => Frame::Pong,
        Some('4') => decode_socket_packet(chars.as_str()),
        _ => Frame::Ignored,
    }
}

fn decode_socket_packet(packet: &str) -> Frame {
    let mut chars = packet.chars();
    let kind = chars.next();
    let body = skip_namespace(chars.as_str());
    match kind {
        Some('0') => Frame::Connected,
        Some('1') => Frame::Disconnect,
        Some('2') => decode_event(body.trim_start_matches(|c: char| c.is_ascii_digit())),
        Some('4') => Frame::ConnectError(connect_error_reason(body)),
        _ => Frame::Ignored,
    }
}

fn skip_namespace(body: &str) -> &str {
    if !body.starts_with('/') {
        return body;
    }
    match body.find(',') {
        Some(index) => &body[index + 1..],
        None => "",
    }
}

fn decode_event(body: &str) -> Frame {
    let Ok(Value::Array(items)) = serde_json::from_str::<Value>(body) else {
        return Frame::Ignored;
    };
    let mut items = items.into_iter();
    let Some(Value::String(name)) = items.next() else {
        return Frame::Ignored;
    };
    let data = match items.next() {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    };
    Frame::Event { name, data }
}

fn connect_error_reason(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(body)
            .to_string(),
        _ => body.to_string(),
    }
}

pub fn encode_event(name: &str, data: &str) -> String {
    format!("42{}", Value::from(vec![name, data]))
}

/// Websocket endpoint for a Socket.IO server rooted at `base`.
pub fn socket_endpoint(base: &Url) -> Result<Url, ChannelError> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ChannelError::Transport(format!(
                "unsupported socket scheme: {other}"
            )));
        }
    };
    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| ChannelError::Transport(format!("cannot use scheme {scheme}")))?;
    url.set_path("/socket.io/");
    url.query_pairs_mut()
        .clear()
        .append_pair("EIO", "4")
        .append_pair("transport", "websocket");
    url.set_fragment(None);
    Ok(url)
}

/// Socket.IO client running on its own thread; signals are queued for polling.
pub struct SocketChannel {
    rx: Receiver<ChannelSignal>,
    topic_tx: watch::Sender<Option<String>>,
    shutdown_tx: watch::Sender<bool>,
    worker: Option<JoinHandle<()>>,
}

impl SocketChannel {
    pub fn connect(config: &Config) -> Result<Self, ChannelError> {
        let base = config
            .socket_url
            .as_ref()
            .ok_or_else(|| ChannelError::Transport("LOOKUPDESK_SOCKET_URL is not set".into()))?;
        let url = socket_endpoint(base)?;

        let (tx, rx) = channel::<ChannelSignal>();
        let (topic_tx, topic_rx) = watch::channel::<Option<String>>(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = thread::Builder::new()
            .name("lookupdesk-socket".to_string())
            .spawn(move || run_worker(url, topic_rx, shutdown_rx, tx))
            .map_err(|error| ChannelError::Transport(error.to_string()))?;

        Ok(Self {
            rx,
            topic_tx,
            shutdown_tx,
            worker: Some(worker),
        })
    }
}

impl PushChannel for SocketChannel {
    fn subscribe(&mut self, topic: &str) -> Result<(), ChannelError> {
        if self.worker.is_none() {
            return Err(ChannelError::Closed);
        }
        self.topic_tx
            .send(Some(topic.to_string()))
            .map_err(|_| ChannelError::Closed)
    }

    fn unsubscribe(&mut self) {
        self.topic_tx.send_replace(None);
    }

    fn try_next(&mut self) -> Option<ChannelSignal> {
        self.rx.try_recv().ok()
    }

    fn close(&mut self) {
        self.topic_tx.send_replace(None);
        let _ = self.shutdown_tx.send(true);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("socket worker panicked");
            }
        }
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_worker(
    url: Url,
    topic_rx: watch::Receiver<Option<String>>,
    shutdown_rx: watch::Receiver<bool>,
    tx: Sender<ChannelSignal>,
) {
    let result = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(|error| ChannelError::Transport(error.to_string()))
        .and_then(|runtime| runtime.block_on(run_socket(&url, &topic_rx, shutdown_rx, &tx)));

    if let Err(error) = result {
        warn!(%error, "push channel stopped");
        let _ = tx.send(ChannelSignal::Error(error.to_string()));
    }
    let _ = tx.send(ChannelSignal::Closed);
}

async fn run_socket(
    url: &Url,
    topic_rx: &watch::Receiver<Option<String>>,
    mut shutdown_rx: watch::Receiver<bool>,
    tx: &Sender<ChannelSignal>,
) -> Result<(), ChannelError> {
    let connect = tokio_tungstenite::connect_async(url.as_str());
    let mut ws = tokio::select! {
        result = connect => {
            let (ws, _response) = result.map_err(|error| ChannelError::Transport(error.to_string()))?;
            ws
        }
        Ok(()) = shutdown_rx.changed() => return Ok(()),
    };
    debug!(%url, "push channel connected");

    loop {
        tokio::select! {
            biased;
            Ok(()) = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    let _ = ws.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
            msg = ws.next() => {
                let Some(msg) = msg else {
                    return Ok(());
                };
                let msg = msg.map_err(|error| ChannelError::Transport(error.to_string()))?;
                match msg {
                    Message::Text(text) => {
                        if !handle_frame(&mut ws, decode_frame(&text), topic_rx, tx).await? {
                            return Ok(());
                        }
                    }
                    Message::Ping(bytes) => {
                        ws.send(Message::Pong(bytes))
                            .await
                            .map_err(|error| ChannelError::Transport(error.to_string()))?;
                    }
                    Message::Close(_) => return Ok(()),
                    _ => {}
                }
            }
        }
    }
}

/// Returns `false` once the session is over.
async fn handle_frame(
    ws: &mut WsStream,
    frame: Frame,
    topic_rx: &watch::Receiver<Option<String>>,
    tx: &Sender<ChannelSignal>,
) -> Result<bool, ChannelError> {
    match frame {
        Frame::Open => send_text(ws, "40").await?,
        Frame::Ping => send_text(ws, "3").await?,
        Frame::Connected => {
            info!("joined push namespace");
            send_text(ws, &encode_event(LOBBY_JOIN_EVENT, LOBBY_GREETING)).await?;
        }
        Frame::ConnectError(reason) => return Err(ChannelError::Transport(reason)),
        Frame::Event { name, data } => {
            let subscribed = topic_rx.borrow().as_deref() == Some(name.as_str());
            match data {
                Some(data) if subscribed => {
                    if tx.send(ChannelSignal::Payload(data)).is_err() {
                        return Ok(false);
                    }
                }
                _ => debug!(event = %name, "ignoring event"),
            }
        }
        Frame::Disconnect => return Ok(false),
        Frame::Pong | Frame::Ignored => {}
    }
    Ok(true)
}

async fn send_text(ws: &mut WsStream, text: &str) -> Result<(), ChannelError> {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .map_err(|error| ChannelError::Transport(error.to_string()))
}
