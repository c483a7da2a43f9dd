//! JSON-RPC 2.0 over a byte stream with `Content-Length` framing.

use crate::client::ClientError;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const METHOD_NOT_FOUND: i64 = -32601;

/// Called for every server notification, on the reader task, in arrival order
pub type NotificationHandler = Arc<dyn Fn(&str, Value) + Send + Sync>;

/// Called once when the peer hangs up or the stream fails. Not called after [`RpcConnection::close`].
pub type CloseHandler = Box<dyn FnOnce() + Send>;

type Writer = Arc<tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;
type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, ClientError>>>>>;

/// A JSON-RPC peer. Requests may be issued concurrently; responses are routed by id.
pub struct RpcConnection {
    writer: Writer,
    pending: Pending,
    next_id: AtomicU64,
    reader_task: Mutex<Option<JoinHandle<()>>>,
}

impl RpcConnection {
    /// Start the reader task over `reader` and return the connection
    pub fn new<R, W>(reader: R, writer: W, on_notification: NotificationHandler, on_close: CloseHandler) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: Writer = Arc::new(tokio::sync::Mutex::new(Box::new(writer)));
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        let task = tokio::spawn(read_loop(
            BufReader::new(reader),
            writer.clone(),
            pending.clone(),
            on_notification,
            on_close,
        ));

        Self {
            writer,
            pending,
            next_id: AtomicU64::new(1),
            reader_task: Mutex::new(Some(task)),
        }
    }

    /// Send a request and wait for its response
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, ClientError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);

        debug!("RPC request {} {}", id, method);
        let message = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let written = {
            let mut writer = self.writer.lock().await;
            write_frame(&mut *writer, &message).await
        };
        if let Err(e) = written {
            lock(&self.pending).remove(&id);
            return Err(e.into());
        }

        rx.await.unwrap_or(Err(ClientError::ConnectionClosed))
    }

    /// Stop reading and fail every outstanding request
    pub fn close(&self) {
        if let Some(task) = lock(&self.reader_task).take() {
            task.abort();
        }
        fail_pending(&self.pending);
    }
}

impl Drop for RpcConnection {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_loop<R>(
    mut reader: BufReader<R>,
    writer: Writer,
    pending: Pending,
    on_notification: NotificationHandler,
    on_close: CloseHandler,
) where
    R: AsyncRead + Send + Unpin,
{
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(message)) => dispatch(message, &writer, &pending, &on_notification).await,
            Ok(None) => {
                debug!("RPC stream reached EOF");
                break;
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!("Skipping malformed RPC message: {}", e);
            }
            Err(e) => {
                warn!("RPC read failed: {}", e);
                break;
            }
        }
    }
    fail_pending(&pending);
    on_close();
}

async fn dispatch(message: Value, writer: &Writer, pending: &Pending, on_notification: &NotificationHandler) {
    let id = message.get("id").filter(|id| !id.is_null()).cloned();

    if let Some(method) = message.get("method").and_then(Value::as_str) {
        match id {
            // Server-initiated request: nothing is registered to serve these
            Some(id) => {
                debug!("Rejecting server request {}", method);
                let reply = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": METHOD_NOT_FOUND, "message": format!("Method not found: {}", method)},
                });
                let mut writer = writer.lock().await;
                if let Err(e) = write_frame(&mut *writer, &reply).await {
                    warn!("Failed to reject server request: {}", e);
                }
            }
            None => {
                let params = message.get("params").cloned().unwrap_or(Value::Null);
                on_notification(method, params);
            }
        }
        return;
    }

    let Some(id) = id.as_ref().and_then(Value::as_u64) else {
        warn!("Dropping RPC message without method or numeric id");
        return;
    };
    let Some(tx) = lock(pending).remove(&id) else {
        warn!("Response for unknown request id {}", id);
        return;
    };

    let outcome = match message.get("error") {
        Some(error) => Err(ClientError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        None => Ok(message.get("result").cloned().unwrap_or(Value::Null)),
    };
    let _ = tx.send(outcome);
}

fn fail_pending(pending: &Pending) {
    for (_, tx) in lock(pending).drain() {
        let _ = tx.send(Err(ClientError::ConnectionClosed));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Read one framed message. `Ok(None)` on a clean EOF between messages.
pub async fn read_frame<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Option<Value>> {
    let mut content_length: Option<usize> = None;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return if content_length.is_none() {
                Ok(None)
            } else {
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "EOF inside message header"))
            };
        }

        let header = line.trim_end();
        if header.is_empty() {
            if content_length.is_some() {
                break;
            }
            continue;
        }

        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                let length = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("bad Content-Length: {}", e)))?;
                content_length = Some(length);
            }
        }
    }

    let mut body = vec![0u8; content_length.unwrap_or_default()];
    reader.read_exact(&mut body).await?;
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write one framed message and flush
pub async fn write_frame<W: AsyncWrite + Unpin + ?Sized>(writer: &mut W, message: &Value) -> io::Result<()> {
    let body = serde_json::to_vec(message)?;
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await
}
