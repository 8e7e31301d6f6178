
pub mod message;
pub mod netstring;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use portable_atomic::{AtomicBool, AtomicU32, Ordering};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::worker::worker_settings::WorkerSettings;
pub use message::Internal;
use message::{IncomingMessage, NotificationMessage, RequestMessage, ResponseMessage};
pub use netstring::NetstringCodec;

/// NotificationSink receives the worker notifications addressed to one
/// entity id.
#[async_trait]
pub(crate) trait NotificationSink: Send + Sync {
    async fn on_notification(&self, event: &str, data: Value);
}

pub type OnChannelCloseHdlrFn =
    Box<dyn (FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send + 'static>>) + Send + Sync>;

struct ChannelInner {
    next_id: AtomicU32,
    closed: AtomicBool,
    request_timeout: Duration,
    pending: Mutex<HashMap<u32, oneshot::Sender<ResponseMessage>>>,
    sinks: Mutex<HashMap<String, Weak<dyn NotificationSink>>>,
    on_close_handlers: Mutex<Vec<OnChannelCloseHdlrFn>>,
    outbound_tx: mpsc::Sender<Bytes>,
    cancel: CancellationToken,
}

impl ChannelInner {
    async fn resolve(&self, response: ResponseMessage) {
        let id = response.id;
        match self.pending.lock().await.remove(&id) {
            Some(tx) => {
                let _ = tx.send(response);
            }
            None => log::warn!("received response for unknown request [id:{id}]"),
        }
    }

    async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();

        // Dropping the senders fails every waiting request.
        self.pending.lock().await.clear();
        self.sinks.lock().await.clear();

        let handlers: Vec<OnChannelCloseHdlrFn> =
            std::mem::take(&mut *self.on_close_handlers.lock().await);
        for handler in handlers {
            handler().await;
        }
    }
}

/// Channel is the request/notification link to one worker. Cloning is
/// cheap; all clones share the link.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

impl Channel {
    /// new starts the reader, writer and dispatcher tasks over the given
    /// byte streams. It must be called from within a tokio runtime.
    pub fn new<R, W>(reader: R, writer: W, settings: &WorkerSettings) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::channel(settings.outbound_queue_size);
        let (notification_tx, notification_rx) = mpsc::channel(settings.notification_queue_size);

        let inner = Arc::new(ChannelInner {
            next_id: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            request_timeout: settings.request_timeout,
            pending: Mutex::new(HashMap::new()),
            sinks: Mutex::new(HashMap::new()),
            on_close_handlers: Mutex::new(vec![]),
            outbound_tx,
            cancel: CancellationToken::new(),
        });

        let codec = NetstringCodec::new(settings.max_frame_len);
        tokio::spawn(Channel::write_loop(
            FramedWrite::new(writer, codec.clone()),
            outbound_rx,
            Arc::downgrade(&inner),
        ));
        tokio::spawn(Channel::read_loop(
            FramedRead::new(reader, codec),
            Arc::clone(&inner),
            notification_tx,
        ));
        tokio::spawn(Channel::dispatch_loop(
            notification_rx,
            Arc::downgrade(&inner),
        ));

        Channel { inner }
    }

    async fn write_loop<W>(
        mut framed: FramedWrite<W, NetstringCodec>,
        mut outbound_rx: mpsc::Receiver<Bytes>,
        inner: Weak<ChannelInner>,
    ) where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let cancel = match inner.upgrade() {
            Some(inner) => inner.cancel.clone(),
            None => return,
        };

        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = outbound_rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            if let Err(err) = framed.send(frame).await {
                log::error!("channel write failed: {err}");
                if let Some(inner) = inner.upgrade() {
                    inner.shutdown().await;
                }
                break;
            }
        }
    }

    async fn read_loop<R>(
        mut framed: FramedRead<R, NetstringCodec>,
        inner: Arc<ChannelInner>,
        notification_tx: mpsc::Sender<NotificationMessage>,
    ) where
        R: AsyncRead + Unpin + Send + 'static,
    {
        loop {
            let frame = tokio::select! {
                _ = inner.cancel.cancelled() => break,
                frame = framed.next() => frame,
            };

            let frame = match frame {
                Some(Ok(frame)) => frame,
                Some(Err(err)) => {
                    log::error!("channel read failed: {err}");
                    break;
                }
                None => {
                    log::debug!("channel closed by worker");
                    break;
                }
            };

            match IncomingMessage::parse(&frame) {
                Ok(IncomingMessage::Response(response)) => {
                    log::trace!("received response [id:{}]", response.id);
                    inner.resolve(response).await;
                }
                Ok(IncomingMessage::Notification(notification)) => {
                    if notification_tx.send(notification).await.is_err() {
                        break;
                    }
                }
                Err(err) => log::warn!("dropping malformed message: {err}"),
            }
        }

        inner.shutdown().await;
    }

    async fn dispatch_loop(
        mut notification_rx: mpsc::Receiver<NotificationMessage>,
        inner: Weak<ChannelInner>,
    ) {
        while let Some(notification) = notification_rx.recv().await {
            let channel = match inner.upgrade() {
                Some(channel) => channel,
                None => break,
            };
            let sink = {
                let sinks = channel.sinks.lock().await;
                let sink = sinks.get(&notification.target_id).and_then(Weak::upgrade);
                sink
            };
            drop(channel);

            match sink {
                Some(sink) => {
                    log::trace!(
                        "notification [target_id:{}, event:{}]",
                        notification.target_id,
                        notification.event
                    );
                    sink.on_notification(&notification.event, notification.data)
                        .await;
                }
                None => log::trace!(
                    "dropping notification for unknown target [target_id:{}, event:{}]",
                    notification.target_id,
                    notification.event
                ),
            }
        }
    }

    /// request sends `method` to the worker and waits for the correlated
    /// reply or the request timeout.
    pub async fn request<D>(&self, method: &str, internal: &Internal, data: &D) -> Result<Value>
    where
        D: Serialize + ?Sized,
    {
        if self.is_closed() {
            return Err(Error::ErrChannelClosed);
        }

        let id = self
            .inner
            .next_id
            .fetch_add(1, Ordering::SeqCst)
            .wrapping_add(1);
        let frame = serde_json::to_vec(&RequestMessage {
            id,
            method,
            internal,
            data: serde_json::to_value(data)?,
        })?;

        let (tx, rx) = oneshot::channel();
        self.inner.pending.lock().await.insert(id, tx);
        if self.is_closed() {
            self.inner.pending.lock().await.remove(&id);
            return Err(Error::ErrChannelClosed);
        }

        log::trace!("request [id:{id}, method:{method}]");
        if self.inner.outbound_tx.send(Bytes::from(frame)).await.is_err() {
            self.inner.pending.lock().await.remove(&id);
            return Err(Error::ErrChannelClosed);
        }

        match tokio::time::timeout(self.inner.request_timeout, rx).await {
            Ok(Ok(response)) => response.into_result(method),
            Ok(Err(_)) => Err(Error::ErrChannelClosed),
            Err(_) => {
                self.inner.pending.lock().await.remove(&id);
                log::warn!("request timeout [id:{id}, method:{method}]");
                Err(Error::ErrTimeout {
                    method: method.to_owned(),
                })
            }
        }
    }

    /// request_typed is request with the reply body parsed into `T`.
    pub async fn request_typed<D, T>(
        &self,
        method: &str,
        internal: &Internal,
        data: &D,
    ) -> Result<T>
    where
        D: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let value = self.request(method, internal, data).await?;
        serde_json::from_value(value).map_err(|err| {
            log::error!("invalid response to {method}: {err}");
            Error::ErrProtocol(format!("invalid response to {method}: {err}"))
        })
    }

    pub(crate) async fn subscribe(&self, target_id: &str, sink: Weak<dyn NotificationSink>) {
        self.inner
            .sinks
            .lock()
            .await
            .insert(target_id.to_owned(), sink);
    }

    pub(crate) async fn unsubscribe(&self, target_id: &str) {
        self.inner.sinks.lock().await.remove(target_id);
    }

    /// on_close registers a handler run once when the link goes down,
    /// whichever side closes it.
    pub async fn on_close(&self, handler: OnChannelCloseHdlrFn) {
        if self.is_closed() {
            handler().await;
            return;
        }
        self.inner.on_close_handlers.lock().await.push(handler);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// close stops the link tasks and fails every pending request.
    pub async fn close(&self) {
        self.inner.shutdown().await;
    }
}
