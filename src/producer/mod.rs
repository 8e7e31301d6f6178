
use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::channel::{Channel, Internal, NotificationSink};
use crate::entity_state::{EntityState, Lifecycle};
use crate::error::Result;
use crate::event::{Event, EventEmitter};
use crate::ortc::ConsumerType;
use crate::router::Router;
use crate::rtp_parameters::{MediaKind, RtpParameters};
use crate::stats::RtpStreamStat;
use crate::AppData;

/// ProducerType describes the streams a producer sends.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerType {
    #[default]
    Simple,
    Simulcast,
    Svc,
}

impl ProducerType {
    pub(crate) fn for_parameters(rtp_parameters: &RtpParameters) -> Self {
        match ConsumerType::for_consumable(rtp_parameters) {
            ConsumerType::Simulcast => ProducerType::Simulcast,
            _ if rtp_parameters
                .encodings
                .first()
                .and_then(|encoding| encoding.scalability_mode.as_deref())
                .map(|mode| mode.starts_with('L'))
                .unwrap_or(false) =>
            {
                ProducerType::Svc
            }
            _ => ProducerType::Simple,
        }
    }
}

impl fmt::Display for ProducerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ProducerType::Simple => "simple",
            ProducerType::Simulcast => "simulcast",
            ProducerType::Svc => "svc",
        };
        write!(f, "{s}")
    }
}

/// ProducerScore is the worker's quality estimate of one incoming stream.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProducerScore {
    pub encoding_idx: u32,
    pub ssrc: u32,
    pub rid: Option<String>,
    pub score: u8,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerVideoOrientation {
    pub camera: bool,
    pub flip: bool,
    pub rotation: u16,
}

#[derive(Default, Debug, Clone)]
pub struct ProducerOptions {
    pub kind: MediaKind,
    pub rtp_parameters: RtpParameters,
    pub paused: bool,
    /// Milliseconds the worker waits before forwarding a key frame request
    /// to the sender.
    pub key_frame_request_delay: u32,
    pub app_data: AppData,
}

impl ProducerOptions {
    pub fn new(kind: MediaKind, rtp_parameters: RtpParameters) -> Self {
        ProducerOptions {
            kind,
            rtp_parameters,
            ..Default::default()
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProducerDump {
    pub id: String,
    pub kind: MediaKind,
    #[serde(rename = "type")]
    pub typ: ProducerType,
    pub rtp_parameters: RtpParameters,
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProducerEvent {
    TransportClose,
    Score(Vec<ProducerScore>),
    VideoOrientationChange(ProducerVideoOrientation),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProducerEventKind {
    TransportClose,
    Score,
    VideoOrientationChange,
}

impl Event for ProducerEvent {
    type Kind = ProducerEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            ProducerEvent::TransportClose => ProducerEventKind::TransportClose,
            ProducerEvent::Score(_) => ProducerEventKind::Score,
            ProducerEvent::VideoOrientationChange(_) => ProducerEventKind::VideoOrientationChange,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProducerObserverEvent {
    Close,
    Pause,
    Resume,
    Score(Vec<ProducerScore>),
    VideoOrientationChange(ProducerVideoOrientation),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProducerObserverEventKind {
    Close,
    Pause,
    Resume,
    Score,
    VideoOrientationChange,
}

impl Event for ProducerObserverEvent {
    type Kind = ProducerObserverEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            ProducerObserverEvent::Close => ProducerObserverEventKind::Close,
            ProducerObserverEvent::Pause => ProducerObserverEventKind::Pause,
            ProducerObserverEvent::Resume => ProducerObserverEventKind::Resume,
            ProducerObserverEvent::Score(_) => ProducerObserverEventKind::Score,
            ProducerObserverEvent::VideoOrientationChange(_) => {
                ProducerObserverEventKind::VideoOrientationChange
            }
        }
    }
}

#[derive(Default, Debug)]
struct ProducerState {
    paused: bool,
    score: Vec<ProducerScore>,
}

pub(crate) struct ProducerInit {
    pub(crate) id: String,
    pub(crate) transport_id: String,
    pub(crate) internal: Internal,
    pub(crate) kind: MediaKind,
    pub(crate) rtp_parameters: RtpParameters,
    pub(crate) consumable_rtp_parameters: RtpParameters,
    pub(crate) paused: bool,
    pub(crate) app_data: AppData,
}

/// Producer is a media source injected into a router through a transport.
pub struct Producer {
    id: String,
    transport_id: String,
    internal: Internal,
    kind: MediaKind,
    typ: ProducerType,
    rtp_parameters: RtpParameters,
    consumable_rtp_parameters: RtpParameters,
    app_data: AppData,

    channel: Channel,
    router: Weak<Router>,
    lifecycle: Lifecycle,
    state: Mutex<ProducerState>,
    op_lock: Mutex<()>,

    events: EventEmitter<ProducerEvent>,
    observer: EventEmitter<ProducerObserverEvent>,
}

impl Producer {
    pub(crate) fn new(init: ProducerInit, channel: Channel, router: Weak<Router>) -> Arc<Self> {
        Arc::new(Producer {
            typ: ProducerType::for_parameters(&init.rtp_parameters),
            id: init.id,
            transport_id: init.transport_id,
            internal: init.internal,
            kind: init.kind,
            rtp_parameters: init.rtp_parameters,
            consumable_rtp_parameters: init.consumable_rtp_parameters,
            app_data: init.app_data,
            channel,
            router,
            lifecycle: Lifecycle::new(),
            state: Mutex::new(ProducerState {
                paused: init.paused,
                score: vec![],
            }),
            op_lock: Mutex::new(()),
            events: EventEmitter::new(),
            observer: EventEmitter::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn transport_id(&self) -> &str {
        &self.transport_id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn producer_type(&self) -> ProducerType {
        self.typ
    }

    pub fn rtp_parameters(&self) -> &RtpParameters {
        &self.rtp_parameters
    }

    /// consumable_rtp_parameters are the producer's parameters expressed in
    /// the router's payload types and ssrcs.
    pub fn consumable_rtp_parameters(&self) -> &RtpParameters {
        &self.consumable_rtp_parameters
    }

    pub fn app_data(&self) -> &AppData {
        &self.app_data
    }

    pub fn state(&self) -> EntityState {
        self.lifecycle.state()
    }

    pub fn closed(&self) -> bool {
        self.lifecycle.state() == EntityState::Closed
    }

    pub(crate) fn is_open(&self) -> bool {
        self.lifecycle.is_open()
    }

    pub async fn paused(&self) -> bool {
        self.state.lock().await.paused
    }

    pub async fn score(&self) -> Vec<ProducerScore> {
        self.state.lock().await.score.clone()
    }

    pub fn events(&self) -> &EventEmitter<ProducerEvent> {
        &self.events
    }

    pub fn observer(&self) -> &EventEmitter<ProducerObserverEvent> {
        &self.observer
    }

    pub async fn dump(&self) -> Result<ProducerDump> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("producer.dump", &self.internal, &())
            .await
    }

    pub async fn get_stats(&self) -> Result<Vec<RtpStreamStat>> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("producer.getStats", &self.internal, &())
            .await
    }

    /// pause stops forwarding the producer's media to its consumers. The
    /// local flag is restored when the worker does not confirm.
    pub async fn pause(&self) -> Result<()> {
        self.set_paused(true).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.set_paused(false).await
    }

    async fn set_paused(&self, paused: bool) -> Result<()> {
        let _op = self.op_lock.lock().await;
        self.lifecycle.ensure_open()?;

        let was_paused = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut state.paused, paused)
        };

        let method = if paused {
            "producer.pause"
        } else {
            "producer.resume"
        };
        if let Err(err) = self.channel.request(method, &self.internal, &()).await {
            log::warn!("{method} failed, rolling back [producer_id:{}]: {err}", self.id);
            self.state.lock().await.paused = was_paused;
            return Err(err);
        }

        if was_paused != paused {
            let event = if paused {
                ProducerObserverEvent::Pause
            } else {
                ProducerObserverEvent::Resume
            };
            self.observer.emit(event).await;
        }

        Ok(())
    }

    /// close closes the producer and every consumer of it.
    pub async fn close(&self) -> Result<()> {
        self.lifecycle.begin_close()?;
        log::debug!("close producer [producer_id:{}]", self.id);

        if let Err(err) = self
            .channel
            .request("producer.close", &self.internal, &())
            .await
        {
            log::warn!("producer.close failed [producer_id:{}]: {err}", self.id);
        }

        self.finish_close().await;
        self.observer.emit(ProducerObserverEvent::Close).await;
        self.clear_handlers().await;
        Ok(())
    }

    pub(crate) async fn transport_closed(&self) {
        if self.lifecycle.begin_close().is_err() {
            return;
        }
        log::debug!("transport closed [producer_id:{}]", self.id);

        self.finish_close().await;
        self.events.emit(ProducerEvent::TransportClose).await;
        self.observer.emit(ProducerObserverEvent::Close).await;
        self.clear_handlers().await;
    }

    async fn finish_close(&self) {
        self.channel.unsubscribe(&self.id).await;

        let consumers = match self.router.upgrade() {
            Some(router) => router.registry.lock().await.remove_producer(&self.id).1,
            None => vec![],
        };
        self.lifecycle.finish_close();

        for consumer in consumers {
            consumer.producer_closed().await;
        }
    }

    async fn clear_handlers(&self) {
        self.events.clear().await;
        self.observer.clear().await;
    }
}

#[async_trait]
impl NotificationSink for Producer {
    async fn on_notification(&self, event: &str, data: Value) {
        match event {
            "score" => {
                let score: Vec<ProducerScore> = match serde_json::from_value(data) {
                    Ok(score) => score,
                    Err(err) => {
                        log::warn!("invalid producer score [producer_id:{}]: {err}", self.id);
                        return;
                    }
                };
                self.state.lock().await.score = score.clone();
                self.events.emit(ProducerEvent::Score(score.clone())).await;
                self.observer.emit(ProducerObserverEvent::Score(score)).await;
            }
            "videoorientationchange" => {
                let orientation: ProducerVideoOrientation = match serde_json::from_value(data) {
                    Ok(orientation) => orientation,
                    Err(err) => {
                        log::warn!(
                            "invalid video orientation [producer_id:{}]: {err}",
                            self.id
                        );
                        return;
                    }
                };
                self.events
                    .emit(ProducerEvent::VideoOrientationChange(orientation))
                    .await;
                self.observer
                    .emit(ProducerObserverEvent::VideoOrientationChange(orientation))
                    .await;
            }
            _ => log::warn!(
                "ignoring unknown producer event [producer_id:{}, event:{event}]",
                self.id
            ),
        }
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("type", &self.typ)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
