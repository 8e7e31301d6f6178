
use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::channel::{Channel, Internal, NotificationSink};
use crate::entity_state::{EntityState, Lifecycle};
use crate::error::{Error, Result};
use crate::event::{Event, EventEmitter};
use crate::ortc::ConsumerType;
use crate::router::Router;
use crate::rtp_parameters::{MediaKind, RtpCapabilities, RtpEncodingParameters, RtpParameters};
use crate::stats::RtpStreamStat;
use crate::AppData;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsumerScore {
    /// Score of the stream sent to the receiver.
    pub score: u8,
    /// Score of the producer stream currently forwarded.
    pub producer_score: u8,
    pub producer_scores: Vec<u8>,
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerLayers {
    pub spatial_layer: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporal_layer: Option<u8>,
}

#[derive(Default, Debug, Clone)]
pub struct ConsumerOptions {
    pub producer_id: String,
    pub rtp_capabilities: RtpCapabilities,
    pub paused: bool,
    /// mid overrides the one the transport would allocate.
    pub mid: Option<String>,
    pub preferred_layers: Option<ConsumerLayers>,
    pub ignore_dtx: bool,
    pub app_data: AppData,
}

impl ConsumerOptions {
    pub fn new(producer_id: &str, rtp_capabilities: RtpCapabilities) -> Self {
        ConsumerOptions {
            producer_id: producer_id.to_owned(),
            rtp_capabilities,
            ..Default::default()
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsumerDump {
    pub id: String,
    pub producer_id: String,
    pub kind: MediaKind,
    #[serde(rename = "type")]
    pub typ: ConsumerType,
    pub rtp_parameters: RtpParameters,
    pub consumable_rtp_encodings: Vec<RtpEncodingParameters>,
    pub supported_codec_payload_types: Vec<u8>,
    pub paused: bool,
    pub producer_paused: bool,
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerEvent {
    TransportClose,
    ProducerClose,
    ProducerPause,
    ProducerResume,
    Score(ConsumerScore),
    LayersChange(Option<ConsumerLayers>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConsumerEventKind {
    TransportClose,
    ProducerClose,
    ProducerPause,
    ProducerResume,
    Score,
    LayersChange,
}

impl Event for ConsumerEvent {
    type Kind = ConsumerEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            ConsumerEvent::TransportClose => ConsumerEventKind::TransportClose,
            ConsumerEvent::ProducerClose => ConsumerEventKind::ProducerClose,
            ConsumerEvent::ProducerPause => ConsumerEventKind::ProducerPause,
            ConsumerEvent::ProducerResume => ConsumerEventKind::ProducerResume,
            ConsumerEvent::Score(_) => ConsumerEventKind::Score,
            ConsumerEvent::LayersChange(_) => ConsumerEventKind::LayersChange,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConsumerObserverEvent {
    Close,
    Pause,
    Resume,
    Score(ConsumerScore),
    LayersChange(Option<ConsumerLayers>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConsumerObserverEventKind {
    Close,
    Pause,
    Resume,
    Score,
    LayersChange,
}

impl Event for ConsumerObserverEvent {
    type Kind = ConsumerObserverEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            ConsumerObserverEvent::Close => ConsumerObserverEventKind::Close,
            ConsumerObserverEvent::Pause => ConsumerObserverEventKind::Pause,
            ConsumerObserverEvent::Resume => ConsumerObserverEventKind::Resume,
            ConsumerObserverEvent::Score(_) => ConsumerObserverEventKind::Score,
            ConsumerObserverEvent::LayersChange(_) => ConsumerObserverEventKind::LayersChange,
        }
    }
}

#[derive(Default, Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct ConsumeResponse {
    pub(crate) paused: bool,
    pub(crate) producer_paused: bool,
    pub(crate) score: ConsumerScore,
    pub(crate) preferred_layers: Option<ConsumerLayers>,
}

#[derive(Debug)]
struct ConsumerState {
    paused: bool,
    producer_paused: bool,
    score: ConsumerScore,
    preferred_layers: Option<ConsumerLayers>,
    current_layers: Option<ConsumerLayers>,
    // Notifications received before the consume reply was applied, in
    // arrival order. None once they have been replayed.
    held_notifications: Option<Vec<(String, Value)>>,
}

impl Default for ConsumerState {
    fn default() -> Self {
        ConsumerState {
            paused: false,
            producer_paused: false,
            score: ConsumerScore::default(),
            preferred_layers: None,
            current_layers: None,
            held_notifications: Some(vec![]),
        }
    }
}

pub(crate) struct ConsumerInit {
    pub(crate) id: String,
    pub(crate) producer_id: String,
    pub(crate) transport_id: String,
    pub(crate) internal: Internal,
    pub(crate) kind: MediaKind,
    pub(crate) typ: ConsumerType,
    pub(crate) rtp_parameters: RtpParameters,
    pub(crate) consumable_rtp_encodings: Vec<RtpEncodingParameters>,
    pub(crate) app_data: AppData,
}

/// Consumer forwards the media of one producer to the endpoint of a
/// transport.
pub struct Consumer {
    id: String,
    producer_id: String,
    transport_id: String,
    internal: Internal,
    kind: MediaKind,
    typ: ConsumerType,
    rtp_parameters: RtpParameters,
    consumable_rtp_encodings: Vec<RtpEncodingParameters>,
    app_data: AppData,

    channel: Channel,
    router: Weak<Router>,
    lifecycle: Lifecycle,
    state: Mutex<ConsumerState>,
    op_lock: Mutex<()>,

    events: EventEmitter<ConsumerEvent>,
    observer: EventEmitter<ConsumerObserverEvent>,
}

impl Consumer {
    pub(crate) fn new(init: ConsumerInit, channel: Channel, router: Weak<Router>) -> Arc<Self> {
        Arc::new(Consumer {
            id: init.id,
            producer_id: init.producer_id,
            transport_id: init.transport_id,
            internal: init.internal,
            kind: init.kind,
            typ: init.typ,
            rtp_parameters: init.rtp_parameters,
            consumable_rtp_encodings: init.consumable_rtp_encodings,
            app_data: init.app_data,
            channel,
            router,
            lifecycle: Lifecycle::new(),
            state: Mutex::new(ConsumerState::default()),
            op_lock: Mutex::new(()),
            events: EventEmitter::new(),
            observer: EventEmitter::new(),
        })
    }

    /// apply_consume_response seeds the state the worker reported for the
    /// new consumer. Notifications keep being held until
    /// `release_notifications`, so none of them is overwritten by the reply.
    pub(crate) async fn apply_consume_response(&self, response: ConsumeResponse) {
        let mut state = self.state.lock().await;
        state.paused = response.paused;
        state.producer_paused = response.producer_paused;
        state.score = response.score;
        state.preferred_layers = response.preferred_layers;
    }

    /// release_notifications replays the held notifications in arrival
    /// order and delivers later ones directly.
    pub(crate) async fn release_notifications(&self) {
        loop {
            let held = {
                let mut state = self.state.lock().await;
                match state.held_notifications.as_mut() {
                    Some(held) if !held.is_empty() => std::mem::take(held),
                    _ => {
                        state.held_notifications = None;
                        return;
                    }
                }
            };
            for (event, data) in held {
                self.handle_notification(&event, data).await;
            }
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn producer_id(&self) -> &str {
        &self.producer_id
    }

    pub(crate) fn transport_id(&self) -> &str {
        &self.transport_id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn consumer_type(&self) -> ConsumerType {
        self.typ
    }

    pub fn rtp_parameters(&self) -> &RtpParameters {
        &self.rtp_parameters
    }

    /// consumable_rtp_encodings are the producer streams the worker draws
    /// this consumer's media from.
    pub fn consumable_rtp_encodings(&self) -> &[RtpEncodingParameters] {
        &self.consumable_rtp_encodings
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

    pub async fn paused(&self) -> bool {
        self.state.lock().await.paused
    }

    pub async fn producer_paused(&self) -> bool {
        self.state.lock().await.producer_paused
    }

    pub async fn score(&self) -> ConsumerScore {
        self.state.lock().await.score.clone()
    }

    pub async fn preferred_layers(&self) -> Option<ConsumerLayers> {
        self.state.lock().await.preferred_layers
    }

    pub async fn current_layers(&self) -> Option<ConsumerLayers> {
        self.state.lock().await.current_layers
    }

    pub fn events(&self) -> &EventEmitter<ConsumerEvent> {
        &self.events
    }

    pub fn observer(&self) -> &EventEmitter<ConsumerObserverEvent> {
        &self.observer
    }

    pub async fn dump(&self) -> Result<ConsumerDump> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("consumer.dump", &self.internal, &())
            .await
    }

    pub async fn get_stats(&self) -> Result<Vec<RtpStreamStat>> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("consumer.getStats", &self.internal, &())
            .await
    }

    pub async fn pause(&self) -> Result<()> {
        self.set_paused(true).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.set_paused(false).await
    }

    async fn set_paused(&self, paused: bool) -> Result<()> {
        let _op = self.op_lock.lock().await;
        self.lifecycle.ensure_open()?;

        let (was_paused, producer_paused) = {
            let mut state = self.state.lock().await;
            (
                std::mem::replace(&mut state.paused, paused),
                state.producer_paused,
            )
        };

        let method = if paused {
            "consumer.pause"
        } else {
            "consumer.resume"
        };
        if let Err(err) = self.channel.request(method, &self.internal, &()).await {
            log::warn!("{method} failed, rolling back [consumer_id:{}]: {err}", self.id);
            self.state.lock().await.paused = was_paused;
            return Err(err);
        }

        if was_paused != paused && !producer_paused {
            let event = if paused {
                ConsumerObserverEvent::Pause
            } else {
                ConsumerObserverEvent::Resume
            };
            self.observer.emit(event).await;
        }

        Ok(())
    }

    /// set_preferred_layers asks the worker to forward the given layers.
    /// The worker may clamp them; the layers it settles on are stored.
    pub async fn set_preferred_layers(&self, layers: ConsumerLayers) -> Result<()> {
        let _op = self.op_lock.lock().await;
        self.lifecycle.ensure_open()?;

        let previous = {
            let mut state = self.state.lock().await;
            std::mem::replace(&mut state.preferred_layers, Some(layers))
        };

        match self
            .channel
            .request("consumer.setPreferredLayers", &self.internal, &layers)
            .await
        {
            Ok(data) => {
                let confirmed: Option<ConsumerLayers> = match serde_json::from_value(data) {
                    Ok(confirmed) => confirmed,
                    Err(err) => {
                        log::error!(
                            "invalid consumer.setPreferredLayers response, rolling back [consumer_id:{}]: {err}",
                            self.id
                        );
                        self.state.lock().await.preferred_layers = previous;
                        return Err(Error::ErrProtocol(format!(
                            "invalid response to consumer.setPreferredLayers: {err}"
                        )));
                    }
                };
                if confirmed.is_some() {
                    self.state.lock().await.preferred_layers = confirmed;
                }
                Ok(())
            }
            Err(err) => {
                log::warn!(
                    "consumer.setPreferredLayers failed, rolling back [consumer_id:{}]: {err}",
                    self.id
                );
                self.state.lock().await.preferred_layers = previous;
                Err(err)
            }
        }
    }

    pub async fn request_key_frame(&self) -> Result<()> {
        let _op = self.op_lock.lock().await;
        self.lifecycle.ensure_open()?;
        self.channel
            .request("consumer.requestKeyFrame", &self.internal, &())
            .await?;
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.lifecycle.begin_close()?;
        log::debug!("close consumer [consumer_id:{}]", self.id);

        if let Err(err) = self
            .channel
            .request("consumer.close", &self.internal, &())
            .await
        {
            log::warn!("consumer.close failed [consumer_id:{}]: {err}", self.id);
        }

        self.finish_close().await;
        self.observer.emit(ConsumerObserverEvent::Close).await;
        self.clear_handlers().await;
        Ok(())
    }

    pub(crate) async fn transport_closed(&self) {
        self.closed_by(ConsumerEvent::TransportClose).await;
    }

    pub(crate) async fn producer_closed(&self) {
        self.closed_by(ConsumerEvent::ProducerClose).await;
    }

    // The worker has already dropped the consumer, so nothing is sent.
    async fn closed_by(&self, event: ConsumerEvent) {
        if self.lifecycle.begin_close().is_err() {
            return;
        }
        log::debug!("{:?} [consumer_id:{}]", event.kind(), self.id);

        self.finish_close().await;
        self.events.emit(event).await;
        self.observer.emit(ConsumerObserverEvent::Close).await;
        self.clear_handlers().await;
    }

    async fn finish_close(&self) {
        self.channel.unsubscribe(&self.id).await;
        if let Some(router) = self.router.upgrade() {
            router.registry.lock().await.remove_consumer(&self.id);
        }
        self.lifecycle.finish_close();
    }

    async fn clear_handlers(&self) {
        self.events.clear().await;
        self.observer.clear().await;
    }

    async fn handle_producer_paused(&self, producer_paused: bool) {
        let (changed, paused) = {
            let mut state = self.state.lock().await;
            let changed = state.producer_paused != producer_paused;
            state.producer_paused = producer_paused;
            (changed, state.paused)
        };
        if !changed {
            return;
        }

        let event = if producer_paused {
            ConsumerEvent::ProducerPause
        } else {
            ConsumerEvent::ProducerResume
        };
        self.events.emit(event).await;

        if !paused {
            let event = if producer_paused {
                ConsumerObserverEvent::Pause
            } else {
                ConsumerObserverEvent::Resume
            };
            self.observer.emit(event).await;
        }
    }
}

#[async_trait]
impl NotificationSink for Consumer {
    async fn on_notification(&self, event: &str, data: Value) {
        {
            let mut state = self.state.lock().await;
            if let Some(held) = state.held_notifications.as_mut() {
                held.push((event.to_owned(), data));
                return;
            }
        }
        self.handle_notification(event, data).await;
    }
}

impl Consumer {
    async fn handle_notification(&self, event: &str, data: Value) {
        match event {
            "producerclose" => self.producer_closed().await,
            "producerpause" => self.handle_producer_paused(true).await,
            "producerresume" => self.handle_producer_paused(false).await,
            "score" => {
                let score: ConsumerScore = match serde_json::from_value(data) {
                    Ok(score) => score,
                    Err(err) => {
                        log::warn!("invalid consumer score [consumer_id:{}]: {err}", self.id);
                        return;
                    }
                };
                self.state.lock().await.score = score.clone();
                self.events.emit(ConsumerEvent::Score(score.clone())).await;
                self.observer.emit(ConsumerObserverEvent::Score(score)).await;
            }
            "layerschange" => {
                let layers: Option<ConsumerLayers> = match serde_json::from_value(data) {
                    Ok(layers) => layers,
                    Err(err) => {
                        log::warn!("invalid consumer layers [consumer_id:{}]: {err}", self.id);
                        return;
                    }
                };
                self.state.lock().await.current_layers = layers;
                self.events.emit(ConsumerEvent::LayersChange(layers)).await;
                self.observer
                    .emit(ConsumerObserverEvent::LayersChange(layers))
                    .await;
            }
            _ => log::warn!(
                "ignoring unknown consumer event [consumer_id:{}, event:{event}]",
                self.id
            ),
        }
    }
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("id", &self.id)
            .field("producer_id", &self.producer_id)
            .field("kind", &self.kind)
            .field("type", &self.typ)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
