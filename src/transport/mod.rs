
pub mod transport_data;
pub mod transport_options;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use async_trait::async_trait;
use portable_atomic::{AtomicU32, Ordering};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::channel::{Channel, Internal, NotificationSink};
use crate::consumer::{ConsumeResponse, Consumer, ConsumerInit, ConsumerLayers, ConsumerOptions};
use crate::data_consumer::{DataConsumer, DataConsumerInit, DataConsumerOptions};
use crate::data_producer::{
    DataProducer, DataProducerInit, DataProducerOptions, SctpStreamParameters,
};
use crate::entity_state::{EntityState, Lifecycle};
use crate::error::{Error, Result};
use crate::event::{Event, EventEmitter};
use crate::ortc::{self, ConsumerType};
use crate::producer::{Producer, ProducerInit, ProducerOptions};
use crate::router::Router;
use crate::rtp_parameters::{MediaKind, RtpEncodingParameters, RtpMapping, RtpParameters};
use crate::stats::TransportStat;
use crate::AppData;
use transport_data::*;
pub use transport_options::*;

// Mids handed to consumers wrap around here.
const MAX_MID: u32 = 100_000_000;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportKind {
    WebRtc,
    Plain,
    Pipe,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            TransportKind::WebRtc => "webrtc",
            TransportKind::Plain => "plain",
            TransportKind::Pipe => "pipe",
        };
        write!(f, "{s}")
    }
}

/// TransportDump is the worker's view of a transport.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportDump {
    pub id: String,
    pub producer_ids: Vec<String>,
    pub consumer_ids: Vec<String>,
    pub data_producer_ids: Vec<String>,
    pub data_consumer_ids: Vec<String>,
    pub max_message_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    RouterClose,
    IceStateChange(IceState),
    IceSelectedTupleChange(TransportTuple),
    DtlsStateChange(DtlsState),
    SctpStateChange(SctpState),
    Tuple(TransportTuple),
    RtcpTuple(TransportTuple),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    RouterClose,
    IceStateChange,
    IceSelectedTupleChange,
    DtlsStateChange,
    SctpStateChange,
    Tuple,
    RtcpTuple,
}

impl Event for TransportEvent {
    type Kind = TransportEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            TransportEvent::RouterClose => TransportEventKind::RouterClose,
            TransportEvent::IceStateChange(_) => TransportEventKind::IceStateChange,
            TransportEvent::IceSelectedTupleChange(_) => TransportEventKind::IceSelectedTupleChange,
            TransportEvent::DtlsStateChange(_) => TransportEventKind::DtlsStateChange,
            TransportEvent::SctpStateChange(_) => TransportEventKind::SctpStateChange,
            TransportEvent::Tuple(_) => TransportEventKind::Tuple,
            TransportEvent::RtcpTuple(_) => TransportEventKind::RtcpTuple,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TransportObserverEvent {
    Close,
    NewProducer(Arc<Producer>),
    NewConsumer(Arc<Consumer>),
    NewDataProducer(Arc<DataProducer>),
    NewDataConsumer(Arc<DataConsumer>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransportObserverEventKind {
    Close,
    NewProducer,
    NewConsumer,
    NewDataProducer,
    NewDataConsumer,
}

impl Event for TransportObserverEvent {
    type Kind = TransportObserverEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            TransportObserverEvent::Close => TransportObserverEventKind::Close,
            TransportObserverEvent::NewProducer(_) => TransportObserverEventKind::NewProducer,
            TransportObserverEvent::NewConsumer(_) => TransportObserverEventKind::NewConsumer,
            TransportObserverEvent::NewDataProducer(_) => {
                TransportObserverEventKind::NewDataProducer
            }
            TransportObserverEvent::NewDataConsumer(_) => {
                TransportObserverEventKind::NewDataConsumer
            }
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProduceRequest<'a> {
    kind: MediaKind,
    rtp_parameters: &'a RtpParameters,
    rtp_mapping: &'a RtpMapping,
    key_frame_request_delay: u32,
    paused: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConsumeRequest<'a> {
    kind: MediaKind,
    rtp_parameters: &'a RtpParameters,
    #[serde(rename = "type")]
    typ: ConsumerType,
    consumable_rtp_encodings: &'a [RtpEncodingParameters],
    paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    preferred_layers: Option<ConsumerLayers>,
    ignore_dtx: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DataRequest<'a> {
    sctp_stream_parameters: &'a SctpStreamParameters,
    label: &'a str,
    protocol: &'a str,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConnectResponse {
    dtls_local_role: Option<DtlsRole>,
    tuple: Option<TransportTuple>,
    rtcp_tuple: Option<TransportTuple>,
    srtp_parameters: Option<SrtpParameters>,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct StateNotification {
    ice_state: Option<IceState>,
    ice_selected_tuple: Option<TransportTuple>,
    dtls_state: Option<DtlsState>,
    dtls_remote_cert: Option<String>,
    sctp_state: Option<SctpState>,
    tuple: Option<TransportTuple>,
    rtcp_tuple: Option<TransportTuple>,
}

/// Transport carries media and data between an endpoint and a router.
/// Producers and consumers are created through it.
pub struct Transport {
    id: String,
    kind: TransportKind,
    internal: Internal,
    app_data: AppData,
    data: ArcSwap<TransportData>,

    channel: Channel,
    router: Weak<Router>,
    weak_self: Weak<Transport>,
    lifecycle: Lifecycle,
    mid_counter: AtomicU32,
    sctp_stream_ids: Mutex<BTreeSet<u16>>,

    events: EventEmitter<TransportEvent>,
    observer: EventEmitter<TransportObserverEvent>,
}

impl Transport {
    pub(crate) fn new(
        id: String,
        internal: Internal,
        data: TransportData,
        app_data: AppData,
        channel: Channel,
        router: Weak<Router>,
    ) -> Arc<Self> {
        let kind = match data {
            TransportData::WebRtc(_) => TransportKind::WebRtc,
            TransportData::Plain(_) => TransportKind::Plain,
            TransportData::Pipe(_) => TransportKind::Pipe,
        };

        Arc::new_cyclic(|weak_self| Transport {
            id,
            kind,
            internal,
            app_data,
            data: ArcSwap::from_pointee(data),
            channel,
            router,
            weak_self: weak_self.clone(),
            lifecycle: Lifecycle::new(),
            mid_counter: AtomicU32::new(0),
            sctp_stream_ids: Mutex::new(BTreeSet::new()),
            events: EventEmitter::new(),
            observer: EventEmitter::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn app_data(&self) -> &AppData {
        &self.app_data
    }

    /// data is a snapshot of the state mirrored from the worker.
    pub fn data(&self) -> Arc<TransportData> {
        self.data.load_full()
    }

    pub fn sctp_parameters(&self) -> Option<SctpParameters> {
        self.data.load().sctp_parameters()
    }

    pub fn sctp_state(&self) -> Option<SctpState> {
        self.data.load().sctp_state()
    }

    pub fn state(&self) -> EntityState {
        self.lifecycle.state()
    }

    pub fn closed(&self) -> bool {
        self.lifecycle.state() == EntityState::Closed
    }

    pub fn events(&self) -> &EventEmitter<TransportEvent> {
        &self.events
    }

    pub fn observer(&self) -> &EventEmitter<TransportObserverEvent> {
        &self.observer
    }

    fn router(&self) -> Result<Arc<Router>> {
        self.router.upgrade().ok_or(Error::ErrInvalidState)
    }

    fn update_data<F>(&self, f: F)
    where
        F: Fn(&mut TransportData),
    {
        self.data.rcu(|current| {
            let mut data = TransportData::clone(current);
            f(&mut data);
            data
        });
    }

    fn next_mid(&self) -> String {
        let mid = self
            .mid_counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |mid| {
                Some(if mid + 1 >= MAX_MID { 0 } else { mid + 1 })
            })
            .unwrap_or_default();
        mid.to_string()
    }

    pub async fn dump(&self) -> Result<TransportDump> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("transport.dump", &self.internal, &())
            .await
    }

    pub async fn get_stats(&self) -> Result<Vec<TransportStat>> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("transport.getStats", &self.internal, &())
            .await
    }

    /// connect provides the transport with the remote endpoint parameters.
    pub async fn connect(&self, options: TransportConnectOptions) -> Result<()> {
        self.lifecycle.ensure_open()?;
        if self.kind == TransportKind::WebRtc && options.dtls_parameters.is_none() {
            return Err(Error::ErrInvalidOptions(
                "missing dtls_parameters".to_owned(),
            ));
        }

        let response: ConnectResponse = self
            .channel
            .request_typed("transport.connect", &self.internal, &options)
            .await?;

        self.update_data(|data| match data {
            TransportData::WebRtc(data) => {
                if let Some(role) = response.dtls_local_role {
                    data.dtls_parameters.role = role;
                }
            }
            TransportData::Plain(data) => {
                if let Some(tuple) = &response.tuple {
                    data.tuple = tuple.clone();
                }
                if response.rtcp_tuple.is_some() {
                    data.rtcp_tuple = response.rtcp_tuple.clone();
                }
                if response.srtp_parameters.is_some() {
                    data.srtp_parameters = response.srtp_parameters.clone();
                }
            }
            TransportData::Pipe(data) => {
                if let Some(tuple) = &response.tuple {
                    data.tuple = tuple.clone();
                }
                if response.srtp_parameters.is_some() {
                    data.srtp_parameters = response.srtp_parameters.clone();
                }
            }
        });

        Ok(())
    }

    pub async fn set_max_incoming_bitrate(&self, bitrate: u32) -> Result<()> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request(
                "transport.setMaxIncomingBitrate",
                &self.internal,
                &serde_json::json!({ "bitrate": bitrate }),
            )
            .await?;
        Ok(())
    }

    /// produce injects a new media source into the router.
    pub async fn produce(&self, options: ProducerOptions) -> Result<Arc<Producer>> {
        self.lifecycle.ensure_open()?;
        let router = self.router()?;

        let ProducerOptions {
            kind,
            rtp_parameters,
            paused,
            key_frame_request_delay,
            app_data,
        } = options;

        ortc::validate_rtp_parameters(&rtp_parameters)?;
        if let Some(codec_kind) = rtp_parameters
            .first_media_codec()
            .and_then(|codec| codec.kind())
        {
            if codec_kind != kind {
                return Err(Error::ErrInvalidRtpParameters(format!(
                    "{kind} producer with {codec_kind} codecs"
                )));
            }
        }

        let rtp_mapping =
            ortc::get_producer_rtp_parameters_mapping(&rtp_parameters, router.rtp_capabilities())?;
        let consumable_rtp_parameters = ortc::get_consumable_rtp_parameters(
            kind,
            &rtp_parameters,
            router.rtp_capabilities(),
            &rtp_mapping,
        )?;

        let id = Uuid::new_v4().to_string();
        let internal = self.internal.clone().with_producer(&id);
        let request = ProduceRequest {
            kind,
            rtp_parameters: &rtp_parameters,
            rtp_mapping: &rtp_mapping,
            key_frame_request_delay,
            paused,
        };

        let producer = Producer::new(
            ProducerInit {
                id: id.clone(),
                transport_id: self.id.clone(),
                internal: internal.clone(),
                kind,
                rtp_parameters: rtp_parameters.clone(),
                consumable_rtp_parameters,
                paused,
                app_data,
            },
            self.channel.clone(),
            self.router.clone(),
        );

        let sink: Weak<dyn NotificationSink> = Arc::downgrade(&producer) as Weak<dyn NotificationSink>;
        self.channel.subscribe(&id, sink).await;

        if let Err(err) = self
            .channel
            .request("transport.produce", &internal, &request)
            .await
        {
            self.channel.unsubscribe(&id).await;
            return Err(err);
        }

        {
            let mut registry = router.registry.lock().await;
            if !self.lifecycle.is_open() {
                drop(registry);
                self.channel.unsubscribe(&id).await;
                return Err(Error::ErrInvalidState);
            }
            registry.add_producer(Arc::clone(&producer));
        }

        log::debug!(
            "new producer [transport_id:{}, producer_id:{id}, kind:{kind}]",
            self.id
        );
        self.observer
            .emit(TransportObserverEvent::NewProducer(Arc::clone(&producer)))
            .await;

        Ok(producer)
    }

    /// consume creates a consumer of an existing producer, negotiated against
    /// the receiver's capabilities. Pipe transports forward every stream of
    /// the producer unchanged.
    pub async fn consume(&self, options: ConsumerOptions) -> Result<Arc<Consumer>> {
        self.lifecycle.ensure_open()?;
        let router = self.router()?;

        let producer = router
            .registry
            .lock()
            .await
            .producer(&options.producer_id)
            .ok_or_else(|| Error::ErrProducerNotFound(options.producer_id.clone()))?;

        let consumable_rtp_parameters = producer.consumable_rtp_parameters();
        let consumer_type = if self.kind == TransportKind::Pipe {
            ConsumerType::Pipe
        } else {
            ConsumerType::for_consumable(consumable_rtp_parameters)
        };

        let mut rtp_parameters = ortc::get_consumer_rtp_parameters(
            consumable_rtp_parameters,
            &options.rtp_capabilities,
            consumer_type,
        )?;
        if consumer_type != ConsumerType::Pipe {
            rtp_parameters.mid = Some(match &options.mid {
                Some(mid) => mid.clone(),
                None => self.next_mid(),
            });
        }
        let consumable_rtp_encodings =
            ortc::get_consumable_rtp_encodings(consumable_rtp_parameters, consumer_type);

        let id = Uuid::new_v4().to_string();
        let internal = self
            .internal
            .clone()
            .with_producer(producer.id())
            .with_consumer(&id);
        let request = ConsumeRequest {
            kind: producer.kind(),
            rtp_parameters: &rtp_parameters,
            typ: consumer_type,
            consumable_rtp_encodings: &consumable_rtp_encodings,
            paused: options.paused,
            preferred_layers: options.preferred_layers,
            ignore_dtx: options.ignore_dtx,
        };

        let consumer = Consumer::new(
            ConsumerInit {
                id: id.clone(),
                producer_id: producer.id().to_owned(),
                transport_id: self.id.clone(),
                internal: internal.clone(),
                kind: producer.kind(),
                typ: consumer_type,
                rtp_parameters: rtp_parameters.clone(),
                consumable_rtp_encodings: consumable_rtp_encodings.clone(),
                app_data: options.app_data,
            },
            self.channel.clone(),
            self.router.clone(),
        );

        let sink: Weak<dyn NotificationSink> = Arc::downgrade(&consumer) as Weak<dyn NotificationSink>;
        self.channel.subscribe(&id, sink).await;

        let response: ConsumeResponse = match self
            .channel
            .request_typed("transport.consume", &internal, &request)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                self.channel.unsubscribe(&id).await;
                return Err(err);
            }
        };
        consumer.apply_consume_response(response).await;

        {
            let mut registry = router.registry.lock().await;
            if !self.lifecycle.is_open()
                || !registry.has_producer(producer.id())
                || consumer.state() != EntityState::Open
            {
                drop(registry);
                self.channel.unsubscribe(&id).await;
                return Err(Error::ErrInvalidState);
            }
            registry.add_consumer(Arc::clone(&consumer));
        }

        log::debug!(
            "new consumer [transport_id:{}, consumer_id:{id}, type:{consumer_type}]",
            self.id
        );
        self.observer
            .emit(TransportObserverEvent::NewConsumer(Arc::clone(&consumer)))
            .await;
        consumer.release_notifications().await;

        Ok(consumer)
    }

    /// produce_data injects a new SCTP message source into the router.
    pub async fn produce_data(&self, options: DataProducerOptions) -> Result<Arc<DataProducer>> {
        self.lifecycle.ensure_open()?;
        let router = self.router()?;
        if self.sctp_parameters().is_none() {
            return Err(Error::ErrSctpNotEnabled);
        }

        let sctp_stream_parameters = options.sctp_stream_parameters.ok_or_else(|| {
            Error::ErrInvalidOptions("missing sctp_stream_parameters".to_owned())
        })?;
        sctp_stream_parameters.validate()?;

        let id = Uuid::new_v4().to_string();
        let internal = self.internal.clone().with_data_producer(&id);
        let request = DataRequest {
            sctp_stream_parameters: &sctp_stream_parameters,
            label: &options.label,
            protocol: &options.protocol,
        };
        self.channel
            .request("transport.produceData", &internal, &request)
            .await?;

        let data_producer = DataProducer::new(
            DataProducerInit {
                id: id.clone(),
                transport_id: self.id.clone(),
                internal,
                sctp_stream_parameters: Some(sctp_stream_parameters),
                label: options.label,
                protocol: options.protocol,
                app_data: options.app_data,
            },
            self.channel.clone(),
            self.router.clone(),
        );
        let sink: Weak<dyn NotificationSink> =
            Arc::downgrade(&data_producer) as Weak<dyn NotificationSink>;
        self.channel.subscribe(&id, sink).await;

        {
            let mut registry = router.registry.lock().await;
            if !self.lifecycle.is_open() {
                drop(registry);
                self.channel.unsubscribe(&id).await;
                return Err(Error::ErrInvalidState);
            }
            registry.add_data_producer(Arc::clone(&data_producer));
        }

        log::debug!(
            "new data producer [transport_id:{}, data_producer_id:{id}]",
            self.id
        );
        self.observer
            .emit(TransportObserverEvent::NewDataProducer(Arc::clone(
                &data_producer,
            )))
            .await;

        Ok(data_producer)
    }

    /// consume_data creates a data consumer of an existing data producer on a
    /// freshly allocated SCTP stream.
    pub async fn consume_data(&self, options: DataConsumerOptions) -> Result<Arc<DataConsumer>> {
        self.lifecycle.ensure_open()?;
        let router = self.router()?;

        let data_producer = router
            .registry
            .lock()
            .await
            .data_producer(&options.data_producer_id)
            .ok_or_else(|| Error::ErrDataProducerNotFound(options.data_producer_id.clone()))?;

        let stream_id = self.allocate_sctp_stream_id().await?;
        let base = data_producer
            .sctp_stream_parameters()
            .cloned()
            .unwrap_or_else(|| SctpStreamParameters::new(stream_id));
        let sctp_stream_parameters = SctpStreamParameters {
            stream_id,
            ordered: options.ordered.unwrap_or(base.ordered),
            max_packet_life_time: options.max_packet_life_time.or(base.max_packet_life_time),
            max_retransmits: options.max_retransmits.or(base.max_retransmits),
        };
        if let Err(err) = sctp_stream_parameters.validate() {
            self.release_sctp_stream_id(stream_id).await;
            return Err(err);
        }

        let id = Uuid::new_v4().to_string();
        let internal = self
            .internal
            .clone()
            .with_data_producer(data_producer.id())
            .with_data_consumer(&id);
        let request = DataRequest {
            sctp_stream_parameters: &sctp_stream_parameters,
            label: data_producer.label(),
            protocol: data_producer.protocol(),
        };

        let data_consumer = DataConsumer::new(
            DataConsumerInit {
                id: id.clone(),
                data_producer_id: data_producer.id().to_owned(),
                transport_id: self.id.clone(),
                internal: internal.clone(),
                sctp_stream_parameters: sctp_stream_parameters.clone(),
                label: data_producer.label().to_owned(),
                protocol: data_producer.protocol().to_owned(),
                app_data: options.app_data,
            },
            self.channel.clone(),
            self.router.clone(),
            self.weak_self.clone(),
        );
        let sink: Weak<dyn NotificationSink> =
            Arc::downgrade(&data_consumer) as Weak<dyn NotificationSink>;
        self.channel.subscribe(&id, sink).await;

        if let Err(err) = self
            .channel
            .request("transport.consumeData", &internal, &request)
            .await
        {
            self.channel.unsubscribe(&id).await;
            self.release_sctp_stream_id(stream_id).await;
            return Err(err);
        }

        {
            let mut registry = router.registry.lock().await;
            if !self.lifecycle.is_open()
                || !registry.has_data_producer(data_producer.id())
                || data_consumer.state() != EntityState::Open
            {
                drop(registry);
                self.channel.unsubscribe(&id).await;
                self.release_sctp_stream_id(stream_id).await;
                return Err(Error::ErrInvalidState);
            }
            registry.add_data_consumer(Arc::clone(&data_consumer));
        }

        log::debug!(
            "new data consumer [transport_id:{}, data_consumer_id:{id}]",
            self.id
        );
        self.observer
            .emit(TransportObserverEvent::NewDataConsumer(Arc::clone(
                &data_consumer,
            )))
            .await;

        Ok(data_consumer)
    }

    async fn allocate_sctp_stream_id(&self) -> Result<u16> {
        let os = self
            .sctp_parameters()
            .map(|params| params.os)
            .ok_or(Error::ErrSctpNotEnabled)?;

        let mut used = self.sctp_stream_ids.lock().await;
        let stream_id = (0..os)
            .find(|stream_id| !used.contains(stream_id))
            .ok_or(Error::ErrNoSctpStreamId)?;
        used.insert(stream_id);
        Ok(stream_id)
    }

    pub(crate) async fn release_sctp_stream_id(&self, stream_id: u16) {
        self.sctp_stream_ids.lock().await.remove(&stream_id);
    }

    /// close closes the transport and everything created on it.
    pub async fn close(&self) -> Result<()> {
        self.lifecycle.begin_close()?;
        log::debug!("close transport [transport_id:{}]", self.id);

        if let Err(err) = self
            .channel
            .request("transport.close", &self.internal, &())
            .await
        {
            log::warn!("transport.close failed [transport_id:{}]: {err}", self.id);
        }

        self.finish_close().await;
        self.observer.emit(TransportObserverEvent::Close).await;
        self.clear_handlers().await;
        Ok(())
    }

    pub(crate) async fn router_closed(&self) {
        if self.lifecycle.begin_close().is_err() {
            return;
        }
        log::debug!("router closed [transport_id:{}]", self.id);

        self.finish_close().await;
        self.events.emit(TransportEvent::RouterClose).await;
        self.observer.emit(TransportObserverEvent::Close).await;
        self.clear_handlers().await;
    }

    async fn finish_close(&self) {
        self.channel.unsubscribe(&self.id).await;

        let removal = match self.router.upgrade() {
            Some(router) => router.registry.lock().await.remove_transport(&self.id),
            None => Default::default(),
        };

        for consumer in removal.consumers {
            consumer.transport_closed().await;
        }
        for consumer in removal.orphaned_consumers {
            consumer.producer_closed().await;
        }
        for producer in removal.producers {
            producer.transport_closed().await;
        }
        for data_consumer in removal.data_consumers {
            data_consumer.transport_closed().await;
        }
        for data_consumer in removal.orphaned_data_consumers {
            data_consumer.data_producer_closed().await;
        }
        for data_producer in removal.data_producers {
            data_producer.transport_closed().await;
        }

        self.sctp_stream_ids.lock().await.clear();
        self.lifecycle.finish_close();
    }

    async fn clear_handlers(&self) {
        self.events.clear().await;
        self.observer.clear().await;
    }
}

#[async_trait]
impl NotificationSink for Transport {
    async fn on_notification(&self, event: &str, data: Value) {
        let notification: StateNotification = match serde_json::from_value(data) {
            Ok(notification) => notification,
            Err(err) => {
                log::warn!(
                    "invalid transport notification [transport_id:{}, event:{event}]: {err}",
                    self.id
                );
                return;
            }
        };

        let emitted = match event {
            "icestatechange" => notification.ice_state.map(|state| {
                self.update_data(|data| {
                    if let TransportData::WebRtc(data) = data {
                        data.ice_state = state;
                    }
                });
                TransportEvent::IceStateChange(state)
            }),
            "iceselectedtuplechange" => notification.ice_selected_tuple.map(|tuple| {
                self.update_data(|data| {
                    if let TransportData::WebRtc(data) = data {
                        data.ice_selected_tuple = Some(tuple.clone());
                    }
                });
                TransportEvent::IceSelectedTupleChange(tuple)
            }),
            "dtlsstatechange" => notification.dtls_state.map(|state| {
                let remote_cert = notification.dtls_remote_cert.clone();
                self.update_data(|data| {
                    if let TransportData::WebRtc(data) = data {
                        data.dtls_state = state;
                        if remote_cert.is_some() {
                            data.dtls_remote_cert = remote_cert.clone();
                        }
                    }
                });
                TransportEvent::DtlsStateChange(state)
            }),
            "sctpstatechange" => notification.sctp_state.map(|state| {
                self.update_data(|data| data.set_sctp_state(state));
                TransportEvent::SctpStateChange(state)
            }),
            "tuple" => notification.tuple.map(|tuple| {
                self.update_data(|data| match data {
                    TransportData::Plain(data) => data.tuple = tuple.clone(),
                    TransportData::Pipe(data) => data.tuple = tuple.clone(),
                    TransportData::WebRtc(_) => {}
                });
                TransportEvent::Tuple(tuple)
            }),
            "rtcptuple" => notification.rtcp_tuple.map(|tuple| {
                self.update_data(|data| {
                    if let TransportData::Plain(data) = data {
                        data.rtcp_tuple = Some(tuple.clone());
                    }
                });
                TransportEvent::RtcpTuple(tuple)
            }),
            _ => {
                log::warn!(
                    "ignoring unknown transport event [transport_id:{}, event:{event}]",
                    self.id
                );
                return;
            }
        };

        match emitted {
            Some(event) => self.events.emit(event).await,
            None => log::warn!(
                "transport notification without payload [transport_id:{}, event:{event}]",
                self.id
            ),
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
