
pub(crate) mod registry;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::channel::{Channel, Internal, NotificationSink};
use crate::entity_state::{EntityState, Lifecycle};
use crate::error::{Error, Result};
use crate::event::{Event, EventEmitter};
use crate::ortc;
use crate::rtp_parameters::{RtpCapabilities, RtpCodecCapability};
use crate::transport::transport_data::{
    PipeTransportData, PlainTransportData, TransportData, WebRtcTransportData,
};
use crate::transport::{
    PipeTransportOptions, PlainTransportOptions, Transport, WebRtcTransportOptions,
};
use crate::worker::Worker;
use crate::AppData;
use registry::Registry;

#[derive(Default, Debug, Clone)]
pub struct RouterOptions {
    pub media_codecs: Vec<RtpCodecCapability>,
    pub app_data: AppData,
}

impl RouterOptions {
    pub fn new(media_codecs: Vec<RtpCodecCapability>) -> Self {
        RouterOptions {
            media_codecs,
            ..Default::default()
        }
    }
}

/// RouterDump mirrors the router's registry: its transports and the
/// producer/consumer indexes.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouterDump {
    pub id: String,
    pub transport_ids: Vec<String>,
    pub map_producer_id_consumer_ids: HashMap<String, Vec<String>>,
    pub map_consumer_id_producer_id: HashMap<String, String>,
    pub map_data_producer_id_data_consumer_ids: HashMap<String, Vec<String>>,
    pub map_data_consumer_id_data_producer_id: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
    WorkerClose,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RouterEventKind {
    WorkerClose,
}

impl Event for RouterEvent {
    type Kind = RouterEventKind;

    fn kind(&self) -> Self::Kind {
        RouterEventKind::WorkerClose
    }
}

#[derive(Debug, Clone)]
pub enum RouterObserverEvent {
    Close,
    NewTransport(Arc<Transport>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RouterObserverEventKind {
    Close,
    NewTransport,
}

impl Event for RouterObserverEvent {
    type Kind = RouterObserverEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            RouterObserverEvent::Close => RouterObserverEventKind::Close,
            RouterObserverEvent::NewTransport(_) => RouterObserverEventKind::NewTransport,
        }
    }
}

/// Router forwards media between the producers and consumers of its
/// transports. It owns the registry of everything created under it.
pub struct Router {
    id: String,
    internal: Internal,
    rtp_capabilities: RtpCapabilities,
    app_data: AppData,

    channel: Channel,
    worker: Weak<Worker>,
    weak_self: Weak<Router>,
    lifecycle: Lifecycle,
    pub(crate) registry: Mutex<Registry>,

    events: EventEmitter<RouterEvent>,
    observer: EventEmitter<RouterObserverEvent>,
}

impl Router {
    pub(crate) fn new(
        id: String,
        rtp_capabilities: RtpCapabilities,
        app_data: AppData,
        channel: Channel,
        worker: Weak<Worker>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak_self| Router {
            internal: Internal::router(&id),
            id,
            rtp_capabilities,
            app_data,
            channel,
            worker,
            weak_self: weak_self.clone(),
            lifecycle: Lifecycle::new(),
            registry: Mutex::new(Registry::default()),
            events: EventEmitter::new(),
            observer: EventEmitter::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// rtp_capabilities are the router's codecs with their assigned payload
    /// types, as handed to endpoints for negotiation.
    pub fn rtp_capabilities(&self) -> &RtpCapabilities {
        &self.rtp_capabilities
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

    pub fn events(&self) -> &EventEmitter<RouterEvent> {
        &self.events
    }

    pub fn observer(&self) -> &EventEmitter<RouterObserverEvent> {
        &self.observer
    }

    pub async fn transport(&self, id: &str) -> Option<Arc<Transport>> {
        self.registry.lock().await.transport(id)
    }

    pub async fn create_webrtc_transport(
        &self,
        options: WebRtcTransportOptions,
    ) -> Result<Arc<Transport>> {
        if options.listen_ips.is_empty() {
            return Err(Error::ErrInvalidOptions("missing listen_ips".to_owned()));
        }

        let app_data = options.app_data.clone();
        self.create_transport("router.createWebRtcTransport", &options, app_data, |data| {
            Ok(TransportData::WebRtc(serde_json::from_value::<
                WebRtcTransportData,
            >(data)?))
        })
        .await
    }

    pub async fn create_plain_transport(
        &self,
        options: PlainTransportOptions,
    ) -> Result<Arc<Transport>> {
        if options.listen_ip.ip.is_empty() {
            return Err(Error::ErrInvalidOptions("missing listen_ip".to_owned()));
        }

        let app_data = options.app_data.clone();
        self.create_transport("router.createPlainTransport", &options, app_data, |data| {
            Ok(TransportData::Plain(serde_json::from_value::<
                PlainTransportData,
            >(data)?))
        })
        .await
    }

    /// create_pipe_transport creates a transport that connects this router to
    /// another one. Consumers created on it forward producers unchanged.
    pub async fn create_pipe_transport(
        &self,
        options: PipeTransportOptions,
    ) -> Result<Arc<Transport>> {
        if options.listen_ip.ip.is_empty() {
            return Err(Error::ErrInvalidOptions("missing listen_ip".to_owned()));
        }

        let app_data = options.app_data.clone();
        self.create_transport("router.createPipeTransport", &options, app_data, |data| {
            Ok(TransportData::Pipe(serde_json::from_value::<
                PipeTransportData,
            >(data)?))
        })
        .await
    }

    async fn create_transport<O, F>(
        &self,
        method: &str,
        options: &O,
        app_data: AppData,
        parse: F,
    ) -> Result<Arc<Transport>>
    where
        O: Serialize,
        F: FnOnce(Value) -> Result<TransportData>,
    {
        self.lifecycle.ensure_open()?;

        let id = Uuid::new_v4().to_string();
        let internal = self.internal.clone().with_transport(&id);
        let response = self.channel.request(method, &internal, options).await?;
        let data = parse(response).map_err(|err| {
            log::error!("invalid response to {method}: {err}");
            Error::ErrProtocol(format!("invalid response to {method}: {err}"))
        })?;

        let transport = Transport::new(
            id.clone(),
            internal,
            data,
            app_data,
            self.channel.clone(),
            self.weak_self.clone(),
        );
        let sink: Weak<dyn NotificationSink> =
            Arc::downgrade(&transport) as Weak<dyn NotificationSink>;
        self.channel.subscribe(&id, sink).await;

        {
            let mut registry = self.registry.lock().await;
            if !self.lifecycle.is_open() {
                drop(registry);
                self.channel.unsubscribe(&id).await;
                return Err(Error::ErrInvalidState);
            }
            registry.add_transport(Arc::clone(&transport));
        }

        log::debug!(
            "new transport [router_id:{}, transport_id:{id}, kind:{}]",
            self.id,
            transport.kind()
        );
        self.observer
            .emit(RouterObserverEvent::NewTransport(Arc::clone(&transport)))
            .await;

        Ok(transport)
    }

    /// can_consume tells whether a receiver with the given capabilities can
    /// consume the producer. Negotiation errors count as no.
    pub async fn can_consume(&self, producer_id: &str, rtp_capabilities: &RtpCapabilities) -> bool {
        let producer = match self.registry.lock().await.producer(producer_id) {
            Some(producer) => producer,
            None => {
                log::error!("can_consume: producer not found [producer_id:{producer_id}]");
                return false;
            }
        };

        match ortc::can_consume(producer.consumable_rtp_parameters(), rtp_capabilities) {
            Ok(can_consume) => can_consume,
            Err(err) => {
                log::error!("can_consume failed [producer_id:{producer_id}]: {err}");
                false
            }
        }
    }

    /// dump is computed from the registry in one critical section, so it
    /// never shows a half-applied change.
    pub async fn dump(&self) -> Result<RouterDump> {
        self.lifecycle.ensure_open()?;
        Ok(self.registry.lock().await.dump(&self.id))
    }

    /// close closes the router and every transport on it.
    pub async fn close(&self) -> Result<()> {
        self.lifecycle.begin_close()?;
        log::debug!("close router [router_id:{}]", self.id);

        if let Err(err) = self
            .channel
            .request("router.close", &self.internal, &())
            .await
        {
            log::warn!("router.close failed [router_id:{}]: {err}", self.id);
        }

        self.finish_close().await;
        if let Some(worker) = self.worker.upgrade() {
            worker.remove_router(&self.id).await;
        }
        self.observer.emit(RouterObserverEvent::Close).await;
        self.clear_handlers().await;
        Ok(())
    }

    pub(crate) async fn worker_closed(&self) {
        if self.lifecycle.begin_close().is_err() {
            return;
        }
        log::debug!("worker closed [router_id:{}]", self.id);

        self.finish_close().await;
        self.events.emit(RouterEvent::WorkerClose).await;
        self.observer.emit(RouterObserverEvent::Close).await;
        self.clear_handlers().await;
    }

    async fn finish_close(&self) {
        let transports = self.registry.lock().await.transports();
        for transport in transports {
            transport.router_closed().await;
        }

        // Transports unlink their own entities; anything left is dropped.
        self.registry.lock().await.clear();
        self.lifecycle.finish_close();
    }

    async fn clear_handlers(&self) {
        self.events.clear().await;
        self.observer.clear().await;
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("id", &self.id)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
