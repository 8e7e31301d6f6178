use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::{Channel, Internal, NotificationSink};
use crate::entity_state::{EntityState, Lifecycle};
use crate::error::{Error, Result};
use crate::event::{Event, EventEmitter};
use crate::router::Router;
use crate::stats::DataStat;
use crate::AppData;

/// SctpStreamParameters describe one SCTP stream carrying data messages.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SctpStreamParameters {
    pub stream_id: u16,
    #[serde(default = "default_ordered")]
    pub ordered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_packet_life_time: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retransmits: Option<u16>,
}

fn default_ordered() -> bool {
    true
}

impl SctpStreamParameters {
    pub fn new(stream_id: u16) -> Self {
        SctpStreamParameters {
            stream_id,
            ordered: true,
            ..Default::default()
        }
    }

    /// validate rejects reliability settings that contradict each other.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_packet_life_time.is_some() && self.max_retransmits.is_some() {
            return Err(Error::ErrInvalidOptions(
                "maxPacketLifeTime and maxRetransmits are mutually exclusive".to_owned(),
            ));
        }
        if self.ordered && (self.max_packet_life_time.is_some() || self.max_retransmits.is_some())
        {
            return Err(Error::ErrInvalidOptions(
                "ordered streams must be reliable".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Default, Debug, Clone)]
pub struct DataProducerOptions {
    pub sctp_stream_parameters: Option<SctpStreamParameters>,
    pub label: String,
    pub protocol: String,
    pub app_data: AppData,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataProducerDump {
    pub id: String,
    pub sctp_stream_parameters: Option<SctpStreamParameters>,
    pub label: String,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataProducerEvent {
    TransportClose,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataProducerEventKind {
    TransportClose,
}

impl Event for DataProducerEvent {
    type Kind = DataProducerEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            DataProducerEvent::TransportClose => DataProducerEventKind::TransportClose,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataProducerObserverEvent {
    Close,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataProducerObserverEventKind {
    Close,
}

impl Event for DataProducerObserverEvent {
    type Kind = DataProducerObserverEventKind;

    fn kind(&self) -> Self::Kind {
        DataProducerObserverEventKind::Close
    }
}

pub(crate) struct DataProducerInit {
    pub(crate) id: String,
    pub(crate) transport_id: String,
    pub(crate) internal: Internal,
    pub(crate) sctp_stream_parameters: Option<SctpStreamParameters>,
    pub(crate) label: String,
    pub(crate) protocol: String,
    pub(crate) app_data: AppData,
}

/// DataProducer injects SCTP messages into a router.
pub struct DataProducer {
    id: String,
    transport_id: String,
    internal: Internal,
    sctp_stream_parameters: Option<SctpStreamParameters>,
    label: String,
    protocol: String,
    app_data: AppData,

    channel: Channel,
    router: Weak<Router>,
    lifecycle: Lifecycle,

    events: EventEmitter<DataProducerEvent>,
    observer: EventEmitter<DataProducerObserverEvent>,
}

impl DataProducer {
    pub(crate) fn new(init: DataProducerInit, channel: Channel, router: Weak<Router>) -> Arc<Self> {
        Arc::new(DataProducer {
            id: init.id,
            transport_id: init.transport_id,
            internal: init.internal,
            sctp_stream_parameters: init.sctp_stream_parameters,
            label: init.label,
            protocol: init.protocol,
            app_data: init.app_data,
            channel,
            router,
            lifecycle: Lifecycle::new(),
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

    pub fn sctp_stream_parameters(&self) -> Option<&SctpStreamParameters> {
        self.sctp_stream_parameters.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
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

    pub fn events(&self) -> &EventEmitter<DataProducerEvent> {
        &self.events
    }

    pub fn observer(&self) -> &EventEmitter<DataProducerObserverEvent> {
        &self.observer
    }

    pub async fn dump(&self) -> Result<DataProducerDump> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("dataProducer.dump", &self.internal, &())
            .await
    }

    pub async fn get_stats(&self) -> Result<Vec<DataStat>> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("dataProducer.getStats", &self.internal, &())
            .await
    }

    /// close closes the data producer and every data consumer of it.
    pub async fn close(&self) -> Result<()> {
        self.lifecycle.begin_close()?;
        log::debug!("close data producer [data_producer_id:{}]", self.id);

        if let Err(err) = self
            .channel
            .request("dataProducer.close", &self.internal, &())
            .await
        {
            log::warn!(
                "dataProducer.close failed [data_producer_id:{}]: {err}",
                self.id
            );
        }

        self.finish_close().await;
        self.observer.emit(DataProducerObserverEvent::Close).await;
        self.clear_handlers().await;
        Ok(())
    }

    pub(crate) async fn transport_closed(&self) {
        if self.lifecycle.begin_close().is_err() {
            return;
        }

        self.finish_close().await;
        self.events.emit(DataProducerEvent::TransportClose).await;
        self.observer.emit(DataProducerObserverEvent::Close).await;
        self.clear_handlers().await;
    }

    async fn finish_close(&self) {
        self.channel.unsubscribe(&self.id).await;

        let data_consumers = match self.router.upgrade() {
            Some(router) => router.registry.lock().await.remove_data_producer(&self.id).1,
            None => vec![],
        };
        self.lifecycle.finish_close();

        for data_consumer in data_consumers {
            data_consumer.data_producer_closed().await;
        }
    }

    async fn clear_handlers(&self) {
        self.events.clear().await;
        self.observer.clear().await;
    }
}

#[async_trait]
impl NotificationSink for DataProducer {
    async fn on_notification(&self, event: &str, _data: Value) {
        log::warn!(
            "ignoring unknown data producer event [data_producer_id:{}, event:{event}]",
            self.id
        );
    }
}

impl fmt::Debug for DataProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProducer")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
