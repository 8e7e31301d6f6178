use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::channel::{Channel, Internal, NotificationSink};
use crate::data_producer::SctpStreamParameters;
use crate::entity_state::{EntityState, Lifecycle};
use crate::error::Result;
use crate::event::{Event, EventEmitter};
use crate::router::Router;
use crate::stats::DataStat;
use crate::transport::Transport;
use crate::AppData;

#[derive(Default, Debug, Clone)]
pub struct DataConsumerOptions {
    pub data_producer_id: String,
    /// ordered, max_packet_life_time and max_retransmits override the data
    /// producer's settings when given.
    pub ordered: Option<bool>,
    pub max_packet_life_time: Option<u16>,
    pub max_retransmits: Option<u16>,
    pub app_data: AppData,
}

impl DataConsumerOptions {
    pub fn new(data_producer_id: &str) -> Self {
        DataConsumerOptions {
            data_producer_id: data_producer_id.to_owned(),
            ..Default::default()
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataConsumerDump {
    pub id: String,
    pub data_producer_id: String,
    pub sctp_stream_parameters: Option<SctpStreamParameters>,
    pub label: String,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataConsumerEvent {
    TransportClose,
    DataProducerClose,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataConsumerEventKind {
    TransportClose,
    DataProducerClose,
}

impl Event for DataConsumerEvent {
    type Kind = DataConsumerEventKind;

    fn kind(&self) -> Self::Kind {
        match self {
            DataConsumerEvent::TransportClose => DataConsumerEventKind::TransportClose,
            DataConsumerEvent::DataProducerClose => DataConsumerEventKind::DataProducerClose,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataConsumerObserverEvent {
    Close,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataConsumerObserverEventKind {
    Close,
}

impl Event for DataConsumerObserverEvent {
    type Kind = DataConsumerObserverEventKind;

    fn kind(&self) -> Self::Kind {
        DataConsumerObserverEventKind::Close
    }
}

pub(crate) struct DataConsumerInit {
    pub(crate) id: String,
    pub(crate) data_producer_id: String,
    pub(crate) transport_id: String,
    pub(crate) internal: Internal,
    pub(crate) sctp_stream_parameters: SctpStreamParameters,
    pub(crate) label: String,
    pub(crate) protocol: String,
    pub(crate) app_data: AppData,
}

/// DataConsumer delivers the messages of one data producer to the endpoint
/// of a transport.
pub struct DataConsumer {
    id: String,
    data_producer_id: String,
    transport_id: String,
    internal: Internal,
    sctp_stream_parameters: SctpStreamParameters,
    label: String,
    protocol: String,
    app_data: AppData,

    channel: Channel,
    router: Weak<Router>,
    transport: Weak<Transport>,
    lifecycle: Lifecycle,

    events: EventEmitter<DataConsumerEvent>,
    observer: EventEmitter<DataConsumerObserverEvent>,
}

impl DataConsumer {
    pub(crate) fn new(
        init: DataConsumerInit,
        channel: Channel,
        router: Weak<Router>,
        transport: Weak<Transport>,
    ) -> Arc<Self> {
        Arc::new(DataConsumer {
            id: init.id,
            data_producer_id: init.data_producer_id,
            transport_id: init.transport_id,
            internal: init.internal,
            sctp_stream_parameters: init.sctp_stream_parameters,
            label: init.label,
            protocol: init.protocol,
            app_data: init.app_data,
            channel,
            router,
            transport,
            lifecycle: Lifecycle::new(),
            events: EventEmitter::new(),
            observer: EventEmitter::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data_producer_id(&self) -> &str {
        &self.data_producer_id
    }

    pub(crate) fn transport_id(&self) -> &str {
        &self.transport_id
    }

    pub fn sctp_stream_parameters(&self) -> &SctpStreamParameters {
        &self.sctp_stream_parameters
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

    pub fn events(&self) -> &EventEmitter<DataConsumerEvent> {
        &self.events
    }

    pub fn observer(&self) -> &EventEmitter<DataConsumerObserverEvent> {
        &self.observer
    }

    pub async fn dump(&self) -> Result<DataConsumerDump> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("dataConsumer.dump", &self.internal, &())
            .await
    }

    pub async fn get_stats(&self) -> Result<Vec<DataStat>> {
        self.lifecycle.ensure_open()?;
        self.channel
            .request_typed("dataConsumer.getStats", &self.internal, &())
            .await
    }

    pub async fn close(&self) -> Result<()> {
        self.lifecycle.begin_close()?;
        log::debug!("close data consumer [data_consumer_id:{}]", self.id);

        if let Err(err) = self
            .channel
            .request("dataConsumer.close", &self.internal, &())
            .await
        {
            log::warn!(
                "dataConsumer.close failed [data_consumer_id:{}]: {err}",
                self.id
            );
        }

        self.finish_close().await;
        self.observer.emit(DataConsumerObserverEvent::Close).await;
        self.clear_handlers().await;
        Ok(())
    }

    pub(crate) async fn transport_closed(&self) {
        self.closed_by(DataConsumerEvent::TransportClose).await;
    }

    pub(crate) async fn data_producer_closed(&self) {
        self.closed_by(DataConsumerEvent::DataProducerClose).await;
    }

    async fn closed_by(&self, event: DataConsumerEvent) {
        if self.lifecycle.begin_close().is_err() {
            return;
        }
        log::debug!("{:?} [data_consumer_id:{}]", event.kind(), self.id);

        self.finish_close().await;
        self.events.emit(event).await;
        self.observer.emit(DataConsumerObserverEvent::Close).await;
        self.clear_handlers().await;
    }

    async fn finish_close(&self) {
        self.channel.unsubscribe(&self.id).await;
        if let Some(router) = self.router.upgrade() {
            router
                .registry
                .lock()
                .await
                .remove_data_consumer(&self.id);
        }
        if let Some(transport) = self.transport.upgrade() {
            transport
                .release_sctp_stream_id(self.sctp_stream_parameters.stream_id)
                .await;
        }
        self.lifecycle.finish_close();
    }

    async fn clear_handlers(&self) {
        self.events.clear().await;
        self.observer.clear().await;
    }
}

#[async_trait]
impl NotificationSink for DataConsumer {
    async fn on_notification(&self, event: &str, _data: Value) {
        match event {
            "dataproducerclose" => self.data_producer_closed().await,
            _ => log::warn!(
                "ignoring unknown data consumer event [data_consumer_id:{}, event:{event}]",
                self.id
            ),
        }
    }
}

impl fmt::Debug for DataConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataConsumer")
            .field("id", &self.id)
            .field("data_producer_id", &self.data_producer_id)
            .field("state", &self.lifecycle.state())
            .finish()
    }
}
