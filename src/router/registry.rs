use std::collections::HashMap;
use std::sync::Arc;

use crate::consumer::Consumer;
use crate::data_consumer::DataConsumer;
use crate::data_producer::DataProducer;
use crate::producer::Producer;
use crate::transport::Transport;

use super::RouterDump;

/// TransportRemoval lists every entity unlinked together with a transport.
#[derive(Default)]
pub(crate) struct TransportRemoval {
    pub(crate) transport: Option<Arc<Transport>>,
    pub(crate) producers: Vec<Arc<Producer>>,
    pub(crate) consumers: Vec<Arc<Consumer>>,
    /// Consumers on other transports fed by a removed producer.
    pub(crate) orphaned_consumers: Vec<Arc<Consumer>>,
    pub(crate) data_producers: Vec<Arc<DataProducer>>,
    pub(crate) data_consumers: Vec<Arc<DataConsumer>>,
    pub(crate) orphaned_data_consumers: Vec<Arc<DataConsumer>>,
}

/// Registry holds every live entity of a router keyed by id, plus the
/// producer/consumer indexes. It is only touched under the router lock, so
/// each method leaves the indexes consistent.
#[derive(Default)]
pub(crate) struct Registry {
    transports: HashMap<String, Arc<Transport>>,
    producers: HashMap<String, Arc<Producer>>,
    consumers: HashMap<String, Arc<Consumer>>,
    data_producers: HashMap<String, Arc<DataProducer>>,
    data_consumers: HashMap<String, Arc<DataConsumer>>,

    producer_consumers: HashMap<String, Vec<String>>,
    consumer_producer: HashMap<String, String>,
    data_producer_data_consumers: HashMap<String, Vec<String>>,
    data_consumer_data_producer: HashMap<String, String>,
}

impl Registry {
    pub(crate) fn add_transport(&mut self, transport: Arc<Transport>) {
        self.transports
            .insert(transport.id().to_owned(), transport);
    }

    pub(crate) fn add_producer(&mut self, producer: Arc<Producer>) {
        self.producer_consumers
            .insert(producer.id().to_owned(), vec![]);
        self.producers.insert(producer.id().to_owned(), producer);
    }

    pub(crate) fn add_consumer(&mut self, consumer: Arc<Consumer>) {
        let producer_id = consumer.producer_id().to_owned();
        self.producer_consumers
            .entry(producer_id.clone())
            .or_default()
            .push(consumer.id().to_owned());
        self.consumer_producer
            .insert(consumer.id().to_owned(), producer_id);
        self.consumers.insert(consumer.id().to_owned(), consumer);
    }

    pub(crate) fn add_data_producer(&mut self, data_producer: Arc<DataProducer>) {
        self.data_producer_data_consumers
            .insert(data_producer.id().to_owned(), vec![]);
        self.data_producers
            .insert(data_producer.id().to_owned(), data_producer);
    }

    pub(crate) fn add_data_consumer(&mut self, data_consumer: Arc<DataConsumer>) {
        let data_producer_id = data_consumer.data_producer_id().to_owned();
        self.data_producer_data_consumers
            .entry(data_producer_id.clone())
            .or_default()
            .push(data_consumer.id().to_owned());
        self.data_consumer_data_producer
            .insert(data_consumer.id().to_owned(), data_producer_id);
        self.data_consumers
            .insert(data_consumer.id().to_owned(), data_consumer);
    }

    pub(crate) fn transport(&self, id: &str) -> Option<Arc<Transport>> {
        self.transports.get(id).cloned()
    }

    pub(crate) fn transports(&self) -> Vec<Arc<Transport>> {
        self.transports.values().cloned().collect()
    }

    pub(crate) fn producer(&self, id: &str) -> Option<Arc<Producer>> {
        self.producers.get(id).cloned()
    }

    pub(crate) fn data_producer(&self, id: &str) -> Option<Arc<DataProducer>> {
        self.data_producers.get(id).cloned()
    }

    pub(crate) fn has_producer(&self, id: &str) -> bool {
        self.producers.contains_key(id)
    }

    pub(crate) fn has_data_producer(&self, id: &str) -> bool {
        self.data_producers.contains_key(id)
    }

    /// remove_consumer is a no-op for an id already removed.
    pub(crate) fn remove_consumer(&mut self, id: &str) -> Option<Arc<Consumer>> {
        if let Some(producer_id) = self.consumer_producer.remove(id) {
            if let Some(consumer_ids) = self.producer_consumers.get_mut(&producer_id) {
                consumer_ids.retain(|consumer_id| consumer_id != id);
            }
        }
        self.consumers.remove(id)
    }

    /// remove_producer unlinks a producer and every consumer of it. The
    /// consumers are returned so the caller can close them.
    pub(crate) fn remove_producer(
        &mut self,
        id: &str,
    ) -> (Option<Arc<Producer>>, Vec<Arc<Consumer>>) {
        let producer = self.producers.remove(id);
        let consumer_ids = self.producer_consumers.remove(id).unwrap_or_default();

        let consumers = consumer_ids
            .iter()
            .filter_map(|consumer_id| {
                self.consumer_producer.remove(consumer_id);
                self.consumers.remove(consumer_id)
            })
            .collect();

        (producer, consumers)
    }

    pub(crate) fn remove_data_consumer(&mut self, id: &str) -> Option<Arc<DataConsumer>> {
        if let Some(data_producer_id) = self.data_consumer_data_producer.remove(id) {
            if let Some(ids) = self.data_producer_data_consumers.get_mut(&data_producer_id) {
                ids.retain(|data_consumer_id| data_consumer_id != id);
            }
        }
        self.data_consumers.remove(id)
    }

    pub(crate) fn remove_data_producer(
        &mut self,
        id: &str,
    ) -> (Option<Arc<DataProducer>>, Vec<Arc<DataConsumer>>) {
        let data_producer = self.data_producers.remove(id);
        let ids = self
            .data_producer_data_consumers
            .remove(id)
            .unwrap_or_default();

        let data_consumers = ids
            .iter()
            .filter_map(|data_consumer_id| {
                self.data_consumer_data_producer.remove(data_consumer_id);
                self.data_consumers.remove(data_consumer_id)
            })
            .collect();

        (data_producer, data_consumers)
    }

    /// remove_transport unlinks a transport and everything created on it in
    /// one step.
    pub(crate) fn remove_transport(&mut self, id: &str) -> TransportRemoval {
        let mut removal = TransportRemoval {
            transport: self.transports.remove(id),
            ..Default::default()
        };

        let consumer_ids: Vec<String> = self
            .consumers
            .values()
            .filter(|consumer| consumer.transport_id() == id)
            .map(|consumer| consumer.id().to_owned())
            .collect();
        for consumer_id in consumer_ids {
            if let Some(consumer) = self.remove_consumer(&consumer_id) {
                removal.consumers.push(consumer);
            }
        }

        let producer_ids: Vec<String> = self
            .producers
            .values()
            .filter(|producer| producer.transport_id() == id)
            .map(|producer| producer.id().to_owned())
            .collect();
        for producer_id in producer_ids {
            let (producer, consumers) = self.remove_producer(&producer_id);
            removal.producers.extend(producer);
            removal.orphaned_consumers.extend(consumers);
        }

        let data_consumer_ids: Vec<String> = self
            .data_consumers
            .values()
            .filter(|data_consumer| data_consumer.transport_id() == id)
            .map(|data_consumer| data_consumer.id().to_owned())
            .collect();
        for data_consumer_id in data_consumer_ids {
            if let Some(data_consumer) = self.remove_data_consumer(&data_consumer_id) {
                removal.data_consumers.push(data_consumer);
            }
        }

        let data_producer_ids: Vec<String> = self
            .data_producers
            .values()
            .filter(|data_producer| data_producer.transport_id() == id)
            .map(|data_producer| data_producer.id().to_owned())
            .collect();
        for data_producer_id in data_producer_ids {
            let (data_producer, data_consumers) = self.remove_data_producer(&data_producer_id);
            removal.data_producers.extend(data_producer);
            removal.orphaned_data_consumers.extend(data_consumers);
        }

        removal
    }

    pub(crate) fn dump(&self, router_id: &str) -> RouterDump {
        let mut transport_ids: Vec<String> = self.transports.keys().cloned().collect();
        transport_ids.sort();

        RouterDump {
            id: router_id.to_owned(),
            transport_ids,
            map_producer_id_consumer_ids: self.producer_consumers.clone(),
            map_consumer_id_producer_id: self.consumer_producer.clone(),
            map_data_producer_id_data_consumer_ids: self.data_producer_data_consumers.clone(),
            map_data_consumer_id_data_producer_id: self.data_consumer_data_producer.clone(),
        }
    }

    pub(crate) fn clear(&mut self) {
        *self = Registry::default();
    }
}
