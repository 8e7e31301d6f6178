use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{DuplexStream, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use sfu_control::channel::NetstringCodec;
use sfu_control::worker::worker_settings::WorkerSettings;
use sfu_control::worker::Worker;

pub const MOCK_PID: u32 = 4242;

#[derive(Default)]
struct ProducerEntry {
    transport_id: String,
    kind: String,
    typ: String,
    rtp_parameters: Value,
    paused: bool,
}

#[derive(Default)]
struct ConsumerEntry {
    transport_id: String,
    producer_id: String,
    kind: String,
    typ: String,
    rtp_parameters: Value,
    paused: bool,
}

#[derive(Default)]
struct DataEntry {
    transport_id: String,
    data_producer_id: Option<String>,
    sctp_stream_parameters: Value,
    label: String,
    protocol: String,
}

#[derive(Default)]
struct MockState {
    routers: HashSet<String>,
    transports: HashMap<String, String>,
    producers: HashMap<String, ProducerEntry>,
    consumers: HashMap<String, ConsumerEntry>,
    data_producers: HashMap<String, DataEntry>,
    data_consumers: HashMap<String, DataEntry>,

    failures: HashMap<String, (String, String)>,
    hung: HashSet<String>,
    requests: Vec<Value>,
}

/// MockWorker plays the worker side of the channel. It keeps just enough
/// state to answer dumps and to send the notifications a real worker sends
/// when entities close or pause: notifications first, then the reply.
#[derive(Clone)]
pub struct MockWorker {
    state: Arc<Mutex<MockState>>,
    outbound_tx: mpsc::UnboundedSender<Value>,
    stop: CancellationToken,
}

impl MockWorker {
    pub async fn start() -> (Arc<Worker>, MockWorker) {
        MockWorker::start_with_settings(WorkerSettings::default()).await
    }

    pub async fn start_with_settings(settings: WorkerSettings) -> (Arc<Worker>, MockWorker) {
        let (client, server) = tokio::io::duplex(1024 * 1024);
        let (client_reader, client_writer) = tokio::io::split(client);
        let (server_reader, server_writer) = tokio::io::split(server);

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let mock = MockWorker {
            state: Arc::new(Mutex::new(MockState::default())),
            outbound_tx,
            stop: CancellationToken::new(),
        };

        tokio::spawn(MockWorker::write_loop(
            FramedWrite::new(server_writer, NetstringCodec::default()),
            outbound_rx,
            mock.stop.clone(),
        ));
        tokio::spawn(mock.clone().read_loop(FramedRead::new(
            server_reader,
            NetstringCodec::default(),
        )));

        let worker = Worker::new(client_reader, client_writer, settings).await;
        (worker, mock)
    }

    async fn write_loop(
        mut writer: FramedWrite<WriteHalf<DuplexStream>, NetstringCodec>,
        mut outbound_rx: mpsc::UnboundedReceiver<Value>,
        stop: CancellationToken,
    ) {
        loop {
            let message = tokio::select! {
                _ = stop.cancelled() => break,
                message = outbound_rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            let frame = Bytes::from(serde_json::to_vec(&message).unwrap());
            if writer.send(frame).await.is_err() {
                break;
            }
        }
    }

    async fn read_loop(self, mut reader: FramedRead<ReadHalf<DuplexStream>, NetstringCodec>) {
        loop {
            let frame = tokio::select! {
                _ = self.stop.cancelled() => break,
                frame = reader.next() => match frame {
                    Some(Ok(frame)) => frame,
                    _ => break,
                },
            };
            let request: Value = match serde_json::from_slice(&frame) {
                Ok(request) => request,
                Err(_) => continue,
            };
            self.handle(request).await;
        }
    }

    /// emit sends an unsolicited notification.
    pub fn emit(&self, target_id: &str, event: &str, data: Value) {
        let _ = self.outbound_tx.send(json!({
            "targetId": target_id,
            "event": event,
            "data": data,
        }));
    }

    /// fail_next rejects the next request of `method`.
    pub async fn fail_next(&self, method: &str, error: &str, reason: &str) {
        self.state
            .lock()
            .await
            .failures
            .insert(method.to_owned(), (error.to_owned(), reason.to_owned()));
    }

    /// hang leaves every request of `method` unanswered.
    pub async fn hang(&self, method: &str) {
        self.state.lock().await.hung.insert(method.to_owned());
    }

    /// reply answers a request left unanswered by `hang`.
    pub fn reply(&self, request: &Value, data: Value) {
        let _ = self.outbound_tx.send(json!({
            "id": request["id"],
            "accepted": true,
            "data": data,
        }));
    }

    /// wait_requests waits until `count` requests of `method` have arrived
    /// and returns them.
    pub async fn wait_requests(&self, method: &str, count: usize) -> Vec<Value> {
        loop {
            let requests = self.requests(method).await;
            if requests.len() >= count {
                return requests;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    /// requests returns the full messages received for `method`, oldest
    /// first.
    pub async fn requests(&self, method: &str) -> Vec<Value> {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter(|request| request["method"] == method)
            .cloned()
            .collect()
    }

    /// kill drops the link as if the worker process exited.
    pub fn kill(&self) {
        self.stop.cancel();
    }

    async fn handle(&self, request: Value) {
        let id = request["id"].clone();
        let method = request["method"].as_str().unwrap_or_default().to_owned();
        let internal = request["internal"].clone();
        let data = request["data"].clone();

        let mut state = self.state.lock().await;
        state.requests.push(request);

        if state.hung.contains(&method) {
            return;
        }
        if let Some((error, reason)) = state.failures.remove(&method) {
            let _ = self.outbound_tx.send(json!({
                "id": id,
                "error": error,
                "reason": reason,
            }));
            return;
        }

        let id_of = |key: &str| internal[key].as_str().unwrap_or_default().to_owned();
        let mut notifications: Vec<(String, &str)> = vec![];

        let reply = match method.as_str() {
            "worker.dump" => {
                let mut router_ids: Vec<&String> = state.routers.iter().collect();
                router_ids.sort();
                json!({ "pid": MOCK_PID, "routerIds": router_ids })
            }
            "worker.close" => {
                *state = MockState::default();
                Value::Null
            }
            "worker.createRouter" => {
                state.routers.insert(id_of("routerId"));
                Value::Null
            }
            "router.close" => {
                let router_id = id_of("routerId");
                state.routers.remove(&router_id);
                let transport_ids: Vec<String> = state
                    .transports
                    .iter()
                    .filter(|(_, owner)| **owner == router_id)
                    .map(|(id, _)| id.clone())
                    .collect();
                for transport_id in transport_ids {
                    close_transport(&mut state, &transport_id, &mut notifications);
                }
                // Entities of a closed router get no notifications.
                notifications.clear();
                Value::Null
            }
            "router.createWebRtcTransport" => {
                state.transports.insert(id_of("transportId"), id_of("routerId"));
                webrtc_transport_data(&data)
            }
            "router.createPlainTransport" => {
                state.transports.insert(id_of("transportId"), id_of("routerId"));
                json!({
                    "rtcpMux": data["rtcpMux"],
                    "comedia": data["comedia"],
                    "tuple": tuple(&data["listenIp"]["ip"]),
                    "sctpParameters": sctp_parameters(&data),
                    "sctpState": sctp_state(&data),
                })
            }
            "router.createPipeTransport" => {
                state.transports.insert(id_of("transportId"), id_of("routerId"));
                json!({
                    "tuple": tuple(&data["listenIp"]["ip"]),
                    "rtx": data["enableRtx"],
                    "sctpParameters": sctp_parameters(&data),
                    "sctpState": sctp_state(&data),
                })
            }
            "transport.close" => {
                close_transport(&mut state, &id_of("transportId"), &mut notifications);
                Value::Null
            }
            "transport.dump" => transport_dump(&state, &id_of("transportId")),
            "transport.getStats" => json!([{
                "type": "webrtc-transport",
                "transportId": id_of("transportId"),
                "timestamp": 1,
                "bytesReceived": 0,
                "bytesSent": 0,
            }]),
            "transport.connect" => {
                if data.get("dtlsParameters").is_some() {
                    json!({ "dtlsLocalRole": "server" })
                } else {
                    json!({
                        "tuple": {
                            "localIp": "127.0.0.1",
                            "localPort": 40000,
                            "remoteIp": data["ip"],
                            "remotePort": data["port"],
                            "protocol": "udp",
                        }
                    })
                }
            }
            "transport.setMaxIncomingBitrate" => Value::Null,
            "transport.produce" => {
                let producer_id = id_of("producerId");
                let encodings = data["rtpParameters"]["encodings"]
                    .as_array()
                    .map(Vec::len)
                    .unwrap_or_default();
                let typ = if encodings > 1 { "simulcast" } else { "simple" };
                state.producers.insert(
                    producer_id,
                    ProducerEntry {
                        transport_id: id_of("transportId"),
                        kind: data["kind"].as_str().unwrap_or_default().to_owned(),
                        typ: typ.to_owned(),
                        rtp_parameters: data["rtpParameters"].clone(),
                        paused: data["paused"].as_bool().unwrap_or_default(),
                    },
                );
                json!({ "type": typ })
            }
            "transport.consume" => {
                let producer_id = id_of("producerId");
                let producer_paused = state
                    .producers
                    .get(&producer_id)
                    .map(|producer| producer.paused)
                    .unwrap_or_default();
                let paused = data["paused"].as_bool().unwrap_or_default();
                let encodings = data["consumableRtpEncodings"]
                    .as_array()
                    .map(Vec::len)
                    .unwrap_or(1);
                state.consumers.insert(
                    id_of("consumerId"),
                    ConsumerEntry {
                        transport_id: id_of("transportId"),
                        producer_id,
                        kind: data["kind"].as_str().unwrap_or_default().to_owned(),
                        typ: data["type"].as_str().unwrap_or_default().to_owned(),
                        rtp_parameters: data["rtpParameters"].clone(),
                        paused,
                    },
                );
                json!({
                    "paused": paused,
                    "producerPaused": producer_paused,
                    "score": {
                        "score": 10,
                        "producerScore": 0,
                        "producerScores": vec![0; encodings],
                    },
                    "preferredLayers": data.get("preferredLayers").cloned().unwrap_or(Value::Null),
                })
            }
            "transport.produceData" => {
                state.data_producers.insert(
                    id_of("dataProducerId"),
                    DataEntry {
                        transport_id: id_of("transportId"),
                        data_producer_id: None,
                        sctp_stream_parameters: data["sctpStreamParameters"].clone(),
                        label: data["label"].as_str().unwrap_or_default().to_owned(),
                        protocol: data["protocol"].as_str().unwrap_or_default().to_owned(),
                    },
                );
                Value::Null
            }
            "transport.consumeData" => {
                state.data_consumers.insert(
                    id_of("dataConsumerId"),
                    DataEntry {
                        transport_id: id_of("transportId"),
                        data_producer_id: Some(id_of("dataProducerId")),
                        sctp_stream_parameters: data["sctpStreamParameters"].clone(),
                        label: data["label"].as_str().unwrap_or_default().to_owned(),
                        protocol: data["protocol"].as_str().unwrap_or_default().to_owned(),
                    },
                );
                Value::Null
            }
            "producer.close" => {
                close_producer(&mut state, &id_of("producerId"), &mut notifications);
                Value::Null
            }
            "producer.dump" => match state.producers.get(&id_of("producerId")) {
                Some(producer) => json!({
                    "id": id_of("producerId"),
                    "kind": producer.kind,
                    "type": producer.typ,
                    "rtpParameters": producer.rtp_parameters,
                    "paused": producer.paused,
                }),
                None => Value::Null,
            },
            "producer.getStats" => match state.producers.get(&id_of("producerId")) {
                Some(producer) => json!([{
                    "type": "inbound-rtp",
                    "timestamp": 1,
                    "kind": producer.kind,
                    "mimeType": producer.rtp_parameters["codecs"][0]["mimeType"],
                    "ssrc": producer.rtp_parameters["encodings"][0]["ssrc"],
                    "score": 10,
                }]),
                None => json!([]),
            },
            "producer.pause" | "producer.resume" => {
                let paused = method == "producer.pause";
                let producer_id = id_of("producerId");
                let changed = match state.producers.get_mut(&producer_id) {
                    Some(producer) => std::mem::replace(&mut producer.paused, paused) != paused,
                    None => false,
                };
                if changed {
                    let event = if paused { "producerpause" } else { "producerresume" };
                    for (consumer_id, consumer) in &state.consumers {
                        if consumer.producer_id == producer_id {
                            notifications.push((consumer_id.clone(), event));
                        }
                    }
                }
                Value::Null
            }
            "consumer.close" => {
                state.consumers.remove(&id_of("consumerId"));
                Value::Null
            }
            "consumer.dump" => {
                let consumer_id = id_of("consumerId");
                match state.consumers.get(&consumer_id) {
                    Some(consumer) => {
                        let producer_paused = state
                            .producers
                            .get(&consumer.producer_id)
                            .map(|producer| producer.paused)
                            .unwrap_or_default();
                        json!({
                            "id": consumer_id,
                            "producerId": consumer.producer_id,
                            "kind": consumer.kind,
                            "type": consumer.typ,
                            "rtpParameters": consumer.rtp_parameters,
                            "paused": consumer.paused,
                            "producerPaused": producer_paused,
                        })
                    }
                    None => Value::Null,
                }
            }
            "consumer.getStats" => match state.consumers.get(&id_of("consumerId")) {
                Some(consumer) => json!([{
                    "type": "outbound-rtp",
                    "timestamp": 1,
                    "kind": consumer.kind,
                    "mimeType": consumer.rtp_parameters["codecs"][0]["mimeType"],
                    "ssrc": consumer.rtp_parameters["encodings"][0]["ssrc"],
                    "score": 10,
                }]),
                None => json!([]),
            },
            "consumer.pause" | "consumer.resume" => {
                if let Some(consumer) = state.consumers.get_mut(&id_of("consumerId")) {
                    consumer.paused = method == "consumer.pause";
                }
                Value::Null
            }
            "consumer.setPreferredLayers" => data.clone(),
            "consumer.requestKeyFrame" => Value::Null,
            "dataProducer.close" => {
                close_data_producer(&mut state, &id_of("dataProducerId"), &mut notifications);
                Value::Null
            }
            "dataProducer.dump" => match state.data_producers.get(&id_of("dataProducerId")) {
                Some(entry) => data_dump(&id_of("dataProducerId"), entry),
                None => Value::Null,
            },
            "dataConsumer.close" => {
                state.data_consumers.remove(&id_of("dataConsumerId"));
                Value::Null
            }
            "dataConsumer.dump" => match state.data_consumers.get(&id_of("dataConsumerId")) {
                Some(entry) => data_dump(&id_of("dataConsumerId"), entry),
                None => Value::Null,
            },
            "dataProducer.getStats" | "dataConsumer.getStats" => {
                let typ = if method.starts_with("dataProducer") {
                    "data-producer"
                } else {
                    "data-consumer"
                };
                json!([{
                "type": typ,
                "timestamp": 1,
                "label": "",
                "protocol": "",
                }])
            }
            _ => {
                let _ = self.outbound_tx.send(json!({
                    "id": id,
                    "error": "Error",
                    "reason": format!("unknown method '{method}'"),
                }));
                return;
            }
        };
        drop(state);

        for (target_id, event) in notifications {
            self.emit(&target_id, event, Value::Null);
        }
        let _ = self.outbound_tx.send(json!({
            "id": id,
            "accepted": true,
            "data": reply,
        }));
    }
}

fn close_transport(
    state: &mut MockState,
    transport_id: &str,
    notifications: &mut Vec<(String, &'static str)>,
) {
    state.transports.remove(transport_id);

    let producer_ids: Vec<String> = state
        .producers
        .iter()
        .filter(|(_, producer)| producer.transport_id == transport_id)
        .map(|(id, _)| id.clone())
        .collect();
    state
        .consumers
        .retain(|_, consumer| consumer.transport_id != transport_id);
    for producer_id in producer_ids {
        close_producer(state, &producer_id, notifications);
    }

    let data_producer_ids: Vec<String> = state
        .data_producers
        .iter()
        .filter(|(_, entry)| entry.transport_id == transport_id)
        .map(|(id, _)| id.clone())
        .collect();
    state
        .data_consumers
        .retain(|_, entry| entry.transport_id != transport_id);
    for data_producer_id in data_producer_ids {
        close_data_producer(state, &data_producer_id, notifications);
    }
}

fn close_producer(
    state: &mut MockState,
    producer_id: &str,
    notifications: &mut Vec<(String, &'static str)>,
) {
    state.producers.remove(producer_id);
    let consumer_ids: Vec<String> = state
        .consumers
        .iter()
        .filter(|(_, consumer)| consumer.producer_id == producer_id)
        .map(|(id, _)| id.clone())
        .collect();
    for consumer_id in consumer_ids {
        state.consumers.remove(&consumer_id);
        notifications.push((consumer_id, "producerclose"));
    }
}

fn close_data_producer(
    state: &mut MockState,
    data_producer_id: &str,
    notifications: &mut Vec<(String, &'static str)>,
) {
    state.data_producers.remove(data_producer_id);
    let ids: Vec<String> = state
        .data_consumers
        .iter()
        .filter(|(_, entry)| entry.data_producer_id.as_deref() == Some(data_producer_id))
        .map(|(id, _)| id.clone())
        .collect();
    for id in ids {
        state.data_consumers.remove(&id);
        notifications.push((id, "dataproducerclose"));
    }
}

fn sorted_ids<'a, T: 'a>(
    entries: impl Iterator<Item = (&'a String, &'a T)>,
    owned: impl Fn(&T) -> bool,
) -> Vec<String> {
    let mut ids: Vec<String> = entries
        .filter(|(_, entry)| owned(entry))
        .map(|(id, _)| id.clone())
        .collect();
    ids.sort();
    ids
}

fn transport_dump(state: &MockState, transport_id: &str) -> Value {
    json!({
        "id": transport_id,
        "producerIds": sorted_ids(state.producers.iter(), |p| p.transport_id == transport_id),
        "consumerIds": sorted_ids(state.consumers.iter(), |c| c.transport_id == transport_id),
        "dataProducerIds": sorted_ids(state.data_producers.iter(), |d| d.transport_id == transport_id),
        "dataConsumerIds": sorted_ids(state.data_consumers.iter(), |d| d.transport_id == transport_id),
    })
}

fn data_dump(id: &str, entry: &DataEntry) -> Value {
    json!({
        "id": id,
        "dataProducerId": entry.data_producer_id,
        "sctpStreamParameters": entry.sctp_stream_parameters,
        "label": entry.label,
        "protocol": entry.protocol,
    })
}

fn tuple(ip: &Value) -> Value {
    json!({
        "localIp": ip,
        "localPort": 40000,
        "protocol": "udp",
    })
}

fn sctp_parameters(options: &Value) -> Value {
    if options["enableSctp"].as_bool().unwrap_or_default() {
        json!({
            "port": 5000,
            "OS": options["numSctpStreams"]["OS"],
            "MIS": options["numSctpStreams"]["MIS"],
            "maxMessageSize": options["maxSctpMessageSize"],
        })
    } else {
        Value::Null
    }
}

fn sctp_state(options: &Value) -> Value {
    if options["enableSctp"].as_bool().unwrap_or_default() {
        json!("new")
    } else {
        Value::Null
    }
}

fn webrtc_transport_data(options: &Value) -> Value {
    let ip = &options["listenIps"][0]["ip"];
    json!({
        "iceRole": "controlled",
        "iceParameters": {
            "usernameFragment": "mockufrag",
            "password": "mockpassword",
            "iceLite": true,
        },
        "iceCandidates": [{
            "foundation": "udpcandidate",
            "priority": 1076302079,
            "ip": ip,
            "protocol": "udp",
            "port": 40000,
            "type": "host",
        }],
        "iceState": "new",
        "dtlsParameters": {
            "role": "auto",
            "fingerprints": [{
                "algorithm": "sha-256",
                "value": "82:5A:68:3D:36:C3:0A:DE:AF:E7:32:43:D2:88:83:57",
            }],
        },
        "dtlsState": "new",
        "sctpParameters": sctp_parameters(options),
        "sctpState": sctp_state(options),
    })
}
