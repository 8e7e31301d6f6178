use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Internal addresses the entity a request targets inside the worker.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Internal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_producer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_consumer_id: Option<String>,
}

impl Internal {
    pub fn router(router_id: &str) -> Self {
        Internal {
            router_id: Some(router_id.to_owned()),
            ..Default::default()
        }
    }

    pub fn with_transport(mut self, transport_id: &str) -> Self {
        self.transport_id = Some(transport_id.to_owned());
        self
    }

    pub fn with_producer(mut self, producer_id: &str) -> Self {
        self.producer_id = Some(producer_id.to_owned());
        self
    }

    pub fn with_consumer(mut self, consumer_id: &str) -> Self {
        self.consumer_id = Some(consumer_id.to_owned());
        self
    }

    pub fn with_data_producer(mut self, data_producer_id: &str) -> Self {
        self.data_producer_id = Some(data_producer_id.to_owned());
        self
    }

    pub fn with_data_consumer(mut self, data_consumer_id: &str) -> Self {
        self.data_consumer_id = Some(data_consumer_id.to_owned());
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RequestMessage<'a> {
    pub(crate) id: u32,
    pub(crate) method: &'a str,
    pub(crate) internal: &'a Internal,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub(crate) data: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ResponseMessage {
    pub(crate) id: u32,
    #[serde(default)]
    pub(crate) accepted: bool,
    #[serde(default)]
    pub(crate) data: Value,
    #[serde(default)]
    pub(crate) error: Option<String>,
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NotificationMessage {
    #[serde(deserialize_with = "target_id")]
    pub(crate) target_id: String,
    pub(crate) event: String,
    #[serde(default)]
    pub(crate) data: Value,
}

// The worker addresses itself by pid, so numeric target ids are accepted.
fn target_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "invalid targetId {other}"
        ))),
    }
}

#[derive(Debug)]
pub(crate) enum IncomingMessage {
    Response(ResponseMessage),
    Notification(NotificationMessage),
}

impl IncomingMessage {
    pub(crate) fn parse(frame: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(frame)?;

        if value.get("id").is_some() {
            Ok(IncomingMessage::Response(serde_json::from_value(value)?))
        } else if value.get("targetId").is_some() {
            Ok(IncomingMessage::Notification(serde_json::from_value(value)?))
        } else {
            Err(Error::ErrProtocol(format!(
                "message is neither a response nor a notification: {value}"
            )))
        }
    }
}

impl ResponseMessage {
    pub(crate) fn into_result(self, method: &str) -> Result<Value> {
        if self.accepted {
            return Ok(self.data);
        }

        match self.error {
            Some(error) => Err(Error::ErrWorker {
                error,
                reason: self.reason.unwrap_or_default(),
            }),
            None => Err(Error::ErrProtocol(format!(
                "response to {method} neither accepted nor rejected"
            ))),
        }
    }
}
