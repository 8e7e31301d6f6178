use serde::{Deserialize, Serialize};

use super::transport_data::{DtlsParameters, SrtpParameters};
use crate::AppData;

pub const DEFAULT_INITIAL_AVAILABLE_OUTGOING_BITRATE: u32 = 600_000;
pub const DEFAULT_NUM_SCTP_STREAMS: u16 = 1024;
pub const DEFAULT_MAX_SCTP_MESSAGE_SIZE: u32 = 262_144;

/// TransportListenIp is a local address the worker binds, optionally
/// advertised to peers under another address.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportListenIp {
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announced_ip: Option<String>,
}

impl TransportListenIp {
    pub fn new(ip: &str) -> Self {
        TransportListenIp {
            ip: ip.to_owned(),
            announced_ip: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumSctpStreams {
    #[serde(rename = "OS")]
    pub os: u16,
    #[serde(rename = "MIS")]
    pub mis: u16,
}

impl Default for NumSctpStreams {
    fn default() -> Self {
        NumSctpStreams {
            os: DEFAULT_NUM_SCTP_STREAMS,
            mis: DEFAULT_NUM_SCTP_STREAMS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebRtcTransportOptions {
    pub listen_ips: Vec<TransportListenIp>,
    pub enable_udp: bool,
    pub enable_tcp: bool,
    pub prefer_udp: bool,
    pub prefer_tcp: bool,
    pub initial_available_outgoing_bitrate: u32,
    pub enable_sctp: bool,
    pub num_sctp_streams: NumSctpStreams,
    pub max_sctp_message_size: u32,
    #[serde(skip)]
    pub app_data: AppData,
}

impl Default for WebRtcTransportOptions {
    fn default() -> Self {
        WebRtcTransportOptions {
            listen_ips: vec![],
            enable_udp: true,
            enable_tcp: false,
            prefer_udp: false,
            prefer_tcp: false,
            initial_available_outgoing_bitrate: DEFAULT_INITIAL_AVAILABLE_OUTGOING_BITRATE,
            enable_sctp: false,
            num_sctp_streams: NumSctpStreams::default(),
            max_sctp_message_size: DEFAULT_MAX_SCTP_MESSAGE_SIZE,
            app_data: AppData::Null,
        }
    }
}

impl WebRtcTransportOptions {
    pub fn new(listen_ips: Vec<TransportListenIp>) -> Self {
        WebRtcTransportOptions {
            listen_ips,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlainTransportOptions {
    pub listen_ip: TransportListenIp,
    pub rtcp_mux: bool,
    /// comedia makes the worker learn the remote address from the first
    /// packet it receives.
    pub comedia: bool,
    pub enable_sctp: bool,
    pub num_sctp_streams: NumSctpStreams,
    pub max_sctp_message_size: u32,
    pub enable_srtp: bool,
    pub srtp_crypto_suite: String,
    #[serde(skip)]
    pub app_data: AppData,
}

impl Default for PlainTransportOptions {
    fn default() -> Self {
        PlainTransportOptions {
            listen_ip: TransportListenIp::default(),
            rtcp_mux: true,
            comedia: false,
            enable_sctp: false,
            num_sctp_streams: NumSctpStreams::default(),
            max_sctp_message_size: DEFAULT_MAX_SCTP_MESSAGE_SIZE,
            enable_srtp: false,
            srtp_crypto_suite: "AES_CM_128_HMAC_SHA1_80".to_owned(),
            app_data: AppData::Null,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipeTransportOptions {
    pub listen_ip: TransportListenIp,
    pub enable_sctp: bool,
    pub num_sctp_streams: NumSctpStreams,
    pub max_sctp_message_size: u32,
    pub enable_rtx: bool,
    pub enable_srtp: bool,
    #[serde(skip)]
    pub app_data: AppData,
}

impl Default for PipeTransportOptions {
    fn default() -> Self {
        PipeTransportOptions {
            listen_ip: TransportListenIp::default(),
            enable_sctp: false,
            num_sctp_streams: NumSctpStreams::default(),
            max_sctp_message_size: DEFAULT_MAX_SCTP_MESSAGE_SIZE,
            enable_rtx: false,
            enable_srtp: false,
            app_data: AppData::Null,
        }
    }
}

/// TransportConnectOptions carries the remote side of a transport. WebRTC
/// transports need `dtls_parameters`; plain and pipe transports take the
/// remote address.
#[derive(Default, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConnectOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtls_parameters: Option<DtlsParameters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtcp_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srtp_parameters: Option<SrtpParameters>,
}
