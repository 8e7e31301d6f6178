#![allow(dead_code)]

pub mod mock_worker;

use std::sync::Arc;
use std::time::Duration;

use sfu_control::consumer::ConsumerOptions;
use sfu_control::event::{Event, EventHdlrFn};
use sfu_control::producer::{Producer, ProducerOptions};
use sfu_control::router::{Router, RouterOptions};
use sfu_control::rtp_parameters::*;
use sfu_control::transport::{Transport, TransportListenIp, WebRtcTransportOptions};
use sfu_control::worker::Worker;
use tokio::sync::mpsc;

pub use mock_worker::{MockWorker, MOCK_PID};

pub fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn media_codecs() -> Vec<RtpCodecCapability> {
    vec![
        RtpCodecCapability {
            kind: MediaKind::Audio,
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: Some(2),
            ..Default::default()
        },
        RtpCodecCapability {
            kind: MediaKind::Video,
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
        RtpCodecCapability {
            kind: MediaKind::Video,
            mime_type: MIME_TYPE_H264.to_owned(),
            clock_rate: 90000,
            parameters: RtpCodecSpecificParameters {
                level_asymmetry_allowed: Some(1),
                packetization_mode: Some(1),
                profile_level_id: Some("4d0032".to_owned()),
                ..Default::default()
            },
            ..Default::default()
        },
    ]
}

pub fn audio_producer_options() -> ProducerOptions {
    let rtp_parameters = RtpParameters {
        mid: Some("AUDIO".to_owned()),
        codecs: vec![RtpCodecParameters {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            payload_type: 111,
            clock_rate: 48000,
            channels: Some(2),
            parameters: RtpCodecSpecificParameters {
                useinbandfec: Some(1),
                usedtx: Some(1),
                ..Default::default()
            },
            rtcp_feedback: vec![],
        }],
        header_extensions: vec![
            RtpHeaderExtensionParameters {
                uri: MID_URI.to_owned(),
                id: 10,
                ..Default::default()
            },
            RtpHeaderExtensionParameters {
                uri: AUDIO_LEVEL_URI.to_owned(),
                id: 12,
                ..Default::default()
            },
        ],
        encodings: vec![RtpEncodingParameters {
            ssrc: Some(11111111),
            ..Default::default()
        }],
        rtcp: RtcpParameters {
            cname: Some("FOOBAR".to_owned()),
            ..Default::default()
        },
    };

    let mut options = ProducerOptions::new(MediaKind::Audio, rtp_parameters);
    options.app_data = serde_json::json!({ "foo": 1, "bar": "2" });
    options
}

pub fn video_producer_options() -> ProducerOptions {
    let encoding = |ssrc: u32| RtpEncodingParameters {
        ssrc: Some(ssrc),
        rtx: Some(RtpEncodingRtx { ssrc: ssrc + 1 }),
        ..Default::default()
    };
    let rtp_parameters = RtpParameters {
        mid: Some("VIDEO".to_owned()),
        codecs: vec![
            RtpCodecParameters {
                mime_type: "video/h264".to_owned(),
                payload_type: 112,
                clock_rate: 90000,
                parameters: RtpCodecSpecificParameters {
                    packetization_mode: Some(1),
                    profile_level_id: Some("4d0032".to_owned()),
                    ..Default::default()
                },
                rtcp_feedback: vec![
                    RtcpFeedback::new("nack", ""),
                    RtcpFeedback::new("nack", "pli"),
                    RtcpFeedback::new("goog-remb", ""),
                ],
                ..Default::default()
            },
            RtpCodecParameters {
                mime_type: MIME_TYPE_RTX.to_owned(),
                payload_type: 113,
                clock_rate: 90000,
                parameters: RtpCodecSpecificParameters {
                    apt: Some(112),
                    ..Default::default()
                },
                ..Default::default()
            },
        ],
        header_extensions: vec![
            RtpHeaderExtensionParameters {
                uri: MID_URI.to_owned(),
                id: 10,
                ..Default::default()
            },
            RtpHeaderExtensionParameters {
                uri: VIDEO_ORIENTATION_URI.to_owned(),
                id: 13,
                ..Default::default()
            },
        ],
        encodings: vec![
            encoding(22222222),
            encoding(22222224),
            encoding(22222226),
            encoding(22222228),
        ],
        rtcp: RtcpParameters {
            cname: Some("FOOBAR".to_owned()),
            ..Default::default()
        },
    };

    ProducerOptions::new(MediaKind::Video, rtp_parameters)
}

/// consumer_device_capabilities is what a typical receiving endpoint
/// announces: opus plus H264 with rtx.
pub fn consumer_device_capabilities() -> RtpCapabilities {
    let extension = |kind: MediaKind, uri: &str, preferred_id: u16| RtpHeaderExtension {
        kind,
        uri: uri.to_owned(),
        preferred_id,
        ..Default::default()
    };

    RtpCapabilities {
        codecs: vec![
            RtpCodecCapability {
                kind: MediaKind::Audio,
                mime_type: MIME_TYPE_OPUS.to_owned(),
                preferred_payload_type: Some(100),
                clock_rate: 48000,
                channels: Some(2),
                ..Default::default()
            },
            RtpCodecCapability {
                kind: MediaKind::Video,
                mime_type: MIME_TYPE_H264.to_owned(),
                preferred_payload_type: Some(101),
                clock_rate: 90000,
                parameters: RtpCodecSpecificParameters {
                    level_asymmetry_allowed: Some(1),
                    packetization_mode: Some(1),
                    profile_level_id: Some("4d0032".to_owned()),
                    ..Default::default()
                },
                rtcp_feedback: vec![
                    RtcpFeedback::new("nack", ""),
                    RtcpFeedback::new("nack", "pli"),
                    RtcpFeedback::new("ccm", "fir"),
                    RtcpFeedback::new("goog-remb", ""),
                ],
                ..Default::default()
            },
            RtpCodecCapability {
                kind: MediaKind::Video,
                mime_type: MIME_TYPE_RTX.to_owned(),
                preferred_payload_type: Some(102),
                clock_rate: 90000,
                parameters: RtpCodecSpecificParameters {
                    apt: Some(101),
                    ..Default::default()
                },
                ..Default::default()
            },
        ],
        header_extensions: vec![
            extension(MediaKind::Audio, MID_URI, 1),
            extension(MediaKind::Video, MID_URI, 1),
            extension(MediaKind::Video, RTP_STREAM_ID_URI, 2),
            extension(MediaKind::Audio, ABS_SEND_TIME_URI, 4),
            extension(MediaKind::Video, ABS_SEND_TIME_URI, 4),
            extension(MediaKind::Audio, AUDIO_LEVEL_URI, 10),
            extension(MediaKind::Video, VIDEO_ORIENTATION_URI, 11),
            extension(MediaKind::Video, TOFFSET_URI, 12),
        ],
    }
}

pub fn consumer_options(producer: &Producer) -> ConsumerOptions {
    ConsumerOptions::new(producer.id(), consumer_device_capabilities())
}

pub async fn create_router(worker: &Worker) -> anyhow::Result<Arc<Router>> {
    Ok(worker
        .create_router(RouterOptions::new(media_codecs()))
        .await?)
}

pub fn webrtc_options() -> WebRtcTransportOptions {
    WebRtcTransportOptions::new(vec![TransportListenIp::new("127.0.0.1")])
}

pub async fn create_webrtc_transport(router: &Router) -> anyhow::Result<Arc<Transport>> {
    Ok(router.create_webrtc_transport(webrtc_options()).await?)
}

/// Room is a worker with one router, a sending transport carrying an audio
/// and a paused video producer, and an empty receiving transport.
pub struct Room {
    pub mock: MockWorker,
    pub worker: Arc<Worker>,
    pub router: Arc<Router>,
    pub transport1: Arc<Transport>,
    pub transport2: Arc<Transport>,
    pub audio_producer: Arc<Producer>,
    pub video_producer: Arc<Producer>,
}

impl Room {
    pub async fn new() -> anyhow::Result<Self> {
        init_log();
        let (worker, mock) = MockWorker::start().await;
        let router = create_router(&worker).await?;
        let transport1 = create_webrtc_transport(&router).await?;
        let transport2 = create_webrtc_transport(&router).await?;

        let audio_producer = transport1.produce(audio_producer_options()).await?;
        let mut video_options = video_producer_options();
        video_options.paused = true;
        let video_producer = transport1.produce(video_options).await?;

        Ok(Room {
            mock,
            worker,
            router,
            transport1,
            transport2,
            audio_producer,
            video_producer,
        })
    }
}

/// forward returns a handler that pushes every event into `tx`.
pub fn forward<E: Event>(tx: mpsc::UnboundedSender<E>) -> EventHdlrFn<E> {
    Box::new(move |event: E| {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx.send(event);
        })
    })
}

/// next waits a bounded time for the next forwarded event.
pub async fn next<E>(rx: &mut mpsc::UnboundedReceiver<E>) -> anyhow::Result<E> {
    match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => anyhow::bail!("event channel closed"),
        Err(_) => anyhow::bail!("timed out waiting for event"),
    }
}
