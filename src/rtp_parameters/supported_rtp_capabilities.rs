use super::*;

fn video_feedback() -> Vec<RtcpFeedback> {
    vec![
        RtcpFeedback::new("nack", ""),
        RtcpFeedback::new("nack", "pli"),
        RtcpFeedback::new("ccm", "fir"),
        RtcpFeedback::new("goog-remb", ""),
        RtcpFeedback::new("transport-cc", ""),
    ]
}

fn audio(
    mime_type: &str,
    preferred_payload_type: Option<PayloadType>,
    clock_rate: u32,
    channels: Option<u8>,
    rtcp_feedback: Vec<RtcpFeedback>,
) -> RtpCodecCapability {
    RtpCodecCapability {
        kind: MediaKind::Audio,
        mime_type: mime_type.to_owned(),
        preferred_payload_type,
        clock_rate,
        channels,
        parameters: RtpCodecSpecificParameters::default(),
        rtcp_feedback,
    }
}

fn video(mime_type: &str, parameters: RtpCodecSpecificParameters) -> RtpCodecCapability {
    RtpCodecCapability {
        kind: MediaKind::Video,
        mime_type: mime_type.to_owned(),
        preferred_payload_type: None,
        clock_rate: 90000,
        channels: None,
        parameters,
        rtcp_feedback: video_feedback(),
    }
}

fn h26x(mime_type: &str, packetization_mode: u8) -> RtpCodecCapability {
    video(
        mime_type,
        RtpCodecSpecificParameters {
            packetization_mode: Some(packetization_mode),
            level_asymmetry_allowed: Some(1),
            ..Default::default()
        },
    )
}

fn header_extension(
    kind: MediaKind,
    uri: &str,
    preferred_id: u16,
    direction: RtpHeaderExtensionDirection,
) -> RtpHeaderExtension {
    RtpHeaderExtension {
        kind,
        uri: uri.to_owned(),
        preferred_id,
        preferred_encrypt: false,
        direction,
    }
}

/// supported_rtp_capabilities returns the catalogue of codecs and header
/// extensions the worker is able to route. Router capabilities are always
/// derived from it.
pub fn supported_rtp_capabilities() -> RtpCapabilities {
    use MediaKind::{Audio, Video};
    use RtpHeaderExtensionDirection::{RecvOnly, SendRecv};

    let transport_cc = || vec![RtcpFeedback::new("transport-cc", "")];

    RtpCapabilities {
        codecs: vec![
            audio(MIME_TYPE_OPUS, None, 48000, Some(2), transport_cc()),
            audio(MIME_TYPE_PCMU, Some(0), 8000, Some(1), transport_cc()),
            audio(MIME_TYPE_PCMA, Some(8), 8000, Some(1), transport_cc()),
            audio("audio/ISAC", None, 32000, Some(1), transport_cc()),
            audio("audio/ISAC", None, 16000, Some(1), transport_cc()),
            audio(MIME_TYPE_G722, Some(9), 8000, Some(1), transport_cc()),
            audio("audio/iLBC", None, 8000, Some(1), transport_cc()),
            audio("audio/SILK", None, 24000, Some(1), transport_cc()),
            audio("audio/SILK", None, 16000, Some(1), transport_cc()),
            audio("audio/SILK", None, 12000, Some(1), transport_cc()),
            audio("audio/SILK", None, 8000, Some(1), transport_cc()),
            audio("audio/CN", Some(13), 32000, Some(1), vec![]),
            audio("audio/CN", Some(13), 16000, Some(1), vec![]),
            audio("audio/CN", Some(13), 8000, Some(1), vec![]),
            audio("audio/telephone-event", None, 48000, Some(1), vec![]),
            audio("audio/telephone-event", None, 32000, Some(1), vec![]),
            audio("audio/telephone-event", None, 16000, Some(1), vec![]),
            audio("audio/telephone-event", None, 8000, Some(1), vec![]),
            video(MIME_TYPE_VP8, RtpCodecSpecificParameters::default()),
            video(MIME_TYPE_VP9, RtpCodecSpecificParameters::default()),
            h26x(MIME_TYPE_H264, 1),
            h26x(MIME_TYPE_H264, 0),
            h26x(MIME_TYPE_H265, 1),
            h26x(MIME_TYPE_H265, 0),
        ],
        header_extensions: vec![
            header_extension(Audio, MID_URI, 1, SendRecv),
            header_extension(Video, MID_URI, 1, SendRecv),
            header_extension(Video, RTP_STREAM_ID_URI, 2, RecvOnly),
            header_extension(Video, REPAIRED_RTP_STREAM_ID_URI, 3, RecvOnly),
            header_extension(Audio, ABS_SEND_TIME_URI, 4, SendRecv),
            header_extension(Video, ABS_SEND_TIME_URI, 4, SendRecv),
            header_extension(Audio, TRANSPORT_CC_URI, 5, RecvOnly),
            header_extension(Video, TRANSPORT_CC_URI, 5, SendRecv),
            header_extension(Video, FRAME_MARKING_07_URI, 6, SendRecv),
            header_extension(Video, FRAME_MARKING_URI, 7, SendRecv),
            header_extension(Audio, AUDIO_LEVEL_URI, 10, SendRecv),
            header_extension(Video, VIDEO_ORIENTATION_URI, 11, SendRecv),
            header_extension(Video, TOFFSET_URI, 12, SendRecv),
        ],
    }
}
