use super::*;

fn opus_codec() -> RtpCodecCapability {
    RtpCodecCapability {
        kind: MediaKind::Audio,
        mime_type: MIME_TYPE_OPUS.to_owned(),
        clock_rate: 48000,
        channels: Some(2),
        ..Default::default()
    }
}

fn vp8_codec() -> RtpCodecCapability {
    RtpCodecCapability {
        kind: MediaKind::Video,
        mime_type: MIME_TYPE_VP8.to_owned(),
        clock_rate: 90000,
        ..Default::default()
    }
}

fn h264_params() -> RtpCodecSpecificParameters {
    RtpCodecSpecificParameters {
        packetization_mode: Some(1),
        profile_level_id: Some("4d0032".to_owned()),
        ..Default::default()
    }
}

fn router_media_codecs() -> Vec<RtpCodecCapability> {
    vec![
        opus_codec(),
        vp8_codec(),
        RtpCodecCapability {
            kind: MediaKind::Video,
            mime_type: MIME_TYPE_H264.to_owned(),
            clock_rate: 90000,
            parameters: RtpCodecSpecificParameters {
                level_asymmetry_allowed: Some(1),
                ..h264_params()
            },
            ..Default::default()
        },
    ]
}

fn router_caps() -> RtpCapabilities {
    match generate_router_rtp_capabilities(&router_media_codecs()) {
        Ok(caps) => caps,
        Err(err) => panic!("router capabilities: {err}"),
    }
}

fn audio_producer_parameters() -> RtpParameters {
    RtpParameters {
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
    }
}

fn video_producer_parameters() -> RtpParameters {
    let encoding = |ssrc: u32| RtpEncodingParameters {
        ssrc: Some(ssrc),
        rtx: Some(RtpEncodingRtx { ssrc: ssrc + 1 }),
        ..Default::default()
    };

    RtpParameters {
        mid: Some("VIDEO".to_owned()),
        codecs: vec![
            RtpCodecParameters {
                mime_type: MIME_TYPE_H264.to_owned(),
                payload_type: 112,
                clock_rate: 90000,
                parameters: h264_params(),
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
    }
}

fn header_extension(kind: MediaKind, uri: &str, preferred_id: u16) -> RtpHeaderExtension {
    RtpHeaderExtension {
        kind,
        uri: uri.to_owned(),
        preferred_id,
        ..Default::default()
    }
}

fn consumer_device_capabilities() -> RtpCapabilities {
    RtpCapabilities {
        codecs: vec![
            RtpCodecCapability {
                preferred_payload_type: Some(100),
                ..opus_codec()
            },
            RtpCodecCapability {
                kind: MediaKind::Video,
                mime_type: MIME_TYPE_H264.to_owned(),
                preferred_payload_type: Some(101),
                clock_rate: 90000,
                parameters: h264_params(),
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
            header_extension(MediaKind::Audio, MID_URI, 1),
            header_extension(MediaKind::Video, MID_URI, 1),
            header_extension(MediaKind::Video, RTP_STREAM_ID_URI, 2),
            header_extension(MediaKind::Audio, ABS_SEND_TIME_URI, 4),
            header_extension(MediaKind::Video, ABS_SEND_TIME_URI, 4),
            header_extension(MediaKind::Audio, AUDIO_LEVEL_URI, 10),
            header_extension(MediaKind::Video, VIDEO_ORIENTATION_URI, 11),
            header_extension(MediaKind::Video, TOFFSET_URI, 12),
        ],
    }
}

fn consumable(kind: MediaKind, params: &RtpParameters) -> Result<RtpParameters> {
    let caps = router_caps();
    let mapping = get_producer_rtp_parameters_mapping(params, &caps)?;
    get_consumable_rtp_parameters(kind, params, &caps, &mapping)
}

#[test]
fn test_generate_router_rtp_capabilities() -> Result<()> {
    let caps = generate_router_rtp_capabilities(&router_media_codecs())?;

    let payload_types: Vec<(&str, Option<PayloadType>)> = caps
        .codecs
        .iter()
        .map(|codec| (codec.mime_type.as_str(), codec.preferred_payload_type))
        .collect();
    assert_eq!(
        payload_types,
        vec![
            ("audio/opus", Some(100)),
            ("video/VP8", Some(101)),
            ("video/rtx", Some(102)),
            ("video/H264", Some(103)),
            ("video/rtx", Some(104)),
        ]
    );
    assert_eq!(caps.codecs[2].parameters.apt, Some(101));
    assert_eq!(caps.codecs[4].parameters.apt, Some(103));
    assert_eq!(
        caps.codecs[3].parameters,
        RtpCodecSpecificParameters {
            level_asymmetry_allowed: Some(1),
            ..h264_params()
        }
    );
    assert!(caps.codecs[3]
        .rtcp_feedback
        .contains(&RtcpFeedback::new("transport-cc", "")));
    assert_eq!(
        caps.header_extensions,
        supported_rtp_capabilities().header_extensions
    );

    Ok(())
}

#[test]
fn test_generate_router_rtp_capabilities_reserves_preferred_payload_types() -> Result<()> {
    let caps = generate_router_rtp_capabilities(&[
        opus_codec(),
        RtpCodecCapability {
            preferred_payload_type: Some(100),
            ..vp8_codec()
        },
    ])?;

    let payload_types: Vec<Option<PayloadType>> = caps
        .codecs
        .iter()
        .map(|codec| codec.preferred_payload_type)
        .collect();
    assert_eq!(payload_types, vec![Some(101), Some(100), Some(102)]);
    assert_eq!(caps.codecs[2].parameters.apt, Some(100));

    Ok(())
}

#[test]
fn test_generate_router_rtp_capabilities_static_payload_type() -> Result<()> {
    let caps = generate_router_rtp_capabilities(&[RtpCodecCapability {
        kind: MediaKind::Audio,
        mime_type: "audio/pcmu".to_owned(),
        clock_rate: 8000,
        ..Default::default()
    }])?;

    assert_eq!(caps.codecs.len(), 1);
    assert_eq!(caps.codecs[0].mime_type, MIME_TYPE_PCMU);
    assert_eq!(caps.codecs[0].preferred_payload_type, Some(0));

    Ok(())
}

#[test]
fn test_generate_router_rtp_capabilities_errors() {
    let unsupported = generate_router_rtp_capabilities(&[RtpCodecCapability {
        kind: MediaKind::Audio,
        mime_type: "audio/chewbacca".to_owned(),
        clock_rate: 32000,
        ..Default::default()
    }]);
    assert!(matches!(unsupported, Err(Error::ErrUnsupported(_))));

    let duplicated_payload_type = generate_router_rtp_capabilities(&[
        RtpCodecCapability {
            preferred_payload_type: Some(100),
            ..opus_codec()
        },
        RtpCodecCapability {
            preferred_payload_type: Some(100),
            ..vp8_codec()
        },
    ]);
    assert!(matches!(
        duplicated_payload_type,
        Err(Error::ErrInvalidRtpCapabilities(_))
    ));

    let duplicated_codec = generate_router_rtp_capabilities(&[vp8_codec(), vp8_codec()]);
    assert!(matches!(duplicated_codec, Err(Error::ErrUnsupported(_))));

    let wrong_kind = generate_router_rtp_capabilities(&[RtpCodecCapability {
        kind: MediaKind::Audio,
        ..vp8_codec()
    }]);
    assert!(matches!(
        wrong_kind,
        Err(Error::ErrInvalidRtpCapabilities(_))
    ));
}

#[test]
fn test_generate_router_rtp_capabilities_cannot_allocate() {
    let codecs: Vec<RtpCodecCapability> = (0..17)
        .map(|profile_id| RtpCodecCapability {
            kind: MediaKind::Video,
            mime_type: MIME_TYPE_VP9.to_owned(),
            clock_rate: 90000,
            parameters: RtpCodecSpecificParameters {
                profile_id: Some(profile_id),
                ..Default::default()
            },
            ..Default::default()
        })
        .collect();

    assert!(matches!(
        generate_router_rtp_capabilities(&codecs),
        Err(Error::ErrCannotAllocate)
    ));
    assert!(generate_router_rtp_capabilities(&codecs[..16]).is_ok());
}

#[test]
fn test_get_producer_rtp_parameters_mapping() -> Result<()> {
    let caps = router_caps();

    let mapping = get_producer_rtp_parameters_mapping(&video_producer_parameters(), &caps)?;
    assert_eq!(
        mapping.codecs,
        vec![
            RtpMappingCodec {
                payload_type: 112,
                mapped_payload_type: 103
            },
            RtpMappingCodec {
                payload_type: 113,
                mapped_payload_type: 104
            },
        ]
    );
    assert_eq!(mapping.encodings.len(), 4);
    let base = mapping.encodings[0].mapped_ssrc;
    for (i, encoding) in mapping.encodings.iter().enumerate() {
        assert_eq!(encoding.ssrc, Some(22222222 + 2 * i as u32));
        assert_eq!(encoding.mapped_ssrc, base + i as u32);
    }

    let mapping = get_producer_rtp_parameters_mapping(&audio_producer_parameters(), &caps)?;
    assert_eq!(
        mapping.codecs,
        vec![RtpMappingCodec {
            payload_type: 111,
            mapped_payload_type: 100
        }]
    );

    Ok(())
}

#[test]
fn test_get_producer_rtp_parameters_mapping_unsupported() {
    let caps = router_caps();

    let mut params = video_producer_parameters();
    params.codecs[0].parameters.profile_level_id = Some("42e01f".to_owned());
    assert!(matches!(
        get_producer_rtp_parameters_mapping(&params, &caps),
        Err(Error::ErrUnsupported(_))
    ));

    let mut params = video_producer_parameters();
    params.codecs[1].parameters.apt = Some(99);
    assert!(matches!(
        get_producer_rtp_parameters_mapping(&params, &caps),
        Err(Error::ErrUnsupported(_))
    ));
}

#[test]
fn test_get_consumable_rtp_parameters() -> Result<()> {
    let caps = router_caps();
    let params = video_producer_parameters();
    let mapping = get_producer_rtp_parameters_mapping(&params, &caps)?;
    let consumable = get_consumable_rtp_parameters(MediaKind::Video, &params, &caps, &mapping)?;

    assert_eq!(consumable.mid, None);
    assert_eq!(consumable.codecs.len(), 2);
    assert_eq!(consumable.codecs[0].payload_type, 103);
    assert_eq!(consumable.codecs[0].parameters, h264_params());
    assert_eq!(consumable.codecs[0].rtcp_feedback, caps.codecs[3].rtcp_feedback);
    assert_eq!(consumable.codecs[1].payload_type, 104);
    assert_eq!(consumable.codecs[1].parameters.apt, Some(103));

    assert_eq!(consumable.encodings.len(), params.encodings.len());
    for (encoding, mapped) in consumable.encodings.iter().zip(mapping.encodings.iter()) {
        assert_eq!(encoding.ssrc, Some(mapped.mapped_ssrc));
        assert!(encoding.rtx.is_none());
        assert!(encoding.rid.is_none());
    }

    let uris: Vec<&str> = consumable
        .header_extensions
        .iter()
        .map(|ext| ext.uri.as_str())
        .collect();
    assert!(uris.contains(&TRANSPORT_CC_URI));
    assert!(!uris.contains(&RTP_STREAM_ID_URI));
    assert!(!uris.contains(&AUDIO_LEVEL_URI));

    assert_eq!(consumable.rtcp.cname.as_deref(), Some("FOOBAR"));
    assert!(consumable.rtcp.reduced_size);
    assert_eq!(consumable.rtcp.mux, Some(true));

    Ok(())
}

#[test]
fn test_get_consumer_rtp_parameters_audio() -> Result<()> {
    let consumable = consumable(MediaKind::Audio, &audio_producer_parameters())?;
    let caps = consumer_device_capabilities();

    assert!(can_consume(&consumable, &caps)?);
    assert_eq!(ConsumerType::for_consumable(&consumable), ConsumerType::Simple);

    let params = get_consumer_rtp_parameters(&consumable, &caps, ConsumerType::Simple)?;
    assert_eq!(params.codecs.len(), 1);
    assert_eq!(params.codecs[0].mime_type, MIME_TYPE_OPUS);
    assert_eq!(params.codecs[0].payload_type, 100);
    assert_eq!(params.codecs[0].channels, Some(2));
    assert_eq!(
        params.codecs[0].parameters,
        RtpCodecSpecificParameters {
            useinbandfec: Some(1),
            usedtx: Some(1),
            ..Default::default()
        }
    );
    assert!(params.codecs[0].rtcp_feedback.is_empty());

    assert_eq!(params.encodings.len(), 1);
    assert!(params.encodings[0].ssrc.is_some());
    assert!(params.encodings[0].rtx.is_none());

    let uris: Vec<(&str, u16)> = params
        .header_extensions
        .iter()
        .map(|ext| (ext.uri.as_str(), ext.id))
        .collect();
    assert_eq!(
        uris,
        vec![(MID_URI, 1), (ABS_SEND_TIME_URI, 4), (AUDIO_LEVEL_URI, 10)]
    );

    assert_eq!(get_supported_codec_payload_types(&params), vec![100]);
    assert_eq!(
        get_consumable_rtp_encodings(&consumable, ConsumerType::Simple),
        consumable.encodings
    );

    Ok(())
}

#[test]
fn test_get_consumer_rtp_parameters_simulcast() -> Result<()> {
    let consumable = consumable(MediaKind::Video, &video_producer_parameters())?;
    let caps = consumer_device_capabilities();

    assert!(can_consume(&consumable, &caps)?);
    assert_eq!(
        ConsumerType::for_consumable(&consumable),
        ConsumerType::Simulcast
    );

    let params = get_consumer_rtp_parameters(&consumable, &caps, ConsumerType::Simulcast)?;
    assert_eq!(params.codecs.len(), 2);
    assert_eq!(params.codecs[0].mime_type, MIME_TYPE_H264);
    assert_eq!(params.codecs[0].payload_type, 103);
    assert_eq!(params.codecs[0].parameters, h264_params());
    assert_eq!(
        params.codecs[0].rtcp_feedback,
        vec![
            RtcpFeedback::new("nack", ""),
            RtcpFeedback::new("nack", "pli"),
            RtcpFeedback::new("ccm", "fir"),
            RtcpFeedback::new("goog-remb", ""),
        ]
    );
    assert_eq!(params.codecs[1].mime_type, MIME_TYPE_RTX);
    assert_eq!(params.codecs[1].payload_type, 104);
    assert_eq!(params.codecs[1].parameters.apt, Some(103));

    assert_eq!(params.encodings.len(), 1);
    let encoding = &params.encodings[0];
    let ssrc = encoding.ssrc.unwrap_or_default();
    let rtx_ssrc = encoding.rtx.map(|rtx| rtx.ssrc).unwrap_or_default();
    assert_ne!(ssrc, 0);
    assert_ne!(rtx_ssrc, 0);
    assert_ne!(ssrc, rtx_ssrc);
    assert_eq!(encoding.scalability_mode.as_deref(), Some("S4T1"));

    let uris: Vec<&str> = params
        .header_extensions
        .iter()
        .map(|ext| ext.uri.as_str())
        .collect();
    assert_eq!(
        uris,
        vec![MID_URI, ABS_SEND_TIME_URI, VIDEO_ORIENTATION_URI, TOFFSET_URI]
    );

    assert_eq!(get_supported_codec_payload_types(&params), vec![103]);
    assert_eq!(
        get_consumable_rtp_encodings(&consumable, ConsumerType::Simulcast).len(),
        4
    );

    Ok(())
}

#[test]
fn test_simulcast_keeps_temporal_layers() -> Result<()> {
    let mut params = video_producer_parameters();
    for encoding in params.encodings.iter_mut() {
        encoding.scalability_mode = Some("L1T3".to_owned());
    }
    let consumable = consumable(MediaKind::Video, &params)?;

    let consumer_params = get_consumer_rtp_parameters(
        &consumable,
        &consumer_device_capabilities(),
        ConsumerType::Simulcast,
    )?;
    assert_eq!(
        consumer_params.encodings[0].scalability_mode.as_deref(),
        Some("S4T3")
    );

    Ok(())
}

#[test]
fn test_unsupported_capabilities() -> Result<()> {
    let consumable = consumable(MediaKind::Audio, &audio_producer_parameters())?;

    let isac_caps = RtpCapabilities {
        codecs: vec![RtpCodecCapability {
            kind: MediaKind::Audio,
            mime_type: "audio/ISAC".to_owned(),
            preferred_payload_type: Some(100),
            clock_rate: 32000,
            channels: Some(1),
            ..Default::default()
        }],
        header_extensions: vec![],
    };
    let empty_caps = RtpCapabilities::default();

    for caps in [isac_caps, empty_caps] {
        assert!(!can_consume(&consumable, &caps)?);
        assert!(matches!(
            get_consumer_rtp_parameters(&consumable, &caps, ConsumerType::Simple),
            Err(Error::ErrUnsupported(_))
        ));
    }

    Ok(())
}

#[test]
fn test_invalid_receiver_capabilities() -> Result<()> {
    let consumable = consumable(MediaKind::Audio, &audio_producer_parameters())?;

    let mut caps = consumer_device_capabilities();
    caps.codecs[1].preferred_payload_type = Some(100);
    assert!(matches!(
        validate_rtp_capabilities(&caps),
        Err(Error::ErrInvalidRtpCapabilities(_))
    ));

    assert!(!can_consume(&consumable, &caps)?);
    assert!(matches!(
        get_consumer_rtp_parameters(&consumable, &caps, ConsumerType::Simple),
        Err(Error::ErrUnsupported(_))
    ));

    Ok(())
}

#[test]
fn test_simulcast_requires_key_frame_feedback() -> Result<()> {
    let consumable = consumable(MediaKind::Video, &video_producer_parameters())?;
    let mut caps = consumer_device_capabilities();
    caps.codecs[1].rtcp_feedback = vec![RtcpFeedback::new("nack", "")];

    assert!(!can_consume(&consumable, &caps)?);
    assert!(matches!(
        get_consumer_rtp_parameters(&consumable, &caps, ConsumerType::Simulcast),
        Err(Error::ErrUnsupported(_))
    ));

    let mut single = video_producer_parameters();
    single.encodings.truncate(1);
    let consumable = self::consumable(MediaKind::Video, &single)?;
    assert!(can_consume(&consumable, &caps)?);

    Ok(())
}

#[test]
fn test_receiver_codec_order_wins() -> Result<()> {
    let mut params = video_producer_parameters();
    params.codecs.push(RtpCodecParameters {
        mime_type: MIME_TYPE_VP8.to_owned(),
        payload_type: 96,
        clock_rate: 90000,
        ..Default::default()
    });
    params.encodings.truncate(1);
    let consumable = consumable(MediaKind::Video, &params)?;

    let mut caps = consumer_device_capabilities();
    caps.codecs.insert(
        0,
        RtpCodecCapability {
            preferred_payload_type: Some(120),
            rtcp_feedback: vec![RtcpFeedback::new("nack", "pli")],
            ..vp8_codec()
        },
    );

    let consumer_params = get_consumer_rtp_parameters(&consumable, &caps, ConsumerType::Simple)?;
    assert_eq!(consumer_params.codecs.len(), 1);
    assert_eq!(consumer_params.codecs[0].mime_type, MIME_TYPE_VP8);
    assert_eq!(consumer_params.codecs[0].payload_type, 101);
    assert!(consumer_params.encodings[0].rtx.is_none());

    Ok(())
}

#[test]
fn test_header_extensions_use_receiver_ids() -> Result<()> {
    let consumable = consumable(MediaKind::Audio, &audio_producer_parameters())?;
    let mut caps = consumer_device_capabilities();
    for ext in caps.header_extensions.iter_mut() {
        if ext.uri == AUDIO_LEVEL_URI {
            ext.preferred_id = 7;
            ext.preferred_encrypt = true;
        }
    }

    let params = get_consumer_rtp_parameters(&consumable, &caps, ConsumerType::Simple)?;
    let audio_level = params
        .header_extensions
        .iter()
        .find(|ext| ext.uri == AUDIO_LEVEL_URI);
    assert_eq!(audio_level.map(|ext| ext.id), Some(7));
    assert_eq!(audio_level.map(|ext| ext.encrypt), Some(false));

    Ok(())
}

#[test]
fn test_transport_cc_replaces_remb() -> Result<()> {
    let consumable = consumable(MediaKind::Video, &video_producer_parameters())?;
    let mut caps = consumer_device_capabilities();
    caps.codecs[1]
        .rtcp_feedback
        .push(RtcpFeedback::new("transport-cc", ""));
    caps.header_extensions
        .push(header_extension(MediaKind::Video, TRANSPORT_CC_URI, 5));

    let params = get_consumer_rtp_parameters(&consumable, &caps, ConsumerType::Simulcast)?;
    let feedback = &params.codecs[0].rtcp_feedback;
    assert!(feedback.contains(&RtcpFeedback::new("transport-cc", "")));
    assert!(!feedback.contains(&RtcpFeedback::new("goog-remb", "")));

    caps.header_extensions
        .retain(|ext| ext.uri != TRANSPORT_CC_URI && ext.uri != ABS_SEND_TIME_URI);
    let params = get_consumer_rtp_parameters(&consumable, &caps, ConsumerType::Simulcast)?;
    let feedback = &params.codecs[0].rtcp_feedback;
    assert!(!feedback.contains(&RtcpFeedback::new("transport-cc", "")));
    assert!(!feedback.contains(&RtcpFeedback::new("goog-remb", "")));

    Ok(())
}

#[test]
fn test_get_pipe_consumer_rtp_parameters() -> Result<()> {
    let consumable = consumable(MediaKind::Video, &video_producer_parameters())?;

    let params = get_consumer_rtp_parameters(
        &consumable,
        &RtpCapabilities::default(),
        ConsumerType::Pipe,
    )?;
    assert_eq!(params.codecs.len(), 1);
    assert_eq!(params.codecs[0].payload_type, 103);
    assert!(!params.codecs[0]
        .rtcp_feedback
        .contains(&RtcpFeedback::new("nack", "")));
    assert_eq!(params.encodings, consumable.encodings);
    assert!(params
        .header_extensions
        .iter()
        .all(|ext| ext.uri != MID_URI && ext.uri != TRANSPORT_CC_URI));
    assert_eq!(
        get_consumable_rtp_encodings(&consumable, ConsumerType::Pipe).len(),
        4
    );

    Ok(())
}

#[test]
fn test_validate_rtp_parameters() {
    assert!(validate_rtp_parameters(&video_producer_parameters()).is_ok());

    let mut duplicated = video_producer_parameters();
    duplicated.codecs[1].payload_type = 112;
    assert!(matches!(
        validate_rtp_parameters(&duplicated),
        Err(Error::ErrInvalidRtpParameters(_))
    ));

    let mut dangling_rtx = video_producer_parameters();
    dangling_rtx.codecs[1].parameters.apt = Some(50);
    assert!(matches!(
        validate_rtp_parameters(&dangling_rtx),
        Err(Error::ErrInvalidRtpParameters(_))
    ));

    let mut same_ssrc = video_producer_parameters();
    same_ssrc.encodings[0].rtx = Some(RtpEncodingRtx { ssrc: 22222222 });
    assert!(matches!(
        validate_rtp_parameters(&same_ssrc),
        Err(Error::ErrInvalidRtpParameters(_))
    ));

    let mut duplicated_ext = audio_producer_parameters();
    duplicated_ext.header_extensions[1].id = 10;
    assert!(matches!(
        validate_rtp_parameters(&duplicated_ext),
        Err(Error::ErrInvalidRtpParameters(_))
    ));

    assert!(matches!(
        validate_rtp_parameters(&RtpParameters::default()),
        Err(Error::ErrInvalidRtpParameters(_))
    ));
}

#[test]
fn test_validate_rtp_capabilities() {
    assert!(validate_rtp_capabilities(&consumer_device_capabilities()).is_ok());

    let mut dangling_rtx = consumer_device_capabilities();
    dangling_rtx.codecs[2].parameters.apt = Some(42);
    assert!(matches!(
        validate_rtp_capabilities(&dangling_rtx),
        Err(Error::ErrInvalidRtpCapabilities(_))
    ));

    let mut duplicated_feedback = consumer_device_capabilities();
    duplicated_feedback.codecs[1]
        .rtcp_feedback
        .push(RtcpFeedback::new("nack", "pli"));
    assert!(matches!(
        validate_rtp_capabilities(&duplicated_feedback),
        Err(Error::ErrInvalidRtpCapabilities(_))
    ));
}
