#[cfg(test)]
mod ortc_test;

pub(crate) mod h264;

use std::collections::HashSet;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rtp_parameters::supported_rtp_capabilities::supported_rtp_capabilities;
use crate::rtp_parameters::*;

/// Payload types handed out to codecs without a preferred one, in order.
const DYNAMIC_PAYLOAD_TYPES: &[PayloadType] = &[
    100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110, 111, 112, 113, 114, 115, 116, 117, 118,
    119, 120, 121, 122, 123, 124, 125, 126, 127, 96, 97, 98, 99,
];

/// ConsumerType selects how the worker forwards a producer's streams to a
/// consumer.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerType {
    #[default]
    Simple,
    Simulcast,
    Pipe,
}

impl ConsumerType {
    /// for_consumable picks simulcast when the producer sends more than one
    /// usable stream and simple otherwise.
    pub fn for_consumable(consumable_params: &RtpParameters) -> Self {
        if usable_encodings(consumable_params).count() > 1 {
            ConsumerType::Simulcast
        } else {
            ConsumerType::Simple
        }
    }
}

impl fmt::Display for ConsumerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            ConsumerType::Simple => "simple",
            ConsumerType::Simulcast => "simulcast",
            ConsumerType::Pipe => "pipe",
        };
        write!(f, "{s}")
    }
}

pub(crate) fn generate_ssrc() -> u32 {
    rand::rng().random_range(100_000_000..900_000_000)
}

fn usable_encodings(params: &RtpParameters) -> impl Iterator<Item = &RtpEncodingParameters> {
    params.encodings.iter().filter(|encoding| encoding.is_usable())
}

struct CodecToMatch<'a> {
    mime_type: &'a str,
    clock_rate: u32,
    channels: Option<u8>,
    parameters: &'a RtpCodecSpecificParameters,
}

// Audio codecs without a channel count are mono; video codecs have none.
fn effective_channels(mime_type: &str, channels: Option<u8>) -> Option<u8> {
    match MediaKind::from_mime_type(mime_type) {
        Some(MediaKind::Audio) => Some(channels.unwrap_or(1)),
        _ => None,
    }
}

impl<'a> From<&'a RtpCodecCapability> for CodecToMatch<'a> {
    fn from(codec: &'a RtpCodecCapability) -> Self {
        CodecToMatch {
            mime_type: &codec.mime_type,
            clock_rate: codec.clock_rate,
            channels: effective_channels(&codec.mime_type, codec.channels),
            parameters: &codec.parameters,
        }
    }
}

impl<'a> From<&'a RtpCodecParameters> for CodecToMatch<'a> {
    fn from(codec: &'a RtpCodecParameters) -> Self {
        CodecToMatch {
            mime_type: &codec.mime_type,
            clock_rate: codec.clock_rate,
            channels: effective_channels(&codec.mime_type, codec.channels),
            parameters: &codec.parameters,
        }
    }
}

fn match_codecs(a: CodecToMatch<'_>, b: CodecToMatch<'_>, strict: bool) -> bool {
    if !a.mime_type.eq_ignore_ascii_case(b.mime_type)
        || a.clock_rate != b.clock_rate
        || a.channels != b.channels
    {
        return false;
    }

    let mime_type = a.mime_type.to_lowercase();
    if mime_type == MIME_TYPE_H264.to_lowercase() {
        if a.parameters.packetization_mode.unwrap_or(0)
            != b.parameters.packetization_mode.unwrap_or(0)
        {
            return false;
        }
        if strict && !h264::is_same_profile(a.parameters, b.parameters) {
            return false;
        }
    } else if mime_type == MIME_TYPE_VP9.to_lowercase()
        && strict
        && a.parameters.profile_id.unwrap_or(0) != b.parameters.profile_id.unwrap_or(0)
    {
        return false;
    }

    true
}

fn validate_rtp_codec_capability(codec: &RtpCodecCapability) -> Result<()> {
    match MediaKind::from_mime_type(&codec.mime_type) {
        Some(kind) if kind == codec.kind => {}
        _ => {
            return Err(Error::ErrInvalidRtpCapabilities(format!(
                "invalid codec mime type [mime_type:{}, kind:{}]",
                codec.mime_type, codec.kind
            )))
        }
    }

    if codec.clock_rate == 0 {
        return Err(Error::ErrInvalidRtpCapabilities(format!(
            "missing clock rate [mime_type:{}]",
            codec.mime_type
        )));
    }

    if codec.is_rtx() && codec.parameters.apt.is_none() {
        return Err(Error::ErrInvalidRtpCapabilities(format!(
            "rtx codec without apt [mime_type:{}]",
            codec.mime_type
        )));
    }

    validate_rtcp_feedback(&codec.rtcp_feedback)
        .map_err(|fb| Error::ErrInvalidRtpCapabilities(format!("duplicated rtcp feedback {fb}")))
}

fn validate_rtcp_feedback(feedback: &[RtcpFeedback]) -> std::result::Result<(), String> {
    let mut seen = HashSet::new();
    for fb in feedback {
        if !seen.insert((fb.typ.as_str(), fb.parameter.as_str())) {
            return Err(format!("[type:{}, parameter:{}]", fb.typ, fb.parameter));
        }
    }
    Ok(())
}

/// validate_rtp_capabilities checks the structure of capabilities received
/// from an endpoint.
pub fn validate_rtp_capabilities(caps: &RtpCapabilities) -> Result<()> {
    let mut payload_types = HashSet::new();
    for codec in &caps.codecs {
        validate_rtp_codec_capability(codec)?;

        if let Some(pt) = codec.preferred_payload_type {
            if !payload_types.insert(pt) {
                return Err(Error::ErrInvalidRtpCapabilities(format!(
                    "duplicated preferred payload type {pt}"
                )));
            }
        }
    }

    for codec in caps.codecs.iter().filter(|codec| codec.is_rtx()) {
        let associated = caps.codecs.iter().any(|media| {
            !media.is_rtx()
                && media.preferred_payload_type.is_some()
                && media.preferred_payload_type == codec.parameters.apt
        });
        if !associated {
            return Err(Error::ErrInvalidRtpCapabilities(format!(
                "rtx codec apt does not reference a media codec [apt:{:?}]",
                codec.parameters.apt
            )));
        }
    }

    let mut ids = HashSet::new();
    for ext in &caps.header_extensions {
        if !ids.insert((ext.kind, ext.preferred_id)) {
            return Err(Error::ErrInvalidRtpCapabilities(format!(
                "duplicated header extension id [kind:{}, id:{}]",
                ext.kind, ext.preferred_id
            )));
        }
    }

    Ok(())
}

/// validate_rtp_parameters checks the structure of parameters received from
/// an endpoint.
pub fn validate_rtp_parameters(params: &RtpParameters) -> Result<()> {
    if params.first_media_codec().is_none() {
        return Err(Error::ErrInvalidRtpParameters("no media codec".to_owned()));
    }

    let mut payload_types = HashSet::new();
    for codec in &params.codecs {
        if codec.kind().is_none() || codec.clock_rate == 0 {
            return Err(Error::ErrInvalidRtpParameters(format!(
                "invalid codec [mime_type:{}, clock_rate:{}]",
                codec.mime_type, codec.clock_rate
            )));
        }

        if !payload_types.insert(codec.payload_type) {
            return Err(Error::ErrInvalidRtpParameters(format!(
                "duplicated payload type {}",
                codec.payload_type
            )));
        }

        if codec.is_rtx() {
            let associated = params.codecs.iter().any(|media| {
                !media.is_rtx() && Some(media.payload_type) == codec.parameters.apt
            });
            if !associated {
                return Err(Error::ErrInvalidRtpParameters(format!(
                    "rtx codec apt does not reference a media codec [payload_type:{}]",
                    codec.payload_type
                )));
            }
        }

        validate_rtcp_feedback(&codec.rtcp_feedback)
            .map_err(|fb| Error::ErrInvalidRtpParameters(format!("duplicated rtcp feedback {fb}")))?;
    }

    let mut ids = HashSet::new();
    for ext in &params.header_extensions {
        if !ids.insert(ext.id) {
            return Err(Error::ErrInvalidRtpParameters(format!(
                "duplicated header extension id {}",
                ext.id
            )));
        }
    }

    for encoding in &params.encodings {
        if let Some(rtx) = encoding.rtx {
            if rtx.ssrc == 0 || Some(rtx.ssrc) == encoding.ssrc {
                return Err(Error::ErrInvalidRtpParameters(format!(
                    "invalid rtx ssrc {} for encoding ssrc {:?}",
                    rtx.ssrc, encoding.ssrc
                )));
            }
        }
    }

    Ok(())
}

/// generate_router_rtp_capabilities builds the capabilities of a router out
/// of the media codecs it is configured with.
pub fn generate_router_rtp_capabilities(
    media_codecs: &[RtpCodecCapability],
) -> Result<RtpCapabilities> {
    let supported = supported_rtp_capabilities();

    let reserved: HashSet<PayloadType> = media_codecs
        .iter()
        .filter_map(|codec| codec.preferred_payload_type)
        .collect();
    let mut dynamic_payload_types = DYNAMIC_PAYLOAD_TYPES
        .iter()
        .copied()
        .filter(|pt| !reserved.contains(pt));

    let mut caps = RtpCapabilities {
        codecs: vec![],
        header_extensions: supported.header_extensions.clone(),
    };

    for (i, media_codec) in media_codecs.iter().enumerate() {
        validate_rtp_codec_capability(media_codec)?;

        let supported_codec = supported
            .codecs
            .iter()
            .find(|codec| match_codecs(media_codec.into(), (*codec).into(), false))
            .ok_or_else(|| {
                Error::ErrUnsupported(format!(
                    "media codec not supported [mime_type:{}]",
                    media_codec.mime_type
                ))
            })?;

        if media_codecs[..i]
            .iter()
            .any(|previous| match_codecs(previous.into(), media_codec.into(), true))
        {
            return Err(Error::ErrUnsupported(format!(
                "duplicated media codec [mime_type:{}]",
                media_codec.mime_type
            )));
        }

        let payload_type = match media_codec
            .preferred_payload_type
            .or(supported_codec.preferred_payload_type)
        {
            Some(pt) => pt,
            None => dynamic_payload_types
                .next()
                .ok_or(Error::ErrCannotAllocate)?,
        };

        if caps
            .codecs
            .iter()
            .any(|codec| codec.preferred_payload_type == Some(payload_type))
        {
            return Err(Error::ErrInvalidRtpCapabilities(format!(
                "duplicated preferred payload type {payload_type}"
            )));
        }

        let codec = RtpCodecCapability {
            kind: supported_codec.kind,
            mime_type: supported_codec.mime_type.clone(),
            preferred_payload_type: Some(payload_type),
            clock_rate: supported_codec.clock_rate,
            channels: supported_codec.channels,
            parameters: supported_codec.parameters.merged(&media_codec.parameters),
            rtcp_feedback: supported_codec.rtcp_feedback.clone(),
        };
        let clock_rate = codec.clock_rate;
        let is_video = codec.kind == MediaKind::Video;
        caps.codecs.push(codec);

        if is_video {
            let rtx_payload_type = dynamic_payload_types
                .next()
                .ok_or(Error::ErrCannotAllocate)?;

            caps.codecs.push(RtpCodecCapability {
                kind: MediaKind::Video,
                mime_type: MIME_TYPE_RTX.to_owned(),
                preferred_payload_type: Some(rtx_payload_type),
                clock_rate,
                channels: None,
                parameters: RtpCodecSpecificParameters {
                    apt: Some(payload_type),
                    ..Default::default()
                },
                rtcp_feedback: vec![],
            });
        }
    }

    Ok(caps)
}

fn preferred_payload_type(codec: &RtpCodecCapability) -> Result<PayloadType> {
    codec.preferred_payload_type.ok_or_else(|| {
        Error::ErrInvalidRtpCapabilities(format!(
            "codec without preferred payload type [mime_type:{}]",
            codec.mime_type
        ))
    })
}

/// get_producer_rtp_parameters_mapping matches the producer's codecs to the
/// router's and allocates the ssrcs the router uses for each of the
/// producer's encodings.
pub fn get_producer_rtp_parameters_mapping(
    params: &RtpParameters,
    caps: &RtpCapabilities,
) -> Result<RtpMapping> {
    let mut matched: Vec<(&RtpCodecParameters, &RtpCodecCapability)> = vec![];

    for codec in params.codecs.iter().filter(|codec| !codec.is_rtx()) {
        let cap_codec = caps
            .codecs
            .iter()
            .find(|cap_codec| match_codecs(codec.into(), (*cap_codec).into(), true))
            .ok_or_else(|| {
                Error::ErrUnsupported(format!(
                    "unsupported codec [mime_type:{}, payload_type:{}]",
                    codec.mime_type, codec.payload_type
                ))
            })?;
        matched.push((codec, cap_codec));
    }

    for codec in params.codecs.iter().filter(|codec| codec.is_rtx()) {
        let cap_media_codec = matched
            .iter()
            .find(|(media, _)| Some(media.payload_type) == codec.parameters.apt)
            .map(|(_, cap_codec)| *cap_codec)
            .ok_or_else(|| {
                Error::ErrUnsupported(format!(
                    "missing media codec for rtx [payload_type:{}]",
                    codec.payload_type
                ))
            })?;

        let cap_rtx_codec = caps
            .codecs
            .iter()
            .find(|cap_codec| {
                cap_codec.is_rtx()
                    && cap_codec.parameters.apt.is_some()
                    && cap_codec.parameters.apt == cap_media_codec.preferred_payload_type
            })
            .ok_or_else(|| {
                Error::ErrUnsupported(format!(
                    "no rtx codec for [mime_type:{}]",
                    cap_media_codec.mime_type
                ))
            })?;
        matched.push((codec, cap_rtx_codec));
    }

    let mut rtp_mapping = RtpMapping::default();
    for (codec, cap_codec) in matched {
        rtp_mapping.codecs.push(RtpMappingCodec {
            payload_type: codec.payload_type,
            mapped_payload_type: preferred_payload_type(cap_codec)?,
        });
    }

    let mut mapped_ssrc = generate_ssrc();
    for encoding in &params.encodings {
        rtp_mapping.encodings.push(RtpMappingEncoding {
            ssrc: encoding.ssrc,
            rid: encoding.rid.clone(),
            scalability_mode: encoding.scalability_mode.clone(),
            mapped_ssrc,
        });
        mapped_ssrc = mapped_ssrc.wrapping_add(1);
    }

    Ok(rtp_mapping)
}

/// get_consumable_rtp_parameters rewrites a producer's parameters into the
/// router's payload types and ssrcs. Every consumer of the producer is
/// derived from the result.
pub fn get_consumable_rtp_parameters(
    kind: MediaKind,
    params: &RtpParameters,
    caps: &RtpCapabilities,
    rtp_mapping: &RtpMapping,
) -> Result<RtpParameters> {
    let mut consumable_params = RtpParameters::default();

    for codec in params.codecs.iter().filter(|codec| !codec.is_rtx()) {
        let mapped_payload_type = rtp_mapping
            .codecs
            .iter()
            .find(|entry| entry.payload_type == codec.payload_type)
            .map(|entry| entry.mapped_payload_type)
            .ok_or_else(|| {
                Error::ErrInvalidRtpParameters(format!(
                    "codec missing from mapping [payload_type:{}]",
                    codec.payload_type
                ))
            })?;

        let cap_codec = caps
            .codecs
            .iter()
            .find(|cap_codec| cap_codec.preferred_payload_type == Some(mapped_payload_type))
            .ok_or_else(|| {
                Error::ErrInvalidRtpCapabilities(format!(
                    "no router codec with payload type {mapped_payload_type}"
                ))
            })?;

        consumable_params.codecs.push(RtpCodecParameters {
            mime_type: cap_codec.mime_type.clone(),
            payload_type: mapped_payload_type,
            clock_rate: cap_codec.clock_rate,
            channels: cap_codec.channels,
            parameters: codec.parameters.clone(),
            rtcp_feedback: cap_codec.rtcp_feedback.clone(),
        });

        if let Some(cap_rtx_codec) = caps
            .codecs
            .iter()
            .find(|cap_codec| cap_codec.is_rtx() && cap_codec.parameters.apt == Some(mapped_payload_type))
        {
            consumable_params.codecs.push(RtpCodecParameters {
                mime_type: cap_rtx_codec.mime_type.clone(),
                payload_type: preferred_payload_type(cap_rtx_codec)?,
                clock_rate: cap_rtx_codec.clock_rate,
                channels: cap_rtx_codec.channels,
                parameters: cap_rtx_codec.parameters.clone(),
                rtcp_feedback: cap_rtx_codec.rtcp_feedback.clone(),
            });
        }
    }

    consumable_params.header_extensions = caps
        .header_extensions
        .iter()
        .filter(|ext| {
            ext.kind == kind
                && matches!(
                    ext.direction,
                    RtpHeaderExtensionDirection::SendRecv | RtpHeaderExtensionDirection::SendOnly
                )
        })
        .map(|ext| RtpHeaderExtensionParameters {
            uri: ext.uri.clone(),
            id: ext.preferred_id,
            encrypt: ext.preferred_encrypt,
            parameters: Default::default(),
        })
        .collect();

    if params.encodings.len() != rtp_mapping.encodings.len() {
        return Err(Error::ErrInvalidRtpParameters(
            "encodings do not match the mapping".to_owned(),
        ));
    }
    for (encoding, mapped) in params.encodings.iter().zip(rtp_mapping.encodings.iter()) {
        consumable_params.encodings.push(RtpEncodingParameters {
            ssrc: Some(mapped.mapped_ssrc),
            rid: None,
            codec_payload_type: None,
            rtx: None,
            ..encoding.clone()
        });
    }

    consumable_params.rtcp = RtcpParameters {
        cname: params.rtcp.cname.clone(),
        reduced_size: true,
        mux: Some(true),
    };

    Ok(consumable_params)
}

struct CodecSelection<'a> {
    media: &'a RtpCodecParameters,
    cap: &'a RtpCodecCapability,
    rtx: Option<(&'a RtpCodecParameters, &'a RtpCodecCapability)>,
}

// Receiver codecs are walked in declaration order, so the receiver's
// preference decides which consumable codec is used.
fn select_codecs<'a>(
    consumable_params: &'a RtpParameters,
    caps: &'a RtpCapabilities,
    consumer_type: ConsumerType,
) -> Result<CodecSelection<'a>> {
    for cap in caps.codecs.iter().filter(|codec| !codec.is_rtx()) {
        let media = match consumable_params
            .codecs
            .iter()
            .filter(|codec| !codec.is_rtx())
            .find(|codec| match_codecs((*codec).into(), cap.into(), true))
        {
            Some(media) => media,
            None => continue,
        };

        if consumer_type == ConsumerType::Simulcast && !supports_layer_switching(cap) {
            return Err(Error::ErrUnsupported(format!(
                "receiver codec cannot request key frames for simulcast [mime_type:{}]",
                cap.mime_type
            )));
        }

        let rtx = consumable_params
            .codecs
            .iter()
            .find(|codec| codec.is_rtx() && codec.parameters.apt == Some(media.payload_type))
            .and_then(|rtx| {
                caps.codecs
                    .iter()
                    .find(|cap_rtx| {
                        cap_rtx.is_rtx()
                            && cap_rtx.parameters.apt.is_some()
                            && cap_rtx.parameters.apt == cap.preferred_payload_type
                    })
                    .map(|cap_rtx| (rtx, cap_rtx))
            });

        return Ok(CodecSelection { media, cap, rtx });
    }

    Err(Error::ErrUnsupported(
        "no compatible media codecs".to_owned(),
    ))
}

fn supports_layer_switching(codec: &RtpCodecCapability) -> bool {
    codec.rtcp_feedback.iter().any(|fb| {
        (fb.typ == "nack" && fb.parameter == "pli") || (fb.typ == "ccm" && fb.parameter == "fir")
    })
}

// Malformed receiver capabilities cannot be negotiated with, so they fail
// the same way as capabilities without a compatible codec.
fn validate_receiver_capabilities(caps: &RtpCapabilities) -> Result<()> {
    validate_rtp_capabilities(caps).map_err(|err| match err {
        Error::ErrInvalidRtpCapabilities(reason) => {
            Error::ErrUnsupported(format!("invalid receiver capabilities: {reason}"))
        }
        err => err,
    })
}

/// can_consume reports whether an endpoint with the given capabilities is
/// able to receive the consumable parameters of a producer. It is false
/// exactly when `get_consumer_rtp_parameters` fails with `ErrUnsupported`.
pub fn can_consume(consumable_params: &RtpParameters, caps: &RtpCapabilities) -> Result<bool> {
    let consumer_type = ConsumerType::for_consumable(consumable_params);
    match validate_receiver_capabilities(caps)
        .and_then(|_| select_codecs(consumable_params, caps, consumer_type).map(|_| ()))
    {
        Ok(()) => Ok(true),
        Err(Error::ErrUnsupported(reason)) => {
            log::debug!("cannot consume: {reason}");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

// Transport-wide CC wins over REMB; each needs its header extension.
fn reduce_rtcp_feedback(
    codecs: &mut [RtpCodecParameters],
    header_extensions: &[RtpHeaderExtensionParameters],
) {
    let has_ext = |uri: &str| header_extensions.iter().any(|ext| ext.uri == uri);

    let keep: fn(&RtcpFeedback) -> bool = if has_ext(TRANSPORT_CC_URI) {
        |fb| fb.typ != "goog-remb"
    } else if has_ext(ABS_SEND_TIME_URI) {
        |fb| fb.typ != "transport-cc"
    } else {
        |fb| fb.typ != "transport-cc" && fb.typ != "goog-remb"
    };

    for codec in codecs.iter_mut() {
        codec.rtcp_feedback.retain(keep);
    }
}

/// get_consumer_rtp_parameters computes what a consumer receives given the
/// consumable parameters of its producer and the receiver's capabilities.
pub fn get_consumer_rtp_parameters(
    consumable_params: &RtpParameters,
    caps: &RtpCapabilities,
    consumer_type: ConsumerType,
) -> Result<RtpParameters> {
    if consumer_type == ConsumerType::Pipe {
        return Ok(get_pipe_consumer_rtp_parameters(consumable_params));
    }

    validate_receiver_capabilities(caps)?;
    let selection = select_codecs(consumable_params, caps, consumer_type)?;
    let kind = selection.cap.kind;

    let mut codecs = vec![RtpCodecParameters {
        rtcp_feedback: selection.cap.rtcp_feedback.clone(),
        ..selection.media.clone()
    }];
    if let Some((rtx, cap_rtx)) = selection.rtx {
        codecs.push(RtpCodecParameters {
            rtcp_feedback: cap_rtx.rtcp_feedback.clone(),
            ..rtx.clone()
        });
    }

    let mut header_extensions: Vec<RtpHeaderExtensionParameters> = vec![];
    for ext in &consumable_params.header_extensions {
        let cap_ext = match caps
            .header_extensions
            .iter()
            .find(|cap_ext| cap_ext.kind == kind && cap_ext.uri == ext.uri)
        {
            Some(cap_ext) => cap_ext,
            None => continue,
        };
        if header_extensions.iter().any(|e| e.id == cap_ext.preferred_id) {
            continue;
        }

        header_extensions.push(RtpHeaderExtensionParameters {
            uri: ext.uri.clone(),
            id: cap_ext.preferred_id,
            encrypt: ext.encrypt && cap_ext.preferred_encrypt,
            parameters: ext.parameters.clone(),
        });
    }

    reduce_rtcp_feedback(&mut codecs, &header_extensions);

    let usable: Vec<&RtpEncodingParameters> = usable_encodings(consumable_params).collect();
    let mut scalability_mode = usable
        .first()
        .and_then(|encoding| encoding.scalability_mode.clone());
    if consumer_type == ConsumerType::Simulcast {
        let temporal_layers = scalability_mode
            .as_deref()
            .map(ScalabilityMode::from)
            .unwrap_or_default()
            .temporal_layers;
        scalability_mode = Some(format!("S{}T{}", usable.len(), temporal_layers));
    }

    let ssrc = generate_ssrc();
    let encoding = RtpEncodingParameters {
        ssrc: Some(ssrc),
        rtx: selection.rtx.map(|_| RtpEncodingRtx {
            ssrc: ssrc.wrapping_add(1),
        }),
        scalability_mode,
        max_bitrate: usable.iter().filter_map(|encoding| encoding.max_bitrate).max(),
        ..Default::default()
    };

    Ok(RtpParameters {
        mid: None,
        codecs,
        header_extensions,
        encodings: vec![encoding],
        rtcp: consumable_params.rtcp.clone(),
    })
}

/// get_pipe_consumer_rtp_parameters forwards everything a producer sends,
/// unchanged, to another router.
pub fn get_pipe_consumer_rtp_parameters(consumable_params: &RtpParameters) -> RtpParameters {
    let codecs = consumable_params
        .codecs
        .iter()
        .filter(|codec| !codec.is_rtx())
        .map(|codec| RtpCodecParameters {
            rtcp_feedback: codec
                .rtcp_feedback
                .iter()
                .filter(|fb| !(fb.typ == "nack" && fb.parameter.is_empty()))
                .cloned()
                .collect(),
            ..codec.clone()
        })
        .collect();

    let header_extensions = consumable_params
        .header_extensions
        .iter()
        .filter(|ext| {
            ext.uri != MID_URI && ext.uri != ABS_SEND_TIME_URI && ext.uri != TRANSPORT_CC_URI
        })
        .cloned()
        .collect();

    RtpParameters {
        mid: None,
        codecs,
        header_extensions,
        encodings: consumable_params.encodings.clone(),
        rtcp: consumable_params.rtcp.clone(),
    }
}

/// get_consumable_rtp_encodings returns the producer streams the worker
/// draws from for a consumer of the given type.
pub fn get_consumable_rtp_encodings(
    consumable_params: &RtpParameters,
    consumer_type: ConsumerType,
) -> Vec<RtpEncodingParameters> {
    match consumer_type {
        ConsumerType::Simple => usable_encodings(consumable_params).take(1).cloned().collect(),
        ConsumerType::Simulcast => usable_encodings(consumable_params).cloned().collect(),
        ConsumerType::Pipe => consumable_params.encodings.clone(),
    }
}

/// get_supported_codec_payload_types lists the media payload types of a
/// consumer's parameters.
pub fn get_supported_codec_payload_types(params: &RtpParameters) -> Vec<PayloadType> {
    params
        .codecs
        .iter()
        .filter(|codec| !codec.is_rtx())
        .map(|codec| codec.payload_type)
        .collect()
}
