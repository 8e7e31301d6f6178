use serde::{Deserialize, Serialize};

use super::PayloadType;

/// RtpCodecSpecificParameters holds the fmtp-style parameters the router
/// and the worker understand. Keys are serialized with their SDP names;
/// anything else is dropped when parsing.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtpCodecSpecificParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apt: Option<PayloadType>,

    #[serde(
        rename = "packetization-mode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub packetization_mode: Option<u8>,

    #[serde(
        rename = "profile-level-id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub profile_level_id: Option<String>,

    #[serde(
        rename = "level-asymmetry-allowed",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub level_asymmetry_allowed: Option<u8>,

    #[serde(rename = "profile-id", default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub useinbandfec: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usedtx: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stereo: Option<u8>,

    #[serde(
        rename = "sprop-stereo",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sprop_stereo: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxplaybackrate: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minptime: Option<u32>,

    #[serde(
        rename = "x-google-start-bitrate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub x_google_start_bitrate: Option<u32>,

    #[serde(
        rename = "x-google-max-bitrate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub x_google_max_bitrate: Option<u32>,

    #[serde(
        rename = "x-google-min-bitrate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub x_google_min_bitrate: Option<u32>,
}

impl RtpCodecSpecificParameters {
    pub fn is_empty(&self) -> bool {
        *self == RtpCodecSpecificParameters::default()
    }

    /// merged returns a copy of self where every field set in `other`
    /// overrides the value of self.
    pub fn merged(&self, other: &RtpCodecSpecificParameters) -> RtpCodecSpecificParameters {
        RtpCodecSpecificParameters {
            apt: other.apt.or(self.apt),
            packetization_mode: other.packetization_mode.or(self.packetization_mode),
            profile_level_id: other
                .profile_level_id
                .clone()
                .or_else(|| self.profile_level_id.clone()),
            level_asymmetry_allowed: other
                .level_asymmetry_allowed
                .or(self.level_asymmetry_allowed),
            profile_id: other.profile_id.or(self.profile_id),
            useinbandfec: other.useinbandfec.or(self.useinbandfec),
            usedtx: other.usedtx.or(self.usedtx),
            stereo: other.stereo.or(self.stereo),
            sprop_stereo: other.sprop_stereo.or(self.sprop_stereo),
            maxplaybackrate: other.maxplaybackrate.or(self.maxplaybackrate),
            minptime: other.minptime.or(self.minptime),
            x_google_start_bitrate: other.x_google_start_bitrate.or(self.x_google_start_bitrate),
            x_google_max_bitrate: other.x_google_max_bitrate.or(self.x_google_max_bitrate),
            x_google_min_bitrate: other.x_google_min_bitrate.or(self.x_google_min_bitrate),
        }
    }
}
