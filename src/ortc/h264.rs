use crate::rtp_parameters::RtpCodecSpecificParameters;

/// Profile-level-id assumed when a H.264 codec does not carry one.
pub(crate) const DEFAULT_PROFILE_LEVEL_ID: &str = "42000a";

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum H264Profile {
    ConstrainedBaseline,
    Baseline,
    Main,
    Extended,
    ConstrainedHigh,
    High,
    High10,
    High422,
    High444,
}

/// parse_profile reads the profile_idc and profile_iop bytes of a
/// profile-level-id string. The level byte is not relevant for matching.
pub(crate) fn parse_profile(profile_level_id: &str) -> Option<H264Profile> {
    let bytes = hex::decode(profile_level_id).ok()?;
    if bytes.len() != 3 {
        return None;
    }

    let (profile_idc, profile_iop) = (bytes[0], bytes[1]);
    let constraint_set0 = profile_iop & 0x80 != 0;
    let constraint_set1 = profile_iop & 0x40 != 0;
    let constraint_set4_5 = profile_iop & 0x0c == 0x0c;

    let profile = match profile_idc {
        0x42 if constraint_set1 => H264Profile::ConstrainedBaseline,
        0x42 => H264Profile::Baseline,
        0x4d if constraint_set0 => H264Profile::ConstrainedBaseline,
        0x4d => H264Profile::Main,
        0x58 if constraint_set0 && constraint_set1 => H264Profile::ConstrainedBaseline,
        0x58 => H264Profile::Extended,
        0x64 if constraint_set4_5 => H264Profile::ConstrainedHigh,
        0x64 => H264Profile::High,
        0x6e => H264Profile::High10,
        0x7a => H264Profile::High422,
        0xf4 => H264Profile::High444,
        _ => return None,
    };

    Some(profile)
}

/// is_same_profile reports whether two H.264 parameter sets describe the
/// same profile. Unparsable ids never match.
pub(crate) fn is_same_profile(
    a: &RtpCodecSpecificParameters,
    b: &RtpCodecSpecificParameters,
) -> bool {
    let profile = |params: &RtpCodecSpecificParameters| {
        parse_profile(
            params
                .profile_level_id
                .as_deref()
                .unwrap_or(DEFAULT_PROFILE_LEVEL_ID),
        )
    };

    match (profile(a), profile(b)) {
        (Some(pa), Some(pb)) => pa == pb,
        _ => false,
    }
}
