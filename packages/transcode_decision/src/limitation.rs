//! Limitation adjustment semantics.
//!
//! A limitation is evaluated against a candidate value and either accepts it
//! as-is, proposes a lower value, or rejects it. Values are never adjusted
//! upwards.

use tonearm_media::AudioProperties;

use crate::payloads::{ComparisonOperator, Limitation, LimitationType, StreamDetails};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdjustResult {
    /// The candidate satisfies the limitation
    Unchanged,
    /// The candidate must be lowered to this value
    Adjusted(u32),
    /// No acceptable value exists at or below the candidate
    CannotAdjust,
}

fn parse_values(values: &[String]) -> Option<Vec<u32>> {
    values.iter().map(|x| x.trim().parse::<u32>().ok()).collect()
}

fn adjust_equals(values: &[u32], candidate: u32) -> AdjustResult {
    if let [value] = values {
        return if *value == candidate {
            AdjustResult::Unchanged
        } else {
            AdjustResult::CannotAdjust
        };
    }

    if values.contains(&candidate) {
        return AdjustResult::Unchanged;
    }

    values
        .iter()
        .copied()
        .filter(|x| *x < candidate)
        .max()
        .map_or(AdjustResult::CannotAdjust, AdjustResult::Adjusted)
}

/// Evaluates `candidate` against a limitation's comparison and values.
///
/// Only the first value is used by `LessThanEqual` and `GreaterThanEqual`.
/// Empty or non-numeric values make the limitation unsatisfiable.
#[must_use]
pub fn adjust_using_limitation(
    comparison: ComparisonOperator,
    values: &[String],
    candidate: u32,
) -> AdjustResult {
    let Some(values) = parse_values(values) else {
        log::debug!("adjust_using_limitation: non-numeric values {values:?}");
        return AdjustResult::CannotAdjust;
    };
    let Some(first) = values.first().copied() else {
        return AdjustResult::CannotAdjust;
    };

    match comparison {
        ComparisonOperator::Equals => adjust_equals(&values, candidate),
        ComparisonOperator::NotEquals => {
            if values.contains(&candidate) {
                AdjustResult::CannotAdjust
            } else {
                AdjustResult::Unchanged
            }
        }
        ComparisonOperator::LessThanEqual => {
            if candidate <= first {
                AdjustResult::Unchanged
            } else {
                AdjustResult::Adjusted(first)
            }
        }
        ComparisonOperator::GreaterThanEqual => {
            if candidate >= first {
                AdjustResult::Unchanged
            } else {
                AdjustResult::CannotAdjust
            }
        }
    }
}

/// Whether a source can be sent as-is under this limitation.
///
/// Advisory limitations always pass. Audio profile limitations cannot be
/// checked (no profile is known for a source), and bit depth limitations
/// cannot be checked on sources without a known bit depth; both fail.
#[must_use]
pub fn is_stream_compatible_with_limitation(
    source: &AudioProperties,
    limitation: &Limitation,
) -> bool {
    if !limitation.required {
        return true;
    }

    let value = match limitation.name {
        LimitationType::AudioBitrate => Some(source.bitrate()),
        LimitationType::AudioChannels => Some(source.channel_count()),
        LimitationType::AudioSamplerate => Some(source.sample_rate()),
        LimitationType::AudioProfile => None,
        LimitationType::AudioBitdepth => source.bits_per_sample(),
    };

    value.is_some_and(|value| {
        adjust_using_limitation(limitation.comparison, &limitation.values, value)
            == AdjustResult::Unchanged
    })
}

/// Applies a limitation to a stream being transcoded, lowering the target
/// value when needed.
///
/// Channels and bitrate are evaluated on the value already chosen for the
/// target (falling back to the source's); sample rate and bit depth on the
/// source's.
pub fn apply_limitation(
    source: &AudioProperties,
    limitation: &Limitation,
    target: &mut StreamDetails,
) -> AdjustResult {
    let (candidate, field) = match limitation.name {
        LimitationType::AudioChannels => (
            target.audio_channels.unwrap_or_else(|| source.channel_count()),
            &mut target.audio_channels,
        ),
        LimitationType::AudioBitrate => (
            target.audio_bitrate.unwrap_or_else(|| source.bitrate()),
            &mut target.audio_bitrate,
        ),
        LimitationType::AudioSamplerate => (source.sample_rate(), &mut target.audio_samplerate),
        LimitationType::AudioBitdepth => {
            let Some(bits_per_sample) = source.bits_per_sample() else {
                return AdjustResult::CannotAdjust;
            };
            (bits_per_sample, &mut target.audio_bitdepth)
        }
        LimitationType::AudioProfile => return AdjustResult::Unchanged,
    };

    let result = adjust_using_limitation(limitation.comparison, &limitation.values, candidate);
    if let AdjustResult::Adjusted(value) = result {
        *field = Some(value);
    }

    result
}
