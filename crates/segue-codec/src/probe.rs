//! Read-only container probe (the track selector).

use crate::error::{CodecError, Result};
use segue_core::TrackFormat;
use std::fs::File;
use std::path::Path;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Open a container and return the format reader positioned at the start.
pub(crate) fn open_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path)
        .map_err(|e| CodecError::UnreadableSource(format!("{}: {e}", path.display())))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| CodecError::UnreadableSource(format!("{}: {e}", path.display())))?;
    Ok(probed.format)
}

/// Locate the first audio track and derive its format.
pub(crate) fn select_track(reader: &dyn FormatReader) -> Result<(u32, TrackFormat)> {
    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .ok_or(CodecError::NoAudioTrack)?;

    let params = &track.codec_params;
    let sample_rate = params.sample_rate.unwrap_or(0);
    let channels = params
        .channels
        .map(|channels| channels.count() as u16)
        .unwrap_or(1);
    let duration_ms = params
        .n_frames
        .map(|frames| frames.saturating_mul(1000) / u64::from(sample_rate.max(1)))
        .unwrap_or(0);
    let codec = symphonia::default::get_codecs()
        .get_codec(params.codec)
        .map(|descriptor| descriptor.short_name.to_string())
        .unwrap_or_else(|| format!("{:?}", params.codec));

    let format = TrackFormat::new(sample_rate, channels, duration_ms, codec)?;
    Ok((track.id, format))
}

/// Inspect a source container and return the format of its first audio
/// track.
///
/// Read-only: no decoder is instantiated. Fails with
/// [`CodecError::NoAudioTrack`] when the container holds no audio track and
/// [`CodecError::UnreadableSource`] when it cannot be opened or parsed.
pub fn probe(path: &Path) -> Result<TrackFormat> {
    let reader = open_format(path)?;
    let (_, format) = select_track(reader.as_ref())?;
    Ok(format)
}
