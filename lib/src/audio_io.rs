//! Track I/O using Symphonia for decoding and Hound for WAV output

use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::audio::{AudioBuffer, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::track::Track;

/// Append one decoded packet to the per-channel sample buffers
fn append_channels(channels: &mut [Vec<f64>], buffer: &AudioBuffer<f64>) -> Result<(), Box<dyn Error>> {
    let packet_channels = buffer.spec().channels.count();
    if packet_channels != channels.len() {
        return Err(format!(
            "Decoded packet has {} channels, stream declares {}",
            packet_channels,
            channels.len()
        )
        .into());
    }
    for (c, channel) in channels.iter_mut().enumerate() {
        channel.extend_from_slice(buffer.chan(c));
    }
    Ok(())
}

/// Decode every packet of the default track into per-channel f64 samples
fn read_track_stream(mss: MediaSourceStream, hint: &Hint) -> Result<Track, Box<dyn Error>> {
    let probed = symphonia::default::get_probe().format(
        hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format.default_track().ok_or("No default track found")?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or("Sample rate not specified")?;
    let num_channels = track
        .codec_params
        .channels
        .ok_or("Channels not specified")?
        .count();

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|_| "Unsupported codec")?;

    let mut channels: Vec<Vec<f64>> = vec![Vec::new(); num_channels];

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(Box::new(err)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(err) => return Err(Box::new(err)),
        };

        let mut buffer: AudioBuffer<f64> = decoded.make_equivalent();
        decoded.convert(&mut buffer);
        append_channels(&mut channels, &buffer)?;
    }

    let track = Track::new(sample_rate, channels)?;
    log::info!(
        "Decoded {} channels, {} Hz, {:.2}s",
        track.num_channels(),
        track.sample_rate(),
        track.duration_seconds()
    );
    Ok(track)
}

/// Read a track from an audio file in any format Symphonia supports
pub fn read_track<P: AsRef<Path>>(path: P) -> Result<Track, Box<dyn Error>> {
    let path = path.as_ref();
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    read_track_stream(mss, &hint)
}

/// Read a track from an in-memory encoded file
pub fn read_track_bytes(data: Vec<u8>) -> Result<Track, Box<dyn Error>> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());
    read_track_stream(mss, &Hint::new())
}

/// Interleave and write samples as 32-bit float WAV
fn write_wav<W: Write + Seek>(writer: W, track: &Track) -> Result<(), Box<dyn Error>> {
    let spec = WavSpec {
        channels: u16::try_from(track.num_channels())?,
        sample_rate: track.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::new(writer, spec)?;
    for sample_idx in 0..track.len() {
        for channel in track.channels() {
            writer.write_sample(channel[sample_idx] as f32)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Write a track to a WAV file
pub fn write_track<P: AsRef<Path>>(path: P, track: &Track) -> Result<(), Box<dyn Error>> {
    let file = File::create(path.as_ref())?;
    write_wav(BufWriter::new(file), track)?;
    log::info!(
        "Saved {} channels, {:.2}s to {}",
        track.num_channels(),
        track.duration_seconds(),
        path.as_ref().display()
    );
    Ok(())
}

/// Encode a track as WAV bytes
pub fn write_track_bytes(track: &Track) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut cursor = Cursor::new(Vec::new());
    write_wav(&mut cursor, track)?;
    Ok(cursor.into_inner())
}
