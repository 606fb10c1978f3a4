use crate::dsp::preprocess::RawAudio;
use crate::error::{EngineError, Result};
use std::fs::File;
use std::io::{Cursor, Read};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, ReadOnlySource};
use symphonia::core::probe::Hint;

/// Decode a file at `filepath` into interleaved `f32` PCM plus its
/// native sample rate and channel count. Downmixing and resampling to
/// the canonical rate happen later, in `dsp::preprocess`.
///
/// `.flac` files go through `claxon` first (a faster pure-Rust FLAC
/// decoder than `symphonia`'s generic path); any other extension, or a
/// claxon failure, falls back to `symphonia`, which covers WAV, MP3,
/// AAC, OGG, M4A and more.
pub async fn load_audio(filepath: &str) -> Result<RawAudio> {
    if !std::path::Path::new(filepath).exists() {
        return Err(EngineError::FileNotFound(filepath.to_string()));
    }

    let filepath = filepath.to_string();
    tokio::task::spawn_blocking(move || load_audio_sync(&filepath))
        .await
        .map_err(|e| EngineError::Internal(format!("decode task join error: {e}")))?
}

/// Decode an in-memory upload (e.g. a `/match` multipart field) with
/// the same claxon-then-symphonia strategy as [`load_audio`]. `hint_ext`
/// is the client-supplied filename extension, if any, used only to
/// steer format probing.
pub async fn load_audio_bytes(bytes: Vec<u8>, hint_ext: Option<String>) -> Result<RawAudio> {
    tokio::task::spawn_blocking(move || decode_bytes_sync(&bytes, hint_ext.as_deref()))
        .await
        .map_err(|e| EngineError::Internal(format!("decode task join error: {e}")))?
}

fn load_audio_sync(filepath: &str) -> Result<RawAudio> {
    let is_flac = std::path::Path::new(filepath)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("flac"))
        .unwrap_or(false);

    if is_flac {
        match File::open(filepath).map_err(EngineError::Io).and_then(decode_flac_reader) {
            Ok(audio) => return Ok(audio),
            Err(e) => {
                tracing::debug!("claxon decode failed for {}, falling back to symphonia: {}", filepath, e);
            }
        }
    }

    let file = File::open(filepath).map_err(|e| EngineError::FileNotFound(format!("{filepath}: {e}")))?;
    let ext = std::path::Path::new(filepath)
        .extension()
        .map(|e| e.to_string_lossy().into_owned());
    decode_with_symphonia(file, ext.as_deref())
}

fn decode_bytes_sync(bytes: &[u8], hint_ext: Option<&str>) -> Result<RawAudio> {
    let is_flac = hint_ext.map(|ext| ext.eq_ignore_ascii_case("flac")).unwrap_or(false);

    if is_flac {
        match decode_flac_reader(Cursor::new(bytes.to_vec())) {
            Ok(audio) => return Ok(audio),
            Err(e) => {
                tracing::debug!("claxon decode of upload failed, falling back to symphonia: {}", e);
            }
        }
    }

    decode_with_symphonia(Cursor::new(bytes.to_vec()), hint_ext)
}

fn decode_flac_reader<R: Read + Send + Sync + 'static>(reader: R) -> Result<RawAudio> {
    let mut flac = claxon::FlacReader::new(reader)
        .map_err(|e| EngineError::DecodeFailure(format!("claxon open failed: {e}")))?;

    let info = flac.streaminfo();
    let sample_rate = info.sample_rate;
    let channels = info.channels as u16;
    let full_scale = (1i64 << (info.bits_per_sample.max(1) - 1)) as f32;

    let mut samples = Vec::new();
    for sample in flac.samples() {
        let sample = sample.map_err(|e| EngineError::DecodeFailure(format!("claxon sample error: {e}")))?;
        samples.push(sample as f32 / full_scale);
    }

    if samples.is_empty() {
        return Err(EngineError::InvalidInput("no audio samples decoded".to_string()));
    }

    Ok(RawAudio { samples, sample_rate, channels })
}

fn decode_with_symphonia<R: Read + Send + Sync + 'static>(reader: R, ext: Option<&str>) -> Result<RawAudio> {
    let source = ReadOnlySource::new(reader);
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = ext {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &Default::default())
        .map_err(|e| EngineError::UnsupportedFormat(format!("failed to probe format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.sample_rate.is_some())
        .ok_or_else(|| EngineError::InvalidInput("no audio tracks found".to_string()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| EngineError::InvalidInput("no sample rate found".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| EngineError::InvalidInput("no channel info found".to_string()))?
        .count() as u16;

    let mut samples = Vec::new();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| EngineError::DecodeFailure(format!("decoder error: {e}")))?;

    loop {
        match format.next_packet() {
            Ok(packet) => match decoder.decode(&packet) {
                Ok(buf) => collect_samples(&mut samples, &buf),
                Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                Err(e) => return Err(EngineError::DecodeFailure(format!("{e}"))),
            },
            Err(symphonia::core::errors::Error::IoError(_)) => break,
            Err(symphonia::core::errors::Error::Unsupported(_)) => break,
            Err(e) => return Err(EngineError::DecodeFailure(format!("{e}"))),
        }
    }

    if samples.is_empty() {
        return Err(EngineError::InvalidInput("no audio samples decoded".to_string()));
    }
    if !samples.iter().all(|s| s.is_finite()) {
        return Err(EngineError::InvalidInput("audio contains NaN or infinite values".to_string()));
    }

    Ok(RawAudio { samples, sample_rate, channels })
}

/// Append `buf`'s samples, interleaved, converting every integer and
/// float sample format symphonia can hand back into `f32` in \[-1, 1\].
fn collect_samples(samples: &mut Vec<f32>, buf: &AudioBufferRef) {
    macro_rules! process_buffer {
        ($buf:expr, $norm_fn:expr) => {{
            let n_frames = $buf.frames();
            let ch_count = $buf.spec().channels.count();
            for frame_idx in 0..n_frames {
                for ch in 0..ch_count {
                    samples.push($norm_fn($buf.chan(ch)[frame_idx]));
                }
            }
        }};
    }

    match buf {
        AudioBufferRef::F32(fbuf) => process_buffer!(fbuf, |v: f32| v),
        AudioBufferRef::F64(fbuf) => process_buffer!(fbuf, |v: f64| v as f32),
        AudioBufferRef::S8(ibuf) => process_buffer!(ibuf, |v: i8| v as f32 / i8::MAX as f32),
        AudioBufferRef::S16(ibuf) => process_buffer!(ibuf, |v: i16| v as f32 / i16::MAX as f32),
        AudioBufferRef::S24(ibuf) => process_buffer!(ibuf, |v: symphonia::core::sample::i24| {
            v.into_i32() as f32 / (2_i32.pow(23) - 1) as f32
        }),
        AudioBufferRef::S32(ibuf) => process_buffer!(ibuf, |v: i32| v as f32 / i32::MAX as f32),
        AudioBufferRef::U8(ubuf) => process_buffer!(ubuf, |v: u8| ((v as f32 / 255.0) - 0.5) * 2.0),
        AudioBufferRef::U16(ubuf) => process_buffer!(ubuf, |v: u16| ((v as f32 / 65535.0) - 0.5) * 2.0),
        AudioBufferRef::U24(ubuf) => process_buffer!(ubuf, |v: symphonia::core::sample::u24| {
            let norm = v.into_u32() as f32 / (2_u32.pow(24) - 1) as f32;
            (norm - 0.5) * 2.0
        }),
        AudioBufferRef::U32(ubuf) => process_buffer!(ubuf, |v: u32| ((v as f32 / u32::MAX as f32) - 0.5) * 2.0),
    }
}
