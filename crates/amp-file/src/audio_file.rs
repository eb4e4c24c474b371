//! WAV reading and writing
//!
//! Supports 8/16/24/32-bit integer and 32-bit float WAV. Samples are
//! normalised to ±1.0 on read and clamped to ±1.0 on integer write.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use amp_core::{deinterleave, frame_count, interleave, Sample};

use crate::{FileError, FileResult};

// ═══════════════════════════════════════════════════════════════════════════════
// SAMPLE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Bit depth of audio samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitDepth {
    Int8,
    Int16,
    Int24,
    Int32,
    #[default]
    Float32,
}

impl BitDepth {
    pub fn bits(&self) -> u16 {
        match self {
            Self::Int8 => 8,
            Self::Int16 => 16,
            Self::Int24 => 24,
            Self::Int32 | Self::Float32 => 32,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32)
    }

    fn from_spec(spec: &hound::WavSpec) -> FileResult<Self> {
        match (spec.bits_per_sample, spec.sample_format) {
            (8, hound::SampleFormat::Int) => Ok(Self::Int8),
            (16, hound::SampleFormat::Int) => Ok(Self::Int16),
            (24, hound::SampleFormat::Int) => Ok(Self::Int24),
            (32, hound::SampleFormat::Int) => Ok(Self::Int32),
            (32, hound::SampleFormat::Float) => Ok(Self::Float32),
            (bits, format) => Err(FileError::UnsupportedFormat(format!(
                "{bits}-bit {format:?} WAV"
            ))),
        }
    }

    fn wav_spec(&self, channels: usize, sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels: channels as u16,
            sample_rate,
            bits_per_sample: self.bits(),
            sample_format: if self.is_float() {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        }
    }
}

impl FromStr for BitDepth {
    type Err = FileError;

    /// Accepts `8`, `16`, `24`, `32` (integer) and `32f` / `float`
    fn from_str(s: &str) -> FileResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "8" => Ok(Self::Int8),
            "16" => Ok(Self::Int16),
            "24" => Ok(Self::Int24),
            "32" => Ok(Self::Int32),
            "32f" | "float" | "float32" => Ok(Self::Float32),
            other => Err(FileError::UnsupportedFormat(format!("bit depth '{other}'"))),
        }
    }
}

/// Audio file metadata
#[derive(Debug, Clone)]
pub struct AudioFileInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: BitDepth,
    /// Frames stated by the header
    pub num_frames: u64,
    /// Duration in seconds
    pub duration: f64,
    /// File size in bytes
    pub file_size: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUDIO DATA CONTAINER
// ═══════════════════════════════════════════════════════════════════════════════

/// Loaded audio data
#[derive(Debug, Clone, PartialEq)]
pub struct AudioData {
    /// Audio samples (deinterleaved, one Vec per channel)
    pub channels: Vec<Vec<Sample>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Original bit depth
    pub bit_depth: BitDepth,
}

impl AudioData {
    /// Create a silent container
    pub fn new(num_channels: usize, num_frames: usize, sample_rate: u32) -> Self {
        Self {
            channels: vec![vec![0.0; num_frames]; num_channels],
            sample_rate,
            bit_depth: BitDepth::Float32,
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn num_frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.num_frames() as f64 / self.sample_rate as f64
    }

    /// Get as interleaved samples
    pub fn to_interleaved(&self) -> Vec<Sample> {
        interleave(&self.channels)
    }

    /// Create from interleaved samples
    pub fn from_interleaved(samples: &[Sample], num_channels: usize, sample_rate: u32) -> Self {
        Self {
            channels: deinterleave(samples, num_channels),
            sample_rate,
            bit_depth: BitDepth::Float32,
        }
    }
}

/// Header length versus samples actually present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncation {
    /// Frames stated by the header
    pub expected: u64,
    /// Frames read before the data ran out
    pub actual: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAMPLE DECODING
// ═══════════════════════════════════════════════════════════════════════════════

/// hound reports a data chunk cut short as a failed read, not always as
/// `UnexpectedEof`
fn is_short_read(err: &hound::Error) -> bool {
    matches!(
        err,
        hound::Error::IoError(e) if matches!(e.kind(), ErrorKind::UnexpectedEof | ErrorKind::Other)
    )
}

/// Integer full-scale divisor, or `None` for float data
fn int_scale(spec: &hound::WavSpec) -> Option<Sample> {
    match spec.sample_format {
        hound::SampleFormat::Float => None,
        hound::SampleFormat::Int => Some((1u64 << (spec.bits_per_sample - 1)) as Sample),
    }
}

/// Append up to `limit` normalised samples to `out`.
///
/// Returns `true` if the data ended before the header said it would.
fn pull_samples<R: Read>(
    reader: &mut hound::WavReader<R>,
    scale: Option<Sample>,
    limit: usize,
    out: &mut Vec<Sample>,
) -> FileResult<bool> {
    match scale {
        None => {
            for s in reader.samples::<f32>().take(limit) {
                match s {
                    Ok(v) => out.push(v as Sample),
                    Err(e) if is_short_read(&e) => return Ok(true),
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Some(scale) => {
            for s in reader.samples::<i32>().take(limit) {
                match s {
                    Ok(v) => out.push(v as Sample / scale),
                    Err(e) if is_short_read(&e) => return Ok(true),
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }
    Ok(false)
}

fn open_reader(path: &Path) -> FileResult<hound::WavReader<BufReader<File>>> {
    let reader = hound::WavReader::open(path)?;
    if reader.spec().channels == 0 {
        return Err(FileError::InvalidFile(format!(
            "{}: zero channels",
            path.display()
        )));
    }
    Ok(reader)
}

// ═══════════════════════════════════════════════════════════════════════════════
// WHOLE-FILE I/O (hound)
// ═══════════════════════════════════════════════════════════════════════════════

/// Read a WAV file, reporting a data chunk shorter than its header
pub fn read_wav_checked<P: AsRef<Path>>(path: P) -> FileResult<(AudioData, Option<Truncation>)> {
    let path = path.as_ref();
    let mut reader = open_reader(path)?;
    let spec = reader.spec();
    let bit_depth = BitDepth::from_spec(&spec)?;
    let num_channels = spec.channels as usize;
    let expected = u64::from(reader.duration());

    let mut samples = Vec::with_capacity(reader.len() as usize);
    let ran_out = pull_samples(&mut reader, int_scale(&spec), usize::MAX, &mut samples)?;

    // Drop a trailing partial frame
    samples.truncate(samples.len() - samples.len() % num_channels);
    let actual = (samples.len() / num_channels) as u64;

    let truncation = (ran_out || actual < expected).then_some(Truncation { expected, actual });
    if let Some(t) = truncation {
        log::warn!(
            "{}: header states {} frames but only {} were read",
            path.display(),
            t.expected,
            t.actual
        );
    }

    let data = AudioData {
        channels: deinterleave(&samples, num_channels),
        sample_rate: spec.sample_rate,
        bit_depth,
    };
    Ok((data, truncation))
}

/// Read a WAV file using hound
pub fn read_wav<P: AsRef<Path>>(path: P) -> FileResult<AudioData> {
    read_wav_checked(path).map(|(data, _)| data)
}

/// Write WAV file using hound
pub fn write_wav<P: AsRef<Path>>(path: P, data: &AudioData, bit_depth: BitDepth) -> FileResult<()> {
    let mut writer =
        WavBlockWriter::create(path, data.num_channels(), data.sample_rate, bit_depth)?;
    writer.write_block(&data.to_interleaved())?;
    writer.finalize()?;
    Ok(())
}

/// Get WAV file info from the header
pub fn get_audio_info<P: AsRef<Path>>(path: P) -> FileResult<AudioFileInfo> {
    let path = path.as_ref();
    let reader = open_reader(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.duration());
    let file_size = std::fs::metadata(path)?.len();

    Ok(AudioFileInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bit_depth: BitDepth::from_spec(&spec)?,
        num_frames,
        duration: num_frames as f64 / spec.sample_rate as f64,
        file_size,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// STREAMING I/O
// ═══════════════════════════════════════════════════════════════════════════════

/// Pulls interleaved frame blocks from a WAV file
pub struct WavBlockReader {
    reader: hound::WavReader<BufReader<File>>,
    spec: hound::WavSpec,
    scale: Option<Sample>,
    frames_read: u64,
    truncated: bool,
}

impl std::fmt::Debug for WavBlockReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavBlockReader")
            .field("spec", &self.spec)
            .field("frames_read", &self.frames_read)
            .field("truncated", &self.truncated)
            .finish()
    }
}

impl WavBlockReader {
    pub fn open<P: AsRef<Path>>(path: P) -> FileResult<Self> {
        let reader = open_reader(path.as_ref())?;
        let spec = reader.spec();
        BitDepth::from_spec(&spec)?;
        Ok(Self {
            scale: int_scale(&spec),
            reader,
            spec,
            frames_read: 0,
            truncated: false,
        })
    }

    pub fn channels(&self) -> usize {
        self.spec.channels as usize
    }

    pub fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    pub fn bit_depth(&self) -> FileResult<BitDepth> {
        BitDepth::from_spec(&self.spec)
    }

    /// Frames stated by the header
    pub fn total_frames(&self) -> u64 {
        u64::from(self.reader.duration())
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// True once the data ran out before the header's stated length
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Fill `out` with up to `frames` interleaved frames.
    ///
    /// Returns the number of frames read; 0 at end of file.
    pub fn read_block(&mut self, out: &mut Vec<Sample>, frames: usize) -> FileResult<usize> {
        out.clear();
        if self.truncated {
            return Ok(0);
        }

        let channels = self.channels();
        let ran_out = pull_samples(&mut self.reader, self.scale, frames * channels, out)?;
        out.truncate(out.len() - out.len() % channels);
        let read = out.len() / channels;
        self.frames_read += read as u64;

        if ran_out {
            self.truncated = true;
            log::warn!(
                "input ended after {} of {} frames stated by the header",
                self.frames_read,
                self.total_frames()
            );
        }
        Ok(read)
    }
}

/// Writes interleaved frame blocks to a WAV file
pub struct WavBlockWriter {
    writer: hound::WavWriter<BufWriter<File>>,
    channels: usize,
    bit_depth: BitDepth,
    frames_written: u64,
}

impl std::fmt::Debug for WavBlockWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WavBlockWriter")
            .field("channels", &self.channels)
            .field("bit_depth", &self.bit_depth)
            .field("frames_written", &self.frames_written)
            .finish()
    }
}

impl WavBlockWriter {
    pub fn create<P: AsRef<Path>>(
        path: P,
        channels: usize,
        sample_rate: u32,
        bit_depth: BitDepth,
    ) -> FileResult<Self> {
        if channels == 0 || channels > u16::MAX as usize {
            return Err(FileError::WriteError(format!(
                "cannot write {channels} channels"
            )));
        }
        let writer =
            hound::WavWriter::create(path.as_ref(), bit_depth.wav_spec(channels, sample_rate))?;
        Ok(Self {
            writer,
            channels,
            bit_depth,
            frames_written: 0,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Append whole interleaved frames
    pub fn write_block(&mut self, samples: &[Sample]) -> FileResult<()> {
        let frames = frame_count(samples.len(), self.channels)?;
        let writer = &mut self.writer;

        match self.bit_depth {
            BitDepth::Float32 => {
                for &s in samples {
                    writer.write_sample(s as f32)?;
                }
            }
            BitDepth::Int8 => {
                for &s in samples {
                    writer.write_sample((s.clamp(-1.0, 1.0) * 127.0).round() as i8)?;
                }
            }
            BitDepth::Int16 => {
                for &s in samples {
                    writer.write_sample((s.clamp(-1.0, 1.0) * 32767.0).round() as i16)?;
                }
            }
            BitDepth::Int24 => {
                for &s in samples {
                    writer.write_sample((s.clamp(-1.0, 1.0) * 8388607.0).round() as i32)?;
                }
            }
            BitDepth::Int32 => {
                for &s in samples {
                    writer.write_sample((s.clamp(-1.0, 1.0) * 2147483647.0).round() as i32)?;
                }
            }
        }

        self.frames_written += frames as u64;
        Ok(())
    }

    /// Patch the header and flush. Returns the frames written.
    pub fn finalize(self) -> FileResult<u64> {
        self.writer.finalize()?;
        Ok(self.frames_written)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    fn ramp(frames: usize, channels: usize) -> Vec<Sample> {
        (0..frames * channels)
            .map(|i| (i as Sample / (frames * channels) as Sample) * 1.6 - 0.8)
            .collect()
    }

    #[test]
    fn test_bit_depth_parsing() {
        assert_eq!("16".parse::<BitDepth>().unwrap(), BitDepth::Int16);
        assert_eq!("32f".parse::<BitDepth>().unwrap(), BitDepth::Float32);
        assert_eq!("FLOAT".parse::<BitDepth>().unwrap(), BitDepth::Float32);
        assert!("12".parse::<BitDepth>().is_err());
    }

    #[test]
    fn test_audio_data_creation() {
        let data = AudioData::new(2, 1000, 48000);
        assert_eq!(data.num_channels(), 2);
        assert_eq!(data.num_frames(), 1000);
        assert!((data.duration() - 1000.0 / 48000.0).abs() < 0.0001);
    }

    #[test]
    fn test_interleave_deinterleave() {
        let interleaved = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let data = AudioData::from_interleaved(&interleaved, 2, 48000);

        assert_eq!(data.channels[0], vec![1.0, 3.0, 5.0]);
        assert_eq!(data.channels[1], vec![2.0, 4.0, 6.0]);
        assert_eq!(data.to_interleaved(), interleaved);
    }

    #[test]
    fn test_wav_roundtrip_per_bit_depth() {
        let dir = tempdir().unwrap();
        let source = AudioData::from_interleaved(&ramp(300, 2), 2, 44100);

        for (depth, tolerance) in [
            (BitDepth::Int16, 1e-4),
            (BitDepth::Int24, 1e-6),
            (BitDepth::Int32, 1e-8),
            (BitDepth::Float32, 1e-7),
        ] {
            let path = dir.path().join(format!("{depth:?}.wav"));
            write_wav(&path, &source, depth).unwrap();
            let back = read_wav(&path).unwrap();

            assert_eq!(back.bit_depth, depth);
            assert_eq!(back.sample_rate, 44100);
            assert_eq!(back.num_frames(), 300);
            for (a, b) in back.to_interleaved().iter().zip(source.to_interleaved()) {
                assert_abs_diff_eq!(*a, b, epsilon = tolerance);
            }
        }
    }

    #[test]
    fn test_integer_write_clamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hot.wav");
        let data = AudioData::from_interleaved(&[2.0, -3.0], 1, 48000);
        write_wav(&path, &data, BitDepth::Int16).unwrap();

        let back = read_wav(&path).unwrap();
        assert_abs_diff_eq!(back.channels[0][0], 32767.0 / 32768.0, epsilon = 1e-9);
        assert_abs_diff_eq!(back.channels[0][1], -32767.0 / 32768.0, epsilon = 1e-9);
    }

    #[test]
    fn test_block_reader_and_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stream.wav");
        let samples = ramp(1000, 2);

        let mut writer = WavBlockWriter::create(&path, 2, 48000, BitDepth::Float32).unwrap();
        for block in samples.chunks(2 * 128) {
            writer.write_block(block).unwrap();
        }
        assert!(writer.write_block(&[0.0; 3]).is_err());
        assert_eq!(writer.finalize().unwrap(), 1000);

        let mut reader = WavBlockReader::open(&path).unwrap();
        assert_eq!(reader.channels(), 2);
        assert_eq!(reader.sample_rate(), 48000);
        assert_eq!(reader.total_frames(), 1000);

        let mut block = Vec::new();
        let mut collected = Vec::new();
        let mut sizes = Vec::new();
        loop {
            let n = reader.read_block(&mut block, 256).unwrap();
            if n == 0 {
                break;
            }
            sizes.push(n);
            collected.extend_from_slice(&block);
        }

        assert_eq!(sizes, vec![256, 256, 256, 232]);
        assert_eq!(collected.len(), samples.len());
        assert!(!reader.is_truncated());
    }

    #[test]
    fn test_info_reads_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("info.wav");
        write_wav(&path, &AudioData::new(1, 4800, 48000), BitDepth::Int24).unwrap();

        let info = get_audio_info(&path).unwrap();
        assert_eq!(info.channels, 1);
        assert_eq!(info.num_frames, 4800);
        assert_eq!(info.bit_depth, BitDepth::Int24);
        assert_abs_diff_eq!(info.duration, 0.1, epsilon = 1e-12);
        assert!(info.file_size > 4800 * 3);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(read_wav("/nonexistent/definitely_missing.wav").is_err());
    }
}
