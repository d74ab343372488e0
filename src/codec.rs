//! Binary wire formats for sensor data.
//!
//! Two variants exist. The primary format is a compact compressed container
//! for arbitrary channel layouts; the legacy device format is the fixed
//! 516-byte accelerometer burst emitted by older wrist hardware.
//!
//! # Primary format
//!
//! All integers are little-endian. The body is LZ4-block-compressed and
//! prefixed with its uncompressed length:
//!
//! ```text
//! [0..4)   u32  decompressed body length
//! -- compressed body below --
//! [0]      u8   0xD0 magic
//! [1]      u8   0x01 version
//! [2]      u8   channel-type count
//! [3..11)  f64  start (seconds)
//! [11]     u8   samples per second
//! [12..16) u32  total scalar sample count
//! [16..)   4-byte channel tags, one per type
//! [...)    f32 × sample count, row-major interleaved
//! ```
//!
//! A [`StreamingEncoder`] writes the uncompressed body incrementally to any
//! `Write + Seek` target: a zero-filled placeholder header goes out first,
//! rows are appended as they arrive, and `finish` back-patches the header
//! with the final sample count and channel-type table. This is the only
//! place positional writes are required; everything else is append-only.

use std::io::{Seek, SeekFrom, Write};

use bytes::{Buf, BufMut};
use log::debug;

use crate::error::{CoreResult, SensingError};
use crate::sensor::{Location, SensorData, SensorType};

/// Magic byte opening every primary-format body.
pub const MAGIC: u8 = 0xD0;

/// Wire format version this codec reads and writes.
pub const VERSION: u8 = 0x01;

/// Fixed header length before the channel-tag table.
const HEADER_LEN: usize = 16;

/// Byte length of the legacy device block.
pub const DEVICE_BLOCK_LEN: usize = 516;

/// Rows in one legacy device block (three i16 columns per row).
pub const DEVICE_BLOCK_ROWS: usize = 86;

/// Sampling rate of the legacy device burst.
pub const DEVICE_SAMPLES_PER_SECOND: u8 = 50;

/// The device reports acceleration in thousandths of 1 g.
const DEVICE_COUNTS_PER_G: f32 = 1000.0;

fn tag_of(sensor_type: SensorType) -> [u8; 4] {
    match sensor_type {
        SensorType::Accelerometer(Location::LeftWrist) => [0x74, 0x61, 0x6C, 0x00],
        SensorType::Accelerometer(Location::RightWrist) => [0x74, 0x61, 0x72, 0x00],
        SensorType::Gyroscope(Location::LeftWrist) => [0x74, 0x67, 0x6C, 0x00],
        SensorType::Gyroscope(Location::RightWrist) => [0x74, 0x67, 0x72, 0x00],
        SensorType::HeartRate => [0x74, 0x68, 0x2D, 0x00],
    }
}

fn type_of_tag(tag: [u8; 4]) -> Option<SensorType> {
    match tag {
        [0x74, 0x61, 0x6C, 0x00] => Some(SensorType::Accelerometer(Location::LeftWrist)),
        [0x74, 0x61, 0x72, 0x00] => Some(SensorType::Accelerometer(Location::RightWrist)),
        [0x74, 0x67, 0x6C, 0x00] => Some(SensorType::Gyroscope(Location::LeftWrist)),
        [0x74, 0x67, 0x72, 0x00] => Some(SensorType::Gyroscope(Location::RightWrist)),
        [0x74, 0x68, 0x2D, 0x00] => Some(SensorType::HeartRate),
        _ => None,
    }
}

/// Encode a buffer into the primary compressed format.
pub fn encode(data: &SensorData) -> CoreResult<Vec<u8>> {
    let body = encode_body(data)?;
    let encoded = compress_body(&body);
    debug!(
        "encoded {} rows: {} body bytes -> {} wire bytes",
        data.row_count(),
        body.len(),
        encoded.len()
    );
    Ok(encoded)
}

/// Build the uncompressed header + payload for a buffer.
pub fn encode_body(data: &SensorData) -> CoreResult<Vec<u8>> {
    if data.types().len() > usize::from(u8::MAX) {
        return Err(SensingError::Unencodable {
            context: "channel-type count exceeds one byte",
        });
    }
    if u32::try_from(data.samples().len()).is_err() {
        return Err(SensingError::Unencodable {
            context: "sample count exceeds four bytes",
        });
    }

    let mut body =
        Vec::with_capacity(HEADER_LEN + 4 * data.types().len() + 4 * data.samples().len());
    body.put_u8(MAGIC);
    body.put_u8(VERSION);
    body.put_u8(data.types().len() as u8);
    body.put_f64_le(data.start());
    body.put_u8(data.samples_per_second());
    body.put_u32_le(data.samples().len() as u32);
    for &t in data.types() {
        body.put_slice(&tag_of(t));
    }
    for &sample in data.samples() {
        body.put_f32_le(sample);
    }
    Ok(body)
}

/// Compress a finished body into primary-format wire bytes.
///
/// The output is the little-endian u32 uncompressed length followed by the
/// LZ4 block.
pub fn compress_body(body: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(body)
}

/// Decode primary-format wire bytes into a buffer.
pub fn decode(bytes: &[u8]) -> CoreResult<SensorData> {
    let mut buf = bytes;
    if buf.remaining() < 4 {
        return Err(SensingError::NotEnoughInput {
            context: "length prefix",
        });
    }
    let declared_len = buf.get_u32_le() as usize;
    let body = lz4_flex::block::decompress(buf, declared_len)
        .map_err(|e| SensingError::DecompressionFailed(e.to_string()))?;
    if body.len() != declared_len {
        return Err(SensingError::DecompressionFailed(format!(
            "expected {} decompressed bytes, got {}",
            declared_len,
            body.len()
        )));
    }
    decode_body(&body)
}

/// Parse an uncompressed header + payload into a buffer.
pub fn decode_body(body: &[u8]) -> CoreResult<SensorData> {
    let mut buf = body;
    expect_u8(&mut buf, MAGIC, "magic byte")?;
    expect_u8(&mut buf, VERSION, "version")?;
    let types_count = take_u8(&mut buf, "channel-type count")?;
    if buf.remaining() < 8 {
        return Err(SensingError::NotEnoughInput { context: "start" });
    }
    let start = buf.get_f64_le();
    let samples_per_second = take_u8(&mut buf, "samples per second")?;
    if buf.remaining() < 4 {
        return Err(SensingError::NotEnoughInput {
            context: "sample count",
        });
    }
    let samples_count = buf.get_u32_le() as usize;

    let mut types = Vec::with_capacity(usize::from(types_count));
    for _ in 0..types_count {
        if buf.remaining() < 4 {
            return Err(SensingError::NotEnoughInput {
                context: "channel tag",
            });
        }
        let mut tag = [0u8; 4];
        buf.copy_to_slice(&mut tag);
        types.push(type_of_tag(tag).ok_or(SensingError::BadHeader {
            context: "channel tag",
        })?);
    }

    let payload_len = samples_count
        .checked_mul(4)
        .ok_or(SensingError::NotEnoughInput {
            context: "sample payload",
        })?;
    if buf.remaining() < payload_len {
        return Err(SensingError::NotEnoughInput {
            context: "sample payload",
        });
    }
    let mut samples = Vec::with_capacity(samples_count);
    for _ in 0..samples_count {
        samples.push(buf.get_f32_le());
    }

    SensorData::new(types, start, samples_per_second, samples)
}

fn take_u8(buf: &mut &[u8], context: &'static str) -> CoreResult<u8> {
    if buf.remaining() < 1 {
        return Err(SensingError::NotEnoughInput { context });
    }
    Ok(buf.get_u8())
}

fn expect_u8(buf: &mut &[u8], expected: u8, context: &'static str) -> CoreResult<()> {
    if take_u8(buf, context)? != expected {
        return Err(SensingError::BadHeader { context });
    }
    Ok(())
}

/// Decode one legacy 516-byte device block.
///
/// The block is a single left-wrist accelerometer burst: 86 rows of three
/// little-endian i16 counts in thousandths of 1 g, sampled at 50 rows per
/// second, with no header and no clock. The caller supplies the start
/// timestamp. Decoding fails only on a wrong block size.
pub fn decode_device_block(block: &[u8], start: f64) -> CoreResult<SensorData> {
    if block.len() != DEVICE_BLOCK_LEN {
        return Err(SensingError::InvalidDeviceBlock {
            expected: DEVICE_BLOCK_LEN,
            actual: block.len(),
        });
    }
    let mut buf = block;
    let mut samples = Vec::with_capacity(DEVICE_BLOCK_ROWS * 3);
    while buf.has_remaining() {
        samples.push(f32::from(buf.get_i16_le()) / DEVICE_COUNTS_PER_G);
    }
    SensorData::new(
        vec![SensorType::Accelerometer(Location::LeftWrist)],
        start,
        DEVICE_SAMPLES_PER_SECOND,
        samples,
    )
}

/// Incremental writer for the uncompressed primary-format body.
///
/// Rows stream straight to the target as they arrive, so a long session
/// never has to sit in memory. [`StreamingEncoder::finish`] seeks back and
/// patches the header with the final sample count before returning the
/// target; feed the finished body through [`compress_body`] to obtain
/// primary-format wire bytes.
pub struct StreamingEncoder<W: Write + Seek> {
    target: W,
    types: Vec<SensorType>,
    dimension: usize,
    start: f64,
    samples_per_second: u8,
    samples_written: u32,
}

impl<W: Write + Seek> StreamingEncoder<W> {
    /// Start a stream by writing the zero-filled placeholder header.
    pub fn new(
        mut target: W,
        types: Vec<SensorType>,
        start: f64,
        samples_per_second: u8,
    ) -> CoreResult<Self> {
        if types.len() > usize::from(u8::MAX) {
            return Err(SensingError::Unencodable {
                context: "channel-type count exceeds one byte",
            });
        }
        let dimension = types.iter().map(SensorType::dimension).sum();
        let placeholder = vec![0u8; HEADER_LEN + 4 * types.len()];
        target.write_all(&placeholder)?;
        Ok(Self {
            target,
            types,
            dimension,
            start,
            samples_per_second,
            samples_written: 0,
        })
    }

    /// Append one row of samples matching the channel layout.
    pub fn append_row(&mut self, row: &[f32]) -> CoreResult<()> {
        if row.len() != self.dimension {
            return Err(SensingError::MismatchedDimension {
                expected: self.dimension,
                actual: row.len(),
            });
        }
        let written = self
            .samples_written
            .checked_add(row.len() as u32)
            .ok_or(SensingError::Unencodable {
                context: "sample count exceeds four bytes",
            })?;
        for &sample in row {
            self.target.write_all(&sample.to_le_bytes())?;
        }
        self.samples_written = written;
        Ok(())
    }

    /// Number of scalar samples written so far.
    pub fn samples_written(&self) -> u32 {
        self.samples_written
    }

    /// Back-patch the header and hand the target back.
    pub fn finish(mut self) -> CoreResult<W> {
        let mut header = Vec::with_capacity(HEADER_LEN + 4 * self.types.len());
        header.put_u8(MAGIC);
        header.put_u8(VERSION);
        header.put_u8(self.types.len() as u8);
        header.put_f64_le(self.start);
        header.put_u8(self.samples_per_second);
        header.put_u32_le(self.samples_written);
        for &t in &self.types {
            header.put_slice(&tag_of(t));
        }

        self.target.seek(SeekFrom::Start(0))?;
        self.target.write_all(&header)?;
        self.target.seek(SeekFrom::End(0))?;
        self.target.flush()?;
        Ok(self.target)
    }
}
