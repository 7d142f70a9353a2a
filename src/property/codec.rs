//! Compressed binary encoding for column and type metadata files

use crate::error::RdgResult;
use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// bincode, then gzip
pub fn encode<T: Serialize + ?Sized>(value: &T) -> RdgResult<Bytes> {
    let raw = bincode::serialize(value)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::fast());
    encoder.write_all(&raw)?;
    Ok(Bytes::from(encoder.finish()?))
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> RdgResult<T> {
    let mut raw = Vec::new();
    GzDecoder::new(data).read_to_end(&mut raw)?;
    Ok(bincode::deserialize(&raw)?)
}
