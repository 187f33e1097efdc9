use ckb_types::{bytes::Bytes, core::ScriptHashType, H256};

use crate::error::{Error, Result};

/// Decodes a hex string with an optional `0x` prefix.
pub fn decode_hex(field: &str, s: &str) -> Result<Vec<u8>> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(digits).map_err(|err| Error::decode(field, err))
}

pub fn decode_bytes(field: &str, s: &str) -> Result<Bytes> {
    decode_hex(field, s).map(Bytes::from)
}

pub fn decode_fixed<const N: usize>(field: &str, s: &str) -> Result<[u8; N]> {
    let raw = decode_hex(field, s)?;
    raw.as_slice()
        .try_into()
        .map_err(|_| Error::decode(field, format!("expect {} bytes, got {}", N, raw.len())))
}

pub fn decode_h256(field: &str, s: &str) -> Result<H256> {
    decode_fixed::<32>(field, s).map(H256)
}

pub fn parse_hash_type(field: &str, s: &str) -> Result<ScriptHashType> {
    match s {
        "data" => Ok(ScriptHashType::Data),
        "type" => Ok(ScriptHashType::Type),
        "data1" => Ok(ScriptHashType::Data1),
        other => Err(Error::decode(field, format!("unknown hash type {:?}", other))),
    }
}
