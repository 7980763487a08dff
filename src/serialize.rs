use crate::error::*;
use base64::Engine;
use serde::{Deserialize, Serialize};

fn codec_error<E: std::fmt::Display>(err: E) -> EngineError {
    EngineError::Codec(err.to_string())
}

pub fn encode_to_string<T>(data: &T) -> EngineResult<String>
where
    T: Serialize,
{
    let serialized_data = bincode::serialize(data).map_err(codec_error)?;

    encode_buffer_to_string(&serialized_data)
}

pub fn encode_buffer_to_string(data: &[u8]) -> EngineResult<String> {
    use flate2::write::*;
    use flate2::*;
    use std::io::prelude::*;

    let mut compressor = GzEncoder::new(Vec::with_capacity(1024 * 20), Compression::default());

    compressor.write_all(data).map_err(codec_error)?;

    let compressed_data = compressor.finish().map_err(codec_error)?;

    let encoded_data = base64::engine::general_purpose::STANDARD.encode(compressed_data);

    Ok(encoded_data)
}

pub fn decode_from_string<T>(data: &str) -> EngineResult<T>
where
    for<'de> T: Deserialize<'de>,
{
    let decoded_data = decode_buffer_from_string(data)?;

    let data = bincode::deserialize_from(decoded_data.as_slice()).map_err(codec_error)?;

    Ok(data)
}

pub fn decode_buffer_from_string(data: &str) -> EngineResult<Vec<u8>> {
    use flate2::read::*;
    use std::io::prelude::*;

    let decoded_data = base64::engine::general_purpose::STANDARD.decode(data).map_err(codec_error)?;

    let mut decompressor = GzDecoder::new(decoded_data.as_slice());

    let mut decompressed_data = Vec::with_capacity(1024 * 20);

    decompressor.read_to_end(&mut decompressed_data).map_err(codec_error)?;

    Ok(decompressed_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_a_codec_error() {
        assert!(matches!(decode_from_string::<Vec<u32>>("not base64!"), Err(EngineError::Codec(_))));
    }

    #[test]
    fn text_is_base64() {
        let encoded = encode_to_string(&vec![1u32, 2, 3]).unwrap();

        assert!(encoded.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='));
        assert_eq!(decode_from_string::<Vec<u32>>(&encoded).unwrap(), vec![1, 2, 3]);
    }
}
