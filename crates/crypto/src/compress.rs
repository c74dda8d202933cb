use std::io::Read;

use flate2::read::GzDecoder;

/// GZIP magic bytes (`1f 8b`) that prefix compressed bytecode/calldata.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, thiserror::Error)]
pub enum DecompressError {
    #[error("decompressed output exceeds bound of {0} bytes")]
    OutputTooLarge(usize),
    #[error("truncated or corrupted gzip stream: {0}")]
    InvalidStream(String),
}

/// Decompress `input` if it is GZIP-prefixed, otherwise return it unchanged.
/// The output is bounded to `max_len` bytes: a stream that would produce more
/// is rejected rather than allowed to grow unbounded, and a stream that ends
/// before a valid gzip trailer is also rejected.
pub fn decompress_bounded(input: &[u8], max_len: usize) -> Result<Vec<u8>, DecompressError> {
    if input.len() < 2 || input[0..2] != GZIP_MAGIC {
        return Ok(input.to_vec());
    }

    let mut decoder = GzDecoder::new(input);
    let mut out = Vec::with_capacity(input.len().min(max_len));
    let mut chunk = [0u8; 8192];
    loop {
        let read = match decoder.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => return Err(DecompressError::InvalidStream(e.to_string())),
        };
        if out.len() + read > max_len {
            return Err(DecompressError::OutputTooLarge(max_len));
        }
        out.extend_from_slice(&chunk[..read]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn passthrough_for_uncompressed_input() {
        let raw = b"not gzip".to_vec();
        assert_eq!(decompress_bounded(&raw, 1024).unwrap(), raw);
    }

    #[test]
    fn round_trips_within_bound() {
        let payload = vec![7u8; 4096];
        let compressed = gzip(&payload);
        let decompressed = decompress_bounded(&compressed, 8192).unwrap();
        assert_eq!(decompressed, payload);
    }

    #[test]
    fn rejects_output_over_bound() {
        let payload = vec![9u8; 4096];
        let compressed = gzip(&payload);
        let err = decompress_bounded(&compressed, 100).unwrap_err();
        assert!(matches!(err, DecompressError::OutputTooLarge(100)));
    }

    #[test]
    fn rejects_truncated_stream() {
        let payload = vec![3u8; 4096];
        let compressed = gzip(&payload);
        let truncated = &compressed[..compressed.len() - 10];
        let err = decompress_bounded(truncated, 8192).unwrap_err();
        assert!(matches!(err, DecompressError::InvalidStream(_)));
    }
}
