//! Shared loading for ONNX sessions and tokenizers.

use std::path::Path;

use ort::session::Session;
use tokenizers::{Encoding, PaddingParams, Tokenizer, TruncationParams};

/// Open an ONNX Runtime session for `file` inside `model_dir`.
pub(crate) fn open_session(model_dir: &Path, file: &str) -> anyhow::Result<Session> {
    let path = model_dir.join(file);
    anyhow::ensure!(path.exists(), "{file} not found in {model_dir:?}");
    Ok(Session::builder()?.commit_from_file(&path)?)
}

/// Load `tokenizer.json` from `model_dir` with the given truncation, padding
/// batches to their longest member.
pub(crate) fn load_tokenizer(
    model_dir: &Path,
    truncation: TruncationParams,
) -> anyhow::Result<Tokenizer> {
    let path = model_dir.join("tokenizer.json");
    anyhow::ensure!(path.exists(), "tokenizer.json not found in {model_dir:?}");

    let mut tokenizer =
        Tokenizer::from_file(&path).map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
    tokenizer
        .with_truncation(Some(truncation))
        .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
    tokenizer.with_padding(Some(PaddingParams::default()));

    Ok(tokenizer)
}

/// Right truncation of single inputs to `max_length` tokens.
pub(crate) fn truncate_to(max_length: usize) -> TruncationParams {
    TruncationParams {
        max_length,
        ..Default::default()
    }
}

/// Widen token ids to the `i64` tensors ONNX models expect.
pub(crate) fn to_i64(values: &[u32]) -> Vec<i64> {
    values.iter().map(|&v| v as i64).collect()
}

/// Flatten one per-token field of a batch into a `[batch, seq_len]` tensor
/// buffer, zero-filling positions past each encoding's end.
pub(crate) fn pad_batch(
    encodings: &[Encoding],
    seq_len: usize,
    field: impl Fn(&Encoding) -> &[u32],
) -> Vec<i64> {
    let mut flat = vec![0i64; encodings.len() * seq_len];
    for (row, encoding) in flat.chunks_mut(seq_len.max(1)).zip(encodings) {
        for (slot, &value) in row.iter_mut().zip(field(encoding)) {
            *slot = value as i64;
        }
    }
    flat
}
