//! ONNX Runtime embedding pipeline for sentence-transformers models.
//!
//! Mean-pooled, L2-normalized embeddings, so a dot product between two
//! vectors is their cosine similarity. The model directory must contain
//! `model.onnx` and `tokenizer.json`.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Encoding, Tokenizer};
use tracing::info;

use crate::SentenceEncoder;
use crate::scoring::normalize;
use crate::session::{load_tokenizer, open_session, pad_batch, truncate_to};

/// Sentence embedding generator using ONNX Runtime.
///
/// Loads a BERT-family sentence-transformers model (e.g.
/// multi-qa-MiniLM-L6-cos-v1) taking `input_ids`, `attention_mask` and
/// `token_type_ids`.
pub struct Embedder {
    session: Session,
    tokenizer: Tokenizer,
    dim: usize,
}

impl Embedder {
    /// Load an embedding model from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let session = open_session(model_dir, "model.onnx")?;

        // Infer embedding dimension from model output shape.
        let dim = infer_dim(session.outputs()[0].dtype()).unwrap_or(384);

        // MiniLM models were trained on sequences of up to 512 word pieces.
        let tokenizer = load_tokenizer(model_dir, truncate_to(512))?;

        info!(dim, model = %model_dir.display(), "loaded embedding model");
        Ok(Self {
            session,
            tokenizer,
            dim,
        })
    }

    /// Embedding dimensionality (384 for MiniLM-L6).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed a batch of texts, returning one normalized vector per input.
    pub fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let input_ids = pad_batch(&encodings, seq_len, Encoding::get_ids);
        let attention_mask = pad_batch(&encodings, seq_len, Encoding::get_attention_mask);
        let token_type_ids = pad_batch(&encodings, seq_len, Encoding::get_type_ids);

        let shape = [batch_size as i64, seq_len as i64];
        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.clone().into_boxed_slice()))?;
        let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
            "token_type_ids" => type_tensor,
        ])?;

        // Token embeddings: [batch_size, seq_len, dim].
        let (output_shape, output_data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] as usize == batch_size && dims[2] as usize == self.dim,
            "unexpected output shape: {dims:?}, expected [{batch_size}, {seq_len}, {}]",
            self.dim
        );

        let actual_seq_len = dims[1] as usize;

        // Mean pooling with attention mask.
        let mut embeddings = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let mut pooled = vec![0.0f32; self.dim];
            let mut token_count = 0.0f32;

            for j in 0..actual_seq_len {
                let mask_val = attention_mask[i * seq_len + j] as f32;
                if mask_val > 0.0 {
                    let offset = (i * actual_seq_len + j) * self.dim;
                    for (d, p) in pooled.iter_mut().enumerate() {
                        *p += output_data[offset + d] * mask_val;
                    }
                    token_count += mask_val;
                }
            }

            if token_count > 0.0 {
                for p in &mut pooled {
                    *p /= token_count;
                }
            }
            normalize(&mut pooled);
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

impl SentenceEncoder for Embedder {
    fn encode(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.embed_batch(texts)
    }
}

/// Try to infer the embedding dimension from the ONNX model output type.
fn infer_dim(output_type: &ort::value::ValueType) -> Option<usize> {
    match output_type {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{dot, rank_by_score};
    use std::path::PathBuf;

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../models")
            .join("sentence-transformers/multi-qa-MiniLM-L6-cos-v1")
    }

    #[test]
    #[ignore = "needs models/sentence-transformers/multi-qa-MiniLM-L6-cos-v1"]
    fn embed_batch_unit_vectors() {
        let mut embedder = Embedder::load(&model_dir()).unwrap();
        let vecs = embedder
            .embed_batch(&["Mars is a planet", "The sun is hot"])
            .unwrap();
        assert_eq!(vecs.len(), 2);
        for v in &vecs {
            assert_eq!(v.len(), embedder.dim());
            let norm = dot(v, v).sqrt();
            assert!((norm - 1.0).abs() < 1e-4, "expected unit norm, got {norm}");
        }
    }

    #[test]
    #[ignore = "needs models/sentence-transformers/multi-qa-MiniLM-L6-cos-v1"]
    fn near_duplicate_ranks_first() {
        let mut embedder = Embedder::load(&model_dir()).unwrap();
        let query = embedder.encode(&["Where is Paris?"]).unwrap().remove(0);
        let docs = embedder
            .encode(&["Paris is rainy", "Paris is in France"])
            .unwrap();
        assert_eq!(rank_by_score(&query, &docs)[0].0, 1);
    }

    #[test]
    #[ignore = "needs models/sentence-transformers/multi-qa-MiniLM-L6-cos-v1"]
    fn embed_empty_batch() {
        let mut embedder = Embedder::load(&model_dir()).unwrap();
        assert!(embedder.embed_batch(&[]).unwrap().is_empty());
    }
}
