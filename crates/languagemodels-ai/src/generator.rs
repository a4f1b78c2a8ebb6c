//! Greedy seq2seq generation for T5-family models exported to ONNX.
//!
//! Expects the split export layout: `encoder_model.onnx`,
//! `decoder_model.onnx` (no past key/values) and `tokenizer.json`. The
//! decoder is re-run over the whole output prefix at each step.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationDirection, TruncationParams};
use tracing::{debug, info};

use crate::scoring::{apply_repetition_penalty, argmax};
use crate::session::{load_tokenizer, open_session, to_i64};
use crate::{GenerationParams, TextGenerator};

/// T5 starts decoding from the pad token.
const DECODER_START_ID: i64 = 0;
const DEFAULT_EOS_ID: i64 = 1;

/// Longest prompt fed to the encoder. Longer prompts lose their beginning,
/// so the latest turn of a growing dialog always reaches the model.
pub const MAX_PROMPT_TOKENS: usize = 2048;

fn prompt_truncation() -> TruncationParams {
    TruncationParams {
        max_length: MAX_PROMPT_TOKENS,
        direction: TruncationDirection::Left,
        ..Default::default()
    }
}

pub struct Seq2SeqGenerator {
    encoder: Session,
    decoder: Session,
    tokenizer: Tokenizer,
    eos_id: i64,
}

impl Seq2SeqGenerator {
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let encoder = open_session(model_dir, "encoder_model.onnx")?;
        let decoder = open_session(model_dir, "decoder_model.onnx")?;
        let tokenizer = load_tokenizer(model_dir, prompt_truncation())?;

        let eos_id = tokenizer
            .token_to_id("</s>")
            .map(i64::from)
            .unwrap_or(DEFAULT_EOS_ID);

        info!(model = %model_dir.display(), eos_id, "loaded seq2seq model");
        Ok(Self {
            encoder,
            decoder,
            tokenizer,
            eos_id,
        })
    }

    /// Run the encoder once, returning `(hidden_states, hidden_dim)`.
    fn encode(&mut self, input_ids: &[i64], attention_mask: &[i64]) -> anyhow::Result<(Vec<f32>, usize)> {
        let shape = [1i64, input_ids.len() as i64];
        let ids = Tensor::from_array((shape, input_ids.to_vec().into_boxed_slice()))?;
        let mask = Tensor::from_array((shape, attention_mask.to_vec().into_boxed_slice()))?;

        let outputs = self.encoder.run(ort::inputs![
            "input_ids" => ids,
            "attention_mask" => mask,
        ])?;

        let (out_shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = out_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[1] as usize == input_ids.len(),
            "unexpected encoder output shape: {dims:?}"
        );
        Ok((data.to_vec(), dims[2] as usize))
    }

    /// Logits over the vocabulary for the next token after `prefix`.
    fn next_logits(
        &mut self,
        prefix: &[i64],
        hidden: &[f32],
        hidden_dim: usize,
        attention_mask: &[i64],
    ) -> anyhow::Result<Vec<f32>> {
        let src_len = attention_mask.len() as i64;

        let ids = Tensor::from_array((
            [1i64, prefix.len() as i64],
            prefix.to_vec().into_boxed_slice(),
        ))?;
        let mask = Tensor::from_array(([1i64, src_len], attention_mask.to_vec().into_boxed_slice()))?;
        let states = Tensor::from_array((
            [1i64, src_len, hidden_dim as i64],
            hidden.to_vec().into_boxed_slice(),
        ))?;

        let outputs = self.decoder.run(ort::inputs![
            "input_ids" => ids,
            "encoder_attention_mask" => mask,
            "encoder_hidden_states" => states,
        ])?;

        // Logits: [1, prefix_len, vocab]; keep the last position.
        let (out_shape, data) = outputs["logits"].try_extract_tensor::<f32>()?;
        let dims: &[i64] = out_shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[1] as usize == prefix.len(),
            "unexpected decoder output shape: {dims:?}"
        );
        let vocab = dims[2] as usize;
        let last = (prefix.len() - 1) * vocab;
        Ok(data[last..last + vocab].to_vec())
    }
}

impl TextGenerator for Seq2SeqGenerator {
    fn generate(&mut self, prompt: &str, params: GenerationParams) -> anyhow::Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
        let input_ids = to_i64(encoding.get_ids());
        let attention_mask = to_i64(encoding.get_attention_mask());

        let (hidden, hidden_dim) = self.encode(&input_ids, &attention_mask)?;

        let mut sequence = vec![DECODER_START_ID];
        for _ in 0..params.max_new_tokens {
            let mut logits = self.next_logits(&sequence, &hidden, hidden_dim, &attention_mask)?;
            apply_repetition_penalty(&mut logits, &sequence, params.repetition_penalty);

            let next = argmax(&logits).ok_or_else(|| anyhow::anyhow!("empty logits"))? as i64;
            if next == self.eos_id {
                break;
            }
            sequence.push(next);
        }
        debug!(tokens = sequence.len() - 1, "generation finished");

        let generated: Vec<u32> = sequence[1..].iter().map(|&id| id as u32).collect();
        self.tokenizer
            .decode(&generated, true)
            .map_err(|e| anyhow::anyhow!("decode: {e}"))
    }
}
