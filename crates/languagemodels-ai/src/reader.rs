//! Extractive question answering with a SQuAD-tuned encoder.
//!
//! The model directory must contain `model.onnx` (inputs `input_ids`,
//! `attention_mask`; outputs `start_logits`, `end_logits`) and
//! `tokenizer.json`.
//!
//! Contexts longer than one model input are split into overlapping windows;
//! every window is scored and the most probable span across all of them wins.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Encoding, Tokenizer, TruncationParams, TruncationStrategy};
use tracing::{debug, info};

use crate::AnswerExtractor;
use crate::scoring::{MAX_ANSWER_TOKENS, best_window, scored_span};
use crate::session::{load_tokenizer, open_session, to_i64};

/// Combined question + context length of one window, in tokens.
const MAX_SEQ_LEN: usize = 384;
/// Context tokens shared by consecutive windows.
const DOC_STRIDE: usize = 128;

fn window_truncation() -> TruncationParams {
    TruncationParams {
        max_length: MAX_SEQ_LEN,
        stride: DOC_STRIDE,
        strategy: TruncationStrategy::OnlySecond,
        ..Default::default()
    }
}

pub struct Reader {
    session: Session,
    tokenizer: Tokenizer,
}

impl Reader {
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let session = open_session(model_dir, "model.onnx")?;
        let tokenizer = load_tokenizer(model_dir, window_truncation())?;
        info!(model = %model_dir.display(), "loaded question answering model");
        Ok(Self { session, tokenizer })
    }
}

impl Reader {
    /// Most probable answer span of one window, with its score.
    fn score_window(&mut self, window: &Encoding) -> anyhow::Result<Option<((usize, usize), f32)>> {
        let seq_len = window.get_ids().len();
        let shape = [1i64, seq_len as i64];
        let ids = Tensor::from_array((shape, to_i64(window.get_ids()).into_boxed_slice()))?;
        let mask = Tensor::from_array((
            shape,
            to_i64(window.get_attention_mask()).into_boxed_slice(),
        ))?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => ids,
            "attention_mask" => mask,
        ])?;

        let (_, start_logits) = outputs["start_logits"].try_extract_tensor::<f32>()?;
        let (_, end_logits) = outputs["end_logits"].try_extract_tensor::<f32>()?;
        anyhow::ensure!(
            start_logits.len() == seq_len && end_logits.len() == seq_len,
            "expected {seq_len} logits, got {} / {}",
            start_logits.len(),
            end_logits.len()
        );

        // Only tokens of the context (sequence 1) may bound the answer.
        let allowed: Vec<bool> = window
            .get_sequence_ids()
            .iter()
            .map(|id| *id == Some(1))
            .collect();

        Ok(scored_span(start_logits, end_logits, &allowed, MAX_ANSWER_TOKENS))
    }
}

impl AnswerExtractor for Reader {
    fn extract(&mut self, question: &str, context: &str) -> anyhow::Result<String> {
        let encoding = self
            .tokenizer
            .encode((question, context), true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let windows: Vec<&Encoding> = std::iter::once(&encoding)
            .chain(encoding.get_overflowing())
            .collect();
        debug!(windows = windows.len(), "scoring context windows");

        let spans = windows
            .iter()
            .map(|window| self.score_window(window))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let Some((w, (s, e))) = best_window(spans) else {
            debug!("no answer span in context");
            return Ok(String::new());
        };

        // Offsets of pair encodings are relative to their own sequence, so
        // every window indexes the original context.
        let offsets = windows[w].get_offsets();
        let (begin, end) = (offsets[s].0, offsets[e].1);
        context
            .get(begin..end)
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("answer offsets {begin}..{end} outside context"))
    }
}
