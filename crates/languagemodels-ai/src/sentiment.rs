//! Binary sentiment classification with a sequence-classification model.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use crate::SentimentModel;
use crate::labels::LabelMap;
use crate::scoring::argmax;
use crate::session::{load_tokenizer, open_session, to_i64, truncate_to};

/// Sequence classifier over `model.onnx` (inputs `input_ids`,
/// `attention_mask`; output `logits` `[1, num_labels]`), with label names
/// from the optional `config.json`.
pub struct SentimentClassifier {
    session: Session,
    tokenizer: Tokenizer,
    labels: LabelMap,
}

impl SentimentClassifier {
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let session = open_session(model_dir, "model.onnx")?;
        let tokenizer = load_tokenizer(model_dir, truncate_to(512))?;
        let labels = LabelMap::load(model_dir)?;
        info!(model = %model_dir.display(), labels = labels.len(), "loaded sentiment model");
        Ok(Self {
            session,
            tokenizer,
            labels,
        })
    }
}

impl SentimentModel for SentimentClassifier {
    fn top_label(&mut self, text: &str) -> anyhow::Result<String> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let shape = [1i64, encoding.get_ids().len() as i64];
        let ids = Tensor::from_array((shape, to_i64(encoding.get_ids()).into_boxed_slice()))?;
        let mask = Tensor::from_array((
            shape,
            to_i64(encoding.get_attention_mask()).into_boxed_slice(),
        ))?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => ids,
            "attention_mask" => mask,
        ])?;

        let (_, logits) = outputs["logits"].try_extract_tensor::<f32>()?;
        let top = argmax(logits).ok_or_else(|| anyhow::anyhow!("model returned no logits"))?;
        self.labels
            .name(top)
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("class {top} has no label name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::is_positive_label;
    use std::path::PathBuf;

    fn model_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../models")
            .join("distilbert-base-uncased-finetuned-sst-2-english")
    }

    #[test]
    #[ignore = "needs models/distilbert-base-uncased-finetuned-sst-2-english"]
    fn clear_sentiment() {
        let mut clf = SentimentClassifier::load(&model_dir()).unwrap();
        assert!(is_positive_label(&clf.top_label("I love you!").unwrap()));
        assert!(!is_positive_label(
            &clf.top_label("That movie was terrible.").unwrap()
        ));
    }
}
