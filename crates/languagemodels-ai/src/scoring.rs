//! Model-independent scoring: similarity ranking, logit processing, and
//! answer span selection.

use std::cmp::Ordering;

/// Longest answer span considered by [`scored_span`], in tokens.
pub const MAX_ANSWER_TOKENS: usize = 15;

/// Dot product. Equals cosine similarity for unit vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// L2-normalize a vector in place.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Pair each candidate index with its score against `query`, sorted by
/// descending score. Equal scores keep input order.
pub fn rank_by_score(query: &[f32], candidates: &[Vec<f32>]) -> Vec<(usize, f32)> {
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(i, emb)| (i, dot(query, emb)))
        .collect();

    // sort_by is stable.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored
}

/// Index of the largest value; the first one wins on ties.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Penalize tokens already present in `previous`: positive logits are
/// divided by `penalty`, negative ones multiplied. Each id is penalized once.
pub fn apply_repetition_penalty(logits: &mut [f32], previous: &[i64], penalty: f32) {
    if penalty == 1.0 {
        return;
    }
    let mut seen = std::collections::HashSet::with_capacity(previous.len());
    for &id in previous {
        let Ok(idx) = usize::try_from(id) else {
            continue;
        };
        if idx >= logits.len() || !seen.insert(idx) {
            continue;
        }
        if logits[idx] > 0.0 {
            logits[idx] /= penalty;
        } else {
            logits[idx] *= penalty;
        }
    }
}

/// Highest-scoring answer span `(start, end)` (inclusive token indices)
/// and its probability `p_start * p_end`.
///
/// Only tokens with `allowed[i]` set (the context tokens) may start or end a
/// span, `end >= start`, and spans are at most `max_len` tokens long. Spans
/// are ranked by `start_logits[start] + end_logits[end]`; ties go to the
/// earliest span. The probabilities are softmaxes over the allowed tokens
/// only, so they compare across separately encoded windows of one context.
pub fn scored_span(
    start_logits: &[f32],
    end_logits: &[f32],
    allowed: &[bool],
    max_len: usize,
) -> Option<((usize, usize), f32)> {
    let n = start_logits.len().min(end_logits.len()).min(allowed.len());
    let mut best: Option<((usize, usize), f32)> = None;

    for s in (0..n).filter(|&s| allowed[s]) {
        let last = (s + max_len).min(n);
        for e in (s..last).filter(|&e| allowed[e]) {
            let score = start_logits[s] + end_logits[e];
            match best {
                Some((_, b)) if score <= b => {}
                _ => best = Some(((s, e), score)),
            }
        }
    }

    let ((s, e), logit_sum) = best?;
    let norm = log_sum_exp(&start_logits[..n], &allowed[..n])
        + log_sum_exp(&end_logits[..n], &allowed[..n]);
    Some(((s, e), (logit_sum - norm).exp()))
}

/// Pick the window whose span scores highest, as `(window, span)`. The
/// earliest window wins ties; windows without a span are skipped.
pub fn best_window<I>(spans: I) -> Option<(usize, (usize, usize))>
where
    I: IntoIterator<Item = Option<((usize, usize), f32)>>,
{
    let mut best: Option<(usize, (usize, usize), f32)> = None;
    for (window, candidate) in spans.into_iter().enumerate() {
        let Some((span, score)) = candidate else {
            continue;
        };
        match best {
            Some((_, _, b)) if score <= b => {}
            _ => best = Some((window, span, score)),
        }
    }
    best.map(|(window, span, _)| (window, span))
}

fn log_sum_exp(values: &[f32], allowed: &[bool]) -> f32 {
    let max = values
        .iter()
        .zip(allowed)
        .filter(|&(_, &ok)| ok)
        .map(|(&v, _)| v)
        .fold(f32::NEG_INFINITY, f32::max);
    let sum: f32 = values
        .iter()
        .zip(allowed)
        .filter(|&(_, &ok)| ok)
        .map(|(&v, _)| (v - max).exp())
        .sum();
    max + sum.ln()
}
