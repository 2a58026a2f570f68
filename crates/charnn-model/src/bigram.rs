//! Bigram next-character model
//!
//! A `vocab_size x vocab_size` table of logits: row `a` scores every
//! character that can follow `a`. Training is plain SGD on softmax
//! cross-entropy, one step per window.

use crate::{BigramConfig, ModelError, StatefulModel, Tensor};

/// Reference [`StatefulModel`] backed by a bigram logits table
#[derive(Debug, Clone)]
pub struct BigramModel {
    config: BigramConfig,
    /// Row-major `[prev][next]`
    logits: Vec<f32>,
    resets: usize,
    steps: usize,
}

impl BigramModel {
    /// Create a model with all-zero logits (uniform predictions)
    pub fn new(config: BigramConfig) -> Self {
        let vocab_size = config.vocab_size;
        Self {
            config,
            logits: vec![0.0; vocab_size * vocab_size],
            resets: 0,
            steps: 0,
        }
    }

    pub fn config(&self) -> &BigramConfig {
        &self.config
    }

    /// How many times `reset_state` has been called
    pub fn reset_count(&self) -> usize {
        self.resets
    }

    /// Number of optimisation steps taken
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn row(&self, token: usize) -> &[f32] {
        let v = self.config.vocab_size;
        &self.logits[token * v..(token + 1) * v]
    }

    fn check_token(&self, token: u32) -> Result<usize, ModelError> {
        let vocab_size = self.config.vocab_size;
        if (token as usize) < vocab_size {
            Ok(token as usize)
        } else {
            Err(ModelError::TokenOutOfRange { token, vocab_size })
        }
    }

    /// Pair every input token with its target
    fn window_pairs(
        &self,
        inputs: &Tensor,
        targets: &Tensor,
    ) -> Result<Vec<(usize, usize)>, ModelError> {
        let vocab_size = self.config.vocab_size;
        let (input_ids, input_shape) = window_ids(inputs, vocab_size)?;
        let (target_ids, target_shape) = window_ids(targets, vocab_size)?;

        if input_shape != target_shape || input_ids.is_empty() {
            return Err(ModelError::ShapeMismatch {
                inputs: inputs.shape().to_vec(),
                targets: targets.shape().to_vec(),
            });
        }

        Ok(input_ids.into_iter().zip(target_ids).collect())
    }

    /// Mean smoothed cross-entropy over `pairs`, accumulating the gradient of
    /// that mean into `grad` when given
    fn cross_entropy(&self, pairs: &[(usize, usize)], mut grad: Option<&mut [f32]>) -> f32 {
        let v = self.config.vocab_size;
        let eps = self.config.smoothing;
        let n = pairs.len() as f32;
        let uniform = eps / v as f32;

        let mut log_probs: Vec<Option<Vec<f32>>> = vec![None; v];
        let mut total = 0.0f32;

        for &(prev, next) in pairs {
            let row = log_probs[prev].get_or_insert_with(|| log_softmax(self.row(prev)));

            let mut loss = -(1.0 - eps) * row[next];
            if eps > 0.0 {
                loss -= uniform * row.iter().sum::<f32>();
            }
            total += loss;

            if let Some(grad) = grad.as_deref_mut() {
                let g = &mut grad[prev * v..(prev + 1) * v];
                for (k, (&lp, slot)) in row.iter().zip(g.iter_mut()).enumerate() {
                    let target = if k == next { 1.0 - eps + uniform } else { uniform };
                    *slot += (lp.exp() - target) / n;
                }
            }
        }

        total / n
    }
}

impl StatefulModel for BigramModel {
    fn vocab_size(&self) -> usize {
        self.config.vocab_size
    }

    /// A bigram carries no hidden state; resets are only counted.
    fn reset_state(&mut self) -> Result<(), ModelError> {
        self.resets += 1;
        Ok(())
    }

    fn predict(&mut self, token: u32) -> Result<Vec<f32>, ModelError> {
        let token = self.check_token(token)?;
        Ok(softmax(self.row(token)))
    }

    fn fit(&mut self, inputs: &Tensor, targets: &Tensor) -> Result<f32, ModelError> {
        let pairs = self.window_pairs(inputs, targets)?;

        let mut grad = vec![0.0f32; self.logits.len()];
        let loss = self.cross_entropy(&pairs, Some(&mut grad));

        let lr = self.config.learning_rate;
        for (w, g) in self.logits.iter_mut().zip(&grad) {
            *w -= lr * g;
        }
        self.steps += 1;

        Ok(loss)
    }

    fn evaluate(&mut self, inputs: &Tensor, targets: &Tensor) -> Result<f32, ModelError> {
        let pairs = self.window_pairs(inputs, targets)?;
        Ok(self.cross_entropy(&pairs, None))
    }

    fn weights(&self) -> Vec<f32> {
        self.logits.clone()
    }

    fn set_weights(&mut self, weights: &[f32]) -> Result<(), ModelError> {
        if weights.len() != self.logits.len() {
            return Err(ModelError::WeightCount {
                expected: self.logits.len(),
                actual: weights.len(),
            });
        }
        self.logits.copy_from_slice(weights);
        Ok(())
    }
}

/// Decode a window into flat token ids plus its `[batch, seq]` shape
///
/// Accepts id windows `[batch, seq]` and one-hot windows
/// `[batch, seq, vocab_size]` (decoded by argmax).
fn window_ids(window: &Tensor, vocab_size: usize) -> Result<(Vec<usize>, Vec<usize>), ModelError> {
    let shape = window.shape().to_vec();
    let data = window.data();

    match shape.len() {
        2 => {
            let ids = data
                .iter()
                .map(|&value| {
                    let token = value.round();
                    if token >= 0.0 && (token as usize) < vocab_size {
                        Ok(token as usize)
                    } else {
                        Err(ModelError::TokenOutOfRange {
                            token: token as u32,
                            vocab_size,
                        })
                    }
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((ids, shape))
        }
        3 if shape[2] == vocab_size && vocab_size > 0 => {
            let ids = data.chunks(vocab_size).map(argmax).collect();
            Ok((ids, shape[..2].to_vec()))
        }
        _ => Err(ModelError::UnsupportedShape { shape, vocab_size }),
    }
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let sum: f32 = logits.iter().map(|&x| (x - max).exp()).sum();
    let lse = max + sum.ln();
    logits.iter().map(|&x| x - lse).collect()
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    log_softmax(logits).into_iter().map(f32::exp).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0, -1.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_argmax_first_on_ties() {
        assert_eq!(argmax(&[0.0, 1.0, 1.0]), 1);
        assert_eq!(argmax(&[0.0, 0.0]), 0);
    }

    #[test]
    fn test_window_ids_rejects_bad_shape() {
        let t = Tensor::new(&[0.0; 6], &[1, 2, 3]);
        assert!(matches!(
            window_ids(&t, 4),
            Err(ModelError::UnsupportedShape { .. })
        ));
    }

    #[test]
    fn test_window_ids_one_hot() {
        let data = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let t = Tensor::new(&data, &[1, 2, 3]);
        let (ids, shape) = window_ids(&t, 3).unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(shape, vec![1, 2]);
    }
}
