//! Autoregressive text generation

use crate::sampler::{sample_from_probs, SampleError};
use charnn_model::{ModelError, StatefulModel};
use charnn_tokenizer::{Tokenizer, NULL_ID};
use rand::Rng;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced while generating, passed through from the model or sampler
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Sample(#[from] SampleError),
}

/// A primed generation run
///
/// Created by [`Generation::prime`], which resets the model and feeds the
/// seed. Each call to [`Generation::next_token`] (or `next()` on the
/// iterator) samples one token and feeds it back as the next input. The
/// iterator never ends on its own; callers `take` what they need.
pub struct Generation<'a, M: StatefulModel, R: Rng> {
    model: &'a mut M,
    rng: &'a mut R,
    top_n: usize,
    current: u32,
}

impl<'a, M: StatefulModel, R: Rng> Generation<'a, M, R> {
    /// Reset `model` and prime its state with `seed`
    ///
    /// Every seed token except the last is fed through `predict` with the
    /// output discarded; the last one becomes the first input of generation.
    /// An empty seed primes nothing and generation starts from the null id.
    pub fn prime(
        model: &'a mut M,
        seed: &str,
        top_n: usize,
        rng: &'a mut R,
    ) -> Result<Self, GenerateError> {
        if top_n == 0 {
            return Err(SampleError::InvalidArgument("top_n must be at least 1".to_string()).into());
        }

        model.reset_state()?;

        let ids = Tokenizer::new().encode(seed);
        let (current, prefix) = match ids.split_last() {
            Some((&last, prefix)) => (last, prefix),
            None => (NULL_ID, &[][..]),
        };
        for &id in prefix {
            model.predict(id)?;
        }

        Ok(Self {
            model,
            rng,
            top_n,
            current,
        })
    }

    /// Sample the next token and advance
    pub fn next_token(&mut self) -> Result<u32, GenerateError> {
        let probs = self.model.predict(self.current)?;
        let next = sample_from_probs(&probs, self.top_n, &mut *self.rng)? as u32;
        self.current = next;
        Ok(next)
    }
}

impl<M: StatefulModel, R: Rng> Iterator for Generation<'_, M, R> {
    type Item = Result<u32, GenerateError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_token())
    }
}

/// Generate `length` characters after `seed`
///
/// # Arguments
/// * `model` - Model to prime and sample from
/// * `seed` - Text fed to the model before sampling
/// * `length` - Number of tokens to sample
/// * `top_n` - Candidates kept per step
/// * `rng` - Source of randomness
///
/// # Returns
/// The seed followed by the decoded generated characters. Sampled null ids
/// decode to nothing, so the result can hold fewer than `length` new characters.
pub fn generate_text<M: StatefulModel, R: Rng>(
    model: &mut M,
    seed: &str,
    length: usize,
    top_n: usize,
    rng: &mut R,
) -> Result<String, GenerateError> {
    debug!(seed_len = seed.len(), length, top_n, "generating text");

    let ids = Generation::prime(model, seed, top_n, rng)?
        .take(length)
        .collect::<Result<Vec<u32>, _>>()?;

    let mut text = seed.to_string();
    text.push_str(&Tokenizer::new().decode(&ids));
    Ok(text)
}

/// Lines of `text` without the first and the last one
///
/// Both ends of a generated sample are usually cut mid-line.
pub fn generated_lines(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() < 3 {
        return Vec::new();
    }
    lines[1..lines.len() - 1]
        .iter()
        .map(|line| line.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_lines_drops_ends() {
        let lines = generated_lines("tail of seed\nfirst\nsecond\nhalf a li");
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_generated_lines_short_text() {
        assert!(generated_lines("").is_empty());
        assert!(generated_lines("one line").is_empty());
        assert!(generated_lines("a\nb").is_empty());
        assert_eq!(generated_lines("a\n\nb"), vec![""]);
    }
}
