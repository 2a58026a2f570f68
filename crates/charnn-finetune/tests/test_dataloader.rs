//! Unit tests for stateful sequence batching

use charnn_finetune::{split_validation, BatchError, BatcherConfig, BatcherState, SequenceBatcher};
use charnn_model::Tensor;
use charnn_tokenizer::{Tokenizer, VOCAB_SIZE};
use proptest::prelude::*;

fn ids_config(batch_size: usize, seq_len: usize) -> BatcherConfig {
    BatcherConfig {
        batch_size,
        seq_len,
        one_hot_features: false,
        one_hot_labels: false,
    }
}

fn tensor_ids(tensor: &Tensor) -> Vec<u32> {
    tensor.data().iter().map(|&v| v as u32).collect()
}

/// Rebuild the truncated stream from every window of one epoch
fn reconstruct(batcher: &mut SequenceBatcher, targets: bool) -> Vec<u32> {
    let batch_size = batcher.batch_size();
    let seq_len = batcher.seq_len();
    let mut rows = vec![Vec::new(); batch_size];

    while let Some(batch) = batcher.next_window() {
        let ids = tensor_ids(if targets { batch.targets } else { batch.inputs });
        for (r, row) in rows.iter_mut().enumerate() {
            row.extend_from_slice(&ids[r * seq_len..(r + 1) * seq_len]);
        }
    }
    rows.concat()
}

#[test]
fn test_windows_preserve_row_contiguity() {
    let tokens: Vec<u32> = (0..50).map(|i| i % VOCAB_SIZE as u32).collect();
    let mut batcher = SequenceBatcher::new(&tokens, ids_config(3, 4)).unwrap();

    // (50 - 1) / 12 = 4 windows, 48 tokens kept
    assert_eq!(batcher.num_batches(), 4);
    assert_eq!(batcher.effective_len(), 48);

    let inputs = reconstruct(&mut batcher, false);
    assert_eq!(inputs, tokens[..48].to_vec());

    batcher.reset();
    let targets = reconstruct(&mut batcher, true);
    assert_eq!(targets, tokens[1..49].to_vec());
}

#[test]
fn test_window_layout() {
    let tokens: Vec<u32> = (0..25).collect();
    let mut batcher = SequenceBatcher::new(&tokens, ids_config(2, 3)).unwrap();
    assert_eq!(batcher.num_batches(), 4);

    // Row r, window i starts at r * num_batches * seq_len + i * seq_len
    let batch = batcher.next_batch();
    assert_eq!(batch.inputs.shape(), &[2, 3]);
    assert_eq!(tensor_ids(batch.inputs), vec![0, 1, 2, 12, 13, 14]);
    assert_eq!(tensor_ids(batch.targets), vec![1, 2, 3, 13, 14, 15]);

    let batch = batcher.next_batch();
    assert_eq!(tensor_ids(batch.inputs), vec![3, 4, 5, 15, 16, 17]);
    assert_eq!(batch.window, 1);
}

#[test]
fn test_epochs_cycle_identical_windows() {
    let tokens: Vec<u32> = (0..40).collect();
    let mut batcher = SequenceBatcher::new(&tokens, ids_config(2, 4)).unwrap();
    let num_batches = batcher.num_batches();
    assert_eq!(num_batches, 4);

    let mut epochs = Vec::new();
    let mut inputs = Vec::new();
    for _ in 0..num_batches * 3 + 2 {
        let batch = batcher.next_batch();
        epochs.push(batch.epoch);
        inputs.push(tensor_ids(batch.inputs));
    }

    let mut expected = vec![0; num_batches];
    expected.extend(vec![1; num_batches]);
    expected.extend(vec![2; num_batches]);
    expected.extend(vec![3; 2]);
    assert_eq!(epochs, expected);

    for i in 0..num_batches * 2 + 2 {
        assert_eq!(inputs[i], inputs[i + num_batches]);
    }
}

#[test]
fn test_next_window_signals_end_of_epoch() {
    let tokens: Vec<u32> = (0..13).collect();
    let mut batcher = SequenceBatcher::new(&tokens, ids_config(2, 3)).unwrap();

    assert_eq!(batcher.next_window().map(|b| b.epoch), Some(0));
    assert_eq!(batcher.next_window().map(|b| b.window), Some(1));
    assert!(batcher.next_window().is_none());

    batcher.advance_epoch();
    let batch = batcher.next_window().unwrap();
    assert_eq!((batch.epoch, batch.window), (1, 0));
}

#[test]
fn test_insufficient_data() {
    let tokens: Vec<u32> = (0..12).collect();
    assert_eq!(
        SequenceBatcher::new(&tokens, ids_config(4, 3)).err(),
        Some(BatchError::InsufficientData {
            len: 12,
            batch_size: 4,
            seq_len: 3
        })
    );
    assert!(matches!(
        SequenceBatcher::new(&[], ids_config(1, 1)),
        Err(BatchError::InsufficientData { .. })
    ));
}

#[test]
fn test_one_hot_shapes() {
    let tokens = Tokenizer::new().encode("the quick brown fox jumps over the lazy dog");
    let config = BatcherConfig {
        batch_size: 2,
        seq_len: 5,
        one_hot_features: false,
        one_hot_labels: true,
    };
    let mut batcher = SequenceBatcher::new(&tokens, config).unwrap();

    let batch = batcher.next_batch();
    assert_eq!(batch.inputs.shape(), &[2, 5]);
    assert_eq!(batch.targets.shape(), &[2, 5, VOCAB_SIZE]);

    // Each one-hot row marks exactly the target id
    let ids = tensor_ids(batch.inputs);
    let one_hot = batch.targets.data();
    for (pos, chunk) in one_hot.chunks(VOCAB_SIZE).enumerate() {
        assert_eq!(chunk.iter().sum::<f32>(), 1.0);
        let hot = chunk.iter().position(|&v| v == 1.0).unwrap() as u32;
        if pos % 5 < 4 {
            assert_eq!(hot, ids[pos + 1]);
        }
    }
}

#[test]
fn test_state_restore_resumes() {
    let tokens: Vec<u32> = (0..40).collect();
    let mut batcher = SequenceBatcher::new(&tokens, ids_config(2, 4)).unwrap();

    for _ in 0..6 {
        batcher.next_batch();
    }
    let state = batcher.get_state();
    assert_eq!(state, BatcherState { window: 2, epoch: 1 });
    let expected = tensor_ids(batcher.next_batch().inputs);

    let mut resumed = SequenceBatcher::new(&tokens, ids_config(2, 4)).unwrap();
    resumed.restore_state(state).unwrap();
    let batch = resumed.next_batch();
    assert_eq!(batch.epoch, 1);
    assert_eq!(tensor_ids(batch.inputs), expected);

    assert!(resumed
        .restore_state(BatcherState { window: 5, epoch: 0 })
        .is_err());
}

#[test]
fn test_split_validation_takes_prefix() {
    let tokens: Vec<u32> = (0..11).collect();
    let (val, train) = split_validation(&tokens, 0.2).unwrap();
    assert_eq!(val, &[0, 1]);
    assert_eq!(train, &tokens[2..]);
}

proptest! {
    #[test]
    fn test_num_batches_formula(len in 0usize..400, batch_size in 1usize..6, seq_len in 1usize..9) {
        let tokens: Vec<u32> = (0..len as u32).map(|i| i % VOCAB_SIZE as u32).collect();
        let expected = len.saturating_sub(1) / (batch_size * seq_len);

        match SequenceBatcher::new(&tokens, ids_config(batch_size, seq_len)) {
            Ok(mut batcher) => {
                prop_assert_eq!(batcher.num_batches(), expected);
                let inputs = reconstruct(&mut batcher, false);
                prop_assert_eq!(&inputs[..], &tokens[..batcher.effective_len()]);
            }
            Err(BatchError::InsufficientData { .. }) => prop_assert_eq!(expected, 0),
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }
    }
}
