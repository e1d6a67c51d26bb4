//! Label derivation.
//!
//! A label is the 32-byte unit of stored data: `SHA-256(identity || index_le)`.
//! Labels depend only on the identity and their global index, so any subset
//! can be recomputed cheaply during validation.

use crate::error::{PostError, Result};
use sha2::{Digest, Sha256};
use std::thread;

/// Size of one label in bytes.
pub const LABEL_SIZE: usize = 32;

/// A single label.
pub type Label = [u8; LABEL_SIZE];

/// Compute the label at `index` for `identity`.
pub fn label(identity: &[u8], index: u64) -> Label {
    let mut hasher = Sha256::new();
    hasher.update(identity);
    hasher.update(index.to_le_bytes());
    hasher.finalize().into()
}

/// Fill `out` with consecutive labels starting at `first_index`.
///
/// `out.len()` must be a multiple of [`LABEL_SIZE`].
pub fn fill_labels(identity: &[u8], first_index: u64, out: &mut [u8]) {
    debug_assert_eq!(out.len() % LABEL_SIZE, 0);
    for (offset, chunk) in (0u64..).zip(out.chunks_exact_mut(LABEL_SIZE)) {
        chunk.copy_from_slice(&label(identity, first_index + offset));
    }
}

/// Fill `out` like [`fill_labels`], splitting the work across up to `workers` threads.
pub fn fill_labels_parallel(
    identity: &[u8],
    first_index: u64,
    out: &mut [u8],
    workers: usize,
) -> Result<()> {
    let total = out.len() / LABEL_SIZE;
    let workers = workers.clamp(1, total.max(1));
    if workers == 1 {
        fill_labels(identity, first_index, out);
        return Ok(());
    }

    let per_worker = total.div_ceil(workers) * LABEL_SIZE;
    thread::scope(|s| {
        let handles: Vec<_> = out
            .chunks_mut(per_worker)
            .enumerate()
            .map(|(i, chunk)| {
                let start = first_index + (i * per_worker / LABEL_SIZE) as u64;
                s.spawn(move || fill_labels(identity, start, chunk))
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .map_err(|_| PostError::WorkerPanicked("label"))?;
        }
        Ok(())
    })
}

/// Derive `count` label indices in `0..total_labels` from a challenge and a commitment.
pub fn derive_indices(
    challenge: &[u8],
    commitment: &[u8; 32],
    total_labels: u64,
    count: usize,
) -> Vec<u64> {
    if total_labels == 0 {
        return Vec::new();
    }
    (0..count as u64)
        .map(|j| {
            let mut hasher = Sha256::new();
            hasher.update(challenge);
            hasher.update(commitment);
            hasher.update(j.to_le_bytes());
            let digest = hasher.finalize();
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            u64::from_le_bytes(head) % total_labels
        })
        .collect()
}
