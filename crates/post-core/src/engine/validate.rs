//! Proof validation.

use crate::engine::Proof;
use crate::error::{PostError, Result};
use crate::label::{derive_indices, label};

/// Check that `proof` samples the right indices and that every sampled label is genuine.
///
/// Only `labels_per_proof` labels are recomputed, so this is far cheaper than
/// generating the proof.
pub fn validate_proof(proof: &Proof, labels_per_proof: usize) -> Result<()> {
    if proof.total_labels == 0 {
        return Err(PostError::InvalidProof("proof covers no labels".to_string()));
    }
    if proof.indices.len() != labels_per_proof {
        return Err(PostError::InvalidProof(format!(
            "expected {labels_per_proof} indices, got {}",
            proof.indices.len()
        )));
    }
    if proof.labels.len() != proof.indices.len() {
        return Err(PostError::InvalidProof(format!(
            "{} indices but {} labels",
            proof.indices.len(),
            proof.labels.len()
        )));
    }

    let expected = derive_indices(
        &proof.challenge,
        &proof.commitment,
        proof.total_labels,
        labels_per_proof,
    );
    if proof.indices != expected {
        return Err(PostError::InvalidProof(
            "indices do not match challenge and commitment".to_string(),
        ));
    }

    for (&index, stored) in proof.indices.iter().zip(&proof.labels) {
        if label(&proof.identity, index) != *stored {
            return Err(PostError::InvalidProof(format!("label {index} is invalid")));
        }
    }

    Ok(())
}
