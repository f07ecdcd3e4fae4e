//! Best-fit selection: encode with every selectable compression and keep
//! the smallest output.
//!
//! Candidates are independent full encodes of the same read-only [`Wave`];
//! each writes into its own slot of the result vector, indexed by scan
//! position, so no synchronisation is needed beyond the final join.  With
//! the `parallel` feature the candidates run on Rayon's global pool;
//! otherwise they run one after another with identical results.
//!
//! A failing candidate (unsupported method, unsupported geometry, codec
//! error) is treated as absent.  There is no early cancellation: sizes are
//! unknown until each encode completes.

use tracing::debug;

use crate::codec::{CompressionKind, SELECTABLE_COMPRESSIONS};
use crate::crypto::EncryptionKind;
use crate::transform::TransformOptions;
use crate::wave::Wave;

/// Outcome of a best-fit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestFit {
    /// The smallest candidate, strictly smaller than the baseline.
    Chosen { compression: CompressionKind, bytes: Vec<u8> },
    /// No candidate beat the baseline; nothing should be written.
    NoImprovement { baseline: usize, smallest: Option<usize> },
}

fn try_candidate(
    wave:        &Wave,
    compression: CompressionKind,
    encryption:  EncryptionKind,
    opts:        &TransformOptions,
) -> Option<Vec<u8>> {
    match wave.to_bytes(compression, encryption, opts) {
        Ok(bytes) => {
            debug!(codec = compression.name(), len = bytes.len(), "candidate encoded");
            Some(bytes)
        }
        Err(e) => {
            debug!(codec = compression.name(), error = %e, "candidate dropped");
            None
        }
    }
}

/// Encode `wave` with each of `candidates` and return the per-candidate
/// outputs in the same order.
pub fn encode_candidates(
    wave:       &Wave,
    candidates: &[CompressionKind],
    encryption: EncryptionKind,
    opts:       &TransformOptions,
) -> Vec<Option<Vec<u8>>> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        candidates
            .par_iter()
            .map(|&c| try_candidate(wave, c, encryption, opts))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        candidates
            .iter()
            .map(|&c| try_candidate(wave, c, encryption, opts))
            .collect()
    }
}

/// Pick the smallest non-empty output; ties go to the earliest candidate.
fn smallest(candidates: &[CompressionKind], results: Vec<Option<Vec<u8>>>) -> Option<(CompressionKind, Vec<u8>)> {
    let mut best: Option<(CompressionKind, Vec<u8>)> = None;
    for (&kind, result) in candidates.iter().zip(results) {
        let Some(bytes) = result else { continue };
        if bytes.is_empty() {
            continue;
        }
        let better = match &best {
            Some((_, current)) => bytes.len() < current.len(),
            None => true,
        };
        if better {
            best = Some((kind, bytes));
        }
    }
    best
}

/// Run best-fit over `candidates` against an explicit baseline size.
pub fn select_from(
    wave:       &Wave,
    candidates: &[CompressionKind],
    encryption: EncryptionKind,
    baseline:   usize,
    opts:       &TransformOptions,
) -> BestFit {
    let results = encode_candidates(wave, candidates, encryption, opts);
    match smallest(candidates, results) {
        Some((compression, bytes)) if bytes.len() < baseline => {
            debug!(codec = compression.name(), len = bytes.len(), baseline, "best fit chosen");
            BestFit::Chosen { compression, bytes }
        }
        other => BestFit::NoImprovement {
            baseline,
            smallest: other.map(|(_, b)| b.len()),
        },
    }
}

/// Run best-fit over the user-selectable compressions with `encryption`,
/// against the model's plain-layout size.
pub fn select_best_for(wave: &Wave, encryption: EncryptionKind, opts: &TransformOptions) -> BestFit {
    select_from(wave, &SELECTABLE_COMPRESSIONS, encryption, wave.plain_len(), opts)
}

/// [`select_best_for`] keeping the model's own encryption.
pub fn select_best(wave: &Wave, opts: &TransformOptions) -> BestFit {
    select_best_for(wave, wave.encryption, opts)
}
