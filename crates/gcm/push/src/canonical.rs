//! Canonical id reconciliation.

use color_eyre::eyre::WrapErr as _;
use gcm_core::CanonicalOutcome;
use gcm_storage::DeviceStore;

/// Record that the gateway replaced `current_id` with `canonical_id`.
///
/// Deactivates the old record when an active device already carries the new
/// id, otherwise rewrites the old record in place.
pub fn apply_canonical_id<S: DeviceStore>(
    store: &S,
    canonical_id: &str,
    current_id: &str,
) -> color_eyre::eyre::Result<CanonicalOutcome> {
    if canonical_id == current_id {
        return Ok(CanonicalOutcome::Unchanged);
    }

    let outcome = store
        .reconcile_canonical_id(canonical_id, current_id)
        .wrap_err_with(|| format!("failed to reconcile canonical id for {}", current_id))?;

    match outcome {
        CanonicalOutcome::DeactivatedDuplicate => tracing::info!(
            registration_id = %current_id,
            canonical_id = %canonical_id,
            "deactivated device superseded by existing canonical id"
        ),
        CanonicalOutcome::Rewritten => tracing::info!(
            registration_id = %current_id,
            canonical_id = %canonical_id,
            "rewrote device to canonical id"
        ),
        CanonicalOutcome::Unchanged => {}
    }

    Ok(outcome)
}
