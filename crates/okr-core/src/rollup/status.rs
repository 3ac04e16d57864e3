//! Status aggregation over child statuses.

use crate::OkrStatus;

/// Aggregate operational status from child statuses.
///
/// Returns `None` when the children give no verdict and the current status
/// should be left alone. Thresholds are inclusive at exactly half and
/// computed in integers (`2 * count >= n`). The result depends only on the
/// counts, never on order.
#[must_use]
pub fn aggregate_status(children: &[OkrStatus]) -> Option<OkrStatus> {
    let n = children.len();
    if n == 0 {
        return None;
    }

    let count = |wanted: OkrStatus| children.iter().filter(|s| **s == wanted).count();
    let off_track = count(OkrStatus::OffTrack);
    let at_risk = count(OkrStatus::AtRisk);

    if off_track > 0 {
        return Some(if 2 * off_track >= n {
            OkrStatus::OffTrack
        } else {
            OkrStatus::AtRisk
        });
    }
    if count(OkrStatus::Completed) == n {
        return Some(OkrStatus::Completed);
    }
    if count(OkrStatus::Cancelled) == n {
        return Some(OkrStatus::Cancelled);
    }
    if 2 * at_risk >= n {
        return Some(OkrStatus::AtRisk);
    }
    if count(OkrStatus::OnTrack) == n {
        return Some(OkrStatus::OnTrack);
    }
    if at_risk > 0 {
        return Some(OkrStatus::AtRisk);
    }
    None
}
