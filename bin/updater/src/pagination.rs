//! Paginated lister (§4.3) and the batching half of the node
//! classifier (§4.2). Both live here because they share the same
//! shape: walk a vendor-paginated or vendor-batched API and fold the
//! pages/batches into one list, with their own partial-failure
//! policies.

use crate::{adapters::ClusterScheduler, error::ListError};

const ACTIVE_STATUS: &str = "ACTIVE";

/// Iterates the scheduler's paginated list endpoint, filtering by
/// `status = ACTIVE`, concatenating page results. Any error from the
/// underlying iterator aborts the whole call (§4.3) — unlike the
/// classifier's batch describe, there is no partial-success path
/// here because a failed page leaves the id space unknown, not just
/// incomplete.
pub async fn list_container_instances(
  scheduler: &dyn ClusterScheduler,
) -> Result<Vec<String>, ListError> {
  let mut ids = Vec::new();
  let mut next_token = None;
  loop {
    let page = scheduler
      .list_container_instances_page(ACTIVE_STATUS, next_token)
      .await
      .map_err(ListError::Failed)?;
    ids.extend(page.container_instance_arns);
    next_token = page.next_token;
    if next_token.is_none() {
      break;
    }
  }
  Ok(ids)
}

/// Splits `ids` into fixed-size slices of at most `batch_size`
/// entries, preserving order.
pub fn batches(
  ids: &[String],
  batch_size: usize,
) -> impl Iterator<Item = &[String]> {
  ids.chunks(batch_size.max(1))
}
