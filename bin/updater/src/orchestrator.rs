//! Fleet-level sequencer (§4.7): the outer loop that composes the
//! classifier, eligibility check, drain, and driver into one run.
//! Walks nodes strictly sequentially; a single node's failure never
//! aborts the rest of the fleet.

use std::sync::{Arc, atomic::AtomicBool, atomic::Ordering};

use tracing::{info, info_span, warn, Instrument};

use crate::{
  adapters::{ClusterScheduler, NodeStatus, RemoteCommand},
  classifier::filter_bottlerocket_instances,
  config::Config,
  drain::{drain_instance, restore_best_effort},
  driver::{run_update, CommandDocuments, UpdateOutcome},
  eligibility::eligible,
  error::{ClassifierError, ListError},
  pagination::list_container_instances,
};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
  #[error(transparent)]
  List(#[from] ListError),
  #[error(transparent)]
  Classify(#[from] ClassifierError),
}

/// Runs one full fleet pass. Returns `Err` only for the pre-iteration
/// failures named in §4.7 step 7; per-node failures are logged and
/// do not propagate.
pub async fn run(
  config: &Config,
  scheduler: Arc<dyn ClusterScheduler>,
  remote: Arc<dyn RemoteCommand>,
  node_status: Arc<dyn NodeStatus>,
  cancelled: Arc<AtomicBool>,
) -> Result<(), OrchestratorError> {
  let ids = list_container_instances(scheduler.as_ref()).await?;
  info!(count = ids.len(), "listed container instances");

  let nodes = filter_bottlerocket_instances(
    scheduler.as_ref(),
    &ids,
    config.batch_size,
  )
  .await?;
  info!(count = nodes.len(), "classified candidate nodes");

  let documents = CommandDocuments {
    check: config.check_document.clone(),
    apply: config.apply_document.clone(),
    reboot: config.reboot_document.clone(),
  };

  for node in &nodes {
    if cancelled.load(Ordering::Relaxed) {
      warn!("cancellation requested; stopping before next node");
      break;
    }

    let span = info_span!(
      "node",
      node_id = %node.node_id,
      container_instance_id = %node.container_instance_id,
    );
    run_one_node(
      scheduler.as_ref(),
      Arc::clone(&remote),
      Arc::clone(&node_status),
      node,
      &documents,
    )
    .instrument(span)
    .await;
  }

  Ok(())
}

async fn run_one_node(
  scheduler: &dyn ClusterScheduler,
  remote: Arc<dyn RemoteCommand>,
  node_status: Arc<dyn NodeStatus>,
  node: &crate::model::Node,
  documents: &CommandDocuments,
) {
  match eligible(scheduler, &node.container_instance_id).await {
    Ok(true) => {}
    Ok(false) => {
      info!("node ineligible for drain; skipping");
      return;
    }
    Err(e) => {
      warn!(error = %e, "failed to evaluate eligibility; skipping");
      return;
    }
  }

  if let Err(e) =
    drain_instance(scheduler, &node.container_instance_id).await
  {
    warn!(error = %e, "drain failed; skipping");
    return;
  }

  let result =
    run_update(remote, node_status, node, documents).await;
  restore_best_effort(scheduler, &node.container_instance_id).await;

  match result {
    Ok(UpdateOutcome::NoUpdateNeeded) => {
      info!("node already up to date; no update needed");
    }
    Ok(UpdateOutcome::Updated { verified: true, post_update_state })
      if post_update_state
        == crate::model::KnownUpdateState::Available.as_report_str() =>
    {
      info!("update verified; another update is now available");
    }
    Ok(UpdateOutcome::Updated { verified: true, .. }) => {
      info!("update verified");
    }
    Ok(UpdateOutcome::Updated { verified: false, .. }) => {
      warn!("update completed but version did not change on verify");
    }
    Err(e) => {
      warn!(error = %e, "update driver failed");
    }
  }
}
