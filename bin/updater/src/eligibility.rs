//! Eligibility evaluation (§4.4): a node is eligible iff every task
//! currently running on it was started by a service controller.

use crate::{adapters::ClusterScheduler, error::EligibilityError};

/// Returns whether `container_instance_id` is safe to drain: every
/// task on it must carry a `StartedBy` with the service prefix. An
/// empty task list is eligible — there is nothing to displace.
pub async fn eligible(
  scheduler: &dyn ClusterScheduler,
  container_instance_id: &str,
) -> Result<bool, EligibilityError> {
  let task_arns = scheduler.list_tasks(container_instance_id).await.map_err(
    |source| EligibilityError::ListTasks {
      container_instance_id: container_instance_id.to_string(),
      source,
    },
  )?;

  if task_arns.is_empty() {
    return Ok(true);
  }

  let tasks =
    scheduler.describe_tasks(&task_arns).await.map_err(|source| {
      EligibilityError::DescribeTasks {
        container_instance_id: container_instance_id.to_string(),
        source,
      }
    })?;

  Ok(tasks.iter().all(|t| t.started_by_service()))
}
