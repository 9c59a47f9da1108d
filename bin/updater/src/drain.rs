//! Drain and restore (§4.4). Drain pairs every transition into
//! `DRAINING` with a compensating transition back to `ACTIVE` on any
//! error path past that point — the observable invariant is that the
//! state-change adapter only ever sees `[DRAINING]` or
//! `[DRAINING, ACTIVE]`, never `[ACTIVE]` alone or `[DRAINING,
//! DRAINING]`.

use tracing::warn;

use crate::{
  adapters::ClusterScheduler,
  error::DrainError,
  model::InstanceState,
};

/// Drains `container_instance_id`: marks it `DRAINING`, then waits
/// for its running tasks to stop. On any error after the instance
/// reached `DRAINING`, emits one compensating transition back to
/// `ACTIVE` before surfacing the original error.
pub async fn drain_instance(
  scheduler: &dyn ClusterScheduler,
  container_instance_id: &str,
) -> Result<(), DrainError> {
  let ids = [container_instance_id.to_string()];

  let failures = scheduler
    .update_container_instances_state(&ids, InstanceState::Draining)
    .await
    .map_err(|source| DrainError::StateChange {
      container_instance_id: container_instance_id.to_string(),
      source,
    })?;

  if !failures.is_empty() {
    let reasons: Vec<String> = failures
      .iter()
      .map(|f| f.reason.clone().unwrap_or_default())
      .collect();
    restore_best_effort(scheduler, container_instance_id).await;
    return Err(DrainError::StateChange {
      container_instance_id: container_instance_id.to_string(),
      source: crate::error::AdapterError::logical(
        "update container instances state to DRAINING",
        reasons,
      ),
    });
  }

  let result = run_drain_wait(scheduler, container_instance_id).await;
  if result.is_err() {
    restore_best_effort(scheduler, container_instance_id).await;
  }
  result
}

async fn run_drain_wait(
  scheduler: &dyn ClusterScheduler,
  container_instance_id: &str,
) -> Result<(), DrainError> {
  let task_arns =
    scheduler.list_tasks(container_instance_id).await.map_err(
      |source| DrainError::ListTasks {
        container_instance_id: container_instance_id.to_string(),
        source,
      },
    )?;

  if task_arns.is_empty() {
    return Ok(());
  }

  scheduler.wait_until_tasks_stopped(&task_arns).await.map_err(
    |source| DrainError::WaitTasksStopped {
      container_instance_id: container_instance_id.to_string(),
      source,
    },
  )
}

/// Restores `container_instance_id` to `ACTIVE`. Used both as the
/// drain's compensating action and as the caller's undrain after a
/// successful update cycle. Best-effort: logs and swallows any
/// failure, since there is nothing further to compensate and the
/// caller has already decided to move on.
pub async fn restore_best_effort(
  scheduler: &dyn ClusterScheduler,
  container_instance_id: &str,
) {
  let ids = [container_instance_id.to_string()];
  if let Err(e) = scheduler
    .update_container_instances_state(&ids, InstanceState::Active)
    .await
  {
    warn!(
      container_instance_id,
      error = %e,
      "failed to restore container instance to ACTIVE"
    );
  }
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use tokio::sync::Mutex;

  use super::*;
  use crate::{
    error::AdapterError,
    model::{
      ContainerInstanceRecord, ContainerInstancesPage,
      StateChangeFailure, TaskSummary,
    },
  };

  #[derive(Default)]
  struct FakeScheduler {
    state_changes: Mutex<Vec<InstanceState>>,
    failures_on_drain: Vec<StateChangeFailure>,
    task_arns: Vec<String>,
    wait_fails: bool,
  }

  #[async_trait]
  impl ClusterScheduler for FakeScheduler {
    async fn list_container_instances_page(
      &self,
      _status: &str,
      _next_token: Option<String>,
    ) -> Result<ContainerInstancesPage, AdapterError> {
      unreachable!()
    }

    async fn describe_container_instances(
      &self,
      _ids: &[String],
    ) -> Result<Vec<ContainerInstanceRecord>, AdapterError> {
      unreachable!()
    }

    async fn list_tasks(
      &self,
      _container_instance_id: &str,
    ) -> Result<Vec<String>, AdapterError> {
      Ok(self.task_arns.clone())
    }

    async fn describe_tasks(
      &self,
      _task_arns: &[String],
    ) -> Result<Vec<TaskSummary>, AdapterError> {
      unreachable!()
    }

    async fn update_container_instances_state(
      &self,
      _ids: &[String],
      state: InstanceState,
    ) -> Result<Vec<StateChangeFailure>, AdapterError> {
      self.state_changes.lock().await.push(state);
      match state {
        InstanceState::Draining
          if !self.failures_on_drain.is_empty() =>
        {
          Ok(self.failures_on_drain.clone())
        }
        _ => Ok(Vec::new()),
      }
    }

    async fn wait_until_tasks_stopped(
      &self,
      _task_arns: &[String],
    ) -> Result<(), AdapterError> {
      if self.wait_fails {
        Err(AdapterError::exhausted("wait until tasks stopped"))
      } else {
        Ok(())
      }
    }
  }

  #[tokio::test]
  async fn happy_path_drains_without_rollback() {
    let scheduler = FakeScheduler {
      task_arns: vec!["task-arn-1".into()],
      ..Default::default()
    };
    drain_instance(&scheduler, "cont-inst-id").await.unwrap();
    let seen = scheduler.state_changes.lock().await.clone();
    assert_eq!(seen, vec![InstanceState::Draining]);
  }

  #[tokio::test]
  async fn logical_failure_rolls_back() {
    let scheduler = FakeScheduler {
      failures_on_drain: vec![StateChangeFailure {
        arn: Some("cont-inst-id".into()),
        reason: Some("failed".into()),
      }],
      ..Default::default()
    };
    let err =
      drain_instance(&scheduler, "cont-inst-id").await.unwrap_err();
    assert!(err.to_string().contains("failed"));
    let seen = scheduler.state_changes.lock().await.clone();
    assert_eq!(
      seen,
      vec![InstanceState::Draining, InstanceState::Active]
    );
  }

  #[tokio::test]
  async fn wait_failure_rolls_back() {
    let scheduler = FakeScheduler {
      task_arns: vec!["task-arn-1".into()],
      wait_fails: true,
      ..Default::default()
    };
    drain_instance(&scheduler, "cont-inst-id").await.unwrap_err();
    let seen = scheduler.state_changes.lock().await.clone();
    assert_eq!(
      seen,
      vec![InstanceState::Draining, InstanceState::Active]
    );
  }
}
