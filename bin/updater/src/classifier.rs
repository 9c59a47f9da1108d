//! Node classifier (§4.2): from a set of container-instance
//! identifiers, returns those running the target OS variant with
//! their companion node identifiers.

use tracing::warn;

use crate::{
  adapters::ClusterScheduler,
  error::ClassifierError,
  model::Node,
  pagination::batches,
};

/// Describes `ids` in batches of at most `batch_size` (normally
/// [`crate::model::DESCRIBE_BATCH_SIZE`], overridable via config for
/// testing) and returns the nodes whose describe-record carries the
/// Bottlerocket variant marker attribute.
///
/// Partial-failure policy (§4.2): if every batch call fails, this
/// returns [`ClassifierError::AllBatchesFailed`]. If some batches
/// fail, those batches' contributions are dropped (and logged) while
/// the successful batches' results are still returned with no error
/// — a missed node this run is corrected on the next one.
pub async fn filter_bottlerocket_instances(
  scheduler: &dyn ClusterScheduler,
  ids: &[String],
  batch_size: usize,
) -> Result<Vec<Node>, ClassifierError> {
  if ids.is_empty() {
    return Ok(Vec::new());
  }

  let mut nodes = Vec::new();
  let mut any_succeeded = false;

  for batch in batches(ids, batch_size) {
    match scheduler.describe_container_instances(batch).await {
      Ok(records) => {
        any_succeeded = true;
        nodes.extend(records.into_iter().filter(|r| r.has_variant_marker()).map(
          |r| Node {
            node_id: r.ec2_instance_id,
            container_instance_id: r.container_instance_id,
            current_version: None,
          },
        ));
      }
      Err(e) => {
        warn!(
          batch_size = batch.len(),
          error = %e,
          "describe container instances batch failed; dropping its contribution"
        );
      }
    }
  }

  if !any_succeeded {
    return Err(ClassifierError::AllBatchesFailed);
  }

  Ok(nodes)
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;

  use super::*;
  use crate::{
    error::AdapterError,
    model::{
      Attribute, ContainerInstanceRecord, ContainerInstancesPage,
      InstanceState, StateChangeFailure, TaskSummary,
      BOTTLEROCKET_VARIANT_ATTRIBUTE, DESCRIBE_BATCH_SIZE,
    },
  };

  /// Describes each batch by handing back canned per-batch results,
  /// in call order.
  struct FakeScheduler {
    responses: Vec<Result<Vec<ContainerInstanceRecord>, ()>>,
    next: std::sync::atomic::AtomicUsize,
  }

  impl FakeScheduler {
    fn new(responses: Vec<Result<Vec<ContainerInstanceRecord>, ()>>) -> Self {
      Self { responses, next: std::sync::atomic::AtomicUsize::new(0) }
    }
  }

  fn marker_record(
    container_instance_id: &str,
    ec2_instance_id: &str,
  ) -> ContainerInstanceRecord {
    ContainerInstanceRecord {
      container_instance_id: container_instance_id.into(),
      ec2_instance_id: ec2_instance_id.into(),
      attributes: vec![Attribute {
        name: BOTTLEROCKET_VARIANT_ATTRIBUTE.into(),
        value: None,
      }],
    }
  }

  #[async_trait]
  impl ClusterScheduler for FakeScheduler {
    async fn list_container_instances_page(
      &self,
      _status: &str,
      _next_token: Option<String>,
    ) -> Result<ContainerInstancesPage, AdapterError> {
      unreachable!("not exercised by classifier tests")
    }

    async fn describe_container_instances(
      &self,
      ids: &[String],
    ) -> Result<Vec<ContainerInstanceRecord>, AdapterError> {
      let idx = self
        .next
        .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
      let _ = ids;
      self.responses[idx].clone().map_err(|_| {
        AdapterError::transport(
          "describe container instances",
          anyhow::anyhow!("batch failed"),
        )
      })
    }

    async fn list_tasks(
      &self,
      _container_instance_id: &str,
    ) -> Result<Vec<String>, AdapterError> {
      unreachable!()
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
      _state: InstanceState,
    ) -> Result<Vec<StateChangeFailure>, AdapterError> {
      unreachable!()
    }

    async fn wait_until_tasks_stopped(
      &self,
      _task_arns: &[String],
    ) -> Result<(), AdapterError> {
      unreachable!()
    }
  }

  #[tokio::test]
  async fn partial_pagination_failure_keeps_successful_batch() {
    let ids: Vec<String> =
      (0..150).map(|i| format!("ci-{i}")).collect();
    let scheduler = FakeScheduler::new(vec![
      Err(()),
      Ok(
        (100..150)
          .map(|i| {
            marker_record(&format!("ci-{i}"), &format!("i-{i}"))
          })
          .collect(),
      ),
    ]);

    let result = filter_bottlerocket_instances(
      &scheduler,
      &ids,
      DESCRIBE_BATCH_SIZE,
    )
    .await
    .unwrap();
    assert_eq!(result.len(), 50);
  }

  #[tokio::test]
  async fn total_pagination_failure_is_an_error() {
    let ids: Vec<String> =
      (0..150).map(|i| format!("ci-{i}")).collect();
    let scheduler = FakeScheduler::new(vec![Err(()), Err(())]);

    let err = filter_bottlerocket_instances(
      &scheduler,
      &ids,
      DESCRIBE_BATCH_SIZE,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ClassifierError::AllBatchesFailed));
  }

  #[tokio::test]
  async fn non_marker_nodes_are_dropped() {
    let scheduler = FakeScheduler::new(vec![Ok(vec![ContainerInstanceRecord {
      container_instance_id: "ci-0".into(),
      ec2_instance_id: "i-0".into(),
      attributes: vec![],
    }])]);
    let result = filter_bottlerocket_instances(
      &scheduler,
      &["ci-0".into()],
      DESCRIBE_BATCH_SIZE,
    )
    .await
    .unwrap();
    assert!(result.is_empty());
  }
}
