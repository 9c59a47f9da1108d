use async_trait::async_trait;
use aws_sdk_ecs::types::ContainerInstanceStatus;

use super::{BackoffPolicy, ClusterScheduler};
use crate::{
  error::AdapterError,
  model::{
    Attribute, ContainerInstanceRecord, ContainerInstancesPage,
    InstanceState, StateChangeFailure, TaskSummary,
  },
};

/// Production [`ClusterScheduler`] backed by the ECS client, bound to
/// one cluster for its whole lifetime.
pub struct EcsScheduler {
  client: aws_sdk_ecs::Client,
  cluster: String,
  backoff: BackoffPolicy,
}

impl EcsScheduler {
  pub fn new(client: aws_sdk_ecs::Client, cluster: String) -> Self {
    Self { client, cluster, backoff: BackoffPolicy::default() }
  }

  pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
    self.backoff = backoff;
    self
  }
}

#[async_trait]
impl ClusterScheduler for EcsScheduler {
  async fn list_container_instances_page(
    &self,
    status: &str,
    next_token: Option<String>,
  ) -> Result<ContainerInstancesPage, AdapterError> {
    let output = self
      .client
      .list_container_instances()
      .cluster(&self.cluster)
      .status(ContainerInstanceStatus::from(status))
      .set_next_token(next_token)
      .send()
      .await
      .map_err(|e| {
        AdapterError::transport("list container instances", e)
      })?;
    Ok(ContainerInstancesPage {
      container_instance_arns: output
        .container_instance_arns
        .unwrap_or_default(),
      next_token: output.next_token,
    })
  }

  async fn describe_container_instances(
    &self,
    ids: &[String],
  ) -> Result<Vec<ContainerInstanceRecord>, AdapterError> {
    let output = self
      .client
      .describe_container_instances()
      .cluster(&self.cluster)
      .set_container_instances(Some(ids.to_vec()))
      .send()
      .await
      .map_err(|e| {
        AdapterError::transport("describe container instances", e)
      })?;
    Ok(
      output
        .container_instances
        .unwrap_or_default()
        .into_iter()
        .map(|ci| ContainerInstanceRecord {
          container_instance_id: ci
            .container_instance_arn
            .unwrap_or_default(),
          ec2_instance_id: ci.ec2_instance_id.unwrap_or_default(),
          attributes: ci
            .attributes
            .unwrap_or_default()
            .into_iter()
            .map(|a| Attribute {
              name: a.name,
              value: a.value,
            })
            .collect(),
        })
        .collect(),
    )
  }

  async fn list_tasks(
    &self,
    container_instance_id: &str,
  ) -> Result<Vec<String>, AdapterError> {
    let output = self
      .client
      .list_tasks()
      .cluster(&self.cluster)
      .container_instance(container_instance_id)
      .send()
      .await
      .map_err(|e| AdapterError::transport("list tasks", e))?;
    Ok(output.task_arns.unwrap_or_default())
  }

  async fn describe_tasks(
    &self,
    task_arns: &[String],
  ) -> Result<Vec<TaskSummary>, AdapterError> {
    if task_arns.is_empty() {
      return Ok(Vec::new());
    }
    let output = self
      .client
      .describe_tasks()
      .cluster(&self.cluster)
      .set_tasks(Some(task_arns.to_vec()))
      .send()
      .await
      .map_err(|e| AdapterError::transport("describe tasks", e))?;
    Ok(
      output
        .tasks
        .unwrap_or_default()
        .into_iter()
        .map(|t| TaskSummary {
          task_arn: t.task_arn.unwrap_or_default(),
          started_by: t.started_by,
          last_status: t.last_status,
        })
        .collect(),
    )
  }

  async fn update_container_instances_state(
    &self,
    ids: &[String],
    state: InstanceState,
  ) -> Result<Vec<StateChangeFailure>, AdapterError> {
    let output = self
      .client
      .update_container_instances_state()
      .cluster(&self.cluster)
      .set_container_instances(Some(ids.to_vec()))
      .status(ContainerInstanceStatus::from(state.as_str()))
      .send()
      .await
      .map_err(|e| {
        AdapterError::transport(
          format!("update container instances state to {}", state.as_str()),
          e,
        )
      })?;
    Ok(
      output
        .failures
        .unwrap_or_default()
        .into_iter()
        .map(|f| StateChangeFailure { arn: f.arn, reason: f.reason })
        .collect(),
    )
  }

  async fn wait_until_tasks_stopped(
    &self,
    task_arns: &[String],
  ) -> Result<(), AdapterError> {
    if task_arns.is_empty() {
      return Ok(());
    }
    for attempt in 0..self.backoff.max_attempts {
      let tasks = self.describe_tasks(task_arns).await?;
      if tasks.iter().all(TaskSummary::is_stopped) {
        return Ok(());
      }
      tokio::time::sleep(self.backoff.delay_for(attempt)).await;
    }
    Err(AdapterError::exhausted("wait until tasks stopped"))
  }
}
