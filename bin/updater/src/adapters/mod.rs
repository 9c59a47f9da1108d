//! Adapter contracts (§4.1, §6a).
//!
//! Each trait is the minimal operation set the core calls against one
//! external service. Production wiring binds these to one vendor
//! family's clients (`ecs.rs`, `ssm.rs`, `ec2.rs`); table-driven tests
//! bind them to in-memory fakes instead. The core never imports a
//! vendor SDK type directly — only these traits and the plain structs
//! in `crate::model`.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::{
  error::AdapterError,
  model::{
    CommandInvocationOutput, ContainerInstanceRecord,
    ContainerInstancesPage, InstanceState, StateChangeFailure,
    TaskSummary,
  },
};

pub mod ec2;
pub mod ecs;
pub mod ssm;

/// Bounded exponential backoff shared by every production adapter's
/// polling waits. Exhaustion after these retries surfaces as
/// [`AdapterError::Exhausted`], never as an unbounded hang (§5).
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
  pub max_attempts: u32,
  pub base_delay: Duration,
}

impl Default for BackoffPolicy {
  fn default() -> Self {
    Self { max_attempts: 20, base_delay: Duration::from_secs(6) }
  }
}

impl BackoffPolicy {
  /// Exponential delay for `attempt`, capped at a 64x multiplier,
  /// plus up to 25% jitter to avoid every waiter in a fan-out
  /// re-polling in lockstep.
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let base = self.base_delay.saturating_mul(1 << attempt.min(6));
    let jitter_bound = (base.as_millis() as u64 / 4).max(1);
    let jitter_ms = rand::rng().random_range(0..jitter_bound);
    base + Duration::from_millis(jitter_ms)
  }
}

/// The cluster scheduler surface (§4.1): list/describe/update
/// container instances, list/describe tasks, wait for tasks to stop.
/// Bound to one cluster at construction time.
#[async_trait]
pub trait ClusterScheduler: Send + Sync {
  /// One page of the `status`-filtered container instance list.
  /// `next_token` is `None` for the first page.
  async fn list_container_instances_page(
    &self,
    status: &str,
    next_token: Option<String>,
  ) -> Result<ContainerInstancesPage, AdapterError>;

  /// Describes at most [`crate::model::DESCRIBE_BATCH_SIZE`]
  /// container instances in one call.
  async fn describe_container_instances(
    &self,
    ids: &[String],
  ) -> Result<Vec<ContainerInstanceRecord>, AdapterError>;

  /// Lists the ARNs of tasks currently running on a container
  /// instance.
  async fn list_tasks(
    &self,
    container_instance_id: &str,
  ) -> Result<Vec<String>, AdapterError>;

  /// Describes a batch of tasks by ARN.
  async fn describe_tasks(
    &self,
    task_arns: &[String],
  ) -> Result<Vec<TaskSummary>, AdapterError>;

  /// Transitions a set of container instances to `state`. A
  /// transport-level failure is an `Err`; per-instance failures on an
  /// otherwise successful round trip come back as a non-empty `Ok`
  /// vec (the "logical failure" case, §7).
  async fn update_container_instances_state(
    &self,
    ids: &[String],
    state: InstanceState,
  ) -> Result<Vec<StateChangeFailure>, AdapterError>;

  /// Blocks (via bounded polling) until every task in `task_arns` has
  /// stopped.
  async fn wait_until_tasks_stopped(
    &self,
    task_arns: &[String],
  ) -> Result<(), AdapterError>;
}

/// The remote-command surface (§4.1): send a command document to a
/// set of nodes, wait for a specific node's invocation to complete,
/// fetch that invocation's output.
#[async_trait]
pub trait RemoteCommand: Send + Sync {
  /// Sends `document` to every id in `instance_ids` as one command,
  /// returning the command handle used by the other two methods.
  async fn send_command(
    &self,
    document: &str,
    instance_ids: &[String],
  ) -> Result<String, AdapterError>;

  /// Blocks (via bounded polling) until `instance_id`'s invocation of
  /// `command_id` reaches a terminal state.
  async fn wait_until_command_executed(
    &self,
    command_id: &str,
    instance_id: &str,
  ) -> Result<(), AdapterError>;

  /// Fetches the result of `instance_id`'s invocation of
  /// `command_id`.
  async fn get_command_invocation(
    &self,
    command_id: &str,
    instance_id: &str,
  ) -> Result<CommandInvocationOutput, AdapterError>;
}

/// The node-status surface (§4.1): wait for instances to report
/// healthy after a reboot.
#[async_trait]
pub trait NodeStatus: Send + Sync {
  async fn wait_until_instance_status_ok(
    &self,
    instance_ids: &[String],
  ) -> Result<(), AdapterError>;
}
