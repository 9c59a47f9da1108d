use serde::Deserialize;

/// Attribute name whose presence (value ignored) marks a container
/// instance as running the Bottlerocket OS variant.
pub const BOTTLEROCKET_VARIANT_ATTRIBUTE: &str = "bottlerocket.variant";

/// `StartedBy` prefix used by the cluster scheduler's service
/// controller. Any task without this prefix is a standalone task.
pub const SERVICE_STARTED_BY_PREFIX: &str = "ecs-svc";

/// Describe-call batch size: identifier lists are chunked to at most
/// this many entries per request.
pub const DESCRIBE_BATCH_SIZE: usize = 100;

/// A node discovered by the classifier: a container instance running
/// the target OS variant, paired with its compute-substrate identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
  pub node_id: String,
  pub container_instance_id: String,
  pub current_version: Option<String>,
}

/// Attribute on a container-instance describe-record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
  pub name: String,
  pub value: Option<String>,
}

/// A single container-instance describe-record, as returned by the
/// cluster scheduler's batched describe call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInstanceRecord {
  pub container_instance_id: String,
  pub ec2_instance_id: String,
  pub attributes: Vec<Attribute>,
}

impl ContainerInstanceRecord {
  pub fn has_variant_marker(&self) -> bool {
    self
      .attributes
      .iter()
      .any(|a| a.name == BOTTLEROCKET_VARIANT_ATTRIBUTE)
  }
}

/// A single task summary, as returned by the cluster scheduler's
/// batched describe-tasks call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
  pub task_arn: String,
  pub started_by: Option<String>,
  pub last_status: Option<String>,
}

impl TaskSummary {
  pub fn started_by_service(&self) -> bool {
    self
      .started_by
      .as_deref()
      .is_some_and(|by| by.starts_with(SERVICE_STARTED_BY_PREFIX))
  }

  pub fn is_stopped(&self) -> bool {
    self.last_status.as_deref() == Some("STOPPED")
  }
}

/// The target state of an `updateContainerInstancesState` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
  Draining,
  Active,
}

impl InstanceState {
  pub fn as_str(&self) -> &'static str {
    match self {
      InstanceState::Draining => "DRAINING",
      InstanceState::Active => "ACTIVE",
    }
  }
}

/// One reported failure from a state-change call that otherwise
/// completed the round trip (a "logical" failure, per the error
/// taxonomy).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChangeFailure {
  pub arn: Option<String>,
  pub reason: Option<String>,
}

/// One page of a paginated `listContainerInstances` call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerInstancesPage {
  pub container_instance_arns: Vec<String>,
  pub next_token: Option<String>,
}

/// Output of a single `getCommandInvocation` call.
///
/// `status` is deliberately not carried here: `wait_until_command_executed`
/// already resolves that same invocation's terminal status before the
/// driver ever fetches its output, so the only signal left worth
/// reading is whether the check script itself exited cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocationOutput {
  pub response_code: i32,
  pub standard_output: String,
}

/// The node-reported update-state payload, parsed from the stdout of
/// a `check` command invocation.
///
/// Only the fields named in the wire contract are read; anything else
/// present in the JSON is ignored by `#[serde(default)]`-free strict
/// parsing of exactly these two paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateStateReport {
  pub update_state: String,
  pub active_partition: ActivePartition,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivePartition {
  pub image: ImageInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageInfo {
  pub version: String,
}

/// The update-state values with defined transitions in the update
/// driver (§4.6). Any other value reported by a node is a terminal
/// skip for that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownUpdateState {
  Idle,
  Available,
  Ready,
}

impl KnownUpdateState {
  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "Idle" => Some(Self::Idle),
      "Available" => Some(Self::Available),
      "Ready" => Some(Self::Ready),
      _ => None,
    }
  }

  /// The wire string this variant is reported as. Inverse of
  /// [`KnownUpdateState::parse`].
  pub fn as_report_str(&self) -> &'static str {
    match self {
      Self::Idle => "Idle",
      Self::Available => "Available",
      Self::Ready => "Ready",
    }
  }
}
