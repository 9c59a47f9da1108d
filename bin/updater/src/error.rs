use thiserror::Error;

/// Error surface shared by all three adapters (§4.1, §7).
///
/// Production adapters wrap whatever the vendor SDK returned into one
/// of these variants so the core can match on the discriminant
/// instead of parsing message strings.
#[derive(Debug, Error)]
pub enum AdapterError {
  /// The underlying call itself failed (network, auth, throttling,
  /// vendor-side 5xx, ...). `context` names the operation attempted;
  /// the vendor error is preserved as `source`.
  #[error("{context}: {source:#}")]
  Transport {
    context: String,
    #[source]
    source: anyhow::Error,
  },

  /// The call completed but the response carries one or more
  /// per-resource failures (e.g. ECS `Failures[]` on a state-change
  /// call).
  #[error("{context}: {}", .reasons.join("; "))]
  Logical { context: String, reasons: Vec<String> },

  /// A bounded wait (task-stopped, command-executed,
  /// instance-status-ok) exceeded its maximum attempt count.
  #[error("{context}: exceeded max attempts")]
  Exhausted { context: String },
}

impl AdapterError {
  pub fn transport(
    context: impl Into<String>,
    source: impl Into<anyhow::Error>,
  ) -> Self {
    Self::Transport { context: context.into(), source: source.into() }
  }

  pub fn logical(
    context: impl Into<String>,
    reasons: Vec<String>,
  ) -> Self {
    Self::Logical { context: context.into(), reasons }
  }

  pub fn exhausted(context: impl Into<String>) -> Self {
    Self::Exhausted { context: context.into() }
  }

  /// True for the waiter-exhaustion kind specifically; used by the
  /// fan-out waiter and the driver to decide whether a failure is
  /// "just" exhaustion versus something worse.
  pub fn is_exhausted(&self) -> bool {
    matches!(self, AdapterError::Exhausted { .. })
  }
}

/// Errors from the node classifier (§4.2).
#[derive(Debug, Error)]
pub enum ClassifierError {
  #[error("failed to describe any container instances")]
  AllBatchesFailed,
}

/// Errors from the paginated lister (§4.3).
#[derive(Debug, Error)]
pub enum ListError {
  #[error("failed to list container instances: {0}")]
  Failed(#[source] AdapterError),
}

/// Errors from eligibility evaluation (§4.4).
#[derive(Debug, Error)]
pub enum EligibilityError {
  #[error("failed to list tasks for container instance {container_instance_id}: {source}")]
  ListTasks {
    container_instance_id: String,
    #[source]
    source: AdapterError,
  },
  #[error("failed to describe tasks for container instance {container_instance_id}: {source}")]
  DescribeTasks {
    container_instance_id: String,
    #[source]
    source: AdapterError,
  },
}

/// Errors from drain/undrain (§4.4).
#[derive(Debug, Error)]
pub enum DrainError {
  #[error("failed to drain container instance {container_instance_id}: {source}")]
  StateChange {
    container_instance_id: String,
    #[source]
    source: AdapterError,
  },
  #[error(
    "failed to drain container instance {container_instance_id}: {source}"
  )]
  ListTasks {
    container_instance_id: String,
    #[source]
    source: AdapterError,
  },
  #[error(
    "failed to drain container instance {container_instance_id}: {source}"
  )]
  WaitTasksStopped {
    container_instance_id: String,
    #[source]
    source: AdapterError,
  },
}

/// Errors from the fan-out command waiter (§4.5).
#[derive(Debug, Error)]
pub enum SendCommandError {
  #[error("send command failed: {0}")]
  Send(#[source] AdapterError),
  #[error(
    "too many failures while awaiting document execution: {0}"
  )]
  TooManyFailures(#[source] AdapterError),
}

/// Errors from the per-node update driver (§4.6).
#[derive(Debug, Error)]
pub enum DriverError {
  #[error(transparent)]
  SendCommand(#[from] SendCommandError),

  #[error("failed to get command invocation output for command {command_id} on instance {instance_id}: {source}")]
  GetInvocation {
    command_id: String,
    instance_id: String,
    #[source]
    source: AdapterError,
  },

  #[error(
    "failed to parse command output {raw:?}, manual verification required"
  )]
  Parse { raw: String, source: serde_json::Error },

  #[error("command {command_id} on instance {instance_id} exited with response code {response_code}, manual verification required")]
  NonZeroResponseCode {
    command_id: String,
    instance_id: String,
    response_code: i32,
  },

  #[error("unexpected update state {state:?}; skipping instance")]
  UnexpectedState { state: String },

  #[error("failed waiting for instance status ok: {0}")]
  WaitHealthy(#[source] AdapterError),
}
