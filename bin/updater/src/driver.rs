//! Per-node update driver (§4.6): check → apply/reboot as needed →
//! wait healthy → verify. The driver knows nothing about drain state;
//! undraining on exit is the caller's responsibility.

use std::sync::Arc;

use crate::{
  adapters::{NodeStatus, RemoteCommand},
  error::DriverError,
  model::{KnownUpdateState, Node, UpdateStateReport},
  waiter::send_command_fanout,
};

/// The three command documents a driver run needs, fixed for the
/// whole fleet run.
#[derive(Debug, Clone)]
pub struct CommandDocuments {
  pub check: String,
  pub apply: String,
  pub reboot: String,
}

/// Result of a completed driver run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
  /// The node reported `Idle` on the initial check: nothing to apply,
  /// nothing to reboot, no verify check run. Distinct from `Updated`
  /// so the sequencer never warns about a node that had no work to do.
  NoUpdateNeeded,
  /// An update was applied (or a staged update rebooted) and the
  /// post-reboot state was checked.
  Updated {
    /// `true` iff the post-reboot version differs from the version
    /// the node reported at classification time.
    verified: bool,
    /// `updateState` as reported by the verify check. An `Available`
    /// value here means a further update is already staged — the open
    /// question in §9 is preserved as current (no-loop) behavior, but
    /// callers can use this to tell a plain "updated" outcome apart
    /// from "updated, another update is now available".
    post_update_state: String,
  },
}

/// Drives `node` through one update cycle.
pub async fn run_update(
  remote: Arc<dyn RemoteCommand>,
  node_status: Arc<dyn NodeStatus>,
  node: &Node,
  documents: &CommandDocuments,
) -> Result<UpdateOutcome, DriverError> {
  let report = check(&remote, node, &documents.check).await?;
  let state = match KnownUpdateState::parse(&report.update_state) {
    Some(KnownUpdateState::Idle) => return Ok(UpdateOutcome::NoUpdateNeeded),
    Some(state) => state,
    None => {
      return Err(DriverError::UnexpectedState {
        state: report.update_state,
      });
    }
  };

  let pre_update_version = report.active_partition.image.version.clone();

  match state {
    KnownUpdateState::Available => {
      send_command_fanout(
        Arc::clone(&remote),
        &documents.apply,
        &[node.node_id.clone()],
      )
      .await?;
      send_command_fanout(
        Arc::clone(&remote),
        &documents.reboot,
        &[node.node_id.clone()],
      )
      .await?;
    }
    KnownUpdateState::Ready => {
      send_command_fanout(
        Arc::clone(&remote),
        &documents.reboot,
        &[node.node_id.clone()],
      )
      .await?;
    }
    KnownUpdateState::Idle => unreachable!("handled above"),
  }

  node_status
    .wait_until_instance_status_ok(&[node.node_id.clone()])
    .await
    .map_err(DriverError::WaitHealthy)?;

  let verify_report = check(&remote, node, &documents.check).await?;
  let verified =
    pre_update_version != verify_report.active_partition.image.version;

  Ok(UpdateOutcome::Updated {
    verified,
    post_update_state: verify_report.update_state,
  })
}

async fn check(
  remote: &Arc<dyn RemoteCommand>,
  node: &Node,
  document: &str,
) -> Result<UpdateStateReport, DriverError> {
  let command_id = send_command_fanout(
    Arc::clone(remote),
    document,
    &[node.node_id.clone()],
  )
  .await?;

  let output = remote
    .get_command_invocation(&command_id, &node.node_id)
    .await
    .map_err(|source| DriverError::GetInvocation {
      command_id: command_id.clone(),
      instance_id: node.node_id.clone(),
      source,
    })?;

  if output.response_code != 0 {
    return Err(DriverError::NonZeroResponseCode {
      command_id,
      instance_id: node.node_id.clone(),
      response_code: output.response_code,
    });
  }

  serde_json::from_str(&output.standard_output).map_err(|source| {
    DriverError::Parse { raw: output.standard_output, source }
  })
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;

  use super::*;
  use crate::{error::AdapterError, model::CommandInvocationOutput};

  fn report_json(state: &str, version: &str) -> String {
    format!(
      "{{\"update_state\":\"{state}\",\"active_partition\":{{\"image\":{{\"version\":\"{version}\"}}}}}}"
    )
  }

  struct FakeRemote {
    check_responses: std::sync::Mutex<Vec<String>>,
    response_code: i32,
  }

  impl FakeRemote {
    fn new(check_responses: Vec<String>) -> Self {
      Self {
        check_responses: std::sync::Mutex::new(check_responses),
        response_code: 0,
      }
    }

    fn with_response_code(mut self, response_code: i32) -> Self {
      self.response_code = response_code;
      self
    }
  }

  #[async_trait]
  impl RemoteCommand for FakeRemote {
    async fn send_command(
      &self,
      _document: &str,
      _instance_ids: &[String],
    ) -> Result<String, AdapterError> {
      Ok("cmd-1".to_string())
    }

    async fn wait_until_command_executed(
      &self,
      _command_id: &str,
      _instance_id: &str,
    ) -> Result<(), AdapterError> {
      Ok(())
    }

    async fn get_command_invocation(
      &self,
      _command_id: &str,
      _instance_id: &str,
    ) -> Result<CommandInvocationOutput, AdapterError> {
      let mut responses = self.check_responses.lock().unwrap();
      let standard_output = if responses.len() > 1 {
        responses.remove(0)
      } else {
        responses[0].clone()
      };
      Ok(CommandInvocationOutput {
        response_code: self.response_code,
        standard_output,
      })
    }
  }

  struct FakeNodeStatus;

  #[async_trait]
  impl NodeStatus for FakeNodeStatus {
    async fn wait_until_instance_status_ok(
      &self,
      _instance_ids: &[String],
    ) -> Result<(), AdapterError> {
      Ok(())
    }
  }

  fn node(current_version: &str) -> Node {
    Node {
      node_id: "i-0".into(),
      container_instance_id: "ci-0".into(),
      current_version: Some(current_version.to_string()),
    }
  }

  fn documents() -> CommandDocuments {
    CommandDocuments {
      check: "check-doc".into(),
      apply: "apply-doc".into(),
      reboot: "reboot-doc".into(),
    }
  }

  #[tokio::test]
  async fn idle_state_is_a_no_op_success() {
    let remote =
      Arc::new(FakeRemote::new(vec![report_json("Idle", "1.2.3")]));
    let outcome = run_update(
      remote,
      Arc::new(FakeNodeStatus),
      &node("1.2.3"),
      &documents(),
    )
    .await
    .unwrap();
    assert_eq!(outcome, UpdateOutcome::NoUpdateNeeded);
  }

  #[tokio::test]
  async fn available_state_reboots_and_verifies_version_change() {
    let remote = Arc::new(FakeRemote::new(vec![
      report_json("Available", "1.2.3"),
      report_json("Idle", "1.3.0"),
    ]));
    let outcome = run_update(
      remote,
      Arc::new(FakeNodeStatus),
      &node("1.2.3"),
      &documents(),
    )
    .await
    .unwrap();
    assert!(matches!(outcome, UpdateOutcome::Updated { verified: true, .. }));
  }

  #[tokio::test]
  async fn unexpected_state_fails_without_reboot() {
    let remote =
      Arc::new(FakeRemote::new(vec![report_json("Staged", "1.2.3")]));
    let err = run_update(
      remote,
      Arc::new(FakeNodeStatus),
      &node("1.2.3"),
      &documents(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DriverError::UnexpectedState { .. }));
  }

  #[tokio::test]
  async fn unparseable_output_fails_with_parse_error() {
    let remote = Arc::new(FakeRemote::new(vec!["not json".into()]));
    let err = run_update(
      remote,
      Arc::new(FakeNodeStatus),
      &node("1.2.3"),
      &documents(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DriverError::Parse { .. }));
  }

  #[tokio::test]
  async fn nonzero_response_code_fails_before_parsing() {
    let remote = Arc::new(
      FakeRemote::new(vec![report_json("Idle", "1.2.3")])
        .with_response_code(1),
    );
    let err = run_update(
      remote,
      Arc::new(FakeNodeStatus),
      &node("1.2.3"),
      &documents(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DriverError::NonZeroResponseCode { .. }));
  }
}
