//! Fan-out command waiter (§4.5). Sends one command document to a set
//! of nodes, then waits for each node's invocation independently and
//! concurrently, succeeding as soon as any one of them reports
//! success.

use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::warn;

use crate::{adapters::RemoteCommand, error::SendCommandError};

/// Sends `document` to `instance_ids` as a single command and waits
/// for it to execute. Returns the command id once **at least one**
/// instance's invocation succeeds; returns the last observed waiter
/// error, wrapped, once **all** of them have failed.
pub async fn send_command_fanout(
  remote: Arc<dyn RemoteCommand>,
  document: &str,
  instance_ids: &[String],
) -> Result<String, SendCommandError> {
  let command_id = remote
    .send_command(document, instance_ids)
    .await
    .map_err(SendCommandError::Send)?;

  let mut waiters: FuturesUnordered<_> = instance_ids
    .iter()
    .map(|instance_id| {
      let remote = Arc::clone(&remote);
      let command_id = command_id.clone();
      let instance_id = instance_id.clone();
      tokio::spawn(async move {
        remote
          .wait_until_command_executed(&command_id, &instance_id)
          .await
          .map_err(|source| (instance_id, source))
      })
    })
    .collect();

  let mut last_error = None;
  while let Some(joined) = waiters.next().await {
    match joined {
      Ok(Ok(())) => return Ok(command_id),
      Ok(Err((instance_id, source))) => {
        warn!(
          instance_id,
          command_id,
          error = %source,
          "waiter failed for instance"
        );
        last_error = Some(source);
      }
      Err(join_err) => {
        warn!(command_id, error = %join_err, "waiter task panicked");
      }
    }
  }

  let last_error = last_error.unwrap_or_else(|| {
    crate::error::AdapterError::exhausted(
      "fan-out command waiter had no waiters to run",
    )
  });
  Err(SendCommandError::TooManyFailures(last_error))
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;

  use super::*;
  use crate::{error::AdapterError, model::CommandInvocationOutput};

  struct FakeRemote {
    command_id: &'static str,
    fail_instances: Vec<&'static str>,
  }

  #[async_trait]
  impl RemoteCommand for FakeRemote {
    async fn send_command(
      &self,
      _document: &str,
      _instance_ids: &[String],
    ) -> Result<String, AdapterError> {
      Ok(self.command_id.to_string())
    }

    async fn wait_until_command_executed(
      &self,
      _command_id: &str,
      instance_id: &str,
    ) -> Result<(), AdapterError> {
      if self.fail_instances.contains(&instance_id) {
        Err(AdapterError::exhausted("wait until command executed"))
      } else {
        Ok(())
      }
    }

    async fn get_command_invocation(
      &self,
      _command_id: &str,
      _instance_id: &str,
    ) -> Result<CommandInvocationOutput, AdapterError> {
      unreachable!()
    }
  }

  #[tokio::test]
  async fn one_success_among_many_failures_is_overall_success() {
    let remote: Arc<dyn RemoteCommand> = Arc::new(FakeRemote {
      command_id: "cmd-1",
      fail_instances: vec!["i-1", "i-2"],
    });
    let ids =
      vec!["i-1".to_string(), "i-2".to_string(), "i-3".to_string()];
    let command_id =
      send_command_fanout(remote, "check", &ids).await.unwrap();
    assert_eq!(command_id, "cmd-1");
  }

  #[tokio::test]
  async fn all_failures_is_overall_failure() {
    let remote: Arc<dyn RemoteCommand> = Arc::new(FakeRemote {
      command_id: "cmd-1",
      fail_instances: vec!["i-1", "i-2"],
    });
    let ids = vec!["i-1".to_string(), "i-2".to_string()];
    let err = send_command_fanout(remote, "check", &ids)
      .await
      .unwrap_err();
    assert!(matches!(err, SendCommandError::TooManyFailures(_)));
  }
}
