use async_trait::async_trait;
use aws_sdk_ssm::types::CommandInvocationStatus;

use super::{BackoffPolicy, RemoteCommand};
use crate::{error::AdapterError, model::CommandInvocationOutput};

/// Production [`RemoteCommand`] backed by the SSM client.
pub struct SsmCommand {
  client: aws_sdk_ssm::Client,
  backoff: BackoffPolicy,
}

impl SsmCommand {
  pub fn new(client: aws_sdk_ssm::Client) -> Self {
    Self { client, backoff: BackoffPolicy::default() }
  }

  pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
    self.backoff = backoff;
    self
  }
}

#[async_trait]
impl RemoteCommand for SsmCommand {
  async fn send_command(
    &self,
    document: &str,
    instance_ids: &[String],
  ) -> Result<String, AdapterError> {
    let output = self
      .client
      .send_command()
      .document_name(document)
      .set_instance_ids(Some(instance_ids.to_vec()))
      .send()
      .await
      .map_err(|e| AdapterError::transport("send command", e))?;
    output
      .command
      .and_then(|c| c.command_id)
      .ok_or_else(|| {
        AdapterError::transport(
          "send command",
          anyhow::anyhow!("response carried no command id"),
        )
      })
  }

  async fn wait_until_command_executed(
    &self,
    command_id: &str,
    instance_id: &str,
  ) -> Result<(), AdapterError> {
    for attempt in 0..self.backoff.max_attempts {
      let output = self
        .client
        .get_command_invocation()
        .command_id(command_id)
        .instance_id(instance_id)
        .send()
        .await
        .map_err(|e| {
          AdapterError::transport("wait until command executed", e)
        })?;
      match output.status {
        Some(CommandInvocationStatus::Success) => return Ok(()),
        Some(
          status @ (CommandInvocationStatus::Cancelled
          | CommandInvocationStatus::TimedOut
          | CommandInvocationStatus::Failed
          | CommandInvocationStatus::Cancelling),
        ) => {
          return Err(AdapterError::transport(
            "wait until command executed",
            anyhow::anyhow!(
              "invocation on {instance_id} ended in status {status:?}"
            ),
          ));
        }
        _ => {
          tokio::time::sleep(self.backoff.delay_for(attempt)).await;
        }
      }
    }
    Err(AdapterError::exhausted("wait until command executed"))
  }

  async fn get_command_invocation(
    &self,
    command_id: &str,
    instance_id: &str,
  ) -> Result<CommandInvocationOutput, AdapterError> {
    let output = self
      .client
      .get_command_invocation()
      .command_id(command_id)
      .instance_id(instance_id)
      .send()
      .await
      .map_err(|e| {
        AdapterError::transport("get command invocation", e)
      })?;
    Ok(CommandInvocationOutput {
      response_code: output.response_code.unwrap_or_default(),
      standard_output: output
        .standard_output_content
        .unwrap_or_default(),
    })
  }
}
