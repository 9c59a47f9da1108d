use async_trait::async_trait;
use aws_sdk_ec2::types::SummaryStatus;

use super::{BackoffPolicy, NodeStatus};
use crate::error::AdapterError;

/// Production [`NodeStatus`] backed by the EC2 client.
pub struct Ec2NodeStatus {
  client: aws_sdk_ec2::Client,
  backoff: BackoffPolicy,
}

impl Ec2NodeStatus {
  pub fn new(client: aws_sdk_ec2::Client) -> Self {
    Self { client, backoff: BackoffPolicy::default() }
  }

  pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
    self.backoff = backoff;
    self
  }
}

#[async_trait]
impl NodeStatus for Ec2NodeStatus {
  async fn wait_until_instance_status_ok(
    &self,
    instance_ids: &[String],
  ) -> Result<(), AdapterError> {
    if instance_ids.is_empty() {
      return Ok(());
    }
    for attempt in 0..self.backoff.max_attempts {
      let output = self
        .client
        .describe_instance_status()
        .set_instance_ids(Some(instance_ids.to_vec()))
        .send()
        .await
        .map_err(|e| {
          AdapterError::transport(
            "wait until instance status ok",
            e,
          )
        })?;
      let statuses = output.instance_statuses.unwrap_or_default();
      let all_ok = statuses.len() == instance_ids.len()
        && statuses.iter().all(|s| {
          s.instance_status
            .as_ref()
            .and_then(|s| s.status.as_ref())
            == Some(&SummaryStatus::Ok)
        });
      if all_ok {
        return Ok(());
      }
      tokio::time::sleep(self.backoff.delay_for(attempt)).await;
    }
    Err(AdapterError::exhausted("wait until instance status ok"))
  }
}
