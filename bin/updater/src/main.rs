mod adapters;
mod classifier;
mod config;
mod drain;
mod driver;
mod eligibility;
mod error;
mod model;
mod orchestrator;
mod pagination;
mod waiter;

use std::sync::{Arc, atomic::AtomicBool, atomic::Ordering};

use adapters::{ec2::Ec2NodeStatus, ecs::EcsScheduler, ssm::SsmCommand};
use anyhow::Context;
use clap::Parser;
use config::{CliArgs, Config};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let args = CliArgs::parse();
  let config = Config::load(args).context("failed to load configuration")?;

  logger::init(&logger::LogConfig {
    level: config.log_level,
    stdio: config.log_stdio,
    ansi: config.log_ansi,
  })
  .context("failed to init logger")?;

  info!(cluster = %config.cluster, "starting update run");

  let mut sdk_config_loader = aws_config::defaults(
    aws_config::BehaviorVersion::latest(),
  );
  if let Some(region) = &config.region {
    sdk_config_loader =
      sdk_config_loader.region(aws_config::Region::new(region.clone()));
  }
  let sdk_config = sdk_config_loader.load().await;

  let scheduler: Arc<dyn adapters::ClusterScheduler> = Arc::new(
    EcsScheduler::new(
      aws_sdk_ecs::Client::new(&sdk_config),
      config.cluster.clone(),
    ),
  );
  let remote: Arc<dyn adapters::RemoteCommand> =
    Arc::new(SsmCommand::new(aws_sdk_ssm::Client::new(&sdk_config)));
  let node_status: Arc<dyn adapters::NodeStatus> =
    Arc::new(Ec2NodeStatus::new(aws_sdk_ec2::Client::new(&sdk_config)));

  let cancelled = Arc::new(AtomicBool::new(false));
  {
    let cancelled = Arc::clone(&cancelled);
    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        cancelled.store(true, Ordering::Relaxed);
      }
    });
  }

  match orchestrator::run(
    &config,
    scheduler,
    remote,
    node_status,
    cancelled,
  )
  .await
  {
    Ok(()) => {
      info!("update run complete");
      Ok(())
    }
    Err(e) => {
      error!(error = %e, "update run aborted before processing any nodes");
      Err(e.into())
    }
  }
}
