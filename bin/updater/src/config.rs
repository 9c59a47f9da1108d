//! Configuration (§6b). CLI flags take precedence over environment
//! variables, which themselves may be populated from a `.env` file.
//! There is no config-file layer here — the run is fully described by
//! one cluster name, three command documents, and a handful of
//! tuning knobs.

use clap::Parser;
use logger::{LogLevel, StdioLogMode};
use serde::Deserialize;

use crate::model::DESCRIBE_BATCH_SIZE;

#[derive(Debug, Parser)]
#[command(
  name = "ecs-updater",
  about = "Orchestrates in-place Bottlerocket OS updates across an ECS cluster"
)]
pub struct CliArgs {
  /// Name of the ECS cluster to operate on.
  #[arg(long)]
  pub cluster: Option<String>,

  /// SSM document name for the check step.
  #[arg(long)]
  pub check_document: Option<String>,

  /// SSM document name for the apply step.
  #[arg(long)]
  pub apply_document: Option<String>,

  /// SSM document name for the reboot step.
  #[arg(long)]
  pub reboot_document: Option<String>,

  /// AWS region override; defaults to the ambient SDK resolution
  /// chain when absent.
  #[arg(long)]
  pub region: Option<String>,

  /// Maximum container instances described per batched call.
  #[arg(long)]
  pub batch_size: Option<usize>,

  /// Reserved for a future bounded-concurrency mode; the sequencer
  /// is strictly sequential regardless of this value today.
  #[arg(long)]
  pub max_concurrent_nodes: Option<usize>,

  #[arg(long)]
  pub log_level: Option<LogLevel>,

  #[arg(long)]
  pub log_stdio: Option<StdioLogMode>,

  #[arg(long)]
  pub log_ansi: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct Env {
  updater_cluster: Option<String>,
  updater_check_document: Option<String>,
  updater_apply_document: Option<String>,
  updater_reboot_document: Option<String>,
  updater_region: Option<String>,
  updater_batch_size: Option<usize>,
  updater_max_concurrent_nodes: Option<usize>,
  updater_log_level: Option<LogLevel>,
  updater_log_stdio: Option<StdioLogMode>,
  updater_log_ansi: Option<bool>,
}

/// Fully resolved run configuration, merged from CLI flags over
/// environment variables over hardcoded defaults.
#[derive(Debug, Clone)]
pub struct Config {
  pub cluster: String,
  pub check_document: String,
  pub apply_document: String,
  pub reboot_document: String,
  pub region: Option<String>,
  pub batch_size: usize,
  pub max_concurrent_nodes: usize,
  pub log_level: LogLevel,
  pub log_stdio: StdioLogMode,
  pub log_ansi: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to parse environment: {0}")]
  Env(#[from] envy::Error),
  #[error("missing required configuration value: {0}")]
  Missing(&'static str),
}

impl Config {
  /// Loads a `.env` file if present (missing is not an error), then
  /// merges CLI args over environment variables.
  pub fn load(args: CliArgs) -> Result<Self, ConfigError> {
    let _ = dotenvy::dotenv();
    let env: Env = envy::from_env()?;

    let cluster = args
      .cluster
      .or(env.updater_cluster)
      .ok_or(ConfigError::Missing("cluster"))?;
    let check_document = args
      .check_document
      .or(env.updater_check_document)
      .ok_or(ConfigError::Missing("check_document"))?;
    let apply_document = args
      .apply_document
      .or(env.updater_apply_document)
      .ok_or(ConfigError::Missing("apply_document"))?;
    let reboot_document = args
      .reboot_document
      .or(env.updater_reboot_document)
      .ok_or(ConfigError::Missing("reboot_document"))?;

    Ok(Config {
      cluster,
      check_document,
      apply_document,
      reboot_document,
      region: args.region.or(env.updater_region),
      batch_size: args
        .batch_size
        .or(env.updater_batch_size)
        .unwrap_or(DESCRIBE_BATCH_SIZE),
      max_concurrent_nodes: args
        .max_concurrent_nodes
        .or(env.updater_max_concurrent_nodes)
        .unwrap_or(1),
      log_level: args
        .log_level
        .or(env.updater_log_level)
        .unwrap_or_default(),
      log_stdio: args
        .log_stdio
        .or(env.updater_log_stdio)
        .unwrap_or_default(),
      log_ansi: args.log_ansi.or(env.updater_log_ansi).unwrap_or(true),
    })
  }
}
