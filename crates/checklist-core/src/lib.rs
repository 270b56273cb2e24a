pub mod cli;
pub mod config;
pub mod filter;
pub mod render;
pub mod seeder;
pub mod shell;
pub mod store;
pub mod task;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting checklist"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let filter = match cli.filter {
    | Some(kind) => kind,
    | None => cfg.default_filter()?
  };
  let seed_on_start =
    !cli.no_seed && cfg.seed_on_start()?;

  let seeder = seeder::RemoteSeeder::new(
    cfg.seeder_config()?
  )?;
  let renderer =
    render::Renderer::new(&cfg)?;
  let shell = shell::Shell::new(
    store::TaskStore::new(),
    filter
  );

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async \
         runtime"
      )?;

  runtime.block_on(
    shell::run_interactive(
      shell,
      seeder,
      &renderer,
      seed_on_start
    )
  )?;

  info!("done");
  Ok(())
}
