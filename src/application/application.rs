use std::time::Duration;

use compio::runtime::spawn;
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;
use crate::cli::Cli;
use crate::config::{ConfigError, FileConfig};
use crate::executor::{ParallelBuildError, ParallelTreeBuilder};
use crate::filesystem::{BuildOutput, CancellationToken, TreeBuilder};
use crate::render::TreeRenderer;

pub struct Application;

impl Application {
    pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
        let file_config = match &cli.config {
            Some(path) => FileConfig::read(path).await.context(ConfigSnafu)?,
            None => FileConfig::default(),
        };
        debug!("Loaded config: {:?}", file_config);

        let runtime_config = RuntimeConfig::resolve(cli, file_config);
        debug!("Resolved runtime config: {:?}", runtime_config);

        let output = Self::build(&runtime_config).await?;
        Self::report(&output);

        colored::control::set_override(runtime_config.color);
        let renderer = TreeRenderer::new(runtime_config.listing, runtime_config.color);
        print!("{}", renderer.render(&output.tree));

        Ok(())
    }

    async fn build(runtime_config: &RuntimeConfig) -> Result<BuildOutput, ApplicationError> {
        let token = CancellationToken::new();
        Self::cancel_on_ctrl_c(token.clone());
        if let Some(timeout) = runtime_config.timeout {
            Self::cancel_after(token.clone(), timeout);
        }

        let builder = TreeBuilder::new(runtime_config.build_options.clone());
        ParallelTreeBuilder::new(builder, token, runtime_config.jobs)
            .context(TreeBuildSnafu)?
            .build(&runtime_config.root)
            .await
            .context(TreeBuildSnafu)
    }

    fn cancel_on_ctrl_c(token: CancellationToken) {
        spawn(async move {
            if compio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl-C, cancelling the build");
                token.cancel();
            }
        })
        .detach();
    }

    fn cancel_after(token: CancellationToken, timeout: Duration) {
        spawn(async move {
            compio::time::sleep(timeout).await;
            warn!("Build did not finish within {:?}, cancelling", timeout);
            token.cancel();
        })
        .detach();
    }

    fn report(output: &BuildOutput) {
        info!(
            "Visited {} directories, recorded {} files, skipped {} entries",
            output.stats.directories, output.stats.files, output.stats.skipped
        );
        if !output.warnings.is_empty() {
            warn!("{} problems met while building the tree:", output.warnings.len());
            for warning in &output.warnings {
                warn!("  {}", warning);
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: ConfigError },
    #[snafu(display("Critical failure encountered while building the tree"))]
    TreeBuildError { source: ParallelBuildError },
}
