use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use cf_exporter::cli::{self, Cli};
use cf_exporter::{
    logging, router, server, ApiState, CfConnector, Clock, Config, Fetcher, ScrapeComposer,
    SystemClock,
};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(cli::exit_code(&e));
        }
    };
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "exporter stopped");
            eprintln!("cf_exporter: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_cli(cli)?;
    logging::init(&config.log)?;
    tracing::info!(
        api_url = %config.cf.api_url,
        bbs = config.bbs.is_some(),
        families = ?config.filter.families().collect::<Vec<_>>(),
        "starting cf_exporter"
    );

    if let Some(bbs) = config.bbs_config() {
        cf_client::BbsClient::new(bbs).context("building BBS client")?;
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let connector = Arc::new(CfConnector::new(config.session_config(), config.bbs_config()));
    let fetcher = Fetcher::new(
        config.filter.clone(),
        config.task_states.clone(),
        connector,
        config.workers,
        Arc::clone(&clock),
    );
    let composer = ScrapeComposer::new(fetcher, &config.metrics, clock)
        .context("building metric registry")?;

    let state = ApiState::new(Arc::new(composer), &config.web);
    server::serve(router(state), &config.web)
        .await
        .context("serving metrics")?;
    tracing::info!("exporter stopped");
    Ok(())
}
