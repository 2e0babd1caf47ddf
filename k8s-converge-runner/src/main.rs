use clap::Parser as _;
use k8s_converge_kubeapi::KubeApi;
use k8s_converge_suite::Scenarios;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = cli::Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!("Starting k8s-converge");

    let context = cli.context();
    let poll = cli.poll_config();
    let kubeapi = KubeApi::new(&context).await?;
    tracing::info!(
        namespace = kubeapi.namespace(),
        host = ?context.host,
        max_attempts = poll.max_attempts,
        attempt_delay = ?poll.attempt_delay,
        "Connected"
    );

    Scenarios::new(kubeapi, context, poll)
        .with_pod_fixture(cli.pod_fixture.clone())
        .run(&cli.scenarios)
        .await?;

    Ok(())
}
