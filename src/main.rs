use campus_viewer::cli::CliOverrides;
use campus_viewer::run_with_overrides;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("campus_viewer=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    let config_path = cli.config_path();
    if let Err(err) = pollster::block_on(run_with_overrides(cli.into_config_overrides(), config_path)) {
        tracing::error!("Application error: {err:?}");
        std::process::exit(1);
    }
}
