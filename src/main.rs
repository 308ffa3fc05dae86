use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error};

use deployctl::Config;
use deployctl::cli::{self, Cli};
use deployctl::utils::logging::init_tracing;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Cli::parse();

    let cfg = match Config::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&cfg.basic.loglevel);

    let render = cfg.render();
    let vercel = cfg.vercel();
    debug!(
        loglevel = %cfg.basic.loglevel,
        render_api = %render.api_url,
        render_key = render.api_key.is_some(),
        vercel_api = %vercel.api_url,
        vercel_token = vercel.token.is_some(),
        retry_max_times = render.upstream.retry_max_times,
        proxy = %render.upstream.proxy.as_ref().map_or("<none>", |u| u.as_str()),
        "Configuration loaded"
    );

    match cli::run(args, &cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("✗ {e}");
            ExitCode::FAILURE
        }
    }
}
