use clap::{Args, Parser, Subcommand, ValueEnum};
use deployctl_schema::EnvVar;
use reqwest::Method;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::error::DeployError;
use crate::providers::render::{RenderClient, ServiceSpec};
use crate::providers::vercel::{DeploymentSpec, VercelClient};
use crate::providers::{RequestExecutor, WatchOutcome};

const RULE_WIDTH: usize = 60;

#[derive(Debug, Parser)]
#[command(
    name = "deployctl",
    version,
    about = "Provision and deploy web services on Render and Vercel"
)]
pub struct Cli {
    /// Config file; defaults to ./deployctl.toml when it exists.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render.com services.
    #[command(subcommand)]
    Render(RenderCommand),

    /// Vercel deployments.
    #[command(subcommand)]
    Vercel(VercelCommand),

    /// Send a raw request through the retrying executor and print the JSON payload.
    Api(ApiArgs),
}

#[derive(Debug, Subcommand)]
pub enum RenderCommand {
    /// List existing services.
    List,

    /// Create a git-backed web service.
    Create(RenderCreateArgs),

    /// Show a service and its latest deploy.
    Status {
        service_id: String,

        /// Keep polling until the latest deploy is live or failed.
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Debug, Args)]
pub struct RenderCreateArgs {
    #[arg(long)]
    pub name: String,

    /// Repository URL, e.g. https://github.com/acme/web.git
    #[arg(long)]
    pub repo: String,

    #[arg(long, default_value = "main")]
    pub branch: String,

    #[arg(long)]
    pub root_dir: Option<String>,

    #[arg(long, default_value = "node")]
    pub runtime: String,

    #[arg(long, default_value = "free")]
    pub plan: String,

    #[arg(long)]
    pub build_cmd: String,

    #[arg(long)]
    pub start_cmd: String,

    /// Environment variable as KEY=VALUE; repeatable.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_var)]
    pub env: Vec<EnvVar>,

    /// Write the new service id to this file.
    #[arg(long)]
    pub save_id: Option<PathBuf>,

    /// Poll the first deploy until it finishes.
    #[arg(long)]
    pub watch: bool,
}

#[derive(Debug, Subcommand)]
pub enum VercelCommand {
    /// Create a deployment from a GitHub repository and watch it.
    Deploy(VercelDeployArgs),

    /// Show a deployment.
    Status {
        deployment_id: String,

        /// Keep polling until the deployment is ready or failed.
        #[arg(long)]
        watch: bool,
    },
}

#[derive(Debug, Args)]
pub struct VercelDeployArgs {
    #[arg(long)]
    pub name: String,

    /// GitHub `owner/repo` slug.
    #[arg(long)]
    pub repo: String,

    #[arg(long, default_value = "main")]
    pub branch: String,

    #[arg(long)]
    pub root_dir: Option<String>,

    #[arg(long)]
    pub framework: Option<String>,

    #[arg(long)]
    pub build_cmd: Option<String>,

    #[arg(long)]
    pub output_dir: Option<String>,

    /// `production` or `preview`.
    #[arg(long)]
    pub target: Option<String>,

    /// Environment variable as KEY=VALUE; repeatable.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_var)]
    pub env: Vec<EnvVar>,

    /// Return right after the deployment is created.
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Render,
    Vercel,
}

#[derive(Debug, Args)]
pub struct ApiArgs {
    #[arg(value_enum)]
    pub provider: ProviderKind,

    /// HTTP method, e.g. GET or POST.
    pub method: String,

    /// Path under the provider base URL, e.g. /services
    pub path: String,

    /// JSON request body.
    #[arg(long)]
    pub body: Option<String>,
}

pub fn parse_env_var(raw: &str) -> Result<EnvVar, String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in {raw:?}"));
    }
    Ok(EnvVar::new(key, value))
}

pub async fn run(cli: Cli, cfg: &Config) -> Result<(), DeployError> {
    match cli.command {
        Command::Render(cmd) => run_render(cmd, cfg).await,
        Command::Vercel(cmd) => run_vercel(cmd, cfg).await,
        Command::Api(args) => run_api(args, cfg).await,
    }
}

async fn run_render(cmd: RenderCommand, cfg: &Config) -> Result<(), DeployError> {
    let render_cfg = cfg.render();
    let client = RenderClient::new(&render_cfg)?;

    match cmd {
        RenderCommand::List => {
            let services = client.list_services().await?;
            if services.is_empty() {
                println!("No existing services found");
            } else {
                println!("Found {} existing service(s):", services.len());
                for svc in &services {
                    let suspended = if svc.is_suspended() { " [suspended]" } else { "" };
                    println!("  - {} ({}){suspended}", svc.name, svc.id);
                }
            }
            Ok(())
        }

        RenderCommand::Create(args) => {
            let spec = ServiceSpec {
                name: args.name,
                repo: args.repo,
                branch: args.branch,
                root_dir: args.root_dir,
                runtime: args.runtime,
                plan: args.plan,
                build_command: args.build_cmd,
                start_command: args.start_cmd,
                env_vars: args.env,
            };

            banner(&format!("Creating Service: {}", spec.name));
            println!(
                "Root Directory: {}",
                spec.root_dir.as_deref().unwrap_or("<repo root>")
            );
            println!("Environment Variables: {}", spec.env_vars.len());

            let created = client.create_service(&spec).await?;
            let service = created.service();
            println!("✓ Service created: {}", service.id);
            println!("  URL: {}", service.url().unwrap_or("Will be assigned"));
            if let Some(deploy_id) = created.deploy_id() {
                println!("  Deploy: {deploy_id}");
            }

            if let Some(path) = args.save_id.as_ref() {
                tokio::fs::write(path, &service.id).await?;
                info!(path = %path.display(), "Saved service id");
                println!("  Service id written to {}", path.display());
            }

            if args.watch {
                let outcome = client
                    .watch_latest_deploy(
                        service,
                        render_cfg.poll_interval,
                        render_cfg.poll_max_checks,
                    )
                    .await?;
                report_outcome(&service.id, outcome)?;
            }
            Ok(())
        }

        RenderCommand::Status { service_id, watch } => {
            let service = client.get_service(&service_id).await?;
            banner(&format!("Service: {}", service.name));
            println!("  ID: {}", service.id);
            println!("  URL: {}", service.url().unwrap_or("N/A"));
            if service.is_suspended() {
                println!("  Suspended");
            }

            match client.latest_deploy(&service.id).await? {
                Some(deploy) => {
                    let snapshot = crate::providers::watch::StatusSnapshot::from(&deploy);
                    println!("  Latest deploy: {} ({})", deploy.id, snapshot.label);
                    if let Some(elapsed) = deploy.elapsed() {
                        println!("  Took: {}s", elapsed.num_seconds());
                    }
                }
                None => println!("  No deploys yet"),
            }

            if watch {
                let outcome = client
                    .watch_latest_deploy(
                        &service,
                        render_cfg.poll_interval,
                        render_cfg.poll_max_checks,
                    )
                    .await?;
                report_outcome(&service.id, outcome)?;
            }
            Ok(())
        }
    }
}

async fn run_vercel(cmd: VercelCommand, cfg: &Config) -> Result<(), DeployError> {
    let vercel_cfg = cfg.vercel();
    let client = VercelClient::new(&vercel_cfg)?;

    match cmd {
        VercelCommand::Deploy(args) => {
            let spec = DeploymentSpec {
                name: args.name,
                repo: args.repo,
                git_ref: args.branch,
                root_dir: args.root_dir,
                framework: args.framework,
                build_command: args.build_cmd,
                output_directory: args.output_dir,
                env: args.env,
                target: args.target,
            };

            banner(&format!("Deploying {} to Vercel", spec.name));
            println!("Repository: {}", spec.repo);
            println!("Branch: {}", spec.git_ref);
            println!(
                "Root Directory: {}",
                spec.root_dir.as_deref().unwrap_or("<repo root>")
            );
            println!(
                "Framework: {}",
                spec.framework.as_deref().unwrap_or("<auto>")
            );
            println!("Environment Variables: {}", spec.env.len());

            let deployment = client.create_deployment(&spec).await?;
            println!("✓ Deployment created");
            println!("  Deployment ID: {}", deployment.id);
            println!(
                "  Project ID: {}",
                deployment.project_id.as_deref().unwrap_or("N/A")
            );
            println!(
                "  URL: {}",
                deployment.https_url().as_deref().unwrap_or("N/A")
            );

            if args.no_wait {
                return Ok(());
            }

            println!("Monitoring deployment status...");
            let outcome = client
                .watch_deployment(
                    &deployment.id,
                    vercel_cfg.poll_interval,
                    vercel_cfg.poll_max_checks,
                )
                .await?;
            report_outcome(&deployment.id, outcome)
        }

        VercelCommand::Status {
            deployment_id,
            watch,
        } => {
            let deployment = client.get_deployment(&deployment_id).await?;
            let snapshot = crate::providers::watch::StatusSnapshot::from(&deployment);
            banner(&format!("Deployment: {}", deployment.id));
            println!("  State: {}", snapshot.label);
            println!("  URL: {}", snapshot.url.as_deref().unwrap_or("N/A"));
            if let Some(created) = deployment.created_at_utc() {
                println!("  Created: {}", created.to_rfc3339());
            }
            if let Some(error) = snapshot.error.as_deref() {
                println!("  Error: {error}");
            }

            if watch {
                let outcome = client
                    .watch_deployment(
                        &deployment.id,
                        vercel_cfg.poll_interval,
                        vercel_cfg.poll_max_checks,
                    )
                    .await?;
                report_outcome(&deployment.id, outcome)?;
            }
            Ok(())
        }
    }
}

async fn run_api(args: ApiArgs, cfg: &Config) -> Result<(), DeployError> {
    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| DeployError::InvalidInput(format!("invalid HTTP method {:?}", args.method)))?;
    let body = args
        .body
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|e| DeployError::InvalidInput(format!("--body is not valid JSON: {e}")))?;

    let executor: RequestExecutor = match args.provider {
        ProviderKind::Render => RenderClient::new(&cfg.render())?.executor().clone(),
        ProviderKind::Vercel => VercelClient::new(&cfg.vercel())?.executor().clone(),
    };

    let payload = executor.execute(method, &args.path, body.as_ref()).await?;
    let pretty = serde_json::to_string_pretty(&payload)
        .map_err(|e| DeployError::InvalidInput(format!("unprintable payload: {e}")))?;
    println!("{pretty}");
    Ok(())
}

fn report_outcome(id: &str, outcome: WatchOutcome) -> Result<(), DeployError> {
    match outcome {
        WatchOutcome::Ready { url } => {
            println!("✓ Deployment {id} is live");
            if let Some(url) = url {
                println!("  URL: {url}");
            }
            Ok(())
        }
        WatchOutcome::Failed { message } => Err(DeployError::DeploymentFailed {
            id: id.to_string(),
            message,
        }),
        WatchOutcome::Canceled => Err(DeployError::DeploymentCanceled { id: id.to_string() }),
        WatchOutcome::TimedOut { checks } => Err(DeployError::WatchTimedOut {
            id: id.to_string(),
            checks,
        }),
    }
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("{title}");
    println!("{}", "=".repeat(RULE_WIDTH));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_parsing() {
        assert_eq!(
            parse_env_var("NODE_ENV=production"),
            Ok(EnvVar::new("NODE_ENV", "production"))
        );
        assert_eq!(
            parse_env_var("DATABASE_URL=postgres://u:p@h/db?sslmode=require"),
            Ok(EnvVar::new(
                "DATABASE_URL",
                "postgres://u:p@h/db?sslmode=require"
            ))
        );
        assert_eq!(parse_env_var("EMPTY="), Ok(EnvVar::new("EMPTY", "")));
        assert!(parse_env_var("NO_EQUALS").is_err());
        assert!(parse_env_var("=value").is_err());
    }

    #[test]
    fn render_create_parses_repeated_env() {
        let cli = Cli::try_parse_from([
            "deployctl",
            "render",
            "create",
            "--name",
            "web",
            "--repo",
            "https://github.com/acme/web.git",
            "--root-dir",
            "web",
            "--build-cmd",
            "npm ci && npm run build",
            "--start-cmd",
            "npm start",
            "--env",
            "NODE_ENV=production",
            "--env",
            "API=https://api.example.com",
            "--save-id",
            "FRONTEND_SERVICE_ID.txt",
        ])
        .expect("valid args");

        let Command::Render(RenderCommand::Create(args)) = cli.command else {
            panic!("expected render create");
        };
        assert_eq!(args.branch, "main");
        assert_eq!(args.runtime, "node");
        assert_eq!(args.plan, "free");
        assert_eq!(args.env.len(), 2);
        assert_eq!(
            args.save_id.as_deref(),
            Some(std::path::Path::new("FRONTEND_SERVICE_ID.txt"))
        );
    }

    #[test]
    fn api_command_takes_provider_method_and_path() {
        let cli = Cli::try_parse_from([
            "deployctl",
            "--config",
            "ops.toml",
            "api",
            "vercel",
            "get",
            "/v13/deployments/dpl_1",
        ])
        .expect("valid args");

        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("ops.toml")));
        let Command::Api(args) = cli.command else {
            panic!("expected api");
        };
        assert_eq!(args.provider, ProviderKind::Vercel);
        assert_eq!(args.method, "get");
        assert!(args.body.is_none());
    }

    #[test]
    fn outcomes_map_to_errors() {
        assert!(report_outcome("dpl_1", WatchOutcome::Ready { url: None }).is_ok());
        assert!(matches!(
            report_outcome("dpl_1", WatchOutcome::Failed { message: "boom".to_string() }),
            Err(DeployError::DeploymentFailed { .. })
        ));
        assert!(matches!(
            report_outcome("dpl_1", WatchOutcome::TimedOut { checks: 30 }),
            Err(DeployError::WatchTimedOut { checks: 30, .. })
        ));
    }
}
