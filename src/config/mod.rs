mod basic;
mod providers;

pub use basic::BasicConfig;
pub use providers::{
    ProviderDefaults, ProvidersConfig, RenderConfig, RenderResolvedConfig, UpstreamResolvedConfig,
    VercelConfig, VercelResolvedConfig,
};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DeployError;

/// Application configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Core settings (see `basic` table in deployctl.toml).
    #[serde(default)]
    pub basic: BasicConfig,

    /// Provider credentials and upstream settings (see `providers` table in deployctl.toml).
    #[serde(default)]
    pub providers: ProvidersConfig,
}

pub const DEFAULT_CONFIG_FILE: &str = "deployctl.toml";

/// Environment prefix; nested keys use `__`, e.g. `DEPLOYCTL_PROVIDERS__RENDER__API_KEY`.
pub const ENV_PREFIX: &str = "DEPLOYCTL_";

impl Config {
    /// Builds a Figment that merges defaults, a TOML file (if present) and the environment.
    pub fn figment(path: &Path) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        let figment = if path.is_file() {
            figment.merge(Toml::file(path))
        } else {
            figment
        };
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads configuration.
    ///
    /// With `explicit = None` the default `deployctl.toml` is optional. An explicitly named
    /// file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, DeployError> {
        let path = match explicit {
            Some(path) if !path.is_file() => {
                return Err(DeployError::ConfigNotFound(path.to_path_buf()));
            }
            Some(path) => path,
            None => Path::new(DEFAULT_CONFIG_FILE),
        };

        let cfg: Self = Self::figment(path).extract().map_err(Box::new)?;
        Ok(cfg)
    }

    pub fn render(&self) -> RenderResolvedConfig {
        self.providers.render.resolve(&self.providers.defaults)
    }

    pub fn vercel(&self) -> VercelResolvedConfig {
        self.providers.vercel.resolve(&self.providers.defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::time::Duration;

    #[test]
    fn defaults_apply_without_file_or_env() {
        Jail::expect_with(|_jail| {
            let cfg = Config::load(None).expect("defaults load");
            assert_eq!(cfg.basic.loglevel, "info");

            let render = cfg.render();
            assert_eq!(render.api_url.as_str(), "https://api.render.com/v1");
            assert_eq!(render.api_key, None);
            assert_eq!(render.upstream.retry_max_times, 5);
            assert_eq!(render.upstream.retry_base_delay, Duration::from_secs(1));
            assert_eq!(render.upstream.request_timeout, Duration::from_secs(10));
            assert_eq!(render.upstream.ratelimit_reset_header, "Ratelimit-Reset");
            assert_eq!(render.upstream.ratelimit_max_wait, Duration::from_secs(300));

            let vercel = cfg.vercel();
            assert_eq!(vercel.poll_interval, Duration::from_secs(5));
            assert_eq!(vercel.poll_max_checks, 30);
            Ok(())
        });
    }

    #[test]
    fn toml_and_env_layers_merge_with_provider_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                [basic]
                loglevel = "debug"

                [providers.defaults]
                retry_max_times = 3
                retry_base_delay_ms = 250

                [providers.render]
                owner_id = "tea-file"
                retry_max_times = 7

                [providers.vercel]
                team_id = "team_1"
                poll_max_checks = 4
                "#,
            )?;
            jail.set_env("DEPLOYCTL_PROVIDERS__RENDER__API_KEY", "rnd_from_env");
            jail.set_env("DEPLOYCTL_PROVIDERS__VERCEL__TOKEN", "12345");

            let cfg = Config::load(None).expect("layered load");
            assert_eq!(cfg.basic.loglevel, "debug");

            let render = cfg.render();
            assert_eq!(render.api_key.as_deref(), Some("rnd_from_env"));
            assert_eq!(render.owner_id.as_deref(), Some("tea-file"));
            assert_eq!(render.upstream.retry_max_times, 7);
            assert_eq!(render.upstream.retry_base_delay, Duration::from_millis(250));

            let vercel = cfg.vercel();
            // Numeric env values still land as strings.
            assert_eq!(vercel.token.as_deref(), Some("12345"));
            assert_eq!(vercel.team_id.as_deref(), Some("team_1"));
            assert_eq!(vercel.poll_max_checks, 4);
            assert_eq!(vercel.upstream.retry_max_times, 3);
            Ok(())
        });
    }

    #[test]
    fn numeric_owner_id_and_max_wait_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                [providers.vercel]
                ratelimit_max_wait_secs = 60
                "#,
            )?;
            jail.set_env("DEPLOYCTL_PROVIDERS__RENDER__OWNER_ID", "1234567");

            let cfg = Config::load(None).expect("layered load");
            assert_eq!(cfg.render().owner_id.as_deref(), Some("1234567"));
            assert_eq!(cfg.render().upstream.ratelimit_max_wait, Duration::from_secs(300));
            assert_eq!(cfg.vercel().upstream.ratelimit_max_wait, Duration::from_secs(60));
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        Jail::expect_with(|_jail| {
            let err = Config::load(Some(Path::new("nope.toml"))).expect_err("must fail");
            assert!(matches!(err, DeployError::ConfigNotFound(_)));
            Ok(())
        });
    }

    #[test]
    fn unknown_provider_field_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [providers.render]
                api_token = "typo"
                "#,
            )?;
            let err = Config::load(Some(Path::new("custom.toml"))).expect_err("must fail");
            assert!(matches!(err, DeployError::Config(_)));
            Ok(())
        });
    }
}
