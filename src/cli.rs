use std::io::{self, IsTerminal};
use std::sync::Arc;

use crate::catalog::DeviceArchitecture;
use crate::config::Config;
use crate::die;
use crate::resolver::{PatternCache, Resolver};
use crate::store::{open::open_store, CatalogStore};
use crate::RequestedColorMode;

pub(crate) mod check;
pub(crate) mod engines;
pub(crate) mod latest;
pub(crate) mod list;
pub(crate) mod output;
pub(crate) mod rules;

/// Engine used when neither the command line nor the config names one.
const FALLBACK_ENGINE: &str = "vllm";

#[derive(Clone, Copy, strum_macros::Display)]
pub(crate) enum ColorMode {
    On,
    Off,
}

impl ColorMode {
    /// Returns whether ANSI color should be used
    /// If the user has specified a preference, this is honored. This preference
    /// can be specified through the command line or the "NO_COLOR" environment
    /// variable If the user hasn't stated a preference, color is enabled if the
    /// output is a terminal.
    pub(crate) fn resolve_auto(cm: RequestedColorMode) -> ColorMode {
        match cm {
            RequestedColorMode::Auto => {
                let disable_color =
                    std::env::var_os("NO_COLOR").is_some() || !io::stdout().is_terminal();

                if disable_color {
                    ColorMode::Off
                } else {
                    ColorMode::On
                }
            }
            RequestedColorMode::On => ColorMode::On,
            RequestedColorMode::Off => ColorMode::Off,
        }
    }
}

/// Everything a subcommand needs: the config, the opened store and a
/// resolver reading from it.
pub(crate) struct Session {
    pub config: Config,
    pub store: Arc<dyn CatalogStore>,
    pub resolver: Resolver,
}

impl Session {
    pub(crate) async fn open(config: Config, catalog: Option<&str>) -> Session {
        let store: Arc<dyn CatalogStore> = match open_store(&config.store, catalog).await {
            Ok(store) => Arc::from(store),
            Err(err) => die!("{}", err),
        };

        let mut resolver = Resolver::new(store.clone());

        if config.resolver.pattern_cache {
            resolver = resolver.with_pattern_cache(Arc::new(PatternCache::new()));
        }

        tracing::debug!(store = %store.id(), "session opened");

        Session {
            config,
            store,
            resolver,
        }
    }

    /// The engine named on the command line, else the configured default,
    /// else `vllm`.
    pub(crate) fn engine(&self, requested: Option<&str>) -> String {
        requested
            .or(self.config.defaults.engine.as_deref())
            .unwrap_or(FALLBACK_ENGINE)
            .to_string()
    }

    /// The device named on the command line, else the configured default.
    /// Exits when neither is set.
    pub(crate) fn device_architecture(
        &self,
        requested: Option<DeviceArchitecture>,
    ) -> DeviceArchitecture {
        match requested.or(self.config.defaults.device_architecture) {
            Some(device) => device,
            None => die!(
                "no device architecture given, pass --device or set defaults.device_architecture"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing;

    fn session(config: Config) -> Session {
        let store: Arc<dyn CatalogStore> = testing::store();

        Session {
            config,
            resolver: Resolver::new(store.clone()),
            store,
        }
    }

    #[test]
    fn engine_falls_back_to_config_then_vllm() {
        let mut config = Config::default();
        assert_eq!(session(config.clone()).engine(None), "vllm");

        config.defaults.engine = Some("sglang".to_string());
        let session = session(config);
        assert_eq!(session.engine(None), "sglang");
        assert_eq!(session.engine(Some("infinity")), "infinity");
    }

    #[test]
    fn device_prefers_the_command_line() {
        let mut config = Config::default();
        config.defaults.device_architecture = Some(DeviceArchitecture::Rocm);
        let session = session(config);

        assert_eq!(session.device_architecture(None), DeviceArchitecture::Rocm);
        assert_eq!(
            session.device_architecture(Some(DeviceArchitecture::Cpu)),
            DeviceArchitecture::Cpu
        );
    }
}
