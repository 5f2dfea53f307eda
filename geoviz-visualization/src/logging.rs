//! `env_logger` setup for viewer binaries.
//!
//! The library itself only emits through the `log` facade. Applications call
//! [`init_logging`] once near the top of `main`.

use std::sync::Once;

use log::LevelFilter;

/// wgpu and naga log every pipeline and submission at info
const GPU_CRATES: [&str; 3] = ["wgpu_core", "wgpu_hal", "naga"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level used when neither `directives` nor `RUST_LOG` is set
    pub level: LevelFilter,
    /// Filter directives such as `"geoviz_visualization=debug"`; overrides `RUST_LOG`
    pub directives: Option<String>,
    /// Cap the wgpu crates at warn
    pub quiet_gpu: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            directives: None,
            quiet_gpu: true,
        }
    }
}

impl LoggingConfig {
    fn builder(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        builder.filter_level(self.level);
        if self.quiet_gpu {
            for module in GPU_CRATES {
                builder.filter_module(module, LevelFilter::Warn);
            }
        }
        if let Some(directives) = self.directives.clone().or_else(|| std::env::var("RUST_LOG").ok()) {
            builder.parse_filters(&directives);
        }
        builder
    }
}

static INIT: Once = Once::new();

/// Install the global logger. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| match config.builder().try_init() {
        Ok(()) => log::debug!("Logging initialized at {}", config.level),
        // Test harnesses may have installed their own logger
        Err(e) => eprintln!("Logger not installed: {}", e),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_override_level() {
        let config = LoggingConfig {
            level: LevelFilter::Error,
            directives: Some("debug".to_string()),
            quiet_gpu: false,
        };
        assert_eq!(config.builder().build().filter(), LevelFilter::Debug);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig {
            level: LevelFilter::Trace,
            ..LoggingConfig::default()
        });
        log::info!("still logging after a second init");
    }
}
