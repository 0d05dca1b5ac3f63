use std::sync::Once;

use log::LevelFilter;

/// Logger configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Full `env_logger` filter (e.g. "info,quill_stage=trace"). Takes
    /// precedence over `RUST_LOG` and the level fields below.
    pub env_filter: Option<String>,

    /// Level for the quill crates when no filter string applies.
    pub quill_level: LevelFilter,

    /// Level for wgpu and naga, which are chatty at info.
    pub gpu_level: LevelFilter,

    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            quill_level: LevelFilter::Info,
            gpu_level: LevelFilter::Warn,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    fn builder(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        builder.write_style(self.write_style);

        let filter = self.env_filter.clone().or_else(|| std::env::var("RUST_LOG").ok());
        match filter {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(LevelFilter::Info);
                for module in ["quill_engine", "quill_stage", "quill_demo"] {
                    builder.filter_module(module, self.quill_level);
                }
                for module in ["wgpu_core", "wgpu_hal", "naga"] {
                    builder.filter_module(module, self.gpu_level);
                }
            }
        }
        builder
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Later calls are ignored, as is a logger that
/// someone else (a test harness) installed first.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        if config.builder().try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}
