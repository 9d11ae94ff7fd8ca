mod config;
mod dialog;
mod frame;
mod handlers;
mod player;
mod state;

use ripple_engine::device::GpuInit;
use ripple_engine::logging::{init_logging, LoggingConfig};
use ripple_engine::window::{LogicalSize, Runtime, RuntimeConfig};

use crate::config::DemoConfig;
use crate::handlers::ReflectionDemo;

const TITLE: &str = "2D Reflection";

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let demo = DemoConfig::default();
    let runtime = RuntimeConfig {
        title: TITLE.to_string(),
        initial_size: LogicalSize::new(demo.output_size.0 as f64, demo.output_size.1 as f64),
        ..RuntimeConfig::default()
    };

    let result = Runtime::run(runtime, GpuInit::default(), ReflectionDemo::new(demo));

    if let Err(err) = &result {
        log::error!("fatal: {err:#}");
        dialog::show_fatal(TITLE, err);
    }
    result
}
