use std::path::Path;

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

use crate::types::{AppError, AppResult};
use crate::types::config::{colors_enabled, config};

/// Installs the global logger: terse lines on stdout, timestamped lines in
/// `log_file` when given.
pub fn init_logging(log_file: Option<&Path>) -> AppResult<()> {
    let level_name = config().log().level().to_string();
    let level = level_name
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Config(format!("unknown log level '{level_name}'")))?;

    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let use_color = colors_enabled();

    let stdout = fern::Dispatch::new()
        .format(move |out, message, record| {
            if use_color {
                out.finish(format_args!("[{}] {}", colors.color(record.level()), message))
            } else {
                out.finish(format_args!("[{}] {}", record.level(), message))
            }
        })
        .chain(std::io::stdout());

    let mut dispatch = fern::Dispatch::new().level(level).chain(stdout);

    if let Some(path) = log_file {
        let file = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} [{}] {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.level(),
                    message
                ))
            })
            .chain(fern::log_file(path)?);
        dispatch = dispatch.chain(file);
    }

    dispatch.apply()?;
    Ok(())
}
