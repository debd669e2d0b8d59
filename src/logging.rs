use colored::*;
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// A tracing event formatter that colors each line by level.
///
/// Info lines are printed bare; warnings and errors get a level prefix so
/// they remain recognizable when color is disabled, and verbose lines name
/// the module that emitted them. The benchmark report is written to stdout
/// separately, so these lines never mix with it.
pub struct ColorizedFormatter;

impl<S, N> FormatEvent<S, N> for ColorizedFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut message = String::new();
        ctx.format_fields(Writer::new(&mut message), event)?;

        let metadata = event.metadata();
        match *metadata.level() {
            Level::INFO => writeln!(writer, "{}", message.white()),
            Level::WARN => writeln!(writer, "{} {}", "warning:".yellow().bold(), message.yellow()),
            Level::ERROR => writeln!(writer, "{} {}", "error:".red().bold(), message.red()),
            level => {
                let target = format!("{}:", metadata.target()).dimmed();
                let body = if level == Level::DEBUG {
                    message.blue()
                } else {
                    message.purple()
                };
                writeln!(writer, "{} {}", target, body)
            }
        }
    }
}

/// Install the global subscriber, logging to stderr
///
/// `RUST_LOG` takes precedence; otherwise the level is `info`, or `debug`
/// with `verbose`.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .event_format(ColorizedFormatter)
        .try_init();
}
