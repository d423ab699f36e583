use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the CLI.
///
/// - `RUST_LOG` wins when set (e.g. "debug", "lp_api=trace").
/// - Otherwise `--debug` selects `debug`, and the default is `warn`.
/// - Events go to stderr so stdout only carries the response payload.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
