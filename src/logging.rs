use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Install the stderr subscriber. `RUST_LOG` takes precedence over `verbose`.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info,yt_comment_responder=debug,yt_oauth=debug")
        } else {
            EnvFilter::new("warn,yt_comment_responder=info,yt_oauth=info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
