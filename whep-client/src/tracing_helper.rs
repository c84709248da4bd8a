use std::{num::NonZeroU8, panic, path::Path};

use time::format_description::well_known::{iso8601, Iso8601};
use tracing::{error, Level};
use tracing_subscriber::{
    fmt::{time::LocalTime, writer::MakeWriterExt},
    prelude::__tracing_subscriber_SubscriberExt,
    EnvFilter, Layer,
};

const MY_CONFIG: iso8601::EncodedConfig = iso8601::Config::DEFAULT
    .set_time_precision(iso8601::TimePrecision::Second {
        decimal_digits: NonZeroU8::new(3),
    })
    .encode();

fn make_filter() -> EnvFilter {
    let level = if cfg!(debug_assertions) {
        "trace"
    } else {
        "info"
    };
    EnvFilter::new(format!(
        "{}={level},whep_lib={level}",
        env!("CARGO_CRATE_NAME")
    ))
}

/// Logs to stderr, and warnings and above to `log_file` when given.
pub fn init_tracing(log_file: Option<&Path>) {
    let default_layer = || {
        const WITH_FILE_PATH: bool = cfg!(debug_assertions);
        tracing_subscriber::fmt::layer()
            .compact()
            .with_file(WITH_FILE_PATH)
            .with_line_number(WITH_FILE_PATH)
            .with_target(!WITH_FILE_PATH)
            .with_thread_ids(true)
            .with_timer(LocalTime::new(Iso8601::<MY_CONFIG>))
    };
    let stderr_layer = default_layer()
        .with_writer(std::io::stderr)
        .with_filter(make_filter());

    let file_layer = log_file.map(|path| {
        let dir = path.parent().unwrap_or(Path::new("."));
        let file_name = path.file_name().unwrap_or("whep-client.log".as_ref());
        let writer = tracing_appender::rolling::never(dir, file_name).with_max_level(Level::WARN);
        default_layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(make_filter())
    });

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry().with(stderr_layer.and_then(file_layer)),
    )
    .unwrap();

    panic::set_hook(Box::new(|panic| error!("{}", panic)));
}
