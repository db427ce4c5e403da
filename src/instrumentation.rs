use tracing_chrome::{ChromeLayerBuilder, FlushGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;

/// Log level for a number of `-v` flags.
pub fn level_filter(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::OFF,
        1 => LevelFilter::WARN,
        2 => LevelFilter::INFO,
        3 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber.
///
/// With `chrome` set, spans are written for chrome://tracing or https://ui.perfetto.dev/. Make
/// sure to keep the returned guard alive for the whole run, the trace file is written when it is
/// dropped. Log events go to stderr when `verbosity` is above zero.
pub fn init(chrome: bool, verbosity: u8) -> Option<FlushGuard> {
    let (chrome_layer, guard) = if chrome {
        let (layer, guard) = ChromeLayerBuilder::new().build();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let fmt_layer = (verbosity > 0).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(level_filter(verbosity))
    });

    tracing_subscriber::registry()
        .with(chrome_layer)
        .with(fmt_layer)
        .init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter() {
        let tests = vec![
            (0, LevelFilter::OFF),
            (1, LevelFilter::WARN),
            (3, LevelFilter::DEBUG),
            (9, LevelFilter::TRACE),
        ];
        for (verbosity, expected) in tests {
            assert_eq!(level_filter(verbosity), expected, "{}", verbosity);
        }
    }
}
