use crate::error::{CliError, Result};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Maps `-v` repetitions onto a level ceiling. The default keeps warnings
/// about dropped metafiles and overridden pixel sizes visible while hiding
/// the per-operator notes.
fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global tracing subscriber.
///
/// Console output goes to stderr, so STAR data piped to stdout stays
/// clean, and omits timestamps since it shares the terminal with the
/// progress bars. The optional log file keeps timestamps and thread ids,
/// which matter once normalization fans out across rayon workers.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let ceiling = if quiet {
        LevelFilter::OFF
    } else {
        level_for(verbosity)
    };

    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .compact();

    let registry = tracing_subscriber::registry().with(ceiling).with(console);

    match log_file {
        Some(path) => {
            let file = File::create(path).map_err(CliError::Io)?;
            let file_layer = fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true);
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::PathBuf;
    use std::sync::Once;
    use tracing::{info, warn};

    static INIT: Once = Once::new();

    fn install_test_logger() {
        INIT.call_once(|| {
            setup_logging(2, false, None).expect("logger installs once");
        });
    }

    #[test]
    fn verbosity_widens_the_level_ceiling() {
        assert_eq!(level_for(0), LevelFilter::WARN);
        assert_eq!(level_for(1), LevelFilter::INFO);
        assert_eq!(level_for(2), LevelFilter::DEBUG);
        assert_eq!(level_for(9), LevelFilter::TRACE);
    }

    #[test]
    #[serial]
    fn emitting_through_the_installed_logger_does_not_panic() {
        install_test_logger();
        warn!("pixel size fell back to the default");
        info!(stacks = 3, "normalization queue ready");
    }

    #[test]
    #[serial]
    fn log_file_records_messages_and_thread_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let file = File::create(&path).unwrap();
        let layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            info!("expanded 60 operators");
        });

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("expanded 60 operators"));
        assert!(content.contains("ThreadId"));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_reports_an_io_error() {
        let root = PathBuf::from("/");
        if cfg!(unix) && root.is_dir() {
            let result = setup_logging(0, false, Some(root.as_path()));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
