//! CLI failures and the exit code each one maps to.
//!
//! | code | meaning |
//! |------|---------|
//! | 2    | clap argument error (before `run`) |
//! | 10   | effect could not be built or run |
//! | 11   | a file could not be read or written |
//! | 12   | malformed user input: `--pointer`, `--params`, seed record contents |
//! | 13   | command output could not be serialized |

use std::path::PathBuf;

use fluid_canvas_core::EngineError;
use serde_json::error::Category;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Building, running or snapshotting an effect failed.
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invalid --pointer '{arg}': expected FRAME:X,Y with finite coordinates")]
    Pointer { arg: String },

    #[error("invalid --params JSON: {0}")]
    Params(#[source] serde_json::Error),

    #[error("cannot read seed record {}: {source}", path.display())]
    SeedRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The seed file opened but did not hold a seed record. Read failures
    /// part-way through parsing also land here.
    #[error("invalid seed record {}: {source}", path.display())]
    SeedParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot write seed record {}: {source}", path.display())]
    SeedWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Engine(EngineError::Io(_)) => 11,
            CliError::Engine(_) => 10,
            CliError::SeedRead { .. } | CliError::SeedWrite { .. } => 11,
            CliError::SeedParse { source, .. } => match source.classify() {
                Category::Io => 11,
                Category::Syntax | Category::Data | Category::Eof => 12,
            },
            CliError::Pointer { .. } | CliError::Params(_) => 12,
            CliError::Output(_) => 13,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluid_canvas_core::seed::Seed;
    use std::error::Error as _;
    use std::io::{self, Read};

    fn parse_seed(text: &str) -> CliError {
        let source = serde_json::from_str::<Seed>(text).unwrap_err();
        CliError::SeedParse { path: PathBuf::from("runs/a.json"), source }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("device gone"))
        }
    }

    #[test]
    fn engine_failures_exit_10_except_io() {
        assert_eq!(CliError::from(EngineError::UnknownEffect("ripples".into())).exit_code(), 10);
        assert_eq!(CliError::from(EngineError::InvalidDimensions).exit_code(), 10);
        let io = CliError::from(EngineError::Io("disk full".into()));
        assert_eq!(io.exit_code(), 11);
        assert!(io.to_string().contains("disk full"));
    }

    #[test]
    fn pointer_error_names_the_argument() {
        let err = CliError::Pointer { arg: "3:1,NaN".into() };
        assert_eq!(err.exit_code(), 12);
        assert!(err.to_string().contains("'3:1,NaN'"));
    }

    #[test]
    fn malformed_seed_contents_are_input_errors() {
        for text in ["{not json", "{\"effect\": \"drops\"}", "{\"effect\": \"drops\", \"width\": 10"] {
            let err = parse_seed(text);
            assert_eq!(err.exit_code(), 12, "{text}");
            assert!(err.to_string().contains("runs/a.json"));
        }
    }

    #[test]
    fn seed_read_failure_during_parse_is_io() {
        let source = serde_json::from_reader::<_, Seed>(FailingReader).unwrap_err();
        let err = CliError::SeedParse { path: PathBuf::from("runs/a.json"), source };
        assert_eq!(err.exit_code(), 11);
    }

    #[test]
    fn seed_file_errors_keep_path_and_source() {
        let err = CliError::SeedRead {
            path: PathBuf::from("missing.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(err.exit_code(), 11);
        assert!(err.to_string().contains("missing.json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn bad_params_json_is_input_error() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        assert_eq!(CliError::Params(source).exit_code(), 12);
    }

    #[test]
    fn output_serialization_is_13() {
        let source = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        assert_eq!(CliError::from(source).exit_code(), 13);
    }
}
