//! Miette-based error diagnostics for CLI errors.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::error::{ConfigError, Error};

/// Parse error with source location.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(kingmaker::config))]
pub struct ParseDiagnostic {
    pub message: String,

    #[source_code]
    pub src: miette::NamedSource<String>,

    #[label("here")]
    pub span: Option<SourceSpan>,

    #[help]
    pub help: Option<String>,
}

/// Any other failure surfaced by a command.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(kingmaker::error))]
pub struct CommandDiagnostic {
    pub message: String,

    #[help]
    pub help: Option<String>,
}

/// Convert a crate error into a printable report.
///
/// TOML parse failures keep their file contents, so they get a labelled
/// source snippet; everything else is message plus an optional hint.
pub fn report(err: Error) -> miette::Report {
    match err {
        Error::Config(ConfigError::Parse {
            path,
            contents,
            source,
        }) => {
            let span = source.span().map(|range| SourceSpan::from(range.start..range.end));
            miette::Report::new(ParseDiagnostic {
                message: format!("failed to parse {path}: {}", source.message()),
                src: miette::NamedSource::new(path, contents),
                span,
                help: Some("see config.toml and markets.toml in the repository for the expected layout".into()),
            })
        }
        other => {
            let help = hint(&other);
            miette::Report::new(CommandDiagnostic {
                message: other.to_string(),
                help,
            })
        }
    }
}

fn hint(err: &Error) -> Option<String> {
    match err {
        Error::Config(ConfigError::ReadFile { .. }) => {
            Some("pass --config <path> or create config.toml in the working directory".into())
        }
        Error::Config(ConfigError::InvalidValue { field, .. })
        | Error::Config(ConfigError::MissingField { field }) => {
            Some(format!("check the `{field}` setting"))
        }
        Error::Http(_) => Some("check your network connection and the Gamma API URL".into()),
        Error::UnknownEvent(_) => Some("copy the slug from the event URL on polymarket.com".into()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn parse_errors_point_at_the_source() {
        let err = Config::parse("[feed]\nfreshness_window_secs = \"soon\"\n", "config.toml").unwrap_err();
        let report = report(err);
        let diagnostic = report
            .downcast_ref::<ParseDiagnostic>()
            .expect("parse errors render with source");
        assert!(diagnostic.span.is_some());
        assert!(diagnostic.message.starts_with("failed to parse config.toml"));
    }

    #[test]
    fn other_errors_carry_a_hint() {
        let err: Error = ConfigError::MissingField { field: "registry" }.into();
        let report = report(err);
        let diagnostic = report.downcast_ref::<CommandDiagnostic>().unwrap();
        assert_eq!(diagnostic.help.as_deref(), Some("check the `registry` setting"));
    }
}
