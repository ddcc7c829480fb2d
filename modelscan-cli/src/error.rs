//! CLI-specific error types and exit code mapping

use modelscan_core::error::ModelScanError;

/// CLI-specific error type.
///
/// Scan outcomes (issues, recorded errors, nothing scanned) are also expressed
/// as variants so that `main` has a single place mapping results to exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid arguments that clap could not reject on its own.
    #[error("{0}")]
    Usage(String),

    /// The scan reported at least one issue.
    #[error("found {count} issue(s)")]
    IssuesFound { count: usize },

    /// The scan finished without issues but recorded errors.
    #[error("scan recorded {count} error(s)")]
    ScanErrors { count: usize },

    /// No target was claimed by any scanner.
    #[error("no supported files were scanned")]
    NothingScanned,

    /// The scan could not run to completion.
    #[error("scan error: {0}")]
    Scan(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (report file write, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from modelscan-core.
    #[error("{0}")]
    Core(#[from] ModelScanError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Clean scan                       |
    /// | 1    | Issues found                     |
    /// | 2    | Scan errors / runtime failure    |
    /// | 3    | Nothing scanned                  |
    /// | 4    | Usage or configuration error     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::IssuesFound { .. } => 1,
            Self::ScanErrors { .. } => 2,
            Self::NothingScanned => 3,
            Self::Config(_) | Self::Usage(_) => 4,
            Self::Core(ModelScanError::Config(_)) => 4,
            Self::Scan(_) | Self::JsonSerialize(_) | Self::Io(_) | Self::Core(_) => 2,
        }
    }

    /// Whether this "error" only carries the outcome of a completed scan.
    ///
    /// The report has already been printed in that case, so `main` stays quiet.
    pub fn is_scan_outcome(&self) -> bool {
        matches!(
            self,
            Self::IssuesFound { .. } | Self::ScanErrors { .. } | Self::NothingScanned
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelscan_core::error::ConfigError;

    #[test]
    fn test_exit_code_issues_found() {
        let err = CliError::IssuesFound { count: 3 };
        assert_eq!(err.exit_code(), 1, "issues should return exit code 1");
        assert!(err.is_scan_outcome());
    }

    #[test]
    fn test_exit_code_scan_errors() {
        let err = CliError::ScanErrors { count: 1 };
        assert_eq!(err.exit_code(), 2, "scan errors should return exit code 2");
        assert!(err.is_scan_outcome());
    }

    #[test]
    fn test_exit_code_nothing_scanned() {
        let err = CliError::NothingScanned;
        assert_eq!(err.exit_code(), 3);
        assert!(err.is_scan_outcome());
    }

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 4, "config error should return exit code 4");
        assert!(!err.is_scan_outcome());
    }

    #[test]
    fn test_exit_code_usage_error() {
        let err = CliError::Usage("unknown section".to_owned());
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let core_err: ModelScanError = ConfigError::FileNotFound {
            path: "modelscan.toml".to_owned(),
        }
        .into();
        let err: CliError = core_err.into();
        assert_eq!(
            err.exit_code(),
            4,
            "core config error should map to the config exit code"
        );
    }

    #[test]
    fn test_exit_code_core_non_config_error() {
        let err: CliError = ModelScanError::Model("closed".to_owned()).into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 2);
        assert!(!err.is_scan_outcome());
    }

    #[test]
    fn test_exit_code_json_serialize_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json")
            .expect_err("should fail parsing");
        let err = CliError::JsonSerialize(json_err);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_error_display_issues_found() {
        let err = CliError::IssuesFound { count: 5 };
        assert_eq!(err.to_string(), "found 5 issue(s)");
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = format!("{}", err);
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let cli_err: CliError = io_err.into();
        match cli_err {
            CliError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("expected Io error variant"),
        }
    }
}
