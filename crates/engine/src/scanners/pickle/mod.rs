//! pickle 스캐너: 안전하지 않은 전역 참조 탐지
//!
//! pickle은 역직렬화 시 임의의 callable을 import하고 호출할 수 있습니다.
//! 이 스캐너는 스트림을 실행하지 않고 opcode만 순회하여 import되는 전역 참조를
//! 모으고, [`UnsafeGlobals`] 테이블에 있는 참조마다 이슈를 보고합니다.
//!
//! # 클레임 규칙
//!
//! - 확장자가 `supported_extensions`에 없으면 `None`
//! - 확장자가 맞으면 항상 `Some` (파싱 실패도 에러가 담긴 결과로 클레임)

mod genops;
mod globals;

pub use genops::{GenopsOutcome, GlobalRef, PickleError, PickleSummary, genops};
pub use globals::{DeniedNames, UNSAFE_GLOBALS_OPTION, UnsafeGlobals};

use std::path::Path;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use modelscan_core::config::{DEFAULT_MAX_TARGET_SIZE, PICKLE_SCANNER_ID, ScannerSettings};
use modelscan_core::types::{ErrorRecord, Issue, IssueCode, IssueDetails, Severity};

use crate::archive::suffix;
use crate::error::{ModelError, ScannerInitError};
use crate::model::{ContextKey, Model};
use crate::scanner::{ModelScanner, ScanResults};

/// 메모리로 읽을 최대 바이트 수 옵션 이름
pub const MAX_SIZE_OPTION: &str = "max_size";

/// 프로토콜 번호를 기록하는 컨텍스트 키
pub const PROTOCOL_CONTEXT_KEY: &str = "pickle_protocol";

/// `STACK_GLOBAL` 인자를 복원하지 못했을 때의 심각도
const UNRESOLVED_SEVERITY: Severity = Severity::Medium;

const UNKNOWN: &str = "unknown";

/// pickle 스캐너
#[derive(Debug, Clone)]
pub struct PickleScanner {
    extensions: Vec<String>,
    unsafe_globals: UnsafeGlobals,
    max_size: u64,
}

impl PickleScanner {
    /// 확장자와 위험 테이블로 스캐너를 생성합니다.
    pub fn new(extensions: Vec<String>, unsafe_globals: UnsafeGlobals) -> Self {
        Self {
            extensions,
            unsafe_globals,
            max_size: DEFAULT_MAX_TARGET_SIZE,
        }
    }

    /// 메모리로 읽을 최대 바이트 수를 지정합니다.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    /// 설정으로부터 스캐너를 생성합니다.
    pub fn from_settings(settings: &ScannerSettings) -> Result<Self, ScannerInitError> {
        let unsafe_globals = UnsafeGlobals::from_options(&settings.id, &settings.options)?;
        if settings.supported_extensions.is_empty() {
            warn!(scanner = %settings.id, "pickle scanner has no supported extensions");
        }
        let max_size = max_size_option(settings)?;
        Ok(Self::new(settings.supported_extensions.clone(), unsafe_globals).with_max_size(max_size))
    }

    /// 위험 테이블을 반환합니다.
    pub fn unsafe_globals(&self) -> &UnsafeGlobals {
        &self.unsafe_globals
    }

    fn issue(&self, source: &Path, module: &str, name: &str, severity: Severity) -> Issue {
        let mut fields = Map::new();
        fields.insert("module".to_owned(), Value::String(module.to_owned()));
        fields.insert("operator".to_owned(), Value::String(name.to_owned()));

        Issue::new(
            IssueCode::UnsafeOperator,
            severity,
            IssueDetails {
                description: format!("Use of unsafe operator '{name}' from module '{module}'"),
                source: source.to_path_buf(),
                scanner: PICKLE_SCANNER_ID.to_owned(),
                fields,
            },
        )
    }

    fn issues_for(&self, source: &Path, globals: &[GlobalRef]) -> Vec<Issue> {
        globals
            .iter()
            .filter_map(|global| match global {
                GlobalRef::Resolved { module, name } => self
                    .unsafe_globals
                    .severity_of(module, name)
                    .map(|severity| self.issue(source, module, name, severity)),
                GlobalRef::Unresolved => {
                    Some(self.issue(source, UNKNOWN, UNKNOWN, UNRESOLVED_SEVERITY))
                }
            })
            .collect()
    }
}

fn max_size_option(settings: &ScannerSettings) -> Result<u64, ScannerInitError> {
    let Some(value) = settings.options.get(MAX_SIZE_OPTION) else {
        return Ok(DEFAULT_MAX_TARGET_SIZE);
    };
    match value.as_integer() {
        Some(size) if size > 0 => Ok(size as u64),
        _ => Err(ScannerInitError::InvalidOption {
            id: settings.id.clone(),
            option: MAX_SIZE_OPTION.to_owned(),
            reason: format!("expected a positive integer, got {value}"),
        }),
    }
}

/// 리포트에는 로케이터가 따로 기록되므로 메시지에서 경로를 뺍니다.
fn read_failure(err: ModelError) -> String {
    match err {
        ModelError::TooLarge { limit, .. } => format!("model data exceeds {limit} bytes"),
        ModelError::Io { source, .. } => format!("failed to read model: {source}"),
        other => other.to_string(),
    }
}

fn read_model(model: &mut Model<'_>, limit: u64) -> Result<Vec<u8>, ModelError> {
    let mut guard = model.open_scoped()?;
    guard.read_all(limit)
}

impl ModelScanner for PickleScanner {
    fn name(&self) -> &str {
        PICKLE_SCANNER_ID
    }

    fn full_name(&self) -> &str {
        "PickleUnsafeOpScan"
    }

    fn supported_extensions(&self) -> &[String] {
        &self.extensions
    }

    fn scan(&self, model: &mut Model<'_>) -> Option<ScanResults> {
        let ext = suffix(model.source())?;
        if !self.extensions.contains(&ext) {
            return None;
        }

        let source = model.source().to_path_buf();
        let data = match read_model(model, self.max_size) {
            Ok(data) => data,
            Err(e) => {
                return Some(ScanResults::with(
                    Vec::new(),
                    vec![ErrorRecord::scanner(PICKLE_SCANNER_ID, source, read_failure(e))],
                ));
            }
        };

        let outcome = genops(&data);
        model.context_mut().add_format("pickle");
        if let Some(protocol) = outcome.summary.protocol {
            model.set_context(
                ContextKey::Custom(PROTOCOL_CONTEXT_KEY.to_owned()),
                Value::from(protocol),
            );
        }

        let issues = self.issues_for(&source, &outcome.summary.globals);
        debug!(
            source = %source.display(),
            globals = outcome.summary.globals.len(),
            issues = issues.len(),
            "pickle stream analyzed"
        );

        let errors = outcome
            .error
            .map(|e| {
                ErrorRecord::scanner(
                    PICKLE_SCANNER_ID,
                    source.clone(),
                    format!("failed to parse pickle: {e}"),
                )
            })
            .into_iter()
            .collect();

        Some(ScanResults::with(issues, errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scanner() -> PickleScanner {
        PickleScanner::new(
            vec![".pkl".to_owned(), ".pickle".to_owned()],
            UnsafeGlobals::defaults(),
        )
    }

    #[test]
    fn ignores_unsupported_extension() {
        let mut cursor = Cursor::new(b"cos\nsystem\n.".to_vec());
        let mut model = Model::with_stream("model.bin", &mut cursor);
        assert!(scanner().scan(&mut model).is_none());
    }

    #[test]
    fn flags_os_system_as_critical() {
        let mut cursor = Cursor::new(b"cos\nsystem\n(S'id'\ntR.".to_vec());
        let mut model = Model::with_stream("archive.zip:evil.pkl", &mut cursor);

        let results = scanner().scan(&mut model).unwrap();
        assert!(results.errors.is_empty());
        assert_eq!(results.issues.len(), 1);

        let issue = &results.issues[0];
        assert_eq!(issue.severity, Severity::Critical);
        assert_eq!(issue.source(), Path::new("archive.zip:evil.pkl"));
        assert_eq!(
            issue.details.description,
            "Use of unsafe operator 'system' from module 'os'"
        );
        assert_eq!(issue.details.fields["module"], "os");
        assert_eq!(issue.details.fields["operator"], "system");
        assert_eq!(model.context().formats(), vec!["pickle"]);
    }

    #[test]
    fn safe_pickle_is_claimed_without_issues() {
        let mut cursor = Cursor::new(b"\x80\x02}q\x00.".to_vec());
        let mut model = Model::with_stream("weights.pkl", &mut cursor);

        let results = scanner().scan(&mut model).unwrap();
        assert!(results.is_clean());
        assert_eq!(
            model.get_context(&ContextKey::Custom(PROTOCOL_CONTEXT_KEY.to_owned())),
            Some(&Value::from(2))
        );
    }

    #[test]
    fn unresolved_stack_global_is_medium() {
        let mut cursor = Cursor::new(vec![0x80, 4, b'N', b'N', 0x93, b'.']);
        let mut model = Model::with_stream("m.pkl", &mut cursor);

        let results = scanner().scan(&mut model).unwrap();
        assert_eq!(results.issues.len(), 1);
        assert_eq!(results.issues[0].severity, Severity::Medium);
        assert_eq!(results.issues[0].details.fields["module"], "unknown");
    }

    #[test]
    fn parse_failure_is_a_claim_with_error() {
        let mut cursor = Cursor::new(b"not a pickle at all".to_vec());
        let mut model = Model::with_stream("broken.pkl", &mut cursor);

        let results = scanner().scan(&mut model).unwrap();
        assert!(results.issues.is_empty());
        assert_eq!(results.errors.len(), 1);
        assert!(results.errors[0].message.contains("failed to parse pickle"));
    }

    #[test]
    fn unreadable_file_is_a_claim_with_error() {
        let mut model = Model::new("/nonexistent/dir/model.pkl");
        let results = scanner().scan(&mut model).unwrap();
        assert_eq!(results.errors.len(), 1);
        assert!(results.errors[0].message.starts_with("failed to read model"));
        assert!(!results.errors[0].message.contains("/nonexistent"));
        assert!(!model.is_open());
    }

    #[test]
    fn owned_file_is_closed_after_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.pickle");
        std::fs::write(&path, b"cbuiltins\neval\n.").unwrap();

        let mut model = Model::new(&path);
        let results = scanner().scan(&mut model).unwrap();
        assert_eq!(results.issues.len(), 1);
        assert!(!model.is_open());
    }

    #[test]
    fn oversized_stream_is_a_claim_with_error() {
        let mut cursor = Cursor::new(b"cos\nsystem\n(S'id'\ntR.".to_vec());
        let mut model = Model::with_stream("big.pkl", &mut cursor);

        let results = scanner().with_max_size(8).scan(&mut model).unwrap();
        assert!(results.issues.is_empty());
        assert_eq!(results.errors.len(), 1);
        assert!(results.errors[0].message.contains("exceeds 8 bytes"));
    }

    #[test]
    fn from_settings_reads_max_size() {
        let mut options = toml::Table::new();
        options.insert(MAX_SIZE_OPTION.to_owned(), toml::Value::Integer(16));
        let settings = ScannerSettings {
            id: PICKLE_SCANNER_ID.to_owned(),
            enabled: true,
            supported_extensions: vec![".pkl".to_owned()],
            options,
        };
        let scanner = PickleScanner::from_settings(&settings).unwrap();
        assert_eq!(scanner.max_size, 16);

        let mut bad = settings.clone();
        bad.options
            .insert(MAX_SIZE_OPTION.to_owned(), toml::Value::Integer(0));
        assert!(matches!(
            PickleScanner::from_settings(&bad),
            Err(ScannerInitError::InvalidOption { .. })
        ));
    }

    #[test]
    fn from_settings_rejects_invalid_option() {
        let mut options = toml::Table::new();
        options.insert(
            UNSAFE_GLOBALS_OPTION.to_owned(),
            toml::Value::String("nope".to_owned()),
        );
        let settings = ScannerSettings {
            id: PICKLE_SCANNER_ID.to_owned(),
            enabled: true,
            supported_extensions: vec![".pkl".to_owned()],
            options,
        };
        assert!(matches!(
            PickleScanner::from_settings(&settings),
            Err(ScannerInitError::InvalidOption { .. })
        ));
    }
}
