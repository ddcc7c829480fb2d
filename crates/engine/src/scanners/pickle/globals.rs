//! 위험 전역 참조 테이블
//!
//! 심각도별로 `module -> 이름 목록 | "*"`를 가집니다. `"*"`는 모듈의 모든 이름과
//! 하위 모듈(`os.path` 등)의 모든 이름에 해당합니다.
//!
//! 설정의 `unsafe_globals` 옵션이 있으면 기본 테이블 대신 사용합니다.
//!
//! ```toml
//! [scanners.options.unsafe_globals.CRITICAL]
//! os = "*"
//! builtins = ["eval", "exec"]
//! ```

use std::collections::{BTreeMap, BTreeSet};

use modelscan_core::types::Severity;

use crate::error::ScannerInitError;

/// 옵션 키
pub const UNSAFE_GLOBALS_OPTION: &str = "unsafe_globals";

/// 모듈 내 위험 이름
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeniedNames {
    /// 모듈 전체
    All,
    /// 지정한 이름만
    Names(BTreeSet<String>),
}

impl DeniedNames {
    fn names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self::Names(names.into_iter().map(str::to_owned).collect())
    }

    fn contains(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Names(names) => {
                names.contains(name)
                    || name
                        .split_once('.')
                        .is_some_and(|(head, _)| names.contains(head))
            }
        }
    }
}

/// 심각도별 위험 전역 참조 테이블
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsafeGlobals {
    by_severity: BTreeMap<Severity, BTreeMap<String, DeniedNames>>,
}

const BUILTIN_NAMES: [&str; 7] = [
    "eval",
    "exec",
    "compile",
    "open",
    "__import__",
    "getattr",
    "breakpoint",
];

impl UnsafeGlobals {
    /// 빈 테이블을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기본 테이블
    pub fn defaults() -> Self {
        let mut table = Self::new();

        for module in ["builtins", "__builtin__", "__builtins__"] {
            table.insert(
                Severity::Critical,
                module,
                DeniedNames::names(BUILTIN_NAMES),
            );
        }
        for module in [
            "os",
            "posix",
            "nt",
            "subprocess",
            "sys",
            "socket",
            "runpy",
            "shutil",
            "pty",
            "pickle",
            "_pickle",
            "webbrowser",
        ] {
            table.insert(Severity::Critical, module, DeniedNames::All);
        }
        table.insert(
            Severity::Critical,
            "operator",
            DeniedNames::names(["attrgetter"]),
        );

        for module in ["httplib", "requests", "aiohttp"] {
            table.insert(Severity::High, module, DeniedNames::All);
        }

        table
    }

    /// 스캐너 옵션에서 테이블을 읽습니다.
    ///
    /// `unsafe_globals` 키가 없으면 기본 테이블을 반환합니다.
    pub fn from_options(id: &str, options: &toml::Table) -> Result<Self, ScannerInitError> {
        let Some(value) = options.get(UNSAFE_GLOBALS_OPTION) else {
            return Ok(Self::defaults());
        };

        let invalid = |reason: String| ScannerInitError::InvalidOption {
            id: id.to_owned(),
            option: UNSAFE_GLOBALS_OPTION.to_owned(),
            reason,
        };

        let severities = value
            .as_table()
            .ok_or_else(|| invalid("expected a table keyed by severity".to_owned()))?;

        let mut table = Self::new();
        for (severity_key, modules) in severities {
            let severity = Severity::from_str_loose(severity_key)
                .ok_or_else(|| invalid(format!("unknown severity '{severity_key}'")))?;
            let modules = modules.as_table().ok_or_else(|| {
                invalid(format!("'{severity_key}' must be a table of module names"))
            })?;

            for (module, names) in modules {
                let denied = match names {
                    toml::Value::String(s) if s == "*" => DeniedNames::All,
                    toml::Value::Array(items) => {
                        let mut set = BTreeSet::new();
                        for item in items {
                            let name = item.as_str().ok_or_else(|| {
                                invalid(format!("'{module}' entries must be strings"))
                            })?;
                            set.insert(name.to_owned());
                        }
                        DeniedNames::Names(set)
                    }
                    _ => {
                        return Err(invalid(format!(
                            "'{module}' must be \"*\" or an array of names"
                        )));
                    }
                };
                table.insert(severity, module, denied);
            }
        }

        Ok(table)
    }

    /// 항목을 추가합니다. 같은 심각도의 같은 모듈은 교체됩니다.
    pub fn insert(&mut self, severity: Severity, module: impl Into<String>, names: DeniedNames) {
        self.by_severity
            .entry(severity)
            .or_default()
            .insert(module.into(), names);
    }

    /// 전역 참조의 심각도를 반환합니다.
    ///
    /// 여러 심각도에 걸리면 가장 높은 심각도입니다.
    pub fn severity_of(&self, module: &str, name: &str) -> Option<Severity> {
        self.by_severity
            .iter()
            .rev()
            .find(|(_, modules)| matches_module(modules, module, name))
            .map(|(severity, _)| *severity)
    }

    /// 등록된 모듈 수 (모든 심각도 합계)
    pub fn len(&self) -> usize {
        self.by_severity.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches_module(modules: &BTreeMap<String, DeniedNames>, module: &str, name: &str) -> bool {
    if modules.get(module).is_some_and(|denied| denied.contains(name)) {
        return true;
    }

    // 하위 모듈은 상위 모듈이 "*"인 경우에만 해당
    let mut parent = module;
    while let Some((head, _)) = parent.rsplit_once('.') {
        if matches!(modules.get(head), Some(DeniedNames::All)) {
            return true;
        }
        parent = head;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(toml_str: &str) -> toml::Table {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn defaults_cover_common_payloads() {
        let table = UnsafeGlobals::defaults();
        assert_eq!(table.severity_of("os", "system"), Some(Severity::Critical));
        assert_eq!(table.severity_of("posix", "system"), Some(Severity::Critical));
        assert_eq!(table.severity_of("builtins", "eval"), Some(Severity::Critical));
        assert_eq!(table.severity_of("requests", "get"), Some(Severity::High));
        assert_eq!(table.severity_of("builtins", "len"), None);
        assert_eq!(table.severity_of("collections", "OrderedDict"), None);
        assert_eq!(table.severity_of("numpy.core.multiarray", "_reconstruct"), None);
    }

    #[test]
    fn wildcard_matches_submodules() {
        let table = UnsafeGlobals::defaults();
        assert_eq!(table.severity_of("os.path", "join"), Some(Severity::Critical));
        assert_eq!(table.severity_of("requests.api", "get"), Some(Severity::High));
        // operator은 이름 목록이므로 하위 모듈에 적용되지 않음
        assert_eq!(table.severity_of("operator.sub", "attrgetter"), None);
        assert_eq!(table.severity_of("osx", "anything"), None);
    }

    #[test]
    fn dotted_name_matches_head() {
        let table = UnsafeGlobals::defaults();
        assert_eq!(
            table.severity_of("builtins", "getattr.__call__"),
            Some(Severity::Critical)
        );
    }

    #[test]
    fn highest_severity_wins() {
        let mut table = UnsafeGlobals::new();
        table.insert(Severity::Low, "pkg", DeniedNames::All);
        table.insert(Severity::High, "pkg", DeniedNames::names(["danger"]));
        assert_eq!(table.severity_of("pkg", "danger"), Some(Severity::High));
        assert_eq!(table.severity_of("pkg", "other"), Some(Severity::Low));
    }

    #[test]
    fn missing_option_uses_defaults() {
        let table = UnsafeGlobals::from_options("pickle", &toml::Table::new()).unwrap();
        assert_eq!(table, UnsafeGlobals::defaults());
    }

    #[test]
    fn option_replaces_defaults() {
        let table = UnsafeGlobals::from_options(
            "pickle",
            &options(
                r#"
                [unsafe_globals.MEDIUM]
                custom = ["load"]
                [unsafe_globals.critical]
                evil = "*"
                "#,
            ),
        )
        .unwrap();
        assert_eq!(table.severity_of("custom", "load"), Some(Severity::Medium));
        assert_eq!(table.severity_of("evil", "x"), Some(Severity::Critical));
        assert_eq!(table.severity_of("os", "system"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn option_rejects_unknown_severity() {
        let err = UnsafeGlobals::from_options(
            "pickle",
            &options("[unsafe_globals.SEVERE]\nos = \"*\""),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown severity 'SEVERE'"));
    }

    #[test]
    fn option_rejects_bad_entry_shapes() {
        for bad in [
            "unsafe_globals = 3",
            "[unsafe_globals]\nHIGH = 1",
            "[unsafe_globals.HIGH]\nos = \"system\"",
            "[unsafe_globals.HIGH]\nos = [1, 2]",
        ] {
            let result = UnsafeGlobals::from_options("pickle", &options(bad));
            assert!(
                matches!(result, Err(ScannerInitError::InvalidOption { .. })),
                "accepted: {bad}"
            );
        }
    }
}
