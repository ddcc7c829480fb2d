//! 스캐너 레지스트리: 설정으로부터 활성 스캐너 목록 생성
//!
//! 식별자 문자열로 코드를 동적으로 찾지 않습니다. 내장 스캐너는
//! [`ScannerRegistryBuilder::new`]가 정적 팩토리 테이블에 등록하고,
//! 임베더나 테스트는 [`ScannerRegistryBuilder::factory`]로 팩토리를 추가합니다.
//!
//! # 실패 격리
//!
//! 설정된 스캐너 하나가 생성에 실패해도 나머지 스캐너는 정상 로드됩니다.
//! 실패는 `init_errors`에 기록되어 매 스캔 리포트에 포함됩니다.
//!
//! ```text
//! config.scanners (순서대로)
//!   ├── enabled = false  → 무시
//!   ├── 팩토리 없음      → init error (Unknown)
//!   ├── 팩토리 실패      → init error (id 태그)
//!   └── 성공             → scanners.push()
//! ```

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, error, info};

use modelscan_core::config::{ModelScanConfig, PICKLE_SCANNER_ID, ScannerSettings};
use modelscan_core::metrics as m;
use modelscan_core::types::ErrorRecord;

use crate::error::ScannerInitError;
use crate::scanner::{ModelScanner, ScannerFactory};
use crate::scanners::pickle::PickleScanner;

/// 스캐너 레지스트리 빌더
pub struct ScannerRegistryBuilder {
    factories: HashMap<String, ScannerFactory>,
}

impl ScannerRegistryBuilder {
    /// 내장 스캐너 팩토리가 등록된 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::empty().factory(PICKLE_SCANNER_ID, |settings: &ScannerSettings| {
            PickleScanner::from_settings(settings)
                .map(|scanner| Box::new(scanner) as Box<dyn ModelScanner>)
        })
    }

    /// 팩토리가 하나도 없는 빌더를 생성합니다.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// 식별자에 팩토리를 등록합니다.
    ///
    /// 같은 식별자가 이미 있으면 새 팩토리로 교체합니다.
    pub fn factory<F>(mut self, id: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ScannerSettings) -> Result<Box<dyn ModelScanner>, ScannerInitError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
        self
    }

    /// 설정의 활성 스캐너를 순서대로 생성합니다.
    pub fn build(&self, config: &ModelScanConfig) -> ScannerRegistry {
        let mut scanners: Vec<Box<dyn ModelScanner>> = Vec::new();
        let mut init_errors = Vec::new();

        for settings in config.scanners.iter().filter(|s| s.enabled) {
            let result = match self.factories.get(&settings.id) {
                Some(factory) => factory(settings),
                None => Err(ScannerInitError::Unknown {
                    id: settings.id.clone(),
                }),
            };

            match result {
                Ok(scanner) => {
                    debug!(
                        scanner = %settings.id,
                        extensions = ?scanner.supported_extensions(),
                        "scanner loaded"
                    );
                    scanners.push(scanner);
                }
                Err(e) => {
                    error!(scanner = %settings.id, error = %e, "error loading scanner");
                    metrics::counter!(
                        m::SCANNER_INIT_FAILURES_TOTAL,
                        m::LABEL_SCANNER => settings.id.clone()
                    )
                    .increment(1);
                    init_errors.push(ErrorRecord::initialization(
                        settings.id.clone(),
                        e.to_string(),
                    ));
                }
            }
        }

        info!(
            loaded = scanners.len(),
            failed = init_errors.len(),
            "scanner registry built"
        );

        ScannerRegistry {
            scanners,
            init_errors,
        }
    }
}

impl Default for ScannerRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 생성된 스캐너 목록
///
/// 생성 이후 변경되지 않으며 여러 스캔에서 읽기 전용으로 공유됩니다.
/// 스캐너 순서가 디스패치 시 시도 순서입니다.
pub struct ScannerRegistry {
    scanners: Vec<Box<dyn ModelScanner>>,
    init_errors: Vec<ErrorRecord>,
}

impl ScannerRegistry {
    /// 내장 팩토리로 설정의 활성 스캐너를 생성합니다.
    pub fn from_config(config: &ModelScanConfig) -> Self {
        ScannerRegistryBuilder::new().build(config)
    }

    /// 스캐너 목록을 순서대로 반환합니다.
    pub fn scanners(&self) -> &[Box<dyn ModelScanner>] {
        &self.scanners
    }

    /// 초기화 실패 목록을 반환합니다.
    pub fn init_errors(&self) -> &[ErrorRecord] {
        &self.init_errors
    }

    /// 로드된 스캐너 수
    pub fn len(&self) -> usize {
        self.scanners.len()
    }

    /// 로드된 스캐너가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.scanners.is_empty()
    }

    /// 로드된 스캐너 이름 목록
    pub fn names(&self) -> Vec<&str> {
        self.scanners.iter().map(|s| s.name()).collect()
    }
}

impl fmt::Debug for ScannerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerRegistry")
            .field("scanners", &self.names())
            .field("init_errors", &self.init_errors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::scanner::ScanResults;
    use modelscan_core::types::ErrorKind;

    struct NamedScanner {
        name: String,
        extensions: Vec<String>,
    }

    impl ModelScanner for NamedScanner {
        fn name(&self) -> &str {
            &self.name
        }

        fn full_name(&self) -> &str {
            &self.name
        }

        fn supported_extensions(&self) -> &[String] {
            &self.extensions
        }

        fn scan(&self, _model: &mut Model<'_>) -> Option<ScanResults> {
            None
        }
    }

    fn named_factory(
        settings: &ScannerSettings,
    ) -> Result<Box<dyn ModelScanner>, ScannerInitError> {
        Ok(Box::new(NamedScanner {
            name: settings.id.clone(),
            extensions: settings.supported_extensions.clone(),
        }))
    }

    fn settings(id: &str, enabled: bool) -> ScannerSettings {
        ScannerSettings {
            id: id.to_owned(),
            enabled,
            supported_extensions: vec![".bin".to_owned()],
            options: toml::Table::new(),
        }
    }

    fn config_with(scanners: Vec<ScannerSettings>) -> ModelScanConfig {
        ModelScanConfig {
            scanners,
            ..Default::default()
        }
    }

    #[test]
    fn default_config_loads_pickle_scanner() {
        let registry = ScannerRegistry::from_config(&ModelScanConfig::default());
        assert_eq!(registry.names(), vec![PICKLE_SCANNER_ID]);
        assert!(registry.init_errors().is_empty());
    }

    #[test]
    fn keeps_config_order_and_skips_disabled() {
        let builder = ScannerRegistryBuilder::empty()
            .factory("b", named_factory)
            .factory("a", named_factory)
            .factory("c", named_factory);
        let config = config_with(vec![
            settings("b", true),
            settings("c", false),
            settings("a", true),
        ]);

        let registry = builder.build(&config);
        assert_eq!(registry.names(), vec!["b", "a"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_scanner_becomes_init_error() {
        let builder = ScannerRegistryBuilder::empty().factory("known", named_factory);
        let config = config_with(vec![settings("missing", true), settings("known", true)]);

        let registry = builder.build(&config);
        assert_eq!(registry.names(), vec!["known"]);
        assert_eq!(registry.init_errors().len(), 1);
        assert_eq!(
            registry.init_errors()[0].kind,
            ErrorKind::Initialization {
                scanner: "missing".to_owned()
            }
        );
    }

    #[test]
    fn failing_factory_does_not_block_others() {
        let builder = ScannerRegistryBuilder::empty()
            .factory("broken", |s: &ScannerSettings| {
                Err(ScannerInitError::Failed {
                    id: s.id.clone(),
                    reason: "boom".to_owned(),
                })
            })
            .factory("ok", named_factory);
        let config = config_with(vec![settings("broken", true), settings("ok", true)]);

        let registry = builder.build(&config);
        assert_eq!(registry.names(), vec!["ok"]);
        let record = &registry.init_errors()[0];
        assert!(record.message.contains("boom"));
        assert!(record.source.is_none());
    }

    #[test]
    fn disabled_unknown_scanner_is_ignored() {
        let registry = ScannerRegistryBuilder::empty()
            .build(&config_with(vec![settings("ghost", false)]));
        assert!(registry.is_empty());
        assert!(registry.init_errors().is_empty());
    }
}
