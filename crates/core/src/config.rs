//! 설정 관리: modelscan.toml 파싱 및 런타임 설정
//!
//! [`ModelScanConfig`]는 스캐너 레지스트리와 탐색 엔진이 읽는 최상위 구조체입니다.
//! 한 번 생성된 뒤에는 수정하지 않고 참조(`Arc`)로 공유합니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`MODELSCAN_GENERAL_LOG_LEVEL=debug` 형식)
//! 3. 설정 파일 (`modelscan.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), modelscan_core::error::ModelScanError> {
//! use modelscan_core::config::ModelScanConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ModelScanConfig::load("modelscan.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ModelScanConfig::parse("supported_zip_extensions = [\".zip\"]")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ModelScanError};

/// 기본 pickle 스캐너 식별자
pub const PICKLE_SCANNER_ID: &str = "pickle";

/// 아카이브 엔트리 하나를 메모리에 올릴 수 있는 기본 최대 크기 (1 GiB)
pub const DEFAULT_MAX_TARGET_SIZE: u64 = 1 << 30;

/// modelscan 통합 설정
///
/// `modelscan.toml` 파일의 최상위 구조를 나타냅니다.
///
/// ```toml
/// supported_zip_extensions = [".zip", ".npz"]
/// max_target_size = 1073741824
///
/// [general]
/// log_level = "info"
///
/// [[scanners]]
/// id = "pickle"
/// enabled = true
/// supported_extensions = [".pkl", ".pickle"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelScanConfig {
    /// 아카이브로 취급할 확장자 목록
    pub supported_zip_extensions: Vec<String>,
    /// 아카이브 엔트리 최대 크기 (바이트). 넘는 엔트리는 읽지 않고 에러로 기록합니다.
    pub max_target_size: u64,
    /// 일반 설정
    pub general: GeneralConfig,
    /// 스캐너별 설정 (파일에 적힌 순서가 실행 순서)
    pub scanners: Vec<ScannerSettings>,
}

impl Default for ModelScanConfig {
    fn default() -> Self {
        Self {
            supported_zip_extensions: vec![".zip".to_owned(), ".npz".to_owned()],
            max_target_size: DEFAULT_MAX_TARGET_SIZE,
            general: GeneralConfig::default(),
            scanners: vec![ScannerSettings {
                id: PICKLE_SCANNER_ID.to_owned(),
                enabled: true,
                supported_extensions: [".pkl", ".pickle", ".joblib", ".dat", ".data"]
                    .iter()
                    .map(|ext| (*ext).to_owned())
                    .collect(),
                options: toml::Table::new(),
            }],
        }
    }
}

impl ModelScanConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ModelScanError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelScanError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ModelScanError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ModelScanError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ModelScanError> {
        toml::from_str(toml_str).map_err(|e| {
            ModelScanError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `MODELSCAN_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "MODELSCAN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "MODELSCAN_GENERAL_LOG_FORMAT");
        override_csv(
            &mut self.supported_zip_extensions,
            "MODELSCAN_SUPPORTED_ZIP_EXTENSIONS",
        );
        override_parse(&mut self.max_target_size, "MODELSCAN_MAX_TARGET_SIZE");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ModelScanError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        validate_extensions("supported_zip_extensions", &self.supported_zip_extensions)?;

        if self.max_target_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_target_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for scanner in &self.scanners {
            if scanner.id.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "scanners.id".to_owned(),
                    reason: "scanner id must not be empty".to_owned(),
                }
                .into());
            }
            if !seen.insert(scanner.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "scanners.id".to_owned(),
                    reason: format!("duplicate scanner id '{}'", scanner.id),
                }
                .into());
            }
            validate_extensions(
                &format!("scanners.{}.supported_extensions", scanner.id),
                &scanner.supported_extensions,
            )?;
        }

        Ok(())
    }

    /// 확장자가 아카이브 확장자 목록에 포함되는지 확인합니다.
    ///
    /// `ext`는 `.zip`처럼 점을 포함한 형태입니다.
    pub fn is_zip_extension(&self, ext: &str) -> bool {
        self.supported_zip_extensions.iter().any(|e| e == ext)
    }
}

fn validate_extensions(field: &str, extensions: &[String]) -> Result<(), ModelScanError> {
    for ext in extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ConfigError::InvalidValue {
                field: field.to_owned(),
                reason: format!("extension '{ext}' must start with '.'"),
            }
            .into());
        }
    }
    Ok(())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 개별 스캐너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// 스캐너 식별자
    pub id: String,
    /// 활성화 여부
    #[serde(default)]
    pub enabled: bool,
    /// 이 스캐너가 처리하는 확장자 목록
    #[serde(default)]
    pub supported_extensions: Vec<String>,
    /// 스캐너 고유 옵션
    #[serde(default)]
    pub options: toml::Table,
}

impl ScannerSettings {
    /// 경로의 확장자가 이 스캐너의 지원 확장자인지 확인합니다.
    pub fn supports_extension(&self, ext: &str) -> bool {
        self.supported_extensions.iter().any(|e| e == ext)
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parse<T: std::str::FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(env_key, value = %val, "invalid value in env var, ignoring"),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        let values: Vec<String> = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
        if values.is_empty() {
            warn!(env_key, "empty list in env var, ignoring");
            return;
        }
        *target = values;
    }
}
