//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않은 경우 매크로는 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `modelscan_`
//! - 접미어: `_total` (counter)

use metrics::{Unit, describe_counter};

/// 심각도 레이블 키 (LOW, MEDIUM, HIGH, CRITICAL)
pub const LABEL_SEVERITY: &str = "severity";

/// 스캐너 레이블 키
pub const LABEL_SCANNER: &str = "scanner";

/// 스캐너가 처리한 대상 수 (counter)
pub const TARGETS_SCANNED_TOTAL: &str = "modelscan_targets_scanned_total";

/// 어떤 스캐너도 처리하지 않은 대상 수 (counter)
pub const TARGETS_SKIPPED_TOTAL: &str = "modelscan_targets_skipped_total";

/// 발견된 이슈 수 (counter, label: severity)
pub const ISSUES_FOUND_TOTAL: &str = "modelscan_issues_found_total";

/// 리포트에 기록된 에러 수 (counter)
pub const ERRORS_TOTAL: &str = "modelscan_errors_total";

/// 초기화에 실패한 스캐너 수 (counter, label: scanner)
pub const SCANNER_INIT_FAILURES_TOTAL: &str = "modelscan_scanner_init_failures_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 프로세스 시작 시 한 번 호출합니다. 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_metrics() {
    describe_counter!(
        TARGETS_SCANNED_TOTAL,
        Unit::Count,
        "Targets claimed by at least one scanner"
    );
    describe_counter!(
        TARGETS_SKIPPED_TOTAL,
        Unit::Count,
        "Targets no scanner claimed"
    );
    describe_counter!(
        ISSUES_FOUND_TOTAL,
        Unit::Count,
        "Issues reported by scanners"
    );
    describe_counter!(ERRORS_TOTAL, Unit::Count, "Errors recorded in scan reports");
    describe_counter!(
        SCANNER_INIT_FAILURES_TOTAL,
        Unit::Count,
        "Configured scanners that failed to initialize"
    );
}
