//! 디스패치: 하나의 방문 대상을 모든 스캐너에 순서대로 제공

use tracing::info;

use crate::model::Model;
use crate::scanner::ModelScanner;
use crate::session::ScanSession;

/// 대상을 등록된 모든 스캐너에 제공합니다.
///
/// 첫 클레임에서 멈추지 않고 모든 스캐너를 시도하며, 클레임한 스캐너들의
/// 결과를 모두 병합합니다. 하나 이상 클레임하면 대상을 한 번 `scanned`로
/// 기록하고 `true`를 반환합니다. 모델이 직접 연 스트림은 반환 전에 닫힙니다.
pub fn dispatch(
    scanners: &[Box<dyn ModelScanner>],
    model: &mut Model<'_>,
    session: &mut ScanSession,
) -> bool {
    let mut claimed = false;

    for scanner in scanners {
        if let Some(results) = scanner.scan(model) {
            info!(
                source = %model.source().display(),
                scanner = scanner.full_name(),
                issues = results.issues.len(),
                errors = results.errors.len(),
                "scanned target"
            );
            session.merge(results);
            claimed = true;
        }
    }
    model.close();

    if claimed {
        session.record_scanned(model.source());
    }
    claimed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanResults;
    use modelscan_core::types::{ErrorRecord, Issue, IssueCode, IssueDetails, Severity};
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    /// 확장자가 맞으면 이슈 하나를 보고하는 테스트 스캐너
    struct SuffixScanner {
        name: &'static str,
        extensions: Vec<String>,
    }

    impl SuffixScanner {
        fn new(name: &'static str, ext: &str) -> Box<dyn ModelScanner> {
            Box::new(Self {
                name,
                extensions: vec![ext.to_owned()],
            })
        }
    }

    impl ModelScanner for SuffixScanner {
        fn name(&self) -> &str {
            self.name
        }

        fn full_name(&self) -> &str {
            self.name
        }

        fn supported_extensions(&self) -> &[String] {
            &self.extensions
        }

        fn scan(&self, model: &mut Model<'_>) -> Option<ScanResults> {
            let ext = crate::archive::suffix(model.source())?;
            if !self.extensions.contains(&ext) {
                return None;
            }
            let issue = Issue::new(
                IssueCode::UnsafeOperator,
                Severity::High,
                IssueDetails {
                    description: format!("flagged by {}", self.name),
                    source: model.source().to_path_buf(),
                    scanner: self.name.to_owned(),
                    fields: Default::default(),
                },
            );
            Some(ScanResults::with(vec![issue], Vec::new()))
        }
    }

    /// 대상을 열어 읽기만 하고 결과를 비워 클레임하는 스캐너
    struct OpeningScanner;

    impl ModelScanner for OpeningScanner {
        fn name(&self) -> &str {
            "opening"
        }

        fn full_name(&self) -> &str {
            "opening"
        }

        fn supported_extensions(&self) -> &[String] {
            &[]
        }

        fn scan(&self, model: &mut Model<'_>) -> Option<ScanResults> {
            if let Err(e) = model.open() {
                return Some(ScanResults::with(
                    Vec::new(),
                    vec![ErrorRecord::scanner("opening", model.source(), e.to_string())],
                ));
            }
            Some(ScanResults::new())
        }
    }

    #[test]
    fn every_scanner_is_tried_and_target_recorded_once() {
        let scanners = vec![
            SuffixScanner::new("first", ".bin"),
            SuffixScanner::new("second", ".bin"),
        ];
        let mut session = ScanSession::default();
        let mut model = Model::new("/m/weights.bin");

        assert!(dispatch(&scanners, &mut model, &mut session));
        assert_eq!(session.all_issues().len(), 2);
        assert_eq!(session.scanned(), &[PathBuf::from("/m/weights.bin")]);
    }

    #[test]
    fn unclaimed_target_is_not_recorded() {
        let scanners = vec![SuffixScanner::new("first", ".pkl")];
        let mut session = ScanSession::default();
        let mut model = Model::new("/m/notes.txt");

        assert!(!dispatch(&scanners, &mut model, &mut session));
        assert!(session.scanned().is_empty());
        assert!(session.skipped().is_empty());
    }

    #[test]
    fn owned_stream_is_closed_after_dispatch() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let scanners: Vec<Box<dyn ModelScanner>> = vec![Box::new(OpeningScanner)];
        let mut session = ScanSession::default();
        let mut model = Model::new(file.path());

        assert!(dispatch(&scanners, &mut model, &mut session));
        assert!(!model.is_open());
        assert!(session.errors().is_empty());
    }

    #[test]
    fn borrowed_stream_survives_dispatch() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        let scanners: Vec<Box<dyn ModelScanner>> = vec![Box::new(OpeningScanner)];
        let mut session = ScanSession::default();
        let mut model = Model::with_stream(Path::new("a.zip:b"), &mut cursor);

        assert!(dispatch(&scanners, &mut model, &mut session));
        assert!(model.is_open());
    }
}
