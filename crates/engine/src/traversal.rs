//! 탐색 엔진: 입력 경로를 방문 대상(리프)으로 분해
//!
//! 경로 하나에 대한 상태 전이:
//!
//! ```text
//! 존재하지 않음 ──────────────────────────> error + skipped
//! 존재함 ──> dispatch ──claimed──> scanned (디렉토리/아카이브로 보지 않음)
//!                  └──unclaimed──┬── 디렉토리 ──> 모든 비-디렉토리 자손에 대해 반복
//!                                ├── 아카이브 ──> 엔트리마다 dispatch (한 단계만)
//!                                └── 그 외    ──> skipped
//! ```
//!
//! 디렉토리 자손과 아카이브 엔트리는 파일시스템/아카이브가 돌려주는 순서대로
//! 방문하며 별도로 정렬하지 않습니다.

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use tracing::{debug, error, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

use modelscan_core::config::ModelScanConfig;
use modelscan_core::types::ErrorRecord;

use crate::archive::{entry_locator, is_archive_entry, is_archive_path};
use crate::dispatch::dispatch;
use crate::model::Model;
use crate::scanner::ModelScanner;
use crate::session::ScanSession;

/// 아카이브 엔트리 하나를 읽은 결과
enum EntryRead {
    Directory,
    TooLarge(String),
    Data(String, Vec<u8>),
}

/// 한 번의 탐색 동안 사용하는 컨텍스트
pub(crate) struct Traversal<'s> {
    config: &'s ModelScanConfig,
    scanners: &'s [Box<dyn ModelScanner>],
    session: &'s mut ScanSession,
}

impl<'s> Traversal<'s> {
    pub(crate) fn new(
        config: &'s ModelScanConfig,
        scanners: &'s [Box<dyn ModelScanner>],
        session: &'s mut ScanSession,
    ) -> Self {
        Self {
            config,
            scanners,
            session,
        }
    }

    /// 경로 하나를 처리합니다.
    pub(crate) fn scan_path(&mut self, path: &Path) {
        if !path.exists() {
            error!(path = %path.display(), "path is not valid");
            self.session
                .record_error(ErrorRecord::path(path, "path is not valid"));
            self.session.record_skipped(path);
            return;
        }

        let mut model = Model::new(path);
        if dispatch(self.scanners, &mut model, self.session) {
            return;
        }

        if path.is_dir() {
            self.scan_directory(path);
        } else if is_archive_path(path, self.config) {
            self.scan_zip(path);
        } else {
            self.session.record_skipped(path);
        }
    }

    fn scan_directory(&mut self, dir: &Path) {
        debug!(path = %dir.display(), "scanning directory");

        for entry in WalkDir::new(dir).min_depth(1) {
            match entry {
                Ok(entry) => {
                    // 심볼릭 링크가 가리키는 디렉토리도 대상이 아님
                    if entry.path().is_dir() {
                        continue;
                    }
                    self.scan_path(entry.path());
                }
                Err(e) => {
                    let failed = e.path().unwrap_or(dir).to_path_buf();
                    warn!(path = %failed.display(), error = %e, "failed to walk directory");
                    // walkdir 에러 메시지에는 절대 경로가 들어가므로 원인만 남김
                    let reason = match e.io_error() {
                        Some(io) => io.to_string(),
                        None => "file system loop detected".to_owned(),
                    };
                    self.session.record_error(ErrorRecord::path(
                        failed,
                        format!("failed to walk: {reason}"),
                    ));
                }
            }
        }
    }

    fn scan_zip(&mut self, path: &Path) {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                self.session.record_error(ErrorRecord::archive(
                    path,
                    format!("failed to open archive: {e}"),
                ));
                self.session.record_skipped(path);
                return;
            }
        };

        let mut archive = match ZipArchive::new(BufReader::new(file)) {
            Ok(archive) => archive,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping zip file, not a readable archive");
                self.session.record_skipped(path);
                return;
            }
        };

        let limit = self.config.max_target_size;
        for index in 0..archive.len() {
            let name = archive.name_for_index(index).map(str::to_owned);
            let read = archive.by_index(index).and_then(|entry| {
                if entry.is_dir() {
                    return Ok(EntryRead::Directory);
                }
                let entry_name = entry.name().to_owned();
                if entry.size() > limit {
                    return Ok(EntryRead::TooLarge(entry_name));
                }
                // 헤더의 크기 값은 신뢰할 수 없으므로 읽는 양도 제한
                let mut data = Vec::new();
                entry.take(limit.saturating_add(1)).read_to_end(&mut data)?;
                if data.len() as u64 > limit {
                    return Ok(EntryRead::TooLarge(entry_name));
                }
                Ok(EntryRead::Data(entry_name, data))
            });

            match (read, name) {
                (Ok(EntryRead::Data(entry_name, data)), _) => {
                    self.scan_entry(path, &entry_name, data)
                }
                (Ok(EntryRead::Directory), _) => {}
                (Ok(EntryRead::TooLarge(entry_name)), _) => {
                    let locator = entry_locator(path, &entry_name);
                    warn!(source = %locator.display(), limit, "archive entry is too large");
                    self.session.record_error(ErrorRecord::archive(
                        locator.clone(),
                        format!("archive entry exceeds {limit} bytes"),
                    ));
                    self.session.record_skipped(locator);
                }
                (Err(e), Some(entry_name)) => {
                    let locator = entry_locator(path, &entry_name);
                    warn!(source = %locator.display(), error = %e, "failed to read archive entry");
                    self.session.record_error(ErrorRecord::archive(
                        locator.clone(),
                        format!("failed to read archive entry: {e}"),
                    ));
                    self.session.record_skipped(locator);
                }
                (Err(e), None) => {
                    self.session.record_error(ErrorRecord::archive(
                        path,
                        format!("failed to read archive entry #{index}: {e}"),
                    ));
                }
            }
        }
    }

    fn scan_entry(&mut self, archive: &Path, name: &str, data: Vec<u8>) {
        let locator = entry_locator(archive, name);
        let mut cursor = Cursor::new(data);

        let claimed = {
            let mut model = Model::with_stream(locator.clone(), &mut cursor);
            dispatch(self.scanners, &mut model, self.session)
        };
        if claimed {
            return;
        }

        if is_archive_entry(cursor.get_ref()) {
            warn!(source = %locator.display(), "nested zip files are not supported");
            self.session
                .record_error(ErrorRecord::nested_archive(locator.clone()));
        }
        self.session.record_skipped(locator);
    }
}
