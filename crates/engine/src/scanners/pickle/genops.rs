//! pickle opcode 워커
//!
//! 바이트 스트림을 실행하지 않고 opcode만 순회하여 전역 참조(import)를 수집합니다.
//! 프로토콜 0~5를 지원하며, 하나의 스트림에 여러 pickle이 연달아 있을 수 있습니다.
//!
//! # 전역 참조를 만드는 opcode
//!
//! - `GLOBAL` (`c`), `INST` (`i`): 인자로 `module\nname\n`을 가짐
//! - `STACK_GLOBAL` (0x93): 스택의 문자열 두 개를 사용. 직전 opcode를
//!   거슬러 올라가며 문자열 opcode와 memo 조회(`GET`)로 값을 복원함

use std::collections::{HashMap, HashSet};

use tracing::debug;

// --- opcode 상수 ---

const MARK: u8 = b'(';
const STOP: u8 = b'.';
const POP: u8 = b'0';
const POP_MARK: u8 = b'1';
const DUP: u8 = b'2';
const FLOAT: u8 = b'F';
const INT: u8 = b'I';
const BININT: u8 = b'J';
const BININT1: u8 = b'K';
const LONG: u8 = b'L';
const BININT2: u8 = b'M';
const NONE: u8 = b'N';
const PERSID: u8 = b'P';
const BINPERSID: u8 = b'Q';
const REDUCE: u8 = b'R';
const STRING: u8 = b'S';
const BINSTRING: u8 = b'T';
const SHORT_BINSTRING: u8 = b'U';
const UNICODE: u8 = b'V';
const BINUNICODE: u8 = b'X';
const APPEND: u8 = b'a';
const BUILD: u8 = b'b';
const GLOBAL: u8 = b'c';
const DICT: u8 = b'd';
const EMPTY_DICT: u8 = b'}';
const APPENDS: u8 = b'e';
const GET: u8 = b'g';
const BINGET: u8 = b'h';
const INST: u8 = b'i';
const LONG_BINGET: u8 = b'j';
const LIST: u8 = b'l';
const EMPTY_LIST: u8 = b']';
const OBJ: u8 = b'o';
const PUT: u8 = b'p';
const BINPUT: u8 = b'q';
const LONG_BINPUT: u8 = b'r';
const SETITEM: u8 = b's';
const TUPLE: u8 = b't';
const EMPTY_TUPLE: u8 = b')';
const SETITEMS: u8 = b'u';
const BINFLOAT: u8 = b'G';

// protocol 2
const PROTO: u8 = 0x80;
const NEWOBJ: u8 = 0x81;
const EXT1: u8 = 0x82;
const EXT2: u8 = 0x83;
const EXT4: u8 = 0x84;
const TUPLE1: u8 = 0x85;
const TUPLE2: u8 = 0x86;
const TUPLE3: u8 = 0x87;
const NEWTRUE: u8 = 0x88;
const NEWFALSE: u8 = 0x89;
const LONG1: u8 = 0x8a;
const LONG4: u8 = 0x8b;

// protocol 3
const BINBYTES: u8 = b'B';
const SHORT_BINBYTES: u8 = b'C';

// protocol 4
const SHORT_BINUNICODE: u8 = 0x8c;
const BINUNICODE8: u8 = 0x8d;
const BINBYTES8: u8 = 0x8e;
const EMPTY_SET: u8 = 0x8f;
const ADDITEMS: u8 = 0x90;
const FROZENSET: u8 = 0x91;
const NEWOBJ_EX: u8 = 0x92;
const STACK_GLOBAL: u8 = 0x93;
const MEMOIZE: u8 = 0x94;
const FRAME: u8 = 0x95;

// protocol 5
const BYTEARRAY8: u8 = 0x96;
const NEXT_BUFFER: u8 = 0x97;
const READONLY_BUFFER: u8 = 0x98;

/// pickle 파싱 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PickleError {
    /// 입력이 비어 있음
    #[error("empty pickle stream")]
    Empty,

    /// opcode 또는 인자를 읽는 중 데이터가 끝남
    #[error("truncated pickle stream at offset {offset}")]
    Truncated { offset: usize },

    /// 알 수 없는 opcode
    #[error("unknown opcode 0x{opcode:02x} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    /// 인자 형식이 잘못됨
    #[error("invalid argument for opcode 0x{opcode:02x} at offset {offset}: {reason}")]
    InvalidArgument {
        opcode: u8,
        offset: usize,
        reason: String,
    },
}

/// 수집된 전역 참조
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GlobalRef {
    /// 모듈과 이름을 알아낸 참조
    Resolved { module: String, name: String },
    /// `STACK_GLOBAL`의 인자를 복원하지 못함
    Unresolved,
}

impl GlobalRef {
    fn resolved(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Resolved {
            module: module.into(),
            name: name.into(),
        }
    }
}

/// 순회 결과
#[derive(Debug, Clone, Default)]
pub struct PickleSummary {
    /// 처음 발견된 순서대로 중복 없이 나열한 전역 참조
    pub globals: Vec<GlobalRef>,
    /// 첫 `PROTO` opcode의 프로토콜 번호
    pub protocol: Option<u8>,
    /// 끝까지(`STOP`) 읽은 pickle 수
    pub pickles: usize,
    seen: HashSet<GlobalRef>,
}

impl PickleSummary {
    fn record(&mut self, global: GlobalRef) {
        if self.seen.insert(global.clone()) {
            self.globals.push(global);
        }
    }
}

/// 순회 결과와 (있다면) 첫 pickle을 읽지 못한 에러
#[derive(Debug, Clone)]
pub struct GenopsOutcome {
    pub summary: PickleSummary,
    pub error: Option<PickleError>,
}

/// opcode 인자
#[derive(Debug, Clone)]
enum Arg {
    None,
    Int(u64),
    Str(String),
    Other,
}

#[derive(Debug, Clone)]
struct Op {
    code: u8,
    arg: Arg,
}

struct Reader<'d> {
    data: &'d [u8],
    pos: usize,
}

impl<'d> Reader<'d> {
    fn new(data: &'d [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn truncated(&self) -> PickleError {
        PickleError::Truncated { offset: self.pos }
    }

    fn byte(&mut self) -> Result<u8, PickleError> {
        let b = *self.data.get(self.pos).ok_or_else(|| self.truncated())?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'d [u8], PickleError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.truncated())?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn uint(&mut self, n: usize) -> Result<u64, PickleError> {
        let bytes = self.take(n)?;
        Ok(bytes
            .iter()
            .rev()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    fn sized(&mut self, len_bytes: usize) -> Result<&'d [u8], PickleError> {
        let len = self.uint(len_bytes)?;
        let len = usize::try_from(len).map_err(|_| self.truncated())?;
        self.take(len)
    }

    /// `\n`까지 읽고 개행 문자는 제외하여 반환합니다.
    fn line(&mut self) -> Result<&'d [u8], PickleError> {
        let data = self.data;
        let rest = &data[self.pos.min(data.len())..];
        let newline = rest
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| self.truncated())?;
        let line = &rest[..newline];
        self.pos += newline + 1;
        Ok(line)
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// protocol 0 `STRING` 인자의 따옴표를 제거합니다.
fn unquote(bytes: &[u8]) -> String {
    let s = lossy(bytes);
    for quote in ['\'', '"'] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return s[1..s.len() - 1].to_owned();
        }
    }
    s
}

fn decimal(opcode: u8, offset: usize, bytes: &[u8]) -> Result<u64, PickleError> {
    lossy(bytes)
        .trim()
        .parse::<u64>()
        .map_err(|e| PickleError::InvalidArgument {
            opcode,
            offset,
            reason: e.to_string(),
        })
}

/// 데이터 전체를 순회합니다.
///
/// 첫 pickle을 끝까지 읽지 못하면 그때까지 수집한 결과와 함께 에러를 반환합니다.
/// 하나 이상 읽은 뒤의 잘못된 데이터는 무시합니다.
pub fn genops(data: &[u8]) -> GenopsOutcome {
    let mut summary = PickleSummary::default();
    if data.is_empty() {
        return GenopsOutcome {
            summary,
            error: Some(PickleError::Empty),
        };
    }

    let mut reader = Reader::new(data);
    while !reader.at_end() {
        let start = reader.pos;
        match walk_one(&mut reader, &mut summary) {
            Ok(()) => summary.pickles += 1,
            Err(e) if summary.pickles == 0 => {
                return GenopsOutcome {
                    summary,
                    error: Some(e),
                };
            }
            Err(e) => {
                debug!(offset = start, error = %e, "ignoring trailing data after last pickle");
                break;
            }
        }
    }

    GenopsOutcome {
        summary,
        error: None,
    }
}

fn walk_one(reader: &mut Reader<'_>, summary: &mut PickleSummary) -> Result<(), PickleError> {
    let mut ops: Vec<Op> = Vec::new();
    let mut memo: HashMap<u64, Option<String>> = HashMap::new();

    loop {
        let offset = reader.pos;
        let code = reader.byte()?;
        let arg = match code {
            MARK | STOP | POP | POP_MARK | DUP | NONE | BINPERSID | REDUCE | APPEND | BUILD
            | DICT | EMPTY_DICT | APPENDS | LIST | EMPTY_LIST | OBJ | SETITEM | TUPLE
            | EMPTY_TUPLE | SETITEMS | NEWOBJ | TUPLE1 | TUPLE2 | TUPLE3 | NEWTRUE | NEWFALSE
            | EMPTY_SET | ADDITEMS | FROZENSET | NEWOBJ_EX | STACK_GLOBAL | MEMOIZE
            | NEXT_BUFFER | READONLY_BUFFER => Arg::None,

            FLOAT | INT | LONG | PERSID => {
                reader.line()?;
                Arg::Other
            }
            STRING => Arg::Str(unquote(reader.line()?)),
            UNICODE => Arg::Str(lossy(reader.line()?)),
            GET | PUT => Arg::Int(decimal(code, offset, reader.line()?)?),

            BININT1 | EXT1 => {
                reader.take(1)?;
                Arg::Other
            }
            BININT2 | EXT2 => {
                reader.take(2)?;
                Arg::Other
            }
            BININT | EXT4 => {
                reader.take(4)?;
                Arg::Other
            }
            BINFLOAT | FRAME => {
                reader.take(8)?;
                Arg::Other
            }

            PROTO => {
                let proto = reader.byte()?;
                summary.protocol.get_or_insert(proto);
                Arg::Int(u64::from(proto))
            }
            BINGET | BINPUT => Arg::Int(reader.uint(1)?),
            LONG_BINGET | LONG_BINPUT => Arg::Int(reader.uint(4)?),

            SHORT_BINSTRING | SHORT_BINUNICODE => Arg::Str(lossy(reader.sized(1)?)),
            BINSTRING | BINUNICODE => Arg::Str(lossy(reader.sized(4)?)),
            BINUNICODE8 => Arg::Str(lossy(reader.sized(8)?)),

            SHORT_BINBYTES | LONG1 => {
                reader.sized(1)?;
                Arg::Other
            }
            BINBYTES | LONG4 => {
                reader.sized(4)?;
                Arg::Other
            }
            BINBYTES8 | BYTEARRAY8 => {
                reader.sized(8)?;
                Arg::Other
            }

            GLOBAL | INST => {
                let module = lossy(reader.line()?);
                let name = lossy(reader.line()?);
                summary.record(GlobalRef::resolved(module.trim(), name.trim()));
                Arg::Other
            }

            _ => return Err(PickleError::UnknownOpcode { opcode: code, offset }),
        };

        match code {
            STOP => return Ok(()),
            STACK_GLOBAL => {
                let global = resolve_stack_global(&ops, &memo)
                    .map(|(module, name)| GlobalRef::resolved(module, name))
                    .unwrap_or(GlobalRef::Unresolved);
                summary.record(global);
            }
            PUT | BINPUT | LONG_BINPUT => {
                if let Arg::Int(index) = arg {
                    memo.insert(index, top_string(&ops, &memo));
                }
            }
            MEMOIZE => {
                let index = memo.len() as u64;
                memo.insert(index, top_string(&ops, &memo));
            }
            _ => {}
        }

        ops.push(Op { code, arg });
    }
}

/// 직전 opcode가 남긴 문자열 값 (문자열 opcode 또는 문자열 memo 조회)
fn top_string(ops: &[Op], memo: &HashMap<u64, Option<String>>) -> Option<String> {
    let op = ops.last()?;
    match (op.code, &op.arg) {
        (GET | BINGET | LONG_BINGET, Arg::Int(index)) => memo.get(index).cloned().flatten(),
        (_, Arg::Str(s)) => Some(s.clone()),
        _ => None,
    }
}

/// `STACK_GLOBAL` 직전의 문자열 두 개를 (module, name)으로 복원합니다.
fn resolve_stack_global(
    ops: &[Op],
    memo: &HashMap<u64, Option<String>>,
) -> Option<(String, String)> {
    let mut values: Vec<String> = Vec::with_capacity(2);

    for op in ops.iter().rev() {
        match (op.code, &op.arg) {
            (PUT | BINPUT | LONG_BINPUT | MEMOIZE | FRAME, _) => continue,
            (GET | BINGET | LONG_BINGET, Arg::Int(index)) => {
                values.push(memo.get(index).cloned().flatten()?);
            }
            (_, Arg::Str(s)) => values.push(s.clone()),
            _ => return None,
        }
        if values.len() == 2 {
            let module = values.pop()?;
            let name = values.pop()?;
            return Some((module, name));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(module: &str, name: &str) -> GlobalRef {
        GlobalRef::resolved(module, name)
    }

    /// `pickle.dumps(os.system, protocol=0)` 형태
    const PROTO0_OS_SYSTEM: &[u8] = b"cos\nsystem\np0\n.";

    /// protocol 4 `STACK_GLOBAL` + `MEMOIZE`
    fn proto4_stack_global(module: &str, name: &str) -> Vec<u8> {
        let mut data = vec![PROTO, 4, FRAME];
        data.extend_from_slice(&[0u8; 8]);
        data.push(SHORT_BINUNICODE);
        data.push(module.len() as u8);
        data.extend_from_slice(module.as_bytes());
        data.push(MEMOIZE);
        data.push(SHORT_BINUNICODE);
        data.push(name.len() as u8);
        data.extend_from_slice(name.as_bytes());
        data.push(MEMOIZE);
        data.push(STACK_GLOBAL);
        data.push(MEMOIZE);
        data.push(STOP);
        data
    }

    #[test]
    fn protocol0_global() {
        let outcome = genops(PROTO0_OS_SYSTEM);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.globals, vec![resolved("os", "system")]);
        assert_eq!(outcome.summary.pickles, 1);
        assert_eq!(outcome.summary.protocol, None);
    }

    #[test]
    fn protocol2_reduce_payload() {
        // __reduce__ 기반 페이로드: posix.system("echo")
        let data = b"\x80\x02cposix\nsystem\nq\x00X\x04\x00\x00\x00echoq\x01\x85q\x02Rq\x03.";
        let outcome = genops(data);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.globals, vec![resolved("posix", "system")]);
        assert_eq!(outcome.summary.protocol, Some(2));
    }

    #[test]
    fn protocol4_stack_global() {
        let outcome = genops(&proto4_stack_global("builtins", "eval"));
        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.globals, vec![resolved("builtins", "eval")]);
        assert_eq!(outcome.summary.protocol, Some(4));
    }

    #[test]
    fn stack_global_through_memo_get() {
        let mut data = vec![PROTO, 4];
        data.extend_from_slice(b"\x8c\x02os\x94\x8c\x06system\x94\x93\x94");
        // 두 번째 참조는 memo에서 다시 가져옴
        data.extend_from_slice(b"h\x00h\x01\x93.");
        let outcome = genops(&data);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.globals, vec![resolved("os", "system")]);
    }

    #[test]
    fn unresolvable_stack_global() {
        // 스택 위 값이 문자열이 아님
        let data = [PROTO, 4, NONE, NONE, STACK_GLOBAL, STOP];
        let outcome = genops(&data);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.globals, vec![GlobalRef::Unresolved]);
    }

    #[test]
    fn plain_data_has_no_globals() {
        // pickle.dumps({"a": [1, 2]}, protocol=2)
        let data = b"\x80\x02}q\x00X\x01\x00\x00\x00aq\x01]q\x02(K\x01K\x02es.";
        let outcome = genops(data);
        assert!(outcome.error.is_none());
        assert!(outcome.summary.globals.is_empty());
    }

    #[test]
    fn concatenated_pickles_are_all_walked() {
        let mut data = b"K\x01.".to_vec();
        data.extend_from_slice(PROTO0_OS_SYSTEM);
        let outcome = genops(&data);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.pickles, 2);
        assert_eq!(outcome.summary.globals, vec![resolved("os", "system")]);
    }

    #[test]
    fn trailing_junk_is_ignored() {
        let mut data = PROTO0_OS_SYSTEM.to_vec();
        data.extend_from_slice(b"\xff\xfe garbage");
        let outcome = genops(&data);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.pickles, 1);
    }

    #[test]
    fn duplicate_globals_are_recorded_once() {
        let data = b"(cos\nsystem\ncos\nsystem\nt.";
        let outcome = genops(data);
        assert_eq!(outcome.summary.globals.len(), 1);
    }

    #[test]
    fn inst_opcode_is_a_global() {
        let data = b"(S'ls'\nisubprocess\ncall\n.";
        let outcome = genops(data);
        assert!(outcome.error.is_none());
        assert_eq!(outcome.summary.globals, vec![resolved("subprocess", "call")]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert_eq!(genops(b"").error, Some(PickleError::Empty));
    }

    #[test]
    fn truncated_first_pickle_keeps_partial_globals() {
        let outcome = genops(b"cos\nsystem\n(S'ls'\n");
        assert!(matches!(outcome.error, Some(PickleError::Truncated { .. })));
        assert_eq!(outcome.summary.globals, vec![resolved("os", "system")]);
    }

    #[test]
    fn unknown_opcode_is_an_error() {
        let outcome = genops(b"\xff");
        assert_eq!(
            outcome.error,
            Some(PickleError::UnknownOpcode {
                opcode: 0xff,
                offset: 0
            })
        );
    }

    #[test]
    fn oversized_length_is_truncated_not_panic() {
        let data = [BINUNICODE8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f];
        let outcome = genops(&data);
        assert!(matches!(outcome.error, Some(PickleError::Truncated { .. })));
    }

    #[test]
    fn text_is_not_a_pickle() {
        let outcome = genops(b"hello world\n");
        assert!(outcome.error.is_some());
        assert_eq!(outcome.summary.pickles, 0);
    }
}
