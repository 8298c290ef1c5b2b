//! Raw tape entries as emitted by the template compiler.
//!
//! Tapes cross the compiler boundary as flat JSON arrays mixing numbers,
//! strings, `null` and marker objects. Typed tapes are decoded from
//! these entries once and never re-validated afterwards.

use serde::{Deserialize, Serialize};

/// Marker entries that open a node creation in a mutate tape.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Icu,
    Element,
}

/// One raw tape entry.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCode {
    Num(i64),
    Str(String),
    Marker { marker: MarkerKind },
    Null,
}

impl RawCode {
    pub fn describe(&self) -> String {
        match self {
            Self::Num(n) => format!("number {n}"),
            Self::Str(s) => format!("string {s:?}"),
            Self::Marker { marker } => format!("marker {marker:?}"),
            Self::Null => "null".to_string(),
        }
    }
}

impl From<i64> for RawCode {
    fn from(n: i64) -> Self {
        Self::Num(n)
    }
}

impl From<&str> for RawCode {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

/// Parse a JSON array of raw entries.
pub fn parse_raw(json: &str) -> Result<Vec<RawCode>, serde_json::Error> {
    serde_json::from_str(json)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TapeError {
    #[error("unexpected {found} at entry {at}")]
    Unexpected { at: usize, found: String },

    #[error("tape ends inside an instruction at entry {at}")]
    Truncated { at: usize },

    #[error("unknown opcode {code} at entry {at}")]
    UnknownOpcode { at: usize, code: i64 },

    #[error("unknown sanitizer `{0}`")]
    UnknownSanitizer(String),

    #[error("icu switch on slot {index} is not followed by its icu update")]
    UnpairedIcuSwitch { index: usize },

    #[error("slot index {index} does not fit the operand width")]
    IndexOverflow { index: usize },
}

/// Cursor over raw entries with typed readers.
pub(crate) struct RawReader<'a> {
    codes: &'a [RawCode],
    pos: usize,
}

impl<'a> RawReader<'a> {
    pub(crate) fn new(codes: &'a [RawCode]) -> Self {
        Self { codes, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_done(&self) -> bool {
        self.pos >= self.codes.len()
    }

    pub(crate) fn next(&mut self) -> Result<&'a RawCode, TapeError> {
        let code = self
            .codes
            .get(self.pos)
            .ok_or(TapeError::Truncated { at: self.pos })?;
        self.pos += 1;
        Ok(code)
    }

    pub(crate) fn num(&mut self) -> Result<i64, TapeError> {
        let at = self.pos;
        match self.next()? {
            RawCode::Num(n) => Ok(*n),
            other => Err(TapeError::Unexpected {
                at,
                found: other.describe(),
            }),
        }
    }

    pub(crate) fn index(&mut self) -> Result<usize, TapeError> {
        let at = self.pos;
        let n = self.num()?;
        usize::try_from(n).map_err(|_| TapeError::Unexpected {
            at,
            found: format!("number {n}"),
        })
    }

    pub(crate) fn string(&mut self) -> Result<&'a str, TapeError> {
        let at = self.pos;
        match self.next()? {
            RawCode::Str(s) => Ok(s.as_str()),
            other => Err(TapeError::Unexpected {
                at,
                found: other.describe(),
            }),
        }
    }
}
