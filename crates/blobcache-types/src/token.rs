use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::TypeError;
use crate::ids::{BlobId, UnitId};

/// Marker prepended to tokens of blobs stored in a dedicated large-object unit.
pub const LARGE_OBJECT_PREFIX: &str = "lobj";

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^tr_(?P<unit>.+)_bb_(?P<blob>.+)$").expect("valid token regex"))
}

/// Opaque external address of one blob: the owning unit id plus the blob id.
///
/// The rendered wire format is `tr_<unit>_bb_<blob>`, prefixed with
/// [`LARGE_OBJECT_PREFIX`] when the blob lives in a large-object unit.
/// Parsing the token is the only way to locate a blob's owning unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Token {
    pub unit_id: UnitId,
    pub blob_id: BlobId,
    pub large: bool,
}

impl Token {
    pub fn new(unit_id: UnitId, blob_id: BlobId) -> Self {
        Self {
            unit_id,
            blob_id,
            large: false,
        }
    }

    pub fn large(unit_id: UnitId, blob_id: BlobId) -> Self {
        Self {
            unit_id,
            blob_id,
            large: true,
        }
    }

    /// Parse a token string. A malformed token is a caller error.
    pub fn parse(token: &str) -> Result<Self, TypeError> {
        let (body, large) = match token.strip_prefix(LARGE_OBJECT_PREFIX) {
            Some(rest) => (rest, true),
            None => (token, false),
        };
        let caps = token_regex()
            .captures(body)
            .ok_or_else(|| TypeError::MalformedToken(token.to_string()))?;
        Ok(Self {
            unit_id: UnitId::new(&caps["unit"]),
            blob_id: BlobId::new(&caps["blob"]),
            large,
        })
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.large {
            f.write_str(LARGE_OBJECT_PREFIX)?;
        }
        write!(f, "tr_{}_bb_{}", self.unit_id, self.blob_id)
    }
}
