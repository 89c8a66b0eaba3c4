//! Dump protocol messages and the request builder.
use serde_derive::{Deserialize, Serialize};
use strum::Display;

/// Reply size the server uses when the client doesn't ask for one: a single page.
pub const DEFAULT_BUFSZ: u32 = 4096;
/// Largest reply size a client may request.
pub const MAX_BUFSZ: u32 = 65536;

/// Which server-side table to dump
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum InfoCategory {
    #[default]
    #[strum(serialize = "unset")]
    #[serde(rename = "unset")]
    Unset,
    #[strum(serialize = "bond")]
    #[serde(rename = "bond")]
    Bond,
    #[strum(serialize = "lacp")]
    #[serde(rename = "lacp")]
    Lacp,
}

/// Marks the last row the server delivered.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Cursor(pub i32);

impl Cursor {
    pub const START: Cursor = Cursor(-1);
}

impl Default for Cursor {
    fn default() -> Self {
        Self::START
    }
}

/// Correlates successive requests with one server-side iteration.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TableId(pub i32);

impl TableId {
    pub const NONE: TableId = TableId(0);
}

/// Ask for the next page of `category`, starting after `marker`.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct DumpRequest {
    pub category: InfoCategory,
    pub marker: Cursor,
    pub table_id: TableId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<u8>>,
    pub bufsz: u32,
}

/// One message received from the server while dumping.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum Response {
    /// Preformatted text for the current page, as raw bytes
    #[serde(rename = "payload")]
    Payload {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<Vec<u8>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        marker: Option<Cursor>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table_id: Option<TableId>,
    },
    /// Ends every request/response cycle.  `more` says whether another cycle is needed.
    #[serde(rename = "completion")]
    Completion {
        more: bool
    },
}

/// Assemble the request for the next page of a dump.
///
/// A `bufsz` of 0 selects [`DEFAULT_BUFSZ`].  `category` must already have been chosen; passing
/// [`InfoCategory::Unset`] is a bug in the caller.
pub fn build_dump_request(
    category: InfoCategory,
    marker: Cursor,
    table_id: TableId,
    filter: Option<&[u8]>,
    bufsz: u32) -> DumpRequest
{
    assert_ne!(category, InfoCategory::Unset, "dump category must be selected before dumping");
    DumpRequest {
        category,
        marker,
        table_id,
        filter: filter.map(<[u8]>::to_vec),
        bufsz: if bufsz == 0 { DEFAULT_BUFSZ } else { bufsz },
    }
}
