//! Opaque cursor tokens.
//!
//! A cursor names the record at one end of a page: `<field>/<identity>:<key>`.
//! `field` is the sort field the page was ordered by, `identity` is the
//! record's unique id and `key` is the text form of its sort key. Only the
//! first `:` separates identity from key, so keys may contain any character,
//! and `name/<identity>:` carries an empty name. A token with no `:` has no
//! key at all: that is what cursors for the `id` ordering look like, and
//! what is issued for a record that has no value for the sort field.
//!
//! Tokens without the `<field>/` tag (`<identity>:<key>`) are still
//! accepted; they are what older clients hold.

use std::{
    fmt,
    str::FromStr,
};

use errors::ErrorMetadata;
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    knobs::PAGINATION_MAX_CURSOR_LEN,
    sort::{
        SortField,
        SortKey,
    },
};

pub const KEY_SEPARATOR: char = ':';
pub const FIELD_TAG_SEPARATOR: char = '/';

/// A cursor token as handed to and received from clients.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cursor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cursor = Cursor::new(s);
        decode_cursor(&cursor)?;
        Ok(cursor)
    }
}

impl From<String> for Cursor {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// The parts of a decoded cursor. `key` is still text here: turning it back
/// into a typed value needs the active sort field. `None` means the token
/// had no key separator, which differs from `Some("")`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedCursor {
    pub sort_field: Option<SortField>,
    pub identity: String,
    pub key: Option<String>,
}

/// Builds the cursor for the record `identity` whose sort key is `key`.
pub fn encode_cursor(identity: &str, key: &SortKey) -> Cursor {
    let mut token = format!("{}{FIELD_TAG_SEPARATOR}{identity}", key.field());
    if !matches!(key, SortKey::Identity(_)) {
        token.push(KEY_SEPARATOR);
        token.push_str(&key.to_cursor_string());
    }
    Cursor(token)
}

/// Builds a cursor without a key, for the record `identity` that has no
/// value for `field`.
pub fn encode_identity_cursor(field: SortField, identity: &str) -> Cursor {
    Cursor(format!("{field}{FIELD_TAG_SEPARATOR}{identity}"))
}

fn invalid_cursor(msg: impl Into<String>) -> anyhow::Error {
    anyhow::anyhow!(ErrorMetadata::bad_request("InvalidCursor", msg.into()))
}

pub fn decode_cursor(cursor: &Cursor) -> anyhow::Result<DecodedCursor> {
    let token = cursor.as_str();
    if token.is_empty() {
        return Err(invalid_cursor("Cursor is empty"));
    }
    if token.len() > *PAGINATION_MAX_CURSOR_LEN {
        return Err(invalid_cursor(format!(
            "Cursor is {} bytes long, the limit is {}",
            token.len(),
            *PAGINATION_MAX_CURSOR_LEN
        )));
    }
    let (head, key) = match token.split_once(KEY_SEPARATOR) {
        Some((head, key)) => (head, Some(key)),
        None => (token, None),
    };
    let (sort_field, identity) = match head.split_once(FIELD_TAG_SEPARATOR) {
        Some((tag, identity)) => {
            let field = tag
                .parse::<SortField>()
                .map_err(|_| invalid_cursor(format!("Cursor names unknown sort field {tag:?}")))?;
            (Some(field), identity)
        },
        None => (None, head),
    };
    if identity.is_empty() {
        return Err(invalid_cursor(format!("Cursor {token:?} has no record id")));
    }
    Ok(DecodedCursor {
        sort_field,
        identity: identity.to_owned(),
        key: key.map(str::to_owned),
    })
}
