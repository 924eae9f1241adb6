//! Byte layout of the index tables.
//!
//! Every key is a one-byte table tag followed by escaped node encodings:
//!
//! ```text
//! value  VALUE[u] · enc(M) · enc(N) · enc(U)  -> SourceList (CBOR)
//! minor  MINOR[u] · enc(M) · enc(N)           -> u64 BE, distinct U for (M, N)
//! major  MAJOR[q] · enc(c)                    -> u64 BE, statements with c at q
//! ```
//!
//! `u` is the unknown position of a rotation and `(M, N)` its key positions
//! (see [`crate::permutation`]). `q` is an absolute position.
//!
//! A node encodes as a type tag and its escaped UTF-8 bytes: `0x00` becomes
//! `0x00 0xFF` and the string ends with `0x00 0x00`. The encoding is prefix
//! free, so a value prefix `VALUE[u] · enc(M) · enc(N)` never matches a key
//! for a different `(M, N)`, and byte order agrees with string order within
//! a node type.

use thiserror::Error;

use crate::permutation::Position;
use crate::term::Node;

const TAG_IRI: u8 = 0x01;
const TAG_LITERAL: u8 = 0x02;

const ANNOT_NONE: u8 = 0x00;
const ANNOT_LANG: u8 = 0x01;
const ANNOT_DATATYPE: u8 = 0x02;
const ANNOT_BOTH: u8 = 0x03;

const VALUE_TABLE: u8 = 0x10;
const MINOR_TABLE: u8 = 0x20;
const MAJOR_TABLE: u8 = 0x30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("unexpected end of key at byte {0}")]
    Truncated(usize),
    #[error("unknown node tag {tag:#04x} at byte {offset}")]
    UnknownTag { tag: u8, offset: usize },
    #[error("invalid escape sequence at byte {0}")]
    BadEscape(usize),
    #[error("node text is not valid UTF-8")]
    Utf8,
}

// ============================================================================
// Node codec
// ============================================================================

fn push_escaped(out: &mut Vec<u8>, s: &str) {
    for &b in s.as_bytes() {
        if b == 0 {
            out.extend_from_slice(&[0x00, 0xFF]);
        } else {
            out.push(b);
        }
    }
    out.extend_from_slice(&[0x00, 0x00]);
}

/// Read one escaped string starting at `at`; returns it and the next offset.
fn read_escaped(bytes: &[u8], mut at: usize) -> Result<(String, usize), KeyError> {
    let mut raw = Vec::new();
    loop {
        let b = *bytes.get(at).ok_or(KeyError::Truncated(at))?;
        if b != 0 {
            raw.push(b);
            at += 1;
            continue;
        }
        match bytes.get(at + 1) {
            Some(0x00) => {
                at += 2;
                break;
            }
            Some(0xFF) => {
                raw.push(0);
                at += 2;
            }
            Some(_) => return Err(KeyError::BadEscape(at)),
            None => return Err(KeyError::Truncated(at + 1)),
        }
    }
    let s = String::from_utf8(raw).map_err(|_| KeyError::Utf8)?;
    Ok((s, at))
}

/// Append the encoding of `node` to `out`.
pub fn encode_node_into(out: &mut Vec<u8>, node: &Node) {
    match node {
        Node::Iri(iri) => {
            out.push(TAG_IRI);
            push_escaped(out, iri);
        }
        Node::Literal {
            value,
            datatype,
            language,
        } => {
            out.push(TAG_LITERAL);
            push_escaped(out, value);
            match (language, datatype) {
                (None, None) => out.push(ANNOT_NONE),
                (Some(lang), None) => {
                    out.push(ANNOT_LANG);
                    push_escaped(out, lang);
                }
                (None, Some(dt)) => {
                    out.push(ANNOT_DATATYPE);
                    push_escaped(out, dt);
                }
                (Some(lang), Some(dt)) => {
                    out.push(ANNOT_BOTH);
                    push_escaped(out, lang);
                    push_escaped(out, dt);
                }
            }
        }
    }
}

pub fn encode_node(node: &Node) -> Vec<u8> {
    let mut out = Vec::new();
    encode_node_into(&mut out, node);
    out
}

/// Decode one node from the front of `bytes`, returning it and the rest.
pub fn decode_node(bytes: &[u8]) -> Result<(Node, &[u8]), KeyError> {
    let tag = *bytes.first().ok_or(KeyError::Truncated(0))?;
    match tag {
        TAG_IRI => {
            let (iri, at) = read_escaped(bytes, 1)?;
            Ok((Node::Iri(iri), &bytes[at..]))
        }
        TAG_LITERAL => {
            let (value, at) = read_escaped(bytes, 1)?;
            let annot = *bytes.get(at).ok_or(KeyError::Truncated(at))?;
            let at = at + 1;
            let (language, datatype, at) = match annot {
                ANNOT_NONE => (None, None, at),
                ANNOT_LANG => {
                    let (lang, at) = read_escaped(bytes, at)?;
                    (Some(lang), None, at)
                }
                ANNOT_DATATYPE => {
                    let (dt, at) = read_escaped(bytes, at)?;
                    (None, Some(dt), at)
                }
                ANNOT_BOTH => {
                    let (lang, at) = read_escaped(bytes, at)?;
                    let (dt, at) = read_escaped(bytes, at)?;
                    (Some(lang), Some(dt), at)
                }
                other => {
                    return Err(KeyError::UnknownTag {
                        tag: other,
                        offset: at - 1,
                    })
                }
            };
            Ok((
                Node::Literal {
                    value,
                    datatype,
                    language,
                },
                &bytes[at..],
            ))
        }
        other => Err(KeyError::UnknownTag {
            tag: other,
            offset: 0,
        }),
    }
}

// ============================================================================
// Table keys
// ============================================================================

/// Prefix shared by every value key of rotation `unknown` keyed by `(m, n)`.
pub fn value_prefix(unknown: Position, m: &Node, n: &Node) -> Vec<u8> {
    let mut key = vec![VALUE_TABLE + unknown.index() as u8];
    encode_node_into(&mut key, m);
    encode_node_into(&mut key, n);
    key
}

pub fn value_key(unknown: Position, m: &Node, n: &Node, u: &Node) -> Vec<u8> {
    let mut key = value_prefix(unknown, m, n);
    encode_node_into(&mut key, u);
    key
}

/// Decode the unknown value from a key that starts with `prefix`.
pub fn value_of_key(key: &[u8], prefix_len: usize) -> Result<Node, KeyError> {
    let tail = key.get(prefix_len..).ok_or(KeyError::Truncated(prefix_len))?;
    let (node, _) = decode_node(tail)?;
    Ok(node)
}

pub fn minor_key(unknown: Position, m: &Node, n: &Node) -> Vec<u8> {
    let mut key = vec![MINOR_TABLE + unknown.index() as u8];
    encode_node_into(&mut key, m);
    encode_node_into(&mut key, n);
    key
}

pub fn major_key(position: Position, constant: &Node) -> Vec<u8> {
    let mut key = vec![MAJOR_TABLE + position.index() as u8];
    encode_node_into(&mut key, constant);
    key
}

/// Split a ground triple into `(M, N, U)` for the rotation of `unknown`.
pub fn rotate<'a>(triple: [&'a Node; 3], unknown: Position) -> (&'a Node, &'a Node, &'a Node) {
    (
        triple[unknown.rotate(1).index()],
        triple[unknown.rotate(2).index()],
        triple[unknown.index()],
    )
}

pub fn encode_count(count: u64) -> [u8; 8] {
    count.to_be_bytes()
}
