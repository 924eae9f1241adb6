//! RDF ingestion for Styx (boundary adapter).
//!
//! Parses RDF text with **Sophia** into a [`Dataset`]:
//! - N-Triples (`.nt`)
//! - N-Quads (`.nq`)
//! - Turtle (`.ttl`)
//! - TriG (`.trig`)
//!
//! Blank nodes become variables ([`Term::Var`]), so the same reader serves both
//! data documents (where the index writer skolemizes them) and patterns (where
//! the planner solves for them). Quads without a graph name land in
//! [`DEFAULT_GRAPH`]; blank graph names keep their `_:label` form.

use anyhow::{anyhow, Context, Result};
use sophia::api::prelude::*;
use std::path::Path;

use styx_core::{Dataset, Node, Statement, Term, DEFAULT_GRAPH};

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    NQuads,
    Turtle,
    TriG,
}

impl RdfFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "nt" => Ok(Self::NTriples),
            "nq" => Ok(Self::NQuads),
            "ttl" => Ok(Self::Turtle),
            "trig" => Ok(Self::TriG),
            _ => Err(anyhow!(
                "unsupported RDF file extension `{ext}` for {}",
                path.display()
            )),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct RdfSinkError {
    message: String,
}

impl From<anyhow::Error> for RdfSinkError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

// ============================================================================
// Term display parsing
// ============================================================================

/// Undo N-Triples string escapes, including `\uXXXX` and `\UXXXXXXXX`.
///
/// Unknown or malformed escapes are kept verbatim.
fn unescape_rdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(at) = rest.find('\\') {
        out.push_str(&rest[..at]);
        let tail = &rest[at + 1..];
        let Some(escape) = tail.chars().next() else {
            out.push('\\');
            return out;
        };
        let simple = match escape {
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            '"' | '\'' | '\\' => Some(escape),
            _ => None,
        };
        if let Some(c) = simple {
            out.push(c);
            rest = &tail[1..];
            continue;
        }
        let width = match escape {
            'u' => 4,
            'U' => 8,
            _ => 0,
        };
        let decoded = tail
            .get(1..1 + width)
            .filter(|hex| width > 0 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[1 + width..];
            }
            None => {
                out.push('\\');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse the N-Triples display form of a term.
fn parse_term_display(term: &str) -> Result<Term> {
    let s = term.trim();

    if let Some(iri) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(Node::iri(iri).into());
    }

    if let Some(label) = s.strip_prefix("_:") {
        return Ok(Term::var(label));
    }

    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            match ch {
                '"' if !escaped => {
                    end_quote = Some(i);
                    break;
                }
                '\\' => escaped = !escaped,
                _ => escaped = false,
            }
        }
        let Some(end) = end_quote else {
            return Err(anyhow!("invalid literal term (missing closing quote): {s}"));
        };

        let value = unescape_rdf_string(&s[1..end]);
        let rest = s[end + 1..].trim();

        let mut language = None;
        let mut datatype = None;
        if let Some(lang) = rest.strip_prefix('@') {
            language = Some(lang.to_string());
        } else if let Some(dt) = rest.strip_prefix("^^") {
            let dt = dt.trim();
            let dt = dt
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(dt);
            if !dt.is_empty() && dt != XSD_STRING && dt != RDF_LANG_STRING {
                datatype = Some(dt.to_string());
            }
        }

        return Ok(Node::Literal {
            value,
            datatype,
            language,
        }
        .into());
    }

    Err(anyhow!("unsupported RDF term form: {s}"))
}

fn parse_graph_display(term: &str) -> Result<String> {
    match parse_term_display(term)? {
        Term::Node(Node::Iri(iri)) => Ok(iri),
        Term::Var(label) => Ok(label.to_string()),
        Term::Node(Node::Literal { .. }) => Err(anyhow!("literal graph name: {term}")),
    }
}

// ============================================================================
// Dataset construction
// ============================================================================

#[derive(Default)]
struct DatasetSink {
    dataset: Dataset,
    seen: usize,
    skipped: usize,
}

impl DatasetSink {
    fn push(
        &mut self,
        subject: &str,
        predicate: &str,
        object: &str,
        graph: Option<String>,
    ) -> std::result::Result<(), RdfSinkError> {
        self.seen += 1;
        let predicate = parse_term_display(predicate)?;
        if !matches!(predicate, Term::Node(Node::Iri(_))) {
            tracing::warn!(%predicate, "skipping statement with non-IRI predicate");
            self.skipped += 1;
            return Ok(());
        }
        let statement = Statement::new(
            parse_term_display(subject)?,
            predicate,
            parse_term_display(object)?,
        );
        let graph = graph.as_deref().unwrap_or(DEFAULT_GRAPH);
        self.dataset.insert(graph, statement);
        Ok(())
    }
}

/// Parse RDF text into a dataset.
pub fn dataset_from_rdf(bytes: &[u8], format: RdfFormat) -> Result<Dataset> {
    let reader = std::io::BufReader::new(std::io::Cursor::new(bytes));
    let mut sink = DatasetSink::default();

    match format {
        RdfFormat::NTriples => {
            let mut parser = sophia::turtle::parser::nt::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> std::result::Result<(), RdfSinkError> {
                    sink.push(
                        &t.s().to_string(),
                        &t.p().to_string(),
                        &t.o().to_string(),
                        None,
                    )
                })
                .map_err(|e| anyhow!("failed to parse N-Triples: {e}"))?;
        }
        RdfFormat::Turtle => {
            let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| -> std::result::Result<(), RdfSinkError> {
                    sink.push(
                        &t.s().to_string(),
                        &t.p().to_string(),
                        &t.o().to_string(),
                        None,
                    )
                })
                .map_err(|e| anyhow!("failed to parse Turtle: {e}"))?;
        }
        RdfFormat::NQuads => {
            let mut parser = sophia::turtle::parser::nq::parse_bufread(reader);
            parser
                .try_for_each_quad(|q| -> std::result::Result<(), RdfSinkError> {
                    let graph = q
                        .g()
                        .map(|g| parse_graph_display(&g.to_string()))
                        .transpose()?;
                    sink.push(
                        &q.s().to_string(),
                        &q.p().to_string(),
                        &q.o().to_string(),
                        graph,
                    )
                })
                .map_err(|e| anyhow!("failed to parse N-Quads: {e}"))?;
        }
        RdfFormat::TriG => {
            let mut parser = sophia::turtle::parser::trig::parse_bufread(reader);
            parser
                .try_for_each_quad(|q| -> std::result::Result<(), RdfSinkError> {
                    let graph = q
                        .g()
                        .map(|g| parse_graph_display(&g.to_string()))
                        .transpose()?;
                    sink.push(
                        &q.s().to_string(),
                        &q.p().to_string(),
                        &q.o().to_string(),
                        graph,
                    )
                })
                .map_err(|e| anyhow!("failed to parse TriG: {e}"))?;
        }
    }

    tracing::debug!(
        ?format,
        seen = sink.seen,
        skipped = sink.skipped,
        statements = sink.dataset.len(),
        "parsed RDF"
    );
    Ok(sink.dataset)
}

/// Read and parse an RDF file, picking the format from its extension.
pub fn dataset_from_rdf_file(path: &Path) -> Result<Dataset> {
    let format = RdfFormat::from_path(path)?;
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    dataset_from_rdf(&bytes, format).with_context(|| format!("in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_display_forms() {
        assert_eq!(
            parse_term_display(r#""Joel""#).unwrap(),
            Term::from(Node::literal("Joel"))
        );
        assert_eq!(
            parse_term_display(r#""Gabriel"@es"#).unwrap(),
            Term::from(Node::lang("Gabriel", "es"))
        );
        assert_eq!(
            parse_term_display(r#""22"^^<http://www.w3.org/2001/XMLSchema#integer>"#).unwrap(),
            Term::from(Node::typed("22", "http://www.w3.org/2001/XMLSchema#integer"))
        );
        assert_eq!(
            parse_term_display(r#""a\"b\\""^^<http://www.w3.org/2001/XMLSchema#string>"#)
                .unwrap(),
            Term::from(Node::literal("a\"b\\"))
        );
        assert!(parse_term_display(r#""open"#).is_err());
    }

    #[test]
    fn unicode_escapes_are_decoded() {
        assert_eq!(unescape_rdf_string(r"caf\u00E9"), "café");
        assert_eq!(unescape_rdf_string(r"\U0001F600!"), "\u{1F600}!");
        assert_eq!(unescape_rdf_string(r"a\tb\nc"), "a\tb\nc");
        assert_eq!(unescape_rdf_string(r"\u00G1"), r"\u00G1");
        assert_eq!(unescape_rdf_string(r"\uD800"), r"\uD800");
        assert_eq!(unescape_rdf_string(r"\q"), r"\q");
        assert_eq!(unescape_rdf_string(r"\u+0E9"), r"\u+0E9");
        assert_eq!(unescape_rdf_string("end\\"), "end\\");
        assert_eq!(
            parse_term_display(r#""Jo\u00EBl"@fr"#).unwrap(),
            Term::from(Node::lang("Joël", "fr"))
        );
    }

    #[test]
    fn blank_nodes_become_variables() {
        assert_eq!(parse_term_display("_:b0").unwrap(), Term::var("b0"));
        assert_eq!(parse_graph_display("_:g").unwrap(), "_:g");
        assert_eq!(
            parse_graph_display("<http://example.org/g>").unwrap(),
            "http://example.org/g"
        );
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            RdfFormat::from_path(Path::new("a/b.NQ")).unwrap(),
            RdfFormat::NQuads
        );
        assert_eq!(
            RdfFormat::from_path(Path::new("x.ttl")).unwrap(),
            RdfFormat::Turtle
        );
        assert!(RdfFormat::from_path(Path::new("x.owl")).is_err());
    }
}
