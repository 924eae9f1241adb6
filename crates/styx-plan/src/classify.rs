//! Statement classification.
//!
//! Each statement is partitioned by which of its positions hold variables.
//! Ground statements become constant references kept outside every codex;
//! everything else lands in the [`CodexMap`].

use styx_core::{Dataset, Permutation, Position, Statement, Term};

use crate::codex::CodexMap;
use crate::error::{PlanError, PlanResult};
use crate::reference::Reference;

/// Output of the classifier.
#[derive(Debug, Default)]
pub struct Classified {
    /// Ground statements, used only as existence filters.
    pub constants: Vec<Reference>,
    pub codex_map: CodexMap,
}

/// Classify every statement of `dataset`, in graph-name then index order.
pub fn classify(dataset: &Dataset) -> PlanResult<Classified> {
    let mut out = Classified::default();
    for (graph, index, statement) in dataset.iter() {
        classify_statement(&mut out, graph, index, statement)?;
    }
    tracing::debug!(
        statements = dataset.len(),
        constants = out.constants.len(),
        variables = out.codex_map.len(),
        references = out.codex_map.references().len(),
        "classified pattern"
    );
    Ok(out)
}

fn known(statement: &Statement, unknown: Position) -> (Option<Term>, Option<Term>) {
    (
        Some(statement.get(unknown.rotate(1)).clone()),
        Some(statement.get(unknown.rotate(2)).clone()),
    )
}

fn classify_statement(
    out: &mut Classified,
    graph: &str,
    index: usize,
    statement: &Statement,
) -> PlanResult<()> {
    let vars: Vec<Position> = Position::ALL
        .into_iter()
        .filter(|p| statement.get(*p).is_var())
        .collect();

    match vars.as_slice() {
        [] => {
            out.constants
                .push(Reference::new(graph, index, Permutation::Constant, None, None));
        }
        [u] => {
            let (a, b) = known(statement, *u);
            let reference = Reference::new(graph, index, Permutation::single(*u), a, b);
            let Some(id) = statement.get(*u).as_var() else {
                return Ok(());
            };
            let map = &mut out.codex_map;
            let rid = map.push_reference(reference);
            map.get_codex(id).single.push(rid);
        }
        [i, j] => {
            let (Some(a), Some(b)) = (statement.get(*i).as_var(), statement.get(*j).as_var())
            else {
                return Ok(());
            };
            let map = &mut out.codex_map;
            if a == b {
                let Some(permutation) = Permutation::pair(*i, *j) else {
                    return Ok(());
                };
                let constant = permutation
                    .constant_position()
                    .map(|p| statement.get(p).clone());
                let rid =
                    map.push_reference(Reference::new(graph, index, permutation, None, constant));
                map.get_codex(a).constraint.push(rid);
            } else {
                let (ia, ib) = known(statement, *i);
                let (ja, jb) = known(statement, *j);
                map.insert_pair(
                    a,
                    Reference::new(graph, index, Permutation::single(*i), ia, ib),
                    b,
                    Reference::new(graph, index, Permutation::single(*j), ja, jb),
                );
            }
        }
        _ => {
            return Err(PlanError::UnrepresentableStatement {
                graph: graph.to_string(),
                index,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use styx_core::{Node, VarId};

    fn x() -> VarId {
        VarId::new("x")
    }

    #[test]
    fn ground_statements_stay_out_of_codexes() {
        let ds: Dataset = [Statement::new(
            Node::iri("joel"),
            Node::iri("name"),
            Node::literal("Joel"),
        )]
        .into_iter()
        .collect();
        let out = classify(&ds).unwrap();
        assert_eq!(out.constants.len(), 1);
        assert_eq!(out.constants[0].permutation, Permutation::Constant);
        assert!(out.codex_map.is_empty());
        assert!(out.codex_map.references().is_empty());
    }

    #[test]
    fn single_rotates_known_values() {
        // (joel ?x 22): unknown predicate, key (object, subject).
        let ds: Dataset = [Statement::new(
            Node::iri("joel"),
            Term::var("x"),
            Node::literal("22"),
        )]
        .into_iter()
        .collect();
        let out = classify(&ds).unwrap();
        let codex = out.codex_map.codex(&x()).unwrap();
        let r = out.codex_map.reference(codex.single[0]);
        assert_eq!(r.permutation, Permutation::Predicate);
        assert_eq!(r.known_a, Some(Node::literal("22").into()));
        assert_eq!(r.known_b, Some(Node::iri("joel").into()));
    }

    #[test]
    fn repeated_variable_is_a_constraint() {
        let ds: Dataset = [Statement::new(Term::var("x"), Node::iri("p"), Term::var("x"))]
            .into_iter()
            .collect();
        let out = classify(&ds).unwrap();
        let codex = out.codex_map.codex(&x()).unwrap();
        assert_eq!(codex.constraint.len(), 1);
        assert!(codex.single.is_empty());
        assert!(codex.double.is_empty());
        let r = out.codex_map.reference(codex.constraint[0]);
        assert_eq!(r.permutation, Permutation::ObjectSubject);
        assert_eq!(r.known_a, None);
        assert_eq!(r.known_b, Some(Node::iri("p").into()));
    }

    #[test]
    fn three_variables_are_rejected_even_when_repeated() {
        for statement in [
            Statement::new(Term::var("x"), Term::var("y"), Term::var("z")),
            Statement::new(Term::var("x"), Term::var("x"), Term::var("x")),
        ] {
            let ds: Dataset = [statement].into_iter().collect();
            let err = classify(&ds).unwrap_err();
            assert!(matches!(
                err,
                PlanError::UnrepresentableStatement { index: 0, .. }
            ));
        }
    }
}
