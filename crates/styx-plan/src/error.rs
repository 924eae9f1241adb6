use styx_core::{Permutation, VarId};
use styx_store::StoreError;
use thiserror::Error;

pub type PlanResult<T> = Result<T, PlanError>;

/// Every variant aborts the compilation; there is no partial plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("unrepresentable statement {graph}[{index}]: all three positions are variables")]
    UnrepresentableStatement { graph: String, index: usize },

    #[error("{permutation} reference of {variable} at {graph}[{index}] has no candidates in the store")]
    ZeroCandidateReference {
        variable: VarId,
        graph: String,
        index: usize,
        permutation: Permutation,
    },

    #[error("static candidate set of {variable} is empty")]
    EmptyValueRoot { variable: VarId },

    #[error("pattern has {count} variables, limit is {max}")]
    TooManyVariables { count: usize, max: usize },

    #[error("codex map has not been probed")]
    Unprobed,

    #[error("codex map is already probed")]
    AlreadyProbed,

    #[error(transparent)]
    Store(#[from] StoreError),
}
