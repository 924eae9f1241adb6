//! Styx plan: compile a graph pattern with blank-node variables into a join plan.
//!
//! Compilation runs four phases over one read snapshot of the store:
//!
//! 1. **classify**: each statement becomes references, grouped per variable
//!    into a [`CodexMap`]; ground statements are kept aside as constants
//! 2. **probe**: every single and double reference reads its candidate count
//!    and gets a [`Cursor`]; counts fold into [`CodexStats`]
//! 3. **sort**: a stable sort of the variables by aggregate count
//! 4. **assign**: per variable, the value root, the [`Past`] cursors towards
//!    earlier variables, the `future` groups and the dependency set
//!
//! Any failure aborts the whole compilation and releases every cursor.
//!
//! ```ignore
//! let plan = Compiler::new(CompileConfig::default()).compile_in(&store, &pattern)?;
//! for line in plan.explain_lines() {
//!     println!("{line}");
//! }
//! ```

pub mod assignment;
pub mod classify;
pub mod codex;
pub mod compiler;
pub mod config;
pub mod error;
pub mod past;
pub mod plan;
pub mod reference;

pub use assignment::{Assignment, AssignmentBuilder};
pub use classify::{classify, Classified};
pub use codex::{Codex, CodexMap, CodexStats};
pub use compiler::{compile, Compiler};
pub use config::{CompileConfig, VariableOrder};
pub use error::{PlanError, PlanResult};
pub use past::Past;
pub use plan::{Plan, PlanSummary, VariableSummary};
pub use reference::{Cursor, RefId, Reference};
