/// Option constraints for listing matching programs
pub mod constraint;
/// Key vectors and option slots
pub mod key;
/// Query documents read by the command line tool
pub mod query;
/// Render info entries that stand for shader options
pub mod render_info;
/// Program selection for a material or query
pub mod selector;

pub use constraint::{Constraint, ConstraintSet};
pub use key::{KeySlot, OptionMap, ShaderKey};
pub use query::{ConstraintValue, MaterialQuery, OptionValue, SearchQuery};
pub use selector::ShaderSelector;
