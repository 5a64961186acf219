mod engine;
mod ops;
mod rename;

pub use engine::{DiffOptions, DiffOutcome, diff_schemas};
pub use ops::Operation;
pub use rename::RenameAmbiguity;
