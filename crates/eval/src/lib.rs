//! formdoc-eval: transformation functions ("TRAFOs") for form fields.
//!
//! A [`FunctionLibrary`] maps names to [`Function`]s built from configuration
//! trees. Evaluation reads field values through a [`ValueProvider`]: either
//! the known value of every parameter, or one [`Broadcast`] value fed to all
//! of them. Evaluation never fails; an undefined function evaluates to a
//! visible marker string.

pub mod error;
pub mod function;
pub mod library;
pub mod values;

pub use error::FunctionError;
pub use function::{rename_value_refs, Body, Expr, Function, NativeFn};
pub use library::{undefined_marker, FunctionLibrary};
pub use values::{Broadcast, Overlay, ValueProvider};
