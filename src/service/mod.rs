//! DocumentExecutor: generic document CRUD with schema validation.

mod documents;
mod validation;
pub use documents::DocumentExecutor;
pub use validation::RequestValidator;
