pub mod parser;
pub mod rules;

pub use parser::extract;
pub use rules::{SportCatalog, SportRules};
