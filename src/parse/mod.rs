pub mod ast;
pub mod error;
pub mod parser;
pub mod printer;
pub mod visitor;
