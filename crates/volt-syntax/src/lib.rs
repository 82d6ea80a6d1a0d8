pub mod ast;
pub mod delimiters;
pub mod error;
pub mod token;

pub use ast::*;
pub use delimiters::*;
pub use error::*;
pub use token::*;
