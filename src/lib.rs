pub mod ast;
pub mod column;
pub mod compile;
pub mod methods;
pub mod table;


pub use compile::{
    Compiler, CompilerConfig, Error, ErrorKind, Result, to_sql, to_sql_for, to_sql_with_options,
    to_sql_with_table,
};
