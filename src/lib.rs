pub mod amd64;
pub mod cli;
pub mod driver;
pub mod lang;

pub use amd64::{emit_program, CodegenError};
pub use driver::{compile_file, compile_source, compile_to_file, format_error, CompileError};
pub use lang::{parse_source, FrontendError, Program};
