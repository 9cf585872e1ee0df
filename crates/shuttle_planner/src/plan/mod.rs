pub mod assembler;
pub mod route;
