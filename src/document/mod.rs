//! PDF assembly from numbered captures.

mod assembler;

pub use assembler::{assemble_document, assemble_document_blocking, AssemblyError, UNIT_SUFFIX};
