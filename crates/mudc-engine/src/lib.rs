//! mud world-definition compiler
//!
//! This crate turns textual object and region definitions into a
//! byte-accurate memory image for a fixed-size target machine:
//! - **Parser**: Lexer and statement parser (`parser` module)
//! - **Compiler**: Symbol table, expression evaluation, class layout,
//!   object instantiation, region resolution, and image emission
//!   (`compiler` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use mudc_engine::{CompilerOptions, Session};
//!
//! let source = r#"
//!     define 2 "lamp"
//!         lit : bit
//!         brightness : byte = 3
//!     enddefine
//!     use lamp hall_lamp { lit : 1 }
//! "#;
//!
//! let mut session = Session::new(CompilerOptions::default());
//! session.compile_source("world.mud", source)?;
//! let output = session.finish()?;
//! std::fs::write("world.img", &output.stream)?;
//! ```

#![warn(rust_2018_idioms)]

pub mod compiler;
pub mod parser;

pub use compiler::{
    decode, encode, Asymmetry, ClassDescriptor, ClassKinds, ClassTable, CompileError, CompileOutput, Compiler,
    CompilerOptions, Diagnostic, DiagnosticKind, ErrorPolicy, Image, ImageError, IndirectTable,
    MemoryMap, ObjectInstance, ObjectTable, RedefinePolicy, ResolvedRegion, Segment, Session,
    SessionError, SourceFile, SymbolTable, Value,
};
pub use parser::{parse_source, LexError, ParseError, SourceError, Span, Statement, Token};
