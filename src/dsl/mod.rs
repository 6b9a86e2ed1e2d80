// ============================================================
// Network Description Language
// ============================================================
// A `.nn` file declares a network and how to train it:
//
//   network digit_cnn {
//       input(1, 28, 28)            # channels, height, width
//       conv2d filters=32 kernel=3 activation=relu
//       maxpool2d size=2
//       flatten
//       dense units=64 activation=relu
//       output units=10 activation=softmax
//   }
//   train { optimizer: adam, loss: categorical_crossentropy, epochs: 2, dataset: mnist }
//
// Lexing and parsing are separate passes; both report errors
// with a 1-based line and column.

pub mod lexer;
pub mod parser;

use anyhow::{Context, Result};
use std::{fmt, fs, path::Path};

use crate::domain::plan::Program;
use lexer::Lexer;
use parser::Parser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DslError {
    pub message: String,
    pub line:    usize,
    pub column:  usize,
}

impl DslError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self { message: message.into(), line, column }
    }
}

impl fmt::Display for DslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.message)
    }
}

impl std::error::Error for DslError {}

/// Parse a description held in memory
pub fn parse(source: &str) -> Result<Program, DslError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).parse_program()
}

/// Read and parse a `.nn` file
pub fn load_file(path: &Path) -> Result<Program> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Cannot read network description '{}'", path.display()))?;
    let program = parse(&source)
        .with_context(|| format!("Invalid network description '{}'", path.display()))?;
    tracing::debug!(
        "Parsed '{}': network '{}' with {} layers",
        path.display(),
        program.name,
        program.architecture.layers().len()
    );
    Ok(program)
}
