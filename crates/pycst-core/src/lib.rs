//! pycst core
//!
//! Lossless concrete syntax trees for Python 3.6 to 3.8 source. Parsing keeps
//! every space, comment and line break, so an unmodified tree renders back to
//! exactly the text it came from. Trees are immutable: transformers build new
//! trees that share untouched subtrees with the old one. Metadata providers
//! compute per-node facts (positions, parents, expression contexts) on demand.

mod builder;
pub mod codegen;
pub mod config;
pub mod encoding;
pub mod error;
pub mod grammar;
pub mod metadata;
pub mod nodes;
pub mod parser;
pub mod result;
pub mod tokenizer;
pub mod visit;

// Re-export commonly used types
pub use codegen::{CodePosition, CodeRange, Codegen, CodegenState};
pub use config::{PartialParserConfig, ParserConfig, PythonVersion};
pub use error::{CstError, ErrorKind, MetadataErrorKind, ParserSyntaxError, SyntaxErrorKind};
pub use metadata::{
    Dependencies, ExpressionContext, ExpressionContextProvider, MetadataCell, MetadataDependent,
    MetadataProvider, MetadataScope, MetadataWrapper, ParentNodeProvider, PositionProvider,
    ProviderData, ProviderKey,
};
pub use nodes::{Expression, Module, Statement, Validate, WithChanges, validate_tree};
pub use parser::{parse_expression, parse_module, parse_module_bytes, parse_statement};
pub use result::Result;
pub use visit::{AnyNode, CstNode, NodeId, NodeKind, NodeRef, Transformed, Transformer, Visitor};

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pycst=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
