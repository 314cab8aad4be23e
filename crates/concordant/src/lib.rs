//! Concordant: executable HTML specifications.
//!
//! A specification is an ordinary HTML document whose markup carries
//! commands in a dedicated namespace. Running it against a fixture
//! evaluates each command, records the outcome and paints the result back
//! onto the element that asked for it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                    CONCORDANT Architecture                        │
//! ├──────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐             │
//! │   │ HTML spec  │    │ Call graph │    │ Evaluator  │             │
//! │   │ (source)   │───►│ (commands) │───►│ + fixture  │             │
//! │   └────────────┘    └────────────┘    └─────┬──────┘             │
//! │                                             │                    │
//! │   ┌────────────┐    ┌────────────┐    ┌─────▼──────┐             │
//! │   │ Target     │◄───│ Painter    │◄───│ Recorder   │             │
//! │   │ (output)   │    │ (markup)   │    │ (outcomes) │             │
//! │   └────────────┘    └────────────┘    └────────────┘             │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use concordant::{MethodFixture, Resource, SpecificationEngine};
//! use serde_json::json;
//!
//! let engine = SpecificationEngine::builder().build().unwrap();
//! let mut fixture = MethodFixture::new("Hello")
//!     .with_method("greeting", |_| Ok(json!("Hello World!")));
//! let html = r#"<html xmlns:c="urn:concordant:2024"><body>
//!     <p c:assertEquals="greeting()">Hello World!</p>
//! </body></html>"#;
//!
//! let output = engine.process(&mut fixture, html, Resource::new("/Hello.html")).unwrap();
//! assert!(output.summary.is_success());
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

pub mod command;
pub mod config;
pub mod document;
pub mod engine;
pub mod evaluator;
pub mod extension;
pub mod fixture;
pub mod listener;
pub mod recorder;
#[allow(clippy::doc_markdown)]
pub mod renderer;
pub mod resource;
mod result;
pub mod runner;
pub mod source;
pub mod target;
pub mod value;

pub use command::{CallGraph, Command, CommandCall, CommandRegistry, ExecutionContext, Phase, CONCORDANT_NAMESPACE};
pub use config::EngineConfig;
pub use document::{Document, Element, ElementError};
pub use engine::{EngineBuilder, ProcessContext, ProcessOutput, SpecificationEngine};
pub use evaluator::{EvaluationError, Evaluator, EvaluatorFactory, SimpleEvaluatorFactory};
pub use extension::{Extension, ExtensionBuilder, ExtensionCatalog, ExtensionSet};
pub use fixture::{DataFixture, Fixture, FixtureError, MethodFixture};
pub use listener::{ListenerError, ListenerResult};
pub use recorder::{Outcome, ResultRecorder, ResultSummary, SummaryReport};
pub use renderer::{OutcomePainter, RenderDiagnostic, DEFAULT_CSS};
pub use resource::Resource;
pub use result::{ConcordantError, ConcordantResult};
pub use runner::{FixtureRunner, NestedRunner, RunRequest, RunVerdict, RunnerError};
pub use source::{FileSource, MemorySource, SpecificationSource};
pub use target::{FileTarget, MemoryTarget, Target};
pub use value::Value;

/// Prelude for common imports
pub mod prelude {
    pub use super::{
        ConcordantError, ConcordantResult, DataFixture, EngineConfig, Fixture, FixtureError, FixtureRunner,
        MethodFixture, Resource, SpecificationEngine, Target, Value,
    };
}
