//! The specification engine.
//!
//! ```text
//! parse ─► parsing listeners ─► head assets ─► call graph ─► build listeners
//!   ─► setup ─► execute ─► verify ─► paint ─► document_built ─► serialise
//! ```
//!
//! Configuration and listener errors abort the run and no summary is
//! produced. Everything else ends up in the [`ResultSummary`].

use crate::command::{build_call_graph, run_phase, CallGraph, ExecutionContext, Phase};
use crate::config::EngineConfig;
use crate::document::{Document, Element};
use crate::evaluator::{EvaluatorFactory, SimpleEvaluatorFactory};
use crate::extension::{Asset, BuiltinCommands, Extension, ExtensionBuilder, ExtensionCatalog, ExtensionSet, HeadEntry};
use crate::fixture::Fixture;
use crate::recorder::{ResultRecorder, ResultSummary};
use crate::renderer::{OutcomePainter, RenderDiagnostic, DEFAULT_CSS};
use crate::resource::Resource;
use crate::result::ConcordantResult;
use crate::runner::NestedRunner;
use crate::source::SpecificationSource;
use crate::target::Target;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Nesting context of one run, passed explicitly instead of global state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessContext {
    depth: usize,
    caller: Option<String>,
}

impl ProcessContext {
    /// A top-level run
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// A run started by `caller` at `depth`
    #[must_use]
    pub fn nested(depth: usize, caller: &str) -> Self {
        Self {
            depth,
            caller: Some(caller.to_string()),
        }
    }

    /// Nesting depth (0 at the top)
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Fixture that started this run, if nested
    #[must_use]
    pub fn caller(&self) -> Option<&str> {
        self.caller.as_deref()
    }
}

/// Result of processing one specification.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Logical location of the document
    pub resource: Resource,
    /// Rewritten document
    pub html: String,
    /// Recorded outcomes
    pub summary: ResultSummary,
    /// Extension assets to write next to the document
    pub assets: Vec<Asset>,
    /// Painting problems; the summary is unaffected by them
    pub diagnostics: Vec<RenderDiagnostic>,
    fresh_window: Duration,
}

impl ProcessOutput {
    /// Write the document and every asset that is not already fresh.
    pub fn write_to(&self, target: &dyn Target) -> ConcordantResult<()> {
        target.write(&self.resource, self.html.as_bytes())?;
        for asset in &self.assets {
            if target.is_fresh(&asset.resource, &asset.content, self.fresh_window) {
                debug!(resource = %asset.resource, "asset is fresh, skipping");
                continue;
            }
            target.write(&asset.resource, &asset.content)?;
        }
        Ok(())
    }
}

/// Processes specifications against fixtures.
pub struct SpecificationEngine {
    config: EngineConfig,
    extensions: Vec<Rc<dyn Extension>>,
    evaluators: Rc<dyn EvaluatorFactory>,
    runners: BTreeMap<String, Rc<dyn NestedRunner>>,
    painter: OutcomePainter,
}

impl fmt::Debug for SpecificationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecificationEngine")
            .field("config", &self.config)
            .field(
                "extensions",
                &self.extensions.iter().map(|e| e.name().to_string()).collect::<Vec<_>>(),
            )
            .field("runners", &self.runners.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SpecificationEngine {
    /// Start building an engine
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runner registered under `name`
    #[must_use]
    pub fn runner(&self, name: &str) -> Option<Rc<dyn NestedRunner>> {
        self.runners.get(name).cloned()
    }

    fn extension_set(&self, fixture_extensions: &[Rc<dyn Extension>]) -> ConcordantResult<ExtensionSet> {
        let mut builder = ExtensionBuilder::new();
        builder.apply(&BuiltinCommands)?;
        for extension in self.extensions.iter().chain(fixture_extensions) {
            builder.apply(extension.as_ref())?;
        }
        builder.build()
    }

    /// Parse and build the call graph without running anything.
    pub fn check(&self, html: &str, resource: Resource) -> ConcordantResult<CallGraph> {
        let extensions = self.extension_set(&[])?;
        let document = Document::parse(html, resource);
        build_call_graph(&document, extensions.registry())
    }

    /// Process a top-level specification.
    pub fn process(&self, fixture: &mut dyn Fixture, html: &str, resource: Resource) -> ConcordantResult<ProcessOutput> {
        self.process_with_context(fixture, html, resource, &ProcessContext::root())
    }

    /// Read a specification from `source` and process it.
    pub fn process_source(
        &self,
        fixture: &mut dyn Fixture,
        source: &dyn SpecificationSource,
        resource: Resource,
    ) -> ConcordantResult<ProcessOutput> {
        let html = source.read(&resource)?;
        self.process(fixture, &html, resource)
    }

    /// Process a specification within an explicit nesting context.
    pub fn process_with_context(
        &self,
        fixture: &mut dyn Fixture,
        html: &str,
        resource: Resource,
        context: &ProcessContext,
    ) -> ConcordantResult<ProcessOutput> {
        let fixture_name = fixture.name().to_string();
        let extensions = self.extension_set(&fixture.extensions())?;
        let listeners = extensions.listeners();
        debug!(%resource, fixture = %fixture_name, depth = context.depth(), "processing specification");

        let document = Document::parse(html, resource.clone());
        listeners.document_parsed(&document)?;
        self.install_head(&document, &extensions)?;

        let graph = build_call_graph(&document, extensions.registry())?;
        debug!(calls = graph.len(), "call graph built");
        listeners.call_graph_built(&document, &graph)?;

        let mut recorder = ResultRecorder::new();
        {
            let mut evaluator = self.evaluators.create(&mut *fixture);
            let mut ctx = ExecutionContext::new(
                &mut *evaluator,
                &mut recorder,
                listeners,
                &document,
                self,
                context,
                &fixture_name,
            );
            for phase in [Phase::Setup, Phase::Execute, Phase::Verify] {
                debug!(%phase, "running phase");
                run_phase(graph.roots(), phase, &mut ctx)?;
            }
        }
        let summary = recorder.finish(resource.clone());

        let diagnostics = self.painter.paint(summary.outcomes());
        for diagnostic in &diagnostics {
            warn!(element = %diagnostic.element, "could not paint outcome: {}", diagnostic.message);
        }
        listeners.document_built(&document)?;

        info!(
            %resource,
            successes = summary.success_count(),
            failures = summary.failure_count(),
            exceptions = summary.exception_count(),
            "specification processed"
        );
        Ok(ProcessOutput {
            html: document.to_html()?,
            resource,
            summary,
            assets: extensions.assets().to_vec(),
            diagnostics,
            fresh_window: self.config.fresh_window(),
        })
    }

    fn install_head(&self, document: &Document, extensions: &ExtensionSet) -> ConcordantResult<()> {
        if self.config.embed_default_css {
            self.painter.embed_css(document, DEFAULT_CSS)?;
        }
        let head = document.head()?;
        for entry in extensions.head() {
            let element = match entry {
                HeadEntry::LinkedCss(target) => {
                    let link = Element::new("link");
                    link.set_attribute("rel", "stylesheet");
                    link.set_attribute("type", "text/css");
                    link.set_attribute("href", &document.resource().relative_path(target));
                    link
                }
                HeadEntry::EmbeddedCss(css) => {
                    let style = Element::with_text("style", css);
                    style.set_attribute("type", "text/css");
                    style
                }
                HeadEntry::LinkedJavaScript(target) => {
                    let script = Element::new("script");
                    script.set_attribute("type", "text/javascript");
                    script.set_attribute("src", &document.resource().relative_path(target));
                    script
                }
                HeadEntry::EmbeddedJavaScript(js) => {
                    let script = Element::with_text("script", js);
                    script.set_attribute("type", "text/javascript");
                    script
                }
            };
            head.append_child(&element)?;
        }
        Ok(())
    }
}

/// Builder for [`SpecificationEngine`].
pub struct EngineBuilder {
    config: EngineConfig,
    catalog: ExtensionCatalog,
    extensions: Vec<Rc<dyn Extension>>,
    evaluators: Rc<dyn EvaluatorFactory>,
    runners: BTreeMap<String, Rc<dyn NestedRunner>>,
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("catalog", &self.catalog)
            .field("extensions", &self.extensions.len())
            .field("runners", &self.runners.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// Defaults: default config, default catalog, [`SimpleEvaluatorFactory`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            catalog: ExtensionCatalog::default(),
            extensions: Vec::new(),
            evaluators: Rc::new(SimpleEvaluatorFactory),
            runners: BTreeMap::new(),
        }
    }

    /// Use `config`
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve configured extension names through `catalog`
    #[must_use]
    pub fn with_catalog(mut self, catalog: ExtensionCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Add an extension after the configured ones
    #[must_use]
    pub fn with_extension(mut self, extension: Rc<dyn Extension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Replace the evaluator factory
    #[must_use]
    pub fn with_evaluator_factory(mut self, factory: Rc<dyn EvaluatorFactory>) -> Self {
        self.evaluators = factory;
        self
    }

    /// Register a nested runner for the `run` command
    #[must_use]
    pub fn with_runner(mut self, name: impl Into<String>, runner: Rc<dyn NestedRunner>) -> Self {
        self.runners.insert(name.into(), runner);
        self
    }

    /// Resolve configured extensions and build the engine.
    pub fn build(self) -> ConcordantResult<SpecificationEngine> {
        let mut extensions = self.catalog.resolve(&self.config.extensions)?;
        extensions.extend(self.extensions);

        // Surface duplicate or malformed registrations before any document runs.
        let engine = SpecificationEngine {
            config: self.config,
            extensions,
            evaluators: self.evaluators,
            runners: self.runners,
            painter: OutcomePainter::new(),
        };
        engine.extension_set(&[])?;
        Ok(engine)
    }
}
