//! Extensions: extra commands, listeners and assets.
//!
//! Every run assembles a fresh [`ExtensionSet`]: the built-in commands first,
//! then configured extensions in order, then the fixture's own. Once
//! [`ExtensionBuilder::build`] has run the builder is sealed and further
//! registrations fail.

use crate::command::{
    AssertBooleanCommand, AssertEqualsCommand, Command, CommandRegistry, EchoCommand, ExecuteCommand,
    RunCommand, SetCommand, VerifyRowsCommand, CONCORDANT_NAMESPACE,
};
use crate::listener::{
    AssertFailureEvent, AssertListener, AssertSuccessEvent, BuildListener, DocumentParsingListener,
    ExceptionEvent, ExceptionListener, ExecuteEvent, ExecuteListener, ExpressionEvaluatedEvent,
    ListenerBus, ListenerResult, MissingRowEvent, SurplusRowEvent, VerifyRowsListener,
};
use crate::resource::Resource;
use crate::result::{ConcordantError, ConcordantResult};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Contributes registrations to an [`ExtensionBuilder`].
pub trait Extension {
    /// Name used in configuration and diagnostics
    fn name(&self) -> &str;

    /// Register commands, listeners and assets
    fn add_to(&self, builder: &mut ExtensionBuilder) -> ConcordantResult<()>;
}

/// Something an extension asks to be placed in `<head>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadEntry {
    /// `<link rel="stylesheet">` to a written asset
    LinkedCss(Resource),
    /// Inline `<style>`
    EmbeddedCss(String),
    /// `<script src>` to a written asset
    LinkedJavaScript(Resource),
    /// Inline `<script>`
    EmbeddedJavaScript(String),
}

/// Content written next to the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Where the content goes
    pub resource: Resource,
    /// The bytes
    pub content: Vec<u8>,
}

/// Collects registrations until sealed by [`build`](Self::build).
pub struct ExtensionBuilder {
    registry: CommandRegistry,
    listeners: ListenerBus,
    head: Vec<HeadEntry>,
    assets: Vec<Asset>,
    sealed: bool,
}

impl fmt::Debug for ExtensionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionBuilder")
            .field("registry", &self.registry)
            .field("listeners", &self.listeners)
            .field("head", &self.head)
            .field("assets", &self.assets.len())
            .field("sealed", &self.sealed)
            .finish()
    }
}

impl Default for ExtensionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionBuilder {
    /// Create an empty, open builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: CommandRegistry::new(),
            listeners: ListenerBus::new(),
            head: Vec::new(),
            assets: Vec::new(),
            sealed: false,
        }
    }

    fn ensure_open(&self, what: &str) -> ConcordantResult<()> {
        if self.sealed {
            return Err(ConcordantError::LateRegistration {
                what: what.to_string(),
            });
        }
        Ok(())
    }

    /// Apply an extension
    pub fn apply(&mut self, extension: &dyn Extension) -> ConcordantResult<()> {
        self.ensure_open(&format!("extension '{}'", extension.name()))?;
        debug!(extension = extension.name(), "applying extension");
        extension.add_to(self)
    }

    /// Register a command under `(namespace, name)`; the name is case-insensitive
    pub fn add_command(&mut self, namespace: &str, name: &str, command: Rc<dyn Command>) -> ConcordantResult<&mut Self> {
        self.ensure_open(&format!("command '{name}'"))?;
        self.registry.register(namespace, name, command)?;
        Ok(self)
    }

    /// Register a modifier attribute read by commands
    pub fn add_modifier(&mut self, namespace: &str, name: &str) -> ConcordantResult<&mut Self> {
        self.ensure_open(&format!("modifier '{name}'"))?;
        self.registry.register_modifier(namespace, name)?;
        Ok(self)
    }

    /// Register a document-parsing listener
    pub fn add_document_parsing_listener(&mut self, listener: Rc<dyn DocumentParsingListener>) -> ConcordantResult<&mut Self> {
        self.ensure_open("document parsing listener")?;
        self.listeners.add_parsing(listener);
        Ok(self)
    }

    /// Register a build listener
    pub fn add_build_listener(&mut self, listener: Rc<dyn BuildListener>) -> ConcordantResult<&mut Self> {
        self.ensure_open("build listener")?;
        self.listeners.add_build(listener);
        Ok(self)
    }

    /// Register an assert listener
    pub fn add_assert_listener(&mut self, listener: Rc<dyn AssertListener>) -> ConcordantResult<&mut Self> {
        self.ensure_open("assert listener")?;
        self.listeners.add_assert(listener);
        Ok(self)
    }

    /// Register an execute listener
    pub fn add_execute_listener(&mut self, listener: Rc<dyn ExecuteListener>) -> ConcordantResult<&mut Self> {
        self.ensure_open("execute listener")?;
        self.listeners.add_execute(listener);
        Ok(self)
    }

    /// Register a verify-rows listener
    pub fn add_verify_rows_listener(&mut self, listener: Rc<dyn VerifyRowsListener>) -> ConcordantResult<&mut Self> {
        self.ensure_open("verify rows listener")?;
        self.listeners.add_verify_rows(listener);
        Ok(self)
    }

    /// Register an exception listener
    pub fn add_exception_listener(&mut self, listener: Rc<dyn ExceptionListener>) -> ConcordantResult<&mut Self> {
        self.ensure_open("exception listener")?;
        self.listeners.add_exception(listener);
        Ok(self)
    }

    /// Copy a file to `target` alongside the output.
    pub fn add_resource(&mut self, source: &Path, target: Resource) -> ConcordantResult<&mut Self> {
        self.ensure_open(&format!("resource {target}"))?;
        let content = std::fs::read(source)?;
        self.assets.push(Asset {
            resource: target,
            content,
        });
        Ok(self)
    }

    /// Write `css` to `target` and link it from each document
    pub fn add_linked_css(&mut self, target: Resource, css: &str) -> ConcordantResult<&mut Self> {
        self.ensure_open(&format!("stylesheet {target}"))?;
        self.assets.push(Asset {
            resource: target.clone(),
            content: css.as_bytes().to_vec(),
        });
        self.head.push(HeadEntry::LinkedCss(target));
        Ok(self)
    }

    /// Embed `css` into each document
    pub fn add_embedded_css(&mut self, css: &str) -> ConcordantResult<&mut Self> {
        self.ensure_open("embedded stylesheet")?;
        self.head.push(HeadEntry::EmbeddedCss(css.to_string()));
        Ok(self)
    }

    /// Write `script` to `target` and link it from each document
    pub fn add_linked_javascript(&mut self, target: Resource, script: &str) -> ConcordantResult<&mut Self> {
        self.ensure_open(&format!("script {target}"))?;
        self.assets.push(Asset {
            resource: target.clone(),
            content: script.as_bytes().to_vec(),
        });
        self.head.push(HeadEntry::LinkedJavaScript(target));
        Ok(self)
    }

    /// Embed `script` into each document
    pub fn add_embedded_javascript(&mut self, script: &str) -> ConcordantResult<&mut Self> {
        self.ensure_open("embedded script")?;
        self.head.push(HeadEntry::EmbeddedJavaScript(script.to_string()));
        Ok(self)
    }

    /// Seal the builder and hand out the finished set.
    pub fn build(&mut self) -> ConcordantResult<ExtensionSet> {
        self.ensure_open("extension set")?;
        self.sealed = true;
        Ok(ExtensionSet {
            registry: std::mem::take(&mut self.registry),
            listeners: std::mem::take(&mut self.listeners),
            head: std::mem::take(&mut self.head),
            assets: std::mem::take(&mut self.assets),
        })
    }
}

/// Read-only registrations for one run.
#[derive(Debug, Clone)]
pub struct ExtensionSet {
    registry: CommandRegistry,
    listeners: ListenerBus,
    head: Vec<HeadEntry>,
    assets: Vec<Asset>,
}

impl ExtensionSet {
    /// Command dispatch table
    #[must_use]
    pub const fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Listener bus
    #[must_use]
    pub const fn listeners(&self) -> &ListenerBus {
        &self.listeners
    }

    /// `<head>` entries in registration order
    #[must_use]
    pub fn head(&self) -> &[HeadEntry] {
        &self.head
    }

    /// Assets to write
    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }
}

/// The built-in command vocabulary in [`CONCORDANT_NAMESPACE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCommands;

impl Extension for BuiltinCommands {
    fn name(&self) -> &str {
        "builtin"
    }

    fn add_to(&self, builder: &mut ExtensionBuilder) -> ConcordantResult<()> {
        let ns = CONCORDANT_NAMESPACE;
        builder
            .add_command(ns, "assertEquals", Rc::new(AssertEqualsCommand))?
            .add_command(ns, "assertTrue", Rc::new(AssertBooleanCommand::assert_true()))?
            .add_command(ns, "assertFalse", Rc::new(AssertBooleanCommand::assert_false()))?
            .add_command(ns, "echo", Rc::new(EchoCommand))?
            .add_command(ns, "execute", Rc::new(ExecuteCommand))?
            .add_command(ns, "set", Rc::new(SetCommand))?
            .add_command(ns, "run", Rc::new(RunCommand))?
            .add_command(ns, "verifyRows", Rc::new(VerifyRowsCommand))?
            .add_modifier(ns, "expected")?;
        Ok(())
    }
}

/// Logs run events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventLoggingExtension;

impl Extension for EventLoggingExtension {
    fn name(&self) -> &str {
        "log-events"
    }

    fn add_to(&self, builder: &mut ExtensionBuilder) -> ConcordantResult<()> {
        let listener = Rc::new(EventLogger);
        builder
            .add_assert_listener(listener.clone())?
            .add_execute_listener(listener.clone())?
            .add_verify_rows_listener(listener.clone())?
            .add_exception_listener(listener)?;
        Ok(())
    }
}

#[derive(Debug)]
struct EventLogger;

impl AssertListener for EventLogger {
    fn success_reported(&self, event: &AssertSuccessEvent) -> ListenerResult {
        info!(element = ?event.element, "assertion passed");
        Ok(())
    }

    fn failure_reported(&self, event: &AssertFailureEvent) -> ListenerResult {
        warn!(element = ?event.element, expected = %event.expected, actual = %event.actual, "assertion failed");
        Ok(())
    }
}

impl ExecuteListener for EventLogger {
    fn execute_completed(&self, event: &ExecuteEvent) -> ListenerResult {
        info!(expression = %event.expression, "executed");
        Ok(())
    }
}

impl VerifyRowsListener for EventLogger {
    fn expression_evaluated(&self, event: &ExpressionEvaluatedEvent) -> ListenerResult {
        info!(expression = %event.expression, rows = event.items.len(), "row sequence produced");
        Ok(())
    }

    fn missing_row(&self, event: &MissingRowEvent) -> ListenerResult {
        warn!(expected = %event.expected, "missing row");
        Ok(())
    }

    fn surplus_row(&self, event: &SurplusRowEvent) -> ListenerResult {
        warn!(actual = %event.actual, "surplus row");
        Ok(())
    }
}

impl ExceptionListener for EventLogger {
    fn exception_caught(&self, event: &ExceptionEvent) -> ListenerResult {
        warn!(expression = %event.expression, kind = event.error.kind(), "{}", event.error);
        Ok(())
    }
}

type ExtensionFactory = Box<dyn Fn() -> Rc<dyn Extension>>;

/// Resolves extension names from configuration.
pub struct ExtensionCatalog {
    factories: BTreeMap<String, ExtensionFactory>,
}

impl fmt::Debug for ExtensionCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionCatalog")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ExtensionCatalog {
    fn default() -> Self {
        Self::new().with("log-events", || Rc::new(EventLoggingExtension))
    }
}

impl ExtensionCatalog {
    /// Catalog with no entries
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Add a named factory
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Rc<dyn Extension> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    /// Known names
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Instantiate `names` in order
    pub fn resolve(&self, names: &[String]) -> ConcordantResult<Vec<Rc<dyn Extension>>> {
        names
            .iter()
            .map(|name| {
                self.factories
                    .get(name)
                    .map(|factory| factory())
                    .ok_or_else(|| ConcordantError::InvalidExtension {
                        name: name.clone(),
                        message: format!("not in catalog (known: {})", self.names().join(", ")),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    struct Marker(&'static str);

    impl DocumentParsingListener for Marker {
        fn document_parsed(&self, document: &Document) -> ListenerResult {
            let body = document
                .body()
                .map_err(|e| crate::listener::ListenerError::new(self.0, e.to_string()))?;
            body.append_attribute("data-ext", self.0);
            Ok(())
        }
    }

    impl Extension for Marker {
        fn name(&self) -> &str {
            self.0
        }

        fn add_to(&self, builder: &mut ExtensionBuilder) -> ConcordantResult<()> {
            builder.add_document_parsing_listener(Rc::new(Marker(self.0)))?;
            Ok(())
        }
    }

    mod builder_tests {
        use super::*;

        #[test]
        fn test_builtins_register_vocabulary() {
            let mut builder = ExtensionBuilder::new();
            builder.apply(&BuiltinCommands).unwrap();
            let set = builder.build().unwrap();
            assert_eq!(set.registry().len(), 8);
            assert_eq!(set.registry().namespaces(), [CONCORDANT_NAMESPACE.to_string()]);
        }

        #[test]
        fn test_late_registration_rejected() {
            let mut builder = ExtensionBuilder::new();
            builder.build().unwrap();
            let err = builder.add_embedded_css("p {}").unwrap_err();
            assert!(matches!(err, ConcordantError::LateRegistration { .. }));
            assert!(builder.build().is_err());
            assert!(builder.apply(&EventLoggingExtension).is_err());
        }

        #[test]
        fn test_duplicate_builtin_rejected() {
            let mut builder = ExtensionBuilder::new();
            builder.apply(&BuiltinCommands).unwrap();
            let err = builder
                .add_command(CONCORDANT_NAMESPACE, "ECHO", Rc::new(EchoCommand))
                .unwrap_err();
            assert!(matches!(err, ConcordantError::DuplicateCommand { .. }));
        }

        #[test]
        fn test_assets_and_head_keep_order() {
            let mut builder = ExtensionBuilder::new();
            builder
                .add_linked_css(Resource::new("/css/x.css"), "p {}")
                .unwrap()
                .add_embedded_javascript("go()")
                .unwrap();
            let set = builder.build().unwrap();
            assert_eq!(
                set.head(),
                [
                    HeadEntry::LinkedCss(Resource::new("/css/x.css")),
                    HeadEntry::EmbeddedJavaScript("go()".to_string()),
                ]
            );
            assert_eq!(set.assets()[0].content, b"p {}");
        }

        #[test]
        fn test_add_resource_reads_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("logo.png");
            std::fs::write(&path, [1u8, 2, 3]).unwrap();
            let mut builder = ExtensionBuilder::new();
            builder.add_resource(&path, Resource::new("/img/logo.png")).unwrap();
            assert_eq!(builder.build().unwrap().assets()[0].content, vec![1, 2, 3]);
        }
    }

    mod ordering_tests {
        use super::*;

        #[test]
        fn test_listeners_fire_in_registration_order() {
            let mut builder = ExtensionBuilder::new();
            builder.apply(&Marker("one")).unwrap();
            builder.apply(&Marker("two")).unwrap();
            let set = builder.build().unwrap();

            let doc = Document::parse("<p>x</p>", Resource::new("/a.html"));
            set.listeners().document_parsed(&doc).unwrap();
            assert_eq!(doc.body().unwrap().attribute("data-ext").as_deref(), Some("one,two"));
        }
    }

    mod catalog_tests {
        use super::*;

        #[test]
        fn test_resolves_known_names() {
            let catalog = ExtensionCatalog::default();
            let resolved = catalog.resolve(&["log-events".to_string()]).unwrap();
            assert_eq!(resolved[0].name(), "log-events");
        }

        #[test]
        fn test_unknown_name_is_invalid_extension() {
            let err = ExtensionCatalog::default()
                .resolve(&["nope".to_string()])
                .err().unwrap();
            assert!(matches!(err, ConcordantError::InvalidExtension { ref name, .. } if name == "nope"));
            assert!(err.is_configuration());
        }
    }
}
