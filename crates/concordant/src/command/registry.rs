//! Command dispatch table.

use super::Command;
use crate::result::{ConcordantError, ConcordantResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// `(namespace URI, lower-cased local name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandKey {
    namespace: String,
    name: String,
}

impl CommandKey {
    /// Create a key; the local name is case-folded
    #[must_use]
    pub fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_lowercase(),
        }
    }

    /// Namespace URI
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Lower-cased local name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.name)
    }
}

/// Maps command keys to implementations.
///
/// Modifier names (such as `expected`) live in the same namespaces but are
/// read by commands rather than dispatched.
#[derive(Default, Clone)]
pub struct CommandRegistry {
    commands: BTreeMap<CommandKey, Rc<dyn Command>>,
    modifiers: BTreeSet<CommandKey>,
    namespaces: Vec<String>,
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("modifiers", &self.modifiers)
            .field("namespaces", &self.namespaces)
            .finish()
    }
}

impl CommandRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, key: &CommandKey) -> ConcordantResult<()> {
        if self.commands.contains_key(key) || self.modifiers.contains(key) {
            return Err(ConcordantError::DuplicateCommand {
                namespace: key.namespace.clone(),
                name: key.name.clone(),
            });
        }
        if !self.namespaces.contains(&key.namespace) {
            self.namespaces.push(key.namespace.clone());
        }
        Ok(())
    }

    /// Register a command
    pub fn register(&mut self, namespace: &str, name: &str, command: Rc<dyn Command>) -> ConcordantResult<()> {
        let key = CommandKey::new(namespace, name);
        self.claim(&key)?;
        self.commands.insert(key, command);
        Ok(())
    }

    /// Register a modifier attribute name
    pub fn register_modifier(&mut self, namespace: &str, name: &str) -> ConcordantResult<()> {
        let key = CommandKey::new(namespace, name);
        self.claim(&key)?;
        self.modifiers.insert(key);
        Ok(())
    }

    /// Command registered under `key`
    #[must_use]
    pub fn lookup(&self, key: &CommandKey) -> Option<Rc<dyn Command>> {
        self.commands.get(key).cloned()
    }

    /// Whether `key` names a modifier
    #[must_use]
    pub fn is_modifier(&self, key: &CommandKey) -> bool {
        self.modifiers.contains(key)
    }

    /// Whether any command or modifier lives in `namespace`
    #[must_use]
    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.iter().any(|n| n == namespace)
    }

    /// Registered namespaces in registration order
    #[must_use]
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    /// Number of registered commands
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
