//! Call-graph construction.

use super::{CallGraph, Command, CommandCall, CommandKey, CommandRegistry};
use crate::document::{split_prefixed, Document, Element};
use crate::result::{ConcordantError, ConcordantResult};
use crate::value::normalise_whitespace;
use std::rc::Rc;

type Found = (CommandKey, Rc<dyn Command>, String);

/// Build the call graph of `document`.
///
/// A call's children are the nearest command-bearing descendants; plain
/// markup in between is skipped. Markup in a registered namespace that names
/// no command or modifier is an error, markup in any other namespace is left
/// alone.
pub fn build_call_graph(document: &Document, registry: &CommandRegistry) -> ConcordantResult<CallGraph> {
    let mut roots = Vec::new();
    let mut next_id = 0;
    collect(&document.root()?, registry, &mut roots, &mut next_id)?;
    Ok(CallGraph::new(roots))
}

fn collect(
    element: &Element,
    registry: &CommandRegistry,
    out: &mut Vec<CommandCall>,
    next_id: &mut usize,
) -> ConcordantResult<()> {
    match command_for(element, registry)? {
        Some((key, command, expression)) => {
            let id = *next_id;
            *next_id += 1;
            let mut children = Vec::new();
            for child in element.child_elements()? {
                collect(&child, registry, &mut children, next_id)?;
            }
            out.push(CommandCall::new(id, element.clone(), command, key, expression, children));
        }
        None => {
            for child in element.child_elements()? {
                collect(&child, registry, out, next_id)?;
            }
        }
    }
    Ok(())
}

/// Resolve a `prefix:local` name. `Some((key, None))` is a modifier.
fn resolve(
    element: &Element,
    registry: &CommandRegistry,
    qualified: &str,
) -> ConcordantResult<Option<(CommandKey, Option<Rc<dyn Command>>)>> {
    let (Some(prefix), local) = split_prefixed(qualified) else {
        return Ok(None);
    };
    if prefix.eq_ignore_ascii_case("xmlns") {
        return Ok(None);
    }
    let Some(namespace) = element.lookup_namespace(prefix) else {
        return Ok(None);
    };
    if !registry.has_namespace(&namespace) {
        return Ok(None);
    }
    let key = CommandKey::new(&namespace, local);
    if registry.is_modifier(&key) {
        return Ok(Some((key, None)));
    }
    match registry.lookup(&key) {
        Some(command) => Ok(Some((key, Some(command)))),
        None => Err(ConcordantError::UnknownCommand {
            namespace,
            name: local.to_string(),
        }),
    }
}

fn command_for(element: &Element, registry: &CommandRegistry) -> ConcordantResult<Option<Found>> {
    let mut found: Vec<Found> = Vec::new();

    if let Some((key, Some(command))) = resolve(element, registry, &element.qualified_name())? {
        let expression = element
            .attribute("expression")
            .unwrap_or_else(|| normalise_whitespace(&element.text()));
        found.push((key, command, expression));
    }
    for (name, value) in element.attributes() {
        if let Some((key, Some(command))) = resolve(element, registry, &name)? {
            found.push((key, command, value.trim().to_string()));
        }
    }

    if found.len() > 1 {
        let names: Vec<&str> = found.iter().map(|(k, _, _)| k.name()).collect();
        return Err(ConcordantError::config(format!(
            "element {element:?} carries more than one command: {}",
            names.join(", ")
        )));
    }
    Ok(found.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{AssertEqualsCommand, EchoCommand, ExecuteCommand};
    use crate::resource::Resource;

    const NS: &str = "urn:concordant:test";

    fn registry() -> CommandRegistry {
        let mut r = CommandRegistry::new();
        r.register(NS, "assertEquals", Rc::new(AssertEqualsCommand)).unwrap();
        r.register(NS, "echo", Rc::new(EchoCommand)).unwrap();
        r.register(NS, "execute", Rc::new(ExecuteCommand)).unwrap();
        r.register_modifier(NS, "expected").unwrap();
        r
    }

    fn graph(body: &str) -> ConcordantResult<CallGraph> {
        let doc = Document::parse(
            &format!("<html xmlns:c=\"{NS}\"><body>{body}</body></html>"),
            Resource::new("/t.html"),
        );
        build_call_graph(&doc, &registry())
    }

    #[test]
    fn test_no_commands() {
        let g = graph("<p>plain <b>text</b></p>").unwrap();
        assert!(g.is_empty());
        assert_eq!(g.len(), 0);
    }

    #[test]
    fn test_case_insensitive_attribute_commands() {
        let g = graph("<span c:ASSERTEQUALS=\"a\">x</span><span c:AssertEquals=\"b\">y</span>").unwrap();
        let names: Vec<&str> = g.walk().iter().map(|c| c.key().name()).collect();
        assert_eq!(names, vec!["assertequals", "assertequals"]);
        assert_eq!(g.roots()[1].expression(), "b");
    }

    #[test]
    fn test_children_skip_plain_markup() {
        let g = graph(
            "<div c:execute=\"go()\"><p>text <em><span c:echo=\"#x\">?</span></em></p>\
             <span c:assertEquals=\"#y\">1</span></div>",
        )
        .unwrap();
        assert_eq!(g.roots().len(), 1);
        let children = g.roots()[0].children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].key().name(), "echo");
        assert_eq!(g.walk().iter().map(|c| c.id()).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_element_form_uses_expression_attribute_or_text() {
        let g = graph("<c:echo expression=\"#a\"></c:echo><c:echo>#b</c:echo>").unwrap();
        assert_eq!(g.roots()[0].expression(), "#a");
        assert_eq!(g.roots()[1].expression(), "#b");
    }

    #[test]
    fn test_unknown_command_in_registered_namespace() {
        let err = graph("<span c:asertEquals=\"x\">x</span>").unwrap_err();
        assert!(matches!(err, ConcordantError::UnknownCommand { ref name, .. } if name == "asertequals"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_foreign_namespace_and_modifiers_are_inert() {
        let g = graph(
            "<span xmlns:o=\"urn:other\" o:whatever=\"1\">x</span>\
             <a href=\"x.html\" c:expected=\"failure\">x</a>",
        )
        .unwrap();
        assert!(g.is_empty());
    }

    #[test]
    fn test_two_commands_on_one_element() {
        let err = graph("<span c:echo=\"#a\" c:assertEquals=\"#b\">x</span>").unwrap_err();
        assert!(matches!(err, ConcordantError::Config { .. }));
    }
}
