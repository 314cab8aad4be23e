//! Check command handler

use super::locate_spec;
use crate::config::CliConfig;
use crate::{CheckArgs, CliResult};
use concordant::{FileSource, SpecificationEngine, SpecificationSource};

/// Build the call tree of a specification and return its listing.
///
/// Nothing is evaluated, so no fixture is needed; unknown commands and
/// other configuration errors surface here.
pub fn check_spec(config: &CliConfig, args: &CheckArgs) -> CliResult<String> {
    let (root, resource) = locate_spec(&args.spec)?;
    let html = FileSource::new(root).read(&resource)?;
    let engine = SpecificationEngine::builder()
        .with_config(config.engine.clone())
        .build()?;
    let graph = engine.check(&html, resource.clone())?;

    let mut out = format!("{resource}: {} command(s)\n", graph.walk().len());
    out.push_str(&graph.render_tree());
    Ok(out)
}

/// Execute the check command
pub fn execute_check(config: &CliConfig, args: &CheckArgs) -> CliResult<()> {
    print!("{}", check_spec(config, args)?);
    Ok(())
}
