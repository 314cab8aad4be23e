//! Run command handler

use super::locate_spec;
use crate::config::CliConfig;
use crate::output::{OutputFormat, RunReport, SummaryPrinter};
use crate::{CliResult, RunArgs};
use concordant::{
    DataFixture, FileSource, FileTarget, Fixture, FixtureRunner, RunnerError, SpecificationEngine,
    SpecificationSource,
};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

/// Name under which `run` commands reach linked specifications
pub const RUNNER_NAME: &str = "concordant";

const DATA_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Fixture for a specification: the data file next to it with the same
/// stem, or an empty fixture named after it.
pub fn fixture_for(spec: &Path) -> CliResult<DataFixture> {
    for extension in DATA_EXTENSIONS {
        let candidate = spec.with_extension(extension);
        if candidate.is_file() {
            debug!(data = %candidate.display(), "using fixture data");
            return Ok(DataFixture::from_path(&candidate)?);
        }
    }
    let name = spec
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(DataFixture::new(name))
}

/// Execute the run command. Returns whether every specification passed.
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<bool> {
    let (root, resource) = locate_spec(&args.spec)?;
    let mut fixture = match &args.data {
        Some(path) => DataFixture::from_path(path)?,
        None => fixture_for(&args.spec)?,
    };

    let source = Rc::new(FileSource::new(&root));
    let nested_root = root.clone();
    let runner = Rc::new(FixtureRunner::new(source.clone(), move |request| {
        let path = nested_root.join(request.resource.path().trim_start_matches('/'));
        fixture_for(&path)
            .map(|fixture| Box::new(fixture) as Box<dyn Fixture>)
            .map_err(|e| RunnerError::Fixture {
                resource: request.resource.clone(),
                message: e.to_string(),
            })
    }));

    let engine = SpecificationEngine::builder()
        .with_config(config.engine.clone())
        .with_runner(RUNNER_NAME, runner.clone())
        .build()?;

    let html = source.read(&resource)?;
    let output = engine.process(&mut fixture, &html, resource)?;
    let nested = runner.take_outputs();

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.engine.output_dir.clone());
    let target = FileTarget::new(&output_dir);
    output.write_to(&target)?;
    for nested_output in &nested {
        nested_output.write_to(&target)?;
    }
    let written: PathBuf = target.path_for(&output.resource);
    info!(output = %written.display(), nested = nested.len(), "wrote results");

    match OutputFormat::from(args.format) {
        OutputFormat::Text => {
            let printer = SummaryPrinter::new(config.color.should_color(), config.verbosity.is_quiet());
            for nested_output in &nested {
                printer.summary(&nested_output.summary);
            }
            printer.summary(&output.summary);
            printer.written(&written);
        }
        OutputFormat::Json => {
            let summaries: Vec<_> = nested.iter().map(|n| n.summary.clone()).collect();
            let report = RunReport::new(written, &output.summary, &summaries);
            println!("{}", report.to_json()?);
        }
    }

    Ok(output.summary.is_success())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commands::OutputFormatArg;
    use concordant::EngineConfig;

    const SPEC: &str = r#"<html xmlns:c="urn:concordant:2024"><body>
        <p>Hello <span c:echo="user">?</span>, the answer is
        <span c:assertEquals="answer">42</span>.</p>
        <a c:run="concordant" href="Child.html">child</a>
    </body></html>"#;

    const CHILD: &str = r#"<html xmlns:c="urn:concordant:2024"><body>
        <span c:assertEquals="name">child</span>
    </body></html>"#;

    fn args(spec: PathBuf, output: PathBuf) -> RunArgs {
        RunArgs {
            spec,
            data: None,
            output: Some(output),
            format: OutputFormatArg::Json,
        }
    }

    #[test]
    fn test_fixture_for_prefers_sibling_data() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("Answer.html");
        std::fs::write(dir.path().join("Answer.json"), r#"{"answer": 42}"#).unwrap();
        let fixture = fixture_for(&spec).unwrap();
        assert_eq!(fixture.name(), "Answer");
        assert_eq!(fixture.property("answer").unwrap(), serde_json::json!(42));

        let empty = fixture_for(&dir.path().join("Other.html")).unwrap();
        assert_eq!(empty.name(), "Other");
    }

    #[test]
    fn test_run_writes_documents_and_reports_success() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("Index.html");
        std::fs::write(&spec, SPEC).unwrap();
        std::fs::write(dir.path().join("Index.yaml"), "user: alice\nanswer: 42\n").unwrap();
        std::fs::write(dir.path().join("Child.html"), CHILD).unwrap();
        std::fs::write(dir.path().join("Child.yaml"), "name: child\n").unwrap();

        let out = dir.path().join("out");
        let config = CliConfig::new().with_verbosity(crate::Verbosity::Quiet);
        let passed = execute_run(&config, &args(spec, out.clone())).unwrap();
        assert!(passed);

        let written = std::fs::read_to_string(out.join("Index.html")).unwrap();
        assert!(written.contains(">alice</span>"));
        assert!(written.contains("class=\"success\""));
        assert!(out.join("Child.html").is_file());
    }

    #[test]
    fn test_run_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("Index.html");
        std::fs::write(&spec, SPEC).unwrap();
        std::fs::write(dir.path().join("Index.yaml"), "user: bob\nanswer: 41\n").unwrap();
        std::fs::write(dir.path().join("Child.html"), CHILD).unwrap();

        let mut config = CliConfig::new().with_verbosity(crate::Verbosity::Quiet);
        config.engine = EngineConfig::default().with_embed_default_css(false);
        let passed = execute_run(&config, &args(spec, dir.path().join("out"))).unwrap();
        assert!(!passed);
    }

    #[test]
    fn test_broken_child_data_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let spec = dir.path().join("Index.html");
        std::fs::write(&spec, SPEC).unwrap();
        std::fs::write(dir.path().join("Index.yaml"), "user: alice\nanswer: 42\n").unwrap();
        std::fs::write(dir.path().join("Child.html"), CHILD).unwrap();
        std::fs::write(dir.path().join("Child.yaml"), "name: [unclosed\n").unwrap();

        let out = dir.path().join("out");
        let config = CliConfig::new().with_verbosity(crate::Verbosity::Quiet);
        let passed = execute_run(&config, &args(spec, out.clone())).unwrap();
        assert!(!passed);

        let written = std::fs::read_to_string(out.join("Index.html")).unwrap();
        assert!(written.contains("cannot load fixture for /Child.html"));
        assert!(!written.contains("no fixture for"));
    }
}
