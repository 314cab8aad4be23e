//! `run`: execute a linked specification and assert its verdict.

use super::{Command, CommandCall, ExecutionContext};
use crate::evaluator::EvaluationError;
use crate::result::ConcordantResult;
use crate::runner::{RunRequest, RunVerdict, RunnerError};
use crate::value::Value;
use tracing::debug;

/// `prefix:run="runner"` on an element with an `href`. The verdict of the
/// nested run is compared with the `expected` modifier (`success` when
/// absent). Runner errors are recorded as exceptions on this element, except
/// an aborted nested run, which aborts this run as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunCommand;

impl Command for RunCommand {
    fn name(&self) -> &str {
        "run"
    }

    fn execute(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        let element = call.element();
        let runner_name = call.expression();
        let Some(href) = element.attribute("href") else {
            let error = EvaluationError::syntax(runner_name, "run requires an href attribute");
            return ctx.record_exception(element, runner_name, &error);
        };

        let engine = ctx.engine();
        let request = RunRequest {
            caller: ctx.fixture_name().to_string(),
            resource: ctx.document().relative_resource(&href),
            href,
            depth: ctx.process().depth() + 1,
        };
        debug!(runner = runner_name, resource = %request.resource, depth = request.depth, "nested run");

        let max_depth = engine.config().max_nesting_depth;
        let verdict = if request.depth > max_depth {
            Err(RunnerError::DepthExceeded {
                depth: request.depth,
                max: max_depth,
            })
        } else {
            engine
                .runner(runner_name)
                .ok_or_else(|| RunnerError::UnknownRunner {
                    name: runner_name.to_string(),
                })
                .and_then(|runner| runner.run(engine, &request))
        };

        match verdict {
            Ok(verdict) => {
                call.capture(Value::String(verdict.as_str().to_string()));
                Ok(())
            }
            Err(RunnerError::Aborted(error)) => Err(error),
            Err(error) => ctx.record_exception(element, runner_name, &error.to_evaluation_error(runner_name)),
        }
    }

    fn verify(&self, call: &CommandCall, ctx: &mut ExecutionContext<'_>) -> ConcordantResult<()> {
        let Some(Value::String(actual)) = call.captured() else {
            return Ok(());
        };
        let expected_text = call
            .element()
            .namespaced_attribute(call.key().namespace(), "expected")
            .unwrap_or_else(|| RunVerdict::Success.as_str().to_string());
        let Some(expected) = RunVerdict::parse(&expected_text) else {
            let error = EvaluationError::syntax(
                &expected_text,
                "expected must be one of success, failure, exception",
            );
            return ctx.record_exception(call.element(), call.expression(), &error);
        };
        if expected.as_str() == actual {
            ctx.record_success(call.element())
        } else {
            ctx.record_failure(call.element(), expected.as_str(), &actual)
        }
    }
}
