//! JavaScript Engine Module (rquickjs)
//!
//! Runs platform signing scripts. Uses `QuickJS` via rquickjs bindings
//! (ES2020, ~1MB). Callers only see the [`ScriptEvaluator`] trait, so the
//! extraction and rewriting logic around it stays testable without an engine.

use rquickjs::{Context, Runtime};
use tracing::debug;

use crate::error::{Error, Result};

/// Narrow script-evaluation capability used by script-evaluated signing.
pub trait ScriptEvaluator: Send + Sync {
    /// Load `code`, call the global function `entry` with string `args`,
    /// and return its result as a string.
    fn execute(&self, code: &str, entry: &str, args: &[&str]) -> Result<String>;
}

/// QuickJS-backed evaluator.
///
/// Every call gets a fresh runtime and context so no script state leaks
/// between signing calls.
#[derive(Debug, Clone, Copy)]
pub struct QuickJsEvaluator {
    memory_limit: usize,
    max_stack_size: usize,
}

impl Default for QuickJsEvaluator {
    fn default() -> Self {
        Self {
            // 32MB is plenty for signing snippets
            memory_limit: 32 * 1024 * 1024,
            max_stack_size: 1024 * 1024,
        }
    }
}

impl QuickJsEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn runtime(&self) -> Result<(Runtime, Context)> {
        let runtime = Runtime::new().map_err(engine_error)?;
        runtime.set_memory_limit(self.memory_limit);
        runtime.set_max_stack_size(self.max_stack_size);
        let context = Context::full(&runtime).map_err(engine_error)?;
        Ok((runtime, context))
    }
}

impl ScriptEvaluator for QuickJsEvaluator {
    fn execute(&self, code: &str, entry: &str, args: &[&str]) -> Result<String> {
        debug!("Evaluating JS: {} chars, entry {entry}", code.len());

        let (_runtime, context) = self.runtime()?;
        let call = call_expression(entry, args)?;

        context.with(|ctx| {
            ctx.eval::<(), _>(code)
                .map_err(|e| Error::signing(describe(&ctx, &e, "loading script")))?;
            ctx.eval::<String, _>(call.as_str())
                .map_err(|e| Error::signing(describe(&ctx, &e, entry)))
        })
    }
}

/// `entry("a","b")` with every argument JSON-quoted.
fn call_expression(entry: &str, args: &[&str]) -> Result<String> {
    if entry.is_empty() || !entry.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(Error::signing(format!("invalid entry point {entry:?}")));
    }
    let quoted = args
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(format!("{entry}({})", quoted.join(",")))
}

fn describe(ctx: &rquickjs::Ctx<'_>, err: &rquickjs::Error, what: &str) -> String {
    if matches!(err, rquickjs::Error::Exception) {
        let exception = ctx.catch();
        if let Some(message) = exception
            .as_exception()
            .and_then(rquickjs::Exception::message)
        {
            return format!("{what}: {message}");
        }
        return format!("{what}: {exception:?}");
    }
    format!("{what}: {err}")
}

fn engine_error(err: rquickjs::Error) -> Error {
    Error::signing(format!("script engine unavailable: {err}"))
}
