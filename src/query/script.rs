use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::config::Settings;

use super::{EvalError, Page, PageIndex, ParseError, Value, execute_inline, parse_field};

/// Names under which the API is visible to scripts.
pub const API_ALIASES: [&str; 2] = ["dv", "dataview"];

/// Error raised by a script.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ScriptError {
    pub message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ParseError> for ScriptError {
    fn from(err: ParseError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<EvalError> for ScriptError {
    fn from(err: EvalError) -> Self {
        Self::new(err.to_string())
    }
}

/// API handed to script queries, bound once per alias in [`API_ALIASES`].
#[derive(Clone)]
pub struct ScriptApi {
    file_path: PathBuf,
    index: Rc<dyn PageIndex>,
    settings: Settings,
}

impl ScriptApi {
    pub fn new(file_path: impl Into<PathBuf>, index: Rc<dyn PageIndex>, settings: Settings) -> Self {
        Self {
            file_path: file_path.into(),
            index,
            settings,
        }
    }

    /// Path of the file the query is rendered in.
    pub fn current_path(&self) -> &Path {
        &self.file_path
    }

    /// The page the query is rendered in.
    pub fn current(&self) -> Option<&Page> {
        self.index.page(&self.file_path)
    }

    /// Any indexed page.
    pub fn page(&self, path: &Path) -> Option<&Page> {
        self.index.page(path)
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Evaluate an expression in the current file's context.
    ///
    /// # Errors
    /// Returns a [`ScriptError`] when the expression fails to parse or
    /// evaluate.
    pub fn evaluate(&self, code: &str) -> Result<Value, ScriptError> {
        let expr = parse_field(code)?;
        Ok(execute_inline(
            &expr,
            &self.file_path,
            self.index.as_ref(),
            &self.settings,
        )?)
    }
}

impl std::fmt::Debug for ScriptApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptApi")
            .field("file_path", &self.file_path)
            .field("aliases", &API_ALIASES)
            .finish_non_exhaustive()
    }
}

/// Sandbox that runs script queries.
pub trait ScriptHost {
    /// Run a script to completion.
    ///
    /// # Errors
    /// Returns whatever the script raised.
    fn execute(&self, code: &str, api: &ScriptApi) -> Result<Value, ScriptError>;

    /// Run a script that awaits. The result is delivered later through the
    /// returned future.
    fn execute_deferred(
        &self,
        code: &str,
        api: &ScriptApi,
    ) -> LocalBoxFuture<'static, Result<Value, ScriptError>>;
}

/// Host used when no script runtime is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableScriptHost;

const NO_RUNTIME: &str = "no script runtime is available";

impl ScriptHost for UnavailableScriptHost {
    fn execute(&self, _code: &str, _api: &ScriptApi) -> Result<Value, ScriptError> {
        Err(ScriptError::new(NO_RUNTIME))
    }

    fn execute_deferred(
        &self,
        _code: &str,
        _api: &ScriptApi,
    ) -> LocalBoxFuture<'static, Result<Value, ScriptError>> {
        Box::pin(async { Err(ScriptError::new(NO_RUNTIME)) })
    }
}

/// Whether script code must run on the deferred path.
pub fn is_deferred(code: &str) -> bool {
    code.contains("await")
}
