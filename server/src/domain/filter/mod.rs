//! jq filter compilation and execution
//!
//! Wraps the jaq engine behind a small surface: a filter string is parsed and
//! compiled once into a [`CompiledFilter`], which can then be run any number
//! of times (concurrently) against JSON documents. Each run produces a fresh
//! lazy sequence of results that callers consume through a closure, so a run
//! only evaluates as far as the consumer pulls.

mod diagnostics;
mod extract;

pub use extract::first_value;

use std::fmt;

use jaq_core::load::{Arena, File, Loader};
use jaq_core::{Compiler, Ctx, Native, RcIter};
use jaq_json::Val;
use opentelemetry::global;
use opentelemetry::trace::{Status, TraceContextExt, Tracer};
use opentelemetry::{Context, KeyValue};
use serde_json::Value;
use thiserror::Error;

use crate::core::constants::{APP_NAME, SPAN_COMPILE_FILTER, SPAN_RUN_FILTER};

/// Errors raised by the query engine. Messages are passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The filter text could not be lexed or parsed
    #[error("{0}")]
    Parse(String),
    /// The filter parsed but references something undefined
    #[error("{0}")]
    Compile(String),
    /// Raised while producing results
    #[error("{0}")]
    Execution(String),
}

/// Lazy, possibly error-terminated sequence of filter results
pub type Outputs<'a> = dyn Iterator<Item = Result<Value, FilterError>> + 'a;

/// A parsed and compiled jq program
pub struct CompiledFilter {
    source: String,
    filter: jaq_core::Filter<Native<Val>>,
}

impl CompiledFilter {
    /// Parse and compile `source`
    pub fn compile(source: &str) -> Result<Self, FilterError> {
        global::tracer(APP_NAME).in_span(SPAN_COMPILE_FILTER, |cx| {
            let result = Self::compile_inner(source);
            if let Err(e) = &result {
                record_error(&cx, e);
            }
            result
        })
    }

    fn compile_inner(source: &str) -> Result<Self, FilterError> {
        let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = Arena::default();

        let modules = loader
            .load(
                &arena,
                File {
                    code: source,
                    path: (),
                },
            )
            .map_err(|errs| FilterError::Parse(diagnostics::load_errors(errs)))?;

        let filter = Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(|errs| FilterError::Compile(diagnostics::compile_errors(errs)))?;

        tracing::trace!(filter = %source, "Compiled jq filter");

        Ok(Self {
            source: source.to_string(),
            filter,
        })
    }

    /// The filter text this program was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run the filter against `input` and hand the lazy result sequence to `consume`.
    ///
    /// Results are produced on demand; whatever `consume` leaves unread is
    /// never evaluated.
    pub fn run<R>(&self, input: Value, consume: impl FnOnce(&mut Outputs<'_>) -> R) -> R {
        global::tracer(APP_NAME).in_span(SPAN_RUN_FILTER, |cx| {
            cx.span()
                .set_attribute(KeyValue::new("jq.filter", self.source.clone()));

            let inputs = RcIter::new(core::iter::empty());
            let mut outputs = self
                .filter
                .run((Ctx::new([], &inputs), Val::from(input)))
                .map(|output| {
                    output
                        .map(Value::from)
                        .map_err(|e| FilterError::Execution(e.to_string()))
                });

            consume(&mut outputs)
        })
    }

    /// Run the filter and keep only the first meaningful result
    pub fn first_value(&self, input: Value) -> Result<Option<Value>, FilterError> {
        let result = self.run(input, |outputs| first_value(outputs));
        if let Err(e) = &result {
            tracing::debug!(filter = %self.source, error = %e, "jq filter execution failed");
        }
        result
    }
}

impl fmt::Debug for CompiledFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Two programs are equal when they were compiled from the same text
impl PartialEq for CompiledFilter {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

fn record_error(cx: &Context, error: &FilterError) {
    cx.span().set_status(Status::error(error.to_string()));
}
