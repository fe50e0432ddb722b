//! Compiled middlewares and user checkers.

use super::param::ParamMetadata;
use super::records::MethodRef;
use crate::execution::Executor;
use crate::types::{ClassRef, MiddlewareRuntime};
use async_trait::async_trait;
use std::sync::Arc;

/// A middleware class with its `use` entry point
#[derive(Debug)]
pub struct MiddlewareMetadata {
    /// Middleware class
    pub target: ClassRef,
    /// Applies to every request
    pub global: bool,
    /// Registration order among global middlewares, ascending
    pub priority: u32,
    /// Hook point
    pub runtime: MiddlewareRuntime,
    /// Entities of every handler using this middleware; `None` when global
    pub entities: Option<Vec<String>>,
    /// Declared parameters of `use`
    pub params: Vec<ParamMetadata>,
    /// User checker shared across the build
    pub user_checker: Option<Arc<UserCheckerMetadata>>,
    /// Bound `use` method
    pub invoker: MethodRef,
}

impl MiddlewareMetadata {
    /// `Class::use`, used in logs and reports
    pub fn source_name(&self) -> String {
        format!("{}::{}", self.target.short_name(), self.invoker.method())
    }
}

#[async_trait]
impl Executor for MiddlewareMetadata {
    fn target(&self) -> ClassRef {
        self.target
    }

    fn params(&self) -> &[ParamMetadata] {
        &self.params
    }

    fn user_checker(&self) -> Option<&UserCheckerMetadata> {
        self.user_checker.as_deref()
    }

    fn invoker(&self) -> &MethodRef {
        &self.invoker
    }
}

/// A user checker class with its `check` entry point
#[derive(Debug)]
pub struct UserCheckerMetadata {
    /// Checker class
    pub target: ClassRef,
    /// Declared parameters of `check`
    pub params: Vec<ParamMetadata>,
    /// Bound `check` method
    pub invoker: MethodRef,
}

#[async_trait]
impl Executor for UserCheckerMetadata {
    fn target(&self) -> ClassRef {
        self.target
    }

    fn params(&self) -> &[ParamMetadata] {
        &self.params
    }

    fn user_checker(&self) -> Option<&UserCheckerMetadata> {
        None
    }

    fn invoker(&self) -> &MethodRef {
        &self.invoker
    }
}
