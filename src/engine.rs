//! The binding engine: one configured parser, compiler and observation manager, plus
//! [`ExpressionWatcher`], which re-evaluates an expression whenever a path it reads changes.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, ThreadId};

use crate::compiler::builders::ExpressionBuilder;
use crate::compiler::compiled::{CompiledExpression, ExpressionCompiler};
use crate::expression::ast::ExpressionNode;
use crate::expression::parser::{BindingExpression, ExpressionParser};
use crate::foundation::error::{BindError, BindResult};
use crate::foundation::metadata::Metadata;
use crate::foundation::opts::EngineOpts;
use crate::foundation::sync::lock;
use crate::foundation::value::Value;
use crate::members::manager::MemberManager;
use crate::observation::dispatch::ThreadDispatcher;
use crate::observation::manager::ObservationManager;
use crate::observation::member_observer::{MemberObserver, MemberObserverProvider};
use crate::observation::path::{MemberPath, PathSegment};
use crate::observation::path_observer::{
    PathObserver, PathObserverListener, PathObserverRequest, TargetRef,
};

pub struct BindingEngine {
    opts: EngineOpts,
    parser: ExpressionParser,
    members: Arc<MemberManager>,
    compiler: ExpressionCompiler,
    observation: ObservationManager,
}

impl Default for BindingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingEngine {
    pub fn new() -> Self {
        Self::with_opts(EngineOpts::default())
    }

    pub fn with_opts(opts: EngineOpts) -> Self {
        Self::with_members(Arc::new(MemberManager::new()), opts)
    }

    /// An engine resolving members through `members`, which may carry registered types.
    pub fn with_members(members: Arc<MemberManager>, opts: EngineOpts) -> Self {
        Self {
            parser: ExpressionParser::new(&opts),
            compiler: ExpressionCompiler::new(Arc::clone(&members)),
            observation: ObservationManager::new(Arc::clone(&members), opts.clone()),
            members,
            opts,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn ThreadDispatcher>) -> Self {
        self.observation = self.observation.with_dispatcher(dispatcher);
        self
    }

    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    pub fn parser(&self) -> &ExpressionParser {
        &self.parser
    }

    pub fn members(&self) -> &Arc<MemberManager> {
        &self.members
    }

    pub fn compiler(&self) -> &ExpressionCompiler {
        &self.compiler
    }

    pub fn observation(&self) -> &ObservationManager {
        &self.observation
    }

    /// Inserts a compiler component ahead of the built-in ones.
    pub fn add_builder(&mut self, builder: Arc<dyn ExpressionBuilder>) {
        self.compiler.add_builder(builder);
    }

    /// Inserts a change-notification provider ahead of the built-in ones.
    pub fn add_observer_provider(&self, provider: Arc<dyn MemberObserverProvider>) {
        self.observation.add_provider(provider);
    }

    pub fn try_get_member_path(
        &self,
        text: &str,
        _metadata: Option<&Metadata>,
    ) -> BindResult<Arc<MemberPath>> {
        self.observation.try_get_member_path(text)
    }

    pub fn try_get_member_observer(
        &self,
        target: &Value,
        member: &str,
        metadata: Option<&Metadata>,
    ) -> MemberObserver {
        self.observation
            .try_get_member_observer(target, member, metadata)
    }

    #[tracing::instrument(skip(self, target, metadata))]
    pub fn try_get_member_path_observer(
        &self,
        target: &Value,
        request: &PathObserverRequest,
        metadata: Option<&Metadata>,
    ) -> BindResult<PathObserver> {
        self.observation
            .try_get_member_path_observer(target, request, metadata)
    }

    /// A request for `path` carrying the configured optional and weak defaults.
    pub fn request(&self, path: impl Into<String>) -> PathObserverRequest {
        PathObserverRequest::new(path)
            .optional(self.opts.optional_by_default)
            .weak(self.opts.weak_by_default)
    }

    pub fn try_parse(&self, text: &str, metadata: Option<&Metadata>) -> Option<ExpressionNode> {
        self.parser.try_parse(text, metadata)
    }

    #[tracing::instrument(skip(self, metadata))]
    pub fn parse(&self, text: &str, metadata: Option<&Metadata>) -> BindResult<ExpressionNode> {
        self.parser.parse(text, metadata)
    }

    #[tracing::instrument(skip(self, metadata))]
    pub fn try_parse_bindings(
        &self,
        text: &str,
        metadata: Option<&Metadata>,
    ) -> BindResult<Vec<BindingExpression>> {
        self.parser.try_parse_bindings(text, metadata)
    }

    #[tracing::instrument(skip_all, fields(expression = %node))]
    pub fn compile(
        &self,
        node: &ExpressionNode,
        metadata: Option<&Metadata>,
    ) -> BindResult<CompiledExpression> {
        self.compiler.compile(node, metadata)
    }

    /// Parses, compiles and evaluates `text` against `target` once.
    pub fn evaluate(&self, target: &Value, text: &str) -> BindResult<Value> {
        let node = self.parse(text, None)?;
        self.compile(&node, None)?.invoke(target, &[], None)
    }

    /// Member paths `node` observes, minus those rooted at a static type such as `Math`.
    pub fn observed_paths(&self, node: &ExpressionNode) -> Vec<String> {
        node.member_paths()
            .into_iter()
            .filter(|path| match self.observation.try_get_member_path(path) {
                Ok(parsed) => !matches!(
                    parsed.first(),
                    Some(PathSegment::Member(root)) if self.members.has_static_type(root)
                ),
                Err(_) => false,
            })
            .collect()
    }

    /// Evaluates `text` against `target` now and again after every change along the paths it
    /// reads, passing each result to `callback`. Assignments write on every evaluation.
    #[tracing::instrument(skip(self, target, callback))]
    pub fn watch<F>(&self, target: &Value, text: &str, callback: F) -> BindResult<ExpressionWatcher>
    where
        F: Fn(BindResult<Value>) + Send + Sync + 'static,
    {
        let node = self.parse(text, None)?;
        self.watch_node(target, &node, callback)
    }

    /// [`watch`](Self::watch) for an already parsed expression. Expressions with free parameters
    /// cannot be watched.
    pub fn watch_node<F>(
        &self,
        target: &Value,
        node: &ExpressionNode,
        callback: F,
    ) -> BindResult<ExpressionWatcher>
    where
        F: Fn(BindResult<Value>) + Send + Sync + 'static,
    {
        let compiled = self.compile(node, None)?;
        if !compiled.parameters().is_empty() {
            return Err(BindError::observation(format!(
                "cannot watch '{node}': unbound parameter(s) {}",
                compiled.parameters().join(", ")
            )));
        }
        let paths = self.observed_paths(node);
        let state = Arc::new(WatchState {
            target: TargetRef::new(target, self.opts.weak_by_default),
            compiled,
            callback: Box::new(callback),
            // Held by this thread until the observers are attached.
            run: Mutex::new(RunState {
                evaluator: Some(thread::current().id()),
                pending: false,
            }),
            observers: Mutex::new(Vec::new()),
        });
        let listener: Arc<dyn PathObserverListener> = Arc::new(WatchListener {
            state: Arc::downgrade(&state),
        });

        let mut observers = Vec::with_capacity(paths.len());
        for path in &paths {
            let observer = self
                .observation
                .try_get_member_path_observer(target, &self.request(path.as_str()), None)?;
            observer.add_listener(Arc::clone(&listener));
            observers.push(observer);
        }
        *lock(&state.observers) = observers;
        tracing::debug!(paths = paths.len(), "expression watched");

        state.run();
        Ok(ExpressionWatcher {
            state,
            listener,
            paths,
        })
    }
}

struct WatchState {
    target: TargetRef,
    compiled: CompiledExpression,
    callback: Box<dyn Fn(BindResult<Value>) + Send + Sync>,
    run: Mutex<RunState>,
    observers: Mutex<Vec<PathObserver>>,
}

struct RunState {
    /// Thread currently evaluating.
    evaluator: Option<ThreadId>,
    /// A change arrived from another thread mid-evaluation.
    pending: bool,
}

impl WatchState {
    fn evaluate(&self) -> Option<BindResult<Value>> {
        let target = self.target.get()?;
        Some(self.compiled.invoke(&target, &[], None))
    }

    /// Re-evaluates and reports. Changes made by the evaluating thread itself are ignored;
    /// changes from other threads mark the running evaluation for another pass.
    fn notify(&self) {
        {
            let mut run = lock(&self.run);
            let current = thread::current().id();
            match run.evaluator {
                Some(id) if id == current => return,
                Some(_) => {
                    run.pending = true;
                    return;
                }
                None => run.evaluator = Some(current),
            }
        }
        self.run();
    }

    /// Evaluates until no change is pending, then releases the evaluator slot.
    fn run(&self) {
        loop {
            if let Some(result) = self.evaluate() {
                (self.callback)(result);
            }
            let mut run = lock(&self.run);
            if !std::mem::take(&mut run.pending) {
                run.evaluator = None;
                return;
            }
        }
    }
}

struct WatchListener {
    state: Weak<WatchState>,
}

impl PathObserverListener for WatchListener {
    fn on_last_member_changed(&self, _observer: &PathObserver) {
        if let Some(state) = self.state.upgrade() {
            state.notify();
        }
    }

    fn on_error(&self, _observer: &PathObserver, _error: &BindError) {
        // Evaluating reports the same failure with the expression's own context.
        if let Some(state) = self.state.upgrade() {
            state.notify();
        }
    }
}

/// A live expression. Dropping it releases every observer.
pub struct ExpressionWatcher {
    state: Arc<WatchState>,
    listener: Arc<dyn PathObserverListener>,
    paths: Vec<String>,
}

impl ExpressionWatcher {
    /// Member paths being observed.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Evaluates now; null once a weakly held target is gone.
    pub fn value(&self) -> BindResult<Value> {
        self.state.evaluate().unwrap_or(Ok(Value::Null))
    }

    /// Writes through the expression when it is a member or indexer access.
    pub fn set_value(&self, value: Value) -> BindResult<bool> {
        match self.state.target.get() {
            Some(target) => self.state.compiled.set_value(&target, value, None),
            None => Ok(false),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state.target.is_alive()
    }

    pub fn dispose(&self) {
        let observers = std::mem::take(&mut *lock(&self.state.observers));
        for observer in observers {
            observer.remove_listener(&self.listener);
            observer.dispose();
        }
    }
}

impl Drop for ExpressionWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ExpressionWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpressionWatcher")
            .field("paths", &self.paths)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/unit/engine.rs"]
mod tests;
