//! Bindery is a string-expression binding engine for MVVM-style data binding.
//!
//! It covers the three pieces a binding layer needs between view text and a view model:
//!
//! 1. **Parse**: `"Items[SelectedIndex].Name"` -> [`ExpressionNode`] through an extensible set
//!    of token parser rules ([`ExpressionParser`]).
//! 2. **Compile**: [`ExpressionNode`] -> [`CompiledExpression`], a small bytecode program with
//!    member access resolved through [`MemberManager`] and statics bound at compile time.
//! 3. **Observe**: member path + target -> [`PathObserver`], a chain of weak subscriptions that
//!    re-roots itself whenever an intermediate value changes.
//!
//! [`BindingEngine`] wires the three together; [`ExpressionWatcher`] re-evaluates an expression
//! each time something it reads changes.
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **No leaks**: observers never keep the observed graph alive. Dead listeners and targets
//!   are dropped quietly.
//! - **No panics** on user input: failures are [`BindError`] values.
#![forbid(unsafe_code)]

mod compiler;
mod engine;
mod expression;
mod foundation;
mod members;
mod observation;

pub use compiler::builders::{
    AssignmentBuilder, BinaryBuilder, ChainScope, CompileContext, ConditionBuilder,
    ConstantBuilder, ExpressionBuilder, IndexBuilder, LambdaBuilder, MemberBuilder,
    MethodCallBuilder, NullConditionalBuilder, ParameterBuilder, StaticMemberBuilder,
    TypeAccessBuilder, UnaryBuilder, default_builders,
};
pub use compiler::bytecode::{LambdaProgram, Op, Program, StaticMember};
pub use compiler::compiled::{CompiledExpression, ExpressionCompiler, disassemble};
pub use engine::{BindingEngine, ExpressionWatcher};
pub use expression::ast::ExpressionNode;
pub use expression::context::TokenParserContext;
pub use expression::format::{format, format_value};
pub use expression::operators::{
    BinaryOp, BinaryToken, UnaryOp, UnaryToken, default_binary_tokens, default_unary_tokens,
};
pub use expression::parser::{BindingExpression, ExpressionParser};
pub use expression::parsers::{
    AssignmentTokenParser, BinaryTokenParser, ConditionTokenParser, ConstantTokenParser,
    DigitConverter, DigitTokenParser, IndexerTokenParser, LambdaTokenParser, MemberTokenParser,
    MethodCallTokenParser, NullConditionalMemberTokenParser, ParenTokenParser, ParserTier,
    StringTokenParser, TokenParser, UnaryTokenParser, default_parsers,
};
pub use foundation::error::{BindError, BindResult};
pub use foundation::metadata::Metadata;
pub use foundation::opts::EngineOpts;
pub use foundation::value::{BindObject, Callable, ObjectRef, Value, ValueKind};
pub use members::builtins::UniversalMembers;
pub use members::descriptor::{
    ChangeSignal, Getter, INDEXER_CHANGED, INDEXER_NAME, MemberFlags, MemberInfo, MemberKind,
    MemberKinds, Parameters, Setter, TypeDescriptor, downcast,
};
pub use members::dynamic::{
    DynamicMembers, DynamicObject, DynamicResource, ObservableList, value_from_json,
    value_to_json,
};
pub use members::manager::{MemberManager, MemberProvider, TypeKey, TypeRegistry};
pub use observation::chain::{ChainState, SegmentState, SourceId, SubscriptionDiff};
pub use observation::dispatch::{
    Action, DispatchingRegistry, InlineDispatcher, MainThreadDispatcher, ThreadDispatcher,
    ThreadExecutionMode,
};
pub use observation::manager::ObservationManager;
pub use observation::member_observer::{
    AttachedListenerStore, AttachedObserverProvider, EventObserverProvider, MemberObserver,
    MemberObserverProvider, MemberObserverResolver, ObserveHandler,
    PropertyChangedObserverProvider,
};
pub use observation::path::{MemberPath, MemberPathCache, PathSegment};
pub use observation::path_observer::{
    LastMember, Lifecycle, PathObserver, PathObserverKind, PathObserverListener,
    PathObserverRequest,
};
pub use observation::registry::{
    ActionToken, ListenerRef, ListenerRegistry, MemberListener, listener_fn,
};
pub use observation::resource::ResourceObserverCache;
