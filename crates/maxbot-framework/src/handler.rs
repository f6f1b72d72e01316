//! Handler system for the MaxBot framework.
//!
//! A registered [`Handler`] is either a callable or a canned text reply:
//!
//! - [`Handler::Invoke`] runs user code with the parameter the dispatcher
//!   extracted (command arguments, regex captures, event payload).
//! - [`Handler::Respond`] sends a fixed text back to whoever caused the update.
//!
//! Callables are plain async functions or closures, Axum-style. Each argument
//! is produced by [`FromCall`], so a handler asks only for what it needs:
//!
//! ```rust,ignore
//! // Just the parameter
//! async fn echo(param: Param) -> String {
//!     format!("You said: {}", param.text())
//! }
//!
//! // Context and parameter
//! async fn pick(ctx: Context, param: Param) -> ApiResult<Value> {
//!     ctx.reply(&format!("Your choice: {}", param.group(1).unwrap_or("?"))).await
//! }
//!
//! // No arguments at all
//! async fn ping() -> &'static str {
//!     "pong"
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use maxbot_core::{HandlerResult, IntoReply, MaxApi, Reply, Update};

use crate::context::Context;

// ============================================================================
// Param - the value extracted for the handler
// ============================================================================

/// The parameter computed by the dispatcher for the matched handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    /// Command arguments, a callback payload or an event payload.
    Text(String),
    /// Regex match: the whole match followed by every capture group.
    /// Groups that did not participate are empty strings.
    Captures(Vec<String>),
}

impl Default for Param {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl Param {
    /// Returns the text parameter, or the whole match for captures.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Captures(groups) => groups.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// Returns the capture groups, if this is a regex match.
    pub fn captures(&self) -> Option<&[String]> {
        match self {
            Self::Captures(groups) => Some(groups),
            Self::Text(_) => None,
        }
    }

    /// Returns capture group `index` (0 is the whole match).
    pub fn group(&self, index: usize) -> Option<&str> {
        self.captures()?.get(index).map(String::as_str)
    }

    /// Returns `true` for an empty text parameter.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl From<&str> for Param {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

// ============================================================================
// Call - everything a handler invocation can draw from
// ============================================================================

/// Input of one handler invocation.
#[derive(Debug, Clone)]
pub struct Call {
    /// The update being dispatched and the API client.
    pub ctx: Context,
    /// The extracted parameter.
    pub param: Param,
}

/// Types that can be produced from a [`Call`] as handler arguments.
pub trait FromCall: Sized {
    /// Extracts the argument.
    fn from_call(call: &Call) -> Self;
}

impl FromCall for Param {
    fn from_call(call: &Call) -> Self {
        call.param.clone()
    }
}

impl FromCall for Context {
    fn from_call(call: &Call) -> Self {
        call.ctx.clone()
    }
}

impl FromCall for MaxApi {
    fn from_call(call: &Call) -> Self {
        call.ctx.api().clone()
    }
}

impl FromCall for Arc<Update> {
    fn from_call(call: &Call) -> Self {
        call.ctx.update_arc()
    }
}

// ============================================================================
// Handler
// ============================================================================

/// A type-erased callable handler.
pub type BoxedCallback = Arc<dyn Fn(Call) -> BoxFuture<'static, HandlerResult<Reply>> + Send + Sync>;

/// What runs when a registration matches.
#[derive(Clone)]
pub enum Handler {
    /// Call user code.
    Invoke(BoxedCallback),
    /// Send this text to the update's inferred recipient.
    Respond(String),
}

impl Handler {
    /// Creates a canned text reply.
    pub fn respond(text: impl Into<String>) -> Self {
        Self::Respond(text.into())
    }

    /// Wraps a callable.
    pub fn from_fn<F, M>(f: F) -> Self
    where
        F: IntoHandler<M>,
    {
        f.into_handler()
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invoke(_) => f.write_str("Handler::Invoke(..)"),
            Self::Respond(text) => f.debug_tuple("Handler::Respond").field(text).finish(),
        }
    }
}

// ============================================================================
// IntoHandler - conversion from functions and strings
// ============================================================================

/// Conversion into a [`Handler`].
///
/// `M` is a marker that keeps the function implementations (one per arity)
/// and the text implementations apart.
pub trait IntoHandler<M> {
    /// Performs the conversion.
    fn into_handler(self) -> Handler;
}

/// Marker for text replies.
#[derive(Debug)]
pub struct TextReply;

/// Marker for ready-made handlers.
#[derive(Debug)]
pub struct Prebuilt;

impl IntoHandler<Prebuilt> for Handler {
    fn into_handler(self) -> Handler {
        self
    }
}

impl IntoHandler<TextReply> for &str {
    fn into_handler(self) -> Handler {
        Handler::Respond(self.to_string())
    }
}

impl IntoHandler<TextReply> for String {
    fn into_handler(self) -> Handler {
        Handler::Respond(self)
    }
}

/// Generates [`IntoHandler`] implementations for functions of each arity.
macro_rules! impl_into_handler {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, Fut, Res, $($ty,)*> IntoHandler<($($ty,)*)> for F
        where
            F: Fn($($ty,)*) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Res> + Send + 'static,
            Res: IntoReply + 'static,
            $( $ty: FromCall + Send + 'static, )*
        {
            fn into_handler(self) -> Handler {
                Handler::Invoke(Arc::new(move |call: Call| -> BoxFuture<'static, HandlerResult<Reply>> {
                    $(
                        let $ty = $ty::from_call(&call);
                    )*
                    let fut = (self)($($ty,)*);
                    Box::pin(async move { fut.await.into_reply() })
                }))
            }
        }
    };
}

impl_into_handler!();
impl_into_handler!(T1);
impl_into_handler!(T1, T2);
impl_into_handler!(T1, T2, T3);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context_for;
    use maxbot_core::Update;

    async fn shout(param: Param) -> String {
        param.text().to_uppercase()
    }

    async fn count_groups(_ctx: Context, param: Param) -> String {
        param.captures().map(<[String]>::len).unwrap_or(0).to_string()
    }

    async fn run(handler: &Handler, param: Param) -> Reply {
        let Handler::Invoke(callback) = handler else {
            panic!("expected a callable handler");
        };
        let call = Call {
            ctx: context_for(Update::new("message_created", 0)),
            param,
        };
        callback(call).await.unwrap()
    }

    #[tokio::test]
    async fn test_single_argument_handler() {
        let handler = Handler::from_fn(shout);
        assert_eq!(run(&handler, "hey".into()).await, Reply::Text("HEY".into()));
    }

    #[tokio::test]
    async fn test_two_argument_handler() {
        let handler = Handler::from_fn(count_groups);
        let param = Param::Captures(vec!["color:red".into(), "red".into()]);
        assert_eq!(run(&handler, param).await, Reply::Text("2".into()));
    }

    #[tokio::test]
    async fn test_closure_without_arguments() {
        let handler = Handler::from_fn(|| async {});
        assert_eq!(run(&handler, Param::default()).await, Reply::Empty);
    }

    #[test]
    fn test_text_becomes_respond() {
        assert!(matches!(
            Handler::from_fn("Welcome!"),
            Handler::Respond(text) if text == "Welcome!"
        ));
    }

    #[test]
    fn test_param_accessors() {
        let captures = Param::Captures(vec!["color:red".into(), "red".into()]);
        assert_eq!(captures.text(), "color:red");
        assert_eq!(captures.group(1), Some("red"));
        assert_eq!(captures.group(2), None);
        assert!(Param::default().is_empty());
        assert_eq!(Param::from("x").group(0), None);
    }
}
