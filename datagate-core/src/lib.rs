//! Command registry and dispatch.
//!
//! A command binds a stored procedure to a request/response contract pair
//! under fixed transaction settings. The [`CommandRegistry`] validates every
//! command against the codec registry at registration time; the
//! [`RpcDispatcher`] then routes typed or package-level invocations to an
//! [`RpcProvider`](datagate_models::RpcProvider) with timeout and retry
//! handling.

mod command;
mod commands;
mod dispatcher;

pub use command::RpcCommand;
pub use commands::CommandRegistry;
pub use dispatcher::RpcDispatcher;
