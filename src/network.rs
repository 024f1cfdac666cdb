//! Protocol listeners.
//!
//! One [`ProxyListener`](proxy_listener::ProxyListener) runs per enabled service
//! and binds the internal interface. The firewall redirects intercepted client
//! connections there; each accepted socket becomes its own session task.

pub mod proxy_listener;

pub use proxy_listener::ProxyListener;
