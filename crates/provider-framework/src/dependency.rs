//! # Dependency Graph
//!
//! Providers declare the objects they need through [`Dependency::dependencies`]. Those
//! objects may be providers themselves or plain values. The graph is only used to
//! enumerate dependencies (for example to wait until all of them are ready). It does not
//! couple lifecycles.
//!
//! [`closure`] walks the graph with an explicit worklist, so deep graphs cannot overflow
//! the stack and cycles terminate.

use crate::lifecycle::Lifecycle;
use std::collections::HashSet;
use std::sync::Arc;

/// Shared reference to a node of the dependency graph.
pub type DependencyRef = Arc<dyn Dependency>;

/// A node of the dependency graph.
///
/// Leaves can rely on the defaults:
///
/// ```rust
/// use provider_framework::Dependency;
///
/// struct Settings;
/// impl Dependency for Settings {}
/// ```
pub trait Dependency: Send + Sync {
    /// Direct dependencies, in declaration order.
    fn dependencies(&self) -> Vec<DependencyRef> {
        Vec::new()
    }

    /// The node's lifecycle if it is a provider.
    fn as_lifecycle(&self) -> Option<&Lifecycle> {
        None
    }
}

fn identity<T: ?Sized>(node: *const T) -> *const () {
    node as *const ()
}

/// Every node reachable from `root`, excluding `root` itself.
///
/// Nodes are de-duplicated by identity (their allocation), not by value. A node rejected
/// by `include` is left out and its own dependencies are not followed. The result order is
/// unspecified. `None` yields an empty result.
pub fn closure<R>(
    root: Option<&R>,
    include: Option<&dyn Fn(&dyn Dependency) -> bool>,
) -> Vec<DependencyRef>
where
    R: Dependency + ?Sized,
{
    let Some(root) = root else {
        return Vec::new();
    };

    let mut visited: HashSet<*const ()> = HashSet::new();
    visited.insert(identity(root as *const R));

    let mut found = Vec::new();
    let mut pending: Vec<DependencyRef> = root.dependencies();
    pending.reverse();

    while let Some(node) = pending.pop() {
        if !visited.insert(identity(Arc::as_ptr(&node))) {
            continue;
        }
        if let Some(include) = include {
            if !include(node.as_ref()) {
                continue;
            }
        }
        pending.extend(node.dependencies().into_iter().rev());
        found.push(node);
    }
    found
}

/// The providers (nodes with a lifecycle) reachable from `root`.
///
/// Plain values are skipped and not traversed.
pub fn provider_closure<R>(root: &R) -> Vec<DependencyRef>
where
    R: Dependency + ?Sized,
{
    closure(Some(root), Some(&|node: &dyn Dependency| node.as_lifecycle().is_some()))
}
