//! Page stabilization pipeline.
//!
//! The sequence of cooperating subsystems that make a dynamic, overlay-heavy
//! page safe to paginate: continuous overlay suppression, expand/exclude
//! classification of interactive elements, a safe-click primitive, a scroll
//! convergence detector, and a final layout normalization pass.
//!
//! Everything here communicates with the page only through
//! [`crate::renderer::RenderContext`], and every DOM read is treated as
//! possibly stale: element state is re-queried fresh rather than cached
//! across suspension points, since the suppression sweep (and the site
//! itself) rewrite the DOM continuously.

pub mod classify;
pub mod expand;
pub mod interact;
pub mod normalize;
pub mod ruleset;
pub mod scroll;
pub mod suppress;
