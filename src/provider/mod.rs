/*!
 * OS-Impl Provider
 *
 * The per-platform layer the registry and timebase engine call into to
 * create, operate and destroy native primitives.
 *
 * # Contract
 *
 * - Native state lives in an [`ImplTable`] indexed by the registry slot.
 *   Create hooks run while the creating token holds the type lock; delete
 *   hooks run under an EXCLUSIVE token. Impl code therefore never needs to
 *   synchronize against the registry, only against itself.
 * - Every hook returns the same `OsalResult` convention as the public API.
 * - [`context::current_id`] plays the role of `TaskGetId_Impl`.
 * - Timebases obtain ticks through a [`TickSource`].
 *
 * The only provider shipped here is `hosted`, built on native threads and
 * `parking_lot` primitives.
 */

pub mod context;
pub mod hosted;
mod impl_table;
mod traits;

pub use impl_table::ImplTable;
pub use traits::{ExternalSync, TickSource};

#[cfg(test)]
pub use traits::MockTickSource;
