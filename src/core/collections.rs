//! Collection aliases tuned for mesh workloads.
//!
//! Hash maps keyed by vertex tuples are on hot paths during cavity
//! retetrahedrization and face splicing; `FxHash` is markedly faster
//! than the default SipHash there and the keys are internal, never
//! attacker-controlled. `SmallBuffer` keeps the short, bursty scratch
//! lists (cavity faces, edge rings) off the heap.

#![forbid(unsafe_code)]

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Fast non-cryptographic hash map for internal keys.
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Fast non-cryptographic hash set for internal keys.
pub type FastHashSet<K> = FxHashSet<K>;

/// Small inline buffer; spills to the heap past `N` elements.
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;
