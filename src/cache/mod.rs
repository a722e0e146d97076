//! Caching of expensive level lookups
//!
//! Resolving a tag to its members walks the level's registries, which is too
//! slow to repeat for every locate. Results are cached per level instance.
//!
//! # Key Rules
//!
//! - Levels are compared by identity (`Arc` pointer), not by value
//! - The cache only holds weak references, so it never keeps a level alive
//! - Entries expire after a TTL and the oldest entry is evicted at capacity
//! - A failed resolution is never cached
//!
//! | Lookup | Result |
//! |--------|--------|
//! | Same level, fresh entry | Hit |
//! | Same level, expired entry | Miss, entry dropped |
//! | Equal but distinct level | Miss |
//! | Level dropped elsewhere | Miss, entry purged |

pub mod weak_keyed;

pub use weak_keyed::WeakKeyedCache;
