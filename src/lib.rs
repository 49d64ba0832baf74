//! # rxcell: reactive cells for plugin state
//!
//! Three building blocks for state that is shared between a local process and
//! the outside world:
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Processor`] | Thread-confined broadcast of values to subscribers |
//! | [`ObservableSet`] | A `HashSet` publishing every membership change |
//! | [`Dynamic`] | A cached value whose transitions an external authority decides |
//!
//! ## Quick Start
//!
//! ```rust
//! use rxcell::prelude::*;
//!
//! let mut players = ObservableSet::new();
//! players.subscribe(&MutRc::own(subscriber_fn(|update: Update<u32>| {
//!   println!("{:?} {:?}", update.action(), update.elements());
//! })));
//!
//! players.add_all([1, 2, 3]);
//! players.remove(&2);
//! ```
//!
//! ## Feature Flags
//!
//! - **`serde`**: `Serialize` / `Deserialize` for [`Update`], [`Action`] and
//!   [`ElementSet`]
//! - **`tokio`**: [`Dynamic::spawn_external`], pumping a publisher on the
//!   current tokio runtime
//!
//! ## Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events and installs
//! no subscriber: per-emission events at `TRACE`, registration changes at
//! `DEBUG`, stream protocol violations at `ERROR`.
//!
//! [`Processor`]: processor::Processor
//! [`ObservableSet`]: set::ObservableSet
//! [`Update`]: set::Update
//! [`Action`]: set::Action
//! [`ElementSet`]: set::ElementSet
//! [`Dynamic`]: dynamic::Dynamic
//! [`Dynamic::spawn_external`]: dynamic::Dynamic::spawn_external

pub mod dynamic;
pub mod error;
pub mod prelude;
pub mod processor;
pub mod rc;
pub mod set;
pub mod subscriber;

pub use prelude::*;

#[cfg(doctest)]
mod __markdown_doctests {
  mod readme {
    #![doc = include_str!("../README.md")]
  }
}
