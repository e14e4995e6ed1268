//! Backend abstraction layer
//!
//! Provides the traits a host device implements and the types shared with it.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::{
    DummyCommandContext, DummyDescriptorHeap, DummyDevice, DummyTextureLoader, DummyView,
};
pub use traits::*;
pub use types::*;
