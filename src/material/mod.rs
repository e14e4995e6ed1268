//! Materials: typed parameter values, material files, instances and the
//! registry that owns them.

pub mod file;
pub mod instance;
pub mod manager;
pub mod value;

pub use file::{MaterialFile, MaterialHeader};
pub use instance::MaterialInstance;
pub use manager::{MaterialManager, SharedMaterial};
pub use value::ParameterValue;
