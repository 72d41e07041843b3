pub mod key;
pub mod reference;
pub mod value;

pub use key::Key;
pub use reference::Reference;
pub use value::Value;
