pub mod container;
pub mod datetime;
pub mod escape;
pub mod object;
pub mod primitive;
pub mod property;
pub mod ps_str;
pub mod types;
pub mod value;

pub(crate) mod deserialize;
pub(crate) mod serialize;

pub use container::{Container, EnumWidth, PsEnum};
pub use datetime::{PsDateTime, PsDuration};
pub use object::{ComplexObject, ComplexObjectContent};
pub use primitive::{PsPrimitiveValue, PsSecureString};
pub use property::PsProperty;
pub use ps_str::PsString;
pub use types::PsType;
pub use value::PsValue;

pub(crate) use deserialize::Deserializer;
pub(crate) use serialize::Serializer;
