mod data_type;
mod schema;
mod value;

pub use data_type::DataType;
pub use schema::{Column, FixedName, Schema};
pub use value::{StrBytes, Value};
