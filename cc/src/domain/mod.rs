//! Domain types shared by the coordinator and its collaborators

mod id;
mod status;
mod value;

pub use id::{IdCounter, LawId, TestId};
pub use status::Status;
pub use value::{ParameterError, Parameters, TypedParameter, TypedValue, ValueType};
