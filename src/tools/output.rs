//! Conversion of tool return values into raw JSON values.
//!
//! Plain values are always successes. `Result<V, E>` maps `Err` to a failed
//! execution carrying `E` as the cause. Arbitrary serde types are returned
//! through [`Json`].

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use super::params::Json;
use crate::types::BoxError;

/// Result of running a tool body: its raw value or the failure it raised.
pub type Outcome = std::result::Result<Value, BoxError>;

/// A tool return type.
pub trait IntoToolOutput {
    fn into_output(self) -> Outcome;
}

fn serialize<V: Serialize + ?Sized>(value: &V) -> Outcome {
    serde_json::to_value(value).map_err(BoxError::from)
}

impl<V, E> IntoToolOutput for Result<V, E>
where
    V: Serialize,
    E: Into<BoxError>,
{
    fn into_output(self) -> Outcome {
        match self {
            Ok(v) => serialize(&v),
            Err(e) => Err(e.into()),
        }
    }
}

impl<V: Serialize> IntoToolOutput for Json<V> {
    fn into_output(self) -> Outcome {
        serialize(&self.0)
    }
}

impl IntoToolOutput for Value {
    fn into_output(self) -> Outcome {
        Ok(self)
    }
}

impl IntoToolOutput for () {
    fn into_output(self) -> Outcome {
        Ok(Value::Null)
    }
}

impl IntoToolOutput for &'static str {
    fn into_output(self) -> Outcome {
        Ok(Value::String(self.to_string()))
    }
}

macro_rules! impl_serialize_output {
    ($($t:ty),+) => {
        $(
            impl IntoToolOutput for $t {
                fn into_output(self) -> Outcome {
                    serialize(&self)
                }
            }
        )+
    };
}

impl_serialize_output!(
    String, bool, char, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64
);

impl<V: Serialize> IntoToolOutput for Option<V> {
    fn into_output(self) -> Outcome {
        serialize(&self)
    }
}

impl<V: Serialize> IntoToolOutput for Vec<V> {
    fn into_output(self) -> Outcome {
        serialize(&self)
    }
}

impl<V: Serialize> IntoToolOutput for HashMap<String, V> {
    fn into_output(self) -> Outcome {
        serialize(&self)
    }
}

impl<V: Serialize> IntoToolOutput for BTreeMap<String, V> {
    fn into_output(self) -> Outcome {
        serialize(&self)
    }
}
