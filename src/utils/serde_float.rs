//! Serde helpers for floats that may be infinite or NaN.
//!
//! JSON has no representation for non-finite numbers and `serde_json` writes
//! them as `null`, which then fails to read back into an `f64`. These helpers
//! keep finite values as plain numbers and write the others as the strings
//! `"inf"`, `"-inf"` and `"nan"`.
//!
//! Use with `#[serde(with = "crate::utils::serde_float")]` on `f64` fields and
//! `#[serde(with = "crate::utils::serde_float::array")]` on ndarray fields.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Number {
    Finite(f64),
    Special(String),
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            Number::Finite(value)
        } else if value.is_nan() {
            Number::Special("nan".to_string())
        } else if value > 0.0 {
            Number::Special("inf".to_string())
        } else {
            Number::Special("-inf".to_string())
        }
    }
}

impl Number {
    fn value<E: de::Error>(self) -> Result<f64, E> {
        match self {
            Number::Finite(value) => Ok(value),
            Number::Special(text) => match text.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(E::custom(format!("invalid number: {:?}", other))),
            },
        }
    }
}

pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    Number::from(*value).serialize(serializer)
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Number::deserialize(deserializer)?.value()
}

/// Arrays of any dimension, stored as `{"dim": [...], "data": [...]}` in
/// row-major order.
pub mod array {
    use super::Number;
    use ndarray::{Array, Dimension, IxDyn};
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    struct ArrayRef<'a> {
        dim: &'a [usize],
        data: Vec<Number>,
    }

    #[derive(Deserialize)]
    struct ArrayOwned {
        dim: Vec<usize>,
        data: Vec<Number>,
    }

    pub fn serialize<S, D>(array: &Array<f64, D>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        D: Dimension,
    {
        ArrayRef {
            dim: array.shape(),
            data: array.iter().map(|&v| Number::from(v)).collect(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, De, D>(deserializer: De) -> Result<Array<f64, D>, De::Error>
    where
        De: Deserializer<'de>,
        D: Dimension,
    {
        let raw = ArrayOwned::deserialize(deserializer)?;
        let data = raw
            .data
            .into_iter()
            .map(|n| n.value::<De::Error>())
            .collect::<Result<Vec<f64>, _>>()?;

        Array::from_shape_vec(IxDyn(&raw.dim), data)
            .map_err(de::Error::custom)?
            .into_dimensionality::<D>()
            .map_err(de::Error::custom)
    }
}
