// JSON representations of beacon chain objects encode 64-bit integers as strings.
// Configuration files written by hand often contain plain integers instead.

use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    marker::PhantomData,
    str::FromStr,
};

use serde::{
    de::{Error, IntoDeserializer as _, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + FromStr<Err: Display>,
    D: Deserializer<'de>,
{
    struct AnyVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de> + FromStr<Err: Display>> Visitor<'de> for AnyVisitor<T> {
        type Value = T;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str("a string or integer")
        }

        fn visit_str<E: Error>(self, string: &str) -> Result<Self::Value, E> {
            string.parse().map_err(E::custom)
        }

        fn visit_u64<E: Error>(self, value: u64) -> Result<Self::Value, E> {
            T::deserialize(value.into_deserializer())
        }
    }

    if deserializer.is_human_readable() {
        deserializer.deserialize_any(AnyVisitor(PhantomData))
    } else {
        T::deserialize(deserializer)
    }
}

pub fn serialize<S: Serializer>(
    value: impl Serialize + Display,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if serializer.is_human_readable() {
        serializer.collect_str(&value)
    } else {
        value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(PartialEq, Eq, Debug, Deserialize, Serialize)]
    struct Wrapper {
        #[serde(with = "crate::string_or_native")]
        slot: u64,
    }

    #[test]
    fn serializes_as_string_in_json() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&Wrapper { slot: u64::MAX })?;
        assert_eq!(json, r#"{"slot":"18446744073709551615"}"#);
        Ok(())
    }

    #[test]
    fn accepts_strings_and_integers() -> Result<(), serde_yaml::Error> {
        assert_eq!(serde_yaml::from_str::<Wrapper>("slot: '7'")?, Wrapper { slot: 7 });
        assert_eq!(serde_yaml::from_str::<Wrapper>("slot: 7")?, Wrapper { slot: 7 });
        Ok(())
    }
}
