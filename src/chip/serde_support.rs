//! Serde support for the fixed-size register banks.
//!
//! `[[u8; 256]; 2]` has no blanket `Serialize`/`Deserialize` impl, so we
//! serialize each bank as a byte buffer instead of a 256-element tuple.

use serde::de::{Deserialize, Deserializer, Error as DeError, SeqAccess, Visitor};
use serde::ser::{SerializeTuple, Serializer};
use std::fmt;

pub fn serialize<S>(banks: &[[u8; 256]; 2], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut tup = serializer.serialize_tuple(2)?;
    tup.serialize_element(Bytes(&banks[0]))?;
    tup.serialize_element(Bytes(&banks[1]))?;
    tup.end()
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<[[u8; 256]; 2], D::Error>
where
    D: Deserializer<'de>,
{
    struct BanksVisitor;

    impl<'de> Visitor<'de> for BanksVisitor {
        type Value = [[u8; 256]; 2];

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a pair of 256-byte register banks")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let a: OwnedBank = seq
                .next_element()?
                .ok_or_else(|| DeError::invalid_length(0, &self))?;
            let b: OwnedBank = seq
                .next_element()?
                .ok_or_else(|| DeError::invalid_length(1, &self))?;
            Ok([a.0, b.0])
        }
    }

    deserializer.deserialize_tuple(2, BanksVisitor)
}

struct Bytes<'a>(&'a [u8; 256]);

impl<'a> Serialize for Bytes<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(self.0)
    }
}

struct OwnedBank([u8; 256]);

impl<'de> Deserialize<'de> for OwnedBank {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BankVisitor;

        impl<'de> Visitor<'de> for BankVisitor {
            type Value = OwnedBank;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a 256-byte register bank")
            }

            fn visit_bytes<E>(self, v: &[u8]) -> Result<Self::Value, E>
            where
                E: DeError,
            {
                let arr: [u8; 256] = v
                    .try_into()
                    .map_err(|_| E::invalid_length(v.len(), &self))?;
                Ok(OwnedBank(arr))
            }

            fn visit_byte_buf<E>(self, v: Vec<u8>) -> Result<Self::Value, E>
            where
                E: DeError,
            {
                self.visit_bytes(&v)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut arr = [0u8; 256];
                for (i, slot) in arr.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| DeError::invalid_length(i, &self))?;
                }
                Ok(OwnedBank(arr))
            }
        }

        deserializer.deserialize_bytes(BankVisitor)
    }
}

use serde::ser::Serialize;
