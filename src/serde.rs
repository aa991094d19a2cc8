//! JSON encodings for digests and openings.
//!
//! Group and field elements are carried as byte arrays holding their
//! compressed `ark-serialize` encoding, so the JSON is independent of the
//! in-memory representation. Decoding validates every element.
//!
//! ```rust,ignore
//! let bundle = OpeningBundle::<Bls12_381>::new(height, digest, openings);
//! let json = serde_json::to_string_pretty(&bundle)?;
//! let back: OpeningBundle<Bls12_381> = serde_json::from_str(&json)?;
//! ```

use ark_ec::pairing::Pairing;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};

use crate::{Vcs, VcsError};

pub(crate) fn element_to_bytes<T: CanonicalSerialize>(value: &T) -> Result<Vec<u8>, VcsError> {
    let mut bytes = Vec::with_capacity(value.compressed_size());
    value.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

pub(crate) fn element_from_bytes<T: CanonicalDeserialize>(bytes: &[u8]) -> Result<T, VcsError> {
    Ok(T::deserialize_compressed(bytes)?)
}

/// One opening: a position, its claimed value and the proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Opening<E: Pairing> {
    pub index: u64,
    pub value: E::ScalarField,
    pub proof: Vec<E::G1>,
}

impl<E: Pairing> Serialize for Opening<E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let proof = self
            .proof
            .iter()
            .map(element_to_bytes)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ser::Error::custom)?;
        let mut state = serializer.serialize_struct("Opening", 3)?;
        state.serialize_field("index", &self.index)?;
        state.serialize_field(
            "value",
            &element_to_bytes(&self.value).map_err(ser::Error::custom)?,
        )?;
        state.serialize_field("proof", &proof)?;
        state.end()
    }
}

impl<'de, E: Pairing> Deserialize<'de> for Opening<E> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            index: u64,
            value: Vec<u8>,
            proof: Vec<Vec<u8>>,
        }

        let helper = Helper::deserialize(deserializer)?;
        Ok(Opening {
            index: helper.index,
            value: element_from_bytes(&helper.value).map_err(de::Error::custom)?,
            proof: helper
                .proof
                .iter()
                .map(|bytes| element_from_bytes(bytes))
                .collect::<Result<_, _>>()
                .map_err(de::Error::custom)?,
        })
    }
}

/// Digest plus a set of openings against it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpeningBundle<E: Pairing> {
    pub height: u8,
    pub digest: E::G1,
    pub openings: Vec<Opening<E>>,
}

impl<E: Pairing> OpeningBundle<E> {
    pub fn new(height: u8, digest: E::G1, openings: Vec<Opening<E>>) -> Self {
        Self {
            height,
            digest,
            openings,
        }
    }

    /// Verifies every opening with [`Vcs::verify_memoized`].
    pub fn verify(&self, vcs: &Vcs<E>) -> Result<bool, VcsError> {
        if self.height != vcs.height() {
            return Err(VcsError::Domain(format!(
                "bundle of height {} checked against height {}",
                self.height,
                vcs.height()
            )));
        }
        let indices: Vec<u64> = self.openings.iter().map(|o| o.index).collect();
        let values: Vec<E::ScalarField> = self.openings.iter().map(|o| o.value).collect();
        let proofs: Vec<Vec<E::G1>> = self.openings.iter().map(|o| o.proof.clone()).collect();
        Ok(vcs
            .verify_memoized(&self.digest, &indices, &values, &proofs)?
            .valid)
    }
}

impl<E: Pairing> Serialize for OpeningBundle<E> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("OpeningBundle", 3)?;
        state.serialize_field("height", &self.height)?;
        state.serialize_field(
            "digest",
            &element_to_bytes(&self.digest).map_err(ser::Error::custom)?,
        )?;
        state.serialize_field("openings", &self.openings)?;
        state.end()
    }
}

impl<'de, E: Pairing> Deserialize<'de> for OpeningBundle<E> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(bound(deserialize = ""))]
        struct Helper<E: Pairing> {
            height: u8,
            digest: Vec<u8>,
            openings: Vec<Opening<E>>,
        }

        let helper = Helper::<E>::deserialize(deserializer)?;
        Ok(OpeningBundle {
            height: helper.height,
            digest: element_from_bytes(&helper.digest).map_err(de::Error::custom)?,
            openings: helper.openings,
        })
    }
}
