use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Whether a record has been given its identifier yet.
///
/// Records start out `Pending` and become `Assigned` exactly once. There is no
/// transition out of `Assigned`: [`Identity::assign`] hands the rejected
/// identifier back instead of overwriting.
///
/// Serializes as the identifier itself, or `null` while pending.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity<K> {
    #[default]
    Pending,
    Assigned(K),
}

impl<K> Identity<K> {
    pub fn get(&self) -> Option<&K> {
        match self {
            Self::Pending => None,
            Self::Assigned(id) => Some(id),
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    /// Move from `Pending` to `Assigned(id)`.
    ///
    /// Returns `Err(id)` untouched if an identifier is already assigned.
    pub fn assign(&mut self, id: K) -> Result<(), K> {
        match self {
            Self::Pending => {
                *self = Self::Assigned(id);
                Ok(())
            }
            Self::Assigned(_) => Err(id),
        }
    }
}

impl<K> From<Option<K>> for Identity<K> {
    fn from(id: Option<K>) -> Self {
        match id {
            Some(id) => Self::Assigned(id),
            None => Self::Pending,
        }
    }
}

impl<K: Serialize> Serialize for Identity<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get().serialize(serializer)
    }
}

impl<'de, K: Deserialize<'de>> Deserialize<'de> for Identity<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<K>::deserialize(deserializer).map(Identity::from)
    }
}
