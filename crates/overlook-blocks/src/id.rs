use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Namespace that is stripped from identifiers during normalization.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Identifiers that count as "nothing here" for the top-surface search.
pub const AIR_IDS: [&str; 3] = ["air", "cave_air", "void_air"];

/// Sentinel for columns whose value could not be determined.
pub const NONE_ID: &str = "none";

/// Strip the default namespace (`minecraft:stone` -> `stone`) and any
/// trailing block-state suffix (`oak_log[axis=y]` -> `oak_log`).
pub fn normalize(raw: &str) -> &str {
    let base = raw.split('[').next().unwrap_or(raw);
    match base.split_once(':') {
        Some((ns, name)) if ns == DEFAULT_NAMESPACE => name,
        _ => base,
    }
}

/// Normalized voxel-type identifier.
///
/// Cheap to clone: the name is reference counted so a full region grid
/// shares one allocation per distinct id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(Arc<str>);

impl BlockId {
    pub fn new(raw: &str) -> Self {
        Self(Arc::from(normalize(raw)))
    }

    pub fn air() -> Self {
        Self(Arc::from(AIR_IDS[0]))
    }

    pub fn none() -> Self {
        Self(Arc::from(NONE_ID))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `air`, `cave_air` or `void_air`.
    #[inline]
    pub fn is_air(&self) -> bool {
        AIR_IDS.contains(&self.as_str())
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.as_str() == NONE_ID
    }

    /// Empty after normalization; such ids never resolve to a real block.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }

    /// Anything the surface search should stop at.
    #[inline]
    pub fn is_filled(&self) -> bool {
        !self.is_blank() && !self.is_air()
    }

    /// Namespace part for non-default ids (`create:cogwheel` -> `create`).
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(':').map(|(ns, _)| ns)
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({:?})", self.as_str())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for BlockId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for BlockId {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl Borrow<str> for BlockId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(BlockId::new(&raw))
    }
}
