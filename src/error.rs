/// Map operation that produced a [`StoreError::Communication`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOp {
    Get,
    Set,
    Delete,
    GetMap,
}

impl std::fmt::Display for MapOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "get"),
            Self::Set => write!(f, "set"),
            Self::Delete => write!(f, "delete"),
            Self::GetMap => write!(f, "get_map"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An operation was invoked before a map handle was bound.
    #[error("no map bound: call MapSessionStore::bind or attach_client before using the store")]
    NotBound,

    #[error("store is already bound to map '{map_name}'")]
    AlreadyBound { map_name: String },

    /// The map client rejected the call. The underlying error is kept as-is.
    #[error("map {op} failed for key '{key}': {source}")]
    Communication {
        op: MapOp,
        key: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("value stored at '{key}' is not a session record: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// True for errors caused by calling the store in the wrong order.
    /// These are programming mistakes, not transient faults.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::NotBound | Self::AlreadyBound { .. })
    }

    pub(crate) fn communication(op: MapOp, key: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Communication {
            op,
            key: key.into(),
            source,
        }
    }
}
