//! Domain primitives: ItemId, ProductCode, Credential.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Marketplace item identifier (the ASIN column of a Keepa export).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: String) -> Self {
        ItemId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External product code (UPC) used as the price lookup key. May be empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(pub String);

impl ProductCode {
    pub fn new(code: String) -> Self {
        ProductCode(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ProductCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque API credential passed through to the price lookup service.
///
/// Neither `Debug` nor `Display` reveal the value; use [`Credential::prefix`]
/// for diagnostics.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    const PREFIX_LEN: usize = 4;

    pub fn new(secret: impl Into<String>) -> Self {
        Credential(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Short form safe for logs: the first four characters and an ellipsis.
    pub fn prefix(&self) -> String {
        let head: String = self.0.chars().take(Self::PREFIX_LEN).collect();
        format!("{}...", head)
    }

    /// SHA-256 fingerprint identifying the credential epoch.
    pub fn epoch_id(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", self.prefix())
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}
