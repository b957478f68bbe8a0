//! The company record and its content fingerprint.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// A registered company.
///
/// All five business fields are opaque strings. `name` is the primary
/// business key; `tax_id` is a second unique key (serialized as `inn`).
/// `removed` is the process-local tombstone flag and never appears on the
/// wire.
///
/// Missing fields in an incoming JSON payload decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    /// Company name, the primary key.
    pub name: String,
    /// Taxpayer identification number.
    #[serde(rename = "inn")]
    pub tax_id: String,
    /// Contact phone.
    pub phone: String,
    /// Postal address.
    pub address: String,
    /// Individual-entrepreneur flag, kept verbatim.
    pub individual: String,
    /// Tombstone flag.
    #[serde(skip)]
    pub removed: bool,
}

impl Company {
    /// Creates a live record from its five fields.
    pub fn new(
        name: impl Into<String>,
        tax_id: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
        individual: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            tax_id: tax_id.into(),
            phone: phone.into(),
            address: address.into(),
            individual: individual.into(),
            removed: false,
        }
    }

    /// CRC-32 (IEEE) of the five fields concatenated in fixed order.
    ///
    /// There is no delimiter between fields, so records whose field
    /// boundaries shift (`"ab" + "c"` vs `"a" + "bc"`) collide. Peers compare
    /// fingerprints computed this way, so the layout must not change.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(self.name.as_bytes());
        hasher.update(self.tax_id.as_bytes());
        hasher.update(self.phone.as_bytes());
        hasher.update(self.address.as_bytes());
        hasher.update(self.individual.as_bytes());
        hasher.finalize()
    }

    /// Checks the record can be stored.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRecord`] if the name is empty.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::InvalidRecord("name must not be empty".into()));
        }
        Ok(())
    }

    /// Overwrites the four mutable fields with those of `other`.
    pub(crate) fn assign_fields(&mut self, other: Company) {
        self.tax_id = other.tax_id;
        self.phone = other.phone;
        self.address = other.address;
        self.individual = other.individual;
    }
}
