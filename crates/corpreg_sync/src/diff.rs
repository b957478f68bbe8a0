//! Snapshot diffing.

use corpreg_core::Company;
use std::collections::HashMap;

/// Changes needed to bring the sink from the snapshot to a fetched list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    /// Records whose name the snapshot does not know, in fetch order.
    pub added: Vec<Company>,
    /// Records whose fingerprint differs from the snapshot's, in fetch order.
    pub changed: Vec<Company>,
    /// Snapshot names absent from the fetch, sorted.
    pub deleted: Vec<String>,
}

impl Delta {
    /// Computes the delta from `snapshot` to `fetched`.
    ///
    /// Records are matched by name and compared by
    /// [`Company::fingerprint`]. If a name appears more than once in
    /// `fetched`, its last occurrence is used.
    pub fn compute(snapshot: &HashMap<String, Company>, fetched: &[Company]) -> Self {
        let mut latest: HashMap<&str, &Company> = HashMap::with_capacity(fetched.len());
        for company in fetched {
            latest.insert(company.name.as_str(), company);
        }

        let mut delta = Delta::default();
        for company in fetched {
            let is_latest = latest
                .get(company.name.as_str())
                .is_some_and(|c| std::ptr::eq(*c, company));
            if !is_latest {
                continue;
            }

            match snapshot.get(&company.name) {
                None => delta.added.push(company.clone()),
                Some(known) if known.fingerprint() != company.fingerprint() => {
                    delta.changed.push(company.clone());
                }
                Some(_) => {}
            }
        }

        delta.deleted = snapshot
            .keys()
            .filter(|name| !latest.contains_key(name.as_str()))
            .cloned()
            .collect();
        delta.deleted.sort_unstable();

        delta
    }

    /// Returns true if no changes are needed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.deleted.is_empty()
    }

    /// Total number of changes.
    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.deleted.len()
    }
}
