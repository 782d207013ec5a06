//! Sample group membership and per-sample key resolution.

use crate::{ContentKey, Error, KeyTable, RangeStartMap, Result};
use log::debug;
use uuid::Uuid;

/// CENC sample encryption information group entry (`seig`).
///
/// Entries without a key id describe samples left in the clear.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CencSampleEncryptionGroupEntry {
    pub kid: Option<Uuid>,
    pub per_sample_iv_size: u8,
}

impl CencSampleEncryptionGroupEntry {
    /// Samples of this group are encrypted with the key of `kid`.
    pub fn encrypted(kid: Uuid) -> Self {
        Self {
            kid: Some(kid),
            per_sample_iv_size: 8,
        }
    }

    /// Samples of this group are not encrypted.
    pub fn unencrypted() -> Self {
        Self {
            kid: None,
            per_sample_iv_size: 0,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.kid.is_some()
    }
}

/// Assigns samples to group entries.
///
/// Entries keep the order they were added in. Every member array is kept
/// sorted so membership can be tested with a binary search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGroupExtension<E> {
    entries: Vec<(E, Vec<usize>)>,
}

impl<E: PartialEq> SampleGroupExtension<E> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add `entry` with its member sample indices (0-based).
    ///
    /// Adding an entry equal to an existing one replaces that entry's
    /// members and keeps its position.
    pub fn add<I: IntoIterator<Item = usize>>(&mut self, entry: E, samples: I) {
        let mut samples: Vec<usize> = samples.into_iter().collect();
        samples.sort_unstable();
        samples.dedup();

        match self.entries.iter_mut().find(|(e, _)| *e == entry) {
            Some((_, members)) => *members = samples,
            None => self.entries.push((entry, samples)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &E> {
        self.entries.iter().map(|(e, _)| e)
    }

    /// Sorted member sample indices of `entry`.
    pub fn samples(&self, entry: &E) -> Option<&[usize]> {
        self.entries
            .iter()
            .find(|(e, _)| e == entry)
            .map(|(_, s)| s.as_slice())
    }

    /// 1-based position of the last entry containing `sample`, 0 if none does.
    ///
    /// Later entries win over earlier ones when memberships overlap.
    pub fn group_index(&self, sample: usize) -> usize {
        let mut index = 0;
        for (j, (_, members)) in self.entries.iter().enumerate() {
            if members.binary_search(&sample).is_ok() {
                index = j + 1;
            }
        }
        index
    }

    /// Entry for a 1-based group index, `None` for group 0.
    pub fn entry(&self, group_index: usize) -> Option<&E> {
        group_index
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .map(|(e, _)| e)
    }
}

impl<E: PartialEq> Default for SampleGroupExtension<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the key of a group index.
///
/// Group 0 uses `default_kid`. `Ok(None)` means samples of the group are not
/// encrypted.
pub fn resolve_key(
    groups: &SampleGroupExtension<CencSampleEncryptionGroupEntry>,
    group_index: usize,
    default_kid: Option<Uuid>,
    keys: &KeyTable,
) -> Result<Option<ContentKey>> {
    let kid = match groups.entry(group_index) {
        Some(entry) => entry.kid,
        None => default_kid,
    };

    match kid {
        Some(kid) => keys
            .get(&kid)
            .copied()
            .map(Some)
            .ok_or(Error::MissingKey { kid }),
        None => Ok(None),
    }
}

/// Build the sample index to key table for `sample_count` samples.
///
/// A range start is stored only where the group index changes.
pub fn build_key_table(
    groups: &SampleGroupExtension<CencSampleEncryptionGroupEntry>,
    sample_count: usize,
    default_kid: Option<Uuid>,
    keys: &KeyTable,
) -> Result<RangeStartMap<usize, Option<ContentKey>>> {
    let mut table = RangeStartMap::new();
    let mut last_group_index = None;

    for i in 0..sample_count {
        let group_index = groups.group_index(i);

        if last_group_index != Some(group_index) {
            let key = resolve_key(groups, group_index, default_kid, keys)?;
            debug!(
                "sample {i} starts group {group_index} ({})",
                if key.is_some() { "encrypted" } else { "clear" }
            );
            table.put(i, key);
            last_group_index = Some(group_index);
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KID_A: Uuid = Uuid::from_bytes([0xaa; 16]);
    const KID_B: Uuid = Uuid::from_bytes([0xbb; 16]);
    const KID_D: Uuid = Uuid::from_bytes([0xdd; 16]);

    fn keys() -> KeyTable {
        KeyTable::from([(KID_A, [1; 16]), (KID_B, [2; 16]), (KID_D, [4; 16])])
    }

    #[test]
    fn test_group_index_last_match_wins() {
        let mut groups = SampleGroupExtension::new();
        groups.add(CencSampleEncryptionGroupEntry::encrypted(KID_A), [0, 1, 2]);
        groups.add(CencSampleEncryptionGroupEntry::encrypted(KID_B), [2, 3, 4]);

        assert_eq!(groups.group_index(1), 1);
        assert_eq!(groups.group_index(2), 2);
        assert_eq!(groups.group_index(4), 2);
        assert_eq!(groups.group_index(5), 0);
    }

    #[test]
    fn test_add_sorts_and_replaces() {
        let mut groups = SampleGroupExtension::new();
        groups.add('a', [5, 1, 3, 1]);
        groups.add('b', [0]);
        groups.add('a', [9, 7]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups.samples(&'a'), Some(&[7, 9][..]));
        assert_eq!(groups.entry(1), Some(&'a'));
        assert_eq!(groups.entry(0), None);
    }

    #[test]
    fn test_key_table_overlapping_groups() {
        let mut groups = SampleGroupExtension::new();
        groups.add(CencSampleEncryptionGroupEntry::encrypted(KID_A), [0, 1, 2]);
        groups.add(CencSampleEncryptionGroupEntry::encrypted(KID_B), [2, 3, 4]);

        let table = build_key_table(&groups, 7, Some(KID_D), &keys()).unwrap();
        assert_eq!(table.get(1), Some(&Some([1; 16])));
        assert_eq!(table.get(2), Some(&Some([2; 16])));
        assert_eq!(table.get(5), Some(&Some([4; 16])));
        // transitions at 0, 2 and 5 only
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_key_table_unencrypted_group() {
        let mut groups = SampleGroupExtension::new();
        groups.add(CencSampleEncryptionGroupEntry::unencrypted(), [1]);

        let table = build_key_table(&groups, 3, Some(KID_A), &keys()).unwrap();
        assert_eq!(table.get(0), Some(&Some([1; 16])));
        assert_eq!(table.get(1), Some(&None));
        assert_eq!(table.get(2), Some(&Some([1; 16])));
    }

    #[test]
    fn test_key_table_missing_group_key() {
        let missing = Uuid::from_bytes([0xee; 16]);
        let mut groups = SampleGroupExtension::new();
        groups.add(CencSampleEncryptionGroupEntry::encrypted(missing), [1]);

        let result = build_key_table(&groups, 3, Some(KID_A), &keys());
        assert!(matches!(result, Err(Error::MissingKey { kid }) if kid == missing));
    }

    #[test]
    fn test_key_table_missing_default_key() {
        let missing = Uuid::from_bytes([0xee; 16]);
        let groups = SampleGroupExtension::new();
        let result = build_key_table(&groups, 1, Some(missing), &keys());
        assert!(matches!(result, Err(Error::MissingKey { .. })));
    }

    #[test]
    fn test_key_table_without_default_kid() {
        let groups = SampleGroupExtension::new();
        let table = build_key_table(&groups, 4, None, &keys()).unwrap();
        assert_eq!(table.get(3), Some(&None));
        assert_eq!(table.len(), 1);
    }
}
