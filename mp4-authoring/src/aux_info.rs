//! Per-sample encryption information (IV and subsample map).

/// Entry describing a subsample's cleartext and encrypted portions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsampleEntry {
    /// Number of cleartext bytes at the start of the subsample.
    pub bytes_of_clear_data: u32,
    /// Number of encrypted bytes following the cleartext.
    pub bytes_of_encrypted_data: u32,
}

impl SubsampleEntry {
    pub fn new(bytes_of_clear_data: u32, bytes_of_encrypted_data: u32) -> Self {
        Self {
            bytes_of_clear_data,
            bytes_of_encrypted_data,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes_of_clear_data as u64 + self.bytes_of_encrypted_data as u64
    }
}

/// Sample auxiliary information of one sample.
///
/// Samples left in the clear have neither an IV nor subsamples. Encrypted
/// samples without subsamples are encrypted as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleAuxiliaryData {
    pub iv: Option<[u8; 8]>,
    pub subsamples: Vec<SubsampleEntry>,
}

impl SampleAuxiliaryData {
    pub fn is_encrypted(&self) -> bool {
        self.iv.is_some()
    }

    /// Sum of all subsample sizes.
    pub fn subsamples_size(&self) -> u64 {
        self.subsamples.iter().map(SubsampleEntry::size).sum()
    }

    /// Subsamples as stored in a `senc` box, where clear counts are 16 bit.
    ///
    /// Clear runs longer than `u16::MAX` are split over several entries.
    pub fn senc_subsamples(&self) -> Vec<(u16, u32)> {
        let mut entries = Vec::with_capacity(self.subsamples.len());

        for subsample in &self.subsamples {
            let mut clear = subsample.bytes_of_clear_data;
            while clear > u16::MAX as u32 {
                entries.push((u16::MAX, 0));
                clear -= u16::MAX as u32;
            }
            entries.push((clear as u16, subsample.bytes_of_encrypted_data));
        }

        entries
    }

    /// Size of this entry in a `senc` box or as `saiz` sample info size.
    pub fn encoded_size(&self) -> usize {
        let iv_size = self.iv.map(|x| x.len()).unwrap_or(0);
        if self.subsamples.is_empty() {
            iv_size
        } else {
            iv_size + 2 + 6 * self.senc_subsamples().len()
        }
    }

    /// Append this entry in `senc` layout: IV, then when subsamples are
    /// present a 16 bit count followed by 16 bit clear and 32 bit encrypted
    /// byte counts.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        if let Some(iv) = &self.iv {
            buf.extend_from_slice(iv);
        }

        if !self.subsamples.is_empty() {
            let entries = self.senc_subsamples();
            buf.extend_from_slice(&(entries.len() as u16).to_be_bytes());
            for (clear, encrypted) in entries {
                buf.extend_from_slice(&clear.to_be_bytes());
                buf.extend_from_slice(&encrypted.to_be_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_with_subsamples() {
        let data = SampleAuxiliaryData {
            iv: Some([0, 0, 0, 0, 0, 0, 0, 7]),
            subsamples: vec![SubsampleEntry::new(100, 200), SubsampleEntry::new(50, 150)],
        };

        let mut buf = Vec::new();
        data.encode(&mut buf);

        assert_eq!(
            buf,
            vec![
                0, 0, 0, 0, 0, 0, 0, 7, // iv
                0, 2, // subsample count
                0, 100, 0, 0, 0, 200, //
                0, 50, 0, 0, 0, 150,
            ]
        );
        assert_eq!(data.encoded_size(), buf.len());
        assert_eq!(data.subsamples_size(), 500);
    }

    #[test]
    fn test_encode_clear_sample() {
        let data = SampleAuxiliaryData::default();
        let mut buf = Vec::new();
        data.encode(&mut buf);
        assert!(buf.is_empty());
        assert_eq!(data.encoded_size(), 0);
        assert!(!data.is_encrypted());
    }

    #[test]
    fn test_long_clear_run_is_split() {
        let data = SampleAuxiliaryData {
            iv: Some([0; 8]),
            subsamples: vec![SubsampleEntry::new(70_000, 0)],
        };
        assert_eq!(
            data.senc_subsamples(),
            vec![(u16::MAX, 0), ((70_000 - u16::MAX as u32) as u16, 0)]
        );
        assert_eq!(data.encoded_size(), 8 + 2 + 12);
    }
}
