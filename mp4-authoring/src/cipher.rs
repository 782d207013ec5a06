use crate::{ContentKey, Scheme, SubsampleEntry};
use aes::{
    Aes128,
    cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher, generic_array::GenericArray},
};

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Encrypts the protected ranges of one sample.
///
/// Keystream (cenc) or block chaining (cbc1) continues across the encrypted
/// ranges of the same sample.
pub(crate) enum Cipher {
    Cenc(Aes128Ctr),
    Cbc1 { cipher: Aes128, chain: [u8; 16] },
}

impl Cipher {
    pub(crate) fn new(scheme: Scheme, key: &ContentKey, iv: &[u8; 8]) -> Self {
        let mut full_iv = [0u8; 16];
        full_iv[..8].copy_from_slice(iv);

        match scheme {
            Scheme::Cenc => Self::Cenc(Aes128Ctr::new(
                GenericArray::from_slice(key),
                GenericArray::from_slice(&full_iv),
            )),
            Scheme::Cbc1 => Self::Cbc1 {
                cipher: Aes128::new(GenericArray::from_slice(key)),
                chain: full_iv,
            },
        }
    }

    /// Encrypt `data` in place. CBC leaves a trailing partial block clear.
    pub(crate) fn process(&mut self, data: &mut [u8]) {
        match self {
            Self::Cenc(cipher) => cipher.apply_keystream(data),
            Self::Cbc1 { cipher, chain } => {
                for block in data.chunks_exact_mut(16) {
                    for (b, c) in block.iter_mut().zip(chain.iter()) {
                        *b ^= c;
                    }
                    let block = GenericArray::from_mut_slice(block);
                    cipher.encrypt_block(block);
                    chain.copy_from_slice(block.as_slice());
                }
            }
        }
    }
}

/// Encrypt a whole sample, or only the encrypted ranges of its subsamples.
pub(crate) fn encrypt_sample(
    scheme: Scheme,
    key: &ContentKey,
    iv: &[u8; 8],
    subsamples: &[SubsampleEntry],
    data: &[u8],
) -> Vec<u8> {
    let mut output = data.to_vec();
    let mut cipher = Cipher::new(scheme, key, iv);

    if subsamples.is_empty() {
        cipher.process(&mut output);
        return output;
    }

    let mut offset = 0usize;
    for subsample in subsamples {
        let clear_end = (offset + subsample.bytes_of_clear_data as usize).min(output.len());
        let encrypted_end =
            (clear_end + subsample.bytes_of_encrypted_data as usize).min(output.len());

        if encrypted_end > clear_end {
            cipher.process(&mut output[clear_end..encrypted_end]);
        }
        offset = encrypted_end;
    }

    output
}
