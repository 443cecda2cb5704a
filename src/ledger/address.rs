//! Classic address codec.
//!
//! A classic address is the base58check encoding, over the ripple alphabet,
//! of a one-byte type prefix (`0x00`) followed by a 20-byte account id. The
//! checksum is the first four bytes of a double SHA-256 of the prefixed id.

use bs58::Alphabet;

const ACCOUNT_ID_PREFIX: u8 = 0x00;

/// Shortest and longest possible encodings of a prefixed account id.
const MIN_LEN: usize = 25;
const MAX_LEN: usize = 35;

/// Encode a 20-byte account id as a classic address.
pub fn encode_classic_address(account_id: &[u8; 20]) -> String {
    bs58::encode(account_id)
        .with_alphabet(Alphabet::RIPPLE)
        .with_check_version(ACCOUNT_ID_PREFIX)
        .into_string()
}

/// Decode a classic address back to its account id.
///
/// Returns `None` for anything that is not a well-formed classic address
/// with a valid checksum.
pub fn decode_classic_address(address: &str) -> Option<[u8; 20]> {
    if !(MIN_LEN..=MAX_LEN).contains(&address.len()) || !address.starts_with('r') {
        return None;
    }

    // Version byte included, checksum stripped
    let bytes = bs58::decode(address)
        .with_alphabet(Alphabet::RIPPLE)
        .with_check(Some(ACCOUNT_ID_PREFIX))
        .into_vec()
        .ok()?;
    if bytes.len() != 21 {
        return None;
    }

    let mut account_id = [0u8; 20];
    account_id.copy_from_slice(&bytes[1..]);
    Some(account_id)
}

/// Format check used for login identities and proposal destinations.
pub fn is_valid_classic_address(address: &str) -> bool {
    decode_classic_address(address).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_account_zero() {
        assert_eq!(
            encode_classic_address(&[0u8; 20]),
            "rrrrrrrrrrrrrrrrrrrrrhoLvTp"
        );
        assert_eq!(
            decode_classic_address("rrrrrrrrrrrrrrrrrrrrrhoLvTp"),
            Some([0u8; 20])
        );
    }

    #[test]
    fn test_genesis_account_is_valid() {
        assert!(is_valid_classic_address("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh"));
    }

    #[test]
    fn test_corrupted_checksum_rejected() {
        // Last character changed
        assert!(!is_valid_classic_address("rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTj"));
    }

    #[test]
    fn test_rejects_non_addresses() {
        assert!(!is_valid_classic_address(""));
        assert!(!is_valid_classic_address("not-an-address"));
        assert!(!is_valid_classic_address("0xdeadbeefdeadbeefdeadbeefdeadbeef"));
        // '0' and 'l' are outside the alphabet
        assert!(!is_valid_classic_address("r0000000000000000000000000000"));
        assert!(!is_valid_classic_address("rlllllllllllllllllllllllllll"));
    }

    #[test]
    fn test_other_type_prefix_rejected() {
        // Same payload under a non-account type prefix
        let foreign = bs58::encode([7u8; 20])
            .with_alphabet(Alphabet::RIPPLE)
            .with_check_version(0x23)
            .into_string();
        assert_eq!(decode_classic_address(&foreign), None);
    }

    proptest! {
        #[test]
        fn prop_encoded_ids_decode(account_id in proptest::array::uniform20(any::<u8>())) {
            let address = encode_classic_address(&account_id);
            prop_assert!(address.starts_with('r'));
            prop_assert_eq!(decode_classic_address(&address), Some(account_id));
        }
    }
}
