use rand::Rng;

/// Alphabet for tracking ids. Look-alike symbols (`0 O 1 l I o`) are left out.
pub const TRACK_ID_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const TRACK_ID_LEN: usize = 8;
pub const CASH_OUT_CODE_LEN: usize = 6;

/// Short human readable id handed to recipients for tracking.
pub fn track_id() -> String {
    random_from(TRACK_ID_ALPHABET, TRACK_ID_LEN)
}

/// Numeric one-time code. Leading zeros are kept.
pub fn cash_out_code() -> String {
    random_from(b"0123456789", CASH_OUT_CODE_LEN)
}

fn random_from(alphabet: &[u8], len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}
