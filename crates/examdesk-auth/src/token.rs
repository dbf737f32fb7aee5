use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt::Write as _;

/// Length of a submission token in hex characters.
pub const SUBMISSION_TOKEN_LEN: usize = 32;

/// Fixed-length lowercase-hex token from the OS RNG.
///
/// # Examples
///
/// ```
/// use examdesk_auth::random_hex_token;
///
/// let token = random_hex_token(32);
/// assert_eq!(token.len(), 32);
/// assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
/// ```
pub fn random_hex_token(len: usize) -> String {
	let mut bytes = vec![0u8; len.div_ceil(2)];
	OsRng.fill_bytes(&mut bytes);
	let mut token = String::with_capacity(bytes.len() * 2);
	for byte in &bytes {
		// Writing to a String cannot fail
		let _ = write!(token, "{:02x}", byte);
	}
	token.truncate(len);
	token
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashSet;

	#[test]
	fn tokens_have_the_requested_length() {
		for len in [1, 16, 31, 32, 64] {
			assert_eq!(random_hex_token(len).len(), len);
		}
	}

	#[test]
	fn tokens_do_not_repeat() {
		let tokens: HashSet<String> = (0..100).map(|_| random_hex_token(32)).collect();
		assert_eq!(tokens.len(), 100);
	}
}
