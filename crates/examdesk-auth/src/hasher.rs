use examdesk_core::{Error, Result};

/// Password hashing seam.
///
/// The service layer only depends on this trait; production wires in
/// [`Argon2Hasher`], tests may substitute something cheaper.
pub trait PasswordHasher: Send + Sync {
	fn hash(&self, password: &str) -> Result<String>;

	/// `Ok(true)` on a match, `Ok(false)` on a mismatch, `Err` only when
	/// the stored hash itself is unusable.
	fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// Argon2id hasher, the OWASP-recommended default.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
	pub fn new() -> Self {
		Self
	}
}

impl PasswordHasher for Argon2Hasher {
	fn hash(&self, password: &str) -> Result<String> {
		use argon2::Argon2;
		use argon2::password_hash::{PasswordHasher as _, SaltString, rand_core::OsRng};

		let salt = SaltString::generate(&mut OsRng);
		Argon2::default()
			.hash_password(password.as_bytes(), &salt)
			.map(|hash| hash.to_string())
			.map_err(|e| Error::Authentication(format!("password hashing failed: {}", e)))
	}

	fn verify(&self, password: &str, hash: &str) -> Result<bool> {
		use argon2::Argon2;
		use argon2::password_hash::{PasswordHash, PasswordVerifier as _};

		let parsed = PasswordHash::new(hash)
			.map_err(|e| Error::Authentication(format!("malformed password hash: {}", e)))?;
		match Argon2::default().verify_password(password.as_bytes(), &parsed) {
			Ok(()) => Ok(true),
			Err(argon2::password_hash::Error::Password) => Ok(false),
			Err(e) => Err(Error::Authentication(format!(
				"password verification failed: {}",
				e
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_then_verify_round_trip() {
		let hasher = Argon2Hasher::new();
		let hash = hasher.hash("correct horse battery staple").unwrap();
		assert!(hasher.verify("correct horse battery staple", &hash).unwrap());
		assert!(!hasher.verify("wrong password", &hash).unwrap());
	}

	#[test]
	fn same_password_hashes_differently() {
		let hasher = Argon2Hasher::new();
		let first = hasher.hash("secret").unwrap();
		let second = hasher.hash("secret").unwrap();
		assert_ne!(first, second);
	}

	#[test]
	fn garbage_hash_is_an_error_not_a_mismatch() {
		let hasher = Argon2Hasher::new();
		assert!(hasher.verify("secret", "not-a-phc-string").is_err());
	}
}
