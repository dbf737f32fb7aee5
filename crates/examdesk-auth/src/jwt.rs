use chrono::{DateTime, Duration, Utc};
use examdesk_core::{Error, Result, Role};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a JWT is a short-lived access token or a refresh token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUse {
	Access,
	Refresh,
}

/// JWT claims carried by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
	/// Profile id.
	pub sub: String,
	pub role: Role,
	#[serde(rename = "use")]
	pub token_use: TokenUse,
	/// Token id, rotated on refresh.
	pub jti: String,
	pub iat: i64,
	pub exp: i64,
}

impl Claims {
	pub fn new(
		profile_id: &str,
		role: Role,
		token_use: TokenUse,
		now: DateTime<Utc>,
		ttl: Duration,
	) -> Self {
		Self {
			sub: profile_id.to_string(),
			role,
			token_use,
			jti: Uuid::new_v4().to_string(),
			iat: now.timestamp(),
			exp: (now + ttl).timestamp(),
		}
	}
}

/// An access/refresh pair as returned by login and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
	pub access_token: String,
	pub refresh_token: String,
	/// Access-token lifetime in seconds.
	pub expires_in: i64,
}

/// Encodes and verifies the service's JWTs (HS256).
pub struct JwtAuth {
	encoding_key: EncodingKey,
	decoding_key: DecodingKey,
	validation: Validation,
	access_ttl: Duration,
	refresh_ttl: Duration,
}

impl JwtAuth {
	pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
		Self {
			encoding_key: EncodingKey::from_secret(secret),
			decoding_key: DecodingKey::from_secret(secret),
			validation: Validation::default(),
			access_ttl,
			refresh_ttl,
		}
	}

	/// Issue a fresh access/refresh pair for a profile.
	pub fn issue_pair(&self, profile_id: &str, role: Role, now: DateTime<Utc>) -> Result<TokenPair> {
		let access = Claims::new(profile_id, role, TokenUse::Access, now, self.access_ttl);
		let refresh = Claims::new(profile_id, role, TokenUse::Refresh, now, self.refresh_ttl);
		Ok(TokenPair {
			access_token: self.encode(&access)?,
			refresh_token: self.encode(&refresh)?,
			expires_in: self.access_ttl.num_seconds(),
		})
	}

	fn encode(&self, claims: &Claims) -> Result<String> {
		encode(&Header::default(), claims, &self.encoding_key)
			.map_err(|e| Error::Authentication(e.to_string()))
	}

	/// Decode and verify a token, additionally checking it is used for
	/// the intended purpose (access vs refresh).
	pub fn verify(&self, token: &str, expected_use: TokenUse) -> Result<Claims> {
		let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
			.map(|data| data.claims)
			.map_err(|e| Error::Authentication(format!("invalid token: {}", e)))?;
		if claims.token_use != expected_use {
			return Err(Error::Authentication("wrong token type".into()));
		}
		Ok(claims)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn auth() -> JwtAuth {
		JwtAuth::new(b"test-secret", Duration::minutes(15), Duration::days(7))
	}

	#[test]
	fn pair_round_trips_with_role() {
		let pair = auth()
			.issue_pair("profile-1", Role::Admin, Utc::now())
			.unwrap();
		let claims = auth().verify(&pair.access_token, TokenUse::Access).unwrap();
		assert_eq!(claims.sub, "profile-1");
		assert_eq!(claims.role, Role::Admin);
	}

	#[test]
	fn refresh_token_is_rejected_as_access() {
		let pair = auth()
			.issue_pair("profile-1", Role::Teacher, Utc::now())
			.unwrap();
		let err = auth()
			.verify(&pair.refresh_token, TokenUse::Access)
			.unwrap_err();
		assert_eq!(err.code(), "UNAUTHORIZED");
	}

	#[test]
	fn expired_token_is_rejected() {
		let stale = Utc::now() - Duration::days(2);
		let pair = auth().issue_pair("profile-1", Role::Teacher, stale).unwrap();
		assert!(auth().verify(&pair.access_token, TokenUse::Access).is_err());
	}

	#[test]
	fn tampered_token_is_rejected() {
		let other = JwtAuth::new(b"other-secret", Duration::minutes(15), Duration::days(7));
		let pair = other
			.issue_pair("profile-1", Role::Teacher, Utc::now())
			.unwrap();
		assert!(auth().verify(&pair.access_token, TokenUse::Access).is_err());
	}
}
