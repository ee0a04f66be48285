//! Session token codec
//!
//! Issues and verifies self-contained session tokens signed with HMAC-SHA-512.
//! A token carries the identity plus a snapshot of the role and permission
//! names the user held at issuance time; verification is a pure cryptographic
//! computation and never touches the credential store.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::db::models::{Permission, Role, User};

/// Default token lifetime (24 hours)
const DEFAULT_LIFETIME_SECS: i64 = 86_400;

/// HS512 wants a key of at least 256 bits
const MIN_SECRET_BYTES: usize = 32;

/// Development-only fallback secret used when no secret is configured
const DEV_SECRET: &str = "warden_dev_secret_key_not_for_production_use_48ch";

/// Token codec configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Symmetric signing secret
    pub secret: String,
    /// Token lifetime in seconds
    pub lifetime_secs: i64,
}

impl JwtConfig {
    /// Create a new configuration, rejecting secrets below the HS512 key-size floor
    pub fn new(secret: impl Into<String>) -> Result<Self, TokenError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::WeakSecret);
        }

        Ok(Self {
            secret,
            lifetime_secs: DEFAULT_LIFETIME_SECS,
        })
    }

    /// Create config from environment variables
    ///
    /// Reads `WARDEN_JWT_SECRET` and `WARDEN_JWT_LIFETIME_SECS`. Falls back to a
    /// built-in development secret when no secret is set.
    pub fn from_env() -> Result<Self, TokenError> {
        let secret = match std::env::var("WARDEN_JWT_SECRET") {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("WARDEN_JWT_SECRET not set, using built-in development secret");
                DEV_SECRET.to_string()
            }
        };

        let lifetime_secs = std::env::var("WARDEN_JWT_LIFETIME_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LIFETIME_SECS);

        Ok(Self::new(secret)?.lifetime(lifetime_secs))
    }

    /// Set the token lifetime in seconds
    pub fn lifetime(mut self, secs: i64) -> Self {
        self.lifetime_secs = secs;
        self
    }
}

/// Token codec errors
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("signing secret must be at least 32 bytes")]
    WeakSecret,

    #[error("token has expired")]
    Expired,

    #[error("malformed token")]
    Malformed,

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            // Bad signature, unexpected algorithm, garbage structure and
            // unparsable claims all collapse to one outward failure.
            _ => TokenError::Malformed,
        }
    }
}

/// Claim set carried inside a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// User identifier
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    /// User email, if any
    #[serde(default)]
    pub email: Option<String>,
    /// Enabled flag at issuance time
    pub enabled: bool,
    /// Comma-joined role names held at issuance time
    pub roles: String,
    /// Comma-joined de-duplicated permission names held at issuance time
    pub permissions: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Derive the granted-authority list from the claim strings.
    ///
    /// Role entries come first, each mapped to `ROLE_<name>`; permission
    /// entries follow under their bare names. Entries are trimmed, empty
    /// entries dropped, join order preserved.
    pub fn authorities(&self) -> Vec<String> {
        let mut authorities: Vec<String> = self
            .roles
            .split(',')
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .map(|role| format!("ROLE_{}", role))
            .collect();

        authorities.extend(
            self.permissions
                .split(',')
                .map(str::trim)
                .filter(|permission| !permission.is_empty())
                .map(String::from),
        );

        authorities
    }
}

/// Codec for issuing and verifying session tokens
#[derive(Clone)]
pub struct TokenCodec {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenCodec {
    /// Create a new codec; the keys are derived once and never mutated
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Create a codec from environment variables
    pub fn from_env() -> Result<Self, TokenError> {
        Ok(Self::new(JwtConfig::from_env()?))
    }

    /// Issue a signed token for a user with the given role/permission snapshot.
    ///
    /// Permission names are de-duplicated preserving first occurrence; roles
    /// are joined in the order given. Store mutations after this point do not
    /// affect the issued token.
    pub fn issue(
        &self,
        user: &User,
        roles: &[Role],
        permissions: &[Permission],
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.lifetime_secs);

        let roles_claim = roles
            .iter()
            .map(|role| role.name.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let mut seen = std::collections::HashSet::new();
        let permissions_claim = permissions
            .iter()
            .map(|permission| permission.name.as_str())
            .filter(|name| seen.insert(*name))
            .collect::<Vec<_>>()
            .join(",");

        let claims = Claims {
            sub: user.username.clone(),
            user_id: user.id,
            email: user.email.clone(),
            enabled: user.enabled,
            roles: roles_claim,
            permissions: permissions_claim,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify a token and return its claim set.
    ///
    /// Only HS512 signatures under this codec's key are accepted; an expired
    /// token fails with [`TokenError::Expired`], everything else with
    /// [`TokenError::Malformed`].
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(data.claims)
    }

    /// Check whether a token is past its expiry.
    ///
    /// A token that fails signature or structural checks has no trustworthy
    /// expiry; that case is surfaced as [`TokenError::Malformed`] rather than
    /// being classified either way.
    pub fn is_expired(&self, token: &str) -> Result<bool, TokenError> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.leeway = 0;
        validation.validate_exp = false;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(data.claims.exp < Utc::now().timestamp())
    }

    /// Re-sign the claim set of a still-valid token with a fresh lifetime.
    ///
    /// The role and permission claims are carried over verbatim; grants
    /// revoked in the store since issuance survive the refresh.
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        let mut claims = self.verify(token)?;

        let now = Utc::now();
        claims.iat = now.timestamp();
        claims.exp = (now + Duration::seconds(self.config.lifetime_secs)).timestamp();

        encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Configured token lifetime in seconds
    pub fn lifetime_secs(&self) -> i64 {
        self.config.lifetime_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "test_secret_key_for_testing_only_48_bytes_long!!";

    fn test_codec() -> TokenCodec {
        TokenCodec::new(JwtConfig::new(TEST_SECRET).unwrap())
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            password_hash: "$2b$12$irrelevant".to_string(),
            email: Some("alice@example.com".to_string()),
            enabled: true,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    fn role(name: &str) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
        }
    }

    fn permission(name: &str) -> Permission {
        let (resource, action) = name.split_once(':').unwrap_or((name, "use"));
        Permission {
            id: Uuid::new_v4(),
            name: name.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
        }
    }

    // ========================================================================
    // JwtConfig Tests
    // ========================================================================

    #[test]
    fn test_config_defaults() {
        let config = JwtConfig::new(TEST_SECRET).unwrap();

        assert_eq!(config.secret, TEST_SECRET);
        assert_eq!(config.lifetime_secs, DEFAULT_LIFETIME_SECS);
    }

    #[test]
    fn test_config_rejects_short_secret() {
        let result = JwtConfig::new("too_short");
        assert!(matches!(result, Err(TokenError::WeakSecret)));
    }

    #[test]
    fn test_config_lifetime_builder() {
        let config = JwtConfig::new(TEST_SECRET).unwrap().lifetime(3600);
        assert_eq!(config.lifetime_secs, 3600);
    }

    #[test]
    fn test_dev_secret_meets_key_floor() {
        assert!(DEV_SECRET.len() >= MIN_SECRET_BYTES);
        assert!(JwtConfig::new(DEV_SECRET).is_ok());
    }

    // ========================================================================
    // Issue / Verify Round-Trip Tests
    // ========================================================================

    #[test]
    fn test_round_trip_recovers_snapshot() {
        let codec = test_codec();
        let user = test_user();
        let roles = [role("USER"), role("ADMIN")];
        let permissions = [permission("user:read"), permission("user:delete")];

        let token = codec.issue(&user, &roles, &permissions).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, Some("alice@example.com".to_string()));
        assert!(claims.enabled);
        assert_eq!(claims.roles, "USER,ADMIN");
        assert_eq!(claims.permissions, "user:read,user:delete");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_issue_deduplicates_permissions() {
        let codec = test_codec();
        let user = test_user();
        let permissions = [
            permission("user:read"),
            permission("user:read"),
            permission("user:delete"),
        ];

        let token = codec.issue(&user, &[role("ADMIN")], &permissions).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.permissions, "user:read,user:delete");
    }

    #[test]
    fn test_issue_with_no_roles_or_permissions() {
        let codec = test_codec();
        let user = test_user();

        let token = codec.issue(&user, &[], &[]).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.roles, "");
        assert_eq!(claims.permissions, "");
        assert!(claims.authorities().is_empty());
    }

    // ========================================================================
    // Verification Failure Tests
    // ========================================================================

    #[test]
    fn test_verify_garbage_token() {
        let codec = test_codec();

        let result = codec.verify("not.a.token");
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[test]
    fn test_verify_tampered_signature() {
        let codec = test_codec();
        let user = test_user();

        let mut token = codec.issue(&user, &[role("USER")], &[]).unwrap();
        // Flip the last signature character.
        let last = token.pop().unwrap();
        token.push(if last == 'A' { 'B' } else { 'A' });

        let result = codec.verify(&token);
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let issuer = test_codec();
        let verifier = TokenCodec::new(
            JwtConfig::new("another_secret_key_also_long_enough_to_pass!").unwrap(),
        );

        let token = issuer.issue(&test_user(), &[], &[]).unwrap();

        let result = verifier.verify(&token);
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    #[test]
    fn test_verify_rejects_unexpected_algorithm() {
        let codec = test_codec();
        let user = test_user();
        let roles = [role("USER")];

        // Same key, but signed with HS256 instead of HS512.
        let claims = Claims {
            sub: user.username.clone(),
            user_id: user.id,
            email: None,
            enabled: true,
            roles: "USER".to_string(),
            permissions: String::new(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let result = codec.verify(&token);
        assert!(matches!(result, Err(TokenError::Malformed)));

        // Sanity: the same claims under HS512 verify fine.
        let good = codec.issue(&user, &roles, &[]).unwrap();
        assert!(codec.verify(&good).is_ok());
    }

    #[test]
    fn test_verify_expired_token() {
        let codec = TokenCodec::new(JwtConfig::new(TEST_SECRET).unwrap().lifetime(-60));

        let token = codec.issue(&test_user(), &[], &[]).unwrap();

        let result = codec.verify(&token);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    // ========================================================================
    // Expiry Probe Tests
    // ========================================================================

    #[test]
    fn test_is_expired_fresh_token() {
        let codec = test_codec();
        let token = codec.issue(&test_user(), &[], &[]).unwrap();

        assert!(!codec.is_expired(&token).unwrap());
    }

    #[test]
    fn test_is_expired_stale_token() {
        let codec = TokenCodec::new(JwtConfig::new(TEST_SECRET).unwrap().lifetime(-60));
        let token = codec.issue(&test_user(), &[], &[]).unwrap();

        assert!(codec.is_expired(&token).unwrap());
    }

    #[test]
    fn test_is_expired_undecidable_for_garbage() {
        let codec = test_codec();

        let result = codec.is_expired("garbage");
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    // ========================================================================
    // Refresh Tests
    // ========================================================================

    #[test]
    fn test_refresh_preserves_claims_and_extends_expiry() {
        let codec = test_codec();
        let user = test_user();
        let roles = [role("ADMIN")];
        let permissions = [permission("user:delete")];

        let token = codec.issue(&user, &roles, &permissions).unwrap();
        let original = codec.verify(&token).unwrap();

        let refreshed = codec.refresh(&token).unwrap();
        let claims = codec.verify(&refreshed).unwrap();

        assert_eq!(claims.sub, original.sub);
        assert_eq!(claims.user_id, original.user_id);
        assert_eq!(claims.roles, original.roles);
        assert_eq!(claims.permissions, original.permissions);
        assert!(claims.exp >= original.exp);
    }

    #[test]
    fn test_refresh_rejects_expired_token() {
        let codec = TokenCodec::new(JwtConfig::new(TEST_SECRET).unwrap().lifetime(-60));
        let token = codec.issue(&test_user(), &[], &[]).unwrap();

        let result = codec.refresh(&token);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_refresh_rejects_garbage() {
        let codec = test_codec();

        let result = codec.refresh("nope");
        assert!(matches!(result, Err(TokenError::Malformed)));
    }

    // ========================================================================
    // Authority Derivation Tests
    // ========================================================================

    #[test]
    fn test_authorities_roles_first_then_permissions() {
        let codec = test_codec();
        let user = test_user();
        let roles = [role("ADMIN")];
        let permissions = [permission("user:delete")];

        let token = codec.issue(&user, &roles, &permissions).unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.authorities(), vec!["ROLE_ADMIN", "user:delete"]);
    }

    #[test]
    fn test_authorities_trim_and_drop_empty_entries() {
        let claims = Claims {
            sub: "alice".to_string(),
            user_id: Uuid::new_v4(),
            email: None,
            enabled: true,
            roles: " USER , ,ADMIN".to_string(),
            permissions: "user:read, ,".to_string(),
            iat: 0,
            exp: 0,
        };

        assert_eq!(
            claims.authorities(),
            vec!["ROLE_USER", "ROLE_ADMIN", "user:read"]
        );
    }

    #[test]
    fn test_authorities_empty_permission_claim() {
        let claims = Claims {
            sub: "alice".to_string(),
            user_id: Uuid::new_v4(),
            email: None,
            enabled: true,
            roles: "USER".to_string(),
            permissions: String::new(),
            iat: 0,
            exp: 0,
        };

        assert_eq!(claims.authorities(), vec!["ROLE_USER"]);
    }

    // ========================================================================
    // Error Tests
    // ========================================================================

    #[test]
    fn test_token_error_display() {
        assert_eq!(format!("{}", TokenError::Expired), "token has expired");
        assert_eq!(format!("{}", TokenError::Malformed), "malformed token");
        assert_eq!(
            format!("{}", TokenError::WeakSecret),
            "signing secret must be at least 32 bytes"
        );
    }
}
