use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::features::invoices::services::CompensationPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub swagger: SwaggerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
    pub upload_timeout: Duration,
    pub upload_compensation: CompensationPolicy,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

/// Cognito user pool settings used to validate bearer tokens
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub region: String,
    pub user_pool_id: String,
    /// App client id; when set, access tokens issued to other clients are rejected
    pub client_id: Option<String>,
    pub jwks_cache_ttl: Duration,
    pub jwt_leeway: Duration,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// S3-compatible object storage for uploaded invoice files
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Custom endpoint (MinIO, LocalStack). `None` targets AWS S3 in `region`.
    pub endpoint: Option<String>,
    /// Static credentials; when absent the default AWS credential chain is used
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub bucket: String,
    pub region: String,
}

/// Settings for the `scanbook` command-line client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub cognito_region: String,
    pub cognito_client_id: String,
    pub cognito_client_secret: Option<String>,
    pub auth_timeout: Duration,
    pub upload_timeout: Duration,
    pub session_file: PathBuf,
}

const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;
const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;

fn load_dotenv() {
    // Load .env file if exists, ignore if not found (optional for production)
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        load_dotenv();

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
            storage: StorageConfig::from_env()?,
        })
    }
}

impl AppConfig {
    // 10MB of file content, base64 inflates it by a third
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 10 * 1024 * 1024 * 4 / 3 + 64 * 1024;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size =
            parse_var("MAX_REQUEST_BODY_SIZE", Self::DEFAULT_MAX_REQUEST_BODY_SIZE)?;

        let upload_timeout_secs = parse_var("UPLOAD_TIMEOUT_SECS", DEFAULT_UPLOAD_TIMEOUT_SECS)?;

        let upload_compensation = match optional_var("UPLOAD_COMPENSATION") {
            Some(value) => value.parse::<CompensationPolicy>()?,
            None => CompensationPolicy::default(),
        };

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
            upload_timeout: Duration::from_secs(upload_timeout_secs),
            upload_compensation,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    // Default values for database connection pool (conservative defaults for small-medium apps)
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        Ok(Self {
            url,
            max_connections: parse_var("DB_MAX_CONNECTIONS", Self::DEFAULT_MAX_CONNECTIONS)?,
            min_connections: parse_var("DB_MIN_CONNECTIONS", Self::DEFAULT_MIN_CONNECTIONS)?,
            acquire_timeout_secs: parse_var(
                "DB_ACQUIRE_TIMEOUT_SECS",
                Self::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            idle_timeout_secs: parse_var("DB_IDLE_TIMEOUT_SECS", Self::DEFAULT_IDLE_TIMEOUT_SECS)?,
            max_lifetime_secs: parse_var("DB_MAX_LIFETIME_SECS", Self::DEFAULT_MAX_LIFETIME_SECS)?,
        })
    }
}

impl AuthConfig {
    const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 3600; // 1 hour
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60; // 1 minute

    pub fn from_env() -> Result<Self, String> {
        let region = env::var("COGNITO_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let user_pool_id = env::var("COGNITO_USER_POOL_ID")
            .map_err(|_| "COGNITO_USER_POOL_ID environment variable is required".to_string())?;

        Ok(Self {
            region,
            user_pool_id,
            client_id: optional_var("COGNITO_CLIENT_ID"),
            jwks_cache_ttl: Duration::from_secs(parse_var(
                "JWKS_CACHE_TTL",
                Self::DEFAULT_JWKS_CACHE_TTL_SECS,
            )?),
            jwt_leeway: Duration::from_secs(parse_var(
                "JWT_LEEWAY",
                Self::DEFAULT_JWT_LEEWAY_SECS,
            )?),
        })
    }

    /// Token issuer, e.g. `https://cognito-idp.us-east-1.amazonaws.com/us-east-1_AbCdEf`
    pub fn issuer(&self) -> String {
        format!(
            "https://cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        // Only use credentials if they are non-empty
        let username = optional_var("SWAGGER_USERNAME");
        let password = optional_var("SWAGGER_PASSWORD");
        let title = env::var("SWAGGER_TITLE").unwrap_or_else(|_| "ScanBook API".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Invoice upload and listing API for ScanBook".to_string());

        Ok(Self {
            username,
            password,
            title,
            version,
            description,
        })
    }

    /// Returns credentials in "username:password" format if auth is enabled
    pub fn credentials(&self) -> Option<String> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some(format!("{}:{}", user, pass)),
            _ => None,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, String> {
        let access_key = optional_var("S3_ACCESS_KEY");
        let secret_key = optional_var("S3_SECRET_KEY");
        if access_key.is_some() != secret_key.is_some() {
            return Err("S3_ACCESS_KEY and S3_SECRET_KEY must be set together".to_string());
        }

        Ok(Self {
            endpoint: optional_var("S3_ENDPOINT"),
            access_key,
            secret_key,
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "scanbook-files".to_string()),
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        })
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, String> {
        load_dotenv();

        let api_url = env::var("SCANBOOK_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let cognito_client_id = env::var("COGNITO_CLIENT_ID")
            .map_err(|_| "COGNITO_CLIENT_ID environment variable is required".to_string())?;

        let session_file = optional_var("SCANBOOK_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                env::var("HOME")
                    .map(|home| PathBuf::from(home).join(".scanbook").join("session.json"))
                    .unwrap_or_else(|_| PathBuf::from(".scanbook-session.json"))
            });

        Ok(Self {
            api_url,
            cognito_region: env::var("COGNITO_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            cognito_client_id,
            cognito_client_secret: optional_var("COGNITO_CLIENT_SECRET"),
            auth_timeout: Duration::from_secs(parse_var(
                "AUTH_TIMEOUT_SECS",
                DEFAULT_AUTH_TIMEOUT_SECS,
            )?),
            upload_timeout: Duration::from_secs(parse_var(
                "UPLOAD_TIMEOUT_SECS",
                DEFAULT_UPLOAD_TIMEOUT_SECS,
            )?),
            session_file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_from_pool() {
        let config = AuthConfig {
            region: "eu-west-1".to_string(),
            user_pool_id: "eu-west-1_AbC123".to_string(),
            client_id: None,
            jwks_cache_ttl: Duration::from_secs(60),
            jwt_leeway: Duration::from_secs(0),
        };
        assert_eq!(
            config.issuer(),
            "https://cognito-idp.eu-west-1.amazonaws.com/eu-west-1_AbC123"
        );
    }

    #[test]
    fn test_swagger_credentials_require_both_parts() {
        let mut config = SwaggerConfig {
            username: Some("docs".to_string()),
            password: None,
            title: String::new(),
            version: String::new(),
            description: String::new(),
        };
        assert!(config.credentials().is_none());
        config.password = Some("secret".to_string());
        assert_eq!(config.credentials().as_deref(), Some("docs:secret"));
    }
}
