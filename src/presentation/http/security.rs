use poem::{Error as PoemError, Result as PoemResult, http::StatusCode};
use poem_openapi::SecurityScheme;
use poem_openapi::auth::Bearer;

use crate::application::services::jwt::{JwtService, JwtServiceConfig};

#[derive(SecurityScheme)]
#[oai(ty = "bearer", bearer_format = "JWT")]
pub struct JwtAuth(pub Bearer);

/// Platform identity carried by a verified token. Whether that identity may
/// run commands is decided by the use cases.
pub struct AuthenticatedCaller {
    pub caller_id: String,
}

impl JwtAuth {
    pub fn into_caller(self, config: &JwtServiceConfig) -> PoemResult<AuthenticatedCaller> {
        let service = JwtService::new(config.clone());
        match service.verify(&self.0.token) {
            Ok(claims) => Ok(AuthenticatedCaller {
                caller_id: claims.sub,
            }),
            Err(_) => Err(PoemError::from_string(
                "invalid or expired token",
                StatusCode::UNAUTHORIZED,
            )),
        }
    }
}
