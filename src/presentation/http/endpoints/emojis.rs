use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, payload::Json};

use crate::presentation::http::{
    endpoints::root::{ApiState, EndpointsTags},
    mappers::map_error,
    responses::EmojiReloadDto,
    security::JwtAuth,
};

#[derive(Clone)]
pub struct EmojisEndpoints {
    state: Arc<ApiState>,
}

impl EmojisEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }
}

#[OpenApi]
impl EmojisEndpoints {
    /// Reload the guild's custom emojis used to resolve `:name:` tokens.
    #[oai(
        path = "/emojis/reload",
        method = "post",
        tag = EndpointsTags::Emojis,
    )]
    pub async fn reload_emojis(&self, auth: JwtAuth) -> PoemResult<Json<EmojiReloadDto>> {
        let caller = auth.into_caller(&self.state.jwt_config)?;
        let total = self
            .state
            .reload_emojis_usecase
            .execute(&caller.caller_id)
            .await
            .map_err(map_error)?;

        Ok(Json(EmojiReloadDto {
            total: total as u64,
        }))
    }
}
