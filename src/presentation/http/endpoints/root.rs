use std::sync::Arc;

use poem_openapi::Tags;

use crate::application::services::jwt::JwtServiceConfig;
use crate::application::usecases::{
    get_run::GetRunUseCase, reload_emojis::ReloadEmojisUseCase,
    resolve_confirmation::ResolveConfirmationUseCase, start_blast::StartBlastUseCase,
};

#[derive(Clone)]
pub struct ApiState {
    pub start_blast_usecase: Arc<StartBlastUseCase>,
    pub resolve_confirmation_usecase: Arc<ResolveConfirmationUseCase>,
    pub get_run_usecase: Arc<GetRunUseCase>,
    pub reload_emojis_usecase: Arc<ReloadEmojisUseCase>,
    pub jwt_config: JwtServiceConfig,
}

/// Enum of API sections (tags)
#[derive(Tags)]
pub enum EndpointsTags {
    Health,
    Blasts,
    Emojis,
}

pub struct Endpoints;
