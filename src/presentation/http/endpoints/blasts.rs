use std::sync::Arc;

use poem::Result as PoemResult;
use poem_openapi::{OpenApi, param::Path, payload::Json};
use tracing::info;
use uuid::Uuid;

use crate::{
    application::{
        services::confirmation::ConfirmationDecision,
        usecases::start_blast::{
            BlastPayload, ComposeEmbedRequest, StartBlastRequest, StartBlastResponse,
        },
    },
    presentation::http::{
        endpoints::root::{ApiState, EndpointsTags},
        mappers::{map_error, map_run},
        requests::{ComposeBlastRequestDto, CopyBlastRequestDto},
        responses::{BlastStartedDto, DecisionAcceptedDto, RunDto},
        security::JwtAuth,
    },
};

#[derive(Clone)]
pub struct BlastsEndpoints {
    state: Arc<ApiState>,
}

impl BlastsEndpoints {
    pub fn new(state: Arc<ApiState>) -> Self {
        Self { state }
    }

    async fn start(&self, request: StartBlastRequest) -> PoemResult<Json<BlastStartedDto>> {
        let StartBlastResponse {
            run_id,
            recipients,
            prompt,
            handle,
        } = self
            .state
            .start_blast_usecase
            .execute(request)
            .await
            .map_err(map_error)?;

        // The run outlives the request; its outcome is read from the board.
        drop(handle);

        Ok(Json(BlastStartedDto {
            run_id,
            recipients: recipients as u64,
            prompt,
        }))
    }

    fn decide(
        &self,
        auth: JwtAuth,
        run_id: Uuid,
        decision: ConfirmationDecision,
    ) -> PoemResult<Json<DecisionAcceptedDto>> {
        let caller = auth.into_caller(&self.state.jwt_config)?;
        self.state
            .resolve_confirmation_usecase
            .execute(&caller.caller_id, run_id, decision)
            .map_err(map_error)?;

        info!(run_id = %run_id, ?decision, "confirmation resolved");
        Ok(Json(DecisionAcceptedDto {
            run_id,
            decision: decision.into(),
        }))
    }
}

#[OpenApi]
impl BlastsEndpoints {
    /// Compose an embed and ask for confirmation before sending it to every
    /// non-bot guild member.
    #[oai(
        path = "/blasts",
        method = "post",
        tag = EndpointsTags::Blasts,
    )]
    pub async fn compose_blast(
        &self,
        auth: JwtAuth,
        request: Json<ComposeBlastRequestDto>,
    ) -> PoemResult<Json<BlastStartedDto>> {
        let caller = auth.into_caller(&self.state.jwt_config)?;
        let Json(request) = request;

        self.start(StartBlastRequest {
            caller_id: caller.caller_id,
            payload: BlastPayload::Compose(ComposeEmbedRequest {
                title: request.title,
                description: request.description,
                color: request.color,
                footer: request.footer,
                field1_name: request.field1_name,
                field1_value: request.field1_value,
                field2_name: request.field2_name,
                field2_value: request.field2_value,
                image_url: request.image_url,
            }),
        })
        .await
    }

    /// Copy an existing message and ask for confirmation before sending it.
    #[oai(
        path = "/blasts/from-message",
        method = "post",
        tag = EndpointsTags::Blasts,
    )]
    pub async fn copy_blast(
        &self,
        auth: JwtAuth,
        request: Json<CopyBlastRequestDto>,
    ) -> PoemResult<Json<BlastStartedDto>> {
        let caller = auth.into_caller(&self.state.jwt_config)?;
        let Json(request) = request;

        self.start(StartBlastRequest {
            caller_id: caller.caller_id,
            payload: BlastPayload::CopyMessage {
                link_or_id: request.message_link_or_id,
                channel_id: request.channel_id,
            },
        })
        .await
    }

    #[oai(
        path = "/blasts/:run_id/confirm",
        method = "post",
        tag = EndpointsTags::Blasts,
    )]
    pub async fn confirm_blast(
        &self,
        auth: JwtAuth,
        run_id: Path<Uuid>,
    ) -> PoemResult<Json<DecisionAcceptedDto>> {
        self.decide(auth, run_id.0, ConfirmationDecision::Confirmed)
    }

    #[oai(
        path = "/blasts/:run_id/decline",
        method = "post",
        tag = EndpointsTags::Blasts,
    )]
    pub async fn decline_blast(
        &self,
        auth: JwtAuth,
        run_id: Path<Uuid>,
    ) -> PoemResult<Json<DecisionAcceptedDto>> {
        self.decide(auth, run_id.0, ConfirmationDecision::Declined)
    }

    #[oai(
        path = "/blasts/:run_id",
        method = "get",
        tag = EndpointsTags::Blasts,
    )]
    pub async fn get_blast(&self, auth: JwtAuth, run_id: Path<Uuid>) -> PoemResult<Json<RunDto>> {
        let caller = auth.into_caller(&self.state.jwt_config)?;
        let record = self
            .state
            .get_run_usecase
            .execute(&caller.caller_id, run_id.0)
            .await
            .map_err(map_error)?;

        Ok(Json(map_run(&record)))
    }
}
