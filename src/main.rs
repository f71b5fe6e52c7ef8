use std::io::Error;
use std::sync::Arc;
use std::time::Duration;

use dmblast::{
    application::{
        handlers::{delivery_worker::DeliveryWorker, dispatch_pool::DispatchPool},
        services::{
            authorization::OperatorPolicy,
            confirmation::PendingConfirmations,
            emoji::EmojiCatalog,
            jwt::{JwtService, JwtServiceConfig},
            messenger::MessengerClient,
            rate_governor::RateGovernor,
            status_board::RunStatusBoard,
        },
        usecases::{
            get_run::GetRunUseCase, reload_emojis::ReloadEmojisUseCase,
            resolve_confirmation::ResolveConfirmationUseCase,
            start_blast::{BlastRunner, StartBlastUseCase},
        },
    },
    config::Config,
    domain::models::Recipient,
    infrastructure::{
        messaging::{discord::DiscordClient, in_memory::InMemoryMessenger},
        repositories::file_log::FileRunLog,
    },
    presentation::http::endpoints::{
        blasts::BlastsEndpoints,
        emojis::EmojisEndpoints,
        root::{ApiState, Endpoints},
    },
};
use poem::{Route, Server, listener::TcpListener};
use poem_openapi::OpenApiService;
use tokio::main;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60 * 24 * 30);

#[main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::try_parse().map_err(Error::other)?;
    let jwt_config = JwtServiceConfig {
        secret: config.jwt_secret.clone(),
        expiration: TOKEN_LIFETIME,
    };

    // `dmblast issue-token` prints a bearer token for the operator and exits.
    if std::env::args().nth(1).as_deref() == Some("issue-token") {
        let token = JwtService::new(jwt_config)
            .issue(&config.operator_id)
            .map_err(Error::other)?;
        println!("{token}");
        return Ok(());
    }

    let client: Arc<dyn MessengerClient> = if config.dry_run {
        info!(members = config.dry_run_members, "dry run enabled, nothing will be delivered");
        let members = (1..=config.dry_run_members)
            .map(|id| Recipient::new(id, format!("member-{id}")))
            .collect();
        Arc::new(InMemoryMessenger::new().with_members(members))
    } else {
        Arc::new(
            DiscordClient::new(config.discord_token.clone(), config.discord_api_base.clone())
                .map_err(Error::other)?,
        )
    };

    let governor = Arc::new(RateGovernor::new(config.governor.clone()));
    let worker = Arc::new(DeliveryWorker::new(
        client.clone(),
        governor.clone(),
        config.worker.clone(),
    ));
    let pool = Arc::new(DispatchPool::new(worker, config.pool.clone()));
    let board = Arc::new(RunStatusBoard::new());
    let confirmations = Arc::new(PendingConfirmations::new(config.confirmation_timeout));
    let emojis = Arc::new(EmojiCatalog::new());
    let run_log = Arc::new(FileRunLog::new(&config.run_log_path));
    let policy = OperatorPolicy::new(config.operator_id.clone());

    let runner = BlastRunner::new(pool, board.clone(), run_log, config.progress.clone());
    let reload_emojis_usecase = Arc::new(ReloadEmojisUseCase::new(
        client.clone(),
        emojis.clone(),
        policy.clone(),
        config.guild_id,
    ));
    if let Err(err) = reload_emojis_usecase.refresh().await {
        error!(error = %err, "failed to load guild emojis at startup");
    }

    let state = Arc::new(ApiState {
        start_blast_usecase: Arc::new(StartBlastUseCase::new(
            client,
            confirmations.clone(),
            emojis,
            policy.clone(),
            runner,
            config.guild_id,
        )),
        resolve_confirmation_usecase: Arc::new(ResolveConfirmationUseCase::new(
            confirmations,
            policy.clone(),
        )),
        get_run_usecase: Arc::new(GetRunUseCase::new(board, policy)),
        reload_emojis_usecase,
        jwt_config,
    });

    let server_url = format!("{}://{}:{}", config.scheme, config.host, config.port);
    info!(url = %server_url, "starting server");

    let api_service = OpenApiService::new(
        (
            Endpoints,
            BlastsEndpoints::new(state.clone()),
            EmojisEndpoints::new(state),
        ),
        "DM Blast API",
        "0.1.0",
    )
    .server(format!("{}/api", server_url));
    let ui = api_service.swagger_ui();
    let app = Route::new().nest("/api", api_service).nest("/", ui);

    let result = Server::new(TcpListener::bind(format!("0.0.0.0:{}", config.port)))
        .run_with_graceful_shutdown(
            app,
            async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown requested");
            },
            Some(Duration::from_secs(10)),
        )
        .await;

    governor.close();
    result
}
