use std::sync::Arc;
use std::time::Duration;

use fern_chat::{
    fern_dispatcher, ChatClient, ChatClientError, ChatUser, DigestBroadcaster, DigestRunner,
    FernBot, NoopSocketTransport, ReconnectPolicy, SocketRunner, SocketTransport,
};
use fern_core::config::{AppConfig, ConfigError};
use fern_core::{shared_state, CalendarGateway, ChannelId, DigestSchedule, SharedBotState};
use thiserror::Error;
use tracing::info;

use crate::calendar::GoogleCalendarGateway;
use crate::chat_client::HttpChatClient;

pub struct Application {
    pub config: AppConfig,
    pub state: SharedBotState,
    pub bot_user: ChatUser,
    pub socket_runner: SocketRunner,
    pub digest_runner: Option<DigestRunner>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("chat login failed: {0}")]
    Login(#[source] ChatClientError),
    #[error("http client could not be built: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Builds the HTTP adapters for an already loaded config and assembles the
/// application around them.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let calendar_timezone = config.calendar_timezone()?;
    let calendar = GoogleCalendarGateway::from_config(&config.calendar, calendar_timezone)
        .map_err(BootstrapError::HttpClient)?;
    let client = HttpChatClient::from_config(&config.chat);

    assemble(config, Arc::new(client), Arc::new(calendar), Arc::new(NoopSocketTransport)).await
}

pub async fn assemble(
    config: AppConfig,
    client: Arc<dyn ChatClient>,
    calendar: Arc<dyn CalendarGateway>,
    transport: Arc<dyn SocketTransport>,
) -> Result<Application, BootstrapError> {
    let calendar_timezone = config.calendar_timezone()?;
    let digest_timezone = config.digest_timezone()?;

    let bot_user = client.current_user().await.map_err(BootstrapError::Login)?;
    info!(
        event_name = "system.bootstrap.logged_in",
        correlation_id = "bootstrap",
        user_id = %bot_user.id,
        display_name = %bot_user.display_name,
        "logged in to chat"
    );

    let state = shared_state();
    let bot = FernBot::new(state.clone(), calendar, client.clone(), calendar_timezone)
        .with_bot_user(bot_user.id.clone());
    let socket_runner =
        SocketRunner::new(transport, fern_dispatcher(bot), ReconnectPolicy::default());

    let digest_runner = config.digest.enabled.then(|| {
        DigestRunner::new(
            DigestSchedule::new(config.digest.hour),
            digest_timezone,
            state.clone(),
            DigestBroadcaster::new(client, ChannelId(config.chat.channel_id.clone())),
            Duration::from_secs(config.digest.poll_interval_secs),
        )
    });

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        digest_enabled = digest_runner.is_some(),
        calendar_timezone = %calendar_timezone,
        "application assembled"
    );

    Ok(Application { config, state, bot_user, socket_runner, digest_runner })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fern_chat::{ChatClientError, NoopSocketTransport, RecordingChatClient};
    use fern_core::config::AppConfig;
    use fern_core::{InMemoryCalendarGateway, UserId};

    use crate::bootstrap::{assemble, bootstrap_with_config, BootstrapError};

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.chat.bot_token = "bot-token".to_owned().into();
        config.chat.channel_id = "C-digest".to_owned();
        config.calendar.calendar_id = "team@group.calendar.test".to_owned();
        config.calendar.access_token = "calendar-token".to_owned().into();
        config
    }

    #[tokio::test]
    async fn unknown_calendar_timezone_fails_before_any_adapter_is_built() {
        let mut config = config();
        config.calendar.timezone = "Mars/Olympus_Mons".to_owned();

        let result = bootstrap_with_config(config).await;

        let error = result.err().expect("error");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("calendar.timezone"));
    }

    #[tokio::test]
    async fn assembles_with_fakes_and_records_the_bot_account() {
        let app = assemble(
            config(),
            Arc::new(RecordingChatClient::new()),
            Arc::new(InMemoryCalendarGateway::default()),
            Arc::new(NoopSocketTransport),
        )
        .await
        .expect("assemble");

        assert_eq!(app.bot_user.id, UserId("fern-bot".to_owned()));
        assert!(app.digest_runner.is_some());
        assert!(app.state.lock().await.sessions.is_empty());
        app.socket_runner.start().await.expect("noop transport drains immediately");
    }

    #[tokio::test]
    async fn disabled_digest_builds_no_runner() {
        let mut config = config();
        config.digest.enabled = false;

        let app = assemble(
            config,
            Arc::new(RecordingChatClient::new()),
            Arc::new(InMemoryCalendarGateway::default()),
            Arc::new(NoopSocketTransport),
        )
        .await
        .expect("assemble");

        assert!(app.digest_runner.is_none());
    }

    #[tokio::test]
    async fn login_failure_is_fatal() {
        let client = RecordingChatClient::new().failing_login(ChatClientError::Rejected {
            status: 401,
            message: "401: Unauthorized".to_owned(),
        });

        let result = assemble(
            config(),
            Arc::new(client),
            Arc::new(InMemoryCalendarGateway::default()),
            Arc::new(NoopSocketTransport),
        )
        .await;

        assert!(matches!(result, Err(BootstrapError::Login(ChatClientError::Rejected { .. }))));
    }
}
