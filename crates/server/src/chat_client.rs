use async_trait::async_trait;
use fern_chat::blocks::{Embed, MessageTemplate};
use fern_chat::{ChatClient, ChatClientError, ChatUser};
use fern_core::config::ChatConfig;
use fern_core::{ChannelId, MessageId, MessageRef, UserId};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// REST client for a Discord-compatible chat API, authenticated as a bot.
pub struct HttpChatClient {
    client: Client,
    base_url: String,
    bot_token: SecretString,
}

impl HttpChatClient {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base_url.clone(),
            bot_token: config.bot_token.clone(),
        }
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ChatClientError> {
        let url = api_url(&self.base_url, segments)?;
        Ok(self
            .client
            .request(method, url)
            .header("Authorization", format!("Bot {}", self.bot_token.expose_secret())))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ChatClientError> {
        let response =
            request.send().await.map_err(|error| ChatClientError::Request(error.to_string()))?;
        accept(response).await
    }

    async fn fetch(&self, segments: &[&str]) -> Result<ChatUser, ChatClientError> {
        let response = self.send(self.request(Method::GET, segments)?).await?;
        let user: WireUser =
            response.json().await.map_err(|error| ChatClientError::Decode(error.to_string()))?;
        Ok(user.into())
    }
}

#[async_trait]
impl ChatClient for HttpChatClient {
    async fn post_message(
        &self,
        channel: &ChannelId,
        message: &MessageTemplate,
    ) -> Result<MessageRef, ChatClientError> {
        let request = self
            .request(Method::POST, &["channels", channel.0.as_str(), "messages"])?
            .json(&MessageBody::from(message));
        let response = self.send(request).await?;
        let posted: PostedMessage =
            response.json().await.map_err(|error| ChatClientError::Decode(error.to_string()))?;

        debug!(channel_id = %channel, message_id = %posted.id, "chat message posted");
        Ok(MessageRef { channel_id: channel.clone(), message_id: MessageId(posted.id) })
    }

    async fn edit_message(
        &self,
        message: &MessageRef,
        update: &MessageTemplate,
    ) -> Result<(), ChatClientError> {
        let request = self
            .request(Method::PATCH, &message_path(message))?
            .json(&MessageBody::from(update));
        self.send(request).await?;
        Ok(())
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), ChatClientError> {
        self.send(self.request(Method::DELETE, &message_path(message))?).await?;
        Ok(())
    }

    async fn add_reactions(
        &self,
        message: &MessageRef,
        symbols: &[&str],
    ) -> Result<(), ChatClientError> {
        for symbol in symbols {
            let mut segments = message_path(message);
            segments.extend(["reactions", *symbol, "@me"]);
            self.send(self.request(Method::PUT, &segments)?).await?;
        }
        Ok(())
    }

    async fn remove_reaction(
        &self,
        message: &MessageRef,
        symbol: &str,
        user: &UserId,
    ) -> Result<(), ChatClientError> {
        let mut segments = message_path(message);
        segments.extend(["reactions", symbol, user.0.as_str()]);
        self.send(self.request(Method::DELETE, &segments)?).await?;
        Ok(())
    }

    async fn fetch_user(&self, user: &UserId) -> Result<ChatUser, ChatClientError> {
        self.fetch(&["users", user.0.as_str()]).await
    }

    async fn current_user(&self) -> Result<ChatUser, ChatClientError> {
        self.fetch(&["users", "@me"]).await
    }
}

fn message_path(message: &MessageRef) -> Vec<&str> {
    vec!["channels", message.channel_id.0.as_str(), "messages", message.message_id.0.as_str()]
}

fn api_url(base_url: &str, segments: &[&str]) -> Result<Url, ChatClientError> {
    let mut url = Url::parse(base_url)
        .map_err(|error| ChatClientError::Request(format!("invalid chat base url: {error}")))?;
    {
        let mut path = url.path_segments_mut().map_err(|()| {
            ChatClientError::Request("chat base url cannot carry a path".to_owned())
        })?;
        path.pop_if_empty().extend(segments);
    }
    Ok(url)
}

async fn accept(response: Response) -> Result<Response, ChatClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::NOT_FOUND {
        return Err(ChatClientError::NotFound(message));
    }
    Err(ChatClientError::Rejected { status: status.as_u16(), message })
}

#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    embeds: Vec<&'a Embed>,
}

impl<'a> From<&'a MessageTemplate> for MessageBody<'a> {
    fn from(template: &'a MessageTemplate) -> Self {
        Self { content: template.content.as_deref(), embeds: template.embed.iter().collect() }
    }
}

#[derive(Debug, Deserialize)]
struct PostedMessage {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
    #[serde(default)]
    bot: bool,
}

impl From<WireUser> for ChatUser {
    fn from(user: WireUser) -> Self {
        let display_name = user.global_name.filter(|name| !name.is_empty()).unwrap_or(user.username);
        Self { id: UserId(user.id), display_name, bot: user.bot }
    }
}

#[cfg(test)]
mod tests {
    use fern_chat::blocks::{self, MessageTemplate};
    use fern_chat::ChatUser;
    use fern_core::{MessageRef, UserId};
    use serde_json::json;

    use super::{api_url, message_path, MessageBody, WireUser};

    #[test]
    fn reaction_urls_percent_encode_the_emoji() {
        let message = MessageRef::new("C1", "M9");
        let mut segments = message_path(&message);
        segments.extend(["reactions", "✅", "@me"]);

        let url = api_url("https://discord.com/api/v10", &segments).expect("url");
        assert_eq!(
            url.as_str(),
            "https://discord.com/api/v10/channels/C1/messages/M9/reactions/%E2%9C%85/@me"
        );
    }

    #[test]
    fn text_messages_send_no_embeds() {
        let body = serde_json::to_value(MessageBody::from(&MessageTemplate::text("hi")))
            .expect("encode");
        assert_eq!(body, json!({ "content": "hi", "embeds": [] }));
    }

    #[test]
    fn embed_messages_carry_a_single_embed() {
        let template = blocks::task_list_message(
            &UserId("U1".to_owned()),
            "Ada",
            &["buy milk".to_owned()],
            None,
        );
        let body = serde_json::to_value(MessageBody::from(&template)).expect("encode");

        assert_eq!(body["content"], "<@U1>, here are your tasks:");
        assert_eq!(body["embeds"][0]["title"], "Ada's Task List");
        assert_eq!(body["embeds"][0]["fields"][0]["value"], "buy milk");
    }

    #[test]
    fn display_name_prefers_global_name() {
        let user: WireUser = serde_json::from_value(json!({
            "id": "U1", "username": "ada", "global_name": "Ada Lovelace"
        }))
        .expect("decode");
        assert_eq!(
            ChatUser::from(user),
            ChatUser {
                id: UserId("U1".to_owned()),
                display_name: "Ada Lovelace".to_owned(),
                bot: false
            }
        );

        let bot: WireUser =
            serde_json::from_value(json!({ "id": "B1", "username": "fern", "bot": true }))
                .expect("decode");
        let bot = ChatUser::from(bot);
        assert_eq!(bot.display_name, "fern");
        assert!(bot.bot);
    }
}
