use async_trait::async_trait;
use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::models::{Bot, Channel, ChannelMember, Command, Post, User};
use super::{HostApi, HostError, HostResult};

/// Where the server should deliver slash-command callbacks.
#[derive(Debug, Clone)]
pub struct CommandTarget {
    pub team_id: String,
    pub url: String,
}

/// [`HostApi`] over the Mattermost REST API v4, authenticated with a bot or
/// personal access token.
#[derive(Clone)]
pub struct MattermostClient {
    client: Client,
    base_url: String,
    token: String,
    plugin_id: String,
    command_target: Option<CommandTarget>,
}

#[derive(Serialize)]
struct CommandRegistration<'a> {
    team_id: &'a str,
    method: &'static str,
    url: &'a str,
    #[serde(flatten)]
    command: &'a Command,
}

#[derive(Deserialize)]
struct RegisteredCommand {
    trigger: String,
    #[serde(default)]
    delete_at: i64,
}

impl MattermostClient {
    pub fn new(client: Client, base_url: &str, token: &str, plugin_id: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            plugin_id: plugin_id.to_string(),
            command_target: None,
        }
    }

    pub fn with_command_target(mut self, target: CommandTarget) -> Self {
        self.command_target = Some(target);
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/api/v4{}", self.base_url, path))
            .bearer_auth(&self.token)
    }

    async fn send(&self, request: RequestBuilder) -> HostResult<Response> {
        let res = request
            .send()
            .await
            .map_err(|e| HostError::new(502, format!("Mattermost unreachable: {}", e)))?;

        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        Err(serde_json::from_str::<HostError>(&body)
            .map(|mut err| {
                err.status_code = status.as_u16();
                err
            })
            .unwrap_or_else(|_| HostError::new(status.as_u16(), body)))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> HostResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| HostError::new(502, format!("Invalid Mattermost response: {}", e)))
    }
}

#[async_trait]
impl HostApi for MattermostClient {
    async fn get_post(&self, post_id: &str) -> HostResult<Post> {
        self.send_json(self.request(Method::GET, &format!("/posts/{}", post_id)))
            .await
    }

    async fn create_post(&self, post: &Post) -> HostResult<Post> {
        self.send_json(self.request(Method::POST, "/posts").json(post))
            .await
    }

    async fn update_post(&self, post: &Post) -> HostResult<Post> {
        self.send_json(
            self.request(Method::PUT, &format!("/posts/{}", post.id))
                .json(post),
        )
        .await
    }

    async fn delete_post(&self, post_id: &str) -> HostResult<()> {
        self.send(self.request(Method::DELETE, &format!("/posts/{}", post_id)))
            .await?;
        Ok(())
    }

    async fn get_channel(&self, channel_id: &str) -> HostResult<Channel> {
        self.send_json(self.request(Method::GET, &format!("/channels/{}", channel_id)))
            .await
    }

    async fn get_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> HostResult<ChannelMember> {
        self.send_json(self.request(
            Method::GET,
            &format!("/channels/{}/members/{}", channel_id, user_id),
        ))
        .await
    }

    async fn get_user(&self, user_id: &str) -> HostResult<User> {
        self.send_json(self.request(Method::GET, &format!("/users/{}", user_id)))
            .await
    }

    async fn get_user_by_username(&self, username: &str) -> HostResult<User> {
        self.send_json(self.request(Method::GET, &format!("/users/username/{}", username)))
            .await
    }

    async fn get_me(&self) -> HostResult<User> {
        self.send_json(self.request(Method::GET, "/users/me")).await
    }

    async fn create_bot(&self, bot: &Bot) -> HostResult<Bot> {
        self.send_json(self.request(Method::POST, "/bots").json(bot))
            .await
    }

    async fn set_profile_image(&self, user_id: &str, image: Vec<u8>) -> HostResult<()> {
        let part = multipart::Part::bytes(image)
            .file_name("bot-icon.png")
            .mime_str("image/png")
            .map_err(|e| HostError::new(400, e.to_string()))?;
        let form = multipart::Form::new().part("image", part);

        self.send(
            self.request(Method::POST, &format!("/users/{}/image", user_id))
                .multipart(form),
        )
        .await?;
        Ok(())
    }

    async fn register_command(&self, command: &Command) -> HostResult<()> {
        let target = self.command_target.as_ref().ok_or_else(|| {
            HostError::new(400, "no team configured for slash command registration")
        })?;

        let existing: Vec<RegisteredCommand> = self
            .send_json(
                self.request(Method::GET, "/commands")
                    .query(&[("team_id", target.team_id.as_str()), ("custom_only", "true")]),
            )
            .await?;
        if existing
            .iter()
            .any(|c| c.trigger == command.trigger && c.delete_at == 0)
        {
            tracing::info!(trigger = %command.trigger, "slash command already registered");
            return Ok(());
        }

        let registration = CommandRegistration {
            team_id: &target.team_id,
            method: "P",
            url: &target.url,
            command,
        };
        self.send(self.request(Method::POST, "/commands").json(&registration))
            .await?;
        Ok(())
    }

    async fn load_plugin_configuration(&self) -> HostResult<Value> {
        let config: Value = self.send_json(self.request(Method::GET, "/config")).await?;
        Ok(config
            .pointer(&format!("/PluginSettings/Plugins/{}", self.plugin_id))
            .cloned()
            .unwrap_or(Value::Null))
    }
}
