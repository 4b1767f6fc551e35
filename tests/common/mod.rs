//! In-memory host and media server for router tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use parking_lot::Mutex;
use secrecy::Secret;
use serde_json::Value;
use tower::ServiceExt;

use voicematters::api;
use voicematters::config::{Config, DEFAULT_PLUGIN_ID};
use voicematters::host::{
    Bot, Channel, ChannelMember, Command, HostApi, HostError, HostResult, Post, User,
};
use voicematters::livekit::{CreateRoom, Room, RoomError, RoomService};
use voicematters::settings::Settings;
use voicematters::state::AppState;
use voicematters::store::ConfigStore;

pub const API_KEY: &str = "APIkeyForTests";
pub const API_SECRET: &str = "secretForTests";
pub const BOT_ID: &str = "bot-user";

pub fn prefix() -> String {
    format!("/plugins/{}", DEFAULT_PLUGIN_ID)
}

#[derive(Default)]
pub struct FakeHost {
    pub posts: Mutex<HashMap<String, Post>>,
    pub updated_posts: Mutex<Vec<Post>>,
    pub channels: Mutex<HashMap<String, Channel>>,
    pub members: Mutex<HashSet<(String, String)>>,
    pub users: Mutex<HashMap<String, User>>,
    pub plugin_config: Mutex<Value>,
    pub profile_images: Mutex<Vec<(String, Vec<u8>)>>,
    pub commands: Mutex<Vec<Command>>,
    pub bots: Mutex<Vec<Bot>>,
    /// Owner of the client's token; an admin when unset.
    pub me: Mutex<Option<User>>,
    next_id: Mutex<u32>,
}

impl FakeHost {
    pub fn add_channel(&self, channel_id: &str, members: &[&str]) {
        self.channels.lock().insert(
            channel_id.to_string(),
            Channel {
                id: channel_id.to_string(),
                team_id: "team".to_string(),
                name: channel_id.to_string(),
                display_name: channel_id.to_string(),
            },
        );
        let mut all = self.members.lock();
        for user in members {
            all.insert((channel_id.to_string(), user.to_string()));
        }
    }

    pub fn add_user(&self, user_id: &str, first: &str, last: &str) {
        self.users.lock().insert(
            user_id.to_string(),
            User {
                id: user_id.to_string(),
                username: user_id.to_string(),
                first_name: first.to_string(),
                last_name: last.to_string(),
                ..User::default()
            },
        );
    }

    pub fn insert_post(&self, post: Post) {
        self.posts.lock().insert(post.id.clone(), post);
    }

    pub fn post(&self, post_id: &str) -> Option<Post> {
        self.posts.lock().get(post_id).cloned()
    }

    pub fn posts_in(&self, channel_id: &str) -> Vec<Post> {
        self.posts
            .lock()
            .values()
            .filter(|p| p.channel_id == channel_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl HostApi for FakeHost {
    async fn get_post(&self, post_id: &str) -> HostResult<Post> {
        self.post(post_id)
            .ok_or_else(|| HostError::not_found(format!("post {} not found", post_id)))
    }

    async fn create_post(&self, post: &Post) -> HostResult<Post> {
        let mut next = self.next_id.lock();
        *next += 1;
        let created = Post {
            id: format!("post-{}", *next),
            ..post.clone()
        };
        self.insert_post(created.clone());
        Ok(created)
    }

    async fn update_post(&self, post: &Post) -> HostResult<Post> {
        if self.post(&post.id).is_none() {
            return Err(HostError::not_found("post not found"));
        }
        self.insert_post(post.clone());
        self.updated_posts.lock().push(post.clone());
        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: &str) -> HostResult<()> {
        self.posts
            .lock()
            .remove(post_id)
            .map(|_| ())
            .ok_or_else(|| HostError::not_found("post not found"))
    }

    async fn get_channel(&self, channel_id: &str) -> HostResult<Channel> {
        self.channels
            .lock()
            .get(channel_id)
            .cloned()
            .ok_or_else(|| HostError::not_found(format!("channel {} not found", channel_id)))
    }

    async fn get_channel_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> HostResult<ChannelMember> {
        if self
            .members
            .lock()
            .contains(&(channel_id.to_string(), user_id.to_string()))
        {
            Ok(ChannelMember {
                channel_id: channel_id.to_string(),
                user_id: user_id.to_string(),
            })
        } else {
            Err(HostError::not_found("No channel member found"))
        }
    }

    async fn get_user(&self, user_id: &str) -> HostResult<User> {
        self.users
            .lock()
            .get(user_id)
            .cloned()
            .ok_or_else(|| HostError::not_found("user not found"))
    }

    async fn get_user_by_username(&self, username: &str) -> HostResult<User> {
        self.users
            .lock()
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| HostError::not_found("user not found"))
    }

    async fn get_me(&self) -> HostResult<User> {
        Ok(self.me.lock().clone().unwrap_or_else(|| User {
            id: "admin".to_string(),
            username: "admin".to_string(),
            ..User::default()
        }))
    }

    async fn create_bot(&self, bot: &Bot) -> HostResult<Bot> {
        let created = Bot {
            user_id: BOT_ID.to_string(),
            ..bot.clone()
        };
        self.bots.lock().push(created.clone());
        self.users.lock().insert(
            BOT_ID.to_string(),
            User {
                id: BOT_ID.to_string(),
                username: bot.username.clone(),
                is_bot: true,
                ..User::default()
            },
        );
        Ok(created)
    }

    async fn set_profile_image(&self, user_id: &str, image: Vec<u8>) -> HostResult<()> {
        self.profile_images.lock().push((user_id.to_string(), image));
        Ok(())
    }

    async fn register_command(&self, command: &Command) -> HostResult<()> {
        self.commands.lock().push(command.clone());
        Ok(())
    }

    async fn load_plugin_configuration(&self) -> HostResult<Value> {
        Ok(self.plugin_config.lock().clone())
    }
}

/// Media server double that records the order of calls.
#[derive(Default)]
pub struct FakeRooms {
    pub rooms: Mutex<Vec<Room>>,
    pub calls: Mutex<Vec<String>>,
    pub unavailable: Mutex<bool>,
}

impl FakeRooms {
    pub fn add_room(&self, name: &str) {
        self.rooms.lock().push(Room {
            sid: format!("RM_{}", name),
            name: name.to_string(),
            ..Room::default()
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn check(&self) -> Result<(), RoomError> {
        if *self.unavailable.lock() {
            return Err(RoomError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RoomService for FakeRooms {
    async fn list_rooms(&self, names: &[String]) -> Result<Vec<Room>, RoomError> {
        self.calls.lock().push(format!("list:{}", names.join(",")));
        self.check()?;
        Ok(self
            .rooms
            .lock()
            .iter()
            .filter(|r| names.is_empty() || names.contains(&r.name))
            .cloned()
            .collect())
    }

    async fn create_room(&self, request: CreateRoom) -> Result<Room, RoomError> {
        self.calls.lock().push(format!("create:{}", request.name));
        self.check()?;
        let room = Room {
            sid: format!("RM_{}", request.name),
            name: request.name,
            empty_timeout: request.empty_timeout,
            max_participants: request.max_participants,
            metadata: request.metadata,
            ..Room::default()
        };
        self.rooms.lock().push(room.clone());
        Ok(room)
    }

    async fn delete_room(&self, name: &str) -> Result<(), RoomError> {
        self.calls.lock().push(format!("delete:{}", name));
        self.check()?;
        let mut rooms = self.rooms.lock();
        let before = rooms.len();
        rooms.retain(|r| r.name != name);
        if rooms.len() == before {
            return Err(RoomError::NotFound(name.to_string()));
        }
        Ok(())
    }
}

pub fn test_config(bundle_path: PathBuf) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        mattermost_url: "http://mattermost.invalid".to_string(),
        mattermost_token: "token".to_string(),
        plugin_id: DEFAULT_PLUGIN_ID.to_string(),
        bundle_path,
        public_url: None,
        team_id: None,
        command_token: None,
        proxy_secret: None,
        request_timeout_seconds: 5,
    }
}

pub fn test_settings() -> Settings {
    Settings {
        secure: true,
        host: "livekit.example.com".to_string(),
        port: 7880,
        turn_host: "turn.example.com".to_string(),
        turn_port: 5349,
        api_key: Secret::new(API_KEY.to_string()),
        api_secret: Secret::new(API_SECRET.to_string()),
        ..Settings::default()
    }
}

pub struct TestApp {
    pub host: Arc<FakeHost>,
    pub rooms: Arc<FakeRooms>,
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config(PathBuf::from(".")))
    }

    pub fn with_config(config: Config) -> Self {
        let host = Arc::new(FakeHost::default());
        let rooms = Arc::new(FakeRooms::default());
        let state = AppState::new(
            config,
            ConfigStore::new(test_settings()),
            host.clone(),
            rooms.clone(),
        );
        state.set_bot_user_id(Some(BOT_ID.to_string()));
        let router = api::create_router(state.clone());

        Self {
            host,
            rooms,
            state,
            router,
        }
    }

    /// Send a request to a plugin route, optionally as `user`.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        user: Option<&str>,
        body: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{}{}", prefix(), path));
        if let Some(user) = user {
            builder = builder.header(api::USER_ID_HEADER, user);
        }
        let request = builder
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .expect("request");

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }
}
