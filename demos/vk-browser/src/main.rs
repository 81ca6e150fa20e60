//! VK Browser Demo
//!
//! A small video add-on in the shape of a VK client, running against an
//! in-memory stub API. Directory items are printed instead of being handed
//! to Kodi.
//!
//! # Routes
//!
//! ```text
//! (root)   index    → "Friends", "My albums"
//! friends  offset   → one folder per friend, plus a "Next page" link
//! albums   owner_id → the user's albums (user 4 hides them)
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package vk-browser
//! cargo run --package vk-browser -- plugin://plugin.video.vk/ 1 '?r=friends&offset=3'
//! cargo run --package vk-browser -- plugin://plugin.video.vk/ 1 '?r=albums&owner_id=4'
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use kodi_useful::core::ErrorClass;
use kodi_useful::prelude::*;
use kodi_useful::router::RouterResult;
use kodi_useful::runtime::AddonConfig;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

// ============================================================================
// Stub API
// ============================================================================

const VK_API: ErrorKind = ErrorKind::new("vk.api");
const VK_AUTH: ErrorKind = ErrorKind::new("vk.auth");
const VK_ACCESS_DENIED: ErrorKind = ErrorKind::new("vk.access_denied");

/// The signed-in user.
const ME: i64 = 1;

#[derive(Debug, Error)]
enum ApiError {
    #[error("access token is not configured")]
    NoToken,
    #[error("user {0} hides their albums")]
    AccessDenied(i64),
    #[error("user {0} does not exist")]
    UnknownUser(i64),
}

impl ErrorClass for ApiError {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Self::NoToken => VK_AUTH,
            Self::AccessDenied(_) => VK_ACCESS_DENIED,
            Self::UnknownUser(_) => VK_API,
        }
    }
}

struct User {
    id: i64,
    name: &'static str,
    private: bool,
}

struct StubApi {
    users: Vec<User>,
}

impl StubApi {
    fn new() -> Self {
        let users = [
            (1, "Me", false),
            (2, "Anna", false),
            (3, "Boris", false),
            (4, "Vera", true),
            (5, "Gleb", false),
            (6, "Daria", false),
            (7, "Egor", false),
        ]
        .into_iter()
        .map(|(id, name, private)| User { id, name, private })
        .collect();
        Self { users }
    }

    fn friends(&self, token: &str, offset: usize, count: usize) -> Result<(Vec<&User>, usize), ApiError> {
        if token.is_empty() {
            return Err(ApiError::NoToken);
        }
        let friends: Vec<&User> = self.users.iter().filter(|u| u.id != ME).collect();
        let total = friends.len();
        let page = friends.into_iter().skip(offset).take(count).collect();
        Ok((page, total))
    }

    fn albums(&self, owner_id: i64) -> Result<Vec<String>, ApiError> {
        let user = self
            .users
            .iter()
            .find(|u| u.id == owner_id)
            .ok_or(ApiError::UnknownUser(owner_id))?;
        if user.private {
            return Err(ApiError::AccessDenied(owner_id));
        }
        Ok((1..=3)
            .map(|n| format!("{}'s album #{n}", user.name))
            .collect())
    }
}

// ============================================================================
// Add-on Context
// ============================================================================

struct VkAddon {
    api: StubApi,
}

impl VkAddon {
    fn new() -> Self {
        Self { api: StubApi::new() }
    }

    fn add_folder(&self, title: &str, url: &str) {
        println!("[folder] {title:<24} {url}");
    }

    fn add_item(&self, title: &str) {
        println!("[item]   {title}");
    }

    fn notify(&self, message: &str) {
        println!("[notice] {message}");
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

fn index(addon: Arc<VkAddon>, nav: Navigator<VkAddon>) -> HandlerResult {
    addon.add_folder("Friends", &nav.url_for("friends", &UrlArgs::new())?);
    addon.add_folder(
        "My albums",
        &nav.url_for(Target::handler(&albums), &UrlArgs::new().arg("owner_id", ME))?,
    );
    Ok(())
}

fn friends(
    addon: Arc<VkAddon>,
    token: String,
    offset: usize,
    per_page: usize,
    nav: Navigator<VkAddon>,
) -> HandlerResult {
    let (page, total) = addon
        .api
        .friends(&token, offset, per_page)
        .map_err(HandlerError::classified)?;

    for user in page {
        let url = nav.url_for(Target::handler(&albums), &UrlArgs::new().arg("owner_id", user.id))?;
        addon.add_folder(user.name, &url);
    }

    if offset + per_page < total {
        let next = nav.url_from_current(&UrlArgs::new().arg("offset", offset + per_page));
        addon.add_folder("Next page", &next);
    }
    Ok(())
}

fn albums(addon: Arc<VkAddon>, owner_id: i64, offset: usize) -> HandlerResult {
    let titles = addon.api.albums(owner_id).map_err(HandlerError::classified)?;
    for title in titles.iter().skip(offset) {
        addon.add_item(title);
    }
    Ok(())
}

fn dispatcher() -> RouterResult<Dispatcher<VkAddon>> {
    Ok(Dispatcher::new()
        .error_kind(VK_API, ErrorKind::ANY)?
        .error_kind(VK_AUTH, VK_API)?
        .error_kind(VK_ACCESS_DENIED, VK_API)?
        .root(index, [Param::context("addon"), Param::context("nav")])?
        .route_named(
            "friends",
            friends,
            [
                Param::context("addon"),
                Param::settings("token").ty(ParamType::Str).lookup("access_token"),
                Param::query("offset").ty(ParamType::Int).default(0),
                Param::settings("per_page")
                    .ty(ParamType::Int)
                    .lookup("items_per_page")
                    .default(20),
                Param::context("nav"),
            ],
        )?
        .route_named(
            "albums",
            albums,
            [
                Param::context("addon"),
                Param::query("owner_id").ty(ParamType::Int),
                Param::query("offset").ty(ParamType::Int).default(0),
            ],
        )?
        .error_handler(VK_ACCESS_DENIED, |err, _dispatcher, request| {
            request.context().notify(&format!("Nothing to show: {}", err.message()));
            Ok(())
        })
        .error_handler(VK_AUTH, |_err, _dispatcher, request| {
            request
                .context()
                .notify("Sign in first: set the access token in the add-on settings");
            Ok(())
        })
        .error_handler(VK_API, |err, _dispatcher, request| {
            warn!(kind = %err.kind(), "API call failed");
            request.context().notify(&format!("VK error: {}", err.message()));
            Ok(())
        })
        .error_handler(ErrorKind::MISSING_PARAMETER, |err, dispatcher, _request| {
            warn!(error = %err, root = ?dispatcher.routes().root().map(|r| r.name()), "Malformed link");
            Ok(())
        }))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "vk-browser", about = "Demo VK browser add-on")]
struct Cli {
    /// Configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(long)]
    profile: Option<String>,

    /// Plugin arguments as Kodi passes them: base URL, handle, query.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    argv: Vec<String>,
}

fn default_config() -> AddonConfig {
    let mut config = AddonConfig::default();
    config.addon.id = "plugin.video.vk".into();
    config.settings.insert("items_per_page".into(), json!(3));
    config.settings.insert("access_token".into(), json!("demo-token"));
    config
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = RuntimeBuilder::new().defaults(default_config());
    if let Some(path) = &cli.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &cli.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build(dispatcher()?, VkAddon::new())?;

    let invocation = if cli.argv.is_empty() {
        Invocation::from_url(runtime.dispatcher().base_url())
    } else {
        Invocation::from_args(&cli.argv)?
    };

    let outcome = runtime.run(&invocation)?;
    info!(?outcome, "Done");

    Ok(())
}
