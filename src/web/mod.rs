//! HTML pages and JSON endpoints served with warp.

mod handlers;
mod templates;

use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use tera::Tera;
use warp::{Filter, Rejection, Reply};

use crate::App;

pub const SESSION_COOKIE: &str = "session";

const FORM_LIMIT: u64 = 16 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not render template")]
    RenderTemplate(#[source] tera::Error),

    #[error(transparent)]
    Tournament(#[from] crate::Error),
}

/// Everything a handler needs.
#[derive(Clone)]
pub struct Site {
    app: Arc<App>,
    templates: Arc<Tera>,
}

/// All routes, with rejections turned into plain status replies.
pub fn routes(
    app: Arc<App>,
) -> Result<impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone, tera::Error> {
    let site = Site {
        app,
        templates: Arc::new(templates::load()?),
    };

    Ok(pages(site.clone()).or(api(site)).recover(handlers::recover))
}

fn with_site(site: Site) -> impl Filter<Extract = (Site,), Error = Infallible> + Clone {
    warp::any().map(move || site.clone())
}

fn session() -> impl Filter<Extract = (Option<String>,), Error = Infallible> + Clone {
    warp::cookie::optional(SESSION_COOKIE)
}

fn form<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(FORM_LIMIT).and(warp::body::form())
}

fn pages(site: Site) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    // GET /
    let index = warp::path::end()
        .and(warp::get())
        .and(with_site(site.clone()))
        .and(session())
        .and_then(handlers::index);

    // POST /register
    let register = warp::path!("register")
        .and(warp::post())
        .and(with_site(site.clone()))
        .and(form())
        .and_then(handlers::register);

    // POST /login
    let login = warp::path!("login")
        .and(warp::post())
        .and(with_site(site.clone()))
        .and(form())
        .and_then(handlers::login);

    // POST /logout
    let logout = warp::path!("logout")
        .and(warp::post())
        .and(with_site(site.clone()))
        .and(session())
        .and_then(handlers::logout);

    // GET /catches/new
    let new_catch = warp::path!("catches" / "new")
        .and(warp::get())
        .and(with_site(site.clone()))
        .and(session())
        .and_then(handlers::new_catch);

    // POST /catches
    let submit_catch = warp::path!("catches")
        .and(warp::post())
        .and(with_site(site.clone()))
        .and(session())
        .and(form())
        .and_then(handlers::submit_catch);

    // GET /leaderboard?division=Pelagic
    let leaderboard = warp::path!("leaderboard")
        .and(warp::get())
        .and(with_site(site.clone()))
        .and(session())
        .and(warp::query::<handlers::LeaderboardQuery>())
        .and_then(handlers::leaderboard);

    // GET /feed
    let feed = warp::path!("feed")
        .and(warp::get())
        .and(with_site(site.clone()))
        .and(session())
        .and_then(handlers::feed);

    // POST /feed
    let create_post = warp::path!("feed")
        .and(warp::post())
        .and(with_site(site.clone()))
        .and(session())
        .and(form())
        .and_then(handlers::create_post);

    // POST /feed/:id/like
    let like_post = warp::path!("feed" / i64 / "like")
        .and(warp::post())
        .and(with_site(site.clone()))
        .and(session())
        .and_then(handlers::like_post);

    // GET /admin
    let admin = warp::path!("admin")
        .and(warp::get())
        .and(with_site(site.clone()))
        .and(session())
        .and_then(handlers::admin);

    // POST /admin/role
    let assign_role = warp::path!("admin" / "role")
        .and(warp::post())
        .and(with_site(site))
        .and(session())
        .and(form())
        .and_then(handlers::assign_role);

    index
        .or(register)
        .or(login)
        .or(logout)
        .or(new_catch)
        .or(submit_catch)
        .or(leaderboard)
        .or(feed)
        .or(create_post)
        .or(like_post)
        .or(admin)
        .or(assign_role)
}

fn api(site: Site) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    // GET /api/leaderboard/:division
    let leaderboard = warp::path!("api" / "leaderboard" / String)
        .and(warp::get())
        .and(with_site(site.clone()))
        .and_then(handlers::api_leaderboard);

    // GET /api/feed?limit=20
    let feed = warp::path!("api" / "feed")
        .and(warp::get())
        .and(with_site(site))
        .and(warp::query::<handlers::FeedQuery>())
        .and_then(handlers::api_feed);

    leaderboard.or(feed)
}
