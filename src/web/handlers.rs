use std::{convert::Infallible, time::Duration};

use log::{debug, error};
use secrecy::SecretString;
use serde::Deserialize;
use tera::Context;
use warp::{
    http::{StatusCode, Uri},
    Rejection, Reply,
};

use super::{Error, Site, SESSION_COOKIE};
use crate::models::{Division, Identity, Role};

type Response = Box<dyn Reply>;

#[derive(Deserialize)]
pub struct RegisterForm {
    username: String,
    password: SecretString,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    username: String,
    password: SecretString,
}

#[derive(Deserialize)]
pub struct CatchForm {
    division: String,
    #[serde(default)]
    species: String,
    weight: String,
    #[serde(default)]
    evidence_ref: Option<String>,
}

#[derive(Deserialize)]
pub struct PostForm {
    #[serde(default)]
    content: String,
    #[serde(default)]
    media_ref: Option<String>,
}

#[derive(Deserialize)]
pub struct RoleForm {
    username: String,
    role: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LeaderboardQuery {
    division: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct FeedQuery {
    limit: Option<usize>,
}

/// Logs failures and answers them with a bare 500.
fn respond(what: &str, result: Result<Response, Error>) -> Result<Response, Infallible> {
    Ok(result.unwrap_or_else(|err| {
        error!("Could not render {what}: {err:?}");
        Box::new(warp::reply::with_status(
            warp::reply(),
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    }))
}

fn page_context(viewer: Option<&Identity>) -> Context {
    let mut context = Context::new();
    context.insert("viewer", &viewer);
    context
}

fn render(
    site: &Site,
    template: &str,
    context: &Context,
    status: StatusCode,
) -> Result<Response, Error> {
    let html = site
        .templates
        .render(template, context)
        .map_err(Error::RenderTemplate)?;

    Ok(Box::new(warp::reply::with_status(
        warp::reply::html(html),
        status,
    )))
}

/// Puts a caller mistake on the page and picks its status.
///
/// Infrastructure errors are passed on untouched.
fn show_error(err: crate::Error, context: &mut Context) -> Result<StatusCode, Error> {
    let status = match &err {
        crate::Error::AlreadyExists(_) => StatusCode::CONFLICT,
        crate::Error::InvalidCredentials => StatusCode::UNAUTHORIZED,
        crate::Error::Validation(_) => StatusCode::BAD_REQUEST,
        crate::Error::NotFound(_) => StatusCode::NOT_FOUND,
        crate::Error::Forbidden => StatusCode::FORBIDDEN,
        _ => return Err(err.into()),
    };

    debug!("Showing {status}: {err}");
    context.insert("error", &err.to_string());
    Ok(status)
}

fn redirect(location: &'static str) -> impl Reply {
    warp::redirect::see_other(Uri::from_static(location))
}

fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        ttl.as_secs()
    )
}

async fn viewer(site: &Site, session: Option<String>) -> Result<Option<Identity>, Error> {
    Ok(site.app.identity.identify(session.as_deref()).await?)
}

fn login_required(site: &Site) -> Result<Response, Error> {
    let mut context = page_context(None);
    context.insert("error", "Log in first");
    render(site, "index.html", &context, StatusCode::UNAUTHORIZED)
}

fn registration_role(raw: Option<&str>) -> Result<Role, crate::Error> {
    match raw.unwrap_or_default().trim() {
        "" => Ok(Role::Angler),
        raw => match raw.parse()? {
            Role::Admin => Err(crate::Error::validation(
                "Admins are appointed, not registered",
            )),
            role => Ok(role),
        },
    }
}

// GET /
async fn index_page(site: &Site, session: Option<String>) -> Result<Response, Error> {
    let viewer = viewer(site, session).await?;
    render(
        site,
        "index.html",
        &page_context(viewer.as_ref()),
        StatusCode::OK,
    )
}

pub async fn index(site: Site, session: Option<String>) -> Result<Response, Infallible> {
    respond("index", index_page(&site, session).await)
}

// POST /register
async fn register_page(site: &Site, form: RegisterForm) -> Result<Response, Error> {
    let result = match registration_role(form.role.as_deref()) {
        Ok(role) => {
            site.app
                .identity
                .register(&form.username, &form.password, role)
                .await
        }
        Err(err) => Err(err),
    };

    let mut context = page_context(None);
    let status = match result {
        Ok(user) => {
            context.insert(
                "message",
                &format!("Registered {}, you can log in now", user.username),
            );
            StatusCode::CREATED
        }
        Err(err) => show_error(err, &mut context)?,
    };

    render(site, "index.html", &context, status)
}

pub async fn register(site: Site, form: RegisterForm) -> Result<Response, Infallible> {
    respond("registration", register_page(&site, form).await)
}

// POST /login
async fn login_page(site: &Site, form: LoginForm) -> Result<Response, Error> {
    match site
        .app
        .identity
        .start_session(&form.username, &form.password)
        .await
    {
        Ok((token, _)) => {
            let ttl = site.app.identity.sessions().ttl();
            Ok(Box::new(warp::reply::with_header(
                redirect("/"),
                "set-cookie",
                session_cookie(&token, ttl),
            )))
        }
        Err(err) => {
            let mut context = page_context(None);
            let status = show_error(err, &mut context)?;
            render(site, "index.html", &context, status)
        }
    }
}

pub async fn login(site: Site, form: LoginForm) -> Result<Response, Infallible> {
    respond("login", login_page(&site, form).await)
}

// POST /logout
pub async fn logout(site: Site, session: Option<String>) -> Result<Response, Infallible> {
    if let Some(token) = session {
        site.app.identity.logout(&token).await;
    }

    Ok(Box::new(warp::reply::with_header(
        redirect("/"),
        "set-cookie",
        format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"),
    )))
}

// GET /catches/new
async fn new_catch_page(site: &Site, session: Option<String>) -> Result<Response, Error> {
    let Some(viewer) = viewer(site, session).await? else {
        return login_required(site);
    };

    let mut context = page_context(Some(&viewer));
    context.insert("divisions", &Division::ALL.map(Division::as_str));
    render(site, "catch_form.html", &context, StatusCode::OK)
}

pub async fn new_catch(site: Site, session: Option<String>) -> Result<Response, Infallible> {
    respond("catch form", new_catch_page(&site, session).await)
}

// POST /catches
async fn submit_catch_page(
    site: &Site,
    session: Option<String>,
    form: CatchForm,
) -> Result<Response, Error> {
    let Some(viewer) = viewer(site, session).await? else {
        return login_required(site);
    };

    let result = match form.weight.trim().parse::<f64>() {
        Ok(weight) => {
            site.app
                .catches
                .submit(
                    &viewer.username,
                    &form.division,
                    &form.species,
                    weight,
                    form.evidence_ref,
                )
                .await
        }
        Err(_) => Err(crate::Error::validation("Weight must be a number")),
    };

    let mut context = page_context(Some(&viewer));
    context.insert("divisions", &Division::ALL.map(Division::as_str));
    let status = match result {
        Ok(record) => {
            context.insert(
                "message",
                &format!("Submitted your {} to {}", record.species, record.division),
            );
            StatusCode::CREATED
        }
        Err(err) => show_error(err, &mut context)?,
    };

    render(site, "catch_form.html", &context, status)
}

pub async fn submit_catch(
    site: Site,
    session: Option<String>,
    form: CatchForm,
) -> Result<Response, Infallible> {
    respond("catch submission", submit_catch_page(&site, session, form).await)
}

// GET /leaderboard
async fn leaderboard_page(
    site: &Site,
    session: Option<String>,
    query: LeaderboardQuery,
) -> Result<Response, Error> {
    let viewer = viewer(site, session).await?;
    let division = query
        .division
        .unwrap_or_else(|| Division::Pelagic.to_string());
    let entries = site.app.leaderboard(&division).await?;

    let mut context = page_context(viewer.as_ref());
    context.insert("division", &division);
    context.insert("divisions", &Division::ALL.map(Division::as_str));
    context.insert("entries", &entries);
    render(site, "leaderboard.html", &context, StatusCode::OK)
}

pub async fn leaderboard(
    site: Site,
    session: Option<String>,
    query: LeaderboardQuery,
) -> Result<Response, Infallible> {
    respond("leaderboard", leaderboard_page(&site, session, query).await)
}

async fn feed_view(
    site: &Site,
    mut context: Context,
    status: StatusCode,
) -> Result<Response, Error> {
    let posts = site.app.feed.recent(site.app.config.feed_limit).await?;
    context.insert("posts", &posts);
    render(site, "feed.html", &context, status)
}

// GET /feed
async fn feed_page(site: &Site, session: Option<String>) -> Result<Response, Error> {
    let viewer = viewer(site, session).await?;
    feed_view(site, page_context(viewer.as_ref()), StatusCode::OK).await
}

pub async fn feed(site: Site, session: Option<String>) -> Result<Response, Infallible> {
    respond("feed", feed_page(&site, session).await)
}

// POST /feed
async fn create_post_page(
    site: &Site,
    session: Option<String>,
    form: PostForm,
) -> Result<Response, Error> {
    let Some(viewer) = viewer(site, session).await? else {
        return login_required(site);
    };

    let mut context = page_context(Some(&viewer));
    let status = match site
        .app
        .feed
        .post(&viewer.username, &form.content, form.media_ref)
        .await
    {
        Ok(_) => {
            context.insert("message", "Posted!");
            StatusCode::CREATED
        }
        Err(err) => show_error(err, &mut context)?,
    };

    feed_view(site, context, status).await
}

pub async fn create_post(
    site: Site,
    session: Option<String>,
    form: PostForm,
) -> Result<Response, Infallible> {
    respond("post", create_post_page(&site, session, form).await)
}

// POST /feed/:id/like
async fn like_post_page(
    site: &Site,
    post_id: i64,
    session: Option<String>,
) -> Result<Response, Error> {
    let Some(viewer) = viewer(site, session).await? else {
        return login_required(site);
    };

    match site.app.feed.like(post_id).await {
        Ok(_) => Ok(Box::new(redirect("/feed"))),
        Err(err) => {
            let mut context = page_context(Some(&viewer));
            let status = show_error(err, &mut context)?;
            feed_view(site, context, status).await
        }
    }
}

pub async fn like_post(
    post_id: i64,
    site: Site,
    session: Option<String>,
) -> Result<Response, Infallible> {
    respond("like", like_post_page(&site, post_id, session).await)
}

async fn admin_view(
    site: &Site,
    viewer: &Identity,
    mut context: Context,
    status: StatusCode,
) -> Result<Response, Error> {
    let users = match site.app.identity.users(viewer).await {
        Ok(users) => users,
        Err(err) => {
            let status = show_error(err, &mut context)?;
            context.insert("status", &status.to_string());
            return render(site, "status.html", &context, status);
        }
    };

    context.insert("users", &users);
    context.insert("roles", &Role::ALL.map(Role::as_str));
    context.insert("catch_count", &site.app.catches.count().await?);
    render(site, "admin.html", &context, status)
}

// GET /admin
async fn admin_page(site: &Site, session: Option<String>) -> Result<Response, Error> {
    let Some(viewer) = viewer(site, session).await? else {
        return login_required(site);
    };

    admin_view(site, &viewer, page_context(Some(&viewer)), StatusCode::OK).await
}

pub async fn admin(site: Site, session: Option<String>) -> Result<Response, Infallible> {
    respond("admin", admin_page(&site, session).await)
}

// POST /admin/role
async fn assign_role_page(
    site: &Site,
    session: Option<String>,
    form: RoleForm,
) -> Result<Response, Error> {
    let Some(viewer) = viewer(site, session).await? else {
        return login_required(site);
    };

    let result = match form.role.parse::<Role>() {
        Ok(role) => {
            site.app
                .identity
                .assign_role(&viewer, &form.username, role)
                .await
        }
        Err(err) => Err(err),
    };

    let mut context = page_context(Some(&viewer));
    let status = match result {
        Ok(user) => {
            context.insert(
                "message",
                &format!("{} is now {}", user.username, user.role),
            );
            StatusCode::OK
        }
        Err(err) => show_error(err, &mut context)?,
    };

    admin_view(site, &viewer, context, status).await
}

pub async fn assign_role(
    site: Site,
    session: Option<String>,
    form: RoleForm,
) -> Result<Response, Infallible> {
    respond("role assignment", assign_role_page(&site, session, form).await)
}

// GET /api/leaderboard/:division
pub async fn api_leaderboard(division: String, site: Site) -> Result<Response, Infallible> {
    let result = site.app.leaderboard(&division).await;
    respond(
        "leaderboard json",
        result
            .map(|entries| Box::new(warp::reply::json(&entries)) as Response)
            .map_err(Error::from),
    )
}

// GET /api/feed
pub async fn api_feed(site: Site, query: FeedQuery) -> Result<Response, Infallible> {
    let limit = query.limit.unwrap_or(site.app.config.feed_limit);
    let result = site.app.feed.recent(limit).await;
    respond(
        "feed json",
        result
            .map(|posts| Box::new(warp::reply::json(&posts)) as Response)
            .map_err(Error::from),
    )
}

pub async fn recover(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let status = if rejection.is_not_found() {
        StatusCode::NOT_FOUND
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        StatusCode::METHOD_NOT_ALLOWED
    } else if rejection
        .find::<warp::filters::body::BodyDeserializeError>()
        .is_some()
        || rejection.find::<warp::reject::InvalidQuery>().is_some()
    {
        StatusCode::BAD_REQUEST
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        StatusCode::PAYLOAD_TOO_LARGE
    } else if rejection.find::<warp::reject::LengthRequired>().is_some() {
        StatusCode::LENGTH_REQUIRED
    } else {
        error!("Unhandled rejection: {rejection:?}");
        StatusCode::INTERNAL_SERVER_ERROR
    };

    Ok(warp::reply::with_status(
        status.canonical_reason().unwrap_or("Error").to_string(),
        status,
    ))
}
