use std::sync::Arc;

use serde_json::Value;
use tournament::{credential::CredentialPolicy, models::Role, web, App, Config};
use warp::{
    http::{Response, StatusCode},
    hyper::body::Bytes,
    Filter, Reply,
};

async fn app() -> Arc<App> {
    let config = Config {
        credential_policy: CredentialPolicy::Plaintext,
        ..Config::default()
    };
    Arc::new(App::init(config).await.unwrap())
}

async fn send<F>(
    routes: &F,
    method: &str,
    path: &str,
    cookie: Option<&str>,
    form: Option<&str>,
) -> Response<Bytes>
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let mut request = warp::test::request().method(method).path(path);
    if let Some(cookie) = cookie {
        request = request.header("cookie", cookie);
    }
    if let Some(form) = form {
        request = request
            .header("content-type", "application/x-www-form-urlencoded")
            .body(form.to_string());
    }
    request.reply(routes).await
}

async fn sign_up<F>(routes: &F, username: &str) -> String
where
    F: Filter + 'static,
    F::Extract: Reply + Send,
{
    let form = format!("username={username}&password=hunter2&role=angler");
    let response = send(routes, "POST", "/register", None, Some(&form)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let form = format!("username={username}&password=hunter2");
    let response = send(routes, "POST", "/login", None, Some(&form)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let cookie = response.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.contains("HttpOnly"));
    cookie.split(';').next().unwrap().to_string()
}

fn body(response: &Response<Bytes>) -> String {
    String::from_utf8_lossy(response.body()).into_owned()
}

fn json(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

mod accounts {
    use super::*;

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let routes = web::routes(app().await).unwrap();
        let form = Some("username=al&password=pw");

        let first = send(&routes, "POST", "/register", None, form).await;
        let second = send(&routes, "POST", "/register", None, form).await;

        assert_eq!(first.status(), StatusCode::CREATED);
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert!(body(&second).contains("already taken"));
    }

    #[tokio::test]
    async fn admin_cannot_self_register() {
        let routes = web::routes(app().await).unwrap();

        let response = send(
            &routes,
            "POST",
            "/register",
            None,
            Some("username=al&password=pw&role=admin"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_opens_session() {
        let routes = web::routes(app().await).unwrap();
        let cookie = sign_up(&routes, "al").await;

        let response = send(&routes, "GET", "/", Some(&cookie), None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(&response).contains("Logged in as <strong>al</strong> (angler)"));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let routes = web::routes(app().await).unwrap();
        sign_up(&routes, "al").await;

        let response = send(
            &routes,
            "POST",
            "/login",
            None,
            Some("username=al&password=nope"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("set-cookie").is_none());
    }

    #[tokio::test]
    async fn logout_ends_session() {
        let routes = web::routes(app().await).unwrap();
        let cookie = sign_up(&routes, "al").await;

        let response = send(&routes, "POST", "/logout", Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = send(&routes, "GET", "/catches/new", Some(&cookie), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

mod catches {
    use super::*;

    #[tokio::test]
    async fn submission_requires_login() {
        let routes = web::routes(app().await).unwrap();

        let response = send(
            &routes,
            "POST",
            "/catches",
            None,
            Some("division=Reef&species=Snapper&weight=3"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sailfish_bonus_decides_ranking() {
        let routes = web::routes(app().await).unwrap();
        let al = sign_up(&routes, "al").await;
        let bo = sign_up(&routes, "bo").await;

        let response = send(
            &routes,
            "POST",
            "/catches",
            Some(&al),
            Some("division=Pelagic&species=Sailfish&weight=40&evidence_ref=photos%2F1"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let response = send(
            &routes,
            "POST",
            "/catches",
            Some(&bo),
            Some("division=Pelagic&species=Tuna&weight=45"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let page = send(&routes, "GET", "/leaderboard?division=Pelagic", None, None).await;
        let html = body(&page);
        assert!(html.contains("50.00"));
        assert!(html.find("Sailfish").unwrap() < html.find("Tuna").unwrap());

        let board = json(&send(&routes, "GET", "/api/leaderboard/Pelagic", None, None).await);
        assert_eq!(board[0]["rank"], 1);
        assert_eq!(board[0]["user"], "al");
        assert_eq!(board[0]["display_weight"], 50.0);
        assert_eq!(board[1]["user"], "bo");
    }

    #[tokio::test]
    async fn bad_weights_are_rejected() {
        let routes = web::routes(app().await).unwrap();
        let al = sign_up(&routes, "al").await;

        for weight in ["-5", "heavy"] {
            let form = format!("division=Reef&species=Snapper&weight={weight}");
            let response = send(&routes, "POST", "/catches", Some(&al), Some(&form)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }

        let board = json(&send(&routes, "GET", "/api/leaderboard/Reef", None, None).await);
        assert_eq!(board, Value::Array(Vec::new()));
    }

    #[tokio::test]
    async fn unknown_division_board_is_empty() {
        let routes = web::routes(app().await).unwrap();

        let response = send(&routes, "GET", "/api/leaderboard/Lake", None, None).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(&response), Value::Array(Vec::new()));
    }
}

mod feed {
    use super::*;

    #[tokio::test]
    async fn newest_first_and_likes_count() {
        let routes = web::routes(app().await).unwrap();
        let al = sign_up(&routes, "al").await;

        for content in ["first", "second"] {
            let form = format!("content={content}");
            let response = send(&routes, "POST", "/feed", Some(&al), Some(&form)).await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let posts = json(&send(&routes, "GET", "/api/feed", None, None).await);
        assert_eq!(posts[0]["content"], "second");
        assert_eq!(posts[1]["content"], "first");

        let path = format!("/feed/{}/like", posts[1]["id"]);
        let response = send(&routes, "POST", &path, Some(&al), None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let posts = json(&send(&routes, "GET", "/api/feed?limit=1", None, None).await);
        assert_eq!(posts.as_array().unwrap().len(), 1);
        let posts = json(&send(&routes, "GET", "/api/feed", None, None).await);
        assert_eq!(posts[1]["like_count"], 1);
    }

    #[tokio::test]
    async fn liking_missing_post_is_not_found() {
        let routes = web::routes(app().await).unwrap();
        let al = sign_up(&routes, "al").await;

        let response = send(&routes, "POST", "/feed/999/like", Some(&al), None).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

mod admin {
    use super::*;

    #[tokio::test]
    async fn only_admins_see_the_panel() {
        let app = app().await;
        let routes = web::routes(app.clone()).unwrap();
        let al = sign_up(&routes, "al").await;
        sign_up(&routes, "bo").await;

        let response = send(&routes, "GET", "/admin", Some(&al), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        app.identity.grant_role("al", Role::Admin).await.unwrap();

        let response = send(&routes, "GET", "/admin", Some(&al), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(&response).contains("<td>bo</td>"));

        let response = send(
            &routes,
            "POST",
            "/admin/role",
            Some(&al),
            Some("username=bo&role=captain"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(&response).contains("bo is now captain"));
    }

    #[tokio::test]
    async fn anglers_cannot_assign_roles() {
        let routes = web::routes(app().await).unwrap();
        let al = sign_up(&routes, "al").await;

        let response = send(
            &routes,
            "POST",
            "/admin/role",
            Some(&al),
            Some("username=al&role=admin"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn unknown_routes_and_methods() {
    let routes = web::routes(app().await).unwrap();

    let missing = send(&routes, "GET", "/bait-shop", None, None).await;
    let wrong_method = send(&routes, "GET", "/register", None, None).await;

    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);
}
