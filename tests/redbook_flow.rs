//! Full RedBook resolve flow against a mock upstream: redirect chasing,
//! identity fallback, both state shapes, and the failure classifications.

use shareloader::resolver::platforms::RedBookResolver;
use shareloader::utils::user_agent::{user_agent_for, DeviceHint};
use shareloader::{ResolveError, ResolverConfig, ShareResolver};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOTE_ID: &str = "66f2a1b3000000001e01c9a5";

fn resolver() -> RedBookResolver {
    RedBookResolver::new(&ResolverConfig::default()).expect("resolver")
}

fn video_record() -> String {
    format!(
        r#"{{
            "title": "demo note",
            "video": {{ "media": {{ "stream": {{ "h264": [
                {{ "masterUrl": "https://sns-video.example.com/{NOTE_ID}.mp4" }}
            ] }} }} }},
            "imageList": [
                {{ "urlDefault": "https://sns-img.xhscdn.com/notes_pre_post/cover0001!nd_dft_1" }}
            ],
            "user": {{ "userId": "5f1a", "nickname": "author", "avatar": "https://img.example.com/a.png" }}
        }}"#
    )
}

fn shape_a_page() -> String {
    format!(
        r#"<html><script>window.__INITIAL_STATE__ = {{"note":{{"currentNoteId":"{NOTE_ID}","noteDetailMap":{{"{NOTE_ID}":{{"note":{record}}}}}}}}};</script></html>"#,
        record = video_record()
    )
}

fn shape_b_page() -> String {
    format!(
        r#"<html><script>window.__INITIAL_STATE__ = {{"noteData":{{"noteDetail":{{"noteId":"{NOTE_ID}","note":{record}}}}}}};</script></html>"#,
        record = video_record()
    )
}

#[tokio::test]
async fn follows_share_redirect_to_landing_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/share/abc"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/discovery/item/{NOTE_ID}", server.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/discovery/item/{NOTE_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(shape_a_page()))
        .expect(1)
        .mount(&server)
        .await;

    let info = resolver()
        .resolve_share_url(&format!("{}/share/abc", server.uri()))
        .await
        .expect("resolve");

    assert_eq!(
        info.video_url,
        format!("https://sns-video.example.com/{NOTE_ID}.mp4")
    );
    assert_eq!(info.title, "demo note");
    assert_eq!(info.author.name, "author");
    assert!(info.images.is_empty(), "video results carry no gallery");
    server.verify().await;
}

#[tokio::test]
async fn non_redirect_share_url_is_fetched_directly() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/explore/{NOTE_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(shape_a_page()))
        .mount(&server)
        .await;

    let info = resolver()
        .resolve_share_url(&format!("{}/explore/{NOTE_ID}", server.uri()))
        .await
        .expect("resolve");
    assert!(!info.video_url.is_empty());
}

#[tokio::test]
async fn falls_back_to_ios_identity_on_anti_bot_body() {
    let server = MockServer::start().await;

    // Desktop identity gets the soft-block page without embedded state.
    // Two hits: the redirect probe and the primary fetch.
    Mock::given(method("GET"))
        .and(path(format!("/explore/{NOTE_ID}")))
        .and(header("user-agent", user_agent_for(DeviceHint::Windows)))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>captcha</body></html>"),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/explore/{NOTE_ID}")))
        .and(header("user-agent", user_agent_for(DeviceHint::Ios)))
        .respond_with(ResponseTemplate::new(200).set_body_string(shape_a_page()))
        .expect(1)
        .mount(&server)
        .await;

    let info = resolver()
        .resolve_share_url(&format!("{}/explore/{NOTE_ID}", server.uri()))
        .await
        .expect("second identity should succeed");
    assert_eq!(info.title, "demo note");
    server.verify().await;
}

#[tokio::test]
async fn both_identities_blocked_is_a_parse_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nothing</html>"))
        .mount(&server)
        .await;

    let err = resolver()
        .resolve_share_url(&format!("{}/explore/blocked", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::StructureMismatch(_)));
    assert!(err.to_string().contains("parse video json info from html fail"));
}

#[tokio::test]
async fn shape_b_normalizes_like_shape_a() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/explore/a"))
        .respond_with(ResponseTemplate::new(200).set_body_string(shape_a_page()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/explore/b"))
        .respond_with(ResponseTemplate::new(200).set_body_string(shape_b_page()))
        .mount(&server)
        .await;

    let r = resolver();
    let from_a = r
        .resolve_share_url(&format!("{}/explore/a", server.uri()))
        .await
        .expect("shape a");
    let from_b = r
        .resolve_share_url(&format!("{}/explore/b", server.uri()))
        .await
        .expect("shape b");

    assert_eq!(from_a.video_url, from_b.video_url);
    assert_eq!(from_a.title, from_b.title);
    assert_eq!(from_a.cover_url, from_b.cover_url);
    assert_eq!(from_a.author, from_b.author);
}

#[tokio::test]
async fn expired_link_never_returns_partial_success() {
    let server = MockServer::start().await;

    let body = r#"<html><script>window.__INITIAL_STATE__ = {"note":{"currentNoteId":"undefined","noteDetailMap":{}}};</script></html>"#;
    Mock::given(method("GET"))
        .and(path("/explore/gone"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let err = resolver()
        .resolve_share_url(&format!("{}/explore/gone", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::StructureMismatch(_)));
    assert!(err.to_string().contains("expired"));
}

#[tokio::test]
async fn missing_record_reports_auth_remediation() {
    let server = MockServer::start().await;

    let body = format!(
        r#"<html><script>window.__INITIAL_STATE__ = {{"note":{{"currentNoteId":"{NOTE_ID}","noteDetailMap":{{}}}}}};</script></html>"#
    );
    Mock::given(method("GET"))
        .and(path("/explore/locked"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let err = resolver()
        .resolve_share_url(&format!("{}/explore/locked", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::AuthRequired(_)));
    assert!(err.to_string().contains("REDBOOK_COOKIE"));
}

#[tokio::test]
async fn gallery_preserves_carousel_order_and_live_photos() {
    let server = MockServer::start().await;

    let record = r#"{
        "title": "gallery note",
        "imageList": [
            { "urlDefault": "https://sns-img.xhscdn.com/notes_pre_post/first0001!nd_dft_1" },
            {
                "urlDefault": "https://sns-img.xhscdn.com/notes_pre_post/second001!nd_dft_1",
                "livePhoto": true,
                "stream": { "h264": [ { "masterUrl": "https://sns-video.example.com/live.mp4" } ] }
            },
            { "urlDefault": "https://third.example.com/plain.jpg" }
        ],
        "user": { "userId": "5f1a", "nickname": "author", "avatar": "" }
    }"#;
    let body = format!(
        r#"<html><script>window.__INITIAL_STATE__ = {{"note":{{"currentNoteId":"{NOTE_ID}","noteDetailMap":{{"{NOTE_ID}":{{"note":{record}}}}}}}}};</script></html>"#
    );
    Mock::given(method("GET"))
        .and(path("/explore/gallery"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let info = resolver()
        .resolve_share_url(&format!("{}/explore/gallery", server.uri()))
        .await
        .expect("resolve gallery");

    assert!(info.video_url.is_empty());
    assert_eq!(info.images.len(), 3);
    assert_eq!(
        info.images[0].url,
        "https://ci.xiaohongshu.com/notes_pre_post/first0001?imageView2/format/jpg"
    );
    assert_eq!(
        info.images[1].live_photo_url.as_deref(),
        Some("https://sns-video.example.com/live.mp4")
    );
    // URLs outside the rewritable family pass through untouched.
    assert_eq!(info.images[2].url, "https://third.example.com/plain.jpg");
    assert_eq!(
        info.cover_url,
        "https://sns-img.xhscdn.com/notes_pre_post/first0001!nd_dft_1"
    );
}

#[tokio::test]
async fn upstream_error_status_names_the_stage() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = resolver()
        .resolve_share_url(&format!("{}/explore/down", server.uri()))
        .await
        .unwrap_err();
    match err {
        ResolveError::Status { stage, status } => {
            assert_eq!(stage, "landing fetch");
            assert_eq!(status, 503);
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn id_resolution_is_not_supported() {
    let err = resolver().resolve_by_id(NOTE_ID).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::NotSupported { platform: "redbook", .. }
    ));
}
