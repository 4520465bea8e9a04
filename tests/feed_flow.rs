// End-to-end feed behavior against the in-memory backend.

use chirp::api::memory::MemoryApi;
use chirp::api::{Endpoint, PostId};
use chirp::feed::{
    FeedDataSource, FeedState, FetchOutcome, InteractionController, LoadPhase, ScrollController, ScrollMetrics,
    ToggleOutcome,
};
use chirp::profile::{ProfileView, Relationship};
use chirp::session::Session;
use std::sync::Arc;

const VIEWER: &str = "alice1";
const ROW: u32 = 60;
const CLIENT: u32 = 400;

fn world(posts: usize) -> (Arc<MemoryApi>, Vec<PostId>) {
    let api = MemoryApi::new();
    api.add_user(VIEWER, "alice");
    api.add_user("bob1", "bob");
    api.add_follow(VIEWER, "bob1");
    let ids = (0..posts).map(|i| api.add_post("bob1", &format!("post {}", i))).collect();
    (Arc::new(api), ids)
}

fn setup(posts: usize) -> (Arc<MemoryApi>, FeedDataSource, FeedState) {
    let (api, _) = world(posts);
    let source = FeedDataSource::new(api.clone());
    (api, source, FeedState::new(10))
}

/// Scrolled so the bottom edge sits `gap` units above the end of the content.
fn near_bottom(feed: &FeedState, gap: u32) -> Option<ScrollMetrics> {
    let scroll_height = feed.visible().len() as u32 * ROW;
    Some(ScrollMetrics {
        scroll_top: scroll_height.saturating_sub(CLIENT + gap),
        scroll_height,
        client_height: CLIENT,
    })
}

#[tokio::test]
async fn test_window_grows_by_chunks_until_exhausted() {
    let (_api, source, mut feed) = setup(25);
    let mut scroll = ScrollController::new(100);
    scroll.attach();

    assert!(feed.load(&source, VIEWER).await);
    assert_eq!(feed.all_posts().len(), 25);
    assert_eq!(feed.visible().len(), 10);
    assert!(!feed.shows_end_marker());

    // Far from the bottom: nothing happens.
    assert!(!scroll.on_scroll_current(near_bottom(&feed, 150), &mut feed));
    assert_eq!(feed.visible().len(), 10);

    assert!(scroll.on_scroll_current(near_bottom(&feed, 50), &mut feed));
    assert_eq!(feed.visible().len(), 20);

    assert!(scroll.on_scroll_current(near_bottom(&feed, 50), &mut feed));
    assert_eq!(feed.visible().len(), 25);
    assert!(feed.shows_end_marker());

    assert!(!scroll.on_scroll_current(near_bottom(&feed, 0), &mut feed));
    assert_eq!(feed.visible().len(), 25);
    assert_eq!(scroll.listener_count(), 1);
}

#[tokio::test]
async fn test_visible_is_always_a_prefix_of_all_posts() {
    let (_api, source, mut feed) = setup(37);
    feed.load(&source, VIEWER).await;
    loop {
        let visible: Vec<&PostId> = feed.visible().iter().map(|p| &p.post_id).collect();
        let prefix: Vec<&PostId> = feed.all_posts()[..visible.len()].iter().map(|p| &p.post_id).collect();
        assert_eq!(visible, prefix);
        if feed.grow_window() == 0 {
            break;
        }
    }
    assert_eq!(feed.visible().len(), 37);
}

#[tokio::test]
async fn test_feed_is_newest_first() {
    let (api, ids) = world(3);
    let source = FeedDataSource::new(api.clone());
    let mut feed = FeedState::new(10);
    feed.load(&source, VIEWER).await;
    let shown: Vec<PostId> = feed.all_posts().iter().map(|p| p.post_id.clone()).collect();
    let mut expected = ids;
    expected.reverse();
    assert_eq!(shown, expected);
}

#[tokio::test]
async fn test_detached_listener_and_unmounted_container_are_ignored() {
    let (_api, source, mut feed) = setup(25);
    feed.load(&source, VIEWER).await;
    let mut scroll = ScrollController::new(100);
    let stale = scroll.attach();
    scroll.rebind();

    assert!(!scroll.on_scroll(stale, near_bottom(&feed, 0), &mut feed));
    assert!(!scroll.on_scroll_current(None, &mut feed));
    scroll.detach();
    assert!(!scroll.on_scroll_current(near_bottom(&feed, 0), &mut feed));
    assert_eq!(feed.visible().len(), 10);
}

#[tokio::test]
async fn test_like_round_trip_restores_original_state() {
    let (api, ids) = world(1);
    let source = FeedDataSource::new(api.clone());
    let mut feed = FeedState::new(10);
    feed.load(&source, VIEWER).await;
    let mut interactions = InteractionController::new(api.clone());
    let id = ids[0].clone();

    let outcome = interactions.toggle_like(&mut feed, VIEWER, &id).await;
    assert_eq!(outcome, Some(ToggleOutcome::Confirmed));
    let liked = feed.effective(&id).unwrap();
    assert!(liked.liked);
    assert_eq!(liked.like_count, 1);
    assert!(api.is_liked(VIEWER, &id));

    interactions.toggle_like(&mut feed, VIEWER, &id).await;
    let back = feed.effective(&id).unwrap();
    assert!(!back.liked);
    assert_eq!(back.like_count, 0);
    assert!(!api.is_liked(VIEWER, &id));
}

#[tokio::test]
async fn test_failed_unlike_keeps_post_liked() {
    let (api, ids) = world(1);
    let id = ids[0].clone();
    api.add_like(VIEWER, &id);
    api.add_like("bob1", &id);
    let source = FeedDataSource::new(api.clone());
    let mut feed = FeedState::new(10);
    feed.load(&source, VIEWER).await;
    let mut interactions = InteractionController::new(api.clone());

    api.fail(Endpoint::Unlike);
    let outcome = interactions.toggle_like(&mut feed, VIEWER, &id).await;
    assert_eq!(outcome, Some(ToggleOutcome::RolledBack));
    let state = feed.effective(&id).unwrap();
    assert!(state.liked);
    assert_eq!(state.like_count, 2);
    assert_eq!(interactions.pending_count(), 0);
}

#[tokio::test]
async fn test_scoped_load_shows_only_replies() {
    let (api, ids) = world(2);
    let root = ids[0].clone();
    let reply = api.add_reply("bob1", &root, "first!");
    api.add_reply("bob1", &ids[1], "elsewhere");
    let source = FeedDataSource::new(api.clone());
    let mut feed = FeedState::new(10);
    feed.load(&source, VIEWER).await;

    let root_post = feed.post(&root).cloned().unwrap();
    assert_eq!(root_post.reply_count, 1);
    assert!(feed.select_root(root_post));
    assert!(feed.needs_load());
    feed.load(&source, VIEWER).await;

    let shown: Vec<&PostId> = feed.all_posts().iter().map(|p| &p.post_id).collect();
    assert_eq!(shown, vec![&reply]);
    assert_eq!(feed.root_post().map(|p| &p.post_id), Some(&root));
}

#[tokio::test]
async fn test_delete_removes_post_after_reload() {
    let (api, ids) = world(3);
    let source = FeedDataSource::new(api.clone());
    let mut feed = FeedState::new(10);
    feed.load(&source, VIEWER).await;
    let mut interactions = InteractionController::new(api.clone());

    interactions.handle_delete(&mut feed, &source, VIEWER, &ids[1]).await.unwrap();
    assert!(feed.post(&ids[1]).is_none());
    assert_eq!(feed.all_posts().len(), 2);
    assert!(!api.post_ids().contains(&ids[1]));
}

#[tokio::test]
async fn test_stale_load_response_is_discarded() {
    let (api, _) = world(4);
    let source = FeedDataSource::new(api.clone());
    let mut feed = FeedState::new(10);

    let first = feed.begin_load();
    let second = feed.begin_load();
    let fresh = source.fetch_posts(VIEWER, second.scope()).await;
    assert!(feed.finish_load(second, fresh));

    let late = FetchOutcome::Loaded(Vec::new());
    assert!(!feed.finish_load(first, late));
    assert_eq!(feed.all_posts().len(), 4);
    assert_eq!(*feed.phase(), LoadPhase::Loaded);
}

#[tokio::test]
async fn test_failed_load_is_distinct_from_empty() {
    let (api, _) = world(0);
    let source = FeedDataSource::new(api.clone());
    let mut feed = FeedState::new(10);
    feed.load(&source, VIEWER).await;
    assert_eq!(*feed.phase(), LoadPhase::Loaded);
    assert!(feed.all_posts().is_empty());
    assert!(!feed.shows_end_marker());

    api.fail(Endpoint::RecentTweets);
    feed.request_reload();
    feed.load(&source, VIEWER).await;
    assert!(matches!(feed.phase(), LoadPhase::Failed(_)));
    // Empty feeds never ask for counts.
    assert_eq!(api.call_count(Endpoint::Counts), 0);
}

#[tokio::test]
async fn test_profile_lookup_failure_hides_relationship_buttons() {
    let (api, _) = world(0);
    let viewer = Session::new(VIEWER, "alice");
    api.fail(Endpoint::GetUser);

    let view = ProfileView::load(api.as_ref(), &viewer, "bob").await;
    assert!(view.error.is_some());
    assert!(!view.shows_relationship_buttons(&viewer));
    assert!(view.action(&viewer, Relationship::Follow).is_none());
    assert_eq!(view.bio_text(), "No bio yet.");
}

#[tokio::test]
async fn test_follow_changes_home_feed() {
    let (api, _) = world(0);
    api.add_user("carol1", "carol");
    api.add_post("carol1", "hello from carol");
    let viewer = Session::new(VIEWER, "alice");
    let source = FeedDataSource::new(api.clone());
    let mut feed = FeedState::new(10);
    feed.load(&source, VIEWER).await;
    assert!(feed.all_posts().is_empty());

    let mut view = ProfileView::load(api.as_ref(), &viewer, "carol").await;
    assert_eq!(view.is_following, Some(false));
    let action = view.action(&viewer, Relationship::Follow).unwrap();
    let result = action.send(api.as_ref(), VIEWER).await;
    assert!(view.apply(&action, &result));
    assert_eq!(view.is_following, Some(true));

    feed.request_reload();
    feed.load(&source, VIEWER).await;
    assert_eq!(feed.all_posts().len(), 1);
    assert_eq!(feed.all_posts()[0].author_display_name, "carol");
}
