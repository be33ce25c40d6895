//! Playback scheduler behaviour against fake voice and catalog collaborators

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use std::time::Duration;

use melody::commands::music::utils::event_handlers::PlaybackEvent;
use melody::commands::music::utils::music_manager::MusicError;
use melody::commands::music::utils::scheduler::PlayOutcome;
use melody::commands::music::utils::voice::TransportState;

use crate::common::fixtures::{guild, other_guild, requester, stream_url, track, voice_channel};
use crate::common::mocks::{
    ConnectBehavior, FakeConnector, Gate, GatedResolver, MockResolver, catalog_resolver,
};
use crate::common::Harness;

fn titles(tracks: &[melody::commands::music::audio_sources::track_metadata::TrackMetadata]) -> Vec<&str> {
    tracks.iter().map(|t| t.title.as_str()).collect()
}

async fn play(h: &Harness, query: &str) -> Result<PlayOutcome, MusicError> {
    h.scheduler
        .play(guild(), voice_channel(), query, requester())
        .await
}

#[tokio::test]
async fn test_first_play_starts_playback() {
    let h = Harness::new(catalog_resolver(&[]));

    let outcome = play(&h, "X").await.unwrap();

    assert_eq!(outcome, PlayOutcome::NowPlaying(track("X")));
    let snapshot = h.scheduler.snapshot(guild()).await;
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.now_playing, Some(track("X")));
    assert!(snapshot.tracks.is_empty());

    let session = h.connector.session(guild());
    assert_eq!(session.played(), vec![stream_url("X")]);
    assert_eq!(session.transport(), TransportState::Playing);
    assert_eq!(h.announcer.titles(guild()), vec!["X"]);
    assert_eq!(h.connector.connects(), 1);
}

#[tokio::test]
async fn test_play_while_playing_only_enqueues() {
    let h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();

    let second = play(&h, "Y").await.unwrap();
    let third = play(&h, "Z").await.unwrap();

    assert_eq!(
        second,
        PlayOutcome::Queued {
            track: track("Y"),
            position: 1
        }
    );
    assert_matches!(third, PlayOutcome::Queued { position: 2, .. });

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert_eq!(titles(&snapshot.tracks), vec!["Y", "Z"]);
    assert_eq!(h.connector.session(guild()).played().len(), 1);
    assert_eq!(h.connector.connects(), 1);
}

#[tokio::test]
async fn test_completion_advances_to_next_track() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    play(&h, "Y").await.unwrap();

    h.connector.session(guild()).finish();
    assert_eq!(h.drain().await, 1);

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.now_playing, Some(track("Y")));
    assert!(snapshot.tracks.is_empty());
    assert_eq!(
        h.connector.session(guild()).played(),
        vec![stream_url("X"), stream_url("Y")]
    );
    assert_eq!(h.announcer.titles(guild()), vec!["X", "Y"]);
}

#[tokio::test]
async fn test_completion_on_empty_queue_disconnects_once() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    let session = h.connector.session(guild());

    session.finish();
    h.drain().await;

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.now_playing, None);
    assert!(!h.scheduler.is_connected(guild()));
    assert_eq!(session.disconnects(), 1);

    // Idling out again is a no-op
    h.scheduler.advance(guild()).await;
    h.drain().await;
    assert_eq!(session.disconnects(), 1);
}

#[tokio::test]
async fn test_skip_behaves_like_completion() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    play(&h, "Y").await.unwrap();

    tokio_test::assert_ok!(h.scheduler.skip(guild()).await);
    h.drain().await;

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert_eq!(snapshot.now_playing, Some(track("Y")));
    assert_eq!(h.connector.session(guild()).stops(), 1);
}

#[tokio::test]
async fn test_skip_last_track_idles_out() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    let session = h.connector.session(guild());

    h.scheduler.skip(guild()).await.unwrap();
    h.drain().await;

    assert!(!h.scheduler.is_connected(guild()));
    assert_eq!(session.disconnects(), 1);
}

#[tokio::test]
async fn test_stop_clears_queue_and_never_resumes() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    play(&h, "Y").await.unwrap();
    play(&h, "Z").await.unwrap();
    let session = h.connector.session(guild());

    h.scheduler.stop(guild()).await.unwrap();
    h.drain().await;

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert!(snapshot.tracks.is_empty());
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.now_playing, None);
    assert_eq!(session.played(), vec![stream_url("X")]);
    assert_eq!(session.disconnects(), 1);
    assert!(!h.scheduler.is_connected(guild()));
}

#[tokio::test]
async fn test_play_after_stop_opens_fresh_session() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    h.scheduler.stop(guild()).await.unwrap();
    h.drain().await;

    let outcome = play(&h, "Y").await.unwrap();

    assert_eq!(outcome, PlayOutcome::NowPlaying(track("Y")));
    assert_eq!(h.connector.connects(), 2);
    assert_eq!(h.connector.session(guild()).played(), vec![stream_url("Y")]);
}

#[tokio::test]
async fn test_unresolvable_track_is_skipped() {
    let mut h = Harness::new(catalog_resolver(&["A"]));
    play(&h, "X").await.unwrap();
    play(&h, "A").await.unwrap();
    play(&h, "B").await.unwrap();

    h.connector.session(guild()).finish();
    h.drain().await;

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert_eq!(snapshot.now_playing, Some(track("B")));
    assert!(snapshot.tracks.is_empty());
    assert_eq!(
        h.connector.session(guild()).played(),
        vec![stream_url("X"), stream_url("B")]
    );
    assert_eq!(h.announcer.titles(guild()), vec!["X", "B"]);
}

#[tokio::test]
async fn test_all_unresolvable_tracks_idle_out() {
    let mut h = Harness::new(catalog_resolver(&["A1", "A2"]));
    play(&h, "X").await.unwrap();
    play(&h, "A1").await.unwrap();
    play(&h, "A2").await.unwrap();
    let session = h.connector.session(guild());

    session.finish();
    h.drain().await;

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert!(!snapshot.is_playing);
    assert!(snapshot.tracks.is_empty());
    assert_eq!(session.played(), vec![stream_url("X")]);
    assert_eq!(session.disconnects(), 1);
}

#[tokio::test]
async fn test_first_play_with_unresolvable_stream_fails() {
    let h = Harness::new(catalog_resolver(&["A"]));

    let result = play(&h, "A").await;

    assert_matches!(result, Err(MusicError::ResolutionFailed(_)));
    assert!(!h.scheduler.is_connected(guild()));
    assert_eq!(h.connector.session(guild()).disconnects(), 1);
    assert!(h.announcer.titles(guild()).is_empty());
}

#[tokio::test]
async fn test_not_found_leaves_everything_untouched() {
    let mut resolver = MockResolver::new();
    resolver
        .expect_resolve_metadata()
        .returning(|query, _| Err(MusicError::NotFound(format!("no results for {}", query))));
    resolver.expect_resolve_stream_url().never();
    let h = Harness::new(resolver);

    let result = play(&h, "nothing matches this").await;

    assert_matches!(result, Err(MusicError::NotFound(_)));
    assert_eq!(h.connector.connects(), 0);
    assert_eq!(h.scheduler.snapshot(guild()).await.total(), 0);
}

#[tokio::test]
async fn test_play_needs_voice_channel_to_connect() {
    let h = Harness::new(catalog_resolver(&[]));

    let result = h.scheduler.play(guild(), None, "X", requester()).await;

    assert_matches!(result, Err(MusicError::UserNotInVoiceChannel));
    assert_eq!(h.connector.connects(), 0);
    assert_eq!(h.scheduler.snapshot(guild()).await.total(), 0);
}

#[tokio::test]
async fn test_failed_connect_enqueues_nothing() {
    let h = Harness::with_connector(
        catalog_resolver(&[]),
        FakeConnector::with_behavior(ConnectBehavior::Fail),
    );

    let result = play(&h, "X").await;

    assert_matches!(result, Err(MusicError::ConnectionFailed(_)));
    assert!(!h.scheduler.is_connected(guild()));
    assert_eq!(h.scheduler.snapshot(guild()).await.total(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout_enqueues_nothing() {
    let h = Harness::with_connector(
        catalog_resolver(&[]),
        FakeConnector::with_behavior(ConnectBehavior::Hang),
    );

    let result = play(&h, "X").await;

    assert_matches!(result, Err(MusicError::ConnectionTimeout(timeout)) if timeout == Duration::from_secs(10));
    assert_eq!(h.connector.abandons(), 1);
    assert!(!h.scheduler.is_connected(guild()));

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert_eq!(snapshot.total(), 0);
    assert!(!snapshot.is_playing);
}

#[tokio::test]
async fn test_stale_completion_is_ignored() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    play(&h, "Y").await.unwrap();
    let session = h.connector.session(guild());
    let first = session.current_notifier().unwrap();

    session.finish();
    h.drain().await;

    // A late duplicate from the first stream's other handler
    first.notify();
    h.scheduler
        .handle_event(PlaybackEvent::TrackEnded {
            guild_id: guild(),
            generation: first.generation(),
        })
        .await;
    h.drain().await;

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert_eq!(snapshot.now_playing, Some(track("Y")));
    assert!(snapshot.is_playing);
    assert_eq!(session.played().len(), 2);
    assert_eq!(session.disconnects(), 0);
}

#[tokio::test]
async fn test_lost_session_resets_guild() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    play(&h, "Y").await.unwrap();

    h.connector.drop_connection(guild());
    h.drain().await;

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert!(!h.scheduler.is_connected(guild()));
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.now_playing, None);

    // The next request reconnects and the track left queued plays first
    let outcome = play(&h, "Z").await.unwrap();
    assert_eq!(
        outcome,
        PlayOutcome::Queued {
            track: track("Z"),
            position: 1
        }
    );
    assert_eq!(h.connector.connects(), 2);

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert_eq!(snapshot.now_playing, Some(track("Y")));
    assert_eq!(titles(&snapshot.tracks), vec!["Z"]);
}

#[tokio::test]
async fn test_loss_of_superseded_session_is_ignored() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    h.scheduler.stop(guild()).await.unwrap();
    h.drain().await;
    play(&h, "Y").await.unwrap();

    h.scheduler
        .handle_event(PlaybackEvent::SessionLost {
            guild_id: guild(),
            session_id: 1,
        })
        .await;

    assert!(h.scheduler.is_connected(guild()));
    assert_eq!(
        h.scheduler.snapshot(guild()).await.now_playing,
        Some(track("Y"))
    );
}

#[tokio::test]
async fn test_pause_and_resume() {
    let h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    let session = h.connector.session(guild());

    tokio_test::assert_ok!(h.scheduler.pause(guild()).await);
    assert_eq!(session.transport(), TransportState::Paused);
    assert_matches!(h.scheduler.pause(guild()).await, Err(MusicError::NotPlaying));

    tokio_test::assert_ok!(h.scheduler.resume(guild()).await);
    assert_eq!(session.transport(), TransportState::Playing);
    assert_matches!(h.scheduler.resume(guild()).await, Err(MusicError::NotPaused));

    // Pausing leaves the queue alone
    assert!(h.scheduler.snapshot(guild()).await.is_playing);
}

#[tokio::test]
async fn test_skip_while_paused_advances() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    play(&h, "Y").await.unwrap();
    h.scheduler.pause(guild()).await.unwrap();

    h.scheduler.skip(guild()).await.unwrap();
    h.drain().await;

    assert_eq!(
        h.scheduler.snapshot(guild()).await.now_playing,
        Some(track("Y"))
    );
    assert_eq!(h.connector.session(guild()).transport(), TransportState::Playing);
}

#[tokio::test]
async fn test_controls_without_session() {
    let h = Harness::new(catalog_resolver(&[]));

    assert_matches!(h.scheduler.pause(guild()).await, Err(MusicError::NotConnected));
    assert_matches!(h.scheduler.resume(guild()).await, Err(MusicError::NotConnected));
    assert_matches!(h.scheduler.skip(guild()).await, Err(MusicError::NotConnected));
    assert_matches!(h.scheduler.stop(guild()).await, Err(MusicError::NotConnected));
}

#[tokio::test]
async fn test_guilds_are_independent() {
    let mut h = Harness::new(catalog_resolver(&[]));
    play(&h, "X").await.unwrap();
    h.scheduler
        .play(other_guild(), voice_channel(), "P", requester())
        .await
        .unwrap();

    h.scheduler.stop(guild()).await.unwrap();
    h.drain().await;

    assert!(!h.scheduler.is_connected(guild()));
    assert!(h.scheduler.is_connected(other_guild()));
    assert_eq!(
        h.scheduler.snapshot(other_guild()).await.now_playing,
        Some(track("P"))
    );
    assert_eq!(h.announcer.titles(other_guild()), vec!["P"]);
}

#[tokio::test]
async fn test_stop_while_stream_is_starting() {
    let gate = Gate::new();
    let mut h = Harness::with_connector(
        catalog_resolver(&[]),
        FakeConnector::with_play_gate(gate.clone()),
    );

    let scheduler = h.scheduler.clone();
    let pending = tokio::spawn(async move {
        scheduler
            .play(guild(), voice_channel(), "X", requester())
            .await
    });

    gate.wait_entered().await;
    tokio_test::assert_ok!(h.scheduler.stop(guild()).await);
    gate.open();

    assert_matches!(pending.await.unwrap(), Err(MusicError::Stopped));
    h.drain().await;

    let session = h.connector.session(guild());
    let snapshot = h.scheduler.snapshot(guild()).await;
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.now_playing, None);
    assert_eq!(session.transport(), TransportState::Idle);
    assert_eq!(session.disconnects(), 1);
    assert!(!h.scheduler.is_connected(guild()));
    assert!(h.announcer.titles(guild()).is_empty());
}

#[tokio::test]
async fn test_stop_while_resolving_plays_nothing() {
    let gate = Gate::new();
    let mut h = Harness::new(GatedResolver::new("X", gate.clone()));

    let scheduler = h.scheduler.clone();
    let pending = tokio::spawn(async move {
        scheduler
            .play(guild(), voice_channel(), "X", requester())
            .await
    });

    gate.wait_entered().await;
    tokio_test::assert_ok!(h.scheduler.stop(guild()).await);
    // The advance still holds the guild, so stop cannot tear down itself
    assert!(h.scheduler.is_connected(guild()));
    gate.open();

    assert_matches!(pending.await.unwrap(), Err(MusicError::Stopped));
    h.drain().await;

    let session = h.connector.session(guild());
    assert!(session.played().is_empty());
    assert_eq!(session.disconnects(), 1);
    assert!(!h.scheduler.is_connected(guild()));
    assert!(!h.scheduler.snapshot(guild()).await.is_playing);
}

#[tokio::test]
async fn test_completion_during_resolution_waits_for_advance() {
    let gate = Gate::new();
    let mut h = Harness::new(GatedResolver::new("Y", gate.clone()));
    play(&h, "X").await.unwrap();
    play(&h, "Y").await.unwrap();
    play(&h, "Z").await.unwrap();
    let session = h.connector.session(guild());
    let first_generation = session.current_notifier().unwrap().generation();

    session.finish();
    let ended = h.events.try_next().unwrap();
    let scheduler = h.scheduler.clone();
    let advancing = tokio::spawn(async move { scheduler.handle_event(ended).await });
    gate.wait_entered().await;

    // A second completion for the same stream lands while Y is resolving
    let scheduler = h.scheduler.clone();
    let late = tokio::spawn(async move {
        scheduler
            .handle_event(PlaybackEvent::TrackEnded {
                guild_id: guild(),
                generation: first_generation,
            })
            .await
    });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!late.is_finished());

    gate.open();
    advancing.await.unwrap();
    late.await.unwrap();
    h.drain().await;

    let snapshot = h.scheduler.snapshot(guild()).await;
    assert_eq!(snapshot.now_playing, Some(track("Y")));
    assert_eq!(titles(&snapshot.tracks), vec!["Z"]);
    assert_eq!(session.played(), vec![stream_url("X"), stream_url("Y")]);
    assert_eq!(h.announcer.titles(guild()), vec!["X", "Y"]);
}
