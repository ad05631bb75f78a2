//! Peer footstep handling and ripple lifecycle tests

#[cfg(test)]
mod tests {
    use footstep_effects::{
        protocol::PeerMessage,
        sim::{LoopbackBus, PositionReading, ScriptedPositions, SimClient, StandingAvatar},
        FootstepConfig, FootstepController, FootstepEvent, Position, ReceiveOutcome, SessionId,
    };
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::assert_ok;

    async fn make_controller(
        bus: &LoopbackBus,
        readings: Vec<PositionReading>,
        seed: u64,
    ) -> (Arc<FootstepController>, SimClient) {
        let client = SimClient::attach(bus, Arc::new(ScriptedPositions::new(readings)));
        let controller = FootstepController::initialize(
            FootstepConfig::default(),
            client.services(),
            StdRng::seed_from_u64(seed),
        )
        .await
        .expect("controller starts");
        (controller, client)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }

    fn peer_event(origin: &str, x: f64, y: f64, z: f64) -> FootstepEvent {
        FootstepEvent::new(SessionId::from(origin), Position::new(x, y, z))
    }

    // -----------------------------------------------------------------------
    // Receive
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn peer_footstep_is_presented_without_touching_baseline() {
        let bus = LoopbackBus::new();
        let (controller, client) =
            make_controller(&bus, vec![PositionReading::At(Position::zero())], 1).await;
        assert_ok!(controller.sample().await);

        let payload = peer_event("peer-x", 3.0, 0.0, 3.0).encode().unwrap();
        let outcome = controller.receive(&payload);
        assert_eq!(outcome, ReceiveOutcome::Presented(Position::new(3.0, 0.0, 3.0)));

        settle().await;
        assert_eq!(controller.last_position(), Some(Position::zero()));
        assert!(bus.sent().is_empty(), "peer events are never relayed");

        let created = client.objects.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].1.x, 3.0);
        assert_eq!(created[0].1.y, 3.0);
        assert_eq!(client.audio.played().len(), 1);
        assert_eq!(controller.stats().peer_effects, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn peer_footstep_before_any_sample_leaves_baseline_absent() {
        let bus = LoopbackBus::new();
        let (controller, _client) = make_controller(&bus, vec![], 1).await;
        controller.handle_event(peer_event("peer-x", 3.0, 0.0, 3.0));
        settle().await;
        assert!(controller.last_position().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn own_session_id_is_suppressed() {
        let bus = LoopbackBus::new();
        let (controller, client) = make_controller(&bus, vec![], 1).await;

        let echo = FootstepEvent::new(controller.session_id().clone(), Position::zero());
        assert_eq!(controller.handle_event(echo.clone()), ReceiveOutcome::SelfEcho);
        assert_eq!(
            controller.receive(&echo.encode().unwrap()),
            ReceiveOutcome::SelfEcho
        );

        settle().await;
        assert!(client.objects.created().is_empty());
        assert!(client.audio.played().is_empty());
        assert_eq!(controller.stats().echoes_ignored, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_actions_and_garbage_are_dropped() {
        let bus = LoopbackBus::new();
        let (controller, client) = make_controller(&bus, vec![], 1).await;

        let wave = br#"{"action":"wave","instanceID":"peer-x","position":{"x":1,"y":0,"z":1}}"#;
        assert_eq!(controller.receive(wave), ReceiveOutcome::Ignored);
        assert_eq!(controller.receive(b"{oops"), ReceiveOutcome::Malformed);

        settle().await;
        assert!(client.objects.created().is_empty());
        assert_eq!(controller.stats().malformed_messages, 1);
    }

    // -----------------------------------------------------------------------
    // Two clients on one bus
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn step_reaches_peer_but_not_sender() {
        let bus = LoopbackBus::new();
        let (walker, mut walker_client) = make_controller(
            &bus,
            vec![
                PositionReading::At(Position::zero()),
                PositionReading::At(Position::new(0.0, 0.0, 2.0)),
            ],
            10,
        )
        .await;

        let mut watcher_client = SimClient::attach(
            &bus,
            Arc::new(StandingAvatar(Position::new(5.0, 0.0, 5.0))),
        );
        let watcher = FootstepController::initialize(
            FootstepConfig::default(),
            watcher_client.services(),
            StdRng::seed_from_u64(11),
        )
        .await
        .unwrap();
        assert_ne!(walker.session_id(), watcher.session_id());

        walker.spawn_receiver(walker_client.take_inbox().unwrap());
        watcher.spawn_receiver(watcher_client.take_inbox().unwrap());

        assert_ok!(walker.sample().await);
        assert_ok!(walker.sample().await);
        settle().await;

        // One ripple each: the walker's own step, and the watcher's copy.
        assert_eq!(walker_client.objects.created().len(), 1);
        assert_eq!(watcher_client.objects.created().len(), 1);
        assert_eq!(watcher_client.objects.created()[0].1.y, 2.0);

        assert_eq!(walker.stats().echoes_ignored, 1);
        assert_eq!(watcher.stats().peer_effects, 1);
        assert!(watcher.last_position().is_none());
        assert_eq!(bus.sent().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Ripple lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn ripple_grows_fades_and_is_removed() {
        let bus = LoopbackBus::new();
        let (controller, client) = make_controller(&bus, vec![], 1).await;
        controller.handle_event(peer_event("peer-x", 0.0, 0.0, 0.0));
        settle().await;

        let (handle, _) = client.objects.created().remove(0);
        let updates = client.objects.updates_for(&handle);
        assert!(updates.len() >= 30, "got {} frames", updates.len());

        assert_eq!(updates[0].scale, 0.0);
        assert_eq!(updates[0].opacity, 1.0);
        for pair in updates.windows(2) {
            assert!(pair[1].scale >= pair[0].scale);
        }
        for u in &updates {
            assert!((u.scale + u.opacity - 1.0).abs() < 1e-6);
        }
        let last = updates.last().unwrap();
        assert_eq!(last.scale, 1.0);
        assert_eq!(last.opacity, 0.0);

        assert_eq!(client.objects.removed(), vec![handle.clone()]);
        assert_eq!(client.objects.live_count(), 0);

        settle().await;
        assert_eq!(client.objects.updates_for(&handle).len(), updates.len());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_ripples_run_independently() {
        let bus = LoopbackBus::new();
        let (controller, client) = make_controller(&bus, vec![], 1).await;

        controller.handle_event(peer_event("peer-x", 0.0, 0.0, 0.0));
        tokio::time::sleep(Duration::from_millis(400)).await;
        controller.handle_event(peer_event("peer-y", 4.0, 0.0, 0.0));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(client.objects.live_count(), 2);

        settle().await;
        let created = client.objects.created();
        assert_eq!(created.len(), 2);
        assert_ne!(created[0].0, created[1].0);
        assert_eq!(client.objects.removed().len(), 2);
        assert_eq!(client.objects.live_count(), 0);

        for (handle, _) in &created {
            let last = *client.objects.updates_for(handle).last().unwrap();
            assert_eq!(last.scale, 1.0);
        }
    }

    // -----------------------------------------------------------------------
    // Sound selection
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn sounds_come_from_preloaded_set() {
        let bus = LoopbackBus::new();
        let (controller, client) = make_controller(&bus, vec![], 5).await;
        for i in 0..40 {
            controller.handle_event(peer_event("peer-x", i as f64, 0.0, 0.0));
        }
        settle().await;

        let preloaded: HashSet<_> = client.audio.preloaded().into_iter().collect();
        let played = client.audio.played();
        assert_eq!(played.len(), 40);
        assert!(played.iter().all(|s| preloaded.contains(&s.asset)));

        let distinct: HashSet<_> = played.iter().map(|s| s.asset.clone()).collect();
        assert!(distinct.len() > 1, "40 picks should not all be the same sound");
    }

    #[tokio::test(start_paused = true)]
    async fn seeded_sound_choice_is_reproducible() {
        async fn picks(seed: u64) -> Vec<String> {
            let bus = LoopbackBus::new();
            let (controller, client) = make_controller(&bus, vec![], seed).await;
            for _ in 0..8 {
                controller.handle_event(FootstepEvent::new("peer".into(), Position::zero()));
                // Serialise picks so task scheduling cannot reorder them.
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            settle().await;
            client.audio.played().into_iter().map(|s| s.asset).collect()
        }

        assert_eq!(picks(77).await, picks(77).await);
    }

    #[test]
    fn decoded_peer_message_round_trips_origin() {
        let event = FootstepEvent::new("abc123".into(), Position::new(1.0, 2.0, 3.0));
        let decoded = PeerMessage::decode(&event.encode().unwrap()).unwrap();
        assert_eq!(decoded.into_footstep(), Some(event));
    }
}
