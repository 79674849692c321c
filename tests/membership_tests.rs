use murmur::node::{
    GossipNode, LogicalClock, MembershipChange, MembershipEntry, MembershipMessage,
    MembershipTable, MergeOutcome, NodeId, NodeState, RecordingEvents,
};
use murmur::settings::ProtocolSettings;
use murmur::transport::{EmulatedNetwork, EmulatedTransport};

type TestNode = GossipNode<EmulatedTransport, LogicalClock, RecordingEvents>;

fn id(n: u32) -> NodeId {
    NodeId::new(n, 0)
}

fn protocol(remove_timeout: u64) -> ProtocolSettings {
    ProtocolSettings {
        remove_timeout,
        fail_timeout: 1,
        ..ProtocolSettings::default()
    }
}

fn spawn(network: &EmulatedNetwork, clock: &LogicalClock, n: u32) -> TestNode {
    GossipNode::new(
        id(n),
        protocol(5),
        network.attach(id(n)).unwrap(),
        clock.clone(),
        RecordingEvents::new(),
    )
}

fn ping(n: u32, heartbeat: u64) -> Vec<u8> {
    MembershipMessage::Ping {
        sender: id(n),
        heartbeat,
    }
    .encode()
}

#[test]
fn test_joiner_table_matches_introducer_snapshot() {
    let network = EmulatedNetwork::new();
    let clock = LogicalClock::starting_at(3);
    let mut a = spawn(&network, &clock, 1);
    let mut b = spawn(&network, &clock, 2);
    let _c = spawn(&network, &clock, 3);

    a.start().unwrap();
    a.handle_message(&ping(3, 7)).unwrap();

    clock.set(5);
    b.start().unwrap();
    assert_eq!(b.state(), NodeState::Joining);
    assert_eq!(a.check_messages(), 1);
    let snapshot = a.membership().snapshot();
    assert_eq!(snapshot.len(), 2);

    clock.set(10);
    assert_eq!(b.check_messages(), 1);
    assert!(b.is_member());

    let expected: Vec<(NodeId, u64)> = snapshot
        .iter()
        .filter(|entry| entry.node_id != b.node_id())
        .map(|entry| (entry.node_id, entry.heartbeat))
        .collect();
    let actual: Vec<(NodeId, u64)> = b
        .membership()
        .snapshot()
        .iter()
        .map(|entry| (entry.node_id, entry.heartbeat))
        .collect();
    assert_eq!(actual, expected);
    // Freshness is local: entries are stamped with the joiner's own clock
    assert!(b
        .membership()
        .snapshot()
        .iter()
        .all(|entry| entry.last_updated == 10));
}

#[test]
fn test_joiner_learns_introducer_from_ping() {
    let network = EmulatedNetwork::new();
    let clock = LogicalClock::new();
    let mut a = spawn(&network, &clock, 1);
    let mut b = spawn(&network, &clock, 2);

    a.start().unwrap();
    b.start().unwrap();
    a.tick();
    b.tick();
    assert!(b.is_member());
    assert_eq!(b.membership().get(&id(1)).unwrap().heartbeat, 1);

    clock.advance();
    a.tick();
    b.tick();

    assert_eq!(b.membership().get(&id(1)).unwrap().heartbeat, 2);
    assert_eq!(b.events().count(id(2), id(1), MembershipChange::Added), 1);
    assert_eq!(a.membership().get(&id(2)).unwrap().heartbeat, 1);
}

#[test]
fn test_join_reply_is_idempotent() {
    let network = EmulatedNetwork::new();
    let clock = LogicalClock::starting_at(20);
    let mut b = spawn(&network, &clock, 2);
    b.start().unwrap();

    let reply = MembershipMessage::JoinReply {
        sender: id(1),
        entries: vec![
            MembershipEntry {
                node_id: id(3),
                heartbeat: 4,
                last_updated: 11,
            },
            MembershipEntry {
                node_id: id(4),
                heartbeat: 9,
                last_updated: 12,
            },
        ],
    }
    .encode();

    b.handle_message(&reply).unwrap();
    let once = b.membership().snapshot();

    clock.set(21);
    b.handle_message(&reply).unwrap();
    let twice = b.membership().snapshot();

    assert_eq!(once, twice);
    assert_eq!(b.events().events().len(), 2);

    let mut table = MembershipTable::new(id(2));
    for entry in &once {
        assert_eq!(table.merge(entry.node_id, entry.heartbeat, 20), MergeOutcome::Inserted);
    }
    for entry in &once {
        assert_eq!(table.merge(entry.node_id, entry.heartbeat, 21), MergeOutcome::Ignored);
    }
    assert_eq!(table.snapshot(), once);
}

#[test]
fn test_node_never_stores_itself() {
    let network = EmulatedNetwork::new();
    let clock = LogicalClock::new();
    let mut a = spawn(&network, &clock, 1);
    a.start().unwrap();

    a.handle_message(&ping(1, 50)).unwrap();
    a.handle_message(
        &MembershipMessage::JoinRequest {
            sender: id(1),
            heartbeat: 0,
        }
        .encode(),
    )
    .unwrap();
    a.handle_message(
        &MembershipMessage::JoinReply {
            sender: id(2),
            entries: vec![MembershipEntry {
                node_id: id(1),
                heartbeat: 99,
                last_updated: 0,
            }],
        }
        .encode(),
    )
    .unwrap();
    a.tick();

    assert!(!a.membership().contains(&id(1)));
    assert!(a.membership().is_empty());
}

#[test]
fn test_silent_peer_removed_after_timeout() {
    let mut table = MembershipTable::new(id(4));
    table.merge(id(3), 1, 100);

    assert!(table.sweep_expired(104, 5).is_empty());
    assert!(table.contains(&id(3)));
    assert_eq!(table.sweep_expired(105, 5), vec![id(3)]);
    assert!(table.sweep_expired(106, 5).is_empty());
}

#[test]
fn test_stale_heartbeat_does_not_keep_peer_alive() {
    let network = EmulatedNetwork::new();
    let clock = LogicalClock::starting_at(100);
    let mut d = spawn(&network, &clock, 4);
    let _c = spawn(&network, &clock, 3);
    let _ = network.attach(id(1)).unwrap();
    d.start().unwrap();
    d.handle_message(&ping(3, 10)).unwrap();

    // Replayed and older heartbeats are not signs of life
    clock.set(103);
    d.handle_message(&ping(3, 10)).unwrap();
    d.handle_message(&ping(3, 8)).unwrap();
    assert_eq!(d.membership().get(&id(3)).unwrap().last_updated, 100);

    // D is still joining; promote it with an empty reply so it gossips
    d.handle_message(
        &MembershipMessage::JoinReply {
            sender: id(1),
            entries: Vec::new(),
        }
        .encode(),
    )
    .unwrap();
    clock.set(105);
    d.tick();

    assert!(!d.membership().contains(&id(3)));
    assert_eq!(d.events().count(id(4), id(3), MembershipChange::Removed), 1);
}

#[test]
fn test_three_node_group_converges() {
    let network = EmulatedNetwork::with_reordering(7);
    let clock = LogicalClock::new();
    let mut nodes: Vec<TestNode> = (1..=3).map(|n| spawn(&network, &clock, n)).collect();

    for node in nodes.iter_mut() {
        node.start().unwrap();
    }
    for _ in 0..6 {
        for node in nodes.iter_mut() {
            node.tick();
        }
        clock.advance();
    }

    for node in &nodes {
        assert!(node.is_member());
        let expected: Vec<NodeId> = (1..=3)
            .map(id)
            .filter(|peer| *peer != node.node_id())
            .collect();
        assert_eq!(node.membership().all(), expected);
    }
}
