use murmur::error::ProtocolError;
use murmur::node::{MembershipEntry, MembershipMessage, MembershipTable, MessageType, NodeId};
use proptest::prelude::*;

fn node_id() -> impl Strategy<Value = NodeId> {
    (any::<u32>(), any::<u16>()).prop_map(|(host, port)| NodeId::new(host, port))
}

fn entry() -> impl Strategy<Value = MembershipEntry> {
    (node_id(), any::<u64>(), any::<u64>()).prop_map(|(node_id, heartbeat, last_updated)| {
        MembershipEntry {
            node_id,
            heartbeat,
            last_updated,
        }
    })
}

fn message() -> impl Strategy<Value = MembershipMessage> {
    prop_oneof![
        (node_id(), any::<u64>())
            .prop_map(|(sender, heartbeat)| MembershipMessage::JoinRequest { sender, heartbeat }),
        (node_id(), prop::collection::vec(entry(), 0..16))
            .prop_map(|(sender, entries)| MembershipMessage::JoinReply { sender, entries }),
        (node_id(), any::<u64>())
            .prop_map(|(sender, heartbeat)| MembershipMessage::Ping { sender, heartbeat }),
    ]
}

proptest! {
    #[test]
    fn test_codec_round_trip_property(message in message()) {
        let encoded = message.encode();
        prop_assert_eq!(encoded.len(), message.encoded_len());
        prop_assert_eq!(MembershipMessage::decode(&encoded).unwrap(), message);
    }

    #[test]
    fn test_short_buffer_is_truncated_property(
        message in message(),
        cut in 0usize..16
    ) {
        let encoded = message.encode();
        let min = message.message_type().min_len();
        let len = cut.min(min - 1);
        let result = MembershipMessage::decode(&encoded[..len]);
        let is_truncated = matches!(result, Err(ProtocolError::TruncatedMessage { .. }));
        prop_assert!(is_truncated);
    }

    #[test]
    fn test_reply_ignores_partial_trailing_entry_property(
        sender in node_id(),
        entries in prop::collection::vec(entry(), 0..8),
        extra in 1usize..22
    ) {
        let message = MembershipMessage::JoinReply { sender, entries };
        let mut encoded = message.encode();
        encoded.extend(std::iter::repeat(0xAB).take(extra));
        prop_assert_eq!(MembershipMessage::decode(&encoded).unwrap(), message);
    }

    #[test]
    fn test_merge_monotonicity_property(
        merges in prop::collection::vec((0u64..50, 0u64..1000), 1..40)
    ) {
        let owner = NodeId::new(1, 0);
        let peer = NodeId::new(2, 0);
        let mut table = MembershipTable::new(owner);

        let mut max_heartbeat = None::<u64>;
        let mut refreshed_at = 0;
        for (heartbeat, now) in merges {
            table.merge(peer, heartbeat, now);
            if max_heartbeat.map_or(true, |max| heartbeat > max) {
                max_heartbeat = Some(heartbeat);
                refreshed_at = now;
            }

            let stored = table.get(&peer).unwrap();
            prop_assert_eq!(Some(stored.heartbeat), max_heartbeat);
            prop_assert_eq!(stored.last_updated, refreshed_at);
        }
    }

    #[test]
    fn test_eviction_liveness_property(
        last_seen in 0u64..10_000,
        remove_timeout in 1u64..100,
        late_by in 0u64..100
    ) {
        let mut table = MembershipTable::new(NodeId::new(1, 0));
        let peer = NodeId::new(2, 0);
        table.merge(peer, 1, last_seen);

        prop_assert!(table.sweep_expired(last_seen + remove_timeout - 1, remove_timeout).is_empty());
        prop_assert_eq!(
            table.sweep_expired(last_seen + remove_timeout + late_by, remove_timeout),
            vec![peer]
        );
        prop_assert!(table.sweep_expired(last_seen + remove_timeout + late_by + 1, remove_timeout).is_empty());
        prop_assert!(!table.contains(&peer));
    }

    #[test]
    fn test_owner_never_stored_property(
        owner in node_id(),
        merges in prop::collection::vec((any::<u64>(), 0u64..100), 1..10)
    ) {
        let mut table = MembershipTable::new(owner);
        for (heartbeat, now) in merges {
            table.merge(owner, heartbeat, now);
            table.merge(NodeId::NULL, heartbeat, now);
        }
        prop_assert!(table.is_empty());
    }

    #[test]
    fn test_unknown_tag_rejected_property(
        tag in 3u8..=255,
        tail in prop::collection::vec(any::<u8>(), 0..40)
    ) {
        let mut data = vec![tag];
        data.extend(tail);
        prop_assert_eq!(
            MembershipMessage::decode(&data),
            Err(ProtocolError::UnknownMessageType(tag))
        );
    }
}

#[test]
fn test_minimum_lengths() {
    assert_eq!(MessageType::JoinRequest.min_len(), 16);
    assert_eq!(MessageType::Ping.min_len(), 16);
    assert_eq!(MessageType::JoinReply.min_len(), 7);
    assert_eq!(
        MembershipMessage::decode(&[]),
        Err(ProtocolError::TruncatedMessage { len: 0, min: 1 })
    );
}
