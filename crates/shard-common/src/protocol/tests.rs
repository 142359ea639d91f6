//! Tests for the protocol module
//!
//! These cover the intent codec, query coercion, wire encoding of the gateway
//! messages and the epoch schema.

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::protocol::gateway::{procedure_path, QueryResponse, SendCommandRequest};
    use prost::Message;
    use serde_json::json;

    fn parse(args: &[&str]) -> Result<Intent> {
        Intent::parse(args)
    }

    // ------------------------------------------------------------------
    // Intent codec
    // ------------------------------------------------------------------

    #[test]
    fn test_create_player_payload() {
        let intent = parse(&["create-player", "alice"]).unwrap();
        assert_eq!(
            intent,
            Intent::CreatePlayer {
                nickname: "alice".to_string()
            }
        );
        assert_eq!(json!(intent.payload()), json!({"nickname": "alice"}));
    }

    #[test]
    fn test_attack_player_payload() {
        let payload =
            create_message_payload("attack-player", &["attack-player", "bob", "150"]).unwrap();
        assert_eq!(json!(payload), json!({"target": "bob", "damage": 150}));
    }

    #[test]
    fn test_attack_player_missing_damage_is_usage_error() {
        let err = parse(&["attack-player", "bob"]).unwrap_err();
        assert!(matches!(err, ShardError::InvalidUsage(_)));
        assert_eq!(err.to_string(), "usage: shard attack-player <target> <damage>");
    }

    #[test]
    fn test_attack_player_damage_bounds() {
        let max = parse(&["attack-player", "bob", "4294967295"]).unwrap();
        assert_eq!(
            max,
            Intent::AttackPlayer {
                target: "bob".to_string(),
                damage: u32::MAX
            }
        );

        for bad in [
            "4294967296",
            "-1",
            "+150",
            "+0",
            "ten",
            "",
            "1.5",
            "99999999999999999999999",
        ] {
            let err = parse(&["attack-player", "bob", bad]).unwrap_err();
            assert!(
                matches!(err, ShardError::InvalidArgument(_)),
                "expected InvalidArgument for {:?}, got {:?}",
                bad,
                err
            );
        }
    }

    #[test]
    fn test_arity_errors_name_the_command() {
        let cases: &[&[&str]] = &[
            &["create-player"],
            &["create-player", "a", "b"],
            &["attack-player"],
            &["attack-player", "a", "1", "2"],
            &["call-external"],
            &["query"],
            &["listen"],
            &["subscribe", "a", "b"],
            &["unsubscribe"],
            &["stream-epoch", "extra"],
        ];

        for args in cases {
            let err = parse(args).unwrap_err();
            match err {
                ShardError::InvalidUsage(msg) => {
                    assert!(msg.contains(args[0]), "usage '{}' should name {}", msg, args[0]);
                    assert!(msg.starts_with("usage: "));
                }
                other => panic!("expected InvalidUsage for {:?}, got {:?}", args, other),
            }
        }
    }

    #[test]
    fn test_empty_args_print_full_usage() {
        let err = parse(&[]).unwrap_err();
        match err {
            ShardError::InvalidUsage(msg) => {
                assert!(msg.starts_with("Usage:"));
                assert!(msg.contains("stream-epoch"));
                assert!(msg.contains("debug-log"));
            }
            other => panic!("expected InvalidUsage, got {:?}", other),
        }
    }

    #[test]
    fn test_event_intents() {
        assert_eq!(
            parse(&["listen", "player-death"]).unwrap(),
            Intent::Listen {
                event: "player-death".to_string()
            }
        );
        assert_eq!(
            parse(&["subscribe", "new-player"]).unwrap(),
            Intent::Subscribe {
                event: "new-player".to_string()
            }
        );
        let unsub = parse(&["unsubscribe", "new-player"]).unwrap();
        assert_eq!(json!(unsub.payload()), json!({"event": "new-player"}));
        assert!(unsub.to_command().is_none());
    }

    #[test]
    fn test_stream_epoch_has_empty_payload() {
        let intent = parse(&["stream-epoch"]).unwrap();
        assert_eq!(intent, Intent::StreamEpoch);
        assert!(intent.payload().is_empty());
    }

    #[test]
    fn test_query_intent_is_free_form() {
        let raw = r#"{"find":["Health"],"match":"exact","where":"","extra":1}"#;
        let intent = parse(&["query", raw]).unwrap();
        let payload = intent.payload();
        assert_eq!(payload.get("extra"), Some(&json!(1)));
    }

    #[test]
    fn test_query_malformed_json() {
        let err = parse(&["query", "{not json"]).unwrap_err();
        assert!(matches!(err, ShardError::InvalidArgument(_)));

        let err = parse(&["query", "[1, 2]"]).unwrap_err();
        assert!(matches!(err, ShardError::InvalidArgument(_)));
    }

    #[test]
    fn test_generic_command_forwarded() {
        let intent = parse(&["debug-log"]).unwrap();
        let command = intent.to_command().unwrap();
        assert_eq!(command.name, "debug-log");
        assert!(command.payload.is_empty());

        let intent = parse(&["heal-player", "target=bob", "amount=5"]).unwrap();
        assert_eq!(intent.command_type(), "heal-player");
        assert_eq!(json!(intent.payload()), json!({"target": "bob", "amount": "5"}));
    }

    #[test]
    fn test_generic_command_rejects_bare_token() {
        let err = parse(&["heal-player", "bob"]).unwrap_err();
        assert!(matches!(err, ShardError::InvalidArgument(_)));
    }

    #[test]
    fn test_fixed_commands_become_commands() {
        let command = parse(&["call-external", "hi"]).unwrap().to_command().unwrap();
        assert_eq!(command.name, "call-external");
        assert_eq!(json!(command.payload), json!({"message": "hi"}));
        assert!(parse(&["stream-epoch"]).unwrap().to_command().is_none());
    }

    #[test]
    fn test_usage_errors_are_usage_class() {
        assert!(parse(&["create-player"]).unwrap_err().is_usage());
        assert!(parse(&["attack-player", "a", "x"]).unwrap_err().is_usage());
        assert!(!ShardError::Transport("down".into()).is_usage());
    }

    // ------------------------------------------------------------------
    // Query coercion
    // ------------------------------------------------------------------

    #[test]
    fn test_query_from_payload_exact() {
        let raw = r#"{"find":["Health"],"match":"exact","where":""}"#;
        let intent = parse(&["query", raw]).unwrap();
        let query = Query::from_payload(&intent.payload()).unwrap();
        assert_eq!(
            query,
            Query {
                find: vec!["Health".to_string()],
                match_: Match::Exact,
                where_: String::new(),
            }
        );
    }

    #[test]
    fn test_match_mapping() {
        assert_eq!(Match::from_user("exact"), Match::Exact);
        assert_eq!(Match::from_user("contains"), Match::Contains);
        for other in ["", "EXACT", "Contains", "fuzzy", "exact "] {
            assert_eq!(Match::from_user(other), Match::Unspecified);
        }
    }

    #[test]
    fn test_query_defaults_when_fields_missing() {
        let intent = parse(&["query", "{}"]).unwrap();
        let query = Query::from_payload(&intent.payload()).unwrap();
        assert_eq!(query, Query::default());
    }

    #[test]
    fn test_query_wrong_field_types() {
        for raw in [
            r#"{"find":"Health"}"#,
            r#"{"find":[1]}"#,
            r#"{"match":3}"#,
            r#"{"where":false}"#,
        ] {
            let intent = parse(&["query", raw]).unwrap();
            let err = Query::from_payload(&intent.payload()).unwrap_err();
            assert!(matches!(err, ShardError::InvalidArgument(_)), "{}", raw);
        }
    }

    // ------------------------------------------------------------------
    // Wire encoding
    // ------------------------------------------------------------------

    #[test]
    fn test_query_wire_encoding() {
        let query = Query {
            find: vec!["Health".to_string(), "PlayerTag".to_string()],
            match_: Match::Contains,
            where_: "Health.HP > 0".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({
                "find": ["Health", "PlayerTag"],
                "match": "MATCH_CONTAINS",
                "where": "Health.HP > 0"
            })
        );
    }

    #[test]
    fn test_send_command_wire_encoding() {
        let request = SendCommandRequest {
            address: ServiceAddress::default(),
            command: parse(&["create-player", "alice"]).unwrap().to_command().unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "address": {
                    "realm": "REALM_WORLD",
                    "organization": "organization",
                    "project": "project",
                    "serviceId": "service"
                },
                "command": {"name": "create-player", "payload": {"nickname": "alice"}}
            })
        );
    }

    #[test]
    fn test_query_response_tolerates_omitted_fields() {
        let empty: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.results.entities.is_empty());

        let some: QueryResponse =
            serde_json::from_str(r#"{"results":{"entities":[{"Health":{"HP":100}}]}}"#).unwrap();
        assert_eq!(some.results.entities.len(), 1);
    }

    #[test]
    fn test_procedure_path() {
        assert_eq!(procedure_path("Query"), "/gateway.v1.ShardService/Query");
    }

    // ------------------------------------------------------------------
    // Addressing
    // ------------------------------------------------------------------

    #[test]
    fn test_epoch_names() {
        let address = ServiceAddress::new(Realm::World, "argus", "rampage", "shard-1");
        assert_eq!(address.epoch_stream_name(), "argus_rampage_shard-1_epoch");
        assert_eq!(address.epoch_subject(), "world.argus.rampage.shard-1.epoch");
    }

    // ------------------------------------------------------------------
    // Epoch schema
    // ------------------------------------------------------------------

    #[test]
    fn test_epoch_decode_and_render() {
        let epoch = Epoch {
            epoch_height: 7,
            tick_height: 70,
            hash: vec![1, 2, 3],
            ticks: vec![Tick {
                tick_height: 70,
                timestamp_unix_nanos: 1_700_000_000_000_000_000,
                commands: vec![TickCommand {
                    name: "create-player".to_string(),
                    persona: String::new(),
                    payload: b"{}".to_vec(),
                }],
            }],
        };

        let decoded = Epoch::from_bytes(&epoch.encode_to_vec()).unwrap();
        assert_eq!(decoded, epoch);

        let rendered = decoded.to_json();
        assert_eq!(rendered["epochHeight"], "7");
        assert_eq!(rendered["hash"], "AQID");
        assert_eq!(rendered["ticks"][0]["commands"][0]["persona"], "");
        assert!(decoded.render().contains('\n'));
    }

    #[test]
    fn test_epoch_render_shows_default_fields() {
        let rendered = Epoch::default().to_json();
        assert_eq!(
            rendered,
            json!({"epochHeight": "0", "tickHeight": "0", "hash": "", "ticks": []})
        );
    }

    #[test]
    fn test_epoch_decode_failure() {
        let err = Epoch::from_bytes(&[0xff, 0xff, 0xff]).unwrap_err();
        assert!(matches!(err, ShardError::Decode(_)));
    }
}
