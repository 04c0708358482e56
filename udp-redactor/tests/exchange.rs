//! End-to-end tests: a real [`Server`] and client channels on loopback.

use std::time::Duration;

use udp_redactor::client::{self, Reply};
use udp_redactor::server::{Outcome, Server, ECHO_PAYLOAD};
use udp_redactor::{ChannelConfig, FrameCodec, MessageError, PeerIdentity, ReliableChannel, SessionConfig};

fn fast(codec: FrameCodec) -> ChannelConfig {
    ChannelConfig {
        ack_timeout: Duration::from_millis(100),
        receive_timeout: Duration::from_millis(1000),
        codec,
        ..ChannelConfig::default()
    }
}

async fn server(codec: FrameCodec) -> (Server, PeerIdentity) {
    let server = Server::bind("127.0.0.1:0".parse().unwrap(), fast(codec), SessionConfig::default())
        .await
        .expect("bind server");
    let addr = PeerIdentity::from(server.local_addr());
    (server, addr)
}

async fn client(codec: FrameCodec) -> (ReliableChannel, PeerIdentity) {
    let chan = ReliableChannel::bind("127.0.0.1:0".parse().unwrap(), fast(codec))
        .await
        .expect("bind client");
    let addr = PeerIdentity::from(chan.local_addr());
    (chan, addr)
}

/// Second half of an exchange: send the keyword and collect the reply.
async fn finish(
    chan: &mut ReliableChannel,
    server: PeerIdentity,
    keyword: &str,
) -> Result<Vec<String>, MessageError> {
    chan.send_message(keyword, server).await?;
    let redacted = chan.receive_message_from(server).await?;
    let count = chan.receive_message_from(server).await?;
    let n: usize = count.parse().expect("numeric count");
    let mut reply = vec![redacted, count];
    for _ in 0..n {
        reply.push(chan.receive_message_from(server).await?);
    }
    Ok(reply)
}

async fn exchange_with_running_server(codec: FrameCodec, phrase: &str, keyword: &str) -> Reply {
    let (mut server, server_addr) = server(codec).await;
    let handle = tokio::spawn(async move { server.run().await });

    let (mut chan, _) = client(codec).await;
    let reply = tokio::time::timeout(
        Duration::from_secs(10),
        client::run_exchange(&mut chan, server_addr, phrase, keyword),
    )
    .await
    .expect("exchange timed out")
    .expect("exchange failed");

    handle.abort();
    reply
}

#[tokio::test]
async fn redacts_and_echoes_per_match() {
    let reply = exchange_with_running_server(FrameCodec::Text, "the cat sat on the mat.", "the").await;

    assert_eq!(reply.redacted, "XXX cat sat on XXX mat.");
    assert_eq!(reply.count, 2);
    assert_eq!(reply.echoes, vec![ECHO_PAYLOAD.to_string(); 2]);
}

#[tokio::test]
async fn no_match_sends_zero_and_no_echoes() {
    let reply = exchange_with_running_server(FrameCodec::Text, "the cat sat on the mat.", "dog").await;

    assert_eq!(reply.redacted, "the cat sat on the mat.");
    assert_eq!(reply.count, 0);
    assert!(reply.echoes.is_empty());
}

#[tokio::test]
async fn long_phrase_spans_many_fragments() {
    let phrase = "Hello, world! hello again. Say HELLO? hello";
    let reply = exchange_with_running_server(FrameCodec::Text, phrase, "hello").await;

    assert_eq!(reply.redacted, "XXXXX, world! XXXXX again. Say XXXXX? XXXXX");
    assert_eq!(reply.count, 4);
    assert_eq!(reply.echoes.len(), 4);
}

#[tokio::test]
async fn tagged_frames_carry_protocol_lookalikes() {
    let reply = exchange_with_running_server(FrameCodec::Tagged, "ACK Packets:3 ACK", "ack").await;

    assert_eq!(reply.redacted, "XXX Packets:3 XXX");
    assert_eq!(reply.count, 2);
}

/// In the plain-text format a receiver still takes a datagram reading
/// `ACK` as data, so the keyword itself may be `ACK`.
#[tokio::test]
async fn text_frames_carry_ack_keyword() {
    let reply = exchange_with_running_server(FrameCodec::Text, "please ACK this", "ACK").await;

    assert_eq!(reply.redacted, "please XXX this");
    assert_eq!(reply.count, 1);
    assert_eq!(reply.echoes, [ECHO_PAYLOAD]);
}

/// The last 20-byte fragment of this phrase is exactly `ACK`.
#[tokio::test]
async fn text_fragment_reading_ack_is_delivered() {
    let phrase = "aaaaaaaaaaaaaaaaaaaaACK";
    let reply = exchange_with_running_server(FrameCodec::Text, phrase, "x").await;

    assert_eq!(reply.redacted, phrase);
    assert_eq!(reply.count, 0);
}

/// A client that announces a message and vanishes costs only its own
/// exchange; the next client is served normally.
#[tokio::test]
async fn server_survives_abandoned_exchange() {
    let (mut server, server_addr) = server(FrameCodec::Text).await;
    let quitter = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let quitter_addr = PeerIdentity::from(quitter.local_addr().unwrap());

    quitter.send_to(b"Packets:3", server_addr.addr()).await.unwrap();
    match server.serve_one().await {
        Outcome::Aborted { peer, .. } => assert_eq!(peer, Some(quitter_addr)),
        other => panic!("expected Aborted, got {other:?}"),
    }

    let (mut chan, chan_addr) = client(FrameCodec::Text).await;
    let (outcome, sent) = tokio::join!(server.serve_one(), chan.send_message("still here", server_addr));
    sent.unwrap();
    assert_eq!(outcome, Outcome::Stored { peer: chan_addr });
}

/// Two clients interleave their phrase and keyword; each gets a reply built
/// from its own phrase.
#[tokio::test]
async fn sessions_are_isolated_per_peer() {
    let (mut server, server_addr) = server(FrameCodec::Text).await;
    let (mut a, a_addr) = client(FrameCodec::Text).await;
    let (mut b, b_addr) = client(FrameCodec::Text).await;

    let (outcome, sent) = tokio::join!(server.serve_one(), a.send_message("alpha beta", server_addr));
    sent.unwrap();
    assert_eq!(outcome, Outcome::Stored { peer: a_addr });

    let (outcome, sent) = tokio::join!(server.serve_one(), b.send_message("beta gamma", server_addr));
    sent.unwrap();
    assert_eq!(outcome, Outcome::Stored { peer: b_addr });
    assert_eq!(server.sessions().len(), 2);

    let (outcome, reply) = tokio::join!(server.serve_one(), finish(&mut a, server_addr, "beta"));
    assert_eq!(outcome, Outcome::Replied { peer: a_addr, matches: 1 });
    assert_eq!(reply.unwrap(), ["alpha XXXX", "1", ECHO_PAYLOAD]);
    assert_eq!(server.sessions().len(), 1);

    let (outcome, reply) = tokio::join!(server.serve_one(), finish(&mut b, server_addr, "gamma"));
    assert_eq!(outcome, Outcome::Replied { peer: b_addr, matches: 1 });
    assert_eq!(reply.unwrap(), ["beta XXXXX", "1", ECHO_PAYLOAD]);
    assert!(server.sessions().is_empty());
}

/// After a completed exchange the same peer starts over with a new phrase.
#[tokio::test]
async fn peer_can_run_a_second_exchange() {
    let (mut server, server_addr) = server(FrameCodec::Text).await;
    let (mut chan, chan_addr) = client(FrameCodec::Text).await;

    for (phrase, keyword, expected) in [("one two", "two", "one XXX"), ("red fish", "red", "XXX fish")] {
        let (outcome, sent) = tokio::join!(server.serve_one(), chan.send_message(phrase, server_addr));
        sent.unwrap();
        assert_eq!(outcome, Outcome::Stored { peer: chan_addr });

        let (outcome, reply) = tokio::join!(server.serve_one(), finish(&mut chan, server_addr, keyword));
        assert!(matches!(outcome, Outcome::Replied { matches: 1, .. }));
        assert_eq!(reply.unwrap()[0], expected);
    }
}
