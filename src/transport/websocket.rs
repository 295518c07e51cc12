use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::broker::message::Message;
use crate::session::Session;
use crate::stats::Stats;
use crate::transport::context::AppContext;
use crate::transport::message::{ClientMessage, ServerMessage};

/// Send one frame to a session, ignoring a torn-down connection.
fn reply(session: &Session, frame: &ServerMessage) {
    match serde_json::to_string(frame) {
        Ok(json) => {
            let _ = session.sender.send(WsMessage::text(json));
        }
        Err(e) => warn!("failed to serialize reply: {e}"),
    }
}

/// Dispatch one parsed client frame against the component graph.
///
/// Broker and gateway calls are synchronous; the broker lock is never held
/// across an await point.
pub fn handle_client_message(ctx: &AppContext, session: &Session, msg: ClientMessage) {
    match msg {
        ClientMessage::Ingest {
            channel_id,
            credential,
            reading,
        } => match ctx.gateway.ingest(&channel_id, &credential, &reading) {
            Ok(reading) => reply(session, &ServerMessage::Ingested { reading }),
            Err(e) => reply(
                session,
                &ServerMessage::Rejected {
                    reason: e.reason().to_string(),
                    detail: e.to_string(),
                },
            ),
        },

        ClientMessage::Publish {
            topic,
            payload,
            message_id,
            qos,
            retain,
        } => {
            let msg = Message {
                topic,
                payload,
                timestamp: 0,
                message_id: message_id.unwrap_or_default(),
                qos: qos.unwrap_or(0),
                retain: retain.unwrap_or(false),
            };
            let mut broker = ctx.broker.lock().unwrap();
            if let Err(e) = broker.publish(Some(&session.id), msg) {
                drop(broker);
                reply(session, &ServerMessage::Error { message: e.to_string() });
            }
        }

        ClientMessage::Subscribe { topic, qos } => {
            let result = {
                let mut broker = ctx.broker.lock().unwrap();
                broker.subscribe(&session.id, &topic, qos.unwrap_or(0))
            };
            match result {
                Ok(granted_qos) => {
                    debug!("{} subscribed to {} (qos {})", session.id, topic, granted_qos);
                    reply(session, &ServerMessage::SubAck { topic, granted_qos });
                }
                Err(e) => reply(session, &ServerMessage::Error { message: e.to_string() }),
            }
        }

        ClientMessage::Unsubscribe { topic } => {
            let mut broker = ctx.broker.lock().unwrap();
            broker.unsubscribe(&session.id, &topic);
        }

        ClientMessage::Ack { message_id } => {
            ctx.broker.lock().unwrap().handle_ack(&session.id, &message_id);
        }
        ClientMessage::PubRec { message_id } => {
            ctx.broker.lock().unwrap().handle_pubrec(&session.id, &message_id);
        }
        ClientMessage::PubRel { message_id } => {
            ctx.broker.lock().unwrap().handle_pubrel(&session.id, &message_id);
        }
        ClientMessage::PubComp { message_id } => {
            ctx.broker.lock().unwrap().handle_pubcomp(&session.id, &message_id);
        }

        ClientMessage::Join {
            channel_id,
            credential,
        } => {
            if !ctx.directory.exists(&channel_id) {
                reply(session, &ServerMessage::Error { message: "unknown channel".to_string() });
                return;
            }
            let authorized = ctx.directory.is_public(&channel_id)
                || credential
                    .as_deref()
                    .is_some_and(|c| ctx.directory.validate_read_credential(&channel_id, c));
            if !authorized {
                reply(session, &ServerMessage::Error { message: "unauthorized".to_string() });
                return;
            }
            ctx.fanout.join(session, &channel_id);
            reply(session, &ServerMessage::Joined { channel_id });
        }

        ClientMessage::Leave { channel_id } => {
            ctx.fanout.leave(&session.id, &channel_id);
        }

        ClientMessage::Stats {} => {
            reply(session, &ServerMessage::Stats { stats: ctx.stats.snapshot() });
        }
    }
}

pub async fn start_websocket_server(addr: String, ctx: AppContext) {
    let listener = TcpListener::bind(addr.clone()).await.expect("Can't bind");

    info!("WebSocket server listening on ws://{addr}");

    while let Ok((stream, _)) = listener.accept().await {
        let ctx = ctx.clone();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake error: {e}");
                    return;
                }
            };
            let (mut ws_sender, mut ws_receiver) = ws_stream.split();

            let at_capacity = {
                let broker = ctx.broker.lock().unwrap();
                broker.session_count() >= ctx.settings.broker.max_connections
            };
            if at_capacity {
                warn!("rejecting connection: max_connections reached");
                let frame = ServerMessage::Error { message: "server full".to_string() };
                if let Ok(json) = serde_json::to_string(&frame) {
                    let _ = ws_sender.send(WsMessage::text(json)).await;
                }
                return;
            }

            let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
            let session = Session::new(tx);
            let session_id = session.id.clone();

            {
                let mut broker = ctx.broker.lock().unwrap();
                broker.register_session(session.clone());
            }
            Stats::incr(&ctx.stats.sessions_connected);

            let cleanup_called = Arc::new(AtomicBool::new(false));

            let do_cleanup = {
                let ctx = ctx.clone();
                let session_id = session_id.clone();
                let cleanup_called = cleanup_called.clone();

                move || {
                    if !cleanup_called.swap(true, Ordering::SeqCst) {
                        // Rooms first, so no emit after this point can
                        // observe the dead connection.
                        ctx.fanout.cleanup_connection(&session_id);
                        ctx.broker.lock().unwrap().cleanup_session(&session_id);
                        Stats::decr(&ctx.stats.sessions_connected);
                    }
                }
            };

            {
                let session_id = session_id.clone();
                let do_cleanup = do_cleanup.clone();

                spawn(async move {
                    while let Some(msg) = rx.recv().await {
                        if let Err(e) = ws_sender.send(msg).await {
                            debug!("failed to send message to {session_id}: {e}");
                            break;
                        }
                    }

                    do_cleanup();
                    debug!("send loop closed for {session_id}");
                });
            }

            while let Some(Ok(msg)) = ws_receiver.next().await {
                if msg.is_text() {
                    let text = msg.to_text().unwrap();
                    match serde_json::from_str::<ClientMessage>(text) {
                        Ok(parsed) => handle_client_message(&ctx, &session, parsed),
                        Err(err) => {
                            warn!("invalid client message from {session_id}: {err}");
                            reply(
                                &session,
                                &ServerMessage::Error {
                                    message: "unreadable frame".to_string(),
                                },
                            );
                        }
                    }
                }
            }

            info!("{session_id} disconnected");
            do_cleanup();
        });
    }
}
