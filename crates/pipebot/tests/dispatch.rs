//! End-to-end dispatch tests over the in-memory transport.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use pipebot::prelude::*;
use pipebot::runtime::RuntimeError;
use pipebot::transport::OperationKind;
use tokio::sync::{Barrier, Notify};
use tokio::time::{sleep, timeout};

const POLL: Duration = Duration::from_millis(10);
const DEADLINE: Duration = Duration::from_secs(5);

fn message(id: i64, text: &str) -> Message {
    Message::new(id, User::new(id, "Ann"), Chat::private(id), text)
}

async fn wait_for_completed(bot: &Bot, count: u64) {
    timeout(DEADLINE, async {
        while bot.stats().completed() < count {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("events did not complete in time");
}

fn echo() -> FnHandler {
    on_command("/echo").handle_message(|pipe| async move {
        pipe.send_message(pipe.text_without_command(), None).await?;
        Ok(())
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_end_to_end_echo() {
    let (transport, injector) = MemoryTransport::new();
    let bot = BotBuilder::new("helper_bot", transport.clone())
        .handler(echo())
        .build()
        .unwrap();

    let handle = bot.start(POLL);
    injector.inject(message(1, "/echo hello")).unwrap();
    injector.inject(message(2, "no command here")).unwrap();

    wait_for_completed(&bot, 2).await;
    tokio_test::assert_ok!(handle.shutdown().await);

    assert_eq!(transport.sent_texts(), vec!["hello".to_string()]);
    // Typing indicator, then the reply.
    assert_eq!(transport.calls_of(OperationKind::ChatAction).len(), 1);

    let stats = bot.stats();
    assert_eq!(stats.received, 2);
    assert_eq!(stats.handled, 1);
    assert_eq!(stats.unmatched, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_filter_and_listeners_through_run() {
    let (transport, injector) = MemoryTransport::new();
    let post_calls = Arc::new(AtomicUsize::new(0));
    let post = post_calls.clone();

    let bot = BotBuilder::new("foo", transport.clone())
        .filter_by_bot_name(true)
        .pre_listener(|pipe| pipe.sender().id != 666)
        .post_listener(move |_, _| {
            post.fetch_add(1, Ordering::SeqCst);
        })
        .handler(echo())
        .build()
        .unwrap();

    let handle = bot.start(POLL);
    injector.inject(message(1, "/echo@bar not mine")).unwrap();
    injector.inject(message(2, "/echo@foo mine")).unwrap();
    injector.inject(message(666, "/echo banned")).unwrap();
    injector.inject(message(3, "/echo plain")).unwrap();

    wait_for_completed(&bot, 4).await;
    handle.shutdown().await.unwrap();

    let mut texts = transport.sent_texts();
    texts.sort();
    assert_eq!(texts, vec!["mine".to_string(), "plain".to_string()]);

    let stats = bot.stats();
    assert_eq!(stats.filtered, 1);
    assert_eq!(stats.aborted, 1);
    assert_eq!(stats.handled, 2);
    assert_eq!(post_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_events_are_processed_concurrently() {
    const N: usize = 32;

    let (transport, injector) = MemoryTransport::new();
    let barrier = Arc::new(Barrier::new(N));
    let seen = Arc::new(Mutex::new(HashSet::new()));

    let (b, s) = (barrier.clone(), seen.clone());
    let bot = BotBuilder::new("helper_bot", transport)
        .handler(FnHandler::new().handle_message(move |pipe| {
            let (barrier, seen) = (b.clone(), s.clone());
            async move {
                // Only passes once all N handlers are running at the same time.
                barrier.wait().await;
                seen.lock().insert((pipe.message_id(), pipe.text().to_string()));
                Ok(())
            }
        }))
        .build()
        .unwrap();

    let handle = bot.start(POLL);
    for id in 0..N as i64 {
        injector.inject(message(id, &format!("event {id}"))).unwrap();
    }

    wait_for_completed(&bot, N as u64).await;
    handle.shutdown().await.unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), N);
    for id in 0..N as i64 {
        assert!(seen.contains(&(id, format!("event {id}"))));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_max_in_flight_bounds_overlap() {
    const N: u64 = 12;
    const LIMIT: usize = 3;

    let (transport, injector) = MemoryTransport::new();
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let (c, p) = (current.clone(), peak.clone());
    let bot = BotBuilder::new("helper_bot", transport)
        .max_in_flight(LIMIT)
        .handler(FnHandler::new().handle_message(move |_| {
            let (current, peak) = (c.clone(), p.clone());
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(50)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        }))
        .build()
        .unwrap();

    let handle = bot.start(POLL);
    for id in 0..N as i64 {
        injector.inject(message(id, "work")).unwrap();
    }

    wait_for_completed(&bot, N).await;
    handle.shutdown().await.unwrap();

    // The bound is reached, never exceeded.
    assert_eq!(peak.load(Ordering::SeqCst), LIMIT);
    assert_eq!(bot.stats().handled, N);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_is_prompt_and_later_events_are_not_dispatched() {
    const STUCK: usize = 8;

    let (transport, injector) = MemoryTransport::new();
    let started = Arc::new(AtomicUsize::new(0));
    let never = Arc::new(Notify::new());

    let (s, n) = (started.clone(), never.clone());
    let bot = BotBuilder::new("helper_bot", transport)
        .handler(FnHandler::new().handle_message(move |_| {
            let (started, never) = (s.clone(), n.clone());
            async move {
                started.fetch_add(1, Ordering::SeqCst);
                never.notified().await;
                Ok(())
            }
        }))
        .build()
        .unwrap();

    let handle = bot.start(POLL);
    for id in 0..STUCK as i64 {
        injector.inject(message(id, "stuck")).unwrap();
    }

    timeout(DEADLINE, async {
        while started.load(Ordering::SeqCst) < STUCK {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    // Handlers never finish; run must still return once stopped.
    let result = timeout(DEADLINE, handle.shutdown()).await;
    assert!(matches!(result, Ok(Ok(()))));
    assert_eq!(bot.stats().completed(), 0);

    // Events arriving after stop stay queued in the transport.
    for id in 100..104 {
        injector.inject(message(id, "late")).unwrap();
    }
    sleep(Duration::from_millis(50)).await;
    assert_eq!(started.load(Ordering::SeqCst), STUCK);
    assert_eq!(bot.stats().received, STUCK as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_listen_failure_surfaces_from_run() {
    let (transport, _injector) = MemoryTransport::new();
    let first = BotBuilder::new("one", transport.clone()).build().unwrap();
    let second = BotBuilder::new("two", transport).build().unwrap();

    let handle = first.start(POLL);
    sleep(Duration::from_millis(20)).await;

    // The memory transport only supports one listener at a time.
    let result = timeout(DEADLINE, second.run(POLL, CancellationToken::new())).await;
    assert!(matches!(result, Ok(Err(RuntimeError::Transport(_)))));

    handle.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_callbacks_reach_on_callback() {
    let (transport, injector) = MemoryTransport::new();
    let bot = BotBuilder::new("helper_bot", transport.clone())
        .handler(
            on_callback_prefix("vote:").handle_callback(|pipe| async move {
                let choice = pipe.callback_data().unwrap_or_default().to_string();
                pipe.answer_callback(&format!("voted {choice}"), false)
                    .await?;
                pipe.edit_message_text("thanks", None).await?;
                Ok(())
            }),
        )
        .build()
        .unwrap();

    let handle = bot.start(POLL);
    let menu = message(5, "pick one");
    injector
        .inject(Callback::new("cb-1", User::new(9, "Bob"), menu, "vote:yes"))
        .unwrap();

    wait_for_completed(&bot, 1).await;
    handle.shutdown().await.unwrap();

    assert_eq!(transport.calls_of(OperationKind::AnswerCallback).len(), 1);
    assert_eq!(transport.calls_of(OperationKind::EditMessageText).len(), 1);
    assert_eq!(bot.stats().handled, 1);
}
