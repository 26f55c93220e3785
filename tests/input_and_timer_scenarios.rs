// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! End-to-end coverage of the input widget, key routing, timers, and
//! animations, driven through a scripted terminal.

use kotter::*;
use pretty_assertions::assert_eq;
use std::{sync::{Arc, Mutex},
          time::Duration};

fn new_session() -> (Session, TestTerminalHandle) {
    let (terminal, handle) = TestTerminal::new();
    let session = Session::try_new(terminal).unwrap();
    (session, handle)
}

/// Run an input-widget section: render `"> "` + the widget, feed `script`
/// after the first paint, press Enter, and return what the enter handler
/// received.
async fn run_input_script(
    script: impl FnOnce(&TestTerminalHandle) + Send + 'static,
) -> String {
    let (session, handle) = new_session();
    let entered: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let section = session.section(|scope| {
        scope.text("> ");
        scope.input(InputOptions::default());
    });

    let entered_for_callback = entered.clone();
    let handle_for_run = handle.clone();
    section
        .run_with(move |run| async move {
            let run_for_callback = run.clone();
            run.on_input_entered(move |scope| {
                *entered_for_callback.lock().unwrap() = Some(scope.input.clone());
                run_for_callback.signal();
            });
            handle_for_run.wait_for_writes(1).await;
            script(&handle_for_run);
            handle_for_run.send_key(Key::Enter);
            run.wait_for_signal().await;
            Ok(())
        })
        .await
        .unwrap();

    let result = entered.lock().unwrap().clone();
    result.unwrap_or_default()
}

#[tokio::test]
async fn test_input_typing() {
    let entered = run_input_script(|handle| handle.send_text("hello")).await;
    assert_eq!(entered, "hello");
}

#[tokio::test]
async fn test_backspace_at_start_is_a_noop() {
    let entered = run_input_script(|handle| {
        handle.send_text("ab");
        handle.send_key(Key::Home);
        handle.send_key(Key::Backspace);
        handle.send_key(Key::Backspace);
    })
    .await;
    assert_eq!(entered, "ab");
}

#[tokio::test]
async fn test_delete_at_end_is_a_noop() {
    let entered = run_input_script(|handle| {
        handle.send_text("ab");
        handle.send_key(Key::Delete);
    })
    .await;
    assert_eq!(entered, "ab");
}

#[tokio::test]
async fn test_cursor_editing() {
    let entered = run_input_script(|handle| {
        handle.send_text("ac");
        handle.send_key(Key::Left);
        handle.send_text("b");
        // "abc" with the cursor between b and c; delete the c.
        handle.send_key(Key::Delete);
        handle.send_key(Key::End);
        handle.send_text("!");
    })
    .await;
    assert_eq!(entered, "ab!");
}

#[tokio::test]
async fn test_backspace_deletes_before_cursor() {
    let entered = run_input_script(|handle| {
        handle.send_text("abc");
        handle.send_key(Key::Left);
        handle.send_key(Key::Backspace);
    })
    .await;
    assert_eq!(entered, "ac");
}

#[tokio::test]
async fn test_completion_acceptance_with_right_at_end() {
    let (session, handle) = new_session();
    let entered: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let section = session.section(|scope| {
        scope.input(InputOptions::with_completer(Completions::new([
            "yellow", "yes",
        ])));
    });

    let entered_for_callback = entered.clone();
    let handle_for_run = handle.clone();
    section
        .run_with(move |run| async move {
            let run_for_callback = run.clone();
            run.on_input_entered(move |scope| {
                *entered_for_callback.lock().unwrap() = Some(scope.input.clone());
                run_for_callback.signal();
            });
            handle_for_run.wait_for_writes(1).await;
            handle_for_run.send_text("ye");
            handle_for_run.send_key(Key::Right);
            handle_for_run.send_key(Key::Enter);
            run.wait_for_signal().await;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(entered.lock().unwrap().as_deref(), Some("yellow"));
}

#[tokio::test]
async fn test_on_input_changed_can_reject() {
    let (session, handle) = new_session();
    let entered: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let section = session.section(|scope| {
        scope.input(InputOptions::default());
    });

    let entered_for_callback = entered.clone();
    let handle_for_run = handle.clone();
    section
        .run_with(move |run| async move {
            run.on_input_changed(|scope| {
                if scope.input.chars().any(|ch| ch.is_ascii_digit()) {
                    scope.reject_input();
                }
            });
            let run_for_callback = run.clone();
            run.on_input_entered(move |scope| {
                *entered_for_callback.lock().unwrap() = Some(scope.input.clone());
                run_for_callback.signal();
            });
            handle_for_run.wait_for_writes(1).await;
            handle_for_run.send_text("a1b2c");
            handle_for_run.send_key(Key::Enter);
            run.wait_for_signal().await;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(entered.lock().unwrap().as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_on_input_changed_can_rewrite() {
    let (session, handle) = new_session();
    let entered: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

    let section = session.section(|scope| {
        scope.input(InputOptions::default());
    });

    let entered_for_callback = entered.clone();
    let handle_for_run = handle.clone();
    section
        .run_with(move |run| async move {
            run.on_input_changed(|scope| {
                scope.input = scope.input.to_uppercase();
            });
            let run_for_callback = run.clone();
            run.on_input_entered(move |scope| {
                *entered_for_callback.lock().unwrap() = Some(scope.input.clone());
                run_for_callback.signal();
            });
            handle_for_run.wait_for_writes(1).await;
            handle_for_run.send_text("ab");
            handle_for_run.send_key(Key::Enter);
            run.wait_for_signal().await;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(entered.lock().unwrap().as_deref(), Some("AB"));
}

#[tokio::test]
async fn test_rejected_enter_suppresses_internal_handling() {
    let (session, handle) = new_session();

    let section = session.section(|scope| {
        scope.input(InputOptions::default());
    });

    let attempts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let attempts_for_callback = attempts.clone();
    let handle_for_run = handle.clone();
    section
        .run_with(move |run| async move {
            run.on_input_entered(move |scope| {
                attempts_for_callback.lock().unwrap().push(scope.input.clone());
                if scope.input.is_empty() {
                    scope.reject_input();
                }
                scope.clear_input();
            });
            let run_for_wait = run.clone();
            // Internal handling: signal on accepted enter only.
            run.on_input_entered(move |scope| {
                if !scope.is_rejected() {
                    run_for_wait.signal();
                }
            });
            handle_for_run.wait_for_writes(1).await;
            // First enter: empty input, rejected. Second: accepted.
            handle_for_run.send_key(Key::Enter);
            handle_for_run.send_text("ok");
            handle_for_run.send_key(Key::Enter);
            run.wait_for_signal().await;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(*attempts.lock().unwrap(), vec!["", "ok"]);
}

#[tokio::test]
async fn test_run_until_input_entered() {
    let (session, handle) = new_session();
    let section = session.section(|scope| {
        scope.input(InputOptions::default());
    });

    let handle_for_feeder = handle.clone();
    let feeder = tokio::spawn(async move {
        handle_for_feeder.wait_for_writes(1).await;
        handle_for_feeder.send_text("done");
        handle_for_feeder.send_key(Key::Enter);
    });

    section.run_until_input_entered().await.unwrap();
    feeder.await.unwrap();
}

#[tokio::test]
async fn test_run_until_key_pressed() {
    let (session, handle) = new_session();
    let section = session.section(|scope| scope.text_line("press q"));

    let handle_for_feeder = handle.clone();
    let feeder = tokio::spawn(async move {
        handle_for_feeder.wait_for_writes(1).await;
        handle_for_feeder.send_text("xyz");
        handle_for_feeder.send_key(Key::Q);
    });

    section.run_until_key_pressed([Key::Q]).await.unwrap();
    feeder.await.unwrap();
}

#[tokio::test]
async fn test_on_key_pressed_sees_keys_in_arrival_order() {
    let (session, handle) = new_session();
    let section = session.section(|scope| scope.text_line("keys"));

    let seen: Arc<Mutex<Vec<Key>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_for_callback = seen.clone();
    let handle_for_run = handle.clone();
    section
        .run_with(move |run| async move {
            let run_for_callback = run.clone();
            run.on_key_pressed(move |key| {
                seen_for_callback.lock().unwrap().push(key);
                if key == Key::Enter {
                    run_for_callback.signal();
                }
            });
            handle_for_run.wait_for_writes(1).await;
            handle_for_run.send_text("abc");
            handle_for_run.send_key(Key::Up);
            handle_for_run.send_key(Key::Enter);
            run.wait_for_signal().await;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Key::Char('a'), Key::Char('b'), Key::Char('c'), Key::Up, Key::Enter]
    );
}

#[tokio::test]
async fn test_input_twice_per_pass_is_a_policy_error() {
    let (session, _handle) = new_session();
    let section = session.section(|scope| {
        scope.input(InputOptions::default());
        scope.input(InputOptions::default());
    });

    let report = section.run().await.unwrap_err();
    assert!(CommonError::is_error_type(
        &report,
        CommonErrorType::InvalidInputContext
    ));
}

#[tokio::test]
async fn test_input_inside_offscreen_is_a_policy_error() {
    let (session, _handle) = new_session();
    let section = session.section(|scope| {
        let _buffer = scope.offscreen(|inner| inner.input(InputOptions::default()));
    });

    let report = section.run().await.unwrap_err();
    assert!(CommonError::is_error_type(
        &report,
        CommonErrorType::InvalidInputContext
    ));
}

#[tokio::test]
async fn test_cursor_renders_inverted_while_blink_is_on() {
    let (session, handle) = new_session();
    let section = session.section(|scope| {
        scope.input(InputOptions::default());
    });

    let handle_for_run = handle.clone();
    section
        .run_with(move |run| async move {
            handle_for_run.wait_for_writes(1).await;
            run.abort();
            Ok(())
        })
        .await
        .unwrap();

    // Blink starts on: the cursor cell (the trailing space) is inverted.
    assert!(handle.output().contains("\u{1b}[7m"));
}

#[tokio::test(start_paused = true)]
async fn test_timer_drives_rerenders_through_live_var() {
    let (session, handle) = new_session();
    let ticks = session.live_var(0u32);

    let ticks_for_render = ticks.clone();
    let section = session.section(move |scope| {
        scope.text_line(format!("Ticks: {}", ticks_for_render.get()));
    });

    let ticks_for_timer = ticks.clone();
    section
        .run_with(move |run| async move {
            let run_for_timer = run.clone();
            run.add_timer(Duration::from_millis(100), true, move |scope| {
                let next = ticks_for_timer.get() + 1;
                ticks_for_timer.set(next);
                if next == 3 {
                    *scope.repeat = false;
                    run_for_timer.signal();
                }
            })?;
            run.wait_for_signal().await;
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(
        handle.resolved_lines(),
        vec!["Ticks: 3", "\u{1b}[0m", ""]
    );
}

#[tokio::test(start_paused = true)]
async fn test_text_anim_advances_frames() {
    let (session, handle) = new_session();
    let anim = session
        .text_anim_of(["frame-one", "frame-two"], Duration::from_millis(100))
        .unwrap();

    let anim_for_render = anim.clone();
    let section = session.section(move |scope| {
        scope.text_line(anim_for_render.current_frame().to_string());
    });

    section
        .run_with(|run| async move {
            run.pause_for(Duration::from_millis(160)).await;
            Ok(())
        })
        .await
        .unwrap();

    let output = handle.output();
    assert!(output.contains("frame-one"));
    assert!(output.contains("frame-two"));
}

#[tokio::test(start_paused = true)]
async fn test_render_anim_draws_with_frame_index() {
    let (session, handle) = new_session();
    let anim = session
        .render_anim_of(3, Duration::from_millis(50), |scope, frame| {
            scope.text(format!("[{frame}]"));
        })
        .unwrap();

    let anim_for_render = anim.clone();
    let section = session.section(move |scope| {
        anim_for_render.render(scope);
        scope.new_line();
    });

    section
        .run_with(|run| async move {
            run.pause_for(Duration::from_millis(120)).await;
            Ok(())
        })
        .await
        .unwrap();

    let output = handle.output();
    assert!(output.contains("[0]"));
    assert!(output.contains("[1]"));
}

#[tokio::test(start_paused = true)]
async fn test_timers_are_disposed_before_finishing_hooks() {
    let (session, _handle) = new_session();
    let fired_after_run: Arc<Mutex<bool>> = Arc::new(Mutex::new(false));

    let section = session.section(|scope| scope.text_line("timers"));
    let fired_for_timer = fired_after_run.clone();
    let run_over: Arc<Mutex<bool>> = Arc::new(Mutex::new(false));
    let run_over_for_hook = run_over.clone();
    section.on_finishing(move || {
        *run_over_for_hook.lock().unwrap() = true;
    });
    let fired_after_run_for_run = fired_after_run.clone();
    section
        .run_with(move |run| async move {
            run.add_timer(Duration::from_millis(10), true, move |_| {
                *fired_for_timer.lock().unwrap() = true;
            })?;
            run.pause_for(Duration::from_millis(35)).await;
            // Reset the marker right at the end of the run; any later fire
            // would flip it back on.
            *fired_after_run_for_run.lock().unwrap() = false;
            Ok(())
        })
        .await
        .unwrap();

    assert!(*run_over.lock().unwrap());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!*fired_after_run.lock().unwrap());
}
