//! Line-oriented terminal front end for the session controller.

use std::{
    future::Future,
    io::Write as _,
    path::PathBuf,
    pin::Pin,
    time::{Duration, Instant},
};

use anyhow::Result;
use client_core::{
    render::{escape_terminal, render_files, render_message, render_notification, render_system_info},
    ClientEvent, SessionController,
};
use shared::domain::ChatRole;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::TryRecvError},
};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tracing::{debug, warn};

use crate::commands::{parse_command, Command, HELP_TEXT};

const NOTIFICATION_SWEEP: Duration = Duration::from_secs(1);

fn print_event(event: &ClientEvent) {
    match event {
        ClientEvent::Notified(notification) => println!("{}", render_notification(notification)),
        ClientEvent::LoadingChanged(Some(text)) => println!("... {}", escape_terminal(text)),
        ClientEvent::MessageAppended(message) if message.role == ChatRole::Assistant => {
            print_lines(render_message(message))
        }
        ClientEvent::MessageUpdated(message) => print_lines(render_message(message)),
        ClientEvent::SystemInfoLoaded(info) => println!("{}", render_system_info(info)),
        other => debug!(event = ?other, "controller event"),
    }
}

/// Prints everything the controller has emitted so far.
fn drain_events(events: &mut broadcast::Receiver<ClientEvent>) {
    loop {
        match events.try_recv() {
            Ok(event) => print_event(&event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "console fell behind controller events")
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

fn print_prompt(controller: &SessionController) -> Result<()> {
    let prompt = if controller.controls().chat_enabled {
        "docchat> "
    } else {
        "docchat (analyze first)> "
    };
    let mut stdout = std::io::stdout();
    write!(stdout, "{prompt}")?;
    stdout.flush()?;
    Ok(())
}

/// Applies one command. Returns `false` when the user asked to quit.
pub async fn dispatch(controller: &mut SessionController, command: Command) -> bool {
    match command {
        Command::Add(paths) => {
            let outcome = controller.add_files(paths);
            if outcome.added > 0 {
                print_lines(render_files(&controller.view().files));
            }
        }
        Command::Remove(index) => {
            if controller.remove_file(index).is_some() {
                print_lines(render_files(&controller.view().files));
            }
        }
        Command::Files => print_lines(render_files(&controller.view().files)),
        Command::Analyze => {
            if let Err(err) = controller.submit_for_analysis().await {
                debug!(error = %err, "analysis not completed");
            }
        }
        Command::Ask(question) => {
            if let Err(err) = controller.send_chat(&question).await {
                debug!(error = %err, "chat not completed");
            }
        }
        Command::Sources(id) => {
            let target = id.or_else(|| controller.transcript().last_with_sources().map(|m| m.id));
            match target {
                Some(id) => {
                    if !controller.toggle_sources(id) {
                        debug!(%id, "sources collapsed or unavailable");
                    }
                    match controller.message(id) {
                        Some(message) if !message.sources.is_empty() => {
                            print_lines(render_message(message))
                        }
                        _ => println!("Message #{id} has no sources."),
                    }
                }
                None => println!("No reply with sources yet."),
            }
        }
        Command::Info => {
            if controller.fetch_system_info().await.is_none() {
                println!("System info is unavailable.");
            }
        }
        Command::Help => println!("{HELP_TEXT}"),
        Command::Quit => return false,
        Command::Empty => {}
    }
    true
}

/// Runs one command while printing the events it raises. Returns `None` when
/// `shutdown` resolved before the command finished.
async fn run_command<S>(
    controller: &mut SessionController,
    events: &mut broadcast::Receiver<ClientEvent>,
    mut shutdown: Pin<&mut S>,
    command: Command,
) -> Option<bool>
where
    S: Future<Output = ()>,
{
    let keep_going = {
        let dispatched = dispatch(controller, command);
        tokio::pin!(dispatched);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.as_mut() => break None,
                keep = &mut dispatched => break Some(keep),
                Ok(event) = events.recv() => print_event(&event),
            }
        }
    };
    drain_events(events);
    keep_going
}

/// Reads commands from `input` until it ends, the user quits or `shutdown`
/// resolves. `shutdown` also interrupts a command still waiting on the
/// backend.
pub async fn drive<R, S>(
    controller: &mut SessionController,
    startup: Vec<Command>,
    input: R,
    shutdown: S,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    S: Future<Output = ()>,
{
    let mut events = controller.subscribe_events();
    tokio::pin!(shutdown);

    for command in startup {
        if run_command(controller, &mut events, shutdown.as_mut(), command).await != Some(true) {
            return Ok(());
        }
    }

    let mut lines = LinesStream::new(input.lines());
    let mut sweep = tokio::time::interval(NOTIFICATION_SWEEP);
    print_prompt(controller)?;

    loop {
        tokio::select! {
            line = lines.next() => {
                let Some(line) = line.transpose()? else { break };
                let keep_going = match parse_command(&line) {
                    Ok(command) => {
                        run_command(controller, &mut events, shutdown.as_mut(), command).await
                    }
                    Err(message) => {
                        eprintln!("{message}");
                        Some(true)
                    }
                };
                if keep_going != Some(true) {
                    break;
                }
                print_prompt(controller)?;
            }
            _ = sweep.tick() => {
                controller.expire_notifications(Instant::now());
                drain_events(&mut events);
            }
            _ = shutdown.as_mut() => break,
        }
    }
    Ok(())
}

/// Resolves on the first ctrl-c. The listener stays installed for the whole
/// session, including while a request is in flight.
async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

pub async fn run(
    mut controller: SessionController,
    initial_files: Vec<PathBuf>,
    analyze_on_start: bool,
) -> Result<()> {
    println!("{HELP_TEXT}");

    let mut startup = vec![Command::Info];
    if !initial_files.is_empty() {
        startup.push(Command::Add(initial_files));
    }
    if analyze_on_start {
        startup.push(Command::Analyze);
    }

    let input = BufReader::new(tokio::io::stdin());
    drive(&mut controller, startup, input, interrupted()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use client_core::{
        controller::ANALYZE_FIRST_MESSAGE, BackendClient, ClientError, HttpBackendClient,
        NotificationKind, PendingFile,
    };
    use shared::protocol::{
        AnalyzeRequest, AnalyzeResponse, ChatRequest, ChatResponse, SystemInfo, UploadResponse,
    };

    /// Backend whose requests never complete.
    struct StalledBackend;

    #[async_trait]
    impl BackendClient for StalledBackend {
        async fn upload(&self, _files: &[PendingFile]) -> Result<UploadResponse, ClientError> {
            std::future::pending().await
        }

        async fn analyze(&self, _request: &AnalyzeRequest) -> Result<AnalyzeResponse, ClientError> {
            std::future::pending().await
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, ClientError> {
            std::future::pending().await
        }

        async fn system_info(&self) -> Result<SystemInfo, ClientError> {
            std::future::pending().await
        }
    }

    fn offline_controller() -> SessionController {
        let backend = HttpBackendClient::new("http://127.0.0.1:9").expect("client");
        SessionController::new(Arc::new(backend))
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let mut controller = offline_controller();
        assert!(dispatch(&mut controller, Command::Empty).await);
        assert!(!dispatch(&mut controller, Command::Quit).await);
    }

    #[tokio::test]
    async fn questions_before_analysis_stay_local() {
        let mut controller = offline_controller();
        assert!(dispatch(&mut controller, Command::Ask("hello".into())).await);
        assert!(controller.transcript().is_empty());
        assert_eq!(
            controller.latest_notification().map(|n| n.message.as_str()),
            Some(ANALYZE_FIRST_MESSAGE)
        );
    }

    #[tokio::test]
    async fn non_pdf_selection_is_refused() {
        let mut controller = offline_controller();
        dispatch(&mut controller, Command::Add(vec!["notes.txt".into()])).await;
        assert!(controller.view().files.is_empty());
        assert_eq!(
            controller.latest_notification().map(|n| n.kind),
            Some(NotificationKind::Warning)
        );
    }

    #[tokio::test]
    async fn sources_without_replies_is_harmless() {
        let mut controller = offline_controller();
        assert!(dispatch(&mut controller, Command::Sources(None)).await);
        assert!(controller.latest_notification().is_none());
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_request_the_backend_never_answers() {
        let mut controller = SessionController::new(Arc::new(StalledBackend));
        let shutdown = tokio::time::sleep(Duration::from_millis(50));

        tokio::time::timeout(
            Duration::from_secs(5),
            drive(&mut controller, Vec::new(), &b"/info\n"[..], shutdown),
        )
        .await
        .expect("shutdown ends the loop")
        .expect("drive");
        assert!(controller.system_info().is_none());
    }

    #[tokio::test]
    async fn shutdown_interrupts_startup_commands() {
        let mut controller = SessionController::new(Arc::new(StalledBackend));
        let shutdown = tokio::time::sleep(Duration::from_millis(50));

        tokio::time::timeout(
            Duration::from_secs(5),
            drive(&mut controller, vec![Command::Info], &b""[..], shutdown),
        )
        .await
        .expect("shutdown ends startup")
        .expect("drive");
    }

    #[tokio::test]
    async fn quit_ends_the_loop_before_later_input() {
        let mut controller = SessionController::new(Arc::new(StalledBackend));

        tokio::time::timeout(
            Duration::from_secs(5),
            drive(
                &mut controller,
                Vec::new(),
                &b"/quit\n/info\n"[..],
                std::future::pending(),
            ),
        )
        .await
        .expect("quit ends the loop")
        .expect("drive");
    }

    #[tokio::test]
    async fn end_of_input_ends_the_loop() {
        let mut controller = offline_controller();

        tokio::time::timeout(
            Duration::from_secs(5),
            drive(
                &mut controller,
                Vec::new(),
                &b"/files\n\nwhat?\n"[..],
                std::future::pending(),
            ),
        )
        .await
        .expect("eof ends the loop")
        .expect("drive");
        assert!(controller.transcript().is_empty());
    }

    #[tokio::test]
    async fn command_events_are_printed_before_the_prompt_returns() {
        let mut controller = offline_controller();
        let mut events = controller.subscribe_events();
        let shutdown = std::future::pending::<()>();
        tokio::pin!(shutdown);

        let keep_going = run_command(
            &mut controller,
            &mut events,
            shutdown.as_mut(),
            Command::Ask("hello".into()),
        )
        .await;
        assert_eq!(keep_going, Some(true));
        assert!(controller.latest_notification().is_some());
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    }
}
