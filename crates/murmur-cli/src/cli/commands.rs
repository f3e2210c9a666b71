//! Subcommand implementations over a [`CoreRuntime`].

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use murmur_core::chat::SendOutcome;
use murmur_core::models::{Role, Theme};
use murmur_core::search::filter_conversations;
use murmur_core::CoreRuntime;

/// Send one message in the selected conversation (the newest one after a
/// refresh) and print the reply.
pub async fn chat(runtime: &CoreRuntime, message: &str) -> Result<()> {
    runtime.conversations().lock().await.refresh().await?;

    match runtime.chat().send(message).await? {
        SendOutcome::Replied { reply, .. } => {
            println!("{reply}");
        }
        SendOutcome::Deferred { queued_id, .. } => {
            println!("message queued for delivery ({queued_id}), waiting...");
            if wait_for_queue(runtime, Duration::from_secs(30)).await {
                println!("delivered");
            } else {
                let pending = runtime.queue().len();
                eprintln!("warning: {pending} request(s) still pending; the queue does not survive exit");
            }
        }
    }
    Ok(())
}

async fn wait_for_queue(runtime: &CoreRuntime, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if runtime.queue().is_empty() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    runtime.queue().is_empty()
}

/// List conversations, newest first. `filter` uses '+'-separated AND terms.
pub async fn list_conversations(runtime: &CoreRuntime, filter: Option<&str>) -> Result<()> {
    let conversations = runtime.conversations();
    let mut store = conversations.lock().await;
    store.refresh().await?;

    let mut rows = store.conversations();
    if let Some(query) = filter {
        rows = filter_conversations(&rows, query);
    }
    let selected = store.selected_id().map(str::to_string);
    drop(store);

    if rows.is_empty() {
        println!("no conversations");
        return Ok(());
    }
    for row in rows {
        let marker = if selected.as_deref() == Some(row.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {}  {}  {}",
            row.id,
            row.created_at.format("%Y-%m-%d %H:%M"),
            row.title
        );
    }
    Ok(())
}

pub async fn new_conversation(runtime: &CoreRuntime, title: &str) -> Result<()> {
    let conversations = runtime.conversations();
    let mut store = conversations.lock().await;
    store.refresh().await?;
    let created = store.create(title).await?;
    println!("created {}", created.id);
    Ok(())
}

pub async fn show_conversation(runtime: &CoreRuntime, id: &str) -> Result<()> {
    let messages = runtime.chat().history(id).await?;
    if messages.is_empty() {
        println!("no messages");
        return Ok(());
    }
    for message in messages {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        println!("[{who}] {}", message.content);
    }
    Ok(())
}

pub async fn remove_conversation(runtime: &CoreRuntime, id: &str) -> Result<()> {
    let conversations = runtime.conversations();
    let mut store = conversations.lock().await;
    store.refresh().await?;
    store.remove(id).await?;
    match store.selected_id() {
        Some(selected) => println!("deleted {id}, now on {selected}"),
        None => println!("deleted {id}"),
    }
    Ok(())
}

pub async fn clear_conversations(runtime: &CoreRuntime, yes: bool) -> Result<()> {
    if !yes {
        bail!("this deletes every conversation and message; pass --yes to confirm");
    }
    let conversations = runtime.conversations();
    let mut store = conversations.lock().await;
    store.refresh().await?;
    let count = store.conversations().len();
    store.remove_all().await?;
    println!("deleted {count} conversation(s)");
    Ok(())
}

pub async fn show_settings(runtime: &CoreRuntime) -> Result<()> {
    let settings = runtime.settings();
    let current = settings.lock().await.load().await;
    println!("{}", serde_json::to_string_pretty(&current)?);
    Ok(())
}

pub async fn set_setting(runtime: &CoreRuntime, key: &str, value: &str) -> Result<()> {
    let settings = runtime.settings();
    let mut store = settings.lock().await;
    store.load().await;

    let updated = match key {
        "theme" => {
            let theme = match value {
                "light" => Theme::Light,
                "dark" => Theme::Dark,
                "system" => Theme::System,
                other => bail!("unknown theme '{other}' (light, dark, system)"),
            };
            store.update(|s| s.theme = theme).await?
        }
        "speech_voice" => {
            let voice = value.to_string();
            store.update(|s| s.speech_voice = voice).await?
        }
        "speech_enabled" | "send_on_enter" | "web_search_enabled" | "code_execution_enabled" => {
            let flag: bool = value
                .parse()
                .with_context(|| format!("'{value}' is not a boolean"))?;
            store
                .update(|s| match key {
                    "speech_enabled" => s.speech_enabled = flag,
                    "send_on_enter" => s.send_on_enter = flag,
                    "web_search_enabled" => s.web_search_enabled = flag,
                    _ => s.code_execution_enabled = flag,
                })
                .await?
        }
        other => bail!("unknown setting '{other}'"),
    };

    println!("{}", serde_json::to_string_pretty(&updated)?);
    Ok(())
}

pub async fn speak(
    runtime: &CoreRuntime,
    text: &str,
    voice: Option<&str>,
    output: &Path,
) -> Result<()> {
    let configured = runtime.settings().lock().await.load().await;
    let voice = voice.unwrap_or(&configured.speech_voice);

    let audio = runtime.speech().synthesize(text, voice).await?;
    std::fs::write(output, &audio)
        .with_context(|| format!("Failed to write audio to {}", output.display()))?;
    println!("wrote {} bytes to {}", audio.len(), output.display());
    Ok(())
}

pub async fn run_code(runtime: &CoreRuntime, file: &Path, language: &str) -> Result<()> {
    let settings = runtime.settings().lock().await.load().await;
    if !settings.code_execution_enabled {
        bail!("code execution is disabled in settings");
    }

    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let outcome = runtime.sandbox().execute(&code, language).await?;

    if !outcome.output.is_empty() {
        print!("{}", outcome.output);
    }
    if let Some(error) = &outcome.error {
        eprint!("{error}");
    }
    if !outcome.success {
        bail!("execution failed (exit code {:?})", outcome.exit_code);
    }
    Ok(())
}

pub async fn search(runtime: &CoreRuntime, query: &str) -> Result<()> {
    let settings = runtime.settings().lock().await.load().await;
    if !settings.web_search_enabled {
        bail!("web search is disabled in settings");
    }

    let hits = runtime.websearch().search(query).await?;
    if hits.is_empty() {
        println!("no results");
        return Ok(());
    }
    for hit in hits {
        println!("{}\n  {}\n  {}", hit.title, hit.url, hit.snippet);
    }
    Ok(())
}
