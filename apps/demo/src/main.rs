use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use confab_config::load as load_config;
use confab_conversations::{ConversationEngine, ConversationView, VisibilityFilter};
use confab_database::{ActorProfile, ActorRef, CreateGroupRequest, UpdateGroupRequest};
use confab_runtime::{telemetry, EngineServices};
use futures_util::future::join_all;

#[derive(Parser)]
#[command(name = "confab-demo")]
#[command(about = "Drives the Confab conversation engine through example scenarios")]
struct Cli {
    /// SQLite database the scenarios run against
    #[arg(long)]
    database: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Two actors exchanging messages in a private conversation
    Walkthrough,
    /// A notes-to-self conversation and its immediate destruction
    SelfNotes,
    /// A group conversation with concurrent senders
    Group,
    /// Run every scenario (default)
    RunAll,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;
    let cli = Cli::parse();

    let mut config = load_config().context("failed to load configuration")?;
    if let Some(database) = cli.database {
        config.database.url = database;
    }

    let services = EngineServices::initialise(&config)
        .await
        .context("failed to initialise engine services")?;
    let engine = services.engine.clone();

    register_demo_actors(&engine);

    match cli.command.unwrap_or(Commands::RunAll) {
        Commands::Walkthrough => walkthrough(&engine).await?,
        Commands::SelfNotes => self_notes(&engine).await?,
        Commands::Group => group_chat(&engine).await?,
        Commands::RunAll => {
            walkthrough(&engine).await?;
            self_notes(&engine).await?;
            group_chat(&engine).await?;
        }
    }

    Ok(())
}

fn register_demo_actors(engine: &Arc<ConversationEngine>) {
    engine.actors().register("user", |id| {
        let name = match id {
            1 => "Alice",
            2 => "Bob",
            3 => "Carol",
            _ => return None,
        };
        Some(ActorProfile::new(name))
    });
}

fn display_name(engine: &Arc<ConversationEngine>, actor: &ActorRef) -> String {
    engine
        .actors()
        .resolve(actor)
        .map(|profile| profile.display_name)
        .unwrap_or_else(|| actor.to_string())
}

async fn walkthrough(engine: &Arc<ConversationEngine>) -> Result<()> {
    println!("=== Private conversation walkthrough ===");
    let (alice, bob) = (ActorRef::user(1), ActorRef::user(2));

    let conversation = engine.conversations().create_private(&alice, &bob).await?;
    println!(
        "Created private conversation {} between {} and {}",
        conversation.public_id,
        display_name(engine, &alice),
        display_name(engine, &bob)
    );

    let mut bob_view =
        ConversationView::open(Arc::clone(engine), conversation.id, Some(bob.clone())).await?;
    let mut alice_view =
        ConversationView::open(Arc::clone(engine), conversation.id, Some(alice.clone())).await?;

    alice_view.send_message(Some("hi Bob!"), &[]).await?;
    println!("Alice sent a message");

    let event = bob_view
        .next_event()
        .await
        .context("expected a message event on Bob's stream")?;
    bob_view.apply(&event).await?;
    println!(
        "Bob received it; his view now holds {} message(s)",
        bob_view.messages().len()
    );

    let first = bob_view.messages()[0].message.clone();
    bob_view.set_reply(first.id).await?;
    bob_view.send_message(Some("hi Alice!"), &[]).await?;
    println!("Bob replied to message {}", first.public_id);

    bob_view.send_like().await?;
    println!("Bob sent a like");

    alice_view.refresh().await?;
    println!("Alice's window after refresh: {} message(s)", alice_view.messages().len());

    // Alice hides Bob's reply from her own view only.
    let bobs_reply = alice_view
        .messages()
        .iter()
        .find(|entry| entry.message.reply_id.is_some())
        .map(|entry| entry.message.id)
        .context("expected Bob's reply in Alice's window")?;
    alice_view.delete_for_me(bobs_reply).await?;
    bob_view.refresh().await?;
    println!(
        "After delete-for-me: Alice sees {}, Bob still sees {}",
        alice_view.messages().len(),
        bob_view.messages().len()
    );

    // Bob removes his like for everyone.
    let like = bob_view
        .messages()
        .last()
        .map(|entry| entry.message.id)
        .context("expected the like in Bob's window")?;
    bob_view.delete_for_everyone(like).await?;
    alice_view.refresh().await?;
    println!(
        "After delete-for-everyone: Alice sees {}, Bob sees {}",
        alice_view.messages().len(),
        bob_view.messages().len()
    );

    let destroyed = alice_view.delete_conversation().await?;
    println!("Alice cleared the conversation (destroyed: {destroyed})");
    let destroyed = bob_view.delete_conversation().await?;
    println!("Bob cleared the conversation (destroyed: {destroyed})");

    Ok(())
}

async fn self_notes(engine: &Arc<ConversationEngine>) -> Result<()> {
    println!("=== Notes to self ===");
    let alice = ActorRef::user(1);

    let conversation = engine.conversations().create_private(&alice, &alice).await?;
    let mut view =
        ConversationView::open(Arc::clone(engine), conversation.id, Some(alice.clone())).await?;

    view.send_message(Some("remember the milk"), &[]).await?;
    view.send_message(Some("and the bread"), &[]).await?;
    println!("Saved {} note(s)", view.messages().len());
    println!(
        "Receiver resolves to the author: {}",
        view.receiver().map(ToString::to_string).unwrap_or_default()
    );

    let destroyed = view.delete_conversation().await?;
    println!("Clearing notes destroys them immediately: {destroyed}");

    Ok(())
}

async fn group_chat(engine: &Arc<ConversationEngine>) -> Result<()> {
    println!("=== Group conversation ===");
    let (alice, bob, carol) = (ActorRef::user(1), ActorRef::user(2), ActorRef::user(3));

    let conversation = engine
        .conversations()
        .create_group(
            &alice,
            &[bob.clone(), carol.clone()],
            &CreateGroupRequest {
                name: "weekend plans".to_string(),
                description: Some("where are we going?".to_string()),
                avatar_url: None,
            },
        )
        .await?;
    println!("Created group {}", conversation.public_id);

    let sends = [(&alice, "beach?"), (&bob, "mountains!"), (&carol, "either works")]
        .into_iter()
        .map(|(sender, body)| {
            let engine = Arc::clone(engine);
            let conversation = conversation.clone();
            let sender = sender.clone();
            async move {
                engine
                    .messages()
                    .create(&conversation, Some(&sender), Some(body), None, None)
                    .await
            }
        });
    for result in join_all(sends).await {
        result?;
    }
    println!("Three members sent messages concurrently");

    let view =
        ConversationView::open(Arc::clone(engine), conversation.id, Some(alice.clone())).await?;
    for entry in view.messages() {
        let sender = display_name(engine, &entry.message.sender);
        println!("  {}: {}", sender, entry.message.body.as_deref().unwrap_or("<attachment>"));
    }

    engine
        .conversations()
        .update_group_settings(
            &conversation,
            &alice,
            &UpdateGroupRequest {
                name: Some("saturday plans".to_string()),
                description: None,
                avatar_url: None,
            },
        )
        .await?;
    let settings = engine
        .conversations()
        .group_settings(conversation.id)
        .await?
        .context("group settings should exist")?;
    println!("Renamed group to {:?}", settings.name);

    let destroyed = engine
        .conversations()
        .delete_for(&conversation, Some(&bob))
        .await?;
    println!("Bob cleared the group (destroyed: {destroyed})");

    let overview = engine
        .conversations()
        .list_for_actor(&bob, VisibilityFilter::ExcludeCleared)
        .await?;
    println!(
        "Bob's filtered overview holds {} conversation(s)",
        overview.len()
    );

    Ok(())
}
