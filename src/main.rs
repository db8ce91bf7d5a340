//! RegBot Telegram Bot
//!
//! Main application entry point

use std::sync::Arc;
use teloxide::{prelude::*, types::{Me, Update}};
use teloxide::dispatching::UpdateHandler;
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn, error};

use RegBot::{
    config::Settings,
    utils::logging,
    services::ServiceFactory,
    handlers::{self, Command, Inbound},
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env is fine; the environment may already be populated
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", RegBot::info());

    // Initialize services
    info!("Initializing services...");
    let services = ServiceFactory::new(&settings).await?;

    // Initialize bot
    let bot = Bot::new(&settings.bot.token);

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    info!("Setting up bot handlers...");

    let handler = create_handler();

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![Arc::new(services)])
        .default_handler(|upd| async move {
            debug!("Unhandled update: {:?}", upd);
        })
        .enable_ctrlc_handler()
        .build();

    info!("Starting bot with polling mode...");

    dispatcher.dispatch().await;

    info!("RegBot has been shut down.");

    Ok(())
}

/// Create the main update handler
fn create_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use teloxide::dispatching::UpdateFilterExt;

    Update::filter_message()
        .branch(
            // Handle commands
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_commands)
        )
        .branch(
            // Handle text messages, unknown commands included
            dptree::filter(|msg: Message| msg.text().is_some())
                .endpoint(handle_messages)
        )
}

/// Handle bot commands
async fn handle_commands(
    bot: Bot,
    msg: Message,
    cmd: Command,
    services: Arc<ServiceFactory>,
) -> HandlerResult {
    if let Err(e) = handlers::handle_update(&bot, &msg, cmd.into(), &services).await {
        error!(error = %e, "Error handling command");
        return Err(e.into());
    }

    Ok(())
}

/// Handle regular messages
async fn handle_messages(
    bot: Bot,
    msg: Message,
    me: Me,
    services: Arc<ServiceFactory>,
) -> HandlerResult {
    let bot_username = me.user.username.as_deref().unwrap_or_default();
    let inbound = Inbound::from_text(msg.text().unwrap_or_default(), bot_username);

    if let Err(e) = handlers::handle_update(&bot, &msg, inbound, &services).await {
        error!(error = %e, "Error handling message");
        return Err(e.into());
    }

    Ok(())
}
