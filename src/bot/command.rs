#[cfg(test)]
#[path = "command_test.rs"]
mod tests;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::models::UserId;
use crate::telegram::BotCommand;

/// Commands advertised in the Telegram client menu.
pub static BOT_COMMANDS: Lazy<Vec<BotCommand>> = Lazy::new(|| {
    vec![
        BotCommand::new("start", "Start"),
        BotCommand::new("prompts", "Select a system prompt"),
        BotCommand::new("chats", "Manage chats"),
        BotCommand::new("newchat", "Start a saved chat"),
        BotCommand::new("reset", "Reset current chat"),
        BotCommand::new("history", "Look through messages"),
        BotCommand::new("model", "[Admin] Switch the model"),
        BotCommand::new("adduser", "[Admin] Add user to allowlist"),
        BotCommand::new("rmuser", "[Admin] Remove user from allowlist"),
        BotCommand::new("listusers", "[Admin] List allowed users"),
        BotCommand::new("addprompt", "[Admin] Add a global system prompt"),
        BotCommand::new("rmprompt", "[Admin] Remove a global system prompt"),
    ]
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    History,
    Reset,
    Prompts,
    /// A predefined prompt key or the id of a global prompt.
    Prompt(String),
    Chats,
    NewChat(String),
    SwitchChat(String),
    DeleteChat(String),
    AddUser { id: UserId, name: Option<String> },
    RemoveUser(UserId),
    ListUsers,
    AddPrompt { name: String, prompt: String },
    RemovePrompt(i64),
    Model(String),
}

/// A known command with unusable arguments. Displays the expected usage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("❌ Incorrect format. Use: {0}")]
pub struct UsageError(pub &'static str);

impl Command {
    /// Parses `/name[@bot] args`. Returns `None` for plain text, for
    /// commands addressed to another bot and for unknown commands, all of
    /// which are treated as ordinary messages.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Result<Command, UsageError>> {
        let text = text.trim();
        let body = text.strip_prefix('/')?;

        let (head, args) = match body.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (body, ""),
        };

        let name = match head.split_once('@') {
            Some((name, target)) => {
                if !bot_username.is_some_and(|u| u.eq_ignore_ascii_case(target)) {
                    return None;
                }
                name
            }
            None => head,
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "start" => Ok(Command::Start),
            "history" => Ok(Command::History),
            "reset" => Ok(Command::Reset),
            "prompts" => Ok(Command::Prompts),
            "prompt" => required(args, "/prompt <key|id>").map(Command::Prompt),
            "chats" => Ok(Command::Chats),
            "newchat" => required(args, "/newchat <name>").map(Command::NewChat),
            "switchchat" => required(args, "/switchchat <id>").map(Command::SwitchChat),
            "deletechat" => required(args, "/deletechat <id>").map(Command::DeleteChat),
            "adduser" => parse_add_user(args),
            "rmuser" => args
                .parse()
                .map(Command::RemoveUser)
                .map_err(|_| UsageError("/rmuser <user_id>")),
            "listusers" => Ok(Command::ListUsers),
            "addprompt" => parse_add_prompt(args),
            "rmprompt" => args
                .parse()
                .map(Command::RemovePrompt)
                .map_err(|_| UsageError("/rmprompt <id>")),
            "model" => required(args, "/model <name>").map(Command::Model),
            _ => return None,
        };
        Some(command)
    }

    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Command::DeleteChat(_)
                | Command::AddUser { .. }
                | Command::RemoveUser(_)
                | Command::ListUsers
                | Command::AddPrompt { .. }
                | Command::RemovePrompt(_)
                | Command::Model(_)
        )
    }
}

fn required(args: &str, usage: &'static str) -> Result<String, UsageError> {
    if args.is_empty() {
        return Err(UsageError(usage));
    }
    Ok(args.to_string())
}

fn parse_add_user(args: &str) -> Result<Command, UsageError> {
    const USAGE: &str = "/adduser <user_id> [user_name]";

    let (id, name) = match args.split_once(char::is_whitespace) {
        Some((id, name)) => (id, Some(name.trim().to_string())),
        None => (args, None),
    };
    let id = id.parse().map_err(|_| UsageError(USAGE))?;
    Ok(Command::AddUser {
        id,
        name: name.filter(|n| !n.is_empty()),
    })
}

fn parse_add_prompt(args: &str) -> Result<Command, UsageError> {
    const USAGE: &str = "/addprompt <name> | <prompt>";

    let (name, prompt) = args.split_once('|').ok_or(UsageError(USAGE))?;
    let (name, prompt) = (name.trim(), prompt.trim());
    if name.is_empty() || prompt.is_empty() {
        return Err(UsageError(USAGE));
    }
    Ok(Command::AddPrompt {
        name: name.to_string(),
        prompt: prompt.to_string(),
    })
}
