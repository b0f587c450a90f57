//! grammers-backed [`ChatTransport`] plus the connect/login/contact-lookup
//! startup flow.

use crate::config::TelegramConfig;
use crate::telegram::{ChatMessage, ChatTransport, InlineButton, TransportError};
use anyhow::Result;
use async_trait::async_trait;
use grammers_client::types::Chat;
use grammers_client::{Client, Config, SignInError};
use grammers_session::Session;
use grammers_tl_types as tl;
use std::io::{self, BufRead, Write};

const SESSION_FILE: &str = "autobuy.session";

/// Connects and, on first run, walks through the interactive login
/// (code prompt, optional 2FA password). The session is persisted so later
/// runs skip the prompts.
pub async fn connect(config: &TelegramConfig) -> Result<Client> {
    tracing::info!("Connecting to Telegram...");
    let client = Client::connect(Config {
        session: Session::load_file_or_create(SESSION_FILE)?,
        api_id: config.api_id,
        api_hash: config.api_hash.clone(),
        params: Default::default(),
    })
    .await?;

    if !client.is_authorized().await? {
        tracing::info!("First time setup - need to log in!");
        handle_login(&client, &config.phone_number).await?;
    }
    tracing::info!("Connected!");

    Ok(client)
}

async fn handle_login(client: &Client, phone_number: &str) -> Result<()> {
    tracing::info!("Signing in...");
    let token = client.request_login_code(phone_number).await?;
    let code = prompt("Enter the code you received: ")?;
    let signed_in = client.sign_in(&token, &code).await;

    match signed_in {
        Err(SignInError::PasswordRequired(password_token)) => {
            let hint = password_token.hint().unwrap_or("none");
            let prompt_message = format!("Enter the password (hint {}): ", hint);
            let password = prompt(&prompt_message)?;
            client
                .check_password(password_token, password.trim())
                .await?;
        }
        Ok(_) => (),
        Err(e) => return Err(e.into()),
    }

    tracing::info!("Signed in!");
    client.session().save_to_file(SESSION_FILE)?;
    Ok(())
}

/// Finds the agent peer by dialog name. The peer must already be present in
/// the account's dialogs; a missing peer is a startup error.
pub async fn find_contact(client: &Client, name: &str) -> Result<Chat> {
    tracing::info!("Finding contact {}...", name);
    let mut dialogs = client.iter_dialogs();

    while let Some(dialog) = dialogs.next().await? {
        if dialog.chat().name().to_lowercase() == name.to_lowercase() {
            return Ok(dialog.chat().clone());
        }
    }

    Err(anyhow::anyhow!("Contact not found in your dialogs"))
}

pub struct TelegramTransport {
    client: Client,
    peer: Chat,
}

impl TelegramTransport {
    pub fn new(client: Client, peer: Chat) -> Self {
        Self { client, peer }
    }

    pub fn peer_name(&self) -> &str {
        self.peer.name()
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        // grammers stamps each outgoing message with a fresh random id, so
        // re-sending the same token text is not dropped as a duplicate.
        self.client
            .send_message(self.peer.pack(), text)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        Ok(())
    }

    async fn fetch_recent(&self, limit: usize) -> Result<Vec<ChatMessage>, TransportError> {
        let request = tl::functions::messages::GetHistory {
            peer: self.peer.pack().to_input_peer(),
            offset_id: 0,
            offset_date: 0,
            add_offset: 0,
            limit: limit as i32,
            max_id: 0,
            min_id: 0,
            hash: 0,
        };
        let history = self
            .client
            .invoke(&request)
            .await
            .map_err(|e| TransportError::Fetch(e.to_string()))?;

        convert_messages(history_messages(history)?)
    }

    async fn press_button(&self, message_id: i32, data: &[u8]) -> Result<(), TransportError> {
        let request = tl::functions::messages::GetBotCallbackAnswer {
            game: false,
            peer: self.peer.pack().to_input_peer(),
            msg_id: message_id,
            data: Some(data.to_vec()),
            password: None,
        };
        self.client
            .invoke(&request)
            .await
            .map_err(|e| TransportError::Action(e.to_string()))?;
        Ok(())
    }
}

/// The history call can return several container shapes; a private chat
/// yields `messages.messagesSlice` and that is the only one we interpret.
fn history_messages(
    history: tl::enums::messages::Messages,
) -> Result<Vec<tl::enums::Message>, TransportError> {
    match history {
        tl::enums::messages::Messages::Slice(slice) => Ok(slice.messages),
        tl::enums::messages::Messages::Messages(_) => {
            Err(TransportError::UnexpectedShape("messages.messages"))
        }
        tl::enums::messages::Messages::ChannelMessages(_) => {
            Err(TransportError::UnexpectedShape("messages.channelMessages"))
        }
        tl::enums::messages::Messages::NotModified(_) => {
            Err(TransportError::UnexpectedShape("messages.messagesNotModified"))
        }
    }
}

/// The newest history entry drives classification, so it must be a plain
/// message; anything else (service or empty entries) would otherwise make
/// the worker re-read a stale older reply as current. Non-message entries
/// further back are skipped.
fn convert_messages(
    entries: Vec<tl::enums::Message>,
) -> Result<Vec<ChatMessage>, TransportError> {
    let mut entries = entries.into_iter();
    let Some(head) = entries.next() else {
        return Ok(Vec::new());
    };
    let tl::enums::Message::Message(head) = head else {
        return Err(TransportError::Fetch(
            "newest history entry is not a message".to_string(),
        ));
    };

    let mut messages = vec![to_chat_message(head)];
    messages.extend(entries.filter_map(|entry| match entry {
        tl::enums::Message::Message(m) => Some(to_chat_message(m)),
        _ => None,
    }));
    Ok(messages)
}

fn to_chat_message(m: tl::types::Message) -> ChatMessage {
    ChatMessage {
        id: m.id,
        text: m.message,
        buttons: button_grid(m.reply_markup),
    }
}

fn button_grid(markup: Option<tl::enums::ReplyMarkup>) -> Vec<Vec<InlineButton>> {
    let Some(tl::enums::ReplyMarkup::ReplyInlineMarkup(markup)) = markup else {
        return Vec::new();
    };

    markup
        .rows
        .into_iter()
        .map(|row| {
            let tl::enums::KeyboardButtonRow::Row(row) = row;
            row.buttons
                .into_iter()
                .filter_map(|button| match button {
                    tl::enums::KeyboardButton::Callback(b) => Some(InlineButton {
                        label: b.text,
                        data: b.data,
                    }),
                    _ => None,
                })
                .collect()
        })
        .collect()
}

fn prompt(message: &str) -> Result<String> {
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    stdout.write_all(message.as_bytes())?;
    stdout.flush()?;

    let stdin = io::stdin();
    let mut stdin = stdin.lock();

    let mut line = String::new();
    stdin.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_message_slices_are_interpreted() {
        let history = tl::enums::messages::Messages::NotModified(
            tl::types::messages::MessagesNotModified { count: 0 },
        );
        assert!(matches!(
            history_messages(history),
            Err(TransportError::UnexpectedShape("messages.messagesNotModified"))
        ));

        let history = tl::enums::messages::Messages::Messages(tl::types::messages::Messages {
            messages: Vec::new(),
            chats: Vec::new(),
            users: Vec::new(),
        });
        assert!(matches!(
            history_messages(history),
            Err(TransportError::UnexpectedShape("messages.messages"))
        ));
    }

    #[test]
    fn non_message_head_is_a_fetch_error() {
        // a service or empty entry on top must not let an older reply be
        // classified as the current one
        let entries = vec![tl::enums::Message::Empty(tl::types::MessageEmpty {
            id: 7,
            peer_id: None,
        })];
        assert!(matches!(
            convert_messages(entries),
            Err(TransportError::Fetch(_))
        ));
    }

    #[test]
    fn empty_history_converts_to_no_messages() {
        assert!(convert_messages(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn maps_inline_keyboard_to_button_grid() {
        let markup = tl::enums::ReplyMarkup::ReplyInlineMarkup(tl::types::ReplyInlineMarkup {
            rows: vec![tl::enums::KeyboardButtonRow::Row(
                tl::types::KeyboardButtonRow {
                    buttons: vec![tl::enums::KeyboardButton::Callback(
                        tl::types::KeyboardButtonCallback {
                            requires_password: false,
                            text: "Buy 0.5 SOL".to_string(),
                            data: b"buy_05".to_vec(),
                        },
                    )],
                },
            )],
        });

        let grid = button_grid(Some(markup));
        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0][0].label, "Buy 0.5 SOL");
        assert_eq!(grid[0][0].data, b"buy_05");
    }

    #[test]
    fn no_markup_means_no_buttons() {
        assert!(button_grid(None).is_empty());
    }
}
