pub mod lichess;
pub mod telegram;

// Re-export commonly used types
pub use lichess::LichessClient;
pub use telegram::TelegramClient;
